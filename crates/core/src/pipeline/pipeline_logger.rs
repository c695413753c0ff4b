use std::collections::HashMap;
use std::time::Instant;

/// Observer for run orchestration events.
///
/// Keeps the use case independent of where progress and timings end up
/// (the `log` facade, a UI, nowhere).
pub trait PipelineLogger: Send {
    /// A sampled frame has been handled. `total` is the planned number of
    /// sampling attempts.
    fn progress(&mut self, current: usize, total: usize);

    /// Duration of one stage (`decode`, `preprocess`, `classify`) for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value such as results per frame.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by library callers that do not care and by tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Aggregates stage timings and metrics and writes them through `log` when
/// the run ends.
///
/// Progress lines are emitted every `every` sampled frames.
pub struct SummaryPipelineLogger {
    every: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    started: Instant,
    frames_seen: usize,
    planned: usize,
    messages: Vec<String>,
}

impl SummaryPipelineLogger {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            started: Instant::now(),
            frames_seen: 0,
            planned: 0,
            messages: Vec::new(),
        }
    }

    /// Formatted report, or `None` when nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Run summary ({}/{} sampled frames, {elapsed_s:.1}s):",
            self.frames_seen, self.planned
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, durations) in stages {
            let total_ms: f64 = durations.iter().sum();
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  total {total_ms:7.0}ms  ({} calls)",
                mean(durations),
                durations.len()
            ));
        }

        let mut metrics: Vec<_> = self.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, values) in metrics {
            lines.push(format!("  {name}: avg {:.1}", mean(values)));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(Vec::as_slice)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(Vec::as_slice)
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for SummaryPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for SummaryPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = current;
        self.planned = total;
        if total > 0 && (current % self.every == 0 || current == total) {
            log::info!("Sampled {current}/{total} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
