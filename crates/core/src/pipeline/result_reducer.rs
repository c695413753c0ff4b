use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classification::domain::detection_result::DetectionResult;

/// Collapses per-frame observations to one result per label, keeping the
/// highest confidence.
///
/// Ties keep the earliest observation. Labels come out in order of first
/// appearance. Reducing an already reduced set returns it unchanged.
pub fn reduce_by_label(results: impl IntoIterator<Item = DetectionResult>) -> Vec<DetectionResult> {
    let mut best: Vec<DetectionResult> = Vec::new();
    let mut slot_of: HashMap<String, usize> = HashMap::new();

    for result in results {
        match slot_of.get(&result.label) {
            Some(&slot) => {
                if result.confidence > best[slot].confidence {
                    best[slot] = result;
                }
            }
            None => {
                slot_of.insert(result.label.clone(), best.len());
                best.push(result);
            }
        }
    }
    best
}

/// Optional ordering applied to a reduced result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultOrder {
    /// First-appearance order.
    #[default]
    Unsorted,
    /// Ascending by label.
    Label,
    /// Descending by confidence, then ascending by label.
    Confidence,
}

impl std::str::FromStr for ResultOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "unsorted" => Ok(ResultOrder::Unsorted),
            "label" => Ok(ResultOrder::Label),
            "confidence" => Ok(ResultOrder::Confidence),
            other => Err(format!("expected 'label', 'confidence' or 'none', got '{other}'")),
        }
    }
}

pub fn sort_results(results: &mut [DetectionResult], order: ResultOrder) {
    match order {
        ResultOrder::Unsorted => {}
        ResultOrder::Label => results.sort_by(|a, b| a.label.cmp(&b.label)),
        ResultOrder::Confidence => results.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.label.cmp(&b.label))
        }),
    }
}

/// Frame behind the single most confident result. Earliest wins ties.
pub fn select_best_frame(results: &[DetectionResult]) -> Option<&Path> {
    results
        .iter()
        .fold(None::<&DetectionResult>, |best, r| match best {
            Some(b) if b.confidence >= r.confidence => Some(b),
            _ => Some(r),
        })
        .map(|r| r.source_frame_path.as_path())
}
