use std::fs;
use std::path::Path;

use crate::shared::error::PipelineError;

/// Ordered class names; entry `i` names output `i` of the classifier.
///
/// Loaded once and shared read-only by every run.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    pub fn new(labels: Vec<String>) -> Result<Self, PipelineError> {
        if labels.is_empty() {
            return Err(PipelineError::Configuration(
                "label vocabulary is empty".into(),
            ));
        }
        Ok(Self { labels })
    }

    /// Reads a label file. A JSON array of strings is parsed as such;
    /// anything else is one label per line with blank lines ignored.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "cannot read label file {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&text).map_err(|e| match e {
            PipelineError::Configuration(reason) => {
                PipelineError::Configuration(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        let trimmed = text.trim_start();
        let labels = if trimmed.starts_with('[') {
            serde_json::from_str::<Vec<String>>(trimmed).map_err(|e| {
                PipelineError::Configuration(format!("malformed JSON label list: {e}"))
            })?
        } else {
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        };
        Self::new(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Fails unless the classifier emits exactly one score per label.
    pub fn ensure_matches(&self, output_len: usize) -> Result<(), PipelineError> {
        if output_len != self.labels.len() {
            return Err(PipelineError::Configuration(format!(
                "model produces {output_len} scores but the vocabulary has {} labels",
                self.labels.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_lines_trims_and_skips_blanks() {
        let vocab = LabelVocabulary::parse("tench\n  goldfish \n\n\ngreat white shark\n").unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get(0), Some("tench"));
        assert_eq!(vocab.get(1), Some("goldfish"));
        assert_eq!(vocab.get(2), Some("great white shark"));
        assert_eq!(vocab.get(3), None);
    }

    #[test]
    fn test_parse_json_array() {
        let vocab =
            LabelVocabulary::parse("[\n  \"tench\",\n  \"goldfish\",\n  \"tiger shark\"\n]\n")
                .unwrap();
        assert_eq!(vocab.labels(), &["tench", "goldfish", "tiger shark"]);
    }

    #[test]
    fn test_parse_crlf_lines() {
        let vocab = LabelVocabulary::parse("cat\r\ndog\r\n").unwrap();
        assert_eq!(vocab.labels(), &["cat", "dog"]);
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("\n  \n\t\n")]
    #[case::empty_json("[]")]
    fn test_empty_vocabulary_rejected(#[case] text: &str) {
        assert!(matches!(
            LabelVocabulary::parse(text),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            LabelVocabulary::parse("[\"cat\", 3]"),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        fs::write(&path, "cat\ndog\nbird\n").unwrap();
        let vocab = LabelVocabulary::load(&path).unwrap();
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_configuration_error() {
        let result = LabelVocabulary::load(Path::new("/nonexistent/labels.json"));
        match result {
            Err(PipelineError::Configuration(reason)) => {
                assert!(reason.contains("/nonexistent/labels.json"))
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_ensure_matches() {
        let vocab = LabelVocabulary::parse("a\nb\nc").unwrap();
        assert!(vocab.ensure_matches(3).is_ok());
        assert!(matches!(
            vocab.ensure_matches(1000),
            Err(PipelineError::Configuration(_))
        ));
    }
}
