//! Per-fragment results and episode reports

mod diff;

pub use diff::{diff_lines, DiffLine};

use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one fragment
///
/// Only `index` is always set; the rest is filled in when the fragment's
/// output or error did not match the lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockResult {
    /// 1-based position of the fragment in the document
    #[serde(rename = "code_block")]
    pub index: usize,
    /// Fragment source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Output the lesson claims
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    /// Output the fragment produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<String>,
    /// Expected against actual output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_diff: Option<Vec<DiffLine>>,
    /// Error kind the lesson claims
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<String>,
    /// Error kind the fragment raised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_error: Option<String>,
    /// Expected against actual error kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_diff: Option<Vec<DiffLine>>,
}

impl BlockResult {
    /// Result for a fragment that matched
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Record an output mismatch
    pub fn record_output(&mut self, code: &str, expected: &str, actual: Option<&str>) {
        self.code = Some(code.to_string());
        self.expected_output = Some(expected.to_string());
        self.actual_output = actual.map(str::to_string);
        self.output_diff = Some(diff_lines(expected, actual.unwrap_or("")));
    }

    /// Record an error mismatch
    pub fn record_error(&mut self, code: &str, expected: &str, actual: Option<&str>) {
        self.code = Some(code.to_string());
        self.expected_error = Some(expected.to_string());
        self.actual_error = actual.map(str::to_string);
        self.error_diff = Some(diff_lines(expected, actual.unwrap_or("")));
    }

    /// Whether anything failed to match
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        self.output_diff.is_some() || self.error_diff.is_some()
    }
}

/// Results for every fragment of one document, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EpisodeReport {
    blocks: Vec<BlockResult>,
}

impl EpisodeReport {
    /// Empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next fragment's result
    pub fn push(&mut self, block: BlockResult) {
        self.blocks.push(block);
    }

    /// All results
    #[must_use]
    pub fn blocks(&self) -> &[BlockResult] {
        &self.blocks
    }

    /// Number of fragments checked
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the document had no fragments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Results that did not match
    pub fn mismatches(&self) -> impl Iterator<Item = &BlockResult> {
        self.blocks.iter().filter(|block| block.is_mismatch())
    }

    /// Whether every fragment matched
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches().next().is_none()
    }

    /// Log the report: every fragment index at info, mismatching code and
    /// diffs at warn
    pub fn log(&self) {
        for block in &self.blocks {
            info!("code_block: {}", block.index);
            if let Some(code) = &block.code {
                warn!("code");
                for line in code.lines() {
                    warn!("    {line}");
                }
            }
            for (name, diff) in [
                ("output_diff", &block.output_diff),
                ("error_diff", &block.error_diff),
            ] {
                if let Some(lines) = diff {
                    warn!("{name}");
                    for line in lines {
                        warn!("    {}", line.to_string().trim_end());
                    }
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a EpisodeReport {
    type Item = &'a BlockResult;
    type IntoIter = std::slice::Iter<'a, BlockResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_block_serializes_index_only() {
        let json = serde_json::to_string(&BlockResult::new(3)).unwrap();
        assert_eq!(json, r#"{"code_block":3}"#);
    }

    #[test]
    fn test_record_output_mismatch() {
        let mut block = BlockResult::new(1);
        block.record_output("3 + 5", "9", Some("8"));
        assert!(block.is_mismatch());
        assert_eq!(block.code.as_deref(), Some("3 + 5"));
        let diff: Vec<String> = block
            .output_diff
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(diff, vec!["- 9", "+ 8"]);
    }

    #[test]
    fn test_record_error_with_absent_actual() {
        let mut block = BlockResult::new(2);
        block.record_error("x", "NameError", None);
        assert_eq!(block.actual_error, None);
        assert_eq!(block.error_diff.unwrap(), vec![DiffLine::Removed("NameError".to_string())]);
    }

    #[test]
    fn test_report_mismatches() {
        let mut report = EpisodeReport::new();
        report.push(BlockResult::new(1));
        let mut bad = BlockResult::new(2);
        bad.record_output("1", "2", Some("1"));
        report.push(bad);
        assert_eq!(report.len(), 2);
        assert!(!report.passed());
        assert_eq!(report.mismatches().map(|b| b.index).collect::<Vec<_>>(), vec![2]);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.is_array());
        assert_eq!(json[1]["expected_output"], "2");
    }
}
