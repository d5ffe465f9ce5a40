//! Line diffs between expected and actual text
//!
//! Lines keep their terminators and are aligned on a longest common
//! subsequence, so a single changed line shows up as one removal and one
//! addition instead of shifting everything after it.

use std::fmt;

use serde::{Serialize, Serializer};

/// One line of a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// Present in both
    Unchanged(String),
    /// Only in the expected text
    Removed(String),
    /// Only in the actual text
    Added(String),
}

impl DiffLine {
    /// Two-character prefix: `"  "`, `"- "` or `"+ "`
    #[must_use]
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Unchanged(_) => "  ",
            Self::Removed(_) => "- ",
            Self::Added(_) => "+ ",
        }
    }

    /// Line text including its terminator
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Unchanged(text) | Self::Removed(text) | Self::Added(text) => text,
        }
    }

    /// Whether the line differs between the two sides
    #[must_use]
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.marker(), self.text())
    }
}

impl Serialize for DiffLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Diff `expected` against `actual` line by line
#[must_use]
pub fn diff_lines(expected: &str, actual: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = expected.split_inclusive('\n').collect();
    let new: Vec<&str> = actual.split_inclusive('\n').collect();
    let (n, m) = (old.len(), new.len());

    // common[i][j]: LCS length of old[i..] and new[j..]
    let mut common = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            common[i][j] = if old[i] == new[j] {
                common[i + 1][j + 1] + 1
            } else {
                common[i + 1][j].max(common[i][j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            lines.push(DiffLine::Unchanged(old[i].to_string()));
            i += 1;
            j += 1;
        } else if common[i + 1][j] >= common[i][j + 1] {
            lines.push(DiffLine::Removed(old[i].to_string()));
            i += 1;
        } else {
            lines.push(DiffLine::Added(new[j].to_string()));
            j += 1;
        }
    }
    lines.extend(old[i..].iter().map(|line| DiffLine::Removed((*line).to_string())));
    lines.extend(new[j..].iter().map(|line| DiffLine::Added((*line).to_string())));
    lines
}
