//! Classifier verdicts.
//!
//! Classifiers answer with `1` (yes), `-1` (no) or `0` (don't know).
//! Only an explicit `-1` ever removes an item.

use serde::{Deserialize, Serialize};

/// Token a classifier uses to reject an item.
pub const REJECT_TOKEN: &str = "-1";

/// Token a classifier uses to accept an item.
pub const ACCEPT_TOKEN: &str = "1";

/// Three-state verdict for one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    Reject,
    #[default]
    Unknown,
}

impl Verdict {
    /// Parse a single answer token. Anything but `1` or `-1` is `Unknown`.
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            REJECT_TOKEN => Self::Reject,
            ACCEPT_TOKEN => Self::Accept,
            _ => Self::Unknown,
        }
    }

    /// Whether the item survives filtering.
    pub fn keeps(self) -> bool {
        !matches!(self, Self::Reject)
    }
}

/// Parse a comma-separated answer into positional verdicts for `expected` items.
///
/// Missing trailing tokens become `Unknown`; surplus tokens are dropped.
pub fn parse_batch_answer(answer: &str, expected: usize) -> Vec<Verdict> {
    let mut verdicts: Vec<Verdict> = answer
        .split(',')
        .take(expected)
        .map(Verdict::parse)
        .collect();
    verdicts.resize(expected, Verdict::Unknown);
    verdicts
}
