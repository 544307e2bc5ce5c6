//! Pipeline output.

use serde::{Deserialize, Serialize};

use crate::types::item::CompleteItem;

/// Outcome of one pipeline run.
///
/// `all_ids` lists every id the traversal produced, before any filtering,
/// so callers can track listings across runs and feed the next skip set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub all_ids: Vec<String>,
    pub validated: Vec<CompleteItem>,
    pub rejected: Vec<CompleteItem>,
}

impl PipelineResult {
    /// Empty result, as returned for an aborted run.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Partition completed items into validated and rejected, keeping order.
    pub fn from_items(all_ids: Vec<String>, items: impl IntoIterator<Item = CompleteItem>) -> Self {
        let (validated, rejected) = items.into_iter().partition(CompleteItem::is_validated);
        Self {
            all_ids,
            validated,
            rejected,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty() && self.validated.is_empty() && self.rejected.is_empty()
    }

    /// Rejected items a classifier turned down.
    pub fn rejected_by_ai(&self) -> impl Iterator<Item = &CompleteItem> {
        self.rejected.iter().filter(|item| item.is_rejected_by_ai())
    }

    /// Rejected items whose detail fetch failed.
    pub fn errored(&self) -> impl Iterator<Item = &CompleteItem> {
        self.rejected.iter().filter(|item| item.has_error())
    }

    /// Append another result (used when merging several sites).
    pub fn extend(&mut self, other: PipelineResult) {
        self.all_ids.extend(other.all_ids);
        self.validated.extend(other.validated);
        self.rejected.extend(other.rejected);
    }
}
