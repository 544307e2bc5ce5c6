//! Listing stubs and completed items.

use serde::{Deserialize, Serialize};

/// Minimal reference to a listing, as discovered on a results page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStub {
    /// Listing identifier, unique per site (not enforced across pages)
    pub id: String,

    /// Display name shown on the results page
    pub name: String,
}

impl ItemStub {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Full detail returned by a page collaborator for one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub name: String,
    pub description: String,
}

impl ItemDetail {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Terminal artifact handed back to the caller.
///
/// `error` set means the detail fetch failed. `validated_by_ai == Some(false)`
/// means a classifier rejected it. Neither set means accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteItem {
    pub id: String,
    pub name: String,
    pub link: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_by_ai: Option<bool>,
}

impl CompleteItem {
    /// Accepted item built from a fetched detail.
    pub fn accepted(id: impl Into<String>, link: impl Into<String>, detail: ItemDetail) -> Self {
        Self {
            id: id.into(),
            name: detail.name,
            link: link.into(),
            description: detail.description,
            error: None,
            validated_by_ai: None,
        }
    }

    /// Item whose detail could not be fetched.
    pub fn failed(
        id: impl Into<String>,
        link: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            link: link.into(),
            description: String::new(),
            error: Some(reason.into()),
            validated_by_ai: None,
        }
    }

    /// Item rejected from its name alone, before any detail was fetched.
    pub fn rejected_from_stub(stub: ItemStub, link: impl Into<String>) -> Self {
        Self {
            id: stub.id,
            name: stub.name,
            link: link.into(),
            description: String::new(),
            error: None,
            validated_by_ai: Some(false),
        }
    }

    /// Mark as rejected by the classifier.
    pub fn with_ai_rejection(mut self) -> Self {
        self.validated_by_ai = Some(false);
        self
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_rejected_by_ai(&self) -> bool {
        self.validated_by_ai == Some(false)
    }

    /// No error and not rejected by a classifier.
    pub fn is_validated(&self) -> bool {
        !self.has_error() && !self.is_rejected_by_ai()
    }
}

/// What the detail stage produced for one stub.
///
/// Kept as a two-way result internally so the failure path stays explicit;
/// converted to the uniform [`CompleteItem`] shape at the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Extracted(CompleteItem),
    Failed {
        id: String,
        link: String,
        reason: String,
    },
}

impl DetailOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Extracted(item) => &item.id,
            Self::Failed { id, .. } => id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn into_item(self) -> CompleteItem {
        match self {
            Self::Extracted(item) => item,
            Self::Failed { id, link, reason } => CompleteItem::failed(id, link, reason),
        }
    }
}
