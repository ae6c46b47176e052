//! The closed set of tree mutations and the log of applied batches.

pub mod apply;
pub mod diff;

use serde::{Deserialize, Serialize};

use crate::model::{FormatFlags, NodeId, SpanData};

pub use diff::{DiffOp, TextDiff};

/// Partial replacement of a span's payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<FormatFlags>,
}

impl SpanPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            flags: None,
        }
    }
}

/// A discrete, replayable tree mutation.
///
/// After construction the tree changes only by applying actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Insert a span into block `target_id`, after sibling `after_id` or first
    NewSpan {
        target_id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_id: Option<NodeId>,
        content: SpanData,
    },
    /// Patch an existing span
    UpdateSpan {
        target_id: NodeId,
        value: SpanPatch,
        /// Text diff for consumers that want it; never serialized
        #[serde(skip)]
        diffs: Option<TextDiff>,
    },
    /// Insert a block under `target_id`, after sibling `after_id` or first
    NewBlock {
        target_id: NodeId,
        new_id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_id: Option<NodeId>,
        spans: Vec<SpanData>,
    },
    /// Remove a node and its subtree
    Delete { target_id: NodeId },
}

impl Action {
    pub fn target_id(&self) -> &NodeId {
        match self {
            Action::NewSpan { target_id, .. }
            | Action::UpdateSpan { target_id, .. }
            | Action::NewBlock { target_id, .. }
            | Action::Delete { target_id } => target_id,
        }
    }

    pub fn update_content(target_id: impl Into<NodeId>, content: impl Into<String>) -> Self {
        Action::UpdateSpan {
            target_id: target_id.into(),
            value: SpanPatch::content(content),
            diffs: None,
        }
    }

    pub fn delete(target_id: impl Into<NodeId>) -> Self {
        Action::Delete {
            target_id: target_id.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::NewSpan { .. } => "new-span",
            Action::UpdateSpan { .. } => "update-span",
            Action::NewBlock { .. } => "new-block",
            Action::Delete { .. } => "delete",
        }
    }
}

/// One committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Tree version produced by this batch
    pub version: u64,
    pub actions: Vec<Action>,
}

/// Ordered feed of every committed batch, for history and replication
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLog {
    batches: Vec<Batch>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, version: u64, actions: Vec<Action>) {
        self.batches.push(Batch { version, actions });
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn last(&self) -> Option<&Batch> {
        self.batches.last()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Hand the recorded batches to a consumer, leaving the log empty
    pub fn drain(&mut self) -> Vec<Batch> {
        std::mem::take(&mut self.batches)
    }
}
