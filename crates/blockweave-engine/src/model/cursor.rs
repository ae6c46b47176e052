use serde::{Deserialize, Serialize};

use crate::model::NodeId;

/// Logical caret/selection, expressed in model ids and byte offsets
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CursorState {
    /// Caret inside a span
    Collapsed { target_id: NodeId, offset: usize },
    /// Range between two (possibly different) spans
    Open {
        start_id: NodeId,
        start_offset: usize,
        end_id: NodeId,
        end_offset: usize,
    },
    #[default]
    Undefined,
}

impl CursorState {
    pub fn collapsed(target_id: impl Into<NodeId>, offset: usize) -> Self {
        Self::Collapsed {
            target_id: target_id.into(),
            offset,
        }
    }

    pub fn open(
        start_id: impl Into<NodeId>,
        start_offset: usize,
        end_id: impl Into<NodeId>,
        end_offset: usize,
    ) -> Self {
        Self::Open {
            start_id: start_id.into(),
            start_offset,
            end_id: end_id.into(),
            end_offset,
        }
    }

    /// `(target, offset)` when the cursor is a caret
    pub fn as_collapsed(&self) -> Option<(&NodeId, usize)> {
        match self {
            Self::Collapsed { target_id, offset } => Some((target_id, *offset)),
            Self::Open { .. } | Self::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}
