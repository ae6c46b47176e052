use crate::model::NodeId;

/// Failures of tree operations and action batches.
///
/// Surface drift is deliberately absent: the reconciliation engine repairs it
/// by emitting ordinary actions and never reports it to callers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditorError {
    /// An operation would break the tree's link invariants
    #[error("Structural violation: {0}")]
    StructuralViolation(String),
    /// An action names an id that is not in the tree
    #[error("Unresolved target: {0}")]
    UnresolvedTarget(NodeId),
    /// A plugin refused the batch before it was applied
    #[error("Batch vetoed by plugin {plugin}")]
    Vetoed { plugin: String },
}

impl EditorError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::StructuralViolation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;
