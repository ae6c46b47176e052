use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique, immutable identifier of a tree node.
///
/// Ids are the only way anything outside the tree addresses a node. They are
/// never reused, even after the node they named has been deleted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the content container owned by the block `self`
    pub fn content_of(&self) -> NodeId {
        NodeId(format!("{}#content", self.0))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Allocates ids for nodes created by edits.
///
/// Pluggable so a replication layer or a history replay can hand out
/// deterministic ids instead of random ones.
pub trait IdGenerator {
    fn mk_span_id(&mut self) -> NodeId;
    fn mk_block_id(&mut self) -> NodeId;
}

/// Default generator backed by random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn mk_span_id(&mut self) -> NodeId {
        NodeId(format!("span-{}", uuid::Uuid::new_v4()))
    }

    fn mk_block_id(&mut self) -> NodeId {
        NodeId(format!("block-{}", uuid::Uuid::new_v4()))
    }
}

/// Deterministic generator producing `{prefix}s{n}` / `{prefix}b{n}`
#[derive(Debug, Default, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    fn bump(&mut self) -> u64 {
        let n = self.next.max(1);
        self.next = n + 1;
        n
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn mk_span_id(&mut self) -> NodeId {
        let n = self.bump();
        NodeId(format!("{}s{n}", self.prefix))
    }

    fn mk_block_id(&mut self) -> NodeId {
        let n = self.bump();
        NodeId(format!("{}b{n}", self.prefix))
    }
}
