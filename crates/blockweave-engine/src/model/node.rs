use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use xi_rope::Rope;

use crate::model::{FormatFlags, NodeId};

/// Tag of the document root element
pub const DOCUMENT: &str = "document";
/// Tag of a block element (one structural unit, e.g. a paragraph)
pub const BLOCK: &str = "block";
/// Tag of the element inside every block that holds its spans
pub const BLOCK_CONTENT: &str = "block-content";

/// Linkage shared by every node variant.
///
/// All links are ids resolved through the owning tree's index; a node never
/// owns its neighbours.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub parent: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

/// Element variant: a named container with attributes and ordered children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub node_name: String,
    pub attributes: BTreeMap<String, String>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub child_count: usize,
}

impl Element {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            attributes: BTreeMap::new(),
            first_child: None,
            last_child: None,
            child_count: 0,
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }
}

/// Text-run variant. Spans never have children.
#[derive(Clone)]
pub struct Span {
    buffer: Rope,
    pub flags: FormatFlags,
}

impl Span {
    pub fn new(content: &str, flags: FormatFlags) -> Self {
        Self {
            buffer: Rope::from(content),
            flags,
        }
    }

    /// Length of the buffer in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn content(&self) -> String {
        String::from(&self.buffer)
    }

    pub fn buffer(&self) -> &Rope {
        &self.buffer
    }

    pub fn set_content(&mut self, content: &str) {
        self.buffer = Rope::from(content);
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags && String::from(&self.buffer) == String::from(&other.buffer)
    }
}

impl Eq for Span {}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("content", &self.content())
            .field("flags", &self.flags)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Span(Span),
}

/// A node of the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    id: NodeId,
    pub(crate) links: Links,
    pub(crate) kind: NodeKind,
}

impl TreeNode {
    pub fn element(id: NodeId, node_name: impl Into<String>) -> Self {
        Self {
            id,
            links: Links::default(),
            kind: NodeKind::Element(Element::new(node_name)),
        }
    }

    pub fn span(id: NodeId, content: &str, flags: FormatFlags) -> Self {
        Self {
            id,
            links: Links::default(),
            kind: NodeKind::Span(Span::new(content, flags)),
        }
    }

    /// Build a detached block element carrying a `type` attribute
    pub fn block(id: NodeId, block_type: &str) -> Self {
        let mut node = Self::element(id, BLOCK);
        if let NodeKind::Element(element) = &mut node.kind {
            element.set_attribute("type", block_type);
        }
        node
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.links.parent.as_ref()
    }

    pub fn prev_sibling(&self) -> Option<&NodeId> {
        self.links.prev_sibling.as_ref()
    }

    pub fn next_sibling(&self) -> Option<&NodeId> {
        self.links.next_sibling.as_ref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Span(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Span(_) => None,
        }
    }

    pub fn as_span(&self) -> Option<&Span> {
        match &self.kind {
            NodeKind::Span(span) => Some(span),
            NodeKind::Element(_) => None,
        }
    }

    pub fn as_span_mut(&mut self) -> Option<&mut Span> {
        match &mut self.kind {
            NodeKind::Span(span) => Some(span),
            NodeKind::Element(_) => None,
        }
    }

    pub fn is_block(&self) -> bool {
        self.node_name() == Some(BLOCK)
    }

    pub fn node_name(&self) -> Option<&str> {
        self.as_element().map(|element| element.node_name.as_str())
    }

    /// Snapshot of a span node as action payload
    pub fn span_data(&self) -> Option<SpanData> {
        self.as_span().map(|span| SpanData {
            id: self.id.clone(),
            flags: span.flags,
            content: span.content(),
        })
    }
}

/// Plain description of a span, as carried by `new-span` and `new-block`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanData {
    pub id: NodeId,
    #[serde(default)]
    pub flags: FormatFlags,
    pub content: String,
}

impl SpanData {
    pub fn new(id: impl Into<NodeId>, content: impl Into<String>, flags: FormatFlags) -> Self {
        Self {
            id: id.into(),
            flags,
            content: content.into(),
        }
    }

    pub(crate) fn to_node(&self) -> TreeNode {
        TreeNode::span(self.id.clone(), &self.content, self.flags)
    }
}
