//! In-memory model of the editing surface.
//!
//! The surface is what the user actually edits: a tree of text nodes and
//! elements that a host mirrors to its real widget (a DOM, a terminal buffer).
//! Its shape is owned by the renderer and by the user's input. The core only
//! reads it, removes stray nodes from it, and moves its selection.
//!
//! Surface nodes that render a model node carry a back-reference to that
//! node's id. Back-references live in a side table and never own anything;
//! a surface node may outlive the model node it names and vice versa.

pub mod render;

use std::collections::{BTreeMap, HashMap};

use crate::model::NodeId;

pub use render::{BlockRenderer, Renderer};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceNodeId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceNodeKind {
    Text(String),
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceNode {
    pub kind: SurfaceNodeKind,
    parent: Option<SurfaceNodeId>,
    children: Vec<SurfaceNodeId>,
}

/// A position inside a surface node (byte offset for text nodes)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfacePoint {
    pub node: SurfaceNodeId,
    pub offset: usize,
}

/// The surface selection; collapsed when both ends coincide
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceRange {
    pub start: SurfacePoint,
    pub end: SurfacePoint,
}

impl SurfaceRange {
    pub fn caret(node: SurfaceNodeId, offset: usize) -> Self {
        let point = SurfacePoint { node, offset };
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Default)]
pub struct SurfaceTree {
    nodes: HashMap<SurfaceNodeId, SurfaceNode>,
    next_id: u64,
    root: Option<SurfaceNodeId>,
    back_refs: HashMap<SurfaceNodeId, NodeId>,
    tracked: HashMap<NodeId, SurfaceNodeId>,
    selection: Option<SurfaceRange>,
}

impl SurfaceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<SurfaceNodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: SurfaceNodeId) {
        self.root = Some(root);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> SurfaceNodeId {
        self.create(SurfaceNodeKind::Text(text.into()))
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> SurfaceNodeId {
        self.create(SurfaceNodeKind::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
        })
    }

    fn create(&mut self, kind: SurfaceNodeKind) -> SurfaceNodeId {
        self.next_id += 1;
        let id = SurfaceNodeId(self.next_id);
        self.nodes.insert(
            id,
            SurfaceNode {
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    pub fn get(&self, id: SurfaceNodeId) -> Option<&SurfaceNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: SurfaceNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn parent(&self, id: SurfaceNodeId) -> Option<SurfaceNodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: SurfaceNodeId) -> &[SurfaceNodeId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn is_text(&self, id: SurfaceNodeId) -> bool {
        matches!(
            self.nodes.get(&id).map(|node| &node.kind),
            Some(SurfaceNodeKind::Text(_))
        )
    }

    /// Own text of a text node
    pub fn text(&self, id: SurfaceNodeId) -> Option<&str> {
        match &self.nodes.get(&id)?.kind {
            SurfaceNodeKind::Text(text) => Some(text),
            SurfaceNodeKind::Element { .. } => None,
        }
    }

    /// Text of a node and all its descendants
    pub fn text_content(&self, id: SurfaceNodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: SurfaceNodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            SurfaceNodeKind::Text(text) => out.push_str(text),
            SurfaceNodeKind::Element { .. } => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn set_text(&mut self, id: SurfaceNodeId, text: impl Into<String>) -> bool {
        match self.nodes.get_mut(&id).map(|node| &mut node.kind) {
            Some(SurfaceNodeKind::Text(current)) => {
                *current = text.into();
                true
            }
            _ => false,
        }
    }

    pub fn tag(&self, id: SurfaceNodeId) -> Option<&str> {
        match &self.nodes.get(&id)?.kind {
            SurfaceNodeKind::Element { tag, .. } => Some(tag),
            SurfaceNodeKind::Text(_) => None,
        }
    }

    pub fn attribute(&self, id: SurfaceNodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(&id)?.kind {
            SurfaceNodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            SurfaceNodeKind::Text(_) => None,
        }
    }

    pub fn set_attribute(&mut self, id: SurfaceNodeId, name: &str, value: impl Into<String>) {
        if let Some(SurfaceNodeKind::Element { attributes, .. }) =
            self.nodes.get_mut(&id).map(|node| &mut node.kind)
        {
            attributes.insert(name.to_string(), value.into());
        }
    }

    /// Append `child` to `parent`, detaching it from its current parent first
    pub fn append_child(&mut self, parent: SurfaceNodeId, child: SurfaceNodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `before`, or at the end
    pub fn insert_before(
        &mut self,
        parent: SurfaceNodeId,
        child: SurfaceNodeId,
        before: Option<SurfaceNodeId>,
    ) {
        if parent == child || !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child)
        {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&parent) {
            let index = before
                .and_then(|b| node.children.iter().position(|c| *c == b))
                .unwrap_or(node.children.len());
            node.children.insert(index, child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    /// Unlink `id` from its parent; the node and its back-reference survive
    pub fn detach(&mut self, id: SurfaceNodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }

    /// Detach `id` and drop it with its subtree and back-references
    pub fn remove(&mut self, id: SurfaceNodeId) {
        self.detach(id);
        let mut doomed = vec![id];
        while let Some(next) = doomed.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                doomed.extend(node.children);
            }
            self.unbind(next);
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    /// Make `desired` the exact child list of `parent`.
    ///
    /// Previous children that are not kept are removed from the surface.
    pub fn replace_children(&mut self, parent: SurfaceNodeId, desired: &[SurfaceNodeId]) {
        let previous = self.children(parent).to_vec();
        for child in previous {
            if !desired.contains(&child) {
                self.remove(child);
            }
        }
        for child in desired {
            self.detach(*child);
        }
        for child in desired {
            self.append_child(parent, *child);
        }
    }

    /// Tag `surface` as rendering the model node `model`
    pub fn bind(&mut self, surface: SurfaceNodeId, model: NodeId) {
        if let Some(previous) = self.tracked.insert(model.clone(), surface)
            && previous != surface
        {
            self.back_refs.remove(&previous);
        }
        if let Some(old_model) = self.back_refs.insert(surface, model.clone())
            && old_model != model
            && self.tracked.get(&old_model) == Some(&surface)
        {
            self.tracked.remove(&old_model);
        }
    }

    pub fn unbind(&mut self, surface: SurfaceNodeId) {
        if let Some(model) = self.back_refs.remove(&surface)
            && self.tracked.get(&model) == Some(&surface)
        {
            self.tracked.remove(&model);
        }
    }

    /// Model node rendered by exactly this surface node
    pub fn back_ref(&self, surface: SurfaceNodeId) -> Option<&NodeId> {
        self.back_refs.get(&surface)
    }

    /// Model node owning a surface point: the node's own back-reference, or
    /// for a bare text node inside a tagged element, the element's
    pub fn owner_of(&self, surface: SurfaceNodeId) -> Option<&NodeId> {
        if let Some(model) = self.back_refs.get(&surface) {
            return Some(model);
        }
        if self.is_text(surface) {
            return self.parent(surface).and_then(|p| self.back_refs.get(&p));
        }
        None
    }

    /// Surface node currently rendering `model`
    pub fn lookup(&self, model: &NodeId) -> Option<SurfaceNodeId> {
        self.tracked.get(model).copied()
    }

    /// Every tracked `(model id, surface node)` pair, in no particular order
    pub fn tracked(&self) -> impl Iterator<Item = (&NodeId, SurfaceNodeId)> {
        self.tracked.iter().map(|(model, surface)| (model, *surface))
    }

    /// Remove every tracked surface node whose model id fails `keep`
    pub fn retain_tracked(&mut self, mut keep: impl FnMut(&NodeId) -> bool) {
        let stale: Vec<SurfaceNodeId> = self
            .tracked
            .iter()
            .filter(|(model, _)| !keep(model))
            .map(|(_, surface)| *surface)
            .collect();
        for surface in stale {
            self.remove(surface);
        }
    }

    pub fn selection(&self) -> Option<SurfaceRange> {
        self.selection
    }

    pub fn set_selection(&mut self, range: Option<SurfaceRange>) {
        self.selection = range;
    }

    pub fn set_caret(&mut self, node: SurfaceNodeId, offset: usize) {
        self.selection = Some(SurfaceRange::caret(node, offset));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Default typing behaviour: splice `text` in at a collapsed caret inside
    /// a text node and move the caret past it
    pub fn type_text(&mut self, text: &str) -> bool {
        let Some(range) = self.selection.filter(SurfaceRange::is_collapsed) else {
            return false;
        };
        let Some(current) = self.text(range.start.node) else {
            return false;
        };
        let at = floor_char_boundary(current, range.start.offset);
        let mut updated = current.to_string();
        updated.insert_str(at, text);
        self.set_text(range.start.node, updated);
        self.set_caret(range.start.node, at + text.len());
        true
    }

    /// Default backspace behaviour inside a single text node
    pub fn delete_backward(&mut self) -> bool {
        let Some(range) = self.selection.filter(SurfaceRange::is_collapsed) else {
            return false;
        };
        let Some(current) = self.text(range.start.node) else {
            return false;
        };
        let at = floor_char_boundary(current, range.start.offset);
        let Some((start, _)) = current[..at].char_indices().next_back() else {
            return false;
        };
        let mut updated = current.to_string();
        updated.replace_range(start..at, "");
        self.set_text(range.start.node, updated);
        self.set_caret(range.start.node, start);
        true
    }

    /// Indented rendering of the attached surface, for tests and tooling
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.dump_node(root, 0, &mut out);
        }
        out
    }

    fn dump_node(&self, id: SurfaceNodeId, depth: usize, out: &mut String) {
        use std::fmt::Write;

        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let _ = write!(out, "{}", "  ".repeat(depth));
        match &node.kind {
            SurfaceNodeKind::Text(text) => {
                let _ = write!(out, "{text:?}");
            }
            SurfaceNodeKind::Element { tag, attributes } => {
                let _ = write!(out, "{tag}");
                for (name, value) in attributes {
                    if name == "class" {
                        let _ = write!(out, ".{value}");
                    } else {
                        let _ = write!(out, "[{name}={value}]");
                    }
                }
            }
        }
        if let Some(model) = self.back_refs.get(&id) {
            let _ = write!(out, " <{model}>");
        }
        out.push('\n');
        for child in &node.children {
            self.dump_node(*child, depth + 1, out);
        }
    }
}

/// Largest char boundary of `text` not after `offset`
pub(crate) fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut at = offset.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}
