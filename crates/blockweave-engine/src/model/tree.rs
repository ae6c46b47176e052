use std::collections::{HashMap, HashSet};

use crate::error::{EditorError, Result};
use crate::model::node::{BLOCK_CONTENT, DOCUMENT};
use crate::model::{CursorState, ListenerId, NodeId, NodeKind, Observable, TreeNode};

/// Original state of every node touched by the batch in flight.
///
/// `None` means the node did not exist before the batch.
#[derive(Debug, Default)]
struct Journal {
    saved: HashMap<NodeId, Option<TreeNode>>,
    retired: Vec<NodeId>,
}

/// Owning container of the document.
///
/// Nodes live in an id index and point at each other by id, so lookups are
/// O(1) and no node owns another. Every structural helper keeps the
/// parent/child/sibling links consistent or fails with
/// [`EditorError::StructuralViolation`] before touching anything.
#[derive(Debug)]
pub struct DocumentTree {
    root: NodeId,
    nodes: HashMap<NodeId, TreeNode>,
    /// Ids of deleted nodes; never handed out again
    retired: HashSet<NodeId>,
    cursor: Observable<CursorState>,
    /// Incremented once per committed action batch
    version: u64,
    journal: Option<Journal>,
}

impl DocumentTree {
    /// Create an empty document whose root element has the given id
    pub fn new(root_id: impl Into<NodeId>) -> Self {
        let root = TreeNode::element(root_id.into(), DOCUMENT);
        let root_id = root.id().clone();
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), root);
        Self {
            root: root_id,
            nodes,
            retired: HashSet::new(),
            cursor: Observable::new(CursorState::Undefined),
            version: 0,
            journal: None,
        }
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn lookup_by_id(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether `id` was used by a node that has since been deleted
    pub fn is_retired(&self, id: &NodeId) -> bool {
        self.retired.contains(id)
    }

    pub fn cursor_state(&self) -> &CursorState {
        self.cursor.get()
    }

    /// Assign the cursor, notifying observers with `(new, old)`.
    ///
    /// This is the only tree field that may change outside an action batch.
    pub fn set_cursor_state(&mut self, state: CursorState) -> CursorState {
        log::debug!("cursor: {state:?}");
        self.cursor.set(state)
    }

    pub fn subscribe_cursor(
        &mut self,
        listener: impl FnMut(&CursorState, &CursorState) + 'static,
    ) -> ListenerId {
        self.cursor.subscribe(listener)
    }

    pub fn unsubscribe_cursor(&mut self, id: ListenerId) -> bool {
        self.cursor.unsubscribe(id)
    }

    /// Iterate the children of `id` by following sibling links
    pub fn children<'a>(&'a self, id: &NodeId) -> Children<'a> {
        let next = self
            .nodes
            .get(id)
            .and_then(|node| node.as_element())
            .and_then(|element| element.first_child.clone());
        Children { tree: self, next }
    }

    /// Position of `child` among the children of `parent`
    pub fn child_index(&self, parent: &NodeId, child: &NodeId) -> Option<usize> {
        self.children(parent).position(|node| node.id() == child)
    }

    /// All node ids in document order, root first
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root.clone()];
        while let Some(id) = stack.pop() {
            let children: Vec<NodeId> = self.children(&id).map(|c| c.id().clone()).collect();
            stack.extend(children.into_iter().rev());
            out.push(id);
        }
        out
    }

    /// The element of `block` that holds its spans
    pub fn content_of(&self, block: &NodeId) -> Option<&TreeNode> {
        self.children(block)
            .find(|child| child.node_name() == Some(BLOCK_CONTENT))
    }

    /// Spans of `block` in order
    pub fn spans_of(&self, block: &NodeId) -> Vec<&TreeNode> {
        match self.content_of(block) {
            Some(content) => self
                .children(content.id())
                .filter(|child| child.as_span().is_some())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Concatenated text of every span in `block`
    pub fn text_of(&self, block: &NodeId) -> String {
        self.spans_of(block)
            .iter()
            .filter_map(|node| node.as_span())
            .map(|span| span.content())
            .collect()
    }

    /// Closest block ancestor of `id`
    pub fn enclosing_block(&self, id: &NodeId) -> Option<&TreeNode> {
        let mut current = self.nodes.get(id)?.parent();
        while let Some(parent_id) = current {
            let parent = self.nodes.get(parent_id)?;
            if parent.is_block() {
                return Some(parent);
            }
            current = parent.parent();
        }
        None
    }

    /// Number of block ancestors of `id`
    pub fn block_level(&self, id: &NodeId) -> usize {
        let mut level = 0;
        let mut current = self.nodes.get(id).and_then(|node| node.parent());
        while let Some(parent_id) = current {
            let Some(parent) = self.nodes.get(parent_id) else {
                break;
            };
            if parent.is_block() {
                level += 1;
            }
            current = parent.parent();
        }
        level
    }

    /// Insert the detached node `child` as the `index`-th child of `parent`
    pub fn insert_child_at(
        &mut self,
        parent: &NodeId,
        index: usize,
        mut child: TreeNode,
    ) -> Result<()> {
        let child_id = child.id().clone();
        if child.links.parent.is_some()
            || child.links.prev_sibling.is_some()
            || child.links.next_sibling.is_some()
        {
            return Err(EditorError::structural(format!(
                "node {child_id} is already linked into a tree"
            )));
        }
        if let NodeKind::Element(element) = &child.kind
            && element.first_child.is_some()
        {
            return Err(EditorError::structural(format!(
                "element {child_id} must be inserted without children"
            )));
        }
        if self.nodes.contains_key(&child_id) || self.retired.contains(&child_id) {
            return Err(EditorError::structural(format!(
                "id {child_id} is already in use"
            )));
        }
        let parent_node = self
            .nodes
            .get(parent)
            .ok_or_else(|| EditorError::UnresolvedTarget(parent.clone()))?;
        let Some(parent_element) = parent_node.as_element() else {
            return Err(EditorError::structural(format!(
                "span {parent} cannot have children"
            )));
        };
        if index > parent_element.child_count {
            return Err(EditorError::structural(format!(
                "index {index} out of bounds for {parent} with {} children",
                parent_element.child_count
            )));
        }

        let prev = match index {
            0 => None,
            _ => self.children(parent).nth(index - 1).map(|n| n.id().clone()),
        };
        let next = match &prev {
            Some(prev_id) => self.nodes.get(prev_id).and_then(|n| n.links.next_sibling.clone()),
            None => parent_element.first_child.clone(),
        };

        child.links = crate::model::Links {
            parent: Some(parent.clone()),
            prev_sibling: prev.clone(),
            next_sibling: next.clone(),
        };
        self.journal_new(&child_id);
        self.nodes.insert(child_id.clone(), child);

        match &prev {
            Some(prev_id) => self.node_mut(prev_id)?.links.next_sibling = Some(child_id.clone()),
            None => self.element_mut(parent)?.first_child = Some(child_id.clone()),
        }
        match &next {
            Some(next_id) => self.node_mut(next_id)?.links.prev_sibling = Some(child_id.clone()),
            None => self.element_mut(parent)?.last_child = Some(child_id.clone()),
        }
        self.element_mut(parent)?.child_count += 1;
        Ok(())
    }

    /// Insert `child` right after the sibling `after`, or first when absent
    pub fn insert_after(
        &mut self,
        parent: &NodeId,
        after: Option<&NodeId>,
        child: TreeNode,
    ) -> Result<()> {
        let index = match after {
            None => 0,
            Some(after_id) => {
                let sibling = self
                    .nodes
                    .get(after_id)
                    .ok_or_else(|| EditorError::UnresolvedTarget(after_id.clone()))?;
                if sibling.parent() != Some(parent) {
                    return Err(EditorError::structural(format!(
                        "{after_id} is not a child of {parent}"
                    )));
                }
                self.child_index(parent, after_id).map_or(0, |i| i + 1)
            }
        };
        self.insert_child_at(parent, index, child)
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: &NodeId, child: TreeNode) -> Result<()> {
        let count = self
            .nodes
            .get(parent)
            .and_then(|node| node.as_element())
            .map(|element| element.child_count)
            .unwrap_or_default();
        self.insert_child_at(parent, count, child)
    }

    /// Unlink `child` from `parent` and drop it with its whole subtree.
    ///
    /// Returns the detached node. Its id and the ids of its descendants are
    /// retired.
    pub fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<TreeNode> {
        let node = self
            .nodes
            .get(child)
            .ok_or_else(|| EditorError::structural(format!("{child} is not in the tree")))?;
        if node.parent() != Some(parent) {
            return Err(EditorError::structural(format!(
                "{child} is not a child of {parent}"
            )));
        }
        let prev = node.links.prev_sibling.clone();
        let next = node.links.next_sibling.clone();

        match &prev {
            Some(prev_id) => self.node_mut(prev_id)?.links.next_sibling = next.clone(),
            None => self.element_mut(parent)?.first_child = next.clone(),
        }
        match &next {
            Some(next_id) => self.node_mut(next_id)?.links.prev_sibling = prev.clone(),
            None => self.element_mut(parent)?.last_child = prev.clone(),
        }
        let parent_element = self.element_mut(parent)?;
        parent_element.child_count = parent_element.child_count.saturating_sub(1);

        let mut doomed = vec![child.clone()];
        let mut i = 0;
        while i < doomed.len() {
            let children: Vec<NodeId> = self.children(&doomed[i]).map(|c| c.id().clone()).collect();
            doomed.extend(children);
            i += 1;
        }

        let mut removed = None;
        for id in doomed {
            self.journal_touch(&id);
            if let Some(node) = self.nodes.remove(&id) {
                if &id == child {
                    removed = Some(node);
                }
                self.retire(id);
            }
        }
        let mut removed =
            removed.ok_or_else(|| EditorError::structural(format!("{child} vanished")))?;
        removed.links = crate::model::Links::default();
        Ok(removed)
    }

    /// Mutable access to a span's payload
    pub(crate) fn span_mut(&mut self, id: &NodeId) -> Result<&mut crate::model::Span> {
        self.node_mut(id)?
            .as_span_mut()
            .ok_or_else(|| EditorError::structural(format!("{id} is not a span")))
    }

    pub(crate) fn element_mut(&mut self, id: &NodeId) -> Result<&mut crate::model::Element> {
        self.node_mut(id)?
            .as_element_mut()
            .ok_or_else(|| EditorError::structural(format!("{id} is not an element")))
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut TreeNode> {
        self.journal_touch(id);
        self.nodes
            .get_mut(id)
            .ok_or_else(|| EditorError::UnresolvedTarget(id.clone()))
    }

    fn journal_touch(&mut self, id: &NodeId) {
        if let Some(journal) = &mut self.journal
            && !journal.saved.contains_key(id)
        {
            journal.saved.insert(id.clone(), self.nodes.get(id).cloned());
        }
    }

    fn journal_new(&mut self, id: &NodeId) {
        if let Some(journal) = &mut self.journal {
            journal.saved.entry(id.clone()).or_insert(None);
        }
    }

    fn retire(&mut self, id: NodeId) {
        if let Some(journal) = &mut self.journal {
            journal.retired.push(id.clone());
        }
        self.retired.insert(id);
    }

    /// Start recording changes so they can be rolled back as a unit
    pub(crate) fn begin_batch(&mut self) {
        self.journal = Some(Journal::default());
        self.cursor.hold();
    }

    pub(crate) fn commit_batch(&mut self) {
        self.journal = None;
        self.version += 1;
        self.cursor.release();
    }

    /// Restore every node touched since [`DocumentTree::begin_batch`]
    pub(crate) fn rollback_batch(&mut self) {
        if let Some(journal) = self.journal.take() {
            for (id, original) in journal.saved {
                match original {
                    Some(node) => {
                        self.nodes.insert(id, node);
                    }
                    None => {
                        self.nodes.remove(&id);
                    }
                }
            }
            for id in journal.retired {
                self.retired.remove(&id);
            }
        }
        self.cursor.release_silently();
    }

    /// Verify the link structure: every non-root node appears exactly once in
    /// its parent's child chain, sibling links agree in both directions, and
    /// every indexed node is reachable from the root.
    pub fn check_invariants(&self) -> Result<()> {
        let limit = self.nodes.len();
        for (id, node) in &self.nodes {
            if id != node.id() {
                return Err(EditorError::structural(format!("index key {id} names {}", node.id())));
            }
            if let Some(element) = node.as_element() {
                let mut count = 0;
                let mut last = None;
                let mut cursor = element.first_child.clone();
                let mut prev: Option<NodeId> = None;
                while let Some(child_id) = cursor {
                    count += 1;
                    if count > limit {
                        return Err(EditorError::structural(format!("cycle under {id}")));
                    }
                    let child = self.nodes.get(&child_id).ok_or_else(|| {
                        EditorError::structural(format!("{id} links missing child {child_id}"))
                    })?;
                    if child.parent() != Some(id) {
                        return Err(EditorError::structural(format!(
                            "{child_id} is linked under {id} but names another parent"
                        )));
                    }
                    if child.links.prev_sibling != prev {
                        return Err(EditorError::structural(format!(
                            "{child_id} has inconsistent prev sibling"
                        )));
                    }
                    prev = Some(child_id.clone());
                    last = Some(child_id.clone());
                    cursor = child.links.next_sibling.clone();
                }
                if count != element.child_count || last != element.last_child {
                    return Err(EditorError::structural(format!(
                        "{id} child bookkeeping disagrees with its links"
                    )));
                }
            }
            match node.parent() {
                None if id != &self.root => {
                    return Err(EditorError::structural(format!("{id} has no parent")));
                }
                Some(parent) => {
                    let occurrences = self.children(parent).filter(|c| c.id() == id).count();
                    if occurrences != 1 {
                        return Err(EditorError::structural(format!(
                            "{id} appears {occurrences} times under {parent}"
                        )));
                    }
                }
                None => {}
            }
        }
        if self.preorder().len() != self.nodes.len() {
            return Err(EditorError::structural("unreachable nodes in index"));
        }
        Ok(())
    }

    /// Indented textual rendering of the tree, one node per line
    pub fn dump(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let mut stack = vec![(self.root.clone(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let indent = "  ".repeat(depth);
            match node.kind() {
                NodeKind::Element(element) => {
                    let _ = write!(out, "{indent}{} {id}", element.node_name);
                    for (key, value) in &element.attributes {
                        let _ = write!(out, " {key}={value}");
                    }
                    out.push('\n');
                }
                NodeKind::Span(span) => {
                    let _ = writeln!(
                        out,
                        "{indent}span {id} flags={} {:?}",
                        span.flags.bits(),
                        span.content()
                    );
                }
            }
            let children: Vec<NodeId> = self.children(&id).map(|c| c.id().clone()).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
        out
    }
}

/// Iterator over the children of an element via sibling links
pub struct Children<'a> {
    tree: &'a DocumentTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        let node = self.tree.nodes.get(&id)?;
        self.next = node.links.next_sibling.clone();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::BLOCK;
    use crate::model::{FormatFlags, SpanData};
    use pretty_assertions::assert_eq;

    fn span(id: &str, content: &str) -> TreeNode {
        TreeNode::span(NodeId::from(id), content, FormatFlags::empty())
    }

    fn tree_with_block() -> DocumentTree {
        let mut tree = DocumentTree::new("doc");
        let root = tree.root().clone();
        let block = NodeId::from("b1");
        tree.append_child(&root, TreeNode::block(block.clone(), "text"))
            .unwrap();
        tree.append_child(&block, TreeNode::element(block.content_of(), BLOCK_CONTENT))
            .unwrap();
        tree
    }

    #[test]
    fn test_insert_keeps_sibling_links_consistent() {
        // Given a block with an empty content container
        let mut tree = tree_with_block();
        let content = NodeId::from("b1").content_of();

        // When inserting at the end, the front and the middle
        tree.insert_child_at(&content, 0, span("s2", "b")).unwrap();
        tree.insert_child_at(&content, 0, span("s1", "a")).unwrap();
        tree.insert_child_at(&content, 2, span("s4", "d")).unwrap();
        tree.insert_child_at(&content, 2, span("s3", "c")).unwrap();

        // Then order and links agree
        let order: Vec<&str> = tree.children(&content).map(|n| n.id().as_str()).collect();
        assert_eq!(order, vec!["s1", "s2", "s3", "s4"]);
        assert_eq!(tree.text_of(&NodeId::from("b1")), "abcd");
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_rejects_linked_node() {
        let mut tree = tree_with_block();
        let content = NodeId::from("b1").content_of();
        let mut node = span("s1", "a");
        node.links.parent = Some(content.clone());

        let err = tree.insert_child_at(&content, 0, node).unwrap_err();

        assert!(matches!(err, EditorError::StructuralViolation(_)));
        assert_eq!(tree.children(&content).count(), 0);
    }

    #[test]
    fn test_insert_rejects_out_of_bounds_index_and_span_parent() {
        let mut tree = tree_with_block();
        let content = NodeId::from("b1").content_of();
        tree.append_child(&content, span("s1", "a")).unwrap();

        assert!(matches!(
            tree.insert_child_at(&content, 5, span("s2", "b")),
            Err(EditorError::StructuralViolation(_))
        ));
        assert!(matches!(
            tree.insert_child_at(&NodeId::from("s1"), 0, span("s3", "c")),
            Err(EditorError::StructuralViolation(_))
        ));
        assert!(matches!(
            tree.insert_child_at(&NodeId::from("nope"), 0, span("s4", "d")),
            Err(EditorError::UnresolvedTarget(_))
        ));
    }

    #[test]
    fn test_removed_ids_are_never_reused() {
        let mut tree = tree_with_block();
        let content = NodeId::from("b1").content_of();
        tree.append_child(&content, span("s1", "a")).unwrap();

        let removed = tree.remove_child(&content, &NodeId::from("s1")).unwrap();
        assert_eq!(removed.parent(), None);
        assert!(tree.is_retired(&NodeId::from("s1")));

        let err = tree.append_child(&content, span("s1", "again")).unwrap_err();
        assert!(matches!(err, EditorError::StructuralViolation(_)));
    }

    #[test]
    fn test_remove_child_drops_whole_subtree() {
        let mut tree = tree_with_block();
        let content = NodeId::from("b1").content_of();
        tree.append_child(&content, span("s1", "a")).unwrap();
        let root = tree.root().clone();

        tree.remove_child(&root, &NodeId::from("b1")).unwrap();

        assert!(tree.lookup_by_id(&NodeId::from("s1")).is_none());
        assert!(tree.lookup_by_id(&content).is_none());
        assert_eq!(tree.len(), 1);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_child_requires_membership() {
        let mut tree = tree_with_block();
        let root = tree.root().clone();
        let content = NodeId::from("b1").content_of();

        let err = tree.remove_child(&root, &content).unwrap_err();
        assert!(matches!(err, EditorError::StructuralViolation(_)));
        let err = tree.remove_child(&root, &NodeId::from("ghost")).unwrap_err();
        assert!(matches!(err, EditorError::StructuralViolation(_)));
    }

    #[test]
    fn test_block_level_counts_block_ancestors() {
        let mut tree = tree_with_block();
        let outer = NodeId::from("b1");
        let inner = NodeId::from("b2");
        tree.append_child(&outer, TreeNode::block(inner.clone(), "text"))
            .unwrap();
        tree.append_child(&inner, TreeNode::element(inner.content_of(), BLOCK_CONTENT))
            .unwrap();
        tree.append_child(&inner.content_of(), span("s1", "x"))
            .unwrap();

        assert_eq!(tree.block_level(tree.root()), 0);
        assert_eq!(tree.block_level(&outer), 0);
        assert_eq!(tree.block_level(&inner), 1);
        assert_eq!(tree.block_level(&NodeId::from("s1")), 2);
        assert_eq!(tree.enclosing_block(&NodeId::from("s1")).unwrap().id(), &inner);
        assert_eq!(tree.lookup_by_id(&inner).unwrap().node_name(), Some(BLOCK));
    }

    #[test]
    fn test_rollback_restores_tree_and_retired_ids() {
        let mut tree = tree_with_block();
        let content = NodeId::from("b1").content_of();
        tree.append_child(&content, span("s1", "a")).unwrap();
        let before = tree.dump();

        tree.begin_batch();
        tree.append_child(&content, span("s2", "b")).unwrap();
        tree.remove_child(&content, &NodeId::from("s1")).unwrap();
        tree.span_mut(&NodeId::from("s2")).unwrap().set_content("zz");
        tree.rollback_batch();

        assert_eq!(tree.dump(), before);
        assert!(!tree.is_retired(&NodeId::from("s1")));
        assert_eq!(tree.version(), 0);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_dump_lists_nodes_in_document_order() {
        let mut tree = tree_with_block();
        let content = NodeId::from("b1").content_of();
        tree.append_child(&content, SpanData::new("s1", "ab", FormatFlags::BOLD).to_node())
            .unwrap();

        insta::assert_snapshot!(tree.dump(), @r#"
        document doc
          block b1 type=text
            block-content b1#content
              span s1 flags=1 "ab"
        "#);
    }
}
