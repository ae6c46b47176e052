//! Turns surface drift into actions.
//!
//! The surface is edited by the user before the model hears about it. A
//! reconciliation pass compares the two and emits the actions that make
//! the model match, plus the surface nodes the model cannot absorb.

use std::collections::HashSet;

use crate::actions::{Action, SpanPatch, TextDiff};
use crate::model::{CursorState, DocumentTree, FormatFlags, IdGenerator, NodeId, NodeKind, SpanData, TreeNode};
use crate::surface::render::FLAGS_HINT;
use crate::surface::{SurfaceNodeId, SurfaceTree};

/// Result of one reconciliation pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub actions: Vec<Action>,
    /// Untracked surface nodes inside a content container. The caller removes
    /// them; when they held text, an equivalent span is among `actions`.
    pub stray_nodes: Vec<SurfaceNodeId>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.stray_nodes.is_empty()
    }
}

/// Which model nodes a pass inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Only the node under a collapsed cursor
    Narrow { target: NodeId, seed: Option<usize> },
    /// Every model node that has a surface node, in document order
    Wide,
}

impl Scope {
    /// Narrow under a collapsed cursor, wide otherwise. `seed` overrides the
    /// cursor offset used to bias the text diff.
    pub fn for_cursor(cursor: &CursorState, seed: Option<usize>) -> Self {
        match cursor.as_collapsed() {
            Some((target, offset)) => Scope::Narrow {
                target: target.clone(),
                seed: seed.or(Some(offset)),
            },
            None => Scope::Wide,
        }
    }
}

/// Compare `surface` against `tree` and describe how to bring the model in line.
///
/// Neither side is modified. Running a pass right after a render yields an
/// empty result.
pub fn reconcile(
    tree: &DocumentTree,
    surface: &SurfaceTree,
    ids: &mut dyn IdGenerator,
    scope: &Scope,
) -> Reconciliation {
    let mut pass = Pass {
        tree,
        surface,
        ids,
        deleted: HashSet::new(),
        out: Reconciliation::default(),
    };
    match scope {
        Scope::Narrow { target, seed } => match surface.lookup(target) {
            Some(node) => pass.check_marked(node, *seed),
            None => log::debug!("no surface node for {target}, nothing to reconcile"),
        },
        Scope::Wide => {
            for id in tree.preorder() {
                if let Some(node) = surface.lookup(&id) {
                    pass.check_marked(node, None);
                }
            }
        }
    }
    if !pass.out.is_empty() {
        log::debug!(
            "reconciled surface drift: {} actions, {} stray nodes",
            pass.out.actions.len(),
            pass.out.stray_nodes.len()
        );
    }
    pass.out
}

struct Pass<'a> {
    tree: &'a DocumentTree,
    surface: &'a SurfaceTree,
    ids: &'a mut dyn IdGenerator,
    /// Model nodes already scheduled for deletion in this pass
    deleted: HashSet<NodeId>,
    out: Reconciliation,
}

impl Pass<'_> {
    fn check_marked(&mut self, node: SurfaceNodeId, seed: Option<usize>) {
        let (tree, surface) = (self.tree, self.surface);
        let Some(model_id) = surface.back_ref(node) else {
            return;
        };
        let Some(model) = tree.lookup_by_id(model_id) else {
            return;
        };
        if self.is_under_deleted(model) {
            return;
        }

        if self.is_detached(node) && model.parent().is_some() {
            log::debug!("surface node of {model_id} was removed");
            self.deleted.insert(model_id.clone());
            self.out.actions.push(Action::delete(model_id.clone()));
            return;
        }

        match model.kind() {
            NodeKind::Span(span) => {
                let current = surface.text_content(node);
                let stored = span.content();
                if current != stored {
                    self.out.actions.push(Action::UpdateSpan {
                        target_id: model_id.clone(),
                        value: SpanPatch::content(current.clone()),
                        diffs: Some(TextDiff::new(stored, current, seed)),
                    });
                }
            }
            NodeKind::Element(_) if model.is_block() => self.check_line_content(node, model),
            NodeKind::Element(_) => {}
        }
    }

    /// A surface node counts as removed once it no longer reaches the root
    fn is_detached(&self, node: SurfaceNodeId) -> bool {
        let mut current = node;
        while let Some(parent) = self.surface.parent(current) {
            current = parent;
        }
        Some(current) != self.surface.root()
    }

    fn is_under_deleted(&self, model: &TreeNode) -> bool {
        let mut parent = model.parent();
        while let Some(id) = parent {
            if self.deleted.contains(id) {
                return true;
            }
            parent = self.tree.lookup_by_id(id).and_then(TreeNode::parent);
        }
        false
    }

    /// Adopt text the surface grew inside a block's content container
    fn check_line_content(&mut self, node: SurfaceNodeId, block: &TreeNode) {
        let surface = self.surface;
        let Some(container) = surface.children(node).first().copied() else {
            return;
        };
        let mut prev: Option<NodeId> = None;
        for child in surface.children(container) {
            let child = *child;
            if let Some(span_id) = self.tracked_span_of(child, block.id()) {
                prev = Some(span_id);
                continue;
            }
            let flags = if surface.is_text(child) {
                FormatFlags::empty()
            } else if surface.tag(child) == Some("span") {
                FormatFlags::from_hint(surface.attribute(child, FLAGS_HINT))
            } else {
                log::debug!("dropping unexpected surface node in {}", block.id());
                self.out.stray_nodes.push(child);
                continue;
            };

            let id = self.ids.mk_span_id();
            log::debug!("adopting untracked surface text as span {id}");
            self.out.actions.push(Action::NewSpan {
                target_id: block.id().clone(),
                after_id: prev.replace(id.clone()),
                content: SpanData::new(id, surface.text_content(child), flags),
            });
            self.out.stray_nodes.push(child);
        }
    }

    /// Span id rendered by `child`, if it belongs to `block`
    fn tracked_span_of(&self, child: SurfaceNodeId, block: &NodeId) -> Option<NodeId> {
        let id = self.surface.back_ref(child)?;
        let node = self.tree.lookup_by_id(id)?;
        node.as_span()?;
        let owner = self.tree.enclosing_block(id)?;
        (owner.id() == block).then(|| id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::DiffOp;
    use crate::model::{DocumentBuilder, SequentialIdGenerator};
    use crate::surface::{BlockRenderer, Renderer};
    use pretty_assertions::assert_eq;

    fn rendered() -> (DocumentTree, SurfaceTree) {
        let tree = DocumentBuilder::new("doc")
            .block(
                "b1",
                [
                    ("s1", "hello", FormatFlags::empty()),
                    ("s2", " world", FormatFlags::BOLD),
                ],
            )
            .block("b2", [("s3", "second", FormatFlags::empty())])
            .build()
            .unwrap();
        let mut surface = SurfaceTree::new();
        BlockRenderer::default().render(&tree, &mut surface);
        (tree, surface)
    }

    fn content_container(surface: &SurfaceTree, block: &str) -> SurfaceNodeId {
        let block = surface.lookup(&block.into()).unwrap();
        surface.children(block)[0]
    }

    #[test]
    fn test_pass_after_render_is_empty() {
        let (tree, surface) = rendered();
        let mut ids = SequentialIdGenerator::new("n");

        let wide = reconcile(&tree, &surface, &mut ids, &Scope::Wide);
        let narrow = reconcile(
            &tree,
            &surface,
            &mut ids,
            &Scope::for_cursor(&CursorState::collapsed("s1", 2), None),
        );

        assert!(wide.is_empty());
        assert!(narrow.is_empty());
    }

    #[test]
    fn test_narrow_pass_updates_typed_span_with_seeded_diff() {
        // Given the user typed "x" after "hel"
        let (tree, mut surface) = rendered();
        let text = surface.lookup(&"s1".into()).unwrap();
        surface.set_caret(text, 3);
        surface.type_text("x");

        // When reconciling around the cursor
        let scope = Scope::for_cursor(&CursorState::collapsed("s1", 3), None);
        let result = reconcile(&tree, &surface, &mut SequentialIdGenerator::new("n"), &scope);

        // Then one update-span carries the new text and a one-insert diff
        assert_eq!(result.actions.len(), 1);
        let Action::UpdateSpan { target_id, value, diffs } = &result.actions[0] else {
            panic!("expected update-span, got {:?}", result.actions[0]);
        };
        assert_eq!(target_id.as_str(), "s1");
        assert_eq!(value.content.as_deref(), Some("helxlo"));
        let diffs = diffs.as_ref().unwrap();
        assert!(!diffs.is_computed());
        assert_eq!(
            diffs.ops(),
            &[
                DiffOp::Equal("hel".to_string()),
                DiffOp::Insert("x".to_string()),
                DiffOp::Equal("lo".to_string()),
            ]
        );
    }

    #[test]
    fn test_styled_span_text_is_compared_through_its_element() {
        let (tree, mut surface) = rendered();
        let element = surface.lookup(&"s2".into()).unwrap();
        let text = surface.children(element)[0];
        surface.set_text(text, " there");

        let result = reconcile(&tree, &surface, &mut SequentialIdGenerator::new("n"), &Scope::Wide);

        assert_eq!(result.actions.len(), 1);
        assert!(matches!(
            &result.actions[0],
            Action::UpdateSpan { target_id, value, diffs: Some(_) }
                if target_id.as_str() == "s2" && value.content.as_deref() == Some(" there")
        ));
    }

    #[test]
    fn test_removed_block_becomes_single_delete() {
        let (tree, mut surface) = rendered();
        let block = surface.lookup(&"b2".into()).unwrap();
        surface.detach(block);

        let result = reconcile(&tree, &surface, &mut SequentialIdGenerator::new("n"), &Scope::Wide);

        assert_eq!(result.actions, vec![Action::delete("b2")]);
    }

    #[test]
    fn test_removed_span_in_narrow_scope() {
        let (tree, mut surface) = rendered();
        let text = surface.lookup(&"s1".into()).unwrap();
        surface.detach(text);

        let scope = Scope::for_cursor(&CursorState::collapsed("s1", 0), None);
        let result = reconcile(&tree, &surface, &mut SequentialIdGenerator::new("n"), &scope);

        assert_eq!(result.actions, vec![Action::delete("s1")]);
    }

    #[test]
    fn test_untracked_nodes_become_chained_spans() {
        // Given a pasted text node and a styled span in b1, plus a stray <br>
        let (tree, mut surface) = rendered();
        let container = content_container(&surface, "b1");
        let pasted = surface.create_text("!!");
        surface.append_child(container, pasted);
        let styled = surface.create_element("span");
        surface.set_attribute(styled, FLAGS_HINT, "2");
        let styled_text = surface.create_text("it");
        surface.append_child(styled, styled_text);
        surface.append_child(container, styled);
        let br = surface.create_element("br");
        surface.append_child(container, br);

        // When a wide pass runs
        let mut ids = SequentialIdGenerator::new("n");
        let result = reconcile(&tree, &surface, &mut ids, &Scope::Wide);

        // Then both become spans after s2, and all three nodes are stray
        assert_eq!(
            result.actions,
            vec![
                Action::NewSpan {
                    target_id: "b1".into(),
                    after_id: Some("s2".into()),
                    content: SpanData::new("ns1", "!!", FormatFlags::empty()),
                },
                Action::NewSpan {
                    target_id: "b1".into(),
                    after_id: Some("ns1".into()),
                    content: SpanData::new("ns2", "it", FormatFlags::ITALIC),
                },
            ]
        );
        assert_eq!(result.stray_nodes, vec![pasted, styled, br]);
    }

    #[test]
    fn test_untracked_text_before_tracked_spans_goes_first() {
        let (tree, mut surface) = rendered();
        let container = content_container(&surface, "b2");
        let first = surface.children(container)[0];
        let pasted = surface.create_text(">> ");
        surface.insert_before(container, pasted, Some(first));

        let result = reconcile(&tree, &surface, &mut SequentialIdGenerator::new("n"), &Scope::Wide);

        assert_eq!(
            result.actions,
            vec![Action::NewSpan {
                target_id: "b2".into(),
                after_id: None,
                content: SpanData::new("ns1", ">> ", FormatFlags::empty()),
            }]
        );
    }

    #[test]
    fn test_actions_apply_cleanly() {
        let (mut tree, mut surface) = rendered();
        let container = content_container(&surface, "b2");
        let pasted = surface.create_text("?");
        surface.append_child(container, pasted);
        let text = surface.lookup(&"s1".into()).unwrap();
        surface.set_text(text, "help");

        let result = reconcile(&tree, &surface, &mut SequentialIdGenerator::new("n"), &Scope::Wide);
        tree.apply_actions(&result.actions).unwrap();

        assert_eq!(tree.text_of(&"b1".into()), "help world");
        assert_eq!(tree.text_of(&"b2".into()), "second?");
        tree.check_invariants().unwrap();
    }
}
