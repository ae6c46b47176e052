//! Enter and Backspace as structural edits.
//!
//! The surface's own handling of these keys would split or join elements in
//! ways the model cannot follow, so the editor prevents it and applies one of
//! these plans instead.

use crate::actions::Action;
use crate::model::{CursorState, DocumentTree, IdGenerator, NodeId, SpanData, TreeNode};
use crate::surface::floor_char_boundary;

/// Actions for one command and the cursor to set once they are rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    pub actions: Vec<Action>,
    pub cursor: CursorState,
}

fn following<'a>(tree: &'a DocumentTree, node: &TreeNode) -> Option<&'a TreeNode> {
    node.next_sibling().and_then(|id| tree.lookup_by_id(id))
}

/// Split the block under a collapsed cursor into two.
///
/// The text after the caret and every later span move into a new block
/// inserted right after the current one; the caret follows them.
pub fn split_block(tree: &DocumentTree, ids: &mut dyn IdGenerator) -> Option<CommandPlan> {
    let (target, offset) = tree.cursor_state().as_collapsed()?;
    let node = tree.lookup_by_id(target)?;
    let content = node.as_span()?.content();
    let block = tree.enclosing_block(target)?;
    let parent = block.parent()?;
    let offset = floor_char_boundary(&content, offset);

    let mut remainder: Vec<SpanData> = Vec::new();
    let mut later: Vec<NodeId> = Vec::new();
    let mut current = Some(node);
    while let Some(span) = current {
        if let Some(data) = span.span_data() {
            remainder.push(SpanData {
                id: ids.mk_span_id(),
                ..data
            });
            if span.id() != target {
                later.push(span.id().clone());
            }
        }
        current = following(tree, span);
    }
    if let Some(first) = remainder.first_mut() {
        first.content = content[offset..].to_string();
    }
    let cursor = CursorState::collapsed(remainder.first()?.id.clone(), 0);

    let mut actions = vec![Action::NewBlock {
        target_id: parent.clone(),
        new_id: ids.mk_block_id(),
        after_id: Some(block.id().clone()),
        spans: remainder,
    }];
    if offset < content.len() {
        actions.push(Action::update_content(target.clone(), &content[..offset]));
    }
    actions.extend(later.into_iter().map(Action::delete));

    log::debug!("splitting {} at {target}:{offset}", block.id());
    Some(CommandPlan { actions, cursor })
}

/// Join the block under a caret at the very start of its first span onto
/// the previous sibling block.
///
/// When the first span has the same flags as the previous block's last span
/// the two are coalesced; every other non-empty span is appended as a new
/// span. Returns `None` when there is nothing to merge into.
pub fn merge_with_previous_block(tree: &DocumentTree, ids: &mut dyn IdGenerator) -> Option<CommandPlan> {
    let (target, offset) = tree.cursor_state().as_collapsed()?;
    if offset != 0 {
        return None;
    }
    let node = tree.lookup_by_id(target)?;
    node.as_span()?;
    if node.prev_sibling().is_some() {
        return None;
    }
    let block = tree.enclosing_block(target)?;
    let previous = block
        .prev_sibling()
        .and_then(|id| tree.lookup_by_id(id))
        .filter(|node| node.is_block())?;
    let last = tree.spans_of(previous.id()).last().copied();

    let mut actions = Vec::new();
    let mut after = last.map(|span| span.id().clone());
    let mut current = Some(node);
    let mut coalesced_len = None;

    if let Some(last) = last
        && let Some(last_span) = last.as_span()
        && let Some(first) = node.as_span()
        && last_span.flags == first.flags
    {
        let joined = last_span.content() + &first.content();
        coalesced_len = Some(joined.len());
        actions.push(Action::update_content(last.id().clone(), joined));
        current = following(tree, node);
    }

    let mut first_new = None;
    while let Some(span) = current {
        if let Some(data) = span.span_data()
            && !data.content.is_empty()
        {
            let id = ids.mk_span_id();
            first_new.get_or_insert_with(|| id.clone());
            actions.push(Action::NewSpan {
                target_id: previous.id().clone(),
                after_id: after.replace(id.clone()),
                content: SpanData { id, ..data },
            });
        }
        current = following(tree, span);
    }
    actions.push(Action::delete(block.id().clone()));

    let cursor = match (first_new, last) {
        (Some(id), _) => CursorState::collapsed(id, 0),
        (None, Some(last)) => {
            let end = coalesced_len.or_else(|| last.as_span().map(|span| span.len()));
            CursorState::collapsed(last.id().clone(), end.unwrap_or_default())
        }
        (None, None) => CursorState::Undefined,
    };

    log::debug!("merging {} into {}", block.id(), previous.id());
    Some(CommandPlan { actions, cursor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentBuilder, FormatFlags, SequentialIdGenerator};
    use pretty_assertions::assert_eq;

    fn tree_with_cursor(
        blocks: &[(&str, &[(&str, &str, FormatFlags)])],
        cursor: CursorState,
    ) -> DocumentTree {
        let mut builder = DocumentBuilder::new("doc");
        for (block, spans) in blocks {
            builder = builder.block(*block, spans.iter().copied());
        }
        let mut tree = builder.build().unwrap();
        tree.set_cursor_state(cursor);
        tree
    }

    fn plain(id: &'static str, text: &'static str) -> (&'static str, &'static str, FormatFlags) {
        (id, text, FormatFlags::empty())
    }

    #[test]
    fn test_split_mid_span_moves_tail_and_later_spans() {
        // Given "hello world" across two spans, caret after "he"
        let tree = tree_with_cursor(
            &[("b1", &[plain("s1", "hello "), ("s2", "world", FormatFlags::BOLD)])],
            CursorState::collapsed("s1", 2),
        );
        let mut ids = SequentialIdGenerator::new("n");

        // When splitting
        let plan = split_block(&tree, &mut ids).unwrap();

        // Then the new block gets "llo " + "world", and b1 keeps "he"
        assert_eq!(
            plan.actions,
            vec![
                Action::NewBlock {
                    target_id: "doc".into(),
                    new_id: "nb3".into(),
                    after_id: Some("b1".into()),
                    spans: vec![
                        SpanData::new("ns1", "llo ", FormatFlags::empty()),
                        SpanData::new("ns2", "world", FormatFlags::BOLD),
                    ],
                },
                Action::update_content("s1", "he"),
                Action::delete("s2"),
            ]
        );
        assert_eq!(plan.cursor, CursorState::collapsed("ns1", 0));
    }

    #[test]
    fn test_split_leaves_non_span_content_alone() {
        // Given a line break element between two spans
        let mut tree = tree_with_cursor(
            &[("b1", &[plain("s1", "ab"), plain("s2", "cd")])],
            CursorState::collapsed("s1", 1),
        );
        tree.insert_after(
            &"b1#content".into(),
            Some(&"s1".into()),
            TreeNode::element("br1".into(), "br"),
        )
        .unwrap();

        // When splitting
        let plan = split_block(&tree, &mut SequentialIdGenerator::new("n")).unwrap();

        // Then only spans move, and the break is neither copied nor deleted
        let Action::NewBlock { spans, .. } = &plan.actions[0] else {
            panic!("expected new-block");
        };
        let moved: Vec<&str> = spans.iter().map(|span| span.content.as_str()).collect();
        assert_eq!(moved, vec!["b", "cd"]);
        assert!(!plan.actions.contains(&Action::delete("br1")));
        assert_eq!(plan.actions.last(), Some(&Action::delete("s2")));
    }

    #[test]
    fn test_split_result_keeps_text_in_order() {
        let mut tree = tree_with_cursor(
            &[
                ("b1", &[plain("s1", "ab"), plain("s2", "cd")]),
                ("b2", &[plain("s3", "ef")]),
            ],
            CursorState::collapsed("s1", 1),
        );

        let plan = split_block(&tree, &mut SequentialIdGenerator::new("n")).unwrap();
        tree.apply_actions(&plan.actions).unwrap();

        let texts: Vec<String> = tree
            .children(&"doc".into())
            .map(|block| tree.text_of(block.id()))
            .collect();
        assert_eq!(texts, vec!["a", "bcd", "ef"]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_split_at_end_leaves_span_untouched() {
        let tree = tree_with_cursor(&[("b1", &[plain("s1", "abc")])], CursorState::collapsed("s1", 3));

        let plan = split_block(&tree, &mut SequentialIdGenerator::new("n")).unwrap();

        assert_eq!(plan.actions.len(), 1);
        let Action::NewBlock { spans, .. } = &plan.actions[0] else {
            panic!("expected new-block");
        };
        assert_eq!(spans, &vec![SpanData::new("ns1", "", FormatFlags::empty())]);
    }

    #[test]
    fn test_split_needs_a_caret_in_a_span() {
        let open = tree_with_cursor(&[("b1", &[plain("s1", "abc")])], CursorState::open("s1", 0, "s1", 2));
        let on_block = tree_with_cursor(&[("b1", &[plain("s1", "abc")])], CursorState::collapsed("b1", 0));
        let mut ids = SequentialIdGenerator::new("n");

        assert_eq!(split_block(&open, &mut ids), None);
        assert_eq!(split_block(&on_block, &mut ids), None);
    }

    #[test]
    fn test_merge_coalesces_matching_flags() {
        let tree = tree_with_cursor(
            &[
                ("b1", &[("s1", "bar", FormatFlags::BOLD)]),
                ("b2", &[("s2", "foo", FormatFlags::BOLD)]),
            ],
            CursorState::collapsed("s2", 0),
        );

        let plan = merge_with_previous_block(&tree, &mut SequentialIdGenerator::new("n")).unwrap();

        assert_eq!(
            plan.actions,
            vec![Action::update_content("s1", "barfoo"), Action::delete("b2")]
        );
        assert_eq!(plan.cursor, CursorState::collapsed("s1", 6));
    }

    #[test]
    fn test_merge_appends_spans_with_other_flags() {
        let mut tree = tree_with_cursor(
            &[
                ("b1", &[plain("s1", "bar")]),
                ("b2", &[("s2", "foo", FormatFlags::BOLD), plain("s3", ""), plain("s4", "!")]),
            ],
            CursorState::collapsed("s2", 0),
        );

        let plan = merge_with_previous_block(&tree, &mut SequentialIdGenerator::new("n")).unwrap();

        assert_eq!(
            plan.actions,
            vec![
                Action::NewSpan {
                    target_id: "b1".into(),
                    after_id: Some("s1".into()),
                    content: SpanData::new("ns1", "foo", FormatFlags::BOLD),
                },
                Action::NewSpan {
                    target_id: "b1".into(),
                    after_id: Some("ns1".into()),
                    content: SpanData::new("ns2", "!", FormatFlags::empty()),
                },
                Action::delete("b2"),
            ]
        );
        assert_eq!(plan.cursor, CursorState::collapsed("ns1", 0));
        tree.apply_actions(&plan.actions).unwrap();
        assert_eq!(tree.text_of(&"b1".into()), "barfoo!");
    }

    #[test]
    fn test_merge_of_empty_block_into_empty_block_clears_cursor() {
        let tree = tree_with_cursor(
            &[("b1", &[]), ("b2", &[plain("s2", "")])],
            CursorState::collapsed("s2", 0),
        );

        let plan = merge_with_previous_block(&tree, &mut SequentialIdGenerator::new("n")).unwrap();

        assert_eq!(plan.actions, vec![Action::delete("b2")]);
        assert_eq!(plan.cursor, CursorState::Undefined);
    }

    #[test]
    fn test_merge_is_a_no_op_when_not_at_block_start() {
        let blocks: &[(&str, &[(&str, &str, FormatFlags)])] =
            &[("b1", &[plain("s1", "a")]), ("b2", &[plain("s2", "b"), plain("s3", "c")])];
        let mut ids = SequentialIdGenerator::new("n");

        let first_block = tree_with_cursor(blocks, CursorState::collapsed("s1", 0));
        let mid_span = tree_with_cursor(blocks, CursorState::collapsed("s2", 1));
        let second_span = tree_with_cursor(blocks, CursorState::collapsed("s3", 0));

        assert_eq!(merge_with_previous_block(&first_block, &mut ids), None);
        assert_eq!(merge_with_previous_block(&mid_span, &mut ids), None);
        assert_eq!(merge_with_previous_block(&second_span, &mut ids), None);
    }
}
