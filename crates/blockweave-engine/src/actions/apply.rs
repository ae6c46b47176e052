use crate::actions::Action;
use crate::error::{EditorError, Result};
use crate::model::node::BLOCK_CONTENT;
use crate::model::{DocumentTree, NodeId, SpanData, TreeNode};

impl DocumentTree {
    /// Apply `actions` as one transaction.
    ///
    /// Actions run in order and each sees the tree as left by the previous
    /// one, so an `after_id` may name a node created earlier in the same
    /// batch. The first failing action rolls the whole batch back and its
    /// error is returned; on success the version is bumped once and cursor
    /// observers fire at most once.
    pub fn apply_actions(&mut self, actions: &[Action]) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }
        self.begin_batch();
        for (index, action) in actions.iter().enumerate() {
            if let Err(err) = self.apply_action(action) {
                log::debug!("rejecting batch at action {index} ({}): {err}", action.kind());
                self.rollback_batch();
                return Err(err);
            }
        }
        self.commit_batch();
        log::debug!("applied {} actions, version {}", actions.len(), self.version());
        Ok(())
    }

    fn apply_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::NewSpan {
                target_id,
                after_id,
                content,
            } => {
                self.resolve(target_id)?;
                if let Some(after) = after_id {
                    self.resolve(after)?;
                }
                let container = self
                    .content_of(target_id)
                    .map(|node| node.id().clone())
                    .ok_or_else(|| EditorError::structural(format!("{target_id} is not a block")))?;
                self.insert_after(&container, after_id.as_ref(), content.to_node())
            }
            Action::UpdateSpan {
                target_id, value, ..
            } => {
                self.resolve(target_id)?;
                let span = self.span_mut(target_id)?;
                if let Some(content) = &value.content {
                    span.set_content(content);
                }
                if let Some(flags) = value.flags {
                    span.flags = flags;
                }
                Ok(())
            }
            Action::NewBlock {
                target_id,
                new_id,
                after_id,
                spans,
            } => {
                self.resolve(target_id)?;
                if let Some(after) = after_id {
                    self.resolve(after)?;
                }
                self.insert_block(target_id, after_id.as_ref(), new_id, "text", spans)
            }
            Action::Delete { target_id } => {
                let parent = self
                    .resolve(target_id)?
                    .parent()
                    .cloned()
                    .ok_or_else(|| EditorError::structural("the root cannot be deleted"))?;
                self.remove_child(&parent, target_id).map(|_| ())
            }
        }
    }

    fn resolve(&self, id: &NodeId) -> Result<&TreeNode> {
        self.lookup_by_id(id)
            .ok_or_else(|| EditorError::UnresolvedTarget(id.clone()))
    }

    /// Create a block with its content container and spans under `parent`.
    ///
    /// Without `after` the block becomes the first block of `parent`; inside
    /// another block that is right after the parent's content container.
    pub(crate) fn insert_block(
        &mut self,
        parent: &NodeId,
        after: Option<&NodeId>,
        block_id: &NodeId,
        block_type: &str,
        spans: &[SpanData],
    ) -> Result<()> {
        let after = match after {
            Some(after) => Some(after.clone()),
            None => self.content_of(parent).map(|node| node.id().clone()),
        };
        self.insert_after(parent, after.as_ref(), TreeNode::block(block_id.clone(), block_type))?;

        let content = block_id.content_of();
        self.append_child(block_id, TreeNode::element(content.clone(), BLOCK_CONTENT))?;
        for span in spans {
            self.append_child(&content, span.to_node())?;
        }
        Ok(())
    }
}
