use crate::actions::Action;
use crate::editing::keys::{Key, KeyDisposition};
use crate::error::{EditorError, Result};
use crate::model::DocumentTree;

/// Whether a batch may go ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    Proceed,
    Veto,
}

/// What a plugin sees while intercepting a batch
pub struct PluginContext<'a> {
    tree: &'a DocumentTree,
    submitted: Vec<Vec<Action>>,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(tree: &'a DocumentTree) -> Self {
        Self {
            tree,
            submitted: Vec::new(),
        }
    }

    pub fn tree(&self) -> &'a DocumentTree {
        self.tree
    }

    /// Queue a batch of the plugin's own. It runs as a separate transaction
    /// once the current one has finished.
    pub fn submit(&mut self, actions: Vec<Action>) {
        if !actions.is_empty() {
            self.submitted.push(actions);
        }
    }

    pub(crate) fn into_submitted(self) -> Vec<Vec<Action>> {
        self.submitted
    }
}

/// Extension observing and transforming batches around their application
pub trait Plugin {
    fn name(&self) -> &str;

    fn init(&mut self, _tree: &DocumentTree) {}

    /// Rewrite `actions` in place, or veto the batch
    fn before_apply(&mut self, _ctx: &mut PluginContext<'_>, _actions: &mut Vec<Action>) -> Interception {
        Interception::Proceed
    }

    /// Side effects after the batch is in the tree (e.g. forwarding it to a
    /// replication layer)
    fn after_apply(&mut self, _ctx: &mut PluginContext<'_>, _actions: &[Action]) {}

    fn key_down(&mut self, _key: &Key) -> KeyDisposition {
        KeyDisposition::Continue
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mut plugin: Box<dyn Plugin>, tree: &DocumentTree) {
        log::debug!("registering plugin {}", plugin.name());
        plugin.init(tree);
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run every plugin's interception in registration order; returns the
    /// batches they submitted
    pub(crate) fn before_apply(
        &mut self,
        tree: &DocumentTree,
        actions: &mut Vec<Action>,
    ) -> Result<Vec<Vec<Action>>> {
        let mut ctx = PluginContext::new(tree);
        for plugin in self.plugins.iter_mut() {
            if plugin.before_apply(&mut ctx, actions) == Interception::Veto {
                log::debug!("plugin {} vetoed a batch of {}", plugin.name(), actions.len());
                return Err(EditorError::Vetoed {
                    plugin: plugin.name().to_string(),
                });
            }
        }
        Ok(ctx.into_submitted())
    }

    pub(crate) fn after_apply(&mut self, tree: &DocumentTree, actions: &[Action]) -> Vec<Vec<Action>> {
        let mut ctx = PluginContext::new(tree);
        for plugin in self.plugins.iter_mut() {
            plugin.after_apply(&mut ctx, actions);
        }
        ctx.into_submitted()
    }

    pub(crate) fn key_down(&mut self, key: &Key) -> KeyDisposition {
        for plugin in self.plugins.iter_mut() {
            if plugin.key_down(key) == KeyDisposition::Handled {
                return KeyDisposition::Handled;
            }
        }
        KeyDisposition::Continue
    }
}
