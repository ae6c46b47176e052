use std::cell::{Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::actions::{Action, ActionLog};
use crate::editing::commands::{self, CommandPlan};
use crate::editing::cursor_sync::{cursor_from_surface, sync_surface_selection};
use crate::editing::keys::{Key, KeyDisposition, KeyOutcome};
use crate::editing::plugin::{Plugin, PluginRegistry};
use crate::editing::reconcile::{reconcile, Scope};
use crate::error::Result;
use crate::model::{CursorState, DocumentTree, IdGenerator, ListenerId, UuidIdGenerator};
use crate::surface::{BlockRenderer, Renderer, SurfaceTree};

/// Input state of an editing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Idle,
    /// An input method is composing; `seed` is the caret offset from before
    /// the composition started
    Composing { seed: Option<usize> },
}

/// One editing session over a document and its surface.
///
/// The editor is the only writer of the tree. Surface events come in through
/// [`Editor::input`], [`Editor::selection_changed`], [`Editor::key_down`] and
/// friends; every model change goes through [`Editor::apply_actions`] as one
/// batch, which is then rendered back to the surface.
pub struct Editor {
    tree: DocumentTree,
    surface: Rc<RefCell<SurfaceTree>>,
    renderer: Box<dyn Renderer>,
    ids: Box<dyn IdGenerator>,
    plugins: PluginRegistry,
    session: Session,
    log: ActionLog,
    /// Batches submitted by plugins, applied after the current one
    pending: VecDeque<Vec<Action>>,
    cursor_listener: ListenerId,
}

impl Editor {
    pub fn new(mut tree: DocumentTree) -> Self {
        let surface = Rc::new(RefCell::new(SurfaceTree::new()));
        let sink = Rc::clone(&surface);
        let cursor_listener = tree.subscribe_cursor(move |new, old| match sink.try_borrow_mut() {
            Ok(mut surface) => sync_surface_selection(&mut surface, new, old),
            Err(_) => log::warn!("surface busy, selection not moved to {new:?}"),
        });
        Self {
            tree,
            surface,
            renderer: Box::new(BlockRenderer::default()),
            ids: Box::new(UuidIdGenerator),
            plugins: PluginRegistry::new(),
            session: Session::Idle,
            log: ActionLog::new(),
            pending: VecDeque::new(),
            cursor_listener,
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.register(Box::new(plugin), &self.tree);
        self
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// Give the tree back, detached from the surface
    pub fn into_tree(self) -> DocumentTree {
        let mut tree = self.tree;
        tree.unsubscribe_cursor(self.cursor_listener);
        tree
    }

    pub fn surface(&self) -> Ref<'_, SurfaceTree> {
        self.surface.borrow()
    }

    /// Mutable surface access, standing in for the user editing it
    pub fn surface_mut(&self) -> RefMut<'_, SurfaceTree> {
        self.surface.borrow_mut()
    }

    /// Shared handle for hosts that mirror the surface elsewhere
    pub fn surface_handle(&self) -> Rc<RefCell<SurfaceTree>> {
        Rc::clone(&self.surface)
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn is_composing(&self) -> bool {
        matches!(self.session, Session::Composing { .. })
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.log
    }

    pub fn action_log_mut(&mut self) -> &mut ActionLog {
        &mut self.log
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Move the cursor; the surface selection follows
    pub fn set_cursor_state(&mut self, cursor: CursorState) {
        self.tree.set_cursor_state(cursor);
    }

    /// Bring the surface in line with the tree
    pub fn render(&mut self) {
        let mut surface = self.surface.borrow_mut();
        self.renderer.render(&self.tree, &mut surface);
    }

    /// Apply a batch, render it, and re-read the selection.
    ///
    /// Plugins may rewrite or veto the batch first. Batches they submit along
    /// the way are applied afterwards, one transaction each.
    pub fn apply_actions(&mut self, actions: Vec<Action>) -> Result<()> {
        let result = self.commit(actions, true);
        self.flush_submitted();
        result
    }

    /// Apply a batch without touching the surface
    pub fn apply_actions_without_render(&mut self, actions: Vec<Action>) -> Result<()> {
        let result = self.commit(actions, false);
        self.flush_submitted();
        result
    }

    fn commit(&mut self, mut actions: Vec<Action>, render: bool) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }
        let early = self.plugins.before_apply(&self.tree, &mut actions)?;
        self.tree.apply_actions(&actions)?;
        // follow-ups only count for a batch that landed
        self.pending.extend(early);
        if render {
            self.render();
        }
        let submitted = self.plugins.after_apply(&self.tree, &actions);
        self.pending.extend(submitted);
        self.log.record(self.tree.version(), actions);

        if render {
            self.selection_changed();
        }
        Ok(())
    }

    fn flush_submitted(&mut self) {
        while let Some(batch) = self.pending.pop_front() {
            if let Err(err) = self.commit(batch, true) {
                log::warn!("dropping submitted batch: {err}");
            }
        }
    }

    /// The surface content changed
    pub fn input(&mut self) -> Result<()> {
        if self.is_composing() {
            log::trace!("input while composing, deferred");
            return Ok(());
        }
        self.reconcile(None)
    }

    fn reconcile(&mut self, seed: Option<usize>) -> Result<()> {
        let scope = Scope::for_cursor(self.tree.cursor_state(), seed);
        let result = {
            let surface = self.surface.borrow();
            reconcile(&self.tree, &surface, self.ids.as_mut(), &scope)
        };
        self.apply_actions(result.actions)?;
        // strays stay put when the batch is rejected so nothing typed is lost
        if !result.stray_nodes.is_empty() {
            let mut surface = self.surface.borrow_mut();
            for node in result.stray_nodes {
                surface.remove(node);
            }
        }
        Ok(())
    }

    pub fn composition_start(&mut self) {
        let seed = self.tree.cursor_state().as_collapsed().map(|(_, offset)| offset);
        log::debug!("composition started at {seed:?}");
        self.session = Session::Composing { seed };
    }

    /// The composition was committed; reconcile what it left behind
    pub fn composition_end(&mut self) -> Result<()> {
        let seed = match std::mem::take(&mut self.session) {
            Session::Composing { seed } => seed,
            Session::Idle => None,
        };
        log::debug!("composition ended");
        self.reconcile(seed)
    }

    /// Re-read the surface selection into the cursor
    pub fn selection_changed(&mut self) {
        let cursor = {
            let surface = self.surface.borrow();
            cursor_from_surface(&self.tree, &surface)
        };
        if let Some(cursor) = cursor {
            self.tree.set_cursor_state(cursor);
        }
    }

    pub fn key_down(&mut self, key: &Key) -> Result<KeyOutcome> {
        if self.plugins.key_down(key) == KeyDisposition::Handled {
            return Ok(KeyOutcome::PreventDefault);
        }
        match key {
            Key::Tab => Ok(KeyOutcome::PreventDefault),
            key if key.is_arrow() => Ok(KeyOutcome::Default),
            _ if self.is_composing() => Ok(KeyOutcome::Default),
            Key::Enter => {
                let plan = commands::split_block(&self.tree, self.ids.as_mut());
                self.run_command(plan)?;
                Ok(KeyOutcome::PreventDefault)
            }
            Key::Backspace => self.backspace(),
            Key::Delete => Ok(KeyOutcome::PreventDefault),
            _ => Ok(KeyOutcome::Default),
        }
    }

    fn backspace(&mut self) -> Result<KeyOutcome> {
        let at_span_start = self
            .tree
            .cursor_state()
            .as_collapsed()
            .is_some_and(|(target, offset)| {
                offset == 0
                    && self
                        .tree
                        .lookup_by_id(target)
                        .is_some_and(|node| node.as_span().is_some())
            });
        if !at_span_start {
            return Ok(KeyOutcome::Default);
        }
        let plan = commands::merge_with_previous_block(&self.tree, self.ids.as_mut());
        self.run_command(plan)?;
        Ok(KeyOutcome::PreventDefault)
    }

    fn run_command(&mut self, plan: Option<CommandPlan>) -> Result<()> {
        let Some(plan) = plan else {
            log::debug!("nothing to do for {:?}", self.tree.cursor_state());
            return Ok(());
        };
        self.apply_actions(plan.actions)?;
        self.tree.set_cursor_state(plan.cursor);
        Ok(())
    }

    /// Pasting is not handled yet; the surface must not do it either
    pub fn paste(&mut self) -> KeyOutcome {
        KeyOutcome::PreventDefault
    }
}
