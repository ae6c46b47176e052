/*!
 * # Editing Session
 *
 * Everything that happens between the user touching the surface and the
 * model catching up.
 *
 * ## Flow
 *
 * ### 1. Surface first
 * - The user edits the surface directly; the model hears about it through
 *   `input`, `selection_changed` and the composition events
 * - A **reconciliation** pass diffs the surface against the model and emits
 *   actions: `update-span` for changed text, `delete` for removed nodes,
 *   `new-span` for text the surface grew on its own
 *
 * ### 2. Structural keys are intercepted
 * - Enter and Backspace at the start of a block would let the surface split
 *   or join elements arbitrarily
 * - The editor prevents them and runs a **command** that builds the
 *   equivalent action batch (split, merge) plus the cursor to set afterwards
 *
 * ### 3. One batch, one render
 * - Every change is applied through `Editor::apply_actions`: plugins
 *   intercept, the tree applies atomically, the renderer patches the surface,
 *   then the selection is read back into the cursor
 *
 * ### 4. Cursor sync both ways
 * - Surface selection → model cursor on every selection change
 * - Model cursor → surface selection through a cursor observer
 */

pub mod commands;
pub mod cursor_sync;
pub mod editor;
pub mod keys;
pub mod plugin;
pub mod reconcile;

pub use commands::{merge_with_previous_block, split_block, CommandPlan};
pub use editor::{Editor, Session};
pub use keys::{Key, KeyDisposition, KeyOutcome};
pub use plugin::{Interception, Plugin, PluginContext, PluginRegistry};
pub use reconcile::{reconcile, Reconciliation, Scope};
