pub mod actions;
pub mod editing;
pub mod error;
pub mod model;
pub mod surface;

// Re-export key types for easier usage
pub use actions::{Action, ActionLog, Batch, SpanPatch};
pub use editing::{Editor, Key, KeyOutcome, Plugin};
pub use error::{EditorError, Result};
pub use model::{CursorState, DocumentBuilder, DocumentTree, FormatFlags, NodeId, SpanData};
pub use surface::{BlockRenderer, Renderer, SurfaceTree};
