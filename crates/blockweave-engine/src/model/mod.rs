//! Document model: tree nodes, the owning tree, ids, formatting and the
//! observable cursor.

pub mod builder;
pub mod cursor;
pub mod flags;
pub mod ids;
pub mod node;
pub mod observable;
pub mod tree;

pub use builder::DocumentBuilder;
pub use cursor::CursorState;
pub use flags::FormatFlags;
pub use ids::{IdGenerator, NodeId, SequentialIdGenerator, UuidIdGenerator};
pub use node::{Element, Links, NodeKind, Span, SpanData, TreeNode};
pub use observable::{ListenerId, Observable};
pub use tree::{Children, DocumentTree};
