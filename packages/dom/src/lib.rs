//! # Resume DOM
//!
//! The document tree and rendering-surface contract the editing engine runs
//! against.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ content: serialized document (JSON string)  │
//! └─────────────────────────────────────────────┘
//!                     ↓ from_content / to_content
//! ┌─────────────────────────────────────────────┐
//! │ Document: arena tree addressed by NodeId    │
//! └─────────────────────────────────────────────┘
//!                     ↓ owned by
//! ┌─────────────────────────────────────────────┐
//! │ RenderingSurface: selection + native        │
//! │ formatting commands + full replacement      │
//! └─────────────────────────────────────────────┘
//! ```

mod document;
mod error;
mod html;
mod memory;
mod node;
mod surface;

pub use document::{Document, NodeId, NodeKind, ROOT_TAG};
pub use error::DomError;
pub use memory::MemorySurface;
pub use node::ContentNode;
pub use surface::{Boundary, Range, RenderingSurface};
