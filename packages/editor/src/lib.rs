//! # Resume Editor
//!
//! Editing engine for the WYSIWYG resume editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ toolbar / input callbacks (caller)          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ EditSession                                 │
//! │  - CommandRegistry: name → native command   │
//! │  - StateManager: canonical EditorState      │
//! │  - HistoryManager: bounded undo/redo        │
//! │  - selection: cursor across re-renders      │
//! │  - table: grid topology + structural edits  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ resume-dom: RenderingSurface + Document     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Serialized content is the snapshot**: State and History only ever
//!    carry the document as an opaque string
//! 2. **Full replacement, not patching**: external content is written into the
//!    surface wholesale and the selection is carried over as node paths
//! 3. **Stateless table topology**: the grid is rebuilt from the live tree on
//!    every call
//! 4. **Caller bugs fail, edge conditions don't**: unknown commands are errors;
//!    empty undo, stale handles and out-of-range indices are no-ops
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resume_dom::MemorySurface;
//! use resume_editor::{EditSession, EditorConfig, TableAction};
//!
//! let surface = MemorySurface::from_content(&content)?;
//! let mut session = EditSession::new(surface, EditorConfig::load(".")?)?;
//!
//! session.execute_command("bold", &[])?;
//! session.table_action(TableAction::InsertTable { rows: 2, cols: 3 })?;
//! session.table_action(TableAction::InsertRowEnd)?;
//!
//! session.undo()?;
//! let html = session.export_html();
//! ```

mod commands;
mod config;
mod errors;
mod history;
mod selection;
mod session;
mod state;
mod table;

pub use commands::{Command, CommandRegistry, ExecuteFn, StateQueryFn, ValueQueryFn};
pub use config::{EditorConfig, HistoryConfig, ImageConfig, TableConfig, DEFAULT_CONFIG_NAME};
pub use errors::EditorError;
pub use history::{HistoryManager, HistorySnapshot, HistoryStats};
pub use selection::{capture, capture_from, node_path, restore, restore_into, SavedSelection};
pub use session::{EditSession, TableAction};
pub use state::{
    EditorState, FloatingImageItem, Listener, StateManager, StatePatch, SubscriptionId,
};
pub use table::{
    create_table, enclosing_table, CellBounds, ColumnMetric, TableEditor, TableGrid, MAX_COLSPAN,
    MAX_NEW_TABLE_DIMENSION, MAX_ROWSPAN,
};
