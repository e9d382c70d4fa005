//! # Rendering Surface Contract
//!
//! The editing engine never renders anything itself. It talks to a surface
//! that owns the live document, the native selection and a named-command
//! facility (`bold`, `fontName`, ...). Browser glue implements this trait over
//! the sandboxed viewer; [`crate::MemorySurface`] implements it in memory.

use crate::{Document, DomError, NodeId};
use serde::{Deserialize, Serialize};

/// One end of a selection range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    pub node: NodeId,
    /// Character offset in a text node, child index in an element
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Live selection range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
}

impl Range {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    pub fn collapsed(node: NodeId, offset: usize) -> Self {
        let at = Boundary::new(node, offset);
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Native document view the engine drives
pub trait RenderingSurface {
    fn document(&self) -> &Document;

    fn document_mut(&mut self) -> &mut Document;

    /// Current native selection, if any
    fn selection(&self) -> Option<Range>;

    fn set_selection(&mut self, range: Option<Range>);

    /// Run a native formatting command; `false` when the surface does not support it
    fn exec_native(&mut self, name: &str, arg: Option<&str>) -> bool;

    /// Whether a native format is active at the selection
    fn query_native_state(&self, name: &str) -> bool;

    /// Current value of a native format at the selection (empty when unknown)
    fn query_native_value(&self, name: &str) -> String;

    /// Replace the whole document with serialized `content`
    ///
    /// The selection collapses; callers that care restore it afterwards.
    fn replace_content(&mut self, content: &str) -> Result<(), DomError>;

    /// Replace the selection with `text`
    fn insert_text(&mut self, text: &str) -> bool;

    /// Delete the selected content
    fn delete_selection(&mut self) -> bool;

    /// Monotonic counter bumped by every change the surface itself performs
    fn revision(&self) -> u64;
}
