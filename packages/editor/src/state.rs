//! # Editor State
//!
//! The canonical editor snapshot and the manager that owns it.
//!
//! All mutation goes through [`StateManager`]; every committed change builds a
//! new `EditorState` and notifies subscribers with `(new, old)`. Batches defer
//! notification so several internal updates read as one change.
//!
//! ```text
//! begin_batch()
//!   partial_update(a)   ─┐
//!   partial_update(b)    ├─ applied immediately, not announced
//!   partial_update(c)   ─┘
//! end_batch()           → listeners(new = after c, old = before a), once
//! ```

use crate::selection::SavedSelection;
use resume_dom::NodeId;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Image overlay floating above the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatingImageItem {
    pub id: String,
    pub src: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Canonical editor snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub is_editing: bool,
    pub readonly: bool,
    /// Serialized document
    pub content: String,
    pub floating_images: Vec<FloatingImageItem>,
    pub selection: Option<SavedSelection>,
    pub selected_image: Option<String>,
    pub active_table: Option<NodeId>,
    pub toolbar_visible: bool,
    pub sidebar_visible: bool,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            is_editing: false,
            readonly: false,
            content: String::new(),
            floating_images: Vec::new(),
            selection: None,
            selected_image: None,
            active_table: None,
            toolbar_visible: true,
            sidebar_visible: true,
        }
    }
}

/// Fields to overwrite; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub is_editing: Option<bool>,
    pub readonly: Option<bool>,
    pub content: Option<String>,
    pub floating_images: Option<Vec<FloatingImageItem>>,
    pub selection: Option<Option<SavedSelection>>,
    pub selected_image: Option<Option<String>>,
    pub active_table: Option<Option<NodeId>>,
    pub toolbar_visible: Option<bool>,
    pub sidebar_visible: Option<bool>,
}

impl StatePatch {
    /// `current` with this patch laid over it
    pub fn apply_to(self, current: &EditorState) -> EditorState {
        EditorState {
            is_editing: self.is_editing.unwrap_or(current.is_editing),
            readonly: self.readonly.unwrap_or(current.readonly),
            content: self.content.unwrap_or_else(|| current.content.clone()),
            floating_images: self
                .floating_images
                .unwrap_or_else(|| current.floating_images.clone()),
            selection: self.selection.unwrap_or_else(|| current.selection.clone()),
            selected_image: self
                .selected_image
                .unwrap_or_else(|| current.selected_image.clone()),
            active_table: self.active_table.unwrap_or(current.active_table),
            toolbar_visible: self.toolbar_visible.unwrap_or(current.toolbar_visible),
            sidebar_visible: self.sidebar_visible.unwrap_or(current.sidebar_visible),
        }
    }
}

/// Change listener: receives `(new, old)`
pub type Listener = Box<dyn FnMut(&EditorState, &EditorState) -> anyhow::Result<()>>;

/// Handle returned by [`StateManager::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Owner of the canonical [`EditorState`]
pub struct StateManager {
    state: EditorState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
    batch_depth: usize,
    /// State as of before the first update of the open batch
    batch_origin: Option<EditorState>,
}

impl StateManager {
    pub fn new() -> Self {
        Self::with_state(EditorState::default())
    }

    pub fn with_state(state: EditorState) -> Self {
        Self {
            state,
            listeners: Vec::new(),
            next_id: 0,
            batch_depth: 0,
            batch_origin: None,
        }
    }

    /// Copy of the current state
    pub fn state(&self) -> EditorState {
        self.state.clone()
    }

    /// Borrow the current state without copying
    pub fn current(&self) -> &EditorState {
        &self.state
    }

    /// Replace the state wholesale
    pub fn set_state(&mut self, next: EditorState) {
        let old = std::mem::replace(&mut self.state, next);
        self.committed(old);
    }

    /// Replace the state with `f(current)`
    pub fn update_with(&mut self, f: impl FnOnce(&EditorState) -> EditorState) {
        let next = f(&self.state);
        self.set_state(next);
    }

    pub fn partial_update(&mut self, patch: StatePatch) {
        self.update_with(|current| patch.apply_to(current));
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&EditorState, &EditorState) -> anyhow::Result<()> + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Open a (nestable) batch
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch; the outermost close notifies once if anything changed
    pub fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            warn!("end_batch called without a matching begin_batch");
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            if let Some(origin) = self.batch_origin.take() {
                let current = self.state.clone();
                self.notify(&current, &origin);
            }
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Back to defaults, announced once
    pub fn reset(&mut self) {
        self.set_state(EditorState::default());
    }

    fn committed(&mut self, old: EditorState) {
        if self.batch_depth > 0 {
            if self.batch_origin.is_none() {
                self.batch_origin = Some(old);
            }
            return;
        }
        let current = self.state.clone();
        self.notify(&current, &old);
    }

    fn notify(&mut self, new: &EditorState, old: &EditorState) {
        for (id, listener) in self.listeners.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| listener(new, old))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(listener = id.0, error = %e, "State listener failed"),
                Err(_) => warn!(listener = id.0, "State listener panicked"),
            }
        }
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("batch_depth", &self.batch_depth)
            .finish()
    }
}
