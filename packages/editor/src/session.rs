//! # Edit Session
//!
//! One editor instance: a rendering surface plus the registry, state and
//! history that drive it. Everything is owned here and passed by reference;
//! there is no process-wide editor state.
//!
//! ## Local edits
//!
//! ```text
//! surface changes ─→ on_surface_changed(now) ─→ State (content + selection)
//!                                          └──→ pending history window
//! tick(now) after debounce_ms of quiet    ─→ one History entry per burst
//! ```
//!
//! ## Full replacement
//!
//! External content (loads, generator deltas, undo/redo) is written into the
//! surface wholesale. The session raises its `updating` guard for the write so
//! the surface's own change echo is not captured as a local edit, and carries
//! the selection across the replacement as node paths.

use crate::commands::CommandRegistry;
use crate::config::EditorConfig;
use crate::history::{HistoryManager, HistoryStats};
use crate::selection::{self, SavedSelection};
use crate::state::{EditorState, FloatingImageItem, StateManager, StatePatch, SubscriptionId};
use crate::table::{enclosing_table, TableEditor};
use crate::EditorError;
use resume_dom::{NodeId, RenderingSurface};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Structural table edits, applied to the session's active table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAction {
    InsertTable { rows: usize, cols: usize },
    InsertRowBefore(NodeId),
    InsertRowAfter(NodeId),
    InsertRowEnd,
    DeleteRow(usize),
    DeleteRowEnd,
    InsertColumnBefore(NodeId),
    InsertColumnAfter(NodeId),
    InsertColumnEnd,
    DeleteColumn(usize),
    DeleteColumnEnd,
    MergeCells(Vec<NodeId>),
    SplitCell(NodeId),
    SetRowHeight { index: usize, height: u32 },
    SetColumnWidth { index: usize, width: u32 },
    ResizeColumn { index: usize, delta: i64 },
    ApplyColumnWidths(Vec<u32>),
}

/// Editing session over a rendering surface
pub struct EditSession<S: RenderingSurface> {
    surface: S,
    registry: CommandRegistry<S>,
    state: StateManager,
    history: HistoryManager<EditorState>,
    config: EditorConfig,

    /// Raised while the session itself writes into the surface
    updating: bool,

    /// Surface revision the session last accounted for
    seen_revision: u64,

    /// Time of the latest uncommitted local edit (unix millis)
    pending_since: Option<i64>,

    streaming: bool,
    next_image_id: u64,
}

impl<S: RenderingSurface + 'static> EditSession<S> {
    /// Start a session over `surface`, seeding State and History from its document
    pub fn new(surface: S, config: EditorConfig) -> Result<Self, EditorError> {
        let mut registry = CommandRegistry::new();
        registry.register_defaults();

        let mut history = HistoryManager::new(config.history.max_size);
        history.set_enabled(config.history.enabled);

        let initial = EditorState {
            is_editing: true,
            content: surface.document().to_content()?,
            ..Default::default()
        };
        history.push(&initial);

        info!(
            commands = registry.len(),
            max_history = config.history.max_size,
            "Edit session started"
        );

        Ok(Self {
            seen_revision: surface.revision(),
            surface,
            registry,
            state: StateManager::with_state(initial),
            history,
            config,
            updating: false,
            pending_since: None,
            streaming: false,
            next_image_id: 0,
        })
    }

    /// Run a registered command against the surface
    ///
    /// Unknown names fail with [`EditorError::CommandNotFound`]. A command
    /// that changed the document becomes its own history entry.
    pub fn execute_command(&mut self, name: &str, args: &[&str]) -> Result<(), EditorError> {
        if self.state.current().readonly {
            debug!(command = name, "Ignoring command in readonly mode");
            return Ok(());
        }
        self.registry.execute(name, &mut self.surface, args)?;
        self.seen_revision = self.surface.revision();

        let content = self.surface.document().to_content()?;
        if content == self.state.current().content {
            return Ok(());
        }
        self.flush_history();
        self.state.partial_update(StatePatch {
            content: Some(content),
            selection: Some(selection::capture_from(&self.surface)),
            ..Default::default()
        });
        self.history.push(self.state.current());
        Ok(())
    }

    pub fn query_command_state(&self, name: &str) -> bool {
        self.registry.query_state(name, &self.surface)
    }

    pub fn query_command_value(&self, name: &str) -> String {
        self.registry.query_value(name, &self.surface)
    }

    /// Capture a local edit made directly on the surface
    ///
    /// Returns `false` for echoes of the session's own writes.
    pub fn on_surface_changed(&mut self, now: i64) -> bool {
        if self.updating {
            debug!("Surface change during update; ignored");
            return false;
        }
        let revision = self.surface.revision();
        if revision == self.seen_revision {
            return false;
        }
        self.seen_revision = revision;

        let content = match self.surface.document().to_content() {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Could not serialize surface content");
                return false;
            }
        };
        self.state.partial_update(StatePatch {
            content: Some(content),
            selection: Some(selection::capture_from(&self.surface)),
            ..Default::default()
        });
        self.pending_since = Some(now);
        true
    }

    /// Commit the pending edit burst once it has been quiet for `debounce_ms`
    pub fn tick(&mut self, now: i64) -> bool {
        let Some(since) = self.pending_since else {
            return false;
        };
        if now.saturating_sub(since) < self.config.history.debounce_ms as i64 {
            return false;
        }
        self.flush_history()
    }

    /// Commit any pending edit burst right away
    pub fn flush_history(&mut self) -> bool {
        if self.pending_since.take().is_none() {
            return false;
        }
        self.history.push(self.state.current());
        debug!(stats = ?self.history.stats(), "Committed edit burst");
        true
    }

    /// Replace the document with externally supplied content, keeping the cursor
    pub fn apply_external_content(&mut self, content: &str) -> Result<(), EditorError> {
        self.flush_history();
        self.replace_document(content)?;
        self.history.push(self.state.current());
        Ok(())
    }

    /// Apply one generator delta; the stream lands in history once, on finish
    pub fn apply_stream_delta(&mut self, content: &str) -> Result<(), EditorError> {
        if !self.streaming {
            self.flush_history();
            self.streaming = true;
        }
        self.replace_document(content)
    }

    pub fn finish_stream(&mut self) -> bool {
        if !self.streaming {
            return false;
        }
        self.streaming = false;
        self.history.push(self.state.current());
        true
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// `Ok(false)` when readonly or nothing to undo
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        if self.readonly("undo") {
            return Ok(false);
        }
        self.flush_history();
        match self.history.undo() {
            Some(previous) => self.restore_snapshot(previous).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        if self.readonly("redo") {
            return Ok(false);
        }
        self.flush_history();
        match self.history.redo() {
            Some(next) => self.restore_snapshot(next).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    /// Add an image overlay; returns its id, or `None` when readonly
    pub fn insert_floating_image(
        &mut self,
        src: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Option<String> {
        if self.readonly("insert_floating_image") {
            return None;
        }
        self.next_image_id += 1;
        let min = self.config.images.min_size;
        let item = FloatingImageItem {
            id: format!("image-{}", self.next_image_id),
            src: src.into(),
            x,
            y,
            width: width.max(min),
            height: height.max(min),
        };
        let id = item.id.clone();

        let mut images = self.state.current().floating_images.clone();
        images.push(item);
        self.commit(StatePatch {
            floating_images: Some(images),
            selected_image: Some(Some(id.clone())),
            ..Default::default()
        });
        Some(id)
    }

    pub fn move_floating_image(&mut self, id: &str, x: f64, y: f64) -> bool {
        self.update_image(id, |image| {
            image.x = x;
            image.y = y;
        })
    }

    /// Resize an overlay; both sides clamp to the configured minimum
    pub fn resize_floating_image(&mut self, id: &str, width: f64, height: f64) -> bool {
        let min = self.config.images.min_size;
        self.update_image(id, |image| {
            image.width = width.max(min);
            image.height = height.max(min);
        })
    }

    pub fn remove_floating_image(&mut self, id: &str) -> bool {
        if self.readonly("remove_floating_image") {
            return false;
        }
        let current = self.state.current();
        if !current.floating_images.iter().any(|i| i.id == id) {
            return false;
        }
        let images = current
            .floating_images
            .iter()
            .filter(|i| i.id != id)
            .cloned()
            .collect();
        let selected = current.selected_image.clone().filter(|s| s != id);
        self.commit(StatePatch {
            floating_images: Some(images),
            selected_image: Some(selected),
            ..Default::default()
        });
        true
    }

    /// Select an overlay (or clear with `None`); not a history entry
    pub fn select_floating_image(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id {
            if !self.state.current().floating_images.iter().any(|i| i.id == id) {
                return false;
            }
        }
        self.state.partial_update(StatePatch {
            selected_image: Some(id.map(str::to_string)),
            ..Default::default()
        });
        true
    }

    /// Point table actions at `table`; `None` clears
    pub fn set_active_table(&mut self, table: Option<NodeId>) -> bool {
        if let Some(table) = table {
            let doc = self.surface.document();
            if !doc.is_element(table, "table") || !doc.is_attached(table) {
                return false;
            }
        }
        self.state.partial_update(StatePatch {
            active_table: Some(table),
            ..Default::default()
        });
        true
    }

    /// Make the table around the selection start the active table
    pub fn activate_table_at_selection(&mut self) -> Option<NodeId> {
        let start = self.surface.selection()?.start.node;
        let table = enclosing_table(self.surface.document(), start)?;
        self.set_active_table(Some(table));
        Some(table)
    }

    /// Apply a structural edit to the active table
    ///
    /// `Ok(false)` when readonly, when no table is active, when the active
    /// handle went stale, or when the edit itself was a no-op.
    pub fn table_action(&mut self, action: TableAction) -> Result<bool, EditorError> {
        if self.state.current().readonly {
            return Ok(false);
        }
        if let TableAction::InsertTable { rows, cols } = action {
            return self.insert_table(rows, cols);
        }
        let Some(table) = self.state.current().active_table else {
            debug!("No active table");
            return Ok(false);
        };
        self.flush_history();

        let applied = {
            let Some(mut editor) =
                TableEditor::new(self.surface.document_mut(), table, &self.config.table)
            else {
                return Ok(false);
            };
            match action {
                TableAction::InsertTable { .. } => false,
                TableAction::InsertRowBefore(cell) => editor.insert_row_before(cell).is_some(),
                TableAction::InsertRowAfter(cell) => editor.insert_row_after(cell).is_some(),
                TableAction::InsertRowEnd => editor.insert_row_end().is_some(),
                TableAction::DeleteRow(index) => editor.delete_row_at(index),
                TableAction::DeleteRowEnd => editor.delete_row_end(),
                TableAction::InsertColumnBefore(cell) => editor.insert_column_before(cell) > 0,
                TableAction::InsertColumnAfter(cell) => editor.insert_column_after(cell) > 0,
                TableAction::InsertColumnEnd => editor.insert_column_end() > 0,
                TableAction::DeleteColumn(index) => editor.delete_column_at(index),
                TableAction::DeleteColumnEnd => editor.delete_column_end(),
                TableAction::MergeCells(cells) => editor.merge_cells(&cells).is_some(),
                TableAction::SplitCell(cell) => editor.split_cell(cell),
                TableAction::SetRowHeight { index, height } => {
                    editor.set_row_height(index, height).is_some()
                }
                TableAction::SetColumnWidth { index, width } => {
                    editor.set_column_width(index, width).is_some()
                }
                TableAction::ResizeColumn { index, delta } => {
                    editor.resize_column(index, delta).is_some()
                }
                TableAction::ApplyColumnWidths(widths) => editor.apply_column_widths(&widths) > 0,
            }
        };
        if !applied {
            return Ok(false);
        }

        self.drop_detached_selection();
        self.commit_document()?;
        Ok(true)
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.state.partial_update(StatePatch {
            readonly: Some(readonly),
            ..Default::default()
        });
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.state.partial_update(StatePatch {
            is_editing: Some(editing),
            ..Default::default()
        });
    }

    pub fn toggle_toolbar(&mut self) -> bool {
        let visible = !self.state.current().toolbar_visible;
        self.state.partial_update(StatePatch {
            toolbar_visible: Some(visible),
            ..Default::default()
        });
        visible
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        let visible = !self.state.current().sidebar_visible;
        self.state.partial_update(StatePatch {
            sidebar_visible: Some(visible),
            ..Default::default()
        });
        visible
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&EditorState, &EditorState) -> anyhow::Result<()> + 'static,
    ) -> SubscriptionId {
        self.state.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    pub fn state(&self) -> &EditorState {
        self.state.current()
    }

    /// Serialized document as last captured
    pub fn content(&self) -> &str {
        &self.state.current().content
    }

    /// Markup of the live document
    pub fn export_html(&self) -> String {
        self.surface.document().to_html()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access for native input; report it through [`Self::on_surface_changed`]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry<S> {
        &mut self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    fn insert_table(&mut self, rows: usize, cols: usize) -> Result<bool, EditorError> {
        let before: HashSet<NodeId> = self.tables().into_iter().collect();
        let (rows, cols) = (rows.to_string(), cols.to_string());
        self.execute_command("insertTable", &[rows.as_str(), cols.as_str()])?;

        let inserted = self.tables().into_iter().find(|t| !before.contains(t));
        if inserted.is_some() {
            self.set_active_table(inserted);
        }
        Ok(inserted.is_some())
    }

    fn tables(&self) -> Vec<NodeId> {
        let doc = self.surface.document();
        doc.descendants(doc.root())
            .into_iter()
            .filter(|n| doc.is_element(*n, "table"))
            .collect()
    }

    /// Write `content` into the surface under the update guard, carrying the selection over
    fn render(&mut self, content: &str, saved: Option<SavedSelection>) -> Result<(), EditorError> {
        self.updating = true;
        let result = self.surface.replace_content(content);
        if result.is_ok() {
            if let Some(saved) = &saved {
                selection::restore_into(&mut self.surface, saved);
            }
        }
        self.seen_revision = self.surface.revision();
        self.updating = false;
        result.map_err(EditorError::from)
    }

    fn replace_document(&mut self, content: &str) -> Result<(), EditorError> {
        let saved = selection::capture_from(&self.surface);
        self.render(content, saved)?;
        let content = self.surface.document().to_content()?;

        self.state.begin_batch();
        self.state.partial_update(StatePatch {
            content: Some(content),
            selection: Some(selection::capture_from(&self.surface)),
            ..Default::default()
        });
        // Node handles do not survive a replacement
        self.state.partial_update(StatePatch {
            active_table: Some(None),
            ..Default::default()
        });
        self.state.end_batch();
        Ok(())
    }

    /// Install a history snapshot and re-render it. The live readonly flag
    /// survives, and `active_table` is cleared since its node died with the
    /// old document.
    fn restore_snapshot(&mut self, snapshot: EditorState) -> Result<(), EditorError> {
        self.render(&snapshot.content, snapshot.selection.clone())?;
        let readonly = self.state.current().readonly;
        self.state.set_state(EditorState {
            readonly,
            active_table: None,
            ..snapshot
        });
        debug!(stats = ?self.history.stats(), "Restored history snapshot");
        Ok(())
    }

    fn readonly(&self, action: &str) -> bool {
        let readonly = self.state.current().readonly;
        if readonly {
            debug!(action, "Ignoring action in readonly mode");
        }
        readonly
    }

    fn update_image(&mut self, id: &str, f: impl FnOnce(&mut FloatingImageItem)) -> bool {
        if self.readonly("update_floating_image") {
            return false;
        }
        let mut images = self.state.current().floating_images.clone();
        let Some(image) = images.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        f(image);
        self.commit(StatePatch {
            floating_images: Some(images),
            ..Default::default()
        });
        true
    }

    /// One discrete action: one notification, one history entry
    fn commit(&mut self, patch: StatePatch) {
        self.flush_history();
        self.state.partial_update(patch);
        self.history.push(self.state.current());
    }

    fn commit_document(&mut self) -> Result<(), EditorError> {
        let content = self.surface.document().to_content()?;
        self.state.begin_batch();
        self.state.partial_update(StatePatch {
            content: Some(content),
            ..Default::default()
        });
        self.state.partial_update(StatePatch {
            selection: Some(selection::capture_from(&self.surface)),
            ..Default::default()
        });
        self.state.end_batch();
        self.history.push(self.state.current());
        Ok(())
    }

    fn drop_detached_selection(&mut self) {
        let Some(range) = self.surface.selection() else {
            return;
        };
        let doc = self.surface.document();
        if !doc.is_attached(range.start.node) || !doc.is_attached(range.end.node) {
            self.surface.set_selection(None);
        }
    }
}

impl<S: RenderingSurface> std::fmt::Debug for EditSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("state", &self.state)
            .field("history", &self.history.stats())
            .field("updating", &self.updating)
            .field("streaming", &self.streaming)
            .finish()
    }
}
