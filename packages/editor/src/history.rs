//! # Undo/Redo History
//!
//! Bounded snapshot history over full editor states.
//!
//! ## Design
//!
//! - `past` holds older snapshots (oldest first), `future` the undone ones
//!   (nearest redo first), `present` the snapshot currently on screen
//! - Every push, undo and redo works on clones, so a caller mutating what it
//!   got back can never reach into stored history
//! - New pushes clear `future`
//! - `past` never exceeds `max_size`; the oldest snapshot is evicted first
//! - Coalescing bursts of edits is the caller's job; pushes are taken as-is
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = HistoryManager::new(50);
//! history.push(state_a);
//! history.push(state_b);
//!
//! assert_eq!(history.undo(), Some(state_a));
//! assert_eq!(history.redo(), Some(state_b));
//! ```

use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// A stored state and when it was captured (unix millis)
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot<T> {
    pub state: T,
    pub timestamp: i64,
}

impl<T> HistorySnapshot<T> {
    fn capture(state: T) -> Self {
        Self {
            state,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Counts for UI affordances; never exposes snapshot contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub past: usize,
    pub future: usize,
    pub max_size: usize,
    pub enabled: bool,
    pub has_present: bool,
}

/// Undo/redo history for editor snapshots
#[derive(Debug)]
pub struct HistoryManager<T> {
    past: VecDeque<HistorySnapshot<T>>,
    present: Option<HistorySnapshot<T>>,
    future: VecDeque<HistorySnapshot<T>>,
    max_size: usize,
    enabled: bool,
}

impl<T: Clone> HistoryManager<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: VecDeque::new(),
            max_size,
            enabled: true,
        }
    }

    /// Install the first snapshot; ignored once a present exists
    fn initialize(&mut self, state: &T) {
        if self.present.is_some() {
            debug!("History already initialized");
            return;
        }
        self.present = Some(HistorySnapshot::capture(state.clone()));
    }

    /// Record `state` as the new present
    pub fn push(&mut self, state: &T) {
        if !self.enabled {
            return;
        }
        let Some(previous) = self.present.take() else {
            self.initialize(state);
            return;
        };

        self.past.push_back(previous);
        self.present = Some(HistorySnapshot::capture(state.clone()));
        self.future.clear();
        self.evict();
    }

    /// Step back; `None` when disabled or nothing to undo
    pub fn undo(&mut self) -> Option<T> {
        if !self.can_undo() {
            return None;
        }
        let previous = self.past.pop_back()?;
        let current = self.present.replace(previous)?;
        self.future.push_front(current);
        self.present.as_ref().map(|s| s.state.clone())
    }

    /// Step forward; `None` when disabled or nothing to redo
    pub fn redo(&mut self) -> Option<T> {
        if !self.can_redo() {
            return None;
        }
        let next = self.future.pop_front()?;
        let current = self.present.replace(next)?;
        self.past.push_back(current);
        self.evict();
        self.present.as_ref().map(|s| s.state.clone())
    }

    pub fn can_undo(&self) -> bool {
        self.enabled && self.present.is_some() && !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.enabled && self.present.is_some() && !self.future.is_empty()
    }

    /// Copy of the present state
    pub fn current(&self) -> Option<T> {
        self.present.as_ref().map(|s| s.state.clone())
    }

    /// Copy of the present snapshot, timestamp included
    pub fn current_snapshot(&self) -> Option<HistorySnapshot<T>> {
        self.present.clone()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.present = None;
        self.future.clear();
    }

    /// Drop everything and start over from `state`
    pub fn reset(&mut self, state: &T) {
        self.clear();
        self.initialize(state);
    }

    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict();
    }

    /// Disabling keeps the stacks; re-enabling resumes where it left off
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            past: self.past.len(),
            future: self.future.len(),
            max_size: self.max_size,
            enabled: self.enabled,
            has_present: self.present.is_some(),
        }
    }

    fn evict(&mut self) {
        while self.past.len() > self.max_size {
            self.past.pop_front();
        }
    }
}

impl<T: Clone> Default for HistoryManager<T> {
    fn default() -> Self {
        Self::new(50)
    }
}
