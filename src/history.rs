//! Undo/redo over full snapshots of a value.
//!
//! `History<T>` keeps a past stack, the present value, and a future stack.
//! Every committed change pushes the previous present onto the past stack and
//! clears the future. A `pause()` / `resume()` bracket collapses everything
//! that happens inside it into at most one entry: the state at the outermost
//! `pause()` is compared with the state at the matching `resume()`, and one
//! entry is recorded only if they differ. Brackets nest.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::consts::HISTORY_LIMIT;

/// Snapshot history for one value.
#[derive(Debug, Clone)]
pub struct History<T> {
    past: Vec<T>,
    present: T,
    future: Vec<T>,
    limit: usize,
    pause_depth: usize,
    /// Present at the outermost `pause()`.
    bracket_start: Option<T>,
}

impl<T: Clone + PartialEq> History<T> {
    /// History with the default depth.
    #[must_use]
    pub fn new(present: T) -> Self {
        Self::with_limit(present, HISTORY_LIMIT)
    }

    /// History keeping at most `limit` past entries (minimum 1).
    #[must_use]
    pub fn with_limit(present: T, limit: usize) -> Self {
        Self { past: Vec::new(), present, future: Vec::new(), limit: limit.max(1), pause_depth: 0, bracket_start: None }
    }

    #[must_use]
    pub fn present(&self) -> &T {
        &self.present
    }

    /// Replace the present value.
    ///
    /// Outside a bracket a real change records one entry; inside a bracket the
    /// value is replaced without recording.
    pub fn set(&mut self, next: T) {
        if next == self.present {
            return;
        }
        let previous = std::mem::replace(&mut self.present, next);
        if self.pause_depth == 0 {
            self.record(previous);
        }
    }

    /// Mutate the present value in place, with the same recording rules as [`set`](Self::set).
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        let mut next = self.present.clone();
        f(&mut next);
        self.set(next);
    }

    /// Open a bracket. Nested calls must be balanced by [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if self.pause_depth == 0 {
            self.bracket_start = Some(self.present.clone());
        }
        self.pause_depth += 1;
    }

    /// Close a bracket. Returns whether an entry was recorded.
    ///
    /// Unbalanced calls are ignored.
    pub fn resume(&mut self) -> bool {
        if self.pause_depth == 0 {
            return false;
        }
        self.pause_depth -= 1;
        if self.pause_depth > 0 {
            return false;
        }
        match self.bracket_start.take() {
            Some(start) if start != self.present => {
                self.record(start);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause_depth > 0
    }

    fn record(&mut self, previous: T) {
        self.past.push(previous);
        if self.past.len() > self.limit {
            self.past.remove(0);
        }
        self.future.clear();
        tracing::debug!(past = self.past.len(), "history entry recorded");
    }

    /// Step back one entry. No-op while paused or with nothing to undo.
    pub fn undo(&mut self) -> bool {
        if self.is_paused() {
            return false;
        }
        let Some(previous) = self.past.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push(current);
        true
    }

    /// Step forward one entry. No-op while paused or with nothing to redo.
    pub fn redo(&mut self) -> bool {
        if self.is_paused() {
            return false;
        }
        let Some(next) = self.future.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push(current);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.is_paused() && !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.is_paused() && !self.future.is_empty()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    /// Replace the present and forget all history, including open brackets.
    pub fn reset(&mut self, present: T) {
        self.present = present;
        self.past.clear();
        self.future.clear();
        self.pause_depth = 0;
        self.bracket_start = None;
    }
}

impl<T: Clone + PartialEq + Default> Default for History<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
