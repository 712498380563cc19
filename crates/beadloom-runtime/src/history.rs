#![forbid(unsafe_code)]

//! Bounded snapshot undo/redo over whole designs.
//!
//! # Architecture
//!
//! ```text
//! record(d2)
//! ┌─────────────────────────────────────────┐
//! │ Past:    [Arc(d0), Arc(d1), Arc(d2)]    │
//! │ Future:  []                             │
//! │ Live:    d3 (owned by the store)        │
//! └─────────────────────────────────────────┘
//!
//! undo(d3) -> d2
//! ┌─────────────────────────────────────────┐
//! │ Past:    [Arc(d0), Arc(d1)]             │
//! │ Future:  [Arc(d3)]                      │
//! │ Live:    d2                             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Unlike a store that keeps the current state on its own stack, the live
//! design stays with the caller and is swapped in and out on undo/redo.
//! Snapshots are owned clones behind `Arc`, so nothing the caller does to
//! the live design can reach a stored entry.
//!
//! # Batching
//!
//! [`begin_batch`](DesignHistory::begin_batch) records a snapshot only when
//! no batch is open and then (re)arms an idle timer. Edits that keep
//! arriving inside the idle window share that one snapshot. The batch
//! closes when the window lapses, on [`end_batch`](DesignHistory::end_batch),
//! or on undo/redo.
//!
//! # Invariants
//!
//! 1. `past.len() <= max_depth`; the oldest entry is evicted first.
//! 2. Recording a snapshot clears the future.
//! 3. The future is non-empty only after an undo with no forward edit since.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use beadloom_core::Design;
use web_time::Instant;

use crate::timer::IdleTimer;

/// Default number of undo steps retained.
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

/// Default idle window that closes a history batch.
pub const DEFAULT_BATCH_IDLE: Duration = Duration::from_millis(600);

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub max_depth: usize,
    pub batch_idle: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_HISTORY_DEPTH,
            batch_idle: DEFAULT_BATCH_IDLE,
        }
    }
}

pub struct DesignHistory {
    past: VecDeque<Arc<Design>>,
    future: VecDeque<Arc<Design>>,
    max_depth: usize,
    batch_open: bool,
    idle: IdleTimer,
}

impl fmt::Debug for DesignHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesignHistory")
            .field("undo_depth", &self.past.len())
            .field("redo_depth", &self.future.len())
            .field("max_depth", &self.max_depth)
            .field("batch_open", &self.batch_open)
            .finish()
    }
}

impl Default for DesignHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl DesignHistory {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            max_depth: config.max_depth,
            batch_open: false,
            idle: IdleTimer::new(config.batch_idle),
        }
    }

    // ====================================================================
    // Recording
    // ====================================================================

    /// Push a snapshot of `current` and invalidate the redo timeline.
    pub fn record(&mut self, current: &Design) {
        self.future.clear();
        self.past.push_back(Arc::new(current.clone()));
        while self.past.len() > self.max_depth {
            self.past.pop_front();
        }
    }

    /// Unconditional snapshot that also closes any open batch.
    pub fn checkpoint(&mut self, current: &Design) {
        self.end_batch();
        self.record(current);
    }

    /// Open or extend a batch. Returns true when a new snapshot was taken.
    pub fn begin_batch(&mut self, current: &Design, now: Instant) -> bool {
        if self.batch_open && self.idle.is_expired(now) {
            self.end_batch();
        }
        let opened = !self.batch_open;
        if opened {
            self.record(current);
            self.batch_open = true;
        } else {
            self.future.clear();
        }
        self.idle.restart(now);
        opened
    }

    pub fn end_batch(&mut self) {
        self.batch_open = false;
        self.idle.cancel();
    }

    /// Close the batch if its idle window has lapsed. Returns true if it did.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.batch_open && self.idle.is_expired(now) {
            self.end_batch();
            return true;
        }
        false
    }

    // ====================================================================
    // Undo / Redo
    // ====================================================================

    /// Swap `current` for the most recent snapshot. `None` when there is
    /// nothing to undo.
    pub fn undo(&mut self, current: &Design) -> Option<Design> {
        self.end_batch();
        let previous = self.past.pop_back()?;
        self.future.push_back(Arc::new(current.clone()));
        Some(Arc::unwrap_or_clone(previous))
    }

    pub fn redo(&mut self, current: &Design) -> Option<Design> {
        self.end_batch();
        let next = self.future.pop_back()?;
        self.past.push_back(Arc::new(current.clone()));
        while self.past.len() > self.max_depth {
            self.past.pop_front();
        }
        Some(Arc::unwrap_or_clone(next))
    }

    /// Drop both stacks, e.g. when a different design replaces the live one.
    pub fn clear(&mut self) {
        self.end_batch();
        self.past.clear();
        self.future.clear();
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.batch_open
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Most recent snapshot, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&Design> {
        self.past.back().map(Arc::as_ref)
    }
}
