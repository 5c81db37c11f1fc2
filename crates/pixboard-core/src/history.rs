//! Bounded undo/redo history with a single-flight guard.
//!
//! Effects may be asynchronous, so stepping is split in two phases:
//! [`History::begin_undo`] hands out a [`PendingStep`] and a copy of the
//! command, the caller runs the effect, and [`History::complete`] moves the
//! command between stacks only if the effect succeeded. The busy flag stays
//! set for the whole duration and is released when the step is dropped, so a
//! cancelled effect leaves both stacks untouched.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Default undo stack capacity.
pub const DEFAULT_HISTORY_LIMIT: usize = 30;

/// Why a command was not recorded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History is busy")]
    Busy,
    #[error("Malformed {kind} command: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

/// An entry of the history stacks.
pub trait HistoryCommand {
    /// Short tag for logging.
    fn kind(&self) -> &'static str;

    /// Structural check run before recording.
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

/// An undo or redo in flight. Dropping it releases the busy guard.
#[derive(Debug)]
#[must_use = "pass the step to History::complete"]
pub struct PendingStep {
    direction: Direction,
    busy: Arc<AtomicBool>,
}

impl Drop for PendingStep {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Undo/redo stacks.
#[derive(Debug)]
pub struct History<C> {
    /// Oldest entry at the front.
    undo_stack: VecDeque<C>,
    redo_stack: Vec<C>,
    limit: usize,
    busy: Arc<AtomicBool>,
}

impl<C> Default for History<C> {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl<C: HistoryCommand + Clone> History<C> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C> History<C> {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Next command an undo would revert.
    pub fn peek_undo(&self) -> Option<&C> {
        self.undo_stack.back()
    }

    pub fn peek_redo(&self) -> Option<&C> {
        self.redo_stack.last()
    }

    /// Drain both stacks, returning the undo entries oldest first.
    pub fn clear(&mut self) -> Vec<C> {
        self.redo_stack.clear();
        self.undo_stack.drain(..).collect()
    }

    fn acquire(&self, direction: Direction) -> Option<PendingStep> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("Ignoring {direction:?}: another step is in flight");
            return None;
        }
        Some(PendingStep {
            direction,
            busy: self.busy.clone(),
        })
    }
}

impl<C: HistoryCommand + Clone> History<C> {
    /// Record a freshly applied command.
    ///
    /// Clears the redo stack. At capacity the oldest undo entry is evicted
    /// and returned so the caller can release what it retains.
    pub fn record(&mut self, command: C) -> Result<Option<C>, HistoryError> {
        if self.is_busy() {
            log::warn!("Not recording {} command: history is busy", command.kind());
            return Err(HistoryError::Busy);
        }
        if let Err(reason) = command.validate() {
            log::warn!("Not recording malformed {} command: {}", command.kind(), reason);
            return Err(HistoryError::Malformed {
                kind: command.kind(),
                reason,
            });
        }

        log::info!("Recorded {} command", command.kind());
        self.redo_stack.clear();
        self.undo_stack.push_back(command);
        if self.undo_stack.len() > self.limit {
            return Ok(self.undo_stack.pop_front());
        }
        Ok(None)
    }

    /// Start undoing the most recent command.
    ///
    /// `None` when there is nothing to undo or a step is already in flight.
    pub fn begin_undo(&mut self) -> Option<(PendingStep, C)> {
        let command = self.undo_stack.back()?.clone();
        Some((self.acquire(Direction::Undo)?, command))
    }

    /// Start redoing the most recently undone command.
    pub fn begin_redo(&mut self) -> Option<(PendingStep, C)> {
        let command = self.redo_stack.last()?.clone();
        Some((self.acquire(Direction::Redo)?, command))
    }

    /// Finish a step. On success the command moves to the opposite stack;
    /// on failure it stays where it was. The busy guard is released either
    /// way and the result is passed through.
    pub fn complete<T, E>(&mut self, step: PendingStep, result: Result<T, E>) -> Result<T, E> {
        if result.is_ok() {
            match step.direction {
                Direction::Undo => {
                    if let Some(command) = self.undo_stack.pop_back() {
                        log::info!("Undid {} command", command.kind());
                        self.redo_stack.push(command);
                    }
                }
                Direction::Redo => {
                    if let Some(command) = self.redo_stack.pop() {
                        log::info!("Redid {} command", command.kind());
                        self.undo_stack.push_back(command);
                    }
                }
            }
        }
        drop(step);
        result
    }
}
