//! Delayed actions keyed by generation
//!
//! Each entry remembers the generation it was scheduled under. Bumping the
//! generation (phase change, reset) drops every pending entry, so a timer from
//! an earlier phase can never fire into a later one.

use serde::{Deserialize, Serialize};

use super::state::Side;

/// Work the reducer runs when a timer expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledAction {
    /// The thrown baton has come to rest
    BatonSettled(Side),
    /// The bot picks and throws at its next target
    BotDecision,
    /// The bot tosses the next kubb from the return queue
    BotReturnThrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Entry {
    due: u64,
    generation: u64,
    action: ScheduledAction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    entries: Vec<Entry>,
    generation: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue `action` to run `delay` ticks after `now`
    pub fn schedule(&mut self, now: u64, delay: u64, action: ScheduledAction) {
        self.entries.push(Entry {
            due: now + delay,
            generation: self.generation,
            action,
        });
    }

    /// Invalidate everything pending
    pub fn advance_generation(&mut self) {
        self.generation += 1;
        self.entries.clear();
    }

    /// Remove and return the earliest due action for the current generation
    pub fn pop_due(&mut self, now: u64) -> Option<ScheduledAction> {
        let generation = self.generation;
        self.entries.retain(|e| e.generation == generation);
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by_key(|(_, e)| e.due)
            .map(|(i, _)| i)?;
        Some(self.entries.remove(idx).action)
    }
}
