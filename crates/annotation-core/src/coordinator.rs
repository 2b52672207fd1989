//! Rate limiting of live ink updates into history
//!
//! A drawing surface reports a new snapshot for nearly every pointer sample.
//! Only updates at least `debounce_interval` apart are committed; the rest are
//! dropped. The surface keeps its own live buffer, so dropping an intermediate
//! sample loses nothing but a history checkpoint.

use crate::registry::StateRegistry;
use doc_model::{DocumentKey, Snapshot};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Last accepted instant plus the minimum gap to the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    interval: Duration,
    last_accepted: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_accepted: None }
    }

    /// Accept `now` if enough time has passed, recording it as the new mark
    ///
    /// The very first call is always accepted.
    pub fn try_accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }

    /// Time left until the gate opens again, measured from `now`
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_accepted {
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Result of offering a live update to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Committed to the document's state and history
    Accepted,
    /// Arrived too soon after the last accepted update
    Dropped { retry_after: Duration },
}

impl UpdateOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Forwards rate-limited surface updates into a [`StateRegistry`]
///
/// Each document has its own gate, so fast edits in one document never
/// starve another.
#[derive(Debug)]
pub struct UpdateCoordinator {
    interval: Duration,
    gates: HashMap<DocumentKey, RateLimiter>,
}

impl UpdateCoordinator {
    pub fn new(interval: Duration) -> Self {
        Self { interval, gates: HashMap::new() }
    }

    /// Offer a snapshot the surface observed at `observed_at`
    pub fn snapshot_changed(
        &mut self,
        registry: &mut StateRegistry,
        key: &DocumentKey,
        snapshot: Snapshot,
        observed_at: Instant,
    ) -> UpdateOutcome {
        let interval = self.interval;
        let gate = self.gates.entry(key.clone()).or_insert_with(|| RateLimiter::new(interval));

        if !gate.try_accept(observed_at) {
            let retry_after = gate.remaining(observed_at);
            log::trace!("dropping update for {key}, gate reopens in {retry_after:?}");
            return UpdateOutcome::Dropped { retry_after };
        }

        log::debug!("recording {} byte snapshot for {key}", snapshot.len());
        registry.update_state(key, snapshot);
        UpdateOutcome::Accepted
    }

    /// Commit a snapshot loaded from storage, bypassing the gate
    pub fn load_baseline(&mut self, registry: &mut StateRegistry, key: &DocumentKey, snapshot: Snapshot) {
        log::debug!("loading {} byte baseline for {key}", snapshot.len());
        registry.update_state(key, snapshot);
    }

    /// Drop the gate for `key` so its next update is accepted immediately
    pub fn forget(&mut self, key: &DocumentKey) {
        self.gates.remove(key);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
