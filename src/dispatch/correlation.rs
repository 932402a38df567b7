//! Request/response correlation
//!
//! Each submitted command gets a correlation entry: a one-shot result slot
//! plus a condition variable. The worker delivers by first claiming the
//! entry out of the shared map, then writing the slot; the caller reclaims
//! the entry when its deadline passes. Whoever removes the entry from the
//! map owns the outcome, so a result is consumed exactly once and a write
//! that lost the race is discarded without touching caller state.

use crate::error::EngineError;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

type Outcome = Result<Value, EngineError>;

/// One pending request
pub struct CorrelationEntry {
    slot: Mutex<Option<Outcome>>,
    signal: Condvar,
}

impl CorrelationEntry {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            signal: Condvar::new(),
        }
    }

    fn store(&self, outcome: Outcome) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(outcome);
        self.signal.notify_all();
    }

    /// Block until the slot is filled or `deadline` passes
    fn wait_until(&self, deadline: Instant) -> Option<Outcome> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(outcome) = slot.take() {
                return Some(outcome);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .signal
                .wait_timeout(slot, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            slot = guard;
        }
    }
}

/// Shared map of pending requests, keyed by correlation id
#[derive(Clone, Default)]
pub struct CorrelationMap {
    entries: Arc<Mutex<HashMap<Uuid, Arc<CorrelationEntry>>>>,
}

impl CorrelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh entry and return its id
    pub fn register(&self) -> (Uuid, Arc<CorrelationEntry>) {
        let id = Uuid::new_v4();
        let entry = Arc::new(CorrelationEntry::new());
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, entry.clone());
        (id, entry)
    }

    /// Worker side: claim the entry and deliver the outcome into it.
    /// An already-reclaimed id means the caller gave up; the outcome is
    /// dropped and nothing else happens.
    pub fn deliver(&self, id: Uuid, outcome: Outcome) {
        let claimed = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        match claimed {
            Some(entry) => entry.store(outcome),
            None => debug!("result for {id} arrived after reclaim, discarded"),
        }
    }

    /// Caller side: wait on `entry` until `timeout` elapses.
    ///
    /// On deadline the caller races the worker for the entry: winning the
    /// reclaim means a real timeout; losing it means the result write is
    /// imminent, so a short grace wait picks it up.
    pub fn wait(
        &self,
        id: Uuid,
        entry: &CorrelationEntry,
        timeout: Duration,
        grace: Duration,
    ) -> Outcome {
        let deadline = Instant::now() + timeout;
        if let Some(outcome) = entry.wait_until(deadline) {
            return outcome;
        }

        let reclaimed = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some();
        if reclaimed {
            return Err(EngineError::Timeout(timeout.as_millis() as u64));
        }
        // The worker claimed the entry first; its store is imminent
        match entry.wait_until(Instant::now() + grace) {
            Some(outcome) => outcome,
            None => Err(EngineError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Drop a registered entry without waiting (send failure path)
    pub fn forget(&self, id: Uuid) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Number of requests still awaiting delivery
    pub fn pending_len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
