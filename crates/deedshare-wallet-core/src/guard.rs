//! Concurrency/debounce guard for expensive composite reads.
//!
//! Several independent consumers mounting at once used to re-trigger the
//! same bulk load; the guard gives each query shape a key and admits at most
//! one in-flight load per key, with a minimum interval between completions.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A load under the same key is already in flight.
    InFlight,
    /// The previous load under this key finished too recently.
    Throttled,
    /// The key was invalidated while the load ran; the result is discarded.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<V> {
    Completed(V),
    Skipped(SkipReason),
}

impl<V> GuardOutcome<V> {
    pub fn completed(self) -> Option<V> {
        match self {
            GuardOutcome::Completed(v) => Some(v),
            GuardOutcome::Skipped(_) => None,
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self, GuardOutcome::Skipped(_))
    }
}

#[derive(Debug, Default)]
struct GuardSlot {
    in_flight: bool,
    /// Bumped by invalidation; a load that started under an older epoch is
    /// abandoned on completion.
    epoch: u64,
    last_finished_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct LoadGuard {
    slots: Mutex<HashMap<String, GuardSlot>>,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `load` under `key` unless a load is already in flight or the last
    /// one finished less than `min_interval_ms` ago. The in-flight flag is
    /// released on success, on error, and on unwind, so a failed or torn-down
    /// load can never block future loads.
    pub fn run<V, E>(
        &self,
        key: &str,
        min_interval_ms: u64,
        now_ms: u64,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<GuardOutcome<V>, E> {
        let epoch = match self.acquire(key, min_interval_ms, now_ms) {
            Ok(epoch) => epoch,
            Err(reason) => return Ok(GuardOutcome::Skipped(reason)),
        };

        let reset = ResetOnUnwind { guard: self, key };
        let result = load();
        std::mem::forget(reset);

        let retained = self.release(key, epoch, now_ms);
        match result {
            Err(e) => Err(e),
            Ok(_) if !retained => Ok(GuardOutcome::Skipped(SkipReason::Abandoned)),
            Ok(v) => Ok(GuardOutcome::Completed(v)),
        }
    }

    /// Invalidate one key: clears the in-flight flag and the throttle window,
    /// and marks any load still running under it as abandoned.
    pub fn invalidate(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(key) {
            slot.in_flight = false;
            slot.epoch = slot.epoch.wrapping_add(1);
            slot.last_finished_ms = None;
        }
    }

    /// Invalidate every key; used when the signing identity changes.
    pub fn invalidate_all(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for slot in slots.values_mut() {
            slot.in_flight = false;
            slot.epoch = slot.epoch.wrapping_add(1);
            slot.last_finished_ms = None;
        }
    }

    fn acquire(&self, key: &str, min_interval_ms: u64, now_ms: u64) -> Result<u64, SkipReason> {
        let mut slots = self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let slot = slots.entry(key.to_owned()).or_default();
        if slot.in_flight {
            return Err(SkipReason::InFlight);
        }
        if let Some(finished) = slot.last_finished_ms {
            if now_ms.saturating_sub(finished) < min_interval_ms {
                return Err(SkipReason::Throttled);
            }
        }
        slot.in_flight = true;
        Ok(slot.epoch)
    }

    /// Returns false when the slot's epoch moved while the load ran, i.e.
    /// the consumer tore down and the result must be discarded.
    fn release(&self, key: &str, epoch: u64, now_ms: u64) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(slot) = slots.get_mut(key) else {
            return false;
        };
        if slot.epoch != epoch {
            return false;
        }
        slot.in_flight = false;
        slot.last_finished_ms = Some(now_ms);
        true
    }
}

struct ResetOnUnwind<'a> {
    guard: &'a LoadGuard,
    key: &'a str,
}

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        let mut slots = self
            .guard
            .slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(self.key) {
            slot.in_flight = false;
        }
    }
}
