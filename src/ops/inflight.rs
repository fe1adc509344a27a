//! Coalescing of concurrent extractions.
//!
//! Two requests for files of the same `name@version` would otherwise both
//! download the tarball and extract it over each other. The gate lets the
//! first caller do the work while later callers for the same key wait for
//! it. A failed run is not shared: its waiters compete to run the work
//! themselves, so one caller's cancellation or transient failure never
//! fails another caller.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::core::error::Result;
use crate::util::cancel::{CancelToken, POLL_INTERVAL};

type Key = (String, String);
type Outcome = std::result::Result<(), String>;

#[derive(Default)]
struct Slot {
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
}

/// Runs at most one extraction per `(name, version)` at a time.
#[derive(Default)]
pub struct ExtractionGate {
    slots: Mutex<HashMap<Key, Arc<Slot>>>,
}

impl ExtractionGate {
    pub fn new() -> Self {
        ExtractionGate::default()
    }

    /// Run `work` for `name@version`, or wait for an identical run already
    /// in progress.
    ///
    /// A waiter returns `Ok` once the run it waited for succeeds. When that
    /// run fails, the waiter tries to become the next runner. Waiting stops
    /// with [`Error::Cancelled`](crate::core::error::Error::Cancelled) as
    /// soon as `cancel` is set.
    pub fn run<F>(&self, name: &str, version: &str, cancel: &CancelToken, work: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let key = (name.to_string(), version.to_string());

        let slot = loop {
            let running = {
                let mut slots = lock(&self.slots);
                match slots.get(&key) {
                    Some(slot) => slot.clone(),
                    None => {
                        let slot = Arc::new(Slot::default());
                        slots.insert(key.clone(), slot.clone());
                        break slot;
                    }
                }
            };

            tracing::debug!("Waiting for in-flight extraction of {}@{}", name, version);
            match wait(&running, cancel)? {
                Ok(()) => return Ok(()),
                Err(message) => tracing::debug!(
                    "In-flight extraction of {}@{} failed ({}), retrying",
                    name,
                    version,
                    message
                ),
            }
        };

        let mut guard = LeaderGuard {
            gate: self,
            key,
            slot,
            outcome: None,
        };
        let result = work();
        guard.outcome = Some(match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(e.to_string()),
        });
        result
    }

    /// Number of keys with work in progress.
    pub fn in_flight(&self) -> usize {
        lock(&self.slots).len()
    }
}

/// Park until the slot has an outcome or `cancel` is set.
fn wait(slot: &Slot, cancel: &CancelToken) -> Result<Outcome> {
    let mut outcome = lock(&slot.outcome);
    loop {
        if let Some(done) = outcome.as_ref() {
            return Ok(done.clone());
        }
        cancel.check()?;

        outcome = match slot.done.wait_timeout(outcome, POLL_INTERVAL) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        };
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Publishes the leader's outcome and releases the key, even on panic.
struct LeaderGuard<'a> {
    gate: &'a ExtractionGate,
    key: Key,
    slot: Arc<Slot>,
    outcome: Option<Outcome>,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        lock(&self.gate.slots).remove(&self.key);

        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err("extraction aborted".to_string()));
        *lock(&self.slot.outcome) = Some(outcome);
        self.slot.done.notify_all();
    }
}
