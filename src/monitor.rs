//! Process monitor (§4.9, component I).
//!
//! Owns every live `ProcessHandle` behind one mutex and runs the
//! periodic liveness cycle: detect deaths, fail fast on a required
//! death, move survivors-with-respawn into a delay queue, and restart
//! them once their delay has elapsed, renaming the handle so argv and
//! log file stay distinguishable across restarts (§4.7 "On restart").
//!
//! Handles are keyed by a monotonic id assigned at registration
//! rather than by name, since `rename` changes the name across a
//! restart (§4.9 step 4) and the id must keep identifying the same
//! handle regardless.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, TryLockError};
use std::time::Instant;

use crate::error::Result;
use crate::process::ProcessHandle;

struct State {
    active: HashMap<u64, ProcessHandle>,
    dead: Vec<ProcessHandle>,
    respawning: HashMap<u64, Instant>,
    respawn_counter: HashMap<u64, u32>,
}

pub struct Monitor {
    state: Mutex<State>,
    next_id: AtomicU64,
    shutdown_triggered: AtomicBool,
}

impl Monitor {
    #[must_use]
    pub fn new(handles: Vec<ProcessHandle>) -> Self {
        let mut active = HashMap::with_capacity(handles.len());
        let mut next_id = 0u64;
        for handle in handles {
            active.insert(next_id, handle);
            next_id += 1;
        }
        Monitor {
            state: Mutex::new(State {
                active,
                dead: Vec::new(),
                respawning: HashMap::new(),
                respawn_counter: HashMap::new(),
            }),
            next_id: AtomicU64::new(next_id),
            shutdown_triggered: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn has_shut_down(&self) -> bool {
        self.shutdown_triggered.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).active.len()
    }

    /// Current handle names, sorted. Used by callers (and tests) that
    /// need to observe a respawn's renamed handle (§4.9 "Naming").
    #[must_use]
    pub fn active_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut names: Vec<String> = state.active.values().map(|h| h.name().to_string()).collect();
        names.sort_unstable();
        names
    }

    /// One monitoring cycle (§4.9 steps 1-4). Does nothing if the
    /// mutex is already held (step 1).
    pub fn cycle(&self) {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let mut freshly_died = Vec::new();
        let mut required_died = false;

        for (id, handle) in state.active.iter_mut() {
            if state.respawning.contains_key(id) {
                continue;
            }
            let running = handle.is_running().unwrap_or(false);
            if running {
                continue;
            }

            let description = handle.exit_description().unwrap_or("no exit information").to_string();
            if handle.required() {
                println!("[{}] REQUIRED process has died!", handle.name());
                required_died = true;
                break;
            }

            tracing::warn!(name = handle.name(), description, "process died");
            freshly_died.push(*id);
        }

        if required_died {
            drop(state);
            let _ = self.shutdown();
            return;
        }

        for id in freshly_died {
            let Some(handle) = state.active.get(&id) else { continue };
            if handle.respawn() {
                state.respawning.insert(id, Instant::now());
            } else {
                let mut handle = state.active.remove(&id).expect("checked above");
                let _ = handle.destroy();
                state.dead.push(handle);
            }
        }

        let ready: Vec<u64> = state
            .respawning
            .iter()
            .filter(|(id, died_at)| {
                let delay = state.active.get(id).map(ProcessHandle::respawn_delay).unwrap_or_default();
                died_at.elapsed() >= delay
            })
            .map(|(id, _)| *id)
            .collect();

        for id in ready {
            state.respawning.remove(&id);
            let Some(handle) = state.active.get_mut(&id) else { continue };
            let (base, prior_counter) = split_base_and_counter(handle.name());
            let next_counter = state
                .respawn_counter
                .get(&id)
                .copied()
                .unwrap_or(prior_counter)
                + 1;
            state.respawn_counter.insert(id, next_counter);
            handle.rename(format!("{base}-{next_counter}"));
            if let Err(e) = handle.restart() {
                tracing::error!(name = handle.name(), error = %e, "failed to restart process");
            }
        }
    }

    /// Idempotent: destroys and joins every active handle, in
    /// registration order, then marks the monitor shut down.
    pub fn shutdown(&self) -> Result<()> {
        if self.shutdown_triggered.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut ids: Vec<u64> = state.active.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(mut handle) = state.active.remove(&id) {
                let _ = handle.destroy();
                let _ = handle.wait_for();
                state.dead.push(handle);
            }
        }
        Ok(())
    }
}

/// Splits `<base>-<counter>` at the last `-` (§4.9 "Naming"). Falls
/// back to treating the whole name as the base with counter 0 if the
/// tail isn't numeric, so a malformed name still gets a fresh counter.
fn split_base_and_counter(name: &str) -> (String, u32) {
    match name.rsplit_once('-') {
        Some((base, tail)) if tail.parse::<u32>().is_ok() => (base.to_string(), tail.parse().unwrap()),
        _ => (name.to_string(), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_numeric_tail() {
        assert_eq!(split_base_and_counter("q-1"), ("q".to_string(), 1));
        assert_eq!(split_base_and_counter("talker-node-12"), ("talker-node".to_string(), 12));
    }

    #[test]
    fn falls_back_to_whole_name_when_tail_is_not_numeric() {
        assert_eq!(split_base_and_counter("q"), ("q".to_string(), 0));
        assert_eq!(split_base_and_counter("my-node"), ("my-node".to_string(), 0));
    }
}
