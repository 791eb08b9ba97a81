//! `$(anon id)` per-process deterministic unique identifiers (§4.1).
//!
//! Shape: `id_<hostname>_<pid>_<random-non-negative>` with `.`, `-`,
//! `:` replaced by `_`. The first call for a given `id` in a run is
//! memoized; subsequent calls return the same string. This is the
//! crate's one piece of process-global state besides the run id
//! (§9 "Process-global state"), so — like `agentwire`'s
//! `INIT_PROCESSES` `AtomicBool` guarding process-agent init — writes
//! are serialized behind a single mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;

/// Process-global memo of `$(anon id)` resolutions for this run.
#[derive(Debug, Default)]
pub struct AnonRegistry {
    memo: Mutex<HashMap<String, String>>,
}

impl AnonRegistry {
    #[must_use]
    pub fn new() -> Self {
        AnonRegistry { memo: Mutex::new(HashMap::new()) }
    }

    /// Returns the memoized id for `name`, generating and storing one
    /// on first use.
    pub fn resolve(&self, name: &str) -> String {
        let mut memo = self.memo.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = memo.get(name) {
            return existing.clone();
        }
        let generated = generate(name);
        memo.insert(name.to_string(), generated.clone());
        generated
    }
}

fn generate(name: &str) -> String {
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    let pid = std::process::id();
    let random: u32 = rand::thread_rng().gen_range(0..i32::MAX as u32);
    sanitize(&format!("{name}_{hostname}_{pid}_{random}"))
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if matches!(c, '.' | '-' | ':') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memoizes_per_id() {
        let reg = AnonRegistry::new();
        let a = reg.resolve("foo");
        let b = reg.resolve("foo");
        let c = reg.resolve("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn sanitizes_reserved_characters() {
        assert_eq!(sanitize("a.b-c:d"), "a_b_c_d");
    }
}
