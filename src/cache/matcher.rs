//! Key pattern matcher with start/stop lifecycle.
//!
//! A spec is a list of key prefixes separated by `|` or `,`. A stopped
//! matcher answers with the caller's default instead of matching.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Compiled prefix patterns, swapped atomically on start/stop.
#[derive(Debug, Default)]
pub struct Matcher {
    patterns: ArcSwapOption<Vec<String>>,
    starts: AtomicU64,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `spec` and begin matching. An empty spec leaves the matcher stopped.
    pub fn start(&self, spec: &str) {
        let patterns: Vec<String> = spec
            .split(['|', ','])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        if patterns.is_empty() {
            self.stop();
            return;
        }

        self.patterns.store(Some(Arc::new(patterns)));
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.patterns.store(None);
    }

    pub fn is_running(&self) -> bool {
        self.patterns.load().is_some()
    }

    /// How many times the matcher has been started.
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    /// True if `key` starts with any pattern; `default` when stopped.
    pub fn check(&self, key: &str, default: bool) -> bool {
        match self.patterns.load().as_ref() {
            Some(patterns) => patterns.iter().any(|p| key.starts_with(p.as_str())),
            None => default,
        }
    }
}
