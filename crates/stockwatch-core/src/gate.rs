//! Single-fire admission gate.
//!
//! Multiple matching responses can be in flight at once, each suspended in
//! its own body-fetch/parse before reaching the gate. The gate's
//! check-and-admit is an atomic test-and-set, so exactly one candidate wins
//! regardless of interleaving; everyone else is silently dropped.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct CompletionGate {
    fired: AtomicBool,
}

impl CompletionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for exactly one caller over the lifetime of the gate.
    pub fn try_admit(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Permanently shut the gate without admitting anyone. Used on timeout so
    /// a late-resolving candidate is dropped rather than notified.
    pub fn close(&self) {
        self.fired.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
