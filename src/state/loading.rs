//! state::loading
//!
//! Observable "request in flight" flag.
//!
//! # Design
//!
//! The signal has exactly one writer (the service that owns it) and any
//! number of readers holding a `watch::Receiver<bool>`. Raising the flag
//! returns a [`LoadingGuard`]; the flag drops back to `false` when the guard
//! is dropped, so every exit path (success, error, panic, or the surrounding
//! future being dropped) lowers it.
//!
//! Guards are counted. With overlapping calls the flag stays raised until the
//! last outstanding guard is dropped.

use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

/// Boolean loading flag with watch semantics.
#[derive(Debug)]
pub struct LoadingSignal {
    tx: watch::Sender<bool>,
    active: Mutex<usize>,
}

impl LoadingSignal {
    /// Create a lowered signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx,
            active: Mutex::new(0),
        }
    }

    /// Subscribe to changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Current value.
    pub fn is_loading(&self) -> bool {
        *self.tx.borrow()
    }

    /// Raise the flag until the returned guard is dropped.
    pub fn begin(&self) -> LoadingGuard<'_> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active += 1;
        if *active == 1 {
            self.tx.send_replace(true);
        }
        LoadingGuard { signal: self }
    }

    fn lower(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.tx.send_replace(false);
        }
    }
}

impl Default for LoadingSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowers its [`LoadingSignal`] on drop.
#[must_use = "the loading flag is lowered as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LoadingGuard<'a> {
    signal: &'a LoadingSignal,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.signal.lower();
    }
}
