// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wake signal for the outbound writer.
//!
//! Producers enqueue under the queue lock and then nudge the writer here.
//! The atomic flag keeps the hot path lock-free; the condvar is only
//! touched when the writer has actually gone to sleep.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct WriterWake {
    pending: AtomicBool,
    sleeping: Mutex<bool>,
    condvar: Condvar,
}

impl WriterWake {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Signal that work is queued. Cheap enough to call on every enqueue.
    pub(crate) fn notify(&self) {
        self.pending.store(true, Ordering::Release);
        // Racy read is fine: a stale true costs one spurious notify.
        if *self.sleeping.lock() {
            self.condvar.notify_one();
        }
    }

    /// Park until notified or `timeout` elapses. Returns immediately when a
    /// notification is already pending.
    pub(crate) fn wait_timeout(&self, timeout: Duration) {
        if self.pending.swap(false, Ordering::Acquire) {
            return;
        }
        let mut sleeping = self.sleeping.lock();
        if self.pending.swap(false, Ordering::Acquire) {
            return;
        }
        *sleeping = true;
        let _ = self.condvar.wait_for(&mut sleeping, timeout);
        *sleeping = false;
        self.pending.store(false, Ordering::Release);
    }
}
