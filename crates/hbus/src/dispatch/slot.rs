// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-call completion slot.
//!
//! One slot exists per in-flight call that expects a reply. The reader
//! thread completes it exactly once; whichever thread resolves the call
//! waits on it with an explicit bound. A slot completed after its waiter
//! timed out just holds an outcome nobody collects: the reply is
//! discarded, never misapplied.

use crate::marshal::Value;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Terminal outcome of one call, before demarshaling.
#[derive(Debug)]
pub(crate) enum CallOutcome {
    /// A MethodReturn-kind reply.
    Return { body: Vec<Value> },
    /// An Error-kind reply from the peer.
    Error { name: String, message: String },
    /// The connection went away while the call was pending.
    Disconnected,
}

#[derive(Debug)]
pub(crate) struct CallSlot {
    state: Mutex<Option<CallOutcome>>,
    ready: Condvar,
}

impl CallSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(None),
            ready: Condvar::new(),
        })
    }

    /// Deliver the outcome. First completion wins; later ones are dropped.
    pub(crate) fn complete(&self, outcome: CallOutcome) {
        let mut state = self.state.lock();
        if state.is_some() {
            log::trace!("[dispatch] dropping duplicate completion");
            return;
        }
        *state = Some(outcome);
        self.ready.notify_all();
    }

    /// Wait for the outcome, up to `timeout`. `None` means the bound
    /// elapsed with no completion.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<CallOutcome> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.is_none() {
            if self.ready.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_complete_before_wait() {
        let slot = CallSlot::new();
        slot.complete(CallOutcome::Return { body: Vec::new() });
        let outcome = slot.wait_timeout(Duration::from_millis(10));
        assert!(matches!(outcome, Some(CallOutcome::Return { .. })));
    }

    #[test]
    fn test_wait_times_out() {
        let slot = CallSlot::new();
        assert!(slot.wait_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_completion_crosses_threads() {
        let slot = CallSlot::new();
        let remote = slot.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.complete(CallOutcome::Error {
                name: "org.example.Err".to_string(),
                message: "nope".to_string(),
            });
        });
        let outcome = slot.wait_timeout(Duration::from_secs(2));
        assert!(matches!(outcome, Some(CallOutcome::Error { .. })));
        handle.join().unwrap();
    }

    #[test]
    fn test_first_completion_wins() {
        let slot = CallSlot::new();
        slot.complete(CallOutcome::Disconnected);
        slot.complete(CallOutcome::Return { body: Vec::new() });
        let outcome = slot.wait_timeout(Duration::from_millis(10));
        assert!(matches!(outcome, Some(CallOutcome::Disconnected)));
    }
}
