// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Future-style reply handle.
//!
//! Returned immediately by the async convention. Nothing blocks until the
//! handle is resolved, and resolution may happen on any thread. The
//! demarshaling work is identical to the blocking convention, just
//! deferred.

use super::engine::{convert_outcome, EngineShared};
use super::slot::CallSlot;
use super::ReturnValue;
use crate::descriptor::MethodDef;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Handle to a call whose reply may not have arrived yet.
pub struct PendingReply {
    shared: Arc<EngineShared>,
    serial: u64,
    method: MethodDef,
    slot: Arc<CallSlot>,
}

impl PendingReply {
    pub(crate) fn new(
        shared: Arc<EngineShared>,
        serial: u64,
        method: MethodDef,
        slot: Arc<CallSlot>,
    ) -> Self {
        Self {
            shared,
            serial,
            method,
            slot,
        }
    }

    /// Correlation serial of the underlying call.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Resolve with the connection's default timeout.
    pub fn wait(self) -> Result<ReturnValue> {
        let timeout = self.shared.default_timeout;
        self.wait_timeout(timeout)
    }

    /// Resolve with an explicit timeout. On timeout the pending
    /// registration is withdrawn, so a reply arriving later is discarded
    /// rather than delivered to a dead handle.
    pub fn wait_timeout(self, timeout: Duration) -> Result<ReturnValue> {
        match self.slot.wait_timeout(timeout) {
            Some(outcome) => convert_outcome(outcome, &self.method, &*self.shared.marshaller),
            None => {
                self.shared.pending.lock().remove(&self.serial);
                log::debug!(
                    "[dispatch] async call {} timed out after {:?}",
                    self.serial,
                    timeout
                );
                Err(Error::NoReply)
            }
        }
    }
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("serial", &self.serial)
            .field("method", &self.method.name())
            .finish()
    }
}
