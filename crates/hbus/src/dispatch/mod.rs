// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote-call dispatch and correlation.
//!
//! The [`CallEngine`] owns everything a connection needs to issue calls:
//! the outbound message ring and its writer thread, the reader thread that
//! correlates replies by serial, the pending-call table, the name resolver,
//! and the introspection cache. [`RemoteProxy`] is the caller-facing
//! surface over one remote object.
//!
//! Three calling conventions are supported, all sharing one dispatch path:
//!
//! - blocking ([`CallEngine::invoke`]) parks the calling thread on a
//!   per-call slot until reply or timeout;
//! - future-style ([`CallEngine::invoke_async`]) returns a
//!   [`PendingReply`] immediately and defers the wait to whoever resolves
//!   it;
//! - callback ([`CallEngine::invoke_with_callback`]) never blocks the
//!   caller and runs the handler on the reader thread, exactly once.

mod engine;
mod handle;
mod proxy;
mod slot;
mod wake;

pub use engine::{CallEngine, EngineConfig};
pub use handle::PendingReply;
pub use proxy::RemoteProxy;

use crate::marshal::Value;

/// Demarshaled result of a completed call, shaped by the method's declared
/// return.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// The method declares no return value.
    Void,
    /// A single declared value.
    Single(Value),
    /// A declared multi-value return, in wire order.
    Tuple(Vec<Value>),
}

impl ReturnValue {
    /// The single value, if this is a single-value return.
    pub fn into_single(self) -> Option<Value> {
        match self {
            Self::Single(v) => Some(v),
            _ => None,
        }
    }

    /// All returned values as a flat list (empty for void).
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::Void => Vec::new(),
            Self::Single(v) => vec![v],
            Self::Tuple(vs) => vs,
        }
    }
}
