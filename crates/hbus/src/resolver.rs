// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bidirectional mapping between local descriptors and wire names.
//!
//! Registration scans interface descriptors and records the wire name of
//! each (explicit override if present, else the canonicalized structural
//! name) together with every nested signal, flattened to dot-qualified
//! wire form. Lookups that miss the registered mapping fall through to a
//! structural derivation that always yields *some* candidate; whether the
//! candidate corresponds to anything usable is the caller's problem, not
//! the resolver's.
//!
//! The resolver is owned by the connection that created it. There is no
//! process-wide mapping table; teardown is simply dropping the instance.

use crate::descriptor::InterfaceDef;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered local target for a wire name.
#[derive(Debug, Clone)]
pub enum LocalRef {
    /// A registered interface descriptor.
    Interface(Arc<InterfaceDef>),
    /// A signal nested in a registered interface, by index.
    Signal {
        interface: Arc<InterfaceDef>,
        index: usize,
    },
}

/// Result of resolving a wire name to a local target.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Explicitly registered interface.
    Interface(Arc<InterfaceDef>),
    /// Explicitly registered signal.
    Signal {
        interface: Arc<InterfaceDef>,
        index: usize,
    },
    /// Nothing registered; a structurally derived local path candidate.
    /// Loading whatever it names is a distinct step with its own failure
    /// surface.
    Candidate(String),
}

/// Instance-owned name mapping with structural fallback.
#[derive(Debug, Default)]
pub struct NameResolver {
    mappings: RwLock<HashMap<String, LocalRef>>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one interface and all of its nested signals. Idempotent:
    /// re-registering the same descriptor overwrites with equal content.
    pub fn register(&self, iface: &Arc<InterfaceDef>) {
        let mut mappings = self.mappings.write();

        let key = iface
            .wire_override()
            .map(str::to_owned)
            .unwrap_or_else(|| iface.structural_wire_name());
        mappings.insert(key, LocalRef::Interface(iface.clone()));

        for (index, signal) in iface.signals().iter().enumerate() {
            let key = signal
                .wire_override()
                .map(str::to_owned)
                .unwrap_or_else(|| iface.structural_signal_wire_name(signal));
            mappings.insert(
                key,
                LocalRef::Signal {
                    interface: iface.clone(),
                    index,
                },
            );
        }
    }

    /// Bulk registration over a set of interface descriptors.
    pub fn register_all<'a>(&self, interfaces: impl IntoIterator<Item = &'a Arc<InterfaceDef>>) {
        for iface in interfaces {
            self.register(iface);
        }
    }

    /// Wire name for a local target: the explicit override verbatim if one
    /// was declared, else the canonicalized structural name. Pure
    /// derivation; never fails and never consults the mapping table.
    pub fn wire_name_for(&self, local: &LocalRef) -> String {
        match local {
            LocalRef::Interface(iface) => iface
                .wire_override()
                .map(str::to_owned)
                .unwrap_or_else(|| iface.structural_wire_name()),
            LocalRef::Signal { interface, index } => {
                match interface.signals().get(*index) {
                    Some(signal) => signal
                        .wire_override()
                        .map(str::to_owned)
                        .unwrap_or_else(|| interface.structural_signal_wire_name(signal)),
                    // Stale index against a rebuilt descriptor; fall back to
                    // the interface name rather than invent a member.
                    None => interface.structural_wire_name(),
                }
            }
        }
    }

    /// Resolve a wire name to a local target. Explicit registrations win;
    /// a miss falls through to the structural fallback, which derives a
    /// local path candidate and never mutates the primary mapping.
    pub fn local_for(&self, wire_name: &str) -> Resolved {
        if let Some(found) = self.mappings.read().get(wire_name) {
            return match found {
                LocalRef::Interface(iface) => Resolved::Interface(iface.clone()),
                LocalRef::Signal { interface, index } => Resolved::Signal {
                    interface: interface.clone(),
                    index: *index,
                },
            };
        }

        log::trace!(
            "[resolver] no mapping for {}, deriving structural candidate",
            wire_name
        );
        Resolved::Candidate(wire_name.replace('.', "::"))
    }

    /// Number of registered wire names (interfaces plus signals).
    pub fn registered_count(&self) -> usize {
        self.mappings.read().len()
    }
}
