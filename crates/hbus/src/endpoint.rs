// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote object identity.
//!
//! An [`Endpoint`] names one object on the bus: bus name plus object path,
//! together with the ordered set of interfaces the caller believes the
//! object exports and the autostart preference. Equality and hashing cover
//! the address only; the interface list is a view of the object, not part
//! of its identity.

use crate::descriptor::{InterfaceDef, MethodDef};
use crate::marshal::TypeCode;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Immutable descriptor of a remote object.
#[derive(Debug, Clone)]
pub struct Endpoint {
    bus_name: String,
    object_path: String,
    interfaces: Vec<Arc<InterfaceDef>>,
    autostart: bool,
}

impl Endpoint {
    pub fn new(
        bus_name: impl Into<String>,
        object_path: impl Into<String>,
        interfaces: Vec<Arc<InterfaceDef>>,
        autostart: bool,
    ) -> Self {
        Self {
            bus_name: bus_name.into(),
            object_path: object_path.into(),
            interfaces,
            autostart,
        }
    }

    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    pub fn interfaces(&self) -> &[Arc<InterfaceDef>] {
        &self.interfaces
    }

    /// Whether calls through this endpoint may ask the bus to launch the
    /// target service. Consulted once per dispatch.
    pub fn autostarting(&self) -> bool {
        self.autostart
    }

    /// Find the first interface declaring `name` with the given parameter
    /// types, scanning in registration order.
    ///
    /// If two exported interfaces declare the same method name and
    /// signature, the earlier-registered one shadows the later. This is
    /// intentional precedence, not a collision error.
    pub fn find_method(
        &self,
        name: &str,
        arg_types: &[TypeCode],
    ) -> Option<(&Arc<InterfaceDef>, &MethodDef)> {
        for iface in &self.interfaces {
            for method in iface.methods() {
                if method.name() == name && method.inputs() == arg_types {
                    return Some((iface, method));
                }
            }
        }
        None
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.bus_name == other.bus_name && self.object_path == other.object_path
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bus_name.hash(state);
        self.object_path.hash(state);
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:[", self.bus_name, self.object_path)?;
        for (i, iface) in self.interfaces.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", iface.local_name())?;
        }
        write!(f, "]")
    }
}
