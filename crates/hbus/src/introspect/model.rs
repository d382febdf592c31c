// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Introspection tree model.
//!
//! Interface and signal nodes are reference-shared: the parser caches them
//! by name and later parses of the same name hand back the identical `Arc`.
//! Their member lists are set exactly once when the enclosing element
//! closes and are immutable afterwards. Method, property, and argument
//! nodes are plain owned data; nothing references them by name across
//! documents.

use std::sync::{Arc, OnceLock};

/// Direction of a method or signal argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDirection {
    In,
    Out,
    /// The document did not say; signals conventionally omit it.
    Unspecified,
}

impl ArgDirection {
    pub(crate) fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("in") => Self::In,
            Some("out") => Self::Out,
            _ => Self::Unspecified,
        }
    }
}

/// One `<arg>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgNode {
    pub name: Option<String>,
    pub type_signature: String,
    pub direction: ArgDirection,
}

/// One `<property>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNode {
    pub name: String,
    pub type_signature: String,
    pub access: String,
}

/// One `<method>` element. Methods are not independently cached; they are
/// only ever reached through their interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNode {
    pub name: String,
    pub args: Vec<ArgNode>,
}

/// One `<signal>` element. Cached by name alongside interfaces.
#[derive(Debug)]
pub struct SignalNode {
    name: String,
    args: OnceLock<Vec<ArgNode>>,
}

impl SignalNode {
    pub(crate) fn open(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            args: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments, empty while the element is still open.
    pub fn args(&self) -> &[ArgNode] {
        self.args.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn seal(&self, args: Vec<ArgNode>) {
        if self.args.set(args).is_err() {
            log::debug!("[introspect] signal {} sealed twice", self.name);
        }
    }
}

/// Members of a closed interface element.
#[derive(Debug, Default)]
pub(crate) struct InterfaceMembers {
    pub(crate) methods: Vec<MethodNode>,
    pub(crate) signals: Vec<Arc<SignalNode>>,
    pub(crate) properties: Vec<PropertyNode>,
    pub(crate) interfaces: Vec<Arc<InterfaceNode>>,
}

/// One `<interface>` element. Cached by name; repeated occurrences across
/// documents resolve to the same node instance.
#[derive(Debug)]
pub struct InterfaceNode {
    name: String,
    members: OnceLock<InterfaceMembers>,
}

impl InterfaceNode {
    pub(crate) fn open(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            members: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[MethodNode] {
        self.members
            .get()
            .map(|m| m.methods.as_slice())
            .unwrap_or(&[])
    }

    pub fn signals(&self) -> &[Arc<SignalNode>] {
        self.members
            .get()
            .map(|m| m.signals.as_slice())
            .unwrap_or(&[])
    }

    pub fn properties(&self) -> &[PropertyNode] {
        self.members
            .get()
            .map(|m| m.properties.as_slice())
            .unwrap_or(&[])
    }

    /// Child interfaces (documents may nest object descriptions).
    pub fn interfaces(&self) -> &[Arc<InterfaceNode>] {
        self.members
            .get()
            .map(|m| m.interfaces.as_slice())
            .unwrap_or(&[])
    }

    /// Find a declared method by name.
    pub fn method(&self, name: &str) -> Option<&MethodNode> {
        self.methods().iter().find(|m| m.name == name)
    }

    pub(crate) fn seal(&self, members: InterfaceMembers) {
        if self.members.set(members).is_err() {
            log::debug!("[introspect] interface {} sealed twice", self.name);
        }
    }
}
