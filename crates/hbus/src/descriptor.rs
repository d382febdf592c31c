// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local interface descriptors.
//!
//! Everything the dispatcher needs to know about a callable method is
//! recorded here once, at registration time: wire names (with optional
//! overrides), parameter types, the declared return shape including tuple
//! arity, and the one-way flag. Nothing is derived per call.

use crate::marshal::TypeCode;

/// Shape of a method's declared return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    /// The method returns nothing.
    Void,
    /// A single value of the given type.
    Single(TypeCode),
    /// Multiple values, reconstructed in wire order. The declared arity
    /// must match the reply exactly.
    Tuple(Vec<TypeCode>),
}

impl ReturnShape {
    /// Declared output types as a slice (empty for void).
    pub fn output_types(&self) -> &[TypeCode] {
        match self {
            Self::Void => &[],
            Self::Single(t) => std::slice::from_ref(t),
            Self::Tuple(ts) => ts,
        }
    }
}

/// Descriptor of one callable method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    name: String,
    wire_override: Option<String>,
    inputs: Vec<TypeCode>,
    returns: ReturnShape,
    no_reply: bool,
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wire_override: None,
            inputs: Vec::new(),
            returns: ReturnShape::Void,
            no_reply: false,
        }
    }

    /// Override the wire member name (otherwise the local name is used).
    pub fn with_wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_override = Some(name.into());
        self
    }

    pub fn with_inputs(mut self, inputs: &[TypeCode]) -> Self {
        self.inputs = inputs.to_vec();
        self
    }

    pub fn returns(mut self, shape: ReturnShape) -> Self {
        self.returns = shape;
        self
    }

    /// Declare the method one-way: no reply is expected or waited for.
    pub fn one_way(mut self) -> Self {
        self.no_reply = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire member name: the explicit override if present, else the local
    /// method name.
    pub fn wire_name(&self) -> &str {
        self.wire_override.as_deref().unwrap_or(&self.name)
    }

    pub fn inputs(&self) -> &[TypeCode] {
        &self.inputs
    }

    pub fn return_shape(&self) -> &ReturnShape {
        &self.returns
    }

    pub fn is_one_way(&self) -> bool {
        self.no_reply
    }
}

/// Descriptor of a signal declared by an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDef {
    name: String,
    wire_override: Option<String>,
    args: Vec<TypeCode>,
}

impl SignalDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wire_override: None,
            args: Vec::new(),
        }
    }

    /// Override the fully qualified wire name for this signal.
    pub fn with_wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_override = Some(name.into());
        self
    }

    pub fn with_args(mut self, args: &[TypeCode]) -> Self {
        self.args = args.to_vec();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_override(&self) -> Option<&str> {
        self.wire_override.as_deref()
    }

    pub fn args(&self) -> &[TypeCode] {
        &self.args
    }
}

/// Descriptor of an exported interface: the unit of registration.
///
/// `local_name` is the canonical Rust-path-style name
/// (`org::example::Player`); the structural wire name flattens the path
/// separators to dots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDef {
    local_name: String,
    wire_override: Option<String>,
    methods: Vec<MethodDef>,
    signals: Vec<SignalDef>,
}

impl InterfaceDef {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            wire_override: None,
            methods: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// Override the wire interface name (otherwise the canonicalized local
    /// name is used).
    pub fn with_wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_override = Some(name.into());
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_signal(mut self, signal: SignalDef) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn wire_override(&self) -> Option<&str> {
        self.wire_override.as_deref()
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    pub fn signals(&self) -> &[SignalDef] {
        &self.signals
    }

    /// Canonicalized structural wire name: the local path with `::`
    /// flattened to `.`.
    pub fn structural_wire_name(&self) -> String {
        self.local_name.replace("::", ".")
    }

    /// Structural wire name of a nested signal: the interface's canonical
    /// name qualified with the signal's local name.
    pub fn structural_signal_wire_name(&self, signal: &SignalDef) -> String {
        format!("{}.{}", self.structural_wire_name(), signal.name())
    }
}
