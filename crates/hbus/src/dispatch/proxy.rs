// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Caller-facing proxy for one remote object.
//!
//! A proxy couples an [`Endpoint`] with the engine of the connection it
//! lives on. Identity operations (equality, hashing, rendering) are
//! answered directly from the endpoint descriptor without crossing the
//! wire: two proxies are equal when they address the same object, no
//! matter which interface subsets they carry.

use super::engine::CallEngine;
use super::handle::PendingReply;
use super::ReturnValue;
use crate::descriptor::{InterfaceDef, MethodDef};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::marshal::{TypeCode, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// Invocation surface over a remote object.
#[derive(Clone)]
pub struct RemoteProxy {
    endpoint: Arc<Endpoint>,
    engine: Arc<CallEngine>,
}

impl RemoteProxy {
    pub fn new(endpoint: Arc<Endpoint>, engine: Arc<CallEngine>) -> Self {
        Self { endpoint, engine }
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    pub fn bus_name(&self) -> &str {
        self.endpoint.bus_name()
    }

    pub fn object_path(&self) -> &str {
        self.endpoint.object_path()
    }

    /// Always true: a proxy never wraps a local object.
    pub fn is_remote(&self) -> bool {
        true
    }

    /// Blocking call with the connection's default timeout.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<ReturnValue> {
        let (interface, descriptor) = self.resolve(method, &args)?;
        self.engine.invoke(&self.endpoint, &interface, &descriptor, args)
    }

    /// Blocking call with an explicit timeout.
    pub fn call_with_timeout(
        &self,
        method: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<ReturnValue> {
        let (interface, descriptor) = self.resolve(method, &args)?;
        self.engine
            .invoke_with_timeout(&self.endpoint, &interface, &descriptor, args, timeout)
    }

    /// Future-style call; the handle resolves from any thread.
    pub fn call_async(&self, method: &str, args: Vec<Value>) -> Result<PendingReply> {
        let (interface, descriptor) = self.resolve(method, &args)?;
        self.engine
            .invoke_async(&self.endpoint, &interface, &descriptor, args)
    }

    /// Callback call; the handler runs exactly once when the reply lands.
    pub fn call_with_callback(
        &self,
        method: &str,
        args: Vec<Value>,
        handler: impl FnOnce(Result<ReturnValue>) + Send + 'static,
    ) -> Result<()> {
        let (interface, descriptor) = self.resolve(method, &args)?;
        self.engine
            .invoke_with_callback(&self.endpoint, &interface, &descriptor, args, handler)
    }

    /// Resolve a method by name and actual argument types through the
    /// endpoint's interface list. Failing to resolve is an error the caller
    /// sees before anything touches the wire.
    fn resolve(&self, method: &str, args: &[Value]) -> Result<(Arc<InterfaceDef>, MethodDef)> {
        let arg_types: Vec<TypeCode> = args.iter().map(Value::type_code).collect();
        match self.endpoint.find_method(method, &arg_types) {
            Some((interface, descriptor)) => Ok((interface.clone(), descriptor.clone())),
            None => Err(Error::Resolution(format!(
                "no exported interface of {} declares {}/{}",
                self.endpoint,
                method,
                arg_types
                    .iter()
                    .map(TypeCode::signature)
                    .collect::<String>()
            ))),
        }
    }
}

impl PartialEq for RemoteProxy {
    fn eq(&self, other: &Self) -> bool {
        // Endpoint identity only: bus name + object path.
        self.endpoint == other.endpoint
    }
}

impl Eq for RemoteProxy {}

impl Hash for RemoteProxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint.hash(state);
    }
}

impl fmt::Display for RemoteProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)
    }
}

impl fmt::Debug for RemoteProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteProxy")
            .field("endpoint", &self.endpoint.to_string())
            .finish()
    }
}
