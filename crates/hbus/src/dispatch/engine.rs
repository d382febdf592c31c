// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The call dispatcher.
//!
//! Turns a resolved local call into an outbound wire message, tracks it by
//! correlation serial until the matching reply arrives, and resolves it
//! through one of three conventions: blocking, future-style handle, or
//! registered callback.
//!
//! One writer thread drains the outbound ring into the transport; one
//! reader thread matches inbound frames against the pending table. Caller
//! threads only ever touch the ring (under its mutex), the pending table,
//! and their own completion slot; no additional threads are spawned per
//! call.

use super::handle::PendingReply;
use super::slot::{CallOutcome, CallSlot};
use super::wake::WriterWake;
use super::ReturnValue;
use crate::descriptor::{InterfaceDef, MethodDef, ReturnShape};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::introspect::IntrospectionCache;
use crate::marshal::{Marshaller, Value, WireMarshaller};
use crate::message::{flags, Message, MessageKind};
use crate::resolver::{LocalRef, NameResolver};
use crate::ring::Ring;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// How often the service threads wake to re-check the shutdown flag.
const SERVICE_POLL: Duration = Duration::from_millis(20);

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound applied to sync waits issued without an explicit timeout.
    pub default_timeout: Duration,
    /// Initial capacity of the outbound message ring.
    pub outbound_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(10),
            outbound_capacity: 32,
        }
    }
}

impl EngineConfig {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }
}

/// One registered in-flight call.
pub(crate) enum Pending {
    /// A sync or async waiter parked on a slot.
    Slot(Arc<CallSlot>),
    /// A callback to run when the reply arrives.
    Callback {
        method: MethodDef,
        handler: Box<dyn FnOnce(Result<ReturnValue>) + Send>,
    },
}

/// State shared between the engine handle and its service threads.
pub(crate) struct EngineShared {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) marshaller: Arc<dyn Marshaller>,
    pub(crate) resolver: NameResolver,
    pub(crate) introspection: IntrospectionCache,
    pub(crate) outbound: Mutex<Ring<Message>>,
    pub(crate) writer_wake: WriterWake,
    /// Correlation table for every in-flight call, all conventions.
    /// One lock; insert/remove/lookup are each a single critical section.
    pub(crate) pending: Mutex<HashMap<u64, Pending>>,
    pub(crate) serial: AtomicU64,
    pub(crate) connected: AtomicBool,
    pub(crate) default_timeout: Duration,
}

/// Remote-call dispatch and correlation engine for one connection.
pub struct CallEngine {
    shared: Arc<EngineShared>,
    writer: Mutex<Option<JoinHandle<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl CallEngine {
    /// Start the engine over a transport with the default marshaller.
    pub fn start(transport: Arc<dyn Transport>, config: EngineConfig) -> Self {
        Self::with_marshaller(transport, Arc::new(WireMarshaller::new()), config)
    }

    /// Start the engine with an explicit marshaller capability.
    pub fn with_marshaller(
        transport: Arc<dyn Transport>,
        marshaller: Arc<dyn Marshaller>,
        config: EngineConfig,
    ) -> Self {
        let shared = Arc::new(EngineShared {
            transport,
            marshaller,
            resolver: NameResolver::new(),
            introspection: IntrospectionCache::new(),
            outbound: Mutex::new(Ring::with_capacity(config.outbound_capacity)),
            writer_wake: WriterWake::new(),
            pending: Mutex::new(HashMap::new()),
            serial: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            default_timeout: config.default_timeout,
        });

        let writer = {
            let shared = shared.clone();
            std::thread::spawn(move || writer_loop(&shared))
        };
        let reader = {
            let shared = shared.clone();
            std::thread::spawn(move || reader_loop(&shared))
        };

        Self {
            shared,
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Name resolver owned by this connection.
    pub fn resolver(&self) -> &NameResolver {
        &self.shared.resolver
    }

    /// Introspection cache owned by this connection.
    pub fn introspection(&self) -> &IntrospectionCache {
        &self.shared.introspection
    }

    /// Register an endpoint's exported interfaces with the resolver.
    pub fn register_endpoint(&self, endpoint: &Endpoint) {
        self.shared.resolver.register_all(endpoint.interfaces());
    }

    pub fn default_timeout(&self) -> Duration {
        self.shared.default_timeout
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire) && self.shared.transport.is_connected()
    }

    /// Correlation serials of messages still queued for the writer, oldest
    /// first.
    pub fn queued_serials(&self) -> Vec<u64> {
        let queue = self.shared.outbound.lock();
        queue.snapshot().iter().map(|m| m.serial).collect()
    }

    /// Blocking call with the connection's default timeout.
    pub fn invoke(
        &self,
        endpoint: &Endpoint,
        interface: &Arc<InterfaceDef>,
        method: &MethodDef,
        args: Vec<Value>,
    ) -> Result<ReturnValue> {
        self.invoke_with_timeout(endpoint, interface, method, args, self.shared.default_timeout)
    }

    /// Blocking call with an explicit timeout. A timeout yields
    /// [`Error::NoReply`]; the pending registration is removed so a late
    /// reply is discarded instead of misapplied.
    pub fn invoke_with_timeout(
        &self,
        endpoint: &Endpoint,
        interface: &Arc<InterfaceDef>,
        method: &MethodDef,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<ReturnValue> {
        let call = self.build_call(endpoint, interface, method, args, false)?;
        let serial = call.serial;

        if method.is_one_way() {
            self.enqueue(call);
            return Ok(ReturnValue::Void);
        }

        let slot = CallSlot::new();
        self.register_slot(serial, slot.clone())?;
        self.enqueue(call);

        match slot.wait_timeout(timeout) {
            Some(outcome) => convert_outcome(outcome, method, &*self.shared.marshaller),
            None => {
                self.shared.pending.lock().remove(&serial);
                log::debug!("[dispatch] call {} timed out after {:?}", serial, timeout);
                Err(Error::NoReply)
            }
        }
    }

    /// Future-style call: returns a handle immediately; resolving the
    /// handle later performs the same wait/convert/demarshal as a blocking
    /// call, from whichever thread queries it.
    pub fn invoke_async(
        &self,
        endpoint: &Endpoint,
        interface: &Arc<InterfaceDef>,
        method: &MethodDef,
        args: Vec<Value>,
    ) -> Result<PendingReply> {
        let call = self.build_call(endpoint, interface, method, args, true)?;
        let serial = call.serial;
        let slot = CallSlot::new();

        if method.is_one_way() {
            // Nothing will ever answer; resolve the handle up front.
            slot.complete(CallOutcome::Return { body: Vec::new() });
            self.enqueue(call);
        } else {
            self.register_slot(serial, slot.clone())?;
            self.enqueue(call);
        }

        Ok(PendingReply::new(
            self.shared.clone(),
            serial,
            method.clone(),
            slot,
        ))
    }

    /// Callback call: registers the handler keyed by correlation serial and
    /// returns immediately. The handler runs exactly once, on the reader
    /// thread, after its table entry is removed.
    pub fn invoke_with_callback(
        &self,
        endpoint: &Endpoint,
        interface: &Arc<InterfaceDef>,
        method: &MethodDef,
        args: Vec<Value>,
        handler: impl FnOnce(Result<ReturnValue>) + Send + 'static,
    ) -> Result<()> {
        let call = self.build_call(endpoint, interface, method, args, false)?;
        let serial = call.serial;

        if method.is_one_way() {
            self.enqueue(call);
            handler(Ok(ReturnValue::Void));
            return Ok(());
        }

        self.shared.pending.lock().insert(
            serial,
            Pending::Callback {
                method: method.clone(),
                handler: Box::new(handler),
            },
        );
        // Close the window against a disconnect that drained the table
        // between the connected check and the insert.
        if !self.shared.connected.load(Ordering::Acquire) {
            let entry = self.shared.pending.lock().remove(&serial);
            if let Some(Pending::Callback { handler, .. }) = entry {
                handler(Err(Error::NotConnected));
            }
            return Ok(());
        }
        self.enqueue(call);
        Ok(())
    }

    /// Tear the connection down: every outstanding call, whatever its
    /// convention, resolves with [`Error::NotConnected`]; no registration is
    /// left behind. Idempotent.
    pub fn disconnect(&self) {
        log::debug!("[dispatch] disconnecting, failing all pending calls");
        fail_all_pending(&self.shared);
        self.shared.writer_wake.notify();

        let writer = self.writer.lock().take();
        let reader = self.reader.lock().take();
        for handle in [writer, reader].into_iter().flatten() {
            let _ = handle.join();
        }
    }

    /// Build the outbound call message: resolve wire names, compute the
    /// signature, marshal arguments, compute flags, stamp a fresh serial.
    /// Every failure here is local and happens before anything is queued.
    fn build_call(
        &self,
        endpoint: &Endpoint,
        interface: &Arc<InterfaceDef>,
        method: &MethodDef,
        args: Vec<Value>,
        async_convention: bool,
    ) -> Result<Message> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let interface_name = self
            .shared
            .resolver
            .wire_name_for(&LocalRef::Interface(interface.clone()));
        let member = method.wire_name();

        let signature = self.shared.marshaller.signature_of(method.inputs())?;
        let body = self.shared.marshaller.marshal(args, method.inputs())?;

        let mut call_flags = 0u8;
        if !endpoint.autostarting() {
            call_flags |= flags::NO_AUTO_START;
        }
        if async_convention {
            call_flags |= flags::ASYNC;
        }
        if method.is_one_way() {
            call_flags |= flags::NO_REPLY_EXPECTED;
        }

        let serial = self.shared.serial.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "[dispatch] call {} -> {} {}.{}",
            serial,
            endpoint.bus_name(),
            interface_name,
            member
        );

        Ok(Message::method_call(
            serial,
            endpoint.bus_name(),
            endpoint.object_path(),
            &interface_name,
            member,
            call_flags,
            signature,
            body,
        ))
    }

    fn register_slot(&self, serial: u64, slot: Arc<CallSlot>) -> Result<()> {
        self.shared.pending.lock().insert(serial, Pending::Slot(slot));
        // Same race window as the callback path: a disconnect may have
        // drained the table while we were inserting.
        if !self.shared.connected.load(Ordering::Acquire) {
            self.shared.pending.lock().remove(&serial);
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    /// Push into the outbound ring (a critical section shared by all caller
    /// threads) and nudge the writer.
    fn enqueue(&self, call: Message) {
        self.shared.outbound.lock().add(call);
        self.shared.writer_wake.notify();
    }
}

impl Drop for CallEngine {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Drain the outbound ring into the transport, preserving FIFO order.
fn writer_loop(shared: &Arc<EngineShared>) {
    log::trace!("[dispatch] writer thread up");
    loop {
        if !shared.connected.load(Ordering::Acquire) {
            break;
        }
        let next = shared.outbound.lock().remove();
        match next {
            Some(message) => {
                if let Err(e) = shared.transport.send(message) {
                    log::debug!("[dispatch] send failed ({}), tearing down", e);
                    fail_all_pending(shared);
                    break;
                }
            }
            None => shared.writer_wake.wait_timeout(SERVICE_POLL),
        }
    }
    log::trace!("[dispatch] writer thread down");
}

/// Read inbound frames and correlate replies to pending calls.
fn reader_loop(shared: &Arc<EngineShared>) {
    log::trace!("[dispatch] reader thread up");
    loop {
        if !shared.connected.load(Ordering::Acquire) {
            break;
        }
        match shared.transport.recv_timeout(SERVICE_POLL) {
            Ok(Some(message)) => route_inbound(shared, message),
            Ok(None) => {}
            Err(_) => {
                log::debug!("[dispatch] transport closed, failing pending calls");
                fail_all_pending(shared);
                break;
            }
        }
    }
    log::trace!("[dispatch] reader thread down");
}

/// Match one inbound message against the pending table. Replies are
/// correlated purely by serial; arrival order is irrelevant.
fn route_inbound(shared: &Arc<EngineShared>, message: Message) {
    match message.kind {
        MessageKind::MethodReturn | MessageKind::Error => {
            let Some(reply_serial) = message.reply_serial else {
                log::trace!("[dispatch] reply without reply-serial, dropping");
                return;
            };
            // Remove-then-complete keeps the check-and-act atomic: a serial
            // can never be answered twice. The handler runs outside the
            // table lock.
            let entry = shared.pending.lock().remove(&reply_serial);
            match entry {
                Some(Pending::Slot(slot)) => slot.complete(outcome_of(message)),
                Some(Pending::Callback { method, handler }) => {
                    let result =
                        convert_outcome(outcome_of(message), &method, &*shared.marshaller);
                    handler(result);
                }
                None => {
                    log::trace!(
                        "[dispatch] discarding unmatched reply to serial {}",
                        reply_serial
                    );
                }
            }
        }
        MessageKind::Signal => {
            log::trace!("[dispatch] ignoring signal {:?}", message.member);
        }
        MessageKind::MethodCall => {
            log::trace!("[dispatch] ignoring inbound method call (client-only core)");
        }
    }
}

fn outcome_of(message: Message) -> CallOutcome {
    match message.kind {
        MessageKind::Error => CallOutcome::Error {
            message: message.error_message().to_string(),
            name: message
                .error_name
                .unwrap_or_else(|| "org.freedesktop.DBus.Error.Failed".to_string()),
        },
        _ => CallOutcome::Return { body: message.body },
    }
}

/// Resolve every outstanding registration with a disconnect failure and
/// drop anything still queued outbound. Nothing may be left dangling.
pub(crate) fn fail_all_pending(shared: &EngineShared) {
    shared.connected.store(false, Ordering::Release);

    // Take everything in one critical section, resolve outside the lock.
    let drained: Vec<(u64, Pending)> = shared.pending.lock().drain().collect();
    for (serial, pending) in drained {
        log::trace!("[dispatch] failing pending call {}", serial);
        match pending {
            Pending::Slot(slot) => slot.complete(CallOutcome::Disconnected),
            Pending::Callback { handler, .. } => handler(Err(Error::NotConnected)),
        }
    }

    let mut queue = shared.outbound.lock();
    while queue.remove().is_some() {}
    queue.shrink();
}

/// Convert a raw call outcome into the caller-visible result.
pub(crate) fn convert_outcome(
    outcome: CallOutcome,
    method: &MethodDef,
    marshaller: &dyn Marshaller,
) -> Result<ReturnValue> {
    match outcome {
        CallOutcome::Disconnected => Err(Error::NotConnected),
        CallOutcome::Error { name, message } => Err(Error::Protocol { name, message }),
        CallOutcome::Return { body } => convert_reply(body, method, marshaller),
    }
}

/// Demarshal reply values against the method's declared return shape.
///
/// Zero values map to void only when void is declared; one value maps
/// directly; several values require a declared tuple of matching arity.
/// Anything else is a construction error, never a coercion.
pub(crate) fn convert_reply(
    body: Vec<Value>,
    method: &MethodDef,
    marshaller: &dyn Marshaller,
) -> Result<ReturnValue> {
    match (body.len(), method.return_shape()) {
        (0, ReturnShape::Void) => Ok(ReturnValue::Void),
        (0, _) => Err(Error::Construction(format!(
            "wrong return type for {} (got void, expected a value)",
            method.name()
        ))),
        (_, ReturnShape::Void) => Err(Error::Construction(format!(
            "wrong return type for {} (got a value, expected void)",
            method.name()
        ))),
        (1, ReturnShape::Single(declared)) => {
            let values = marshaller.demarshal(body, std::slice::from_ref(declared))?;
            values
                .into_iter()
                .next()
                .map(ReturnValue::Single)
                .ok_or_else(|| {
                    Error::Construction(format!("marshaller dropped the return value of {}", method.name()))
                })
        }
        (n, ReturnShape::Tuple(declared)) => {
            if declared.len() != n {
                return Err(Error::Construction(format!(
                    "wrong tuple arity for {} (reply has {} values, {} declared)",
                    method.name(),
                    n,
                    declared.len()
                )));
            }
            Ok(ReturnValue::Tuple(marshaller.demarshal(body, declared)?))
        }
        (_, ReturnShape::Single(_)) => Err(Error::Construction(format!(
            "wrong return type for {} (not expecting a tuple)",
            method.name()
        ))),
    }
}
