// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire message model.
//!
//! A [`Message`] is what crosses the transport: a correlation serial, a kind
//! tag, a flag byte, the addressing header fields, and a payload of typed
//! values. The byte-level encoding of all of this is the transport codec's
//! business; this core only reads and writes the structured form.

use crate::marshal::Value;

/// Message flag bits (wire-compatible values).
pub mod flags {
    /// The caller does not expect a reply; the peer must not send one.
    pub const NO_REPLY_EXPECTED: u8 = 0x01;
    /// Do not launch the destination service if it is not running.
    pub const NO_AUTO_START: u8 = 0x02;
    /// The call was issued through the async convention.
    pub const ASYNC: u8 = 0x40;
}

/// Kind tag of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Outbound method invocation.
    MethodCall,
    /// Successful reply to a method call.
    MethodReturn,
    /// Error reply to a method call.
    Error,
    /// Broadcast signal emission.
    Signal,
}

/// A single bus message.
///
/// Owned exclusively by the outbound ring while queued; ownership transfers
/// to the transport on dequeue.
#[derive(Debug, Clone)]
pub struct Message {
    /// Correlation serial, unique per connection while the call is pending.
    pub serial: u64,
    /// Kind tag.
    pub kind: MessageKind,
    /// Flag bits from [`flags`].
    pub flags: u8,
    /// Destination bus name (method calls).
    pub destination: Option<String>,
    /// Target object path (method calls).
    pub path: Option<String>,
    /// Wire interface name (method calls, signals).
    pub interface: Option<String>,
    /// Wire member name (method calls, signals).
    pub member: Option<String>,
    /// Wire error name (error replies).
    pub error_name: Option<String>,
    /// Serial of the call this message answers (replies and errors).
    pub reply_serial: Option<u64>,
    /// Wire type signature of the body.
    pub signature: String,
    /// Payload values.
    pub body: Vec<Value>,
}

impl Message {
    /// Build an outbound method call.
    #[allow(clippy::too_many_arguments)]
    pub fn method_call(
        serial: u64,
        destination: &str,
        path: &str,
        interface: &str,
        member: &str,
        flags: u8,
        signature: String,
        body: Vec<Value>,
    ) -> Self {
        Self {
            serial,
            kind: MessageKind::MethodCall,
            flags,
            destination: Some(destination.to_string()),
            path: Some(path.to_string()),
            interface: Some(interface.to_string()),
            member: Some(member.to_string()),
            error_name: None,
            reply_serial: None,
            signature,
            body,
        }
    }

    /// Build a successful reply to `reply_serial`.
    pub fn method_return(serial: u64, reply_serial: u64, signature: String, body: Vec<Value>) -> Self {
        Self {
            serial,
            kind: MessageKind::MethodReturn,
            flags: 0,
            destination: None,
            path: None,
            interface: None,
            member: None,
            error_name: None,
            reply_serial: Some(reply_serial),
            signature,
            body,
        }
    }

    /// Build an error reply to `reply_serial`. The human-readable message
    /// travels as the first body value, matching bus convention.
    pub fn error_reply(serial: u64, reply_serial: u64, error_name: &str, message: &str) -> Self {
        Self {
            serial,
            kind: MessageKind::Error,
            flags: 0,
            destination: None,
            path: None,
            interface: None,
            member: None,
            error_name: Some(error_name.to_string()),
            reply_serial: Some(reply_serial),
            signature: "s".to_string(),
            body: vec![Value::Str(message.to_string())],
        }
    }

    /// True if the sender declared it does not want a reply.
    pub fn no_reply_expected(&self) -> bool {
        self.flags & flags::NO_REPLY_EXPECTED != 0
    }

    /// Error message text from an error reply's body, if present.
    pub fn error_message(&self) -> &str {
        match self.body.first() {
            Some(Value::Str(s)) => s,
            _ => "",
        }
    }
}
