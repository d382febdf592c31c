// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HBUS - Message Bus Client Core
//!
//! Client-side core for D-Bus style message buses: remote objects are
//! addressed by bus name and object path, methods and signals are scoped
//! to interfaces, and objects describe themselves with XML introspection
//! documents.
//!
//! The centerpiece is the remote-call dispatch and correlation engine: a
//! local call becomes an outbound wire message, is tracked by correlation
//! serial until the matching reply arrives (or the timeout does), and the
//! reply is demarshaled into a local result, for blocking, future-style,
//! and callback calling conventions, while many caller threads share one
//! connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hbus::transport::ChannelTransport;
//! use hbus::{
//!     CallEngine, Endpoint, EngineConfig, InterfaceDef, MethodDef, RemoteProxy, ReturnShape,
//!     TypeCode, Value,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> hbus::Result<()> {
//!     // The service side of this pair would normally be a bus socket.
//!     let (client, _service) = ChannelTransport::pair();
//!     let engine = Arc::new(CallEngine::start(Arc::new(client), EngineConfig::default()));
//!
//!     let calculator = Arc::new(
//!         InterfaceDef::new("org::example::Calculator")
//!             .with_wire_name("org.example.Calculator")
//!             .with_method(
//!                 MethodDef::new("Add")
//!                     .with_inputs(&[TypeCode::Int32, TypeCode::Int32])
//!                     .returns(ReturnShape::Single(TypeCode::Int32)),
//!             ),
//!     );
//!
//!     let endpoint = Arc::new(Endpoint::new(
//!         "org.example.Calc",
//!         "/org/example/Calc",
//!         vec![calculator],
//!         true,
//!     ));
//!     engine.register_endpoint(&endpoint);
//!
//!     let proxy = RemoteProxy::new(endpoint, engine);
//!     let sum = proxy.call("Add", vec![Value::Int32(2), Value::Int32(3)])?;
//!     println!("2 + 3 = {:?}", sum);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                      Caller threads                          |
//! |    RemoteProxy -> invoke / invoke_async / invoke_with_cb     |
//! +--------------------------------------------------------------+
//! |                      Call Engine                             |
//! |  name resolution | marshalling | serial + pending table      |
//! +--------------------------------------------------------------+
//! |   outbound Ring -> writer thread     reader thread -> match  |
//! +--------------------------------------------------------------+
//! |                Transport (opaque capability)                 |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CallEngine`] | Dispatch and correlation engine for one connection |
//! | [`RemoteProxy`] | Invocation surface over one remote object |
//! | [`Endpoint`] | Remote object identity (bus name + object path) |
//! | [`InterfaceDef`] | Registered local interface descriptor |
//! | [`IntrospectionCache`] | Deduplicating introspection parser/cache |
//! | [`NameResolver`] | Wire name <-> local descriptor mapping |
//!
//! The byte-level wire codec and the socket transport are external
//! collaborators, consumed through the [`Marshaller`] and
//! [`transport::Transport`] capabilities.

/// Explicit method/interface descriptors, built once at registration time.
pub mod descriptor;
/// Call dispatch, correlation, and the three calling conventions.
pub mod dispatch;
/// Remote object identity and method resolution.
pub mod endpoint;
/// Error taxonomy.
pub mod error;
/// Introspection document parsing with a deduplicating node cache.
pub mod introspect;
/// Payload values and the marshalling capability.
pub mod marshal;
/// Wire message model.
pub mod message;
/// Wire name <-> local descriptor resolution.
pub mod resolver;
/// Growable circular buffer backing the outbound queue.
pub mod ring;
/// Transport capability and the in-process channel transport.
pub mod transport;

pub use descriptor::{InterfaceDef, MethodDef, ReturnShape, SignalDef};
pub use dispatch::{CallEngine, EngineConfig, PendingReply, RemoteProxy, ReturnValue};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use introspect::IntrospectionCache;
pub use marshal::{Marshaller, TypeCode, Value, WireMarshaller};
pub use message::{Message, MessageKind};
pub use resolver::NameResolver;
pub use ring::Ring;
