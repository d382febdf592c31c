// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Call dispatch integration tests.
//!
//! Each test runs a client engine against an in-process service thread over
//! a channel transport pair and exercises the three calling conventions,
//! reply conversion, and correlation under concurrency.

use hbus::transport::{ChannelTransport, Transport};
use hbus::{
    CallEngine, Endpoint, EngineConfig, Error, InterfaceDef, Message, MethodDef, RemoteProxy,
    ReturnShape, ReturnValue, TypeCode, Value,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn calculator_interface() -> Arc<InterfaceDef> {
    Arc::new(
        InterfaceDef::new("org::example::Calculator")
            .with_wire_name("org.example.Calculator")
            .with_method(
                MethodDef::new("Add")
                    .with_inputs(&[TypeCode::Int32, TypeCode::Int32])
                    .returns(ReturnShape::Single(TypeCode::Int32)),
            )
            .with_method(
                MethodDef::new("Divide")
                    .with_inputs(&[TypeCode::Int32, TypeCode::Int32])
                    .returns(ReturnShape::Single(TypeCode::Int32)),
            )
            .with_method(
                MethodDef::new("Stat")
                    .returns(ReturnShape::Tuple(vec![TypeCode::Str, TypeCode::UInt32])),
            )
            // Declared single-valued, but the service answers with two
            // values: conversion must reject, not coerce.
            .with_method(MethodDef::new("StatBroken").returns(ReturnShape::Single(TypeCode::Str)))
            // The service never answers this one.
            .with_method(MethodDef::new("Sleep"))
            .with_method(MethodDef::new("Reset").one_way())
            .with_method(
                MethodDef::new("Echo")
                    .with_inputs(&[TypeCode::UInt64])
                    .returns(ReturnShape::Single(TypeCode::UInt64)),
            ),
    )
}

/// Answer requests until the link closes.
fn spawn_service(server: ChannelTransport) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut serial = 1u64;
        loop {
            let message = match server.recv_timeout(Duration::from_millis(20)) {
                Ok(Some(m)) => m,
                Ok(None) => continue,
                Err(_) => break,
            };
            if message.no_reply_expected() {
                continue;
            }
            let reply_to = message.serial;
            serial += 1;
            let reply = match message.member.as_deref() {
                Some("Add") => {
                    let (a, b) = two_ints(&message);
                    Message::method_return(serial, reply_to, "i".into(), vec![Value::Int32(a + b)])
                }
                Some("Divide") => {
                    let (a, b) = two_ints(&message);
                    if b == 0 {
                        Message::error_reply(
                            serial,
                            reply_to,
                            "org.example.Error.DivByZero",
                            "division by zero",
                        )
                    } else {
                        Message::method_return(
                            serial,
                            reply_to,
                            "i".into(),
                            vec![Value::Int32(a / b)],
                        )
                    }
                }
                Some("Stat") | Some("StatBroken") => Message::method_return(
                    serial,
                    reply_to,
                    "su".into(),
                    vec![Value::Str("busy".into()), Value::UInt32(3)],
                ),
                Some("Sleep") => continue,
                Some("Echo") => Message::method_return(
                    serial,
                    reply_to,
                    message.signature.clone(),
                    message.body.clone(),
                ),
                _ => Message::error_reply(
                    serial,
                    reply_to,
                    "org.example.Error.UnknownMethod",
                    "unknown method",
                ),
            };
            if server.send(reply).is_err() {
                break;
            }
        }
    })
}

fn two_ints(message: &Message) -> (i32, i32) {
    match (message.body.first(), message.body.get(1)) {
        (Some(Value::Int32(a)), Some(Value::Int32(b))) => (*a, *b),
        _ => (0, 0),
    }
}

struct Fixture {
    engine: Arc<CallEngine>,
    proxy: RemoteProxy,
    link: Arc<ChannelTransport>,
    service: Option<thread::JoinHandle<()>>,
}

impl Fixture {
    fn new() -> Self {
        let (client, server) = ChannelTransport::pair();
        let link = Arc::new(client);
        let engine = Arc::new(CallEngine::start(
            link.clone(),
            EngineConfig::default().with_default_timeout(Duration::from_secs(2)),
        ));
        let endpoint = Arc::new(Endpoint::new(
            "org.example.Calc",
            "/org/example/Calc",
            vec![calculator_interface()],
            true,
        ));
        engine.register_endpoint(&endpoint);
        let proxy = RemoteProxy::new(endpoint, engine.clone());
        let service = Some(spawn_service(server));
        Self {
            engine,
            proxy,
            link,
            service,
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.link.close();
        if let Some(handle) = self.service.take() {
            let _ = handle.join();
        }
    }
}

#[test]
fn test_sync_call_round_trip() {
    let fx = Fixture::new();
    let result = fx
        .proxy
        .call("Add", vec![Value::Int32(2), Value::Int32(3)])
        .expect("Add should succeed");
    assert_eq!(result, ReturnValue::Single(Value::Int32(5)));
}

#[test]
fn test_error_reply_becomes_protocol_error() {
    let fx = Fixture::new();
    let err = fx
        .proxy
        .call("Divide", vec![Value::Int32(1), Value::Int32(0)])
        .unwrap_err();
    match err {
        Error::Protocol { name, message } => {
            assert_eq!(name, "org.example.Error.DivByZero");
            assert_eq!(message, "division by zero");
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_tuple_return_reconstructed_in_order() {
    let fx = Fixture::new();
    let result = fx.proxy.call("Stat", vec![]).expect("Stat should succeed");
    assert_eq!(
        result,
        ReturnValue::Tuple(vec![Value::Str("busy".into()), Value::UInt32(3)])
    );
}

#[test]
fn test_multi_value_reply_against_non_tuple_fails() {
    let fx = Fixture::new();
    let err = fx.proxy.call("StatBroken", vec![]).unwrap_err();
    assert!(matches!(err, Error::Construction(_)), "got {:?}", err);
}

#[test]
fn test_sync_timeout_is_no_reply() {
    let fx = Fixture::new();
    let start = Instant::now();
    let err = fx
        .proxy
        .call_with_timeout("Sleep", vec![], Duration::from_millis(100))
        .unwrap_err();
    assert!(matches!(err, Error::NoReply), "got {:?}", err);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_one_way_returns_immediately() {
    let fx = Fixture::new();
    let start = Instant::now();
    let result = fx.proxy.call("Reset", vec![]).expect("one-way should succeed");
    assert_eq!(result, ReturnValue::Void);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_async_handle_resolves_later() {
    let fx = Fixture::new();
    let handle = fx
        .proxy
        .call_async("Add", vec![Value::Int32(20), Value::Int32(22)])
        .expect("dispatch should succeed");
    let result = handle.wait().expect("reply should arrive");
    assert_eq!(result, ReturnValue::Single(Value::Int32(42)));
}

#[test]
fn test_async_handle_resolves_from_another_thread() {
    let fx = Fixture::new();
    let handle = fx
        .proxy
        .call_async("Add", vec![Value::Int32(1), Value::Int32(2)])
        .expect("dispatch should succeed");
    let result = thread::spawn(move || handle.wait())
        .join()
        .expect("resolver thread should not panic")
        .expect("reply should arrive");
    assert_eq!(result, ReturnValue::Single(Value::Int32(3)));
}

#[test]
fn test_callback_runs_exactly_once() {
    let fx = Fixture::new();
    let (tx, rx) = std::sync::mpsc::channel();
    fx.proxy
        .call_with_callback("Add", vec![Value::Int32(4), Value::Int32(5)], move |result| {
            tx.send(result).ok();
        })
        .expect("dispatch should succeed");

    let result = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("callback should fire")
        .expect("call should succeed");
    assert_eq!(result, ReturnValue::Single(Value::Int32(9)));

    // Exactly once: nothing else arrives.
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn test_unresolvable_method_fails_before_dispatch() {
    let fx = Fixture::new();
    let err = fx.proxy.call("Nope", vec![]).unwrap_err();
    assert!(matches!(err, Error::Resolution(_)), "got {:?}", err);
}

#[test]
fn test_dispatch_on_closed_link_fails_fast() {
    let fx = Fixture::new();
    fx.link.close();
    let err = fx
        .proxy
        .call("Add", vec![Value::Int32(1), Value::Int32(1)])
        .unwrap_err();
    assert!(matches!(err, Error::NotConnected), "got {:?}", err);
}

#[test]
fn test_proxy_identity_is_endpoint_identity() {
    let fx = Fixture::new();
    let same_object = Arc::new(Endpoint::new(
        "org.example.Calc",
        "/org/example/Calc",
        vec![],
        false,
    ));
    let other = RemoteProxy::new(same_object, fx.engine.clone());
    assert_eq!(fx.proxy, other);
    assert_eq!(
        fx.proxy.to_string(),
        "org.example.Calc:/org/example/Calc:[org::example::Calculator]"
    );
    assert!(fx.proxy.is_remote());
}

#[test]
fn test_concurrent_sync_callers_get_their_own_replies() {
    let fx = Fixture::new();
    let mut workers = Vec::new();
    for worker in 0..8u64 {
        let proxy = fx.proxy.clone();
        workers.push(thread::spawn(move || {
            for i in 0..25u64 {
                let token = worker * 1_000 + i;
                let result = proxy
                    .call("Echo", vec![Value::UInt64(token)])
                    .expect("echo should succeed");
                assert_eq!(result, ReturnValue::Single(Value::UInt64(token)));
            }
        }));
    }
    for worker in workers {
        worker.join().expect("worker should not panic");
    }
}

#[test]
fn test_replies_out_of_submission_order_are_correlated() {
    const BATCH: usize = 5;

    let (client, server) = ChannelTransport::pair();
    let link = Arc::new(client);
    let engine = Arc::new(CallEngine::start(
        link.clone(),
        EngineConfig::default().with_default_timeout(Duration::from_secs(5)),
    ));
    let endpoint = Arc::new(Endpoint::new(
        "org.example.Calc",
        "/org/example/Calc",
        vec![calculator_interface()],
        true,
    ));
    engine.register_endpoint(&endpoint);
    let proxy = RemoteProxy::new(endpoint, engine);

    // Collect a full batch of requests, then answer newest-first.
    let service = thread::spawn(move || {
        let mut requests = Vec::new();
        while requests.len() < BATCH {
            match server.recv_timeout(Duration::from_millis(20)) {
                Ok(Some(m)) => requests.push(m),
                Ok(None) => continue,
                Err(_) => return,
            }
        }
        let mut serial = 1u64;
        for request in requests.into_iter().rev() {
            serial += 1;
            let reply = Message::method_return(
                serial,
                request.serial,
                request.signature.clone(),
                request.body.clone(),
            );
            if server.send(reply).is_err() {
                return;
            }
        }
    });

    let mut callers = Vec::new();
    for i in 0..BATCH as u64 {
        let proxy = proxy.clone();
        callers.push(thread::spawn(move || {
            let result = proxy
                .call("Echo", vec![Value::UInt64(i)])
                .expect("echo should succeed");
            assert_eq!(result, ReturnValue::Single(Value::UInt64(i)));
        }));
    }
    for caller in callers {
        caller.join().expect("caller should not panic");
    }

    link.close();
    service.join().expect("service should not panic");
}
