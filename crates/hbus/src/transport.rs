// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport capability.
//!
//! The socket layer is an external collaborator: the dispatcher only needs
//! to hand frames down, poll frames up, and ask whether the link is alive.
//! [`ChannelTransport`] is the bundled in-process implementation, used by
//! the test suite and by embedders who run client and service in one
//! process.

use crate::error::{Error, Result};
use crate::message::Message;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Frame-level connection consumed by the call dispatcher.
pub trait Transport: Send + Sync {
    /// Send one message. Ownership transfers to the transport.
    fn send(&self, message: Message) -> Result<()>;

    /// Wait up to `timeout` for an inbound message. `Ok(None)` means the
    /// timeout elapsed with the link still up; `Err(NotConnected)` means
    /// the link is gone.
    fn recv_timeout(&self, timeout: Duration) -> Result<Option<Message>>;

    /// Whether the link is currently usable.
    fn is_connected(&self) -> bool;
}

/// In-process transport endpoint over crossbeam channels.
///
/// [`ChannelTransport::pair`] returns two crossed endpoints: what one side
/// sends, the other receives. Both share one connected flag, so closing
/// either side disconnects both.
pub struct ChannelTransport {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    connected: Arc<AtomicBool>,
}

impl ChannelTransport {
    /// Create a connected pair of endpoints.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = unbounded();
        let (b_tx, b_rx) = unbounded();
        let connected = Arc::new(AtomicBool::new(true));
        (
            Self {
                tx: a_tx,
                rx: b_rx,
                connected: connected.clone(),
            },
            Self {
                tx: b_tx,
                rx: a_rx,
                connected,
            },
        )
    }

    /// Tear the link down for both endpoints.
    pub fn close(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: Message) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.tx.send(message).map_err(|_| Error::NotConnected)
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => {
                if self.is_connected() {
                    Ok(None)
                } else {
                    Err(Error::NotConnected)
                }
            }
            Err(RecvTimeoutError::Disconnected) => Err(Error::NotConnected),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn call(serial: u64) -> Message {
        Message::method_call(
            serial,
            "org.example.Svc",
            "/svc",
            "org.example.Iface",
            "Ping",
            0,
            String::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_pair_is_crossed() {
        let (client, server) = ChannelTransport::pair();
        client.send(call(1)).unwrap();
        let got = server
            .recv_timeout(Duration::from_millis(100))
            .unwrap()
            .expect("message should arrive");
        assert_eq!(got.serial, 1);
        assert_eq!(got.kind, MessageKind::MethodCall);
    }

    #[test]
    fn test_recv_timeout_when_idle() {
        let (client, _server) = ChannelTransport::pair();
        let got = client.recv_timeout(Duration::from_millis(10)).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_close_disconnects_both_ends() {
        let (client, server) = ChannelTransport::pair();
        server.close();
        assert!(!client.is_connected());
        assert!(matches!(client.send(call(1)), Err(Error::NotConnected)));
        assert!(matches!(
            server.recv_timeout(Duration::from_millis(10)),
            Err(Error::NotConnected)
        ));
    }
}
