// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the bus client core.
//!
//! The taxonomy separates failures by where they occur and who can act on
//! them: construction problems are always local and synchronous, protocol
//! errors carry the remote peer's error identity, and timeout/disconnect
//! outcomes are distinct so callers can tell "the peer said no" from "nobody
//! answered".

use std::fmt;

/// Result type for all bus client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the bus client core.
#[derive(Debug)]
pub enum Error {
    /// An outbound message could not be built (bad signature, marshalling
    /// failure, return shape mismatch). Local, never retried, surfaced to
    /// the caller that issued the dispatch before anything is enqueued.
    Construction(String),

    /// The remote peer answered with an Error-kind reply.
    Protocol {
        /// Wire-level error name reported by the peer.
        name: String,
        /// Human-readable message carried in the error body, if any.
        message: String,
    },

    /// No reply arrived within the allotted time.
    NoReply,

    /// Dispatch attempted with no live transport, or the connection was
    /// torn down while the call was in flight.
    NotConnected,

    /// No exported interface of the target endpoint declares the requested
    /// method.
    Resolution(String),

    /// An introspection document was structurally malformed. Fatal to that
    /// single parse; the node cache is left as it was before the parse.
    Parse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction(msg) => write!(f, "failed to construct outgoing call: {}", msg),
            Self::Protocol { name, message } => {
                if message.is_empty() {
                    write!(f, "remote error: {}", name)
                } else {
                    write!(f, "remote error: {}: {}", name, message)
                }
            }
            Self::NoReply => write!(f, "no reply within the specified time"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Resolution(msg) => write!(f, "method resolution failed: {}", msg),
            Self::Parse(msg) => write!(f, "introspection parse error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// True for outcomes that mean "the call never completed" rather than
    /// "the call completed with a failure" (timeouts and disconnects).
    pub fn is_unanswered(&self) -> bool {
        matches!(self, Self::NoReply | Self::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_protocol_with_message() {
        let e = Error::Protocol {
            name: "org.freedesktop.DBus.Error.Failed".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "remote error: org.freedesktop.DBus.Error.Failed: boom"
        );
    }

    #[test]
    fn test_display_protocol_without_message() {
        let e = Error::Protocol {
            name: "org.example.Quota".to_string(),
            message: String::new(),
        };
        assert_eq!(e.to_string(), "remote error: org.example.Quota");
    }

    #[test]
    fn test_unanswered_classification() {
        assert!(Error::NoReply.is_unanswered());
        assert!(Error::NotConnected.is_unanswered());
        assert!(!Error::Construction("x".into()).is_unanswered());
        assert!(!Error::Protocol {
            name: "e".into(),
            message: String::new()
        }
        .is_unanswered());
    }
}
