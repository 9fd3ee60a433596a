//! Session error taxonomy
//!
//! Only setup errors stop a session from running. Everything else is reported
//! through `EventSink::on_error` and the pipeline carries on.

use crate::decoder::DecodeError;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedError>;

/// Category of a `FeedError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Setup,
    Read,
    QueueFull,
    Truncated,
    ProtocolViolation,
    UnknownTemplate,
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("session setup failed: {context}: {source}")]
    Setup {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("session is {0}, expected idle")]
    InvalidState(&'static str),

    #[error("datagram read failed: {0}")]
    Read(#[source] io::Error),

    #[error("packet queue full, dropped {len}-byte datagram")]
    QueueFull { len: usize },

    #[error("packet decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::Setup { .. } | FeedError::InvalidConfig(_) | FeedError::InvalidState(_) => {
                ErrorKind::Setup
            }
            FeedError::Read(_) => ErrorKind::Read,
            FeedError::QueueFull { .. } => ErrorKind::QueueFull,
            FeedError::Decode(e) => e.kind(),
        }
    }

    pub(crate) fn setup(context: impl Into<String>, source: io::Error) -> Self {
        FeedError::Setup {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let setup = FeedError::setup("bind 0.0.0.0:1", io::Error::from(io::ErrorKind::AddrInUse));
        assert_eq!(setup.kind(), ErrorKind::Setup);
        assert_eq!(FeedError::InvalidConfig("port".into()).kind(), ErrorKind::Setup);
        assert_eq!(
            FeedError::Read(io::Error::from(io::ErrorKind::ConnectionRefused)).kind(),
            ErrorKind::Read
        );
        assert_eq!(FeedError::QueueFull { len: 10 }.kind(), ErrorKind::QueueFull);
        assert_eq!(
            FeedError::from(DecodeError::UnknownTemplate(3)).kind(),
            ErrorKind::UnknownTemplate
        );
        assert_eq!(
            FeedError::from(DecodeError::MissingReset { found: 93 }).kind(),
            ErrorKind::ProtocolViolation
        );
    }

    #[test]
    fn test_display() {
        let err = FeedError::from(DecodeError::Truncated { need: 22, have: 4 });
        assert_eq!(err.to_string(), "packet decode failed: truncated: need 22 bytes, have 4");
    }
}
