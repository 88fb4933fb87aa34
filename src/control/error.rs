//! Error taxonomy for the control listener.
//!
//! Bind failures are fatal to the application; everything else is a
//! per-event condition that the listener handles locally (log, adjust
//! connection state, keep running).
use std::{error::Error, fmt, io, net::SocketAddr};

/// The listening endpoint could not be opened.  Carries the transport
/// error text and the OS error code.  Fatal: the caller is expected to
/// shut the application down.
#[derive(Debug)]
pub struct BindError {
    pub message: String,
    pub code: i32,
}

impl BindError {
    pub fn new(message: impl Into<String>, code: i32) -> BindError {
        BindError {
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error binding: {} val: {}", self.message, self.code)
    }
}

impl Error for BindError {}

impl From<io::Error> for BindError {
    fn from(err: io::Error) -> BindError {
        BindError {
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }
}

/// Malformed socket/read condition on the connectionless listener.  The
/// error handler's return value decides whether listening continues.
#[derive(Debug)]
pub struct ListenError {
    pub message: String,
    pub code: i32,
}

impl fmt::Display for ListenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error listening: {} val: {}", self.message, self.code)
    }
}

impl Error for ListenError {}

impl From<io::Error> for ListenError {
    fn from(err: io::Error) -> ListenError {
        ListenError {
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }
}

/// Acceptor fault in connection-oriented mode.  The error handler's return
/// value decides whether accepting continues.
#[derive(Debug)]
pub struct AcceptError {
    pub message: String,
    pub code: i32,
}

impl fmt::Display for AcceptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error accepting: {} val: {}", self.message, self.code)
    }
}

impl Error for AcceptError {}

impl From<io::Error> for AcceptError {
    fn from(err: io::Error) -> AcceptError {
        AcceptError {
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }
}

/// Fault on one accepted connection.  An orderly close (EOF) is only a
/// warning; a true read error is an error.  Either way the connection is
/// removed from the tracked set and never retried.
#[derive(Debug)]
pub enum ConnectionError {
    Closed { peer: SocketAddr },
    Io { peer: SocketAddr, message: String, code: i32 },
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionError::Closed { peer } => {
                write!(f, "Other side closed the connection: {}", peer)
            }
            ConnectionError::Io { peer, message, code } => {
                write!(
                    f,
                    "Error reading from socket: {} val: {} endpoint: {}",
                    message, code, peer
                )
            }
        }
    }
}

impl Error for ConnectionError {}

/// A typed-argument access on a decoded message did not line up with what
/// the sender put on the wire.
#[derive(Debug)]
pub struct DecodeError {
    pub address: String,
    pub index: usize,
    pub expected: &'static str,
    pub found: String,
}

impl DecodeError {
    pub fn new(address: &str, index: usize, expected: &'static str, found: impl Into<String>) -> DecodeError {
        DecodeError {
            address: String::from(address),
            index,
            expected,
            found: found.into(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "argument {} of {}: expected {}, found {}",
            self.index, self.address, self.expected, self.found
        )
    }
}

impl Error for DecodeError {}

/// An address pattern that does not parse (for now only a misplaced '*').
#[derive(Debug)]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

impl PatternError {
    pub fn new(pattern: &str, reason: impl Into<String>) -> PatternError {
        PatternError {
            pattern: String::from(pattern),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bad address pattern '{}': {}", self.pattern, self.reason)
    }
}

impl Error for PatternError {}
