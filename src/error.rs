//! Defines the error type shared by every fallible operation in the crate.

use std::{error, fmt, io};

/// An error raised while building example sets, configuring training or
/// moving networks in and out of storage.
#[derive(Debug)]
pub enum NetError {
    /// An index, sub-view or cross-validation count fell outside its bounds.
    Range(String),
    /// Training or data-set parameters are inconsistent.
    Config(String),
    /// The network type cannot perform the requested operation.
    Unsupported(String),
    /// A network file carried a type tag no network answers to.
    UnknownNetType(u32),
    /// Stored data was malformed or truncated.
    Format(String),
    /// The underlying reader or writer failed.
    Io(io::Error),
}

impl error::Error for NetError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(s) => write!(f, "Out of range: {}", s),
            Self::Config(s) => write!(f, "Bad configuration: {}", s),
            Self::Unsupported(s) => write!(f, "Unsupported operation: {}", s),
            Self::UnknownNetType(t) => write!(f, "Unknown network type tag {}.", t),
            Self::Format(s) => write!(f, "Bad format: {}", s),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        // Short reads are a property of the data, not the device.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Format(format!("truncated data ({})", err))
        } else {
            Self::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
