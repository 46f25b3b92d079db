use std::io;

use thiserror::Error;

/// Errors produced while parsing an FFU container or replaying its payload.
///
/// All of these are fatal: the format carries no resynchronization markers,
/// so nothing is retried or recovered internally. Callers get the first
/// failure and a container that must be treated as unusable.
#[derive(Debug, Error)]
pub enum Error {
    /// The source ended before a record or region was fully read.
    #[error(
        "unexpected end of input at offset {offset}: needed {needed} bytes, got {available}"
    )]
    TruncatedInput {
        offset: u64,
        needed: usize,
        available: usize,
    },

    /// A record failed its validation check (bad signature, bad revision,
    /// out-of-range size field). Carries the record kind and the offending
    /// value.
    #[error("malformed {record}: {reason}")]
    MalformedRecord {
        record: &'static str,
        reason: String,
    },

    /// The container is structurally valid but uses a format feature this
    /// implementation does not handle (e.g. a multi-store revision).
    #[error("unsupported container feature: {0}")]
    UnsupportedFormat(String),

    /// An underlying read, write, or seek failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(record: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            record,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
