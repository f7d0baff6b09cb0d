use chrono::{DateTime, Utc};

use crate::sentence::MessageTag;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The trailing checksum digits do not match the XOR of the sentence body.
    #[error("checksum mismatch: sentence has {expected:02X}, computed {actual:02X}: {line}")]
    Checksum {
        line: String,
        /// Checksum carried by the sentence
        expected: u8,
        /// Checksum computed over the sentence body
        actual: u8,
    },

    /// The line is not framed as `$<body>*<CK>`.
    #[error("malformed sentence ({reason}): {line}")]
    Format { line: String, reason: String },

    #[error("{tag} expects {expected} fields, got {actual}")]
    FieldCount {
        tag: MessageTag,
        expected: String,
        actual: usize,
    },

    /// A positional field could not be decoded. `index` is the field's position in the
    /// sentence, the tag being position 0.
    #[error("field {index} ({value:?}) is not a valid {expected}")]
    FieldParse {
        index: usize,
        value: String,
        expected: &'static str,
    },

    #[error("unknown message type {0:?}")]
    UnknownMessageType(String),

    /// A current cell arrived before any instrument configuration while running in strict
    /// mode.
    #[error("no instrument configuration has been received")]
    MissingInstrumentConfig,

    #[error("profile {key} has already been built")]
    ProfileAlreadyBuilt { key: DateTime<Utc> },

    #[error("no cells buffered for profile {key}")]
    ProfileNotBuffered { key: DateTime<Utc> },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors scoped to a single sentence; the stream can always continue after
    /// one of these.
    #[must_use]
    pub fn is_per_line(&self) -> bool {
        matches!(
            self,
            Error::Checksum { .. }
                | Error::Format { .. }
                | Error::FieldCount { .. }
                | Error::FieldParse { .. }
                | Error::UnknownMessageType(_)
                | Error::MissingInstrumentConfig
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
