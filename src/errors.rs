use thiserror::Error;

/// Errors raised by [`crate::VersionGraph`] operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphError {
    /// An input version name was required to be initialised but was not.
    #[error("version name is uninitialised")]
    Uninitialized,

    /// The caller's claim contradicts the stored versions.
    #[error("request contradicts stored versions")]
    InvalidParameter,

    /// The referenced version is not stored.
    #[error("no such version")]
    NoSuchElement,

    /// The operation would exceed the branch limit and no eviction can help.
    #[error("cannot exceed branch limit")]
    CannotExceedLimit,

    /// Serialised input is malformed, internally inconsistent, or exceeds
    /// its declared limits.
    #[error("malformed serialised version graph")]
    ParsingError,

    /// Internal bookkeeping reached a state that must not occur.
    #[error("internal consistency failure")]
    Unknown,
}

pub type Result<T> = ::std::result::Result<T, GraphError>;

/// Errors raised by the byte codec underneath the serialised form.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("input ends before the encoded value does")]
    UnexpectedEnd,
    #[error("presence byte is neither 0 nor 1: {0}")]
    InvalidPresenceByte(u8),
    #[error("input continues past the encoded value")]
    TrailingBytes,
}

impl From<DecodeError> for GraphError {
    fn from(_: DecodeError) -> Self {
        GraphError::ParsingError
    }
}

pub type DecResult<T> = ::std::result::Result<T, DecodeError>;
