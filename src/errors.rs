use std::fmt;

/// An error that can occur when building an IR or decoding a message
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// Wrap an error raised by a [`TokenListener`](crate::TokenListener) so
    /// that the decode stops and reports it verbatim
    pub fn listener<E>(err: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::new(ErrorKind::Listener(err.into()))
    }

    pub(crate) fn invalid_ir<S: Into<String>>(msg: S) -> Error {
        Error::new(ErrorKind::InvalidIr(msg.into()))
    }

    /// Return the specific type of error
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Consume the error and return the specific type of error
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns the byte offset that the error occurs (if available)
    pub fn offset(&self) -> Option<usize> {
        self.0.offset()
    }
}

/// Specific type of error
#[derive(Debug)]
pub enum ErrorKind {
    /// The schema id in the message header differs from the schema id of the IR
    SchemaIdMismatch { expected: u64, actual: u64 },

    /// The message header referenced a template that the IR does not contain
    UnknownTemplate { template_id: u64 },

    /// A read of `needed` bytes for the named token would extend past the
    /// end of the buffer
    BufferUnderflow {
        token: String,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A declared length (message block, group, or var data) claims more
    /// bytes than remain in the buffer
    LengthOverflow {
        token: String,
        offset: usize,
        declared: u64,
        available: usize,
    },

    /// The header composite lacks one of the mandatory members
    MissingHeaderField(&'static str),

    /// The token stream or schema model is malformed
    InvalidIr(String),

    /// Composites and groups were nested deeper than the decoder allows
    DepthExceeded { max: usize },

    /// A listener aborted the decode
    Listener(Box<dyn std::error::Error + Send + Sync>),

    /// An IO error raised while writing decoded output
    Io(std::io::Error),

    /// A JSON serialization or deserialization error
    #[cfg(feature = "json")]
    Json(serde_json::Error),
}

impl ErrorKind {
    pub fn offset(&self) -> Option<usize> {
        match *self {
            ErrorKind::BufferUnderflow { offset, .. } => Some(offset),
            ErrorKind::LengthOverflow { offset, .. } => Some(offset),
            _ => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self.0 {
            ErrorKind::Listener(ref err) => Some(err.as_ref()),
            ErrorKind::Io(ref err) => Some(err),
            #[cfg(feature = "json")]
            ErrorKind::Json(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::SchemaIdMismatch { expected, actual } => write!(
                f,
                "required schema id {} but message header contained {}",
                expected, actual
            ),
            ErrorKind::UnknownTemplate { template_id } => {
                write!(f, "no message with template id {} in IR", template_id)
            }
            ErrorKind::BufferUnderflow {
                ref token,
                offset,
                needed,
                available,
            } => write!(
                f,
                "not enough data to read {} (offset: {}, needed: {}, available: {})",
                token, offset, needed, available
            ),
            ErrorKind::LengthOverflow {
                ref token,
                offset,
                declared,
                available,
            } => write!(
                f,
                "declared length of {} exceeds buffer (offset: {}, declared: {}, available: {})",
                token, offset, declared, available
            ),
            ErrorKind::MissingHeaderField(name) => {
                write!(f, "header composite is missing member: {}", name)
            }
            ErrorKind::InvalidIr(ref msg) => write!(f, "invalid IR: {}", msg),
            ErrorKind::DepthExceeded { max } => {
                write!(f, "maximum nesting depth of {} exceeded", max)
            }
            ErrorKind::Listener(ref err) => write!(f, "listener aborted decode: {}", err),
            ErrorKind::Io(ref err) => write!(f, "io error: {}", err),
            #[cfg(feature = "json")]
            ErrorKind::Json(ref err) => write!(f, "json error: {}", err),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::new(ErrorKind::Io(error))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::new(ErrorKind::Json(error))
    }
}
