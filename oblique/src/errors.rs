//! Definition of errors.

use std::error::Error;
use std::fmt;

/// A specialized Result type for Oblique.
pub type Result<T, E = ObliqueError> = std::result::Result<T, E>;

/// The error type for Oblique.
#[derive(Debug)]
pub enum ObliqueError {
    /// The error variant for [`InvalidArgumentError`].
    InvalidArgument(InvalidArgumentError),

    /// The error variant for [`InvalidFormatError`].
    InvalidFormat(InvalidFormatError),

    /// The error variant for [`ParseIntError`](std::num::ParseIntError).
    ParseInt(std::num::ParseIntError),

    /// The error variant for [`ParseFloatError`](std::num::ParseFloatError).
    ParseFloat(std::num::ParseFloatError),

    /// The error variant for [`DecodeError`](bincode::error::DecodeError).
    BincodeDecode(bincode::error::DecodeError),

    /// The error variant for [`EncodeError`](bincode::error::EncodeError).
    BincodeEncode(bincode::error::EncodeError),

    /// The error variant for [`std::io::Error`].
    StdIo(std::io::Error),
}

impl ObliqueError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn invalid_format<S, T>(line_no: usize, line: S, msg: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            line_no,
            line: line.into(),
            msg: msg.into(),
        })
    }
}

impl fmt::Display for ObliqueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::InvalidFormat(e) => e.fmt(f),
            Self::ParseInt(e) => e.fmt(f),
            Self::ParseFloat(e) => e.fmt(f),
            Self::BincodeDecode(e) => e.fmt(f),
            Self::BincodeEncode(e) => e.fmt(f),
            Self::StdIo(e) => e.fmt(f),
        }
    }
}

impl Error for ObliqueError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when an input line is malformed.
#[derive(Debug)]
pub struct InvalidFormatError {
    /// 1-based number of the offending line.
    pub(crate) line_no: usize,

    /// The offending line.
    pub(crate) line: String,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "InvalidFormatError: line {}: {}: {:?}",
            self.line_no, self.msg, self.line
        )
    }
}

impl Error for InvalidFormatError {}

impl From<std::num::ParseIntError> for ObliqueError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::ParseInt(error)
    }
}

impl From<std::num::ParseFloatError> for ObliqueError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::ParseFloat(error)
    }
}

impl From<bincode::error::DecodeError> for ObliqueError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::BincodeDecode(error)
    }
}

impl From<bincode::error::EncodeError> for ObliqueError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::BincodeEncode(error)
    }
}

impl From<std::io::Error> for ObliqueError {
    fn from(error: std::io::Error) -> Self {
        Self::StdIo(error)
    }
}
