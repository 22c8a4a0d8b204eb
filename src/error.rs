//! Error handling for plexrate.
//!
//! Provides a single error type for the whole crate, categorized by
//! [`ErrorKind`] so callers can tell apart failures that need different
//! diagnosis:
//! * Transport failures: the server could not be reached or answered with a
//!   non-success status ([`ErrorKind::Unavailable`])
//! * Contract failures: the server answered, but not in the expected shape
//!   ([`ErrorKind::UnexpectedResponse`])
//! * Caller failures: invalid parameters or unsupported addressing modes
//!   ([`ErrorKind::InvalidArgument`], [`ErrorKind::OutOfRange`],
//!   [`ErrorKind::Unimplemented`])
//! * Defects: internal consistency failures ([`ErrorKind::Internal`])
//!
//! # Example
//!
//! ```rust
//! use plexrate::error::{Error, ErrorKind, Result};
//!
//! fn check(rating: u8) -> Result<()> {
//!     if rating > 10 {
//!         return Err(Error::out_of_range(format!("rating {rating} exceeds 10")));
//!     }
//!     Ok(())
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Attempts to downcast the underlying error to a concrete type.
    ///
    /// # Returns
    /// * `Some(&E)` - If the underlying error is of type `E`
    /// * `None` - If the underlying error is not of type `E`
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Standard result type for plexrate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories.
///
/// Loosely based on gRPC status codes, with [`UnexpectedResponse`] split out
/// so that "server reachable but contract changed" never looks like "server
/// unreachable".
///
/// [`UnexpectedResponse`]: ErrorKind::UnexpectedResponse
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// The operation was interrupted.
    #[error("operation was cancelled")]
    Cancelled,

    /// Catch-all for errors that fit no other category.
    #[error("unknown error")]
    Unknown,

    /// Parameters do not match the declared shape of an operation.
    #[error("invalid argument specified")]
    InvalidArgument,

    /// A network operation timed out.
    #[error("operation timed out")]
    DeadlineExceeded,

    /// A local resource, such as a secrets file, does not exist.
    #[error("not found")]
    NotFound,

    /// A local resource could not be accessed.
    #[error("permission denied")]
    PermissionDenied,

    /// A value lies outside its scale.
    #[error("out of range")]
    OutOfRange,

    /// The request could not be delivered, or the server answered with a
    /// non-success status.
    #[error("fetch failed")]
    Unavailable,

    /// The server answered, but the payload does not match the contract.
    #[error("unexpected response")]
    UnexpectedResponse,

    /// The requested addressing mode or feature is not supported.
    #[error("not implemented")]
    Unimplemented,

    /// A programming defect was detected.
    #[error("internal error")]
    Internal,
}

macro_rules! constructors {
    ($($(#[$meta:meta])* $name:ident => $kind:ident),* $(,)?) => {
        impl Error {
            /// Creates a new error with specified kind and details.
            pub fn new<E>(kind: ErrorKind, error: E) -> Self
            where
                E: Into<Box<dyn std::error::Error + Send + Sync>>,
            {
                Self {
                    kind,
                    error: error.into(),
                }
            }

            $(
                $(#[$meta])*
                pub fn $name<E>(error: E) -> Self
                where
                    E: Into<Box<dyn std::error::Error + Send + Sync>>,
                {
                    Self::new(ErrorKind::$kind, error)
                }
            )*
        }
    };
}

constructors! {
    /// Creates an error for interrupted operations.
    cancelled => Cancelled,

    /// Creates an error for operations that exceeded their deadline.
    deadline_exceeded => DeadlineExceeded,

    /// Creates an error for internal defects.
    ///
    /// Use for conditions that correct code can never reach, such as a
    /// decision table that fell through all of its rows.
    internal => Internal,

    /// Creates an error for parameters that violate an operation's shape.
    invalid_argument => InvalidArgument,

    /// Creates an error for missing local resources.
    not_found => NotFound,

    /// Creates an error for values outside their scale.
    out_of_range => OutOfRange,

    /// Creates an error for inaccessible local resources.
    permission_denied => PermissionDenied,

    /// Creates an error for payloads that do not match the contract.
    unexpected_response => UnexpectedResponse,

    /// Creates an error for unsupported features.
    unimplemented => Unimplemented,

    /// Creates an error for transport failures and non-success statuses.
    unavailable => Unavailable,

    /// Creates an error of unknown category.
    unknown => Unknown,
}

/// Formats the error for display, showing both kind and details.
///
/// Format: "{kind}: {details}"
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// Converts IO errors into appropriate error kinds.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AddrNotAvailable | ConnectionRefused | NotConnected | BrokenPipe
            | ConnectionReset | ConnectionAborted => Self::unavailable(err),
            Interrupted => Self::cancelled(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts HTTP client errors into appropriate error kinds.
///
/// * Decode errors -> `UnexpectedResponse`
/// * Builder errors -> `Internal`
/// * Timeout errors -> `DeadlineExceeded`
/// * Anything else on the wire -> `Unavailable`
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::unexpected_response(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        if err.is_timeout() {
            return Self::deadline_exceeded(err);
        }

        if err.is_connect() || err.is_redirect() || err.is_status() || err.is_body() {
            return Self::unavailable(err);
        }

        Self::unknown(err)
    }
}

/// Converts JSON errors to `UnexpectedResponse`.
///
/// JSON is only ever parsed from server responses.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::unexpected_response(err)
    }
}

/// Converts invalid header errors to `InvalidArgument`.
impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

/// Converts URL parsing errors to `InvalidArgument`.
impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

/// Converts integer parsing errors to `InvalidArgument`.
impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

/// Converts TOML parsing errors to `InvalidArgument`.
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_details() {
        let err = Error::unavailable("GET /library/sections/1/all returned 500");
        assert_eq!(
            err.to_string(),
            "fetch failed: GET /library/sections/1/all returned 500"
        );
    }

    #[test]
    fn transport_and_contract_failures_differ() {
        let transport = Error::unavailable("connection refused");
        let contract = Error::from(serde_json::from_str::<u8>("\"x\"").unwrap_err());
        assert_eq!(transport.kind, ErrorKind::Unavailable);
        assert_eq!(contract.kind, ErrorKind::UnexpectedResponse);
        assert_ne!(transport.kind, contract.kind);
    }

    #[test]
    fn io_errors_map_to_kinds() {
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = Error::from(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert_eq!(err.kind, ErrorKind::Unavailable);
    }

    #[test]
    fn downcast_reaches_source() {
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        let io = err.downcast::<std::io::Error>().expect("io error source");
        assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
    }
}
