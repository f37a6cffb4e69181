//! Error types for the slippage pipeline.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.
//!
//! Not every variant is a hard failure: [`SlippageError::EmptyLadder`] is the
//! "no fill is achievable" business outcome and is mapped to absence by the
//! engine (see [`SlippageError::is_no_fill`]).

use thiserror::Error;

use crate::types::Side;

/// Result type alias for slippage operations.
pub type Result<T> = std::result::Result<T, SlippageError>;

/// Main error type for slippage operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlippageError {
    /// A book level with a non-positive or non-finite price/quantity
    #[error("Malformed level at ts={timestamp} side={side:?}: {reason}")]
    MalformedLevel {
        timestamp: i64,
        side: Side,
        reason: String,
    },

    /// Bad engine configuration (order amount, thread count, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Ladder with no rows; treated as "no clearing record"
    #[error("Empty ladder at ts={timestamp} side={side:?}")]
    EmptyLadder { timestamp: i64, side: Side },

    /// More than one ladder row carries a fill
    #[error("Ambiguous clearing at ts={timestamp} side={side:?}: {rows} qualifying rows")]
    AmbiguousClearing {
        timestamp: i64,
        side: Side,
        rows: usize,
    },

    /// Internal invariant broken (e.g. cumulative depth decreased)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Input record could not be decoded
    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// I/O failure (stringified so the error stays `Clone`)
    #[error("IO error: {0}")]
    Io(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl SlippageError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        SlippageError::Generic(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        SlippageError::InvalidConfiguration(msg.into())
    }

    /// True for outcomes that mean "no fill is achievable" rather than failure.
    #[inline]
    pub fn is_no_fill(&self) -> bool {
        matches!(self, SlippageError::EmptyLadder { .. })
    }

    /// True for errors that must stop a run before any partition is evaluated.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SlippageError::InvalidConfiguration(_) | SlippageError::Io(_)
        )
    }
}

impl From<std::io::Error> for SlippageError {
    fn from(err: std::io::Error) -> Self {
        SlippageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SlippageError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return SlippageError::Io(err.to_string());
        }
        SlippageError::Parse {
            line: err.line(),
            reason: err.to_string(),
        }
    }
}

impl From<String> for SlippageError {
    fn from(err: String) -> Self {
        SlippageError::Generic(err)
    }
}

impl From<&str> for SlippageError {
    fn from(err: &str) -> Self {
        SlippageError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SlippageError::InvalidConfiguration("order_amount must be > 0".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: order_amount must be > 0"
        );

        let err = SlippageError::AmbiguousClearing {
            timestamp: 42,
            side: Side::Ask,
            rows: 2,
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous clearing at ts=42 side=Ask: 2 qualifying rows"
        );
    }

    #[test]
    fn test_no_fill_classification() {
        let empty = SlippageError::EmptyLadder {
            timestamp: 1,
            side: Side::Bid,
        };
        assert!(empty.is_no_fill());
        assert!(!empty.is_fatal());

        let cfg = SlippageError::config("bad");
        assert!(!cfg.is_no_fill());
        assert!(cfg.is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SlippageError = io.into();
        assert!(matches!(err, SlippageError::Io(_)));
    }

    #[test]
    fn test_from_json_error_keeps_io_distinct() {
        struct ClosedPipe;

        impl std::io::Write for ClosedPipe {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let write_err = serde_json::to_writer(ClosedPipe, &[1, 2, 3]).unwrap_err();
        let err: SlippageError = write_err.into();
        assert!(matches!(err, SlippageError::Io(_)));
        assert!(err.is_fatal());

        let syntax_err = serde_json::from_str::<u32>("{").unwrap_err();
        let err: SlippageError = syntax_err.into();
        assert!(matches!(err, SlippageError::Parse { line: 1, .. }));
        assert!(!err.is_fatal());
    }
}
