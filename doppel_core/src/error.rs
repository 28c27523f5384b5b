//! Error types for test doubles.

use thiserror::Error;

/// An error value a test configures a double to raise.
///
/// The `kind` plays the role of the error's type (`"RangeError"`,
/// `"TimeoutError"`, ...) and is preserved verbatim when the double raises it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ErrorValue {
    /// Error type name
    pub kind: String,

    /// Human-readable message
    pub message: String,
}

impl ErrorValue {
    /// Creates an error value of the given kind.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates a plain `Error` kind value.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    /// Returns true if this error has the given kind.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// Errors surfaced by a double to the code under test or to the test itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DoubleError {
    /// A call drew from a side-effect sequence with nothing left in it.
    #[error("side effect exhausted for {double}")]
    SideEffectExhausted { double: String },

    /// A call reached a side-effect sequence while that sequence was still
    /// producing the element for an outer call on the same double.
    #[error("side effect already running for {double}")]
    SideEffectRunning { double: String },

    /// A configured error, raised as the call's or iteration's failure.
    #[error(transparent)]
    Configured(#[from] ErrorValue),

    /// An assertion over the call ledger did not hold.
    #[error("{assertion} failed: expected {expected}, actual {actual}")]
    AssertionFailure {
        assertion: &'static str,
        expected: String,
        actual: String,
    },

    /// Code tried to change the double's type identity directly.
    #[error("Illegal mutation: {0}")]
    IllegalMutation(String),
}

impl DoubleError {
    /// Creates an assertion failure.
    pub fn assertion(
        assertion: &'static str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::AssertionFailure {
            assertion,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Returns the configured error value, if this is one.
    pub fn configured(&self) -> Option<&ErrorValue> {
        match self {
            Self::Configured(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true for assertion failures.
    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, Self::AssertionFailure { .. })
    }
}
