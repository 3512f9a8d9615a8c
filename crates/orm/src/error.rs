//! Errors

use thiserror::Error;

/// Failures raised by prism itself, as opposed to errors reported by the
/// provider.
///
/// Functions return [`anyhow::Result`]; callers that need to tell the failure
/// classes apart recover this type with `downcast_ref::<Error>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A mapping, builder or query is misconfigured: no or ambiguous
    /// constructor match, unknown alias, unsupported fetch strategy for a
    /// container, and similar. Raised at build time where detectable.
    #[error("configuration error: {description}")]
    Configuration { description: String },

    /// A row does not have the arity its consumer expects.
    #[error("arity mismatch in {context}: expected {expected}, got {actual}")]
    Arity { expected: usize, actual: usize, context: String },

    /// Result data contradicts the mapping: duplicate map keys with differing
    /// values, duplicate list indexes, undecodable cells.
    #[error("data shape error: {description}")]
    DataShape { description: String },
}

impl Error {
    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Configuration { description } | Self::DataShape { description } => {
                description.clone()
            }
            Self::Arity { .. } => self.to_string(),
        }
    }

    /// Creates an arity error.
    #[must_use]
    pub fn arity(expected: usize, actual: usize, context: impl Into<String>) -> Self {
        Self::Arity { expected, actual, context: context.into() }
    }
}

/// Build an [`Error::Configuration`] from a format string.
#[macro_export]
macro_rules! config_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Configuration { description: format!($fmt, $($arg)*) }
    };
    ($desc:expr $(,)?) => {
        $crate::Error::Configuration { description: format!($desc) }
    };
}

/// Build an [`Error::DataShape`] from a format string.
#[macro_export]
macro_rules! shape_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::DataShape { description: format!($fmt, $($arg)*) }
    };
    ($desc:expr $(,)?) => {
        $crate::Error::DataShape { description: format!($desc) }
    };
}
