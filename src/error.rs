//! Error types for the harness

use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure class of an [`Error`].
///
/// Every failure is fatal to the running scenario; the class only tells the
/// reporting layer what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The UI did not look or behave as the scenario expected
    Assertion,
    /// The application sent a request the mock server does not know
    Protocol,
    /// The environment could not be set up
    Setup,
}

/// Errors that can occur while driving the harness
#[derive(Error, Debug)]
pub enum Error {
    /// An operation was handed an absent accessible (an earlier lookup came up empty)
    #[error("no accessible")]
    NullAccessible,

    /// No showing descendant matched
    #[error("cannot find accessible({0})")]
    NotFound(String),

    /// More than one showing descendant matched
    #[error("not exactly one accessible for {target} => {}", .found.join(", "))]
    AmbiguousMatch { target: String, found: Vec<String> },

    /// The accessible does not advertise a `Press` action
    #[error("expected accessible '{0}' to be pressable")]
    NotPressable(String),

    /// The accessible does not advertise a `SetFocus` action
    #[error("expected accessible '{0}' to be focusable")]
    NotFocusable(String),

    /// The accessible does not advertise a `Toggle` action
    #[error("expected accessible '{0}' to be toggleable")]
    NotToggleable(String),

    /// The accessible has no text interface
    #[error("expected accessible '{0}' to carry editable text")]
    NotEditable(String),

    /// A polled condition did not become true in time
    #[error("timed out after {waited_ms}ms waiting for {what}{}", last_seen(.last))]
    Timeout {
        what: String,
        waited_ms: u64,
        /// What the final attempt saw instead
        last: Option<String>,
    },

    /// A scenario level expectation failed
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// The mock server received a request no route accepts
    #[error("unexpected request: {0}")]
    ProtocolMismatch(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// A required binary is not where the configuration says it is
    #[error("{what} not at {path}")]
    MissingBinary { what: &'static str, path: String },

    /// A child process could not be started
    #[error("failed to spawn {what}: {source}")]
    SpawnError {
        what: String,
        #[source]
        source: std::io::Error,
    },

    /// The mock server could not be started or failed internally
    #[error("mock server error: {0}")]
    ServerError(String),

    /// The accessibility backend reported a failure
    #[error("accessibility backend error: {0}")]
    Backend(String),

    /// Filesystem error (fixtures)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn class(&self) -> FailureClass {
        match self {
            Error::NullAccessible
            | Error::NotFound(_)
            | Error::AmbiguousMatch { .. }
            | Error::NotPressable(_)
            | Error::NotFocusable(_)
            | Error::NotToggleable(_)
            | Error::NotEditable(_)
            | Error::Timeout { .. }
            | Error::Assertion(_)
            | Error::Backend(_) => FailureClass::Assertion,
            Error::ProtocolMismatch(_) => FailureClass::Protocol,
            Error::ConfigError(_)
            | Error::MissingBinary { .. }
            | Error::SpawnError { .. }
            | Error::ServerError(_)
            | Error::Io(_) => FailureClass::Setup,
        }
    }

    /// True for lookup failures a polling wait may retry past.
    ///
    /// Only an absent match qualifies; several matches never resolve by waiting.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

fn last_seen(last: &Option<String>) -> String {
    match last {
        Some(last) => format!(" (last: {})", last),
        None => String::new(),
    }
}
