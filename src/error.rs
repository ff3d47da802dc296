//! Error types for the automation harness.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//!
//! # Error Categories
//!
//! | Category | Variants | Policy |
//! |----------|----------|--------|
//! | Configuration | [`Error::Config`], [`Error::UnhandledVariable`] | Fatal to the session |
//! | Installation | [`Error::Installation`] | Fatal to the session |
//! | Capture | [`Error::InconsistentZoom`] | Reported once, never retried |
//! | Resolution | [`Error::NotFound`], [`Error::NoMatch`], [`Error::AmbiguousMatch`], [`Error::StaleElement`] | Fails the test step |
//! | Waiting | [`Error::Timeout`] | Fails the test step |
//! | Page | [`Error::Script`] | Propagated unchanged |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::RequestTimeout`], [`Error::Protocol`] | Fatal to the session |
//! | Cache | [`Error::Deserialization`] | Recovered locally, only logged |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] | Propagated unchanged |
//!
//! Environment problems ([`Error::Installation`], [`Error::InconsistentZoom`])
//! render as multi-line remediation text. Assertion-style failures render as
//! a single terse line.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{ElementRef, RequestId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Session or configuration invariant violated.
    ///
    /// Also returned when automation is invoked before the session has been
    /// registered and initialized.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Unknown persisted preference name.
    #[error("Unhandled var '{name}'.")]
    UnhandledVariable {
        /// The unrecognized field name.
        name: String,
    },

    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// The page-side automation bridge failed its health check.
    #[error("{}", render_installation(.page, .assets))]
    Installation {
        /// Host page that must load the bootstrap assets.
        page: String,
        /// Bootstrap script references the page must include.
        assets: Vec<String>,
    },

    /// Checkpoint capture detected a browser zoom / display scale mismatch.
    #[error("Inconsistent zoom\n1) {detail}\n2) Also ensure that your OS display scale is 100%")]
    InconsistentZoom {
        /// Message reported by the page.
        detail: String,
    },

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// Selector never matched anything before the find deadline.
    #[error("Cannot find element with '{selector}'")]
    NotFound {
        /// CSS selector used.
        selector: String,
    },

    /// Candidates were found but none survived the text filter.
    #[error("No matches for {search}.")]
    NoMatch {
        /// Human readable search description.
        search: String,
    },

    /// More than one element survived when exactly one was required.
    #[error("Too many matches({count}) for {search}.")]
    AmbiguousMatch {
        /// Number of surviving elements.
        count: usize,
        /// Human readable search description.
        search: String,
    },

    /// Element reference is unknown to the page (cleaned up or never issued).
    #[error("Stale element: {element}")]
    StaleElement {
        /// The stale reference.
        element: ElementRef,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// A poll deadline elapsed.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Page script threw.
    #[error("Script error: {message}")]
    Script {
        /// Error message from the page.
        message: String,
    },

    /// Cached value did not match the requested shape.
    #[error("Json Deserialize error: '{json}' is not a '{expected}'")]
    Deserialization {
        /// Stored JSON text.
        json: String,
        /// Requested type name.
        expected: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Remote channel could not be established or used.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Remote channel closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A remote request got no response in time.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request that timed out.
        request_id: RequestId,
        /// Milliseconds waited.
        timeout_ms: u64,
    },

    /// Protocol violation or unexpected response shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders the installation remediation text.
fn render_installation(page: &str, assets: &[String]) -> String {
    let mut out = format!(
        "Configuration Error\n1) You must have these js scripts in {page}.\n"
    );
    for asset in assets {
        out.push_str(&format!("    <script src=\"{asset}\"></script>\n"));
    }
    out
}

/// Describes a selector search for resolution errors.
///
/// `'sel'` or `'sel' with text 'text'`.
#[must_use]
pub fn describe_search(selector: &str, text: &str) -> String {
    if text.is_empty() {
        format!("'{selector}'")
    } else {
        format!("'{selector}' with text '{text}'")
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an unhandled variable error.
    #[inline]
    pub fn unhandled_variable(name: impl Into<String>) -> Self {
        Self::UnhandledVariable { name: name.into() }
    }

    /// Creates an installation error for the given host page and assets.
    #[inline]
    pub fn installation(page: impl Into<String>, assets: &[&str]) -> Self {
        Self::Installation {
            page: page.into(),
            assets: assets.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    /// Creates an inconsistent zoom error.
    #[inline]
    pub fn inconsistent_zoom(detail: impl Into<String>) -> Self {
        Self::InconsistentZoom {
            detail: detail.into(),
        }
    }

    /// Creates a not-found error for a selector that never matched.
    #[inline]
    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::NotFound {
            selector: selector.into(),
        }
    }

    /// Creates a no-match error.
    #[inline]
    pub fn no_match(selector: &str, text: &str) -> Self {
        Self::NoMatch {
            search: describe_search(selector, text),
        }
    }

    /// Creates an ambiguous match error.
    #[inline]
    pub fn ambiguous_match(count: usize, selector: &str, text: &str) -> Self {
        Self::AmbiguousMatch {
            count,
            search: describe_search(selector, text),
        }
    }

    /// Creates a stale element error.
    #[inline]
    pub fn stale_element(element: ElementRef) -> Self {
        Self::StaleElement { element }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Creates a deserialization error.
    #[inline]
    pub fn deserialization(json: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::Deserialization {
            json: json.into(),
            expected: expected.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a poll or request timeout.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RequestTimeout { .. })
    }

    /// Returns `true` if element resolution failed.
    #[inline]
    #[must_use]
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::NoMatch { .. }
                | Self::AmbiguousMatch { .. }
                | Self::StaleElement { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::RequestTimeout { .. }
                | Self::WebSocket(_)
                | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if the harness itself is unusable.
    ///
    /// Fatal errors end the session regardless of the stop-on-first-failure
    /// preference.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::UnhandledVariable { .. } | Self::Installation { .. }
        ) || self.is_connection_error()
    }

    /// Returns `true` if the message is multi-line remediation guidance.
    #[inline]
    #[must_use]
    pub fn is_remediation(&self) -> bool {
        matches!(
            self,
            Self::Installation { .. } | Self::InconsistentZoom { .. }
        )
    }

    /// Returns the page-reported message for script errors.
    #[inline]
    #[must_use]
    pub fn script_message(&self) -> Option<&str> {
        match self {
            Self::Script { message } => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
