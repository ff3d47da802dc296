//! Request and Response message types.
//!
//! Defines the remote-mode message format between the harness and the
//! bridge server.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{ElementRef, RequestId};

use super::Command;

// ============================================================================
// Constants
// ============================================================================

/// Error code reported when page script threw.
pub const SCRIPT_ERROR: &str = "script error";

/// Error code reported for an unknown element reference.
pub const STALE_ELEMENT: &str = "stale element";

// ============================================================================
// Request
// ============================================================================

/// A command request from the harness to the bridge server.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "method": "module.methodName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a new request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            id: RequestId::generate(),
            command,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the bridge server.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "uuid", "type": "success", "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": "uuid", "type": "error", "error": "script error", "message": "..." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Response type.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error code (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Error message (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// Creates a success response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            response_type: ResponseType::Success,
            result: Some(result),
            error: None,
            message: None,
        }
    }

    /// Creates an error response from a crate error.
    #[must_use]
    pub fn failure(id: RequestId, error: &Error) -> Self {
        let code = match error {
            Error::Script { .. } => SCRIPT_ERROR,
            Error::StaleElement { .. } => STALE_ELEMENT,
            _ => "unknown error",
        };
        let message = match error {
            Error::Script { message } => message.clone(),
            Error::StaleElement { element } => element.key().to_string(),
            other => other.to_string(),
        };

        Self {
            id,
            response_type: ResponseType::Error,
            result: None,
            error: Some(code.to_string()),
            message: Some(message),
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// - [`Error::Script`] when the page script threw
    /// - [`Error::StaleElement`] for an unknown element reference
    /// - [`Error::Protocol`] for any other error response
    pub fn into_result(self) -> Result<Value> {
        match self.response_type {
            ResponseType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseType::Error => {
                let code = self.error.unwrap_or_else(|| "unknown error".to_string());
                let message = self.message.unwrap_or_else(|| code.clone());
                match code.as_str() {
                    SCRIPT_ERROR => Err(Error::script(message)),
                    STALE_ELEMENT => match message.parse::<u64>() {
                        Ok(key) => Err(Error::stale_element(ElementRef::new(key))),
                        Err(_) => Err(Error::protocol(message)),
                    },
                    _ => Err(Error::protocol(message)),
                }
            }
        }
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    Success,
    /// Error response.
    Error,
}

// ============================================================================
// Tests
// ============================================================================
