//! Bridge command definitions.
//!
//! Commands follow `module.methodName` format. The same values are executed
//! in-process in embedded mode and serialized over the wire in remote mode.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `act` | Script evaluation, element lookup and interaction, cleanup |
//! | `ls` | Persisted key/value storage |
//! | `ui` | Capture mode, element position, installation check |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::ElementRef;

// ============================================================================
// Command
// ============================================================================

/// Every primitive the page-side bridge understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Command {
    // ========================================================================
    // act
    // ========================================================================
    /// Evaluate an expression and return its value.
    #[serde(rename = "act.eval")]
    Eval {
        /// JavaScript expression.
        code: String,
    },

    /// Evaluate an expression and return it JSON-encoded.
    #[serde(rename = "act.evalJson")]
    EvalJson {
        /// JavaScript expression.
        code: String,
    },

    /// Enumerate elements matching a selector and issue references.
    #[serde(rename = "act.findAll")]
    FindAll {
        /// CSS selector.
        selector: String,
    },

    /// Click an element.
    #[serde(rename = "act.click")]
    Click {
        /// Element reference.
        #[serde(rename = "elementId")]
        element: ElementRef,
    },

    /// Assign `element.value`.
    #[serde(rename = "act.setValue")]
    SetValue {
        /// Element reference.
        #[serde(rename = "elementId")]
        element: ElementRef,
        /// New value.
        value: String,
    },

    /// Dispatch a synthetic event on an element.
    #[serde(rename = "act.dispatchEvent")]
    DispatchEvent {
        /// Element reference.
        #[serde(rename = "elementId")]
        element: ElementRef,
        /// Event type, e.g. `change`.
        #[serde(rename = "eventType")]
        event_type: String,
    },

    /// Read inner HTML or text content.
    #[serde(rename = "act.content")]
    Content {
        /// Element reference.
        #[serde(rename = "elementId")]
        element: ElementRef,
        /// `true` for inner HTML, `false` for text content.
        #[serde(rename = "asHtml")]
        as_html: bool,
    },

    /// Replace inner HTML, returning the previous content.
    #[serde(rename = "act.setContent")]
    SetContent {
        /// Element reference.
        #[serde(rename = "elementId")]
        element: ElementRef,
        /// New inner HTML.
        html: String,
    },

    /// Drop every element reference issued so far.
    #[serde(rename = "act.cleanup")]
    Cleanup,

    // ========================================================================
    // ls
    // ========================================================================
    /// Read a persisted key.
    #[serde(rename = "ls.getItem")]
    StorageGet {
        /// Storage key.
        key: String,
    },

    /// Write a persisted key.
    #[serde(rename = "ls.setItem")]
    StorageSet {
        /// Storage key.
        key: String,
        /// Serialized value.
        value: String,
    },

    /// Remove a persisted key.
    #[serde(rename = "ls.removeItem")]
    StorageRemove {
        /// Storage key.
        key: String,
    },

    // ========================================================================
    // ui
    // ========================================================================
    /// Enter (`start`) or leave capture mode.
    ///
    /// Entering sets the document title and inserts the capture marker;
    /// the previous title is returned. Leaving removes the marker and
    /// restores `title`.
    #[serde(rename = "ui.initBrowserCapture")]
    CaptureMode {
        /// Title to apply.
        title: String,
        /// Enter or leave.
        start: bool,
    },

    /// Device-pixel bounding box of the single element matching a selector.
    #[serde(rename = "ui.getPosition")]
    Position {
        /// CSS selector.
        selector: String,
    },

    /// Installation check; echoes the token back.
    #[serde(rename = "ui.isInstalled")]
    IsInstalled {
        /// Round-trip token.
        token: String,
    },
}

impl Command {
    /// Returns the `module.methodName` of this command.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Eval { .. } => "act.eval",
            Self::EvalJson { .. } => "act.evalJson",
            Self::FindAll { .. } => "act.findAll",
            Self::Click { .. } => "act.click",
            Self::SetValue { .. } => "act.setValue",
            Self::DispatchEvent { .. } => "act.dispatchEvent",
            Self::Content { .. } => "act.content",
            Self::SetContent { .. } => "act.setContent",
            Self::Cleanup => "act.cleanup",
            Self::StorageGet { .. } => "ls.getItem",
            Self::StorageSet { .. } => "ls.setItem",
            Self::StorageRemove { .. } => "ls.removeItem",
            Self::CaptureMode { .. } => "ui.initBrowserCapture",
            Self::Position { .. } => "ui.getPosition",
            Self::IsInstalled { .. } => "ui.isInstalled",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_click_wire_format() {
        let command = Command::Click {
            element: ElementRef::new(33000),
        };
        let value = serde_json::to_value(&command).expect("serialize");

        assert_eq!(
            value,
            json!({"method": "act.click", "params": {"elementId": 33000}})
        );
    }

    #[test]
    fn test_unit_command_roundtrip() {
        let json = serde_json::to_string(&Command::Cleanup).expect("serialize");
        assert!(json.contains("act.cleanup"));

        let parsed: Command = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, Command::Cleanup);
    }

    #[test]
    fn test_method_matches_serialized_tag() {
        let commands = [
            Command::FindAll {
                selector: ".btn".into(),
            },
            Command::StorageGet { key: "k".into() },
            Command::CaptureMode {
                title: "t".into(),
                start: true,
            },
            Command::IsInstalled {
                token: "icu-17".into(),
            },
        ];

        for command in commands {
            let value = serde_json::to_value(&command).expect("serialize");
            assert_eq!(value["method"], command.method());
        }
    }
}
