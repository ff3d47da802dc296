//! Page-side script bridge.
//!
//! [`ScriptHost`] is the minimal surface the harness needs from the page
//! hosting the application under test. Embedded transports call it
//! in-process; the [`BridgeServer`](super::BridgeServer) calls it on behalf
//! of remote transports. Both go through [`dispatch`], so the two modes share
//! one command set and one result encoding.
//!
//! # Result Encoding
//!
//! | Command | Result |
//! |---------|--------|
//! | `act.eval` | `{"value": any}` |
//! | `act.evalJson` | `{"json": string}` |
//! | `act.findAll` | `{"elementIds": [u64]}` |
//! | `act.content` | `{"content": string}` |
//! | `act.setContent` | `{"previous": string}` |
//! | `ls.getItem` | `{"value": string \| null}` |
//! | `ui.initBrowserCapture` | `{"previousTitle": string}` |
//! | `ui.getPosition` | `{"rect": [f64; 4]}` |
//! | `ui.isInstalled` | `{"token": string}` |
//! | others | `null` |

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ElementRef;
use crate::protocol::Command;

// ============================================================================
// ScriptHost
// ============================================================================

/// Native scripting bridge of the page hosting the application.
///
/// Calls are synchronous: the host runs them to completion on the page's
/// thread. Failures inside page script are reported as [`Error::Script`];
/// unknown references as [`Error::StaleElement`].
pub trait ScriptHost: Send + Sync {
    /// Evaluates an expression and returns its value.
    fn eval(&self, code: &str) -> Result<Value>;

    /// Evaluates an expression and returns it JSON-encoded.
    fn eval_json(&self, code: &str) -> Result<String> {
        Ok(self.eval(code)?.to_string())
    }

    /// Issues references for every element matching `selector`.
    fn find_all(&self, selector: &str) -> Result<Vec<ElementRef>>;

    /// Clicks an element.
    fn click(&self, element: ElementRef) -> Result<()>;

    /// Assigns `element.value`.
    fn set_value(&self, element: ElementRef, value: &str) -> Result<()>;

    /// Dispatches a synthetic event on an element.
    fn dispatch_event(&self, element: ElementRef, event_type: &str) -> Result<()>;

    /// Returns inner HTML (`as_html`) or text content.
    fn content(&self, element: ElementRef, as_html: bool) -> Result<String>;

    /// Replaces inner HTML and returns the previous content.
    fn set_content(&self, element: ElementRef, html: &str) -> Result<String>;

    /// Drops every issued reference.
    fn cleanup(&self) -> Result<()>;

    /// Reads a persisted key.
    fn storage_get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a persisted key.
    fn storage_set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a persisted key.
    fn storage_remove(&self, key: &str) -> Result<()>;

    /// Enters (`start`) or leaves capture mode.
    ///
    /// Entering applies `title` and inserts the capture marker, returning the
    /// previous title. Leaving removes the marker and restores `title`.
    fn capture_mode(&self, title: &str, start: bool) -> Result<String>;

    /// Device-pixel `[left, top, width, height]` of the single element
    /// matching `selector`.
    fn position(&self, selector: &str) -> Result<[f64; 4]>;

    /// Installation check: returns `token` unchanged when installed.
    fn echo(&self, token: &str) -> Result<String>;
}

// ============================================================================
// Dispatch
// ============================================================================

/// Executes one command against a host and encodes the result.
///
/// # Errors
///
/// Whatever the host reports.
pub fn dispatch(host: &dyn ScriptHost, command: &Command) -> Result<Value> {
    trace!(method = command.method(), "Dispatching command");

    let result = match command {
        Command::Eval { code } => json!({ "value": host.eval(code)? }),
        Command::EvalJson { code } => json!({ "json": host.eval_json(code)? }),
        Command::FindAll { selector } => json!({ "elementIds": host.find_all(selector)? }),
        Command::Click { element } => {
            host.click(*element)?;
            Value::Null
        }
        Command::SetValue { element, value } => {
            host.set_value(*element, value)?;
            Value::Null
        }
        Command::DispatchEvent {
            element,
            event_type,
        } => {
            host.dispatch_event(*element, event_type)?;
            Value::Null
        }
        Command::Content { element, as_html } => {
            json!({ "content": host.content(*element, *as_html)? })
        }
        Command::SetContent { element, html } => {
            json!({ "previous": host.set_content(*element, html)? })
        }
        Command::Cleanup => {
            host.cleanup()?;
            Value::Null
        }
        Command::StorageGet { key } => json!({ "value": host.storage_get(key)? }),
        Command::StorageSet { key, value } => {
            host.storage_set(key, value)?;
            Value::Null
        }
        Command::StorageRemove { key } => {
            host.storage_remove(key)?;
            Value::Null
        }
        Command::CaptureMode { title, start } => {
            json!({ "previousTitle": host.capture_mode(title, *start)? })
        }
        Command::Position { selector } => json!({ "rect": host.position(selector)? }),
        Command::IsInstalled { token } => json!({ "token": host.echo(token)? }),
    };

    Ok(result)
}

// ============================================================================
// RefArena
// ============================================================================

/// First handle value issued by a fresh arena.
pub const FIRST_REF: u64 = 33000;

/// Page-side table of located elements.
///
/// Handles come from a monotonically increasing counter and are only ever
/// dropped all at once by [`RefArena::clear`]. The counter is not reset, so a
/// handle from before a cleanup never aliases a newer element.
#[derive(Debug)]
pub struct RefArena<T> {
    entries: FxHashMap<ElementRef, T>,
    next: u64,
}

impl<T> Default for RefArena<T> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            next: FIRST_REF,
        }
    }
}

impl<T> RefArena<T> {
    /// Creates an empty arena.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an element and returns its new handle.
    pub fn insert(&mut self, value: T) -> ElementRef {
        let handle = ElementRef::new(self.next);
        self.next += 1;
        self.entries.insert(handle, value);
        handle
    }

    /// Looks up an element by handle.
    ///
    /// # Errors
    ///
    /// [`Error::StaleElement`] if the handle is unknown.
    pub fn get(&self, handle: ElementRef) -> Result<&T> {
        self.entries
            .get(&handle)
            .ok_or_else(|| Error::stale_element(handle))
    }

    /// Drops every handle.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live handles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no handle is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
