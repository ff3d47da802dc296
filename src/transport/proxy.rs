//! Command transport proxy.
//!
//! [`Transport`] exposes the fixed primitive set of the page-side bridge and
//! hides whether it runs in-process or across a WebSocket. The variant is
//! chosen once, when the transport is constructed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, from_str, from_value};
use tracing::{debug, error, info};
use url::Url;
use uuid::Uuid;

use crate::config::TransportMode;
use crate::error::{Error, Result};
use crate::identifiers::ElementRef;
use crate::protocol::{Command, Request};

use super::connection::Connection;
use super::host::{ScriptHost, dispatch};

// ============================================================================
// Constants
// ============================================================================

/// Bootstrap script every host page must load.
pub const INTEROP_SCRIPT: &str = "_content/IcuHarness/interop.js";

/// Framework script of an embedded (in-browser) host page.
pub const EMBEDDED_FRAMEWORK_SCRIPT: &str = "_framework/blazor.webassembly.js";

/// Framework script of a server-rendered host page.
pub const REMOTE_FRAMEWORK_SCRIPT: &str = "_framework/blazor.server.js";

// ============================================================================
// Browser
// ============================================================================

/// Browser family hosting the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    /// Microsoft Edge.
    Edge,
    /// Google Chrome or Chromium.
    Chrome,
    /// Mozilla Firefox.
    Firefox,
    /// Internet Explorer.
    Msie,
}

impl Browser {
    /// Candidates in match order, with their user-agent tokens.
    const CANDIDATES: [(&'static str, Self); 4] = [
        ("Edge", Self::Edge),
        ("Chrome", Self::Chrome),
        ("Firefox", Self::Firefox),
        ("MSIE", Self::Msie),
    ];

    /// Classifies a user-agent string by the first token it contains.
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Option<Self> {
        Self::CANDIDATES
            .iter()
            .find(|(token, _)| user_agent.contains(token))
            .map(|(_, browser)| *browser)
    }

    /// User-agent token of this browser.
    #[must_use]
    pub fn token(&self) -> &'static str {
        Self::CANDIDATES
            .iter()
            .find(|(_, b)| b == self)
            .map_or("", |(token, _)| token)
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Uniform command channel to the page under test.
///
/// Cheap to clone. Commands issued sequentially by one caller take effect in
/// issue order in both variants.
#[derive(Clone)]
pub enum Transport {
    /// Commands run in-process against the page's script host.
    Embedded(Arc<dyn ScriptHost>),
    /// Commands are sent to a bridge server.
    Remote(Connection),
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transport").field(&self.mode()).finish()
    }
}

impl Transport {
    /// Creates an embedded transport over a script host.
    #[must_use]
    pub fn embedded(host: Arc<dyn ScriptHost>) -> Self {
        Self::Embedded(host)
    }

    /// Connects a remote transport to a bridge server.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] if the bridge cannot be reached.
    pub async fn connect(url: &Url, command_timeout: Duration) -> Result<Self> {
        Ok(Self::Remote(Connection::connect(url, command_timeout).await?))
    }

    /// Returns the transport mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> TransportMode {
        match self {
            Self::Embedded(_) => TransportMode::Embedded,
            Self::Remote(_) => TransportMode::Remote,
        }
    }

    /// Executes one command and returns its raw result.
    async fn send(&self, command: Command) -> Result<Value> {
        match self {
            Self::Embedded(host) => dispatch(host.as_ref(), &command),
            Self::Remote(connection) => connection.send(Request::new(command)).await?.into_result(),
        }
    }

    /// Executes a command and extracts one field of its result.
    async fn send_for<T: DeserializeOwned>(&self, command: Command, field: &str) -> Result<T> {
        let method = command.method();
        let mut result = self.send(command).await?;

        let value = result
            .get_mut(field)
            .map(Value::take)
            .ok_or_else(|| Error::protocol(format!("{method}: missing '{field}' in result")))?;

        from_value(value)
            .map_err(|e| Error::protocol(format!("{method}: invalid '{field}' in result: {e}")))
    }

    // ========================================================================
    // act
    // ========================================================================

    /// Evaluates an expression on the page.
    ///
    /// # Errors
    ///
    /// [`Error::Script`] if the expression throws.
    pub async fn eval(&self, code: &str) -> Result<Value> {
        self.send_for(Command::Eval { code: code.into() }, "value")
            .await
    }

    /// Evaluates an expression and deserializes its JSON encoding.
    ///
    /// # Errors
    ///
    /// [`Error::Script`] if the expression throws, [`Error::Json`] if the
    /// result does not have the requested shape.
    pub async fn eval_json<T: DeserializeOwned>(&self, code: &str) -> Result<T> {
        let json: String = self
            .send_for(Command::EvalJson { code: code.into() }, "json")
            .await?;
        Ok(from_str(&json)?)
    }

    /// Issues references for every element currently matching `selector`.
    pub async fn find_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        self.send_for(
            Command::FindAll {
                selector: selector.into(),
            },
            "elementIds",
        )
        .await
    }

    /// Clicks an element.
    pub async fn click(&self, element: ElementRef) -> Result<()> {
        self.send(Command::Click { element }).await?;
        Ok(())
    }

    /// Assigns `element.value`.
    pub async fn set_value(&self, element: ElementRef, value: &str) -> Result<()> {
        self.send(Command::SetValue {
            element,
            value: value.into(),
        })
        .await?;
        Ok(())
    }

    /// Dispatches a synthetic event.
    pub async fn dispatch_event(&self, element: ElementRef, event_type: &str) -> Result<()> {
        self.send(Command::DispatchEvent {
            element,
            event_type: event_type.into(),
        })
        .await?;
        Ok(())
    }

    /// Reads inner HTML (`as_html`) or text content.
    pub async fn content(&self, element: ElementRef, as_html: bool) -> Result<String> {
        self.send_for(Command::Content { element, as_html }, "content")
            .await
    }

    /// Replaces inner HTML, returning the previous content.
    pub async fn set_content(&self, element: ElementRef, html: &str) -> Result<String> {
        self.send_for(
            Command::SetContent {
                element,
                html: html.into(),
            },
            "previous",
        )
        .await
    }

    /// Drops every element reference issued so far.
    pub async fn cleanup(&self) -> Result<()> {
        self.send(Command::Cleanup).await?;
        Ok(())
    }

    // ========================================================================
    // ls
    // ========================================================================

    /// Reads a persisted key.
    pub async fn storage_get(&self, key: &str) -> Result<Option<String>> {
        self.send_for(Command::StorageGet { key: key.into() }, "value")
            .await
    }

    /// Writes a persisted key.
    pub async fn storage_set(&self, key: &str, value: &str) -> Result<()> {
        self.send(Command::StorageSet {
            key: key.into(),
            value: value.into(),
        })
        .await?;
        Ok(())
    }

    /// Removes a persisted key.
    pub async fn storage_remove(&self, key: &str) -> Result<()> {
        self.send(Command::StorageRemove { key: key.into() })
            .await?;
        Ok(())
    }

    // ========================================================================
    // ui
    // ========================================================================

    /// Enters or leaves capture mode, returning the previous title.
    pub async fn capture_mode(&self, title: &str, start: bool) -> Result<String> {
        self.send_for(
            Command::CaptureMode {
                title: title.into(),
                start,
            },
            "previousTitle",
        )
        .await
    }

    /// Device-pixel `[left, top, width, height]` of one element.
    pub async fn position(&self, selector: &str) -> Result<[f64; 4]> {
        self.send_for(
            Command::Position {
                selector: selector.into(),
            },
            "rect",
        )
        .await
    }

    /// Round-trips a token through the page bridge.
    pub async fn echo(&self, token: &str) -> Result<String> {
        self.send_for(
            Command::IsInstalled {
                token: token.into(),
            },
            "token",
        )
        .await
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Verifies that the page-side bridge is installed.
    ///
    /// Must succeed before any other command is issued.
    ///
    /// # Errors
    ///
    /// [`Error::Installation`] naming the bootstrap assets the host page must
    /// load. Connection failures are returned unchanged.
    pub async fn check_installation(&self) -> Result<()> {
        let token = format!("icu-{}", Uuid::new_v4().simple());
        self.check_installation_with_token(&token).await
    }

    /// [`check_installation`](Self::check_installation) with a chosen token.
    pub async fn check_installation_with_token(&self, token: &str) -> Result<()> {
        match self.echo(token).await {
            Ok(echoed) if echoed == token => {
                debug!(token, "Bridge installed");
                Ok(())
            }
            Ok(echoed) => {
                error!(token, %echoed, "Bridge echoed a different token");
                Err(self.installation_error())
            }
            Err(e) if e.is_connection_error() => Err(e),
            Err(e) => {
                // May be an actual script error; the remediation is the same.
                error!(error = %e, "Bridge health check failed");
                Err(self.installation_error())
            }
        }
    }

    /// Installation remediation for this transport's host page.
    #[must_use]
    pub fn installation_error(&self) -> Error {
        match self.mode() {
            TransportMode::Embedded => {
                Error::installation("index.html", &[INTEROP_SCRIPT, EMBEDDED_FRAMEWORK_SCRIPT])
            }
            TransportMode::Remote => {
                Error::installation("_Host.cshtml", &[INTEROP_SCRIPT, REMOTE_FRAMEWORK_SCRIPT])
            }
        }
    }

    /// Classifies the browser from its user agent.
    ///
    /// `None` when no known token matches; callers must tolerate that.
    pub async fn detect_browser(&self) -> Result<Option<Browser>> {
        let user_agent = self.eval("navigator.userAgent").await?;
        let browser = Browser::from_user_agent(user_agent.as_str().unwrap_or_default());

        match browser {
            Some(b) => info!(browser = %b, "Detected browser"),
            None => info!(%user_agent, "Browser not recognized"),
        }

        Ok(browser)
    }

    /// Releases the channel. Embedded transports have nothing to release.
    pub fn close(&self) {
        if let Self::Remote(connection) = self {
            connection.shutdown();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
