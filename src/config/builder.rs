//! Builder pattern for harness configuration.
//!
//! # Example
//!
//! ```no_run
//! use icu_harness::Config;
//!
//! # fn example() -> icu_harness::Result<()> {
//! let config = Config::builder()
//!     .name("checkout-suite")
//!     .session_id("run-42")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::wait::WaitOptions;

use super::{Config, Verbosity, ViewLayout};

// ============================================================================
// Constants
// ============================================================================

/// Configuration name used when none is given.
pub const DEFAULT_NAME: &str = "icu";

// ============================================================================
// ConfigBuilder
// ============================================================================

/// Builder for configuring a [`Config`].
///
/// Use [`Config::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    config: Config,
    /// Unparsed remote target; parsed in [`ConfigBuilder::build`].
    remote: Option<String>,
}

impl ConfigBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration name.
    #[inline]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Sets the remote transport target (`ws://` or `wss://`).
    ///
    /// Selecting a target switches the session to remote mode.
    #[inline]
    #[must_use]
    pub fn remote(mut self, url: impl Into<String>) -> Self {
        self.remote = Some(url.into());
        self
    }

    /// Sets the session identity assigned by the host page.
    #[inline]
    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.config.session_id = Some(SessionId::new(id));
        self
    }

    /// Sets the log verbosity.
    #[inline]
    #[must_use]
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.config.verbosity = Some(verbosity);
        self
    }

    /// Sets interactive or batch mode.
    #[inline]
    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.config.preferences.interactive = interactive;
        self
    }

    /// Sets the output file. Implies batch mode.
    #[inline]
    #[must_use]
    pub fn out_file(mut self, path: impl Into<String>) -> Self {
        self.config.preferences.out_file = Some(path.into());
        self.config.preferences.interactive = false;
        self
    }

    /// Sets the content root for server-side capture.
    #[inline]
    #[must_use]
    pub fn content_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.content_root = Some(path.into());
        self
    }

    /// Enables server-side tests and capture.
    #[inline]
    #[must_use]
    pub fn enable_server(mut self, enable: bool) -> Self {
        self.config.enable_server = enable;
        self
    }

    /// Allows the server to store capture artifacts.
    #[inline]
    #[must_use]
    pub fn can_save_test_data(mut self, allow: bool) -> Self {
        self.config.can_save_test_data = allow;
        self
    }

    /// Sets the initial result layout.
    #[inline]
    #[must_use]
    pub fn view_layout(mut self, layout: ViewLayout) -> Self {
        self.config.preferences.view_layout = layout;
        self
    }

    /// Sets the initial test filter.
    #[inline]
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.config.preferences.filter = filter.into();
        self
    }

    /// Sets the initial stop-on-first-failure flag.
    #[inline]
    #[must_use]
    pub fn stop_on_first_failure(mut self, stop: bool) -> Self {
        self.config.preferences.stop_on_first_failure = stop;
        self
    }

    /// Sets the find deadline for element lookups.
    #[inline]
    #[must_use]
    pub fn find_timeout(mut self, options: WaitOptions) -> Self {
        self.config.find = options;
        self
    }

    /// Sets the default `wait_for_element` deadline.
    #[inline]
    #[must_use]
    pub fn wait_for_element_timeout(mut self, options: WaitOptions) -> Self {
        self.config.wait_for_element = options;
        self
    }

    /// Sets the delay between entering capture mode and capturing.
    #[inline]
    #[must_use]
    pub fn capture_settle(mut self, delay: Duration) -> Self {
        self.config.capture_settle = delay;
        self
    }

    /// Sets the per-request deadline for the remote channel.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the remote target is not a URL
    /// - [`Error::Config`] if the remote target is not a WebSocket URL
    pub fn build(self) -> Result<Config> {
        let mut config = self.config;

        if let Some(raw) = self.remote {
            let url = Url::parse(&raw)?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(Error::config(format!(
                    "Remote target must be a ws:// or wss:// URL, got '{raw}'.\n\
                     Example: Config::builder().remote(\"ws://127.0.0.1:9400\")"
                )));
            }
            config.remote = Some(url);
        }

        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
