//! Harness configuration.
//!
//! A [`Config`] is built once by the hosting bootstrap through
//! [`ConfigBuilder`] and is immutable afterwards; components receive it as
//! `Arc<Config>`. Preferences that the test UI changes at runtime live in the
//! session's runtime state, seeded from [`Config::preferences`].
//!
//! # Example
//!
//! ```ignore
//! use icu_harness::Config;
//!
//! let config = Config::builder()
//!     .name("checkout-suite")
//!     .remote("ws://127.0.0.1:9400")
//!     .interactive(false)
//!     .build()?;
//!
//! assert!(config.is_local());
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for [`Config`].
pub mod builder;

/// Persisted user preferences.
pub mod preferences;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::{Host, Url};

use crate::identifiers::SessionId;
use crate::transport::DEFAULT_COMMAND_TIMEOUT;
use crate::wait::WaitOptions;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConfigBuilder;
pub use preferences::{PersistedField, Preferences, ViewLayout, config_key};

// ============================================================================
// TransportMode
// ============================================================================

/// Execution topology for automation commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Commands run in-process against the runtime hosting the application.
    Embedded,
    /// Commands are marshalled to a separate server process.
    Remote,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

// ============================================================================
// Verbosity
// ============================================================================

/// Log verbosity for the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Lifecycle messages.
    Info,
    /// Per-operation diagnostics.
    Debug,
    /// Everything, including per-attempt polling.
    Trace,
}

impl Verbosity {
    /// Returns the tracing level name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Process-lifetime harness configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Configuration name; namespaces persisted keys.
    pub name: String,
    /// Remote transport target. `None` selects embedded mode.
    pub remote: Option<Url>,
    /// Session identity assigned by the host page (embedded mode).
    pub session_id: Option<SessionId>,
    /// Explicit log verbosity.
    pub verbosity: Option<Verbosity>,
    /// Content root used by server-side capture.
    pub content_root: Option<PathBuf>,
    /// Server-side tests and capture are available.
    pub enable_server: bool,
    /// Server may store capture artifacts.
    pub can_save_test_data: bool,
    /// Initial preferences, before persisted values are loaded.
    pub preferences: Preferences,
    /// Deadline for locating candidates of a selector.
    pub find: WaitOptions,
    /// Default deadline for `wait_for_element`.
    pub wait_for_element: WaitOptions,
    /// Delay between entering capture mode and capturing.
    pub capture_settle: Duration,
    /// Per-request deadline on the remote channel.
    pub command_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: builder::DEFAULT_NAME.to_string(),
            remote: None,
            session_id: None,
            verbosity: None,
            content_root: None,
            enable_server: false,
            can_save_test_data: false,
            preferences: Preferences::default(),
            find: WaitOptions::new(5000, 100),
            wait_for_element: WaitOptions::new(5000, 200),
            capture_settle: Duration::from_millis(200),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Returns the transport mode, fixed by the presence of a remote target.
    #[inline]
    #[must_use]
    pub fn transport_mode(&self) -> TransportMode {
        if self.remote.is_some() {
            TransportMode::Remote
        } else {
            TransportMode::Embedded
        }
    }

    /// Returns `true` for a local topology.
    ///
    /// Embedded mode is always local. A remote endpoint on `localhost` or a
    /// loopback address also counts as local.
    #[must_use]
    pub fn is_local(&self) -> bool {
        let Some(url) = &self.remote else {
            return true;
        };

        match url.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
            Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
            None => false,
        }
    }

    /// Effective verbosity: the configured one, else `Debug` for local
    /// topologies and `Info` otherwise.
    #[inline]
    #[must_use]
    pub fn effective_verbosity(&self) -> Verbosity {
        self.verbosity.unwrap_or(if self.is_local() {
            Verbosity::Debug
        } else {
            Verbosity::Info
        })
    }

    /// Log filter directive for this crate, usable with `EnvFilter`.
    #[inline]
    #[must_use]
    pub fn log_directive(&self) -> String {
        format!("icu_harness={}", self.effective_verbosity().as_str())
    }

    /// Returns `true` when `init` should capture a baseline checkpoint.
    #[inline]
    #[must_use]
    pub const fn capture_on_init(&self) -> bool {
        self.enable_server && self.can_save_test_data
    }

    /// Storage key for a part of this configuration.
    #[inline]
    #[must_use]
    pub fn key(&self, part: &str) -> String {
        config_key(&self.name, part)
    }
}

// ============================================================================
// URL Query
// ============================================================================

/// Extracts the `output` query parameter from a page URI.
///
/// Returns `None` when the URI is blank, has no query string, or the query
/// has no `output` parameter.
#[must_use]
pub fn parse_output_query(uri: &str) -> Option<String> {
    let uri = uri.trim();
    if uri.is_empty() {
        return None;
    }

    let (_, query) = uri.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "output")
        .map(|(_, value)| value.into_owned())
}

// ============================================================================
// Tests
// ============================================================================
