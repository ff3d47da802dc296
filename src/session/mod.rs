//! Test-automation session.
//!
//! A [`Session`] ties one run's identity and configuration to its transport,
//! page, local cache and checkpoint coordinator. It owns the only mutable
//! runtime state of the harness.
//!
//! # Lifecycle
//!
//! 1. Construct with [`Session::embedded`], [`Session::connect`] or
//!    [`Session::with_transport`]
//! 2. [`Session::init`]: health check, browser detection, persisted
//!    preferences, validation, optional baseline checkpoint
//! 3. Automate through [`Session::page`] and [`Session::capture_checkpoint`]
//! 4. [`Session::close`]
//!
//! # Example
//!
//! ```ignore
//! let config = Arc::new(Config::builder().remote("ws://127.0.0.1:9400").build()?);
//! let session = Session::connect(config).await?;
//! session.init(None).await?;
//!
//! let page = session.page()?;
//! page.click(page.resolve_one(".btn", "Save").await?).await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Session and configuration validation.
pub mod validate;

// ============================================================================
// Imports
// ============================================================================

use std::mem::take;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::checkpoint::{CaptureOutcome, CaptureService, CheckpointCoordinator};
use crate::config::{Config, PersistedField, Preferences, TransportMode, parse_output_query};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::page::Page;
use crate::storage::LocalCache;
use crate::transport::{Browser, ScriptHost, Transport};

// ============================================================================
// Re-exports
// ============================================================================

pub use validate::validate;

// ============================================================================
// RuntimeState
// ============================================================================

/// Mutable state of a session.
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    /// Current preferences.
    pub preferences: Preferences,
    /// Browser detected during `init`.
    pub browser: Option<Browser>,
    /// `init` completed.
    pub initialized: bool,
}

// ============================================================================
// Session
// ============================================================================

/// One test-automation run.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    config: Arc<Config>,
    transport: Transport,
    page: Page,
    cache: LocalCache,
    checkpoints: CheckpointCoordinator,
    state: Mutex<RuntimeState>,
}

impl Session {
    /// Creates an embedded session over the page's script host.
    ///
    /// The session id comes from [`Config::session_id`].
    #[must_use]
    pub fn embedded(config: Arc<Config>, host: Arc<dyn ScriptHost>) -> Self {
        Self::with_transport(config, Transport::embedded(host))
    }

    /// Connects a remote session to the configured bridge server.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration has no remote target
    /// - [`Error::Connection`] if the bridge cannot be reached
    pub async fn connect(config: Arc<Config>) -> Result<Self> {
        let Some(url) = &config.remote else {
            return Err(Error::config("Remote session needs a remote target"));
        };

        let transport = Transport::connect(url, config.command_timeout).await?;
        Ok(Self::with_transport(config, transport))
    }

    /// Creates a session over an existing transport.
    ///
    /// Remote sessions always get a fresh id; embedded sessions use the id
    /// assigned by the host page.
    #[must_use]
    pub fn with_transport(config: Arc<Config>, transport: Transport) -> Self {
        let id = match transport.mode() {
            TransportMode::Remote => SessionId::generate(),
            TransportMode::Embedded => config
                .session_id
                .clone()
                .unwrap_or_else(|| SessionId::new("")),
        };

        let page = Page::new(transport.clone(), &config);
        let cache = LocalCache::new(transport.clone());
        let checkpoints = CheckpointCoordinator::new(transport.clone(), config.capture_settle);
        let state = RuntimeState {
            preferences: config.preferences.clone(),
            ..RuntimeState::default()
        };

        debug!(session = %id, mode = %transport.mode(), "Session created");

        Self {
            id,
            config,
            transport,
            page,
            cache,
            checkpoints,
            state: Mutex::new(state),
        }
    }

    /// Prepares the session for automation.
    ///
    /// Runs the bridge health check, detects the browser, loads persisted
    /// preferences and validates. When the configuration allows saving
    /// server-side test data and a capture service is given, a baseline
    /// checkpoint titled with the session id is captured. The session counts
    /// as initialized only once all of this succeeded.
    ///
    /// # Errors
    ///
    /// - [`Error::Installation`] if the page bridge is missing
    /// - [`Error::Config`] if validation fails
    /// - capture errors of the baseline checkpoint
    pub async fn init(&self, capture: Option<&dyn CaptureService>) -> Result<()> {
        self.transport.check_installation().await?;

        let browser = match self.transport.detect_browser().await {
            Ok(browser) => browser,
            Err(e) => {
                warn!(error = %e, "Browser detection failed");
                None
            }
        };
        self.state.lock().browser = browser;

        self.read_preferences().await?;

        validate(&self.id, &self.config, &self.state.lock().preferences)?;

        if self.config.capture_on_init() {
            match capture {
                Some(service) => {
                    let title = self.id.to_string();
                    self.checkpoints.capture(&self.id, &title, service).await?;
                }
                None => warn!("Capture on init enabled but no capture service given"),
            }
        }

        self.state.lock().initialized = true;
        info!(session = %self.id, browser = ?browser, "Session initialized");

        Ok(())
    }

    /// Returns the page, once the session is initialized.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] before a successful [`init`](Self::init).
    pub fn page(&self) -> Result<&Page> {
        self.ensure_initialized()?;
        Ok(&self.page)
    }

    /// Captures a checkpoint for this session.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] before a successful [`init`](Self::init), otherwise
    /// see [`CheckpointCoordinator::capture`].
    pub async fn capture_checkpoint(
        &self,
        service: &dyn CaptureService,
        title: &str,
    ) -> Result<CaptureOutcome> {
        self.ensure_initialized()?;
        self.checkpoints.capture(&self.id, title, service).await
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.state.lock().initialized {
            Ok(())
        } else {
            Err(Error::config(
                "Session is not initialized; call init() before automating",
            ))
        }
    }

    // ========================================================================
    // Preferences
    // ========================================================================

    /// Reads a value stored under this configuration's namespace.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] before a successful [`init`](Self::init), otherwise
    /// transport failures.
    pub async fn local_get<T>(&self, part: &str, default: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.ensure_initialized()?;
        self.cache.get(&self.config.key(part), default).await
    }

    /// Writes a value under this configuration's namespace.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] before a successful [`init`](Self::init), otherwise
    /// transport failures.
    pub async fn local_set<T>(&self, part: &str, value: &T) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_initialized()?;
        self.cache.set(&self.config.key(part), value).await
    }

    /// Reloads every persisted preference, keeping current values as
    /// defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] before a successful [`init`](Self::init), otherwise
    /// transport failures.
    pub async fn load_preferences(&self) -> Result<()> {
        self.ensure_initialized()?;
        self.read_preferences().await
    }

    /// Loads persisted fields over the current preferences.
    ///
    /// An output file from the page URI keeps the session in batch mode
    /// whatever `Interactive` was saved as.
    async fn read_preferences(&self) -> Result<()> {
        let mut loaded = self.preferences();

        for field in PersistedField::ALL {
            let key = field.key(&self.config.name);
            match field {
                PersistedField::ViewLayout => {
                    loaded.view_layout = self.cache.get(&key, loaded.view_layout).await?;
                }
                PersistedField::Filter => {
                    loaded.filter = self.cache.get(&key, take(&mut loaded.filter)).await?;
                }
                PersistedField::Interactive => {
                    loaded.interactive = self.cache.get(&key, loaded.interactive).await?;
                }
                PersistedField::StopOnFirstFailure => {
                    loaded.stop_on_first_failure = self
                        .cache
                        .get(&key, loaded.stop_on_first_failure)
                        .await?;
                }
            }
        }

        let mut state = self.state.lock();
        let preferences = &mut state.preferences;
        preferences.view_layout = loaded.view_layout;
        preferences.filter = loaded.filter;
        preferences.interactive = loaded.interactive && preferences.out_file.is_none();
        preferences.stop_on_first_failure = loaded.stop_on_first_failure;

        debug!(preferences = ?preferences, "Preferences loaded");
        Ok(())
    }

    /// Persists the current value of one preference.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] before a successful [`init`](Self::init), otherwise
    /// transport failures.
    pub async fn save_field(&self, field: PersistedField) -> Result<bool> {
        self.ensure_initialized()?;

        let preferences = self.preferences();
        let key = field.key(&self.config.name);

        match field {
            PersistedField::ViewLayout => self.cache.set(&key, &preferences.view_layout).await,
            PersistedField::Filter => self.cache.set(&key, &preferences.filter).await,
            PersistedField::Interactive => self.cache.set(&key, &preferences.interactive).await,
            PersistedField::StopOnFirstFailure => {
                self.cache.set(&key, &preferences.stop_on_first_failure).await
            }
        }
    }

    /// Persists a preference by field name.
    ///
    /// # Errors
    ///
    /// [`Error::UnhandledVariable`] for an unknown field name, otherwise see
    /// [`save_field`](Self::save_field).
    pub async fn save_field_named(&self, name: &str) -> Result<bool> {
        self.save_field(name.parse()?).await
    }

    /// Returns a snapshot of the current preferences.
    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.state.lock().preferences.clone()
    }

    /// Changes preferences in memory. Persist with [`save_field`](Self::save_field).
    pub fn update_preferences(&self, update: impl FnOnce(&mut Preferences)) {
        update(&mut self.state.lock().preferences);
    }

    /// Applies the `?output=<path>` query of the page URI.
    ///
    /// Sets the output file and switches to batch mode. Returns `false` and
    /// changes nothing when the URI carries no output parameter.
    pub fn apply_uri(&self, uri: &str) -> bool {
        let Some(out_file) = parse_output_query(uri) else {
            return false;
        };

        info!(%out_file, "Batch mode from page URI");
        self.update_preferences(|p| {
            p.out_file = Some(out_file);
            p.interactive = false;
        });
        true
    }

    /// Whether `error` should end the whole run.
    ///
    /// Fatal harness errors always do; step failures only with
    /// stop-on-first-failure.
    #[must_use]
    pub fn should_stop(&self, error: &Error) -> bool {
        error.is_fatal() || self.state.lock().preferences.stop_on_first_failure
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Session identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Shared configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Transport mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> TransportMode {
        self.transport.mode()
    }

    /// Browser detected during `init`, if recognized.
    #[must_use]
    pub fn browser(&self) -> Option<Browser> {
        self.state.lock().browser
    }

    /// Returns `true` once `init` has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// The session's local cache, once the session is initialized.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] before a successful [`init`](Self::init).
    pub fn cache(&self) -> Result<&LocalCache> {
        self.ensure_initialized()?;
        Ok(&self.cache)
    }

    /// Drops element references and releases the transport.
    ///
    /// # Errors
    ///
    /// Transport failures while cleaning up; the transport is released
    /// either way.
    pub async fn close(&self) -> Result<()> {
        let was_initialized = std::mem::take(&mut self.state.lock().initialized);

        let cleanup = if was_initialized {
            self.transport.cleanup().await
        } else {
            Ok(())
        };

        self.transport.close();
        debug!(session = %self.id, "Session closed");
        cleanup
    }
}

// ============================================================================
// Tests
// ============================================================================
