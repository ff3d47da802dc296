//! ICU Harness - In-page UI test automation substrate.
//!
//! This library provides the runtime under an in-browser UI test harness:
//! it locates rendered elements, simulates user actions, persists test
//! preferences and coordinates visual checkpoint captures.
//!
//! # Architecture
//!
//! The harness runs in one of two topologies, chosen once from the
//! configuration:
//!
//! - **Embedded**: commands run in-process against the page's script host
//! - **Remote**: commands travel over a WebSocket to a [`BridgeServer`]
//!   running next to the page
//!
//! Key design principles:
//!
//! - Both topologies execute the same [`protocol::Command`] set
//! - Elements are addressed by opaque [`ElementRef`] handles, valid until
//!   the page's references are cleaned up
//! - Waiting is polling with a fixed attempt budget ([`wait`])
//! - Configuration is immutable; the [`Session`] owns all runtime state
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use icu_harness::{Config, Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Arc::new(
//!         Config::builder()
//!             .name("checkout-suite")
//!             .remote("ws://127.0.0.1:9400")
//!             .build()?,
//!     );
//!
//!     let session = Session::connect(config).await?;
//!     session.init(None).await?;
//!
//!     let page = session.page()?;
//!     let save = page.resolve_one(".btn", "Save").await?;
//!     page.click(save).await?;
//!
//!     let toast = page.wait_for_element(".toast", "Saved", None).await?;
//!     println!("{}", page.text_content(toast).await?);
//!
//!     session.close().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`checkpoint`] | Checkpoint capture coordination |
//! | [`config`] | Configuration and persisted preferences |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`page`] | Element resolution and UI actions |
//! | [`protocol`] | Bridge command and message types |
//! | [`session`] | Session lifecycle and validation |
//! | [`storage`] | Write-through local cache |
//! | [`transport`] | Embedded and WebSocket transports |
//! | [`wait`] | Polling primitives |

// ============================================================================
// Modules
// ============================================================================

/// Checkpoint capture coordination.
pub mod checkpoint;

/// Configuration, preferences and URL query parsing.
///
/// Use [`Config::builder()`] to create a configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for automation entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Element resolution and UI actions.
pub mod page;

/// Bridge protocol message types.
///
/// Command set shared by both transports, plus the remote envelope.
pub mod protocol;

/// Session lifecycle, runtime state and validation.
pub mod session;

/// Write-through local cache over persisted storage.
pub mod storage;

/// Command transport layer.
///
/// Embedded dispatch, WebSocket client and bridge server.
pub mod transport;

/// Polling/wait primitives.
pub mod wait;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Checkpoint types
pub use checkpoint::{CaptureOutcome, CaptureService, CheckpointCoordinator};

// Configuration types
pub use config::{
    Config, ConfigBuilder, PersistedField, Preferences, TransportMode, Verbosity, ViewLayout,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ElementRef, RequestId, SessionId};

// Page and session types
pub use page::Page;
pub use session::{RuntimeState, Session};
pub use storage::LocalCache;

// Transport types
pub use transport::{BridgeServer, Browser, ScriptHost, Transport};

// Wait types
pub use wait::{WaitOptions, wait_for, wait_until};
