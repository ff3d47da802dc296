//! Checkpoint capture coordination.
//!
//! Capturing a checkpoint temporarily changes what the page shows: the
//! document title becomes the checkpoint title and a capture marker is
//! inserted, so the out-of-band image capture can find the right window.
//! The previous state is restored afterwards, also when the capture fails.
//!
//! # Sequence
//!
//! ```text
//! capture_mode(title, start)  ─► previous title
//! sleep(settle)
//! init_image_capture(session, title)
//! capture_mode(previous, stop)  (always)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::transport::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of the page's zoom/scale mismatch message.
const ZOOM_MESSAGE_PREFIX: &str = "Browser zoom";

// ============================================================================
// CaptureService
// ============================================================================

/// Result of one image capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// The capture matched its baseline.
    pub passed: bool,
    /// Where the captured (or diff) image was stored.
    pub artifact: Option<String>,
}

impl CaptureOutcome {
    /// A passing capture.
    #[must_use]
    pub fn passed(artifact: impl Into<String>) -> Self {
        Self {
            passed: true,
            artifact: Some(artifact.into()),
        }
    }

    /// A failing capture.
    #[must_use]
    pub fn failed(artifact: impl Into<String>) -> Self {
        Self {
            passed: false,
            artifact: Some(artifact.into()),
        }
    }
}

/// Out-of-band image capture, e.g. a test server taking a screenshot of the
/// browser window whose title matches.
#[async_trait]
pub trait CaptureService: Send + Sync {
    /// Captures the window now and associates it with `session` and `title`.
    async fn init_image_capture(&self, session: &SessionId, title: &str) -> Result<CaptureOutcome>;
}

// ============================================================================
// CheckpointCoordinator
// ============================================================================

/// Swaps page state around a capture and restores it afterwards.
///
/// Never retries; a failed capture is reported once.
#[derive(Debug, Clone)]
pub struct CheckpointCoordinator {
    transport: Transport,
    settle: Duration,
}

impl CheckpointCoordinator {
    /// Creates a coordinator that waits `settle` before capturing.
    #[must_use]
    pub fn new(transport: Transport, settle: Duration) -> Self {
        Self { transport, settle }
    }

    /// Captures the checkpoint `title` for `session`.
    ///
    /// A non-passing outcome is returned as `Ok`; it is a test failure, not a
    /// harness failure.
    ///
    /// # Errors
    ///
    /// - [`Error::InconsistentZoom`] when the page reports a zoom mismatch
    /// - any transport or capture service error, unchanged
    pub async fn capture(
        &self,
        session: &SessionId,
        title: &str,
        service: &dyn CaptureService,
    ) -> Result<CaptureOutcome> {
        let previous = self
            .transport
            .capture_mode(title, true)
            .await
            .map_err(map_zoom)?;

        debug!(%session, title, %previous, "Entered capture mode");

        sleep(self.settle).await;

        let captured = service.init_image_capture(session, title).await;
        let restored = self.transport.capture_mode(&previous, false).await;

        let outcome = match (captured, restored) {
            (Ok(outcome), Ok(_)) => outcome,
            (Ok(_), Err(restore)) => return Err(map_zoom(restore)),
            (Err(e), Ok(_)) => return Err(map_zoom(e)),
            (Err(e), Err(restore)) => {
                warn!(error = %restore, "Failed to leave capture mode");
                return Err(map_zoom(e));
            }
        };

        if outcome.passed {
            info!(title, artifact = ?outcome.artifact, "Checkpoint passed");
        } else {
            warn!(title, artifact = ?outcome.artifact, "Checkpoint differs from baseline");
        }

        Ok(outcome)
    }
}

/// Turns the page's zoom complaint into remediation guidance.
fn map_zoom(error: Error) -> Error {
    match error.script_message() {
        Some(message) if message.starts_with(ZOOM_MESSAGE_PREFIX) => Error::inconsistent_zoom(message),
        _ => error,
    }
}

// ============================================================================
// Tests
// ============================================================================
