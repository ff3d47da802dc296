//! Core Page struct and accessors.

use std::fmt;

use crate::config::Config;
use crate::transport::Transport;
use crate::wait::WaitOptions;

// ============================================================================
// Page
// ============================================================================

/// Handle to the page hosting the application under test.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct Page {
    pub(crate) transport: Transport,
    /// Deadline for a selector to produce its first candidates.
    pub(crate) find: WaitOptions,
    /// Default deadline for `wait_for_element`.
    pub(crate) wait_for_element: WaitOptions,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("transport", &self.transport)
            .field("find", &self.find)
            .field("wait_for_element", &self.wait_for_element)
            .finish()
    }
}

impl Page {
    /// Creates a page with the configuration's wait tunables.
    #[must_use]
    pub fn new(transport: Transport, config: &Config) -> Self {
        Self::with_options(transport, config.find, config.wait_for_element)
    }

    /// Creates a page with explicit wait tunables.
    #[must_use]
    pub fn with_options(
        transport: Transport,
        find: WaitOptions,
        wait_for_element: WaitOptions,
    ) -> Self {
        Self {
            transport,
            find,
            wait_for_element,
        }
    }

    /// Returns the underlying transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}
