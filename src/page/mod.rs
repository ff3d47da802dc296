//! Element resolution and UI actions on the page under test.
//!
//! A [`Page`] wraps the session's [`Transport`](crate::transport::Transport)
//! with the element resolution protocol and the helper actions tests use.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Page struct and accessors |
//! | `elements` | Selector lookup, text filter, cardinality, waiting |
//! | `actions` | Clicks, values, events, content, scripting, position |
//!
//! # Example
//!
//! ```ignore
//! let page = session.page()?;
//!
//! let save = page.resolve_one(".btn", "Save").await?;
//! page.click(save).await?;
//!
//! let toast = page.wait_for_element(".toast", "Saved", None).await?;
//! assert_eq!(page.text_content(toast).await?, "Saved");
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod actions;
mod core;
mod elements;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Page;
