//! Bridge protocol message types.
//!
//! Defines the command set shared by both transport variants and the
//! remote-mode envelope around it.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Harness → Bridge server | Command request |
//! | `Response` | Bridge server → Harness | Command response |
//!
//! # Command Naming
//!
//! Commands follow `module.methodName` format:
//!
//! - `act.findAll`
//! - `ls.setItem`
//! - `ui.initBrowserCapture`

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions.
pub mod command;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::Command;
pub use request::{Request, Response, ResponseType};
