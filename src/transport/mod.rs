//! Command transport layer.
//!
//! Carries the bridge primitives from the harness to the page under test,
//! either in-process or over a WebSocket.
//!
//! # Architecture
//!
//! ```text
//! Embedded:
//! ┌─────────────────┐   dispatch()   ┌─────────────────┐
//! │  Transport      │───────────────►│  ScriptHost     │
//! │  ::Embedded     │                │  (page bridge)  │
//! └─────────────────┘                └─────────────────┘
//!
//! Remote:
//! ┌─────────────────┐   WebSocket    ┌─────────────────┐   dispatch()   ┌─────────────┐
//! │  Transport      │◄──────────────►│  BridgeServer   │───────────────►│  ScriptHost │
//! │  ::Remote       │  Request/Resp  │                 │                │             │
//! └─────────────────┘                └─────────────────┘                └─────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `proxy` | [`Transport`] and browser detection |
//! | `host` | [`ScriptHost`] trait, [`dispatch`], [`RefArena`] |
//! | `connection` | WebSocket client and correlation map |
//! | `server` | WebSocket bridge server |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket client connection and event loop.
pub mod connection;

/// Page-side script bridge.
pub mod host;

/// Transport proxy over both modes.
pub mod proxy;

/// WebSocket bridge server.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, DEFAULT_COMMAND_TIMEOUT};
pub use host::{FIRST_REF, RefArena, ScriptHost, dispatch};
pub use proxy::{Browser, Transport};
pub use server::BridgeServer;
