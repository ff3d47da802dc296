//! WebSocket bridge server for remote mode.
//!
//! Runs next to the page hosting the application and executes the commands
//! of remote harnesses against its [`ScriptHost`].
//!
//! # Connection Flow
//!
//! 1. The bridge binds to `localhost:0` (random port) or a fixed port
//! 2. The harness connects with the server's `ws://` URL
//! 3. Every text frame is a [`Request`]; each gets exactly one [`Response`]
//! 4. Requests on one connection run in arrival order

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{from_str, to_string};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{Request, Response};

use super::host::{ScriptHost, dispatch};

// ============================================================================
// BridgeServer
// ============================================================================

/// A bound bridge server.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use icu_harness::transport::BridgeServer;
///
/// let server = BridgeServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// let ws_url = server.ws_url();
///
/// tokio::spawn(server.serve(host));
/// ```
pub struct BridgeServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the listener is bound to.
    addr: SocketAddr,
}

impl BridgeServer {
    /// Binds the server to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::error::Error::Io) if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(%addr, "Bridge server bound");

        Ok(Self { listener, addr })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://{ip}:{port}`, with IPv6 addresses bracketed.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts harness connections until the listener fails.
    ///
    /// Each connection is served on its own task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::error::Error::Io) if accepting fails.
    pub async fn serve(self, host: Arc<dyn ScriptHost>) -> Result<()> {
        info!(addr = %self.addr, "Bridge server listening");

        loop {
            let (stream, addr) = self.listener.accept().await?;
            debug!(?addr, "TCP connection accepted");

            tokio::spawn(Self::handle_connection(stream, Arc::clone(&host)));
        }
    }

    /// Serves one harness connection.
    async fn handle_connection(stream: TcpStream, host: Arc<dyn ScriptHost>) {
        let mut ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(error = %e, "WebSocket upgrade failed");
                return;
            }
        };

        while let Some(message) = ws_stream.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
            };

            let Some(response) = Self::handle_request(&text, host.as_ref()) else {
                continue;
            };

            let json = match to_string(&response) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize response");
                    continue;
                }
            };

            if let Err(e) = ws_stream.send(Message::Text(json.into())).await {
                warn!(error = %e, "Failed to send response");
                break;
            }
        }

        debug!("Harness connection closed");
    }

    /// Executes one request frame.
    ///
    /// Frames that do not parse as a request carry no id to answer, so they
    /// are only logged.
    fn handle_request(text: &str, host: &dyn ScriptHost) -> Option<Response> {
        let request: Request = match from_str(text) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, text = %text, "Unparseable request");
                return None;
            }
        };

        let response = match dispatch(host, &request.command) {
            Ok(result) => Response::success(request.id, result),
            Err(e) => {
                debug!(id = %request.id, error = %e, "Command failed");
                Response::failure(request.id, &e)
            }
        };

        Some(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
