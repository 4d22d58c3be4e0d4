use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::commands::Router;
use crate::connection::Connection;
use crate::frame::Frame;

/// One connected peer.
///
/// The client reads a command, routes it and writes the reply, strictly in that order, until
/// the peer disconnects, an I/O error occurs or the shutdown token is cancelled.
pub struct Client {
    id: Uuid,
    address: SocketAddr,
    connection: Connection,
    router: Arc<Router>,
    shutdown: CancellationToken,
}

impl Client {
    pub fn new(
        id: Uuid,
        address: SocketAddr,
        connection: Connection,
        router: Arc<Router>,
        shutdown: CancellationToken,
    ) -> Client {
        Client {
            id,
            address,
            connection,
            router,
            shutdown,
        }
    }

    /// Serves the connection to completion. The socket is closed when this returns.
    #[instrument(
        name = "connection",
        skip(self),
        fields(client_id = %self.id, client_address = %self.address)
    )]
    pub async fn serve(mut self) {
        info!("Client connected");

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let res = tokio::select! {
                res = self.connection.read_frame() => res,
                _ = self.shutdown.cancelled() => break,
            };

            let response = match res {
                Ok(Some(frame)) => {
                    debug!("Received frame from client: {}", frame);
                    self.router.route(frame)
                }
                Ok(None) => break,
                // Malformed input is reported to the peer, the connection stays usable.
                Err(e) if e.is_recoverable() => {
                    warn!("Parse error: {}", e);
                    Frame::Error(format!("ERR parse error: {}", e))
                }
                Err(e) => {
                    error!("Failed to read from connection: {}", e);
                    break;
                }
            };

            debug!("Sending response to client: {}", response);

            let written = tokio::select! {
                res = self.connection.write_frame(&response) => res,
                _ = self.shutdown.cancelled() => break,
            };

            if let Err(e) = written {
                error!("Failed to send response: {}", e);
                break;
            }
        }

        info!("Client disconnected");
    }
}
