//! One client connection: handshake, frame loop, teardown
//!
//! Frames on a connection are answered strictly in arrival order; the next
//! frame is not read until the previous response has been sent.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::handler::handle_payload;
use crate::errors::{ProtocolError, TransportError};
use crate::metrics::metrics;
use crate::protocol::ServerMessage;
use crate::ranker::SuggestionRanker;
use crate::wire_logger::WireLogger;

pub(crate) struct Connection {
    id: Uuid,
    peer: SocketAddr,
    ranker: Arc<SuggestionRanker>,
    wire_logger: WireLogger,
}

impl Connection {
    pub(crate) fn new(peer: SocketAddr, ranker: Arc<SuggestionRanker>, wire_logger: WireLogger) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            ranker,
            wire_logger,
        }
    }

    /// Run the connection until the client leaves or shutdown is signalled
    pub(crate) async fn serve(self, stream: TcpStream, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut socket = match accept_async(stream).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!("WebSocket handshake with {} failed: {}", self.peer, e);
                return;
            }
        };

        metrics().record_connection_opened();
        info!("Connection {} opened from {}", self.id, self.peer);
        self.wire_logger.log_event(&self.id, &format!("OPEN {}", self.peer));

        match self.run(&mut socket, &mut shutdown_rx).await {
            Ok(()) => {}
            Err(e) => debug!("Connection {} ended with error: {}", self.id, e),
        }

        if let Err(e) = socket.close(None).await {
            debug!("Failed to close connection {}: {}", self.id, e);
        }

        metrics().record_connection_closed();
        self.wire_logger.log_event(&self.id, "CLOSE");
        info!("Connection {} closed", self.id);
    }

    async fn run(
        &self,
        socket: &mut WebSocketStream<TcpStream>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<(), TransportError> {
        loop {
            let frame = tokio::select! {
                frame = socket.next() => frame,
                _ = shutdown_rx.recv() => {
                    debug!("Connection {} received shutdown signal", self.id);
                    return Ok(());
                }
            };

            let payload = match frame {
                Some(Ok(Message::Text(text))) => Ok(text),
                Some(Ok(Message::Binary(bytes))) => String::from_utf8(bytes).map_err(ProtocolError::from),
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                // Pings are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            };

            let response = match payload {
                Ok(text) => {
                    self.wire_logger.log_incoming(&self.id, &text);
                    handle_payload(&self.ranker, &text).await
                }
                Err(e) => {
                    warn!("Connection {} sent an undecodable frame: {}", self.id, e);
                    self.wire_logger.log_event(&self.id, "UNDECODABLE BINARY FRAME");
                    metrics().record_malformed_payload();
                    ServerMessage::failure()
                }
            };

            let json = match response.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to encode response on connection {}: {}", self.id, e);
                    continue;
                }
            };

            self.wire_logger.log_outgoing(&self.id, &json);
            socket.send(Message::Text(json)).await?;
        }
    }
}
