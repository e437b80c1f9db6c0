//! WebSocket suggestion server
//!
//! Accepts connections on a TCP listener, upgrades each to a WebSocket and
//! answers `{"query": ..}` frames with ranked suggestions. Every connection
//! runs in its own task; shutdown is broadcast to the accept loop and all
//! live connections.

mod connection;
pub mod handler;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::errors::TransportError;
use crate::ranker::{RankingCriteria, SuggestionRanker};
use crate::vocabulary::VocabularyStore;
use crate::wire_logger::WireLogger;

use connection::Connection;

/// Signals a running [`SuggestServer`] to stop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // No receivers means the server already stopped
        let _ = self.shutdown_tx.send(());
    }
}

pub struct SuggestServer {
    listener: TcpListener,
    ranker: Arc<SuggestionRanker>,
    wire_logger: WireLogger,
    shutdown_tx: broadcast::Sender<()>,
    // Subscribed at bind time so a shutdown sent before serve() is not lost
    shutdown_rx: broadcast::Receiver<()>,
}

impl SuggestServer {
    pub async fn bind(
        config: &ServerConfig,
        store: Arc<dyn VocabularyStore>,
        wire_logger: WireLogger,
    ) -> Result<Self, TransportError> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let criteria = RankingCriteria {
            max_results: config.max_suggestions,
        };
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Ok(Self {
            listener,
            ranker: Arc::new(SuggestionRanker::new(store, criteria)),
            wire_logger,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Accept connections until shutdown, then wait for open connections to close
    pub async fn serve(self) {
        let SuggestServer {
            listener,
            ranker,
            wire_logger,
            shutdown_tx,
            mut shutdown_rx,
        } = self;

        if let Ok(addr) = listener.local_addr() {
            info!("Suggestion server listening on ws://{}", addr);
        }

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let connection = Connection::new(peer, ranker.clone(), wire_logger.clone());
                        connections.spawn(connection.serve(stream, shutdown_tx.subscribe()));
                    }
                    // Usually transient (fd exhaustion, aborted handshakes)
                    Err(e) => warn!("{}", TransportError::Accept(e)),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = shutdown_rx.recv() => {
                    info!("Suggestion server received shutdown signal");
                    break;
                }
            }
        }

        while connections.join_next().await.is_some() {}
        info!("Suggestion server stopped");
    }
}
