//! Shared fixtures: a suggestion server on an ephemeral port and helpers
//! for waiting on session views.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use trigram_suggest::client::SessionView;
use trigram_suggest::config::{ClientConfig, ServerConfig, SuggestConfig};
use trigram_suggest::server::{ShutdownHandle, SuggestServer};
use trigram_suggest::vocabulary::{TrigramVocabulary, VocabularyStore};
use trigram_suggest::wire_logger::WireLogger;

pub type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: ShutdownHandle,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(words: &[&str]) -> Self {
        Self::start_with_config(words, Self::config()).await
    }

    /// Server whose vocabulary is built from `config`
    pub async fn start_with_config(words: &[&str], config: ServerConfig) -> Self {
        let vocabulary = TrigramVocabulary::for_server(&config);
        vocabulary.extend(words.iter().copied());
        Self::bind(Arc::new(vocabulary), config).await
    }

    pub async fn with_store(store: Arc<dyn VocabularyStore>) -> Self {
        Self::bind(store, Self::config()).await
    }

    /// Default server config on an ephemeral port
    pub fn config() -> ServerConfig {
        ServerConfig {
            port: 0,
            ..ServerConfig::default()
        }
    }

    async fn bind(store: Arc<dyn VocabularyStore>, config: ServerConfig) -> Self {
        let server = SuggestServer::bind(&config, store, WireLogger::disabled())
            .await
            .expect("bind test server");
        let addr = server.local_addr().expect("local address");
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(server.serve());

        Self { addr, shutdown, task }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Client config with a short debounce to keep tests fast
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::from_url(&self.url())
            .expect("valid url")
            .with_suggest(SuggestConfig {
                debounce_ms: 20,
                ..SuggestConfig::default()
            })
    }

    pub async fn raw_client(&self) -> RawSocket {
        let (socket, _) = connect_async(self.url()).await.expect("connect to test server");
        socket
    }

    pub async fn stop(self) {
        self.shutdown.shutdown();
        tokio::time::timeout(WAIT_TIMEOUT, self.task)
            .await
            .expect("server stops in time")
            .expect("server task");
    }
}

/// Send a text frame and return the next text reply
pub async fn round_trip(socket: &mut RawSocket, message: Message) -> String {
    socket.send(message).await.expect("send frame");
    loop {
        let frame = tokio::time::timeout(WAIT_TIMEOUT, socket.next())
            .await
            .expect("reply in time")
            .expect("connection open")
            .expect("valid frame");
        if let Message::Text(text) = frame {
            return text;
        }
    }
}

pub fn json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).expect("reply is JSON")
}

/// Wait until the published view satisfies `predicate`
pub async fn wait_for_view<F>(views: &mut watch::Receiver<SessionView>, predicate: F) -> SessionView
where
    F: Fn(&SessionView) -> bool,
{
    let matched = match tokio::time::timeout(WAIT_TIMEOUT, views.wait_for(|view| predicate(view))).await {
        Ok(Ok(view)) => Some(view.clone()),
        _ => None,
    };
    match matched {
        Some(view) => view,
        None => panic!("expected view never published, last: {:?}", *views.borrow()),
    }
}
