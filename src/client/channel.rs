//! Async runtime for an [`EditorSession`]
//!
//! One task owns the session, the WebSocket and the debounce timer, and
//! multiplexes editor events, server frames and timer expiry with
//! `tokio::select!`. After every step the task publishes a fresh
//! [`SessionView`] on a watch channel. The socket is closed and the timer
//! released on every exit path.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use super::navigator::{Key, KeyOutcome};
use super::session::{EditorSession, SessionView};
use crate::config::ClientConfig;
use crate::errors::TransportError;
use crate::protocol::LookupRequest;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug)]
enum EditorEvent {
    Edit { text: String, caret: usize },
    MoveCaret(usize),
    Key(Key, oneshot::Sender<KeyOutcome>),
    Select(usize, oneshot::Sender<KeyOutcome>),
    Close,
}

enum Step {
    Event(Option<EditorEvent>),
    Frame(Option<Result<Message, tungstenite::Error>>),
    Timer,
}

/// Handle to a running editor session
pub struct SessionHandle {
    events: mpsc::UnboundedSender<EditorEvent>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Open the channel and start the session task.
    ///
    /// A failed connection is not an error here: the session starts in the
    /// disconnected state and edits still work, they just never produce
    /// lookups. There is no reconnect.
    pub async fn connect(config: ClientConfig) -> Self {
        let mut session = EditorSession::new(&config.suggest);

        let socket = match connect_async(config.server_url.as_str()).await {
            Ok((socket, _)) => {
                info!("Connected to suggestion server at {}", config.server_url);
                session.on_connected();
                Some(socket)
            }
            Err(e) => {
                warn!("Could not connect to {}: {}", config.server_url, e);
                session.on_disconnected();
                None
            }
        };

        let (view_tx, view) = watch::channel(session.view());
        let (events, events_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_session(session, socket, events_rx, view_tx));

        Self { events, view, task }
    }

    pub fn edit(&self, text: impl Into<String>, caret: usize) -> Result<(), TransportError> {
        self.send(EditorEvent::Edit {
            text: text.into(),
            caret,
        })
    }

    pub fn move_caret(&self, caret: usize) -> Result<(), TransportError> {
        self.send(EditorEvent::MoveCaret(caret))
    }

    pub async fn key(&self, key: Key) -> Result<KeyOutcome, TransportError> {
        let (reply, outcome) = oneshot::channel();
        self.send(EditorEvent::Key(key, reply))?;
        outcome.await.map_err(|_| TransportError::Closed)
    }

    /// Pointer selection of the candidate at `index`
    pub async fn select(&self, index: usize) -> Result<KeyOutcome, TransportError> {
        let (reply, outcome) = oneshot::channel();
        self.send(EditorEvent::Select(index, reply))?;
        outcome.await.map_err(|_| TransportError::Closed)
    }

    /// Latest published view
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// End the session and wait for the socket to close
    pub async fn close(self) -> Result<(), TransportError> {
        // The task may already be gone
        let _ = self.events.send(EditorEvent::Close);
        self.task.await.map_err(|_| TransportError::Closed)
    }

    fn send(&self, event: EditorEvent) -> Result<(), TransportError> {
        self.events.send(event).map_err(|_| TransportError::Closed)
    }
}

async fn run_session(
    mut session: EditorSession,
    mut socket: Option<WsStream>,
    mut events: mpsc::UnboundedReceiver<EditorEvent>,
    view_tx: watch::Sender<SessionView>,
) {
    loop {
        let deadline = session.next_deadline();
        let step = tokio::select! {
            event = events.recv() => Step::Event(event),
            frame = next_frame(&mut socket) => Step::Frame(frame),
            _ = sleep_until(deadline) => Step::Timer,
        };

        match step {
            Step::Event(None) | Step::Event(Some(EditorEvent::Close)) => break,
            Step::Event(Some(event)) => apply_event(&mut session, event),
            Step::Timer => {
                if let Some(request) = session.poll_timer(Instant::now()) {
                    if let Err(e) = send_request(&mut socket, &request).await {
                        warn!("Failed to send lookup for {:?}: {}", request.query, e);
                        socket = None;
                        session.on_disconnected();
                    }
                }
            }
            Step::Frame(Some(Ok(Message::Text(text)))) => {
                let outcome = session.dispatch(&text);
                debug!("Server frame applied: {:?}", outcome);
            }
            Step::Frame(Some(Ok(Message::Binary(bytes)))) => {
                session.dispatch(&String::from_utf8_lossy(&bytes));
            }
            Step::Frame(Some(Ok(Message::Close(_)))) | Step::Frame(None) => {
                info!("Suggestion server closed the connection");
                socket = None;
                session.on_disconnected();
            }
            Step::Frame(Some(Ok(_))) => {}
            Step::Frame(Some(Err(e))) => {
                warn!("Connection to suggestion server lost: {}", e);
                socket = None;
                session.on_disconnected();
            }
        }

        publish(&view_tx, &session);
    }

    session.close();
    if let Some(mut socket) = socket {
        if let Err(e) = socket.close(None).await {
            debug!("Failed to close session socket: {}", e);
        }
    }
    publish(&view_tx, &session);
}

fn apply_event(session: &mut EditorSession, event: EditorEvent) {
    match event {
        EditorEvent::Edit { text, caret } => session.apply_edit(&text, caret, Instant::now()),
        EditorEvent::MoveCaret(caret) => session.move_caret(caret, Instant::now()),
        EditorEvent::Key(key, reply) => {
            let _ = reply.send(session.handle_key(key));
        }
        EditorEvent::Select(index, reply) => {
            let _ = reply.send(session.select_suggestion(index));
        }
        EditorEvent::Close => {}
    }
}

fn publish(view_tx: &watch::Sender<SessionView>, session: &EditorSession) {
    let view = session.view();
    view_tx.send_if_modified(|current| {
        if *current == view {
            false
        } else {
            *current = view;
            true
        }
    });
}

async fn send_request(socket: &mut Option<WsStream>, request: &LookupRequest) -> Result<(), TransportError> {
    let Some(socket) = socket.as_mut() else {
        return Err(TransportError::Closed);
    };

    let payload = match request.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode lookup request: {}", e);
            return Ok(());
        }
    };

    socket.send(Message::Text(payload)).await?;
    Ok(())
}

async fn next_frame(socket: &mut Option<WsStream>) -> Option<Result<Message, tungstenite::Error>> {
    match socket {
        Some(socket) => socket.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
