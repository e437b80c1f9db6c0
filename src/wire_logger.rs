//! Wire protocol logger for session channel frames
//!
//! Records every frame the server receives or sends to a separate file so a
//! misbehaving client can be replayed. Entries are correlated with the main
//! session log via timestamps and connection ids.
//!
//! ## Format
//!
//! ```text
//! [2025-10-29T15:19:49.123Z] <<< QUERY (conn 5b0e…) Length: 16
//! {"query":"kitp"}
//!
//! [2025-10-29T15:19:49.125Z] >>> SUGGESTIONS (conn 5b0e…) Length: 63
//! {"type":"suggestions","suggestions":["kitap","kitapçı"],"query":"kitp"}
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use time::macros::format_description;
use uuid::Uuid;

/// Wire logger shared by all connection tasks
#[derive(Clone)]
pub struct WireLogger {
    writer: Arc<Mutex<Option<fs::File>>>,
    enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Incoming,
    Outgoing,
}

impl WireLogger {
    /// A logger that drops everything
    pub fn disabled() -> Self {
        WireLogger {
            writer: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    /// Create a wire logger writing to `<log_dir>/wire-<session_id>.log`
    pub fn new(log_dir: &Path, session_id: &str) -> io::Result<Self> {
        let wire_path = log_dir.join(format!("wire-{}.log", session_id));

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wire_path)?;

        eprintln!("Wire logging to file: {:?}", wire_path);

        Ok(WireLogger {
            writer: Arc::new(Mutex::new(Some(file))),
            enabled: true,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log a frame received from a client
    pub fn log_incoming(&self, connection: &Uuid, payload: &str) {
        self.log_frame(Direction::Incoming, connection, payload);
    }

    /// Log a frame sent to a client
    pub fn log_outgoing(&self, connection: &Uuid, payload: &str) {
        self.log_frame(Direction::Outgoing, connection, payload);
    }

    /// Log a connection lifecycle event (open, close)
    pub fn log_event(&self, connection: &Uuid, event: &str) {
        if !self.enabled {
            return;
        }

        let mut guard = self.writer.lock();
        if let Some(writer) = guard.as_mut() {
            let _ = writeln!(writer, "[{}] --- {} (conn {})", timestamp(), event, connection);
            let _ = writer.flush();
        }
    }

    fn log_frame(&self, direction: Direction, connection: &Uuid, payload: &str) {
        if !self.enabled {
            return;
        }

        let (arrow, label) = match direction {
            Direction::Incoming => ("<<<", incoming_label(payload)),
            Direction::Outgoing => (">>>", outgoing_label(payload)),
        };

        let mut guard = self.writer.lock();
        if let Some(writer) = guard.as_mut() {
            let _ = writeln!(
                writer,
                "[{}] {} {} (conn {}) Length: {}",
                timestamp(),
                arrow,
                label,
                connection,
                payload.len()
            );
            let _ = writeln!(writer, "{}", payload);
            let _ = writeln!(writer); // Blank line separator
            let _ = writer.flush();
        }
    }
}

fn timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .unwrap_or_else(|_| "<no timestamp>".to_string())
}

fn incoming_label(payload: &str) -> &'static str {
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) if value.get("query").is_some_and(|q| q.is_string()) => "QUERY",
        _ => "MALFORMED",
    }
}

fn outgoing_label(payload: &str) -> &'static str {
    let kind = serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(str::to_owned));

    match kind.as_deref() {
        Some("suggestions") => "SUGGESTIONS",
        Some("error") => "ERROR",
        _ => "UNKNOWN",
    }
}

// Implement Debug to avoid exposing internal file handle
impl std::fmt::Debug for WireLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireLogger")
            .field("enabled", &self.enabled)
            .finish()
    }
}
