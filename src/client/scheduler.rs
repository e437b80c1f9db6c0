//! Debounced lookup scheduling
//!
//! Each word change restarts the debounce window; only the word present when
//! the window elapses is sent. The scheduler is a plain state machine driven
//! by explicit timestamps; the session runtime owns the actual timer.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use super::word::WordSpan;
use crate::config::MAX_DEBOUNCE_MS;
use crate::protocol::LookupRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingLookup {
    query: String,
    deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Blank word: pending lookup dropped, suggestions should be cleared
    Cleared,
    /// A lookup will fire at `deadline` unless superseded
    Scheduled { deadline: Instant },
}

#[derive(Debug)]
pub struct RequestScheduler {
    debounce: Duration,
    pending: Option<PendingLookup>,
    in_flight: Option<String>,
    loading: bool,
}

impl RequestScheduler {
    /// `debounce` is capped at [`MAX_DEBOUNCE_MS`]
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce: debounce.min(Duration::from_millis(MAX_DEBOUNCE_MS)),
            pending: None,
            in_flight: None,
            loading: false,
        }
    }

    pub fn on_word_changed(&mut self, word: &WordSpan, now: Instant) -> ScheduleOutcome {
        if word.is_blank() {
            self.cancel();
            return ScheduleOutcome::Cleared;
        }

        let deadline = now.checked_add(self.debounce).unwrap_or(now);
        if let Some(previous) = self.pending.replace(PendingLookup {
            query: word.text.clone(),
            deadline,
        }) {
            trace!("Superseded pending lookup for {:?}", previous.query);
        }

        ScheduleOutcome::Scheduled { deadline }
    }

    /// When the pending lookup is due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Take the pending lookup if its deadline has passed.
    ///
    /// When the channel is not open the lookup is dropped without a request.
    pub fn fire(&mut self, now: Instant, connected: bool) -> Option<LookupRequest> {
        if self.pending.as_ref()?.deadline > now {
            return None;
        }
        let pending = self.pending.take()?;

        if !connected {
            debug!("Dropping lookup for {:?}: not connected", pending.query);
            return None;
        }

        self.loading = true;
        self.in_flight = Some(pending.query.clone());
        Some(LookupRequest::new(pending.query))
    }

    /// A server response arrived. `None` for an error response, which always
    /// ends loading; a suggestion list only ends it when it answers the
    /// latest request.
    pub fn on_response(&mut self, query: Option<&str>) {
        let answers_latest = match query {
            None => true,
            Some(query) => self.in_flight.as_deref() == Some(query),
        };

        if answers_latest {
            self.loading = false;
            self.in_flight = None;
        }
    }

    /// Drop any pending lookup and forget the in-flight one
    pub fn cancel(&mut self) {
        self.pending = None;
        self.in_flight = None;
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
