//! Editor session state machine
//!
//! Ties the word tracker, request scheduler and suggestion navigator together
//! over one document. Every input (edit, caret move, key, timer, server frame)
//! is a method call with an explicit timestamp where time matters, so the
//! whole cycle can be driven without a network or a real clock. The async
//! runtime in [`super::channel`] feeds it from a socket.

use ropey::Rope;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::navigator::{Key, KeyOutcome, SuggestionNavigator, apply_candidate};
use super::scheduler::{RequestScheduler, ScheduleOutcome};
use super::word::{WordSpan, locate};
use crate::config::SuggestConfig;
use crate::protocol::{CLIENT_DECODE_FAILURE_MESSAGE, LookupRequest, ServerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

/// What a server frame did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A fresh list is showing
    Shown,
    /// The current word has no candidates
    Cleared,
    /// The frame answered a word that is no longer current
    Stale,
    /// An error message is now showing
    Failed,
    /// Not connected; the frame was dropped
    Ignored,
}

/// Read-only projection of the session for rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub document: String,
    pub caret: usize,
    pub word: String,
    pub suggestions: Vec<String>,
    pub selected: Option<usize>,
    pub loading: bool,
    pub connection: ConnectionState,
    pub error: Option<String>,
}

impl SessionView {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }
}

#[derive(Debug)]
pub struct EditorSession {
    document: Rope,
    caret: usize,
    word: WordSpan,
    scheduler: RequestScheduler,
    navigator: SuggestionNavigator,
    connection: ConnectionState,
    last_error: Option<String>,
    max_suggestions: usize,
}

impl EditorSession {
    pub fn new(config: &SuggestConfig) -> Self {
        Self {
            document: Rope::new(),
            caret: 0,
            word: WordSpan::default(),
            scheduler: RequestScheduler::new(config.debounce()),
            navigator: SuggestionNavigator::new(),
            connection: ConnectionState::Connecting,
            last_error: None,
            max_suggestions: config.max_suggestions,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn word(&self) -> &WordSpan {
        &self.word
    }

    /// Replace the document text and caret after the user edited
    pub fn apply_edit(&mut self, text: &str, caret: usize, now: Instant) {
        self.document = Rope::from_str(text);
        self.caret = caret.min(self.document.len_chars());
        self.refresh_word(now, true);
    }

    /// Caret moved without an edit. A lookup is only scheduled when this
    /// lands on a different word.
    pub fn move_caret(&mut self, caret: usize, now: Instant) {
        self.caret = caret.min(self.document.len_chars());
        self.refresh_word(now, false);
    }

    fn refresh_word(&mut self, now: Instant, edited: bool) {
        let word = locate(&self.document, self.caret);
        let changed = word.text != self.word.text;
        self.word = word;

        if (edited || changed)
            && self.scheduler.on_word_changed(&self.word, now) == ScheduleOutcome::Cleared
        {
            self.navigator.dismiss();
        }
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        let outcome = self.navigator.handle_key(key);
        if let KeyOutcome::Accepted(candidate) = &outcome {
            self.accept(candidate);
        }
        outcome
    }

    /// Pointer selection of a shown candidate
    pub fn select_suggestion(&mut self, index: usize) -> KeyOutcome {
        let outcome = self.navigator.accept_at(index);
        if let KeyOutcome::Accepted(candidate) = &outcome {
            self.accept(candidate);
        }
        outcome
    }

    fn accept(&mut self, candidate: &str) {
        self.caret = apply_candidate(&mut self.document, &self.word, candidate);
        self.word = locate(&self.document, self.caret);
        // The accepted word does not trigger a new lookup
        self.scheduler.cancel();
        debug!("Accepted {:?}, caret now at {}", candidate, self.caret);
    }

    /// When the debounce timer should next be polled
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// Fire the debounce timer; returns the request to send, if any
    pub fn poll_timer(&mut self, now: Instant) -> Option<LookupRequest> {
        let request = self.scheduler.fire(now, self.is_connected())?;
        self.last_error = None;
        Some(request)
    }

    pub fn on_connected(&mut self) {
        self.connection = ConnectionState::Connected;
        self.last_error = None;
    }

    /// The channel dropped; suggestion state is suppressed until reconnected
    pub fn on_disconnected(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.navigator.dismiss();
        self.scheduler.cancel();
    }

    /// Apply one raw server frame
    pub fn dispatch(&mut self, raw: &str) -> DispatchOutcome {
        if !self.is_connected() {
            return DispatchOutcome::Ignored;
        }

        let message = match ServerMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Undecodable server frame: {}", e);
                self.fail(CLIENT_DECODE_FAILURE_MESSAGE.to_string());
                return DispatchOutcome::Failed;
            }
        };

        match message {
            ServerMessage::Error { message } => {
                self.fail(message);
                DispatchOutcome::Failed
            }
            ServerMessage::Suggestions { mut suggestions, query } => {
                self.scheduler.on_response(Some(&query));
                if query != self.word.text {
                    debug!("Dropping stale suggestions for {:?}, current word is {:?}", query, self.word.text);
                    return DispatchOutcome::Stale;
                }

                suggestions.truncate(self.max_suggestions);
                let outcome = if suggestions.is_empty() {
                    DispatchOutcome::Cleared
                } else {
                    DispatchOutcome::Shown
                };
                self.navigator.show(suggestions);
                outcome
            }
        }
    }

    fn fail(&mut self, message: String) {
        self.scheduler.on_response(None);
        self.navigator.dismiss();
        self.last_error = Some(message);
    }

    /// Teardown: the pending timer is released and the session counts as disconnected
    pub fn close(&mut self) {
        self.scheduler.cancel();
        self.navigator.dismiss();
        self.connection = ConnectionState::Disconnected;
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            document: self.document.to_string(),
            caret: self.caret,
            word: self.word.text.clone(),
            suggestions: self.navigator.suggestions().to_vec(),
            selected: self.navigator.selected(),
            loading: self.scheduler.is_loading(),
            connection: self.connection,
            error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::GENERIC_FAILURE_MESSAGE;
    use std::time::Duration;

    const DEBOUNCE: Duration = Duration::from_millis(200);

    fn connected_session() -> EditorSession {
        let mut session = EditorSession::new(&SuggestConfig::default());
        session.on_connected();
        session
    }

    fn suggestions(words: &[&str], query: &str) -> String {
        ServerMessage::suggestions(words.iter().map(|w| w.to_string()).collect(), query)
            .to_json()
            .unwrap()
    }

    #[test]
    fn test_full_completion_cycle() {
        let mut session = connected_session();
        let t0 = Instant::now();

        session.apply_edit("Merha kitp oku", 10, t0);
        assert_eq!(session.word().text, "kitp");
        assert_eq!(session.poll_timer(t0), None);

        let request = session.poll_timer(t0 + DEBOUNCE).unwrap();
        assert_eq!(request, LookupRequest::new("kitp"));
        assert!(session.view().loading);

        let outcome = session.dispatch(&suggestions(&["kitp", "kitap", "kit"], "kitp"));
        assert_eq!(outcome, DispatchOutcome::Shown);
        let view = session.view();
        assert!(!view.loading);
        assert_eq!(view.selected, Some(0));

        session.handle_key(Key::ArrowDown);
        assert_eq!(session.handle_key(Key::Tab), KeyOutcome::Accepted("kitap".into()));

        let view = session.view();
        assert_eq!(view.document, "Merha kitap oku");
        assert_eq!(view.caret, 11);
        assert!(view.suggestions.is_empty());
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut session = connected_session();
        let t0 = Instant::now();

        session.apply_edit("kit", 3, t0);
        session.poll_timer(t0 + DEBOUNCE);
        session.apply_edit("kita", 4, t0 + DEBOUNCE);

        let outcome = session.dispatch(&suggestions(&["kit", "kitap"], "kit"));
        assert_eq!(outcome, DispatchOutcome::Stale);
        assert!(session.view().suggestions.is_empty());
    }

    #[test]
    fn test_stale_response_keeps_current_list() {
        let mut session = connected_session();
        let t0 = Instant::now();

        session.apply_edit("kita", 4, t0);
        session.poll_timer(t0 + DEBOUNCE);
        session.dispatch(&suggestions(&["kitap"], "kita"));

        session.dispatch(&suggestions(&["kit", "kitp"], "kit"));
        assert_eq!(session.view().suggestions, vec!["kitap"]);
    }

    #[test]
    fn test_list_is_capped() {
        let mut session = connected_session();
        let t0 = Instant::now();
        session.apply_edit("a", 1, t0);

        let words = ["a1", "a2", "a3", "a4", "a5", "a6", "a7"];
        session.dispatch(&suggestions(&words, "a"));
        assert_eq!(session.view().suggestions.len(), 5);
    }

    #[test]
    fn test_malformed_frame_shows_generic_error() {
        let mut session = connected_session();
        let t0 = Instant::now();
        session.apply_edit("kit", 3, t0);
        session.poll_timer(t0 + DEBOUNCE);

        assert_eq!(session.dispatch("{not json"), DispatchOutcome::Failed);
        let view = session.view();
        assert_eq!(view.error.as_deref(), Some(CLIENT_DECODE_FAILURE_MESSAGE));
        assert!(!view.loading);
        assert!(view.is_connected());
        assert_eq!(view.document, "kit");

        // Still usable; the next send clears the error
        session.apply_edit("kitap", 5, t0 + DEBOUNCE);
        assert!(session.poll_timer(t0 + DEBOUNCE * 2).is_some());
        assert_eq!(session.view().error, None);
        assert_eq!(session.dispatch(&suggestions(&["kitap"], "kitap")), DispatchOutcome::Shown);
    }

    #[test]
    fn test_server_error_is_distinct_from_empty_list() {
        let mut session = connected_session();
        let t0 = Instant::now();
        session.apply_edit("kit", 3, t0);

        let empty = suggestions(&[], "kit");
        assert_eq!(session.dispatch(&empty), DispatchOutcome::Cleared);
        assert_eq!(session.view().error, None);

        let failure = ServerMessage::failure().to_json().unwrap();
        assert_eq!(session.dispatch(&failure), DispatchOutcome::Failed);
        assert_eq!(session.view().error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[test]
    fn test_blank_word_hides_list() {
        let mut session = connected_session();
        let t0 = Instant::now();
        session.apply_edit("kit", 3, t0);
        session.dispatch(&suggestions(&["kitap"], "kit"));

        session.apply_edit("kit ", 4, t0);
        let view = session.view();
        assert!(view.suggestions.is_empty());
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_caret_move_within_word_does_not_reschedule() {
        let mut session = connected_session();
        let t0 = Instant::now();
        session.apply_edit("merhaba dünya", 7, t0);
        session.poll_timer(t0 + DEBOUNCE);

        session.move_caret(3, t0 + DEBOUNCE);
        assert_eq!(session.next_deadline(), None);

        session.move_caret(10, t0 + DEBOUNCE);
        assert_eq!(session.word().text, "dünya");
        assert_eq!(session.next_deadline(), Some(t0 + DEBOUNCE * 2));
    }

    #[test]
    fn test_disconnected_session_ignores_frames_and_drops_lookups() {
        let mut session = EditorSession::new(&SuggestConfig::default());
        let t0 = Instant::now();
        session.apply_edit("kit", 3, t0);
        assert_eq!(session.poll_timer(t0 + DEBOUNCE), None);

        session.on_connected();
        session.dispatch(&suggestions(&["kitap"], "kit"));
        session.on_disconnected();

        let view = session.view();
        assert!(view.suggestions.is_empty());
        assert_eq!(view.connection, ConnectionState::Disconnected);
        assert_eq!(
            session.dispatch(&suggestions(&["kitap"], "kit")),
            DispatchOutcome::Ignored
        );
    }

    #[test]
    fn test_pointer_selection_accepts() {
        let mut session = connected_session();
        let t0 = Instant::now();
        session.apply_edit("iyi akş", 7, t0);
        session.dispatch(&suggestions(&["iyi akşamlar", "akşam"], "akş"));

        assert_eq!(session.select_suggestion(1), KeyOutcome::Accepted("akşam".into()));
        let view = session.view();
        assert_eq!(view.document, "iyi akşam");
        assert_eq!(view.caret, 9);
    }
}
