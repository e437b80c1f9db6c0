//! Suggestion list navigation and acceptance

use ropey::Rope;

use super::word::WordSpan;

/// Keys the navigator reacts to; anything else passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    ArrowUp,
    ArrowDown,
    Char(char),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NavigatorState {
    #[default]
    Idle,
    Showing {
        suggestions: Vec<String>,
        selected: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not handled; the editor applies its default behaviour
    PassThrough,
    /// Selection moved to this index
    Moved(usize),
    /// This candidate should replace the current word
    Accepted(String),
}

#[derive(Debug, Default)]
pub struct SuggestionNavigator {
    state: NavigatorState,
}

impl SuggestionNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NavigatorState {
        &self.state
    }

    pub fn is_showing(&self) -> bool {
        matches!(self.state, NavigatorState::Showing { .. })
    }

    /// Replace the list; selection restarts at the top. An empty list hides it.
    pub fn show(&mut self, suggestions: Vec<String>) {
        self.state = if suggestions.is_empty() {
            NavigatorState::Idle
        } else {
            NavigatorState::Showing {
                suggestions,
                selected: 0,
            }
        };
    }

    pub fn dismiss(&mut self) {
        self.state = NavigatorState::Idle;
    }

    pub fn suggestions(&self) -> &[String] {
        match &self.state {
            NavigatorState::Idle => &[],
            NavigatorState::Showing { suggestions, .. } => suggestions,
        }
    }

    pub fn selected(&self) -> Option<usize> {
        match &self.state {
            NavigatorState::Idle => None,
            NavigatorState::Showing { selected, .. } => Some(*selected),
        }
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        let NavigatorState::Showing { suggestions, selected } = &mut self.state else {
            return KeyOutcome::PassThrough;
        };
        let count = suggestions.len();

        match key {
            Key::ArrowDown => {
                *selected = (*selected + 1) % count;
                KeyOutcome::Moved(*selected)
            }
            Key::ArrowUp => {
                *selected = (*selected + count - 1) % count;
                KeyOutcome::Moved(*selected)
            }
            Key::Tab => {
                let index = *selected;
                self.accept_at(index)
            }
            Key::Char(_) | Key::Other => KeyOutcome::PassThrough,
        }
    }

    /// Pointer selection of `index`; out-of-range or idle passes through
    pub fn accept_at(&mut self, index: usize) -> KeyOutcome {
        let candidate = match &self.state {
            NavigatorState::Showing { suggestions, .. } => suggestions.get(index).cloned(),
            NavigatorState::Idle => None,
        };

        match candidate {
            Some(candidate) => {
                self.state = NavigatorState::Idle;
                KeyOutcome::Accepted(candidate)
            }
            None => KeyOutcome::PassThrough,
        }
    }
}

/// Replace `word` in `document` with `candidate`; returns the new caret,
/// placed right after the inserted text
pub fn apply_candidate(document: &mut Rope, word: &WordSpan, candidate: &str) -> usize {
    let end = word.end.min(document.len_chars());
    let start = word.start.min(end);

    document.remove(start..end);
    document.insert(start, candidate);
    start + candidate.chars().count()
}
