//! Word tracking around the caret
//!
//! The current word is the maximal run of non-whitespace characters touching
//! the caret. Offsets are char indices into the document, so multi-byte
//! letters count as one position.

use ropey::Rope;

/// The word under the caret, `text == document[start..end]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl WordSpan {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn len_chars(&self) -> usize {
        self.end - self.start
    }
}

/// Locate the word touching `caret`. A caret past the end is clamped.
pub fn locate(document: &Rope, caret: usize) -> WordSpan {
    let caret = caret.min(document.len_chars());

    let mut backwards = document.chars_at(caret);
    let mut before = 0;
    while let Some(c) = backwards.prev() {
        if c.is_whitespace() {
            break;
        }
        before += 1;
    }
    let after = document
        .chars_at(caret)
        .take_while(|c| !c.is_whitespace())
        .count();

    let (start, end) = (caret - before, caret + after);
    WordSpan {
        text: document.slice(start..end).to_string(),
        start,
        end,
    }
}

/// [`locate`] over a plain string
pub fn locate_str(document: &str, caret: usize) -> WordSpan {
    locate(&Rope::from_str(document), caret)
}
