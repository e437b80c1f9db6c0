//! Editor-side completion client
//!
//! - [`word`]: finds the word under the caret
//! - [`scheduler`]: debounces word changes into lookups
//! - [`navigator`]: suggestion list, selection and acceptance
//! - [`session`]: the combined state machine
//! - [`channel`]: async runtime connecting a session to the server

pub mod channel;
pub mod navigator;
pub mod scheduler;
pub mod session;
pub mod word;

pub use channel::SessionHandle;
pub use navigator::{Key, KeyOutcome, NavigatorState, SuggestionNavigator};
pub use session::{ConnectionState, DispatchOutcome, EditorSession, SessionView};
pub use word::{WordSpan, locate};
