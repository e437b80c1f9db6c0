/// End-to-end tests for the editor session runtime
///
/// A `SessionHandle` talks to a real suggestion server; assertions are made
/// on the views it publishes.

mod common;

use common::{TestServer, wait_for_view};
use trigram_suggest::client::{ConnectionState, Key, KeyOutcome, SessionHandle};
use trigram_suggest::config::ClientConfig;

const WORDS: &[&str] = &["kitap", "kalem", "kit", "merhaba", "merhem", "oku"];

#[tokio::test]
async fn test_typing_then_accepting_a_suggestion() {
    let server = TestServer::start(WORDS).await;
    let session = SessionHandle::connect(server.client_config()).await;
    let mut views = session.subscribe();
    assert!(session.view().is_connected());

    session.edit("Merha kitp oku", 10).unwrap();
    let view = wait_for_view(&mut views, |view| !view.suggestions.is_empty()).await;
    assert_eq!(view.word, "kitp");
    // Neither word starts with "kitp"; kit is the closer fuzzy match
    assert_eq!(view.suggestions, vec!["kit", "kitap"]);
    assert_eq!(view.selected, Some(0));
    assert!(!view.loading);

    assert_eq!(session.key(Key::ArrowDown).await.unwrap(), KeyOutcome::Moved(1));
    assert_eq!(session.key(Key::Tab).await.unwrap(), KeyOutcome::Accepted("kitap".into()));

    let view = session.view();
    assert_eq!(view.document, "Merha kitap oku");
    assert_eq!(view.caret, 11);
    assert!(view.suggestions.is_empty());

    session.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_rapid_edits_show_suggestions_for_last_word() {
    let server = TestServer::start(WORDS).await;
    let session = SessionHandle::connect(server.client_config()).await;
    let mut views = session.subscribe();

    for (text, caret) in [("m", 1), ("me", 2), ("mer", 3), ("merh", 4)] {
        session.edit(text, caret).unwrap();
    }

    let view = wait_for_view(&mut views, |view| view.word == "merh" && !view.suggestions.is_empty()).await;
    assert_eq!(view.suggestions, vec!["merhem", "merhaba"]);

    session.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_arrow_keys_cycle_selection() {
    let server = TestServer::start(WORDS).await;
    let session = SessionHandle::connect(server.client_config()).await;
    let mut views = session.subscribe();

    session.edit("kit", 3).unwrap();
    let view = wait_for_view(&mut views, |view| view.suggestions.len() == 2).await;
    assert_eq!(view.suggestions, vec!["kit", "kitap"]);

    assert_eq!(session.key(Key::ArrowDown).await.unwrap(), KeyOutcome::Moved(1));
    assert_eq!(session.key(Key::ArrowDown).await.unwrap(), KeyOutcome::Moved(0));
    assert_eq!(session.key(Key::ArrowUp).await.unwrap(), KeyOutcome::Moved(1));
    assert_eq!(session.key(Key::Char('x')).await.unwrap(), KeyOutcome::PassThrough);

    assert_eq!(session.select(1).await.unwrap(), KeyOutcome::Accepted("kitap".into()));
    assert_eq!(session.view().document, "kitap");

    session.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_blank_word_clears_suggestions() {
    let server = TestServer::start(WORDS).await;
    let session = SessionHandle::connect(server.client_config()).await;
    let mut views = session.subscribe();

    session.edit("oku", 3).unwrap();
    wait_for_view(&mut views, |view| !view.suggestions.is_empty()).await;

    session.edit("oku ", 4).unwrap();
    let view = wait_for_view(&mut views, |view| view.document == "oku ").await;
    assert!(view.suggestions.is_empty());
    assert!(!view.loading);

    session.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_server_going_away_marks_session_disconnected() {
    let server = TestServer::start(WORDS).await;
    let session = SessionHandle::connect(server.client_config()).await;
    let mut views = session.subscribe();

    session.edit("kalem", 5).unwrap();
    wait_for_view(&mut views, |view| !view.suggestions.is_empty()).await;

    server.stop().await;
    let view = wait_for_view(&mut views, |view| view.connection == ConnectionState::Disconnected).await;
    assert!(view.suggestions.is_empty());

    // Editing still works, no lookups are made
    session.edit("kalem k", 7).unwrap();
    let view = wait_for_view(&mut views, |view| view.document == "kalem k").await;
    assert_eq!(view.word, "k");
    assert!(!view.loading);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_starts_disconnected() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig::from_url(&format!("ws://127.0.0.1:{}", port)).unwrap();

    let session = SessionHandle::connect(config).await;
    assert_eq!(session.view().connection, ConnectionState::Disconnected);

    session.edit("merhaba", 7).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let view = session.view();
    assert_eq!(view.document, "merhaba");
    assert!(view.suggestions.is_empty());
    assert!(!view.loading);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_closed_session_rejects_events() {
    let server = TestServer::start(WORDS).await;
    let session = SessionHandle::connect(server.client_config()).await;
    let views = session.subscribe();

    session.close().await.unwrap();
    assert_eq!(views.borrow().connection, ConnectionState::Disconnected);

    server.stop().await;
}
