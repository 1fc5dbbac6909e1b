//! Session history persistence across store instances.

use parley::session::SessionStore;
use parley::storage::{HistoryBackend, SledHistory};

mod common;

#[test]
fn test_sessions_and_active_id_survive_reopen() {
    let (history, _tmp) = common::create_temp_history();
    let db_path = history.path().to_path_buf();

    let (older, newer) = {
        let mut store = SessionStore::open(Box::new(history));
        let older = store.create_session_titled("older chat");
        store.append_user_message(&older, "older chat");
        let newer = store.create_session_titled("newer chat");
        store.select_session(&older).unwrap();
        (older, newer)
    };

    let store = SessionStore::open(Box::new(SledHistory::open(&db_path).unwrap()));
    let snapshot = store.snapshot();
    let ids: Vec<&str> = snapshot.sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![newer.as_str(), older.as_str()]);
    assert_eq!(snapshot.active_id.as_deref(), Some(older.as_str()));
    assert_eq!(snapshot.active().unwrap().messages.len(), 1);
}

#[test]
fn test_deleting_last_session_clears_active_id() {
    let (history, _tmp) = common::create_temp_history();
    let db_path = history.path().to_path_buf();

    {
        let mut store = SessionStore::open(Box::new(history));
        let id = store.create_session();
        store.delete_session(&id);
    }

    let reopened = SledHistory::open(&db_path).unwrap();
    let loaded = reopened.load().unwrap();
    assert!(loaded.sessions.is_empty());
    assert!(loaded.active_id.is_none());
}

#[test]
fn test_cleared_session_keeps_title_after_reopen() {
    let (history, _tmp) = common::create_temp_history();
    let db_path = history.path().to_path_buf();

    let id = {
        let mut store = SessionStore::open(Box::new(history));
        let id = store.create_session_titled("keep me");
        store.append_user_message(&id, "keep me");
        store.push_assistant_message(&id, "kept");
        store.clear_messages(&id);
        id
    };

    let store = SessionStore::open(Box::new(SledHistory::open(&db_path).unwrap()));
    let snapshot = store.snapshot();
    let session = snapshot.session(&id).unwrap();
    assert_eq!(session.title, "keep me");
    assert!(session.messages.is_empty());
}
