//! Token store tests against a temporary SQLite file.

use scaffold_db::{Database, Error, SqliteTokenRepository, TokenRepository};

#[tokio::test]
async fn test_issue_resolve_revoke() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path()).await.unwrap();

    let token = db.tokens.issue("alice").await.unwrap();
    assert_eq!(token.len(), 36);
    assert_eq!(db.tokens.resolve(&token).await.unwrap().as_deref(), Some("alice"));
    assert_eq!(db.tokens.count().await.unwrap(), 1);

    db.tokens.revoke(&token).await.unwrap();
    assert_eq!(db.tokens.resolve(&token).await.unwrap(), None);
    assert_eq!(db.tokens.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_revoke_unknown_token_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path()).await.unwrap();
    match db.tokens.revoke("missing").await.unwrap_err() {
        Error::NotFound(msg) => assert_eq!(msg, "Token not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_tokens_are_distinct_per_issue() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path()).await.unwrap();
    let a = db.tokens.issue("alice").await.unwrap();
    let b = db.tokens.issue("alice").await.unwrap();
    assert_ne!(a, b);
    assert_eq!(db.tokens.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_tokens_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.db");

    let token = {
        let repo = SqliteTokenRepository::open(&path).await.unwrap();
        let token = repo.issue("bob").await.unwrap();
        repo.close().await;
        token
    };

    let repo = SqliteTokenRepository::open(&path).await.unwrap();
    assert_eq!(repo.resolve(&token).await.unwrap().as_deref(), Some("bob"));
}
