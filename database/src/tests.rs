use crate::Database;
use prospect_core::{NewMatch, SyncCursor};
use std::env;

async fn setup_test_db() -> Database {
    let db_path = env::temp_dir().join(format!("test_prospect_{}.db", uuid::Uuid::new_v4()));
    let db_url = format!("sqlite://{}", db_path.display());

    let mut db = Database::new(db_url);
    db.connect().await.expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");
    db
}

fn sample_match(product_id: i64, external_id: &str) -> NewMatch {
    NewMatch {
        product_id,
        external_id: external_id.to_string(),
        title: Some("Best task management tools?".to_string()),
        body_preview: "Looking for recommendations".to_string(),
        subreddit: "startups".to_string(),
        url: "https://www.reddit.com/r/startups/comments/1abcz/".to_string(),
        created_at: 1_700_000_000,
        discovered_at: 1_700_000_060,
        matched_keyword: "task management".to_string(),
    }
}

#[tokio::test]
async fn test_keyword_round_trip() {
    let db = setup_test_db().await;

    db.add_keyword(1, "task management").await.unwrap();
    db.add_keyword(2, "task management").await.unwrap();
    db.add_keyword(1, "kanban").await.unwrap();
    // Duplicate association is ignored
    db.add_keyword(1, "kanban").await.unwrap();

    let keywords = db.get_keywords().await.unwrap();
    assert_eq!(keywords.len(), 3);
    assert!(keywords
        .iter()
        .any(|k| k.product_id == 2 && k.keyword == "task management"));
}

#[tokio::test]
async fn test_blocked_authors_global_and_scoped() {
    let db = setup_test_db().await;

    db.add_blocked_author(None, "spam_bot").await.unwrap();
    db.add_blocked_author(Some(1), "competitor").await.unwrap();

    let blocked = db.get_blocked_authors().await.unwrap();
    assert_eq!(blocked.len(), 2);
    assert!(blocked
        .iter()
        .any(|b| b.product_id.is_none() && b.username == "spam_bot"));
    assert!(blocked
        .iter()
        .any(|b| b.product_id == Some(1) && b.username == "competitor"));
}

#[tokio::test]
async fn test_insert_matches_is_idempotent() {
    let db = setup_test_db().await;

    let rows = vec![sample_match(1, "t3_1abcz"), sample_match(2, "t3_1abcz")];
    let inserted = db.insert_matches(&rows).await.unwrap();
    assert_eq!(inserted, 2);

    // Replaying the same batch adds nothing
    let inserted = db.insert_matches(&rows).await.unwrap();
    assert_eq!(inserted, 0);

    let keys = db.existing_match_keys().await.unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&(1, "t3_1abcz".to_string())));
    assert!(keys.contains(&(2, "t3_1abcz".to_string())));
}

#[tokio::test]
async fn test_inserted_matches_start_active_and_new() {
    let db = setup_test_db().await;

    db.insert_matches(&[sample_match(1, "t3_1abcz")]).await.unwrap();
    let matches = db.get_matches(Some(1)).await.unwrap();
    assert_eq!(matches.len(), 1);
    let found = &matches[0];
    assert_eq!(found.status, prospect_core::MatchStatus::Active);
    assert!(found.is_new);
    assert_eq!(found.matched_keyword, "task management");
    assert_eq!(found.title.as_deref(), Some("Best task management tools?"));

    assert!(db.get_matches(Some(99)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_cursor_upsert() {
    let db = setup_test_db().await;

    assert!(db.get_sync_cursor().await.unwrap().is_none());

    let first = SyncCursor {
        last_post_id: "1abcz".to_string(),
        last_comment_id: None,
        updated_at: 1_700_000_000,
    };
    db.save_sync_cursor(&first).await.unwrap();
    assert_eq!(db.get_sync_cursor().await.unwrap(), Some(first));

    let second = SyncCursor {
        last_post_id: "1abd5".to_string(),
        last_comment_id: Some("k9xy1".to_string()),
        updated_at: 1_700_000_300,
    };
    db.save_sync_cursor(&second).await.unwrap();

    // Still a single row, holding the newer position
    let loaded = db.get_sync_cursor().await.unwrap().unwrap();
    assert_eq!(loaded, second);
}
