//! Integration tests for chat and turn persistence.
//!
//! This test suite validates:
//! - Chat creation with and without an anchor item
//! - Anchor lookup resolves the owning chat
//! - Turn history returns oldest first
//! - Chat deletion cascades to its turns
//! - clear leaves the chat row in place
//! - update_content stamps updated_at and preserves context
//!
//! **IMPORTANT**: These tests require a reachable PostgreSQL server. The
//! fixture creates its own schema and applies the DDL itself.

use tabula_db::test_fixtures::TestDatabase;
use tabula_db::{
    Chat, ChatRepository, ChatTurn, Error, TurnRepository, TurnRole,
};
use uuid::Uuid;

/// Load `.env` so `DATABASE_URL` can point the fixture at a local server.
async fn get_test_db() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_chat_crud_and_anchor_lookup() {
    let test_db = get_test_db().await;
    let board_id = Uuid::now_v7();

    let anchored = Chat::new(board_id, Some(Uuid::now_v7()));
    let floating = Chat::new(board_id, None);

    test_db.db.chats.insert(&anchored).await.unwrap();
    test_db.db.chats.insert(&floating).await.unwrap();

    let fetched = test_db.db.chats.get(anchored.id).await.unwrap();
    assert_eq!(fetched.anchor_item_id, anchored.anchor_item_id);

    let by_anchor = test_db
        .db
        .chats
        .get_by_anchor(anchored.anchor_item_id.unwrap())
        .await
        .unwrap()
        .expect("Anchor resolves to its chat");
    assert_eq!(by_anchor.id, anchored.id);

    assert!(test_db
        .db
        .chats
        .get_by_anchor(Uuid::now_v7())
        .await
        .unwrap()
        .is_none());

    let listed = test_db.db.chats.list_for_board(board_id).await.unwrap();
    assert_eq!(listed.len(), 2);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_turn_history_ordering() {
    let test_db = get_test_db().await;
    let chat = Chat::new(Uuid::now_v7(), None);
    test_db.db.chats.insert(&chat).await.unwrap();

    let first = ChatTurn::user(chat.id, "What is this video about?");
    let second = ChatTurn::assistant(
        chat.id,
        "It covers indexing strategies.",
        vec!["Transcript about indexes.".to_string()],
    );
    let third = ChatTurn::user(chat.id, "Which index types?");

    test_db.db.turns.append(&first).await.unwrap();
    test_db.db.turns.append(&second).await.unwrap();
    test_db.db.turns.append(&third).await.unwrap();

    let history = test_db.db.turns.list_for_chat(chat.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id, first.id);
    assert_eq!(history[1].id, second.id);
    assert_eq!(history[2].id, third.id);
    assert_eq!(history[0].role, TurnRole::User);
    assert_eq!(history[1].role, TurnRole::Assistant);
    assert_eq!(
        history[1].context,
        vec!["Transcript about indexes.".to_string()]
    );

    assert_eq!(test_db.db.turns.count_for_chat(chat.id).await.unwrap(), 3);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_chat_delete_cascades_turns() {
    let test_db = get_test_db().await;
    let chat = Chat::new(Uuid::now_v7(), None);
    test_db.db.chats.insert(&chat).await.unwrap();

    let turn = ChatTurn::user(chat.id, "hello");
    test_db.db.turns.append(&turn).await.unwrap();

    test_db.db.chats.delete(chat.id).await.unwrap();

    assert!(matches!(
        test_db.db.chats.get(chat.id).await,
        Err(Error::ChatNotFound(_))
    ));
    assert!(matches!(
        test_db.db.turns.get(turn.id).await,
        Err(Error::MessageNotFound(_))
    ));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_clear_history_keeps_chat() {
    let test_db = get_test_db().await;
    let chat = Chat::new(Uuid::now_v7(), None);
    test_db.db.chats.insert(&chat).await.unwrap();

    test_db.db.turns.append(&ChatTurn::user(chat.id, "one")).await.unwrap();
    test_db.db.turns.append(&ChatTurn::user(chat.id, "two")).await.unwrap();

    let removed = test_db.db.turns.delete_for_chat(chat.id).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(test_db.db.turns.count_for_chat(chat.id).await.unwrap(), 0);

    // Clearing an already-empty chat is not an error
    let removed_again = test_db.db.turns.delete_for_chat(chat.id).await.unwrap();
    assert_eq!(removed_again, 0);

    // The chat row survives
    assert!(test_db.db.chats.get(chat.id).await.is_ok());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_update_content_stamps_updated_at() {
    let test_db = get_test_db().await;
    let chat = Chat::new(Uuid::now_v7(), None);
    test_db.db.chats.insert(&chat).await.unwrap();

    let turn = ChatTurn::assistant(
        chat.id,
        "Original answer.",
        vec!["Some transcript.".to_string()],
    );
    test_db.db.turns.append(&turn).await.unwrap();

    let stored = test_db.db.turns.get(turn.id).await.unwrap();
    assert!(stored.updated_at.is_none());

    let updated = test_db
        .db
        .turns
        .update_content(turn.id, "Corrected answer.")
        .await
        .unwrap();
    assert_eq!(updated.content, "Corrected answer.");
    assert!(updated.updated_at.is_some());
    assert_eq!(updated.context, vec!["Some transcript.".to_string()]);
    assert_eq!(updated.created_at, stored.created_at);

    // Missing turn is rejected
    assert!(matches!(
        test_db.db.turns.update_content(Uuid::now_v7(), "x").await,
        Err(Error::MessageNotFound(_))
    ));

    test_db.cleanup().await;
}
