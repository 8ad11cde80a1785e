use std::sync::Arc;

use deckcycle_backend::config::WriterConfig;
use deckcycle_backend::db::{self, StoreError};
use deckcycle_backend::{SessionStore, StatWriter};
use deckcycle_engine::{
    FlipSession, QuizSession, SessionConfig, SessionEvent, StatUpdate, StudyMode, WordPair,
    WordPairStore, WriteSession,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

const SPANISH: &str = "uno\tone\ndos\ttwo\ntres\tthree\n";

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let pool = db::init_pool(&dir.path().join("nested").join("decks.db"))
        .await
        .expect("failed to open deck database");
    (dir, pool)
}

async fn seeded_deck(pool: &SqlitePool) -> i64 {
    let (deck_id, count) = db::import_pairs(pool, "spanish", SPANISH).await.unwrap();
    assert_eq!(count, 3);
    deck_id
}

#[tokio::test]
async fn test_import_preserves_pair_order() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;

    db::insert_pair(&pool, deck_id, &WordPair::new("cuatro", "four"))
        .await
        .unwrap();

    let pairs = db::get_pairs(&pool, deck_id).await.unwrap();
    let fronts: Vec<&str> = pairs.iter().map(|p| p.front.as_str()).collect();
    assert_eq!(fronts, ["uno", "dos", "tres", "cuatro"]);

    let decks = db::list_decks(&pool).await.unwrap();
    assert_eq!(decks.len(), 1);
    assert_eq!(decks[0].name, "spanish");
    assert_eq!(decks[0].word_count, 4);
}

#[tokio::test]
async fn test_import_appends_to_existing_deck() {
    let (_dir, pool) = create_test_pool().await;
    let first = seeded_deck(&pool).await;
    let (second, count) = db::import_pairs(&pool, "spanish", "cinco\tfive\n").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(count, 1);
    assert_eq!(db::get_pairs(&pool, first).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_malformed_import_creates_nothing() {
    let (_dir, pool) = create_test_pool().await;

    let err = db::import_pairs(&pool, "broken", "uno\tone\ndos two\n")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidLine { line: 2 }));
    assert_eq!(db::find_deck(&pool, "broken").await.unwrap(), None);
}

#[tokio::test]
async fn test_duplicate_deck_name_is_rejected() {
    let (_dir, pool) = create_test_pool().await;
    db::create_deck(&pool, "spanish").await.unwrap();

    let err = db::create_deck(&pool, "spanish").await.unwrap_err();
    assert!(matches!(err, StoreError::DeckExists(name) if name == "spanish"));
}

#[tokio::test]
async fn test_stat_updates_are_additive() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;

    for update in [
        StatUpdate::TimeSpent(5),
        StatUpdate::TimeSpent(7),
        StatUpdate::Answer { mode: StudyMode::Write, correct: false },
        StatUpdate::Answer { mode: StudyMode::Write, correct: true },
        StatUpdate::Answer { mode: StudyMode::Quiz, correct: true },
    ] {
        db::apply_stat_update(&pool, deck_id, &update).await.unwrap();
    }

    let stats = db::get_deck_stats(&pool, deck_id).await.unwrap();
    assert_eq!(stats.time_spent, 12);
    assert_eq!(stats.total_attempts, 3);
    assert_eq!(stats.correct_answers, 2);
    assert_eq!(stats.incorrect_answers, 1);
    assert_eq!(stats.written_wrong, 1);
    assert_eq!(stats.written_correct, 1);
    assert_eq!(stats.quiz_correct, 1);
    assert_eq!(stats.quiz_wrong, 0);
    assert_eq!(stats.accuracy_label(), "66.67%");
}

#[tokio::test]
async fn test_stat_update_for_missing_deck_fails() {
    let (_dir, pool) = create_test_pool().await;

    let err = db::apply_stat_update(&pool, 42, &StatUpdate::WordFlipped)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DeckNotFound(_)));
}

#[tokio::test]
async fn test_reset_stats_zeroes_counters() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;

    db::apply_stat_update(&pool, deck_id, &StatUpdate::StudySessionStarted)
        .await
        .unwrap();
    db::apply_stat_update(&pool, deck_id, &StatUpdate::LastStudied(chrono::Utc::now()))
        .await
        .unwrap();
    db::reset_stats(&pool, deck_id).await.unwrap();

    let stats = db::get_deck_stats(&pool, deck_id).await.unwrap();
    assert_eq!(stats, Default::default());
    assert_eq!(stats.accuracy_label(), "N/A");
}

#[tokio::test]
async fn test_schema_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("decks.db");

    let pool = db::init_pool(&path).await.unwrap();
    let deck_id = seeded_deck(&pool).await;
    pool.close().await;

    let reopened = db::init_pool(&path).await.unwrap();
    assert_eq!(db::find_deck(&reopened, "spanish").await.unwrap(), Some(deck_id));
    assert_eq!(db::get_pairs(&reopened, deck_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_rename_keeps_words_and_stats() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;
    db::apply_stat_update(&pool, deck_id, &StatUpdate::WordFlipped)
        .await
        .unwrap();

    db::rename_deck(&pool, deck_id, "español").await.unwrap();

    assert_eq!(db::find_deck(&pool, "spanish").await.unwrap(), None);
    assert_eq!(db::find_deck(&pool, "español").await.unwrap(), Some(deck_id));
    assert_eq!(db::get_pairs(&pool, deck_id).await.unwrap().len(), 3);
    assert_eq!(db::get_deck_stats(&pool, deck_id).await.unwrap().words_flipped, 1);
}

#[tokio::test]
async fn test_rename_onto_existing_name_is_rejected() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;
    db::create_deck(&pool, "french").await.unwrap();

    let err = db::rename_deck(&pool, deck_id, "french").await.unwrap_err();
    assert!(matches!(err, StoreError::DeckExists(name) if name == "french"));
    // Renaming to its own name is fine
    db::rename_deck(&pool, deck_id, "spanish").await.unwrap();

    let err = db::rename_deck(&pool, 999, "italian").await.unwrap_err();
    assert!(matches!(err, StoreError::DeckNotFound(_)));
}

#[tokio::test]
async fn test_replace_pairs_swaps_word_list() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;
    db::apply_stat_update(&pool, deck_id, &StatUpdate::StudySessionStarted)
        .await
        .unwrap();

    let pairs = [WordPair::new("rojo", "red"), WordPair::new("azul", "blue")];
    db::replace_pairs(&pool, deck_id, &pairs).await.unwrap();

    assert_eq!(db::get_pairs(&pool, deck_id).await.unwrap(), pairs);
    assert_eq!(db::get_deck_stats(&pool, deck_id).await.unwrap().study_sessions, 1);

    let err = db::replace_pairs(&pool, 999, &pairs).await.unwrap_err();
    assert!(matches!(err, StoreError::DeckNotFound(_)));
}

#[tokio::test]
async fn test_delete_deck_cascades() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;

    db::delete_deck(&pool, deck_id).await.unwrap();

    assert_eq!(db::find_deck(&pool, "spanish").await.unwrap(), None);
    assert!(db::get_pairs(&pool, deck_id).await.unwrap().is_empty());
    assert!(matches!(
        db::get_deck_stats(&pool, deck_id).await,
        Err(StoreError::DeckNotFound(_))
    ));
    assert!(db::list_decks(&pool).await.unwrap().is_empty());

    let err = db::delete_deck(&pool, deck_id).await.unwrap_err();
    assert!(matches!(err, StoreError::DeckNotFound(_)));
}

// ==================== Sessions through the write-behind store ====================

#[tokio::test]
async fn test_session_store_rejects_unknown_deck() {
    let (_dir, pool) = create_test_pool().await;
    let writer = StatWriter::spawn(pool.clone(), WriterConfig::default());

    let err = SessionStore::open(&pool, writer.sender(), 99).await.unwrap_err();
    assert!(matches!(err, StoreError::DeckNotFound(_)));
    assert!(writer.shutdown().await);
}

#[tokio::test]
async fn test_quiz_session_persists_counters() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;
    let writer = StatWriter::spawn(pool.clone(), WriterConfig::default());
    let store: Arc<dyn WordPairStore> =
        Arc::new(SessionStore::open(&pool, writer.sender(), deck_id).await.unwrap());

    let mut quiz = QuizSession::open(store, deck_id, SessionConfig::with_seed(11)).unwrap();
    let mut events = quiz.start();
    let mut first = true;

    while !events
        .iter()
        .any(|e| matches!(e, SessionEvent::SessionComplete { .. }))
    {
        let answer = quiz.current_pair().unwrap().back.clone();
        if first {
            let wrong = quiz
                .current_options()
                .iter()
                .find(|o| **o != answer)
                .cloned()
                .unwrap();
            quiz.select_option(&wrong);
            first = false;
        } else {
            quiz.select_option(&answer);
        }
        events = quiz.load_next();
    }

    drop(quiz);
    writer.flush().await.unwrap();

    let stats = db::get_deck_stats(&pool, deck_id).await.unwrap();
    assert_eq!(stats.study_sessions, 1);
    assert!(stats.last_studied.is_some());
    assert_eq!(stats.total_attempts, 3);
    assert_eq!(stats.quiz_wrong, 1);
    assert_eq!(stats.quiz_correct, 2);
    assert!(writer.shutdown().await);
}

#[tokio::test]
async fn test_write_session_retries_until_correct() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;
    let writer = StatWriter::spawn(pool.clone(), WriterConfig::default());
    let store: Arc<dyn WordPairStore> =
        Arc::new(SessionStore::open(&pool, writer.sender(), deck_id).await.unwrap());

    let mut session = WriteSession::open(store, deck_id, SessionConfig::with_seed(5)).unwrap();
    session.start();

    session.submit_answer("definitely wrong");
    let mut finished = false;
    while !finished {
        let answer = session.current_pair().unwrap().back.to_uppercase();
        let events = session.submit_answer(&answer);
        finished = events.contains(&SessionEvent::NavigateHome);
        if !finished {
            session.advance();
        }
    }

    drop(session);
    assert!(writer.shutdown().await);

    let stats = db::get_deck_stats(&pool, deck_id).await.unwrap();
    assert_eq!(stats.written_wrong, 1);
    assert_eq!(stats.written_correct, 3);
    assert_eq!(stats.study_sessions, 1);
}

#[tokio::test]
async fn test_flip_session_counts_flips_and_repeats() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;
    let writer = StatWriter::spawn(pool.clone(), WriterConfig::default());
    let store: Arc<dyn WordPairStore> =
        Arc::new(SessionStore::open(&pool, writer.sender(), deck_id).await.unwrap());

    let mut session = FlipSession::open(store, deck_id, SessionConfig::with_seed(2)).unwrap();
    session.start();
    session.next();
    session.flip();
    session.flip();
    session.repeat();
    session.next();

    drop(session);
    assert!(writer.shutdown().await);

    let stats = db::get_deck_stats(&pool, deck_id).await.unwrap();
    assert_eq!(stats.words_flipped, 2);
    assert_eq!(stats.words_repeated, 1);
    assert_eq!(stats.total_attempts, 0);
}

#[tokio::test]
async fn test_deck_deleted_mid_session_drops_its_writes() {
    let (_dir, pool) = create_test_pool().await;
    let deck_id = seeded_deck(&pool).await;
    let other = db::create_deck(&pool, "french").await.unwrap();
    let writer = StatWriter::spawn(pool.clone(), WriterConfig::default());
    let store: Arc<dyn WordPairStore> =
        Arc::new(SessionStore::open(&pool, writer.sender(), deck_id).await.unwrap());

    let mut quiz = QuizSession::open(store, deck_id, SessionConfig::with_seed(13)).unwrap();
    quiz.start();
    writer.flush().await.unwrap();
    let applied_before = writer.applied();
    assert_eq!(writer.dropped(), 0);

    db::delete_deck(&pool, deck_id).await.unwrap();

    let answer = quiz.current_pair().unwrap().back.clone();
    quiz.select_option(&answer);
    drop(quiz);
    writer.flush().await.unwrap();

    // Answer row gone with the deck: dropped, not retried forever
    assert!(writer.dropped() >= 1);
    assert_eq!(writer.applied(), applied_before);

    // The queue keeps serving other decks
    writer.sender().send(other, StatUpdate::WordFlipped).unwrap();
    writer.flush().await.unwrap();
    assert_eq!(db::get_deck_stats(&pool, other).await.unwrap().words_flipped, 1);
    assert!(writer.shutdown().await);
}
