use chrono::{DateTime, Utc};
use deckcycle_engine::{DeckId, DeckStats, StatUpdate, StudyMode, WordPair};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use super::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSummary {
    pub id: DeckId,
    pub name: String,
    pub word_count: i64,
}

// ==================== Decks ====================

/// Creates a deck together with its zeroed stats row.
pub async fn create_deck(pool: &SqlitePool, name: &str) -> Result<DeckId, StoreError> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query(r#"SELECT "id" FROM "decks" WHERE "name" = ?"#)
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_some() {
        return Err(StoreError::DeckExists(name.to_string()));
    }

    let deck_id = sqlx::query(r#"INSERT INTO "decks" ("name") VALUES (?)"#)
        .bind(name)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    sqlx::query(r#"INSERT INTO "deck_stats" ("deckId") VALUES (?)"#)
        .bind(deck_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(deck_id, name, "deck created");
    Ok(deck_id)
}

pub async fn find_deck(pool: &SqlitePool, name: &str) -> Result<Option<DeckId>, StoreError> {
    let row = sqlx::query(r#"SELECT "id" FROM "decks" WHERE "name" = ?"#)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get::<i64, _>("id")))
}

/// Renames a deck, keeping its words and statistics.
pub async fn rename_deck(
    pool: &SqlitePool,
    deck_id: DeckId,
    name: &str,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let clash = sqlx::query(r#"SELECT "id" FROM "decks" WHERE "name" = ? AND "id" != ?"#)
        .bind(name)
        .bind(deck_id)
        .fetch_optional(&mut *tx)
        .await?;
    if clash.is_some() {
        return Err(StoreError::DeckExists(name.to_string()));
    }

    let result = sqlx::query(r#"UPDATE "decks" SET "name" = ? WHERE "id" = ?"#)
        .bind(name)
        .bind(deck_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::DeckNotFound(deck_id.to_string()));
    }

    tx.commit().await?;
    tracing::info!(deck_id, name, "deck renamed");
    Ok(())
}

/// Deletes a deck; its words and stats row go with it through the cascade.
pub async fn delete_deck(pool: &SqlitePool, deck_id: DeckId) -> Result<(), StoreError> {
    let result = sqlx::query(r#"DELETE FROM "decks" WHERE "id" = ?"#)
        .bind(deck_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::DeckNotFound(deck_id.to_string()));
    }
    tracing::info!(deck_id, "deck deleted");
    Ok(())
}

pub async fn list_decks(pool: &SqlitePool) -> Result<Vec<DeckSummary>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT d."id", d."name", COUNT(w."id") AS "wordCount"
        FROM "decks" d
        LEFT JOIN "words" w ON w."deckId" = d."id"
        GROUP BY d."id", d."name"
        ORDER BY d."name"
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| DeckSummary {
            id: row.get("id"),
            name: row.get("name"),
            word_count: row.get("wordCount"),
        })
        .collect())
}

// ==================== Words ====================

pub async fn insert_pair(
    pool: &SqlitePool,
    deck_id: DeckId,
    pair: &WordPair,
) -> Result<(), StoreError> {
    sqlx::query(r#"INSERT INTO "words" ("deckId", "front", "back") VALUES (?, ?, ?)"#)
        .bind(deck_id)
        .bind(&pair.front)
        .bind(&pair.back)
        .execute(pool)
        .await?;
    Ok(())
}

/// Parses `front<TAB>back` lines. Blank lines and `#` comments are skipped.
pub fn parse_pairs(content: &str) -> Result<Vec<WordPair>, StoreError> {
    let mut pairs = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let (front, back) = line
            .split_once('\t')
            .ok_or(StoreError::InvalidLine { line: idx + 1 })?;
        let (front, back) = (front.trim(), back.trim());
        if front.is_empty() || back.is_empty() {
            return Err(StoreError::InvalidLine { line: idx + 1 });
        }
        pairs.push(WordPair::new(front, back));
    }
    Ok(pairs)
}

/// Appends the parsed pairs to `deck_name`, creating the deck when missing.
///
/// The whole file is rejected if any line is malformed.
pub async fn import_pairs(
    pool: &SqlitePool,
    deck_name: &str,
    content: &str,
) -> Result<(DeckId, usize), StoreError> {
    let pairs = parse_pairs(content)?;

    let deck_id = match find_deck(pool, deck_name).await? {
        Some(id) => id,
        None => create_deck(pool, deck_name).await?,
    };

    let mut tx = pool.begin().await?;
    for pair in &pairs {
        sqlx::query(r#"INSERT INTO "words" ("deckId", "front", "back") VALUES (?, ?, ?)"#)
            .bind(deck_id)
            .bind(&pair.front)
            .bind(&pair.back)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(deck_id, count = pairs.len(), "pairs imported");
    Ok((deck_id, pairs.len()))
}

/// Swaps a deck's whole word list in one transaction. Statistics are kept.
pub async fn replace_pairs(
    pool: &SqlitePool,
    deck_id: DeckId,
    pairs: &[WordPair],
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let deck = sqlx::query(r#"SELECT "id" FROM "decks" WHERE "id" = ?"#)
        .bind(deck_id)
        .fetch_optional(&mut *tx)
        .await?;
    if deck.is_none() {
        return Err(StoreError::DeckNotFound(deck_id.to_string()));
    }

    sqlx::query(r#"DELETE FROM "words" WHERE "deckId" = ?"#)
        .bind(deck_id)
        .execute(&mut *tx)
        .await?;
    for pair in pairs {
        sqlx::query(r#"INSERT INTO "words" ("deckId", "front", "back") VALUES (?, ?, ?)"#)
            .bind(deck_id)
            .bind(&pair.front)
            .bind(&pair.back)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::info!(deck_id, count = pairs.len(), "deck words replaced");
    Ok(())
}

pub async fn get_pairs(pool: &SqlitePool, deck_id: DeckId) -> Result<Vec<WordPair>, StoreError> {
    let rows = sqlx::query(
        r#"SELECT "front", "back" FROM "words" WHERE "deckId" = ? ORDER BY "id" ASC"#,
    )
    .bind(deck_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| WordPair::new(row.get::<String, _>("front"), row.get::<String, _>("back")))
        .collect())
}

// ==================== Stats ====================

pub async fn get_deck_stats(pool: &SqlitePool, deck_id: DeckId) -> Result<DeckStats, StoreError> {
    let row = sqlx::query(r#"SELECT * FROM "deck_stats" WHERE "deckId" = ?"#)
        .bind(deck_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::DeckNotFound(deck_id.to_string()))?;

    let last_studied = row
        .get::<Option<String>, _>("lastStudied")
        .and_then(|raw| match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(err) => {
                tracing::warn!(deck_id, raw = %raw, error = %err, "unparseable lastStudied");
                None
            }
        });

    let counter = |col: &str| row.get::<i64, _>(col).max(0) as u64;

    Ok(DeckStats {
        study_sessions: counter("studySessions"),
        total_attempts: counter("totalAttempts"),
        correct_answers: counter("correctAnswers"),
        incorrect_answers: counter("incorrectAnswers"),
        words_flipped: counter("wordsFlipped"),
        words_repeated: counter("wordsRepeated"),
        quiz_correct: counter("quizCorrect"),
        quiz_wrong: counter("quizWrong"),
        written_correct: counter("writtenCorrect"),
        written_wrong: counter("writtenWrong"),
        last_studied,
        time_spent: counter("timeSpent"),
    })
}

pub async fn reset_stats(pool: &SqlitePool, deck_id: DeckId) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE "deck_stats" SET
            "studySessions" = 0, "totalAttempts" = 0, "correctAnswers" = 0,
            "incorrectAnswers" = 0, "wordsFlipped" = 0, "wordsRepeated" = 0,
            "quizCorrect" = 0, "quizWrong" = 0, "writtenCorrect" = 0,
            "writtenWrong" = 0, "lastStudied" = NULL, "timeSpent" = 0
        WHERE "deckId" = ?
        "#,
    )
    .bind(deck_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::DeckNotFound(deck_id.to_string()));
    }
    Ok(())
}

fn answer_update_sql(mode: StudyMode, correct: bool) -> &'static str {
    match (mode, correct) {
        (StudyMode::Quiz, true) => {
            r#"UPDATE "deck_stats" SET "totalAttempts" = "totalAttempts" + 1, "correctAnswers" = "correctAnswers" + 1, "quizCorrect" = "quizCorrect" + 1 WHERE "deckId" = ?"#
        }
        (StudyMode::Quiz, false) => {
            r#"UPDATE "deck_stats" SET "totalAttempts" = "totalAttempts" + 1, "incorrectAnswers" = "incorrectAnswers" + 1, "quizWrong" = "quizWrong" + 1 WHERE "deckId" = ?"#
        }
        (StudyMode::Write, true) => {
            r#"UPDATE "deck_stats" SET "totalAttempts" = "totalAttempts" + 1, "correctAnswers" = "correctAnswers" + 1, "writtenCorrect" = "writtenCorrect" + 1 WHERE "deckId" = ?"#
        }
        (StudyMode::Write, false) => {
            r#"UPDATE "deck_stats" SET "totalAttempts" = "totalAttempts" + 1, "incorrectAnswers" = "incorrectAnswers" + 1, "writtenWrong" = "writtenWrong" + 1 WHERE "deckId" = ?"#
        }
        (StudyMode::Flip, true) => {
            r#"UPDATE "deck_stats" SET "totalAttempts" = "totalAttempts" + 1, "correctAnswers" = "correctAnswers" + 1 WHERE "deckId" = ?"#
        }
        (StudyMode::Flip, false) => {
            r#"UPDATE "deck_stats" SET "totalAttempts" = "totalAttempts" + 1, "incorrectAnswers" = "incorrectAnswers" + 1 WHERE "deckId" = ?"#
        }
    }
}

/// Applies one counter mutation as a single statement.
pub async fn apply_stat_update(
    pool: &SqlitePool,
    deck_id: DeckId,
    update: &StatUpdate,
) -> Result<(), StoreError> {
    let result = match update {
        StatUpdate::StudySessionStarted => {
            sqlx::query(
                r#"UPDATE "deck_stats" SET "studySessions" = "studySessions" + 1 WHERE "deckId" = ?"#,
            )
            .bind(deck_id)
            .execute(pool)
            .await?
        }
        StatUpdate::LastStudied(at) => {
            sqlx::query(r#"UPDATE "deck_stats" SET "lastStudied" = ? WHERE "deckId" = ?"#)
                .bind(at.to_rfc3339())
                .bind(deck_id)
                .execute(pool)
                .await?
        }
        StatUpdate::TimeSpent(secs) => {
            sqlx::query(
                r#"UPDATE "deck_stats" SET "timeSpent" = "timeSpent" + ? WHERE "deckId" = ?"#,
            )
            .bind(*secs as i64)
            .bind(deck_id)
            .execute(pool)
            .await?
        }
        StatUpdate::Answer { mode, correct } => {
            sqlx::query(answer_update_sql(*mode, *correct))
                .bind(deck_id)
                .execute(pool)
                .await?
        }
        StatUpdate::WordFlipped => {
            sqlx::query(
                r#"UPDATE "deck_stats" SET "wordsFlipped" = "wordsFlipped" + 1 WHERE "deckId" = ?"#,
            )
            .bind(deck_id)
            .execute(pool)
            .await?
        }
        StatUpdate::WordRepeated => {
            sqlx::query(
                r#"UPDATE "deck_stats" SET "wordsRepeated" = "wordsRepeated" + 1 WHERE "deckId" = ?"#,
            )
            .bind(deck_id)
            .execute(pool)
            .await?
        }
    };

    if result.rows_affected() == 0 {
        return Err(StoreError::DeckNotFound(deck_id.to_string()));
    }
    Ok(())
}
