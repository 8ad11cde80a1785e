use chrono::{DateTime, Utc};
use deckcycle_engine::{DeckId, PersistenceError, StatUpdate, StudyMode, WordPair, WordPairStore};
use sqlx::SqlitePool;

use crate::db::{self, StoreError};
use crate::workers::StatSender;

/// Synchronous store handed to one study session.
///
/// Pairs are read once when the session opens; stat writes are queued on the
/// background writer and never block the engine.
#[derive(Debug, Clone)]
pub struct SessionStore {
    deck_id: DeckId,
    pairs: Vec<WordPair>,
    sender: StatSender,
}

impl SessionStore {
    pub async fn open(
        pool: &SqlitePool,
        sender: StatSender,
        deck_id: DeckId,
    ) -> Result<Self, StoreError> {
        // Fails with DeckNotFound before any session state exists
        db::get_deck_stats(pool, deck_id).await?;
        let pairs = db::get_pairs(pool, deck_id).await?;
        tracing::debug!(deck_id, pairs = pairs.len(), "session store opened");
        Ok(Self {
            deck_id,
            pairs,
            sender,
        })
    }

    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    fn enqueue(&self, deck_id: DeckId, update: StatUpdate) -> Result<(), PersistenceError> {
        self.sender.send(deck_id, update)
    }
}

impl WordPairStore for SessionStore {
    fn get_pairs(&self, deck_id: DeckId) -> Result<Vec<WordPair>, PersistenceError> {
        if deck_id != self.deck_id {
            return Err(PersistenceError::DeckNotFound(deck_id));
        }
        Ok(self.pairs.clone())
    }

    fn increment_study_session(&self, deck_id: DeckId) -> Result<(), PersistenceError> {
        self.enqueue(deck_id, StatUpdate::StudySessionStarted)
    }

    fn update_last_studied(
        &self,
        deck_id: DeckId,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        self.enqueue(deck_id, StatUpdate::LastStudied(at))
    }

    fn update_time_spent(&self, deck_id: DeckId, delta_secs: u64) -> Result<(), PersistenceError> {
        self.enqueue(deck_id, StatUpdate::TimeSpent(delta_secs))
    }

    fn record_answer(
        &self,
        deck_id: DeckId,
        mode: StudyMode,
        correct: bool,
    ) -> Result<(), PersistenceError> {
        self.enqueue(deck_id, StatUpdate::Answer { mode, correct })
    }

    fn increment_words_flipped(&self, deck_id: DeckId) -> Result<(), PersistenceError> {
        self.enqueue(deck_id, StatUpdate::WordFlipped)
    }

    fn increment_words_repeated(&self, deck_id: DeckId) -> Result<(), PersistenceError> {
        self.enqueue(deck_id, StatUpdate::WordRepeated)
    }

    fn apply(&self, deck_id: DeckId, update: &StatUpdate) -> Result<(), PersistenceError> {
        self.enqueue(deck_id, update.clone())
    }
}
