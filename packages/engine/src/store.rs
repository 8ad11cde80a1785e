//! Persistence contract consumed by the session engines
//!
//! The engines only ever read a deck's pairs once and push counter updates;
//! deck editing lives elsewhere. Every write is a single additive update so a
//! partially applied session never leaves a counter half-written.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::PersistenceError;
use crate::events::StatUpdate;
use crate::types::{DeckId, DeckStats, StudyMode, WordPair};

pub trait WordPairStore: Send + Sync {
    fn get_pairs(&self, deck_id: DeckId) -> Result<Vec<WordPair>, PersistenceError>;

    fn increment_study_session(&self, deck_id: DeckId) -> Result<(), PersistenceError>;

    fn update_last_studied(
        &self,
        deck_id: DeckId,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    /// Adds `delta_secs` to the stored total
    fn update_time_spent(&self, deck_id: DeckId, delta_secs: u64) -> Result<(), PersistenceError>;

    /// Increments attempts, the outcome counter and the mode counter together
    fn record_answer(
        &self,
        deck_id: DeckId,
        mode: StudyMode,
        correct: bool,
    ) -> Result<(), PersistenceError>;

    fn increment_words_flipped(&self, deck_id: DeckId) -> Result<(), PersistenceError>;

    fn increment_words_repeated(&self, deck_id: DeckId) -> Result<(), PersistenceError>;

    fn apply(&self, deck_id: DeckId, update: &StatUpdate) -> Result<(), PersistenceError> {
        match update {
            StatUpdate::StudySessionStarted => self.increment_study_session(deck_id),
            StatUpdate::LastStudied(at) => self.update_last_studied(deck_id, *at),
            StatUpdate::TimeSpent(secs) => self.update_time_spent(deck_id, *secs),
            StatUpdate::Answer { mode, correct } => self.record_answer(deck_id, *mode, *correct),
            StatUpdate::WordFlipped => self.increment_words_flipped(deck_id),
            StatUpdate::WordRepeated => self.increment_words_repeated(deck_id),
        }
    }
}

#[derive(Debug, Default)]
struct DeckRecord {
    name: String,
    pairs: Vec<WordPair>,
    stats: DeckStats,
}

/// Process-local store, used by tests and as a scratch backend
#[derive(Debug, Default)]
pub struct InMemoryStore {
    decks: Mutex<HashMap<DeckId, DeckRecord>>,
    next_id: Mutex<DeckId>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_deck<I, P>(&self, name: &str, pairs: I) -> DeckId
    where
        I: IntoIterator<Item = P>,
        P: Into<WordPair>,
    {
        let id = {
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            *next_id
        };
        self.decks.lock().insert(
            id,
            DeckRecord {
                name: name.to_string(),
                pairs: pairs.into_iter().map(Into::into).collect(),
                stats: DeckStats::default(),
            },
        );
        id
    }

    pub fn deck_name(&self, deck_id: DeckId) -> Option<String> {
        self.decks.lock().get(&deck_id).map(|d| d.name.clone())
    }

    pub fn stats(&self, deck_id: DeckId) -> Option<DeckStats> {
        self.decks.lock().get(&deck_id).map(|d| d.stats.clone())
    }

    pub fn reset_stats(&self, deck_id: DeckId) -> Result<(), PersistenceError> {
        self.with_stats(deck_id, |stats| *stats = DeckStats::default())
    }

    fn with_stats(
        &self,
        deck_id: DeckId,
        f: impl FnOnce(&mut DeckStats),
    ) -> Result<(), PersistenceError> {
        let mut decks = self.decks.lock();
        let record = decks
            .get_mut(&deck_id)
            .ok_or(PersistenceError::DeckNotFound(deck_id))?;
        f(&mut record.stats);
        Ok(())
    }
}

impl WordPairStore for InMemoryStore {
    fn get_pairs(&self, deck_id: DeckId) -> Result<Vec<WordPair>, PersistenceError> {
        self.decks
            .lock()
            .get(&deck_id)
            .map(|d| d.pairs.clone())
            .ok_or(PersistenceError::DeckNotFound(deck_id))
    }

    fn increment_study_session(&self, deck_id: DeckId) -> Result<(), PersistenceError> {
        self.with_stats(deck_id, |s| s.study_sessions += 1)
    }

    fn update_last_studied(
        &self,
        deck_id: DeckId,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        self.with_stats(deck_id, |s| s.last_studied = Some(at))
    }

    fn update_time_spent(&self, deck_id: DeckId, delta_secs: u64) -> Result<(), PersistenceError> {
        self.with_stats(deck_id, |s| s.time_spent += delta_secs)
    }

    fn record_answer(
        &self,
        deck_id: DeckId,
        mode: StudyMode,
        correct: bool,
    ) -> Result<(), PersistenceError> {
        self.with_stats(deck_id, |s| s.apply_answer(mode, correct))
    }

    fn increment_words_flipped(&self, deck_id: DeckId) -> Result<(), PersistenceError> {
        self.with_stats(deck_id, |s| s.words_flipped += 1)
    }

    fn increment_words_repeated(&self, deck_id: DeckId) -> Result<(), PersistenceError> {
        self.with_stats(deck_id, |s| s.words_repeated += 1)
    }
}
