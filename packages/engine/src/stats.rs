//! Session statistics accumulator
//!
//! Every engine routes its counter changes through one accumulator so the
//! per-session contract holds in a single place:
//! - one study-session increment and one last-studied stamp per start
//! - every judged answer moves exactly one outcome counter and one mode counter
//! - elapsed time is written as additive deltas
//!
//! Writes are queued and flushed in order. A write the store rejects stays at
//! the head of the queue and is retried on the next flush, so later counters
//! never overtake it and nothing is dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::clock::SessionClock;
use crate::events::StatUpdate;
use crate::store::WordPairStore;
use crate::types::{DeckId, DeckStats, StudyMode};

pub struct StatsAccumulator {
    deck_id: DeckId,
    store: Arc<dyn WordPairStore>,
    session: DeckStats,
    clock: SessionClock,
    pending: VecDeque<StatUpdate>,
}

impl StatsAccumulator {
    pub fn new(deck_id: DeckId, store: Arc<dyn WordPairStore>) -> Self {
        Self::with_clock(deck_id, store, SessionClock::start())
    }

    pub fn with_clock(deck_id: DeckId, store: Arc<dyn WordPairStore>, clock: SessionClock) -> Self {
        Self {
            deck_id,
            store,
            session: DeckStats::default(),
            clock,
            pending: VecDeque::new(),
        }
    }

    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    pub fn store(&self) -> &Arc<dyn WordPairStore> {
        &self.store
    }

    /// Counters accumulated by this session only
    pub fn session_stats(&self) -> &DeckStats {
        &self.session
    }

    /// Updates the store has not accepted yet
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Records one session start: a session increment plus a last-studied stamp
    pub fn begin_session(&mut self, now: DateTime<Utc>) {
        self.session.study_sessions += 1;
        self.session.last_studied = Some(now);
        self.push(StatUpdate::StudySessionStarted);
        self.push(StatUpdate::LastStudied(now));
    }

    pub fn record_answer(&mut self, mode: StudyMode, correct: bool) {
        self.session.apply_answer(mode, correct);
        self.push(StatUpdate::Answer { mode, correct });
    }

    pub fn word_flipped(&mut self) {
        self.session.words_flipped += 1;
        self.push(StatUpdate::WordFlipped);
    }

    pub fn word_repeated(&mut self) {
        self.session.words_repeated += 1;
        self.push(StatUpdate::WordRepeated);
    }

    /// Adds a time delta; zero deltas are not written
    pub fn time_spent(&mut self, delta_secs: u64) {
        if delta_secs == 0 {
            return;
        }
        self.session.time_spent += delta_secs;
        self.push(StatUpdate::TimeSpent(delta_secs));
    }

    /// Flushes whatever the session clock accrued since the last tick
    pub fn tick(&mut self) {
        let delta = self.clock.tick();
        self.time_spent(delta);
    }

    /// Tries to hand every queued update to the store, in order.
    ///
    /// Returns the number of updates applied. Stops at the first failure.
    pub fn flush(&mut self) -> usize {
        let mut applied = 0;
        while let Some(update) = self.pending.front() {
            match self.store.apply(self.deck_id, update) {
                Ok(()) => {
                    self.pending.pop_front();
                    applied += 1;
                }
                Err(err) => {
                    warn!(
                        deck_id = self.deck_id,
                        update = update.event_type(),
                        pending = self.pending.len(),
                        error = %err,
                        "stat write failed, keeping it queued"
                    );
                    break;
                }
            }
        }
        applied
    }

    fn push(&mut self, update: StatUpdate) {
        self.pending.push_back(update);
        self.flush();
    }
}

impl Drop for StatsAccumulator {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            self.flush();
        }
        if !self.pending.is_empty() {
            warn!(
                deck_id = self.deck_id,
                lost = self.pending.len(),
                "session closed with unwritten stat updates"
            );
        }
    }
}
