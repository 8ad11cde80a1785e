//! Write mode: typed-answer recall, retried until mastered
//!
//! A pair leaves the session only when its back value is typed correctly;
//! wrong answers and skips leave it in the pool so it can come up again.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{PersistenceError, SessionError};
use crate::events::{EngineState, SessionEvent};
use crate::sampling::session_rng;
use crate::stats::StatsAccumulator;
use crate::store::WordPairStore;
use crate::types::{Deck, DeckId, PairId, StudyMode, WordPair};

pub const NO_WORDS_MESSAGE: &str = "No words found in this deck!";
pub const COMPLETED_MESSAGE: &str = "Mode Completed!";

/// Trimmed, case-insensitive comparison of a typed answer
pub fn answers_match(typed: &str, expected: &str) -> bool {
    typed.trim().to_lowercase() == expected.trim().to_lowercase()
}

pub struct WriteSession {
    deck: Deck,
    /// Shrinks only on correct answers
    remaining: Vec<PairId>,
    /// Index into `remaining`; cleared once the shown word is retired
    current: Option<usize>,
    state: EngineState,
    correct: u32,
    incorrect: u32,
    stats: StatsAccumulator,
    rng: ChaCha8Rng,
    config: SessionConfig,
}

impl WriteSession {
    pub fn new(deck: Deck, stats: StatsAccumulator, config: SessionConfig) -> Self {
        let config = config.normalized();
        Self {
            remaining: deck.ids().collect(),
            deck,
            current: None,
            state: EngineState::Idle,
            correct: 0,
            incorrect: 0,
            stats,
            rng: session_rng(config.seed),
            config,
        }
    }

    pub fn open(
        store: Arc<dyn WordPairStore>,
        deck_id: DeckId,
        config: SessionConfig,
    ) -> Result<Self, PersistenceError> {
        let deck = Deck::load(store.as_ref(), deck_id)?;
        Ok(Self::new(deck, StatsAccumulator::new(deck_id, store), config))
    }

    pub fn start(&mut self) -> Vec<SessionEvent> {
        self.stats.begin_session(Utc::now());

        if self.remaining.is_empty() {
            info!(deck_id = self.deck.id, "write session started on empty deck");
            self.state = EngineState::Finished;
            return vec![SessionEvent::message(NO_WORDS_MESSAGE)];
        }

        info!(deck_id = self.deck.id, pairs = self.deck.len(), "write session started");
        self.show_random()
    }

    /// Judges a typed answer against the current word.
    ///
    /// Blank answers are rejected without consuming a turn.
    pub fn submit_answer(&mut self, text: &str) -> Vec<SessionEvent> {
        let index = match self.check_submittable(text) {
            Ok(index) => index,
            Err(err) => {
                debug!(deck_id = self.deck.id, error = %err, "answer ignored");
                return Vec::new();
            }
        };

        let pair_id = self.remaining[index];
        let expected = self.deck.pair(pair_id).back.clone();
        let correct = answers_match(text, &expected);
        let mut events = vec![SessionEvent::Result {
            correct,
            chosen: Some(text.trim().to_string()),
            expected,
        }];

        self.stats.record_answer(StudyMode::Write, correct);
        if correct {
            self.correct += 1;
            self.remaining.remove(index);
            self.current = None;

            if self.remaining.is_empty() {
                info!(deck_id = self.deck.id, correct = self.correct, incorrect = self.incorrect, "write session completed");
                events.push(SessionEvent::message(COMPLETED_MESSAGE));
                events.push(SessionEvent::SessionComplete {
                    correct: self.correct,
                    incorrect: self.incorrect,
                    missed: Vec::new(),
                });
                events.push(SessionEvent::NavigateHome);
                self.state = EngineState::Finished;
            } else {
                events.push(SessionEvent::ScheduleAdvance {
                    after_ms: self.config.write_advance_delay_ms,
                });
            }
        } else {
            self.incorrect += 1;
        }

        self.stats.tick();
        events
    }

    /// Shows a new random word, or sends the caller home when none remain
    pub fn advance(&mut self) -> Vec<SessionEvent> {
        if self.remaining.is_empty() {
            return vec![SessionEvent::NavigateHome];
        }
        self.show_random()
    }

    /// Moves on without judging the current word
    pub fn skip(&mut self) -> Vec<SessionEvent> {
        if self.remaining.is_empty() {
            return Vec::new();
        }
        self.show_random()
    }

    pub fn elapsed_time_tick(&mut self) {
        self.stats.tick();
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == EngineState::Drawing
    }

    pub fn current_pair(&self) -> Option<&WordPair> {
        self.current_id().map(|id| self.deck.pair(id))
    }

    pub fn current_id(&self) -> Option<PairId> {
        self.current.map(|index| self.remaining[index])
    }

    pub fn remaining(&self) -> &[PairId] {
        &self.remaining
    }

    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    pub fn incorrect_count(&self) -> u32 {
        self.incorrect
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }

    fn check_submittable(&self, text: &str) -> Result<usize, SessionError> {
        if self.remaining.is_empty() {
            return Err(SessionError::InvalidState("no words remaining"));
        }
        if text.trim().is_empty() {
            return Err(SessionError::InvalidState("blank answer"));
        }
        self.current
            .ok_or(SessionError::InvalidState("no word on display"))
    }

    fn show_random(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.set_state(EngineState::Drawing, &mut events);

        let index = self.rng.gen_range(0..self.remaining.len());
        self.current = Some(index);
        let front = self.deck.pair(self.remaining[index]).front.clone();
        events.push(SessionEvent::display(front));

        self.set_state(EngineState::Idle, &mut events);
        events
    }

    fn set_state(&mut self, state: EngineState, events: &mut Vec<SessionEvent>) {
        if self.state != state {
            self.state = state;
            events.push(SessionEvent::StateChanged { state });
        }
    }
}

// ==================== Unit Tests ====================
