//! Quiz mode: multiple choice with a shrinking candidate pool
//!
//! Each pair is asked at most once. A correct answer retires the pair from the
//! pool; a wrong answer lands it in the missed list, and it stays in the pool
//! only as a source of distractors. A quiz over K pairs therefore ends after
//! exactly K questions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::PersistenceError;
use crate::events::{EngineState, SessionEvent};
use crate::sampling::{distinct_sample, session_rng};
use crate::stats::StatsAccumulator;
use crate::store::WordPairStore;
use crate::types::{Deck, DeckId, PairId, StudyMode, WordPair};

#[derive(Debug, Clone)]
struct Question {
    pair: PairId,
    options: Vec<String>,
    answered: bool,
}

pub struct QuizSession {
    deck: Deck,
    /// Shrinks only on correct answers
    available: Vec<PairId>,
    /// Grows by one per question
    used: HashSet<PairId>,
    current: Option<Question>,
    correct: u32,
    incorrect: u32,
    missed: Vec<PairId>,
    state: EngineState,
    stats: StatsAccumulator,
    rng: ChaCha8Rng,
    config: SessionConfig,
}

impl QuizSession {
    pub fn new(deck: Deck, stats: StatsAccumulator, config: SessionConfig) -> Self {
        let config = config.normalized();
        Self {
            available: deck.ids().collect(),
            deck,
            used: HashSet::new(),
            current: None,
            correct: 0,
            incorrect: 0,
            missed: Vec::new(),
            state: EngineState::Idle,
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
        info!(deck_id = self.deck.id, pairs = self.deck.len(), "quiz session started");
        self.load_next()
    }

    /// Presents the next unasked pair, or completes the quiz
    pub fn load_next(&mut self) -> Vec<SessionEvent> {
        if self.state == EngineState::Finished {
            debug!(deck_id = self.deck.id, "quiz already finished");
            return Vec::new();
        }

        let mut events = Vec::new();
        self.set_state(EngineState::Drawing, &mut events);

        match self.draw() {
            Some(pair_id) => {
                self.used.insert(pair_id);
                let options = self.build_options(pair_id);
                events.push(SessionEvent::Display {
                    prompt: self.deck.pair(pair_id).front.clone(),
                    options: options.clone(),
                });
                self.current = Some(Question {
                    pair: pair_id,
                    options,
                    answered: false,
                });
                self.set_state(EngineState::Idle, &mut events);
            }
            None => {
                self.current = None;
                info!(
                    deck_id = self.deck.id,
                    correct = self.correct,
                    incorrect = self.incorrect,
                    "quiz finished"
                );
                events.push(SessionEvent::SessionComplete {
                    correct: self.correct,
                    incorrect: self.incorrect,
                    missed: self.missed_pairs(),
                });
                self.set_state(EngineState::Finished, &mut events);
            }
        }

        events
    }

    /// Judges the chosen option against the current pair's back text.
    ///
    /// Only the first selection per question counts; anything that is not one
    /// of the displayed options is ignored.
    pub fn select_option(&mut self, option: &str) -> Vec<SessionEvent> {
        let pair_id = match self.current.as_mut() {
            Some(question) if !question.answered => {
                if !question.options.iter().any(|o| o == option) {
                    debug!(deck_id = self.deck.id, option, "selection is not a displayed option");
                    return Vec::new();
                }
                question.answered = true;
                question.pair
            }
            _ => {
                debug!(deck_id = self.deck.id, "selection ignored: no open question");
                return Vec::new();
            }
        };

        let expected = self.deck.pair(pair_id).back.clone();
        let correct = option == expected;

        if correct {
            self.correct += 1;
            self.available.retain(|id| *id != pair_id);
        } else {
            self.incorrect += 1;
            self.missed.push(pair_id);
        }
        self.stats.record_answer(StudyMode::Quiz, correct);
        self.stats.tick();

        vec![
            SessionEvent::Result {
                correct,
                chosen: Some(option.to_string()),
                expected,
            },
            SessionEvent::ScheduleAdvance {
                after_ms: self.config.quiz_reveal_delay_ms,
            },
        ]
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

    pub fn is_finished(&self) -> bool {
        self.state == EngineState::Finished
    }

    pub fn current_pair(&self) -> Option<&WordPair> {
        self.current.as_ref().map(|q| self.deck.pair(q.pair))
    }

    pub fn current_id(&self) -> Option<PairId> {
        self.current.as_ref().map(|q| q.pair)
    }

    pub fn current_options(&self) -> &[String] {
        self.current.as_ref().map(|q| q.options.as_slice()).unwrap_or(&[])
    }

    /// Pairs still in the pool (unanswered or answered wrong)
    pub fn available(&self) -> &[PairId] {
        &self.available
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    pub fn incorrect_count(&self) -> u32 {
        self.incorrect
    }

    pub fn missed_pairs(&self) -> Vec<WordPair> {
        self.missed.iter().map(|id| self.deck.pair(*id).clone()).collect()
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }

    /// A random pair not yet asked, `None` once every pair has had its turn
    fn draw(&mut self) -> Option<PairId> {
        let unused: Vec<PairId> = self
            .available
            .iter()
            .copied()
            .filter(|id| !self.used.contains(id))
            .collect();
        unused.choose(&mut self.rng).copied()
    }

    /// Correct answer plus distinct distractors, shuffled.
    ///
    /// Distractors come from the live pool first; when it is too small they
    /// are topped up from the whole deck, retired pairs included.
    fn build_options(&mut self, pair_id: PairId) -> Vec<String> {
        let answer = self.deck.pair(pair_id).back.clone();
        let wanted = self.config.quiz_option_count.saturating_sub(1);

        let mut taken: HashSet<String> = HashSet::new();
        taken.insert(answer.clone());

        let pool_backs: Vec<String> = self
            .available
            .iter()
            .map(|id| self.deck.pair(*id).back.clone())
            .collect();
        let mut options = distinct_sample(pool_backs, &taken, wanted, &mut self.rng);

        if options.len() < wanted {
            taken.extend(options.iter().cloned());
            let deck_backs: Vec<String> =
                self.deck.pairs().iter().map(|p| p.back.clone()).collect();
            let padding =
                distinct_sample(deck_backs, &taken, wanted - options.len(), &mut self.rng);
            options.extend(padding);
        }

        options.push(answer);
        options.shuffle(&mut self.rng);
        options
    }

    fn set_state(&mut self, state: EngineState, events: &mut Vec<SessionEvent>) {
        if self.state != state {
            self.state = state;
            events.push(SessionEvent::StateChanged { state });
        }
    }
}

// ==================== Unit Tests ====================
