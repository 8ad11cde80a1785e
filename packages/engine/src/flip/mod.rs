//! Flip mode: self-paced recall with adaptive repetition
//!
//! One side of a pair is shown at a time. The user flips to see the other
//! side, asks for a fresh pair, or marks the current pair for repetition,
//! which raises its weight in the draw.
//!
//! Draw rule:
//!   P(pair) = weight(pair) / Σ weight
//! with every weight starting at 1 and never leaving [1, max_weight].

use std::sync::Arc;

use chrono::Utc;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{PersistenceError, SessionError};
use crate::events::{EngineState, SessionEvent};
use crate::sampling::{session_rng, FrequencyMap};
use crate::stats::StatsAccumulator;
use crate::store::WordPairStore;
use crate::types::{Deck, DeckId, PairId, WordPair};

pub const NO_WORDS_MESSAGE: &str = "No words available";

pub struct FlipSession {
    deck: Deck,
    frequency: FrequencyMap,
    current: Option<PairId>,
    showing_front: bool,
    state: EngineState,
    stats: StatsAccumulator,
    rng: ChaCha8Rng,
    config: SessionConfig,
}

impl FlipSession {
    pub fn new(deck: Deck, stats: StatsAccumulator, config: SessionConfig) -> Self {
        let config = config.normalized();
        Self {
            frequency: FrequencyMap::new(deck.len()),
            deck,
            current: None,
            showing_front: true,
            state: EngineState::Idle,
            stats,
            rng: session_rng(config.seed),
            config,
        }
    }

    /// Loads the deck through the store and wires an accumulator to it
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
        self.frequency = FrequencyMap::new(self.deck.len());
        self.current = None;
        self.showing_front = true;

        if self.deck.is_empty() {
            info!(deck_id = self.deck.id, "flip session started on empty deck");
            self.state = EngineState::Finished;
            return vec![SessionEvent::message(NO_WORDS_MESSAGE)];
        }

        info!(deck_id = self.deck.id, pairs = self.deck.len(), "flip session started");
        self.state = EngineState::Idle;
        Vec::new()
    }

    /// Draws a pair by weight and shows its front.
    ///
    /// Emits `Drawing` before the draw and `Idle` after it, whatever the
    /// outcome, so the caller can gate its controls on the transition.
    pub fn next(&mut self) -> Vec<SessionEvent> {
        if self.state == EngineState::Finished {
            return vec![SessionEvent::message(NO_WORDS_MESSAGE)];
        }

        let mut events = Vec::new();
        self.set_state(EngineState::Drawing, &mut events);

        match self.draw() {
            Ok(pair_id) => {
                self.current = Some(pair_id);
                self.showing_front = true;
                events.push(self.display_current());
            }
            Err(err) => {
                debug!(deck_id = self.deck.id, error = %err, "flip draw skipped");
            }
        }

        self.set_state(EngineState::Idle, &mut events);
        events
    }

    /// Raises the current pair's weight by the configured boost
    pub fn repeat(&mut self) -> Vec<SessionEvent> {
        let Some(pair_id) = self.current else {
            debug!(deck_id = self.deck.id, "repeat ignored: no current pair");
            return Vec::new();
        };

        let weight = self.frequency.boost(
            pair_id.index(),
            self.config.repeat_boost,
            self.config.max_weight,
        );
        debug!(deck_id = self.deck.id, pair = pair_id.index(), weight, "pair marked for repetition");
        self.stats.word_repeated();
        Vec::new()
    }

    /// Shows the other side of the current pair
    pub fn flip(&mut self) -> Vec<SessionEvent> {
        if self.current.is_none() {
            debug!(deck_id = self.deck.id, "flip ignored: no current pair");
            return Vec::new();
        }

        self.showing_front = !self.showing_front;
        self.stats.word_flipped();
        vec![self.display_current()]
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
        self.current.map(|id| self.deck.pair(id))
    }

    pub fn current_id(&self) -> Option<PairId> {
        self.current
    }

    pub fn showing_front(&self) -> bool {
        self.showing_front
    }

    pub fn weight(&self, pair_id: PairId) -> u32 {
        self.frequency.weight(pair_id.index())
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }

    fn draw(&mut self) -> Result<PairId, SessionError> {
        if self.deck.is_empty() {
            return Err(SessionError::EmptyDeck);
        }
        self.frequency
            .sample(&mut self.rng)
            .map(PairId)
            .ok_or(SessionError::InvalidState("empty frequency map"))
    }

    fn display_current(&mut self) -> SessionEvent {
        self.stats.tick();
        match self.current_pair() {
            Some(pair) => {
                let side = if self.showing_front { &pair.front } else { &pair.back };
                SessionEvent::display(side.clone())
            }
            None => SessionEvent::message(NO_WORDS_MESSAGE),
        }
    }

    fn set_state(&mut self, state: EngineState, events: &mut Vec<SessionEvent>) {
        if self.state != state {
            self.state = state;
            events.push(SessionEvent::StateChanged { state });
        }
    }
}

// ==================== Unit Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn open_session(pairs: &[(&str, &str)], seed: u64) -> (Arc<InMemoryStore>, DeckId, FlipSession) {
        let store = Arc::new(InMemoryStore::new());
        let deck_id = store.add_deck("flip", pairs.iter().copied());
        let session =
            FlipSession::open(store.clone(), deck_id, SessionConfig::with_seed(seed)).unwrap();
        (store, deck_id, session)
    }

    #[test]
    fn test_start_records_session_once() {
        let (store, deck_id, mut session) = open_session(&[("uno", "one")], 1);
        assert!(session.start().is_empty());

        let stats = store.stats(deck_id).unwrap();
        assert_eq!(stats.study_sessions, 1);
        assert!(stats.last_studied.is_some());
    }

    #[test]
    fn test_empty_deck_is_sentinel() {
        let (store, deck_id, mut session) = open_session(&[], 1);

        let events = session.start();
        assert_eq!(events, vec![SessionEvent::message(NO_WORDS_MESSAGE)]);
        assert_eq!(session.state(), EngineState::Finished);

        assert_eq!(session.next(), vec![SessionEvent::message(NO_WORDS_MESSAGE)]);
        assert!(session.flip().is_empty());
        assert!(session.repeat().is_empty());

        let stats = store.stats(deck_id).unwrap();
        assert_eq!(stats.words_flipped, 0);
        assert_eq!(stats.words_repeated, 0);
    }

    #[test]
    fn test_next_brackets_draw_with_busy_state() {
        let (_, _, mut session) = open_session(&[("uno", "one"), ("dos", "two")], 3);
        session.start();

        let events = session.next();
        assert_eq!(
            events.first(),
            Some(&SessionEvent::StateChanged {
                state: EngineState::Drawing
            })
        );
        assert_eq!(
            events.last(),
            Some(&SessionEvent::StateChanged {
                state: EngineState::Idle
            })
        );
        assert!(matches!(events[1], SessionEvent::Display { .. }));
        assert!(!session.is_busy());
        assert!(session.showing_front());
    }

    #[test]
    fn test_single_pair_always_redrawn() {
        let (_, _, mut session) = open_session(&[("solo", "alone")], 5);
        session.start();
        for _ in 0..20 {
            session.next();
            assert_eq!(session.current_pair().unwrap().front, "solo");
        }
    }

    #[test]
    fn test_repeat_and_flip_require_current_pair() {
        let (store, deck_id, mut session) = open_session(&[("uno", "one")], 9);
        session.start();

        assert!(session.repeat().is_empty());
        assert!(session.flip().is_empty());
        let stats = store.stats(deck_id).unwrap();
        assert_eq!(stats.words_repeated, 0);
        assert_eq!(stats.words_flipped, 0);
    }

    #[test]
    fn test_flip_toggles_side() {
        let (store, deck_id, mut session) = open_session(&[("uno", "one")], 11);
        session.start();
        session.next();

        assert_eq!(session.flip(), vec![SessionEvent::display("one")]);
        assert!(!session.showing_front());
        assert_eq!(session.flip(), vec![SessionEvent::display("uno")]);
        assert_eq!(store.stats(deck_id).unwrap().words_flipped, 2);
    }

    #[test]
    fn test_repeat_boost_is_capped() {
        let (store, deck_id, mut session) = open_session(&[("uno", "one"), ("dos", "two")], 13);
        session.start();
        session.next();
        let current = session.current_id().unwrap();

        session.repeat();
        assert_eq!(session.weight(current), 5);
        session.repeat();
        assert_eq!(session.weight(current), 5);
        assert_eq!(store.stats(deck_id).unwrap().words_repeated, 2);
    }

    #[test]
    fn test_next_only_draws_deck_pairs() {
        let pairs = [("uno", "one"), ("dos", "two"), ("tres", "three")];
        let (_, _, mut session) = open_session(&pairs, 17);
        session.start();
        for _ in 0..100 {
            session.next();
            let pair = session.current_pair().unwrap();
            assert!(pairs.iter().any(|(f, b)| pair.front == *f && pair.back == *b));
        }
    }

    #[test]
    fn test_duplicate_fronts_keep_separate_weights() {
        let (_, _, mut session) = open_session(&[("banco", "bank"), ("banco", "bench")], 19);
        session.start();
        while session.current_id() != Some(PairId(1)) {
            session.next();
        }
        session.repeat();
        assert_eq!(session.weight(PairId(1)), 5);
        assert_eq!(session.weight(PairId(0)), 1);
    }

    #[test]
    fn test_every_start_counts_a_session() {
        let (store, deck_id, mut session) = open_session(&[("uno", "one"), ("dos", "two")], 4);
        session.start();
        session.next();
        session.start();

        assert_eq!(store.stats(deck_id).unwrap().study_sessions, 2);
        assert_eq!(session.current_id(), None);
    }

    #[test]
    fn test_repeated_pair_drawn_in_proportion_to_weight() {
        let pairs = [
            ("uno", "one"),
            ("dos", "two"),
            ("tres", "three"),
            ("cuatro", "four"),
            ("cinco", "five"),
        ];
        let (_, _, mut session) = open_session(&pairs, 77);
        session.start();
        while session.current_id() != Some(PairId(2)) {
            session.next();
        }
        session.repeat();
        assert_eq!(session.weight(PairId(2)), 5);

        let draws = 20_000;
        let mut hits = 0;
        for _ in 0..draws {
            session.next();
            if session.current_id() == Some(PairId(2)) {
                hits += 1;
            }
        }
        // Weight 5 out of a total of 9
        let share = hits as f64 / draws as f64;
        assert!((share - 5.0 / 9.0).abs() < 0.02, "repeated pair share {}", share);
    }
}
