//! # deckcycle-engine - study session engines for vocabulary decks
//!
//! One engine instance drives one study session over a deck's word pairs:
//!
//! - **Flip** - self-paced recall; pairs marked for repetition are drawn more often
//! - **Quiz** - multiple choice; every pair is asked once, misses are reported at the end
//! - **Write** - typed answers; a pair leaves the session only once typed correctly
//!
//! All three push their counters through a [`StatsAccumulator`] into a
//! [`WordPairStore`]. Engines are synchronous: each command runs to completion
//! and returns the [`SessionEvent`]s the caller should act on.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use deckcycle_engine::{InMemoryStore, QuizSession, SessionConfig, SessionEvent};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let deck = store.add_deck("numbers", [("uno", "one"), ("dos", "two")]);
//!
//! let mut quiz = QuizSession::open(store.clone(), deck, SessionConfig::with_seed(7)).unwrap();
//! let events = quiz.start();
//! assert!(events.iter().any(|e| matches!(e, SessionEvent::Display { .. })));
//!
//! let answer = quiz.current_pair().unwrap().back.clone();
//! quiz.select_option(&answer);
//! assert_eq!(store.stats(deck).unwrap().quiz_correct, 1);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod flip;
pub mod quiz;
pub mod sampling;
pub mod stats;
pub mod store;
pub mod types;
pub mod write;

// ============================================================================
// Re-exports
// ============================================================================

pub use clock::SessionClock;
pub use config::SessionConfig;
pub use error::{PersistenceError, SessionError};
pub use events::{EngineState, SessionEvent, StatUpdate};
pub use flip::FlipSession;
pub use quiz::QuizSession;
pub use sampling::FrequencyMap;
pub use stats::StatsAccumulator;
pub use store::{InMemoryStore, WordPairStore};
pub use types::*;
pub use write::{answers_match, WriteSession};
