use thiserror::Error;

use crate::types::DeckId;

/// Failures inside a study session.
///
/// None of these are fatal: engines degrade `EmptyDeck` to a sentinel message
/// and treat `InvalidState` as a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("deck has no words")]
    EmptyDeck,

    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

/// A stat write or pair load that the store could not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("deck not found: {0}")]
    DeckNotFound(DeckId),
}
