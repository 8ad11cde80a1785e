use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::store::WordPairStore;

/// Opaque deck identifier (row id in the backing store)
pub type DeckId = i64;

/// Stable identity of a pair inside a loaded deck.
///
/// Session state (weights, used sets, candidate pools) is keyed by this id and
/// never by front text, so two pairs sharing a front stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairId(pub usize);

impl PairId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A (front, back) vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordPair {
    pub front: String,
    pub back: String,
}

impl WordPair {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

impl From<(&str, &str)> for WordPair {
    fn from((front, back): (&str, &str)) -> Self {
        Self::new(front, back)
    }
}

/// Ordered, read-only collection of pairs loaded once at session start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pairs: Vec<WordPair>,
}

impl Deck {
    pub fn new(id: DeckId, pairs: Vec<WordPair>) -> Self {
        Self { id, pairs }
    }

    /// Load a deck's pairs through the store
    pub fn load(store: &dyn WordPairStore, id: DeckId) -> Result<Self, PersistenceError> {
        let pairs = store.get_pairs(id)?;
        Ok(Self::new(id, pairs))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[WordPair] {
        &self.pairs
    }

    pub fn pair(&self, id: PairId) -> &WordPair {
        &self.pairs[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = PairId> {
        (0..self.pairs.len()).map(PairId)
    }
}

/// Study mode a judged answer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    Flip,
    Quiz,
    Write,
}

impl StudyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyMode::Flip => "flip",
            StudyMode::Quiz => "quiz",
            StudyMode::Write => "write",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flip" => Ok(StudyMode::Flip),
            "quiz" => Ok(StudyMode::Quiz),
            "write" => Ok(StudyMode::Write),
            other => Err(format!("unknown study mode: {other}")),
        }
    }
}

/// Per-deck statistics counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    pub study_sessions: u64,
    pub total_attempts: u64,
    pub correct_answers: u64,
    pub incorrect_answers: u64,
    pub words_flipped: u64,
    pub words_repeated: u64,
    pub quiz_correct: u64,
    pub quiz_wrong: u64,
    pub written_correct: u64,
    pub written_wrong: u64,
    pub last_studied: Option<DateTime<Utc>>,
    /// Cumulative seconds
    pub time_spent: u64,
}

impl DeckStats {
    /// Fraction of correct attempts, `None` when nothing was attempted
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_attempts == 0 {
            None
        } else {
            Some(self.correct_answers as f64 / self.total_attempts as f64)
        }
    }

    pub fn accuracy_label(&self) -> String {
        format_accuracy(self.correct_answers, self.total_attempts)
    }

    /// Apply one answer to the counters the way the store does it
    pub fn apply_answer(&mut self, mode: StudyMode, correct: bool) {
        self.total_attempts += 1;
        if correct {
            self.correct_answers += 1;
        } else {
            self.incorrect_answers += 1;
        }
        match (mode, correct) {
            (StudyMode::Quiz, true) => self.quiz_correct += 1,
            (StudyMode::Quiz, false) => self.quiz_wrong += 1,
            (StudyMode::Write, true) => self.written_correct += 1,
            (StudyMode::Write, false) => self.written_wrong += 1,
            (StudyMode::Flip, _) => {}
        }
    }

    /// Labelled rows for the statistics screen
    pub fn summary_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Study Sessions", self.study_sessions.to_string()),
            ("Total Attempts", self.total_attempts.to_string()),
            ("Correct Answers", self.correct_answers.to_string()),
            ("Incorrect Answers", self.incorrect_answers.to_string()),
            ("Words Flipped", self.words_flipped.to_string()),
            ("Words Repeated", self.words_repeated.to_string()),
            ("Quiz Correct", self.quiz_correct.to_string()),
            ("Quiz Wrong", self.quiz_wrong.to_string()),
            ("Words Written Correctly", self.written_correct.to_string()),
            ("Words Written Wrong", self.written_wrong.to_string()),
            ("Accuracy", self.accuracy_label()),
            (
                "Last Studied",
                self.last_studied
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "Never".to_string()),
            ),
            ("Time Spent (min)", (self.time_spent / 60).to_string()),
        ]
    }
}

/// `"N/A"` with no attempts, otherwise a two-decimal percentage
pub fn format_accuracy(correct: u64, total_attempts: u64) -> String {
    if total_attempts == 0 {
        return "N/A".to_string();
    }
    format!("{:.2}%", correct as f64 / total_attempts as f64 * 100.0)
}
