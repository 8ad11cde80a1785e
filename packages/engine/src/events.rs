use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{StudyMode, WordPair};

/// Busy/idle state a caller uses to gate its controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    /// A draw is in progress; triggering controls must stay disabled
    Drawing,
    /// The session has nothing left to show
    Finished,
}

/// What the caller should show or do next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SessionEvent {
    #[serde(rename = "DISPLAY")]
    Display {
        prompt: String,
        /// Empty outside quiz mode
        options: Vec<String>,
    },

    #[serde(rename = "RESULT")]
    Result {
        correct: bool,
        chosen: Option<String>,
        expected: String,
    },

    #[serde(rename = "SESSION_COMPLETE")]
    SessionComplete {
        correct: u32,
        incorrect: u32,
        missed: Vec<WordPair>,
    },

    #[serde(rename = "MESSAGE")]
    Message { text: String },

    /// The caller should invoke the engine's advance command after the delay
    #[serde(rename = "SCHEDULE_ADVANCE")]
    ScheduleAdvance { after_ms: u64 },

    #[serde(rename = "NAVIGATE_HOME")]
    NavigateHome,

    #[serde(rename = "STATE_CHANGED")]
    StateChanged { state: EngineState },
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::Display { .. } => "DISPLAY",
            SessionEvent::Result { .. } => "RESULT",
            SessionEvent::SessionComplete { .. } => "SESSION_COMPLETE",
            SessionEvent::Message { .. } => "MESSAGE",
            SessionEvent::ScheduleAdvance { .. } => "SCHEDULE_ADVANCE",
            SessionEvent::NavigateHome => "NAVIGATE_HOME",
            SessionEvent::StateChanged { .. } => "STATE_CHANGED",
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        SessionEvent::Message { text: text.into() }
    }

    pub fn display(prompt: impl Into<String>) -> Self {
        SessionEvent::Display {
            prompt: prompt.into(),
            options: Vec::new(),
        }
    }
}

/// One counter mutation forwarded to the word pair store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum StatUpdate {
    #[serde(rename = "STUDY_SESSION_STARTED")]
    StudySessionStarted,

    #[serde(rename = "LAST_STUDIED")]
    LastStudied(DateTime<Utc>),

    /// Additive seconds
    #[serde(rename = "TIME_SPENT")]
    TimeSpent(u64),

    #[serde(rename = "ANSWER")]
    Answer { mode: StudyMode, correct: bool },

    #[serde(rename = "WORD_FLIPPED")]
    WordFlipped,

    #[serde(rename = "WORD_REPEATED")]
    WordRepeated,
}

impl StatUpdate {
    pub fn event_type(&self) -> &'static str {
        match self {
            StatUpdate::StudySessionStarted => "STUDY_SESSION_STARTED",
            StatUpdate::LastStudied(_) => "LAST_STUDIED",
            StatUpdate::TimeSpent(_) => "TIME_SPENT",
            StatUpdate::Answer { .. } => "ANSWER",
            StatUpdate::WordFlipped => "WORD_FLIPPED",
            StatUpdate::WordRepeated => "WORD_REPEATED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_event_wire_shape() {
        let json = serde_json::to_value(SessionEvent::ScheduleAdvance { after_ms: 1000 }).unwrap();
        assert_eq!(json["type"], "SCHEDULE_ADVANCE");
        assert_eq!(json["payload"]["after_ms"], 1000);

        let json = serde_json::to_value(SessionEvent::StateChanged {
            state: EngineState::Drawing,
        })
        .unwrap();
        assert_eq!(json["payload"]["state"], "drawing");
    }

    #[test]
    fn test_stat_update_answer_mode_lowercase() {
        let json = serde_json::to_value(StatUpdate::Answer {
            mode: StudyMode::Write,
            correct: false,
        })
        .unwrap();
        assert_eq!(json["type"], "ANSWER");
        assert_eq!(json["payload"]["mode"], "write");
    }
}
