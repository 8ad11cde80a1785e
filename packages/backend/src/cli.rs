use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use deckcycle_engine::{
    DeckId, EngineState, FlipSession, PersistenceError, QuizSession, SessionConfig, SessionEvent,
    StudyMode, WordPairStore, WriteSession,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::config::Config;
use crate::db::{self, StoreError};
use crate::session_store::SessionStore;
use crate::workers::StatWriter;

#[derive(Debug, Parser)]
#[command(name = "deckcycle", version, about = "Study vocabulary decks from the terminal")]
pub struct Cli {
    /// Deck database file
    #[arg(long, global = true, env = "DECKCYCLE_DB_PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List decks and their word counts
    Decks {
        #[arg(long)]
        json: bool,
    },

    /// Load tab-separated `front<TAB>back` lines into a deck, creating it if needed
    Import {
        deck: String,
        file: PathBuf,
        /// Replace the deck's words instead of appending
        #[arg(long)]
        replace: bool,
    },

    /// Rename a deck
    Rename { deck: String, new_name: String },

    /// Delete a deck with its words and statistics
    Delete { deck: String },

    /// Show a deck's statistics
    Stats {
        deck: String,
        #[arg(long)]
        json: bool,
    },

    /// Zero a deck's statistics
    ResetStats { deck: String },

    /// Run a study session (flip, quiz or write)
    Study {
        deck: String,
        mode: String,
        /// Print every session event as a JSON line
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("unknown study mode: {0} (expected flip, quiz or write)")]
    UnknownMode(String),

    #[error("no deck named {0:?}")]
    UnknownDeck(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub async fn run(cli: Cli, config: Config) -> Result<(), CliError> {
    let db_path = cli.db.unwrap_or_else(|| config.db_path.clone());
    let pool = db::init_pool(&db_path).await?;

    match cli.command {
        Command::Decks { json } => list_decks(&pool, json).await,
        Command::Import {
            deck,
            file,
            replace,
        } => import(&pool, &deck, &file, replace).await,
        Command::Rename { deck, new_name } => {
            let deck_id = resolve_deck(&pool, &deck).await?;
            db::rename_deck(&pool, deck_id, &new_name).await?;
            println!("Renamed {deck} to {new_name}");
            Ok(())
        }
        Command::Delete { deck } => {
            let deck_id = resolve_deck(&pool, &deck).await?;
            db::delete_deck(&pool, deck_id).await?;
            println!("Deleted {deck}");
            Ok(())
        }
        Command::Stats { deck, json } => show_stats(&pool, &deck, json).await,
        Command::ResetStats { deck } => {
            let deck_id = resolve_deck(&pool, &deck).await?;
            db::reset_stats(&pool, deck_id).await?;
            println!("Statistics reset for {deck}");
            Ok(())
        }
        Command::Study { deck, mode, json } => {
            let mode: StudyMode = mode.parse().map_err(|_| CliError::UnknownMode(mode))?;
            study(&pool, &config, &deck, mode, json).await
        }
    }
}

async fn resolve_deck(pool: &SqlitePool, name: &str) -> Result<DeckId, CliError> {
    db::find_deck(pool, name)
        .await?
        .ok_or_else(|| CliError::UnknownDeck(name.to_string()))
}

async fn list_decks(pool: &SqlitePool, json: bool) -> Result<(), CliError> {
    let decks = db::list_decks(pool).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&decks)?);
        return Ok(());
    }
    if decks.is_empty() {
        println!("No decks yet. Import one with `deckcycle import <deck> <file>`.");
        return Ok(());
    }
    for deck in decks {
        println!("{}\t{} words", deck.name, deck.word_count);
    }
    Ok(())
}

async fn import(
    pool: &SqlitePool,
    deck: &str,
    file: &Path,
    replace: bool,
) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(file).await?;

    let existing = if replace {
        db::find_deck(pool, deck).await?
    } else {
        None
    };
    let count = match existing {
        Some(deck_id) => {
            let pairs = db::parse_pairs(&content)?;
            db::replace_pairs(pool, deck_id, &pairs).await?;
            pairs.len()
        }
        None => db::import_pairs(pool, deck, &content).await?.1,
    };

    println!("Imported {count} pairs into {deck}");
    Ok(())
}

async fn show_stats(pool: &SqlitePool, deck: &str, json: bool) -> Result<(), CliError> {
    let deck_id = resolve_deck(pool, deck).await?;
    let stats = db::get_deck_stats(pool, deck_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let rows = stats.summary_rows();
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    println!("{deck}");
    for (label, value) in rows {
        println!("  {label:<width$}  {value}");
    }
    Ok(())
}

// ==================== Study loop ====================

enum StudySession {
    Flip(FlipSession),
    Quiz(QuizSession),
    Write(WriteSession),
}

enum Input {
    Events(Vec<SessionEvent>),
    Quit,
}

impl StudySession {
    fn open(
        mode: StudyMode,
        store: Arc<dyn WordPairStore>,
        deck_id: DeckId,
        config: SessionConfig,
    ) -> Result<Self, PersistenceError> {
        Ok(match mode {
            StudyMode::Flip => Self::Flip(FlipSession::open(store, deck_id, config)?),
            StudyMode::Quiz => Self::Quiz(QuizSession::open(store, deck_id, config)?),
            StudyMode::Write => Self::Write(WriteSession::open(store, deck_id, config)?),
        })
    }

    fn start(&mut self) -> Vec<SessionEvent> {
        match self {
            Self::Flip(session) => {
                let mut events = session.start();
                if session.state() != EngineState::Finished {
                    events.extend(session.next());
                }
                events
            }
            Self::Quiz(session) => session.start(),
            Self::Write(session) => session.start(),
        }
    }

    fn handle(&mut self, line: &str) -> Input {
        let input = line.trim();
        match self {
            Self::Flip(session) => match input {
                "q" => Input::Quit,
                "" | "n" => Input::Events(session.next()),
                "f" => Input::Events(session.flip()),
                "r" => Input::Events(session.repeat()),
                other => {
                    debug!(input = other, "unrecognised flip command");
                    Input::Events(Vec::new())
                }
            },
            Self::Quiz(session) => {
                if input == "q" {
                    return Input::Quit;
                }
                let chosen = input
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| session.current_options().get(i).cloned());
                match chosen {
                    Some(option) => Input::Events(session.select_option(&option)),
                    None => Input::Events(session.select_option(input)),
                }
            }
            Self::Write(session) => match input {
                ":q" => Input::Quit,
                ":skip" => Input::Events(session.skip()),
                answer => Input::Events(session.submit_answer(answer)),
            },
        }
    }

    /// Follow-up for a `ScheduleAdvance` event
    fn advance(&mut self) -> Vec<SessionEvent> {
        match self {
            Self::Flip(_) => Vec::new(),
            Self::Quiz(session) => session.load_next(),
            Self::Write(session) => session.advance(),
        }
    }

    fn is_finished(&self) -> bool {
        let state = match self {
            Self::Flip(session) => session.state(),
            Self::Quiz(session) => session.state(),
            Self::Write(session) => session.state(),
        };
        state == EngineState::Finished
    }

    fn tick(&mut self) {
        match self {
            Self::Flip(session) => session.elapsed_time_tick(),
            Self::Quiz(session) => session.elapsed_time_tick(),
            Self::Write(session) => session.elapsed_time_tick(),
        }
    }

    fn hint(&self) -> String {
        match self {
            Self::Flip(_) => "[enter] next  [f] flip  [r] repeat  [q] quit".to_string(),
            Self::Quiz(session) => {
                format!("pick 1-{}  [q] quit", session.current_options().len())
            }
            Self::Write(_) => "type the answer  [:skip] skip  [:q] quit".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Outcome {
    advance_after: Option<u64>,
    navigate_home: bool,
}

struct EventPrinter {
    json: bool,
}

impl EventPrinter {
    fn emit(&self, events: &[SessionEvent]) -> Result<Outcome, CliError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let mut outcome = Outcome::default();

        for event in events {
            match event {
                SessionEvent::ScheduleAdvance { after_ms } => outcome.advance_after = Some(*after_ms),
                SessionEvent::NavigateHome => outcome.navigate_home = true,
                _ => {}
            }

            if self.json {
                writeln!(out, "{}", serde_json::to_string(event)?)?;
                continue;
            }

            match event {
                SessionEvent::Display { prompt, options } => {
                    writeln!(out, "\n  {prompt}")?;
                    for (i, option) in options.iter().enumerate() {
                        writeln!(out, "    {}) {option}", i + 1)?;
                    }
                }
                SessionEvent::Result { correct: true, .. } => writeln!(out, "  Correct!")?,
                SessionEvent::Result {
                    correct: false,
                    expected,
                    ..
                } => writeln!(out, "  Wrong! The answer is {expected}")?,
                SessionEvent::SessionComplete {
                    correct,
                    incorrect,
                    missed,
                } => {
                    writeln!(out, "\n  Finished: {correct} correct, {incorrect} incorrect")?;
                    if !missed.is_empty() {
                        writeln!(out, "  Missed:")?;
                        for pair in missed {
                            writeln!(out, "    {} - {}", pair.front, pair.back)?;
                        }
                    }
                }
                SessionEvent::Message { text } => writeln!(out, "  {text}")?,
                SessionEvent::ScheduleAdvance { .. }
                | SessionEvent::NavigateHome
                | SessionEvent::StateChanged { .. } => {}
            }
        }

        out.flush()?;
        Ok(outcome)
    }

    fn hint(&self, session: &StudySession) -> Result<(), CliError> {
        if !self.json {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "  {}", session.hint())?;
            out.flush()?;
        }
        Ok(())
    }
}

async fn study(
    pool: &SqlitePool,
    config: &Config,
    deck: &str,
    mode: StudyMode,
    json: bool,
) -> Result<(), CliError> {
    let deck_id = resolve_deck(pool, deck).await?;
    let writer = StatWriter::spawn(pool.clone(), config.writer.clone());
    let store: Arc<dyn WordPairStore> =
        Arc::new(SessionStore::open(pool, writer.sender(), deck_id).await?);

    let mut session = StudySession::open(mode, store, deck_id, config.session.clone())?;
    info!(deck_id, mode = %mode, "study session opened");

    let printer = EventPrinter { json };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = drive(&mut session, &printer, &mut lines).await;

    session.tick();
    // Dropping the session flushes its remaining stat writes onto the queue
    drop(session);
    if !writer.shutdown().await {
        tracing::warn!(deck_id, "some statistics may not have been saved");
    }

    result
}

/// Throws away lines typed while no prompt was on screen
async fn discard_pending<R>(lines: &mut Lines<R>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut discarded = 0;
    // `next_line` is cancel safe; a zero timeout only takes what is already buffered
    while let Ok(Ok(Some(_))) = tokio::time::timeout(Duration::ZERO, lines.next_line()).await {
        discarded += 1;
    }
    discarded
}

async fn drive<R>(
    session: &mut StudySession,
    printer: &EventPrinter,
    lines: &mut Lines<R>,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut events = session.start();

    loop {
        let outcome = printer.emit(&events)?;

        if let Some(after_ms) = outcome.advance_after {
            tokio::time::sleep(Duration::from_millis(after_ms)).await;
            let discarded = discard_pending(lines).await;
            if discarded > 0 {
                debug!(discarded, "input typed during the advance delay ignored");
            }
            events = session.advance();
            continue;
        }
        if outcome.navigate_home || session.is_finished() {
            return Ok(());
        }

        printer.hint(session)?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, ending session");
                None
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        events = match session.handle(&line) {
            Input::Quit => return Ok(()),
            Input::Events(events) => events,
        };
    }
}
