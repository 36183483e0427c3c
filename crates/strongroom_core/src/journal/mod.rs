//! Append-only command journal and replay engine.
//!
//! # Responsibility
//! - Own the ordered command sequence, the sole source of truth.
//! - Keep a materialized dataset coherent with that sequence.
//! - Expose journal source text as the only storage-facing surface.
//!
//! # Invariants
//! - A command is appended only after it applies cleanly; the cached dataset
//!   always equals a full replay of the sequence.
//! - Replay order is append order; no reordering, no timestamps.
//! - A corrupt line aborts loading with its 1-based position; corrupt
//!   commands are never silently skipped.

use crate::command::{Command, CommandError, OperationKind};
use crate::model::dataset::{ApplyError, Dataset};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors from journal execution and loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// Command construction/decoding failure.
    Command(CommandError),
    /// Command referenced state that does not exist in the dataset.
    Apply(ApplyError),
    /// Persisted journal line that cannot be decoded.
    CorruptCommand { line: usize, source: CommandError },
    /// Persisted journal line that decodes but cannot be replayed.
    CorruptReplay { line: usize, source: ApplyError },
}

impl Display for JournalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(err) => write!(f, "{err}"),
            Self::Apply(err) => write!(f, "{err}"),
            Self::CorruptCommand { line, source } => {
                write!(f, "corrupt journal at line {line}: {source}")
            }
            Self::CorruptReplay { line, source } => {
                write!(f, "journal replay failed at line {line}: {source}")
            }
        }
    }
}

impl Error for JournalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Command(err) => Some(err),
            Self::Apply(err) => Some(err),
            Self::CorruptCommand { source, .. } => Some(source),
            Self::CorruptReplay { source, .. } => Some(source),
        }
    }
}

impl From<CommandError> for JournalError {
    fn from(value: CommandError) -> Self {
        Self::Command(value)
    }
}

impl From<ApplyError> for JournalError {
    fn from(value: ApplyError) -> Self {
        Self::Apply(value)
    }
}

/// Append-only command log with a cached materialized dataset.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    commands: Vec<Command>,
    dataset: Dataset,
}

impl Journal {
    /// Empty journal with an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one command after applying it to the materialized dataset.
    ///
    /// # Errors
    /// - [`JournalError::Apply`] when the command references unknown state;
    ///   the journal and dataset are left unchanged.
    pub fn execute(&mut self, command: Command) -> JournalResult<()> {
        self.dataset.apply(&command)?;
        self.commands.push(command);
        Ok(())
    }

    /// Appends an inert boundary marker after a structural mutation run.
    ///
    /// Padding gives downstream compaction and merge tooling a safe cut
    /// point between mutation sequences.
    pub fn pad(&mut self) -> JournalResult<()> {
        let marker = Command::new(OperationKind::Pad, vec![Uuid::new_v4().to_string()])?;
        self.execute(marker)
    }

    /// Read-only view of the current materialized tree.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Number of appended commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns whether no commands have been appended.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Serializes the full command sequence as journal source text.
    pub fn to_source(&self) -> String {
        let mut source = String::new();
        for command in &self.commands {
            source.push_str(&command.to_source_line());
            source.push('\n');
        }
        source
    }

    /// Replays journal source text into a fresh journal.
    ///
    /// Blank lines are ignored. The first offending line aborts the load
    /// with its position; nothing is partially retained.
    ///
    /// # Errors
    /// - [`JournalError::CorruptCommand`] when a line cannot be decoded.
    /// - [`JournalError::CorruptReplay`] when a decoded command cannot be
    ///   applied in sequence.
    pub fn from_source(source: &str) -> JournalResult<Self> {
        let mut journal = Self::new();
        for (index, line) in source.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let command =
                Command::from_source_line(line).map_err(|err| JournalError::CorruptCommand {
                    line: index + 1,
                    source: err,
                })?;
            journal
                .dataset
                .apply(&command)
                .map_err(|err| JournalError::CorruptReplay {
                    line: index + 1,
                    source: err,
                })?;
            journal.commands.push(command);
        }
        debug!(
            "event=journal_loaded module=core status=ok commands={}",
            journal.commands.len()
        );
        Ok(journal)
    }
}
