//! Journal command vocabulary.
//!
//! # Responsibility
//! - Define the closed set of mutating operations and their arity.
//! - Provide validated, immutable command records for the journal.
//!
//! # Invariants
//! - A `Command` never exists with the wrong number of arguments.
//! - Wire codes are stable; persisted journals depend on them never changing.
//! - Inert operations (`cmm`, `pad`) produce no tree change on replay.

pub mod codec;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Closed set of journal operations.
///
/// Every mutation of the vault tree is expressed as exactly one of these
/// kinds; replay interprets nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Free-form comment record; inert on replay.
    Comment,
    /// Opaque format tag understood by the signing collaborator.
    Format,
    /// Stable vault identity marker.
    VaultId,
    /// Inert compaction/merge boundary marker.
    Pad,
    /// Create a group under a parent (`"0"` targets the root).
    CreateGroup,
    /// Set a group's title.
    SetGroupTitle,
    /// Upsert one group attribute.
    SetGroupAttribute,
    /// Remove one group attribute key entirely.
    DeleteGroupAttribute,
    /// Relocate a group under a new parent (`"0"` targets the root).
    MoveGroup,
    /// Remove a group subtree.
    DeleteGroup,
    /// Create an entry under a group.
    CreateEntry,
    /// Upsert one entry property.
    SetEntryProperty,
    /// Remove one entry property key entirely.
    DeleteEntryProperty,
    /// Upsert one entry meta value.
    SetEntryMeta,
    /// Remove one entry meta key entirely.
    DeleteEntryMeta,
    /// Upsert one entry attribute.
    SetEntryAttribute,
    /// Remove one entry attribute key entirely.
    DeleteEntryAttribute,
    /// Relocate an entry to a target group.
    MoveEntry,
    /// Remove an entry.
    DeleteEntry,
    /// Upsert one vault-level attribute.
    SetVaultAttribute,
    /// Remove one vault-level attribute key entirely.
    DeleteVaultAttribute,
}

impl OperationKind {
    /// Returns the stable short wire code for this operation.
    pub fn code(self) -> &'static str {
        match self {
            Self::Comment => "cmm",
            Self::Format => "fmt",
            Self::VaultId => "vid",
            Self::Pad => "pad",
            Self::CreateGroup => "cgr",
            Self::SetGroupTitle => "tgr",
            Self::SetGroupAttribute => "sga",
            Self::DeleteGroupAttribute => "dga",
            Self::MoveGroup => "mgr",
            Self::DeleteGroup => "dgr",
            Self::CreateEntry => "cen",
            Self::SetEntryProperty => "sep",
            Self::DeleteEntryProperty => "dep",
            Self::SetEntryMeta => "sem",
            Self::DeleteEntryMeta => "dem",
            Self::SetEntryAttribute => "sea",
            Self::DeleteEntryAttribute => "dea",
            Self::MoveEntry => "men",
            Self::DeleteEntry => "den",
            Self::SetVaultAttribute => "sva",
            Self::DeleteVaultAttribute => "dva",
        }
    }

    /// Returns the required argument count for this operation.
    pub fn arity(self) -> usize {
        match self {
            Self::Comment
            | Self::Format
            | Self::VaultId
            | Self::Pad
            | Self::DeleteGroup
            | Self::DeleteEntry
            | Self::DeleteVaultAttribute => 1,
            Self::CreateGroup
            | Self::SetGroupTitle
            | Self::DeleteGroupAttribute
            | Self::MoveGroup
            | Self::CreateEntry
            | Self::DeleteEntryProperty
            | Self::DeleteEntryMeta
            | Self::DeleteEntryAttribute
            | Self::MoveEntry
            | Self::SetVaultAttribute => 2,
            Self::SetGroupAttribute
            | Self::SetEntryProperty
            | Self::SetEntryMeta
            | Self::SetEntryAttribute => 3,
        }
    }

    /// Returns whether replay treats this operation as metadata-only.
    pub fn is_inert(self) -> bool {
        matches!(self, Self::Comment | Self::Pad)
    }

    /// Resolves a wire code back to its operation kind.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "cmm" => Some(Self::Comment),
            "fmt" => Some(Self::Format),
            "vid" => Some(Self::VaultId),
            "pad" => Some(Self::Pad),
            "cgr" => Some(Self::CreateGroup),
            "tgr" => Some(Self::SetGroupTitle),
            "sga" => Some(Self::SetGroupAttribute),
            "dga" => Some(Self::DeleteGroupAttribute),
            "mgr" => Some(Self::MoveGroup),
            "dgr" => Some(Self::DeleteGroup),
            "cen" => Some(Self::CreateEntry),
            "sep" => Some(Self::SetEntryProperty),
            "dep" => Some(Self::DeleteEntryProperty),
            "sem" => Some(Self::SetEntryMeta),
            "dem" => Some(Self::DeleteEntryMeta),
            "sea" => Some(Self::SetEntryAttribute),
            "dea" => Some(Self::DeleteEntryAttribute),
            "men" => Some(Self::MoveEntry),
            "den" => Some(Self::DeleteEntry),
            "sva" => Some(Self::SetVaultAttribute),
            "dva" => Some(Self::DeleteVaultAttribute),
            _ => None,
        }
    }
}

/// Errors from command construction and text decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Argument count does not match the operation's arity.
    ArityMismatch {
        kind: OperationKind,
        expected: usize,
        actual: usize,
    },
    /// Wire code does not name a known operation.
    UnknownCode(String),
    /// Command text cannot be tokenized (truncated quote, stray data).
    MalformedText(String),
    /// Line is empty where a command was required.
    EmptyText,
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArityMismatch {
                kind,
                expected,
                actual,
            } => write!(
                f,
                "operation `{}` requires {expected} argument(s), got {actual}",
                kind.code()
            ),
            Self::UnknownCode(code) => write!(f, "unknown operation code: `{code}`"),
            Self::MalformedText(detail) => write!(f, "malformed command text: {detail}"),
            Self::EmptyText => write!(f, "command text is empty"),
        }
    }
}

impl Error for CommandError {}

/// Immutable, arity-validated journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: OperationKind,
    arguments: Vec<String>,
}

impl Command {
    /// Builds a command, rejecting argument counts that violate arity.
    pub fn new(
        kind: OperationKind,
        arguments: Vec<String>,
    ) -> Result<Self, CommandError> {
        if arguments.len() != kind.arity() {
            return Err(CommandError::ArityMismatch {
                kind,
                expected: kind.arity(),
                actual: arguments.len(),
            });
        }
        Ok(Self { kind, arguments })
    }

    /// Operation kind of this command.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Ordered argument values.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Canonical single-line text encoding.
    pub fn to_source_line(&self) -> String {
        codec::encode_command(self)
    }

    /// Decodes one source line back into a command.
    pub fn from_source_line(line: &str) -> Result<Self, CommandError> {
        codec::decode_command(line)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_source_line())
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, CommandError, OperationKind};

    #[test]
    fn arity_is_enforced_at_construction() {
        let err = Command::new(OperationKind::MoveEntry, vec!["only-one".to_string()])
            .expect_err("move entry needs two arguments");
        assert!(matches!(
            err,
            CommandError::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn every_code_round_trips_through_lookup() {
        let kinds = [
            OperationKind::Comment,
            OperationKind::Format,
            OperationKind::VaultId,
            OperationKind::Pad,
            OperationKind::CreateGroup,
            OperationKind::SetGroupTitle,
            OperationKind::SetGroupAttribute,
            OperationKind::DeleteGroupAttribute,
            OperationKind::MoveGroup,
            OperationKind::DeleteGroup,
            OperationKind::CreateEntry,
            OperationKind::SetEntryProperty,
            OperationKind::DeleteEntryProperty,
            OperationKind::SetEntryMeta,
            OperationKind::DeleteEntryMeta,
            OperationKind::SetEntryAttribute,
            OperationKind::DeleteEntryAttribute,
            OperationKind::MoveEntry,
            OperationKind::DeleteEntry,
            OperationKind::SetVaultAttribute,
            OperationKind::DeleteVaultAttribute,
        ];
        for kind in kinds {
            assert_eq!(OperationKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(OperationKind::from_code("zzz"), None);
    }

    #[test]
    fn only_comments_and_pads_are_inert() {
        assert!(OperationKind::Comment.is_inert());
        assert!(OperationKind::Pad.is_inert());
        assert!(!OperationKind::Format.is_inert());
        assert!(!OperationKind::CreateGroup.is_inert());
    }
}
