//! Vault domain model: ID-addressed handles over the journal.
//!
//! # Responsibility
//! - Provide the single mutation path into the journal (command + pad).
//! - Expose group/entry handles that re-query the materialized dataset.
//!
//! # Invariants
//! - Handles hold only `(vault reference, id)`, never tree pointers; a
//!   handle is stale once its id stops resolving, and operations on it fail.
//! - Every mutator appends exactly one logical mutation plus a pad boundary.
//! - The Trash group is unique, seeded at creation, and cannot be deleted.

mod entry;
mod group;

pub use entry::{Entry, ATTRIBUTE_ENTRY_TYPE, DEFAULT_ENTRY_TYPE};
pub use group::Group;

use crate::command::{Command, CommandError, OperationKind};
use crate::journal::{Journal, JournalError};
use crate::model::dataset::{Dataset, RawGroup, ROOT_ID};
use log::info;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque format tag preserved for the signing collaborator.
pub const FORMAT_TAG: &str = "strongroom/a";

/// Group attribute marking engine-designated roles.
pub const ATTRIBUTE_ROLE: &str = "sr_group_role";

/// Role value designating the Trash group.
pub const ROLE_TRASH: &str = "trash";

/// Default title for the seeded Trash group.
pub const TRASH_TITLE: &str = "Trash";

/// Vault attribute carrying the local attachments key material reference.
///
/// Local-origin: merge consumption protects it from foreign overwrite.
pub const ATTRIBUTE_ATTACHMENTS_KEY: &str = "sr_attachments_key";

/// Result type used by domain model operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors from vault/group/entry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Journal-level failure (validation or integrity).
    Journal(JournalError),
    /// Handle id no longer resolves to a group.
    GroupNotFound(String),
    /// Handle id no longer resolves to an entry.
    EntryNotFound(String),
    /// No group carries the trash role.
    TrashNotFound,
    /// The Trash group cannot be deleted.
    CannotDeleteTrash,
}

impl Display for VaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Journal(err) => write!(f, "{err}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::TrashNotFound => write!(f, "vault has no trash group"),
            Self::CannotDeleteTrash => write!(f, "trash group cannot be deleted"),
        }
    }
}

impl Error for VaultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Journal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<JournalError> for VaultError {
    fn from(value: JournalError) -> Self {
        Self::Journal(value)
    }
}

impl From<CommandError> for VaultError {
    fn from(value: CommandError) -> Self {
        Self::Journal(JournalError::Command(value))
    }
}

/// Anything a group can be created under or moved into.
///
/// Implemented by [`Vault`] (the synthetic root, id `"0"`) and [`Group`].
pub trait GroupContainer {
    /// Id addressing this container in journal commands.
    fn container_id(&self) -> String;
}

impl GroupContainer for Vault {
    fn container_id(&self) -> String {
        ROOT_ID.to_string()
    }
}

impl GroupContainer for Group<'_> {
    fn container_id(&self) -> String {
        self.id().to_string()
    }
}

/// Root handle over one journal-backed vault.
#[derive(Debug)]
pub struct Vault {
    journal: RefCell<Journal>,
}

impl Vault {
    /// Creates a vault with a generated identity and a seeded Trash group.
    pub fn create() -> VaultResult<Self> {
        Self::create_with_id(&Uuid::new_v4().to_string())
    }

    /// Creates a vault with a caller-provided identity.
    ///
    /// Used by sync/import paths where the identity already exists
    /// externally.
    pub fn create_with_id(id: &str) -> VaultResult<Self> {
        let vault = Self {
            journal: RefCell::new(Journal::new()),
        };
        {
            let mut journal = vault.journal.borrow_mut();
            journal.execute(command(
                OperationKind::Comment,
                vec!["strongroom vault created".to_string()],
            )?)?;
            journal.execute(command(
                OperationKind::Format,
                vec![FORMAT_TAG.to_string()],
            )?)?;
            journal.execute(command(OperationKind::VaultId, vec![id.to_string()])?)?;

            let trash_id = Uuid::new_v4().to_string();
            journal.execute(command(
                OperationKind::CreateGroup,
                vec![ROOT_ID.to_string(), trash_id.clone()],
            )?)?;
            journal.execute(command(
                OperationKind::SetGroupTitle,
                vec![trash_id.clone(), TRASH_TITLE.to_string()],
            )?)?;
            journal.execute(command(
                OperationKind::SetGroupAttribute,
                vec![
                    trash_id,
                    ATTRIBUTE_ROLE.to_string(),
                    ROLE_TRASH.to_string(),
                ],
            )?)?;
            journal.pad()?;
        }
        info!("event=vault_created module=core status=ok vault_id={id}");
        Ok(vault)
    }

    /// Loads a vault by replaying journal source text.
    pub fn from_source(source: &str) -> VaultResult<Self> {
        let journal = Journal::from_source(source)?;
        Ok(Self {
            journal: RefCell::new(journal),
        })
    }

    /// Serializes the full journal as source text.
    pub fn to_source(&self) -> String {
        self.journal.borrow().to_source()
    }

    /// Stable vault identity.
    pub fn id(&self) -> String {
        self.with_dataset(|dataset| dataset.vault_id.clone())
    }

    /// Opaque format tag, when one has been recorded.
    pub fn format(&self) -> Option<String> {
        self.with_dataset(|dataset| dataset.format.clone())
    }

    /// Creates a top-level group; absent title yields an empty-string title.
    pub fn create_group(&self, title: Option<&str>) -> VaultResult<Group<'_>> {
        self.create_group_under(ROOT_ID, title)
    }

    /// Handles for all top-level groups.
    pub fn get_groups(&self) -> Vec<Group<'_>> {
        self.with_dataset(|dataset| {
            dataset
                .groups
                .iter()
                .map(|group| group.id.clone())
                .collect::<Vec<_>>()
        })
        .into_iter()
        .map(|id| Group::new(self, id))
        .collect()
    }

    /// Handle for the group carrying the trash role.
    pub fn get_trash_group(&self) -> VaultResult<Group<'_>> {
        let trash_id = self
            .with_dataset(|dataset| {
                find_trash_id(&dataset.groups)
            })
            .ok_or(VaultError::TrashNotFound)?;
        Ok(Group::new(self, trash_id))
    }

    /// Depth-first group lookup; absence is not an error.
    pub fn find_group_by_id(&self, id: &str) -> Option<Group<'_>> {
        self.with_dataset(|dataset| dataset.find_group(id).map(|group| group.id.clone()))
            .map(|id| Group::new(self, id))
    }

    /// Depth-first entry lookup; absence is not an error.
    pub fn find_entry_by_id(&self, id: &str) -> Option<Entry<'_>> {
        self.with_dataset(|dataset| dataset.find_entry(id).map(|entry| entry.id.clone()))
            .map(|id| Entry::new(self, id))
    }

    /// One vault-level attribute value.
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.with_dataset(|dataset| dataset.attributes.get(name).cloned())
    }

    /// Full vault-level attribute mapping.
    pub fn get_attributes(&self) -> BTreeMap<String, String> {
        self.with_dataset(|dataset| dataset.attributes.clone())
    }

    /// Upserts one vault-level attribute.
    pub fn set_attribute(&self, name: &str, value: &str) -> VaultResult<&Self> {
        self.execute_padded(command(
            OperationKind::SetVaultAttribute,
            vec![name.to_string(), value.to_string()],
        )?)?;
        Ok(self)
    }

    /// Removes one vault-level attribute key entirely.
    pub fn delete_attribute(&self, name: &str) -> VaultResult<&Self> {
        self.execute_padded(command(
            OperationKind::DeleteVaultAttribute,
            vec![name.to_string()],
        )?)?;
        Ok(self)
    }

    pub(crate) fn with_dataset<T>(&self, read: impl FnOnce(&Dataset) -> T) -> T {
        read(self.journal.borrow().dataset())
    }

    /// Executes one mutation command followed by a pad boundary.
    pub(crate) fn execute_padded(&self, command: Command) -> VaultResult<()> {
        let mut journal = self.journal.borrow_mut();
        journal.execute(command)?;
        journal.pad()?;
        Ok(())
    }

    /// Executes a short mutation run followed by a single pad boundary.
    pub(crate) fn execute_run_padded(&self, commands: Vec<Command>) -> VaultResult<()> {
        let mut journal = self.journal.borrow_mut();
        for command in commands {
            journal.execute(command)?;
        }
        journal.pad()?;
        Ok(())
    }

    pub(crate) fn create_group_under(
        &self,
        parent_id: &str,
        title: Option<&str>,
    ) -> VaultResult<Group<'_>> {
        let id = Uuid::new_v4().to_string();
        self.create_group_with_id(parent_id, &id, title)
    }

    /// Creates a group with a caller-provided id.
    ///
    /// Merge consumption preserves foreign ids through this path so a
    /// re-consume of the same facade resolves them instead of duplicating.
    pub(crate) fn create_group_with_id(
        &self,
        parent_id: &str,
        id: &str,
        title: Option<&str>,
    ) -> VaultResult<Group<'_>> {
        let mut run = vec![command(
            OperationKind::CreateGroup,
            vec![parent_id.to_string(), id.to_string()],
        )?];
        if let Some(title) = title {
            run.push(command(
                OperationKind::SetGroupTitle,
                vec![id.to_string(), title.to_string()],
            )?);
        }
        self.execute_run_padded(run)?;
        Ok(Group::new(self, id.to_string()))
    }

    /// Creates an entry with a caller-provided id; merge-consumption path.
    pub(crate) fn create_entry_with_id(
        &self,
        group_id: &str,
        id: &str,
    ) -> VaultResult<Entry<'_>> {
        self.execute_padded(command(
            OperationKind::CreateEntry,
            vec![group_id.to_string(), id.to_string()],
        )?)?;
        Ok(Entry::new(self, id.to_string()))
    }
}

/// Builds a command, lifting arity failures into the domain error type.
pub(crate) fn command(kind: OperationKind, args: Vec<String>) -> VaultResult<Command> {
    Command::new(kind, args).map_err(VaultError::from)
}

fn find_trash_id(groups: &[RawGroup]) -> Option<String> {
    for group in groups {
        if group.attributes.get(ATTRIBUTE_ROLE).map(String::as_str) == Some(ROLE_TRASH) {
            return Some(group.id.clone());
        }
        if let Some(found) = find_trash_id(&group.groups) {
            return Some(found);
        }
    }
    None
}
