//! Dataset tree and single-step replay application.
//!
//! # Responsibility
//! - Hold the materialized group/entry tree plus journal metadata.
//! - Apply one command at a time with check-then-mutate semantics.
//!
//! # Invariants
//! - A failing `apply` leaves the dataset untouched.
//! - Applying the same command sequence to an empty dataset always yields
//!   the same tree (map iteration is ordered via `BTreeMap`).

use crate::command::{Command, OperationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Sentinel id addressing the vault root as a group container.
pub const ROOT_ID: &str = "0";

/// Reserved entry property keys.
pub mod properties {
    pub const TITLE: &str = "title";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const URL: &str = "url";
    pub const NOTES: &str = "notes";
}

/// Integrity errors raised while applying a command to the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// Referenced group id does not exist.
    UnknownGroup(String),
    /// Referenced entry id does not exist.
    UnknownEntry(String),
    /// Created id collides with an existing group or entry.
    DuplicateId(String),
    /// Group move would place a group inside its own subtree.
    CyclicMove { group_id: String, target_id: String },
}

impl Display for ApplyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownGroup(id) => write!(f, "group not found: {id}"),
            Self::UnknownEntry(id) => write!(f, "entry not found: {id}"),
            Self::DuplicateId(id) => write!(f, "id already in use: {id}"),
            Self::CyclicMove {
                group_id,
                target_id,
            } => write!(
                f,
                "move would create cycle: group {group_id} into {target_id}"
            ),
        }
    }
}

impl Error for ApplyError {}

/// Entry record inside the materialized tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Stable entry id.
    pub id: String,
    /// Schema-relevant values (`title`, `username`, `password`, ...).
    pub properties: BTreeMap<String, String>,
    /// Free-form, non-schema values.
    pub meta: BTreeMap<String, String>,
    /// Engine-facing markers (entry class, and similar).
    pub attributes: BTreeMap<String, String>,
}

impl RawEntry {
    /// Fresh entry with an empty title property.
    pub fn new(id: impl Into<String>) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(properties_key_title(), String::new());
        Self {
            id: id.into(),
            properties,
            meta: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }
}

fn properties_key_title() -> String {
    properties::TITLE.to_string()
}

/// Group record inside the materialized tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGroup {
    /// Stable group id.
    pub id: String,
    /// User-facing label; empty string for title-less groups.
    pub title: String,
    /// Engine-facing markers (trash role, and similar).
    pub attributes: BTreeMap<String, String>,
    /// Ordered member entries.
    pub entries: Vec<RawEntry>,
    /// Ordered nested groups.
    pub groups: Vec<RawGroup>,
}

impl RawGroup {
    /// Fresh empty group with an empty title.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Returns whether `id` names this group or anything in its subtree.
    pub fn contains_id(&self, id: &str) -> bool {
        if self.id == id {
            return true;
        }
        if self.entries.iter().any(|entry| entry.id == id) {
            return true;
        }
        self.groups.iter().any(|group| group.contains_id(id))
    }
}

/// Materialized view derived by replaying the command journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Stable vault identity, set by the `vid` command.
    pub vault_id: String,
    /// Opaque format tag owned by the signing collaborator.
    pub format: Option<String>,
    /// Free-form comment records, in journal order.
    pub comments: Vec<String>,
    /// Vault-level attributes.
    pub attributes: BTreeMap<String, String>,
    /// Top-level groups.
    pub groups: Vec<RawGroup>,
}

impl Dataset {
    /// Applies one replay step.
    ///
    /// All referenced ids are resolved before any mutation, so an `Err`
    /// return leaves the dataset exactly as it was.
    pub fn apply(&mut self, command: &Command) -> Result<(), ApplyError> {
        let args = command.arguments();
        match command.kind() {
            OperationKind::Comment => self.comments.push(args[0].clone()),
            OperationKind::Format => self.format = Some(args[0].clone()),
            OperationKind::VaultId => self.vault_id = args[0].clone(),
            OperationKind::Pad => {}
            OperationKind::CreateGroup => self.create_group(&args[0], &args[1])?,
            OperationKind::SetGroupTitle => {
                self.group_mut(&args[0])?.title = args[1].clone();
            }
            OperationKind::SetGroupAttribute => {
                self.group_mut(&args[0])?
                    .attributes
                    .insert(args[1].clone(), args[2].clone());
            }
            OperationKind::DeleteGroupAttribute => {
                self.group_mut(&args[0])?.attributes.remove(&args[1]);
            }
            OperationKind::MoveGroup => self.move_group(&args[0], &args[1])?,
            OperationKind::DeleteGroup => {
                remove_group(&mut self.groups, &args[0])
                    .ok_or_else(|| ApplyError::UnknownGroup(args[0].clone()))?;
            }
            OperationKind::CreateEntry => self.create_entry(&args[0], &args[1])?,
            OperationKind::SetEntryProperty => {
                self.entry_mut(&args[0])?
                    .properties
                    .insert(args[1].clone(), args[2].clone());
            }
            OperationKind::DeleteEntryProperty => {
                self.entry_mut(&args[0])?.properties.remove(&args[1]);
            }
            OperationKind::SetEntryMeta => {
                self.entry_mut(&args[0])?
                    .meta
                    .insert(args[1].clone(), args[2].clone());
            }
            OperationKind::DeleteEntryMeta => {
                self.entry_mut(&args[0])?.meta.remove(&args[1]);
            }
            OperationKind::SetEntryAttribute => {
                self.entry_mut(&args[0])?
                    .attributes
                    .insert(args[1].clone(), args[2].clone());
            }
            OperationKind::DeleteEntryAttribute => {
                self.entry_mut(&args[0])?.attributes.remove(&args[1]);
            }
            OperationKind::MoveEntry => self.move_entry(&args[0], &args[1])?,
            OperationKind::DeleteEntry => {
                remove_entry(&mut self.groups, &args[0])
                    .ok_or_else(|| ApplyError::UnknownEntry(args[0].clone()))?;
            }
            OperationKind::SetVaultAttribute => {
                self.attributes.insert(args[0].clone(), args[1].clone());
            }
            OperationKind::DeleteVaultAttribute => {
                self.attributes.remove(&args[0]);
            }
        }
        Ok(())
    }

    /// Depth-first group lookup.
    pub fn find_group(&self, id: &str) -> Option<&RawGroup> {
        find_group(&self.groups, id)
    }

    /// Depth-first entry lookup.
    pub fn find_entry(&self, id: &str) -> Option<&RawEntry> {
        find_entry(&self.groups, id)
    }

    /// Containing group id for a group, [`ROOT_ID`] when top-level.
    pub fn group_parent_id(&self, id: &str) -> Option<String> {
        if self.groups.iter().any(|group| group.id == id) {
            return Some(ROOT_ID.to_string());
        }
        group_parent_id(&self.groups, id)
    }

    /// Containing group id for an entry.
    pub fn entry_parent_id(&self, id: &str) -> Option<String> {
        entry_parent_id(&self.groups, id)
    }

    /// Returns whether any group or entry already uses `id`.
    pub fn id_in_use(&self, id: &str) -> bool {
        self.groups.iter().any(|group| group.contains_id(id))
    }

    fn group_mut(&mut self, id: &str) -> Result<&mut RawGroup, ApplyError> {
        find_group_mut(&mut self.groups, id)
            .ok_or_else(|| ApplyError::UnknownGroup(id.to_string()))
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut RawEntry, ApplyError> {
        find_entry_mut(&mut self.groups, id)
            .ok_or_else(|| ApplyError::UnknownEntry(id.to_string()))
    }

    fn create_group(&mut self, parent_id: &str, id: &str) -> Result<(), ApplyError> {
        if self.id_in_use(id) {
            return Err(ApplyError::DuplicateId(id.to_string()));
        }
        if parent_id == ROOT_ID {
            self.groups.push(RawGroup::new(id));
            return Ok(());
        }
        self.group_mut(parent_id)?.groups.push(RawGroup::new(id));
        Ok(())
    }

    fn create_entry(&mut self, group_id: &str, id: &str) -> Result<(), ApplyError> {
        if self.id_in_use(id) {
            return Err(ApplyError::DuplicateId(id.to_string()));
        }
        self.group_mut(group_id)?.entries.push(RawEntry::new(id));
        Ok(())
    }

    fn move_group(&mut self, id: &str, target_id: &str) -> Result<(), ApplyError> {
        let moving = self
            .find_group(id)
            .ok_or_else(|| ApplyError::UnknownGroup(id.to_string()))?;
        if target_id != ROOT_ID {
            if moving.contains_id(target_id) {
                return Err(ApplyError::CyclicMove {
                    group_id: id.to_string(),
                    target_id: target_id.to_string(),
                });
            }
            if self.find_group(target_id).is_none() {
                return Err(ApplyError::UnknownGroup(target_id.to_string()));
            }
        }
        let moved = remove_group(&mut self.groups, id)
            .ok_or_else(|| ApplyError::UnknownGroup(id.to_string()))?;
        if target_id == ROOT_ID {
            self.groups.push(moved);
        } else {
            // Checked above; the target cannot be inside the removed subtree.
            self.group_mut(target_id)?.groups.push(moved);
        }
        Ok(())
    }

    fn move_entry(&mut self, id: &str, group_id: &str) -> Result<(), ApplyError> {
        if find_entry(&self.groups, id).is_none() {
            return Err(ApplyError::UnknownEntry(id.to_string()));
        }
        if find_group(&self.groups, group_id).is_none() {
            return Err(ApplyError::UnknownGroup(group_id.to_string()));
        }
        let moved = remove_entry(&mut self.groups, id)
            .ok_or_else(|| ApplyError::UnknownEntry(id.to_string()))?;
        self.group_mut(group_id)?.entries.push(moved);
        Ok(())
    }
}

fn find_group<'a>(groups: &'a [RawGroup], id: &str) -> Option<&'a RawGroup> {
    for group in groups {
        if group.id == id {
            return Some(group);
        }
        if let Some(found) = find_group(&group.groups, id) {
            return Some(found);
        }
    }
    None
}

fn find_group_mut<'a>(groups: &'a mut [RawGroup], id: &str) -> Option<&'a mut RawGroup> {
    for group in groups {
        if group.id == id {
            return Some(group);
        }
        if let Some(found) = find_group_mut(&mut group.groups, id) {
            return Some(found);
        }
    }
    None
}

fn find_entry<'a>(groups: &'a [RawGroup], id: &str) -> Option<&'a RawEntry> {
    for group in groups {
        if let Some(entry) = group.entries.iter().find(|entry| entry.id == id) {
            return Some(entry);
        }
        if let Some(found) = find_entry(&group.groups, id) {
            return Some(found);
        }
    }
    None
}

fn find_entry_mut<'a>(groups: &'a mut [RawGroup], id: &str) -> Option<&'a mut RawEntry> {
    for group in groups {
        if group.entries.iter().any(|entry| entry.id == id) {
            return group.entries.iter_mut().find(|entry| entry.id == id);
        }
        if let Some(found) = find_entry_mut(&mut group.groups, id) {
            return Some(found);
        }
    }
    None
}

fn remove_group(groups: &mut Vec<RawGroup>, id: &str) -> Option<RawGroup> {
    if let Some(index) = groups.iter().position(|group| group.id == id) {
        return Some(groups.remove(index));
    }
    for group in groups {
        if let Some(removed) = remove_group(&mut group.groups, id) {
            return Some(removed);
        }
    }
    None
}

fn remove_entry(groups: &mut Vec<RawGroup>, id: &str) -> Option<RawEntry> {
    for group in groups {
        if let Some(index) = group.entries.iter().position(|entry| entry.id == id) {
            return Some(group.entries.remove(index));
        }
        if let Some(removed) = remove_entry(&mut group.groups, id) {
            return Some(removed);
        }
    }
    None
}

fn group_parent_id(groups: &[RawGroup], id: &str) -> Option<String> {
    for group in groups {
        if group.groups.iter().any(|child| child.id == id) {
            return Some(group.id.clone());
        }
        if let Some(parent) = group_parent_id(&group.groups, id) {
            return Some(parent);
        }
    }
    None
}

fn entry_parent_id(groups: &[RawGroup], id: &str) -> Option<String> {
    for group in groups {
        if group.entries.iter().any(|entry| entry.id == id) {
            return Some(group.id.clone());
        }
        if let Some(parent) = entry_parent_id(&group.groups, id) {
            return Some(parent);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{ApplyError, Dataset, ROOT_ID};
    use crate::command::{Command, OperationKind};

    fn cmd(kind: OperationKind, args: &[&str]) -> Command {
        Command::new(kind, args.iter().map(|a| a.to_string()).collect())
            .expect("test command arity must match")
    }

    fn seeded() -> Dataset {
        let mut dataset = Dataset::default();
        dataset
            .apply(&cmd(OperationKind::CreateGroup, &[ROOT_ID, "g1"]))
            .unwrap();
        dataset
            .apply(&cmd(OperationKind::CreateGroup, &["g1", "g2"]))
            .unwrap();
        dataset
            .apply(&cmd(OperationKind::CreateEntry, &["g2", "e1"]))
            .unwrap();
        dataset
    }

    #[test]
    fn nested_lookup_and_parent_resolution() {
        let dataset = seeded();
        assert!(dataset.find_group("g2").is_some());
        assert!(dataset.find_entry("e1").is_some());
        assert_eq!(dataset.group_parent_id("g1").as_deref(), Some(ROOT_ID));
        assert_eq!(dataset.group_parent_id("g2").as_deref(), Some("g1"));
        assert_eq!(dataset.entry_parent_id("e1").as_deref(), Some("g2"));
    }

    #[test]
    fn duplicate_ids_are_rejected_without_mutation() {
        let mut dataset = seeded();
        let before = dataset.clone();
        let err = dataset
            .apply(&cmd(OperationKind::CreateGroup, &[ROOT_ID, "e1"]))
            .expect_err("entry id reuse must fail");
        assert_eq!(err, ApplyError::DuplicateId("e1".to_string()));
        assert_eq!(dataset, before);
    }

    #[test]
    fn cyclic_group_move_is_rejected() {
        let mut dataset = seeded();
        let err = dataset
            .apply(&cmd(OperationKind::MoveGroup, &["g1", "g2"]))
            .expect_err("move into own subtree must fail");
        assert!(matches!(err, ApplyError::CyclicMove { .. }));
        assert_eq!(dataset.group_parent_id("g2").as_deref(), Some("g1"));
    }

    #[test]
    fn delete_removes_whole_subtree() {
        let mut dataset = seeded();
        dataset
            .apply(&cmd(OperationKind::DeleteGroup, &["g1"]))
            .unwrap();
        assert!(dataset.find_group("g2").is_none());
        assert!(dataset.find_entry("e1").is_none());
    }

    #[test]
    fn attribute_delete_removes_key_entirely() {
        let mut dataset = seeded();
        dataset
            .apply(&cmd(OperationKind::SetGroupAttribute, &["g1", "color", ""]))
            .unwrap();
        assert_eq!(
            dataset.find_group("g1").unwrap().attributes.get("color"),
            Some(&String::new())
        );
        dataset
            .apply(&cmd(OperationKind::DeleteGroupAttribute, &["g1", "color"]))
            .unwrap();
        assert!(!dataset
            .find_group("g1")
            .unwrap()
            .attributes
            .contains_key("color"));
    }
}
