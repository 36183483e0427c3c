//! Group handle: ID-addressed view over one group in the dataset.

use crate::command::OperationKind;
use crate::model::dataset::{properties, RawGroup, ROOT_ID};
use crate::vault::{command, Entry, GroupContainer, Vault, VaultError, VaultResult};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Handle to one group; holds no tree state beyond the id.
#[derive(Debug, Clone)]
pub struct Group<'v> {
    vault: &'v Vault,
    id: String,
}

impl<'v> Group<'v> {
    pub(crate) fn new(vault: &'v Vault, id: String) -> Self {
        Self { vault, id }
    }

    /// Stable group id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Group title; empty string for title-less groups.
    pub fn get_title(&self) -> VaultResult<String> {
        self.raw(|group| group.title.clone())
    }

    /// Sets the group title.
    pub fn set_title(&self, title: &str) -> VaultResult<&Self> {
        self.ensure_resolves()?;
        self.vault.execute_padded(command(
            OperationKind::SetGroupTitle,
            vec![self.id.clone(), title.to_string()],
        )?)?;
        Ok(self)
    }

    /// Creates a nested group; absent title yields an empty-string title.
    pub fn create_group(&self, title: Option<&str>) -> VaultResult<Group<'v>> {
        self.ensure_resolves()?;
        Vault::create_group_under(self.vault, &self.id, title)
    }

    /// Creates a member entry; absent title yields an empty-string title.
    pub fn create_entry(&self, title: Option<&str>) -> VaultResult<Entry<'v>> {
        self.ensure_resolves()?;
        let id = Uuid::new_v4().to_string();
        let mut run = vec![command(
            OperationKind::CreateEntry,
            vec![self.id.clone(), id.clone()],
        )?];
        if let Some(title) = title {
            run.push(command(
                OperationKind::SetEntryProperty,
                vec![id.clone(), properties::TITLE.to_string(), title.to_string()],
            )?);
        }
        self.vault.execute_run_padded(run)?;
        Ok(Entry::new(self.vault, id))
    }

    /// Handles for directly nested groups.
    pub fn get_groups(&self) -> VaultResult<Vec<Group<'v>>> {
        let ids = self.raw(|group| {
            group
                .groups
                .iter()
                .map(|child| child.id.clone())
                .collect::<Vec<_>>()
        })?;
        Ok(ids
            .into_iter()
            .map(|id| Group::new(self.vault, id))
            .collect())
    }

    /// Handles for directly contained entries.
    pub fn get_entries(&self) -> VaultResult<Vec<Entry<'v>>> {
        let ids = self.raw(|group| {
            group
                .entries
                .iter()
                .map(|entry| entry.id.clone())
                .collect::<Vec<_>>()
        })?;
        Ok(ids
            .into_iter()
            .map(|id| Entry::new(self.vault, id))
            .collect())
    }

    /// Depth-first entry lookup inside this group's subtree.
    pub fn find_entry_by_id(&self, id: &str) -> Option<Entry<'v>> {
        let found = self.vault.with_dataset(|dataset| {
            dataset
                .find_group(&self.id)
                .filter(|group| group.contains_id(id))
                .and_then(|_| dataset.find_entry(id).map(|entry| entry.id.clone()))
        });
        found.map(|id| Entry::new(self.vault, id))
    }

    /// Depth-first group lookup inside this group's subtree.
    pub fn find_group_by_id(&self, id: &str) -> Option<Group<'v>> {
        let found = self.vault.with_dataset(|dataset| {
            dataset
                .find_group(&self.id)
                .filter(|group| group.id != id && group.contains_id(id))
                .and_then(|_| dataset.find_group(id).map(|group| group.id.clone()))
        });
        found.map(|id| Group::new(self.vault, id))
    }

    /// One group attribute value.
    pub fn get_attribute(&self, name: &str) -> VaultResult<Option<String>> {
        self.raw(|group| group.attributes.get(name).cloned())
    }

    /// Full group attribute mapping.
    pub fn get_attributes(&self) -> VaultResult<BTreeMap<String, String>> {
        self.raw(|group| group.attributes.clone())
    }

    /// Upserts one group attribute.
    pub fn set_attribute(&self, name: &str, value: &str) -> VaultResult<&Self> {
        self.ensure_resolves()?;
        self.vault.execute_padded(command(
            OperationKind::SetGroupAttribute,
            vec![self.id.clone(), name.to_string(), value.to_string()],
        )?)?;
        Ok(self)
    }

    /// Removes one group attribute key entirely.
    pub fn delete_attribute(&self, name: &str) -> VaultResult<&Self> {
        self.ensure_resolves()?;
        self.vault.execute_padded(command(
            OperationKind::DeleteGroupAttribute,
            vec![self.id.clone(), name.to_string()],
        )?)?;
        Ok(self)
    }

    /// Containing group handle; `None` when top-level.
    pub fn get_parent_group(&self) -> VaultResult<Option<Group<'v>>> {
        let parent_id = self.vault.with_dataset(|dataset| {
            if dataset.find_group(&self.id).is_none() {
                return Err(VaultError::GroupNotFound(self.id.clone()));
            }
            Ok(dataset.group_parent_id(&self.id))
        })?;
        match parent_id {
            Some(id) if id != ROOT_ID => Ok(Some(Group::new(self.vault, id))),
            _ => Ok(None),
        }
    }

    /// Relocates this group under a new container (vault root or group).
    pub fn move_to(&self, target: &impl GroupContainer) -> VaultResult<&Self> {
        self.ensure_resolves()?;
        self.vault.execute_padded(command(
            OperationKind::MoveGroup,
            vec![self.id.clone(), target.container_id()],
        )?)?;
        Ok(self)
    }

    /// Returns whether this group carries the trash role.
    pub fn is_trash(&self) -> VaultResult<bool> {
        self.raw(|group| {
            group
                .attributes
                .get(super::ATTRIBUTE_ROLE)
                .map(String::as_str)
                == Some(super::ROLE_TRASH)
        })
    }

    /// Returns whether this group sits anywhere inside the Trash group.
    pub fn is_in_trash(&self) -> VaultResult<bool> {
        self.ensure_resolves()?;
        let trash = match self.vault.get_trash_group() {
            Ok(trash) => trash,
            Err(VaultError::TrashNotFound) => return Ok(false),
            Err(err) => return Err(err),
        };
        if trash.id() == self.id {
            return Ok(false);
        }
        Ok(self.vault.with_dataset(|dataset| {
            dataset
                .find_group(trash.id())
                .map(|raw| raw.contains_id(&self.id))
                .unwrap_or(false)
        }))
    }

    /// Deletes this group.
    ///
    /// Non-forced deletion relocates the group under Trash and returns
    /// `false`; forced deletion (or deletion of a group already in Trash)
    /// removes the subtree and returns `true`.
    ///
    /// # Errors
    /// - [`VaultError::CannotDeleteTrash`] when targeting the Trash group.
    pub fn delete(&self, skip_trash: bool) -> VaultResult<bool> {
        if self.is_trash()? {
            return Err(VaultError::CannotDeleteTrash);
        }
        if skip_trash || self.is_in_trash()? {
            self.vault.execute_padded(command(
                OperationKind::DeleteGroup,
                vec![self.id.clone()],
            )?)?;
            return Ok(true);
        }
        let trash = self.vault.get_trash_group()?;
        self.move_to(&trash)?;
        Ok(false)
    }

    fn raw<T>(&self, read: impl FnOnce(&RawGroup) -> T) -> VaultResult<T> {
        self.vault
            .with_dataset(|dataset| dataset.find_group(&self.id).map(read))
            .ok_or_else(|| VaultError::GroupNotFound(self.id.clone()))
    }

    fn ensure_resolves(&self) -> VaultResult<()> {
        self.raw(|_| ())
    }
}
