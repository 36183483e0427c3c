//! Entry handle: ID-addressed view over one entry in the dataset.

use crate::command::OperationKind;
use crate::model::dataset::{properties, RawEntry};
use crate::vault::{command, Group, Vault, VaultError, VaultResult};
use std::collections::BTreeMap;

/// Entry attribute carrying the entry class consumed by facade tooling.
pub const ATTRIBUTE_ENTRY_TYPE: &str = "sr_entry_type";

/// Entry class assumed when no class attribute is present.
pub const DEFAULT_ENTRY_TYPE: &str = "login";

/// Handle to one entry; holds no tree state beyond the id.
#[derive(Debug, Clone)]
pub struct Entry<'v> {
    vault: &'v Vault,
    id: String,
}

impl<'v> Entry<'v> {
    pub(crate) fn new(vault: &'v Vault, id: String) -> Self {
        Self { vault, id }
    }

    /// Stable entry id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// One property value (`title`, `username`, `password`, ...).
    pub fn get_property(&self, key: &str) -> VaultResult<Option<String>> {
        self.raw(|entry| entry.properties.get(key).cloned())
    }

    /// Full property mapping.
    pub fn get_properties(&self) -> VaultResult<BTreeMap<String, String>> {
        self.raw(|entry| entry.properties.clone())
    }

    /// Upserts one property.
    pub fn set_property(&self, key: &str, value: &str) -> VaultResult<&Self> {
        self.mutate(
            OperationKind::SetEntryProperty,
            vec![self.id.clone(), key.to_string(), value.to_string()],
        )
    }

    /// Removes one property key entirely.
    pub fn delete_property(&self, key: &str) -> VaultResult<&Self> {
        self.mutate(
            OperationKind::DeleteEntryProperty,
            vec![self.id.clone(), key.to_string()],
        )
    }

    /// One meta value.
    pub fn get_meta(&self, key: &str) -> VaultResult<Option<String>> {
        self.raw(|entry| entry.meta.get(key).cloned())
    }

    /// Full meta mapping.
    pub fn get_metas(&self) -> VaultResult<BTreeMap<String, String>> {
        self.raw(|entry| entry.meta.clone())
    }

    /// Upserts one meta value.
    pub fn set_meta(&self, key: &str, value: &str) -> VaultResult<&Self> {
        self.mutate(
            OperationKind::SetEntryMeta,
            vec![self.id.clone(), key.to_string(), value.to_string()],
        )
    }

    /// Removes one meta key entirely.
    pub fn delete_meta(&self, key: &str) -> VaultResult<&Self> {
        self.mutate(
            OperationKind::DeleteEntryMeta,
            vec![self.id.clone(), key.to_string()],
        )
    }

    /// One attribute value.
    pub fn get_attribute(&self, name: &str) -> VaultResult<Option<String>> {
        self.raw(|entry| entry.attributes.get(name).cloned())
    }

    /// Full attribute mapping.
    pub fn get_attributes(&self) -> VaultResult<BTreeMap<String, String>> {
        self.raw(|entry| entry.attributes.clone())
    }

    /// Upserts one attribute.
    pub fn set_attribute(&self, name: &str, value: &str) -> VaultResult<&Self> {
        self.mutate(
            OperationKind::SetEntryAttribute,
            vec![self.id.clone(), name.to_string(), value.to_string()],
        )
    }

    /// Removes one attribute key entirely.
    pub fn delete_attribute(&self, name: &str) -> VaultResult<&Self> {
        self.mutate(
            OperationKind::DeleteEntryAttribute,
            vec![self.id.clone(), name.to_string()],
        )
    }

    /// Entry class consumed by facade tooling; defaults to `login`.
    pub fn get_type(&self) -> VaultResult<String> {
        Ok(self
            .get_attribute(ATTRIBUTE_ENTRY_TYPE)?
            .unwrap_or_else(|| DEFAULT_ENTRY_TYPE.to_string()))
    }

    /// Containing group handle.
    pub fn get_group(&self) -> VaultResult<Group<'v>> {
        let parent_id = self
            .vault
            .with_dataset(|dataset| dataset.entry_parent_id(&self.id))
            .ok_or_else(|| VaultError::EntryNotFound(self.id.clone()))?;
        Ok(Group::new(self.vault, parent_id))
    }

    /// Relocates this entry into a target group.
    pub fn move_to_group(&self, group: &Group<'_>) -> VaultResult<&Self> {
        self.mutate(
            OperationKind::MoveEntry,
            vec![self.id.clone(), group.id().to_string()],
        )
    }

    /// Returns whether this entry sits anywhere inside the Trash group.
    pub fn is_in_trash(&self) -> VaultResult<bool> {
        self.ensure_resolves()?;
        let trash = match self.vault.get_trash_group() {
            Ok(trash) => trash,
            Err(VaultError::TrashNotFound) => return Ok(false),
            Err(err) => return Err(err),
        };
        Ok(self.vault.with_dataset(|dataset| {
            dataset
                .find_group(trash.id())
                .map(|raw| raw.contains_id(&self.id))
                .unwrap_or(false)
        }))
    }

    /// Deletes this entry.
    ///
    /// Non-forced deletion relocates the entry into Trash and returns
    /// `false`; forced deletion (or deletion of an entry already in Trash)
    /// removes it and returns `true`.
    pub fn delete(&self, skip_trash: bool) -> VaultResult<bool> {
        if skip_trash || self.is_in_trash()? {
            self.ensure_resolves()?;
            self.vault.execute_padded(command(
                OperationKind::DeleteEntry,
                vec![self.id.clone()],
            )?)?;
            return Ok(true);
        }
        let trash = self.vault.get_trash_group()?;
        self.move_to_group(&trash)?;
        Ok(false)
    }

    /// Convenience accessor for the reserved title property.
    pub fn get_title(&self) -> VaultResult<String> {
        Ok(self
            .get_property(properties::TITLE)?
            .unwrap_or_default())
    }

    fn raw<T>(&self, read: impl FnOnce(&RawEntry) -> T) -> VaultResult<T> {
        self.vault
            .with_dataset(|dataset| dataset.find_entry(&self.id).map(read))
            .ok_or_else(|| VaultError::EntryNotFound(self.id.clone()))
    }

    fn ensure_resolves(&self) -> VaultResult<()> {
        self.raw(|_| ())
    }

    fn mutate(&self, kind: OperationKind, args: Vec<String>) -> VaultResult<&Self> {
        self.ensure_resolves()?;
        self.vault.execute_padded(command(kind, args)?)?;
        Ok(self)
    }
}
