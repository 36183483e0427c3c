//! Facade projection and single-entity consumption.
//!
//! # Responsibility
//! - Project the live vault tree into flat facade snapshots.
//! - Apply single group/entry facades as key-level differences.
//!
//! # Invariants
//! - Projection is a pure read; it appends nothing to the journal.
//! - Consumption applies only differences (added/changed/removed keys),
//!   never a blind overwrite.
//! - The entry class travels in the facade `type` field, not in the
//!   attribute map; the class attribute is invisible to the attribute diff.

use crate::facade::{
    EntryFacade, FacadeError, FacadeKind, GroupFacade, VaultFacade, FACADE_VERSION,
};
use crate::model::dataset::{RawEntry, RawGroup, ROOT_ID};
use crate::vault::{
    Entry, Group, Vault, ATTRIBUTE_ENTRY_TYPE, ATTRIBUTE_ROLE, DEFAULT_ENTRY_TYPE, ROLE_TRASH,
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Options for vault facade projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVaultFacadeOptions {
    /// Include the Trash group and its contents. Facades meant for
    /// consumption must keep this on; trimmed facades are for display only.
    pub include_trash: bool,
}

impl Default for CreateVaultFacadeOptions {
    fn default() -> Self {
        Self { include_trash: true }
    }
}

/// Projects a whole vault into a flat facade snapshot.
pub fn create_vault_facade(vault: &Vault, options: &CreateVaultFacadeOptions) -> VaultFacade {
    let (groups, entries) = vault.with_dataset(|dataset| {
        let mut groups = Vec::new();
        let mut entries = Vec::new();
        for group in &dataset.groups {
            collect_group(group, ROOT_ID, options.include_trash, &mut groups, &mut entries);
        }
        (groups, entries)
    });
    VaultFacade {
        tag: Uuid::new_v4().to_string(),
        version: FACADE_VERSION,
        kind: FacadeKind::Vault,
        id: vault.id(),
        attributes: vault.get_attributes(),
        groups,
        entries,
    }
}

/// Projects one group handle into a facade with its containing-group id.
pub fn create_group_facade(group: &Group<'_>) -> Result<GroupFacade, FacadeError> {
    let parent_id = group
        .get_parent_group()?
        .map(|parent| parent.id().to_string())
        .unwrap_or_else(|| ROOT_ID.to_string());
    Ok(GroupFacade {
        kind: FacadeKind::Group,
        id: Some(group.id().to_string()),
        title: group.get_title()?,
        attributes: group.get_attributes()?,
        parent_id,
    })
}

/// Projects one entry handle into a facade.
pub fn create_entry_facade(entry: &Entry<'_>) -> Result<EntryFacade, FacadeError> {
    let parent_id = entry.get_group()?.id().to_string();
    let mut attributes = entry.get_attributes()?;
    let entry_type = attributes
        .remove(ATTRIBUTE_ENTRY_TYPE)
        .unwrap_or_else(|| DEFAULT_ENTRY_TYPE.to_string());
    Ok(EntryFacade {
        id: Some(entry.id().to_string()),
        entry_type,
        parent_id,
        properties: entry.get_properties()?,
        meta: entry.get_metas()?,
        attributes,
    })
}

/// Applies one group facade to its matching group as key-level differences.
///
/// # Errors
/// - [`FacadeError::KindMismatch`] / [`FacadeError::IdMismatch`] when the
///   facade does not target this group.
/// - [`FacadeError::EmptyTitle`] when the incoming title is blank.
pub fn consume_group_facade(group: &Group<'_>, facade: &GroupFacade) -> Result<(), FacadeError> {
    if facade.kind != FacadeKind::Group {
        return Err(FacadeError::KindMismatch {
            expected: FacadeKind::Group,
            actual: facade.kind,
        });
    }
    if facade.id.as_deref() != Some(group.id()) {
        return Err(FacadeError::IdMismatch {
            facade_id: facade.id.clone().unwrap_or_default(),
            target_id: group.id().to_string(),
        });
    }
    if facade.title.trim().is_empty() {
        return Err(FacadeError::EmptyTitle);
    }
    if group.get_title()? != facade.title {
        group.set_title(&facade.title)?;
    }

    let existing = group.get_attributes()?;
    for name in existing.keys() {
        if !facade.attributes.contains_key(name) {
            group.delete_attribute(name)?;
        }
    }
    for (name, value) in &facade.attributes {
        if existing.get(name) != Some(value) {
            group.set_attribute(name, value)?;
        }
    }
    Ok(())
}

/// Applies one entry facade to its matching entry as key-level differences.
pub fn consume_entry_facade(entry: &Entry<'_>, facade: &EntryFacade) -> Result<(), FacadeError> {
    if facade.id.as_deref() != Some(entry.id()) {
        return Err(FacadeError::IdMismatch {
            facade_id: facade.id.clone().unwrap_or_default(),
            target_id: entry.id().to_string(),
        });
    }
    if entry.get_type()? != facade.entry_type {
        entry.set_attribute(ATTRIBUTE_ENTRY_TYPE, &facade.entry_type)?;
    }

    let properties = entry.get_properties()?;
    for key in properties.keys() {
        // The title property always exists; an absent incoming title means
        // "unchanged", not "remove".
        if key != crate::model::dataset::properties::TITLE
            && !facade.properties.contains_key(key)
        {
            entry.delete_property(key)?;
        }
    }
    for (key, value) in &facade.properties {
        if properties.get(key) != Some(value) {
            entry.set_property(key, value)?;
        }
    }

    let meta = entry.get_metas()?;
    for key in meta.keys() {
        if !facade.meta.contains_key(key) {
            entry.delete_meta(key)?;
        }
    }
    for (key, value) in &facade.meta {
        if meta.get(key) != Some(value) {
            entry.set_meta(key, value)?;
        }
    }

    let mut attributes = entry.get_attributes()?;
    attributes.remove(ATTRIBUTE_ENTRY_TYPE);
    for name in attributes.keys() {
        if !facade.attributes.contains_key(name) {
            entry.delete_attribute(name)?;
        }
    }
    for (name, value) in &facade.attributes {
        if name == ATTRIBUTE_ENTRY_TYPE {
            continue;
        }
        if attributes.get(name) != Some(value) {
            entry.set_attribute(name, value)?;
        }
    }
    Ok(())
}

fn collect_group(
    group: &RawGroup,
    parent_id: &str,
    include_trash: bool,
    groups: &mut Vec<GroupFacade>,
    entries: &mut Vec<EntryFacade>,
) {
    let is_trash =
        group.attributes.get(ATTRIBUTE_ROLE).map(String::as_str) == Some(ROLE_TRASH);
    if is_trash && !include_trash {
        return;
    }
    groups.push(GroupFacade {
        kind: FacadeKind::Group,
        id: Some(group.id.clone()),
        title: group.title.clone(),
        attributes: group.attributes.clone(),
        parent_id: parent_id.to_string(),
    });
    for entry in &group.entries {
        entries.push(raw_entry_facade(entry, &group.id));
    }
    for child in &group.groups {
        collect_group(child, &group.id, include_trash, groups, entries);
    }
}

fn raw_entry_facade(entry: &RawEntry, parent_id: &str) -> EntryFacade {
    let mut attributes: BTreeMap<String, String> = entry.attributes.clone();
    let entry_type = attributes
        .remove(ATTRIBUTE_ENTRY_TYPE)
        .unwrap_or_else(|| DEFAULT_ENTRY_TYPE.to_string());
    EntryFacade {
        id: Some(entry.id.clone()),
        entry_type,
        parent_id: parent_id.to_string(),
        properties: entry.properties.clone(),
        meta: entry.meta.clone(),
        attributes,
    }
}
