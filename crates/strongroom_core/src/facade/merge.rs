//! Whole-vault facade consumption: the reconciliation/merge engine.
//!
//! # Responsibility
//! - Reconcile a live vault against an incoming facade, creating, moving,
//!   updating, and (non-merge mode) removing groups and entries.
//! - Remap ids for entities created during the call so parents created here
//!   are immediately referenceable by their children.
//!
//! # Invariants
//! - Pass order is fixed: guards, group removal, group placement, entry
//!   removal, entry placement, vault attributes.
//! - Merge mode never deletes groups or entries; reconciliation of foreign
//!   state is additive.
//! - Placement uses an explicit worklist; an iteration without progress
//!   aborts with the stuck ids. A failed consume leaves the vault in the
//!   last fully-applied state.

use crate::facade::convert::{
    consume_entry_facade, consume_group_facade, create_vault_facade, CreateVaultFacadeOptions,
};
use crate::facade::{
    EntryFacade, FacadeError, FacadeKind, GroupFacade, VaultFacade, FACADE_VERSION,
    NEW_ID_PREFIX,
};
use crate::model::dataset::ROOT_ID;
use crate::vault::{Vault, ATTRIBUTE_ATTACHMENTS_KEY, ATTRIBUTE_ROLE, ROLE_TRASH};
use log::{error, info};
use std::collections::BTreeMap;

/// Options for whole-vault facade consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeVaultFacadeOptions {
    /// Treat the facade as foreign state: no identity guard, no deletions,
    /// unresolvable ids become new entities with remapped ids.
    pub merge_mode: bool,
    /// Vault attribute keys that foreign state may not clobber (neither
    /// overwrite nor delete) while in merge mode.
    pub protected_attributes: Vec<String>,
}

impl Default for ConsumeVaultFacadeOptions {
    fn default() -> Self {
        Self {
            merge_mode: false,
            protected_attributes: vec![ATTRIBUTE_ATTACHMENTS_KEY.to_string()],
        }
    }
}

/// Reconciles `vault` to match `facade`.
///
/// In normal mode the facade is authoritative: entities absent from it are
/// deleted (softly, via Trash) and the facade identity must match the
/// vault's. In merge mode the facade is foreign: nothing is deleted and ids
/// that do not resolve locally are treated as new entities, remapped through
/// one session-local table shared by the whole call.
///
/// # Errors
/// - [`FacadeError::UnsupportedVersion`] / [`FacadeError::KindMismatch`] /
///   [`FacadeError::IdMismatch`] from the fail-fast guards.
/// - [`FacadeError::GroupsStalled`] / [`FacadeError::EntriesStalled`] when a
///   parent reference is cyclic or dangling; the vault retains every item
///   applied before the stall.
pub fn consume_vault_facade(
    vault: &Vault,
    facade: &VaultFacade,
    options: &ConsumeVaultFacadeOptions,
) -> Result<(), FacadeError> {
    if facade.version != FACADE_VERSION {
        return Err(FacadeError::UnsupportedVersion {
            expected: FACADE_VERSION,
            actual: facade.version,
        });
    }
    if facade.kind != FacadeKind::Vault {
        return Err(FacadeError::KindMismatch {
            expected: FacadeKind::Vault,
            actual: facade.kind,
        });
    }
    if !options.merge_mode && facade.id != vault.id() {
        return Err(FacadeError::IdMismatch {
            facade_id: facade.id.clone(),
            target_id: vault.id(),
        });
    }

    let current = create_vault_facade(vault, &CreateVaultFacadeOptions::default());
    let mut remap: BTreeMap<String, String> = BTreeMap::new();

    remove_missing_groups(vault, facade, &current, options.merge_mode)?;
    place_groups(vault, facade, options.merge_mode, &mut remap)?;
    remove_missing_entries(vault, facade, &current, options.merge_mode)?;
    place_entries(vault, facade, options.merge_mode, &mut remap)?;
    reconcile_vault_attributes(vault, facade, options)?;

    info!(
        "event=facade_consumed module=core status=ok vault_id={} merge_mode={} groups={} entries={} remapped={}",
        vault.id(),
        options.merge_mode,
        facade.groups.len(),
        facade.entries.len(),
        remap.len()
    );
    Ok(())
}

/// Non-merge mode only: soft-delete current groups absent from the facade.
fn remove_missing_groups(
    vault: &Vault,
    facade: &VaultFacade,
    current: &VaultFacade,
    merge_mode: bool,
) -> Result<(), FacadeError> {
    if merge_mode {
        return Ok(());
    }
    for current_group in &current.groups {
        let Some(current_id) = current_group.id.as_deref() else {
            continue;
        };
        if facade
            .groups
            .iter()
            .any(|group| group.id.as_deref() == Some(current_id))
        {
            continue;
        }
        if let Some(target) = vault.find_group_by_id(current_id) {
            target.delete(false)?;
        }
    }
    Ok(())
}

/// Worklist placement of incoming groups, to a fixed point.
fn place_groups(
    vault: &Vault,
    facade: &VaultFacade,
    merge_mode: bool,
    remap: &mut BTreeMap<String, String>,
) -> Result<(), FacadeError> {
    let mut pending: Vec<GroupFacade> = facade.groups.clone();
    while !pending.is_empty() {
        let before = pending.len();
        let mut stalled = Vec::new();

        for mut group_facade in pending {
            let treat_as_new = group_id_is_new(vault, group_facade.id.as_deref(), merge_mode);
            let parent_id = resolve_parent_id(vault, &group_facade.parent_id, merge_mode, remap);
            let parent_ready =
                parent_id == ROOT_ID || vault.find_group_by_id(&parent_id).is_some();
            if !parent_ready {
                stalled.push(group_facade);
                continue;
            }

            if treat_as_new {
                // A foreign trash-role group maps onto the local Trash; the
                // trash group is unique and never duplicated.
                if let Some(trash_id) = local_trash_target(vault, &group_facade) {
                    if let Some(declared) = group_facade.id.as_deref() {
                        if !declared.is_empty() {
                            remap.insert(declared.to_string(), trash_id.clone());
                        }
                    }
                    group_facade.id = Some(trash_id);
                } else {
                    let created_id =
                        create_group_for_facade(vault, &parent_id, &group_facade, merge_mode)?;
                    if let Some(declared) = group_facade.id.as_deref() {
                        if !declared.is_empty() && declared != created_id {
                            remap.insert(declared.to_string(), created_id.clone());
                        }
                    }
                    group_facade.id = Some(created_id);
                }
            } else {
                let id = group_facade.id.clone().unwrap_or_default();
                let group = vault
                    .find_group_by_id(&id)
                    .ok_or_else(|| FacadeError::TargetNotFound(id.clone()))?;
                let current_parent_id = group
                    .get_parent_group()?
                    .map(|parent| parent.id().to_string())
                    .unwrap_or_else(|| ROOT_ID.to_string());
                if current_parent_id != parent_id {
                    if parent_id == ROOT_ID {
                        group.move_to(vault)?;
                    } else if let Some(target) = vault.find_group_by_id(&parent_id) {
                        group.move_to(&target)?;
                    }
                }
            }

            let resolved_id = group_facade.id.clone().unwrap_or_default();
            let target = vault
                .find_group_by_id(&resolved_id)
                .ok_or_else(|| FacadeError::TargetNotFound(resolved_id.clone()))?;
            consume_group_facade(&target, &group_facade)?;
        }

        if stalled.len() == before {
            let ids: Vec<String> = stalled
                .iter()
                .map(|group| group.id.clone().unwrap_or_else(|| "<new>".to_string()))
                .collect();
            error!(
                "event=facade_stalled module=core status=error kind=group ids={}",
                ids.join(",")
            );
            return Err(FacadeError::GroupsStalled { ids });
        }
        pending = stalled;
    }
    Ok(())
}

/// Non-merge mode only: soft-delete current entries absent from the facade.
fn remove_missing_entries(
    vault: &Vault,
    facade: &VaultFacade,
    current: &VaultFacade,
    merge_mode: bool,
) -> Result<(), FacadeError> {
    if merge_mode {
        return Ok(());
    }
    for current_entry in &current.entries {
        let Some(current_id) = current_entry.id.as_deref() else {
            continue;
        };
        if facade
            .entries
            .iter()
            .any(|entry| entry.id.as_deref() == Some(current_id))
        {
            continue;
        }
        if let Some(target) = vault.find_entry_by_id(current_id) {
            target.delete(false)?;
        }
    }
    Ok(())
}

/// Single-pass placement of incoming entries.
///
/// Groups are fully resolved by this point, so one pass suffices; anything
/// still unresolvable has a dangling parent and is fatal.
fn place_entries(
    vault: &Vault,
    facade: &VaultFacade,
    merge_mode: bool,
    remap: &mut BTreeMap<String, String>,
) -> Result<(), FacadeError> {
    let mut stalled: Vec<String> = Vec::new();

    for mut entry_facade in facade.entries.iter().cloned() {
        let treat_as_new = entry_id_is_new(vault, entry_facade.id.as_deref(), merge_mode);
        let parent_id = resolve_parent_id(vault, &entry_facade.parent_id, merge_mode, remap);

        if treat_as_new {
            let Some(parent) = vault.find_group_by_id(&parent_id) else {
                stalled.push(stall_label(&entry_facade));
                continue;
            };
            let created_id = match preserved_id(entry_facade.id.as_deref(), merge_mode) {
                Some(declared) => vault
                    .create_entry_with_id(parent.id(), declared)?
                    .id()
                    .to_string(),
                None => parent.create_entry(None)?.id().to_string(),
            };
            if let Some(declared) = entry_facade.id.as_deref() {
                if !declared.is_empty() && declared != created_id {
                    remap.insert(declared.to_string(), created_id.clone());
                }
            }
            entry_facade.id = Some(created_id);
        } else {
            let id = entry_facade.id.clone().unwrap_or_default();
            let entry = vault
                .find_entry_by_id(&id)
                .ok_or_else(|| FacadeError::TargetNotFound(id.clone()))?;
            if entry.get_group()?.id() != parent_id {
                let Some(target) = vault.find_group_by_id(&parent_id) else {
                    stalled.push(stall_label(&entry_facade));
                    continue;
                };
                entry.move_to_group(&target)?;
            }
        }

        let resolved_id = entry_facade.id.clone().unwrap_or_default();
        let target = vault
            .find_entry_by_id(&resolved_id)
            .ok_or_else(|| FacadeError::TargetNotFound(resolved_id.clone()))?;
        consume_entry_facade(&target, &entry_facade)?;
    }

    if !stalled.is_empty() {
        error!(
            "event=facade_stalled module=core status=error kind=entry ids={}",
            stalled.join(",")
        );
        return Err(FacadeError::EntriesStalled { ids: stalled });
    }
    Ok(())
}

/// Symmetric set-difference apply over vault-level attributes.
fn reconcile_vault_attributes(
    vault: &Vault,
    facade: &VaultFacade,
    options: &ConsumeVaultFacadeOptions,
) -> Result<(), FacadeError> {
    let protected = |name: &str| {
        options.merge_mode
            && options
                .protected_attributes
                .iter()
                .any(|key| key == name)
    };

    let current = vault.get_attributes();
    for name in current.keys() {
        if !facade.attributes.contains_key(name) && !protected(name) {
            vault.delete_attribute(name)?;
        }
    }
    for (name, value) in &facade.attributes {
        if protected(name) {
            continue;
        }
        if current.get(name) != Some(value) {
            vault.set_attribute(name, value)?;
        }
    }
    Ok(())
}

/// Creates the group for a to-be-created facade, preserving a concrete
/// foreign id in merge mode so re-consuming the same facade resolves it.
fn create_group_for_facade(
    vault: &Vault,
    parent_id: &str,
    facade: &GroupFacade,
    merge_mode: bool,
) -> Result<String, FacadeError> {
    let title = Some(facade.title.as_str());
    let created = match preserved_id(facade.id.as_deref(), merge_mode) {
        Some(declared) => vault.create_group_with_id(parent_id, declared, title)?,
        None if parent_id == ROOT_ID => vault.create_group(title)?,
        None => match vault.find_group_by_id(parent_id) {
            Some(parent) => parent.create_group(title)?,
            None => return Err(FacadeError::TargetNotFound(parent_id.to_string())),
        },
    };
    Ok(created.id().to_string())
}

/// Returns the declared id when it must survive creation verbatim.
///
/// Only concrete foreign ids in merge mode qualify; empty ids and `new`
/// sentinels always get generated ids.
fn preserved_id(id: Option<&str>, merge_mode: bool) -> Option<&str> {
    match id {
        Some(id) if merge_mode && !id.is_empty() && !id.starts_with(NEW_ID_PREFIX) => Some(id),
        _ => None,
    }
}

/// Local trash id when the incoming group carries the trash role.
fn local_trash_target(vault: &Vault, facade: &GroupFacade) -> Option<String> {
    let role = facade.attributes.get(ATTRIBUTE_ROLE).map(String::as_str);
    if role != Some(ROLE_TRASH) {
        return None;
    }
    vault
        .get_trash_group()
        .ok()
        .map(|trash| trash.id().to_string())
}

/// Returns whether a declared group id marks a to-be-created group.
fn group_id_is_new(vault: &Vault, id: Option<&str>, merge_mode: bool) -> bool {
    match id {
        None => true,
        Some(id) if id.is_empty() || id.starts_with(NEW_ID_PREFIX) => true,
        Some(id) if merge_mode => vault.find_group_by_id(id).is_none(),
        Some(_) => false,
    }
}

/// Returns whether a declared entry id marks a to-be-created entry.
fn entry_id_is_new(vault: &Vault, id: Option<&str>, merge_mode: bool) -> bool {
    match id {
        None => true,
        Some(id) if id.is_empty() || id.starts_with(NEW_ID_PREFIX) => true,
        Some(id) if merge_mode => vault.find_entry_by_id(id).is_none(),
        Some(_) => false,
    }
}

/// Maps a declared parent id through the session remap table when it names
/// a group created during this call.
fn resolve_parent_id(
    vault: &Vault,
    declared: &str,
    merge_mode: bool,
    remap: &BTreeMap<String, String>,
) -> String {
    if declared == ROOT_ID {
        return declared.to_string();
    }
    let unresolved = declared.is_empty()
        || declared.starts_with(NEW_ID_PREFIX)
        || (merge_mode && vault.find_group_by_id(declared).is_none());
    if unresolved {
        if let Some(mapped) = remap.get(declared) {
            return mapped.clone();
        }
    }
    declared.to_string()
}

fn stall_label(entry: &EntryFacade) -> String {
    entry.id.clone().unwrap_or_else(|| "<new>".to_string())
}
