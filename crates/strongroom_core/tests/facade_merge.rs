use strongroom_core::{
    consume_vault_facade, create_vault_facade, ConsumeVaultFacadeOptions,
    CreateVaultFacadeOptions, EntryFacade, FacadeError, FacadeKind, GroupFacade, Vault,
    ATTRIBUTE_ATTACHMENTS_KEY, ROOT_ID,
};

fn merge_options() -> ConsumeVaultFacadeOptions {
    ConsumeVaultFacadeOptions {
        merge_mode: true,
        ..ConsumeVaultFacadeOptions::default()
    }
}

#[test]
fn edited_facade_applies_renames_and_creates_sentinel_groups() {
    let vault = Vault::create().unwrap();
    let logins = vault.create_group(Some("Logins")).unwrap();
    let entry = logins.create_entry(Some("Bank")).unwrap();

    let mut facade = create_vault_facade(&vault, &CreateVaultFacadeOptions::default());
    let entry_facade = facade
        .entries
        .iter_mut()
        .find(|candidate| candidate.id.as_deref() == Some(entry.id()))
        .expect("entry projected");
    entry_facade
        .properties
        .insert("title".to_string(), "Bank2".to_string());
    facade.groups.push(GroupFacade {
        kind: FacadeKind::Group,
        id: Some("new-123".to_string()),
        title: "Extra".to_string(),
        attributes: Default::default(),
        parent_id: ROOT_ID.to_string(),
    });

    consume_vault_facade(&vault, &facade, &ConsumeVaultFacadeOptions::default()).unwrap();

    assert_eq!(entry.get_title().unwrap(), "Bank2");
    let extra = vault
        .get_groups()
        .into_iter()
        .find(|group| group.get_title().unwrap() == "Extra")
        .expect("sentinel group created");
    // sentinel ids never survive creation
    assert_ne!(extra.id(), "new-123");
}

#[test]
fn merge_is_additive_and_preserves_foreign_ids() {
    let local = Vault::create().unwrap();
    let personal = local.create_group(Some("Personal")).unwrap();
    let kept = personal.create_entry(Some("Diary")).unwrap();

    // two independent histories of the same vault identity
    let foreign = Vault::create_with_id(&local.id()).unwrap();
    let work = foreign.create_group(Some("Work")).unwrap();
    let badge = work.create_entry(Some("Badge")).unwrap();
    badge.set_property("username", "carol").unwrap();

    let facade = create_vault_facade(&foreign, &CreateVaultFacadeOptions::default());
    consume_vault_facade(&local, &facade, &merge_options()).unwrap();

    // nothing local was deleted
    assert!(local.find_group_by_id(personal.id()).is_some());
    assert!(local.find_entry_by_id(kept.id()).is_some());

    // foreign entities arrive under their original ids
    let merged_group = local
        .find_group_by_id(work.id())
        .expect("foreign group merged");
    assert_eq!(merged_group.get_title().unwrap(), "Work");
    let merged_entry = local
        .find_entry_by_id(badge.id())
        .expect("foreign entry merged");
    assert_eq!(
        merged_entry.get_property("username").unwrap().as_deref(),
        Some("carol")
    );
    assert_eq!(merged_entry.get_group().unwrap().id(), work.id());

    // both histories brought a trash group; only one survives
    let trash_count = local
        .get_groups()
        .iter()
        .filter(|group| group.is_trash().unwrap())
        .count();
    assert_eq!(trash_count, 1);
}

#[test]
fn merging_the_same_foreign_facade_twice_changes_nothing() {
    let local = Vault::create().unwrap();
    local.create_group(Some("Personal")).unwrap();

    let foreign = Vault::create().unwrap();
    let work = foreign.create_group(Some("Work")).unwrap();
    work.create_entry(Some("Badge")).unwrap();
    let facade = create_vault_facade(&foreign, &CreateVaultFacadeOptions::default());

    consume_vault_facade(&local, &facade, &merge_options()).unwrap();
    let first = create_vault_facade(&local, &CreateVaultFacadeOptions::default());
    consume_vault_facade(&local, &facade, &merge_options()).unwrap();
    let second = create_vault_facade(&local, &CreateVaultFacadeOptions::default());

    assert_eq!(first.groups, second.groups);
    assert_eq!(first.entries, second.entries);
}

#[test]
fn foreign_trash_maps_onto_the_local_trash() {
    let local = Vault::create().unwrap();

    let foreign = Vault::create().unwrap();
    let group = foreign.create_group(Some("Old")).unwrap();
    let discarded = group.create_entry(Some("Stale")).unwrap();
    assert!(!discarded.delete(false).unwrap());

    let facade = create_vault_facade(&foreign, &CreateVaultFacadeOptions::default());
    consume_vault_facade(&local, &facade, &merge_options()).unwrap();

    let trash_count = local
        .get_groups()
        .iter()
        .filter(|group| group.is_trash().unwrap())
        .count();
    assert_eq!(trash_count, 1);

    let merged = local
        .find_entry_by_id(discarded.id())
        .expect("trashed entry merged");
    assert!(merged.is_in_trash().unwrap());
}

#[test]
fn dangling_group_parent_stalls_the_consume() {
    let vault = Vault::create().unwrap();
    let mut facade = create_vault_facade(&vault, &CreateVaultFacadeOptions::default());
    facade.groups.push(GroupFacade {
        kind: FacadeKind::Group,
        id: Some("new-9".to_string()),
        title: "Orphan".to_string(),
        attributes: Default::default(),
        parent_id: "ghost-parent".to_string(),
    });

    assert_eq!(
        consume_vault_facade(&vault, &facade, &ConsumeVaultFacadeOptions::default()),
        Err(FacadeError::GroupsStalled {
            ids: vec!["new-9".to_string()],
        })
    );
}

#[test]
fn dangling_entry_parent_stalls_the_consume() {
    let vault = Vault::create().unwrap();
    let mut facade = create_vault_facade(&vault, &CreateVaultFacadeOptions::default());
    facade.entries.push(EntryFacade {
        id: None,
        entry_type: "login".to_string(),
        parent_id: "ghost-parent".to_string(),
        properties: Default::default(),
        meta: Default::default(),
        attributes: Default::default(),
    });

    assert_eq!(
        consume_vault_facade(&vault, &facade, &ConsumeVaultFacadeOptions::default()),
        Err(FacadeError::EntriesStalled {
            ids: vec!["<new>".to_string()],
        })
    );
}

#[test]
fn merge_shields_protected_vault_attributes() {
    let local = Vault::create().unwrap();
    local
        .set_attribute(ATTRIBUTE_ATTACHMENTS_KEY, "local-key")
        .unwrap();

    let foreign = Vault::create().unwrap();
    foreign
        .set_attribute(ATTRIBUTE_ATTACHMENTS_KEY, "foreign-key")
        .unwrap();
    foreign.set_attribute("color", "red").unwrap();
    let facade = create_vault_facade(&foreign, &CreateVaultFacadeOptions::default());

    consume_vault_facade(&local, &facade, &merge_options()).unwrap();
    assert_eq!(
        local.get_attribute(ATTRIBUTE_ATTACHMENTS_KEY).as_deref(),
        Some("local-key")
    );
    assert_eq!(local.get_attribute("color").as_deref(), Some("red"));
}

#[test]
fn merge_never_deletes_protected_vault_attributes() {
    let local = Vault::create().unwrap();
    local
        .set_attribute(ATTRIBUTE_ATTACHMENTS_KEY, "local-key")
        .unwrap();

    // foreign facade carries no attributes at all
    let foreign = Vault::create().unwrap();
    let facade = create_vault_facade(&foreign, &CreateVaultFacadeOptions::default());

    consume_vault_facade(&local, &facade, &merge_options()).unwrap();
    assert_eq!(
        local.get_attribute(ATTRIBUTE_ATTACHMENTS_KEY).as_deref(),
        Some("local-key")
    );
}

#[test]
fn non_merge_consume_overwrites_attachment_keys() {
    let vault = Vault::create().unwrap();
    vault
        .set_attribute(ATTRIBUTE_ATTACHMENTS_KEY, "old-key")
        .unwrap();

    let mut facade = create_vault_facade(&vault, &CreateVaultFacadeOptions::default());
    facade.attributes.insert(
        ATTRIBUTE_ATTACHMENTS_KEY.to_string(),
        "rotated-key".to_string(),
    );

    consume_vault_facade(&vault, &facade, &ConsumeVaultFacadeOptions::default()).unwrap();
    assert_eq!(
        vault.get_attribute(ATTRIBUTE_ATTACHMENTS_KEY).as_deref(),
        Some("rotated-key")
    );
}
