use strongroom_core::{
    ApplyError, JournalError, Vault, VaultError, DEFAULT_ENTRY_TYPE,
};

#[test]
fn groups_and_entries_are_created_and_found_by_id() {
    let vault = Vault::create().unwrap();
    let logins = vault.create_group(Some("Logins")).unwrap();
    let nested = logins.create_group(Some("Banking")).unwrap();
    let entry = nested.create_entry(Some("Bank")).unwrap();

    assert_eq!(
        vault.find_group_by_id(nested.id()).expect("group resolves").get_title().unwrap(),
        "Banking"
    );
    assert_eq!(
        vault.find_entry_by_id(entry.id()).expect("entry resolves").get_title().unwrap(),
        "Bank"
    );
    // subtree-scoped lookup: the entry lives under Logins, not under Trash
    assert!(logins.find_entry_by_id(entry.id()).is_some());
    assert!(vault.get_trash_group().unwrap().find_entry_by_id(entry.id()).is_none());
}

#[test]
fn titleless_group_and_entry_read_back_as_empty_strings() {
    let vault = Vault::create().unwrap();
    let group = vault.create_group(None).unwrap();
    let entry = group.create_entry(None).unwrap();
    assert_eq!(group.get_title().unwrap(), "");
    assert_eq!(entry.get_title().unwrap(), "");
    assert_eq!(entry.get_type().unwrap(), DEFAULT_ENTRY_TYPE);
}

#[test]
fn entry_mutators_chain() {
    let vault = Vault::create().unwrap();
    let group = vault.create_group(Some("Logins")).unwrap();
    let entry = group.create_entry(Some("Bank")).unwrap();

    entry
        .set_property("username", "alice")
        .unwrap()
        .set_property("password", "s3cret")
        .unwrap()
        .set_meta("favourite", "yes")
        .unwrap()
        .set_attribute("sr_entry_type", "note")
        .unwrap();

    assert_eq!(entry.get_property("username").unwrap().as_deref(), Some("alice"));
    assert_eq!(entry.get_meta("favourite").unwrap().as_deref(), Some("yes"));
    assert_eq!(entry.get_type().unwrap(), "note");
}

#[test]
fn deleting_a_key_differs_from_storing_an_empty_value() {
    let vault = Vault::create().unwrap();
    let group = vault.create_group(Some("Logins")).unwrap();
    let entry = group.create_entry(Some("Bank")).unwrap();

    entry.set_attribute("color", "").unwrap();
    assert_eq!(entry.get_attribute("color").unwrap().as_deref(), Some(""));
    entry.delete_attribute("color").unwrap();
    assert_eq!(entry.get_attribute("color").unwrap(), None);

    entry.set_meta("tag", "").unwrap();
    assert_eq!(entry.get_meta("tag").unwrap().as_deref(), Some(""));
    entry.delete_meta("tag").unwrap();
    assert_eq!(entry.get_meta("tag").unwrap(), None);

    group.set_attribute("icon", "").unwrap();
    assert_eq!(group.get_attribute("icon").unwrap().as_deref(), Some(""));
    group.delete_attribute("icon").unwrap();
    assert_eq!(group.get_attribute("icon").unwrap(), None);

    vault.set_attribute("region", "").unwrap();
    assert_eq!(vault.get_attribute("region").as_deref(), Some(""));
    vault.delete_attribute("region").unwrap();
    assert_eq!(vault.get_attribute("region"), None);
}

#[test]
fn soft_delete_moves_into_trash_and_second_delete_purges() {
    let vault = Vault::create().unwrap();
    let group = vault.create_group(Some("Old")).unwrap();
    let entry = group.create_entry(Some("Stale")).unwrap();

    assert!(!entry.delete(false).unwrap());
    assert!(entry.is_in_trash().unwrap());
    assert!(entry.delete(false).unwrap());
    assert!(vault.find_entry_by_id(entry.id()).is_none());

    assert!(!group.delete(false).unwrap());
    assert!(group.is_in_trash().unwrap());
    assert!(group.delete(false).unwrap());
    assert!(vault.find_group_by_id(group.id()).is_none());
}

#[test]
fn forced_delete_removes_the_whole_subtree() {
    let vault = Vault::create().unwrap();
    let group = vault.create_group(Some("Old")).unwrap();
    let child = group.create_group(Some("Nested")).unwrap();
    let entry = child.create_entry(Some("Stale")).unwrap();

    assert!(group.delete(true).unwrap());
    assert!(vault.find_group_by_id(child.id()).is_none());
    assert!(vault.find_entry_by_id(entry.id()).is_none());
}

#[test]
fn trash_group_refuses_deletion() {
    let vault = Vault::create().unwrap();
    let trash = vault.get_trash_group().unwrap();
    assert_eq!(trash.delete(false), Err(VaultError::CannotDeleteTrash));
    assert_eq!(trash.delete(true), Err(VaultError::CannotDeleteTrash));
}

#[test]
fn stale_handles_fail_with_not_found() {
    let vault = Vault::create().unwrap();
    let group = vault.create_group(Some("Old")).unwrap();
    let entry = group.create_entry(Some("Stale")).unwrap();
    group.delete(true).unwrap();

    assert_eq!(
        group.set_title("Renamed").err(),
        Some(VaultError::GroupNotFound(group.id().to_string()))
    );
    assert_eq!(
        entry.set_property("username", "alice").err(),
        Some(VaultError::EntryNotFound(entry.id().to_string()))
    );
}

#[test]
fn groups_move_between_containers_and_report_parents() {
    let vault = Vault::create().unwrap();
    let a = vault.create_group(Some("A")).unwrap();
    let b = vault.create_group(Some("B")).unwrap();

    b.move_to(&a).unwrap();
    assert_eq!(
        b.get_parent_group().unwrap().expect("nested").id(),
        a.id()
    );

    b.move_to(&vault).unwrap();
    assert!(b.get_parent_group().unwrap().is_none());
}

#[test]
fn cyclic_group_move_is_rejected() {
    let vault = Vault::create().unwrap();
    let outer = vault.create_group(Some("Outer")).unwrap();
    let inner = outer.create_group(Some("Inner")).unwrap();

    let err = outer.move_to(&inner).expect_err("cycle must be rejected");
    assert_eq!(
        err,
        VaultError::Journal(JournalError::Apply(ApplyError::CyclicMove {
            group_id: outer.id().to_string(),
            target_id: inner.id().to_string(),
        }))
    );
    // the failed command must not have been journaled
    let restored = Vault::from_source(&vault.to_source()).unwrap();
    assert!(restored.find_group_by_id(inner.id()).is_some());
}

#[test]
fn entries_move_between_groups() {
    let vault = Vault::create().unwrap();
    let a = vault.create_group(Some("A")).unwrap();
    let b = vault.create_group(Some("B")).unwrap();
    let entry = a.create_entry(Some("Bank")).unwrap();

    entry.move_to_group(&b).unwrap();
    assert_eq!(entry.get_group().unwrap().id(), b.id());
    assert!(a.get_entries().unwrap().is_empty());
}
