//! Core data engine for the Strongroom credential vault.
//!
//! Every mutation is recorded as an append-only, replayable command journal;
//! the group/entry tree is materialized by replay and read through
//! ID-addressed handles. Facade snapshots provide the flat, versioned view
//! used for offline edit, diffing, and cross-origin merge.
//!
//! This crate is the single source of truth for vault invariants. It knows
//! nothing about files, encryption, or transport; persistence sees only
//! journal source text.

pub mod command;
pub mod facade;
pub mod journal;
pub mod logging;
pub mod model;
pub mod vault;

pub use command::{Command, CommandError, OperationKind};
pub use facade::convert::{
    consume_entry_facade, consume_group_facade, create_entry_facade, create_group_facade,
    create_vault_facade, CreateVaultFacadeOptions,
};
pub use facade::merge::{consume_vault_facade, ConsumeVaultFacadeOptions};
pub use facade::{
    EntryFacade, FacadeError, FacadeKind, GroupFacade, VaultFacade, FACADE_VERSION,
};
pub use journal::{Journal, JournalError, JournalResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::dataset::{ApplyError, Dataset, RawEntry, RawGroup, ROOT_ID};
pub use vault::{
    Entry, Group, GroupContainer, Vault, VaultError, VaultResult, ATTRIBUTE_ATTACHMENTS_KEY,
    ATTRIBUTE_ENTRY_TYPE, ATTRIBUTE_ROLE, DEFAULT_ENTRY_TYPE, FORMAT_TAG, ROLE_TRASH,
    TRASH_TITLE,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
