//! Flat, versioned vault snapshots ("facades") for sync, diffing, and merge.
//!
//! # Responsibility
//! - Define the serializable snapshot schema shared with external editors.
//! - Gate consumption on the facade version constant.
//!
//! # Invariants
//! - The JSON field names (`_tag`, `_ver`, `type`, `parentID`) are the wire
//!   contract and never change shape silently; `_ver` bumps instead.
//! - Facade schemas are closed: free-form keys live in typed maps, never in
//!   open dictionaries.

pub mod convert;
pub mod merge;

use crate::vault::VaultError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Current facade schema version; consumption of any other version fails.
pub const FACADE_VERSION: u32 = 2;

/// Sentinel id prefix editors assign to not-yet-created entities.
pub const NEW_ID_PREFIX: &str = "new";

/// Discriminator for facade payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacadeKind {
    Vault,
    Group,
    Entry,
}

impl Display for FacadeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vault => write!(f, "vault"),
            Self::Group => write!(f, "group"),
            Self::Entry => write!(f, "entry"),
        }
    }
}

/// Flat snapshot of one whole vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultFacade {
    /// Opaque snapshot tag, unique per projection.
    #[serde(rename = "_tag")]
    pub tag: String,
    /// Facade schema version; must equal [`FACADE_VERSION`] to consume.
    #[serde(rename = "_ver")]
    pub version: u32,
    /// Always [`FacadeKind::Vault`].
    #[serde(rename = "type")]
    pub kind: FacadeKind,
    /// Stable vault identity.
    pub id: String,
    /// Vault-level attributes.
    pub attributes: BTreeMap<String, String>,
    /// Every group in the vault, flattened, parents before or after children
    /// in no guaranteed order.
    pub groups: Vec<GroupFacade>,
    /// Every entry in the vault, flattened.
    pub entries: Vec<EntryFacade>,
}

/// Flat snapshot of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFacade {
    /// Always [`FacadeKind::Group`].
    #[serde(rename = "type")]
    pub kind: FacadeKind,
    /// Group id; `None` or a `new`-prefixed sentinel marks a group that must
    /// be created on consume.
    pub id: Option<String>,
    /// Group title; consumption rejects blank titles.
    pub title: String,
    /// Group attributes.
    pub attributes: BTreeMap<String, String>,
    /// Containing group id, `"0"` for top-level groups.
    #[serde(rename = "parentID")]
    pub parent_id: String,
}

/// Flat snapshot of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFacade {
    /// Entry id; `None` or a `new`-prefixed sentinel marks an entry that
    /// must be created on consume.
    pub id: Option<String>,
    /// Entry class (`login`, `note`, ...), not a facade discriminator.
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Containing group id.
    #[serde(rename = "parentID")]
    pub parent_id: String,
    /// Schema-relevant values.
    pub properties: BTreeMap<String, String>,
    /// Free-form values.
    pub meta: BTreeMap<String, String>,
    /// Engine-facing markers, excluding the entry class.
    pub attributes: BTreeMap<String, String>,
}

/// Errors from facade projection and consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacadeError {
    /// Facade `_ver` does not match [`FACADE_VERSION`].
    UnsupportedVersion { expected: u32, actual: u32 },
    /// Facade `type` does not match the consuming target.
    KindMismatch {
        expected: FacadeKind,
        actual: FacadeKind,
    },
    /// Facade id does not match the consuming target's id.
    IdMismatch { facade_id: String, target_id: String },
    /// Group facade title is blank.
    EmptyTitle,
    /// Facade references an id that no longer resolves in the vault.
    TargetNotFound(String),
    /// Group placement made no progress; the named ids are unresolvable.
    GroupsStalled { ids: Vec<String> },
    /// Entry placement left unresolvable entries behind.
    EntriesStalled { ids: Vec<String> },
    /// Domain model failure while applying the facade.
    Vault(VaultError),
}

impl Display for FacadeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedVersion { expected, actual } => write!(
                f,
                "facade version {actual} is not consumable; engine expects {expected}"
            ),
            Self::KindMismatch { expected, actual } => {
                write!(f, "facade type `{actual}` does not target a {expected}")
            }
            Self::IdMismatch {
                facade_id,
                target_id,
            } => write!(
                f,
                "facade id {facade_id} does not match target id {target_id}"
            ),
            Self::EmptyTitle => write!(f, "group facade title must not be blank"),
            Self::TargetNotFound(id) => write!(f, "facade target not found: {id}"),
            Self::GroupsStalled { ids } => write!(
                f,
                "facade processing stalled; groups not resolvable: {}",
                ids.join(", ")
            ),
            Self::EntriesStalled { ids } => write!(
                f,
                "facade processing stalled; entries not resolvable: {}",
                ids.join(", ")
            ),
            Self::Vault(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FacadeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Vault(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VaultError> for FacadeError {
    fn from(value: VaultError) -> Self {
        Self::Vault(value)
    }
}
