//! Materialized vault data model.
//!
//! # Responsibility
//! - Define the dataset tree derived by replaying the command journal.
//! - Keep replay deterministic: the dataset is a pure function of the
//!   command sequence.
//!
//! # Invariants
//! - Entity ids are globally unique across groups and entries.
//! - Every entry lives inside exactly one group; groups nest freely.
//! - Deletion of a key removes it entirely; empty string is a stored value.

pub mod dataset;
