//! # uSync Core
//!
//! The sync engine for CMS definitions and content.
//!
//! This crate provides:
//! - Typed entities and the host service traits they are read through
//! - Serializers between entities and their canonical XML form
//! - Schema driven change tracking for reports
//! - Data type configuration migration and child site merging
//! - Dependency discovery and ordering
//!
//! ## Architecture
//!
//! Each item type has an [`EntityMapper`](serialization::EntityMapper) that
//! knows its XML shape. [`XmlSerializer`](serialization::XmlSerializer) wraps
//! a mapper with the shared import rules: locating the existing item, parent
//! checks, tombstones, the second pass and persistence through an
//! [`EntityService`](services::EntityService).
//!
//! ## Key Invariants
//!
//! - Items are identified by key; aliases may differ between sites
//! - Serializing an unchanged item produces identical XML
//! - Change tracking never modifies either document
//! - Dependency ordering is deterministic, and cycles are reported, not looped

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod configuration;
pub mod dependency;
pub mod entity;
mod error;
pub mod model;
pub mod serialization;
pub mod services;
pub mod tracking;
mod udi;

pub use error::{CoreError, CoreResult};
pub use model::{ChangeDetailType, ChangeType, SyncAttempt, SyncChange};
pub use udi::Udi;
