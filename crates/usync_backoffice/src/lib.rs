//! # uSync Back Office
//!
//! Handler pipeline for uSync.
//!
//! This crate provides:
//! - JSON settings for handler sets and handlers
//! - A file store for sync folders (atomic writes, tombstones, clean markers)
//! - The handler trait, the generic entity handler and the handler registry
//! - The import / export / report pipeline
//! - Stepwise runs with an action cache
//! - Suppression of host save notifications during imports
//!
//! ## Architecture
//!
//! An import runs in phases:
//! 1. Each handler imports its folder in priority order (first pass)
//! 2. Items with deferred references are imported again (second pass)
//! 3. Post import handlers retry items placed at the root
//! 4. Clean handlers delete children missing from their folders
//!
//! The same phases can be driven one handler per request through
//! [`SyncActionService`].
//!
//! ## Key Invariants
//!
//! - Handlers run in ascending priority order
//! - A failing item or handler never stops the run
//! - Host saves made by an import are never exported back
//! - A finished stepwise run leaves nothing in the cache

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod callbacks;
mod error;
mod events;
pub mod handlers;
mod service;
mod settings;
mod step;
mod store;

pub use action::{replace_actions, summarise_actions, SyncAction};
pub use callbacks::{HandlerState, SyncCallbacks, SyncOptions};
pub use error::{BackOfficeError, BackOfficeResult};
pub use events::{SuppressionGuard, SyncEventSuppressor};
pub use handlers::{default_handlers, ConfiguredHandler, EntityHandler, HandlerFactory, HandlerInfo, SyncHandler};
pub use service::{SharedSyncService, SyncPhase, SyncService, HISTORY_FOLDER};
pub use settings::{HandlerAction, HandlerOverrides, HandlerSetSettings, HandlerSettings, SyncSettings};
pub use step::{ActionCache, ActionRequest, ActionResponse, HandlerStatus, StepAction, SyncActionService};
pub use store::{safe_file_name, SyncFileStore, CLEAN_FOLDER};
