//! # uSync Testkit
//!
//! Test utilities for uSync.
//!
//! This crate provides:
//! - A populated in-memory site with a temporary sync folder
//! - Property-based test generators using proptest
//! - XML fixtures for sync files
//!
//! ## Usage
//!
//! ```rust,ignore
//! use usync_testkit::prelude::*;
//!
//! #[test]
//! fn export_site() {
//!     let site = TestSite::populated();
//!     // ... run handlers against site.services and site.folder()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
