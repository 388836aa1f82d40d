//! EVA Common Library
//!
//! Shared utilities for the EVA assembly ingestion tools.
//!
//! # Overview
//!
//! - **Error Handling**: [`EvaError`] and the crate [`Result`] alias
//! - **Logging**: `tracing` subscriber setup shared by every binary
//! - **Maven settings**: credential lookup from a Maven `settings.xml` profile
//!
//! # Example
//!
//! ```no_run
//! use eva_common::maven::MavenSettings;
//!
//! fn metadata_url() -> eva_common::Result<String> {
//!     let settings = MavenSettings::from_file("/home/eva/settings.xml")?;
//!     let profile = settings.profile("production_processing")?;
//!     profile.metadata_db_credentials()?.connection_url()
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod maven;

// Re-export commonly used types
pub use error::{EvaError, Result};
