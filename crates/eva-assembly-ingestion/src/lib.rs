//! EVA assembly ingestion
//!
//! Tracks, remaps and re-clusters submitted variants when the reference
//! assembly of a species changes, then records the new assembly in the
//! downstream stores.
//!
//! # Overview
//!
//! - **Tracker**: job status per source assembly in `eva_progress_tracker.remapping_tracker`
//! - **Job**: `load_tracker`, `remap_cluster` and `update_dbs` (`add_target_assembly`)
//! - **Counts**: variant counts scraped from the pipeline logs
//! - **Target tracker**: supported assembly drift against Ensembl (`genome_target_tracker`)

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod config;
pub mod contig_alias;
pub mod counts;
pub mod db;
pub mod error;
pub mod job;
pub mod metadata;
pub mod pipeline;
pub mod properties;
pub mod report;
pub mod target_tracker;
pub mod taxonomy;
pub mod tracker;

pub use config::AssemblyConfig;
pub use error::{IngestError, Result};
pub use job::{AssemblyIngestionJob, JobServices, Task};
