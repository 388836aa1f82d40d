//! Remapping tracking table
//!
//! One row per (release, taxonomy, source assembly, variant source, target
//! assembly). Rows are created `Pending` by `load_tracker` and moved through
//! `Started` to `Completed` or `Failed` by `remap_cluster`.

pub mod store;
pub mod types;

pub use store::{PgTrackerStore, TrackerStore};
pub use types::{
    CountUpdate, DbsnpSourceAssembly, RemappingStatus, TrackerKey, TrackerRow, VariantSource,
    TRACKING_TABLE,
};
