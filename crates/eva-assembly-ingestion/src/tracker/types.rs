//! Tracking table row types

use chrono::NaiveDateTime;
use eva_common::EvaError;
use serde::{Deserialize, Serialize};

/// Fully qualified name of the tracking table
pub const TRACKING_TABLE: &str = "eva_progress_tracker.remapping_tracker";

/// Remapping status of a tracker row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemappingStatus {
    Pending,
    Started,
    Completed,
    Failed,
}

impl RemappingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemappingStatus::Pending => "Pending",
            RemappingStatus::Started => "Started",
            RemappingStatus::Completed => "Completed",
            RemappingStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for RemappingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RemappingStatus {
    type Err = EvaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(RemappingStatus::Pending),
            "Started" => Ok(RemappingStatus::Started),
            "Completed" => Ok(RemappingStatus::Completed),
            "Failed" => Ok(RemappingStatus::Failed),
            other => Err(EvaError::parse(format!("Unknown remapping status '{other}'"))),
        }
    }
}

/// Where the submitted variants of a source assembly come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariantSource {
    Eva,
    Dbsnp,
}

impl VariantSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantSource::Eva => "EVA",
            VariantSource::Dbsnp => "DBSNP",
        }
    }
}

impl std::fmt::Display for VariantSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VariantSource {
    type Err = EvaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EVA" => Ok(VariantSource::Eva),
            "DBSNP" => Ok(VariantSource::Dbsnp),
            other => Err(EvaError::parse(format!("Unknown variant source '{other}'"))),
        }
    }
}

/// One row of the tracking table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerRow {
    pub source: VariantSource,
    pub taxonomy: i32,
    pub scientific_name: Option<String>,
    pub origin_assembly_accession: String,
    /// Target assembly
    pub assembly_accession: String,
    pub release_version: i32,
    pub num_studies: i32,
    /// `None` when the row was created outside this tool without a status
    pub remapping_status: Option<RemappingStatus>,
    pub num_ss_extracted: Option<i64>,
    pub num_ss_remapped: Option<i64>,
    pub num_ss_ingested: Option<i64>,
    pub remapping_start: Option<NaiveDateTime>,
    pub remapping_end: Option<NaiveDateTime>,
}

impl TrackerRow {
    /// A freshly loaded row, waiting for `remap_cluster`
    pub fn pending(
        source: VariantSource,
        taxonomy: i32,
        scientific_name: Option<String>,
        origin_assembly_accession: impl Into<String>,
        assembly_accession: impl Into<String>,
        release_version: i32,
        num_studies: i32,
    ) -> Self {
        Self {
            source,
            taxonomy,
            scientific_name,
            origin_assembly_accession: origin_assembly_accession.into(),
            assembly_accession: assembly_accession.into(),
            release_version,
            num_studies,
            remapping_status: Some(RemappingStatus::Pending),
            num_ss_extracted: None,
            num_ss_remapped: None,
            num_ss_ingested: None,
            remapping_start: None,
            remapping_end: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.remapping_status == Some(RemappingStatus::Completed)
    }

    pub fn key(&self) -> TrackerKey {
        TrackerKey {
            release_version: self.release_version,
            taxonomy: self.taxonomy,
            origin_assembly_accession: self.origin_assembly_accession.clone(),
            assembly_accession: self.assembly_accession.clone(),
        }
    }
}

/// Identifies the rows of one (release, taxonomy, origin, target) combination.
/// Status updates apply to every source under the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackerKey {
    pub release_version: i32,
    pub taxonomy: i32,
    pub origin_assembly_accession: String,
    pub assembly_accession: String,
}

/// Source assembly listed for dbSNP in an earlier release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbsnpSourceAssembly {
    pub origin_assembly_accession: String,
    pub taxonomy: i32,
    pub num_studies: i32,
}

/// Counts to record on a row; `None` leaves the column untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountUpdate {
    pub extracted: Option<i64>,
    pub remapped: Option<i64>,
    pub ingested: Option<i64>,
}

impl CountUpdate {
    pub fn is_empty(&self) -> bool {
        self.extracted.is_none() && self.remapped.is_none() && self.ingested.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            RemappingStatus::Pending,
            RemappingStatus::Started,
            RemappingStatus::Completed,
            RemappingStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<RemappingStatus>().unwrap(), status);
        }
        assert!("completed".parse::<RemappingStatus>().is_err());
    }

    #[test]
    fn test_source_strings() {
        assert_eq!(VariantSource::Eva.to_string(), "EVA");
        assert_eq!("DBSNP".parse::<VariantSource>().unwrap(), VariantSource::Dbsnp);
        assert!("dbSNP".parse::<VariantSource>().is_err());
    }

    #[test]
    fn test_pending_row() {
        let row = TrackerRow::pending(
            VariantSource::Eva,
            9606,
            Some("Homo sapiens".to_string()),
            "GCA_000001405.1",
            "GCA_000001405.15",
            5,
            12,
        );
        assert_eq!(row.remapping_status, Some(RemappingStatus::Pending));
        assert!(!row.is_completed());
        assert_eq!(row.key().taxonomy, 9606);
        assert_eq!(row.key().assembly_accession, "GCA_000001405.15");
    }

    #[test]
    fn test_count_update_empty() {
        assert!(CountUpdate::default().is_empty());
        assert!(!CountUpdate {
            remapped: Some(0),
            ..Default::default()
        }
        .is_empty());
    }
}
