//! EVA metadata database access
//!
//! Covers the project metadata used to build tracker rows and the three
//! downstream updates made once every assembly of a job has completed:
//!
//! - `add_to_supported_assemblies()` - flip the current supported assembly of a taxonomy
//! - `MetadataStore::insert_assembly_and_taxonomy()` - register the assembly in general metadata
//! - `crate::contig_alias::ContigAliasClient::insert_assembly()` - register with contig-alias

pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;

pub use postgres::PgMetadataStore;

pub const SUPPORTED_ASSEMBLY_TABLE: &str = "evapro.supported_assembly_tracker";

// ============================================================================
// Types
// ============================================================================

/// A reference assembly used by public projects of one taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAssemblyProjects {
    pub assembly_accession: String,
    pub taxonomy: i32,
    pub project_accessions: Vec<String>,
}

/// Current row of the supported assembly history for a taxonomy
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SupportedAssembly {
    pub taxonomy_id: i32,
    /// Who chose this assembly, e.g. "Ensembl"
    pub source: String,
    pub assembly_id: String,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Taxonomies whose current supported assembly is the same as `taxonomy`'s
    async fn taxonomies_sharing_current_assembly(&self, taxonomy: i32) -> Result<Vec<i32>>;

    /// Reference assemblies of public, visible projects for these taxonomies
    async fn source_assemblies_and_projects(
        &self,
        taxonomies: &[i32],
    ) -> Result<Vec<SourceAssemblyProjects>>;

    async fn current_supported_assembly(&self, taxonomy: i32) -> Result<Option<String>>;

    /// End the current supported assembly of `taxonomy` on `today` and make
    /// `target_assembly` current
    async fn replace_current_supported_assembly(
        &self,
        taxonomy: i32,
        source_of_assembly: &str,
        target_assembly: &str,
        today: NaiveDate,
    ) -> Result<()>;

    /// Record the assembly and taxonomy in general metadata. No-op for pairs already present.
    async fn insert_assembly_and_taxonomy(
        &self,
        assembly_accession: &str,
        taxonomy: i32,
        scientific_name: Option<&str>,
    ) -> Result<()>;

    /// Every taxonomy known to EVA
    async fn all_taxonomies(&self) -> Result<Vec<i32>>;

    /// Current supported assembly of every tracked taxonomy
    async fn current_supported_assemblies(&self) -> Result<Vec<SupportedAssembly>>;
}

/// Make `target_assembly` the current supported assembly of `taxonomy`.
///
/// Returns false when it already was, in which case the history is left alone.
pub async fn add_to_supported_assemblies(
    store: &dyn MetadataStore,
    taxonomy: i32,
    source_of_assembly: &str,
    target_assembly: &str,
    today: NaiveDate,
) -> Result<bool> {
    if store.current_supported_assembly(taxonomy).await?.as_deref() == Some(target_assembly) {
        info!(taxonomy, target_assembly, "Current assembly is already the target");
        return Ok(false);
    }

    store
        .replace_current_supported_assembly(taxonomy, source_of_assembly, target_assembly, today)
        .await?;
    info!(taxonomy, target_assembly, source_of_assembly, "Supported assembly updated");
    Ok(true)
}

/// Split `GCA_000001405.15` into its chain and version
pub fn split_accession(accession: &str) -> (String, Option<i32>) {
    match accession.rsplit_once('.') {
        Some((chain, version)) => match version.parse() {
            Ok(version) => (chain.to_string(), Some(version)),
            Err(_) => (accession.to_string(), None),
        },
        None => (accession.to_string(), None),
    }
}
