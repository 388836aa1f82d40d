//! Compare EVA's supported assemblies with what their sources currently support

use std::collections::{BTreeMap, BTreeSet};

use tracing::{error, info, warn};

use crate::error::Result;
use crate::metadata::MetadataStore;
use crate::report::format_rows;
use crate::taxonomy::TaxonomyLookup;

pub const ENSEMBL_SOURCE: &str = "Ensembl";

/// EVA and source disagree on the assembly of a taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyMismatch {
    pub eva: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetAssemblyReport {
    pub mismatched: BTreeMap<i32, AssemblyMismatch>,
    /// Known to EVA but without a current supported assembly
    pub not_tracked: Vec<i32>,
    /// Tracked, but the source could not tell us its assembly
    pub not_retrieved: Vec<i32>,
}

impl TargetAssemblyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.not_tracked.is_empty() && self.not_retrieved.is_empty()
    }

    pub fn log_summary(&self) {
        if !self.not_tracked.is_empty() {
            warn!(taxonomies = ?self.not_tracked, "Taxonomies not tracked by EVA");
        }
        if !self.not_retrieved.is_empty() {
            error!(
                taxonomies = ?self.not_retrieved,
                "Taxonomies tracked by EVA whose assembly could not be retrieved from their source"
            );
        }
        for (taxonomy, mismatch) in &self.mismatched {
            error!(
                taxonomy,
                eva = %mismatch.eva,
                source = %mismatch.source,
                "Different supported assemblies in EVA and source"
            );
        }
    }

    pub fn format_mismatches(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .mismatched
            .iter()
            .map(|(taxonomy, m)| vec![taxonomy.to_string(), m.eva.clone(), m.source.clone()])
            .collect();
        format_rows(&["Taxonomy", "EVA Assembly", "Source Assembly"], &rows)
    }
}

/// Assembly Ensembl supports for a taxonomy, `None` when unknown
async fn ensembl_assembly(lookup: &dyn TaxonomyLookup, taxonomy: i32) -> Option<String> {
    info!(taxonomy, "Query Ensembl for species name");
    let species = match lookup.ensembl_species_name(taxonomy).await {
        Ok(Some(species)) => species,
        Ok(None) => {
            warn!(taxonomy, "Could not get species name in Ensembl");
            return None;
        },
        Err(e) => {
            warn!(taxonomy, error = %e, "Could not get species name in Ensembl");
            return None;
        },
    };

    info!(taxonomy, species = %species, "Query Ensembl for supported assembly");
    match lookup.ensembl_assembly(&species).await {
        Ok(Some(assembly)) => Some(assembly),
        Ok(None) => {
            warn!(taxonomy, species = %species, "Could not find supported assembly in Ensembl");
            None
        },
        Err(e) => {
            warn!(taxonomy, species = %species, error = %e, "Ensembl assembly lookup failed");
            None
        },
    }
}

pub async fn check_supported_target_assembly(
    metadata: &dyn MetadataStore,
    lookup: &dyn TaxonomyLookup,
) -> Result<TargetAssemblyReport> {
    let taxonomies = metadata.all_taxonomies().await?;
    let eva: BTreeMap<i32, (String, String)> = metadata
        .current_supported_assemblies()
        .await?
        .into_iter()
        .map(|s| (s.taxonomy_id, (s.source, s.assembly_id)))
        .collect();

    let mut from_source: BTreeMap<i32, String> = BTreeMap::new();
    for (&taxonomy, (source, _)) in &eva {
        if source == ENSEMBL_SOURCE {
            if let Some(assembly) = ensembl_assembly(lookup, taxonomy).await {
                from_source.insert(taxonomy, assembly);
            }
        } else {
            error!(taxonomy, source = %source, "No implementation to check the assembly supported by this source");
        }
    }

    let mut report = TargetAssemblyReport::default();
    let known: BTreeSet<i32> = taxonomies.into_iter().collect();
    for taxonomy in known {
        match (eva.get(&taxonomy), from_source.get(&taxonomy)) {
            (Some((_, eva_assembly)), Some(source_assembly)) => {
                if eva_assembly != source_assembly {
                    report.mismatched.insert(
                        taxonomy,
                        AssemblyMismatch {
                            eva: eva_assembly.clone(),
                            source: source_assembly.clone(),
                        },
                    );
                }
            },
            (None, _) => report.not_tracked.push(taxonomy),
            (Some(_), None) => report.not_retrieved.push(taxonomy),
        }
    }

    report.log_summary();
    Ok(report)
}
