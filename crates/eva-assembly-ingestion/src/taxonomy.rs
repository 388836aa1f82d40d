//! Species and assembly lookups against ENA and Ensembl REST services

use crate::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const ENSEMBL_REST_URL: &str = "https://rest.ensembl.org";
pub const ENA_TAXONOMY_URL: &str = "https://www.ebi.ac.uk/ena/taxonomy/rest";
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 60;

#[async_trait]
pub trait TaxonomyLookup: Send + Sync {
    /// Scientific name of a taxonomy, `None` if no service knows it
    async fn scientific_name(&self, taxonomy: i32) -> Result<Option<String>>;

    /// Ensembl production name of the species, e.g. `homo_sapiens`
    async fn ensembl_species_name(&self, taxonomy: i32) -> Result<Option<String>>;

    /// Assembly accession Ensembl currently supports for a species
    async fn ensembl_assembly(&self, species_name: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct EnaTaxon {
    #[serde(rename = "scientificName")]
    scientific_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnsemblTaxon {
    scientific_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnsemblGenome {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnsemblAssembly {
    assembly_accession: Option<String>,
}

pub struct EnsemblTaxonomyClient {
    client: Client,
    ensembl_url: String,
    ena_url: String,
}

impl EnsemblTaxonomyClient {
    pub fn new() -> Result<Self> {
        Self::with_urls(ENSEMBL_REST_URL, ENA_TAXONOMY_URL)
    }

    pub fn with_urls(ensembl_url: impl Into<String>, ena_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS))
            .user_agent("EVA-Assembly-Ingestion/0.1")
            .build()?;
        Ok(Self {
            client,
            ensembl_url: ensembl_url.into().trim_end_matches('/').to_string(),
            ena_url: ena_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// GET a JSON document; 404 and 400 mean "unknown" rather than failure
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        debug!(url, "Taxonomy lookup");
        let response = self
            .client
            .get(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send()
            .await?;
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }
}

#[async_trait]
impl TaxonomyLookup for EnsemblTaxonomyClient {
    async fn scientific_name(&self, taxonomy: i32) -> Result<Option<String>> {
        let ena: Option<EnaTaxon> = self
            .get_json(&format!("{}/tax-id/{}", self.ena_url, taxonomy))
            .await?;
        if let Some(name) = ena.and_then(|t| t.scientific_name) {
            return Ok(Some(name));
        }

        let ensembl: Option<EnsemblTaxon> = self
            .get_json(&format!("{}/taxonomy/id/{}", self.ensembl_url, taxonomy))
            .await?;
        let name = ensembl.and_then(|t| t.scientific_name);
        if name.is_none() {
            warn!(taxonomy, "No scientific name found in ENA or Ensembl");
        }
        Ok(name)
    }

    async fn ensembl_species_name(&self, taxonomy: i32) -> Result<Option<String>> {
        let genomes: Option<Vec<EnsemblGenome>> = self
            .get_json(&format!("{}/info/genomes/taxonomy/{}", self.ensembl_url, taxonomy))
            .await?;
        Ok(genomes
            .unwrap_or_default()
            .into_iter()
            .find_map(|g| g.name))
    }

    async fn ensembl_assembly(&self, species_name: &str) -> Result<Option<String>> {
        let species = species_name.trim().to_lowercase().replace(' ', "_");
        if species.is_empty() {
            return Err(IngestError::Lookup("empty species name".to_string()));
        }
        let assembly: Option<EnsemblAssembly> = self
            .get_json(&format!("{}/info/assembly/{}", self.ensembl_url, species))
            .await?;
        Ok(assembly.and_then(|a| a.assembly_accession))
    }
}

/// Scientific names looked up at most once per taxonomy
pub struct MemoizedScientificNames {
    lookup: Arc<dyn TaxonomyLookup>,
    cache: Mutex<HashMap<i32, Option<String>>>,
}

impl MemoizedScientificNames {
    pub fn new(lookup: Arc<dyn TaxonomyLookup>) -> Self {
        Self {
            lookup,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, taxonomy: i32) -> Result<Option<String>> {
        let mut cache = self.cache.lock().await;
        if let Some(name) = cache.get(&taxonomy) {
            return Ok(name.clone());
        }
        let name = self.lookup.scientific_name(taxonomy).await?;
        cache.insert(taxonomy, name.clone());
        Ok(name)
    }
}
