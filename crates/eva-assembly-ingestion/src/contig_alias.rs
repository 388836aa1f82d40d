//! Client for the contig-alias admin API

use crate::error::{IngestError, Result};
use async_trait::async_trait;
use eva_common::maven::ServiceCredentials;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::info;

/// Loading an assembly makes contig-alias fetch its report from NCBI, which can be slow.
pub const DEFAULT_CONTIG_ALIAS_TIMEOUT_SECS: u64 = 600;

#[async_trait]
pub trait AssemblyRegistry: Send + Sync {
    /// Register an assembly. Returns false when it was already registered.
    async fn insert_assembly(&self, accession: &str) -> Result<bool>;
}

pub struct ContigAliasClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
}

impl ContigAliasClient {
    pub fn new(credentials: &ServiceCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_CONTIG_ALIAS_TIMEOUT_SECS))
            .user_agent("EVA-Assembly-Ingestion/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: credentials.url.trim_end_matches('/').to_string(),
            user: credentials.user.clone(),
            password: credentials.password.clone(),
        })
    }

    fn assembly_url(&self, accession: &str) -> String {
        format!("{}/v1/admin/assemblies/{}", self.base_url, accession)
    }
}

#[async_trait]
impl AssemblyRegistry for ContigAliasClient {
    async fn insert_assembly(&self, accession: &str) -> Result<bool> {
        let response = self
            .client
            .put(self.assembly_url(accession))
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!(assembly = accession, "Assembly added to contig alias");
                Ok(true)
            },
            StatusCode::CONFLICT => {
                info!(assembly = accession, "Assembly already in contig alias");
                Ok(false)
            },
            status => Err(IngestError::ContigAlias {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}
