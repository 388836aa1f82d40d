//! `MetadataStore` backed by the evapro Postgres schema

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;

use super::{split_accession, MetadataStore, SourceAssemblyProjects, SupportedAssembly, SUPPORTED_ASSEMBLY_TABLE};
use crate::error::Result;

#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn taxonomies_sharing_current_assembly(&self, taxonomy: i32) -> Result<Vec<i32>> {
        let sql = format!(
            r#"
            SELECT DISTINCT taxonomy_id::INT4
            FROM {SUPPORTED_ASSEMBLY_TABLE}
            WHERE current = true AND assembly_id IN (
                SELECT assembly_id FROM {SUPPORTED_ASSEMBLY_TABLE}
                WHERE taxonomy_id = $1 AND current = true
            )
            ORDER BY 1
            "#
        );

        let taxonomies: Vec<i32> = sqlx::query_scalar(&sql)
            .bind(taxonomy)
            .fetch_all(&self.pool)
            .await?;
        Ok(taxonomies)
    }

    async fn source_assemblies_and_projects(
        &self,
        taxonomies: &[i32],
    ) -> Result<Vec<SourceAssemblyProjects>> {
        let rows: Vec<(String, i32, Vec<String>)> = sqlx::query_as(
            r#"
            SELECT vcf_reference_accession, taxonomy_id::INT4,
                   ARRAY_AGG(DISTINCT project_accession ORDER BY project_accession)
            FROM evapro.project
            LEFT OUTER JOIN evapro.project_taxonomy USING (project_accession)
            LEFT OUTER JOIN evapro.project_analysis USING (project_accession)
            LEFT OUTER JOIN evapro.analysis USING (analysis_accession)
            WHERE taxonomy_id = ANY($1)
              AND ena_status = 4 AND hidden_in_eva = 0
              AND vcf_reference_accession IS NOT NULL
            GROUP BY vcf_reference_accession, taxonomy_id
            ORDER BY vcf_reference_accession, taxonomy_id
            "#,
        )
        .bind(taxonomies)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(assembly_accession, taxonomy, project_accessions)| SourceAssemblyProjects {
                assembly_accession,
                taxonomy,
                project_accessions,
            })
            .collect())
    }

    async fn current_supported_assembly(&self, taxonomy: i32) -> Result<Option<String>> {
        let sql = format!(
            "SELECT assembly_id FROM {SUPPORTED_ASSEMBLY_TABLE} WHERE taxonomy_id = $1 AND current = true"
        );
        let assembly: Option<String> = sqlx::query_scalar(&sql)
            .bind(taxonomy)
            .fetch_optional(&self.pool)
            .await?;
        Ok(assembly)
    }

    async fn replace_current_supported_assembly(
        &self,
        taxonomy: i32,
        source_of_assembly: &str,
        target_assembly: &str,
        today: NaiveDate,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deprecated = sqlx::query(&format!(
            "UPDATE {SUPPORTED_ASSEMBLY_TABLE} SET current = false, end_date = $1 \
             WHERE taxonomy_id = $2 AND current = true"
        ))
        .bind(today)
        .bind(taxonomy)
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {SUPPORTED_ASSEMBLY_TABLE} (taxonomy_id, source, assembly_id, current, start_date) \
             VALUES ($1, $2, $3, true, $4)"
        ))
        .bind(taxonomy)
        .bind(source_of_assembly)
        .bind(target_assembly)
        .bind(today)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(taxonomy, deprecated = deprecated.rows_affected(), "Replaced current supported assembly");
        Ok(())
    }

    async fn insert_assembly_and_taxonomy(
        &self,
        assembly_accession: &str,
        taxonomy: i32,
        scientific_name: Option<&str>,
    ) -> Result<()> {
        let (chain, version) = split_accession(assembly_accession);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO evapro.taxonomy (taxonomy_id, scientific_name)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM evapro.taxonomy WHERE taxonomy_id = $1)
            "#,
        )
        .bind(taxonomy)
        .bind(scientific_name)
        .execute(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO evapro.assembly (assembly_accession, assembly_chain, assembly_version, taxonomy_id)
            SELECT $1, $2, $3, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM evapro.assembly WHERE assembly_accession = $1 AND taxonomy_id = $4
            )
            "#,
        )
        .bind(assembly_accession)
        .bind(chain)
        .bind(version)
        .bind(taxonomy)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            assembly = assembly_accession,
            taxonomy,
            inserted = inserted.rows_affected(),
            "Assembly recorded in metadata"
        );
        Ok(())
    }

    async fn all_taxonomies(&self) -> Result<Vec<i32>> {
        let taxonomies: Vec<i32> =
            sqlx::query_scalar("SELECT DISTINCT taxonomy_id::INT4 FROM evapro.taxonomy ORDER BY 1")
                .fetch_all(&self.pool)
                .await?;
        Ok(taxonomies)
    }

    async fn current_supported_assemblies(&self) -> Result<Vec<SupportedAssembly>> {
        let sql = format!(
            r#"
            SELECT DISTINCT taxonomy_id::INT4 AS taxonomy_id, source, assembly_id
            FROM {SUPPORTED_ASSEMBLY_TABLE}
            WHERE current = true
            ORDER BY taxonomy_id
            "#
        );
        let rows = sqlx::query_as::<_, SupportedAssembly>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
