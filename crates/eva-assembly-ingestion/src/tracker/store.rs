//! Read/write access to the remapping tracking table
//!
//! Status and count updates check that the row exists with a SELECT before
//! issuing the UPDATE. The two statements are not wrapped in a transaction, so
//! two jobs targeting the same taxonomy/assembly/release can interleave.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};

use super::types::{
    CountUpdate, DbsnpSourceAssembly, RemappingStatus, TrackerKey, TrackerRow, VariantSource,
    TRACKING_TABLE,
};
use crate::error::Result;

#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Rows for these taxonomies, target assembly and release. Empty if none.
    async fn load(
        &self,
        taxonomies: &[i32],
        target_assembly: &str,
        release_version: i32,
    ) -> Result<Vec<TrackerRow>>;

    /// dbSNP source assemblies as recorded in an earlier release
    async fn dbsnp_source_assemblies(
        &self,
        taxonomies: &[i32],
        reference_release: i32,
    ) -> Result<Vec<DbsnpSourceAssembly>>;

    /// Insert rows, skipping any that already exist. Returns the number inserted.
    async fn insert_pending(&self, rows: &[TrackerRow]) -> Result<u64>;

    /// Set the status on every row under `key`. Returns false when no row matched.
    async fn set_status(
        &self,
        key: &TrackerKey,
        status: RemappingStatus,
        at: NaiveDateTime,
    ) -> Result<bool>;

    /// Record counts on the `source` row under `key`. Returns false when no row matched.
    async fn set_counts(
        &self,
        key: &TrackerKey,
        source: VariantSource,
        counts: &CountUpdate,
    ) -> Result<bool>;
}

#[derive(Debug, sqlx::FromRow)]
struct TrackerRecord {
    source: String,
    taxonomy: i32,
    scientific_name: Option<String>,
    origin_assembly_accession: String,
    assembly_accession: String,
    release_version: i32,
    num_studies: Option<i32>,
    remapping_status: Option<String>,
    num_ss_extracted: Option<i64>,
    num_ss_remapped: Option<i64>,
    num_ss_ingested: Option<i64>,
    remapping_start: Option<NaiveDateTime>,
    remapping_end: Option<NaiveDateTime>,
}

impl TryFrom<TrackerRecord> for TrackerRow {
    type Error = eva_common::EvaError;

    fn try_from(record: TrackerRecord) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            source: record.source.parse()?,
            taxonomy: record.taxonomy,
            scientific_name: record.scientific_name,
            origin_assembly_accession: record.origin_assembly_accession,
            assembly_accession: record.assembly_accession,
            release_version: record.release_version,
            num_studies: record.num_studies.unwrap_or(0),
            remapping_status: record
                .remapping_status
                .as_deref()
                .map(str::parse)
                .transpose()?,
            num_ss_extracted: record.num_ss_extracted,
            num_ss_remapped: record.num_ss_remapped,
            num_ss_ingested: record.num_ss_ingested,
            remapping_start: record.remapping_start,
            remapping_end: record.remapping_end,
        })
    }
}

/// Tracking table in the metadata Postgres database
#[derive(Clone)]
pub struct PgTrackerStore {
    pool: PgPool,
}

impl PgTrackerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn row_exists(&self, key: &TrackerKey, source: Option<VariantSource>) -> Result<bool> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT COUNT(*) FROM {TRACKING_TABLE} WHERE release_version = "
        ));
        query
            .push_bind(key.release_version)
            .push(" AND taxonomy = ")
            .push_bind(key.taxonomy)
            .push(" AND origin_assembly_accession = ")
            .push_bind(&key.origin_assembly_accession)
            .push(" AND assembly_accession = ")
            .push_bind(&key.assembly_accession);
        if let Some(source) = source {
            query.push(" AND source = ").push_bind(source.as_str());
        }

        let count: i64 = query.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl TrackerStore for PgTrackerStore {
    async fn load(
        &self,
        taxonomies: &[i32],
        target_assembly: &str,
        release_version: i32,
    ) -> Result<Vec<TrackerRow>> {
        let sql = format!(
            r#"
            SELECT source, taxonomy::INT4 AS taxonomy, scientific_name,
                   origin_assembly_accession, assembly_accession,
                   release_version::INT4 AS release_version,
                   num_studies::INT4 AS num_studies, remapping_status,
                   num_ss_extracted::INT8 AS num_ss_extracted,
                   num_ss_remapped::INT8 AS num_ss_remapped,
                   num_ss_ingested::INT8 AS num_ss_ingested,
                   remapping_start::TIMESTAMP AS remapping_start,
                   remapping_end::TIMESTAMP AS remapping_end
            FROM {TRACKING_TABLE}
            WHERE release_version = $1
              AND assembly_accession = $2
              AND taxonomy = ANY($3)
            ORDER BY origin_assembly_accession, taxonomy, source
            "#
        );

        let records = sqlx::query_as::<_, TrackerRecord>(&sql)
            .bind(release_version)
            .bind(target_assembly)
            .bind(taxonomies)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = records.len(), target_assembly, release_version, "Loaded tracker rows");

        Ok(records
            .into_iter()
            .map(TrackerRow::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn dbsnp_source_assemblies(
        &self,
        taxonomies: &[i32],
        reference_release: i32,
    ) -> Result<Vec<DbsnpSourceAssembly>> {
        let sql = format!(
            r#"
            SELECT origin_assembly_accession, taxonomy::INT4, COALESCE(num_studies, 0)::INT4
            FROM {TRACKING_TABLE}
            WHERE release_version = $1 AND taxonomy = ANY($2) AND source = 'DBSNP'
            ORDER BY origin_assembly_accession, taxonomy
            "#
        );

        let rows: Vec<(String, i32, i32)> = sqlx::query_as(&sql)
            .bind(reference_release)
            .bind(taxonomies)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(origin_assembly_accession, taxonomy, num_studies)| DbsnpSourceAssembly {
                origin_assembly_accession,
                taxonomy,
                num_studies,
            })
            .collect())
    }

    async fn insert_pending(&self, rows: &[TrackerRow]) -> Result<u64> {
        let sql = format!(
            r#"
            INSERT INTO {TRACKING_TABLE} (
                source, taxonomy, scientific_name, origin_assembly_accession,
                assembly_accession, remapping_version, release_version, num_studies,
                num_ss_ids, study_accessions, remapping_status
            )
            SELECT $1, $2, $3, $4, $5, 1, $6, $7, 1, NULL, $8
            WHERE NOT EXISTS (
                SELECT 1 FROM {TRACKING_TABLE}
                WHERE release_version = $6 AND taxonomy = $2
                  AND origin_assembly_accession = $4 AND assembly_accession = $5
                  AND source = $1
            )
            "#
        );

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for row in rows {
            let status = row.remapping_status.unwrap_or(RemappingStatus::Pending);
            let result = sqlx::query(&sql)
                .bind(row.source.as_str())
                .bind(row.taxonomy)
                .bind(row.scientific_name.as_deref())
                .bind(&row.origin_assembly_accession)
                .bind(&row.assembly_accession)
                .bind(row.release_version)
                .bind(row.num_studies)
                .bind(status.as_str())
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                debug!(
                    source = %row.source,
                    taxonomy = row.taxonomy,
                    origin = %row.origin_assembly_accession,
                    "Tracker row already present, skipped"
                );
            }
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn set_status(
        &self,
        key: &TrackerKey,
        status: RemappingStatus,
        at: NaiveDateTime,
    ) -> Result<bool> {
        if !self.row_exists(key, None).await? {
            warn!(?key, %status, "No tracker row to update status on");
            return Ok(false);
        }

        let (start, end) = match status {
            RemappingStatus::Started => (Some(at), None),
            RemappingStatus::Completed => (None, Some(at)),
            RemappingStatus::Pending | RemappingStatus::Failed => (None, None),
        };

        let sql = format!(
            r#"
            UPDATE {TRACKING_TABLE}
            SET remapping_status = $1,
                remapping_start = COALESCE($2, remapping_start),
                remapping_end = COALESCE($3, remapping_end)
            WHERE release_version = $4 AND taxonomy = $5
              AND origin_assembly_accession = $6 AND assembly_accession = $7
            "#
        );

        sqlx::query(&sql)
            .bind(status.as_str())
            .bind(start)
            .bind(end)
            .bind(key.release_version)
            .bind(key.taxonomy)
            .bind(&key.origin_assembly_accession)
            .bind(&key.assembly_accession)
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    async fn set_counts(
        &self,
        key: &TrackerKey,
        source: VariantSource,
        counts: &CountUpdate,
    ) -> Result<bool> {
        if counts.is_empty() {
            return Ok(false);
        }
        if !self.row_exists(key, Some(source)).await? {
            debug!(?key, %source, "No tracker row for source, counts not recorded");
            return Ok(false);
        }

        let mut query = QueryBuilder::<Postgres>::new(format!("UPDATE {TRACKING_TABLE} SET "));
        let mut columns = query.separated(", ");
        for (column, value) in [
            ("num_ss_extracted", counts.extracted),
            ("num_ss_remapped", counts.remapped),
            ("num_ss_ingested", counts.ingested),
        ] {
            if let Some(value) = value {
                columns.push(format!("{column} = "));
                columns.push_bind_unseparated(value);
            }
        }
        query
            .push(" WHERE release_version = ")
            .push_bind(key.release_version)
            .push(" AND taxonomy = ")
            .push_bind(key.taxonomy)
            .push(" AND origin_assembly_accession = ")
            .push_bind(&key.origin_assembly_accession)
            .push(" AND assembly_accession = ")
            .push_bind(&key.assembly_accession)
            .push(" AND source = ")
            .push_bind(source.as_str());

        query.build().execute(&self.pool).await?;
        Ok(true)
    }
}
