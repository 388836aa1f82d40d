//! Variant counts scraped from pipeline outputs
//!
//! The Java steps of the remapping pipeline log a summary line per Spring
//! Batch step; the remapping step writes a YAML summary. These functions read
//! the last summary line of a given step (a resumed run logs the step again)
//! and pull out the integers. No consistency checks are made between counts.

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const EVA_EXTRACTION_STEP: &str = "EXPORT_EVA_SUBMITTED_VARIANTS_STEP";
pub const DBSNP_EXTRACTION_STEP: &str = "EXPORT_DBSNP_SUBMITTED_VARIANTS_STEP";
pub const INGESTION_STEP: &str = "INGEST_REMAPPED_VARIANTS_FROM_VCF_STEP";

// Literal patterns, exercised by the tests below
#[allow(clippy::expect_used)]
fn pattern(regex: &str) -> Regex {
    Regex::new(regex).expect("count pattern must compile")
}

static ITEMS_READ: LazyLock<Regex> = LazyLock::new(|| pattern(r"Items read = (\d+)"));
static ITEMS_WRITTEN: LazyLock<Regex> = LazyLock::new(|| pattern(r"items written = (\d+)"));
static REMAPPED_SS_READ: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"Items \(remapped ss\) read = (\d+)"));
static SS_INGESTED: LazyLock<Regex> = LazyLock::new(|| pattern(r"ss ingested = (\d+)"));
static SS_DUPLICATES: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"ss skipped \(duplicate\) = (\d+)"));

/// Counts from the extraction log, for both variant sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionCounts {
    pub eva_read: Option<u64>,
    pub eva_written: Option<u64>,
    pub dbsnp_read: Option<u64>,
    pub dbsnp_written: Option<u64>,
}

/// Counts from a remapped-counts YAML summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemappingCounts {
    /// Variants the remapping attempted
    pub candidate: Option<u64>,
    pub remapped: u64,
    pub unmapped: u64,
}

/// Counts from an ingestion log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionCounts {
    pub read: Option<u64>,
    pub ingested: Option<u64>,
    pub duplicates: Option<u64>,
}

/// Apply each pattern to `line`, one slot per pattern.
///
/// The first capture group of every pattern must be an integer; a pattern that
/// does not match yields `None` in its slot.
pub fn parse_log_line(line: &str, patterns: &[&Regex]) -> Vec<Option<u64>> {
    patterns
        .iter()
        .map(|regex| {
            regex
                .captures(line)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .collect()
}

/// Last line of `content` mentioning `marker`
fn last_line_with<'a>(content: &'a str, marker: &str) -> Option<&'a str> {
    content.lines().rev().find(|line| line.contains(marker))
}

fn parse_step(content: &str, marker: &str, patterns: &[&Regex]) -> Vec<Option<u64>> {
    match last_line_with(content, marker) {
        Some(line) => parse_log_line(line, patterns),
        None => vec![None; patterns.len()],
    }
}

pub async fn count_variants_extracted(extraction_log: &Path) -> Result<ExtractionCounts> {
    let content = tokio::fs::read_to_string(extraction_log).await?;
    let eva = parse_step(&content, EVA_EXTRACTION_STEP, &[&*ITEMS_READ, &*ITEMS_WRITTEN]);
    let dbsnp = parse_step(&content, DBSNP_EXTRACTION_STEP, &[&*ITEMS_READ, &*ITEMS_WRITTEN]);
    Ok(ExtractionCounts {
        eva_read: eva[0],
        eva_written: eva[1],
        dbsnp_read: dbsnp[0],
        dbsnp_written: dbsnp[1],
    })
}

pub async fn count_variants_ingested(ingestion_log: &Path) -> Result<IngestionCounts> {
    let content = tokio::fs::read_to_string(ingestion_log).await?;
    let counts = parse_step(
        &content,
        INGESTION_STEP,
        &[&*REMAPPED_SS_READ, &*SS_INGESTED, &*SS_DUPLICATES],
    );
    Ok(IngestionCounts {
        read: counts[0],
        ingested: counts[1],
        duplicates: counts[2],
    })
}

#[derive(Debug, Default, Deserialize)]
struct FlankCounts {
    #[serde(rename = "Remapped", default)]
    remapped: u64,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct RemappedCountsYaml {
    all: Option<u64>,
    #[serde(rename = "Flank_50", default)]
    flank_50: FlankCounts,
    #[serde(rename = "Flank_2000", default)]
    flank_2000: FlankCounts,
    #[serde(rename = "Flank_50000", default)]
    flank_50000: FlankCounts,
    #[serde(default)]
    filtered: u64,
}

pub async fn count_variants_remapped(count_yml_file: &Path) -> Result<RemappingCounts> {
    let content = tokio::fs::read_to_string(count_yml_file).await?;
    let data: RemappedCountsYaml = serde_yaml::from_str(&content)?;

    let remapped = data.flank_50.remapped + data.flank_2000.remapped + data.flank_50000.remapped;
    // Variants left over after the widest flank are the ones that never remapped.
    // Filtered and leftover are summed rather than taking the first non-zero one.
    let unmapped = data.filtered
        + data
            .flank_50000
            .total
            .saturating_sub(data.flank_50000.remapped);

    Ok(RemappingCounts {
        candidate: data.all,
        remapped,
        unmapped,
    })
}
