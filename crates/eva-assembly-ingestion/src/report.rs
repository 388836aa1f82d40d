//! Table rendering for tracker rows and target tracker results

use crate::tracker::TrackerRow;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

pub const TRACKER_HEADER: [&str; 7] = [
    "Sources",
    "Taxonomies",
    "Scientific Name",
    "Assembly",
    "Target Assembly",
    "Num Studies",
    "Status",
];

fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

/// Format tracker rows as a table
pub fn format_tracker_rows(rows: &[TrackerRow]) -> String {
    let mut table = new_table(TRACKER_HEADER);
    for row in rows {
        table.add_row(vec![
            row.source.to_string(),
            row.taxonomy.to_string(),
            row.scientific_name.clone().unwrap_or_default(),
            row.origin_assembly_accession.clone(),
            row.assembly_accession.clone(),
            row.num_studies.to_string(),
            row.remapping_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "NULL".to_string()),
        ]);
    }
    format!("{}\n", table)
}

/// Print tracker rows to stdout
pub fn print_tracker_rows(rows: &[TrackerRow]) {
    print!("{}", format_tracker_rows(rows));
}

/// Format arbitrary string rows under `header`
pub fn format_rows(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = new_table(header.iter().copied());
    for row in rows {
        table.add_row(row.clone());
    }
    format!("{}\n", table)
}
