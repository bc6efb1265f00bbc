//! Table formatting utilities for structured output.

use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

use crate::retrieval::{IndexInfo, IngestReceipt, SearchHit};

/// Longest text excerpt shown in a hits table before eliding.
const EXCERPT_CHARS: usize = 80;

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        // Apply rounded corners
        table.apply_modifier(UTF8_ROUND_CORNERS);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        Self { table }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    /// Add a row to the table.
    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Add a row of pre-styled cells.
    pub fn add_cells(mut self, row: Vec<Cell>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Build and return the formatted table.
    pub fn build(self) -> String {
        self.table.to_string()
    }
}

/// Create a table of search hits, best match first.
pub fn create_hits_table(hits: &[SearchHit]) -> String {
    let mut builder = TableBuilder::new().set_headers(vec!["#", "Score", "Text", "Metadata"]);

    for (rank, hit) in hits.iter().enumerate() {
        let metadata = if hit.metadata.is_empty() {
            "-".to_string()
        } else {
            serde_json::Value::Object(hit.metadata.clone()).to_string()
        };

        builder = builder.add_cells(vec![
            Cell::new(rank + 1).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", hit.score.get()))
                .fg(score_color(hit.score.get()))
                .set_alignment(CellAlignment::Right),
            Cell::new(excerpt(&hit.text)),
            Cell::new(metadata),
        ]);
    }

    builder.build()
}

/// Create a two-column table describing the store.
pub fn create_info_table(info: &IndexInfo, journal: Option<&str>) -> String {
    TableBuilder::new()
        .set_headers(vec!["Property", "Value"])
        .add_row(vec!["Dimension".to_string(), info.dimension.to_string()])
        .add_row(vec![
            "Documents".to_string(),
            info.total_documents.to_string(),
        ])
        .add_row(vec![
            "Last updated".to_string(),
            info.last_updated.to_rfc3339(),
        ])
        .add_row(vec![
            "Journal".to_string(),
            journal.unwrap_or("disabled").to_string(),
        ])
        .build()
}

/// Create a summary table for an ingestion.
pub fn create_ingest_table(receipt: &IngestReceipt) -> String {
    TableBuilder::new()
        .set_headers(vec!["Metric", "Value"])
        .add_row(vec!["Accepted".to_string(), receipt.accepted.to_string()])
        .add_row(vec!["Ordinals".to_string(), receipt.ordinals.to_string()])
        .add_row(vec![
            "Total documents".to_string(),
            receipt.total_documents.to_string(),
        ])
        .build()
}

fn score_color(score: f32) -> Color {
    if score >= 0.9 {
        Color::Green
    } else if score >= 0.7 {
        Color::Yellow
    } else {
        Color::Reset
    }
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
