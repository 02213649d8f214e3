use std::io::Write;

use serde::Serialize;

use crate::domain::FailureRecord;
use crate::error::PackError;

/// Row of the exported failure report, ready to be fed back in as input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Item")]
    pub item: String,
    #[serde(rename = "URL")]
    pub url: String,
}

/// Row of the on-screen failure table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub row: u64,
    #[serde(rename = "Item")]
    pub item: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub reason: String,
}

/// Failed tasks of the current run, in the order they completed.
#[derive(Debug, Clone, Default)]
pub struct FailureLedger {
    records: Vec<FailureRecord>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn record(&mut self, record: FailureRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.records
            .iter()
            .map(|record| ExportRow {
                item: record.display_name.clone(),
                url: record.source_url.clone(),
            })
            .collect()
    }

    pub fn display_rows(&self) -> Vec<DisplayRow> {
        self.records
            .iter()
            .map(|record| DisplayRow {
                row: record.row_index,
                item: record.display_name.clone(),
                url: record.source_url.clone(),
                reason: record.reason.to_string(),
            })
            .collect()
    }
}

/// Writes export rows as CSV with an `Item,URL` header.
pub fn write_export_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), PackError> {
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    out.write_record(["Item", "URL"])
        .map_err(|err| PackError::Report(err.to_string()))?;
    for row in rows {
        out.serialize(row)
            .map_err(|err| PackError::Report(err.to_string()))?;
    }
    out.flush()
        .map_err(|err| PackError::Report(err.to_string()))
}
