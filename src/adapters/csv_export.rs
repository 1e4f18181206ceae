use crate::adapters::csv_format;
use crate::domain::model::JobRecord;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::NaiveDateTime;

/// Append-only CSV export of analyzed postings.
pub struct CsvExporter<S: Storage> {
    storage: S,
}

impl<S: Storage> CsvExporter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// `{YYYY-MM-DD_HHMMSS}_{prefix}.csv`
    pub fn generate_filename(prefix: &str, now: NaiveDateTime) -> String {
        format!("{}_{}.csv", now.format("%Y-%m-%d_%H%M%S"), prefix)
    }

    /// Creates (or truncates) the file with just the header row.
    pub async fn create(&self, filename: &str) -> Result<()> {
        self.storage
            .write_file(filename, &csv_format::header_row()?)
            .await?;
        tracing::info!("Created CSV export {}", filename);
        Ok(())
    }

    /// Appends records; a missing file gets the header first.
    pub async fn append(&self, filename: &str, records: &[JobRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let with_header = !self.storage.exists(filename).await;
        let data = csv_format::write_rows(records, with_header)?;
        self.storage.append_file(filename, &data).await?;

        tracing::debug!("Appended {} rows to {}", records.len(), filename);
        Ok(records.len())
    }
}
