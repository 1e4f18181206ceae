use crate::adapters::csv_export::CsvExporter;
use crate::adapters::csv_format;
use crate::core::dedup::{dedup_key, DedupIndex};
use crate::core::enrichment::Enricher;
use crate::core::persist::JobInserter;
use crate::domain::model::{EnrichedJob, InsertStats, JobRecord};
use crate::domain::ports::{JobStore, Pipeline, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

pub const DEFAULT_WORK_TYPE: &str = "Full-time";

/// Legacy CSV import: read postings, enrich them, export them to CSV and
/// persist them to a job store.
pub struct ImportPipeline<S: Storage, J: JobStore> {
    input: PathBuf,
    reference: NaiveDateTime,
    enricher: Enricher,
    exporter: CsvExporter<S>,
    export_file: String,
    inserter: Mutex<JobInserter<J>>,
    seen: Mutex<DedupIndex>,
    skipped: AtomicUsize,
}

impl<S: Storage, J: JobStore> ImportPipeline<S, J> {
    pub fn new(
        input: impl Into<PathBuf>,
        reference: NaiveDateTime,
        enricher: Enricher,
        exporter: CsvExporter<S>,
        export_file: impl Into<String>,
        inserter: JobInserter<J>,
    ) -> Self {
        Self {
            input: input.into(),
            reference,
            enricher,
            exporter,
            export_file: export_file.into(),
            inserter: Mutex::new(inserter),
            seen: Mutex::new(DedupIndex::new()),
            skipped: AtomicUsize::new(0),
        }
    }

    pub fn export_file(&self) -> &str {
        &self.export_file
    }

    /// Fills in what the scrape may have left out.
    fn normalize(mut record: JobRecord) -> JobRecord {
        if record.job_id.is_empty() {
            let posted = record.posted_date.map(|d| d.format("%Y-%m-%d").to_string());
            record.job_id =
                dedup_key(&record.job_title, &record.company_name, posted.as_deref()).into_string();
        }
        if record.work_type.is_empty() {
            record.work_type = DEFAULT_WORK_TYPE.to_string();
        }
        if record.raw_description.is_empty() && !record.job_description.is_empty() {
            record.raw_description = record.job_description.clone();
        }
        record
    }
}

#[async_trait]
impl<S: Storage, J: JobStore> Pipeline for ImportPipeline<S, J> {
    async fn extract(&self) -> Result<Vec<JobRecord>> {
        tracing::info!("Reading CSV file: {}", self.input.display());
        let data = tokio::fs::read(&self.input).await?;
        let records: Vec<JobRecord> = csv_format::read_records(&data, self.reference)?
            .into_iter()
            .map(Self::normalize)
            .collect();

        if records.is_empty() {
            tracing::warn!("CSV file is empty");
        } else {
            tracing::info!("Found {} jobs in CSV file", records.len());
        }
        Ok(records)
    }

    /// Drops postings already seen in this run or already stored, then enriches the rest.
    async fn transform(&self, batch: Vec<JobRecord>) -> Result<Vec<EnrichedJob>> {
        let fresh: Vec<JobRecord> = {
            let mut seen = self.seen.lock().await;
            let inserter = self.inserter.lock().await;
            batch
                .into_iter()
                .filter(|record| {
                    let duplicate = seen.is_duplicate(&record.job_id, &record.web_id)
                        || inserter.is_known(&record.job_id, &record.web_id);
                    seen.insert(&record.job_id, &record.web_id);
                    if duplicate {
                        tracing::debug!("Skipping duplicate posting '{}'", record.job_title);
                        self.skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    !duplicate
                })
                .collect()
        };

        Ok(self.enricher.enrich_batch(fresh).await)
    }

    /// Exports the records that will be persisted, then inserts the batch.
    ///
    /// Records that failed enrichment are left out of the export and counted
    /// as errors by the inserter.
    async fn load(&self, batch: Vec<EnrichedJob>) -> Result<InsertStats> {
        let skipped = self.skipped.swap(0, Ordering::Relaxed);

        let records: Vec<JobRecord> = batch
            .iter()
            .filter(|job| job.failure.is_none())
            .map(|job| job.record.clone())
            .collect();
        self.exporter.append(&self.export_file, &records).await?;

        let mut stats = self.inserter.lock().await.insert_batch(&batch).await;
        stats.total += skipped;
        stats.duplicates += skipped;
        Ok(stats)
    }
}
