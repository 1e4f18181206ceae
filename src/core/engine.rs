use crate::domain::model::ImportStats;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

/// Drives a pipeline over fixed-size batches.
pub struct ImportEngine<P: Pipeline> {
    pipeline: P,
    batch_size: usize,
    start_idx: usize,
}

impl<P: Pipeline> ImportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            batch_size: 10,
            start_idx: 0,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Skips the first `start_idx` records, for resuming an interrupted run.
    pub fn with_start_idx(mut self, start_idx: usize) -> Self {
        self.start_idx = start_idx;
        self
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<ImportStats> {
        let records = self.pipeline.extract().await?;
        let mut stats = ImportStats {
            total_jobs: records.len(),
            ..Default::default()
        };
        if records.is_empty() {
            return Ok(stats);
        }

        let total_batches = records.len().div_ceil(self.batch_size);
        tracing::info!(
            "Batch size {}, {} batches in total",
            self.batch_size,
            total_batches
        );
        if self.start_idx != 0 {
            tracing::info!("Starting from index {}", self.start_idx);
        }

        let pending: Vec<_> = records.into_iter().skip(self.start_idx).collect();
        let first_batch = self.start_idx / self.batch_size;

        for (offset, chunk) in pending.chunks(self.batch_size).enumerate() {
            tracing::info!(
                "Processing batch {}/{} with {} jobs",
                first_batch + offset + 1,
                total_batches,
                chunk.len()
            );

            let enriched = match self.pipeline.transform(chunk.to_vec()).await {
                Ok(enriched) => enriched,
                Err(e) => {
                    tracing::error!("Batch enrichment failed: {}", e);
                    stats.errors += chunk.len();
                    continue;
                }
            };
            stats.analyzed += enriched.len();
            let batch_len = enriched.len();

            match self.pipeline.load(enriched).await {
                Ok(batch) => stats.absorb(&batch),
                Err(e) => {
                    tracing::error!("Batch load failed: {}", e);
                    stats.errors += batch_len;
                }
            }
        }

        tracing::info!(
            "Import completed: {} jobs inserted, {} duplicates skipped, {} errors",
            stats.inserted,
            stats.duplicates,
            stats.errors
        );
        Ok(stats)
    }
}
