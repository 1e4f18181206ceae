//! Bounded-concurrency enrichment of one batch of postings.

use crate::domain::model::{EnrichedJob, JobAnalysis, JobRecord};
use crate::domain::ports::{AnalysisRequest, JobAnalyzer, TextEmbedder};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};

pub struct Enricher {
    analyzer: Arc<dyn JobAnalyzer>,
    embedder: Option<Arc<dyn TextEmbedder>>,
    concurrency: usize,
    task_deadline: Duration,
    batch_deadline: Option<Duration>,
    embeddings_required: bool,
}

impl Enricher {
    pub fn new(analyzer: Arc<dyn JobAnalyzer>) -> Self {
        Self {
            analyzer,
            embedder: None,
            concurrency: 4,
            task_deadline: Duration::from_secs(120),
            batch_deadline: None,
            embeddings_required: false,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_task_deadline(mut self, deadline: Duration) -> Self {
        self.task_deadline = deadline;
        self
    }

    pub fn with_batch_deadline(mut self, deadline: Duration) -> Self {
        self.batch_deadline = Some(deadline);
        self
    }

    /// Records without embeddings are marked failed instead of persisted.
    pub fn require_embeddings(mut self, required: bool) -> Self {
        self.embeddings_required = required;
        self
    }

    /// Enriches every record. Output order matches input order.
    pub async fn enrich_batch(&self, records: Vec<JobRecord>) -> Vec<EnrichedJob> {
        let total = records.len();
        if total == 0 {
            return Vec::new();
        }
        tracing::info!(
            "Enriching {} postings with {} workers",
            total,
            self.concurrency
        );

        let fallbacks = records.clone();
        let mut slots: Vec<Option<EnrichedJob>> = (0..total).map(|_| None).collect();
        let deadline = self.batch_deadline.map(|d| Instant::now() + d);

        let mut tasks = stream::iter(records.into_iter().enumerate())
            .map(|(index, record)| async move {
                (index, self.enrich_within_deadline(record).await)
            })
            .buffer_unordered(self.concurrency);

        let mut completed = 0;
        loop {
            let next = match deadline {
                Some(at) => match timeout_at(at, tasks.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!(
                            "Batch deadline reached with {} of {} postings unfinished",
                            total - completed,
                            total
                        );
                        break;
                    }
                },
                None => tasks.next().await,
            };

            match next {
                Some((index, job)) => {
                    slots[index] = Some(job);
                    completed += 1;
                }
                None => break,
            }
        }
        drop(tasks);

        slots
            .into_iter()
            .zip(fallbacks)
            .map(|(slot, record)| {
                slot.unwrap_or_else(|| self.fallback(record, "batch deadline exceeded"))
            })
            .collect()
    }

    async fn enrich_within_deadline(&self, record: JobRecord) -> EnrichedJob {
        let title = record.job_title.clone();
        match timeout(self.task_deadline, self.enrich_one(record.clone())).await {
            Ok(job) => job,
            Err(_) => {
                tracing::warn!(
                    "Enrichment of '{}' exceeded {:?}, using empty analysis",
                    title,
                    self.task_deadline
                );
                self.fallback(record, "task deadline exceeded")
            }
        }
    }

    async fn enrich_one(&self, mut record: JobRecord) -> EnrichedJob {
        let request = AnalysisRequest {
            job_title: record.job_title.clone(),
            content: record.analysis_content(),
        };

        let analysis = match self.analyzer.analyze(&request).await {
            Ok(analysis) => analysis,
            Err(failure) => {
                tracing::warn!("Analysis failed for '{}': {}", record.job_title, failure);
                JobAnalysis::default()
            }
        };
        record.apply_analysis(&analysis);
        tracing::debug!(
            "Analyzed '{}' ({} skills)",
            record.job_title,
            record.skills.len()
        );

        let failure = match &self.embedder {
            Some(embedder) => self.embed_fields(embedder.as_ref(), &mut record).await,
            None => None,
        };

        EnrichedJob { record, failure }
    }

    async fn embed_fields(
        &self,
        embedder: &dyn TextEmbedder,
        record: &mut JobRecord,
    ) -> Option<String> {
        let mut failure = None;

        for (label, text) in [
            ("description", record.job_description.clone()),
            ("requirements", record.job_requirements.clone()),
        ] {
            if text.trim().is_empty() {
                continue;
            }
            match embedder.embed(&text).await {
                Ok(values) => match label {
                    "description" => record.description_embedding = values,
                    _ => record.requirements_embedding = values,
                },
                Err(err) if self.embeddings_required => {
                    tracing::error!(
                        "Required {} embedding failed for '{}': {}",
                        label,
                        record.job_title,
                        err
                    );
                    failure = Some(format!("{} embedding failed: {}", label, err));
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        "Skipping {} embedding for '{}': {}",
                        label,
                        record.job_title,
                        err
                    );
                }
            }
        }

        failure
    }

    fn fallback(&self, mut record: JobRecord, reason: &str) -> EnrichedJob {
        record.apply_analysis(&JobAnalysis::default());
        let failure = (self.embedder.is_some() && self.embeddings_required)
            .then(|| reason.to_string());
        EnrichedJob { record, failure }
    }
}
