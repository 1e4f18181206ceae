//! Idempotent insertion of enriched postings into a `JobStore`.

use crate::core::dedup::DedupIndex;
use crate::domain::model::{CompanyRow, EnrichedJob, InsertStats, JobRecord};
use crate::domain::ports::JobStore;
use crate::utils::error::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

pub const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Stable company id: `comp_` plus 12 hex chars of the normalized name's SHA-256.
pub fn company_id_for(name: &str) -> String {
    let digest = hex::encode(Sha256::digest(name.trim().to_lowercase().as_bytes()));
    format!("comp_{}", &digest[..12])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
    Failed(String),
}

pub struct JobInserter<S: JobStore> {
    store: S,
    index: DedupIndex,
    companies: HashMap<String, String>,
}

impl<S: JobStore> JobInserter<S> {
    /// Loads the known ids and companies from the store.
    pub async fn open(store: S) -> Result<Self> {
        let index = DedupIndex::with_known(store.job_ids().await?, store.web_ids().await?);
        let companies: HashMap<String, String> = store
            .companies()
            .await?
            .into_iter()
            .map(|c| (c.company_name.trim().to_lowercase(), c.company_id))
            .collect();

        tracing::info!(
            "Job store holds {} jobs and {} companies",
            index.len(),
            companies.len()
        );
        Ok(Self {
            store,
            index,
            companies,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_known(&self, job_id: &str, web_id: &str) -> bool {
        self.index.is_duplicate(job_id, web_id)
    }

    /// Inserts one record. Caches change only when the store write succeeds.
    pub async fn insert(&mut self, record: &JobRecord) -> InsertOutcome {
        if self.index.is_duplicate(&record.job_id, &record.web_id) {
            tracing::debug!("Skipping duplicate job {}", record.job_id);
            return InsertOutcome::Duplicate;
        }

        let company_name = match record.company_name.trim() {
            "" => UNKNOWN_COMPANY.to_string(),
            name => name.to_string(),
        };
        let cache_key = company_name.to_lowercase();

        let (company_id, new_company) = match self.companies.get(&cache_key) {
            Some(id) => (id.clone(), None),
            None => {
                let id = company_id_for(&company_name);
                let description = Some(record.company_description.trim())
                    .filter(|d| !d.is_empty())
                    .map(str::to_string);
                let row = CompanyRow {
                    company_id: id.clone(),
                    company_name: company_name.clone(),
                    company_description: description,
                };
                (id, Some(row))
            }
        };

        let mut job = record.clone();
        job.company_name = company_name;
        job.company_id = company_id.clone();

        match self.store.insert_job(&job, new_company.as_ref()).await {
            Ok(()) => {
                if new_company.is_some() {
                    self.companies.insert(cache_key, company_id);
                }
                self.index.insert(&job.job_id, &job.web_id);
                InsertOutcome::Inserted
            }
            Err(e) => {
                tracing::error!("Failed to insert job '{}': {}", job.job_title, e);
                InsertOutcome::Failed(e.to_string())
            }
        }
    }

    /// Inserts a batch; records carrying an enrichment failure are counted as errors.
    pub async fn insert_batch(&mut self, jobs: &[EnrichedJob]) -> InsertStats {
        let mut stats = InsertStats {
            total: jobs.len(),
            ..Default::default()
        };

        for job in jobs {
            if let Some(reason) = &job.failure {
                tracing::warn!("Not persisting '{}': {}", job.record.job_title, reason);
                stats.errors += 1;
                continue;
            }
            match self.insert(&job.record).await {
                InsertOutcome::Inserted => stats.inserted += 1,
                InsertOutcome::Duplicate => stats.duplicates += 1,
                InsertOutcome::Failed(_) => stats.errors += 1,
            }
        }

        tracing::info!(
            "Insert summary: {} total, {} inserted, {} duplicates, {} errors",
            stats.total,
            stats.inserted,
            stats.duplicates,
            stats.errors
        );
        stats
    }
}
