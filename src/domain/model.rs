use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder the analysis service uses for fields it could not find.
pub const NOT_SPECIFIED: &str = "Not Specified";

/// One job posting, from scrape through enrichment to persistence.
///
/// External spellings of these fields (legacy CSV headers, store columns) are
/// mapped at the boundary; everything inside the crate uses these names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Dedup key (hex SHA-256) used as the primary identifier.
    pub job_id: String,
    /// Site-specific identifier, e.g. the LinkedIn job id.
    pub web_id: String,
    pub job_title: String,
    pub company_name: String,
    pub salary: String,
    pub location: String,
    pub posted_date: Option<NaiveDate>,
    pub link: String,
    /// Description text as scraped, before analysis.
    pub raw_description: String,
    pub job_expertise: String,
    pub yoe: String,
    pub work_type: String,
    pub job_requirements: String,
    pub job_description: String,
    pub company_id: String,
    pub company_description: String,
    pub skills: Vec<String>,
    pub description_embedding: Vec<f32>,
    pub requirements_embedding: Vec<f32>,
}

impl JobRecord {
    /// Merges an analysis result into the record.
    ///
    /// `Not Specified` and empty values never overwrite scraped data.
    pub fn apply_analysis(&mut self, analysis: &JobAnalysis) {
        fn informative(value: &str) -> Option<&str> {
            let trimmed = value.trim();
            (!trimmed.is_empty() && trimmed != NOT_SPECIFIED).then_some(trimmed)
        }

        if let Some(description) = informative(&analysis.job_description) {
            self.job_description = description.to_string();
        } else if self.job_description.is_empty() {
            self.job_description = self.raw_description.clone();
        }
        if let Some(requirements) = informative(&analysis.job_requirements) {
            self.job_requirements = requirements.to_string();
        }
        if let Some(yoe) = informative(&analysis.yoe) {
            self.yoe = yoe.to_string();
        }
        if let Some(salary) = informative(&analysis.salary) {
            self.salary = salary.to_string();
        }
        if let Some(expertise) = informative(&analysis.job_expertise) {
            self.job_expertise = expertise.to_string();
        }
        if let Some(info) = informative(&analysis.company_information) {
            self.company_description = info.to_string();
        }
        if !analysis.skills.is_empty() {
            self.skills = analysis.skills.clone();
        }
    }

    /// Text sent to the analysis service; falls back to the title when the
    /// scrape produced no description.
    pub fn analysis_content(&self) -> String {
        if self.raw_description.trim().is_empty() {
            format!("Job title: {}", self.job_title)
        } else {
            self.raw_description.clone()
        }
    }
}

/// Structured fields extracted from a posting by the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub skills: Vec<String>,
    pub yoe: String,
    pub salary: String,
    pub job_expertise: String,
    pub job_requirements: String,
    pub job_description: String,
    pub company_information: String,
}

impl Default for JobAnalysis {
    fn default() -> Self {
        Self {
            skills: Vec::new(),
            yoe: NOT_SPECIFIED.to_string(),
            salary: NOT_SPECIFIED.to_string(),
            job_expertise: String::new(),
            job_requirements: String::new(),
            job_description: String::new(),
            company_information: String::new(),
        }
    }
}

impl JobAnalysis {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A record after enrichment, with the reason it cannot be persisted if any.
#[derive(Debug, Clone)]
pub struct EnrichedJob {
    pub record: JobRecord,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRow {
    pub company_id: String,
    pub company_name: String,
    pub company_description: Option<String>,
}

/// Outcome counters for one batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    pub total: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
}

/// Outcome counters for a whole import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub total_jobs: usize,
    pub analyzed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
}

impl ImportStats {
    pub fn absorb(&mut self, batch: &InsertStats) {
        self.inserted += batch.inserted;
        self.duplicates += batch.duplicates;
        self.errors += batch.errors;
    }
}
