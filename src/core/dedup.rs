//! Content hashes used as idempotency keys for job postings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// Hex-encoded SHA-256 digest identifying one posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DedupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key for `(title, company[, posted_date])`.
///
/// Title and company are trimmed and lowercased. An empty posted date counts
/// as absent.
pub fn dedup_key(title: &str, company: &str, posted_date: Option<&str>) -> DedupKey {
    let mut material = format!(
        "{}|{}",
        title.trim().to_lowercase(),
        company.trim().to_lowercase()
    );
    if let Some(date) = posted_date.filter(|d| !d.is_empty()) {
        material.push('|');
        material.push_str(date);
    }

    DedupKey(hex::encode(Sha256::digest(material.as_bytes())))
}

/// Known `job_id`s and site `web_id`s.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    job_ids: HashSet<String>,
    web_ids: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_known(
        job_ids: impl IntoIterator<Item = String>,
        web_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            job_ids: job_ids.into_iter().filter(|id| !id.is_empty()).collect(),
            web_ids: web_ids.into_iter().filter(|id| !id.is_empty()).collect(),
        }
    }

    /// True when either identifier was seen. Empty web ids never match.
    pub fn is_duplicate(&self, job_id: &str, web_id: &str) -> bool {
        self.contains(job_id) || (!web_id.is_empty() && self.web_ids.contains(web_id))
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.job_ids.contains(job_id)
    }

    /// Records both identifiers; returns false if the job id was already known.
    pub fn insert(&mut self, job_id: &str, web_id: &str) -> bool {
        if !web_id.is_empty() {
            self.web_ids.insert(web_id.to_string());
        }
        self.job_ids.insert(job_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.job_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.job_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_invariance() {
        assert_eq!(
            dedup_key("Software Engineer ", " Acme Corp", None),
            dedup_key("software engineer", "acme corp", None)
        );
    }

    #[test]
    fn test_posted_date_changes_key() {
        assert_ne!(
            dedup_key("X", "Y", Some("2024-01-01")),
            dedup_key("X", "Y", Some("2024-01-02"))
        );
        assert_ne!(dedup_key("X", "Y", Some("2024-01-01")), dedup_key("X", "Y", None));
    }

    #[test]
    fn test_empty_date_counts_as_absent() {
        assert_eq!(dedup_key("X", "Y", Some("")), dedup_key("X", "Y", None));
    }

    #[test]
    fn test_key_is_sha256_of_pipe_joined_fields() {
        let key = dedup_key("Software Engineer", "Acme", None);
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            key.as_str(),
            hex::encode(Sha256::digest(b"software engineer|acme"))
        );
    }

    #[test]
    fn test_index_matches_job_or_web_id() {
        let mut index = DedupIndex::with_known(vec!["job-a".to_string()], vec!["4012".to_string()]);

        assert!(index.is_duplicate("job-a", ""));
        assert!(index.is_duplicate("job-b", "4012"));
        assert!(!index.is_duplicate("job-b", ""));

        assert!(index.insert("job-b", "5000"));
        assert!(!index.insert("job-b", ""));
        assert!(index.is_duplicate("job-c", "5000"));
        assert_eq!(index.len(), 2);
    }
}
