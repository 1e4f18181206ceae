//! `JobStore` adapters: a SQLite database and an in-memory store.
//!
//! Runtime SQL only; the schema is created on open.

use crate::domain::model::{CompanyRow, JobRecord};
use crate::domain::ports::JobStore;
use crate::utils::error::{Result, ScoutError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::Mutex;

pub const STORE_FILE: &str = "jobs.db";

const CREATE_COMPANY_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS company (
        company_id TEXT PRIMARY KEY,
        company_name TEXT NOT NULL,
        company_description TEXT
    )
"#;

const CREATE_JOB_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS job (
        job_id TEXT PRIMARY KEY,
        web_id TEXT NOT NULL,
        job_title TEXT NOT NULL,
        company_name TEXT NOT NULL,
        salary TEXT NOT NULL,
        location TEXT NOT NULL,
        posted_date TEXT,
        link TEXT NOT NULL,
        raw_description TEXT NOT NULL,
        job_expertise TEXT NOT NULL,
        yoe TEXT NOT NULL,
        work_type TEXT NOT NULL,
        job_requirements TEXT NOT NULL,
        job_description TEXT NOT NULL,
        company_id TEXT NOT NULL,
        company_description TEXT NOT NULL,
        skills TEXT NOT NULL,
        description_embedding TEXT NOT NULL,
        requirements_embedding TEXT NOT NULL
    )
"#;

/// Job store backed by a SQLite database with `job` and `company` tables.
///
/// Each `insert_job` runs in its own transaction.
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!("Opened job store {}", path.display());
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_COMPANY_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_JOB_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// All persisted job records, in insertion order.
    pub async fn jobs(&self) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query("SELECT * FROM job ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_job).collect()
    }
}

fn row_to_job(row: &SqliteRow) -> Result<JobRecord> {
    let skills: String = row.try_get("skills")?;
    let description_embedding: String = row.try_get("description_embedding")?;
    let requirements_embedding: String = row.try_get("requirements_embedding")?;

    Ok(JobRecord {
        job_id: row.try_get("job_id")?,
        web_id: row.try_get("web_id")?,
        job_title: row.try_get("job_title")?,
        company_name: row.try_get("company_name")?,
        salary: row.try_get("salary")?,
        location: row.try_get("location")?,
        posted_date: row.try_get("posted_date")?,
        link: row.try_get("link")?,
        raw_description: row.try_get("raw_description")?,
        job_expertise: row.try_get("job_expertise")?,
        yoe: row.try_get("yoe")?,
        work_type: row.try_get("work_type")?,
        job_requirements: row.try_get("job_requirements")?,
        job_description: row.try_get("job_description")?,
        company_id: row.try_get("company_id")?,
        company_description: row.try_get("company_description")?,
        skills: serde_json::from_str(&skills)?,
        description_embedding: serde_json::from_str(&description_embedding)?,
        requirements_embedding: serde_json::from_str(&requirements_embedding)?,
    })
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn job_ids(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>("SELECT job_id FROM job ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn web_ids(&self) -> Result<Vec<String>> {
        let query = "SELECT web_id FROM job WHERE web_id <> '' ORDER BY rowid";
        Ok(sqlx::query_scalar::<_, String>(query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn companies(&self) -> Result<Vec<CompanyRow>> {
        let rows = sqlx::query(
            "SELECT company_id, company_name, company_description FROM company ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CompanyRow {
                    company_id: row.try_get("company_id")?,
                    company_name: row.try_get("company_name")?,
                    company_description: row.try_get("company_description")?,
                })
            })
            .collect()
    }

    async fn insert_job(&self, job: &JobRecord, new_company: Option<&CompanyRow>) -> Result<()> {
        let skills = serde_json::to_string(&job.skills)?;
        let description_embedding = serde_json::to_string(&job.description_embedding)?;
        let requirements_embedding = serde_json::to_string(&job.requirements_embedding)?;

        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.pool.begin().await?;

        if let Some(company) = new_company {
            sqlx::query(
                "INSERT INTO company (company_id, company_name, company_description) \
                 VALUES (?, ?, ?)",
            )
            .bind(&company.company_id)
            .bind(&company.company_name)
            .bind(&company.company_description)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO job (
                job_id, web_id, job_title, company_name, salary, location,
                posted_date, link, raw_description, job_expertise, yoe, work_type,
                job_requirements, job_description, company_id, company_description,
                skills, description_embedding, requirements_embedding
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.job_id)
        .bind(&job.web_id)
        .bind(&job.job_title)
        .bind(&job.company_name)
        .bind(&job.salary)
        .bind(&job.location)
        .bind(job.posted_date)
        .bind(&job.link)
        .bind(&job.raw_description)
        .bind(&job.job_expertise)
        .bind(&job.yoe)
        .bind(&job.work_type)
        .bind(&job.job_requirements)
        .bind(&job.job_description)
        .bind(&job.company_id)
        .bind(&job.company_description)
        .bind(skills)
        .bind(description_embedding)
        .bind(requirements_embedding)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    jobs: Vec<JobRecord>,
    companies: Vec<CompanyRow>,
}

/// In-process store with unique `job_id`s and company ids.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: Mutex<MemoryState>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| ScoutError::persistence("memory store lock poisoned"))
    }

    pub fn jobs(&self) -> Vec<JobRecord> {
        self.lock().map(|s| s.jobs.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn job_ids(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.jobs.iter().map(|j| j.job_id.clone()).collect())
    }

    async fn web_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .jobs
            .iter()
            .filter(|j| !j.web_id.is_empty())
            .map(|j| j.web_id.clone())
            .collect())
    }

    async fn companies(&self) -> Result<Vec<CompanyRow>> {
        Ok(self.lock()?.companies.clone())
    }

    async fn insert_job(&self, job: &JobRecord, new_company: Option<&CompanyRow>) -> Result<()> {
        let mut state = self.lock()?;

        if state.jobs.iter().any(|j| j.job_id == job.job_id) {
            return Err(ScoutError::persistence(format!(
                "job {} already exists",
                job.job_id
            )));
        }
        if let Some(company) = new_company {
            if state
                .companies
                .iter()
                .any(|c| c.company_id == company.company_id)
            {
                return Err(ScoutError::persistence(format!(
                    "company {} already exists",
                    company.company_id
                )));
            }
            state.companies.push(company.clone());
        }
        state.jobs.push(job.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn job(job_id: &str, web_id: &str) -> JobRecord {
        JobRecord {
            job_id: job_id.into(),
            web_id: web_id.into(),
            job_title: "Dev".into(),
            posted_date: NaiveDate::from_ymd_opt(2024, 2, 29),
            raw_description: " Scraped text\n".into(),
            company_id: "comp_0123456789ab".into(),
            skills: vec!["rust".into(), "c#;.net".into()],
            description_embedding: vec![0.25, -1.0],
            ..Default::default()
        }
    }

    async fn in_memory_store() -> SqliteJobStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteJobStore::with_pool(pool).await.unwrap()
    }

    fn company() -> CompanyRow {
        CompanyRow {
            company_id: "comp_0123456789ab".into(),
            company_name: "Acme".into(),
            company_description: None,
        }
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store").join(STORE_FILE);
        let store = SqliteJobStore::open(&path).await.unwrap();

        assert!(store.job_ids().await.unwrap().is_empty());
        store.insert_job(&job("a", "10"), Some(&company())).await.unwrap();
        store.insert_job(&job("b", ""), None).await.unwrap();
        drop(store);

        // A fresh handle sees the same data.
        let reopened = SqliteJobStore::open(&path).await.unwrap();
        assert_eq!(reopened.job_ids().await.unwrap(), vec!["a", "b"]);
        assert_eq!(reopened.web_ids().await.unwrap(), vec!["10"]);
        assert_eq!(reopened.companies().await.unwrap(), vec![company()]);
        assert_eq!(reopened.jobs().await.unwrap()[0], job("a", "10"));
    }

    #[tokio::test]
    async fn test_sqlite_store_rolls_back_company_on_duplicate_job() {
        let store = in_memory_store().await;
        store.insert_job(&job("a", ""), None).await.unwrap();

        let err = store.insert_job(&job("a", ""), Some(&company())).await;

        assert!(matches!(err, Err(ScoutError::DatabaseError(_))));
        assert!(store.companies().await.unwrap().is_empty());
        assert_eq!(store.jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicate_without_side_effects() {
        let store = MemoryJobStore::new();
        store.insert_job(&job("a", ""), None).await.unwrap();

        let err = store.insert_job(&job("a", ""), Some(&company())).await;

        assert!(matches!(err, Err(ScoutError::PersistenceError { .. })));
        assert!(store.companies().await.unwrap().is_empty());
        assert_eq!(store.jobs().len(), 1);
    }
}
