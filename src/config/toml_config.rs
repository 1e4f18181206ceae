use crate::adapters::gemini::DEFAULT_BASE_URL;
use crate::utils::error::{Result, ScoutError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "jobscout.toml";

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub enrichment: EnrichmentConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub analysis_model: String,
    pub embedding_model: String,
    /// One API key per line.
    pub key_file: String,
    pub timeout_seconds: u64,
    /// Process-wide minimum gap between remote calls. Zero disables spacing.
    pub min_call_interval_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            analysis_model: "gemini-2.0-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            key_file: "api_keys.txt".to_string(),
            timeout_seconds: 60,
            min_call_interval_ms: 4200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub concurrency: usize,
    pub task_deadline_seconds: u64,
    pub batch_deadline_seconds: Option<u64>,
    /// Replaces the built-in system instruction.
    pub instruction_file: Option<String>,
    pub skill_tags_file: Option<String>,
    pub embeddings: bool,
    pub embeddings_required: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            task_deadline_seconds: 120,
            batch_deadline_seconds: None,
            instruction_file: None,
            skill_tags_file: None,
            embeddings: true,
            embeddings_required: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: String,
    pub backup_dir: String,
    pub store_dir: String,
    pub export_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            backup_dir: "backup".to_string(),
            store_dir: "store".to_string(),
            export_prefix: "analyzed_linkedin_jobs".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ScoutError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Explicit path, else `jobscout.toml` in the working directory, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ScoutError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as is.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.api.min_call_interval_ms)
    }

    pub fn task_deadline(&self) -> Duration {
        Duration::from_secs(self.enrichment.task_deadline_seconds)
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        self.enrichment.batch_deadline_seconds.map(Duration::from_secs)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_non_empty_string("api.analysis_model", &self.api.analysis_model)?;
        validate_non_empty_string("api.embedding_model", &self.api.embedding_model)?;
        validate_path("api.key_file", &self.api.key_file)?;
        validate_range("api.timeout_seconds", self.api.timeout_seconds, 1, 600)?;

        validate_positive_number("enrichment.concurrency", self.enrichment.concurrency, 1)?;
        validate_range(
            "enrichment.task_deadline_seconds",
            self.enrichment.task_deadline_seconds,
            1,
            3600,
        )?;
        if let Some(batch) = self.enrichment.batch_deadline_seconds {
            if batch < self.enrichment.task_deadline_seconds {
                return Err(ScoutError::InvalidConfigValueError {
                    field: "enrichment.batch_deadline_seconds".to_string(),
                    value: batch.to_string(),
                    reason: "Batch deadline must not be shorter than the task deadline"
                        .to_string(),
                });
            }
        }
        if self.enrichment.embeddings_required && !self.enrichment.embeddings {
            return Err(ScoutError::ConfigValidationError {
                field: "enrichment.embeddings_required".to_string(),
                message: "Embeddings cannot be required while disabled".to_string(),
            });
        }

        validate_path("output.output_dir", &self.output.output_dir)?;
        validate_path("output.backup_dir", &self.output.backup_dir)?;
        validate_path("output.store_dir", &self.output.store_dir)?;
        validate_non_empty_string("output.export_prefix", &self.output.export_prefix)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.min_call_interval_ms, 4200);
        assert_eq!(config.enrichment.concurrency, 4);
        assert_eq!(config.batch_deadline(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml_content = r#"
[api]
analysis_model = "gemini-1.5-pro"
key_file = "secrets/keys.txt"

[enrichment]
concurrency = 8
batch_deadline_seconds = 600
embeddings_required = true
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.api.analysis_model, "gemini-1.5-pro");
        assert_eq!(config.api.embedding_model, "text-embedding-004");
        assert_eq!(config.enrichment.concurrency, 8);
        assert_eq!(config.batch_deadline(), Some(Duration::from_secs(600)));
        assert_eq!(config.output.output_dir, "output");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("JOBSCOUT_TEST_BASE_URL", "https://proxy.internal.test/v1beta");

        let toml_content = r#"
[api]
base_url = "${JOBSCOUT_TEST_BASE_URL}"
key_file = "${JOBSCOUT_TEST_UNSET_VAR}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "https://proxy.internal.test/v1beta");
        assert_eq!(config.api.key_file, "${JOBSCOUT_TEST_UNSET_VAR}");

        std::env::remove_var("JOBSCOUT_TEST_BASE_URL");
    }

    #[test]
    fn test_validation_failures() {
        let bad_url = AppConfig::from_toml_str("[api]\nbase_url = \"invalid-url\"").unwrap();
        assert!(bad_url.validate().is_err());

        let zero_workers = AppConfig::from_toml_str("[enrichment]\nconcurrency = 0").unwrap();
        assert!(matches!(
            zero_workers.validate(),
            Err(ScoutError::InvalidConfigValueError { ref field, .. })
                if field == "enrichment.concurrency"
        ));

        let short_batch = AppConfig::from_toml_str(
            "[enrichment]\ntask_deadline_seconds = 60\nbatch_deadline_seconds = 30",
        )
        .unwrap();
        assert!(short_batch.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        match AppConfig::from_toml_str("[api\nbase_url = 1") {
            Err(ScoutError::ConfigValidationError { field, .. }) => {
                assert_eq!(field, "toml_parsing")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[output]\noutput_dir = \"./exports\"\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.output_dir, "./exports");
    }
}
