use crate::config::AppConfig;
use crate::utils::error::Result;
use crate::utils::validation::{validate_file_extensions, validate_positive_number, Validate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "jobscout")]
#[command(about = "Import scraped job postings, enrich them with an LLM and persist them")]
pub struct Cli {
    /// Path to jobscout.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Analyze and import a scraped-postings CSV
    Import(ImportArgs),
    /// Merge all backup CSVs into today's backup file
    ConsolidateBackups {
        #[arg(long)]
        backup_dir: Option<String>,
    },
    /// Resolve a relative posting time such as "3 weeks ago"
    ResolveDate {
        text: String,
        /// Reference instant, `YYYY-MM-DDTHH:MM:SS`; defaults to now
        #[arg(long)]
        reference: Option<chrono::NaiveDateTime>,
    },
    /// Print the dedup key for a posting
    DedupKey {
        title: String,
        company: String,
        #[arg(long)]
        posted_date: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    pub csv: PathBuf,

    #[arg(long, default_value = "10")]
    pub batch_size: usize,

    #[arg(long, default_value = "0")]
    pub start_idx: usize,

    #[arg(long, help = "Consolidate backup files before importing")]
    pub load_backup: bool,

    #[arg(long)]
    pub output_dir: Option<String>,
}

impl ImportArgs {
    /// Command line values win over the config file.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(output_dir) = &self.output_dir {
            config.output.output_dir = output_dir.clone();
        }
    }
}

impl Validate for ImportArgs {
    fn validate(&self) -> Result<()> {
        validate_positive_number("batch_size", self.batch_size, 1)?;
        validate_file_extensions(
            "csv",
            &[self.csv.to_string_lossy().to_string()],
            &["csv"],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_defaults() {
        let cli = Cli::parse_from(["jobscout", "import", "jobs.csv"]);
        let Command::Import(args) = cli.command else {
            panic!("expected import command");
        };
        assert_eq!(args.batch_size, 10);
        assert_eq!(args.start_idx, 0);
        assert!(!args.load_backup);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_global_flags_and_overrides() {
        let cli = Cli::parse_from([
            "jobscout",
            "import",
            "jobs.csv",
            "--verbose",
            "--output-dir",
            "out",
            "--batch-size",
            "0",
        ]);
        assert!(cli.verbose);
        let Command::Import(args) = cli.command else {
            panic!("expected import command");
        };
        assert!(args.validate().is_err());

        let mut config = AppConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.output.output_dir, "out");
    }

    #[test]
    fn test_resolve_date_reference() {
        let cli = Cli::parse_from([
            "jobscout",
            "resolve-date",
            "2 days ago",
            "--reference",
            "2024-03-01T10:00:00",
        ]);
        match cli.command {
            Command::ResolveDate { text, reference } => {
                assert_eq!(text, "2 days ago");
                assert!(reference.is_some());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_csv_input() {
        let cli = Cli::parse_from(["jobscout", "import", "jobs.xlsx"]);
        let Command::Import(args) = cli.command else {
            panic!("expected import command");
        };
        assert!(args.validate().is_err());
    }
}
