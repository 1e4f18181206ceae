//! Assembles the import workflow from an `AppConfig`.

use crate::adapters::csv_export::CsvExporter;
use crate::adapters::gemini::{GeminiClient, GeminiEmbed, GeminiGenerate};
use crate::adapters::storage::LocalStorage;
use crate::adapters::store::{SqliteJobStore, STORE_FILE};
use crate::config::AppConfig;
use crate::core::analysis::{load_skill_tags, Analyzer};
use crate::core::engine::ImportEngine;
use crate::core::enrichment::Enricher;
use crate::core::import::ImportPipeline;
use crate::core::key_pool::KeyPool;
use crate::core::persist::JobInserter;
use crate::core::rate_limit::CallSpacing;
use crate::core::resilient::{CredentialMatcher, ResilientClient};
use crate::utils::error::Result;
use chrono::NaiveDateTime;
use std::path::Path;
use std::sync::Arc;

pub type LocalImportEngine = ImportEngine<ImportPipeline<LocalStorage, SqliteJobStore>>;

/// Analysis and optional embedding clients sharing one key pool and one call spacing.
pub fn build_enricher(config: &AppConfig) -> Result<Enricher> {
    let pool = Arc::new(KeyPool::from_file(&config.api.key_file)?);
    let spacing = Arc::new(CallSpacing::new(config.min_call_interval()));
    let client = GeminiClient::new(&config.api.base_url, config.request_timeout())?;

    let generate = ResilientClient::new(
        GeminiGenerate::new(client.clone(), &config.api.analysis_model),
        Arc::clone(&pool),
    )
    .with_spacing(Arc::clone(&spacing))
    .with_label("analysis");

    let mut analyzer = Analyzer::new(generate);
    if let Some(file) = &config.enrichment.instruction_file {
        analyzer = analyzer.with_instruction(std::fs::read_to_string(file)?);
    }
    if let Some(file) = &config.enrichment.skill_tags_file {
        analyzer = analyzer.with_skill_tags(load_skill_tags(file)?);
    }

    let mut enricher = Enricher::new(Arc::new(analyzer))
        .with_concurrency(config.enrichment.concurrency)
        .with_task_deadline(config.task_deadline());
    if let Some(deadline) = config.batch_deadline() {
        enricher = enricher.with_batch_deadline(deadline);
    }

    if config.enrichment.embeddings {
        let embed = ResilientClient::new(
            GeminiEmbed::new(client, &config.api.embedding_model),
            pool,
        )
        .with_spacing(spacing)
        .with_matcher(CredentialMatcher::default().with_marker("internal"))
        .with_label("embedding");
        enricher = enricher
            .with_embedder(Arc::new(embed))
            .require_embeddings(config.enrichment.embeddings_required);
    }

    Ok(enricher)
}

/// Creates the CSV export for this run and opens the job store.
pub async fn build_import_engine(
    config: &AppConfig,
    csv: &Path,
    batch_size: usize,
    start_idx: usize,
    now: NaiveDateTime,
) -> Result<LocalImportEngine> {
    let enricher = build_enricher(config)?;

    let exporter = CsvExporter::new(LocalStorage::new(&config.output.output_dir));
    let export_file =
        CsvExporter::<LocalStorage>::generate_filename(&config.output.export_prefix, now);
    exporter.create(&export_file).await?;

    let store = SqliteJobStore::open(Path::new(&config.output.store_dir).join(STORE_FILE)).await?;
    let inserter = JobInserter::open(store).await?;

    let pipeline = ImportPipeline::new(csv, now, enricher, exporter, export_file, inserter);
    Ok(ImportEngine::new(pipeline)
        .with_batch_size(batch_size)
        .with_start_idx(start_idx))
}
