use clap::Parser;
use jobscout::app::build_import_engine;
use jobscout::config::cli::{Cli, Command, ImportArgs};
use jobscout::core::backup::consolidate_backups;
use jobscout::core::time_resolver::{resolve, resolve_now};
use jobscout::utils::error::{ErrorSeverity, ScoutError};
use jobscout::utils::{logger, validation::Validate};
use jobscout::{dedup_key, AppConfig};
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.verbose, cli.json_logs);
    tracing::debug!("CLI arguments: {:?}", cli);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(
                "❌ jobscout failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            }
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32, ScoutError> {
    match cli.command {
        Command::Import(args) => {
            let mut config = AppConfig::load(cli.config.as_deref())?;
            args.apply_to(&mut config);
            config.validate()?;
            args.validate()?;
            run_import(&config, &args).await
        }
        Command::ConsolidateBackups { backup_dir } => {
            let mut config = AppConfig::load(cli.config.as_deref())?;
            if let Some(dir) = backup_dir {
                config.output.backup_dir = dir;
            }
            let summary = consolidate_backups(
                Path::new(&config.output.backup_dir),
                chrono::Local::now().date_naive(),
            )?;
            println!(
                "Appended {} new jobs from {} files to {}",
                summary.appended,
                summary.sources,
                summary.path.display()
            );
            Ok(0)
        }
        Command::ResolveDate { text, reference } => {
            let date = match reference {
                Some(reference) => resolve(&text, reference),
                None => resolve_now(&text),
            };
            println!("{}", date.format("%Y-%m-%d"));
            Ok(0)
        }
        Command::DedupKey {
            title,
            company,
            posted_date,
        } => {
            println!("{}", dedup_key(&title, &company, posted_date.as_deref()));
            Ok(0)
        }
    }
}

async fn run_import(config: &AppConfig, args: &ImportArgs) -> Result<i32, ScoutError> {
    tracing::info!("Starting jobscout import of {}", args.csv.display());

    if args.load_backup {
        tracing::info!("Loading backup data...");
        consolidate_backups(
            Path::new(&config.output.backup_dir),
            chrono::Local::now().date_naive(),
        )?;
    }

    let engine = build_import_engine(
        config,
        &args.csv,
        args.batch_size,
        args.start_idx,
        chrono::Local::now().naive_local(),
    )
    .await?;
    let stats = engine.run().await?;

    println!("✅ Import completed!");
    println!("   Total jobs in CSV: {}", stats.total_jobs);
    println!("   Jobs analyzed:     {}", stats.analyzed);
    println!("   Jobs inserted:     {}", stats.inserted);
    println!("   Duplicates:        {}", stats.duplicates);
    println!("   Errors:            {}", stats.errors);
    println!(
        "📁 Analyzed data saved to: {}/{}",
        config.output.output_dir,
        engine.pipeline().export_file()
    );

    Ok(if stats.errors > 0 { 1 } else { 0 })
}
