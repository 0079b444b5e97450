// src/bin/cli.rs

//! Harvester CLI
//!
//! Local execution entry point for batch harvests and uploads.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, Subcommand};
use harvester::{
    config::{DataDir, load_config, load_keywords},
    error::{AppError, Result},
    export::{self, ExportFormat, IdentifierResolver, RemoteExportReport, export_to_repository},
    models::{Config, ResultCollection, SourceConfig},
    pipeline::{FixedCooldown, NoPacing, PacingPolicy, QueryPipeline, RunOutcome},
    services::{DSpaceClient, DoiResolver},
    sources::build_adapter,
    storage::IdentifierCache,
    utils::{self, http},
};

/// Harvester - Scholarly Dataset Metadata Harvester
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Harvest dataset metadata from scholarly repositories"
)]
struct Cli {
    /// Directory holding the configuration, keyword list and identifier cache
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Configuration file (default: {data_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query every selected source for every keyword
    Harvest {
        /// Only run these sources (repeatable; default: all)
        #[arg(short, long = "source", value_name = "TAG")]
        sources: Vec<String>,

        /// Keyword list (default: harvest.keywords_file)
        #[arg(short, long)]
        keywords: Option<PathBuf>,

        /// Skip the pause between keywords
        #[arg(long)]
        no_cooldown: bool,

        /// Push the harvested records to the remote repository
        #[arg(long)]
        upload: bool,

        /// Export format for each source's records: csv, json, dublin-core (repeatable)
        #[arg(short, long = "format", value_name = "FORMAT", default_value = "csv")]
        formats: Vec<ExportFormat>,
    },

    /// Push a previous tabular export to the remote repository
    Upload {
        /// CSV export to read
        #[arg(short, long)]
        input: PathBuf,

        /// Target collection (default: remote.collection_id)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Validate configuration files
    Validate,

    /// Show cache and source info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Harvester starting...");

    let data = DataDir::new(&cli.data_dir);
    let config_path = cli.config.clone().unwrap_or_else(|| data.config_path());

    let success = match cli.command {
        Command::Harvest {
            sources,
            keywords,
            no_cooldown,
            upload,
            formats,
        } => {
            let config = load_config(&config_path)?;
            log::info!("Loaded configuration from {}", config_path.display());
            let options = HarvestOptions {
                keywords,
                no_cooldown,
                upload,
                formats,
            };
            harvest(&config, &data, &sources, options).await?
        }

        Command::Upload { input, collection } => {
            let config = load_config(&config_path)?;
            let records = ResultCollection::read_csv(&input)?;
            log::info!("Read {} records from {}", records.len(), input.display());

            let collection_id = collection.unwrap_or_else(|| config.remote.collection_id.clone());
            let report = upload(&config, &records, &collection_id).await?;
            report_upload(&report)
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            let config = match Config::load(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Cannot load {}: {}", config_path.display(), e);
                    return Err(e);
                }
            };
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} sources)", config.sources.len());

            let keywords_path = data.keywords_path(&config);
            match load_keywords(&keywords_path) {
                Ok(batch) => log::info!("✓ Keyword list OK ({} keywords)", batch.len()),
                Err(e) => log::warn!("Keyword list: {}", e),
            }

            log::info!("All validations passed!");
            true
        }

        Command::Info => {
            let config = Config::load_or_default(&config_path);
            log::info!("Data directory: {}", data.root().display());
            log::info!("Configuration: {}", config_path.display());

            let cache_path = data.cache_path(&config);
            match IdentifierCache::load(&cache_path) {
                Ok(cache) => log::info!(
                    "Identifier cache: {} ({} identifiers)",
                    cache_path.display(),
                    cache.len()
                ),
                Err(e) => log::warn!("Identifier cache {}: {}", cache_path.display(), e),
            }
            log::info!("Output directory: {}", data.output_dir(&config).display());

            if config.sources.is_empty() {
                log::info!("No sources configured.");
            }
            for source in &config.sources {
                log::info!(
                    "Source '{}' ({:?}, {} page(s)): {}",
                    source.tag,
                    source.kind,
                    source.max_pages,
                    source.url
                );
            }
            true
        }
    };

    if success {
        log::info!("Done!");
        Ok(ExitCode::SUCCESS)
    } else {
        log::error!("Finished with failures");
        Ok(ExitCode::FAILURE)
    }
}

/// Per-invocation switches of the `harvest` command.
struct HarvestOptions {
    keywords: Option<PathBuf>,
    no_cooldown: bool,
    upload: bool,
    formats: Vec<ExportFormat>,
}

/// Run the selected sources over the keyword list, sharing one cache.
///
/// Returns `false` when any source aborted, any export failed, or the
/// upload was incomplete.
async fn harvest(
    config: &Config,
    data: &DataDir,
    tags: &[String],
    options: HarvestOptions,
) -> Result<bool> {
    let HarvestOptions {
        keywords,
        no_cooldown,
        upload: upload_after,
        formats,
    } = options;
    let formats = distinct(formats);

    let selected = select_sources(config, tags)?;
    let batch = load_keywords(&keywords.unwrap_or_else(|| data.keywords_path(config)))?;
    let output_dir = data.output_dir(config);
    let client = http::create_client(&config.http)?;
    let today = Local::now().date_naive();

    let pacing: Box<dyn PacingPolicy> = if no_cooldown {
        Box::new(NoPacing)
    } else {
        Box::new(FixedCooldown(config.harvest.cooldown()))
    };

    utils::log::header(&format!(
        "Harvesting {} keywords from {} sources",
        batch.len(),
        selected.len()
    ));

    let mut cache = IdentifierCache::load_or_empty(data.cache_path(config));
    let mut pipeline = QueryPipeline::new(&mut cache, pacing.as_ref()).with_date(today);
    if config.harvest.checkpoint {
        pipeline = pipeline.with_checkpoints(&output_dir);
    }

    let mut success = true;
    let mut harvested = ResultCollection::new();

    for (index, source) in selected.iter().enumerate() {
        utils::log::step(index + 1, selected.len(), &format!("Source '{}'", source.tag));
        let adapter = build_adapter(source, client.clone());

        let report = tokio::select! {
            report = pipeline.run(adapter.as_ref(), &batch) => report,
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted during '{}'; identifier cache saved", source.tag);
                success = false;
                break;
            }
        };

        if let RunOutcome::Aborted { keyword, error } = &report.outcome {
            log::error!("Source '{}' aborted at '{keyword}': {error}", report.tag);
            success = false;
        }

        if !report.collection.is_empty() {
            for &format in &formats {
                let name =
                    export::file_name(&report.tag, report.kind.as_str(), None, today, format);
                let path = output_dir.join(name);
                match report.collection.export(format, &path) {
                    Ok(()) => log::info!(
                        "Saved {} records to {}",
                        report.collection.len(),
                        path.display()
                    ),
                    Err(e) => {
                        log::error!("{e}");
                        success = false;
                    }
                }
            }
        }

        harvested.extend(report.collection);
    }
    drop(pipeline);
    log::info!("Identifier cache holds {} identifiers", cache.len());

    if upload_after && success {
        if harvested.is_empty() {
            log::info!("Nothing new to upload");
        } else {
            let report = upload(config, &harvested, &config.remote.collection_id).await?;
            success &= report_upload(&report);
        }
    } else if upload_after {
        log::warn!("Skipping upload because the harvest did not complete");
    }

    Ok(success)
}

/// Drop repeated formats, keeping the first mention of each.
fn distinct(formats: Vec<ExportFormat>) -> Vec<ExportFormat> {
    let mut kept = Vec::with_capacity(formats.len());
    for format in formats {
        if !kept.contains(&format) {
            kept.push(format);
        }
    }
    kept
}

/// Configured sources matching `tags`, or all of them when none are given.
fn select_sources<'a>(config: &'a Config, tags: &[String]) -> Result<Vec<&'a SourceConfig>> {
    if config.sources.is_empty() {
        return Err(AppError::config("No sources configured"));
    }
    if tags.is_empty() {
        return Ok(config.sources.iter().collect());
    }
    tags.iter()
        .map(|tag| {
            config
                .source(tag)
                .ok_or_else(|| AppError::config(format!("Unknown source '{tag}'")))
        })
        .collect()
}

async fn upload(
    config: &Config,
    records: &ResultCollection,
    collection_id: &str,
) -> Result<RemoteExportReport> {
    let client = DSpaceClient::from_env(&config.remote, &config.http)?;
    let resolver = if config.remote.resolve_identifiers {
        Some(DoiResolver::new(
            http::create_client(&config.http)?,
            &config.remote.resolver_url,
        ))
    } else {
        None
    };
    let pacing = FixedCooldown(config.remote.item_delay());

    utils::log::header(&format!(
        "Uploading {} records to {}",
        records.len(),
        config.remote.base_url
    ));
    export_to_repository(
        records,
        &client,
        collection_id,
        &pacing,
        resolver.as_ref().map(|r| r as &dyn IdentifierResolver),
    )
    .await
}

fn report_upload(report: &RemoteExportReport) -> bool {
    utils::log::summary(
        "Upload",
        &[
            ("Attempted", report.attempted.to_string()),
            ("Created", report.succeeded.to_string()),
            ("Refused", report.failed().to_string()),
        ],
    );
    for failure in &report.failures {
        log::warn!(
            "  #{} '{}' ({}): {}",
            failure.index + 1,
            failure.title,
            display_or_dash(&failure.identifier),
            failure.message
        );
    }
    report.is_complete()
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
