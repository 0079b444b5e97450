// src/pipeline/harvest.rs

//! Keyword batch orchestration for one source.
//!
//! Each keyword goes through query, normalization, deduplication and
//! accumulation before the next one starts. Between keywords the pacing
//! policy decides how long to cool down. The identifier cache is persisted
//! when the run ends, including runs that abort or are cancelled.

use std::fmt;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};

use crate::error::AppError;
use crate::export::{self, ExportFormat};
use crate::models::{KeywordBatch, ResultCollection};
use crate::sources::{ResultKind, SourceAdapter};
use crate::storage::{IdentifierCache, PersistGuard};

use super::normalize::Normalizer;
use super::pacing::{PacingPolicy, pause};

/// Where the run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Querying,
    Normalizing,
    Deduplicating,
    Accumulated,
    Pacing,
    Finalizing,
    Done,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Keywords whose query succeeded
    pub keywords: usize,
    /// Records produced by normalization
    pub seen: usize,
    /// Records dropped because their identifier was already known
    pub duplicates: usize,
    /// Raw results that could not be normalized
    pub rejected: usize,
    /// Records appended to the collection
    pub accumulated: usize,
    /// Cooldowns taken between keywords
    pub pauses: usize,
    pub checkpoints: usize,
    pub checkpoint_failures: usize,
    /// Whether the identifier cache was saved at the end of the run
    pub cache_persisted: bool,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Done,
    /// The adapter failed; remaining keywords for this source were skipped.
    Aborted { keyword: String, error: AppError },
}

/// Result of running one source over a keyword batch.
#[derive(Debug)]
pub struct RunReport {
    pub tag: String,
    pub kind: ResultKind,
    pub collection: ResultCollection,
    pub stats: RunStats,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Aborted { .. })
    }
}

/// Runs keyword batches against sources, deduplicating through one cache.
pub struct QueryPipeline<'a> {
    cache: &'a mut IdentifierCache,
    pacing: &'a dyn PacingPolicy,
    checkpoint_dir: Option<PathBuf>,
    today: NaiveDate,
}

impl<'a> QueryPipeline<'a> {
    pub fn new(cache: &'a mut IdentifierCache, pacing: &'a dyn PacingPolicy) -> Self {
        Self {
            cache,
            pacing,
            checkpoint_dir: None,
            today: Local::now().date_naive(),
        }
    }

    /// Write the running collection to `dir` after every keyword.
    pub fn with_checkpoints(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Date used in file names and for page-derived records.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn cache(&self) -> &IdentifierCache {
        self.cache
    }

    /// Run every keyword of `batch` against `adapter`.
    pub async fn run(&mut self, adapter: &dyn SourceAdapter, batch: &KeywordBatch) -> RunReport {
        let tag = adapter.tag().to_string();
        let kind = adapter.result_kind();
        let normalizer = Normalizer::new(adapter.tag(), adapter.field_mapping());
        let today = self.today;
        let pacing = self.pacing;
        let checkpoint_dir = self.checkpoint_dir.clone();

        let mut cache = PersistGuard::new(&mut *self.cache);
        let mut collection = ResultCollection::new();
        let mut stats = RunStats::default();
        let mut outcome = RunOutcome::Done;

        let keywords: Vec<&str> = batch.keywords().collect();
        let total = keywords.len();
        transition(&tag, Stage::Idle, total);

        for (index, keyword) in keywords.iter().copied().enumerate() {
            log::info!("[{tag}] ({}/{total}) searching '{keyword}'", index + 1);

            transition(&tag, Stage::Querying, index);
            let raw = match adapter.query(keyword).await {
                Ok(raw) => raw,
                Err(error) => {
                    log::error!("[{tag}] {error}; skipping remaining keywords");
                    outcome = RunOutcome::Aborted {
                        keyword: keyword.to_string(),
                        error,
                    };
                    break;
                }
            };
            stats.keywords += 1;

            transition(&tag, Stage::Normalizing, raw.len());
            let mut records = Vec::with_capacity(raw.len());
            for item in &raw {
                match normalizer.normalize(kind, item, today) {
                    Ok(normalized) => records.extend(normalized),
                    Err(e) => {
                        stats.rejected += 1;
                        log::warn!("[{tag}] dropped a result for '{keyword}': {e}");
                    }
                }
            }
            stats.seen += records.len();

            transition(&tag, Stage::Deduplicating, records.len());
            let mut added = 0;
            for record in records {
                if cache.is_duplicate(record.identifier()) {
                    stats.duplicates += 1;
                    log::debug!("[{tag}] duplicate {}", record.identifier());
                    continue;
                }
                cache.record(record.identifier());
                collection.append(record);
                added += 1;
            }
            stats.accumulated += added;

            transition(&tag, Stage::Accumulated, collection.len());
            log::info!("[{tag}] '{keyword}': {} results, {added} new", raw.len());

            if let Some(dir) = &checkpoint_dir {
                checkpoint(&collection, dir, &tag, kind, keyword, today, &mut stats);
            }

            let remaining = total - index - 1;
            if remaining > 0 {
                transition(&tag, Stage::Pacing, remaining);
                if pause(pacing, remaining).await {
                    stats.pauses += 1;
                }
            }
        }

        transition(&tag, Stage::Finalizing, collection.len());
        stats.cache_persisted = match cache.finish() {
            Ok(()) => true,
            Err(e) => {
                log::error!("[{tag}] {e}");
                false
            }
        };

        let end = match &outcome {
            RunOutcome::Done => Stage::Done,
            RunOutcome::Aborted { .. } => Stage::Aborted,
        };
        transition(&tag, end, collection.len());

        crate::utils::log::summary(
            &format!("{tag} ({kind})"),
            &[
                ("Keywords queried", format!("{}/{total}", stats.keywords)),
                ("Records seen", stats.seen.to_string()),
                ("Duplicates dropped", stats.duplicates.to_string()),
                ("Rejected", stats.rejected.to_string()),
                ("Accumulated", stats.accumulated.to_string()),
                ("Checkpoint failures", stats.checkpoint_failures.to_string()),
                ("Outcome", end.to_string()),
            ],
        );

        RunReport {
            tag,
            kind,
            collection,
            stats,
            outcome,
        }
    }
}

fn transition(tag: &str, stage: Stage, detail: usize) {
    log::debug!("[{tag}] -> {stage} ({detail})");
}

fn checkpoint(
    collection: &ResultCollection,
    dir: &std::path::Path,
    tag: &str,
    kind: ResultKind,
    keyword: &str,
    today: NaiveDate,
    stats: &mut RunStats,
) {
    if collection.is_empty() {
        log::debug!("[{tag}] nothing to checkpoint yet");
        return;
    }

    let name = export::file_name(tag, kind.as_str(), Some(keyword), today, ExportFormat::Csv);
    let path = dir.join(name);
    match collection.export(ExportFormat::Csv, &path) {
        Ok(()) => {
            stats.checkpoints += 1;
            log::debug!("[{tag}] checkpoint written to {}", path.display());
        }
        Err(e) => {
            stats.checkpoint_failures += 1;
            log::warn!("[{tag}] checkpoint failed: {e}");
        }
    }
}
