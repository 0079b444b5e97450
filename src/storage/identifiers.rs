// src/storage/identifiers.rs

//! Persistent set of identifiers already harvested.
//!
//! ## Store Layout
//!
//! ```text
//! {data_dir}/doi_cache.txt     # one normalized identifier per line, sorted
//! ```
//!
//! The store is rewritten in full on every persist (temp file + rename), so
//! it never accumulates duplicate lines across runs. Concurrent runs against
//! the same store are not coordinated.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};

static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("DOI pattern is valid"));

const DOI_PREFIXES: &[&str] = &["urn:doi:", "doi:"];

const RESOLVER_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

/// Normalize an identifier into its cache key.
///
/// Returns `None` when nothing usable is left, meaning the record cannot
/// take part in deduplication.
///
/// # Examples
/// ```
/// use harvester::storage::normalize_identifier;
///
/// assert_eq!(
///     normalize_identifier(" https://doi.org/10.5061/DRYAD.ABC "),
///     Some("10.5061/dryad.abc".to_string())
/// );
/// assert_eq!(normalize_identifier("   "), None);
/// ```
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let mut id = raw.trim();

    let lower = id.to_ascii_lowercase();
    if let Some(prefix) = DOI_PREFIXES
        .iter()
        .chain(RESOLVER_PREFIXES)
        .find(|p| lower.starts_with(*p))
    {
        id = id[prefix.len()..].trim_start();
    }

    if id.is_empty() {
        return None;
    }

    if DOI_RE.is_match(id) {
        Some(id.to_lowercase())
    } else {
        Some(id.to_string())
    }
}

/// Whether a normalized key has the shape of a DOI.
pub fn is_doi(key: &str) -> bool {
    DOI_RE.is_match(key)
}

/// Identifiers seen in this and previous runs.
#[derive(Debug, Default)]
pub struct IdentifierCache {
    seen: HashSet<String>,
    store: Option<PathBuf>,
}

impl IdentifierCache {
    /// A cache with no backing store; `persist` is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A cache bound to `path` without reading it.
    pub fn empty_at(path: impl Into<PathBuf>) -> Self {
        Self {
            seen: HashSet::new(),
            store: Some(path.into()),
        }
    }

    /// Load the snapshot at `path`; a missing snapshot yields an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let seen = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes)
                .lines()
                .filter_map(normalize_identifier)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No identifier cache at {}, starting empty", path.display());
                HashSet::new()
            }
            Err(e) => return Err(AppError::cache(&path, e)),
        };

        log::debug!("Loaded {} identifiers from {}", seen.len(), path.display());
        Ok(Self {
            seen,
            store: Some(path),
        })
    }

    /// Load the snapshot, degrading to an empty cache bound to the same path.
    ///
    /// Identifiers seen during the run are still deduplicated against each
    /// other; only the baseline from earlier runs is lost.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!("{e}. Continuing with an empty identifier cache.");
            Self::empty_at(path)
        })
    }

    /// Whether `identifier` was already recorded.
    ///
    /// Empty identifiers are never duplicates.
    pub fn is_duplicate(&self, identifier: &str) -> bool {
        normalize_identifier(identifier).is_some_and(|key| self.seen.contains(&key))
    }

    /// Record an identifier; returns `true` if it was new.
    ///
    /// Empty identifiers are ignored.
    pub fn record(&mut self, identifier: &str) -> bool {
        match normalize_identifier(identifier) {
            Some(key) => self.seen.insert(key),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Backing store path, if any.
    pub fn store_path(&self) -> Option<&Path> {
        self.store.as_deref()
    }

    /// Replace the durable snapshot with the current set.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.store else {
            return Ok(());
        };

        let mut keys: Vec<&str> = self.seen.iter().map(String::as_str).collect();
        keys.sort_unstable();

        write_atomic(path, &keys).map_err(|e| AppError::cache(path, e))?;
        log::debug!("Persisted {} identifiers to {}", keys.len(), path.display());
        Ok(())
    }
}

/// Write lines to a temp sibling, then rename it over `path`.
fn write_atomic(path: &Path, lines: &[&str]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)
}

/// Persists the wrapped cache when dropped, unless [`finish`] already did.
///
/// A run that is cancelled (its future dropped) or unwinds still leaves the
/// identifiers it collected on disk.
///
/// [`finish`]: PersistGuard::finish
pub struct PersistGuard<'a> {
    cache: &'a mut IdentifierCache,
    armed: bool,
}

impl<'a> PersistGuard<'a> {
    pub fn new(cache: &'a mut IdentifierCache) -> Self {
        Self { cache, armed: true }
    }

    /// Persist now and disarm the guard.
    pub fn finish(mut self) -> Result<()> {
        self.armed = false;
        self.cache.persist()
    }
}

impl Deref for PersistGuard<'_> {
    type Target = IdentifierCache;

    fn deref(&self) -> &Self::Target {
        self.cache
    }
}

impl DerefMut for PersistGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cache
    }
}

impl Drop for PersistGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.cache.persist() {
            Ok(()) => log::warn!(
                "Run ended early; identifier cache persisted ({} entries)",
                self.cache.len()
            ),
            Err(e) => log::error!("Run ended early and the identifier cache was not saved: {e}"),
        }
    }
}
