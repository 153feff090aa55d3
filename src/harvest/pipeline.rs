//! Scan pipeline orchestrator.
//!
//! This module provides the [`ScanPipeline`] coordinator that runs one scan:
//! load (cumulative mode only) → Discover → Extract → Merge → Write.
//! - Extraction through [`ScanExecutor`], sequential unless more jobs are configured
//! - Optional per-module timeout
//! - Structured logging via `tracing`
//!
//! Fresh and cumulative runs share the same path; a fresh run simply starts
//! from an empty [`RecordStore`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::executor::ScanExecutor;
use crate::harvest::codec;
use crate::harvest::discovery::Discoverer;
use crate::harvest::store::RecordStore;
use crate::harvest::traits::{CodecError, ModuleFilter};
use crate::traits::MetadataExtractor;

// ============================================================================
// Pipeline Types
// ============================================================================

/// How a run treats prior results and where it writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Ignore prior state; write to `output`, or to the caller's writer when `None`.
    Fresh { output: Option<PathBuf> },

    /// Merge into the document at `target` and write it back there.
    Cumulative { target: PathBuf },
}

impl RunMode {
    /// Where the document goes, for messages.
    pub fn destination(&self) -> String {
        match self {
            RunMode::Fresh { output: None } => "stdout".to_string(),
            RunMode::Fresh { output: Some(path) } => path.display().to_string(),
            RunMode::Cumulative { target } => target.display().to_string(),
        }
    }
}

/// Statistics about a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Records loaded from the cumulative document
    pub existing: usize,

    /// Module candidates found by discovery
    pub discovered: usize,

    /// Discovered modules that extracted successfully
    pub extracted_valid: usize,

    /// Incoming records appended to the store
    pub added: usize,

    /// Incoming records dropped because their path was already stored
    pub skipped: usize,

    /// Records in the written document
    pub total: usize,

    /// Valid records in the written document
    pub valid: usize,

    /// Time spent on discovery (milliseconds)
    pub discovery_duration_ms: u64,

    /// Time spent on extraction (milliseconds)
    pub extraction_duration_ms: u64,

    /// Total time spent on the run (milliseconds)
    pub total_duration_ms: u64,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Failures that end a run without a document being written.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The cumulative document exists but could not be read or parsed
    #[error("Could not load existing scan document {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// The document could not be written to its destination
    #[error("Could not write scan document to {destination}: {source}")]
    Write {
        destination: String,
        #[source]
        source: CodecError,
    },
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Discovery, extraction and persistence for one scan run.
///
/// # Example
///
/// ```ignore
/// use vst_harvester::harvest::{HostedExtractor, ModuleInfoHost, Platform, ScanPipeline, RunMode};
/// use std::time::Duration;
///
/// let pipeline = ScanPipeline::new(Platform::current(), HostedExtractor::new(ModuleInfoHost::new()))
///     .with_jobs(4)
///     .with_timeout(Some(Duration::from_secs(60)));
///
/// let mode = RunMode::Cumulative { target: "plugins.json".into() };
/// let stats = pipeline.execute(Path::new("/usr/lib/vst3"), &mode, &mut std::io::stdout()).await?;
/// ```
pub struct ScanPipeline<F, X>
where
    F: ModuleFilter,
    X: MetadataExtractor + 'static,
{
    discoverer: Discoverer<F>,
    extractor: Arc<X>,

    /// Maximum concurrent extractions (default: 1)
    jobs: usize,

    /// Per-module extraction limit (default: none)
    module_timeout: Option<Duration>,
}

impl<F, X> ScanPipeline<F, X>
where
    F: ModuleFilter,
    X: MetadataExtractor + 'static,
{
    /// Creates a sequential pipeline without an extraction timeout.
    pub fn new(filter: F, extractor: X) -> Self {
        Self {
            discoverer: Discoverer::new(filter),
            extractor: Arc::new(extractor),
            jobs: 1,
            module_timeout: None,
        }
    }

    /// Sets how many modules may be extracted at once.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Sets the per-module extraction limit.
    pub fn with_timeout(mut self, module_timeout: Option<Duration>) -> Self {
        self.module_timeout = module_timeout;
        self
    }

    /// Discovers and extracts every module under `root`, then merges the
    /// results into `store`.
    pub async fn scan(&self, root: &Path, store: &mut RecordStore) -> ScanStats {
        let start = Instant::now();
        let mut stats = ScanStats {
            existing: store.len(),
            ..Default::default()
        };

        info!("Scanning directory: {}", root.display());

        let discovery_start = Instant::now();
        let discovery = self.discoverer.discover(root);
        if let Some(e) = &discovery.error {
            warn!(error = %e, collected = discovery.paths.len(), "Discovery stopped early");
        }
        stats.discovered = discovery.paths.len();
        stats.discovery_duration_ms = discovery_start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.discovery_duration_ms,
            "Found {} VST files", stats.discovered
        );

        let extraction_start = Instant::now();
        let incoming = ScanExecutor::new(self.jobs)
            .with_timeout(self.module_timeout)
            .execute(Arc::clone(&self.extractor), discovery.paths)
            .await;
        stats.extracted_valid = incoming.iter().filter(|r| r.is_valid).count();
        stats.extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

        let summary = store.merge(incoming);
        stats.added = summary.added;
        stats.skipped = summary.skipped;
        stats.total = store.len();
        stats.valid = store.valid_count();
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            added = stats.added,
            skipped = stats.skipped,
            "Merged {} new plugins with {} existing plugins. Total: {}",
            stats.discovered,
            stats.existing,
            stats.total
        );

        stats
    }

    /// Runs a complete scan in `mode`.
    ///
    /// In fresh mode without an output file the document goes to `stdout`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if:
    /// - the cumulative document exists but cannot be read or parsed (nothing
    ///   is scanned or written in that case)
    /// - the document cannot be written
    pub async fn execute<W: Write>(
        &self,
        root: &Path,
        mode: &RunMode,
        stdout: &mut W,
    ) -> Result<ScanStats, PipelineError> {
        let mut store = match mode {
            RunMode::Fresh { .. } => RecordStore::new(),
            RunMode::Cumulative { target } => {
                info!("Loading existing plugins from: {}", target.display());
                let records = codec::read_file(target).map_err(|source| PipelineError::Load {
                    path: target.clone(),
                    source,
                })?;
                info!("Found {} existing plugins", records.len());
                RecordStore::from_records(records)
            }
        };

        let stats = self.scan(root, &mut store).await;

        let written = match mode {
            RunMode::Fresh { output: None } => codec::write(store.records(), stdout),
            RunMode::Fresh { output: Some(path) } => codec::write_file(store.records(), path),
            RunMode::Cumulative { target } => codec::write_file(store.records(), target),
        };
        written.map_err(|source| PipelineError::Write {
            destination: mode.destination(),
            source,
        })?;

        info!(
            total = stats.total,
            valid = stats.valid,
            duration_ms = stats.total_duration_ms,
            "Results written to: {}",
            mode.destination()
        );

        Ok(stats)
    }
}

// ============================================================================
// Tests
// ============================================================================
