//! Harvest module - plugin discovery, extraction and scan document persistence.
//!
//! This module provides the scan pipeline for the harvester:
//! - **Traits**: [`ModuleFilter`] for selecting module candidates
//! - **Discovery**: recursive walk via [`Discoverer`]
//! - **Extraction**: [`HostedExtractor`] over any [`ModuleHost`](crate::traits::ModuleHost)
//! - **Store**: path-deduplicated [`RecordStore`] with append-only merge
//! - **Codec**: JSON scan documents via [`codec`]
//! - **Pipeline**: orchestration via [`pipeline::ScanPipeline`]

pub mod codec;
pub mod discovery;
pub mod extract;
pub mod formats;
pub mod pipeline;
pub mod store;
pub mod traits;

// Re-export commonly used types
pub use traits::{CodecError, DiscoveryError, ModuleFilter};

pub use discovery::{Discoverer, Discovery};
pub use extract::{select_class, HostedExtractor, NO_CLASSES_MESSAGE};
pub use formats::moduleinfo::{ModuleInfo, ModuleInfoHost};
pub use formats::Platform;
pub use pipeline::{PipelineError, RunMode, ScanPipeline, ScanStats};
pub use store::{merge, MergeSummary, RecordStore};
