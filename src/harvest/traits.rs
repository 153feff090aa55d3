//! Core traits and error types for the harvest pipeline.
//!
//! - Candidate selection via [`ModuleFilter`]
//! - Discovery failures via [`DiscoveryError`]
//! - Scan document failures via [`CodecError`]

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Module Filter Trait
// ============================================================================

/// Predicate deciding whether a file found during discovery is a plugin
/// module candidate.
///
/// Implementations must be pure: the answer depends only on the file's
/// extension and name, never on its contents or on global state. This lets a
/// scan use another platform's rules without recompiling.
///
/// Closures of the form `Fn(&str, &str) -> bool` implement this trait, so
/// tests can inject ad-hoc rules.
pub trait ModuleFilter: Send + Sync {
    /// Returns `true` if the file is a module candidate.
    ///
    /// # Arguments
    ///
    /// * `extension` - Extension without the leading dot, empty if none
    /// * `file_name` - Final path component
    fn matches(&self, extension: &str, file_name: &str) -> bool;
}

impl<F> ModuleFilter for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn matches(&self, extension: &str, file_name: &str) -> bool {
        self(extension, file_name)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can interrupt directory discovery.
///
/// These are never fatal to a run; the discoverer reports them alongside the
/// paths collected so far.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Traversal failed at a specific path
    #[error("Error scanning directory {path}: {reason}")]
    Traversal { path: PathBuf, reason: String },

    /// Traversal failed without a path (e.g. symlink loop reported by the walker)
    #[error("Error scanning directory: {0}")]
    Walk(String),
}

impl From<walkdir::Error> for DiscoveryError {
    fn from(e: walkdir::Error) -> Self {
        match e.path() {
            Some(path) => DiscoveryError::Traversal {
                path: path.to_path_buf(),
                reason: e
                    .io_error()
                    .map(|io| io.to_string())
                    .unwrap_or_else(|| e.to_string()),
            },
            None => DiscoveryError::Walk(e.to_string()),
        }
    }
}

/// Errors that can occur while reading or writing scan documents.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Document could not be parsed (syntax error or wrongly typed value)
    #[error("Failed to parse scan document: {0}")]
    Parse(#[source] serde_json::Error),

    /// Document could not be serialized
    #[error("Failed to serialize scan document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
