//! Recursive discovery of plugin module candidates.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::harvest::traits::{DiscoveryError, ModuleFilter};

/// Outcome of a discovery walk.
///
/// `error` is set when the walk stopped early; `paths` then holds everything
/// collected before the failure.
#[derive(Debug, Default)]
pub struct Discovery {
    pub paths: Vec<String>,
    pub error: Option<DiscoveryError>,
}

/// Walks a directory tree and collects files accepted by a [`ModuleFilter`].
pub struct Discoverer<F: ModuleFilter> {
    filter: F,
}

impl<F: ModuleFilter> Discoverer<F> {
    pub fn new(filter: F) -> Self {
        Self { filter }
    }

    /// Best-effort discovery: traversal errors are logged and the paths
    /// collected before the error are returned.
    pub fn find(&self, root: &Path) -> Vec<String> {
        let discovery = self.discover(root);
        if let Some(e) = &discovery.error {
            warn!(error = %e, collected = discovery.paths.len(), "Discovery stopped early");
        }
        discovery.paths
    }

    /// Walks `root` recursively, in file name order within each directory.
    ///
    /// Stops at the first traversal error and reports it in
    /// [`Discovery::error`].
    pub fn discover(&self, root: &Path) -> Discovery {
        let mut discovery = Discovery::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if is_regular_file(&entry) && self.accepts(entry.path()) {
                        debug!(path = %entry.path().display(), "Module candidate");
                        discovery.paths.push(entry.path().to_string_lossy().into_owned());
                    }
                }
                Err(e) => {
                    discovery.error = Some(DiscoveryError::from(e));
                    break;
                }
            }
        }

        discovery
    }

    fn accepts(&self, path: &Path) -> bool {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        self.filter.matches(&extension, &file_name)
    }
}

/// Regular files, including symlinks that resolve to one.
fn is_regular_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}
