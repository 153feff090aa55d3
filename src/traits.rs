use std::path::Path;

use thiserror::Error;

use crate::model::PluginRecord;

/// Category tag carried by audio effect (processor) classes.
pub const AUDIO_EFFECT_CLASS: &str = "Audio Module Class";

#[derive(Error, Debug)]
pub enum HostError {
    /// The hosting library refused the module; the reason is passed through verbatim.
    #[error("{0}")]
    OpenFailed(String),
    #[error("Could not find moduleinfo.json for module: {0}")]
    ModuleInfoMissing(String),
    #[error("Invalid moduleinfo.json at {path}: {reason}")]
    InvalidModuleInfo { path: String, reason: String },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Description of one plugin class exposed by a module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub category: String,
    pub sub_categories: Vec<String>,
    pub cid: String,
    pub sdk_version: String,
    pub cardinality: i32,
    pub class_flags: u32,
}

/// An opened plugin module.
pub trait PluginModule {
    /// Classes in the order the module's factory lists them.
    fn classes(&self) -> Vec<ClassInfo>;
}

/// Plugin-hosting library boundary.
pub trait ModuleHost: Send + Sync {
    type Module: PluginModule;

    fn open(&self, path: &Path) -> Result<Self::Module, HostError>;
}

/// Turns a module path into a [`PluginRecord`].
///
/// Implementations never fail: every problem is reported as an invalid record.
pub trait MetadataExtractor: Send + Sync {
    /// Returns the name of this extractor, used in logs.
    fn extractor_name(&self) -> &str;

    fn extract(&self, path: &str) -> PluginRecord;
}
