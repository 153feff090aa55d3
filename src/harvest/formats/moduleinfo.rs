//! Class listing from VST 3 bundle `moduleinfo.json` files.
//!
//! Bundles built with recent SDKs describe their factory classes in
//! `<name>.vst3/Contents/Resources/moduleinfo.json`. Reading that file gives
//! the same class metadata the factory would report, without loading any
//! plugin code.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::traits::{ClassInfo, HostError, ModuleHost, PluginModule};

const MODULE_INFO_PATH: [&str; 3] = ["Contents", "Resources", "moduleinfo.json"];

#[derive(Debug, Deserialize)]
struct ModuleInfoFile {
    #[serde(rename = "Name", default)]
    name: String,

    #[serde(rename = "Classes", default)]
    classes: Vec<ModuleInfoClass>,
}

#[derive(Debug, Deserialize)]
struct ModuleInfoClass {
    #[serde(rename = "CID", default)]
    cid: String,
    #[serde(rename = "Category", default)]
    category: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Vendor", default)]
    vendor: String,
    #[serde(rename = "Version", default)]
    version: String,
    #[serde(rename = "SDKVersion", default)]
    sdk_version: String,
    #[serde(rename = "Sub Categories", default)]
    sub_categories: Vec<String>,
    #[serde(rename = "Class Flags", default)]
    class_flags: u32,
    #[serde(rename = "Cardinality", default)]
    cardinality: i32,
}

impl From<ModuleInfoClass> for ClassInfo {
    fn from(class: ModuleInfoClass) -> Self {
        ClassInfo {
            name: class.name,
            vendor: class.vendor,
            version: class.version,
            category: class.category,
            sub_categories: class.sub_categories,
            cid: class.cid,
            sdk_version: class.sdk_version,
            cardinality: class.cardinality,
            class_flags: class.class_flags,
        }
    }
}

/// Module opened from a `moduleinfo.json` file.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub classes: Vec<ClassInfo>,
}

impl PluginModule for ModuleInfo {
    fn classes(&self) -> Vec<ClassInfo> {
        self.classes.clone()
    }
}

/// [`ModuleHost`] backed by bundle `moduleinfo.json` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleInfoHost;

impl ModuleInfoHost {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleHost for ModuleInfoHost {
    type Module = ModuleInfo;

    fn open(&self, path: &Path) -> Result<ModuleInfo, HostError> {
        fs::metadata(path).map_err(|e| {
            HostError::OpenFailed(format!("Could not open module {}: {}", path.display(), e))
        })?;

        let info_path = module_info_path(path)
            .ok_or_else(|| HostError::ModuleInfoMissing(path.display().to_string()))?;

        debug!(module = %path.display(), info = %info_path.display(), "Reading moduleinfo");

        let content = fs::read_to_string(&info_path)?;
        let parsed: ModuleInfoFile =
            serde_json::from_str(&content).map_err(|e| HostError::InvalidModuleInfo {
                path: info_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let module = ModuleInfo {
            name: parsed.name,
            classes: parsed.classes.into_iter().map(ClassInfo::from).collect(),
        };
        debug!(
            module = %path.display(),
            name = %module.name,
            classes = module.classes.len(),
            "Module opened"
        );
        Ok(module)
    }
}

/// Nearest `*.vst3` bundle directory containing `path` (or `path` itself).
pub fn bundle_root(path: &Path) -> Option<&Path> {
    path.ancestors()
        .find(|p| p.is_dir() && p.extension().is_some_and(|e| e == "vst3"))
}

fn module_info_path(path: &Path) -> Option<PathBuf> {
    let candidate = MODULE_INFO_PATH
        .iter()
        .fold(bundle_root(path)?.to_path_buf(), |acc, part| acc.join(part));
    candidate.is_file().then_some(candidate)
}
