//! Scan records and the on-disk document shape.
//!
//! [`PluginRecord`] is the in-memory record the pipeline works with.
//! [`PluginEntry`] and [`ScanDocument`] are the serialized forms written to
//! and read from scan documents; conversion between the two enforces the
//! valid/invalid field gating.

use serde::{Deserialize, Serialize};

use crate::traits::ClassInfo;

/// Extracted (or failed) metadata for one scanned module.
///
/// When `is_valid` is `false` only `path` and `error_message` carry data;
/// every other field stays at its default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginRecord {
    /// Module path as discovered. Identity key inside a store.
    pub path: String,

    pub is_valid: bool,

    pub name: String,
    pub vendor: String,
    pub version: String,
    pub category: String,
    pub sub_categories: Vec<String>,

    /// Class identifier rendered as a string
    pub cid: String,

    pub sdk_version: String,
    pub cardinality: i32,

    /// Class flag bit set
    pub flags: u32,

    /// Failure reason, empty for valid records
    pub error_message: String,
}

impl PluginRecord {
    /// Builds a failed record carrying only the path and the reason.
    pub fn invalid(path: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_valid: false,
            error_message: error_message.into(),
            ..Default::default()
        }
    }

    /// Builds a valid record from the selected plugin class.
    pub fn from_class(path: impl Into<String>, class: &ClassInfo) -> Self {
        Self {
            path: path.into(),
            is_valid: true,
            name: class.name.clone(),
            vendor: class.vendor.clone(),
            version: class.version.clone(),
            category: class.category.clone(),
            sub_categories: class.sub_categories.clone(),
            cid: class.cid.clone(),
            sdk_version: class.sdk_version.clone(),
            cardinality: class.cardinality,
            flags: class.class_flags,
            error_message: String::new(),
        }
    }
}

/// Serialized form of a [`PluginRecord`].
///
/// Field declaration order is the key order in the written document. Every
/// field defaults when absent so hand-written documents load as long as the
/// values that are present have the right type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginEntry {
    pub path: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PluginRecord> for PluginEntry {
    fn from(record: &PluginRecord) -> Self {
        if !record.is_valid {
            return Self {
                path: record.path.clone(),
                is_valid: false,
                error: Some(record.error_message.clone()),
                ..Default::default()
            };
        }

        Self {
            path: record.path.clone(),
            is_valid: true,
            name: Some(record.name.clone()),
            vendor: Some(record.vendor.clone()),
            version: Some(record.version.clone()),
            category: Some(record.category.clone()),
            cid: Some(record.cid.clone()),
            sdk_version: Some(record.sdk_version.clone()),
            cardinality: Some(record.cardinality),
            flags: Some(record.flags),
            sub_categories: Some(record.sub_categories.clone()),
            error: None,
        }
    }
}

impl From<PluginEntry> for PluginRecord {
    fn from(entry: PluginEntry) -> Self {
        if !entry.is_valid {
            return PluginRecord::invalid(entry.path, entry.error.unwrap_or_default());
        }

        PluginRecord {
            path: entry.path,
            is_valid: true,
            name: entry.name.unwrap_or_default(),
            vendor: entry.vendor.unwrap_or_default(),
            version: entry.version.unwrap_or_default(),
            category: entry.category.unwrap_or_default(),
            sub_categories: entry.sub_categories.unwrap_or_default(),
            cid: entry.cid.unwrap_or_default(),
            sdk_version: entry.sdk_version.unwrap_or_default(),
            cardinality: entry.cardinality.unwrap_or_default(),
            flags: entry.flags.unwrap_or_default(),
            error_message: String::new(),
        }
    }
}

/// Top-level document as written.
///
/// `total_plugins` and `valid_plugins` are derived from `plugins` when the
/// document is built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDocument {
    /// Nanoseconds since the Unix epoch, as a decimal string
    pub scan_time: String,
    pub total_plugins: usize,
    pub valid_plugins: usize,
    pub plugins: Vec<PluginEntry>,
}

impl ScanDocument {
    pub fn new(records: &[PluginRecord], scan_time: impl Into<String>) -> Self {
        Self {
            scan_time: scan_time.into(),
            total_plugins: records.len(),
            valid_plugins: records.iter().filter(|r| r.is_valid).count(),
            plugins: records.iter().map(PluginEntry::from).collect(),
        }
    }
}

/// Top-level document as read back.
///
/// Only the entries are kept; the counters and scan time are recomputed on
/// the next write, and unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredDocument {
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}
