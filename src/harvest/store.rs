//! Ordered, path-keyed collection of scan records.

use std::collections::HashSet;

use crate::model::PluginRecord;

/// Counts produced by [`RecordStore::merge`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    /// Incoming records appended to the store
    pub added: usize,

    /// Incoming records dropped because their path was already present
    pub skipped: usize,
}

/// Records for one run, in insertion order.
///
/// Merging is append-only: a path already in the store keeps its record even
/// when a rescan produced different metadata for it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<PluginRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps records loaded from a document, keeping their order as-is.
    pub fn from_records(records: Vec<PluginRecord>) -> Self {
        Self { records }
    }

    /// Appends every incoming record whose path is not already stored.
    ///
    /// Paths compare as exact strings. Duplicates within `incoming` are
    /// skipped after their first occurrence.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = PluginRecord>) -> MergeSummary {
        let mut seen: HashSet<String> = self.records.iter().map(|r| r.path.clone()).collect();
        let mut summary = MergeSummary::default();

        for record in incoming {
            if seen.insert(record.path.clone()) {
                self.records.push(record);
                summary.added += 1;
            } else {
                summary.skipped += 1;
            }
        }

        summary
    }

    pub fn records(&self) -> &[PluginRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PluginRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_valid).count()
    }
}

/// `existing` followed by the records of `incoming` whose path is new.
pub fn merge(existing: &[PluginRecord], incoming: &[PluginRecord]) -> Vec<PluginRecord> {
    let mut store = RecordStore::from_records(existing.to_vec());
    store.merge(incoming.iter().cloned());
    store.into_records()
}
