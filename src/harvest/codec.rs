//! Scan document serialization.
//!
//! Writing renders the full document deterministically: for the same records
//! the output differs only in `scanTime`. Reading is tolerant of missing and
//! unknown keys but rejects values of the wrong type.

use std::ffi::OsString;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::harvest::traits::CodecError;
use crate::model::{PluginRecord, ScanDocument, StoredDocument};

/// Current time as nanoseconds since the Unix epoch.
pub fn scan_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .to_string()
}

/// Renders `records` as a pretty-printed document, newline terminated.
pub fn to_string(records: &[PluginRecord], scan_time: &str) -> Result<String, CodecError> {
    let document = ScanDocument::new(records, scan_time);
    let mut rendered = serde_json::to_string_pretty(&document).map_err(CodecError::Serialize)?;
    rendered.push('\n');
    Ok(rendered)
}

/// Writes the document for `records` to `out`, stamped with the current time.
pub fn write<W: Write>(records: &[PluginRecord], out: &mut W) -> Result<(), CodecError> {
    let rendered = to_string(records, &scan_timestamp())?;
    out.write_all(rendered.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Writes the document for `records` to `path`, replacing any existing file.
///
/// The document is rendered and written to a sibling `.tmp` file which is
/// then renamed over `path`, so a failed write leaves the previous document
/// intact.
pub fn write_file(records: &[PluginRecord], path: &Path) -> Result<(), CodecError> {
    let rendered = to_string(records, &scan_timestamp())?;
    let staged = staging_path(path);

    if let Err(e) = write_staged(&staged, rendered.as_bytes()) {
        let _ = fs::remove_file(&staged);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&staged, path) {
        let _ = fs::remove_file(&staged);
        return Err(e.into());
    }

    debug!(path = %path.display(), records = records.len(), "Scan document written");
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = OsString::from(path.as_os_str());
    staged.push(".tmp");
    PathBuf::from(staged)
}

fn write_staged(staged: &Path, content: &[u8]) -> std::io::Result<()> {
    let file = fs::File::create(staged)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Parses a document back into records, in document order.
pub fn from_str(content: &str) -> Result<Vec<PluginRecord>, CodecError> {
    let document: StoredDocument = serde_json::from_str(content).map_err(CodecError::Parse)?;
    Ok(document
        .plugins
        .into_iter()
        .map(PluginRecord::from)
        .collect())
}

/// Loads records from `path`. A missing file is an empty record list.
pub fn read_file(path: &Path) -> Result<Vec<PluginRecord>, CodecError> {
    match fs::read_to_string(path) {
        Ok(content) => from_str(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No existing scan document");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn foo() -> PluginRecord {
        PluginRecord {
            path: "/p/a.vst3".to_string(),
            is_valid: true,
            name: "Foo".to_string(),
            vendor: "Acme".to_string(),
            cardinality: 1,
            flags: 0,
            ..Default::default()
        }
    }

    fn full() -> PluginRecord {
        PluginRecord {
            path: "/p/full.vst3".to_string(),
            is_valid: true,
            name: "Full".to_string(),
            vendor: "Acme".to_string(),
            version: "2.1.0.4".to_string(),
            category: "Audio Module Class".to_string(),
            sub_categories: vec!["Fx".to_string(), "Reverb".to_string()],
            cid: "0123456789ABCDEF0123456789ABCDEF".to_string(),
            sdk_version: "VST 3.7.9".to_string(),
            cardinality: -3,
            flags: u32::MAX,
            error_message: String::new(),
        }
    }

    #[test]
    fn test_document_shape() {
        let records = vec![foo(), PluginRecord::invalid("/p/b.vst3", "No plugin classes found")];
        let rendered = to_string(&records, "1700000000000000000").unwrap();

        let expected = r#"{
  "scanTime": "1700000000000000000",
  "totalPlugins": 2,
  "validPlugins": 1,
  "plugins": [
    {
      "path": "/p/a.vst3",
      "isValid": true,
      "name": "Foo",
      "vendor": "Acme",
      "version": "",
      "category": "",
      "cid": "",
      "sdkVersion": "",
      "cardinality": 1,
      "flags": 0,
      "subCategories": []
    },
    {
      "path": "/p/b.vst3",
      "isValid": false,
      "error": "No plugin classes found"
    }
  ]
}
"#;
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_write_is_deterministic_apart_from_scan_time() {
        let records = vec![full(), foo()];
        assert_eq!(
            to_string(&records, "1").unwrap(),
            to_string(&records, "1").unwrap()
        );
    }

    #[test]
    fn test_round_trip_valid_and_invalid() {
        let records = vec![
            full(),
            foo(),
            PluginRecord::invalid("/p/c.vst3", "dlopen failed"),
            PluginRecord::invalid("/p/d.vst3", ""),
        ];

        let parsed = from_str(&to_string(&records, "7").unwrap()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_round_trip_delimiter_characters() {
        let mut record = full();
        record.name = "Quote \" {brace} [bracket] back\\slash".to_string();
        let records = vec![record];

        let parsed = from_str(&to_string(&records, "7").unwrap()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_read_ignores_counters_and_unknown_keys() {
        let content = r#"{
  "scanTime": "whenever",
  "totalPlugins": 99,
  "validPlugins": "lots",
  "comment": "hand edited",
  "plugins": [
    { "path": "/p/a.vst3", "isValid": true, "name": "Foo", "favourite": true },
    { "path": "/p/b.vst3", "isValid": false }
  ]
}"#;

        let parsed = from_str(content).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Foo");
        assert_eq!(parsed[0].vendor, "");
        assert_eq!(parsed[0].cardinality, 0);
        assert!(parsed[0].sub_categories.is_empty());
        assert_eq!(parsed[1], PluginRecord::invalid("/p/b.vst3", ""));
    }

    #[test]
    fn test_missing_plugins_array_is_empty() {
        assert!(from_str("{ \"scanTime\": \"1\" }").unwrap().is_empty());
    }

    #[test]
    fn test_non_numeric_cardinality_is_fatal() {
        let content = r#"{ "plugins": [ { "path": "/p/a.vst3", "isValid": true, "cardinality": "two" } ] }"#;
        assert!(matches!(from_str(content), Err(CodecError::Parse(_))));
    }

    #[test]
    fn test_negative_flags_is_fatal() {
        let content = r#"{ "plugins": [ { "path": "/p/a.vst3", "isValid": true, "flags": -1 } ] }"#;
        assert!(from_str(content).is_err());
    }

    #[test]
    fn test_file_round_trip_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.json");

        assert!(read_file(&path).unwrap().is_empty());

        let records = vec![foo(), PluginRecord::invalid("/p/b.vst3", "broken")];
        write_file(&records, &path).unwrap();
        assert_eq!(read_file(&path).unwrap(), records);
    }

    #[test]
    fn test_write_to_unwritable_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing_dir").join("scan.json");

        assert!(matches!(write_file(&[foo()], &path), Err(CodecError::Io(_))));
    }

    #[test]
    fn test_failed_write_keeps_existing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cumulative.json");
        write_file(&[foo()], &path).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // A directory in the staging slot makes the write fail before any rename.
        fs::create_dir(dir.path().join("cumulative.json.tmp")).unwrap();

        assert!(matches!(
            write_file(&[foo(), full()], &path),
            Err(CodecError::Io(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(read_file(&path).unwrap(), vec![foo()]);
    }

    #[test]
    fn test_successful_write_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.json");

        write_file(&[foo()], &path).unwrap();
        write_file(&[foo(), full()], &path).unwrap();

        assert_eq!(read_file(&path).unwrap(), vec![foo(), full()]);
        assert!(!dir.path().join("scan.json.tmp").exists());
    }

    #[test]
    fn test_write_to_buffer() {
        let mut out = Vec::new();
        write(&[foo()], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("}\n"));
        assert_eq!(from_str(&text).unwrap(), vec![foo()]);
    }
}
