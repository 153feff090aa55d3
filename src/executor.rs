use crate::harvest::extract::panic_message;
use crate::model::PluginRecord;
use crate::traits::MetadataExtractor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// Runs a [`MetadataExtractor`] over many modules.
///
/// At most `concurrency_limit` extractions run at once; with a limit of one
/// each module is extracted to completion before the next starts. Records
/// come back in input order regardless of completion order.
pub struct ScanExecutor {
    semaphore: Arc<Semaphore>,
    module_timeout: Option<Duration>,
}

impl ScanExecutor {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
            module_timeout: None,
        }
    }

    /// Caps the time a single module may take. Modules over the limit are
    /// recorded as invalid and their result is abandoned; the blocking task
    /// keeps its slot until it returns.
    pub fn with_timeout(mut self, module_timeout: Option<Duration>) -> Self {
        self.module_timeout = module_timeout;
        self
    }

    #[instrument(skip(self, extractor, paths), fields(extractor = extractor.extractor_name(), modules = paths.len()))]
    pub async fn execute<X>(&self, extractor: Arc<X>, paths: Vec<String>) -> Vec<PluginRecord>
    where
        X: MetadataExtractor + 'static,
    {
        let mut tasks = Vec::with_capacity(paths.len());

        for path in paths {
            let semaphore = Arc::clone(&self.semaphore);
            let extractor = Arc::clone(&extractor);
            let module_timeout = self.module_timeout;
            let task_path = path.clone();

            let handle = tokio::spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return PluginRecord::invalid(task_path, format!("Semaphore error: {}", e))
                    }
                };
                extract_one(extractor, task_path, permit, module_timeout).await
            });
            tasks.push((path, handle));
        }

        let mut records = Vec::with_capacity(tasks.len());
        for (path, handle) in tasks {
            let record = handle
                .await
                .unwrap_or_else(|e| PluginRecord::invalid(path, format!("Task join error: {}", e)));
            records.push(record);
        }

        records
    }
}

async fn extract_one<X>(
    extractor: Arc<X>,
    path: String,
    permit: OwnedSemaphorePermit,
    module_timeout: Option<Duration>,
) -> PluginRecord
where
    X: MetadataExtractor + 'static,
{
    info!("Scanning: {}", path);
    let start = std::time::Instant::now();

    let task_path = path.clone();
    // The permit moves into the blocking task so a timed-out extraction still
    // holds its slot until it actually returns.
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        extractor.extract(&task_path)
    });

    let joined = match module_timeout {
        Some(limit) => match timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(path = %path, timeout = ?limit, "Extraction timed out");
                return PluginRecord::invalid(
                    path,
                    format!("Extraction timed out after {:?}", limit),
                );
            }
        },
        None => task.await,
    };

    let record = match joined {
        Ok(record) => record,
        Err(e) if e.is_panic() => {
            PluginRecord::invalid(path, panic_message(e.into_panic().as_ref()))
        }
        Err(e) => PluginRecord::invalid(path, format!("Task join error: {}", e)),
    };

    if record.is_valid {
        info!(
            path = %record.path,
            name = %record.name,
            duration_ms = start.elapsed().as_millis() as u64,
            "Module scanned"
        );
    } else {
        warn!(path = %record.path, error = %record.error_message, "Module failed");
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Sleeps for the number of milliseconds encoded in the file stem.
    struct SleepyExtractor {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SleepyExtractor {
        fn new() -> Self {
            Self {
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl MetadataExtractor for SleepyExtractor {
        fn extractor_name(&self) -> &str {
            "sleepy"
        }

        fn extract(&self, path: &str) -> PluginRecord {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let stem = path.trim_start_matches("/p/").trim_end_matches(".vst3");
            if stem == "panic" {
                self.running.fetch_sub(1, Ordering::SeqCst);
                panic!("extractor blew up");
            }
            let millis: u64 = stem.parse().unwrap_or(0);
            std::thread::sleep(Duration::from_millis(millis));

            self.running.fetch_sub(1, Ordering::SeqCst);
            PluginRecord {
                path: path.to_string(),
                is_valid: true,
                name: stem.to_string(),
                ..Default::default()
            }
        }
    }

    fn paths(stems: &[&str]) -> Vec<String> {
        stems.iter().map(|s| format!("/p/{}.vst3", s)).collect()
    }

    #[tokio::test]
    async fn test_sequential_by_default() {
        let extractor = Arc::new(SleepyExtractor::new());
        let records = ScanExecutor::new(1)
            .execute(Arc::clone(&extractor), paths(&["20", "5", "10"]))
            .await;

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["20", "5", "10"]);
        assert_eq!(extractor.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_preserves_order() {
        let extractor = Arc::new(SleepyExtractor::new());
        let records = ScanExecutor::new(4)
            .execute(Arc::clone(&extractor), paths(&["60", "1", "30", "2"]))
            .await;

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["60", "1", "30", "2"]);
        assert!(extractor.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_timeout_becomes_invalid_record() {
        let records = ScanExecutor::new(1)
            .with_timeout(Some(Duration::from_millis(50)))
            .execute(Arc::new(SleepyExtractor::new()), paths(&["300", "1"]))
            .await;

        assert!(!records[0].is_valid);
        assert_eq!(records[0].error_message, "Extraction timed out after 50ms");
        assert!(records[1].is_valid);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_out_extraction_keeps_its_slot() {
        let extractor = Arc::new(SleepyExtractor::new());
        let records = ScanExecutor::new(1)
            .with_timeout(Some(Duration::from_millis(50)))
            .execute(Arc::clone(&extractor), paths(&["400", "1"]))
            .await;

        assert_eq!(records[0].error_message, "Extraction timed out after 50ms");
        assert!(records[1].is_valid);
        assert_eq!(extractor.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_extractor_is_contained() {
        let records = ScanExecutor::new(1)
            .execute(Arc::new(SleepyExtractor::new()), paths(&["panic", "1"]))
            .await;

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            PluginRecord::invalid("/p/panic.vst3", "extractor blew up")
        );
        assert!(records[1].is_valid);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let records = ScanExecutor::new(1)
            .execute(Arc::new(SleepyExtractor::new()), Vec::new())
            .await;
        assert!(records.is_empty());
    }
}
