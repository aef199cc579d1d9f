//! # Media Copier Main Orchestrator
//!
//! Orchestratore principale che delega responsabilità ai moduli specializzati:
//! scansione → limiti → calcolo destinazioni → pool di copia → progress/riepilogo.
//!
//! Gli errori fatali (`CopyError`) vengono restituiti prima dell'avvio dei
//! worker; gli errori sui singoli file finiscono nel `CopyResult`.

use crate::{
    config::CopyOptions,
    copier::{
        clock::{Clock, SystemClock},
        copy_engine::CopyEngine,
        path_resolver::{PathResolver, PlannedCopies},
        progress_tracker::{ProgressSnapshot, ProgressTracker},
        task_copier::TaskOutcome,
    },
    error::CopyError,
    file_manager::{FileManager, ScanOptions},
    progress::{CopyResult, ResultAggregator},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Orchestratore di una copia
pub struct MediaCopier {
    options: CopyOptions,
    clock: Arc<dyn Clock>,
}

impl MediaCopier {
    /// Valida le opzioni e rende assoluti i path sorgente/destinazione
    pub fn new(mut options: CopyOptions) -> Result<Self, CopyError> {
        options.validate()?;

        options.source_dir = options.source_dir.canonicalize().map_err(|e| {
            CopyError::InvalidOptions(format!(
                "Failed to canonicalize source dir {}: {}",
                options.source_dir.display(),
                e
            ))
        })?;
        if let Ok(target) = options.target_dir.canonicalize() {
            options.target_dir = target;
        } else if options.target_dir.is_relative() {
            if let Ok(cwd) = std::env::current_dir() {
                options.target_dir = cwd.join(&options.target_dir);
            }
        }

        Ok(Self {
            options,
            clock: Arc::new(SystemClock),
        })
    }

    /// Sostituisce l'orologio usato per le directory per data
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Trova i file da copiare applicando filtri e limiti
    pub fn scan(&self) -> Result<Vec<PathBuf>, CopyError> {
        let filters = ScanOptions::from(&self.options);
        let files = FileManager::scan(&self.options.source_dir, &filters)?;
        let files = FileManager::apply_limits(files, self.options.max_file_size, self.options.max_file_count)?;

        if files.is_empty() {
            return Err(CopyError::NoMatchingFiles(self.options.source_dir.clone()));
        }
        Ok(files)
    }

    /// Scansione + calcolo di tutte le destinazioni; il totale è fissato qui
    pub fn prepare(&self) -> Result<PlannedCopies, CopyError> {
        let files = self.scan()?;
        let resolver = PathResolver::new(&self.options, self.clock.as_ref());
        let planned = resolver.plan_all(files);
        self.log_configuration(&planned);
        Ok(planned)
    }

    /// Modalità sincrona: restituisce solo il riepilogo finale
    pub async fn run(&self, cancel: CancellationToken) -> Result<CopyResult, CopyError> {
        let planned = self.prepare()?;
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);

        let (executed, result) = futures::future::join(
            self.execute(planned, outcome_tx, cancel.clone()),
            ResultAggregator::drain(outcome_rx),
        )
        .await;
        executed?;

        self.log_result(&result, &cancel);
        Ok(result)
    }

    /// Modalità streaming: snapshot di progresso sul sink, poi il riepilogo
    pub async fn run_with_progress(
        &self,
        progress: mpsc::Sender<ProgressSnapshot>,
        cancel: CancellationToken,
    ) -> Result<CopyResult, CopyError> {
        let planned = self.prepare()?;
        let tracker = ProgressTracker::new(planned.total(), progress);
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);

        let (executed, result) = futures::future::join(
            self.execute(planned, outcome_tx, cancel.clone()),
            tracker.report(outcome_rx),
        )
        .await;
        executed?;

        self.log_result(&result, &cancel);
        Ok(result)
    }

    async fn execute(
        &self,
        planned: PlannedCopies,
        outcomes: mpsc::Sender<TaskOutcome>,
        cancel: CancellationToken,
    ) -> Result<(), CopyError> {
        let PlannedCopies { tasks, conflicts } = planned;

        for conflict in conflicts {
            if outcomes.send(conflict).await.is_err() {
                debug!("Outcome receiver dropped before conflicts were reported");
            }
        }

        CopyEngine::new(&self.options).run(tasks, outcomes, cancel).await
    }

    /// Logga configurazione (solo se non JSON mode)
    fn log_configuration(&self, planned: &PlannedCopies) {
        let options = &self.options;
        if options.json_output {
            if !planned.conflicts.is_empty() {
                warn!("{} files share a destination with an earlier file and will be skipped", planned.conflicts.len());
            }
            return;
        }

        info!("Copying from {} to {}", options.source_dir.display(), options.target_dir.display());

        if options.preserve_structure {
            info!("Layout: preserve source structure");
        } else {
            if options.date_grouping {
                info!("Layout: date directories ({:?}, {:?})", options.date_granularity, options.date_source);
            }
            if options.group_by_format {
                info!("Layout: format directories");
            }
        }

        if options.dry_run {
            info!("Dry run mode: No files will be written");
        } else if options.overwrite {
            info!("Overwrite mode: Existing target files will be replaced");
        } else {
            info!("Keep mode: Existing target files are reported as errors");
        }

        info!("Found {} files to copy", planned.total());
        if !planned.conflicts.is_empty() {
            warn!("{} files share a destination with an earlier file and will be skipped", planned.conflicts.len());
        }
    }

    fn log_result(&self, result: &CopyResult, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            warn!("Copy cancelled: {} files were not copied", result.cancelled_count);
        }
        if self.options.json_output {
            return;
        }
        info!("=== Copy Complete ===");
        info!("{}", result.format_summary());
        for message in &result.errors {
            debug!("Copy error: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DateGranularity, DateSource};
    use crate::copier::clock::FixedClock;
    use crate::copier::progress_tracker::ProgressStatus;
    use chrono::{Local, TimeZone};
    use filetime::FileTime;
    use std::path::Path;
    use std::time::SystemTime;
    use tempfile::TempDir;

    struct Fixture {
        source: TempDir,
        target: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                source: TempDir::new().unwrap(),
                target: TempDir::new().unwrap(),
            }
        }

        fn file(&self, rel: &str, content: &[u8]) -> PathBuf {
            let path = self.source.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn options(&self) -> CopyOptions {
            CopyOptions {
                source_dir: self.source.path().to_path_buf(),
                target_dir: self.target.path().to_path_buf(),
                extensions: vec!["jpg".to_string(), "arw".to_string()],
                workers: Some(4),
                ..Default::default()
            }
        }

        fn target_files(&self) -> Vec<String> {
            let mut files: Vec<String> = walkdir::WalkDir::new(self.target.path())
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| {
                    e.path()
                        .strip_prefix(self.target.path())
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/")
                })
                .collect();
            files.sort();
            files
        }
    }

    fn clock() -> FixedClock {
        FixedClock(Local.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_copy_reports_sizes_of_successful_tasks() {
        let fx = Fixture::new();
        fx.file("a/one.jpg", &[1; 100]);
        fx.file("b/two.jpg", &[2; 250]);
        fx.file("c/three.JPG", &[3; 40]);
        fx.file("notes.txt", b"ignored");

        let copier = MediaCopier::new(fx.options()).unwrap();
        let result = copier.run(CancellationToken::new()).await.unwrap();

        assert_eq!(result.success_count, 3);
        assert_eq!(result.error_count, 0);
        assert_eq!(result.total_size, 390);
        assert_eq!(fx.target_files(), vec!["one.jpg", "three.JPG", "two.jpg"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_partial_failure_does_not_abort_run() {
        let fx = Fixture::new();
        fx.file("one.jpg", &[1; 10]);
        fx.file("two.jpg", &[2; 20]);
        std::fs::write(fx.target.path().join("two.jpg"), b"keep me").unwrap();

        let options = CopyOptions { overwrite: false, ..fx.options() };
        let result = MediaCopier::new(options).unwrap().run(CancellationToken::new()).await.unwrap();

        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.total_size, 10);
        assert!(result.errors[0].starts_with("two.jpg: target file already exists"));
        assert_eq!(std::fs::read(fx.target.path().join("two.jpg")).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let fx = Fixture::new();
        fx.file("a/one.jpg", b"1");
        fx.file("b/two.jpg", b"22");

        let options = CopyOptions { dry_run: true, date_grouping: true, ..fx.options() };
        let result = MediaCopier::new(options).unwrap().run(CancellationToken::new()).await.unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.total_size, 3);
        assert!(std::fs::read_dir(fx.target.path()).unwrap().next().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_streaming_emits_n_plus_one_snapshots() {
        let fx = Fixture::new();
        for i in 0..5 {
            fx.file(&format!("dir{i}/photo{i}.jpg"), b"data");
        }

        let copier = MediaCopier::new(fx.options()).unwrap();
        let (progress_tx, mut progress_rx) = mpsc::channel(2);
        let collector = tokio::spawn(async move {
            let mut snapshots = Vec::new();
            while let Some(snapshot) = progress_rx.recv().await {
                snapshots.push(snapshot);
            }
            snapshots
        });

        let result = copier.run_with_progress(progress_tx, CancellationToken::new()).await.unwrap();
        let snapshots = collector.await.unwrap();

        assert_eq!(result.success_count, 5);
        assert_eq!(snapshots.len(), 6);
        assert!(snapshots.windows(2).all(|w| w[0].processed <= w[1].processed));
        assert!(snapshots[..5].iter().all(|s| s.status == ProgressStatus::Copied));
        let last = snapshots.last().unwrap();
        assert!(last.is_done());
        assert_eq!((last.processed, last.total), (5, 5));
    }

    #[tokio::test]
    async fn test_no_matching_files_is_fatal() {
        let fx = Fixture::new();
        fx.file("doc.txt", b"text");
        fx.file(".hidden/photo.jpg", b"hidden");

        let copier = MediaCopier::new(fx.options()).unwrap();
        let err = copier.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CopyError::NoMatchingFiles(_)));
    }

    #[tokio::test]
    async fn test_date_and_format_layout() {
        let fx = Fixture::new();
        let raw = fx.file("card/DSC00368.ARW", b"raw");
        let modified = Local.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        filetime::set_file_mtime(&raw, FileTime::from_system_time(SystemTime::from(modified))).unwrap();
        fx.file("card/photo.jpg", b"jpg");

        let options = CopyOptions {
            date_grouping: true,
            date_source: DateSource::FileModified,
            date_granularity: DateGranularity::Month,
            group_by_format: true,
            ..fx.options()
        };
        let copier = MediaCopier::new(options).unwrap().with_clock(clock());
        let result = copier.run(CancellationToken::new()).await.unwrap();

        assert_eq!(result.success_count, 2);
        let files = fx.target_files();
        assert!(files.contains(&"2024-03/arw/DSC00368.ARW".to_string()));
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_preserve_structure_mirrors_source() {
        let fx = Fixture::new();
        fx.file("2023/trip/one.jpg", b"1");
        fx.file("two.jpg", b"2");

        let options = CopyOptions { preserve_structure: true, group_by_format: true, ..fx.options() };
        MediaCopier::new(options).unwrap().run(CancellationToken::new()).await.unwrap();

        assert_eq!(fx.target_files(), vec!["2023/trip/one.jpg", "two.jpg"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_destinations_first_wins() {
        let fx = Fixture::new();
        fx.file("a/photo.jpg", b"from a");
        fx.file("b/photo.jpg", b"from b");

        let copier = MediaCopier::new(fx.options()).unwrap();
        let result = copier.run(CancellationToken::new()).await.unwrap();

        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 1);
        assert!(result.errors[0].contains("already claimed by"));
        assert_eq!(std::fs::read(fx.target.path().join("photo.jpg")).unwrap(), b"from a");
    }

    #[tokio::test]
    async fn test_cancelled_run_accounts_for_every_file() {
        let fx = Fixture::new();
        for i in 0..4 {
            fx.file(&format!("photo{i}.jpg"), b"data");
        }
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = MediaCopier::new(fx.options()).unwrap().run(cancel).await.unwrap();

        assert_eq!(result.processed(), 4);
        assert_eq!(result.cancelled_count, 4);
        assert!(fx.target_files().is_empty());
    }

    #[test]
    fn test_scan_applies_limits() {
        let fx = Fixture::new();
        fx.file("a.jpg", &[0; 10]);
        fx.file("b.jpg", &[0; 5000]);
        fx.file("c.jpg", &[0; 10]);
        fx.file("d.jpg", &[0; 10]);

        let options = CopyOptions {
            max_file_size: Some(1000),
            max_file_count: Some(2),
            ..fx.options()
        };
        let files = MediaCopier::new(options).unwrap().scan().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "c.jpg"]);
    }

    #[test]
    fn test_new_rejects_missing_source() {
        let target = TempDir::new().unwrap();
        let options = CopyOptions {
            source_dir: Path::new("/definitely/not/here").to_path_buf(),
            target_dir: target.path().to_path_buf(),
            ..Default::default()
        };
        assert!(matches!(MediaCopier::new(options), Err(CopyError::InvalidOptions(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_mid_run_leaves_only_complete_copies() {
        const FILE_SIZE: usize = 2 * 1024 * 1024;
        let fx = Fixture::new();
        for i in 0..40 {
            fx.file(&format!("photo{i:02}.jpg"), &vec![7u8; FILE_SIZE]);
        }

        let options = CopyOptions { workers: Some(2), ..fx.options() };
        let copier = MediaCopier::new(options).unwrap();
        let cancel = CancellationToken::new();
        let (progress_tx, mut progress_rx) = mpsc::channel(1);

        let trigger = cancel.clone();
        let collector = tokio::spawn(async move {
            let mut snapshots = Vec::new();
            while let Some(snapshot) = progress_rx.recv().await {
                if snapshots.len() == 2 {
                    trigger.cancel();
                }
                snapshots.push(snapshot);
            }
            snapshots
        });

        let result = copier.run_with_progress(progress_tx, cancel).await.unwrap();
        let snapshots = collector.await.unwrap();

        assert_eq!(result.processed(), 40);
        assert_eq!(snapshots.len(), 41);
        assert!(result.cancelled_count > 0);
        assert_eq!(result.success_count + result.cancelled_count, 40);
        assert_eq!(result.error_count, result.cancelled_count);

        let copied = fx.target_files();
        assert_eq!(copied.len(), result.success_count);
        for name in &copied {
            let len = std::fs::metadata(fx.target.path().join(name)).unwrap().len();
            assert_eq!(len, FILE_SIZE as u64, "{name} is truncated");
        }
        assert_eq!(result.total_size, (FILE_SIZE * result.success_count) as u64);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn prepare_logs(options: CopyOptions) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        let copier = MediaCopier::new(options).unwrap();
        tracing::subscriber::with_default(subscriber, || copier.prepare().unwrap());

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_json_output_silences_configuration_logs() {
        let fx = Fixture::new();
        fx.file("a/photo.jpg", b"a");
        fx.file("b/photo.jpg", b"b");

        let human = prepare_logs(fx.options());
        assert!(human.contains("Found 2 files to copy"));

        let json = prepare_logs(CopyOptions { json_output: true, ..fx.options() });
        assert!(!json.contains("Found 2 files to copy"));
        assert!(!json.contains("Copying from"));
        assert!(json.contains("share a destination"));
    }
}
