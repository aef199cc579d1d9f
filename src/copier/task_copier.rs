//! # Task Copier Module
//!
//! Worker per la copia di singoli file.
//! Separato dal pool di worker per poterlo testare in isolamento.
//!
//! Ogni task produce esattamente un `TaskOutcome`: successo (con byte copiati)
//! oppure un `TaskError` specifico. Gli errori sui metadata sono solo loggati.

use crate::{config::CopyOptions, error::TaskError};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// A single file copy: absolute source and destination paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl CopyTask {
    pub fn new(source: PathBuf, destination: PathBuf) -> Self {
        Self { source, destination }
    }

    /// Base name of the source file, used to attribute progress and errors
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}

/// Details of a successful copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySuccess {
    /// Bytes copied (source size for a dry run)
    pub bytes: u64,
    /// True when nothing was written because of dry-run mode
    pub simulated: bool,
    /// Hex SHA-256 of the copied bytes, when hashing is enabled
    pub hash: Option<String>,
}

/// Terminal outcome of one task
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: CopyTask,
    pub result: Result<CopySuccess, TaskError>,
}

impl TaskOutcome {
    pub fn failed(task: CopyTask, error: TaskError) -> Self {
        Self { task, result: Err(error) }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Error text attributed to the source base name
    pub fn error_message(&self) -> Option<String> {
        self.result
            .as_ref()
            .err()
            .map(|e| format!("{}: {}", self.task.file_name(), e))
    }
}

/// Copies one file according to the run policy
#[derive(Debug, Clone)]
pub struct TaskCopier {
    overwrite: bool,
    dry_run: bool,
    copy_metadata: bool,
    generate_hash: bool,
}

impl TaskCopier {
    pub fn new(options: &CopyOptions) -> Self {
        Self {
            overwrite: options.overwrite,
            dry_run: options.dry_run,
            copy_metadata: options.copy_metadata,
            generate_hash: options.generate_hash,
        }
    }

    /// Processa un singolo task e restituisce sempre un esito
    pub async fn process(&self, task: CopyTask, cancel: &CancellationToken) -> TaskOutcome {
        let result = self.copy(&task, cancel).await;
        match &result {
            Ok(success) if success.simulated => {
                debug!("Dry run: would copy {} -> {}", task.source.display(), task.destination.display());
            }
            Ok(success) => {
                debug!("Copied {} -> {} ({} bytes)", task.source.display(), task.destination.display(), success.bytes);
            }
            Err(e) => {
                debug!("Copy of {} failed: {}", task.source.display(), e);
            }
        }
        TaskOutcome { task, result }
    }

    async fn copy(&self, task: &CopyTask, cancel: &CancellationToken) -> Result<CopySuccess, TaskError> {
        if cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        if task.source == task.destination {
            return Err(TaskError::SameFile(task.source.clone()));
        }

        if self.dry_run {
            let bytes = fs::metadata(&task.source).await.map(|m| m.len()).unwrap_or(0);
            return Ok(CopySuccess { bytes, simulated: true, hash: None });
        }

        if !self.overwrite && fs::try_exists(&task.destination).await.unwrap_or(false) {
            return Err(TaskError::TargetExists(task.destination.clone()));
        }

        if let Some(parent) = task.destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| TaskError::DirectoryCreate { path: parent.to_path_buf(), source })?;
        }

        let (bytes, hash) = self.stream(task).await?;

        if self.copy_metadata {
            Self::preserve_mtime(&task.source, &task.destination).await;
        }

        Ok(CopySuccess { bytes, simulated: false, hash })
    }

    /// Copia i byte sorgente → destinazione, calcolando l'hash se richiesto
    async fn stream(&self, task: &CopyTask) -> Result<(u64, Option<String>), TaskError> {
        let mut reader = File::open(&task.source)
            .await
            .map_err(|source| TaskError::OpenSource { path: task.source.clone(), source })?;

        let mut open_options = OpenOptions::new();
        open_options.write(true);
        if self.overwrite {
            open_options.create(true).truncate(true);
        } else {
            open_options.create_new(true);
        }

        let mut writer = open_options.open(&task.destination).await.map_err(|source| {
            if !self.overwrite && source.kind() == ErrorKind::AlreadyExists {
                TaskError::TargetExists(task.destination.clone())
            } else {
                TaskError::CreateDest { path: task.destination.clone(), source }
            }
        })?;

        let io_error = |source| TaskError::CopyIo { path: task.destination.clone(), source };
        let mut hasher = self.generate_hash.then(Sha256::new);
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut bytes_copied = 0u64;

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(io_error)?;
            if bytes_read == 0 {
                break;
            }

            let chunk = &buffer[..bytes_read];
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(chunk);
            }
            writer.write_all(chunk).await.map_err(io_error)?;
            bytes_copied += bytes_read as u64;
        }

        writer.flush().await.map_err(io_error)?;

        Ok((bytes_copied, hasher.map(|h| hex::encode(h.finalize()))))
    }

    /// Best effort: gli errori non cambiano l'esito del task
    async fn preserve_mtime(source: &Path, destination: &Path) {
        let meta = match fs::metadata(source).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!("Could not read modification time of {}: {}", source.display(), e);
                return;
            }
        };

        let mtime = filetime::FileTime::from_last_modification_time(&meta);
        let target = destination.to_path_buf();
        match tokio::task::spawn_blocking(move || filetime::set_file_mtime(&target, mtime)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Could not preserve modification time on {}: {}", destination.display(), e);
            }
            Err(e) => {
                debug!("Modification time task for {} failed: {}", destination.display(), e);
            }
        }
    }
}
