//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `CopyError` per gli errori fatali che interrompono l'intera operazione
//! - Definisce `TaskError` per gli errori di un singolo file (non fatali per il run)
//! - Integra con `thiserror` per messaggi descrittivi e error chaining
//!
//! ## Errori fatali (`CopyError`):
//! - `InvalidOptions`: Opzioni non valide (directory inesistente, estensioni vuote, etc.)
//! - `Scan`: Errore di I/O durante la scansione della directory sorgente
//! - `NoMatchingFiles`: Nessun file corrisponde ai filtri configurati
//! - `Worker`: Un worker del pool è terminato in modo anomalo
//!
//! ## Errori per singolo file (`TaskError`):
//! - `TargetExists`: Overwrite disabilitato e file di destinazione presente
//! - `DirectoryCreate` / `OpenSource` / `CreateDest` / `CopyIo`: Errori filesystem
//! - `SameFile`: Sorgente e destinazione coincidono
//! - `DestinationConflict`: Destinazione già assegnata a un altro file
//! - `Cancelled`: Run annullato prima dell'inizio della copia
//!
//! Gli errori di preservazione metadata non sono mai esposti: vengono solo loggati.
//!
//! ## Esempio:
//! ```rust,ignore
//! if files.is_empty() {
//!     return Err(CopyError::NoMatchingFiles(source_dir.to_path_buf()));
//! }
//! ```

use std::path::PathBuf;

/// Fatal errors that abort a whole copy run
#[derive(thiserror::Error, Debug)]
pub enum CopyError {
    #[error("Invalid copy options: {0}")]
    InvalidOptions(String),

    #[error("Failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read metadata of {}: {source}", path.display())]
    ScanMetadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No matching files found in {}", .0.display())]
    NoMatchingFiles(PathBuf),

    #[error("Copy worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl CopyError {
    /// Whether this error comes from walking the source tree
    pub fn is_scan_error(&self) -> bool {
        matches!(self, Self::Scan { .. } | Self::ScanMetadata { .. })
    }
}

/// Per-file errors, recorded in the result without stopping sibling copies
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("target file already exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open source {}: {source}", path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create destination {}: {source}", path.display())]
    CreateDest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy to {}: {source}", path.display())]
    CopyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source and destination are the same file: {}", .0.display())]
    SameFile(PathBuf),

    #[error("destination {} already claimed by {}", destination.display(), claimed_by.display())]
    DestinationConflict {
        destination: PathBuf,
        claimed_by: PathBuf,
    },

    #[error("cancelled before copy")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_messages() {
        let err = TaskError::TargetExists(PathBuf::from("/out/photo.jpg"));
        assert_eq!(err.to_string(), "target file already exists: /out/photo.jpg");

        let err = TaskError::DestinationConflict {
            destination: PathBuf::from("/out/a.jpg"),
            claimed_by: PathBuf::from("/in/x/a.jpg"),
        };
        assert!(err.to_string().contains("already claimed by /in/x/a.jpg"));
    }

    #[test]
    fn test_no_matching_files_message() {
        let err = CopyError::NoMatchingFiles(PathBuf::from("/photos"));
        assert_eq!(err.to_string(), "No matching files found in /photos");
        assert!(!err.is_scan_error());
    }
}
