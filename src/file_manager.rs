//! # File Management Module
//!
//! Questo modulo gestisce la discovery dei file media da copiare.
//!
//! ## Responsabilità:
//! - Scansione della directory sorgente con `walkdir`
//! - Filtri su file/directory nascosti, ricorsione e profondità massima
//! - Selezione dei file per estensione (case-insensitive)
//! - Limiti opzionali su dimensione massima e numero di file
//! - Formattazione human-readable delle dimensioni
//!
//! ## Regole di scansione:
//! - Una directory nascosta viene saltata per intero, non solo la sua entry
//! - Senza ricorsione vengono considerati solo i figli diretti della sorgente
//! - La directory sorgente non è mai considerata nascosta
//! - Qualsiasi errore di I/O durante la scansione è fatale (`CopyError::Scan`)
//! - L'ordine del risultato segue l'ordine di attraversamento (ordinato per nome)
//!
//! ## Esempio:
//! ```rust,ignore
//! let filters = ScanOptions::from(&options);
//! let files = FileManager::scan(&options.source_dir, &filters)?;
//! let files = FileManager::apply_limits(files, options.max_file_size, options.max_file_count)?;
//! ```

use crate::{config::CopyOptions, error::CopyError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Filters applied while walking the source tree
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Normalized extensions (lower case, leading dot)
    pub extensions: HashSet<String>,
    pub ignore_hidden: bool,
    pub recursive: bool,
    pub max_depth: Option<usize>,
}

impl From<&CopyOptions> for ScanOptions {
    fn from(options: &CopyOptions) -> Self {
        Self {
            extensions: options.normalized_extensions(),
            ignore_hidden: options.ignore_hidden,
            recursive: options.recursive,
            max_depth: options.max_depth,
        }
    }
}

impl ScanOptions {
    /// Effective walk depth, combining the recursion flag and the depth limit
    fn effective_depth(&self) -> Option<usize> {
        match (self.recursive, self.max_depth) {
            (false, Some(depth)) => Some(depth.min(1)),
            (false, None) => Some(1),
            (true, depth) => depth,
        }
    }
}

/// Manages file discovery
pub struct FileManager;

impl FileManager {
    /// Walk `source_dir` and return every file accepted by `filters`
    pub fn scan(source_dir: &Path, filters: &ScanOptions) -> Result<Vec<PathBuf>, CopyError> {
        let mut walker = WalkDir::new(source_dir)
            .follow_links(false)
            .sort_by_file_name();
        if let Some(depth) = filters.effective_depth() {
            walker = walker.max_depth(depth);
        }

        let mut files = Vec::new();
        let entries = walker
            .into_iter()
            .filter_entry(|entry| !(filters.ignore_hidden && entry.depth() > 0 && Self::is_hidden(entry)));

        for entry in entries {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| source_dir.to_path_buf());
                CopyError::Scan { path, source: err }
            })?;

            if entry.file_type().is_file() && Self::matches_extension(entry.path(), &filters.extensions) {
                files.push(entry.into_path());
            }
        }

        debug!("Scan of {} matched {} files", source_dir.display(), files.len());
        Ok(files)
    }

    /// Drop files above `max_file_size` and keep at most `max_file_count` files
    pub fn apply_limits(
        files: Vec<PathBuf>,
        max_file_size: Option<u64>,
        max_file_count: Option<usize>,
    ) -> Result<Vec<PathBuf>, CopyError> {
        let mut selected = Vec::with_capacity(files.len());

        for path in files {
            if let Some(limit) = max_file_size {
                let size = std::fs::metadata(&path)
                    .map_err(|source| CopyError::ScanMetadata { path: path.clone(), source })?
                    .len();
                if size > limit {
                    debug!("Skipping {} ({} > limit {})", path.display(), Self::format_size(size), Self::format_size(limit));
                    continue;
                }
            }

            if max_file_count.is_some_and(|limit| selected.len() >= limit) {
                break;
            }
            selected.push(path);
        }

        Ok(selected)
    }

    /// Whether an entry name starts with the hidden-file marker
    pub fn is_hidden(entry: &DirEntry) -> bool {
        entry.file_name().as_encoded_bytes().starts_with(b".")
    }

    /// Check if a file extension is in the accepted set
    pub fn matches_extension(path: &Path, extensions: &HashSet<String>) -> bool {
        Self::extension_of(path).is_some_and(|ext| extensions.contains(&ext))
    }

    /// Lower-cased suffix from the last `.` of the file name, dot included.
    ///
    /// Unlike [`Path::extension`], a name such as `.jpg` yields `.jpg`.
    pub fn extension_of(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy();
        let dot = name.rfind('.')?;
        Some(name[dot..].to_lowercase())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
