//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione di un'operazione di copia.
//!
//! ## Responsabilità:
//! - Definisce la struct `CopyOptions` con tutti i parametri della copia
//! - Normalizza le estensioni accettate (case-insensitive, con un solo `.` iniziale)
//! - Fornisce validazione dei parametri prima dell'avvio
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `source_dir` / `target_dir`: Directory sorgente e di destinazione
//! - `extensions`: Estensioni accettate (default: formati foto e RAW comuni)
//! - `date_grouping`: Crea sottodirectory per data (default: false)
//! - `date_source`: Data corrente o data di modifica del file (default: now)
//! - `date_granularity`: `year` o `month` (default: month)
//! - `group_by_format`: Crea sottodirectory per formato (default: false)
//! - `preserve_structure`: Mantiene la struttura della sorgente (default: false)
//! - `overwrite`: Sovrascrive file esistenti (default: true)
//! - `dry_run`: Simulazione senza modifiche (default: false)
//! - `max_depth`: Profondità massima di scansione (default: illimitata)
//! - `copy_metadata`: Preserva la data di modifica (default: true)
//! - `generate_hash`: Calcola SHA-256 dei file copiati (default: false)
//! - `ignore_hidden`: Ignora file e directory nascosti (default: true)
//! - `recursive`: Scansione ricorsiva (default: true)
//! - `max_file_size` / `max_file_count`: Limiti opzionali sui file selezionati
//! - `workers`: Numero di worker (default: parallelismo disponibile)
//!
//! ## Esempio:
//! ```rust,ignore
//! let options = CopyOptions {
//!     source_dir: "/media/card".into(),
//!     target_dir: "/photos".into(),
//!     date_grouping: true,
//!     date_granularity: DateGranularity::Month,
//!     ..Default::default()
//! };
//! options.validate()?;
//! ```

use crate::error::CopyError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Extensions accepted when the configuration does not name any
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".svg", ".ico", ".heic",
    ".heif", ".raw", ".cr2", ".nef", ".arw", ".dng", ".orf", ".rw2",
];

/// Which timestamp names a date-based subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Wall-clock time at planning
    #[default]
    Now,
    /// Modification time of the source file
    FileModified,
}

/// Calendar unit used to name a date-based subdirectory
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    Year,
    #[default]
    Month,
}

impl DateGranularity {
    /// chrono format string for the subdirectory name
    pub fn format_str(&self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::Month => "%Y-%m",
        }
    }
}

/// Configuration for one copy run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyOptions {
    /// Directory scanned for media files
    pub source_dir: PathBuf,
    /// Directory receiving the copies
    pub target_dir: PathBuf,
    /// Accepted extensions, with or without leading dot
    pub extensions: Vec<String>,
    /// Group copies into date-named subdirectories
    pub date_grouping: bool,
    /// Timestamp used for date grouping
    pub date_source: DateSource,
    /// Year or month subdirectories
    pub date_granularity: DateGranularity,
    /// Group copies into per-extension subdirectories
    pub group_by_format: bool,
    /// Mirror the source layout instead of date/format grouping
    pub preserve_structure: bool,
    /// Replace existing destination files
    pub overwrite: bool,
    /// Report what would be copied without touching the filesystem
    pub dry_run: bool,
    /// Maximum scan depth below the source directory (1 = direct children)
    pub max_depth: Option<usize>,
    /// Copy the source modification time onto the destination
    pub copy_metadata: bool,
    /// Compute a SHA-256 digest of every copied file
    pub generate_hash: bool,
    /// Skip entries whose name starts with a dot
    pub ignore_hidden: bool,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Skip files larger than this many bytes
    pub max_file_size: Option<u64>,
    /// Copy at most this many files
    pub max_file_count: Option<usize>,
    /// Number of parallel copy workers (None = available parallelism)
    pub workers: Option<usize>,
    /// Machine-readable output: human-readable progress logs are suppressed
    pub json_output: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            target_dir: PathBuf::new(),
            extensions: SUPPORTED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            date_grouping: false,
            date_source: DateSource::Now,
            date_granularity: DateGranularity::Month,
            group_by_format: false,
            preserve_structure: false,
            overwrite: true,
            dry_run: false,
            max_depth: None,
            copy_metadata: true,
            generate_hash: false,
            ignore_hidden: true,
            recursive: true,
            max_file_size: None,
            max_file_count: None,
            workers: None,
            json_output: false,
        }
    }
}

/// Normalize a single extension to lower case with exactly one leading dot
pub fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed.to_lowercase()))
    }
}

impl CopyOptions {
    /// Accepted extensions, normalized for lookup
    pub fn normalized_extensions(&self) -> HashSet<String> {
        self.extensions
            .iter()
            .filter_map(|ext| normalize_extension(ext))
            .collect()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CopyError> {
        if !self.source_dir.is_dir() {
            return Err(CopyError::InvalidOptions(format!(
                "Source directory does not exist: {}",
                self.source_dir.display()
            )));
        }

        if self.target_dir.as_os_str().is_empty() {
            return Err(CopyError::InvalidOptions("Target directory is required".to_string()));
        }

        if self.target_dir.exists() && !self.target_dir.is_dir() {
            return Err(CopyError::InvalidOptions(format!(
                "Target path is not a directory: {}",
                self.target_dir.display()
            )));
        }

        if same_directory(&self.source_dir, &self.target_dir) {
            return Err(CopyError::InvalidOptions(
                "Source and target directories must differ".to_string(),
            ));
        }

        if self.normalized_extensions().is_empty() {
            return Err(CopyError::InvalidOptions(
                "At least one file extension is required".to_string(),
            ));
        }

        if self.max_depth == Some(0) {
            return Err(CopyError::InvalidOptions("Max depth must be greater than 0".to_string()));
        }

        if self.max_file_size == Some(0) {
            return Err(CopyError::InvalidOptions(
                "Max file size must be greater than 0".to_string(),
            ));
        }

        if self.max_file_count == Some(0) {
            return Err(CopyError::InvalidOptions(
                "Max file count must be greater than 0".to_string(),
            ));
        }

        if self.workers == Some(0) {
            return Err(CopyError::InvalidOptions(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Default location of the configuration file
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("media-copier").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let options: CopyOptions = serde_json::from_str(&content)?;
        Ok(options)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
