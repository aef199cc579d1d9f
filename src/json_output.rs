//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per comunicazione con
//! un'interfaccia esterna (GUI, script).
//!
//! ## Responsabilità:
//! - Emette messaggi JSON newline-delimited su stdout
//! - Riusa `ProgressSnapshot` e `CopyResult` senza duplicarne i campi
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della copia con la configurazione effettiva
//! - `progress`: Snapshot dopo ogni file completato (e quello finale `done`)
//! - `complete`: Fine del processo con il riepilogo
//! - `error`: Errore fatale

use crate::{config::CopyOptions, copier::ProgressSnapshot, progress::CopyResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del processo di copia
    #[serde(rename = "start")]
    Start {
        source_dir: PathBuf,
        target_dir: PathBuf,
        config: JsonConfig,
    },

    /// Progresso corrente
    #[serde(rename = "progress")]
    Progress(ProgressSnapshot),

    /// Processo completato
    #[serde(rename = "complete")]
    Complete {
        #[serde(flatten)]
        result: CopyResult,
        duration_seconds: f64,
    },

    /// Errore fatale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub extensions: Vec<String>,
    pub date_grouping: bool,
    pub group_by_format: bool,
    pub preserve_structure: bool,
    pub overwrite: bool,
    pub dry_run: bool,
    pub workers: Option<usize>,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di inizio
    pub fn start(options: &CopyOptions) -> Self {
        Self::Start {
            source_dir: options.source_dir.clone(),
            target_dir: options.target_dir.clone(),
            config: JsonConfig::from(options),
        }
    }

    /// Crea un messaggio di completamento generale
    pub fn complete(result: CopyResult, duration_seconds: f64) -> Self {
        Self::Complete { result, duration_seconds }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

/// Converti CopyOptions in JsonConfig
impl From<&CopyOptions> for JsonConfig {
    fn from(options: &CopyOptions) -> Self {
        Self {
            extensions: options.normalized_extensions().into_iter().collect(),
            date_grouping: options.date_grouping,
            group_by_format: options.group_by_format,
            preserve_structure: options.preserve_structure,
            overwrite: options.overwrite,
            dry_run: options.dry_run,
            workers: options.workers,
        }
    }
}
