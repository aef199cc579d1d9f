//! # Media Copier Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Opzioni di copia, normalizzazione estensioni e validazione
//! - `error`: Errori fatali (`CopyError`) e per singolo file (`TaskError`)
//! - `file_manager`: Scansione della sorgente con filtri e limiti
//! - `copier`: Calcolo destinazioni, pool di copia, progress tracking
//! - `progress`: Riepilogo finale e progress bar
//! - `json_output`: Messaggi JSON per consumatori esterni
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use media_copier::{CopyOptions, MediaCopier};
//! use tokio_util::sync::CancellationToken;
//!
//! let copier = MediaCopier::new(options)?;
//! let result = copier.run(CancellationToken::new()).await?;
//! println!("{}", result.format_summary());
//! ```

pub mod config;
pub mod copier;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod progress;

pub use config::{CopyOptions, DateGranularity, DateSource};
pub use copier::{MediaCopier, ProgressSnapshot, ProgressStatus};
pub use error::{CopyError, TaskError};
pub use progress::CopyResult;
