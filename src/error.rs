//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `ShrinkError` enum per categorizzare tutti gli errori possibili
//! - Integra con `thiserror` per automatic error conversion
//! - Distingue errori fatali di configurazione da errori per-file
//!
//! ## Categorie di errori:
//! - `Config`: Configurazione non valida (fatale, prima di qualsiasi lavoro)
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Pattern`: Glob di esclusione non valido
//! - `Spawn` / `ToolFailed` / `Timeout`: Errori dell'encoder esterno
//! - `EmptyOutput` / `CorruptOutput`: Output dell'encoder inutilizzabile
//! - `Replace`: Rename atomico fallito
//!
//! Gli errori per-file non interrompono mai l'esecuzione: vengono catturati
//! nel `JobOutcome` del singolo file.

use std::process::ExitStatus;

use crate::classify::MediaKind;

/// Custom error types for media shrinking
#[derive(thiserror::Error, Debug)]
pub enum ShrinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid exclude pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("Failed to spawn `{tool}`: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("`{tool}` {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{tool}` timed out after {seconds}s and was killed")]
    Timeout { tool: &'static str, seconds: u64 },

    #[error("Encoder produced an empty output file")]
    EmptyOutput,

    #[error("Encoder output does not probe as {expected} (got {actual})")]
    CorruptOutput {
        expected: MediaKind,
        actual: MediaKind,
    },

    #[error("Failed to replace original file: {0}")]
    Replace(std::io::Error),
}
