//! # Safety Commit Module
//!
//! Questo modulo è l'UNICO punto del programma che modifica un file
//! originale.
//!
//! ## Responsabilità:
//! - Verifica che l'output sia abbastanza più piccolo (size ratio)
//! - Ri-probe dell'output con il classificatore: deve decodificare come il
//!   kind atteso, altrimenti l'encoder ha prodotto spazzatura
//! - Copia di permessi e mtime dell'originale sul file nuovo
//! - Rename atomico sopra l'originale (stesso filesystem, mai
//!   truncate-and-rewrite)
//!
//! In ogni percorso di non-successo il file temporaneo viene scartato e
//! l'originale resta byte-identico. Un'interruzione del processo in
//! qualunque punto lascia l'originale intatto oppure già completamente
//! sostituito: non esistono stati intermedi.

use std::path::Path;

use filetime::FileTime;
use tempfile::TempPath;
use tracing::{debug, trace};

use crate::classify::{self, MediaKind};
use crate::error::ShrinkError;

/// Result of a commit attempt that did not error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The original was atomically replaced by the smaller output
    Replaced { new_size: u64 },
    /// The output did not clear the size ratio; the original was kept
    NotSmaller { new_size: u64 },
}

/// Validate an encoder output and atomically swap it for the original.
///
/// Consumes the temporary path: on every path except `Replaced` the file
/// behind it is deleted (on drop), and the original is left untouched.
pub async fn commit(
    original: &Path,
    original_size: u64,
    temp: TempPath,
    expects: MediaKind,
    size_ratio: f64,
) -> Result<CommitOutcome, ShrinkError> {
    let new_size = tokio::fs::metadata(&temp).await?.len();

    // (a) size check: must be strictly smaller by at least the configured ratio
    if (new_size as f64) >= original_size as f64 * size_ratio {
        debug!(
            "keeping `{}`: {} -> {} bytes is not enough reduction",
            original.display(),
            original_size,
            new_size
        );
        return Ok(CommitOutcome::NotSmaller { new_size });
    }

    // (b) validity check: re-probe the output, guarding against a silently
    // truncated or corrupt encode that still exited zero
    let (actual, _) = classify::classify_path(&temp).await?;
    if actual != expects {
        return Err(ShrinkError::CorruptOutput {
            expected: expects,
            actual,
        });
    }

    // (c) carry the original's permission bits and mtime over, then rename.
    // The temp file lives next to the original, so the rename is atomic.
    let metadata = tokio::fs::metadata(original).await?;
    tokio::fs::set_permissions(&temp, metadata.permissions()).await?;
    filetime::set_file_mtime(&temp, FileTime::from_last_modification_time(&metadata))?;

    trace!(
        "renaming `{}` over `{}`",
        temp.display(),
        original.display()
    );
    temp.persist(original)
        .map_err(|e| ShrinkError::Replace(e.error))?;

    Ok(CommitOutcome::Replaced { new_size })
}
