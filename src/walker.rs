//! # Discovery Walker Module
//!
//! Questo modulo produce la sequenza pigra di file candidati.
//!
//! ## Responsabilità:
//! - Attraversamento ricorsivo di una o più root
//! - Pruning delle directory escluse senza visitarle
//! - Limite di profondità opzionale
//! - Symlink ignorati di default (evita cicli)
//! - Errori per-entry (permessi, ecc.) loggati e saltati, mai fatali
//!
//! La sequenza è pigra: lo scheduler la consuma solo alla velocità con cui
//! il worker pool libera capacità, così l'uso di memoria resta limitato
//! anche su directory enormi.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::ShrinkError;

/// Lazy multi-root file discovery
pub struct Walker {
    roots: Vec<PathBuf>,
    exclude: Vec<Pattern>,
    max_depth: Option<usize>,
    follow_symlinks: bool,
}

impl Walker {
    pub fn new(config: &Config) -> Result<Self, ShrinkError> {
        let exclude = config
            .exclude
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| ShrinkError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            roots: config.roots.clone(),
            exclude,
            max_depth: config.max_depth,
            follow_symlinks: config.follow_symlinks,
        })
    }

    /// Iterate lazily over all regular files under every root.
    ///
    /// Each root restarts the walk independently; an unreadable entry is
    /// logged and skipped without aborting the sequence.
    pub fn iter(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.roots.iter().flat_map(move |root| {
            let mut walk = WalkDir::new(root).follow_links(self.follow_symlinks);
            if let Some(depth) = self.max_depth {
                walk = walk.max_depth(depth);
            }

            walk.into_iter()
                .filter_entry(move |entry| !self.is_excluded(entry.path()))
                .filter_map(|entry| match entry {
                    Ok(entry) if entry.file_type().is_file() => Some(entry.into_path()),
                    Ok(_) => None,
                    Err(error) => {
                        warn!("skipping unreadable entry: {}", error);
                        None
                    }
                })
        })
    }

    /// Match a path against the exclusion globs, both as a full path and by
    /// its file name so bare patterns like `node_modules` work
    fn is_excluded(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy());
        self.exclude.iter().any(|pattern| {
            pattern.matches_path(path)
                || name
                    .as_deref()
                    .map(|n| pattern.matches(n))
                    .unwrap_or(false)
        })
    }
}
