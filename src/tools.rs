//! # External Tool Detection Module
//!
//! Questo modulo rileva quali encoder esterni sono disponibili sul sistema.
//! La pipeline non implementa codec: ogni compressione è delegata a un tool
//! esterno, giudicato solo da exit status e output prodotto.
//!
//! La `Toolbox` viene costruita una volta all'avvio e poi consultata dal
//! selettore di strategie: un tool mancante rende la strategia non
//! disponibile (file saltato), mai un errore.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, trace};

/// External encoder binaries the strategy table can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Mozjpeg,
    Jpegtran,
    Oxipng,
    Optipng,
    Cwebp,
    Ffmpeg,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Mozjpeg,
        Tool::Jpegtran,
        Tool::Oxipng,
        Tool::Optipng,
        Tool::Cwebp,
        Tool::Ffmpeg,
    ];

    /// Binary name looked up on PATH
    pub fn binary(self) -> &'static str {
        match self {
            Tool::Mozjpeg => "mozjpeg",
            Tool::Jpegtran => "jpegtran",
            Tool::Oxipng => "oxipng",
            Tool::Optipng => "optipng",
            Tool::Cwebp => "cwebp",
            Tool::Ffmpeg => "ffmpeg",
        }
    }
}

/// Resolved external tools, detected once at startup
#[derive(Debug, Default)]
pub struct Toolbox {
    available: HashMap<Tool, PathBuf>,
}

impl Toolbox {
    /// Probe PATH for every known tool
    pub async fn detect() -> Self {
        let mut available = HashMap::new();

        for tool in Tool::ALL {
            if let Some(path) = Self::probe(tool.binary()).await {
                debug!("found `{}` at {}", tool.binary(), path.display());
                available.insert(tool, path);
            } else {
                trace!("`{}` not found on PATH", tool.binary());
            }
        }

        Self { available }
    }

    async fn probe(name: &str) -> Option<PathBuf> {
        let which = if cfg!(windows) { "where" } else { "which" };

        let output = Command::new(which).arg(name).output().await.ok()?;
        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let first = stdout.lines().next()?.trim();
        if first.is_empty() {
            None
        } else {
            Some(PathBuf::from(first))
        }
    }

    /// Build a toolbox from explicit tool paths (tests and embedding)
    pub fn from_paths<I>(tools: I) -> Self
    where
        I: IntoIterator<Item = (Tool, PathBuf)>,
    {
        Self {
            available: tools.into_iter().collect(),
        }
    }

    pub fn contains(&self, tool: Tool) -> bool {
        self.available.contains_key(&tool)
    }

    pub fn path(&self, tool: Tool) -> Option<&Path> {
        self.available.get(&tool).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    /// One-line report of the detected tools, for startup logging
    pub fn report(&self) -> String {
        let mut names: Vec<&str> = Tool::ALL
            .iter()
            .filter(|t| self.contains(**t))
            .map(|t| t.binary())
            .collect();
        names.sort_unstable();

        if names.is_empty() {
            "no external encoders found".to_string()
        } else {
            format!("available encoders: {}", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_detect_does_not_fail() {
        // Detection must never error, whatever is installed
        let toolbox = Toolbox::detect().await;
        let _ = toolbox.report();
    }

    #[test]
    fn test_from_paths() {
        let toolbox = Toolbox::from_paths([(Tool::Ffmpeg, PathBuf::from("/usr/bin/ffmpeg"))]);
        assert!(toolbox.contains(Tool::Ffmpeg));
        assert!(!toolbox.contains(Tool::Cwebp));
        assert_eq!(toolbox.path(Tool::Ffmpeg).unwrap(), Path::new("/usr/bin/ffmpeg"));
        assert!(toolbox.report().contains("ffmpeg"));
    }
}
