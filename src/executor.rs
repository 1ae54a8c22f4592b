//! # Transcode Executor Module
//!
//! Questo modulo esegue una strategia contro un singolo file, come processo
//! figlio isolato.
//!
//! ## Responsabilità:
//! - Spawn dell'encoder esterno con il template della strategia
//! - Cattura dello stderr per la diagnostica
//! - Timeout per job: allo scadere il processo figlio viene ucciso
//! - Exit non-zero, crash o output vuoto diventano `ShrinkError`, mai panics
//!
//! L'executor scrive SOLO sul path temporaneo del job, mai sull'originale.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::ShrinkError;
use crate::strategy::Strategy;
use crate::tools::Toolbox;

/// Longest stderr excerpt kept for diagnostics
const STDERR_EXCERPT: usize = 4096;

/// Run a strategy against `input`, writing to the private `output` path.
///
/// Returns `Ok(())` only when the child exited with status zero and produced
/// a non-empty output file. The caller owns the output path and its cleanup;
/// this function never touches `input` itself.
pub async fn execute(
    strategy: &Strategy,
    toolbox: &Toolbox,
    input: &Path,
    output: &Path,
    timeout: Duration,
) -> Result<(), ShrinkError> {
    let tool = strategy.tool;
    let binary = toolbox.path(tool).ok_or_else(|| ShrinkError::Spawn {
        tool: tool.binary(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "tool not in toolbox"),
    })?;

    let mut command = Command::new(binary);
    command
        .args(strategy.command_line(input, output))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        // Dropping the wait future on timeout must not leak the encoder
        .kill_on_drop(true);

    debug!("spawning {:?}", command);
    let child = command.spawn().map_err(|source| ShrinkError::Spawn {
        tool: tool.binary(),
        source,
    })?;

    let result = tokio::time::timeout(timeout, child.wait_with_output()).await;
    let out = match result {
        Err(_elapsed) => {
            return Err(ShrinkError::Timeout {
                tool: tool.binary(),
                seconds: timeout.as_secs(),
            });
        }
        Ok(wait_result) => wait_result?,
    };

    if !out.status.success() {
        return Err(ShrinkError::ToolFailed {
            tool: tool.binary(),
            status: out.status,
            stderr: stderr_excerpt(&out.stderr),
        });
    }

    debug!("`{}` finished: {}", tool.binary(), out.status);

    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(ShrinkError::EmptyOutput),
        Err(_) => Err(ShrinkError::EmptyOutput),
    }
}

fn stderr_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.len() <= STDERR_EXCERPT {
        text.to_string()
    } else {
        // Encoders put the actual failure at the end of their output
        let tail_start = text.len() - STDERR_EXCERPT;
        let tail_start = (tail_start..text.len())
            .find(|i| text.is_char_boundary(*i))
            .unwrap_or(text.len());
        format!("... {}", &text[tail_start..])
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::classify::{Container, MediaKind};
    use crate::strategy::Arg;
    use crate::tools::Tool;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn copy_strategy() -> Strategy {
        Strategy {
            tool: Tool::Ffmpeg,
            args: vec![Arg::Input, Arg::Output],
            container: Container::Mp4,
            expects: MediaKind::Video,
        }
    }

    fn toolbox_with(path: PathBuf) -> Toolbox {
        Toolbox::from_paths([(Tool::Ffmpeg, path)])
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let dir = TempDir::new().unwrap();
        let tool = script(&dir, "fake-encoder", "cp \"$1\" \"$2\"");
        let input = dir.path().join("input.bin");
        let output = dir.path().join("output.bin");
        std::fs::write(&input, b"payload").unwrap();

        execute(
            &copy_strategy(),
            &toolbox_with(tool),
            &input,
            &output,
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_nonzero_exit_captures_stderr() {
        let dir = TempDir::new().unwrap();
        let tool = script(&dir, "fake-encoder", "echo 'codec exploded' >&2; exit 3");
        let input = dir.path().join("input.bin");
        std::fs::write(&input, b"payload").unwrap();

        let err = execute(
            &copy_strategy(),
            &toolbox_with(tool),
            &input,
            &dir.path().join("output.bin"),
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        match err {
            ShrinkError::ToolFailed { stderr, status, .. } => {
                assert!(stderr.contains("codec exploded"));
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = TempDir::new().unwrap();
        let tool = script(&dir, "fake-encoder", "sleep 30");
        let input = dir.path().join("input.bin");
        std::fs::write(&input, b"payload").unwrap();

        let started = std::time::Instant::now();
        let err = execute(
            &copy_strategy(),
            &toolbox_with(tool),
            &input,
            &dir.path().join("output.bin"),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ShrinkError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let dir = TempDir::new().unwrap();
        // Exits zero without writing anything
        let tool = script(&dir, "fake-encoder", "true");
        let input = dir.path().join("input.bin");
        std::fs::write(&input, b"payload").unwrap();

        let err = execute(
            &copy_strategy(),
            &toolbox_with(tool),
            &input,
            &dir.path().join("output.bin"),
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ShrinkError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input.bin");
        std::fs::write(&input, b"payload").unwrap();

        let err = execute(
            &copy_strategy(),
            &toolbox_with(dir.path().join("no-such-binary")),
            &input,
            &dir.path().join("output.bin"),
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ShrinkError::Spawn { .. }));
    }
}
