//! # Content Classification Module
//!
//! Questo modulo identifica il tipo di media di un file leggendo i suoi
//! primi byte, mai l'estensione: un file rinominato viene classificato per
//! il suo contenuto reale.
//!
//! ## Responsabilità:
//! - Lettura di un prefisso limitato del file (mai il file intero)
//! - Classificazione tramite tabella di firme esplicita e documentata
//! - Ri-probe dell'output dell'encoder per il commit layer
//!
//! ## Tabella delle firme:
//!
//! | Firma (offset)                             | Kind    | Container |
//! |--------------------------------------------|---------|-----------|
//! | `FF D8 FF`                                 | Image   | Jpeg      |
//! | `89 50 4E 47 0D 0A 1A 0A`                  | Image   | Png       |
//! | `GIF87a` / `GIF89a`                        | Image   | Gif       |
//! | `RIFF....WEBP`                             | Image   | WebP      |
//! | `....ftyp` con brand `qt  `                | Video   | Mov       |
//! | `....ftyp` con brand `M4A ` / `M4B `       | Audio   | M4a       |
//! | `....ftyp` (altri brand)                   | Video   | Mp4       |
//! | `1A 45 DF A3` + doctype `webm` nel prefisso| Video   | WebM      |
//! | `1A 45 DF A3` (senza doctype `webm`)       | Video   | Mkv       |
//! | `RIFF....AVI `                             | Video   | Avi       |
//! | `fLaC`                                     | Audio   | Flac      |
//! | `OggS`                                     | Audio   | Ogg       |
//! | `RIFF....WAVE`                             | Audio   | Wav       |
//! | `ID3` oppure MPEG frame sync `FF Ex/Fx`    | Audio   | Mp3       |
//! | altro                                      | Unknown | -         |
//!
//! Il frame sync MP3 è controllato per ultimo perché è la firma più debole.
//! Contenuto non riconosciuto è `Unknown`, mai un errore.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncReadExt;
use tracing::trace;

use crate::error::ShrinkError;

/// How many bytes of a file the classifier reads. Large enough to find the
/// Matroska doctype and any `ftyp` brand, small enough to stay cheap.
pub const PREFIX_LEN: usize = 8192;

/// Broad media category of a file, derived from content signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Container/codec hint, refining a `MediaKind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Jpeg,
    Png,
    Gif,
    WebP,
    Mp4,
    Mov,
    Mkv,
    WebM,
    Avi,
    M4a,
    Mp3,
    Flac,
    Ogg,
    Wav,
}

impl Container {
    /// Canonical file extension, used for temporary output names
    pub fn extension(self) -> &'static str {
        match self {
            Container::Jpeg => "jpg",
            Container::Png => "png",
            Container::Gif => "gif",
            Container::WebP => "webp",
            Container::Mp4 => "mp4",
            Container::Mov => "mov",
            Container::Mkv => "mkv",
            Container::WebM => "webm",
            Container::Avi => "avi",
            Container::M4a => "m4a",
            Container::Mp3 => "mp3",
            Container::Flac => "flac",
            Container::Ogg => "ogg",
            Container::Wav => "wav",
        }
    }
}

/// A discovered file together with its classification and original size
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub container: Option<Container>,
    pub size: u64,
}

/// Classify a byte prefix against the signature table.
///
/// Pure function; the full classification logic lives here so it can be
/// tested without touching the filesystem.
pub fn classify_bytes(buf: &[u8]) -> (MediaKind, Option<Container>) {
    if buf.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return (MediaKind::Image, Some(Container::Jpeg));
    }

    if buf.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return (MediaKind::Image, Some(Container::Png));
    }

    if buf.starts_with(b"GIF87a") || buf.starts_with(b"GIF89a") {
        return (MediaKind::Image, Some(Container::Gif));
    }

    if buf.starts_with(b"fLaC") {
        return (MediaKind::Audio, Some(Container::Flac));
    }

    if buf.starts_with(b"OggS") {
        return (MediaKind::Audio, Some(Container::Ogg));
    }

    // RIFF family: WebP images, WAVE audio, AVI video
    if buf.len() >= 12 && buf.starts_with(b"RIFF") {
        return match &buf[8..12] {
            b"WEBP" => (MediaKind::Image, Some(Container::WebP)),
            b"WAVE" => (MediaKind::Audio, Some(Container::Wav)),
            b"AVI " => (MediaKind::Video, Some(Container::Avi)),
            _ => (MediaKind::Unknown, None),
        };
    }

    // ISO base media family: the brand after `ftyp` separates QuickTime and
    // audio-only containers from plain MP4
    if buf.len() >= 12 && &buf[4..8] == b"ftyp" {
        return match &buf[8..12] {
            b"qt  " => (MediaKind::Video, Some(Container::Mov)),
            b"M4A " | b"M4B " => (MediaKind::Audio, Some(Container::M4a)),
            _ => (MediaKind::Video, Some(Container::Mp4)),
        };
    }

    // Matroska/EBML: the doctype string inside the header separates WebM
    if buf.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        let container = if buf.windows(4).any(|w| w == b"webm") {
            Container::WebM
        } else {
            Container::Mkv
        };
        return (MediaKind::Video, Some(container));
    }

    if buf.starts_with(b"ID3") {
        return (MediaKind::Audio, Some(Container::Mp3));
    }

    // Bare MPEG audio frame sync (11 set bits). Weakest signature, so it is
    // tried only after everything else.
    if buf.len() >= 2 && buf[0] == 0xFF && buf[1] & 0xE0 == 0xE0 {
        return (MediaKind::Audio, Some(Container::Mp3));
    }

    (MediaKind::Unknown, None)
}

/// Classify a file on disk by reading a bounded prefix of its content
pub async fn classify_path(path: &Path) -> Result<(MediaKind, Option<Container>), ShrinkError> {
    trace!("classifying `{}`", path.display());

    let mut buffer = [0u8; PREFIX_LEN];
    let mut f = OpenOptions::new().read(true).open(path).await?;
    let mut count = 0;
    // A single read may return short; fill until EOF or the buffer is full
    loop {
        let n = f.read(&mut buffer[count..]).await?;
        if n == 0 || count + n == PREFIX_LEN {
            count += n;
            break;
        }
        count += n;
    }

    Ok(classify_bytes(&buffer[..count]))
}

/// Build a `Candidate` for a path: classification plus original size
pub async fn candidate_for(path: PathBuf) -> Result<Candidate, ShrinkError> {
    let metadata = tokio::fs::metadata(&path).await?;
    let (kind, container) = classify_path(&path).await?;
    Ok(Candidate {
        path,
        kind,
        container,
        size: metadata.len(),
    })
}
