//! # Strategy Selection Module
//!
//! Questo modulo decide COME comprimere un file: quale tool esterno,
//! con quali parametri, verso quale container.
//!
//! ## Responsabilità:
//! - Mappa (kind, container, configurazione, toolbox) su una `Strategy`
//! - Selezione deterministica: input identici producono sempre la stessa
//!   strategia (necessario per dry-run riproducibili)
//! - Nessuna gerarchia di "encoder class": la strategia è un valore
//!   dichiarativo, il template degli argomenti viene reso concreto solo
//!   al momento dell'esecuzione
//!
//! ## Catene di preferenza per kind/container:
//! - Jpeg: mozjpeg (quality-aware) poi jpegtran (lossless)
//! - Png: oxipng poi optipng (lossless, strip metadata)
//! - WebP: cwebp alla qualità configurata
//! - Gif: nessuna strategia (ambiguità still/animated)
//! - Mp4 / Mov / Mkv: ffmpeg libx264 + aac, stesso container
//! - WebM: ffmpeg libvpx-vp9 + libopus
//! - Avi: nessuna strategia (container legacy)
//! - Mp3 / Ogg / M4a: ffmpeg con l'encoder lossy corrispondente
//! - Flac / Wav: nessuna strategia (sorgenti lossless)
//!
//! Il container di output è sempre uguale a quello di input: il commit
//! layer può così rinominare sopra l'originale senza cambiarne il nome.

use std::ffi::OsString;
use std::path::Path;

use crate::classify::{Container, MediaKind};
use crate::config::Config;
use crate::tools::{Tool, Toolbox};
use crate::utils::to_string_vec;

/// One element of a command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Literal argument passed through unchanged
    Lit(String),
    /// Replaced with the input path at invocation time
    Input,
    /// Replaced with the temporary output path at invocation time
    Output,
}

/// Declarative compression plan for one candidate.
///
/// A strategy never runs anything itself: it only names the tool and carries
/// the argument template the executor will render against concrete paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub tool: Tool,
    pub args: Vec<Arg>,
    /// Container of the produced file; always equals the input container
    pub container: Container,
    /// Media kind the output must re-probe as before commit
    pub expects: MediaKind,
}

impl Strategy {
    /// Render the template against concrete input/output paths
    pub fn command_line(&self, input: &Path, output: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match arg {
                Arg::Lit(s) => OsString::from(s),
                Arg::Input => input.as_os_str().to_os_string(),
                Arg::Output => output.as_os_str().to_os_string(),
            })
            .collect()
    }

    /// Human-readable invocation with placeholders, for dry-run logging
    pub fn describe(&self) -> String {
        let rendered: Vec<String> = self
            .args
            .iter()
            .map(|arg| match arg {
                Arg::Lit(s) => s.clone(),
                Arg::Input => "<input>".to_string(),
                Arg::Output => "<output>".to_string(),
            })
            .collect();
        format!("{} {}", self.tool.binary(), rendered.join(" "))
    }
}

fn lits(items: Vec<String>) -> impl Iterator<Item = Arg> {
    items.into_iter().map(Arg::Lit)
}

/// Select the compression strategy for a classified candidate.
///
/// Returns `None` when the kind/container pair has no profitable re-encode
/// or when the needed external tool is not available; both cases surface as
/// a Skipped outcome, never as an error.
pub fn select(
    kind: MediaKind,
    container: Option<Container>,
    config: &Config,
    toolbox: &Toolbox,
) -> Option<Strategy> {
    let container = container?;
    match kind {
        MediaKind::Image => select_image(container, config, toolbox),
        MediaKind::Video => select_video(container, config, toolbox),
        MediaKind::Audio => select_audio(container, config, toolbox),
        MediaKind::Unknown => None,
    }
}

fn select_image(container: Container, config: &Config, toolbox: &Toolbox) -> Option<Strategy> {
    match container {
        Container::Jpeg => {
            if toolbox.contains(Tool::Mozjpeg) {
                let mut args: Vec<Arg> = lits(to_string_vec([
                    "-quality",
                    &config.jpeg_quality.to_string(),
                    "-optimize",
                    "-progressive",
                    "-outfile",
                ]))
                .collect();
                args.push(Arg::Output);
                args.push(Arg::Input);
                Some(Strategy {
                    tool: Tool::Mozjpeg,
                    args,
                    container,
                    expects: MediaKind::Image,
                })
            } else if toolbox.contains(Tool::Jpegtran) {
                let mut args: Vec<Arg> =
                    lits(to_string_vec(["-optimize", "-progressive", "-outfile"])).collect();
                args.push(Arg::Output);
                args.push(Arg::Input);
                Some(Strategy {
                    tool: Tool::Jpegtran,
                    args,
                    container,
                    expects: MediaKind::Image,
                })
            } else {
                None
            }
        }
        Container::Png => {
            if toolbox.contains(Tool::Oxipng) {
                let mut args: Vec<Arg> =
                    lits(to_string_vec(["-o", "6", "--strip", "all", "--out"])).collect();
                args.push(Arg::Output);
                args.push(Arg::Input);
                Some(Strategy {
                    tool: Tool::Oxipng,
                    args,
                    container,
                    expects: MediaKind::Image,
                })
            } else if toolbox.contains(Tool::Optipng) {
                let mut args: Vec<Arg> =
                    lits(to_string_vec(["-o7", "-strip", "all", "-clobber", "-out"])).collect();
                args.push(Arg::Output);
                args.push(Arg::Input);
                Some(Strategy {
                    tool: Tool::Optipng,
                    args,
                    container,
                    expects: MediaKind::Image,
                })
            } else {
                None
            }
        }
        Container::WebP => {
            if toolbox.contains(Tool::Cwebp) {
                let mut args: Vec<Arg> = lits(to_string_vec([
                    "-q",
                    &config.webp_quality.to_string(),
                    "-m",
                    "4",
                    "-mt",
                ]))
                .collect();
                args.push(Arg::Input);
                args.push(Arg::Lit("-o".to_string()));
                args.push(Arg::Output);
                Some(Strategy {
                    tool: Tool::Cwebp,
                    args,
                    container,
                    expects: MediaKind::Image,
                })
            } else {
                None
            }
        }
        // Single- vs multi-frame GIFs cannot be told apart cheaply and
        // re-encoding an animation as a still frame destroys it
        Container::Gif => None,
        _ => None,
    }
}

fn ffmpeg_prefix() -> Vec<Arg> {
    let mut args: Vec<Arg> =
        lits(to_string_vec(["-hide_banner", "-loglevel", "error", "-y", "-i"])).collect();
    args.push(Arg::Input);
    args
}

fn select_video(container: Container, config: &Config, toolbox: &Toolbox) -> Option<Strategy> {
    if !toolbox.contains(Tool::Ffmpeg) {
        return None;
    }

    let mut args = ffmpeg_prefix();

    if let Some(max_height) = config.max_height {
        // -2 keeps the width even, as required by most encoders; the comma
        // inside the filter expression must be escaped from the filtergraph
        // parser, not from any shell
        args.extend(lits(to_string_vec([
            "-vf",
            &format!("scale=-2:min(ih\\,{})", max_height),
        ])));
    }

    let crf = config.video_crf.to_string();
    match container {
        Container::Mp4 | Container::Mov | Container::Mkv => {
            let muxer = match container {
                Container::Mp4 => "mp4",
                Container::Mov => "mov",
                _ => "matroska",
            };
            args.extend(lits(to_string_vec([
                "-c:v",
                "libx264",
                "-preset",
                "veryslow",
                "-crf",
                &crf,
                "-c:a",
                "aac",
                "-b:a",
                &config.audio_bitrate,
                "-map_metadata",
                "0",
                "-f",
                muxer,
            ])));
        }
        Container::WebM => {
            args.extend(lits(to_string_vec([
                "-c:v",
                "libvpx-vp9",
                "-row-mt",
                "1",
                "-crf",
                &crf,
                "-b:v",
                "0",
                "-c:a",
                "libopus",
                "-b:a",
                &config.audio_bitrate,
                "-map_metadata",
                "0",
                "-f",
                "webm",
            ])));
        }
        // Re-muxing AVI with a modern codec breaks most consumers of the
        // container; leave those files alone
        Container::Avi => return None,
        _ => return None,
    }
    args.push(Arg::Output);

    Some(Strategy {
        tool: Tool::Ffmpeg,
        args,
        container,
        expects: MediaKind::Video,
    })
}

fn select_audio(container: Container, config: &Config, toolbox: &Toolbox) -> Option<Strategy> {
    if !toolbox.contains(Tool::Ffmpeg) {
        return None;
    }

    let codec: &[&str] = match container {
        Container::Mp3 => &["-c:a", "libmp3lame", "-f", "mp3"],
        Container::Ogg => &["-c:a", "libvorbis", "-f", "ogg"],
        Container::M4a => &["-c:a", "aac", "-f", "ipod"],
        // Re-encoding lossless sources trades fidelity for size, which is
        // not this tool's call to make
        Container::Flac | Container::Wav => return None,
        _ => return None,
    };

    let mut args = ffmpeg_prefix();
    args.extend(lits(to_string_vec([
        codec[0],
        codec[1],
        "-b:a",
        &config.audio_bitrate,
        "-map_metadata",
        "0",
        codec[2],
        codec[3],
    ])));
    args.push(Arg::Output);

    Some(Strategy {
        tool: Tool::Ffmpeg,
        args,
        container,
        expects: MediaKind::Audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn full_toolbox() -> Toolbox {
        Toolbox::from_paths(Tool::ALL.map(|t| (t, PathBuf::from(format!("/usr/bin/{}", t.binary())))))
    }

    fn placeholders(strategy: &Strategy) -> (usize, usize) {
        let inputs = strategy.args.iter().filter(|a| **a == Arg::Input).count();
        let outputs = strategy.args.iter().filter(|a| **a == Arg::Output).count();
        (inputs, outputs)
    }

    #[test]
    fn test_selection_is_deterministic() {
        let config = Config::default();
        let toolbox = full_toolbox();

        let a = select(MediaKind::Image, Some(Container::Jpeg), &config, &toolbox);
        let b = select(MediaKind::Image, Some(Container::Jpeg), &config, &toolbox);
        assert_eq!(a, b);
    }

    #[test]
    fn test_jpeg_preference_chain() {
        let config = Config::default();

        let with_mozjpeg = full_toolbox();
        let s = select(MediaKind::Image, Some(Container::Jpeg), &config, &with_mozjpeg).unwrap();
        assert_eq!(s.tool, Tool::Mozjpeg);

        let without = Toolbox::from_paths([(Tool::Jpegtran, PathBuf::from("/usr/bin/jpegtran"))]);
        let s = select(MediaKind::Image, Some(Container::Jpeg), &config, &without).unwrap();
        assert_eq!(s.tool, Tool::Jpegtran);

        let none = Toolbox::from_paths([]);
        assert!(select(MediaKind::Image, Some(Container::Jpeg), &config, &none).is_none());
    }

    #[test]
    fn test_every_strategy_has_one_input_and_one_output() {
        let config = Config::default();
        let toolbox = full_toolbox();

        let cases = [
            (MediaKind::Image, Container::Jpeg),
            (MediaKind::Image, Container::Png),
            (MediaKind::Image, Container::WebP),
            (MediaKind::Video, Container::Mp4),
            (MediaKind::Video, Container::Mov),
            (MediaKind::Video, Container::Mkv),
            (MediaKind::Video, Container::WebM),
            (MediaKind::Audio, Container::Mp3),
            (MediaKind::Audio, Container::Ogg),
            (MediaKind::Audio, Container::M4a),
        ];

        for (kind, container) in cases {
            let s = select(kind, Some(container), &config, &toolbox)
                .unwrap_or_else(|| panic!("no strategy for {:?}", container));
            assert_eq!(placeholders(&s), (1, 1), "template for {:?}", container);
            assert_eq!(s.container, container);
        }
    }

    #[test]
    fn test_unsupported_cases_yield_no_strategy() {
        let config = Config::default();
        let toolbox = full_toolbox();

        assert!(select(MediaKind::Image, Some(Container::Gif), &config, &toolbox).is_none());
        assert!(select(MediaKind::Video, Some(Container::Avi), &config, &toolbox).is_none());
        assert!(select(MediaKind::Audio, Some(Container::Flac), &config, &toolbox).is_none());
        assert!(select(MediaKind::Audio, Some(Container::Wav), &config, &toolbox).is_none());
        assert!(select(MediaKind::Unknown, None, &config, &toolbox).is_none());
    }

    #[test]
    fn test_webm_uses_vp9() {
        let config = Config::default();
        let toolbox = full_toolbox();

        let s = select(MediaKind::Video, Some(Container::WebM), &config, &toolbox).unwrap();
        assert!(s.args.contains(&Arg::Lit("libvpx-vp9".to_string())));
        assert!(s.args.contains(&Arg::Lit("libopus".to_string())));
    }

    #[test]
    fn test_max_height_adds_scale_filter() {
        let mut config = Config::default();
        let toolbox = full_toolbox();

        let plain = select(MediaKind::Video, Some(Container::Mp4), &config, &toolbox).unwrap();
        assert!(!plain.args.contains(&Arg::Lit("-vf".to_string())));

        config.max_height = Some(720);
        let scaled = select(MediaKind::Video, Some(Container::Mp4), &config, &toolbox).unwrap();
        assert!(scaled.args.contains(&Arg::Lit("-vf".to_string())));
        assert!(scaled
            .args
            .iter()
            .any(|a| matches!(a, Arg::Lit(s) if s.contains("720"))));
    }

    #[test]
    fn test_command_line_rendering() {
        let config = Config::default();
        let toolbox = full_toolbox();

        let s = select(MediaKind::Image, Some(Container::WebP), &config, &toolbox).unwrap();
        let line = s.command_line(Path::new("/in/a.webp"), Path::new("/tmp/out.webp"));
        assert!(line.contains(&"/in/a.webp".into()));
        assert!(line.contains(&"/tmp/out.webp".into()));

        let described = s.describe();
        assert!(described.starts_with("cwebp"));
        assert!(described.contains("<input>"));
        assert!(described.contains("<output>"));
    }
}
