//! Native platform speech engine

use crate::config::{SpeechConfig, VoiceConfig};
use crate::engines::SpeechEngine;
use crate::error::SpeechError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

const MAX_TEXT_CHARS: usize = 10_000;

/// Command line synthesizer for the current platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Espeak,
    Say,
}

impl Backend {
    fn for_platform() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Backend::Say)
        } else if cfg!(target_os = "linux") {
            Some(Backend::Espeak)
        } else {
            None
        }
    }

    fn program(&self) -> &'static str {
        match self {
            Backend::Espeak => "espeak-ng",
            Backend::Say => "say",
        }
    }

    fn probe(&self) -> bool {
        let mut cmd = std::process::Command::new(self.program());
        match self {
            Backend::Espeak => cmd.arg("--version"),
            Backend::Say => cmd.arg("-v").arg("?"),
        };
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Native speech engine (espeak-ng on Linux, say on macOS)
pub struct NativeSpeechEngine {
    backend: Option<Backend>,
    voice: VoiceConfig,
    rate: u32,
    volume: f32,
    pitch: f32,
    cancel: Notify,
}

impl NativeSpeechEngine {
    pub fn new(config: &SpeechConfig) -> Self {
        let backend = match Backend::for_platform() {
            Some(backend) if backend.probe() => {
                info!("Native speech engine initialized ({})", backend.program());
                Some(backend)
            }
            Some(backend) => {
                warn!("Failed to initialize native speech: {} not found", backend.program());
                None
            }
            None => {
                warn!("Native speech not supported on this platform");
                None
            }
        };

        Self {
            backend,
            voice: config.voice.clone(),
            rate: config.rate,
            volume: config.volume,
            pitch: config.pitch,
            cancel: Notify::new(),
        }
    }

    fn command_args(&self, backend: Backend, text: &str) -> Vec<String> {
        let mut args = Vec::new();
        match backend {
            Backend::Espeak => {
                args.push("-s".to_string());
                args.push(self.rate.clamp(80, 500).to_string());

                // espeak amplitude is 0-200, 100 is normal
                let amplitude = (self.volume.clamp(0.0, 1.0) * 200.0).round() as u32;
                args.push("-a".to_string());
                args.push(amplitude.to_string());

                // espeak pitch is 0-99, 50 is normal
                let pitch = (50.0 + self.pitch.clamp(-1.0, 1.0) * 49.0).round() as u32;
                args.push("-p".to_string());
                args.push(pitch.to_string());

                let voice = self
                    .voice
                    .name
                    .as_deref()
                    .map(sanitize_voice)
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| self.voice.language.to_lowercase());
                args.push("-v".to_string());
                args.push(voice);
            }
            Backend::Say => {
                if let Some(voice) = self.voice.name.as_deref().map(sanitize_voice) {
                    if !voice.is_empty() {
                        args.push("-v".to_string());
                        args.push(voice);
                    }
                }
                // say has no volume or pitch flags
                args.push("-r".to_string());
                args.push(self.rate.min(500).to_string());
            }
        }
        args.push(text.to_string());
        args
    }
}

/// Strip control characters and leading dashes so text is never read as a flag.
fn sanitize_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(MAX_TEXT_CHARS)
        .collect();
    cleaned.trim().trim_start_matches('-').trim_start().to_string()
}

fn sanitize_voice(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '+')
        .take(256)
        .collect::<String>()
        .trim_start_matches('-')
        .to_string()
}

#[async_trait]
impl SpeechEngine for NativeSpeechEngine {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let backend = self
            .backend
            .ok_or_else(|| SpeechError::Unavailable("Native speech engine not available".to_string()))?;

        let text = sanitize_text(text);
        if text.is_empty() {
            return Err(SpeechError::Engine("Text is empty after sanitization".to_string()));
        }

        debug!("Speaking via {}: {}", backend.program(), text);
        // kill_on_drop stops playback when this future is dropped or cancelled
        let mut child = Command::new(backend.program())
            .args(self.command_args(backend, &text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::Unavailable(format!("Failed to run {}: {}", backend.program(), e)))?;

        let cancelled = self.cancel.notified();
        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(SpeechError::Engine(format!("{} failed: {}", backend.program(), status)))
                }
            }
            _ = cancelled => Err(SpeechError::Cancelled),
        }
    }

    fn cancel(&self) {
        self.cancel.notify_waiters();
    }

    fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    fn name(&self) -> &str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(backend: Option<Backend>) -> NativeSpeechEngine {
        let config = SpeechConfig::default();
        NativeSpeechEngine {
            backend,
            voice: config.voice,
            rate: 175,
            volume: 0.5,
            pitch: 1.0,
            cancel: Notify::new(),
        }
    }

    #[test]
    fn test_espeak_args() {
        let args = engine(None).command_args(Backend::Espeak, "Person ahead.");
        assert_eq!(
            args,
            vec!["-s", "175", "-a", "100", "-p", "99", "-v", "en-us", "Person ahead."]
        );
    }

    #[test]
    fn test_say_args_skip_volume() {
        let mut e = engine(None);
        e.voice.name = Some("Samantha".to_string());
        let args = e.command_args(Backend::Say, "Hi");
        assert_eq!(args, vec!["-v", "Samantha", "-r", "175", "Hi"]);
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("--help me"), "help me");
        assert_eq!(sanitize_text("line\none"), "line one");
        assert_eq!(sanitize_text("   "), "");
        assert_eq!(sanitize_voice("-en;rm"), "enrm");
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let e = engine(None);
        assert!(!e.is_available());
        let err = e.speak("hello").await.unwrap_err();
        assert!(matches!(err, SpeechError::Unavailable(_)));
    }
}
