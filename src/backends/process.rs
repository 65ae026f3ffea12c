/*!
 * Subprocess speech backend.
 *
 * Drives a local neural synthesizer (piper by default) plus an audio
 * player as child processes. Sentence text is piped to the
 * synthesizer's stdin, the rendered wav lands in a scratch file, and
 * the player runs to completion before `speak` resolves. Voice models
 * are .onnx files discovered in the configured voices directory, with
 * piper's sidecar `.onnx.json` card supplying locale and quality.
 */

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Notify;
use walkdir::WalkDir;

use crate::app_config::BackendSettings;
use crate::errors::BackendError;
use crate::voice::VoiceInfo;

use super::{SpeakRequest, SpeechBackend};

/// Voice model file extension
const MODEL_EXTENSION: &str = "onnx";

#[derive(Debug)]
pub struct ProcessBackend {
    /// Synthesizer executable, fed text on stdin
    synthesizer: String,
    /// Audio player executable for the rendered wav
    player: String,
    /// Directory holding voice model files
    voices_dir: PathBuf,
    /// Wakes in-flight stages so they can kill their child process
    cancel: Arc<Notify>,
    /// Set by stop() so a cancel is seen even between stages
    cancelled: Arc<AtomicBool>,
}

impl ProcessBackend {
    /// Build the backend from configuration settings
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, BackendError> {
        let voices_dir = settings
            .voices_dir
            .clone()
            .ok_or_else(|| BackendError::Unavailable("no voices directory configured".to_string()))?;

        Ok(Self {
            synthesizer: settings.synthesizer_command.clone(),
            player: settings.player_command.clone(),
            voices_dir,
            cancel: Arc::new(Notify::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Construct directly from component names and a voices directory
    pub fn new<S1, S2, P>(synthesizer: S1, player: S2, voices_dir: P) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            synthesizer: synthesizer.into(),
            player: player.into(),
            voices_dir: voices_dir.into(),
            cancel: Arc::new(Notify::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Path of the model file for a voice id
    fn model_path(&self, voice_id: &str) -> PathBuf {
        self.voices_dir.join(format!("{}.{}", voice_id, MODEL_EXTENSION))
    }

    /// First installed model, used when no voice was resolved
    fn default_model(&self) -> Option<PathBuf> {
        WalkDir::new(&self.voices_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.is_file()
                    && path.extension().is_some_and(|ext| ext == MODEL_EXTENSION)
            })
            .min()
    }

    fn spawn_error(program: &str, error: std::io::Error) -> BackendError {
        match error.kind() {
            std::io::ErrorKind::NotFound => BackendError::Unavailable(format!(
                "{} is not installed or not on PATH",
                program
            )),
            _ => BackendError::Unavailable(format!("failed to start {}: {}", program, error)),
        }
    }

    /// Run one child process to completion, killing it if stop() fires
    async fn run_stage(
        &self,
        mut command: Command,
        program: &str,
        stdin_text: Option<&str>,
    ) -> Result<(), BackendError> {
        let mut child = command
            .spawn()
            .map_err(|e| Self::spawn_error(program, e))?;

        if let Some(text) = stdin_text {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|e| BackendError::UtteranceFailed(format!(
                        "failed to write text to {}: {}",
                        program, e
                    )))?;
                // Dropping the handle closes the pipe so the tool can finish
            }
        }

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| {
                    BackendError::UtteranceFailed(format!("{} did not exit cleanly: {}", program, e))
                })?;
                if !status.success() {
                    return Err(BackendError::UtteranceFailed(format!(
                        "{} exited with {}",
                        program, status
                    )));
                }
                Ok(())
            }
            _ = self.cancel.notified() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(BackendError::UtteranceFailed("utterance cancelled".to_string()))
            }
        }
    }

    /// Read the sidecar model card, tolerating absent or malformed files
    fn read_model_card(model_path: &Path) -> (Option<String>, Option<String>) {
        let card_path = PathBuf::from(format!("{}.json", model_path.display()));

        let content = match std::fs::read_to_string(&card_path) {
            Ok(content) => content,
            Err(_) => return (None, None),
        };

        let json: serde_json::Value = match serde_json::from_str(&content) {
            Ok(json) => json,
            Err(e) => {
                warn!("Ignoring malformed model card {:?}: {}", card_path, e);
                return (None, None);
            }
        };

        let language = json
            .get("language")
            .and_then(|l| l.get("code"))
            .and_then(|c| c.as_str())
            .map(|code| code.replace('_', "-"));

        let quality = json
            .get("audio")
            .and_then(|a| a.get("quality"))
            .and_then(|q| q.as_str())
            .map(|q| q.to_string());

        (language, quality)
    }
}

#[async_trait]
impl SpeechBackend for ProcessBackend {
    async fn speak(&self, request: SpeakRequest) -> Result<(), BackendError> {
        self.cancelled.store(false, Ordering::SeqCst);

        let model = match &request.voice_id {
            Some(voice_id) => self.model_path(voice_id),
            None => self.default_model().ok_or_else(|| {
                BackendError::Unavailable(format!(
                    "no voice models installed in {:?}",
                    self.voices_dir
                ))
            })?,
        };

        if !model.exists() {
            return Err(BackendError::Unavailable(format!(
                "voice model not found: {:?}",
                model
            )));
        }

        let wav = tempfile::Builder::new()
            .prefix("lectern-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| BackendError::UtteranceFailed(format!("scratch file failed: {}", e)))?;

        debug!(
            "Synthesizing {} chars ({}) with model {:?}",
            request.text.chars().count(),
            request.language,
            model
        );

        // piper's length_scale stretches audio, so rate is its inverse
        let length_scale = 1.0 / request.rate.clamp(0.5, 3.0);

        let mut synth = Command::new(&self.synthesizer);
        synth
            .arg("--model")
            .arg(&model)
            .arg("--length_scale")
            .arg(format!("{:.2}", length_scale))
            .arg("--output_file")
            .arg(wav.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        self.run_stage(synth, &self.synthesizer, Some(&request.text))
            .await?;

        if self.cancelled.load(Ordering::SeqCst) {
            return Err(BackendError::UtteranceFailed("utterance cancelled".to_string()));
        }

        let mut play = Command::new(&self.player);
        play.arg("-q")
            .arg(wav.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        self.run_stage(play, &self.player, None).await
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel.notify_waiters();
        Ok(())
    }

    async fn list_voices(&self, language: Option<&str>) -> Result<Vec<VoiceInfo>, BackendError> {
        if !self.voices_dir.is_dir() {
            debug!("Voices directory {:?} does not exist", self.voices_dir);
            return Ok(Vec::new());
        }

        let mut voices = Vec::new();

        for entry in WalkDir::new(&self.voices_dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != MODEL_EXTENSION) {
                continue;
            }

            let id = match path.file_stem() {
                Some(stem) => stem.to_string_lossy().to_string(),
                None => continue,
            };

            let (card_language, quality) = Self::read_model_card(path);

            voices.push(VoiceInfo {
                label: id.clone(),
                id,
                language: card_language.unwrap_or_else(|| "und".to_string()),
                quality,
            });
        }

        voices.sort_by(|a, b| a.id.cmp(&b.id));

        if let Some(language) = language {
            voices.retain(|voice| voice.matches_language(language));
        }

        Ok(voices)
    }
}
