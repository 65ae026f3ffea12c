/*!
 * Speech backend implementations.
 *
 * This module contains the backends that turn a sentence of text plus
 * a language tag into audible speech:
 * - Process: local synthesizer and player invoked as subprocesses
 * - Bridge: HTTP bridge to a host application's speech engine
 * - Mock: scripted backend for tests
 *
 * The backend is selected once at session start and never switched
 * mid-session.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{BackendKind, BackendSettings};
use crate::errors::BackendError;
use crate::voice::VoiceInfo;

/// One utterance request passed to a speech backend
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakRequest {
    /// Sentence text to synthesize
    pub text: String,
    /// Language tag of the document being narrated
    pub language: String,
    /// Resolved voice identifier, or None for the backend default
    pub voice_id: Option<String>,
    /// Speech rate multiplier (1.0 = normal speed)
    pub rate: f32,
}

impl SpeakRequest {
    /// Convenience constructor for a request with the default voice
    pub fn new<S: Into<String>, L: Into<String>>(text: S, language: L) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            voice_id: None,
            rate: 1.0,
        }
    }
}

/// Common trait for all speech backends
///
/// `speak` resolves when the utterance has finished playing (or
/// failed); the narration controller awaits it to sequence sentences.
/// `stop` cancels any in-flight utterance and must be safe to call at
/// any time, including when nothing is playing.
#[async_trait]
pub trait SpeechBackend: Send + Sync + Debug {
    /// Speak one sentence, resolving on playback completion
    async fn speak(&self, request: SpeakRequest) -> Result<(), BackendError>;

    /// Cancel the in-flight utterance, if any. Idempotent.
    async fn stop(&self) -> Result<(), BackendError>;

    /// Enumerate available voices, optionally filtered by language
    async fn list_voices(&self, language: Option<&str>) -> Result<Vec<VoiceInfo>, BackendError>;
}

/// Build the backend selected by the configuration
pub fn from_settings(settings: &BackendSettings) -> Result<Arc<dyn SpeechBackend>, BackendError> {
    match settings.kind {
        BackendKind::Process => Ok(Arc::new(process::ProcessBackend::from_settings(settings)?)),
        BackendKind::Bridge => Ok(Arc::new(bridge::BridgeBackend::from_settings(settings)?)),
    }
}

pub mod process;
pub mod bridge;
pub mod mock;
