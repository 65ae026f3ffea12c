/*!
 * Mock speech backend for testing.
 *
 * This module provides a scripted backend that simulates different behaviors:
 * - `MockBackend::working()` - Always speaks successfully and records the text
 * - `MockBackend::intermittent(n)` - Fails every Nth utterance
 * - `MockBackend::failing()` - Always fails with an error
 * - `MockBackend::unavailable()` - Simulates a backend outage
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::BackendError;
use crate::voice::VoiceInfo;

use super::{SpeakRequest, SpeechBackend};

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always speaks successfully
    Working,
    /// Fails intermittently (every Nth utterance)
    Intermittent { fail_every: usize },
    /// Always fails with an utterance error
    Failing,
    /// Simulates slow synthesis (for cancellation testing)
    Slow { delay_ms: u64 },
    /// Simulates a backend that is not reachable at all
    Unavailable,
}

/// Mock backend for testing narration behavior
#[derive(Debug)]
pub struct MockBackend {
    /// Behavior mode
    behavior: MockBehavior,
    /// Every successfully spoken request, in order
    spoken: Arc<Mutex<Vec<SpeakRequest>>>,
    /// Utterance counter for intermittent failures
    speak_count: Arc<AtomicUsize>,
    /// Number of stop calls received
    stop_count: Arc<AtomicUsize>,
    /// Voices reported by list_voices
    voices: Vec<VoiceInfo>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            spoken: Arc::new(Mutex::new(Vec::new())),
            speak_count: Arc::new(AtomicUsize::new(0)),
            stop_count: Arc::new(AtomicUsize::new(0)),
            voices: Vec::new(),
        }
    }

    /// Create a working mock backend that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock backend
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock backend that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock backend that delays each utterance
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a mock backend that simulates an outage
    pub fn unavailable() -> Self {
        Self::new(MockBehavior::Unavailable)
    }

    /// Set the voices reported by list_voices
    pub fn with_voices(mut self, voices: Vec<VoiceInfo>) -> Self {
        self.voices = voices;
        self
    }

    /// Generate a small fixed voice inventory for tests
    pub fn sample_voices() -> Vec<VoiceInfo> {
        vec![
            VoiceInfo {
                id: "amy".to_string(),
                label: "Amy".to_string(),
                language: "en-US".to_string(),
                quality: Some("medium".to_string()),
            },
            VoiceInfo {
                id: "alba".to_string(),
                label: "Alba".to_string(),
                language: "en-GB".to_string(),
                quality: Some("low".to_string()),
            },
            VoiceInfo {
                id: "carla".to_string(),
                label: "Carla".to_string(),
                language: "es-ES".to_string(),
                quality: Some("medium".to_string()),
            },
        ]
    }

    /// Every request spoken so far, in order
    pub fn spoken_requests(&self) -> Vec<SpeakRequest> {
        self.spoken.lock().clone()
    }

    /// Just the spoken sentence texts, in order
    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|r| r.text.clone()).collect()
    }

    /// Total speak attempts, including failed ones
    pub fn speak_count(&self) -> usize {
        self.speak_count.load(Ordering::SeqCst)
    }

    /// Total stop calls received
    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            spoken: Arc::clone(&self.spoken),
            speak_count: Arc::clone(&self.speak_count),
            stop_count: Arc::clone(&self.stop_count),
            voices: self.voices.clone(),
        }
    }
}

#[async_trait]
impl SpeechBackend for MockBackend {
    async fn speak(&self, request: SpeakRequest) -> Result<(), BackendError> {
        let count = self.speak_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => {
                self.spoken.lock().push(request);
                Ok(())
            }

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(BackendError::UtteranceFailed(format!(
                        "Simulated utterance failure (utterance #{})",
                        count + 1
                    )))
                } else {
                    self.spoken.lock().push(request);
                    Ok(())
                }
            }

            MockBehavior::Failing => Err(BackendError::UtteranceFailed(
                "Simulated utterance failure".to_string(),
            )),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                self.spoken.lock().push(request);
                Ok(())
            }

            MockBehavior::Unavailable => Err(BackendError::Unavailable(
                "Simulated backend outage".to_string(),
            )),
        }
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_voices(&self, language: Option<&str>) -> Result<Vec<VoiceInfo>, BackendError> {
        if self.behavior == MockBehavior::Unavailable {
            return Err(BackendError::VoiceEnumeration(
                "Simulated backend outage".to_string(),
            ));
        }

        let mut voices = self.voices.clone();
        if let Some(language) = language {
            voices.retain(|v| v.matches_language(language));
        }
        Ok(voices)
    }
}
