/*!
 * Narration playback controller.
 *
 * Drives a speech backend through a segmented document one sentence at a
 * time. The controller owns the playback state machine (idle, playing,
 * paused, completed), keeps the resume position, and persists the current
 * paragraph so a later session can pick up where this one left off.
 *
 * Every control action bumps a generation counter. The background drive
 * task re-checks the counter around each utterance, so a completion that
 * arrives after a pause, stop, or skip never advances the position.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::backends::{SpeakRequest, SpeechBackend};
use crate::database::Repository;
use crate::errors::{AppError, StorageError};
use crate::text_segmenter::Paragraph;

/// Playback state of a narration session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No narration in progress
    Idle,
    /// Speaking sentences
    Playing,
    /// Interrupted mid-document, position retained
    Paused,
    /// Reached the end of the document
    Completed,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Completed => write!(f, "completed"),
        }
    }
}

/// Tunable narration behavior, resolved once per session
#[derive(Debug, Clone)]
pub struct NarrationOptions {
    /// Silence between sentences in milliseconds
    pub sentence_gap_ms: u64,
    /// Speech rate multiplier passed to the backend
    pub rate: f32,
    /// Resolved voice, or None for the backend default
    pub voice_id: Option<String>,
}

impl Default for NarrationOptions {
    fn default() -> Self {
        Self {
            sentence_gap_ms: 300,
            rate: 1.0,
            voice_id: None,
        }
    }
}

/// Point-in-time view of the playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    /// Current state
    pub state: PlaybackState,
    /// Zero-based paragraph being read
    pub paragraph_index: usize,
    /// Zero-based sentence within the paragraph
    pub sentence_index: usize,
    /// Total paragraphs in the document
    pub total_paragraphs: usize,
}

impl PlaybackSnapshot {
    /// Fraction of paragraphs completed, as a percentage
    pub fn percent_complete(&self) -> f64 {
        if self.total_paragraphs == 0 {
            return 0.0;
        }
        if self.state == PlaybackState::Completed {
            return 100.0;
        }
        (self.paragraph_index as f64 / self.total_paragraphs as f64) * 100.0
    }

    /// Human-readable progress line for the session display
    pub fn progress_label(&self) -> String {
        match self.state {
            PlaybackState::Idle => "Not reading".to_string(),
            PlaybackState::Playing => format!(
                "Reading paragraph {} of {}",
                self.paragraph_index + 1,
                self.total_paragraphs
            ),
            PlaybackState::Paused => format!(
                "Paused at paragraph {} of {}",
                self.paragraph_index + 1,
                self.total_paragraphs
            ),
            PlaybackState::Completed => {
                format!("Finished all {} paragraphs", self.total_paragraphs)
            }
        }
    }
}

/// Mutable playback position, guarded by the controller's mutex
struct Position {
    state: PlaybackState,
    paragraph_index: usize,
    sentence_index: usize,
}

/// State shared between the controller handle and its drive task
struct NarrationShared {
    /// Document being narrated
    document_id: String,
    /// Language tag passed with every utterance
    language: String,
    /// Segmented document text
    paragraphs: Vec<Paragraph>,
    /// Speech backend for this session
    backend: Arc<dyn SpeechBackend>,
    /// Position persistence
    repository: Repository,
    /// Session options
    options: NarrationOptions,
    /// Current playback position
    position: Mutex<Position>,
    /// Bumped on every control action to invalidate in-flight utterances
    generation: AtomicU64,
}

/// Controller handle for one narration session
///
/// Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct NarrationController {
    shared: Arc<NarrationShared>,
}

impl NarrationController {
    /// Create a controller for a segmented document
    pub fn new(
        document_id: String,
        language: String,
        paragraphs: Vec<Paragraph>,
        backend: Arc<dyn SpeechBackend>,
        repository: Repository,
        options: NarrationOptions,
    ) -> Self {
        Self {
            shared: Arc::new(NarrationShared {
                document_id,
                language,
                paragraphs,
                backend,
                repository,
                options,
                position: Mutex::new(Position {
                    state: PlaybackState::Idle,
                    paragraph_index: 0,
                    sentence_index: 0,
                }),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Document being narrated
    pub fn document_id(&self) -> &str {
        &self.shared.document_id
    }

    /// Segmented paragraphs of the document
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.shared.paragraphs
    }

    /// Current playback position and state
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let pos = self.shared.position.lock();
        PlaybackSnapshot {
            state: pos.state,
            paragraph_index: pos.paragraph_index,
            sentence_index: pos.sentence_index,
            total_paragraphs: self.shared.paragraphs.len(),
        }
    }

    /// Begin or restart narration
    ///
    /// From idle or completed the session starts at the saved reading
    /// position, falling back to the first paragraph. From paused this
    /// behaves like `resume`. While already playing it is a no-op.
    pub async fn play(&self) -> Result<(), AppError> {
        let resume_point = {
            let pos = self.shared.position.lock();
            match pos.state {
                PlaybackState::Playing => {
                    debug!("play ignored: already playing");
                    return Ok(());
                }
                PlaybackState::Paused => Some((pos.paragraph_index, pos.sentence_index)),
                PlaybackState::Idle | PlaybackState::Completed => None,
            }
        };

        let (paragraph, sentence) = match resume_point {
            Some(point) => point,
            None => (self.saved_start_paragraph().await?, 0),
        };

        self.begin_playing(paragraph, sentence);
        Ok(())
    }

    /// Pause narration, cutting the current utterance
    ///
    /// The paragraph is persisted so a later session resumes here. A no-op
    /// unless currently playing.
    pub async fn pause(&self) -> Result<(), AppError> {
        let paragraph = {
            let mut pos = self.shared.position.lock();
            if pos.state != PlaybackState::Playing {
                debug!("pause ignored in state {}", pos.state);
                return Ok(());
            }
            pos.state = PlaybackState::Paused;
            pos.paragraph_index
        };

        // Invalidate the in-flight utterance before killing it, so its
        // completion cannot advance the position
        self.bump_generation();
        self.shared.backend.stop().await?;

        self.shared
            .repository
            .save_position(&self.shared.document_id, paragraph as i64)
            .await
            .map_err(storage_err)?;

        info!("Paused at paragraph {}", paragraph + 1);
        Ok(())
    }

    /// Continue narration from the paused sentence
    ///
    /// Resume is sentence-level within a session: narration picks up at the
    /// exact sentence that was interrupted, not the start of its paragraph.
    pub async fn resume(&self) -> Result<(), AppError> {
        let resume_point = {
            let pos = self.shared.position.lock();
            if pos.state != PlaybackState::Paused {
                debug!("resume ignored in state {}", pos.state);
                return Ok(());
            }
            (pos.paragraph_index, pos.sentence_index)
        };

        self.begin_playing(resume_point.0, resume_point.1);
        Ok(())
    }

    /// Stop narration and forget the reading position
    ///
    /// Idempotent: stopping an idle session is not an error and leaves
    /// everything as it was.
    pub async fn stop(&self) -> Result<(), AppError> {
        let was_active = {
            let mut pos = self.shared.position.lock();
            let was_active = pos.state != PlaybackState::Idle;
            pos.state = PlaybackState::Idle;
            pos.paragraph_index = 0;
            pos.sentence_index = 0;
            was_active
        };

        self.bump_generation();
        self.shared.backend.stop().await?;
        self.shared
            .repository
            .clear_position(&self.shared.document_id)
            .await
            .map_err(storage_err)?;

        if was_active {
            info!("Stopped narration of {}", self.shared.document_id);
        }
        Ok(())
    }

    /// Jump forward or backward by whole paragraphs
    ///
    /// The target is clamped to the first paragraph on the low end. Skipping
    /// past the last paragraph completes the session. Skipping while paused
    /// moves the position but stays paused.
    pub async fn skip(&self, delta: i64) -> Result<(), AppError> {
        enum SkipAction {
            Ignore,
            Complete,
            MoveTo { target: usize, was_playing: bool },
        }

        let action = {
            let mut pos = self.shared.position.lock();
            match pos.state {
                PlaybackState::Idle | PlaybackState::Completed => SkipAction::Ignore,
                PlaybackState::Playing | PlaybackState::Paused => {
                    let target = pos.paragraph_index as i64 + delta;
                    if target >= self.shared.paragraphs.len() as i64 {
                        pos.state = PlaybackState::Completed;
                        SkipAction::Complete
                    } else {
                        let target = target.max(0) as usize;
                        let was_playing = pos.state == PlaybackState::Playing;
                        pos.paragraph_index = target;
                        pos.sentence_index = 0;
                        SkipAction::MoveTo {
                            target,
                            was_playing,
                        }
                    }
                }
            }
        };

        match action {
            SkipAction::Ignore => {
                debug!("skip ignored outside an active session");
                Ok(())
            }
            SkipAction::Complete => {
                self.bump_generation();
                self.shared.backend.stop().await?;
                self.shared
                    .repository
                    .clear_position(&self.shared.document_id)
                    .await
                    .map_err(storage_err)?;
                info!("Skipped past the last paragraph, narration complete");
                Ok(())
            }
            SkipAction::MoveTo {
                target,
                was_playing,
            } => {
                let generation = self.bump_generation();
                self.shared.backend.stop().await?;
                self.shared
                    .repository
                    .save_position(&self.shared.document_id, target as i64)
                    .await
                    .map_err(storage_err)?;

                info!("Skipped to paragraph {}", target + 1);
                if was_playing {
                    let shared = Arc::clone(&self.shared);
                    tokio::spawn(Self::drive(shared, generation));
                }
                Ok(())
            }
        }
    }

    /// Look up the paragraph a fresh session should start from
    async fn saved_start_paragraph(&self) -> Result<usize, AppError> {
        let saved = self
            .shared
            .repository
            .load_position(&self.shared.document_id)
            .await
            .map_err(storage_err)?;

        // Saved positions beyond the current document restart from the top
        Ok(saved
            .and_then(|index| usize::try_from(index).ok())
            .filter(|index| *index < self.shared.paragraphs.len())
            .unwrap_or(0))
    }

    /// Switch to playing at the given position and launch a drive task
    fn begin_playing(&self, paragraph: usize, sentence: usize) {
        if self.shared.paragraphs.is_empty() {
            debug!("nothing to narrate, document has no paragraphs");
            return;
        }

        let generation = self.bump_generation();
        {
            let mut pos = self.shared.position.lock();
            pos.state = PlaybackState::Playing;
            pos.paragraph_index = paragraph;
            pos.sentence_index = sentence;
        }

        info!(
            "Reading from paragraph {} of {}",
            paragraph + 1,
            self.shared.paragraphs.len()
        );

        let shared = Arc::clone(&self.shared);
        tokio::spawn(Self::drive(shared, generation));
    }

    fn bump_generation(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Background task speaking sentences until paused, stopped, or done
    ///
    /// At most one utterance is outstanding at a time: the next sentence is
    /// only submitted after the previous speak call has returned.
    async fn drive(shared: Arc<NarrationShared>, generation: u64) {
        loop {
            let (paragraph_index, sentence_index, text) = {
                let pos = shared.position.lock();
                if pos.state != PlaybackState::Playing
                    || shared.generation.load(Ordering::SeqCst) != generation
                {
                    return;
                }
                let paragraph = &shared.paragraphs[pos.paragraph_index];
                (
                    pos.paragraph_index,
                    pos.sentence_index,
                    paragraph.sentences[pos.sentence_index].clone(),
                )
            };

            let request = SpeakRequest {
                text,
                language: shared.language.clone(),
                voice_id: shared.options.voice_id.clone(),
                rate: shared.options.rate,
            };
            let result = shared.backend.speak(request).await;

            // A control action superseded this utterance while it was in
            // flight; whatever the backend reported is no longer relevant
            if shared.generation.load(Ordering::SeqCst) != generation {
                return;
            }

            if let Err(e) = result {
                warn!(
                    "Skipping sentence {} of paragraph {}: {}",
                    sentence_index + 1,
                    paragraph_index + 1,
                    e
                );
            }

            enum Advance {
                NextSentence,
                NextParagraph(usize),
                Done,
            }

            let advance = {
                let mut pos = shared.position.lock();
                if pos.state != PlaybackState::Playing
                    || shared.generation.load(Ordering::SeqCst) != generation
                {
                    return;
                }

                let paragraph = &shared.paragraphs[pos.paragraph_index];
                if pos.sentence_index + 1 < paragraph.sentence_count() {
                    pos.sentence_index += 1;
                    Advance::NextSentence
                } else if pos.paragraph_index + 1 < shared.paragraphs.len() {
                    pos.paragraph_index += 1;
                    pos.sentence_index = 0;
                    Advance::NextParagraph(pos.paragraph_index)
                } else {
                    pos.state = PlaybackState::Completed;
                    Advance::Done
                }
            };

            match advance {
                Advance::NextSentence => {}
                Advance::NextParagraph(new_paragraph) => {
                    // Persist progress at paragraph boundaries so a crash
                    // loses at most one paragraph
                    if let Err(e) = shared
                        .repository
                        .save_position(&shared.document_id, new_paragraph as i64)
                        .await
                    {
                        warn!("Failed to save reading position: {}", e);
                    }
                }
                Advance::Done => {
                    if let Err(e) = shared.repository.clear_position(&shared.document_id).await {
                        warn!("Failed to clear reading position: {}", e);
                    }
                    info!(
                        "Narration complete ({} paragraphs)",
                        shared.paragraphs.len()
                    );
                    return;
                }
            }

            if shared.options.sentence_gap_ms > 0 {
                tokio::time::sleep(Duration::from_millis(shared.options.sentence_gap_ms)).await;
            }
        }
    }
}

fn storage_err(error: anyhow::Error) -> AppError {
    AppError::Storage(StorageError::OperationFailed(error.to_string()))
}
