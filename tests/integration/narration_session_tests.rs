/*!
 * Integration tests for full narration sessions.
 *
 * These tests drive the narration controller against the mock speech
 * backend and an in-memory repository, covering whole-document reads,
 * mid-session interruptions, and position persistence.
 */

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use lectern::backends::mock::MockBackend;
use lectern::database::Repository;
use lectern::narration::{NarrationController, NarrationOptions, PlaybackState};
use lectern::text_segmenter::segment;
use crate::common;

const DOC_ID: &str = "session-doc";

fn make_session(
    text: &str,
    backend: MockBackend,
    repository: Repository,
    gap_ms: u64,
) -> NarrationController {
    NarrationController::new(
        DOC_ID.to_string(),
        "en".to_string(),
        segment(text),
        Arc::new(backend),
        repository,
        NarrationOptions {
            sentence_gap_ms: gap_ms,
            rate: 1.0,
            voice_id: None,
        },
    )
}

/// Polls the mock backend until it has spoken the wanted number of sentences
async fn wait_for_spoken_count(backend: &MockBackend, wanted: usize, timeout_ms: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

    while backend.spoken_texts().len() < wanted {
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "backend spoke {} of {} sentences within {}ms",
                backend.spoken_texts().len(),
                wanted,
                timeout_ms
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Test that a full session speaks every sentence in document order
#[tokio::test]
async fn test_session_withWorkingBackend_shouldSpeakAllSentencesInOrder() -> Result<()> {
    let backend = MockBackend::working();
    let repository = common::create_test_repository()?;
    common::seed_document(&repository, DOC_ID, common::SAMPLE_DOCUMENT).await?;
    let paragraphs = segment(common::SAMPLE_DOCUMENT);
    let expected: Vec<String> = paragraphs
        .iter()
        .flat_map(|p| p.sentences.clone())
        .collect();
    assert!(expected.len() >= 5);

    let controller = NarrationController::new(
        DOC_ID.to_string(),
        "en".to_string(),
        paragraphs,
        Arc::new(backend.clone()),
        repository.clone(),
        NarrationOptions {
            sentence_gap_ms: 0,
            rate: 1.25,
            voice_id: Some("amy".to_string()),
        },
    );

    controller.play().await?;
    common::wait_for_state(&controller, PlaybackState::Completed, 5_000).await;

    assert_eq!(backend.spoken_texts(), expected);
    assert_eq!(repository.load_position(DOC_ID).await?, None);

    // Every utterance carries the session language, voice, and rate
    let first = &backend.spoken_requests()[0];
    assert_eq!(first.language, "en");
    assert_eq!(first.voice_id.as_deref(), Some("amy"));
    assert_eq!(first.rate, 1.25);
    Ok(())
}

/// Test that resume after a pause picks up at the interrupted sentence
#[tokio::test]
async fn test_session_withPauseAndResume_shouldContinueAtInterruptedSentence() -> Result<()> {
    let text = "Alpha one. Alpha two.\n\nBeta one.";
    let backend = MockBackend::working();
    let repository = common::create_test_repository()?;
    common::seed_document(&repository, DOC_ID, text).await?;
    let controller = make_session(text, backend.clone(), repository.clone(), 250);

    controller.play().await?;
    wait_for_spoken_count(&backend, 1, 2_000).await;

    // Land the pause inside the inter-sentence gap
    tokio::time::sleep(Duration::from_millis(60)).await;
    controller.pause().await?;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Paused);
    assert_eq!(snapshot.paragraph_index, 0);
    assert_eq!(snapshot.sentence_index, 1);
    assert_eq!(repository.load_position(DOC_ID).await?, Some(0));

    controller.resume().await?;
    common::wait_for_state(&controller, PlaybackState::Completed, 5_000).await;

    // The interrupted sentence is spoken once, never repeated
    assert_eq!(
        backend.spoken_texts(),
        vec!["Alpha one.", "Alpha two.", "Beta one."]
    );
    assert_eq!(repository.load_position(DOC_ID).await?, None);
    Ok(())
}

/// Test that a fresh session starts from the saved paragraph
#[tokio::test]
async fn test_session_withSavedPosition_shouldResumeFromSavedParagraph() -> Result<()> {
    let backend = MockBackend::working();
    let repository = common::create_test_repository()?;
    common::seed_document(&repository, DOC_ID, common::SAMPLE_DOCUMENT).await?;
    repository.save_position(DOC_ID, 1).await?;

    let paragraphs = segment(common::SAMPLE_DOCUMENT);
    let expected: Vec<String> = paragraphs[1..]
        .iter()
        .flat_map(|p| p.sentences.clone())
        .collect();

    let controller = make_session(common::SAMPLE_DOCUMENT, backend.clone(), repository.clone(), 0);

    controller.play().await?;
    common::wait_for_state(&controller, PlaybackState::Completed, 5_000).await;

    // Nothing from the first paragraph is spoken again
    assert_eq!(backend.spoken_texts(), expected);
    Ok(())
}

/// Test that a saved position beyond the document restarts from the top
#[tokio::test]
async fn test_session_withStaleSavedPosition_shouldRestartFromTop() -> Result<()> {
    let backend = MockBackend::working();
    let repository = common::create_test_repository()?;
    common::seed_document(&repository, DOC_ID, common::SAMPLE_DOCUMENT).await?;
    repository.save_position(DOC_ID, 99).await?;

    let paragraphs = segment(common::SAMPLE_DOCUMENT);
    let expected: Vec<String> = paragraphs
        .iter()
        .flat_map(|p| p.sentences.clone())
        .collect();

    let controller = make_session(common::SAMPLE_DOCUMENT, backend.clone(), repository.clone(), 0);

    controller.play().await?;
    common::wait_for_state(&controller, PlaybackState::Completed, 5_000).await;

    assert_eq!(backend.spoken_texts(), expected);
    Ok(())
}

/// Test that failed sentences are skipped without ending the session
#[tokio::test]
async fn test_session_withIntermittentFailures_shouldSkipFailedSentencesAndComplete() -> Result<()> {
    // Every second utterance fails
    let text = "One. Two. Three. Four.";
    let backend = MockBackend::intermittent(2);
    let repository = common::create_test_repository()?;
    common::seed_document(&repository, DOC_ID, text).await?;
    let controller = make_session(text, backend.clone(), repository.clone(), 0);

    controller.play().await?;
    common::wait_for_state(&controller, PlaybackState::Completed, 5_000).await;

    assert_eq!(backend.spoken_texts(), vec!["One.", "Three."]);
    assert_eq!(backend.speak_count(), 4);
    assert_eq!(repository.load_position(DOC_ID).await?, None);
    Ok(())
}

/// Test that crossing a paragraph boundary persists the new position
#[tokio::test]
async fn test_session_withParagraphBoundaries_shouldPersistPositionDuringPlayback() -> Result<()> {
    let text = "Alpha paragraph here.\n\nBeta paragraph here.";
    let backend = MockBackend::working();
    let repository = common::create_test_repository()?;
    common::seed_document(&repository, DOC_ID, text).await?;
    let controller = make_session(text, backend.clone(), repository.clone(), 400);

    controller.play().await?;
    wait_for_spoken_count(&backend, 1, 2_000).await;

    // The first paragraph is done, so its successor is already saved
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(repository.load_position(DOC_ID).await?, Some(1));

    common::wait_for_state(&controller, PlaybackState::Completed, 5_000).await;
    assert_eq!(repository.load_position(DOC_ID).await?, None);
    Ok(())
}

/// Test that stop mid-session clears the position and halts speech
#[tokio::test]
async fn test_session_withStopMidway_shouldClearPositionAndHalt() -> Result<()> {
    let text = "Alpha paragraph here.\n\nBeta paragraph here.\n\nGamma paragraph here.";
    let backend = MockBackend::working();
    let repository = common::create_test_repository()?;
    common::seed_document(&repository, DOC_ID, text).await?;
    let controller = make_session(text, backend.clone(), repository.clone(), 400);

    controller.play().await?;
    wait_for_spoken_count(&backend, 1, 2_000).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.stop().await?;

    assert_eq!(controller.snapshot().state, PlaybackState::Idle);
    assert_eq!(repository.load_position(DOC_ID).await?, None);

    // The drive task notices the stop at its next wakeup and speaks no more
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.spoken_texts().len(), 1);
    Ok(())
}
