/*!
 * Integration tests for persistence across application runs.
 *
 * These tests open a real database file in a temporary directory,
 * write through one connection, then reopen the file with a fresh
 * connection the way a new process invocation would.
 */

use std::path::Path;
use std::sync::Arc;
use anyhow::Result;
use lectern::backends::mock::MockBackend;
use lectern::database::models::{AttachmentRecord, DocumentRecord};
use lectern::database::{DatabaseConnection, Repository};
use lectern::file_utils::DocumentKind;
use lectern::ingest::{IngestOutcome, IngestService};
use lectern::narration::{NarrationController, NarrationOptions, PlaybackState};
use lectern::text_segmenter::segment;
use crate::common;

fn open_repository(db_path: &Path) -> Result<Repository> {
    Ok(Repository::new(DatabaseConnection::new(db_path)?))
}

fn sample_document(id: &str, content: &str) -> DocumentRecord {
    DocumentRecord::new(
        id.to_string(),
        "sample.txt".to_string(),
        DocumentKind::Txt,
        content.to_string(),
        Repository::hash_text(content),
        "en".to_string(),
        content.len() as i64,
    )
}

/// Test that all record types survive closing and reopening the database
#[tokio::test]
async fn test_persistence_withReopenedDatabase_shouldSeeSameLibrary() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("library.db");

    // First run writes one of everything
    {
        let repository = open_repository(&db_path)?;
        repository
            .create_document(&sample_document("doc-1", common::SAMPLE_DOCUMENT))
            .await?;
        repository.save_position("doc-1", 2).await?;
        repository.save_voice_preference("en", "amy").await?;
        repository
            .upsert_attachment(&AttachmentRecord::new(
                "doc-1".to_string(),
                "claude-sonnet".to_string(),
                100,
                0.0003,
            ))
            .await?;
    }

    // Second run sees it all through a fresh connection
    let repository = open_repository(&db_path)?;

    let document = repository.get_document("doc-1").await?;
    assert_eq!(document.map(|d| d.content), Some(common::SAMPLE_DOCUMENT.to_string()));
    assert_eq!(repository.load_position("doc-1").await?, Some(2));
    assert_eq!(
        repository.load_voice_preference("en").await?,
        Some("amy".to_string())
    );
    assert_eq!(repository.list_attachments("doc-1").await?.len(), 1);
    Ok(())
}

/// Test that duplicate detection spans application runs
#[tokio::test]
async fn test_persistence_withIngestAcrossRuns_shouldDetectEarlierDuplicate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let db_path = temp_dir.path().join("library.db");
    let first_path = common::create_test_document(&dir, "first_run.txt")?;
    let second_path = common::create_test_document(&dir, "second_run.txt")?;

    let first_id = {
        let service = IngestService::new(open_repository(&db_path)?);
        service.ingest_file(&first_path).await?.document().id.clone()
    };

    let service = IngestService::new(open_repository(&db_path)?);
    let outcome = service.ingest_file(&second_path).await?;

    match outcome {
        IngestOutcome::Duplicate(existing) => assert_eq!(existing.id, first_id),
        other => panic!("Expected Duplicate, got {:?}", other),
    }
    Ok(())
}

/// Test that a narration session resumes from a position saved in an earlier run
#[tokio::test]
async fn test_persistence_withNarrationAcrossRuns_shouldResumeFromSavedParagraph() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("library.db");
    let paragraphs = segment(common::SAMPLE_DOCUMENT);
    assert!(paragraphs.len() >= 3);

    // First run: start reading, then skip ahead while paused and quit
    {
        let repository = open_repository(&db_path)?;
        repository
            .create_document(&sample_document("doc-resume", common::SAMPLE_DOCUMENT))
            .await?;

        let controller = NarrationController::new(
            "doc-resume".to_string(),
            "en".to_string(),
            paragraphs.clone(),
            Arc::new(MockBackend::slow(5_000)),
            repository.clone(),
            NarrationOptions::default(),
        );
        controller.play().await?;
        controller.pause().await?;
        controller.skip(1).await?;

        assert_eq!(repository.load_position("doc-resume").await?, Some(1));
    }

    // Second run: a fresh controller picks up at the saved paragraph
    let repository = open_repository(&db_path)?;
    let backend = MockBackend::working();
    let controller = NarrationController::new(
        "doc-resume".to_string(),
        "en".to_string(),
        paragraphs.clone(),
        Arc::new(backend.clone()),
        repository.clone(),
        NarrationOptions {
            sentence_gap_ms: 0,
            rate: 1.0,
            voice_id: None,
        },
    );

    controller.play().await?;
    common::wait_for_state(&controller, PlaybackState::Completed, 5_000).await;

    let expected: Vec<String> = paragraphs[1..]
        .iter()
        .flat_map(|p| p.sentences.clone())
        .collect();
    assert_eq!(backend.spoken_texts(), expected);
    assert_eq!(repository.load_position("doc-resume").await?, None);
    Ok(())
}

/// Test that cascade deletion holds on a reopened connection
#[tokio::test]
async fn test_persistence_withDeleteAfterReopen_shouldCascadeRelatedRows() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("library.db");

    {
        let repository = open_repository(&db_path)?;
        repository
            .create_document(&sample_document("doc-gone", common::SAMPLE_DOCUMENT))
            .await?;
        repository.save_position("doc-gone", 1).await?;
        repository
            .upsert_attachment(&AttachmentRecord::new(
                "doc-gone".to_string(),
                "claude-haiku".to_string(),
                50,
                0.00004,
            ))
            .await?;
    }

    // Foreign keys are re-enabled on the new connection, so the
    // cascade still removes the dependent rows
    let repository = open_repository(&db_path)?;
    assert!(repository.delete_document("doc-gone").await?);

    assert!(repository.get_document("doc-gone").await?.is_none());
    assert_eq!(repository.load_position("doc-gone").await?, None);
    assert!(repository.list_attachments("doc-gone").await?.is_empty());
    Ok(())
}

/// Test database statistics against a file-backed library
#[tokio::test]
async fn test_persistence_withStats_shouldCountRowsAndFileSize() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("library.db");
    let repository = open_repository(&db_path)?;

    repository
        .create_document(&sample_document("doc-stats", common::SAMPLE_DOCUMENT))
        .await?;
    repository.save_position("doc-stats", 1).await?;
    repository.save_voice_preference("en", "amy").await?;

    let stats = repository.connection().stats()?;

    assert_eq!(stats.document_count, 1);
    assert_eq!(stats.position_count, 1);
    assert_eq!(stats.preference_count, 1);
    assert_eq!(stats.attachment_count, 0);
    assert!(stats.file_size_bytes > 0);

    let rendered = stats.to_string();
    assert!(rendered.starts_with("Documents: 1, Positions: 1"));
    Ok(())
}
