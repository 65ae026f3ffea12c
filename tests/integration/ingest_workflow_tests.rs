/*!
 * Integration tests for the document ingestion workflow.
 *
 * These tests run the full pipeline from a file on disk to a stored
 * library document, using plain text files and an in-memory repository.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use anyhow::Result;
use lectern::database::Repository;
use lectern::errors::{AppError, ExtractionError, ValidationError};
use lectern::file_utils::{DocumentKind, DOCX_SIZE_LIMIT, OVERALL_SIZE_LIMIT};
use lectern::ingest::{IngestOutcome, IngestService, MIN_DOCUMENT_CHARS};
use crate::common;

/// A second long document, distinct from the shared sample text
const OTHER_DOCUMENT: &str = "The valley market opened before dawn each Saturday. \
Farmers arranged their stalls by lantern light and argued gently about prices. \
By the time the sun cleared the ridge, the square was full of voices.";

/// Test ingesting a plain text file end to end
#[tokio::test]
async fn test_ingest_withTextFile_shouldStoreDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_document(&temp_dir.path().to_path_buf(), "lighthouse.txt")?;
    let repository = common::create_test_repository()?;
    let service = IngestService::new(repository.clone());

    let outcome = service.ingest_file(&path).await?;

    let document = match outcome {
        IngestOutcome::Added(document) => document,
        other => panic!("Expected Added, got {:?}", other),
    };
    assert_eq!(document.name, "lighthouse.txt");
    assert_eq!(document.kind, DocumentKind::Txt);
    assert_eq!(document.language, "en");
    assert_eq!(document.content, common::SAMPLE_DOCUMENT);
    assert_eq!(document.content_hash, Repository::hash_text(common::SAMPLE_DOCUMENT));

    // The document is retrievable from the library
    let stored = repository.get_document(&document.id).await?;
    assert!(stored.is_some());
    Ok(())
}

/// Test that identical text is reported as a duplicate, not stored twice
#[tokio::test]
async fn test_ingest_withIdenticalText_shouldReportDuplicate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let first_path = common::create_test_document(&dir, "original.txt")?;
    let second_path = common::create_test_document(&dir, "copy.txt")?;
    let repository = common::create_test_repository()?;
    let service = IngestService::new(repository.clone());

    let first = service.ingest_file(&first_path).await?;
    let second = service.ingest_file(&second_path).await?;

    let original_id = first.document().id.clone();
    match second {
        IngestOutcome::Duplicate(existing) => assert_eq!(existing.id, original_id),
        other => panic!("Expected Duplicate, got {:?}", other),
    }
    assert_eq!(repository.list_documents().await?.len(), 1);
    Ok(())
}

/// Test that documents below the ingestion minimum are rejected
#[tokio::test]
async fn test_ingest_withShortText_shouldRejectBelowMinimum() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "Fifty characters is not enough for the library.";
    let path = common::create_test_file(&temp_dir.path().to_path_buf(), "short.txt", content)?;
    let service = IngestService::new(common::create_test_repository()?);

    let result = service.ingest_file(&path).await;

    match result {
        Err(AppError::Validation(ValidationError::TooShort { length, minimum })) => {
            assert_eq!(length, content.chars().count());
            assert_eq!(minimum, MIN_DOCUMENT_CHARS);
        },
        other => panic!("Expected TooShort, got {:?}", other),
    }
    Ok(())
}

/// Test rejection of unsupported extensions and missing files
#[tokio::test]
async fn test_ingest_withBadInputs_shouldRejectBeforeExtraction() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let service = IngestService::new(common::create_test_repository()?);

    let markdown = common::create_test_file(&temp_dir.path().to_path_buf(), "notes.md", "# Notes")?;
    let result = service.ingest_file(&markdown).await;
    assert!(matches!(
        result,
        Err(AppError::Extraction(ExtractionError::UnsupportedType(_)))
    ));

    let missing = temp_dir.path().join("absent.txt");
    let result = service.ingest_file(&missing).await;
    assert!(matches!(result, Err(AppError::File(_))));
    Ok(())
}

/// Test that size ceilings are enforced before extraction
#[tokio::test]
async fn test_ingest_withOversizeFiles_shouldRejectWithCeiling() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let service = IngestService::new(common::create_test_repository()?);

    // One byte over the DOCX ceiling
    let docx_content = "x".repeat(DOCX_SIZE_LIMIT as usize + 1);
    let docx_path = common::create_test_file(&dir, "big.docx", &docx_content)?;
    let result = service.ingest_file(&docx_path).await;
    match result {
        Err(AppError::Extraction(ExtractionError::Oversize { size, limit })) => {
            assert_eq!(size, DOCX_SIZE_LIMIT + 1);
            assert_eq!(limit, DOCX_SIZE_LIMIT);
        },
        other => panic!("Expected Oversize, got {:?}", other),
    }

    // One byte over the overall ceiling
    let txt_content = "x".repeat(OVERALL_SIZE_LIMIT as usize + 1);
    let txt_path = common::create_test_file(&dir, "big.txt", &txt_content)?;
    let result = service.ingest_file(&txt_path).await;
    match result {
        Err(AppError::Extraction(ExtractionError::Oversize { limit, .. })) => {
            assert_eq!(limit, OVERALL_SIZE_LIMIT);
        },
        other => panic!("Expected Oversize, got {:?}", other),
    }
    Ok(())
}

/// Test that the language override replaces detection
#[tokio::test]
async fn test_ingest_withLanguageOverride_shouldTagDocuments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_document(&temp_dir.path().to_path_buf(), "lighthouse.txt")?;
    let service = IngestService::new(common::create_test_repository()?)
        .with_language_override(Some("de".to_string()));

    let outcome = service.ingest_file(&path).await?;

    // English text, but the override wins
    assert_eq!(outcome.document().language, "de");
    Ok(())
}

/// Test that without an override each document gets its detected language
#[tokio::test]
async fn test_ingest_withoutOverride_shouldDetectPerDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let german = "Der alte Turm steht auf dem Huegel und ist von weitem zu sehen. \
        Die Leute aus dem Dorf gehen mit den Kindern auf den Markt, \
        und das Wetter ist nicht schlecht.";

    let english_path = common::create_test_document(&dir, "english.txt")?;
    let german_path = common::create_test_file(&dir, "german.txt", german)?;
    let service = IngestService::new(common::create_test_repository()?);

    let english = service.ingest_file(&english_path).await?;
    let german = service.ingest_file(&german_path).await?;

    assert_eq!(english.document().language, "en");
    assert_eq!(german.document().language, "de");
    Ok(())
}

/// Test that one bad file does not abort a batch
#[tokio::test]
async fn test_ingest_batch_withOneBadFile_shouldContinueOthers() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let paths = vec![
        common::create_test_document(&dir, "first.txt")?,
        common::create_test_file(&dir, "broken.txt", "too short")?,
        common::create_test_file(&dir, "second.txt", OTHER_DOCUMENT)?,
    ];
    let repository = common::create_test_repository()?;
    let service = IngestService::new(repository.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_callback = Arc::clone(&calls);
    let results = service
        .ingest_batch(&paths, move |_completed, total| {
            assert_eq!(total, 3);
            calls_in_callback.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    // Results come back in input order
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, paths[0]);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    assert!(results[2].1.is_ok());

    // The callback fired once per file and the good files were stored
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(repository.list_documents().await?.len(), 2);
    Ok(())
}

/// Test that an empty batch completes without work
#[tokio::test]
async fn test_ingest_batch_withNoFiles_shouldReturnEmptyResults() -> Result<()> {
    let service = IngestService::new(common::create_test_repository()?);

    let results = service.ingest_batch(&[], |_, _| {}).await;

    assert!(results.is_empty());
    Ok(())
}
