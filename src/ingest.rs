/*!
 * Document ingestion pipeline.
 *
 * Takes a file from disk to a library document: classify the kind by
 * extension, enforce size ceilings, extract the text through the kind's
 * extractor, validate it, detect the language, and store the result.
 * Identical text is detected by content hash and skipped rather than
 * stored twice.
 */

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, info};
use uuid::Uuid;

use crate::database::models::DocumentRecord;
use crate::database::Repository;
use crate::errors::{AppError, ExtractionError, StorageError, ValidationError};
use crate::extraction::{extractor_for, validate_extracted_text};
use crate::file_utils::{DocumentKind, FileManager, OVERALL_SIZE_LIMIT};
use crate::language_utils::detect_language;

/// Documents with fewer characters than this are rejected at ingestion
pub const MIN_DOCUMENT_CHARS: usize = 100;

/// Number of files extracted concurrently during batch ingestion
const BATCH_CONCURRENCY: usize = 4;

/// Outcome of ingesting a single file
#[derive(Debug)]
pub enum IngestOutcome {
    /// Stored as a new library document
    Added(DocumentRecord),
    /// Identical text was already in the library, nothing was stored
    Duplicate(DocumentRecord),
}

impl IngestOutcome {
    /// The library document this outcome refers to
    pub fn document(&self) -> &DocumentRecord {
        match self {
            IngestOutcome::Added(document) => document,
            IngestOutcome::Duplicate(document) => document,
        }
    }
}

/// Document ingestion service
#[derive(Clone)]
pub struct IngestService {
    /// Library storage
    repository: Repository,
    /// When set, skip detection and tag every document with this language
    language_override: Option<String>,
}

impl IngestService {
    /// Create an ingestion service backed by the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            language_override: None,
        }
    }

    /// Tag ingested documents with a fixed language instead of detecting one
    pub fn with_language_override(mut self, language: Option<String>) -> Self {
        self.language_override = language;
        self
    }

    /// Ingest a single file into the library
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestOutcome, AppError> {
        let kind = DocumentKind::from_path(path).ok_or_else(|| {
            ExtractionError::UnsupportedType(
                path.extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string()),
            )
        })?;

        if !FileManager::file_exists(path) {
            return Err(AppError::File(format!("File not found: {}", path.display())));
        }

        // Size ceilings apply before any extraction work
        let size = FileManager::file_size(path)?;
        if size > OVERALL_SIZE_LIMIT {
            return Err(ExtractionError::Oversize {
                size,
                limit: OVERALL_SIZE_LIMIT,
            }
            .into());
        }
        if size > kind.size_limit() {
            return Err(ExtractionError::Oversize {
                size,
                limit: kind.size_limit(),
            }
            .into());
        }

        debug!(
            "Extracting {} ({} bytes) as {}",
            path.display(),
            size,
            kind.display_name()
        );

        let extractor = extractor_for(kind);
        let text = extractor.extract(path).await?;

        validate_extracted_text(&text)?;

        let char_count = text.chars().count();
        if char_count < MIN_DOCUMENT_CHARS {
            return Err(ValidationError::TooShort {
                length: char_count,
                minimum: MIN_DOCUMENT_CHARS,
            }
            .into());
        }

        // Duplicate detection by hash of the extracted text, not the file bytes,
        // so the same text reached through different formats still matches
        let content_hash = Repository::hash_text(&text);
        if let Some(existing) = self
            .repository
            .find_document_by_hash(&content_hash)
            .await
            .map_err(storage_err)?
        {
            info!(
                "Skipping {}: identical text already stored as '{}' ({})",
                path.display(),
                existing.name,
                existing.id
            );
            return Ok(IngestOutcome::Duplicate(existing));
        }

        let language = self
            .language_override
            .clone()
            .unwrap_or_else(|| detect_language(&text));

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let document = DocumentRecord::new(
            Uuid::new_v4().to_string(),
            name,
            kind,
            text,
            content_hash.clone(),
            language,
            size as i64,
        );

        if let Err(e) = self.repository.create_document(&document).await {
            // A concurrent batch ingest may have stored the same text first
            if let Some(existing) = self
                .repository
                .find_document_by_hash(&content_hash)
                .await
                .map_err(storage_err)?
            {
                return Ok(IngestOutcome::Duplicate(existing));
            }
            return Err(storage_err(e));
        }

        info!(
            "Added '{}' ({}, {} characters, language {})",
            document.name,
            document.id,
            document.char_count(),
            document.language
        );

        Ok(IngestOutcome::Added(document))
    }

    /// Ingest several files, extracting up to a few of them concurrently
    ///
    /// Per-file failures do not abort the batch. Results come back in the
    /// order the paths were given. The progress callback receives
    /// (completed, total) after each file finishes.
    pub async fn ingest_batch(
        &self,
        paths: &[PathBuf],
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Vec<(PathBuf, Result<IngestOutcome, AppError>)> {
        let total_files = paths.len();
        let processed_files = Arc::new(AtomicUsize::new(0));

        let results = stream::iter(paths.iter().cloned().enumerate())
            .map(|(index, path)| {
                let service = self.clone();
                let processed_files = processed_files.clone();
                let progress_callback = progress_callback.clone();

                async move {
                    let result = service.ingest_file(&path).await;

                    // Update progress
                    let current = processed_files.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total_files);

                    (index, path, result)
                }
            })
            .buffer_unordered(BATCH_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        // Restore input order for reporting
        let mut sorted_results = results;
        sorted_results.sort_by_key(|(index, _, _)| *index);

        sorted_results
            .into_iter()
            .map(|(_, path, result)| (path, result))
            .collect()
    }
}

fn storage_err(error: anyhow::Error) -> AppError {
    AppError::Storage(StorageError::OperationFailed(error.to_string()))
}
