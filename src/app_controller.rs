use anyhow::{anyhow, Result};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app_config::Config;
use crate::attachments;
use crate::backends::{self, SpeechBackend};
use crate::database::connection::DatabaseConnection;
use crate::database::models::DocumentRecord;
use crate::database::Repository;
use crate::file_utils::FileManager;
use crate::ingest::{IngestOutcome, IngestService};
use crate::language_utils;
use crate::narration::{NarrationController, NarrationOptions, PlaybackState};
use crate::text_segmenter;
use crate::voice;

// @module: Application controller for the document library and narration sessions

/// Main application controller wiring storage, ingestion and narration
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Document and position storage
    repository: Repository,
}

impl Controller {
    /// Create a new controller for test purposes with an in-memory library
    pub fn new_for_test() -> Result<Self> {
        let repository = Repository::new_in_memory()?;
        Ok(Self {
            config: Config::default(),
            repository,
        })
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let repository = match &config.database_path {
            Some(path) => Repository::new(DatabaseConnection::new(path)?),
            None => Repository::new_default()?,
        };

        Ok(Self { config, repository })
    }

    /// Storage handle used by the services this controller builds
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Ingest documents into the library, expanding directory arguments
    pub async fn add_documents(&self, paths: Vec<PathBuf>, language: Option<String>) -> Result<()> {
        // Start timing the process
        let start_time = std::time::Instant::now();

        // Expand directories into the document files they contain
        let mut files: Vec<PathBuf> = Vec::new();
        for path in paths {
            if path.is_dir() {
                let mut found = FileManager::find_documents(&path)?;
                if found.is_empty() {
                    warn!("No documents found in directory: {:?}", path);
                }
                files.append(&mut found);
            } else {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(anyhow!("No documents to add"));
        }

        // Create a progress bar for batch ingestion
        let progress_bar = ProgressBar::new(files.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Adding documents");

        // The command-line language wins over the configured one
        let language = language.or_else(|| self.config.language.clone());
        if let Some(code) = &language {
            language_utils::validate_language_code(code)?;
        }
        let service = IngestService::new(self.repository.clone()).with_language_override(language);

        // Clone the progress_bar for use in the callback
        let pb = progress_bar.clone();
        let results = service
            .ingest_batch(&files, move |completed, _total| {
                pb.set_position(completed as u64);
            })
            .await;
        progress_bar.finish_and_clear();

        // Track success, duplicate and failure counts
        let mut added_count = 0;
        let mut duplicate_count = 0;
        let mut error_count = 0;

        for (path, result) in &results {
            match result {
                Ok(IngestOutcome::Added(document)) => {
                    added_count += 1;
                    info!("Added: {} -> {}", path.display(), document.id);
                },
                Ok(IngestOutcome::Duplicate(existing)) => {
                    duplicate_count += 1;
                    warn!(
                        "Duplicate: {} matches '{}' ({})",
                        path.display(),
                        existing.name,
                        existing.id
                    );
                },
                Err(e) => {
                    error_count += 1;
                    error!("Error adding {}: {}", path.display(), e);
                },
            }
        }

        info!(
            "Ingestion completed: {} added, {} duplicates, {} errors in {}",
            added_count,
            duplicate_count,
            error_count,
            Self::format_duration(start_time.elapsed())
        );

        if added_count == 0 && duplicate_count == 0 && error_count > 0 {
            return Err(anyhow!("Failed to add any documents"));
        }

        Ok(())
    }

    /// List all documents in the library
    pub async fn list_documents(&self) -> Result<()> {
        let documents = self.repository.list_documents().await?;

        if documents.is_empty() {
            info!("The library is empty, add documents with: lectern add <files>");
            return Ok(());
        }

        info!("Library: {} document(s)", documents.len());
        for document in &documents {
            let position_note = match self.repository.load_position(&document.id).await? {
                Some(paragraph_index) => format!(" [at paragraph {}]", paragraph_index + 1),
                None => String::new(),
            };

            info!(
                "{} - {} ({}, {}, {} characters){}",
                document.id,
                document.name,
                document.kind.display_name(),
                document.language,
                document.char_count(),
                position_note
            );
        }

        Ok(())
    }

    /// Show one document in detail
    pub async fn show_document(&self, document_id: &str) -> Result<()> {
        let document = self.require_document(document_id).await?;

        let paragraphs = text_segmenter::segment(&document.content);
        let word_count: usize = paragraphs.iter().map(|p| p.word_count).sum();
        let language_name = language_utils::get_language_name(&document.language)
            .unwrap_or_else(|_| "unknown".to_string());

        info!("Document: {}", document.name);
        info!("  Id:        {}", document.id);
        info!("  Kind:      {}", document.kind.display_name());
        info!("  Language:  {} ({})", document.language, language_name);
        info!("  Size:      {} bytes on disk, {} characters", document.size_bytes, document.char_count());
        info!("  Structure: {} paragraphs, {} words", paragraphs.len(), word_count);
        info!("  Added:     {}", document.created_at);
        info!("  Preview:   {}", document.preview(120));

        if let Some(paragraph_index) = self.repository.load_position(&document.id).await? {
            info!("  Position:  paragraph {} of {}", paragraph_index + 1, paragraphs.len());
        }

        for attachment in &self.repository.list_attachments(&document.id).await? {
            info!(
                "  Attached:  {} (~{} tokens, ~${:.4} per request)",
                attachment.model, attachment.token_estimate, attachment.cost_estimate
            );
        }

        Ok(())
    }

    /// Remove a document and everything that hangs off it
    pub async fn remove_document(&self, document_id: &str, assume_yes: bool) -> Result<()> {
        let document = self.require_document(document_id).await?;

        if !assume_yes {
            let prompt = format!("Remove '{}' ({})?", document.name, document.id);
            if !Self::confirm(&prompt)? {
                info!("Removal cancelled");
                return Ok(());
            }
        }

        // Reading position and attachments go with the document row
        let deleted = self.repository.delete_document(&document.id).await?;
        if deleted {
            info!("Removed '{}' ({})", document.name, document.id);
        } else {
            warn!("Document {} was already gone", document.id);
        }

        Ok(())
    }

    /// List the voices the configured backend advertises
    pub async fn list_voices(&self, language: Option<String>) -> Result<()> {
        let backend = backends::from_settings(&self.config.backend)?;
        let voices = backend.list_voices(language.as_deref()).await?;

        if voices.is_empty() {
            match &language {
                Some(language) => warn!("No voices available for language {}", language),
                None => warn!("No voices available"),
            }
            return Ok(());
        }

        // Mark the saved per-language preference, when one exists
        let preferred = match &language {
            Some(language) => self.repository.load_voice_preference(language).await?,
            None => None,
        };

        info!("{} voice(s) available:", voices.len());
        for voice in &voices {
            let marker = if preferred.as_deref() == Some(voice.id.as_str()) {
                " (preferred)"
            } else {
                ""
            };
            info!("  {}{}", voice, marker);
        }

        Ok(())
    }

    /// Attach a document to an AI chat context with token and cost estimates
    pub async fn attach_document(&self, document_id: &str, model: Option<String>) -> Result<()> {
        let document = self.require_document(document_id).await?;
        let model = model.unwrap_or_else(|| attachments::DEFAULT_MODEL.to_string());

        let attachment = attachments::build_attachment(&document, &model)?;
        self.repository.upsert_attachment(&attachment).await?;

        info!(
            "Attached '{}' to {}: ~{} tokens, ~${:.4} per request",
            document.name, attachment.model, attachment.token_estimate, attachment.cost_estimate
        );

        Ok(())
    }

    /// Detach a document from one model's context, or from all of them
    pub async fn detach_document(&self, document_id: &str, model: Option<String>) -> Result<()> {
        let document = self.require_document(document_id).await?;

        let removed = self
            .repository
            .delete_attachments(&document.id, model.as_deref())
            .await?;

        if removed == 0 {
            warn!("'{}' had no matching attachments", document.name);
        } else {
            info!("Detached '{}' from {} context(s)", document.name, removed);
        }

        Ok(())
    }

    /// Run an interactive narration session for a document
    pub async fn read_document(
        &self,
        document_id: &str,
        voice: Option<String>,
        from_start: bool,
    ) -> Result<()> {
        let document = self.require_document(document_id).await?;

        let paragraphs = text_segmenter::segment(&document.content);
        if paragraphs.is_empty() {
            return Err(anyhow!("Document '{}' has no narratable text", document.name));
        }

        if from_start {
            self.repository.clear_position(&document.id).await?;
        }

        let backend = backends::from_settings(&self.config.backend)?;
        let voice_id = self
            .resolve_session_voice(backend.as_ref(), &document.language, voice)
            .await?;

        let options = NarrationOptions {
            sentence_gap_ms: self.config.narration.sentence_gap_ms,
            rate: self.config.narration.speech_rate,
            voice_id,
        };

        let controller = NarrationController::new(
            document.id.clone(),
            document.language.clone(),
            paragraphs,
            backend,
            self.repository.clone(),
            options,
        );

        info!(
            "Reading '{}' ({} paragraphs). Keys: p pause, r resume, n next, b back, s stop, q quit",
            document.name,
            controller.paragraphs().len()
        );

        controller.play().await?;
        self.run_session_loop(&controller).await?;

        let snapshot = controller.snapshot();
        match snapshot.state {
            PlaybackState::Completed => info!("Finished '{}'", document.name),
            PlaybackState::Paused => {
                info!("Resume later with: lectern read {}", controller.document_id());
            },
            _ => {},
        }

        Ok(())
    }

    /// Drive one narration session: render progress and map keys to
    /// controller calls until the session ends
    async fn run_session_loop(&self, controller: &NarrationController) -> Result<()> {
        // Progress bar showing the paragraph cursor
        let progress_bar = ProgressBar::new(controller.paragraphs().len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} paragraphs {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut ticker = tokio::time::interval(Duration::from_millis(200));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = controller.snapshot();
                    progress_bar.set_position(snapshot.paragraph_index as u64);
                    progress_bar.set_message(snapshot.progress_label());

                    if snapshot.state == PlaybackState::Completed {
                        progress_bar.finish_with_message(snapshot.progress_label());
                        break;
                    }
                },
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        // stdin closed: leave like a quit, keeping the position
                        controller.pause().await?;
                        progress_bar.finish_and_clear();
                        break;
                    };

                    match line.trim() {
                        "p" => controller.pause().await?,
                        "r" => controller.resume().await?,
                        "n" => controller.skip(1).await?,
                        "b" => controller.skip(-1).await?,
                        "s" => {
                            controller.stop().await?;
                            progress_bar.finish_and_clear();
                            info!("Stopped, position cleared");
                            break;
                        },
                        "q" => {
                            // Quit keeps the position, like a pause
                            controller.pause().await?;
                            progress_bar.finish_and_clear();
                            break;
                        },
                        "" => {},
                        other => warn!("Unknown key: {} (p pause, r resume, n next, b back, s stop, q quit)", other),
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    // Persist the position as a pause before leaving
                    controller.pause().await?;
                    progress_bar.finish_and_clear();
                    info!("Interrupted, position saved");
                    break;
                },
            }
        }

        Ok(())
    }

    /// Resolve the voice for a session.
    ///
    /// An explicit request wins and becomes the saved preference for the
    /// language; otherwise the saved preference, then the first voice
    /// matching the language, then the backend default.
    async fn resolve_session_voice(
        &self,
        backend: &dyn SpeechBackend,
        language: &str,
        requested: Option<String>,
    ) -> Result<Option<String>> {
        // Enumeration failing must not prevent narration with the
        // backend default voice
        let voices = match backend.list_voices(None).await {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Voice enumeration failed, using the backend default: {}", e);
                Vec::new()
            },
        };

        if let Some(requested) = requested {
            let known = voices.iter().any(|v| v.id == requested);
            if !known && !voices.is_empty() {
                warn!("Voice '{}' is not advertised by the backend, trying it anyway", requested);
            }

            self.repository.save_voice_preference(language, &requested).await?;
            return Ok(Some(requested));
        }

        let preferred = self.repository.load_voice_preference(language).await?;
        Ok(voice::resolve_voice(&voices, language, preferred.as_deref()).map(|v| v.id.clone()))
    }

    /// Look up a document by exact id, falling back to a unique id prefix
    /// so users can type the short form shown by `list`
    async fn require_document(&self, document_id: &str) -> Result<DocumentRecord> {
        if let Some(document) = self.repository.get_document(document_id).await? {
            return Ok(document);
        }

        let mut matches: Vec<DocumentRecord> = self
            .repository
            .list_documents()
            .await?
            .into_iter()
            .filter(|d| d.id.starts_with(document_id))
            .collect();

        match matches.len() {
            0 => Err(anyhow!("No document with id {}", document_id)),
            1 => Ok(matches.swap_remove(0)),
            n => Err(anyhow!("Id prefix {} is ambiguous, it matches {} documents", document_id, n)),
        }
    }

    /// Ask a yes/no question on the terminal, defaulting to no
    fn confirm(prompt: &str) -> Result<bool> {
        use std::io::Write;

        print!("{} [y/N] ", prompt);
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;

        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
