/*!
 * Text extraction from document files.
 *
 * Binary formats are never parsed here: PDF and DOCX extraction is
 * delegated to external tools (pdftotext and pandoc) invoked as
 * subprocesses and treated as opaque text services. Plain text files
 * are read directly. Every extractor yields raw text that still has
 * to pass validation before a document is created.
 */

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;

use crate::errors::{ExtractionError, ValidationError};
use crate::file_utils::DocumentKind;

/// Minimum characters an extractor must produce for a document to be readable
pub const MIN_EXTRACTED_CHARS: usize = 10;

/// Ceiling on extracted text length
pub const MAX_EXTRACTED_CHARS: usize = 100_000;

/// External tool timeout
const EXTRACTION_TIMEOUT_SECS: u64 = 60;

/// Extracts plain text from one kind of document file
#[async_trait]
pub trait TextExtractor: Send + Sync + std::fmt::Debug {
    /// Document kind this extractor handles
    fn kind(&self) -> DocumentKind;

    /// Extract the document's text content
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Build the extractor matching a document kind
pub fn extractor_for(kind: DocumentKind) -> Box<dyn TextExtractor> {
    match kind {
        DocumentKind::Txt => Box::new(TxtExtractor::new()),
        DocumentKind::Pdf => Box::new(PdfExtractor::new()),
        DocumentKind::Docx => Box::new(DocxExtractor::new()),
    }
}

/// Validate extracted text against the extractor-level bounds.
///
/// The ingestion layer applies its own stricter minimum on top of
/// this; the ceiling is shared.
pub fn validate_extracted_text(text: &str) -> Result<(), ValidationError> {
    let length = text.chars().count();

    if length == 0 {
        return Err(ValidationError::Empty);
    }
    if length < MIN_EXTRACTED_CHARS {
        return Err(ValidationError::TooShort {
            length,
            minimum: MIN_EXTRACTED_CHARS,
        });
    }
    if length > MAX_EXTRACTED_CHARS {
        return Err(ValidationError::TooLong {
            length,
            maximum: MAX_EXTRACTED_CHARS,
        });
    }

    Ok(())
}

/// Run an external extraction tool with a timeout, mapping spawn
/// failures to `ToolUnavailable` so a missing tool surfaces as a
/// specific, actionable error.
async fn run_extraction_tool(
    program: &str,
    args: Vec<OsString>,
) -> Result<std::process::Output, ExtractionError> {
    debug!("Running extraction tool: {} {:?}", program, args);

    let tool_future = Command::new(program).args(&args).output();

    let timeout = Duration::from_secs(EXTRACTION_TIMEOUT_SECS);
    let output = tokio::select! {
        result = tool_future => {
            result.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExtractionError::ToolUnavailable(
                    format!("{} is not installed or not on PATH", program),
                ),
                _ => ExtractionError::ToolUnavailable(
                    format!("failed to run {}: {}", program, e),
                ),
            })?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(ExtractionError::Timeout(EXTRACTION_TIMEOUT_SECS));
        }
    };

    Ok(output)
}

/// Drop known-noisy warning lines from tool stderr, keeping what matters
fn filter_tool_stderr(stderr: &str) -> String {
    let filtered: Vec<&str> = stderr
        .lines()
        .filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with("Syntax Warning") && !line.starts_with("[WARNING]")
        })
        .collect();

    if filtered.is_empty() {
        "tool reported no details".to_string()
    } else {
        filtered.join("; ")
    }
}

/// Plain text files are read directly, no external tool involved
#[derive(Debug, Default)]
pub struct TxtExtractor;

impl TxtExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for TxtExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Txt
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractionError::CorruptContent(format!("{:?}: {}", path, e)))?;

        // Tolerate stray non-UTF-8 bytes rather than failing the whole file
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// PDF extraction via the poppler pdftotext tool
#[derive(Debug)]
pub struct PdfExtractor {
    command: String,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            command: "pdftotext".to_string(),
        }
    }

    /// Override the tool command, used by tests to point at a stub
    pub fn with_command<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        // "-" sends the text to stdout instead of a sidecar file
        let args: Vec<OsString> = vec![
            OsString::from("-enc"),
            OsString::from("UTF-8"),
            path.as_os_str().to_os_string(),
            OsString::from("-"),
        ];

        let output = run_extraction_tool(&self.command, args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_tool_stderr(&stderr);
            error!("PDF extraction failed for {:?}: {}", path, filtered);
            return Err(ExtractionError::CorruptContent(filtered));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();

        // Page separators become paragraph breaks
        Ok(text.replace('\u{000C}', "\n\n"))
    }
}

/// DOCX extraction via pandoc's plain-text writer
#[derive(Debug)]
pub struct DocxExtractor {
    command: String,
}

impl DocxExtractor {
    pub fn new() -> Self {
        Self {
            command: "pandoc".to_string(),
        }
    }

    /// Override the tool command, used by tests to point at a stub
    pub fn with_command<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for DocxExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Docx
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let args: Vec<OsString> = vec![
            OsString::from("-f"),
            OsString::from("docx"),
            OsString::from("-t"),
            OsString::from("plain"),
            OsString::from("--wrap=none"),
            path.as_os_str().to_os_string(),
        ];

        let output = run_extraction_tool(&self.command, args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_tool_stderr(&stderr);
            error!("DOCX extraction failed for {:?}: {}", path, filtered);
            return Err(ExtractionError::CorruptContent(filtered));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
