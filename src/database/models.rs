/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};

use crate::file_utils::DocumentKind;

/// Ingested document record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique document identifier (UUID)
    pub id: String,
    /// Display name, taken from the source file name
    pub name: String,
    /// Source file kind at ingestion time
    #[serde(with = "kind_token")]
    pub kind: DocumentKind,
    /// Full extracted text
    pub content: String,
    /// SHA256 hash of the extracted text for duplicate detection
    pub content_hash: String,
    /// Detected or overridden language code
    pub language: String,
    /// Size of the source file in bytes
    pub size_bytes: i64,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
}

/// Serialize DocumentKind through its storage token
mod kind_token {
    use super::DocumentKind;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(kind: &DocumentKind, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&kind.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DocumentKind, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

impl DocumentRecord {
    /// Create a new document record
    pub fn new(
        id: String,
        name: String,
        kind: DocumentKind,
        content: String,
        content_hash: String,
        language: String,
        size_bytes: i64,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            content,
            content_hash,
            language,
            size_bytes,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Number of characters in the extracted text
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// First characters of the content for listings, with an ellipsis when cut
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self
            .content
            .chars()
            .take(max_chars)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();

        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// Assistant attachment with token and cost estimates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Database ID
    pub id: i64,
    /// Attached document
    pub document_id: String,
    /// Target model the estimates were computed for
    pub model: String,
    /// Estimated input tokens for the full document text
    pub token_estimate: i64,
    /// Estimated input cost in USD
    pub cost_estimate: f64,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
}

impl AttachmentRecord {
    /// Create a new attachment record (without database ID)
    pub fn new(document_id: String, model: String, token_estimate: i64, cost_estimate: f64) -> Self {
        Self {
            id: 0, // Will be assigned by database
            document_id,
            model,
            token_estimate,
            cost_estimate,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
