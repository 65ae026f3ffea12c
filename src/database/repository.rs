/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use super::connection::DatabaseConnection;
use super::models::{AttachmentRecord, DocumentRecord};
use crate::file_utils::DocumentKind;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Access the underlying connection, for stats and maintenance
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Compute SHA256 hash of text
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Store a newly ingested document
    pub async fn create_document(&self, document: &DocumentRecord) -> Result<()> {
        let document = document.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO documents (
                        id, name, kind, content, content_hash, language, size_bytes, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        document.id,
                        document.name,
                        document.kind.to_string(),
                        document.content,
                        document.content_hash,
                        document.language,
                        document.size_bytes,
                        document.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get a document by ID
    pub async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        let document_id = document_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_document_sync(conn, &document_id))
            .await
    }

    /// Get a document by ID, running directly on a borrowed connection
    fn get_document_sync(conn: &Connection, document_id: &str) -> Result<Option<DocumentRecord>> {
        let result = conn
            .query_row(
                r#"
                SELECT id, name, kind, content, content_hash, language, size_bytes, created_at
                FROM documents WHERE id = ?1
                "#,
                [document_id],
                |row| {
                    Ok(DocumentRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        kind: row
                            .get::<_, String>(2)?
                            .parse()
                            .unwrap_or(DocumentKind::Txt),
                        content: row.get(3)?,
                        content_hash: row.get(4)?,
                        language: row.get(5)?,
                        size_bytes: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    /// Find a document with the same extracted text, if one was ingested before
    pub async fn find_document_by_hash(&self, content_hash: &str) -> Result<Option<DocumentRecord>> {
        let content_hash = content_hash.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT id, name, kind, content, content_hash, language, size_bytes, created_at
                        FROM documents WHERE content_hash = ?1
                        "#,
                        [content_hash],
                        |row| {
                            Ok(DocumentRecord {
                                id: row.get(0)?,
                                name: row.get(1)?,
                                kind: row
                                    .get::<_, String>(2)?
                                    .parse()
                                    .unwrap_or(DocumentKind::Txt),
                                content: row.get(3)?,
                                content_hash: row.get(4)?,
                                language: row.get(5)?,
                                size_bytes: row.get(6)?,
                                created_at: row.get(7)?,
                            })
                        },
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    /// List all documents, newest first
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        self.db
            .execute_async(|conn| {
                // Helper function to parse a document row
                fn parse_document_row(row: &rusqlite::Row) -> rusqlite::Result<DocumentRecord> {
                    Ok(DocumentRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        kind: row
                            .get::<_, String>(2)?
                            .parse()
                            .unwrap_or(DocumentKind::Txt),
                        content: row.get(3)?,
                        content_hash: row.get(4)?,
                        language: row.get(5)?,
                        size_bytes: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                }

                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, name, kind, content, content_hash, language, size_bytes, created_at
                    FROM documents
                    ORDER BY created_at DESC
                    "#,
                )?;

                let documents: Vec<DocumentRecord> = stmt
                    .query_map([], parse_document_row)?
                    .filter_map(|r| r.ok())
                    .collect();

                Ok(documents)
            })
            .await
    }

    /// Delete a document and all related data
    ///
    /// Returns false when no document with the given ID existed.
    pub async fn delete_document(&self, document_id: &str) -> Result<bool> {
        let document_id = document_id.to_string();

        self.db
            .execute_async(move |conn| {
                // Due to CASCADE, deleting the document removes its position and attachments
                let deleted = conn.execute("DELETE FROM documents WHERE id = ?1", [&document_id])?;
                Ok(deleted > 0)
            })
            .await
    }

    // =========================================================================
    // Reading Position Operations
    // =========================================================================

    /// Save the paragraph to resume a document from
    pub async fn save_position(&self, document_id: &str, paragraph_index: i64) -> Result<()> {
        let document_id = document_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO reading_positions (document_id, paragraph_index, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(document_id) DO UPDATE SET
                        paragraph_index = excluded.paragraph_index,
                        updated_at = excluded.updated_at
                    "#,
                    params![document_id, paragraph_index, now],
                )?;
                Ok(())
            })
            .await
    }

    /// Load the saved paragraph index for a document, if any
    pub async fn load_position(&self, document_id: &str) -> Result<Option<i64>> {
        let document_id = document_id.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT paragraph_index FROM reading_positions WHERE document_id = ?1",
                        [&document_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    /// Remove the saved position so the document starts from the beginning
    pub async fn clear_position(&self, document_id: &str) -> Result<()> {
        let document_id = document_id.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "DELETE FROM reading_positions WHERE document_id = ?1",
                    [&document_id],
                )?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Voice Preference Operations
    // =========================================================================

    /// Remember the voice to use for a language
    pub async fn save_voice_preference(&self, language: &str, voice_id: &str) -> Result<()> {
        let language = language.to_string();
        let voice_id = voice_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO voice_preferences (language, voice_id, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(language) DO UPDATE SET
                        voice_id = excluded.voice_id,
                        updated_at = excluded.updated_at
                    "#,
                    params![language, voice_id, now],
                )?;
                debug!("Saved voice preference: {} for language {}", voice_id, language);
                Ok(())
            })
            .await
    }

    /// Load the preferred voice for a language, if one was saved
    pub async fn load_voice_preference(&self, language: &str) -> Result<Option<String>> {
        let language = language.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT voice_id FROM voice_preferences WHERE language = ?1",
                        [&language],
                        |row| row.get(0),
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    // =========================================================================
    // Attachment Operations
    // =========================================================================

    /// Insert or refresh an attachment for a document and model
    pub async fn upsert_attachment(&self, attachment: &AttachmentRecord) -> Result<()> {
        let attachment = attachment.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO attachments (
                        document_id, model, token_estimate, cost_estimate, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(document_id, model) DO UPDATE SET
                        token_estimate = excluded.token_estimate,
                        cost_estimate = excluded.cost_estimate,
                        created_at = excluded.created_at
                    "#,
                    params![
                        attachment.document_id,
                        attachment.model,
                        attachment.token_estimate,
                        attachment.cost_estimate,
                        attachment.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// List attachments for a document
    pub async fn list_attachments(&self, document_id: &str) -> Result<Vec<AttachmentRecord>> {
        let document_id = document_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, document_id, model, token_estimate, cost_estimate, created_at
                    FROM attachments
                    WHERE document_id = ?1
                    ORDER BY model
                    "#,
                )?;

                let rows = stmt.query_map([&document_id], |row| {
                    Ok(AttachmentRecord {
                        id: row.get(0)?,
                        document_id: row.get(1)?,
                        model: row.get(2)?,
                        token_estimate: row.get(3)?,
                        cost_estimate: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?;

                let attachments: Vec<AttachmentRecord> = rows.filter_map(|r| r.ok()).collect();
                Ok(attachments)
            })
            .await
    }

    /// Delete attachments for a document, optionally only for one model
    ///
    /// Returns the number of attachments removed.
    pub async fn delete_attachments(&self, document_id: &str, model: Option<&str>) -> Result<i64> {
        let document_id = document_id.to_string();
        let model = model.map(str::to_string);

        self.db
            .execute_async(move |conn| {
                let deleted = if let Some(model) = model {
                    conn.execute(
                        "DELETE FROM attachments WHERE document_id = ?1 AND model = ?2",
                        params![document_id, model],
                    )?
                } else {
                    conn.execute(
                        "DELETE FROM attachments WHERE document_id = ?1",
                        [&document_id],
                    )?
                };

                Ok(deleted as i64)
            })
            .await
    }
}
