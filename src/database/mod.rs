/*!
 * Database module for persistent storage of the document library.
 *
 * This module provides SQLite-based persistence for:
 * - Ingested documents with their extracted text
 * - Reading positions so narration can resume across sessions
 * - Per-language voice preferences
 * - Assistant attachments with token and cost estimates
 */

// Allow dead code and unused imports - database types are for library consumers
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::Repository;
