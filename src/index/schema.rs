//! # Database Schema Module
//!
//! Creates the tables the retrievers read from.
//!
//! ## Schema Design
//!
//! 1. `documents` - One row per ingested page, scoped by `(team_id, bot_id)`,
//!    carrying the document language and translation group
//! 2. `chunks` - Content segments with their vector embeddings and a foreign
//!    key to their document
//! 3. `conversations` - The ordered pinned chunk ids of each conversation,
//!    stored as a JSON array

use crate::index::error::DbError;
use libsql::{params, Connection};

/// Initialize the database schema for embeddings of `dims` dimensions
pub async fn initialize_schema(conn: &Connection, dims: usize) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL,
            bot_id TEXT NOT NULL,
            canonical_url TEXT,
            title TEXT,
            language TEXT,
            translation_group_id TEXT,
            indexed_at INTEGER NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create documents table: {}", e)))?;

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                anchor_id TEXT,
                content TEXT NOT NULL,
                language TEXT,
                position INTEGER NOT NULL,
                embedding F32_BLOB({dims}) NOT NULL,
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            )"
        ),
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create chunks table: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            pinned_chunk_ids TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create conversations table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_scope ON documents(team_id, bot_id)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on documents: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on chunks: {}", e)))?;

    Ok(())
}
