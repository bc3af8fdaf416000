//! Database operations for the index module

use async_trait::async_trait;
use libsql::{params, Connection, Row, Rows, Value};
use tracing::{debug, instrument};

use crate::index::error::DbError;
use crate::index::schema;
use crate::index::{Document, IndexedChunk};
use crate::model::embedding::{vector_to_blob, EmbeddingConversion};
use crate::model::GEMINI_EMBEDDING_DIMS;
use crate::retrieval::{
    CandidateRow, ChunkLookup, ConversationStore, LexicalSearch, RetrieveError, RetrievedChunk,
    VectorSearch,
};

/// Most query terms considered by lexical search
const MAX_LEXICAL_TERMS: usize = 8;

/// Columns shared by every chunk query, in `row_to_candidate` order
const CHUNK_COLUMNS: &str = "c.id, c.document_id, d.canonical_url, c.anchor_id, c.content,
     c.language, d.language, d.translation_group_id";

/// Database manager for the index
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database manager for `text-embedding-004` vectors
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, DbError> {
        Self::with_dims(conn, GEMINI_EMBEDDING_DIMS).await
    }

    /// Create a new database manager storing vectors of `dims` dimensions
    pub async fn with_dims(conn: Connection, dims: usize) -> Result<Self, DbError> {
        schema::initialize_schema(&conn, dims).await?;
        Ok(Self { conn })
    }

    /// Create a new database manager from a path
    pub async fn new_from_path(path: &str) -> Result<Self, DbError> {
        Self::new_from_path_with_dims(path, GEMINI_EMBEDDING_DIMS).await
    }

    pub async fn new_from_path_with_dims(path: &str, dims: usize) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::with_dims(conn, dims).await
    }

    /// Execute a custom query with parameters
    pub async fn execute_query<P>(&self, sql: &str, params: P) -> Result<Rows, DbError>
    where
        P: libsql::params::IntoParams,
    {
        self.conn
            .query(sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))
    }

    /// Insert a document or replace the metadata of an existing one
    pub async fn upsert_document(&self, document: &Document) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO documents
                 (id, team_id, bot_id, canonical_url, title, language, translation_group_id, indexed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                 team_id = excluded.team_id,
                 bot_id = excluded.bot_id,
                 canonical_url = excluded.canonical_url,
                 title = excluded.title,
                 language = excluded.language,
                 translation_group_id = excluded.translation_group_id,
                 indexed_at = excluded.indexed_at",
                vec![
                    Value::Text(document.id.clone()),
                    Value::Text(document.team_id.clone()),
                    Value::Text(document.bot_id.clone()),
                    optional_text(&document.canonical_url),
                    optional_text(&document.title),
                    optional_text(&document.language),
                    optional_text(&document.translation_group_id),
                    Value::Integer(now),
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to upsert document: {}", e)))?;

        Ok(())
    }

    /// Insert a chunk, replacing any chunk with the same id
    pub async fn add_chunk(&self, chunk: &IndexedChunk) -> Result<(), DbError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO chunks
                 (id, document_id, anchor_id, content, language, position, embedding)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                vec![
                    Value::Text(chunk.id.clone()),
                    Value::Text(chunk.document_id.clone()),
                    optional_text(&chunk.anchor_id),
                    Value::Text(chunk.content.clone()),
                    optional_text(&chunk.language),
                    Value::Integer(chunk.position),
                    Value::Blob(chunk.embedding.to_binary()),
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to add chunk: {}", e)))?;

        Ok(())
    }

    /// Remove a document and its chunks. Returns the number of chunks removed.
    pub async fn delete_document(&self, document_id: &str) -> Result<u64, DbError> {
        let removed = self
            .conn
            .execute("DELETE FROM chunks WHERE document_id = ?", params![document_id])
            .await
            .map_err(|e| DbError::Query(format!("Failed to delete chunks: {}", e)))?;

        self.conn
            .execute("DELETE FROM documents WHERE id = ?", params![document_id])
            .await
            .map_err(|e| DbError::Query(format!("Failed to delete document: {}", e)))?;

        Ok(removed)
    }

    /// Number of chunks indexed for one bot
    pub async fn count_chunks(&self, team_id: &str, bot_id: &str) -> Result<i64, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM chunks c
                 JOIN documents d ON d.id = c.document_id
                 WHERE d.team_id = ? AND d.bot_id = ?",
                params![team_id, bot_id],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to count chunks: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to count chunks: {}", e)))?
        {
            Some(row) => row
                .get(0)
                .map_err(|e| DbError::Data(format!("Failed to get count: {}", e))),
            None => Ok(0),
        }
    }

    /// Nearest chunks of one bot by cosine similarity
    #[instrument(skip(self, query_vector))]
    pub async fn vector_search(
        &self,
        query_vector: &[f32],
        team_id: &str,
        bot_id: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRow>, DbError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {CHUNK_COLUMNS},
                 1.0 - vector_distance_cos(c.embedding, ?) AS similarity
             FROM chunks c
             JOIN documents d ON d.id = c.document_id
             WHERE d.team_id = ? AND d.bot_id = ?
             ORDER BY similarity DESC, c.document_id, c.position
             LIMIT ?"
        );
        let params = vec![
            Value::Blob(vector_to_blob(query_vector)),
            Value::Text(team_id.to_string()),
            Value::Text(bot_id.to_string()),
            Value::Integer(limit as i64),
        ];

        let mut rows = self
            .conn
            .query(&sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to run vector search: {}", e)))?;

        let candidates = collect_candidates(&mut rows).await?;
        debug!("Vector search returned {} candidates", candidates.len());
        Ok(candidates)
    }

    /// Chunks of one bot containing the most query terms. The rank score is
    /// the share of query terms found in the chunk.
    #[instrument(skip(self))]
    pub async fn lexical_search(
        &self,
        query: &str,
        team_id: &str,
        bot_id: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRow>, DbError> {
        let terms = lexical_terms(query);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let hits = vec!["(CASE WHEN c.content LIKE ? ESCAPE '\\' THEN 1 ELSE 0 END)"; terms.len()]
            .join(" + ");
        let sql = format!(
            "SELECT * FROM (
                 SELECT {CHUNK_COLUMNS},
                     CAST(({hits}) AS REAL) / ? AS score,
                     c.position AS position
                 FROM chunks c
                 JOIN documents d ON d.id = c.document_id
                 WHERE d.team_id = ? AND d.bot_id = ?
             )
             WHERE score > 0
             ORDER BY score DESC, document_id, position
             LIMIT ?"
        );

        let mut params: Vec<Value> = terms
            .iter()
            .map(|term| Value::Text(like_pattern(term)))
            .collect();
        params.push(Value::Real(terms.len() as f64));
        params.push(Value::Text(team_id.to_string()));
        params.push(Value::Text(bot_id.to_string()));
        params.push(Value::Integer(limit as i64));

        let mut rows = self
            .conn
            .query(&sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to run lexical search: {}", e)))?;

        collect_candidates(&mut rows).await
    }

    /// Chunks with the given ids, in the order of `chunk_ids`. Unknown ids
    /// are skipped.
    pub async fn chunks_by_ids(&self, chunk_ids: &[String]) -> Result<Vec<RetrievedChunk>, DbError> {
        if chunk_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; chunk_ids.len()].join(", ");
        let sql = format!(
            "SELECT {CHUNK_COLUMNS}, 0.0
             FROM chunks c
             JOIN documents d ON d.id = c.document_id
             WHERE c.id IN ({placeholders})"
        );
        let params: Vec<Value> = chunk_ids.iter().map(|id| Value::Text(id.clone())).collect();

        let mut rows = self
            .conn
            .query(&sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to fetch chunks: {}", e)))?;

        let mut found = collect_candidates(&mut rows).await?;
        let mut ordered = Vec::with_capacity(found.len());
        for id in chunk_ids {
            if let Some(position) = found.iter().position(|row| &row.chunk_id == id) {
                let mut chunk = found.swap_remove(position).into_retrieved();
                chunk.similarity = None;
                ordered.push(chunk);
            }
        }
        Ok(ordered)
    }

    /// Pinned chunk ids of a conversation; empty for unknown conversations
    pub async fn pinned_chunk_ids(&self, conversation_id: &str) -> Result<Vec<String>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT pinned_chunk_ids FROM conversations WHERE id = ?",
                params![conversation_id],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get pinned chunks: {}", e)))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to get pinned chunks: {}", e)))?;

        match row {
            Some(row) => {
                let json: String = row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get pinned_chunk_ids: {}", e)))?;
                Ok(serde_json::from_str(&json)?)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Replace the pinned chunk ids of a conversation
    pub async fn set_pinned_chunk_ids(
        &self,
        conversation_id: &str,
        chunk_ids: &[String],
    ) -> Result<(), DbError> {
        let json = serde_json::to_string(chunk_ids)?;
        let now = chrono::Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO conversations (id, pinned_chunk_ids, updated_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                 pinned_chunk_ids = excluded.pinned_chunk_ids,
                 updated_at = excluded.updated_at",
                params![conversation_id, json, now],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to set pinned chunks: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl VectorSearch for Database {
    async fn search(
        &self,
        query_vector: &[f32],
        team_id: &str,
        bot_id: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRow>, RetrieveError> {
        self.vector_search(query_vector, team_id, bot_id, limit)
            .await
            .map_err(|e| RetrieveError::VectorSearch(e.to_string()))
    }
}

#[async_trait]
impl LexicalSearch for Database {
    async fn search_text(
        &self,
        query: &str,
        team_id: &str,
        bot_id: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRow>, RetrieveError> {
        self.lexical_search(query, team_id, bot_id, limit)
            .await
            .map_err(|e| RetrieveError::LexicalSearch(e.to_string()))
    }
}

#[async_trait]
impl ChunkLookup for Database {
    async fn fetch_by_ids(&self, chunk_ids: &[String]) -> Result<Vec<RetrievedChunk>, RetrieveError> {
        self.chunks_by_ids(chunk_ids)
            .await
            .map_err(|e| RetrieveError::ChunkLookup(e.to_string()))
    }
}

#[async_trait]
impl ConversationStore for Database {
    async fn get_pinned(&self, conversation_id: &str) -> Result<Vec<String>, RetrieveError> {
        self.pinned_chunk_ids(conversation_id)
            .await
            .map_err(|e| RetrieveError::ConversationStore(e.to_string()))
    }

    async fn set_pinned(
        &self,
        conversation_id: &str,
        chunk_ids: &[String],
    ) -> Result<(), RetrieveError> {
        self.set_pinned_chunk_ids(conversation_id, chunk_ids)
            .await
            .map_err(|e| RetrieveError::ConversationStore(e.to_string()))
    }
}

async fn collect_candidates(rows: &mut Rows) -> Result<Vec<CandidateRow>, DbError> {
    let mut candidates = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DbError::Data(format!("Failed to read row: {}", e)))?
    {
        candidates.push(row_to_candidate(&row)?);
    }
    Ok(candidates)
}

/// Convert a database row to a CandidateRow
fn row_to_candidate(row: &Row) -> Result<CandidateRow, DbError> {
    Ok(CandidateRow {
        chunk_id: row
            .get(0)
            .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
        document_id: row
            .get(1)
            .map_err(|e| DbError::Data(format!("Failed to get document_id: {}", e)))?,
        canonical_url: row
            .get(2)
            .map_err(|e| DbError::Data(format!("Failed to get canonical_url: {}", e)))?,
        anchor_id: row
            .get(3)
            .map_err(|e| DbError::Data(format!("Failed to get anchor_id: {}", e)))?,
        content: row
            .get(4)
            .map_err(|e| DbError::Data(format!("Failed to get content: {}", e)))?,
        language: row
            .get(5)
            .map_err(|e| DbError::Data(format!("Failed to get language: {}", e)))?,
        document_language: row
            .get(6)
            .map_err(|e| DbError::Data(format!("Failed to get document language: {}", e)))?,
        translation_group_id: row
            .get(7)
            .map_err(|e| DbError::Data(format!("Failed to get translation_group_id: {}", e)))?,
        similarity: row
            .get(8)
            .map_err(|e| DbError::Data(format!("Failed to get similarity: {}", e)))?,
    })
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

/// Distinct lowercase words of the query, punctuation trimmed
fn lexical_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query.split_whitespace() {
        let term = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if !term.is_empty() && !terms.contains(&term) {
            terms.push(term);
        }
        if terms.len() == MAX_LEXICAL_TERMS {
            break;
        }
    }
    terms
}

/// `LIKE` pattern matching `term` anywhere, with wildcards escaped
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
