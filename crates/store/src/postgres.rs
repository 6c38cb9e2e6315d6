//! PostgreSQL store: pg_trgm for fuzzy text search, pgvector for semantic search.
//!
//! # Setup
//!
//! ```sql
//! CREATE EXTENSION IF NOT EXISTS vector;
//! CREATE EXTENSION IF NOT EXISTS pg_trgm;
//! ```
//!
//! Then run [`PostgresStore::migrate`] (or `quranlens migrate`), which applies
//! `migrations/001_schema.sql`.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tracing::{debug, info};

use quranlens_core::error::StorageError;
use quranlens_core::quran::{Ayah, AyahKey, Surah, TafsirChunk};
use quranlens_core::store::{QuranStore, RequestId, RequestStore};

const AYAH_COLUMNS: &str = "ayah_key, sura, aya, text";
const TAFSIR_COLUMNS: &str = "id, edition_id, sura, aya, ayah_keys, chunk_idx, text";

/// Quran data and request log in PostgreSQL.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect with a pool of at most `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Unavailable(format!("PostgreSQL connection failed: {e}")))?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        let migration_sql = include_str!("../migrations/001_schema.sql");

        sqlx::raw_sql(migration_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(format!("Migration failed: {e}")))?;

        info!("Schema migration complete");
        Ok(())
    }
}

fn query_failed(what: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |e| match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StorageError::Unavailable(format!("{what}: {e}"))
        }
        other => StorageError::QueryFailed(format!("{what}: {other}")),
    }
}

fn decode_failed(e: sqlx::Error) -> StorageError {
    StorageError::QueryFailed(format!("Unexpected row shape: {e}"))
}

/// Convert a database row into an Ayah. `score` is read when the query selects it.
fn row_to_ayah(row: &PgRow) -> Result<Ayah, StorageError> {
    Ok(Ayah {
        ayah_key: row.try_get("ayah_key").map_err(decode_failed)?,
        surah: row.try_get("sura").map_err(decode_failed)?,
        ayah: row.try_get("aya").map_err(decode_failed)?,
        text: row.try_get("text").map_err(decode_failed)?,
        score: row.try_get::<Option<f64>, _>("score").ok().flatten(),
    })
}

fn row_to_tafsir(row: &PgRow) -> Result<TafsirChunk, StorageError> {
    Ok(TafsirChunk {
        id: row.try_get("id").map_err(decode_failed)?,
        edition_id: row.try_get("edition_id").map_err(decode_failed)?,
        surah: row.try_get("sura").map_err(decode_failed)?,
        ayah: row.try_get("aya").map_err(decode_failed)?,
        ayah_keys: row.try_get("ayah_keys").map_err(decode_failed)?,
        chunk_idx: row.try_get("chunk_idx").map_err(decode_failed)?,
        text: row.try_get("text").map_err(decode_failed)?,
        score: row.try_get::<Option<f64>, _>("score").ok().flatten(),
    })
}

fn rows_to<T>(rows: &[PgRow], convert: fn(&PgRow) -> Result<T, StorageError>) -> Result<Vec<T>, StorageError> {
    rows.iter().map(convert).collect()
}

/// pgvector text literal: `[0.1,0.2,...]`.
fn vector_literal(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

#[async_trait]
impl QuranStore for PostgresStore {
    async fn find_ayah(&self, key: AyahKey, text_type_id: i32) -> Result<Option<Ayah>, StorageError> {
        let sql = format!(
            "SELECT {AYAH_COLUMNS} FROM quran_text \
             WHERE sura = $1 AND aya = $2 AND text_type_id = $3 \
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(i32::from(key.surah))
            .bind(i32::from(key.ayah))
            .bind(text_type_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("Ayah lookup failed"))?;

        row.as_ref().map(row_to_ayah).transpose()
    }

    async fn surah_ayahs(
        &self,
        surah: u16,
        text_type_id: i32,
        limit: Option<u32>,
    ) -> Result<Vec<Ayah>, StorageError> {
        // LIMIT NULL means no limit
        let sql = format!(
            "SELECT {AYAH_COLUMNS} FROM quran_text \
             WHERE sura = $1 AND text_type_id = $2 \
             ORDER BY aya \
             LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(i32::from(surah))
            .bind(text_type_id)
            .bind(limit.map(i64::from))
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("Surah ayahs lookup failed"))?;

        rows_to(&rows, row_to_ayah)
    }

    async fn search_ayahs_by_text(
        &self,
        query: &str,
        text_type_id: i32,
        limit: u32,
    ) -> Result<Vec<Ayah>, StorageError> {
        let sql = format!(
            "SELECT {AYAH_COLUMNS}, similarity(text_norm, $1)::float8 AS score \
             FROM quran_text \
             WHERE text_type_id = $2 \
               AND (text_norm % $1 OR text_norm LIKE '%' || $1 || '%') \
             ORDER BY score DESC, sura, aya \
             LIMIT $3"
        );
        debug!(query = %query, text_type_id, limit, "Keyword verse search");

        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(text_type_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("Keyword search failed"))?;

        rows_to(&rows, row_to_ayah)
    }

    async fn search_ayahs_by_embedding(
        &self,
        embedding: &[f32],
        text_type_id: i32,
        min_similarity: f64,
        limit: u32,
    ) -> Result<Vec<Ayah>, StorageError> {
        let sql = format!(
            "SELECT {AYAH_COLUMNS}, (1 - (embedding <=> $1::halfvec))::float8 AS score \
             FROM quran_text \
             WHERE text_type_id = $2 \
               AND embedding IS NOT NULL \
               AND 1 - (embedding <=> $1::halfvec) >= $3 \
             ORDER BY score DESC, sura, aya \
             LIMIT $4"
        );
        debug!(dimensions = embedding.len(), text_type_id, min_similarity, limit, "Semantic verse search");

        let rows = sqlx::query(&sql)
            .bind(vector_literal(embedding))
            .bind(text_type_id)
            .bind(min_similarity)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("Vector search failed"))?;

        rows_to(&rows, row_to_ayah)
    }

    async fn search_tafsir(
        &self,
        query: &str,
        edition_id: Option<i32>,
        limit: u32,
    ) -> Result<Vec<TafsirChunk>, StorageError> {
        let sql = format!(
            "SELECT {TAFSIR_COLUMNS}, similarity(text_norm, $1)::float8 AS score \
             FROM tafsir_chunks \
             WHERE (text_norm % $1 OR text_norm LIKE '%' || $1 || '%') \
               AND ($2::int IS NULL OR edition_id = $2) \
             ORDER BY score DESC, id \
             LIMIT $3"
        );
        debug!(query = %query, edition_id = ?edition_id, limit, "Tafsir search");

        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(edition_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("Tafsir search failed"))?;

        rows_to(&rows, row_to_tafsir)
    }

    async fn tafsir_for_ayah(
        &self,
        key: AyahKey,
        edition_id: Option<i32>,
    ) -> Result<Vec<TafsirChunk>, StorageError> {
        // Chunks spanning several verses list the covered keys in ayah_keys
        let sql = format!(
            "SELECT {TAFSIR_COLUMNS} FROM tafsir_chunks \
             WHERE ((sura = $1 AND aya = $2) OR $3 = ANY(ayah_keys)) \
               AND ($4::int IS NULL OR edition_id = $4) \
             ORDER BY edition_id, chunk_idx, id"
        );
        let rows = sqlx::query(&sql)
            .bind(i32::from(key.surah))
            .bind(i32::from(key.ayah))
            .bind(key.to_string())
            .bind(edition_id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("Tafsir lookup failed"))?;

        rows_to(&rows, row_to_tafsir)
    }

    async fn surah(&self, number: u16) -> Result<Option<Surah>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name_ar, name_en, revelation, ayah_count, page_start, page_end \
             FROM surahs WHERE id = $1",
        )
        .bind(i32::from(number))
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("Surah lookup failed"))?;

        row.map(|row| {
            Ok(Surah {
                id: row.try_get("id").map_err(decode_failed)?,
                name_ar: row.try_get("name_ar").map_err(decode_failed)?,
                name_en: row.try_get("name_en").map_err(decode_failed)?,
                revelation: row.try_get("revelation").map_err(decode_failed)?,
                ayah_count: row.try_get("ayah_count").map_err(decode_failed)?,
                page_start: row.try_get("page_start").map_err(decode_failed)?,
                page_end: row.try_get("page_end").map_err(decode_failed)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl RequestStore for PostgresStore {
    async fn request_exists(&self, id: RequestId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM llm_requests WHERE id = $1) AS found")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(query_failed("Request lookup failed"))?;

        row.try_get("found").map_err(decode_failed)
    }

    async fn save_response(&self, id: RequestId, response: &str) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE llm_requests SET response = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.0)
        .bind(response)
        .execute(&self.pool)
        .await
        .map_err(query_failed("Saving response failed"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryFailed(format!("Request {id} no longer exists")));
        }

        debug!(request_id = %id, bytes = response.len(), "Stored response");
        Ok(())
    }
}
