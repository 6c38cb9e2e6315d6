//! Storage traits: the data behind the tools and the request log behind the
//! streaming endpoint.
//!
//! Implementations: PostgreSQL (pg_trgm + pgvector) and in-memory.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use crate::error::StorageError;
use crate::quran::{Ayah, AyahKey, Surah, TafsirChunk};

/// Read-only access to verses, commentary and surah metadata.
///
/// Text queries arrive already normalized; implementations own the matching
/// strategy (trigram similarity, substring, cosine distance).
#[async_trait]
pub trait QuranStore: Send + Sync {
    /// A single verse in the given text edition.
    async fn find_ayah(&self, key: AyahKey, text_type_id: i32) -> Result<Option<Ayah>, StorageError>;

    /// Verses of one surah ordered by ayah number.
    async fn surah_ayahs(
        &self,
        surah: u16,
        text_type_id: i32,
        limit: Option<u32>,
    ) -> Result<Vec<Ayah>, StorageError>;

    /// Fuzzy lexical match over normalized verse text, best match first.
    async fn search_ayahs_by_text(
        &self,
        query: &str,
        text_type_id: i32,
        limit: u32,
    ) -> Result<Vec<Ayah>, StorageError>;

    /// Cosine similarity match against verse embeddings, best match first.
    async fn search_ayahs_by_embedding(
        &self,
        embedding: &[f32],
        text_type_id: i32,
        min_similarity: f64,
        limit: u32,
    ) -> Result<Vec<Ayah>, StorageError>;

    /// Fuzzy lexical match over normalized commentary text, best match first.
    async fn search_tafsir(
        &self,
        query: &str,
        edition_id: Option<i32>,
        limit: u32,
    ) -> Result<Vec<TafsirChunk>, StorageError>;

    /// Commentary attached to one verse, ordered by edition then chunk.
    async fn tafsir_for_ayah(
        &self,
        key: AyahKey,
        edition_id: Option<i32>,
    ) -> Result<Vec<TafsirChunk>, StorageError>;

    /// Surah metadata by number.
    async fn surah(&self, number: u16) -> Result<Option<Surah>, StorageError>;
}

/// Identifier of a stored LLM request row.
///
/// Browsers send it either as a number or as a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("'{s}' is not a request id"))),
        }
    }
}

/// The persistence collaborator of the streaming endpoint.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Whether a request row with this id exists.
    async fn request_exists(&self, id: RequestId) -> Result<bool, StorageError>;

    /// Store the final streamed answer on the request row.
    async fn save_response(&self, id: RequestId, response: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_accepts_number_or_string() {
        let a: RequestId = serde_json::from_str("42").unwrap();
        let b: RequestId = serde_json::from_str(r#""42""#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "42");
    }

    #[test]
    fn request_id_rejects_garbage() {
        assert!(serde_json::from_str::<RequestId>(r#""abc""#).is_err());
        assert!(serde_json::from_str::<RequestId>("true").is_err());
    }

    #[test]
    fn request_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&RequestId(7)).unwrap(), "7");
    }
}
