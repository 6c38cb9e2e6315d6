//! In-memory store: useful for testing and for running without a database.
//!
//! Mirrors the PostgreSQL matching rules closely enough for tests: trigram
//! similarity (pg_trgm style) or substring containment on normalized text,
//! cosine similarity for embeddings, deterministic ordering.

use async_trait::async_trait;
use quranlens_core::arabic;
use quranlens_core::error::StorageError;
use quranlens_core::quran::{Ayah, AyahKey, Surah, TafsirChunk};
use quranlens_core::store::{QuranStore, RequestId, RequestStore};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// pg_trgm's default `%` threshold.
const TRIGRAM_THRESHOLD: f64 = 0.3;

struct StoredAyah {
    text_type_id: i32,
    ayah: Ayah,
    text_norm: String,
    embedding: Option<Vec<f32>>,
}

struct StoredTafsir {
    chunk: TafsirChunk,
    text_norm: String,
}

#[derive(Default)]
struct Tables {
    ayahs: Vec<StoredAyah>,
    tafsir: Vec<StoredTafsir>,
    surahs: HashMap<i32, Surah>,
    requests: HashMap<RequestId, Option<String>>,
}

/// A [`QuranStore`] and [`RequestStore`] held in memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a verse in the given text edition.
    pub async fn insert_ayah(
        &self,
        text_type_id: i32,
        key: AyahKey,
        text: &str,
        embedding: Option<Vec<f32>>,
    ) {
        let stored = StoredAyah {
            text_type_id,
            ayah: Ayah {
                ayah_key: key.to_string(),
                surah: i32::from(key.surah),
                ayah: i32::from(key.ayah),
                text: text.to_string(),
                score: None,
            },
            text_norm: arabic::normalize(text),
            embedding,
        };
        self.tables.write().await.ayahs.push(stored);
    }

    /// Add a commentary chunk.
    pub async fn insert_tafsir(&self, chunk: TafsirChunk) {
        let text_norm = arabic::normalize(&chunk.text);
        self.tables.write().await.tafsir.push(StoredTafsir { chunk, text_norm });
    }

    /// Add surah metadata.
    pub async fn insert_surah(&self, surah: Surah) {
        self.tables.write().await.surahs.insert(surah.id, surah);
    }

    /// Register a request row awaiting its response.
    pub async fn insert_request(&self, id: RequestId) {
        self.tables.write().await.requests.insert(id, None);
    }

    /// The stored response of a request, if any.
    pub async fn response_for(&self, id: RequestId) -> Option<String> {
        self.tables.read().await.requests.get(&id).cloned().flatten()
    }
}

/// Trigram set of `text` the way pg_trgm builds it: each word padded with
/// two leading spaces and one trailing space.
fn trigrams(text: &str) -> BTreeSet<Vec<char>> {
    let mut set = BTreeSet::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.to_lowercase().chars())
            .chain(" ".chars())
            .collect();
        for window in padded.windows(3) {
            set.insert(window.to_vec());
        }
    }
    set
}

/// Jaccard similarity of the two trigram sets.
fn trigram_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (trigrams(a), trigrams(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    let total = a.len() + b.len() - shared;
    shared as f64 / total as f64
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Score of a fuzzy text match, or `None` when the text does not match.
fn text_match(text_norm: &str, query: &str) -> Option<f64> {
    let score = trigram_similarity(text_norm, query);
    (score >= TRIGRAM_THRESHOLD || text_norm.contains(query)).then_some(score)
}

fn by_score_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    b.unwrap_or(0.0)
        .partial_cmp(&a.unwrap_or(0.0))
        .unwrap_or(Ordering::Equal)
}

#[async_trait]
impl QuranStore for InMemoryStore {
    async fn find_ayah(&self, key: AyahKey, text_type_id: i32) -> Result<Option<Ayah>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ayahs
            .iter()
            .find(|s| {
                s.text_type_id == text_type_id
                    && s.ayah.surah == i32::from(key.surah)
                    && s.ayah.ayah == i32::from(key.ayah)
            })
            .map(|s| s.ayah.clone()))
    }

    async fn surah_ayahs(
        &self,
        surah: u16,
        text_type_id: i32,
        limit: Option<u32>,
    ) -> Result<Vec<Ayah>, StorageError> {
        let tables = self.tables.read().await;
        let mut ayahs: Vec<Ayah> = tables
            .ayahs
            .iter()
            .filter(|s| s.text_type_id == text_type_id && s.ayah.surah == i32::from(surah))
            .map(|s| s.ayah.clone())
            .collect();
        ayahs.sort_by_key(|a| a.ayah);
        if let Some(limit) = limit {
            ayahs.truncate(limit as usize);
        }
        Ok(ayahs)
    }

    async fn search_ayahs_by_text(
        &self,
        query: &str,
        text_type_id: i32,
        limit: u32,
    ) -> Result<Vec<Ayah>, StorageError> {
        let tables = self.tables.read().await;
        let mut hits: Vec<Ayah> = tables
            .ayahs
            .iter()
            .filter(|s| s.text_type_id == text_type_id)
            .filter_map(|s| {
                text_match(&s.text_norm, query).map(|score| Ayah {
                    score: Some(score),
                    ..s.ayah.clone()
                })
            })
            .collect();
        hits.sort_by(|a, b| by_score_desc(a.score, b.score).then((a.surah, a.ayah).cmp(&(b.surah, b.ayah))));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn search_ayahs_by_embedding(
        &self,
        embedding: &[f32],
        text_type_id: i32,
        min_similarity: f64,
        limit: u32,
    ) -> Result<Vec<Ayah>, StorageError> {
        let tables = self.tables.read().await;
        let mut hits: Vec<Ayah> = tables
            .ayahs
            .iter()
            .filter(|s| s.text_type_id == text_type_id)
            .filter_map(|s| {
                let score = cosine_similarity(s.embedding.as_deref()?, embedding);
                (score >= min_similarity).then(|| Ayah {
                    score: Some(score),
                    ..s.ayah.clone()
                })
            })
            .collect();
        hits.sort_by(|a, b| by_score_desc(a.score, b.score).then((a.surah, a.ayah).cmp(&(b.surah, b.ayah))));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn search_tafsir(
        &self,
        query: &str,
        edition_id: Option<i32>,
        limit: u32,
    ) -> Result<Vec<TafsirChunk>, StorageError> {
        let tables = self.tables.read().await;
        let mut hits: Vec<TafsirChunk> = tables
            .tafsir
            .iter()
            .filter(|s| edition_id.is_none_or(|e| s.chunk.edition_id == e))
            .filter_map(|s| {
                text_match(&s.text_norm, query).map(|score| TafsirChunk {
                    score: Some(score),
                    ..s.chunk.clone()
                })
            })
            .collect();
        hits.sort_by(|a, b| by_score_desc(a.score, b.score).then(a.id.cmp(&b.id)));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn tafsir_for_ayah(
        &self,
        key: AyahKey,
        edition_id: Option<i32>,
    ) -> Result<Vec<TafsirChunk>, StorageError> {
        let key_str = key.to_string();
        let tables = self.tables.read().await;
        let mut chunks: Vec<TafsirChunk> = tables
            .tafsir
            .iter()
            .map(|s| &s.chunk)
            .filter(|c| {
                (c.surah == i32::from(key.surah) && c.ayah == i32::from(key.ayah))
                    || c.ayah_keys.contains(&key_str)
            })
            .filter(|c| edition_id.is_none_or(|e| c.edition_id == e))
            .cloned()
            .collect();
        chunks.sort_by_key(|c| (c.edition_id, c.chunk_idx, c.id));
        Ok(chunks)
    }

    async fn surah(&self, number: u16) -> Result<Option<Surah>, StorageError> {
        Ok(self.tables.read().await.surahs.get(&i32::from(number)).cloned())
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn request_exists(&self, id: RequestId) -> Result<bool, StorageError> {
        Ok(self.tables.read().await.requests.contains_key(&id))
    }

    async fn save_response(&self, id: RequestId, response: &str) -> Result<(), StorageError> {
        match self.tables.write().await.requests.get_mut(&id) {
            Some(slot) => {
                *slot = Some(response.to_string());
                Ok(())
            }
            None => Err(StorageError::QueryFailed(format!("Request {id} no longer exists"))),
        }
    }
}
