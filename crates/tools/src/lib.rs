//! The retrieval tools the research agent can call.
//!
//! Seven read-only lookups over verses, commentary and surah metadata.
//! [`QuranTools`] parses each call into a [`ToolRequest`], runs it against a
//! [`QuranStore`] and returns plain JSON records.

pub mod catalog;
pub mod embedding;
pub mod request;

pub use embedding::QueryEmbedder;
pub use request::ToolRequest;

use async_trait::async_trait;
use quranlens_core::arabic;
use quranlens_core::error::{BackendError, ToolError};
use quranlens_core::provider::ToolDefinition;
use quranlens_core::quran::{Ayah, Surah, TafsirChunk};
use quranlens_core::store::QuranStore;
use quranlens_core::tool::{ToolExecutor, ToolOutput};
use request::{
    AyahLookup, KeywordSearch, MeaningSearch, SurahAyahs, SurahInfo, TafsirLookup, TafsirSearch,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

/// The tool catalog backed by a Quran store.
#[derive(Clone)]
pub struct QuranTools {
    store: Arc<dyn QuranStore>,
    embedder: QueryEmbedder,
}

impl QuranTools {
    pub fn new(store: Arc<dyn QuranStore>, embedder: QueryEmbedder) -> Self {
        Self { store, embedder }
    }

    /// Run an already-parsed request.
    pub async fn run(&self, request: ToolRequest) -> Result<ToolOutput, ToolError> {
        let tool = request.tool();
        let output = match request {
            ToolRequest::SearchQuranByKeywords(search) => self.search_by_keywords(search).await,
            ToolRequest::SearchQuranByMeaning(search) => self.search_by_meaning(search).await,
            ToolRequest::GetAyahByReference(lookup) => self.ayah_by_reference(lookup).await,
            ToolRequest::GetSurahAyahs(surah) => self.surah_ayahs(surah).await,
            ToolRequest::SearchTafsir(search) => self.search_tafsir(search).await,
            ToolRequest::GetTafsirForAyah(lookup) => self.tafsir_for_ayah(lookup).await,
            ToolRequest::GetSurahInfo(info) => self.surah_info(info).await,
        }
        .map_err(|source| ToolError::backend(tool.as_str(), source))?;

        info!(tool = %tool, results = output.result_count(), "Tool executed");
        Ok(output)
    }

    async fn search_by_keywords(&self, search: KeywordSearch) -> Result<ToolOutput, BackendError> {
        let query = arabic::normalize(&search.query);
        let mut ayahs = self
            .store
            .search_ayahs_by_text(&query, search.text_type_id, search.limit)
            .await?;

        // Whole phrases rarely match; retry on the first meaningful word
        if ayahs.is_empty() && query.contains(' ') {
            if let Some(word) = query.split(' ').find(|w| w.chars().count() > 2) {
                debug!(query = %query, word, "No phrase matches, retrying with first word");
                ayahs = self
                    .store
                    .search_ayahs_by_text(word, search.text_type_id, search.limit)
                    .await?;
            }
        }

        Ok(ToolOutput::Records(ayahs.iter().map(ayah_record).collect()))
    }

    async fn search_by_meaning(&self, search: MeaningSearch) -> Result<ToolOutput, BackendError> {
        let embedding = self.embedder.embed(&search.query).await?;
        let ayahs = self
            .store
            .search_ayahs_by_embedding(
                &embedding,
                search.text_type_id,
                search.similarity_threshold,
                search.limit,
            )
            .await?;
        Ok(ToolOutput::Records(ayahs.iter().map(ayah_record).collect()))
    }

    async fn ayah_by_reference(&self, lookup: AyahLookup) -> Result<ToolOutput, BackendError> {
        let ayah = self.store.find_ayah(lookup.ayah_key, lookup.text_type_id).await?;
        Ok(ToolOutput::Record(ayah.as_ref().map(ayah_record)))
    }

    async fn surah_ayahs(&self, surah: SurahAyahs) -> Result<ToolOutput, BackendError> {
        let ayahs = self
            .store
            .surah_ayahs(surah.surah_number, surah.text_type_id, surah.limit)
            .await?;
        Ok(ToolOutput::Records(ayahs.iter().map(ayah_record).collect()))
    }

    async fn search_tafsir(&self, search: TafsirSearch) -> Result<ToolOutput, BackendError> {
        let query = arabic::normalize(&search.query);
        let chunks = self
            .store
            .search_tafsir(&query, search.edition_id, search.limit)
            .await?;
        Ok(ToolOutput::Records(chunks.iter().map(tafsir_record).collect()))
    }

    async fn tafsir_for_ayah(&self, lookup: TafsirLookup) -> Result<ToolOutput, BackendError> {
        let chunks = self
            .store
            .tafsir_for_ayah(lookup.ayah_key, lookup.edition_id)
            .await?;
        Ok(ToolOutput::Records(chunks.iter().map(tafsir_record).collect()))
    }

    async fn surah_info(&self, info: SurahInfo) -> Result<ToolOutput, BackendError> {
        let surah = self.store.surah(info.surah_number).await?;
        Ok(ToolOutput::Record(surah.as_ref().map(surah_record)))
    }
}

#[async_trait]
impl ToolExecutor for QuranTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        catalog::definitions()
    }

    async fn execute(&self, name: &str, arguments: &str) -> Result<ToolOutput, ToolError> {
        let request = ToolRequest::parse(name, arguments)?;
        self.run(request).await
    }
}

fn ayah_record(ayah: &Ayah) -> Value {
    let mut record = json!({
        "ayah_key": ayah.ayah_key,
        "surah": ayah.surah,
        "ayah": ayah.ayah,
        "text": ayah.text,
    });
    if let Some(score) = ayah.score {
        record["similarity_score"] = json!(score);
    }
    record
}

fn tafsir_record(chunk: &TafsirChunk) -> Value {
    let mut record = json!({
        "id": chunk.id,
        "edition_id": chunk.edition_id,
        "surah": chunk.surah,
        "ayah": chunk.ayah,
        "ayah_keys": chunk.ayah_keys,
        "text": chunk.text,
    });
    if let Some(score) = chunk.score {
        record["similarity_score"] = json!(score);
    }
    record
}

fn surah_record(surah: &Surah) -> Value {
    json!({
        "id": surah.id,
        "name_ar": surah.name_ar,
        "name_en": surah.name_en,
        "revelation": surah.revelation,
        "ayah_count": surah.ayah_count,
        "page_start": surah.page_start,
        "page_end": surah.page_end,
    })
}
