//! Tool contract: the fixed retrieval catalog the agent may call.
//!
//! Tools are read-only lookups over verses, commentary and surah metadata.
//! The set is closed: [`ToolName`] enumerates every tool, and anything else
//! the model asks for is an [`ToolError::UnknownTool`].

use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// Sentinel status sent to the model when a search matched nothing.
pub const NO_RESULTS_STATUS: &str = "no_results";
/// Sentinel status sent to the model when a lookup found no record.
pub const NOT_FOUND_STATUS: &str = "not_found";

const NO_RESULTS_MESSAGE: &str =
    "لم يتم العثور على نتائج لهذا البحث. يمكنك المحاولة بكلمات مختلفة أو استخدام البحث الدلالي.";
const NOT_FOUND_MESSAGE: &str = "لم يتم العثور على البيانات المطلوبة.";

/// Every tool in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SearchQuranByKeywords,
    SearchQuranByMeaning,
    GetAyahByReference,
    GetSurahAyahs,
    SearchTafsir,
    GetTafsirForAyah,
    GetSurahInfo,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        ToolName::SearchQuranByKeywords,
        ToolName::SearchQuranByMeaning,
        ToolName::GetAyahByReference,
        ToolName::GetSurahAyahs,
        ToolName::SearchTafsir,
        ToolName::GetTafsirForAyah,
        ToolName::GetSurahInfo,
    ];

    /// The wire name the model uses.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SearchQuranByKeywords => "search_quran_by_keywords",
            ToolName::SearchQuranByMeaning => "search_quran_by_meaning",
            ToolName::GetAyahByReference => "get_ayah_by_reference",
            ToolName::GetSurahAyahs => "get_surah_ayahs",
            ToolName::SearchTafsir => "search_tafsir",
            ToolName::GetTafsirForAyah => "get_tafsir_for_ayah",
            ToolName::GetSurahInfo => "get_surah_info",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// A normalized tool result: a list of records, or one record that may be absent.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Records(Vec<Value>),
    Record(Option<Value>),
}

impl ToolOutput {
    /// How many records the tool produced.
    pub fn result_count(&self) -> usize {
        match self {
            ToolOutput::Records(records) => records.len(),
            ToolOutput::Record(record) => usize::from(record.is_some()),
        }
    }

    /// The full result as JSON.
    pub fn to_value(&self) -> Value {
        match self {
            ToolOutput::Records(records) => Value::Array(records.clone()),
            ToolOutput::Record(Some(record)) => record.clone(),
            ToolOutput::Record(None) => Value::Null,
        }
    }

    /// The payload the model sees: sentinels for empty results, lists cut to `max_items`.
    pub fn for_model(&self, max_items: usize) -> Value {
        match self {
            ToolOutput::Records(records) if records.is_empty() => json!({
                "status": NO_RESULTS_STATUS,
                "message": NO_RESULTS_MESSAGE,
            }),
            ToolOutput::Records(records) => {
                Value::Array(records.iter().take(max_items).cloned().collect())
            }
            ToolOutput::Record(None) => json!({
                "status": NOT_FOUND_STATUS,
                "message": NOT_FOUND_MESSAGE,
            }),
            ToolOutput::Record(Some(record)) => record.clone(),
        }
    }
}

/// The tool catalog as seen by the agent loop.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Definitions advertised to the model on every turn.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run `name` with its JSON-encoded `arguments`.
    async fn execute(&self, name: &str, arguments: &str) -> Result<ToolOutput, ToolError>;
}
