//! Typed tool arguments.
//!
//! The model sends each call as a tool name plus a JSON-encoded argument
//! object. [`ToolRequest::parse`] turns that pair into one closed variant with
//! defaults filled in and limits clamped, so handlers never see raw JSON.

use quranlens_core::error::ToolError;
use quranlens_core::quran::{AyahKey, SURAH_COUNT};
use quranlens_core::tool::ToolName;
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const DEFAULT_TEXT_TYPE_ID: i32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_KEYWORD_RESULTS: u32 = 50;
pub const MAX_MEANING_RESULTS: u32 = 30;
pub const MAX_SURAH_AYAHS: u32 = 286;
pub const MAX_TAFSIR_RESULTS: u32 = 50;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// One parsed tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    SearchQuranByKeywords(KeywordSearch),
    SearchQuranByMeaning(MeaningSearch),
    GetAyahByReference(AyahLookup),
    GetSurahAyahs(SurahAyahs),
    SearchTafsir(TafsirSearch),
    GetTafsirForAyah(TafsirLookup),
    GetSurahInfo(SurahInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSearch {
    pub query: String,
    pub text_type_id: i32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeaningSearch {
    pub query: String,
    pub text_type_id: i32,
    pub limit: u32,
    pub similarity_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AyahLookup {
    pub ayah_key: AyahKey,
    pub text_type_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurahAyahs {
    pub surah_number: u16,
    pub text_type_id: i32,
    /// `None` returns the whole surah
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TafsirSearch {
    pub query: String,
    pub edition_id: Option<i32>,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TafsirLookup {
    pub ayah_key: AyahKey,
    pub edition_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurahInfo {
    pub surah_number: u16,
}

// Wire shapes, exactly as the model sends them.

#[derive(Deserialize)]
struct QueryArgs {
    query: String,
    text_type_id: Option<i32>,
    limit: Option<i64>,
    similarity_threshold: Option<f64>,
    edition_id: Option<i32>,
}

#[derive(Deserialize)]
struct AyahKeyArgs {
    ayah_key: String,
    text_type_id: Option<i32>,
    edition_id: Option<i32>,
}

#[derive(Deserialize)]
struct SurahArgs {
    surah_number: i64,
    text_type_id: Option<i32>,
    limit: Option<i64>,
}

impl ToolRequest {
    /// Parse a raw tool call.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let tool: ToolName = name.parse()?;
        let request = match tool {
            ToolName::SearchQuranByKeywords => {
                let args: QueryArgs = decode(tool, arguments)?;
                ToolRequest::SearchQuranByKeywords(KeywordSearch {
                    query: non_empty_query(tool, args.query)?,
                    text_type_id: args.text_type_id.unwrap_or(DEFAULT_TEXT_TYPE_ID),
                    limit: clamp_limit(args.limit, DEFAULT_LIMIT, MAX_KEYWORD_RESULTS),
                })
            }
            ToolName::SearchQuranByMeaning => {
                let args: QueryArgs = decode(tool, arguments)?;
                let similarity_threshold = args
                    .similarity_threshold
                    .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
                if !(0.0..=1.0).contains(&similarity_threshold) {
                    return Err(ToolError::invalid(
                        tool.as_str(),
                        format!("similarity_threshold must be between 0 and 1, got {similarity_threshold}"),
                    ));
                }
                ToolRequest::SearchQuranByMeaning(MeaningSearch {
                    query: non_empty_query(tool, args.query)?,
                    text_type_id: args.text_type_id.unwrap_or(DEFAULT_TEXT_TYPE_ID),
                    limit: clamp_limit(args.limit, DEFAULT_LIMIT, MAX_MEANING_RESULTS),
                    similarity_threshold,
                })
            }
            ToolName::GetAyahByReference => {
                let args: AyahKeyArgs = decode(tool, arguments)?;
                ToolRequest::GetAyahByReference(AyahLookup {
                    ayah_key: ayah_key(tool, &args.ayah_key)?,
                    text_type_id: args.text_type_id.unwrap_or(DEFAULT_TEXT_TYPE_ID),
                })
            }
            ToolName::GetSurahAyahs => {
                let args: SurahArgs = decode(tool, arguments)?;
                ToolRequest::GetSurahAyahs(SurahAyahs {
                    surah_number: surah_number(tool, args.surah_number)?,
                    text_type_id: args.text_type_id.unwrap_or(DEFAULT_TEXT_TYPE_ID),
                    limit: args.limit.map(|l| clamp(l, MAX_SURAH_AYAHS)),
                })
            }
            ToolName::SearchTafsir => {
                let args: QueryArgs = decode(tool, arguments)?;
                ToolRequest::SearchTafsir(TafsirSearch {
                    query: non_empty_query(tool, args.query)?,
                    edition_id: args.edition_id,
                    limit: clamp_limit(args.limit, DEFAULT_LIMIT, MAX_TAFSIR_RESULTS),
                })
            }
            ToolName::GetTafsirForAyah => {
                let args: AyahKeyArgs = decode(tool, arguments)?;
                ToolRequest::GetTafsirForAyah(TafsirLookup {
                    ayah_key: ayah_key(tool, &args.ayah_key)?,
                    edition_id: args.edition_id,
                })
            }
            ToolName::GetSurahInfo => {
                let args: SurahArgs = decode(tool, arguments)?;
                ToolRequest::GetSurahInfo(SurahInfo {
                    surah_number: surah_number(tool, args.surah_number)?,
                })
            }
        };
        Ok(request)
    }

    pub fn tool(&self) -> ToolName {
        match self {
            ToolRequest::SearchQuranByKeywords(_) => ToolName::SearchQuranByKeywords,
            ToolRequest::SearchQuranByMeaning(_) => ToolName::SearchQuranByMeaning,
            ToolRequest::GetAyahByReference(_) => ToolName::GetAyahByReference,
            ToolRequest::GetSurahAyahs(_) => ToolName::GetSurahAyahs,
            ToolRequest::SearchTafsir(_) => ToolName::SearchTafsir,
            ToolRequest::GetTafsirForAyah(_) => ToolName::GetTafsirForAyah,
            ToolRequest::GetSurahInfo(_) => ToolName::GetSurahInfo,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: ToolName, arguments: &str) -> Result<T, ToolError> {
    // Some models send "" instead of "{}" for calls without arguments
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments).map_err(|e| ToolError::invalid(tool.as_str(), e.to_string()))
}

fn non_empty_query(tool: ToolName, query: String) -> Result<String, ToolError> {
    if query.trim().is_empty() {
        return Err(ToolError::invalid(tool.as_str(), "query must not be empty"));
    }
    Ok(query)
}

fn ayah_key(tool: ToolName, raw: &str) -> Result<AyahKey, ToolError> {
    raw.parse()
        .map_err(|e: quranlens_core::quran::InvalidAyahKey| ToolError::invalid(tool.as_str(), e.to_string()))
}

fn surah_number(tool: ToolName, raw: i64) -> Result<u16, ToolError> {
    u16::try_from(raw)
        .ok()
        .filter(|n| (1..=SURAH_COUNT).contains(n))
        .ok_or_else(|| {
            ToolError::invalid(
                tool.as_str(),
                format!("surah_number must be between 1 and {SURAH_COUNT}, got {raw}"),
            )
        })
}

fn clamp_limit(limit: Option<i64>, default: u32, max: u32) -> u32 {
    limit.map_or(default, |l| clamp(l, max))
}

fn clamp(limit: i64, max: u32) -> u32 {
    limit.clamp(1, i64::from(max)) as u32
}
