//! Quran records returned by the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of surahs in the mushaf.
pub const SURAH_COUNT: u16 = 114;

/// A verse reference such as `2:255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AyahKey {
    pub surah: u16,
    pub ayah: u16,
}

impl AyahKey {
    pub fn new(surah: u16, ayah: u16) -> Result<Self, InvalidAyahKey> {
        if !(1..=SURAH_COUNT).contains(&surah) {
            return Err(InvalidAyahKey(format!("surah {surah} is outside 1..={SURAH_COUNT}")));
        }
        if ayah == 0 {
            return Err(InvalidAyahKey("ayah numbers start at 1".into()));
        }
        Ok(Self { surah, ayah })
    }
}

impl fmt::Display for AyahKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.surah, self.ayah)
    }
}

/// Why a string could not be read as an [`AyahKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ayah key: {0}")]
pub struct InvalidAyahKey(pub String);

impl FromStr for AyahKey {
    type Err = InvalidAyahKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (surah, ayah) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| InvalidAyahKey(format!("'{s}' is not in SURAH:AYAH form")))?;
        let surah = surah
            .trim()
            .parse::<u16>()
            .map_err(|_| InvalidAyahKey(format!("'{surah}' is not a surah number")))?;
        let ayah = ayah
            .trim()
            .parse::<u16>()
            .map_err(|_| InvalidAyahKey(format!("'{ayah}' is not an ayah number")))?;
        Self::new(surah, ayah)
    }
}

/// One verse in one text edition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ayah {
    pub ayah_key: String,
    pub surah: i32,
    pub ayah: i32,
    pub text: String,
    /// Match score from a text or vector search; absent for direct lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A passage of commentary attached to one or more verses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TafsirChunk {
    pub id: i64,
    pub edition_id: i32,
    pub surah: i32,
    pub ayah: i32,
    pub ayah_keys: Vec<String>,
    pub chunk_idx: i32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Surah metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surah {
    pub id: i32,
    pub name_ar: String,
    pub name_en: String,
    /// "meccan" or "medinan"
    pub revelation: String,
    pub ayah_count: i32,
    pub page_start: Option<i32>,
    pub page_end: Option<i32>,
}
