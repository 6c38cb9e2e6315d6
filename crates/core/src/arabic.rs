//! Arabic text normalization.
//!
//! Applied to search queries and embedding inputs so they line up with the
//! normalized text columns in the store.

/// Normalize Arabic text for matching.
///
/// - strips tashkeel (U+064B..=U+065F), superscript alef (U+0670) and tatweel (U+0640)
/// - folds alef variants (آ أ إ) to bare alef
/// - folds taa marbuta (ة) to haa (ه)
/// - folds alef maqsura (ى) to yaa (ي)
/// - collapses runs of whitespace and trims
pub fn normalize(text: &str) -> String {
    let folded = text.chars().filter_map(|c| match c {
        '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}' => None,
        'آ' | 'أ' | 'إ' => Some('ا'),
        'ة' => Some('ه'),
        'ى' => Some('ي'),
        other => Some(other),
    });

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in folded {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}
