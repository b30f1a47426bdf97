use anyhow::{Result, anyhow};
use isolang::Language;
use serde::Serialize;
use std::collections::BTreeMap;

/// Language utilities: ISO 639 code handling and per-language script ranges.
///
/// Script ranges drive both residual-source detection in the verifier and
/// target-script presence checks on unit records.

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// A named, inclusive range of Unicode scalar values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRange {
    pub name: &'static str,
    pub start: char,
    pub end: char,
}

impl ScriptRange {
    const fn new(name: &'static str, start: char, end: char) -> Self {
        Self { name, start, end }
    }

    pub fn contains(&self, c: char) -> bool {
        self.start <= c && c <= self.end
    }
}

const JAPANESE: &[ScriptRange] = &[
    ScriptRange::new("hiragana", '\u{3040}', '\u{309F}'),
    ScriptRange::new("katakana", '\u{30A0}', '\u{30FF}'),
    ScriptRange::new("kanji", '\u{4E00}', '\u{9FFF}'),
];

const CHINESE: &[ScriptRange] = &[
    ScriptRange::new("cjk_unified", '\u{4E00}', '\u{9FFF}'),
    ScriptRange::new("cjk_ext_a", '\u{3400}', '\u{4DBF}'),
];

const KOREAN: &[ScriptRange] = &[
    ScriptRange::new("hangul_syllables", '\u{AC00}', '\u{D7AF}'),
    ScriptRange::new("hangul_jamo", '\u{1100}', '\u{11FF}'),
];

const RUSSIAN: &[ScriptRange] = &[ScriptRange::new("cyrillic", '\u{0400}', '\u{04FF}')];
const ARABIC: &[ScriptRange] = &[ScriptRange::new("arabic", '\u{0600}', '\u{06FF}')];
const HEBREW: &[ScriptRange] = &[ScriptRange::new("hebrew", '\u{0590}', '\u{05FF}')];
const THAI: &[ScriptRange] = &[ScriptRange::new("thai", '\u{0E00}', '\u{0E7F}')];
// Vietnamese is Latin with diacritics; only the extended block is detectable
const VIETNAMESE: &[ScriptRange] = &[ScriptRange::new("latin_ext", '\u{1E00}', '\u{1EFF}')];

/// Character counts per script range, plus their sum
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptCounts {
    pub by_range: BTreeMap<String, usize>,
    pub total: usize,
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
            if let Some((_, terminology)) = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(bibliographic, _)| *bibliographic == normalized_code)
            {
                return Ok((*terminology).to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible,
/// falling back to ISO 639-2/T when no 2-letter code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", part2t))?;

    Ok(lang.to_639_1().map(str::to_string).unwrap_or(part2t))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name for a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Script ranges that identify text written in `code`.
///
/// Languages without a distinctive script (English, French, ...) and
/// unrecognized codes yield an empty slice.
pub fn script_ranges(code: &str) -> &'static [ScriptRange] {
    let key = normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.trim().to_lowercase());

    match key.as_str() {
        "ja" => JAPANESE,
        "zh" => CHINESE,
        "ko" => KOREAN,
        "ru" => RUSSIAN,
        "ar" => ARABIC,
        "he" => HEBREW,
        "th" => THAI,
        "vi" => VIETNAMESE,
        _ => &[],
    }
}

/// Count the characters of `text` that fall in the scripts of language `code`
pub fn count_script_chars(text: &str, code: &str) -> ScriptCounts {
    let ranges = script_ranges(code);
    let mut counts = ScriptCounts::default();

    for range in ranges {
        let count = text.chars().filter(|c| range.contains(*c)).count();
        counts.by_range.insert(range.name.to_string(), count);
        counts.total += count;
    }

    counts
}
