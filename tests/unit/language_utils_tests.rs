/*!
 * Tests for language code and script range utilities
 */

use manuscript::language_utils::{
    count_script_chars, get_language_name, language_codes_match, normalize_to_part1_or_part2t,
    normalize_to_part2t, script_ranges,
};

#[test]
fn test_normalize_to_part2t_withVariousCodes_shouldNormalize() {
    assert_eq!(normalize_to_part2t("ja").unwrap(), "jpn");
    assert_eq!(normalize_to_part2t(" KO ").unwrap(), "kor");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert!(normalize_to_part2t("xx").is_err());
    assert!(normalize_to_part2t("").is_err());
}

#[test]
fn test_normalize_to_part1_withThreeLetterCode_shouldPreferTwoLetters() {
    assert_eq!(normalize_to_part1_or_part2t("jpn").unwrap(), "ja");
    assert_eq!(normalize_to_part1_or_part2t("zh").unwrap(), "zh");
}

#[test]
fn test_language_codes_match_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("ja", "jpn"));
    assert!(language_codes_match("ger", "de"));
    assert!(!language_codes_match("ja", "ko"));
    assert!(!language_codes_match("ja", "invalid"));
}

#[test]
fn test_get_language_name_shouldReturnEnglishName() {
    assert_eq!(get_language_name("ko").unwrap(), "Korean");
}

#[test]
fn test_count_script_chars_withHiragana_shouldCountFiveForJapanese() {
    let counts = count_script_chars("<p>あいうえお</p>", "ja");
    assert_eq!(counts.total, 5);
    assert_eq!(counts.by_range["hiragana"], 5);
    assert_eq!(counts.by_range["katakana"], 0);
}

#[test]
fn test_count_script_chars_withHangulOnly_shouldCountZeroForJapanese() {
    assert_eq!(count_script_chars("안녕하세요", "ja").total, 0);
    assert_eq!(count_script_chars("안녕하세요", "ko").total, 5);
}

#[test]
fn test_script_ranges_withLatinLanguage_shouldBeEmpty() {
    assert!(script_ranges("en").is_empty());
    assert!(script_ranges("nonsense").is_empty());
    assert_eq!(script_ranges("ru")[0].name, "cyrillic");
    assert_eq!(count_script_chars("Привет", "ru").total, 6);
}
