// @module: Approximate token estimation

/// Characters per token for CJK scripts (Hiragana, Katakana, Kanji, Hangul)
const CJK_CHARS_PER_TOKEN: f64 = 1.5;

/// Characters per token for everything else
const OTHER_CHARS_PER_TOKEN: f64 = 4.0;

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{3000}'..='\u{9FFF}' | '\u{AC00}'..='\u{D7AF}')
}

/// Script-aware character count proxy for LLM input size.
///
/// This is an approximation, not a tokenizer: callers must not treat the
/// result as exact.
pub fn estimate_tokens(text: &str) -> usize {
    let (cjk, other) = text.chars().fold((0usize, 0usize), |(cjk, other), c| {
        if is_cjk(c) { (cjk + 1, other) } else { (cjk, other + 1) }
    });

    (cjk as f64 / CJK_CHARS_PER_TOKEN + other as f64 / OTHER_CHARS_PER_TOKEN) as usize
}
