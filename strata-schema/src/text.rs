//! Text term generation
//!
//! Turns a text leaf into posting terms, honoring the field's stop and
//! stem strategies, positional settings and CJK handling. Position
//! sources, weights and the positional toggle are per-position lazy
//! sequences on the specification, indexed modulo their length.

use crate::document::Document;
use crate::specification::{prefixed, Specification};
use crate::types::{StemStrategy, StopStrategy};
use std::collections::HashSet;
use once_cell::sync::Lazy;
use strata_core::FieldType;

/// Terms longer than this are silently skipped.
pub const MAX_TERM_LENGTH: usize = 245;

static ENGLISH_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "he", "in",
        "is", "it", "its", "of", "on", "or", "that", "the", "to", "was", "were", "will", "with",
    ]
    .into_iter()
    .collect()
});

fn is_stopword(language: &str, word: &str) -> bool {
    language.starts_with("en") && ENGLISH_STOPWORDS.contains(word)
}

/// Light English suffix stripper. Other languages pass through.
pub fn stem(language: &str, word: &str) -> String {
    if !language.starts_with("en") || word.len() < 4 {
        return word.to_string();
    }
    if let Some(base) = word.strip_suffix("sses") {
        return format!("{base}ss");
    }
    if let Some(base) = word.strip_suffix("ies") {
        return format!("{base}i");
    }
    if let Some(base) = word.strip_suffix("ing") {
        if base.len() >= 3 {
            return base.to_string();
        }
    }
    if let Some(base) = word.strip_suffix("ed") {
        if base.len() >= 3 {
            return base.to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'   // Hiragana, Katakana
        | '\u{3400}'..='\u{4DBF}' // CJK Extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK Unified Ideographs
        | '\u{AC00}'..='\u{D7AF}' // Hangul syllables
    )
}

/// Split text into word tokens. CJK runs are segmented per the field's
/// settings: overlapping bigrams (`cjk_ngram`), whole runs (`cjk_words`),
/// or single characters otherwise.
fn tokenize(text: &str, cjk_ngram: bool, cjk_words: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut cjk_run: Vec<char> = Vec::new();

    let flush_word = |word: &mut String, tokens: &mut Vec<String>| {
        if !word.is_empty() {
            tokens.push(std::mem::take(word));
        }
    };
    let flush_cjk = |run: &mut Vec<char>, tokens: &mut Vec<String>| {
        if run.is_empty() {
            return;
        }
        if cjk_words {
            tokens.push(run.iter().collect());
        } else if cjk_ngram {
            for c in run.iter() {
                tokens.push(c.to_string());
            }
            for pair in run.windows(2) {
                tokens.push(pair.iter().collect());
            }
        } else {
            for c in run.iter() {
                tokens.push(c.to_string());
            }
        }
        run.clear();
    };

    for c in text.chars() {
        if is_cjk(c) {
            flush_word(&mut word, &mut tokens);
            cjk_run.push(c);
        } else if c.is_alphanumeric() {
            flush_cjk(&mut cjk_run, &mut tokens);
            word.extend(c.to_lowercase());
        } else {
            flush_word(&mut word, &mut tokens);
            flush_cjk(&mut cjk_run, &mut tokens);
        }
    }
    flush_word(&mut word, &mut tokens);
    flush_cjk(&mut cjk_run, &mut tokens);
    tokens
}

fn add(doc: &mut Document, spc: &Specification, prefix: &[u8], token: &[u8], pos: usize, termpos: u32) {
    if token.len() > MAX_TERM_LENGTH {
        return;
    }
    let term = prefixed(token, prefix, FieldType::Text.ctype());
    let weight = spc.weight_at(pos);
    if spc.positions_at(pos) {
        doc.add_posting(term, termpos, weight);
    } else {
        doc.add_term(term, weight);
    }
}

/// Index a text leaf under the given prefix.
///
/// `pos` is the leaf's position in its containing array, which selects
/// the per-position overrides; token positions count up from the
/// position source for that leaf.
pub fn index_text(doc: &mut Document, text: &str, spc: &Specification, prefix: &[u8], pos: usize) {
    let tokens = tokenize(text, spc.cjk_ngram, spc.cjk_words);
    let base = spc.position_at(pos);
    let mut termpos = base;
    for token in tokens {
        let stop = is_stopword(&spc.language, &token);
        match spc.stop_strategy {
            StopStrategy::All if stop => {
                termpos += 1;
                continue;
            }
            _ => {}
        }

        let stem_this = !(stop && spc.stop_strategy == StopStrategy::Stemmed);
        match spc.stem_strategy {
            StemStrategy::None => {
                add(doc, spc, prefix, token.as_bytes(), pos, termpos);
            }
            StemStrategy::Some => {
                add(doc, spc, prefix, token.as_bytes(), pos, termpos);
                if stem_this {
                    let stemmed = stem(&spc.stem_language, &token);
                    if stemmed != token {
                        let mut marked = Vec::with_capacity(stemmed.len() + 1);
                        marked.push(b'Z');
                        marked.extend_from_slice(stemmed.as_bytes());
                        add(doc, spc, prefix, &marked, pos, termpos);
                    }
                }
            }
            StemStrategy::All => {
                let stemmed = if stem_this {
                    stem(&spc.stem_language, &token)
                } else {
                    token.clone()
                };
                add(doc, spc, prefix, stemmed.as_bytes(), pos, termpos);
            }
            StemStrategy::AllZ => {
                let stemmed = if stem_this {
                    stem(&spc.stem_language, &token)
                } else {
                    token.clone()
                };
                let mut marked = Vec::with_capacity(stemmed.len() + 1);
                marked.push(b'Z');
                marked.extend_from_slice(stemmed.as_bytes());
                add(doc, spc, prefix, &marked, pos, termpos);
            }
        }

        if spc.ngram {
            // Edge n-grams for prefix matching, bounded to keep the
            // posting list growth linear.
            let chars: Vec<char> = token.chars().collect();
            for n in 2..chars.len().min(10) {
                let gram: String = chars[..n].iter().collect();
                add(doc, spc, prefix, gram.as_bytes(), pos, termpos);
            }
        }
        termpos += 1;
    }
}
