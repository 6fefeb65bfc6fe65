//! Title keyword and structure analysis over a subset of records.
//!
//! Everything here is total: an empty subset, or one whose titles yield no
//! keywords, produces an empty [`TitleInsights`] rather than an error.

use crate::aggregate::Metric;
use crate::rank::{self, SortOrder};
use crate::record::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_MIN_KEYWORD_LEN: usize = 3;

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Spanish and English function words excluded from keyword counts.
pub static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // es
        "de", "la", "el", "en", "y", "a", "que", "es", "se", "no", "te", "lo", "le", "da", "su",
        "por", "son", "con", "una", "para", "al", "como", "mas", "pero", "sus", "ya", "o", "este",
        "si", "porque", "esta", "entre", "cuando", "muy", "sin", "sobre", "tambien", "me", "hasta",
        "hay", "donde", "quien", "desde", "todo", "nos", "durante", "todos", "uno", "les", "ni",
        "contra", "otros", "ese", "eso", "ante", "ellos", "e", "esto", "mi", "antes", "algunos",
        "unos", "yo", "del", "las", "un",
        // en
        "any", "can", "had", "her", "was", "one", "our", "out", "day", "get", "has", "him", "his",
        "how", "man", "new", "now", "old", "see", "two", "way", "who", "boy", "did", "its", "let",
        "put", "say", "she", "too", "use", "an", "the", "and", "or", "in", "on", "at", "for",
        "with", "as", "by", "from", "about", "into", "through", "after", "before", "over", "under",
        "above", "below", "to", "up", "down", "off", "again", "further", "then", "once", "here",
        "there", "when", "where", "why", "all", "both", "each", "few", "more", "most", "other",
        "some", "such", "nor", "not", "only", "own", "same", "so", "than", "very", "s", "t",
        "will", "just", "don", "should",
    ]
    .into_iter()
    .collect()
});

/// Matched as case-insensitive substrings.
pub const POWER_WORDS: &[&str] = &[
    "secreto", "mejor", "increible", "facil", "rapido", "gratis", "nuevo", "ultimate", "perfect",
    "amazing", "best", "free", "easy", "quick", "secret",
];

/// Pattern counts above this many titles unlock their templates.
const TEMPLATE_THRESHOLD: usize = 5;
const MAX_TEMPLATES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TitlePatterns {
    pub titles: usize,
    pub questions: usize,
    pub numbers: usize,
    pub power_words: usize,
    pub mean_length: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TitleInsights {
    pub top_keywords: Vec<KeywordCount>,
    pub patterns: TitlePatterns,
    pub optimal_title_length: f64,
    pub templates: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct TitleOpts {
    pub min_keyword_len: usize,
    pub top_records: usize,
    pub top_keywords: usize,
}

impl Default for TitleOpts {
    fn default() -> Self {
        Self { min_keyword_len: DEFAULT_MIN_KEYWORD_LEN, top_records: 20, top_keywords: 10 }
    }
}

/// Keyword frequencies, most frequent first. Equal counts keep the order in
/// which the keywords first appeared.
pub fn extract_keywords<'a, I>(titles: I, min_len: usize) -> Vec<KeywordCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for title in titles {
        let lower = title.to_lowercase();
        let cleaned = RE_NON_WORD.replace_all(&lower, " ");
        for word in cleaned.split_whitespace() {
            if word.chars().count() < min_len || STOP_WORDS.contains(word) {
                continue;
            }
            let first_seen = counts.len();
            counts.entry(word.to_string()).or_insert((0, first_seen)).0 += 1;
        }
    }
    let mut out: Vec<(String, usize, usize)> =
        counts.into_iter().map(|(k, (count, seen))| (k, count, seen)).collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    out.into_iter().map(|(keyword, count, _)| KeywordCount { keyword, count }).collect()
}

pub fn title_patterns<'a, I>(titles: I) -> TitlePatterns
where
    I: IntoIterator<Item = &'a str>,
{
    let mut p = TitlePatterns::default();
    let mut total_len = 0usize;
    for title in titles {
        p.titles += 1;
        total_len += title.chars().count();
        if title.contains('?') {
            p.questions += 1;
        }
        if RE_DIGITS.is_match(title) {
            p.numbers += 1;
        }
        let lower = title.to_lowercase();
        if POWER_WORDS.iter().any(|w| lower.contains(w)) {
            p.power_words += 1;
        }
    }
    if p.titles > 0 {
        p.mean_length = total_len as f64 / p.titles as f64;
    }
    p
}

/// Template suggestions from the rule table, in table order, capped at three.
pub fn title_templates(patterns: &TitlePatterns, top_keyword: Option<&str>) -> Vec<String> {
    let mut templates = Vec::new();
    if patterns.questions > TEMPLATE_THRESHOLD {
        templates.push("¿Cómo [ACCIÓN] [TEMA] en [TIEMPO]?".to_string());
        templates.push("¿Por qué [TEMA] es [ADJETIVO]?".to_string());
    }
    if patterns.numbers > TEMPLATE_THRESHOLD {
        templates.push("[NÚMERO] [TEMA] que [BENEFICIO]".to_string());
        templates.push("[NÚMERO] Secretos de [TEMA]".to_string());
    }
    if let Some(kw) = top_keyword {
        templates.push(format!("Cómo {kw} [TEMA] como un Profesional"));
        templates.push(format!("La Guía Definitiva de {kw}"));
    }
    templates.truncate(MAX_TEMPLATES);
    templates
}

/// Full analysis of the given subset, taken as-is.
pub fn analyze_subset<'a, I>(records: I, opts: &TitleOpts) -> TitleInsights
where
    I: IntoIterator<Item = &'a Record>,
{
    let titles: Vec<&str> = records.into_iter().map(|r| r.title.as_str()).collect();
    if titles.is_empty() {
        return TitleInsights::default();
    }
    let mut keywords = extract_keywords(titles.iter().copied(), opts.min_keyword_len);
    if keywords.is_empty() {
        return TitleInsights::default();
    }
    keywords.truncate(opts.top_keywords);
    let patterns = title_patterns(titles.iter().copied());
    let templates = title_templates(&patterns, keywords.first().map(|k| k.keyword.as_str()));
    TitleInsights {
        optimal_title_length: patterns.mean_length,
        top_keywords: keywords,
        patterns,
        templates,
    }
}

/// Analyze the `opts.top_records` best records by rate score.
pub fn seo_recommendations<'a, I>(records: I, opts: &TitleOpts) -> TitleInsights
where
    I: IntoIterator<Item = &'a Record>,
{
    let top = rank::top_n(records, Metric::RateScore, SortOrder::Descending, opts.top_records);
    analyze_subset(top, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_words_and_short_tokens_are_dropped() {
        let kws = extract_keywords(["El secreto de la productividad", "Un día en la vida"], 3);
        let words: Vec<&str> = kws.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(words, vec!["secreto", "productividad", "día", "vida"]);
    }

    #[test]
    fn punctuation_splits_tokens() {
        let kws = extract_keywords(["¡Finanzas!¿ahorro?"], 3);
        let words: Vec<&str> = kws.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(words, vec!["finanzas", "ahorro"]);
    }

    #[test]
    fn power_word_counted_once_per_title() {
        let p = title_patterns(["El mejor secreto gratis"]);
        assert_eq!(p.power_words, 1);
    }
}
