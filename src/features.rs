//! Keyword densities, lexical metrics and TF-IDF relevance over page text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use utoipa::ToSchema;

use crate::entities::{KeywordDensity, PageDocument, PageFeatures};

/// Number of n-grams kept per page.
pub const DEFAULT_TOP_KEYWORDS: usize = 50;

/// Vocabulary cap for [`compute_relevance`].
pub const DEFAULT_MAX_RELEVANCE_TERMS: usize = 100;

const MAX_NGRAM: usize = 3;

// Words, keeping inner hyphens and apostrophes attached so "data-driven" or
// "don't" stay one (non-alphabetic, hence discarded) token.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}_]+(?:['’\-][\p{L}\p{N}_]+)*").expect("valid token regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| ENGLISH_STOPWORDS.iter().copied().collect());

const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Lowercase, split into words, keep purely alphabetic non-stopwords.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| token.chars().all(char::is_alphabetic))
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}

/// Counts of every 1..=3-gram, in first-occurrence order (unigrams, then
/// bigrams, then trigrams).
fn ngram_counts(tokens: &[String], max_n: usize) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for n in 1..=max_n {
        for window in tokens.windows(n) {
            let gram = window.join(" ");
            match index.get(&gram) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(gram.clone(), order.len());
                    order.push((gram, 1));
                }
            }
        }
    }
    order
}

/// Density (percent of total tokens) of each 1-3 gram, merged into a single
/// ranking, highest first, truncated to `top_n`.
pub fn keyword_densities(tokens: &[String], top_n: usize) -> Vec<KeywordDensity> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let total = tokens.len() as f64;
    let mut densities: Vec<KeywordDensity> = ngram_counts(tokens, MAX_NGRAM)
        .into_iter()
        .map(|(term, count)| KeywordDensity {
            term,
            density: (count as f64 / total) * 100.0,
        })
        .collect();

    // stable sort keeps first-occurrence order among equal densities
    densities.sort_by(|a, b| b.density.total_cmp(&a.density));
    densities.truncate(top_n);
    densities
}

pub fn average_token_length(tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let total_chars: usize = tokens.iter().map(|t| t.chars().count()).sum();
    round_to(total_chars as f64 / tokens.len() as f64, 2)
}

/// Distinct `@type` names across JSON-LD blocks, sorted.
pub fn schema_types(json_ld: &[serde_json::Value]) -> Vec<String> {
    let mut types = BTreeSet::new();
    for block in json_ld {
        collect_schema_types(block, &mut types);
    }
    types.into_iter().collect()
}

fn collect_schema_types(value: &serde_json::Value, types: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_schema_types(item, types);
            }
        }
        serde_json::Value::Object(map) => {
            match map.get("@type") {
                Some(serde_json::Value::String(t)) => {
                    types.insert(t.clone());
                }
                Some(serde_json::Value::Array(list)) => {
                    types.extend(list.iter().filter_map(|t| t.as_str()).map(str::to_string));
                }
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_schema_types(graph, types);
            }
        }
        _ => {}
    }
}

/// Derive [`PageFeatures`] from a scraped page.
pub fn extract_features(page: &PageDocument) -> PageFeatures {
    extract_features_with(page, DEFAULT_TOP_KEYWORDS)
}

#[tracing::instrument(skip(page), fields(url = %page.url))]
pub fn extract_features_with(page: &PageDocument, top_n: usize) -> PageFeatures {
    tracing::debug!("Extracting features");
    let tokens = tokenize(&page.main_content);

    PageFeatures {
        url: page.url.clone(),
        word_count: page.word_count,
        keyword_densities: keyword_densities(&tokens, top_n),
        avg_word_length: average_token_length(&tokens),
        schema_types_present: schema_types(&page.json_ld),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TermScore {
    pub term: String,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RelevanceScores {
    /// One list per input document, highest score first.
    pub doc_scores: Vec<Vec<TermScore>>,
    /// Selected vocabulary, alphabetical.
    pub top_terms: Vec<String>,
}

/// TF-IDF weighting of 1-3 grams across `documents`.
///
/// Uses smoothed idf (`ln((1 + n) / (1 + df)) + 1`) and L2-normalised rows.
/// The vocabulary is capped at `max_features` terms by corpus frequency. When
/// nothing survives tokenisation every document gets an empty list.
pub fn compute_relevance<S: AsRef<str>>(documents: &[S], max_features: usize) -> RelevanceScores {
    if documents.is_empty() {
        return RelevanceScores::default();
    }

    let per_doc: Vec<HashMap<String, usize>> = documents
        .iter()
        .map(|doc| ngram_counts(&tokenize(doc.as_ref()), MAX_NGRAM).into_iter().collect())
        .collect();

    // corpus frequency and document frequency per term
    let mut corpus: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for counts in &per_doc {
        for (term, &count) in counts {
            let entry = corpus.entry(term.as_str()).or_insert((0, 0));
            entry.0 += count;
            entry.1 += 1;
        }
    }

    if corpus.is_empty() || max_features == 0 {
        tracing::warn!("TF-IDF found no vocabulary across {} documents", documents.len());
        return RelevanceScores {
            doc_scores: vec![Vec::new(); documents.len()],
            top_terms: Vec::new(),
        };
    }

    // BTreeMap iteration is alphabetical, so the stable sort breaks ties alphabetically
    let mut ranked: Vec<(&str, (usize, usize))> = corpus.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));
    ranked.truncate(max_features);
    ranked.sort_by(|a, b| a.0.cmp(b.0));

    let n_docs = documents.len() as f64;
    let idf: Vec<(&str, f64)> = ranked
        .iter()
        .map(|(term, (_, df))| (*term, ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0))
        .collect();

    let doc_scores = per_doc
        .iter()
        .map(|counts| {
            let weights: Vec<(&str, f64)> = idf
                .iter()
                .filter_map(|(term, term_idf)| counts.get(*term).map(|&tf| (*term, tf as f64 * term_idf)))
                .collect();
            let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm == 0.0 {
                return Vec::new();
            }
            let mut scores: Vec<TermScore> = weights
                .into_iter()
                .map(|(term, w)| TermScore {
                    term: term.to_string(),
                    score: round_to(w / norm, 4),
                })
                .filter(|s| s.score > 0.0)
                .collect();
            scores.sort_by(|a, b| b.score.total_cmp(&a.score));
            scores
        })
        .collect();

    RelevanceScores {
        doc_scores,
        top_terms: idf.into_iter().map(|(term, _)| term.to_string()).collect(),
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
