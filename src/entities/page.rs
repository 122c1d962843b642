use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// A single `<a href>` found on a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Link {
    pub text: String,
    pub href: String,
}

/// Normalized record of one fetched and parsed page.
///
/// Either the content fields are populated or `error` is set, never both.
/// Build failures through [`PageDocument::failed`] so the content stays empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageDocument {
    pub url: String,
    pub status_code: u16,

    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub canonical_url: Option<String>,

    /// First non-empty `<h1>`.
    pub h1: Option<String>,
    /// `"h1"` .. `"h6"` mapped to heading texts in document order.
    pub headings: BTreeMap<String, Vec<String>>,
    pub main_content: String,
    pub word_count: usize,

    #[schema(value_type = Vec<Object>)]
    pub json_ld: Vec<serde_json::Value>,
    pub links: Vec<Link>,
    pub image_alt_texts: Vec<String>,

    /// Set when scraping failed.
    pub error: Option<String>,
}

impl PageDocument {
    pub fn failed(url: impl Into<String>, status_code: u16, error: impl Into<String>) -> Self {
        PageDocument {
            url: url.into(),
            status_code,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// One n-gram and its share of the page's cleaned tokens, in percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KeywordDensity {
    pub term: String,
    pub density: f64,
}

/// Lexical and structural summary derived from a [`PageDocument`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageFeatures {
    pub url: String,
    pub word_count: usize,
    /// Top n-grams (1 to 3 words), highest density first.
    pub keyword_densities: Vec<KeywordDensity>,
    pub avg_word_length: f64,
    /// Distinct structured-data `@type` names, sorted.
    pub schema_types_present: Vec<String>,
}

impl PageFeatures {
    /// Zero-valued features for a page that could not be scraped.
    pub fn placeholder(url: impl Into<String>) -> Self {
        PageFeatures {
            url: url.into(),
            word_count: 0,
            keyword_densities: Vec::new(),
            avg_word_length: 0.0,
            schema_types_present: Vec::new(),
        }
    }
}
