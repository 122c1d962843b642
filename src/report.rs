//! SEO report generation through the reasoning service.

use serde::Serialize;
use std::sync::Arc;

use crate::entities::{PageDocument, PageFeatures};
use crate::llm::ReasoningService;

/// Keyword/density pairs included per page in the prompt.
pub const DEFAULT_PROMPT_KEYWORDS: usize = 20;

/// Shape the reasoning service is asked to fill in.
const REPORT_SCHEMA: &str = r#"{
  "node_1_keywords": {
    "performance_score": 85,
    "must_have_keywords": ["keyword 1", "keyword 2", "keyword 3", "keyword 4"],
    "trending_keywords": ["trending 1", "trending 2", "trending 3", "trending 4"]
  },
  "node_2_competitors": {
    "top_competitors": [
      {
        "rank": 1,
        "url": "https://example.com/course",
        "name": "University of Example",
        "top_keywords": ["keyword a", "keyword b"],
        "differentiator": "Focuses heavily on career placements."
      }
    ]
  },
  "node_3_content_rewrite": {
    "title": "Rewritten page title",
    "empower_paragraph": "A rewritten two sentence introduction.",
    "why_choose_points": [
      "Point one: one sentence.",
      "Point two: one sentence."
    ],
    "seo_score": 92
  },
  "node_5_metadata": {
    "meta_title": "Optimized meta title",
    "meta_description": "Optimized meta description, at most 155 characters.",
    "meta_keywords": ["keyword 1", "keyword 2", "keyword 3", "keyword 4"]
  },
  "final_scores": {
    "final_seo_score": 92,
    "final_readability": 89,
    "engagement_lift": 67,
    "avg_rank_improvement": 43
  }
}"#;

/// Outcome of report generation. The generated payload is passed through as
/// is; only "a JSON object without an `error` field" is checked.
#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    Generated(serde_json::Value),
    Error(String),
}

impl Report {
    pub fn is_error(&self) -> bool {
        matches!(self, Report::Error(_))
    }

    /// JSON form: the payload itself, or `{"error": "..."}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Report::Generated(value) => value.clone(),
            Report::Error(message) => serde_json::json!({ "error": message }),
        }
    }
}

/// Per-page digest sent to the reasoning service.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageSummary {
    pub url: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Option<String>,
    pub word_count: usize,
    pub schema_types: Vec<String>,
    pub top_keywords_with_density: Vec<(String, f64)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub distinctive_terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct CompetitorEntry<'a> {
    rank: usize,
    url: &'a str,
    title: Option<&'a str>,
    summary: PageSummary,
}

pub fn summarize_page(page: &PageDocument, features: &PageFeatures, top_n: usize) -> PageSummary {
    PageSummary {
        url: page.url.clone(),
        title: page.title.clone(),
        meta_description: page.meta_description.clone(),
        h1: page.h1.clone(),
        word_count: features.word_count,
        schema_types: features.schema_types_present.clone(),
        top_keywords_with_density: features
            .keyword_densities
            .iter()
            .take(top_n)
            .map(|k| (k.term.clone(), k.density))
            .collect(),
        distinctive_terms: Vec::new(),
    }
}

/// Inputs for one report request. `distinctive_terms` is optional and, when
/// present, holds the target's terms first followed by each competitor's.
pub struct ReportInput<'a> {
    pub target_page: &'a PageDocument,
    pub target_features: &'a PageFeatures,
    pub competitor_pages: &'a [PageDocument],
    pub competitor_features: &'a [PageFeatures],
    pub distinctive_terms: Option<&'a [Vec<String>]>,
}

#[derive(Clone)]
pub struct ReportGenerator {
    service: Arc<dyn ReasoningService>,
    prompt_keywords: usize,
}

impl ReportGenerator {
    pub fn new(service: Arc<dyn ReasoningService>) -> Self {
        Self {
            service,
            prompt_keywords: DEFAULT_PROMPT_KEYWORDS,
        }
    }

    pub fn with_prompt_keywords(mut self, prompt_keywords: usize) -> Self {
        self.prompt_keywords = prompt_keywords;
        self
    }

    /// Compare the target page against its competitors. Never fails: every
    /// problem is returned as [`Report::Error`].
    pub async fn generate(
        &self,
        target_page: &PageDocument,
        target_features: &PageFeatures,
        competitor_pages: &[PageDocument],
        competitor_features: &[PageFeatures],
    ) -> Report {
        self.generate_with(ReportInput {
            target_page,
            target_features,
            competitor_pages,
            competitor_features,
            distinctive_terms: None,
        })
        .await
    }

    #[tracing::instrument(skip(self, input), fields(target = %input.target_page.url))]
    pub async fn generate_with(&self, input: ReportInput<'_>) -> Report {
        tracing::info!("Generating report for target: {}", input.target_page.url);

        let user_prompt = match self.build_user_prompt(&input) {
            Ok(prompt) => prompt,
            Err(e) => return Report::Error(format!("Failed to build report prompt: {}", e)),
        };
        let system_prompt = build_system_prompt();

        let raw = match self.service.complete(&system_prompt, &user_prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error calling reasoning service: {}", e);
                return Report::Error(format!("Failed to get LLM response: {}", e));
            }
        };

        let report = parse_report(&raw);
        match &report {
            Report::Generated(_) => tracing::info!("Generated report for {}", input.target_page.url),
            Report::Error(e) => tracing::error!("Report for {} unusable: {}", input.target_page.url, e),
        }
        report
    }

    pub fn build_user_prompt(&self, input: &ReportInput<'_>) -> Result<String, serde_json::Error> {
        let terms_for = |index: usize| -> Vec<String> {
            input
                .distinctive_terms
                .and_then(|all| all.get(index))
                .cloned()
                .unwrap_or_default()
        };

        let mut target_summary = summarize_page(input.target_page, input.target_features, self.prompt_keywords);
        target_summary.distinctive_terms = terms_for(0);

        // zip pairs pages with features positionally and stops at the shorter list
        let competitors: Vec<CompetitorEntry<'_>> = input
            .competitor_pages
            .iter()
            .zip(input.competitor_features.iter())
            .enumerate()
            .map(|(i, (page, features))| {
                let mut summary = summarize_page(page, features, self.prompt_keywords);
                summary.distinctive_terms = terms_for(i + 1);
                CompetitorEntry {
                    rank: i + 1,
                    url: &page.url,
                    title: page.title.as_deref(),
                    summary,
                }
            })
            .collect();

        Ok(format!(
            "Here is the data for analysis:\n\n\
             **Target Page:**\n{}\n\n\
             **Competitor Data:**\n{}\n\n\
             Please provide the full SEO analysis in the required JSON format.\n\
             Fill in node_1_keywords, node_2_competitors, node_3_content_rewrite, node_5_metadata and the final_scores block.",
            serde_json::to_string_pretty(&target_summary)?,
            serde_json::to_string_pretty(&competitors)?,
        ))
    }
}

pub fn build_system_prompt() -> String {
    format!(
        "You are an expert SEO analyst. Compare a 'Target' page against its 'Competitors' \
         for the same search query and produce an SEO report.\n\n\
         RULES:\n\
         1. Base all analysis ONLY on the data provided.\n\
         2. For 'node_1_keywords', list must-have and trending keywords and estimate a performance_score (0-100).\n\
         3. For 'node_2_competitors', cover each competitor: 'name' is its page title, 'top_keywords' are its 2-3 most important keywords, 'differentiator' is one sentence.\n\
         4. For 'node_3_content_rewrite', rewrite the target's content: a new title, a two sentence intro paragraph, 3-4 'why choose' points, and an estimated seo_score (0-100).\n\
         5. For 'node_5_metadata', give an optimized meta title, meta description and 4 meta keywords.\n\
         6. For 'final_scores', estimate all 4 scores (0-100) for the target page.\n\
         7. Respond with a single valid JSON object with exactly this structure:\n{}",
        REPORT_SCHEMA
    )
}

/// Turn raw service output into a [`Report`]. Tolerates Markdown code fences
/// and chatter around the JSON object.
pub fn parse_report(raw: &str) -> Report {
    let json_str = strip_code_fence(raw.trim());

    let value = match serde_json::from_str::<serde_json::Value>(json_str) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Report is not valid JSON ({}); trying the outermost object", e);
            let extracted = match (json_str.find('{'), json_str.rfind('}')) {
                (Some(start), Some(end)) if start < end => serde_json::from_str(&json_str[start..=end]).ok(),
                _ => None,
            };
            match extracted {
                Some(value) => value,
                None => return Report::Error(format!("LLM response was not valid JSON: {}", e)),
            }
        }
    };

    let serde_json::Value::Object(map) = value else {
        return Report::Error("LLM response was not a JSON object".to_string());
    };

    if let Some(error) = map.get("error") {
        let message = match error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Report::Error(format!("LLM reported an error: {}", message));
    }

    Report::Generated(serde_json::Value::Object(map))
}

fn strip_code_fence(text: &str) -> &str {
    if text.starts_with("```") {
        text.trim_start_matches("```json")
            .trim_start_matches("```")
            .trim()
            .trim_end_matches("```")
            .trim()
    } else {
        text
    }
}
