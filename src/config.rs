use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub search: SearchConfig,
    pub scrape: ScrapeConfig,
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
    /// Requests per minute per client IP. `None` disables rate limiting.
    pub rate_limit_per_minute: Option<u32>,
    pub rate_limit_burst: u32,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub google_api_key: Option<String>,
    pub google_cx: Option<String>,
    /// How many raw results to ask the search API for before filtering.
    pub candidates: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub fetch_timeout: Duration,
    pub render_timeout: Duration,
    pub browserless_url: String,
    pub browserless_token: Option<String>,
    /// Pages with fewer words than this may be retried with the render fetcher.
    pub min_words: usize,
    /// When set, the low word count retry only fires if the page also lacks an H1.
    pub fallback_requires_missing_h1: bool,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub competitor_count: usize,
    pub top_keywords: usize,
    pub prompt_keywords: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_cx: None,
            candidates: 10,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            render_timeout: Duration::from_secs(15),
            browserless_url: "http://localhost:3000".to_string(),
            browserless_token: None,
            min_words: 100,
            fallback_requires_missing_h1: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            competitor_count: 3,
            top_keywords: 50,
            prompt_keywords: 20,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            search: SearchConfig::default(),
            scrape: ScrapeConfig::default(),
            llm: LlmConfig::default(),
            analysis: AnalysisConfig::default(),
            rate_limit_per_minute: None,
            rate_limit_burst: 10,
        }
    }
}

impl Config {
    /// Build the configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        // A missing .env file is fine; real deployments set variables directly
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        let defaults = Config::default();

        Config {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            search: SearchConfig {
                google_api_key: non_empty_var("GOOGLE_API_KEY"),
                google_cx: non_empty_var("GOOGLE_CX"),
                candidates: parse_var("SEARCH_CANDIDATES", defaults.search.candidates),
                timeout: secs_var("SEARCH_TIMEOUT_SECS", defaults.search.timeout),
            },
            scrape: ScrapeConfig {
                fetch_timeout: secs_var("FETCH_TIMEOUT_SECS", defaults.scrape.fetch_timeout),
                render_timeout: secs_var("RENDER_TIMEOUT_SECS", defaults.scrape.render_timeout),
                browserless_url: env::var("BROWSERLESS_URL").unwrap_or(defaults.scrape.browserless_url),
                browserless_token: non_empty_var("BROWSERLESS_TOKEN"),
                min_words: parse_var("SCRAPE_MIN_WORDS", defaults.scrape.min_words),
                fallback_requires_missing_h1: parse_var(
                    "SCRAPE_FALLBACK_REQUIRE_NO_H1",
                    defaults.scrape.fallback_requires_missing_h1,
                ),
            },
            llm: LlmConfig {
                api_key: non_empty_var("OPENAI_API_KEY"),
                model: env::var("OPENAI_MODEL").unwrap_or(defaults.llm.model),
                base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.llm.base_url),
                timeout: secs_var("LLM_TIMEOUT_SECS", defaults.llm.timeout),
            },
            analysis: AnalysisConfig {
                competitor_count: parse_var("COMPETITOR_COUNT", defaults.analysis.competitor_count),
                top_keywords: parse_var("TOP_KEYWORDS", defaults.analysis.top_keywords),
                prompt_keywords: parse_var("PROMPT_KEYWORDS", defaults.analysis.prompt_keywords),
            },
            rate_limit_per_minute: non_empty_var("RATE_LIMIT_PER_MINUTE")
                .and_then(|raw| match raw.parse::<u32>() {
                    Ok(0) => None,
                    Ok(n) => Some(n),
                    Err(e) => {
                        tracing::warn!("Ignoring RATE_LIMIT_PER_MINUTE={:?}: {}", raw, e);
                        None
                    }
                }),
            rate_limit_burst: parse_var("RATE_LIMIT_BURST", defaults.rate_limit_burst),
        }
    }
}

/// Log filter from `RUST_LOG`-style directives. Falls back to `info` when
/// they are missing or don't parse.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Invalid value {:?} for {}: {}. Using default.", raw, key, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn secs_var(key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_var(key, default.as_secs()))
}
