use seo_optimizer::config::log_filter;
use tracing::level_filters::LevelFilter;

#[test]
fn test_log_filter_defaults_to_info() {
    assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(log_filter(Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(
        log_filter(Some("seo_optimizer=notalevel")).max_level_hint(),
        Some(LevelFilter::INFO)
    );
}

#[test]
fn test_log_filter_honours_directives() {
    assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
    assert_eq!(
        log_filter(Some("warn,seo_optimizer::scraper=trace")).max_level_hint(),
        Some(LevelFilter::TRACE)
    );
    assert_eq!(log_filter(Some("error")).max_level_hint(), Some(LevelFilter::ERROR));
}
