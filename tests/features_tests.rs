use seo_optimizer::entities::PageDocument;
use seo_optimizer::features::{
    average_token_length, compute_relevance, extract_features, extract_features_with, keyword_densities,
    schema_types, tokenize,
};
use serde_json::json;

fn tokens(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[test]
fn test_tokenize_drops_stopwords_numbers_and_punctuation() {
    let result = tokenize("The MSc in Data-Science, 2024: students don't learn Python!");
    assert_eq!(result, vec!["msc", "students", "learn", "python"]);
}

#[test]
fn test_keyword_densities_merge_ngram_orders() {
    let toks = tokens(&["data", "science", "data", "science"]);
    let densities = keyword_densities(&toks, 50);

    let lookup = |term: &str| densities.iter().find(|d| d.term == term).map(|d| d.density);
    assert_eq!(lookup("data"), Some(50.0));
    assert_eq!(lookup("science"), Some(50.0));
    assert_eq!(lookup("data science"), Some(50.0));
    assert_eq!(lookup("science data"), Some(25.0));
    assert_eq!(lookup("data science data"), Some(25.0));

    // highest first, ties in first-occurrence order
    assert_eq!(densities[0].term, "data");
    assert_eq!(densities[1].term, "science");
    assert_eq!(densities[2].term, "data science");
}

#[test]
fn test_keyword_densities_truncates_and_handles_empty() {
    let toks = tokens(&["alpha", "beta", "gamma", "delta"]);
    assert_eq!(keyword_densities(&toks, 3).len(), 3);
    assert!(keyword_densities(&[], 50).is_empty());
}

#[test]
fn test_average_token_length() {
    assert_eq!(average_token_length(&tokens(&["ab", "abcd"])), 3.0);
    assert_eq!(average_token_length(&tokens(&["a", "bb", "bb"])), 1.67);
    assert_eq!(average_token_length(&[]), 0.0);
}

#[test]
fn test_schema_types_collects_nested_and_listed_types() {
    let blocks = vec![
        json!({"@type": "Course"}),
        json!([{"@type": ["Organization", "CollegeOrUniversity"]}, {"@type": "Course"}]),
        json!({"@graph": [{"@type": "WebPage"}, {"name": "no type"}]}),
        json!("not an object"),
    ];
    assert_eq!(
        schema_types(&blocks),
        vec!["CollegeOrUniversity", "Course", "Organization", "WebPage"]
    );
}

#[test]
fn test_extract_features_from_page() {
    let page = PageDocument {
        url: "https://example.edu/msc-ds".to_string(),
        main_content: "Data science students learn data science.".to_string(),
        word_count: 6,
        json_ld: vec![json!({"@type": "Course"})],
        ..Default::default()
    };

    let features = extract_features(&page);
    assert_eq!(features.url, page.url);
    assert_eq!(features.word_count, 6);
    assert_eq!(features.schema_types_present, vec!["Course"]);
    assert_eq!(features.keyword_densities[0].term, "data");
    // 2 of 6 cleaned tokens
    assert!((features.keyword_densities[0].density - 100.0 / 3.0).abs() < 1e-9);
    assert!(features.avg_word_length > 0.0);

    let limited = extract_features_with(&page, 2);
    assert_eq!(limited.keyword_densities.len(), 2);
}

#[test]
fn test_extract_features_empty_content() {
    let page = PageDocument {
        url: "https://example.com".to_string(),
        ..Default::default()
    };
    let features = extract_features(&page);
    assert!(features.keyword_densities.is_empty());
    assert_eq!(features.avg_word_length, 0.0);
    assert!(features.schema_types_present.is_empty());
}

#[test]
fn test_compute_relevance_favours_distinctive_terms() {
    let docs = [
        "data science course london",
        "data science course manchester",
        "data science course edinburgh",
    ];
    let scores = compute_relevance(&docs, 100);

    assert_eq!(scores.doc_scores.len(), 3);
    assert!(scores.top_terms.windows(2).all(|w| w[0] <= w[1]));

    let first = &scores.doc_scores[0];
    let score_of = |term: &str| first.iter().find(|s| s.term == term).map(|s| s.score);
    let london = score_of("london").expect("london scored");
    let data = score_of("data").expect("data scored");
    assert!(london > data);
    assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(first.iter().all(|s| s.term != "manchester"));
}

#[test]
fn test_compute_relevance_caps_vocabulary() {
    let docs = ["alpha beta gamma delta", "alpha beta"];
    let scores = compute_relevance(&docs, 2);
    // "alpha", "alpha beta" and "beta" all occur twice; ties resolve alphabetically
    assert_eq!(scores.top_terms, vec!["alpha", "alpha beta"]);
    assert!(scores.doc_scores[0].iter().all(|s| s.term == "alpha" || s.term == "alpha beta"));
}

#[test]
fn test_compute_relevance_degenerate_inputs() {
    let empty: [&str; 0] = [];
    let scores = compute_relevance(&empty, 100);
    assert!(scores.doc_scores.is_empty());
    assert!(scores.top_terms.is_empty());

    let only_stopwords = ["the and of", ""];
    let scores = compute_relevance(&only_stopwords, 100);
    assert_eq!(scores.doc_scores.len(), 2);
    assert!(scores.doc_scores.iter().all(Vec::is_empty));
    assert!(scores.top_terms.is_empty());
}

#[test]
fn test_densities_are_bounded_and_sorted() {
    let text = "data science msc course london data science applied statistics machine learning \
                python programming data engineering cloud computing ethics research project \
                dissertation placement industry careers salary scholarships funding campus";
    let toks = tokenize(text);
    let densities = keyword_densities(&toks, 50);

    assert!(densities.len() <= 50);
    assert!(densities.iter().all(|d| d.density > 0.0 && d.density <= 100.0));
    assert!(densities.windows(2).all(|w| w[0].density >= w[1].density));
}

#[test]
fn test_feature_extraction_is_deterministic() {
    let page = PageDocument {
        url: "https://example.edu/msc-ds".to_string(),
        main_content: "Applied data science with python, statistics and machine learning.".to_string(),
        word_count: 9,
        json_ld: vec![json!({"@type": ["Course", "EducationalOccupationalProgram"]})],
        ..Default::default()
    };

    assert_eq!(extract_features(&page), extract_features(&page));
}
