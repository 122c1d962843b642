//! HTML to [`PageDocument`] extraction.
//!
//! Every function here is total: a missing or odd element yields an empty
//! default for that field and never affects the others.

use once_cell::sync::Lazy;
use regex::Regex;
use select::document::Document;
use select::node::Node;
use select::predicate::Name;
use std::collections::BTreeMap;

use crate::entities::{Link, PageDocument};

/// Subtrees skipped when collecting main content text, links and image alts.
const NOISE_TAGS: &[&str] = &["nav", "footer", "header", "script", "style", "aside"];

/// Deepest element nesting handed to the parser. Deeper documents come back
/// as failed pages instead of parsing.
pub const MAX_NESTING_DEPTH: usize = 512;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

// The parser closes these implicitly, so repeating them never deepens the tree.
const OPTIONAL_END_TAGS: &[&str] = &[
    "p", "li", "dt", "dd", "option", "optgroup", "tr", "td", "th", "thead", "tbody", "tfoot", "rb",
    "rt", "rtc", "rp", "colgroup", "caption",
];

const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
];

const HEADING_LEVELS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Collapse runs of whitespace into single spaces and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse raw HTML and build a full [`PageDocument`] for `url`.
pub fn extract_document(url: &str, html: &str, status_code: u16) -> PageDocument {
    let depth = estimate_nesting_depth(html);
    if depth > MAX_NESTING_DEPTH {
        tracing::warn!("Refusing to parse {}: nesting depth {} exceeds {}", url, depth, MAX_NESTING_DEPTH);
        return PageDocument::failed(
            url,
            status_code,
            format!("HTML parsing error: elements nested {} levels deep (limit {})", depth, MAX_NESTING_DEPTH),
        );
    }

    let document = Document::from(html);

    let headings = extract_headings(&document);
    let h1 = extract_h1(&document);
    let main_content = extract_main_content(&document);
    let word_count = main_content.split_whitespace().count();

    PageDocument {
        url: url.to_string(),
        status_code,
        title: extract_title(&document),
        meta_description: extract_meta_content(&document, "description"),
        meta_keywords: extract_meta_content(&document, "keywords"),
        canonical_url: extract_canonical_url(&document),
        h1,
        headings,
        main_content,
        word_count,
        json_ld: extract_json_ld(&document),
        links: extract_links(&document),
        image_alt_texts: extract_image_alt_texts(&document),
        error: None,
    }
}

pub fn extract_title(document: &Document) -> Option<String> {
    document
        .find(Name("title"))
        .next()
        .and_then(|n| non_empty(clean_text(&n.text())))
}

/// `content` of the first `<meta name="...">` matching `name`, case-insensitively.
pub fn extract_meta_content(document: &Document, name: &str) -> Option<String> {
    document
        .find(Name("meta"))
        .find(|n| n.attr("name").map_or(false, |v| v.trim().eq_ignore_ascii_case(name)))
        .and_then(|n| n.attr("content"))
        .map(|content| content.trim().to_string())
}

pub fn extract_canonical_url(document: &Document) -> Option<String> {
    document
        .find(Name("link"))
        .find(|n| {
            n.attr("rel").map_or(false, |rel| {
                rel.split_whitespace().any(|token| token.eq_ignore_ascii_case("canonical"))
            })
        })
        .and_then(|n| n.attr("href"))
        .and_then(|href| non_empty(href.trim().to_string()))
}

/// First `<h1>` that has any text.
pub fn extract_h1(document: &Document) -> Option<String> {
    document
        .find(Name("h1"))
        .map(|n| clean_text(&n.text()))
        .find(|text| !text.is_empty())
}

pub fn extract_headings(document: &Document) -> BTreeMap<String, Vec<String>> {
    HEADING_LEVELS
        .iter()
        .map(|level| {
            let texts = document
                .find(Name(*level))
                .map(|n| clean_text(&n.text()))
                .filter(|text| !text.is_empty())
                .collect();
            (level.to_string(), texts)
        })
        .collect()
}

/// Visible text of `<main>`, else `<body>`, else the whole document, with
/// navigation and other boilerplate subtrees left out.
pub fn extract_main_content(document: &Document) -> String {
    let root = document
        .find(Name("main"))
        .next()
        .or_else(|| document.find(Name("body")).next());

    let mut fragments: Vec<&str> = Vec::new();
    match root {
        Some(node) => collect_text(node, &mut fragments),
        None => {
            if let Some(node) = document.nth(0) {
                collect_text(node, &mut fragments);
            }
        }
    }

    clean_text(&fragments.join(" "))
}

// Iterative walk over the content root, pruning noise subtrees.
fn collect_text<'a>(root: Node<'a>, out: &mut Vec<&'a str>) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(text) = node.as_text() {
            out.push(text);
            continue;
        }
        if let Some(name) = node.name() {
            if NOISE_TAGS.contains(&name) {
                continue;
            }
        }
        let children: Vec<Node<'a>> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }
}

/// JSON-LD blocks that parse as JSON. Broken blocks are skipped one by one.
pub fn extract_json_ld(document: &Document) -> Vec<serde_json::Value> {
    document
        .find(Name("script"))
        .filter(|n| {
            n.attr("type")
                .map_or(false, |t| t.trim().eq_ignore_ascii_case("application/ld+json"))
        })
        .filter_map(|n| {
            let raw = n.text();
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Skipping malformed JSON-LD block: {}", e);
                    None
                }
            }
        })
        .collect()
}

pub fn extract_links(document: &Document) -> Vec<Link> {
    document
        .find(Name("a"))
        .filter(|n| !in_noise_subtree(n))
        .filter_map(|n| {
            let href = n.attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') || is_script_href(href) {
                return None;
            }
            Some(Link {
                text: clean_text(&n.text()),
                href: href.to_string(),
            })
        })
        .collect()
}

fn is_script_href(href: &str) -> bool {
    href.get(..11)
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

pub fn extract_image_alt_texts(document: &Document) -> Vec<String> {
    document
        .find(Name("img"))
        .filter(|n| !in_noise_subtree(n))
        .filter_map(|n| n.attr("alt"))
        .map(clean_text)
        .filter(|alt| !alt.is_empty())
        .collect()
}

fn in_noise_subtree(node: &Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.name().map_or(false, |name| NOISE_TAGS.contains(&name)) {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// Upper bound on how deep the parser will nest elements for `html`, from a
/// flat scan of the tags. Comments, doctypes and raw-text bodies are skipped.
/// Self-closing syntax only closes an element inside `svg` or `math`.
pub fn estimate_nesting_depth(html: &str) -> usize {
    let bytes = html.as_bytes();
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut foreign = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &bytes[i..];
        if rest.starts_with(b"<!--") {
            i += find_bytes(rest, b"-->").map_or(rest.len(), |end| end + 3);
            continue;
        }
        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            i += find_bytes(rest, b">").map_or(rest.len(), |end| end + 1);
            continue;
        }

        let closing = rest.get(1) == Some(&b'/');
        let name_start = if closing { 2 } else { 1 };
        let name_len = rest[name_start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
            .count();
        if name_len == 0 || !rest[name_start].is_ascii_alphabetic() {
            i += 1;
            continue;
        }
        let name = String::from_utf8_lossy(&rest[name_start..name_start + name_len]).to_ascii_lowercase();
        let name = name.as_str();
        let tag_len = find_bytes(rest, b">").map_or(rest.len(), |end| end + 1);
        let self_closing = rest[..tag_len].ends_with(b"/>");
        i += tag_len;

        if VOID_TAGS.contains(&name) || OPTIONAL_END_TAGS.contains(&name) {
            continue;
        }
        let foreign_root = matches!(name, "svg" | "math");
        if closing {
            depth = depth.saturating_sub(1);
            if foreign_root {
                foreign = foreign.saturating_sub(1);
            }
            continue;
        }
        if self_closing && (foreign > 0 || foreign_root) {
            continue;
        }
        if foreign_root {
            foreign += 1;
        }
        depth += 1;
        deepest = deepest.max(depth);

        if RAW_TEXT_TAGS.contains(&name) {
            i += find_end_tag(&bytes[i..], name).unwrap_or(bytes.len() - i);
        }
    }

    deepest
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn find_end_tag(haystack: &[u8], name: &str) -> Option<usize> {
    haystack
        .windows(name.len() + 2)
        .position(|window| window.starts_with(b"</") && window[2..].eq_ignore_ascii_case(name.as_bytes()))
}
