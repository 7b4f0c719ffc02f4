//! Splits a document into ordered, heading-tagged segments — the units that
//! breakpoint detection and assembly operate on.
//!
//! Segments are deliberately small (roughly sentence/paragraph granularity)
//! so breakpoint detection has enough resolution to find semantic seams;
//! [`assembly`](crate::semantic_chunking::assembly) groups them back up into
//! chunks sized for the embedding/LLM context window.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::semantic_chunking::config::{HtmlChunkingConfig, JsonChunkingConfig};
use crate::semantic_chunking::types::ChunkingError;

/// One segmented unit of text with its heading breadcrumb.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub text: String,
    pub heading_hierarchy: Vec<String>,
}

fn sentence_splitter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)[^.!?]+[.!?]+|[^.!?]+$").expect("static regex is valid"))
}

/// Splits plain text into sentence-level segments with no heading context.
pub fn segment_plain_text(text: &str) -> Vec<Segment> {
    text.split("\n\n")
        .flat_map(|paragraph| sentence_splitter().find_iter(paragraph.trim()))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(|s| Segment {
            text: s.to_string(),
            heading_hierarchy: Vec::new(),
        })
        .collect()
}

/// Walks an HTML document depth-first, tracking the current `h1`-`h6`
/// breadcrumb and emitting one segment per paragraph-level block
/// (`p`, `li`, `blockquote`, `pre`) and per sentence within it.
pub fn segment_html(html: &str, config: Option<&HtmlChunkingConfig>) -> Vec<Segment> {
    let document = Html::parse_document(html);
    let root: ElementRef = match config.and_then(|c| c.root_selector.as_deref()) {
        Some(selector_str) => Selector::parse(selector_str)
            .ok()
            .and_then(|selector| document.select(&selector).next())
            .unwrap_or_else(|| document.root_element()),
        None => document.root_element(),
    };

    let ignore: Vec<Selector> = config
        .map(|c| {
            c.ignore_selectors
                .iter()
                .filter_map(|s| Selector::parse(s).ok())
                .collect()
        })
        .unwrap_or_default();

    let mut segments = Vec::new();
    let mut heading_stack: Vec<(u8, String)> = Vec::new();
    walk(root, &mut heading_stack, &ignore, &mut segments);
    segments
}

fn walk(
    node: ElementRef,
    heading_stack: &mut Vec<(u8, String)>,
    ignore: &[Selector],
    out: &mut Vec<Segment>,
) {
    let tag = node.value().name();

    if ignore.iter().any(|sel| {
        node.parent()
            .and_then(ElementRef::wrap)
            .map(|parent| parent.select(sel).any(|m| m == node))
            .unwrap_or(false)
    }) {
        return;
    }

    if let Some(level) = heading_level(tag) {
        let text = collapse_whitespace(&node.text().collect::<String>());
        if !text.is_empty() {
            heading_stack.retain(|(l, _)| *l < level);
            heading_stack.push((level, text));
        }
        return;
    }

    if matches!(tag, "p" | "li" | "blockquote" | "pre" | "td" | "th") {
        let text = collapse_whitespace(&node.text().collect::<String>());
        if !text.is_empty() {
            let hierarchy = heading_stack.iter().map(|(_, t)| t.clone()).collect::<Vec<_>>();
            for sentence in sentence_splitter().find_iter(&text) {
                let sentence = sentence.as_str().trim();
                if !sentence.is_empty() {
                    out.push(Segment {
                        text: sentence.to_string(),
                        heading_hierarchy: hierarchy.clone(),
                    });
                }
            }
        }
        return;
    }

    for child in node.children().filter_map(ElementRef::wrap) {
        walk(child, heading_stack, ignore, out);
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Segments a JSON document. When `sections_path` names a top-level key
/// holding an array of `{heading, content}` objects (or that key is absent
/// and `"sections"` exists), each entry becomes one heading-tagged segment
/// group; otherwise the object is flattened into `"key: value"` segments.
pub fn segment_json(
    value: &serde_json::Value,
    config: Option<&JsonChunkingConfig>,
) -> Result<Vec<Segment>, ChunkingError> {
    let sections_key = config
        .and_then(|c| c.sections_path.as_deref())
        .unwrap_or("sections");

    if let Some(sections) = value.get(sections_key).and_then(|v| v.as_array()) {
        let mut segments = Vec::new();
        for section in sections {
            let heading = section
                .get("heading")
                .and_then(|h| h.as_str())
                .unwrap_or_default()
                .to_string();
            let content = section
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or_default();
            let hierarchy = if heading.is_empty() {
                Vec::new()
            } else {
                vec![heading]
            };
            for sentence in sentence_splitter().find_iter(content) {
                let sentence = sentence.as_str().trim();
                if !sentence.is_empty() {
                    segments.push(Segment {
                        text: sentence.to_string(),
                        heading_hierarchy: hierarchy.clone(),
                    });
                }
            }
        }
        return Ok(segments);
    }

    match value {
        serde_json::Value::Object(map) => {
            let mut segments = Vec::new();
            for (key, val) in map {
                if let Some(text) = val.as_str() {
                    if !text.trim().is_empty() {
                        segments.push(Segment {
                            text: format!("{key}: {text}"),
                            heading_hierarchy: vec![key.clone()],
                        });
                    }
                }
            }
            Ok(segments)
        }
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(ChunkingError::InvalidDocument(format!(
            "unsupported JSON shape for chunking: {other}"
        ))),
    }
}
