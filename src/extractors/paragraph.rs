// src/extractors/paragraph.rs

// --- Imports ---
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Element, ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::extractors::keywords::KeywordVocabulary;
use crate::utils::text::normalize_whitespace;

// --- Constants ---
pub const MIN_FRAGMENT_CHARS: usize = 60;
// html5ever nests arbitrarily deep on broken markup; visibility walks stop here
const MAX_ANCESTOR_DEPTH: usize = 512;

// --- CSS Selectors (Lazy Static) ---
// Blocks that can carry a paragraph of prose
static CANDIDATE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, div, li").expect("Failed to compile CANDIDATE_SELECTOR")
});

// Elements whose text never reaches a reader
static NON_CONTENT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, noscript, template, head, title, meta, link")
        .expect("Failed to compile NON_CONTENT_SELECTOR")
});

static DISPLAY_NONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[;\s])display\s*:\s*none\b").expect("Failed to compile DISPLAY_NONE_RE")
});

// --- Data Structures ---
/// A visible, keyword-bearing block of normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
}

pub struct ParagraphSegmenter {
    vocabulary: KeywordVocabulary,
    min_chars: usize,
}

impl ParagraphSegmenter {
    pub fn new(vocabulary: KeywordVocabulary) -> Self {
        Self { vocabulary, min_chars: MIN_FRAGMENT_CHARS }
    }

    pub fn vocabulary(&self) -> &KeywordVocabulary {
        &self.vocabulary
    }

    /// Splits a filing body into deduplicated fragments, in document order.
    pub fn segment(&self, markup: &str) -> Vec<Fragment> {
        // 1. Parse and drop everything a reader would not see
        let mut document = Html::parse_document(markup);
        let pruned = prune_invisible(&mut document);
        tracing::debug!("Pruned {} hidden or non-content element(s)", pruned);

        // 2. Walk candidate blocks in document order
        let mut seen: HashSet<String> = HashSet::new();
        let mut fragments = Vec::new();
        let mut short = 0usize;
        let mut off_topic = 0usize;
        let mut wrappers = 0usize;

        for element in document.select(&CANDIDATE_SELECTOR) {
            let text = block_text(element);

            if text.chars().count() < self.min_chars {
                short += 1;
                continue;
            }
            if !self.vocabulary.is_match(&text) {
                off_topic += 1;
                continue;
            }
            if seen.contains(&text) {
                tracing::trace!("Duplicate block skipped: '{}'", text);
                continue;
            }

            if wraps_candidates(element) {
                wrappers += 1;
            }
            seen.insert(text.clone());
            fragments.push(Fragment { text });
        }

        tracing::debug!(
            "Segmented {} fragment(s); {} block(s) too short, {} without keywords",
            fragments.len(), short, off_topic
        );
        if wrappers > 0 {
            // Each of these repeats the text of the blocks nested inside it
            tracing::debug!("{} fragment(s) come from blocks wrapping other candidate blocks", wrappers);
        }
        fragments
    }
}

impl Default for ParagraphSegmenter {
    fn default() -> Self {
        Self::new(KeywordVocabulary::default())
    }
}

/// Joins an element's text nodes with single spaces and normalizes the result.
pub fn block_text(element: ElementRef) -> String {
    let joined = element.text().collect::<Vec<_>>().join(" ");
    normalize_whitespace(&joined)
}

/// True if another candidate block sits anywhere below the element.
fn wraps_candidates(element: ElementRef) -> bool {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|child| CANDIDATE_SELECTOR.matches(&child))
}

/// True if the element itself declares `display: none` or the `hidden` attribute.
fn declares_hidden(element: &Element) -> bool {
    element.attr("hidden").is_some()
        || element.attr("style").map_or(false, |style| DISPLAY_NONE_RE.is_match(style))
}

/// Resolves visibility by walking parent links from the element up to the document
/// root. Any hidden declaration along the way hides the element.
pub fn is_effectively_hidden(element: ElementRef) -> bool {
    let mut current = Some(*element);
    let mut depth = 0usize;

    while let Some(node) = current {
        if depth > MAX_ANCESTOR_DEPTH {
            tracing::debug!("Ancestor walk exceeded {} levels, treating element as visible", MAX_ANCESTOR_DEPTH);
            return false;
        }
        if let Some(ancestor) = ElementRef::wrap(node) {
            if declares_hidden(ancestor.value()) {
                return true;
            }
        }
        current = node.parent();
        depth += 1;
    }
    false
}

/// Detaches non-content and hidden elements from the tree. Returns how many were cut.
fn prune_invisible(document: &mut Html) -> usize {
    let doomed: Vec<_> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| NON_CONTENT_SELECTOR.matches(el) || is_effectively_hidden(*el))
        .map(|el| el.id())
        .collect();

    for id in &doomed {
        if let Some(mut node) = document.tree.get_mut(*id) {
            node.detach();
        }
    }
    doomed.len()
}
