// src/utils/html_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::extractors::KeywordVocabulary;
use crate::utils::error::AppError;

const DEBUG_STYLE: &str = ".highlight-keyword { background-color: #FFFF00; outline: 1px solid #FFA500; }\n";

/// Byte spans of vocabulary hits that sit in text, not inside a tag or attribute.
pub fn keyword_spans(html: &str, vocabulary: &KeywordVocabulary) -> Vec<(usize, usize)> {
    vocabulary
        .pattern()
        .find_iter(html)
        .filter(|m| {
            let before = &html[..m.start()];
            match (before.rfind('<'), before.rfind('>')) {
                (Some(open), Some(close)) => close > open,
                (Some(_), None) => false,
                _ => true,
            }
        })
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Writes a copy of a filing section with every keyword hit highlighted, so it can be
/// opened in a browser to see why blocks were or were not picked up.
/// Returns the number of highlighted hits.
pub fn save_keyword_debug_html(
    html: &str,
    path: &Path,
    vocabulary: &KeywordVocabulary,
) -> Result<usize, AppError> {
    let spans = keyword_spans(html, vocabulary);

    let mut debug_html = String::with_capacity(html.len() + spans.len() * 64 + 256);
    debug_html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");
    debug_html.push_str(DEBUG_STYLE);
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut last_pos = 0;
    for (start, end) in &spans {
        debug_html.push_str(&html[last_pos..*start]);
        debug_html.push_str(&format!("<span class=\"highlight-keyword\" title=\"Position: {}-{}\">", start, end));
        debug_html.push_str(&html[*start..*end]);
        debug_html.push_str("</span>");
        last_pos = *end;
    }
    debug_html.push_str(&html[last_pos..]);
    debug_html.push_str("\n</body>\n</html>");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(debug_html.as_bytes())?;

    tracing::info!("Saved debug HTML with {} keyword hit(s) to {}", spans.len(), path.display());
    Ok(spans.len())
}
