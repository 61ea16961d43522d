// src/utils/text.rs
use sha2::{Digest, Sha256};

/// Characters that render as nothing or as a gap but are not Unicode `White_Space`.
const INVISIBLE_SPACES: [char; 4] = ['\u{200B}', '\u{2060}', '\u{FEFF}', '\u{180E}'];

/// Collapses every run of whitespace (NBSP, thin/em spaces, zero-width spaces, newlines)
/// into a single ASCII space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if INVISIBLE_SPACES.contains(&c) { ' ' } else { c })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex SHA-256 of a fragment's text, used to recognise already-classified fragments.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Zero-pads a numeric CIK to the 10 digits EDGAR uses. Returns `None` for anything
/// that is not 1-10 ASCII digits.
pub fn pad_cik(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > 10 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>10}", trimmed))
}
