// src/extractors/document.rs
//
// Full-submission files wrap every exhibit, graphic and XBRL instance of an accession
// in an SGML-ish envelope:
//
//   <SEC-HEADER> ... FILED AS OF DATE:  20190415 ... </SEC-HEADER>
//   <DOCUMENT>
//   <TYPE>10-K
//   <SEQUENCE>1
//   <TEXT>
//   ...html...
//   </TEXT>
//   </DOCUMENT>
//
// The envelope tags always start a line, which keeps them apart from html/svg `<text>`
// elements living inside a body.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::edgar::{FilingSection, FilingWindow, RawFiling};

pub const DEFAULT_TARGET_FORM: &str = "10-K";

static ENVELOPE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*<(/?)(DOCUMENT|TYPE|TEXT)>")
        .expect("Failed to compile ENVELOPE_TOKEN_RE")
});

static FILED_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*FILED AS OF DATE:[ \t]*(\S+)")
        .expect("Failed to compile FILED_DATE_RE")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    DocumentOpen,
    DocumentClose,
    Type,
    TextOpen,
    TextClose,
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Outside,
    InDocument { is_target: bool },
    InText { is_target: bool, body_start: usize },
}

pub struct DocumentSectionExtractor {
    target_form: String,
}

impl Default for DocumentSectionExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_FORM)
    }
}

impl DocumentSectionExtractor {
    pub fn new(target_form: &str) -> Self {
        Self { target_form: target_form.trim().to_string() }
    }

    /// Returns the `<TEXT>` body of the first sub-document whose `<TYPE>` is the target
    /// form. `None` means the filing has no such document, which is not an error.
    pub fn extract<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let mut state = ScanState::Outside;

        for caps in ENVELOPE_TOKEN_RE.captures_iter(raw) {
            let Some(whole) = caps.get(0) else { continue };
            let token = match (&caps[1], &caps[2]) {
                ("", "DOCUMENT") => Token::DocumentOpen,
                ("/", "DOCUMENT") => Token::DocumentClose,
                ("", "TYPE") => Token::Type,
                ("", "TEXT") => Token::TextOpen,
                ("/", "TEXT") => Token::TextClose,
                _ => continue, // `</TYPE>` is not part of the format
            };

            state = match (state, token) {
                (ScanState::Outside, Token::DocumentOpen) => ScanState::InDocument { is_target: false },
                (ScanState::Outside, _) => ScanState::Outside,

                (ScanState::InDocument { .. }, Token::DocumentOpen) => {
                    tracing::debug!("<DOCUMENT> opened before the previous one closed, restarting at offset {}", whole.start());
                    ScanState::InDocument { is_target: false }
                }
                (ScanState::InDocument { .. }, Token::DocumentClose) => ScanState::Outside,
                (ScanState::InDocument { .. }, Token::Type) => {
                    let declared = rest_of_line(raw, whole.end());
                    ScanState::InDocument { is_target: declared.eq_ignore_ascii_case(&self.target_form) }
                }
                (ScanState::InDocument { is_target }, Token::TextOpen) => {
                    ScanState::InText { is_target, body_start: whole.end() }
                }
                (s @ ScanState::InDocument { .. }, Token::TextClose) => s,

                (ScanState::InText { is_target: true, body_start }, Token::TextClose) => {
                    return Some(&raw[body_start..whole.start()]);
                }
                (ScanState::InText { is_target: false, .. }, Token::TextClose) => {
                    ScanState::InDocument { is_target: false }
                }
                (ScanState::InText { is_target, body_start }, Token::DocumentClose | Token::DocumentOpen) => {
                    if is_target {
                        tracing::warn!("Unterminated <TEXT> body in {} document, cutting at offset {}", self.target_form, whole.start());
                        return Some(&raw[body_start..whole.start()]);
                    }
                    if token == Token::DocumentOpen {
                        ScanState::InDocument { is_target: false }
                    } else {
                        ScanState::Outside
                    }
                }
                // Stray tokens inside a body are content
                (s @ ScanState::InText { .. }, _) => s,
            };
        }

        match state {
            ScanState::InText { is_target: true, body_start } => {
                tracing::warn!("Unterminated <TEXT> body in {} document runs to end of input", self.target_form);
                Some(&raw[body_start..])
            }
            _ => None,
        }
    }

    /// Reporting year from the `FILED AS OF DATE:` header (YYYYMMDD).
    pub fn extract_year(&self, raw: &str) -> Option<u32> {
        let value = FILED_DATE_RE.captures(raw)?.get(1)?.as_str();
        if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
            tracing::debug!("Filed date '{}' is not an 8-digit date", value);
            return None;
        }
        NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        value[..4].parse::<u32>().ok()
    }

    /// Combines `extract` and `extract_year`, dropping filings with no target document,
    /// no parseable year, or a year outside the window.
    pub fn extract_section(&self, filing: &RawFiling, window: FilingWindow) -> Option<FilingSection> {
        let Some(year) = self.extract_year(&filing.text) else {
            tracing::warn!("No parseable filed date in {}, skipping", filing.source);
            return None;
        };
        if !window.contains(year) {
            tracing::info!(
                "Filing {} is from {}, outside {}-{}, skipping",
                filing.source, year, window.start_year, window.end_year
            );
            return None;
        }
        let Some(body) = self.extract(&filing.text) else {
            tracing::info!("No {} document inside {}, skipping", self.target_form, filing.source);
            return None;
        };

        tracing::info!("Isolated {} document for {} ({} bytes, year {})", self.target_form, filing.cik, body.len(), year);
        Some(FilingSection {
            cik: filing.cik.clone(),
            source: filing.source.clone(),
            year,
            markup: body.to_string(),
        })
    }
}

fn rest_of_line(raw: &str, from: usize) -> &str {
    let tail = &raw[from..];
    let end = tail.find(['\n', '\r']).unwrap_or(tail.len());
    tail[..end].trim()
}
