// src/edgar/models.rs
use serde::{Deserialize, Serialize};

/// One full-submission text file for one company and one accession.
#[derive(Debug, Clone)]
pub struct RawFiling {
    pub cik: String,    // 10-digit, zero-padded
    pub source: String, // Accession number or file path, for log lines
    pub text: String,
}

/// The annual-report sub-document of a filing together with its reporting year.
#[derive(Debug, Clone)]
pub struct FilingSection {
    pub cik: String,
    pub source: String,
    pub year: u32,
    pub markup: String,
}

/// Inclusive range of reporting years a filing must fall in to be considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingWindow {
    pub start_year: u32,
    pub end_year: u32,
}

impl FilingWindow {
    pub fn new(start_year: u32, end_year: u32) -> Option<Self> {
        (start_year <= end_year).then_some(Self { start_year, end_year })
    }

    pub fn contains(&self, year: u32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }
}
