// src/config.rs
use std::path::Path;

use crate::utils::error::AppError;
use crate::utils::text::pad_cik;

/// Collects CIKs from explicit values and an optional list file, zero-padded and
/// deduplicated in first-seen order.
///
/// The file is either one CIK per line or a CSV whose header names a `cik` column.
pub fn load_ciks(explicit: &[String], file: Option<&Path>) -> Result<Vec<String>, AppError> {
    let mut raw: Vec<String> = explicit.to_vec();

    if let Some(path) = file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Cannot read CIK file {}: {}", path.display(), e)))?;
        raw.extend(ciks_from_table(&content));
    }

    let mut ciks: Vec<String> = Vec::new();
    for value in raw {
        match pad_cik(&value) {
            Some(cik) if !ciks.contains(&cik) => ciks.push(cik),
            Some(_) => tracing::debug!("Duplicate CIK {} ignored", value),
            None => tracing::warn!("Ignoring invalid CIK '{}'", value),
        }
    }

    if ciks.is_empty() {
        return Err(AppError::Config("No valid CIKs given (use --cik or --cik-file)".to_string()));
    }
    Ok(ciks)
}

fn ciks_from_table(content: &str) -> Vec<String> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty()).peekable();

    let header_column = lines
        .peek()
        .and_then(|header| header.split(',').position(|c| c.trim().trim_matches('"').eq_ignore_ascii_case("cik")));
    if header_column.is_some() {
        lines.next();
    }
    let column = header_column.unwrap_or(0);

    lines
        .filter_map(|line| line.split(',').nth(column))
        .map(|cell| {
            let cell = cell.trim().trim_matches('"');
            // Spreadsheets export integer columns as "320193.0"
            cell.strip_suffix(".0").unwrap_or(cell).to_string()
        })
        .collect()
}
