// src/edgar/source.rs
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::edgar::models::RawFiling;
use crate::utils::error::ExtractError;
use crate::utils::text::pad_cik;

/// Supplies the raw full-submission documents for a company.
///
/// Downloading from EDGAR happens outside this crate; implementations only hand back
/// text that is already reachable.
#[async_trait]
pub trait FilingSource: Send + Sync {
    async fn filings(&self, cik: &str) -> Result<Vec<RawFiling>, ExtractError>;
}

/// Reads filings that were downloaded ahead of time into a directory.
///
/// Two layouts are recognised:
/// - flat files named `<cik>_<anything>.txt` (the CIK may or may not be zero-padded)
/// - the downloader tree `sec-edgar-filings/<cik>/10-K/<accession>/full-submission.txt`
pub struct DirectoryFilingSource {
    root: PathBuf,
}

impl DirectoryFilingSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    async fn flat_files(&self, cik: &str) -> Result<Vec<PathBuf>, ExtractError> {
        let mut matches = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => return Err(ExtractError::Source(self.root.display().to_string(), e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ExtractError::Source(self.root.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let leading: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
            if pad_cik(&leading).as_deref() == Some(cik) {
                matches.push(path);
            }
        }
        Ok(matches)
    }

    async fn downloader_tree(&self, cik: &str) -> Vec<PathBuf> {
        let unpadded = cik.trim_start_matches('0');
        let mut matches = Vec::new();

        for folder in [cik, unpadded] {
            let form_dir = self.root.join("sec-edgar-filings").join(folder).join("10-K");
            let Ok(mut accessions) = tokio::fs::read_dir(&form_dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = accessions.next_entry().await {
                let candidate = entry.path().join("full-submission.txt");
                if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                    matches.push(candidate);
                }
            }
            if !matches.is_empty() || folder == unpadded {
                break;
            }
        }
        matches
    }
}

#[async_trait]
impl FilingSource for DirectoryFilingSource {
    async fn filings(&self, cik: &str) -> Result<Vec<RawFiling>, ExtractError> {
        let mut paths = self.flat_files(cik).await?;
        paths.extend(self.downloader_tree(cik).await);
        paths.sort();
        paths.dedup();

        let mut filings = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| ExtractError::Source(path.display().to_string(), e))?;
            tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
            filings.push(RawFiling {
                cik: cik.to_string(),
                source: path.display().to_string(),
                // Old submissions occasionally carry Latin-1 bytes
                text: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        tracing::info!("Found {} local filing(s) for CIK {}", filings.len(), cik);
        Ok(filings)
    }
}
