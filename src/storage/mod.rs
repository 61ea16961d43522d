// src/storage/mod.rs
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::classifier::{Annotation, AnnotationOutcome};
use crate::extractors::Fragment;
use crate::utils::error::StorageError;
use crate::utils::text::content_hash;

pub const FRAGMENT_LOG_FILE: &str = "fragments.jsonl";
pub const ADOPTION_LOG_FILE: &str = "adoption_scores.jsonl";

/// `{year}_p{index}`, index 1-based within the company-year.
pub fn paragraph_id(year: u32, index: usize) -> String {
    format!("{}_p{}", year, index)
}

/// One classified (or failed) fragment, as persisted in the fragment log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentLogEntry {
    pub cik: String,
    pub year: u32,
    pub paragraph_id: String,
    pub paragraph_hash: String,
    pub paragraph_text: String,
    pub timestamp: String,
    pub raw_response: Option<String>,
    pub annotation: Option<Annotation>,
    pub error: Option<String>,
}

impl FragmentLogEntry {
    pub fn new(
        cik: &str,
        year: u32,
        index: usize,
        text: &str,
        raw_response: Option<String>,
        outcome: &AnnotationOutcome,
    ) -> Self {
        let (annotation, error) = match outcome {
            AnnotationOutcome::Annotated(annotation) => (Some(annotation.clone()), None),
            AnnotationOutcome::Failed(reason) => (None, Some(reason.clone())),
        };
        Self {
            cik: cik.to_string(),
            year,
            paragraph_id: paragraph_id(year, index),
            paragraph_hash: content_hash(text),
            paragraph_text: text.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            raw_response,
            annotation,
            error,
        }
    }

    pub fn outcome(&self) -> AnnotationOutcome {
        match (&self.annotation, &self.error) {
            (Some(annotation), _) => AnnotationOutcome::Annotated(annotation.clone()),
            (None, Some(reason)) => AnnotationOutcome::Failed(reason.clone()),
            (None, None) => AnnotationOutcome::Failed("log entry carries no annotation".to_string()),
        }
    }
}

/// Append-only JSON-lines file. Every record is written as one complete line and
/// flushed to disk before `append` returns.
pub struct JsonlWriter<T> {
    file: File,
    _record: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> JsonlWriter<T> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().read(true).append(true).create(true).open(path)?;

        // A crash can leave a half-written last line; close it off so the next record
        // starts on a fresh line. `load` skips the broken one.
        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                tracing::warn!("{} ends with a partial record, terminating it", path.display());
                file.write_all(b"\n")?;
            }
        }

        Ok(Self { file, _record: PhantomData })
    }

    pub fn append(&mut self, record: &T) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        line.push('\n');

        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Reads every well-formed record. A missing file is an empty log; lines that do
    /// not decode (e.g. a truncated tail) are skipped with a warning.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<T>, StorageError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping unreadable line {} of {}: {}", number + 1, path.display(), e),
            }
        }
        Ok(records)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactReport {
    pub kept: usize,
    pub superseded: usize,
    pub unreadable: usize,
}

/// Re-encodes a JSONL log in one separate pass: unreadable lines are dropped, only the
/// last record per (cik, year, paragraph_id) survives, and non-ASCII text is written
/// unescaped. The rewrite goes to a temporary file that replaces the original.
pub fn compact<P: AsRef<Path>>(path: P) -> Result<CompactReport, StorageError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, serde_json::Value> = HashMap::new();
    let mut total = 0usize;
    let mut unreadable = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) else {
            unreadable += 1;
            continue;
        };
        total += 1;
        let key = format!("{}|{}|{}", value["cik"], value["year"], value["paragraph_id"]);
        if latest.insert(key.clone(), value).is_none() {
            order.push(key);
        }
    }

    let tmp_path = path.with_extension("jsonl.tmp");
    {
        let mut out = File::create(&tmp_path)?;
        for key in &order {
            let line = serde_json::to_string(&latest[key])
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    let report = CompactReport { kept: order.len(), superseded: total - order.len(), unreadable };
    tracing::info!(
        "Compacted {}: kept {}, dropped {} superseded and {} unreadable line(s)",
        path.display(), report.kept, report.superseded, report.unreadable
    );
    Ok(report)
}

/// Stage-one output for one company: fragment texts grouped by reporting year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub cik: String,
    pub filings: BTreeMap<String, Vec<Fragment>>,
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn fragment_log_path(&self) -> PathBuf {
        self.base_dir.join(FRAGMENT_LOG_FILE)
    }

    pub fn adoption_log_path(&self) -> PathBuf {
        self.base_dir.join(ADOPTION_LOG_FILE)
    }

    pub fn debug_dir(&self, cik: &str, year: u32) -> PathBuf {
        self.base_dir.join("debug").join(cik).join(year.to_string())
    }

    /// Saves one company's extracted fragments as pretty JSON under `extracted/`.
    pub fn save_extraction(&self, output: &ExtractionOutput) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join("extracted");
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir)
                .map_err(StorageError::IoError)?;
        }

        let file_path = target_dir.join(format!("{}.json", output.cik));
        let json = serde_json::to_string_pretty(output)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, json)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved extraction to {}", file_path.display());

        Ok(file_path)
    }
}
