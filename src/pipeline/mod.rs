// src/pipeline/mod.rs
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::aggregate::{AdoptionRecord, AggregationEngine, AggregationStore, DEFAULT_RELEVANCE_THRESHOLD};
use crate::classifier::{response, AnnotationOutcome, EvidenceClassifier};
use crate::edgar::{FilingSection, FilingSource, FilingWindow};
use crate::extractors::document::DEFAULT_TARGET_FORM;
use crate::extractors::{DocumentSectionExtractor, Fragment, KeywordVocabulary, ParagraphSegmenter};
use crate::storage::{paragraph_id, ExtractionOutput, FragmentLogEntry, JsonlWriter, StorageManager};
use crate::utils::error::{AppError, ClassifierError, ExtractError};
use crate::utils::text::content_hash;

pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(20);
pub const DEFAULT_POST_CALL_PAUSE: Duration = Duration::from_secs(2);
pub const DEFAULT_TRANSIENT_RETRIES: u32 = 3;
pub const DEFAULT_TRANSIENT_BACKOFF: Duration = Duration::from_secs(5);
const MAX_TRANSIENT_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub window: FilingWindow,
    pub target_form: String,
    pub relevance_threshold: f64,
    pub rate_limit_backoff: Duration,
    pub post_call_pause: Duration,
    /// Extra attempts after a transient failure before the fragment is abandoned
    pub transient_retries: u32,
    /// First wait after a transient failure, doubled on every further attempt
    pub transient_backoff: Duration,
}

impl PipelineConfig {
    pub fn new(window: FilingWindow) -> Self {
        Self {
            window,
            target_form: DEFAULT_TARGET_FORM.to_string(),
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            post_call_pause: DEFAULT_POST_CALL_PAUSE,
            transient_retries: DEFAULT_TRANSIENT_RETRIES,
            transient_backoff: DEFAULT_TRANSIENT_BACKOFF,
        }
    }
}

/// A filing section together with the fragments segmented out of it.
#[derive(Debug, Clone)]
pub struct SegmentedSection {
    pub section: FilingSection,
    pub fragments: Vec<Fragment>,
}

/// Stage one: raw filings -> windowed annual-report sections -> fragments.
pub struct FilingProcessor {
    extractor: DocumentSectionExtractor,
    segmenter: ParagraphSegmenter,
    window: FilingWindow,
}

impl FilingProcessor {
    pub fn new(config: &PipelineConfig, vocabulary: KeywordVocabulary) -> Self {
        tracing::debug!("Keyword vocabulary: {}", vocabulary.terms().join(" | "));
        Self {
            extractor: DocumentSectionExtractor::new(&config.target_form),
            segmenter: ParagraphSegmenter::new(vocabulary),
            window: config.window,
        }
    }

    pub fn vocabulary(&self) -> &KeywordVocabulary {
        self.segmenter.vocabulary()
    }

    pub async fn sections(
        &self,
        source: &dyn FilingSource,
        cik: &str,
    ) -> Result<Vec<SegmentedSection>, ExtractError> {
        let filings = source.filings(cik).await?;

        let sections = filings
            .iter()
            .filter_map(|filing| self.extractor.extract_section(filing, self.window))
            .map(|section| {
                let fragments = self.segmenter.segment(&section.markup);
                tracing::info!("{} {}: {} fragment(s) from {}", section.cik, section.year, fragments.len(), section.source);
                SegmentedSection { section, fragments }
            })
            .collect();
        Ok(sections)
    }
}

/// Groups segmented sections into the per-company extraction output.
pub fn extraction_output(cik: &str, sections: &[SegmentedSection]) -> ExtractionOutput {
    let mut output = ExtractionOutput { cik: cik.to_string(), ..Default::default() };
    for segmented in sections {
        output
            .filings
            .entry(segmented.section.year.to_string())
            .or_default()
            .extend(segmented.fragments.iter().cloned());
    }
    output
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub companies: usize,
    pub sections: usize,
    pub fragments: usize,
    pub classifier_calls: usize,
    pub reused: usize,
    pub failed_fragments: usize,
    pub records_written: usize,
}

type FragmentKey = (String, u32, String);

/// Runs every stage for a list of companies, resuming from whatever the fragment and
/// adoption logs already hold.
pub struct PipelineDriver<S, C> {
    config: PipelineConfig,
    source: S,
    classifier: C,
    processor: FilingProcessor,
    engine: AggregationEngine,
    store: AggregationStore,
    completed: HashMap<FragmentKey, FragmentLogEntry>,
    finalized: HashSet<(String, u32)>,
    fragment_log: JsonlWriter<FragmentLogEntry>,
    adoption_log: JsonlWriter<AdoptionRecord>,
    summary: RunSummary,
}

impl<S: FilingSource, C: EvidenceClassifier> PipelineDriver<S, C> {
    pub fn open(
        config: PipelineConfig,
        vocabulary: KeywordVocabulary,
        source: S,
        classifier: C,
        storage: &StorageManager,
    ) -> Result<Self, AppError> {
        let fragment_path = storage.fragment_log_path();
        let adoption_path = storage.adoption_log_path();

        // Later lines win, so a re-classified fragment replaces its earlier entry
        let completed: HashMap<FragmentKey, FragmentLogEntry> = JsonlWriter::<FragmentLogEntry>::load(&fragment_path)?
            .into_iter()
            .map(|entry| ((entry.cik.clone(), entry.year, entry.paragraph_id.clone()), entry))
            .collect();
        let finalized: HashSet<(String, u32)> = JsonlWriter::<AdoptionRecord>::load(&adoption_path)?
            .into_iter()
            .map(|record| (record.cik, record.year))
            .collect();

        tracing::info!(
            "Resuming with {} logged fragment(s) and {} finalized company-year(s)",
            completed.len(), finalized.len()
        );

        Ok(Self {
            processor: FilingProcessor::new(&config, vocabulary),
            engine: AggregationEngine::new(config.relevance_threshold),
            config,
            source,
            classifier,
            store: AggregationStore::new(),
            completed,
            finalized,
            fragment_log: JsonlWriter::open(fragment_path)?,
            adoption_log: JsonlWriter::open(adoption_path)?,
            summary: RunSummary::default(),
        })
    }

    pub async fn run(&mut self, ciks: &[String]) -> Result<RunSummary, AppError> {
        for cik in ciks {
            match self.run_company(cik).await {
                Ok(()) => self.summary.companies += 1,
                // A missing or unreadable filing only costs that company
                Err(AppError::Extraction(e)) => tracing::error!("Skipping CIK {}: {}", cik, e),
                Err(e) => return Err(e),
            }
        }
        tracing::info!("Run finished: {:?}", self.summary);
        Ok(self.summary)
    }

    pub async fn run_company(&mut self, cik: &str) -> Result<(), AppError> {
        tracing::info!("Processing CIK {}", cik);
        let sections = self.processor.sections(&self.source, cik).await?;
        let mut next_index: HashMap<u32, usize> = HashMap::new();

        for segmented in &sections {
            let year = segmented.section.year;
            if self.finalized.contains(&(cik.to_string(), year)) {
                tracing::info!("{} {} already finalized, skipping {}", cik, year, segmented.section.source);
                continue;
            }
            self.summary.sections += 1;
            // Touch the record so a year without fragments is still reported
            self.store.record_mut(cik, year);

            for fragment in &segmented.fragments {
                let index = next_index.entry(year).or_insert(0);
                *index += 1;
                let outcome = self.fragment_outcome(cik, year, *index, &fragment.text).await?;
                self.summary.fragments += 1;
                if outcome.annotation().is_none() {
                    self.summary.failed_fragments += 1;
                }
                self.engine.accumulate(self.store.record_mut(cik, year), &outcome);
            }
        }

        for record in self.store.take_company(cik) {
            let adoption = self.engine.finalize(record);
            self.adoption_log.append(&adoption)?;
            self.finalized.insert((adoption.cik.clone(), adoption.year));
            self.summary.records_written += 1;
        }
        Ok(())
    }

    /// Outcome for one fragment: replayed from the log when the same text was already
    /// classified under this key, otherwise classified now and logged.
    async fn fragment_outcome(
        &mut self,
        cik: &str,
        year: u32,
        index: usize,
        text: &str,
    ) -> Result<AnnotationOutcome, AppError> {
        let key = (cik.to_string(), year, paragraph_id(year, index));
        if let Some(entry) = self.completed.get(&key) {
            if entry.paragraph_hash == content_hash(text) {
                self.summary.reused += 1;
                return Ok(entry.outcome());
            }
            tracing::warn!("{} {} changed since it was logged, classifying again", cik, key.2);
        }

        let (raw_response, outcome) = self.classify(text).await?;
        let entry = FragmentLogEntry::new(cik, year, index, text, raw_response, &outcome);
        self.fragment_log.append(&entry)?;
        self.completed.insert(key, entry);
        Ok(outcome)
    }

    /// Calls the classifier, waiting out rate limits for as long as it takes. Transient
    /// failures get a bounded number of retries with a doubling pause. Whatever still
    /// fails becomes a failed outcome, except credentials being rejected, which stops
    /// the run.
    async fn classify(&mut self, text: &str) -> Result<(Option<String>, AnnotationOutcome), AppError> {
        let mut transient_attempts = 0u32;
        loop {
            self.summary.classifier_calls += 1;
            match self.classifier.classify(text).await {
                Ok(reply) => {
                    tokio::time::sleep(self.config.post_call_pause).await;
                    let outcome = match response::parse(&reply) {
                        Ok(annotation) => match annotation.range_violation() {
                            None => AnnotationOutcome::Annotated(annotation),
                            Some(violation) => AnnotationOutcome::Failed(format!("Out of range: {}", violation)),
                        },
                        Err(e) => AnnotationOutcome::Failed(e.to_string()),
                    };
                    if let AnnotationOutcome::Failed(reason) = &outcome {
                        tracing::warn!("Unusable classifier reply: {}", reason);
                    }
                    return Ok((Some(reply), outcome));
                }
                Err(ClassifierError::RateLimited) => {
                    tracing::warn!("Rate limited, waiting {:?} before retrying", self.config.rate_limit_backoff);
                    tokio::time::sleep(self.config.rate_limit_backoff).await;
                }
                Err(e) if e.is_fatal() => return Err(AppError::Classifier(e)),
                Err(e) if e.is_transient() && transient_attempts < self.config.transient_retries => {
                    let delay = transient_delay(self.config.transient_backoff, transient_attempts);
                    transient_attempts += 1;
                    tracing::warn!(
                        "Classifier call failed ({}), retry {}/{} in {:?}",
                        e, transient_attempts, self.config.transient_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!("Classifier call failed, abandoning fragment: {}", e);
                    return Ok((None, AnnotationOutcome::Failed(e.to_string())));
                }
            }
        }
    }
}

fn transient_delay(initial: Duration, attempt: u32) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_TRANSIENT_BACKOFF)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::classifier::response::tests::VALID_OBJECT;
    use crate::edgar::RawFiling;

    struct StaticSource(Vec<RawFiling>);

    #[async_trait]
    impl FilingSource for StaticSource {
        async fn filings(&self, cik: &str) -> Result<Vec<RawFiling>, ExtractError> {
            if cik == "0000000404" {
                return Err(ExtractError::Source(cik.to_string(), std::io::ErrorKind::NotFound.into()));
            }
            Ok(self.0.iter().filter(|f| f.cik == cik).cloned().collect())
        }
    }

    /// Replays scripted replies in order, then keeps returning the fallback.
    #[derive(Clone)]
    struct ScriptedClassifier {
        script: Arc<Mutex<VecDeque<Result<String, ClassifierError>>>>,
        fallback: String,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedClassifier {
        fn always(reply: &str) -> Self {
            Self::scripted(Vec::new(), reply)
        }

        fn scripted(script: Vec<Result<String, ClassifierError>>, fallback: &str) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                fallback: fallback.to_string(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EvidenceClassifier for ScriptedClassifier {
        async fn classify(&self, _fragment: &str) -> Result<String, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    const P1: &str = "We deployed machine learning models to optimize pricing across all of our stores.";
    const P2: &str = "Our artificial intelligence research group launched a new fraud detection system.";

    fn submission(filed: &str, paragraphs: &[&str]) -> String {
        let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
        format!(
            "<SEC-HEADER>\nFILED AS OF DATE:\t\t{}\n</SEC-HEADER>\n<DOCUMENT>\n<TYPE>10-K\n<TEXT>\n<html><body>{}</body></html>\n</TEXT>\n</DOCUMENT>\n",
            filed, body
        )
    }

    fn filing(cik: &str, text: String) -> RawFiling {
        RawFiling { cik: cik.to_string(), source: format!("{}.txt", cik), text }
    }

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::new(FilingWindow::new(2018, 2019).unwrap());
        config.rate_limit_backoff = Duration::ZERO;
        config.post_call_pause = Duration::ZERO;
        config.transient_backoff = Duration::ZERO;
        config
    }

    fn open<C: EvidenceClassifier>(
        storage: &StorageManager,
        filings: Vec<RawFiling>,
        classifier: C,
    ) -> PipelineDriver<StaticSource, C> {
        PipelineDriver::open(config(), KeywordVocabulary::default(), StaticSource(filings), classifier, storage).unwrap()
    }

    fn adoption_records(storage: &StorageManager) -> Vec<AdoptionRecord> {
        JsonlWriter::<AdoptionRecord>::load(storage.adoption_log_path()).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_scores_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let classifier = ScriptedClassifier::always(&format!("Sure! {} Hope this helps.", VALID_OBJECT));
        let filings = vec![filing("0000000001", submission("20190415", &[P1, P2]))];

        let mut driver = open(&storage, filings, classifier.clone());
        let summary = driver.run(&["0000000001".to_string()]).await.unwrap();

        assert_eq!(summary.fragments, 2);
        assert_eq!(summary.records_written, 1);
        assert_eq!(classifier.calls(), 2);

        let records = adoption_records(&storage);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!((record.cik.as_str(), record.year), ("0000000001", 2019));
        assert_eq!(record.fragments_considered, 2);
        assert_eq!(record.fragments_weighted, 2);
        // 2.0 * (0.5 + 0.3) * 0.8 * 0.9 per fragment
        let weight = 2.0 * 0.8 * 0.8 * 0.9;
        assert!((record.raw_weight_sum - 2.0 * weight).abs() < 1e-9);
        assert!((record.adoption_score - (2.0 * weight).ln_1p() / 2.0).abs() < 1e-9);

        let logged = JsonlWriter::<FragmentLogEntry>::load(storage.fragment_log_path()).unwrap();
        let ids: Vec<_> = logged.iter().map(|e| e.paragraph_id.as_str()).collect();
        assert_eq!(ids, vec!["2019_p1", "2019_p2"]);
        assert_eq!(logged[0].paragraph_hash, content_hash(P1));
        assert!(logged[0].raw_response.as_deref().unwrap().starts_with("Sure!"));
    }

    #[tokio::test]
    async fn test_resume_does_not_double_count() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let reply = VALID_OBJECT.to_string();
        let filings = vec![filing("0000000001", submission("20190415", &[P1, P2]))];

        // Reference: one uninterrupted run in a separate directory
        let reference_dir = tempfile::tempdir().unwrap();
        let reference_storage = StorageManager::new(reference_dir.path()).unwrap();
        open(&reference_storage, filings.clone(), ScriptedClassifier::always(&reply))
            .run(&["0000000001".to_string()])
            .await
            .unwrap();
        let reference = adoption_records(&reference_storage).remove(0);

        // Interrupted run: only the first fragment made it to the log
        let outcome = AnnotationOutcome::Annotated(response::parse(&reply).unwrap());
        let mut log = JsonlWriter::<FragmentLogEntry>::open(storage.fragment_log_path()).unwrap();
        log.append(&FragmentLogEntry::new("0000000001", 2019, 1, P1, Some(reply.clone()), &outcome)).unwrap();
        drop(log);

        let resumed_classifier = ScriptedClassifier::always(&reply);
        let mut driver = open(&storage, filings.clone(), resumed_classifier.clone());
        let summary = driver.run(&["0000000001".to_string()]).await.unwrap();
        assert_eq!(resumed_classifier.calls(), 1, "only the unlogged fragment is classified");
        assert_eq!(summary.reused, 1);

        let records = adoption_records(&storage);
        assert_eq!(records, vec![reference.clone()]);
        assert_eq!(records[0].fragments_considered, 2);

        // A third run over the same inputs changes nothing
        let idle_classifier = ScriptedClassifier::always(&reply);
        let mut driver = open(&storage, filings, idle_classifier.clone());
        driver.run(&["0000000001".to_string()]).await.unwrap();
        assert_eq!(idle_classifier.calls(), 0);
        assert_eq!(adoption_records(&storage), vec![reference]);
        assert_eq!(JsonlWriter::<FragmentLogEntry>::load(storage.fragment_log_path()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limits_retried_and_failures_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let classifier = ScriptedClassifier::scripted(
            vec![
                Err(ClassifierError::RateLimited),
                Err(ClassifierError::RateLimited),
                Ok(VALID_OBJECT.to_string()),
                Err(ClassifierError::EmptyReply("no text content blocks".into())),
            ],
            VALID_OBJECT,
        );
        let filings = vec![filing("0000000001", submission("20190415", &[P1, P2]))];

        let mut driver = open(&storage, filings, classifier.clone());
        let summary = driver.run(&["0000000001".to_string()]).await.unwrap();

        assert_eq!(classifier.calls(), 4);
        assert_eq!(summary.failed_fragments, 1);
        let record = adoption_records(&storage).remove(0);
        assert_eq!(record.fragments_considered, 2);
        assert_eq!(record.fragments_weighted, 1);

        let logged = JsonlWriter::<FragmentLogEntry>::load(storage.fragment_log_path()).unwrap();
        assert!(logged[1].annotation.is_none());
        assert!(logged[1].error.as_deref().unwrap().contains("unusable reply"));
    }

    #[tokio::test]
    async fn test_transient_failures_retried_before_abandoning() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let unavailable = || Err(ClassifierError::Http(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        let classifier = ScriptedClassifier::scripted(
            vec![
                // P1 recovers on its second attempt
                unavailable(),
                Ok(VALID_OBJECT.to_string()),
                // P2 outlasts every retry
                unavailable(),
                unavailable(),
                unavailable(),
                unavailable(),
            ],
            VALID_OBJECT,
        );
        let filings = vec![filing("0000000001", submission("20190415", &[P1, P2]))];

        let summary = open(&storage, filings, classifier.clone()).run(&["0000000001".to_string()]).await.unwrap();

        assert_eq!(classifier.calls(), 2 + 1 + DEFAULT_TRANSIENT_RETRIES as usize);
        assert_eq!(summary.failed_fragments, 1);
        let record = adoption_records(&storage).remove(0);
        assert_eq!(record.fragments_considered, 2);
        assert_eq!(record.fragments_weighted, 1);

        let logged = JsonlWriter::<FragmentLogEntry>::load(storage.fragment_log_path()).unwrap();
        assert!(logged[0].annotation.is_some());
        assert!(logged[1].error.as_deref().unwrap().contains("503"));
    }

    #[test]
    fn test_transient_delay_doubles_and_caps() {
        let initial = Duration::from_secs(5);
        assert_eq!(transient_delay(initial, 0), Duration::from_secs(5));
        assert_eq!(transient_delay(initial, 2), Duration::from_secs(20));
        assert_eq!(transient_delay(initial, 10), MAX_TRANSIENT_BACKOFF);
    }

    #[tokio::test]
    async fn test_unparseable_and_out_of_range_replies_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let out_of_range = VALID_OBJECT.replace(r#""significance_score":2.0"#, r#""significance_score":7.0"#);
        let classifier = ScriptedClassifier::scripted(
            vec![Ok("I am unable to help with that.".to_string()), Ok(out_of_range)],
            VALID_OBJECT,
        );
        let filings = vec![filing("0000000001", submission("20190415", &[P1, P2]))];

        open(&storage, filings, classifier).run(&["0000000001".to_string()]).await.unwrap();

        let record = adoption_records(&storage).remove(0);
        assert_eq!(record.fragments_considered, 2);
        assert_eq!(record.fragments_weighted, 0);
        assert_eq!(record.adoption_score, 0.0);

        let logged = JsonlWriter::<FragmentLogEntry>::load(storage.fragment_log_path()).unwrap();
        assert_eq!(logged[0].error.as_deref(), Some("No JSON object found in reply"));
        assert!(logged[1].error.as_deref().unwrap().starts_with("Out of range"));
    }

    #[tokio::test]
    async fn test_year_without_fragments_and_skipped_filings() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let classifier = ScriptedClassifier::always(VALID_OBJECT);
        let filings = vec![
            filing("0000000001", submission("20180301", &["Revenue grew because customers bought more of our products this year."])),
            filing("0000000001", submission("20170301", &[P1])), // outside the window
            filing("0000000001", "<DOCUMENT>\n<TYPE>8-K\n<TEXT>\n</TEXT>\n</DOCUMENT>\nFILED AS OF DATE: 20190101\n".to_string()),
        ];

        let mut driver = open(&storage, filings, classifier.clone());
        let summary = driver
            .run(&["0000000001".to_string(), "0000000404".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.companies, 1, "unreadable company is skipped, not fatal");
        assert_eq!(classifier.calls(), 0);
        let records = adoption_records(&storage);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, 2018);
        assert_eq!(records[0].fragments_considered, 0);
        assert_eq!(records[0].adoption_score, 0.0);
    }

    #[tokio::test]
    async fn test_same_year_filings_keep_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let classifier = ScriptedClassifier::always(VALID_OBJECT);
        let filings = vec![
            filing("0000000001", submission("20190301", &[P1])),
            filing("0000000001", submission("20190601", &[P1, P2])),
        ];

        open(&storage, filings, classifier.clone()).run(&["0000000001".to_string()]).await.unwrap();

        assert_eq!(classifier.calls(), 3);
        let record = adoption_records(&storage).remove(0);
        assert_eq!(record.fragments_considered, 3);
        let ids: Vec<_> = JsonlWriter::<FragmentLogEntry>::load(storage.fragment_log_path())
            .unwrap()
            .into_iter()
            .map(|e| e.paragraph_id)
            .collect();
        assert_eq!(ids, vec!["2019_p1", "2019_p2", "2019_p3"]);
    }

    #[tokio::test]
    async fn test_rejected_credentials_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let classifier = ScriptedClassifier::scripted(
            vec![Err(ClassifierError::Http(reqwest::StatusCode::UNAUTHORIZED))],
            VALID_OBJECT,
        );
        let filings = vec![filing("0000000001", submission("20190415", &[P1]))];

        let result = open(&storage, filings, classifier).run(&["0000000001".to_string()]).await;
        assert!(matches!(result, Err(AppError::Classifier(ClassifierError::Http(_)))));
        assert!(adoption_records(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_extraction_output_groups_by_year() {
        let source = StaticSource(vec![
            filing("0000000001", submission("20190301", &[P1])),
            filing("0000000001", submission("20180301", &[P2])),
        ]);
        let processor = FilingProcessor::new(&config(), KeywordVocabulary::default());
        let sections = processor.sections(&source, "0000000001").await.unwrap();
        let output = extraction_output("0000000001", &sections);

        assert_eq!(output.filings.keys().cloned().collect::<Vec<_>>(), vec!["2018", "2019"]);
        assert_eq!(output.filings["2019"], vec![Fragment { text: P1.to_string() }]);
    }
}
