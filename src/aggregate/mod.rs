// src/aggregate/mod.rs
//
// Folds per-fragment annotations into one record per (company, year).
//
// weight         = significance * (timeline[current] + timeline[happened])
//                  * aggressiveness[active] * ai_relevance
// adoption_score = ln(1 + sum(weight)) / count(weight != 0)
//
// Frozen formula: scores must stay comparable with earlier runs. It is not
// validated against ground truth in this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::{Annotation, AnnotationOutcome, Distribution};

pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.05;

pub const DIRECTION_CATEGORIES: &[&str] = &["positive", "negative", "other"];
pub const TOPIC_CATEGORIES: &[&str] = &["labor", "investment", "revenue", "competition", "M&A", "other"];
pub const TIMELINE_CATEGORIES: &[&str] = &["happened", "current", "planning", "other"];
pub const AGGRESSIVENESS_CATEGORIES: &[&str] = &["active", "passive", "other"];

/// In-progress aggregation for one company-year.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyYearRecord {
    pub cik: String,
    pub year: u32,
    pub fragments_considered: usize,
    pub fragments_relevant: usize,
    pub fragments_weighted: usize,
    pub raw_weight_sum: f64,
    pub direction: Distribution,
    pub topics: Distribution,
    pub timeline: Distribution,
    pub aggressiveness: Distribution,
}

/// Finalized, normalized adoption evidence for one company-year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionRecord {
    pub cik: String,
    pub year: u32,
    pub fragments_considered: usize,
    pub fragments_relevant: usize,
    pub fragments_weighted: usize,
    pub raw_weight_sum: f64,
    pub adoption_score: f64,
    pub direction: Distribution,
    pub topics: Distribution,
    pub timeline: Distribution,
    pub aggressiveness: Distribution,
}

fn seeded(categories: &[&str]) -> Distribution {
    categories.iter().map(|c| (c.to_string(), 0.0)).collect()
}

impl CompanyYearRecord {
    pub fn new(cik: &str, year: u32) -> Self {
        Self {
            cik: cik.to_string(),
            year,
            fragments_considered: 0,
            fragments_relevant: 0,
            fragments_weighted: 0,
            raw_weight_sum: 0.0,
            direction: seeded(DIRECTION_CATEGORIES),
            topics: seeded(TOPIC_CATEGORIES),
            timeline: seeded(TIMELINE_CATEGORIES),
            aggressiveness: seeded(AGGRESSIVENESS_CATEGORIES),
        }
    }
}

fn category(distribution: &Distribution, name: &str) -> f64 {
    distribution.get(name).copied().unwrap_or(0.0)
}

/// Scalar evidence weight of one annotation. Missing categories count as zero.
pub fn fragment_weight(annotation: &Annotation) -> f64 {
    annotation.significance_score
        * (category(&annotation.timeline, "current") + category(&annotation.timeline, "happened"))
        * category(&annotation.aggressiveness, "active")
        * annotation.ai_relevance_score
}

fn add_scaled(accumulator: &mut Distribution, distribution: &Distribution, weight: f64) {
    for (name, value) in distribution {
        *accumulator.entry(name.clone()).or_insert(0.0) += value * weight;
    }
}

/// Divides every category by the distribution's total; a zero total yields all zeros.
pub fn normalize(accumulator: &Distribution) -> Distribution {
    let total: f64 = accumulator.values().sum();
    accumulator
        .iter()
        .map(|(name, value)| {
            let share = if total == 0.0 { 0.0 } else { value / total };
            (name.clone(), share)
        })
        .collect()
}

/// `ln(1 + raw_weight_sum) / weighted_fragments`, or 0.0 when nothing carried weight.
pub fn adoption_score(raw_weight_sum: f64, weighted_fragments: usize) -> f64 {
    if weighted_fragments == 0 {
        return 0.0;
    }
    raw_weight_sum.ln_1p() / weighted_fragments as f64
}

#[derive(Debug, Clone)]
pub struct AggregationEngine {
    relevance_threshold: f64,
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RELEVANCE_THRESHOLD)
    }
}

impl AggregationEngine {
    pub fn new(relevance_threshold: f64) -> Self {
        Self { relevance_threshold }
    }

    /// Folds one fragment's outcome into the record. Every call counts as considered;
    /// failed, low-relevance and zero-weight fragments add nothing else.
    pub fn accumulate(&self, record: &mut CompanyYearRecord, outcome: &AnnotationOutcome) {
        record.fragments_considered += 1;

        let annotation = match outcome {
            AnnotationOutcome::Annotated(annotation) => annotation,
            AnnotationOutcome::Failed(reason) => {
                tracing::debug!("{} {}: fragment excluded, classifier error: {}", record.cik, record.year, reason);
                return;
            }
        };
        if annotation.ai_relevance_score < self.relevance_threshold {
            tracing::debug!(
                "{} {}: fragment excluded, relevance {} below {}",
                record.cik, record.year, annotation.ai_relevance_score, self.relevance_threshold
            );
            return;
        }
        record.fragments_relevant += 1;

        let weight = fragment_weight(annotation);
        if weight == 0.0 || !weight.is_finite() {
            return;
        }

        record.fragments_weighted += 1;
        record.raw_weight_sum += weight;
        add_scaled(&mut record.direction, &annotation.direction, weight);
        add_scaled(&mut record.topics, &annotation.topics, weight);
        add_scaled(&mut record.timeline, &annotation.timeline, weight);
        add_scaled(&mut record.aggressiveness, &annotation.aggressiveness, weight);
    }

    pub fn finalize(&self, record: CompanyYearRecord) -> AdoptionRecord {
        let score = adoption_score(record.raw_weight_sum, record.fragments_weighted);
        tracing::info!(
            "Finalized {} {}: score {:.4} from {} weighted / {} considered fragment(s)",
            record.cik, record.year, score, record.fragments_weighted, record.fragments_considered
        );

        AdoptionRecord {
            adoption_score: score,
            direction: normalize(&record.direction),
            topics: normalize(&record.topics),
            timeline: normalize(&record.timeline),
            aggressiveness: normalize(&record.aggressiveness),
            cik: record.cik,
            year: record.year,
            fragments_considered: record.fragments_considered,
            fragments_relevant: record.fragments_relevant,
            fragments_weighted: record.fragments_weighted,
            raw_weight_sum: record.raw_weight_sum,
        }
    }
}

/// Partial accumulators keyed by (cik, year).
#[derive(Debug, Default)]
pub struct AggregationStore {
    records: BTreeMap<(String, u32), CompanyYearRecord>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for the key, created empty on first sight so that a year with no
    /// fragments still yields a record.
    pub fn record_mut(&mut self, cik: &str, year: u32) -> &mut CompanyYearRecord {
        self.records
            .entry((cik.to_string(), year))
            .or_insert_with(|| CompanyYearRecord::new(cik, year))
    }

    /// Removes and returns every record of one company, in year order.
    pub fn take_company(&mut self, cik: &str) -> Vec<CompanyYearRecord> {
        let keys: Vec<_> = self.records.keys().filter(|(c, _)| c == cik).cloned().collect();
        keys.into_iter().filter_map(|key| self.records.remove(&key)).collect()
    }
}
