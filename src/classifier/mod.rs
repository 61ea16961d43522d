// src/classifier/mod.rs
pub mod anthropic;
pub mod prompt;
pub mod response;

use async_trait::async_trait;

use crate::utils::error::ClassifierError;

pub use anthropic::AnthropicClassifier;
pub use response::{Annotation, Distribution};

/// What one fragment ended up as: a usable annotation, or the reason there is none.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationOutcome {
    Annotated(Annotation),
    Failed(String),
}

impl AnnotationOutcome {
    pub fn annotation(&self) -> Option<&Annotation> {
        match self {
            AnnotationOutcome::Annotated(annotation) => Some(annotation),
            AnnotationOutcome::Failed(_) => None,
        }
    }
}

/// Maps one fragment to the classifier's free-form reply.
///
/// `ClassifierError::RateLimited` is retried by the caller; every other error
/// abandons the fragment.
#[async_trait]
pub trait EvidenceClassifier: Send + Sync {
    async fn classify(&self, fragment: &str) -> Result<String, ClassifierError>;
}
