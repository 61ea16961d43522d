// src/extractors/mod.rs
pub mod document;
pub mod keywords;
pub mod paragraph;

// Re-export key extraction types for convenience
pub use document::DocumentSectionExtractor;
pub use keywords::KeywordVocabulary;
pub use paragraph::{Fragment, ParagraphSegmenter};
