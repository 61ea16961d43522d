// src/edgar/mod.rs
pub mod models;
pub mod source;

pub use models::{FilingSection, FilingWindow, RawFiling};
pub use source::{DirectoryFilingSource, FilingSource};
