//! # PDF Rule Splitter Library
//!
//! Splits a PDF into several documents wherever a page matches a text rule,
//! and bundles the parts into a ZIP archive.
//!
//! ## Example Usage
//!
//! ```no_run
//! use pdf_rule_splitter::{ContentFetcher, RuleParser, SplitConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let document = ContentFetcher::fetch_document("statements.pdf").await?;
//!
//!     // Start a new part on every page mentioning "account summary"
//!     let rule = RuleParser::default()
//!         .parse_str(r#"{"type": "contains", "text": "Account Summary"}"#)?;
//!
//!     let outcome = pdf_rule_splitter::split_pdf(
//!         &document.bytes,
//!         &document.base_name,
//!         rule.as_ref(),
//!         &SplitConfig::default(),
//!     )?;
//!
//!     println!("{} ({} parts)", outcome.summary.message, outcome.summary.segment_count);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod services;
pub mod types;

// Re-export main types and services for easier usage
pub use error::{Result, SplitterError};
pub use services::{
    ArtifactPackager, BoundaryDetector, ContentFetcher, DocumentSplitter, OutputWriter,
    PdfSource, RuleEvaluator, RuleParser, SourceDocument,
};
pub use types::{
    Condition, ConditionKind, EvaluationMode, FetchedDocument, OutputDocument, Rule, Segment,
    SourceType, SplitConfig, SplitOutcome, SplitPoints, SplitSummary, DEFAULT_MAX_PAGES,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Splits raw PDF bytes with `rule`; `None` keeps the document in one part.
pub fn split_pdf(
    bytes: &[u8],
    base_name: &str,
    rule: Option<&Rule>,
    config: &SplitConfig,
) -> Result<SplitOutcome> {
    let source = PdfSource::from_bytes(bytes)?;
    DocumentSplitter::split_document(&source, base_name, rule, config)
}
