pub mod detector;
pub mod fetcher;
pub mod output;
pub mod packager;
pub mod pdf;
pub mod rules;
pub mod source;
pub mod splitter;
pub mod text;

pub use detector::BoundaryDetector;
pub use fetcher::ContentFetcher;
pub use output::{write_atomically, OutputWriter};
pub use packager::{ArtifactPackager, Package};
pub use pdf::PdfSource;
pub use rules::{RuleEvaluator, RuleParser};
pub use source::{ExtractedPages, SourceDocument};
pub use splitter::DocumentSplitter;
