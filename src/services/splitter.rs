use crate::error::{Result, SplitterError};
use crate::services::detector::BoundaryDetector;
use crate::services::packager::ArtifactPackager;
use crate::services::source::SourceDocument;
use crate::types::{OutputDocument, Rule, Segment, SplitConfig, SplitOutcome};
use tracing::{debug, info};

pub struct DocumentSplitter;

impl DocumentSplitter {
    /// Runs the whole pipeline for one document: detect split points, extract
    /// every segment and package the parts.
    pub fn split_document(
        source: &dyn SourceDocument,
        base_name: &str,
        rule: Option<&Rule>,
        config: &SplitConfig,
    ) -> Result<SplitOutcome> {
        info!(
            "Splitting document '{}' ({} pages, cap {})",
            base_name,
            source.page_count(),
            config.max_pages
        );

        Self::validate_split_config(config)?;

        let detector = BoundaryDetector::new(config.max_pages, config.evaluation_mode);
        let split_points = detector.find_split_points(rule, source)?;
        let segments = Self::build_segments(&split_points.points)?;

        let outputs = segments
            .iter()
            .enumerate()
            .map(|(idx, segment)| {
                Self::materialize(source, *segment, idx, base_name, &config.extension)
            })
            .collect::<Result<Vec<_>>>()?;

        let total_pages: usize = outputs.iter().map(|doc| doc.range.len()).sum();
        if total_pages != split_points.capped_page_count {
            return Err(SplitterError::SegmentInvariant {
                reason: format!(
                    "extracted {} pages but {} were processed",
                    total_pages, split_points.capped_page_count
                ),
            });
        }

        let packager = ArtifactPackager::new(config.include_summary);
        let package = packager.package(base_name, &outputs, &split_points, config.max_pages)?;

        info!(
            "Successfully split document into {} files with {} total pages",
            package.summary.segment_count, package.summary.total_pages
        );

        Ok(SplitOutcome {
            split_points,
            outputs,
            summary: package.summary,
            archive: package.archive,
        })
    }

    fn validate_split_config(config: &SplitConfig) -> Result<()> {
        if config.max_pages == 0 {
            return Err(SplitterError::SplitConfig {
                reason: "Page cap must be greater than 0".to_string(),
            });
        }

        if config.extension.is_empty() {
            return Err(SplitterError::SplitConfig {
                reason: "Output extension must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Turns adjacent split points into half-open page ranges.
    pub fn build_segments(split_points: &[usize]) -> Result<Vec<Segment>> {
        split_points
            .windows(2)
            .map(|pair| {
                let segment = Segment {
                    start: pair[0],
                    end: pair[1],
                };
                if segment.start >= segment.end {
                    return Err(SplitterError::SegmentInvariant {
                        reason: format!("empty segment {}..{}", segment.start, segment.end),
                    });
                }
                Ok(segment)
            })
            .collect()
    }

    /// Extracts one segment into its own document named `<base>_part<n>.<ext>`.
    pub fn materialize(
        source: &dyn SourceDocument,
        segment: Segment,
        index: usize,
        base_name: &str,
        extension: &str,
    ) -> Result<OutputDocument> {
        let extracted = source.extract_pages(segment)?;
        if extracted.page_count != segment.len() {
            return Err(SplitterError::SegmentInvariant {
                reason: format!(
                    "segment {}..{} produced {} pages, expected {}",
                    segment.start,
                    segment.end,
                    extracted.page_count,
                    segment.len()
                ),
            });
        }

        let name = Self::part_name(base_name, index + 1, extension);
        debug!(
            "Created {} with {} pages (pages {}-{})",
            name,
            segment.len(),
            segment.start + 1,
            segment.end
        );

        Ok(OutputDocument {
            name,
            range: segment,
            content: extracted.content,
        })
    }

    pub fn part_name(base_name: &str, part: usize, extension: &str) -> String {
        let base_name = if base_name.is_empty() {
            "document"
        } else {
            base_name
        };
        format!("{}_part{}.{}", base_name, part, extension)
    }
}
