use crate::error::{Result, SplitterError};
use crate::types::{OutputDocument, SplitPoints, SplitSummary};
use serde::Serialize;
use std::io::{Cursor, Write};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SUMMARY_ENTRY_NAME: &str = "summary.json";

/// A finished archive together with the summary describing it.
#[derive(Debug, Clone)]
pub struct Package {
    pub archive: Vec<u8>,
    pub summary: SplitSummary,
}

#[derive(Serialize)]
struct SummaryEntry<'a> {
    source: &'a str,
    created_at: String,
    #[serde(flatten)]
    summary: &'a SplitSummary,
    parts: Vec<PartEntry<'a>>,
}

#[derive(Serialize)]
struct PartEntry<'a> {
    part: usize,
    file_name: &'a str,
    start_page: usize,
    end_page: usize,
    page_count: usize,
}

/// Bundles the split documents into a single ZIP archive.
pub struct ArtifactPackager {
    include_summary: bool,
}

impl ArtifactPackager {
    pub fn new(include_summary: bool) -> Self {
        Self { include_summary }
    }

    pub fn package(
        &self,
        source_name: &str,
        outputs: &[OutputDocument],
        split_points: &SplitPoints,
        max_pages: usize,
    ) -> Result<Package> {
        let summary = Self::summarize(outputs, split_points.truncated, max_pages);

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for doc in outputs {
            writer.start_file(doc.name.as_str(), options)?;
            writer.write_all(&doc.content).map_err(|e| SplitterError::Packaging {
                reason: format!("failed to write {}: {}", doc.name, e),
            })?;
            debug!("Added {} ({} bytes) to archive", doc.name, doc.content.len());
        }

        if self.include_summary {
            let entry = Self::summary_entry(source_name, outputs, &summary);
            let json = serde_json::to_vec_pretty(&entry).map_err(|e| SplitterError::Packaging {
                reason: format!("failed to serialize summary: {}", e),
            })?;
            writer.start_file(SUMMARY_ENTRY_NAME, options)?;
            writer.write_all(&json).map_err(|e| SplitterError::Packaging {
                reason: format!("failed to write {}: {}", SUMMARY_ENTRY_NAME, e),
            })?;
        }

        let archive = writer.finish()?.into_inner();
        info!(
            "Packaged {} documents into a {} byte archive",
            outputs.len(),
            archive.len()
        );

        Ok(Package { archive, summary })
    }

    pub fn summarize(outputs: &[OutputDocument], truncated: bool, max_pages: usize) -> SplitSummary {
        let mut message = "PDF split successfully".to_string();
        if truncated {
            message.push_str(&format!(" (only first {} pages processed)", max_pages));
        }

        SplitSummary {
            message,
            segment_count: outputs.len(),
            total_pages: outputs.iter().map(|doc| doc.range.len()).sum(),
            truncated,
        }
    }

    fn summary_entry<'a>(
        source_name: &'a str,
        outputs: &'a [OutputDocument],
        summary: &'a SplitSummary,
    ) -> SummaryEntry<'a> {
        SummaryEntry {
            source: source_name,
            created_at: chrono::Utc::now().to_rfc3339(),
            summary,
            parts: outputs
                .iter()
                .enumerate()
                .map(|(idx, doc)| PartEntry {
                    part: idx + 1,
                    file_name: &doc.name,
                    start_page: doc.range.start + 1,
                    end_page: doc.range.end,
                    page_count: doc.range.len(),
                })
                .collect(),
        }
    }
}

impl Default for ArtifactPackager {
    fn default() -> Self {
        Self::new(true)
    }
}
