use crate::error::{Result, SplitterError};
use crate::services::rules::RuleEvaluator;
use crate::services::source::SourceDocument;
use crate::types::{EvaluationMode, Rule, SplitPoints, DEFAULT_MAX_PAGES};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Finds the pages at which a new output document starts.
pub struct BoundaryDetector {
    evaluator: RuleEvaluator,
    max_pages: usize,
}

impl BoundaryDetector {
    pub fn new(max_pages: usize, mode: EvaluationMode) -> Self {
        Self {
            evaluator: RuleEvaluator::new(mode),
            max_pages,
        }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn capped_page_count(&self, page_count: usize) -> usize {
        page_count.min(self.max_pages)
    }

    /// Scans pages `0..min(page_count, max_pages)` and returns the sorted,
    /// duplicate-free split points, always starting at 0 and ending with the
    /// capped page count.
    pub fn find_split_points(
        &self,
        rule: Option<&Rule>,
        source: &dyn SourceDocument,
    ) -> Result<SplitPoints> {
        let matched = self.matching_pages(rule, source)?;
        Ok(self.split_points_from(&matched, source.page_count()))
    }

    /// Builds split points from already known matching page indices.
    pub fn split_points_from(&self, matched: &[usize], page_count: usize) -> SplitPoints {
        let capped = self.capped_page_count(page_count);
        let truncated = page_count > capped;
        if truncated {
            warn!(
                "Document has {} pages, only the first {} will be processed",
                page_count, capped
            );
        }

        let mut points = BTreeSet::new();
        points.insert(0);
        points.extend(matched.iter().copied().filter(|&index| index < capped));
        points.insert(capped);

        let points: Vec<usize> = points.into_iter().collect();
        info!(
            "Found {} segments across {} pages",
            points.len().saturating_sub(1),
            capped
        );

        SplitPoints {
            points,
            page_count,
            capped_page_count: capped,
            truncated,
        }
    }

    /// Indices of the scanned pages the rule matches, in page order.
    pub fn matching_pages(
        &self,
        rule: Option<&Rule>,
        source: &dyn SourceDocument,
    ) -> Result<Vec<usize>> {
        if source.page_count() == 0 {
            return Err(SplitterError::EmptyDocument);
        }

        let rule = match rule {
            Some(rule) => rule,
            None => {
                debug!("No rule given, document will not be split");
                return Ok(Vec::new());
            }
        };

        self.evaluator.validate(rule)?;

        let capped = self.capped_page_count(source.page_count());
        let mut matched = Vec::new();
        for index in 0..capped {
            let text = source.page_text(index)?;
            if self.evaluator.evaluate(rule, &text)? {
                debug!("Rule matched page {}", index + 1);
                matched.push(index);
            }
        }

        Ok(matched)
    }
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES, EvaluationMode::Strict)
    }
}
