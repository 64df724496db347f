use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Contains,
    NotContains,
}

/// Leaf of a rule tree: a case-insensitive substring test. Whitespace runs in
/// the pattern match any whitespace run in the page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub pattern: String,
}

impl Condition {
    pub fn contains(pattern: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::Contains,
            pattern: pattern.into(),
        }
    }

    pub fn not_contains(pattern: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::NotContains,
            pattern: pattern.into(),
        }
    }
}

/// Normalized boolean expression evaluated once per page.
///
/// `Not` keeps its children as a list so that arity errors in the input are
/// reported by the evaluator instead of being lost during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Condition(Condition),
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Vec<Rule>),
}

impl From<Condition> for Rule {
    fn from(condition: Condition) -> Self {
        Rule::Condition(condition)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Unknown operators, unknown condition kinds and a `NOT` without exactly
    /// one child are errors.
    #[default]
    Strict,
    /// Malformed nodes evaluate to `false`.
    Lenient,
}

/// Half-open page range `[start, end)`, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered split points produced by the boundary detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitPoints {
    /// Segment starts followed by the capped page count as sentinel.
    pub points: Vec<usize>,
    pub page_count: usize,
    pub capped_page_count: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct OutputDocument {
    pub name: String,
    pub range: Segment,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub message: String,
    pub segment_count: usize,
    pub total_pages: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub max_pages: usize,
    pub evaluation_mode: EvaluationMode,
    pub include_summary: bool,
    pub extension: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            evaluation_mode: EvaluationMode::Strict,
            include_summary: true,
            extension: "pdf".to_string(),
        }
    }
}

pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Everything one split request produces, returned directly to the caller.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub split_points: SplitPoints,
    pub outputs: Vec<OutputDocument>,
    pub summary: SplitSummary,
    pub archive: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SourceType {
    LocalFile,
    Url,
}

/// Raw document bytes plus naming information derived from where they came from.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub file_name: String,
    pub base_name: String,
    pub source_type: SourceType,
    pub fetched_at: String,
    pub bytes: Vec<u8>,
}
