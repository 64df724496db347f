use crate::error::{Result, SplitterError};
use crate::services::text::normalize_text;
use crate::types::{Condition, ConditionKind, EvaluationMode, Rule};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Normalizes rule input into a [`Rule`] tree.
///
/// Two shapes are accepted: the recursive tree
/// (`{"operator": "AND", "conditions": [...]}` with
/// `{"type": "contains", "text": "..."}` leaves) and the legacy flat list of
/// leaves, which means "split where any leaf matches". `null`, `{}` and an
/// empty list all mean no rule.
pub struct RuleParser {
    mode: EvaluationMode,
}

impl RuleParser {
    pub fn new(mode: EvaluationMode) -> Self {
        Self { mode }
    }

    pub fn parse_str(&self, input: &str) -> Result<Option<Rule>> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(trimmed)?;
        self.parse_value(&value)
    }

    pub fn parse_value(&self, value: &Value) -> Result<Option<Rule>> {
        let rule = match value {
            Value::Null => None,
            Value::Array(items) => self.parse_flat_list(items)?,
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) if Self::is_legacy_wrapper(map) => match map.get("rules") {
                Some(Value::Array(items)) => self.parse_flat_list(items)?,
                _ => {
                    return Err(SplitterError::malformed("\"rules\" must be a list of conditions"))
                }
            },
            Value::Object(_) => Some(self.parse_node(value)?),
            other => {
                return Err(SplitterError::malformed(format!(
                    "expected a rule object or list, found {}",
                    json_kind(other)
                )))
            }
        };

        debug!("Parsed rule: {:?}", rule);
        Ok(rule)
    }

    /// Builds the legacy implicit-OR rule from plain pattern lists.
    pub fn from_patterns(contains: &[String], not_contains: &[String]) -> Option<Rule> {
        let leaves: Vec<Rule> = contains
            .iter()
            .map(|p| Rule::from(Condition::contains(p.as_str())))
            .chain(
                not_contains
                    .iter()
                    .map(|p| Rule::from(Condition::not_contains(p.as_str()))),
            )
            .collect();

        if leaves.is_empty() {
            None
        } else {
            Some(Rule::Or(leaves))
        }
    }

    /// Merges a parsed rule tree with pattern flags: a page matches when
    /// either of them does.
    pub fn combine(tree: Option<Rule>, patterns: Option<Rule>) -> Option<Rule> {
        match (tree, patterns) {
            (Some(tree), Some(patterns)) => Some(Rule::Or(vec![tree, patterns])),
            (tree, patterns) => tree.or(patterns),
        }
    }

    fn is_legacy_wrapper(map: &Map<String, Value>) -> bool {
        map.contains_key("rules") && !map.contains_key("operator") && !map.contains_key("type")
    }

    fn parse_flat_list(&self, items: &[Value]) -> Result<Option<Rule>> {
        if items.is_empty() {
            return Ok(None);
        }
        let children = items
            .iter()
            .map(|item| self.parse_node(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Rule::Or(children)))
    }

    fn parse_node(&self, value: &Value) -> Result<Rule> {
        let map = match value.as_object() {
            Some(map) => map,
            None => return self.reject(format!("expected a rule object, found {}", json_kind(value))),
        };

        if let Some(operator) = map.get("operator") {
            return self.parse_operator(operator, map.get("conditions"));
        }

        if let Some(kind) = map.get("type") {
            return self.parse_condition(kind, map.get("text"));
        }

        self.reject("rule node has neither \"operator\" nor \"type\"".to_string())
    }

    fn parse_operator(&self, operator: &Value, conditions: Option<&Value>) -> Result<Rule> {
        let children = match conditions {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| self.parse_node(item))
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return self.reject(format!(
                    "\"conditions\" must be a list, found {}",
                    json_kind(other)
                ))
            }
        };

        let name = operator.as_str().map(str::to_ascii_uppercase);
        match name.as_deref() {
            Some("AND") => Ok(Rule::And(children)),
            Some("OR") => Ok(Rule::Or(children)),
            Some("NOT") => Ok(Rule::Not(children)),
            _ => self.reject(format!("unknown operator {}", operator)),
        }
    }

    fn parse_condition(&self, kind: &Value, text: Option<&Value>) -> Result<Rule> {
        let kind = match kind.as_str() {
            Some("contains") => ConditionKind::Contains,
            Some("not_contains") => ConditionKind::NotContains,
            _ => return self.reject(format!("unknown condition type {}", kind)),
        };

        match text.and_then(Value::as_str) {
            Some(pattern) => Ok(Rule::Condition(Condition {
                kind,
                pattern: pattern.to_string(),
            })),
            None => self.reject("condition is missing a string \"text\"".to_string()),
        }
    }

    fn reject(&self, reason: String) -> Result<Rule> {
        match self.mode {
            EvaluationMode::Strict => Err(SplitterError::MalformedRule { reason }),
            EvaluationMode::Lenient => {
                warn!("Ignoring malformed rule node ({}), it will never match", reason);
                Ok(never())
            }
        }
    }
}

impl Default for RuleParser {
    fn default() -> Self {
        Self::new(EvaluationMode::Strict)
    }
}

/// A rule that is false for every page.
fn never() -> Rule {
    Rule::Or(Vec::new())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Decides per page whether a rule holds.
pub struct RuleEvaluator {
    mode: EvaluationMode,
}

impl RuleEvaluator {
    pub fn new(mode: EvaluationMode) -> Self {
        Self { mode }
    }

    /// Checks the structure of a whole tree so that malformed rules are
    /// reported before any page is scanned, independent of page content.
    pub fn validate(&self, rule: &Rule) -> Result<()> {
        if self.mode == EvaluationMode::Lenient {
            return Ok(());
        }

        match rule {
            Rule::Condition(_) => Ok(()),
            Rule::And(children) | Rule::Or(children) => {
                children.iter().try_for_each(|child| self.validate(child))
            }
            Rule::Not(children) => {
                if children.len() != 1 {
                    return Err(not_arity_error(children.len()));
                }
                self.validate(&children[0])
            }
        }
    }

    /// Evaluates `rule` against already lowercased page text.
    pub fn evaluate(&self, rule: &Rule, page_text: &str) -> Result<bool> {
        match rule {
            Rule::Condition(condition) => Ok(Self::matches(condition, page_text)),
            Rule::And(children) => {
                for child in children {
                    if !self.evaluate(child, page_text)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Rule::Or(children) => {
                for child in children {
                    if self.evaluate(child, page_text)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Rule::Not(children) => match children.as_slice() {
                [child] => Ok(!self.evaluate(child, page_text)?),
                _ => match self.mode {
                    EvaluationMode::Strict => Err(not_arity_error(children.len())),
                    EvaluationMode::Lenient => {
                        warn!(
                            "NOT with {} conditions treated as false",
                            children.len()
                        );
                        Ok(false)
                    }
                },
            },
        }
    }

    fn matches(condition: &Condition, page_text: &str) -> bool {
        let found = page_text.contains(&normalize_text(&condition.pattern));
        match condition.kind {
            ConditionKind::Contains => found,
            ConditionKind::NotContains => !found,
        }
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(EvaluationMode::Strict)
    }
}

fn not_arity_error(found: usize) -> SplitterError {
    SplitterError::malformed(format!(
        "NOT requires exactly one condition, found {}",
        found
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contains(p: &str) -> Rule {
        Condition::contains(p).into()
    }

    fn strict() -> RuleEvaluator {
        RuleEvaluator::default()
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let evaluator = strict();
        assert!(evaluator.evaluate(&contains("Header"), "page header text").unwrap());
        assert!(!evaluator.evaluate(&contains("footer"), "page header text").unwrap());

        let negated = Condition::not_contains("FOOTER").into();
        assert!(evaluator.evaluate(&negated, "page header text").unwrap());
    }

    #[test]
    fn test_or_matches_any_child() {
        let rule = Rule::Or(vec![contains("a"), contains("b")]);
        assert!(strict().evaluate(&rule, "b").unwrap());
        assert!(!strict().evaluate(&rule, "c").unwrap());
    }

    #[test]
    fn test_empty_combinators() {
        assert!(strict().evaluate(&Rule::And(vec![]), "anything").unwrap());
        assert!(!strict().evaluate(&Rule::Or(vec![]), "anything").unwrap());
    }

    #[test]
    fn test_nested_tree() {
        let rule = Rule::And(vec![
            contains("invoice"),
            Rule::Not(vec![Rule::Or(vec![contains("draft"), contains("void")])]),
        ]);
        assert!(strict().evaluate(&rule, "invoice no. 7").unwrap());
        assert!(!strict().evaluate(&rule, "invoice draft").unwrap());
        assert!(!strict().evaluate(&rule, "receipt").unwrap());
    }

    #[test]
    fn test_not_arity_is_rejected_in_strict_mode() {
        for children in [vec![], vec![contains("a"), contains("b")]] {
            let rule = Rule::Not(children);
            assert!(matches!(
                strict().evaluate(&rule, "a"),
                Err(SplitterError::MalformedRule { .. })
            ));
            assert!(matches!(
                strict().validate(&rule),
                Err(SplitterError::MalformedRule { .. })
            ));
        }
    }

    #[test]
    fn test_validate_finds_nested_errors_regardless_of_short_circuit() {
        // The false first child would short-circuit evaluation.
        let rule = Rule::And(vec![contains("zzz"), Rule::Not(vec![])]);
        assert!(!strict().evaluate(&rule, "abc").unwrap());
        assert!(strict().validate(&rule).is_err());
    }

    #[test]
    fn test_lenient_not_arity_is_false() {
        let evaluator = RuleEvaluator::new(EvaluationMode::Lenient);
        let rule = Rule::Not(vec![]);
        assert!(evaluator.validate(&rule).is_ok());
        assert!(!evaluator.evaluate(&rule, "a").unwrap());
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let rule = Rule::Or(vec![contains("x"), Condition::not_contains("y").into()]);
        let evaluator = strict();
        let first = evaluator.evaluate(&rule, "xy").unwrap();
        for _ in 0..10 {
            assert_eq!(evaluator.evaluate(&rule, "xy").unwrap(), first);
        }
    }

    #[test]
    fn test_parse_tree() {
        let input = json!({
            "operator": "AND",
            "conditions": [
                {"type": "contains", "text": "Chapter"},
                {"operator": "not", "conditions": [{"type": "not_contains", "text": "x"}]}
            ]
        });
        let rule = RuleParser::default().parse_value(&input).unwrap();
        assert_eq!(
            rule,
            Some(Rule::And(vec![
                contains("Chapter"),
                Rule::Not(vec![Condition::not_contains("x").into()]),
            ]))
        );
    }

    #[test]
    fn test_parse_empty_inputs_mean_no_rule() {
        let parser = RuleParser::default();
        assert_eq!(parser.parse_str("").unwrap(), None);
        assert_eq!(parser.parse_str("{}").unwrap(), None);
        assert_eq!(parser.parse_str("[]").unwrap(), None);
        assert_eq!(parser.parse_str("null").unwrap(), None);
        assert_eq!(parser.parse_str(r#"{"rules": []}"#).unwrap(), None);
    }

    #[test]
    fn test_parse_legacy_flat_list_is_or() {
        let parser = RuleParser::default();
        let expected = Some(Rule::Or(vec![
            contains("a"),
            Condition::not_contains("b").into(),
        ]));
        let list = r#"[{"type": "contains", "text": "a"}, {"type": "not_contains", "text": "b"}]"#;
        assert_eq!(parser.parse_str(list).unwrap(), expected);

        let wrapped = format!(r#"{{"rules": {}}}"#, list);
        assert_eq!(parser.parse_str(&wrapped).unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_unknown_shapes_in_strict_mode() {
        let parser = RuleParser::default();
        for input in [
            r#"{"operator": "XOR", "conditions": []}"#,
            r#"{"type": "starts_with", "text": "a"}"#,
            r#"{"type": "contains"}"#,
            r#"{"text": "a"}"#,
            r#"{"operator": "AND", "conditions": {"type": "contains", "text": "a"}}"#,
            r#""contains""#,
        ] {
            assert!(
                matches!(parser.parse_str(input), Err(SplitterError::MalformedRule { .. })),
                "expected rejection for {}",
                input
            );
        }
    }

    #[test]
    fn test_parse_reports_invalid_json() {
        assert!(matches!(
            RuleParser::default().parse_str("{not json"),
            Err(SplitterError::RuleParse(_))
        ));
    }

    #[test]
    fn test_lenient_parse_turns_unknown_nodes_into_never() {
        let parser = RuleParser::new(EvaluationMode::Lenient);
        let rule = parser
            .parse_str(r#"{"operator": "OR", "conditions": [{"type": "regex", "text": "a"}]}"#)
            .unwrap()
            .unwrap();
        let evaluator = RuleEvaluator::new(EvaluationMode::Lenient);
        assert!(!evaluator.evaluate(&rule, "a").unwrap());
    }

    #[test]
    fn test_pattern_whitespace_is_normalized() {
        let rule = contains("Chapter\n  One");
        assert!(strict().evaluate(&rule, "see chapter one here").unwrap());
        assert!(!strict().evaluate(&rule, "chapterone").unwrap());
    }

    #[test]
    fn test_combine_tree_and_patterns() {
        let tree = contains("a");
        let patterns = RuleParser::from_patterns(&["b".to_string()], &[]);

        let combined = RuleParser::combine(Some(tree.clone()), patterns.clone()).unwrap();
        assert_eq!(combined, Rule::Or(vec![tree.clone(), patterns.clone().unwrap()]));
        assert!(strict().evaluate(&combined, "a").unwrap());
        assert!(strict().evaluate(&combined, "b").unwrap());
        assert!(!strict().evaluate(&combined, "c").unwrap());

        assert_eq!(RuleParser::combine(Some(tree.clone()), None), Some(tree));
        assert_eq!(RuleParser::combine(None, patterns.clone()), patterns);
        assert_eq!(RuleParser::combine(None, None), None);
    }

    #[test]
    fn test_from_patterns() {
        assert_eq!(RuleParser::from_patterns(&[], &[]), None);
        let rule = RuleParser::from_patterns(&["a".to_string()], &["b".to_string()]).unwrap();
        assert!(strict().evaluate(&rule, "a b").unwrap());
        assert!(strict().evaluate(&rule, "c").unwrap());
        assert!(!strict().evaluate(&rule, "b").unwrap());
    }
}
