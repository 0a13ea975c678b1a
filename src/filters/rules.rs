//! Rule evaluators. Each evaluator owns one rule type and reduces an item
//! plus a rule to a [`FilterResult`]. Evaluation is pure and infallible in
//! practice; the Result return leaves room for evaluators that consult
//! external systems.

use crate::error::Result;
use crate::types::{
    ConditionOperator, ContentItem, FilterCondition, FilterResult, FilterRule, RuleAction,
    RuleLogic, RuleType,
};
use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

pub trait RuleEvaluator: Send + Sync {
    fn rule_type(&self) -> RuleType;
    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult>;
}

/// A resolved item field, typed for operator dispatch.
enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<String>),
}

/// Fields each evaluator may resolve. Conditions on fields outside the rule
/// type's scope never match, so a metadata rule cannot reach into content
/// ratings and vice versa.
const METADATA_FIELDS: &[&str] = &[
    "title",
    "description",
    "duration",
    "viewCount",
    "likeCount",
    "commentCount",
    "tags",
];
const CONTENT_FIELDS: &[&str] = &[
    "categoryId",
    "categoryName",
    "madeForKids",
    "ageRestricted",
    "hasClosedCaptions",
    "defaultLanguage",
    "isLiveContent",
];
const SOURCE_FIELDS: &[&str] = &["channelId", "channelName", "verified"];
const PATTERN_FIELDS: &[&str] = &["title", "description"];
const BEHAVIORAL_FIELDS: &[&str] = &["likeRatio", "likeCount", "commentCount", "commentsDisabled"];
const TEMPORAL_FIELDS: &[&str] = &["publishedAt"];
const LIST_FIELDS: &[&str] = &["videoId", "channelId"];

/// Resolve a condition field name against an item. Field names follow the
/// item's JSON representation (camelCase). Unknown fields resolve to None
/// and never match.
fn field_value(item: &ContentItem, field: &str) -> Option<FieldValue> {
    let rating = item.content_rating.as_ref();
    match field {
        "videoId" => Some(FieldValue::Text(item.id.clone())),
        "title" => Some(FieldValue::Text(item.title.clone())),
        "description" => Some(FieldValue::Text(item.description.clone())),
        "channelId" => Some(FieldValue::Text(item.channel_id.clone().unwrap_or_default())),
        "channelName" => Some(FieldValue::Text(
            item.channel_name.clone().unwrap_or_default(),
        )),
        "tags" => Some(FieldValue::List(item.tags.clone())),
        "categoryId" => Some(FieldValue::Text(item.category_id.clone().unwrap_or_default())),
        "categoryName" => Some(FieldValue::Text(
            item.category_name.clone().unwrap_or_default(),
        )),
        "defaultLanguage" => Some(FieldValue::Text(
            item.default_language.clone().unwrap_or_default(),
        )),
        "duration" => Some(FieldValue::Number(item.duration as f64)),
        "viewCount" => Some(FieldValue::Number(item.view_count as f64)),
        "likeCount" => Some(FieldValue::Number(item.like_count as f64)),
        "commentCount" => Some(FieldValue::Number(item.comment_count as f64)),
        // Likes per view, 0 when views are unknown
        "likeRatio" => Some(FieldValue::Number(if item.view_count == 0 {
            0.0
        } else {
            item.like_count as f64 / item.view_count as f64
        })),
        // Comment counts are the only signal available for disabled comments
        "commentsDisabled" => Some(FieldValue::Flag(item.comment_count == 0)),
        // Channel verification is not fetched yet
        "verified" => Some(FieldValue::Flag(false)),
        "madeForKids" => Some(FieldValue::Flag(
            rating.map(|r| r.made_for_kids).unwrap_or(false),
        )),
        "ageRestricted" => Some(FieldValue::Flag(
            rating.map(|r| r.age_restricted).unwrap_or(false),
        )),
        "hasClosedCaptions" => Some(FieldValue::Flag(item.has_closed_captions.unwrap_or(false))),
        "isLiveContent" => Some(FieldValue::Flag(item.is_live_content.unwrap_or(false))),
        // Age of the item in days, for temporal comparisons
        "publishedAt" => {
            let age = Utc::now().signed_duration_since(item.published_at);
            Some(FieldValue::Number(age.num_seconds() as f64 / 86_400.0))
        }
        _ => None,
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_matches_regex(text: &str, pattern: &str, literal_fallback: bool) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(e) if literal_fallback => {
            warn!(pattern, "Invalid regex, falling back to literal match: {}", e);
            text.to_lowercase().contains(&pattern.to_lowercase())
        }
        Err(e) => {
            warn!(pattern, "Invalid regex, condition will not match: {}", e);
            false
        }
    }
}

/// Evaluate one condition within an evaluator's field scope. Out-of-scope
/// fields, unknown fields, and type-incompatible operator applications never
/// match; they warn rather than fail the rule.
fn check_condition(
    item: &ContentItem,
    condition: &FilterCondition,
    scope: &[&str],
    literal_fallback: bool,
) -> bool {
    if !scope.contains(&condition.field.as_str()) {
        warn!(
            field = %condition.field,
            "Field is outside this rule type's scope, condition will not match"
        );
        return false;
    }
    let Some(field) = field_value(item, &condition.field) else {
        warn!(field = %condition.field, "Unknown filter field, condition will not match");
        return false;
    };

    match (&field, condition.operator) {
        (FieldValue::Text(text), ConditionOperator::Equals) => value_as_text(&condition.value)
            .map(|v| *text == v)
            .unwrap_or(false),
        (FieldValue::Text(text), ConditionOperator::Contains) => value_as_text(&condition.value)
            .map(|v| text.to_lowercase().contains(&v.to_lowercase()))
            .unwrap_or(false),
        (FieldValue::Text(text), ConditionOperator::Regex) => condition
            .value
            .as_str()
            .map(|pattern| text_matches_regex(text, pattern, literal_fallback))
            .unwrap_or(false),
        (FieldValue::Text(text), ConditionOperator::In) => condition
            .value
            .as_array()
            .map(|values| values.iter().filter_map(value_as_text).any(|v| *text == v))
            .unwrap_or(false),

        (FieldValue::Number(n), ConditionOperator::Equals) => {
            condition.value.as_f64().map(|v| *n == v).unwrap_or(false)
        }
        (FieldValue::Number(n), ConditionOperator::Gt) => {
            condition.value.as_f64().map(|v| *n > v).unwrap_or(false)
        }
        (FieldValue::Number(n), ConditionOperator::Lt) => {
            condition.value.as_f64().map(|v| *n < v).unwrap_or(false)
        }
        (FieldValue::Number(n), ConditionOperator::In) => condition
            .value
            .as_array()
            .map(|values| values.iter().filter_map(Value::as_f64).any(|v| *n == v))
            .unwrap_or(false),

        (FieldValue::Flag(flag), ConditionOperator::Equals) => {
            condition.value.as_bool().map(|v| *flag == v).unwrap_or(false)
        }

        (FieldValue::List(list), ConditionOperator::Contains) => value_as_text(&condition.value)
            .map(|v| list.iter().any(|entry| *entry == v))
            .unwrap_or(false),
        (FieldValue::List(list), ConditionOperator::Regex) => condition
            .value
            .as_str()
            .map(|pattern| {
                list.iter()
                    .any(|entry| text_matches_regex(entry, pattern, literal_fallback))
            })
            .unwrap_or(false),
        (FieldValue::List(list), ConditionOperator::In) => condition
            .value
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(value_as_text)
                    .any(|v| list.iter().any(|entry| *entry == v))
            })
            .unwrap_or(false),

        _ => {
            warn!(
                field = %condition.field,
                operator = ?condition.operator,
                "Operator does not apply to this field type, condition will not match"
            );
            false
        }
    }
}

/// Combine a rule's conditions with its AND/OR logic.
fn conditions_matched(
    item: &ContentItem,
    rule: &FilterRule,
    scope: &[&str],
    literal_fallback: bool,
) -> bool {
    match rule.logic() {
        RuleLogic::And => rule
            .conditions
            .iter()
            .all(|c| check_condition(item, c, scope, literal_fallback)),
        RuleLogic::Or => rule
            .conditions
            .iter()
            .any(|c| check_condition(item, c, scope, literal_fallback)),
    }
}

/// Turn a match outcome into a verdict under the rule's action. A block rule
/// fails matching items; an allow rule fails non-matching items.
fn verdict(rule: &FilterRule, matched: bool, label: &str) -> FilterResult {
    let passed = match rule.action {
        RuleAction::Block => !matched,
        RuleAction::Allow => matched,
    };

    let reason = if passed {
        None
    } else {
        let fields: Vec<&str> = rule.conditions.iter().map(|c| c.field.as_str()).collect();
        let outcome = if matched { "matched" } else { "failed" };
        Some(format!("{} condition {}: {}", label, outcome, fields.join(", ")))
    };

    FilterResult {
        passed,
        reason,
        rule_id: rule.id.clone(),
    }
}

fn evaluate_mapped(
    item: &ContentItem,
    rule: &FilterRule,
    scope: &[&str],
    label: &str,
) -> Result<FilterResult> {
    let matched = conditions_matched(item, rule, scope, false);
    Ok(verdict(rule, matched, label))
}

/// Intrinsic item attributes: title, description, duration, counters, tags.
pub struct MetadataEvaluator;

impl RuleEvaluator for MetadataEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Metadata
    }

    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        evaluate_mapped(item, rule, METADATA_FIELDS, "Metadata")
    }
}

/// Content characteristics: category, rating flags, language, captions.
pub struct ContentEvaluator;

impl RuleEvaluator for ContentEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Content
    }

    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        evaluate_mapped(item, rule, CONTENT_FIELDS, "Content")
    }
}

/// Provenance: channel-level properties.
pub struct SourceEvaluator;

impl RuleEvaluator for SourceEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Source
    }

    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        evaluate_mapped(item, rule, SOURCE_FIELDS, "Source")
    }
}

/// Regex rules. Unlike other evaluators, an invalid pattern degrades to a
/// case-insensitive literal match instead of silently never matching.
pub struct PatternEvaluator;

impl RuleEvaluator for PatternEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Pattern
    }

    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        let matched = conditions_matched(item, rule, PATTERN_FIELDS, true);
        Ok(verdict(rule, matched, "Pattern"))
    }
}

/// Engagement metrics: likes, comments, like ratio.
pub struct BehavioralEvaluator;

impl RuleEvaluator for BehavioralEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Behavioral
    }

    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        evaluate_mapped(item, rule, BEHAVIORAL_FIELDS, "Behavioral")
    }
}

/// Publication age. The `publishedAt` field resolves to the item's age in
/// days, so `gt 30` reads "older than thirty days".
pub struct TemporalEvaluator;

impl RuleEvaluator for TemporalEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Temporal
    }

    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        evaluate_mapped(item, rule, TEMPORAL_FIELDS, "Temporal")
    }
}

/// Membership allowlists over video and channel IDs, typically with an
/// allow action.
pub struct AllowlistEvaluator;

impl RuleEvaluator for AllowlistEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Allowlist
    }

    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        evaluate_mapped(item, rule, LIST_FIELDS, "Allowlist")
    }
}

/// Membership blocklists over video and channel IDs, typically with a
/// block action.
pub struct BlocklistEvaluator;

impl RuleEvaluator for BlocklistEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Blocklist
    }

    fn evaluate(&self, item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        evaluate_mapped(item, rule, LIST_FIELDS, "Blocklist")
    }
}

/// Placeholder for moderation backends that are not wired up. Always passes.
pub struct ExternalEvaluator;

impl RuleEvaluator for ExternalEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::External
    }

    fn evaluate(&self, _item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        debug!(rule_id = %rule.id, "External moderation is not configured, passing");
        Ok(FilterResult {
            passed: true,
            reason: None,
            rule_id: rule.id.clone(),
        })
    }
}

/// Placeholder for model-based classification. Always passes.
pub struct MlEvaluator;

impl RuleEvaluator for MlEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Ml
    }

    fn evaluate(&self, _item: &ContentItem, rule: &FilterRule) -> Result<FilterResult> {
        debug!(rule_id = %rule.id, "ML classification is not configured, passing");
        Ok(FilterResult {
            passed: true,
            reason: None,
            rule_id: rule.id.clone(),
        })
    }
}
