use crate::config::{FilterConfig, Sensitivity};
use crate::filters::rules::{
    AllowlistEvaluator, BehavioralEvaluator, BlocklistEvaluator, ContentEvaluator,
    ExternalEvaluator, MetadataEvaluator, MlEvaluator, PatternEvaluator, RuleEvaluator,
    SourceEvaluator, TemporalEvaluator,
};
use crate::types::{ContentItem, FilterResult, RuleType};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Rule ID reported when no rule decided the outcome: filtering disabled or
/// no rules configured.
const RULE_ID_NONE: &str = "none";
/// Rule ID reported when every configured rule passed the item.
const RULE_ID_ALL: &str = "all";

/// An item held back by filtering, with the verdict that blocked it.
#[derive(Debug, Clone)]
pub struct BlockedItem {
    pub item: ContentItem,
    pub reason: String,
    pub rule_id: String,
}

/// Result of running a batch of items through the engine.
#[derive(Debug, Clone)]
pub struct FilteredContent {
    pub passed: Vec<ContentItem>,
    pub blocked: Vec<BlockedItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterStats {
    pub enabled: bool,
    pub dry_run_mode: bool,
    pub sensitivity: Sensitivity,
    pub total_rules: usize,
    pub rules_by_type: HashMap<String, usize>,
}

/// Rule engine for one deployment's filter config.
///
/// Rules run in configured order and the first failing rule decides the
/// item's fate. Evaluator errors and unregistered rule types skip the rule
/// rather than block the item, so a broken rule degrades to more content,
/// never less.
pub struct FilterEngine {
    config: FilterConfig,
    evaluators: HashMap<RuleType, Box<dyn RuleEvaluator>>,
}

/// Build an engine with the full default evaluator set.
pub fn build_filter_engine(config: FilterConfig) -> FilterEngine {
    let mut engine = FilterEngine::new(config);
    engine.register_evaluator(Box::new(MetadataEvaluator));
    engine.register_evaluator(Box::new(ContentEvaluator));
    engine.register_evaluator(Box::new(SourceEvaluator));
    engine.register_evaluator(Box::new(PatternEvaluator));
    engine.register_evaluator(Box::new(BehavioralEvaluator));
    engine.register_evaluator(Box::new(TemporalEvaluator));
    engine.register_evaluator(Box::new(AllowlistEvaluator));
    engine.register_evaluator(Box::new(BlocklistEvaluator));
    engine.register_evaluator(Box::new(ExternalEvaluator));
    engine.register_evaluator(Box::new(MlEvaluator));
    engine
}

impl FilterEngine {
    /// An engine with no evaluators; every rule is skipped until some are
    /// registered. Use [`build_filter_engine`] for the standard set.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            evaluators: HashMap::new(),
        }
    }

    pub fn register_evaluator(&mut self, evaluator: Box<dyn RuleEvaluator>) {
        self.evaluators.insert(evaluator.rule_type(), evaluator);
    }

    /// Evaluate one item against the rules in order. Short-circuits on the
    /// first failing rule.
    pub fn evaluate_item(&self, item: &ContentItem) -> FilterResult {
        if !self.config.enabled || self.config.rules.is_empty() {
            return FilterResult {
                passed: true,
                reason: None,
                rule_id: RULE_ID_NONE.to_string(),
            };
        }

        for rule in &self.config.rules {
            let Some(evaluator) = self.evaluators.get(&rule.rule_type) else {
                warn!(
                    rule_id = %rule.id,
                    rule_type = ?rule.rule_type,
                    "No evaluator registered for rule type, skipping rule"
                );
                continue;
            };

            match evaluator.evaluate(item, rule) {
                Ok(result) if !result.passed => {
                    debug!(
                        item_id = %item.id,
                        rule_id = %rule.id,
                        reason = result.reason.as_deref().unwrap_or(""),
                        "Item blocked by rule"
                    );
                    return result;
                }
                Ok(_) => {}
                // Fail open: a broken rule must not block content
                Err(e) => {
                    warn!(
                        rule_id = %rule.id,
                        item_id = %item.id,
                        "Rule evaluation failed, skipping rule: {}",
                        e
                    );
                }
            }
        }

        FilterResult {
            passed: true,
            reason: None,
            rule_id: RULE_ID_ALL.to_string(),
        }
    }

    /// Run a batch through the engine. Each returned item carries its verdict
    /// in `metadata.filterResults`. In dry-run mode nothing is withheld:
    /// every item lands in `passed` and would-be blocks are only recorded.
    pub fn filter_items(&self, items: Vec<ContentItem>) -> FilteredContent {
        let total = items.len();
        let mut passed = Vec::with_capacity(total);
        let mut blocked = Vec::new();

        for mut item in items {
            let result = self.evaluate_item(&item);
            item.metadata.filter_results = Some(vec![result.clone()]);

            if result.passed {
                passed.push(item);
            } else {
                let reason = result
                    .reason
                    .clone()
                    .unwrap_or_else(|| "Blocked by filter rule".to_string());

                if self.config.dry_run_mode {
                    let reason = format!("[DRY RUN] {reason}");
                    info!(
                        item_id = %item.id,
                        rule_id = %result.rule_id,
                        "Would block item: {}",
                        reason
                    );
                    blocked.push(BlockedItem {
                        item: item.clone(),
                        reason,
                        rule_id: result.rule_id,
                    });
                    passed.push(item);
                } else {
                    blocked.push(BlockedItem {
                        item,
                        reason,
                        rule_id: result.rule_id,
                    });
                }
            }
        }

        info!(
            total,
            passed = passed.len(),
            blocked = blocked.len(),
            dry_run = self.config.dry_run_mode,
            "Filtered content batch"
        );

        FilteredContent { passed, blocked }
    }

    /// Evaluate every rule against one item without short-circuiting.
    /// Diagnostic surface for authoring rules.
    pub fn test_item(&self, item: &ContentItem) -> Vec<FilterResult> {
        self.config
            .rules
            .iter()
            .filter_map(|rule| {
                let evaluator = self.evaluators.get(&rule.rule_type)?;
                match evaluator.evaluate(item, rule) {
                    Ok(result) => Some(result),
                    Err(e) => {
                        warn!(rule_id = %rule.id, "Rule evaluation failed: {}", e);
                        None
                    }
                }
            })
            .collect()
    }

    pub fn stats(&self) -> FilterStats {
        let mut rules_by_type: HashMap<String, usize> = HashMap::new();
        for rule in &self.config.rules {
            let key = serde_json::to_value(rule.rule_type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| format!("{:?}", rule.rule_type));
            *rules_by_type.entry(key).or_insert(0) += 1;
        }

        FilterStats {
            enabled: self.config.enabled,
            dry_run_mode: self.config.dry_run_mode,
            sensitivity: self.config.sensitivity,
            total_rules: self.config.rules.len(),
            rules_by_type,
        }
    }
}
