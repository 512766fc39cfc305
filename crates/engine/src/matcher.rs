//! Condition evaluation: which directives of a rule apply to an element.

use migr8_core::ast::{ElementUsage, PropValue};
use migr8_rules::{ComponentRule, Directives, PropPredicateSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'r> {
    /// The predicate set at this index matched first.
    Branch(usize, &'r Directives),
    /// No predicate set matched (or there are none); the rule's own
    /// directives apply.
    Unconditional(&'r Directives),
    NoMatch,
}

impl<'r> Selection<'r> {
    pub fn directives(&self) -> Option<&'r Directives> {
        match self {
            Selection::Branch(_, d) | Selection::Unconditional(d) => Some(d),
            Selection::NoMatch => None,
        }
    }
}

fn has_spread(element: &ElementUsage) -> bool {
    element
        .props
        .values()
        .any(|p| matches!(p.value, PropValue::Spread(_)))
}

pub fn predicate_holds(set: &PropPredicateSet, element: &ElementUsage) -> bool {
    let spread = has_spread(element);
    set.when
        .iter()
        .all(|(name, cond)| cond.holds(element.prop(name), spread))
}

/// First matching predicate set wins. Without any, fall back to the
/// unconditional directives; a rule that only has predicate sets and none
/// of them match does not apply.
pub fn select<'r>(rule: &'r ComponentRule, element: &ElementUsage) -> Selection<'r> {
    if let Some((i, set)) = rule
        .match_conditions
        .iter()
        .enumerate()
        .find(|(_, set)| predicate_holds(set, element))
    {
        return Selection::Branch(i, &set.directives);
    }
    if rule.match_conditions.is_empty() || !rule.directives.is_empty() {
        Selection::Unconditional(&rule.directives)
    } else {
        Selection::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migr8_core::parser::extract;
    use std::path::Path;

    fn element(src: &str) -> ElementUsage {
        extract(Path::new("a.jsx"), src).unwrap().elements.remove(0)
    }

    fn rule(v: serde_json::Value) -> ComponentRule {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn first_matching_branch_wins() {
        let r = rule(serde_json::json!({
            "component": "Button",
            "matchConditions": [
                { "when": { "variant": "large" }, "remove": ["a"] },
                { "when": { "variant": ["large", "huge"] }, "remove": ["b"] }
            ],
            "remove": ["c"]
        }));
        let el = element("<Button variant=\"large\" />");
        assert!(matches!(select(&r, &el), Selection::Branch(0, _)));
        let el = element("<Button variant=\"huge\" />");
        assert!(matches!(select(&r, &el), Selection::Branch(1, _)));
        let el = element("<Button variant=\"small\" />");
        assert_eq!(
            select(&r, &el).directives().map(|d| d.remove.clone()),
            Some(vec!["c".to_string()])
        );
    }

    #[test]
    fn expression_values_never_satisfy_equality() {
        let r = rule(serde_json::json!({
            "component": "Button",
            "matchConditions": [ { "when": { "variant": "large" }, "remove": ["a"] } ]
        }));
        assert_eq!(select(&r, &element("<Button variant={v} />")), Selection::NoMatch);
    }

    #[test]
    fn rule_without_conditions_always_applies() {
        let r = rule(serde_json::json!({ "component": "Button", "importTo": "@new/ui" }));
        assert!(matches!(
            select(&r, &element("<Button />")),
            Selection::Unconditional(d) if d.is_empty()
        ));
    }

    #[test]
    fn spreads_block_absence() {
        let r = rule(serde_json::json!({
            "component": "Button",
            "matchConditions": [ { "when": { "size": { "is": "absent" } }, "set": { "size": "m" } } ]
        }));
        assert!(matches!(select(&r, &element("<Button />")), Selection::Branch(0, _)));
        assert_eq!(select(&r, &element("<Button {...p} />")), Selection::NoMatch);
    }
}
