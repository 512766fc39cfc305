//! Typed rule documents.
//!
//! One [`MigrationRuleSet`] per source package. Field names follow the JSON
//! document (`sourcePackage`, `matchConditions`, `replaceWith`, ...).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::condition::{Condition, Literal};

/// Full replacement markup for an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceWith {
    #[serde(alias = "code")]
    pub template_code: String,
    /// Props rendered as children through `{{INNER}}`.
    #[serde(default, alias = "INNER")]
    pub inner_prop_names: Vec<String>,
    /// Props kept as attributes of the replacement.
    #[serde(default, alias = "OUTER")]
    pub outer_prop_names: Vec<String>,
}

/// What a rule (or one of its conditional branches) does to an element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directives {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rename: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub set: IndexMap<String, Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_with: Option<ReplaceWith>,
}

impl Directives {
    pub fn is_empty(&self) -> bool {
        self.rename.is_empty()
            && self.remove.is_empty()
            && self.set.is_empty()
            && self.replace_with.is_none()
    }
}

/// A conditional branch: applies when every condition in `when` holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropPredicateSet {
    #[serde(default)]
    pub when: IndexMap<String, Condition>,
    #[serde(flatten)]
    pub directives: Directives,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRule {
    /// Exported component name (never a local alias).
    #[serde(alias = "componentName", alias = "name")]
    pub component: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_conditions: Vec<PropPredicateSet>,
    /// Unconditional directives, used when no predicate set matches.
    #[serde(flatten)]
    pub directives: Directives,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_to: Option<String>,
}

impl ComponentRule {
    /// A placeholder names a component as known but defines nothing to do.
    pub fn placeholder(component: impl Into<String>) -> Self {
        ComponentRule {
            component: component.into(),
            ..ComponentRule::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.directives.is_empty()
            && self.match_conditions.is_empty()
            && self.import_from.is_none()
            && self.import_to.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRuleSet {
    /// File stem of the rule document.
    #[serde(skip)]
    pub id: String,
    pub source_package: String,
    /// Prop name aliases applied to outer props of replacement templates.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub lookup: IndexMap<String, String>,
    #[serde(default, alias = "componentRules")]
    pub rules: Vec<ComponentRule>,
    /// The document contains `TODO` markers; migrations will be partial.
    #[serde(skip)]
    pub incomplete: bool,
}

impl MigrationRuleSet {
    /// First rule for the imported component name.
    pub fn rule_for(&self, component: &str) -> Option<&ComponentRule> {
        self.rules.iter().find(|r| r.component == component)
    }

    /// Output name of a prop after `lookup`.
    pub fn lookup_name<'a>(&'a self, prop: &'a str) -> &'a str {
        self.lookup.get(prop).map(String::as_str).unwrap_or(prop)
    }
}
