//! Starting points for rule documents, generated from project usage.

use migr8_core::UsageReport;

use crate::types::{ComponentRule, MigrationRuleSet};

/// A rule set for `package` with a placeholder rule for every component
/// the project uses from it, most used first. Rules already in `existing`
/// are kept as they are and come first.
pub fn scaffold_rule_set(
    usage: &UsageReport,
    package: &str,
    existing: Option<&MigrationRuleSet>,
) -> MigrationRuleSet {
    let mut set = existing.cloned().unwrap_or_else(|| MigrationRuleSet {
        source_package: package.to_string(),
        ..MigrationRuleSet::default()
    });

    let mut used: Vec<_> = usage.for_package(package).collect();
    used.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.component.cmp(&b.component)));
    for component in used {
        if set.rule_for(&component.component).is_none() {
            set.rules.push(ComponentRule::placeholder(component.component.clone()));
        }
    }
    set
}
