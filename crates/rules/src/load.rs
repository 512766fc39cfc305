//! Loading rule documents from disk into a [`RuleBook`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::RuleError;
use crate::types::MigrationRuleSet;

/// Marker text that flags a rule document as unfinished.
pub const INCOMPLETE_MARKER: &str = "TODO";

/// All rule sets of one run, at most one per source package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleBook {
    sets: Vec<MigrationRuleSet>,
}

impl RuleBook {
    pub fn new(sets: Vec<MigrationRuleSet>) -> Result<Self, RuleError> {
        for (i, set) in sets.iter().enumerate() {
            if let Some(other) = sets[..i]
                .iter()
                .find(|o| o.source_package == set.source_package)
            {
                return Err(RuleError::DuplicatePackage {
                    package: set.source_package.clone(),
                    first: other.id.clone(),
                    second: set.id.clone(),
                });
            }
        }
        Ok(RuleBook { sets })
    }

    pub fn for_package(&self, package: &str) -> Option<&MigrationRuleSet> {
        self.sets.iter().find(|s| s.source_package == package)
    }

    pub fn get(&self, id: &str) -> Option<&MigrationRuleSet> {
        self.sets.iter().find(|s| s.id == id)
    }

    pub fn sets(&self) -> &[MigrationRuleSet] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Keep only the named rule sets. An empty selection keeps everything.
    pub fn select(self, ids: &[String]) -> Result<Self, RuleError> {
        if ids.is_empty() {
            return Ok(self);
        }
        if let Some(missing) = ids.iter().find(|id| self.get(id).is_none()) {
            return Err(RuleError::UnknownRuleSet(missing.clone()));
        }
        let sets = self
            .sets
            .into_iter()
            .filter(|s| ids.contains(&s.id))
            .collect();
        Ok(RuleBook { sets })
    }
}

/// Parse one rule document. `id` is the document's file stem.
pub fn parse_rule_set(id: &str, path: &Path, text: &str) -> Result<MigrationRuleSet, RuleError> {
    let mut set: MigrationRuleSet =
        serde_json::from_str(text).map_err(|e| RuleError::parse(path.to_path_buf(), e))?;
    set.id = id.to_string();
    set.incomplete = text.contains(INCOMPLETE_MARKER);
    check(&set)?;

    if set.incomplete {
        warn!(
            rule_set = %set.id,
            package = %set.source_package,
            "rule set contains {} markers; migrations for this package will be partial",
            INCOMPLETE_MARKER
        );
    }
    Ok(set)
}

fn check(set: &MigrationRuleSet) -> Result<(), RuleError> {
    let invalid = |message: String| RuleError::Invalid {
        id: set.id.clone(),
        message,
    };
    if set.source_package.trim().is_empty() {
        return Err(invalid("sourcePackage is empty".to_string()));
    }
    let mut seen = HashSet::new();
    for rule in &set.rules {
        if rule.component.trim().is_empty() {
            return Err(invalid("a rule has an empty component name".to_string()));
        }
        if !seen.insert(rule.component.as_str()) {
            warn!(
                rule_set = %set.id,
                component = %rule.component,
                "duplicate rule; only the first one is used"
            );
        }
        let templates = rule
            .directives
            .replace_with
            .iter()
            .chain(rule.match_conditions.iter().filter_map(|p| p.directives.replace_with.as_ref()));
        for replace in templates {
            if replace.template_code.trim().is_empty() {
                return Err(invalid(format!(
                    "replaceWith template for '{}' is empty",
                    rule.component
                )));
            }
        }
    }
    Ok(())
}

pub fn load_rule_file(path: &Path) -> Result<MigrationRuleSet, RuleError> {
    let text = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    parse_rule_set(&id, path, &text)
}

/// Every `*.json` file directly inside `dir`, in file name order.
pub fn rule_files(dir: &Path) -> Result<Vec<PathBuf>, RuleError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RuleError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| RuleError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every rule document in `dir`.
pub fn load_rules_dir(dir: &Path) -> Result<RuleBook, RuleError> {
    let files = rule_files(dir)?;
    if files.is_empty() {
        return Err(RuleError::NoRuleSets(dir.to_path_buf()));
    }
    let mut sets = Vec::with_capacity(files.len());
    for path in &files {
        let set = load_rule_file(path)?;
        debug!(
            rule_set = %set.id,
            package = %set.source_package,
            rules = set.rules.len(),
            "loaded rule set"
        );
        sets.push(set);
    }
    let book = RuleBook::new(sets)?;
    info!(dir = %dir.display(), rule_sets = book.sets().len(), "rules loaded");
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(id: &str, package: &str) -> MigrationRuleSet {
        MigrationRuleSet {
            id: id.to_string(),
            source_package: package.to_string(),
            ..MigrationRuleSet::default()
        }
    }

    #[test]
    fn todo_marks_incomplete_but_loads() {
        let text = r#"{ "sourcePackage": "ui", "rules": [ { "component": "Button", "rename": { "TODO": "x" } } ] }"#;
        let s = parse_rule_set("ui", Path::new("ui.json"), text).unwrap();
        assert!(s.incomplete);
        assert_eq!(s.id, "ui");
        assert_eq!(s.rules.len(), 1);
    }

    #[test]
    fn parse_error_carries_location() {
        let err = parse_rule_set("bad", Path::new("bad.json"), "{\n  \"sourcePackage\": 3\n}")
            .unwrap_err();
        match err {
            RuleError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_component_is_invalid() {
        let text = r#"{ "sourcePackage": "ui", "rules": [ { "component": "" } ] }"#;
        assert!(matches!(
            parse_rule_set("ui", Path::new("ui.json"), text),
            Err(RuleError::Invalid { .. })
        ));
    }

    #[test]
    fn one_rule_set_per_package() {
        let err = RuleBook::new(vec![set("a", "ui"), set("b", "ui")]).unwrap_err();
        assert!(matches!(err, RuleError::DuplicatePackage { .. }));
    }

    #[test]
    fn selection_by_id() {
        let book = RuleBook::new(vec![set("a", "ui"), set("b", "icons")]).unwrap();
        let picked = book.clone().select(&["b".to_string()]).unwrap();
        assert_eq!(picked.sets().len(), 1);
        assert!(picked.for_package("icons").is_some());
        assert!(picked.for_package("ui").is_none());
        assert!(matches!(
            book.select(&["zzz".to_string()]),
            Err(RuleError::UnknownRuleSet(_))
        ));
    }
}
