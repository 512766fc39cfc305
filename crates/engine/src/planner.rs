//! Rule matching and edit planning for one file.
//!
//! Elements are visited in source order (outer before inner). Each one ends
//! as `Matched`, `Placeholder` or `Unmatched`, is reported as an error, or
//! is skipped as superseded when it lies inside a span an earlier plan
//! already rewrites.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use migr8_core::ast::{ElementUsage, ImportBinding, ImportKind, Prop, PropValue, Span};
use migr8_rules::{ComponentRule, Directives, MigrationRuleSet, RuleBook};
use tracing::{debug, warn};

use crate::error::PlanError;
use crate::matcher;
use crate::plan::{
    Annotation, EditPlan, ElementError, FilePlan, ImportConflict, ImportEdit, PlanKind, PropEdit,
    Replacement, SetTarget,
};
use crate::template;

/// Text of the comment left in placeholder-governed opening tags.
pub const PLACEHOLDER_MARKER: &str = "migr8: placeholder rule, not migrated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    pub annotate_placeholders: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions {
            annotate_placeholders: true,
        }
    }
}

/// Plan every element and import binding of one file. `text` is the source
/// the elements were extracted from.
pub fn plan_file(
    book: &RuleBook,
    path: &Path,
    text: &str,
    elements: &[ElementUsage],
    bindings: &[ImportBinding],
    options: &PlanOptions,
) -> FilePlan {
    let mut fp = FilePlan {
        path: path.to_path_buf(),
        bindings: bindings.to_vec(),
        ..FilePlan::default()
    };
    let mut claimed: Vec<Span> = Vec::new();
    let mut decided: IndexMap<String, ImportEdit> = IndexMap::new();
    // Bindings of elements left unmigrated; their imports must not move.
    let mut held: HashSet<String> = HashSet::new();

    for el in elements {
        let Some(set) = el.source_package().and_then(|p| book.for_package(p)) else {
            continue;
        };
        if claimed.iter().any(|c| c.contains(&el.spans.element)) {
            debug!(file = %path.display(), line = el.line, component = %el.component_name(), "superseded");
            fp.superseded += 1;
            continue;
        }
        let Some(rule) = set.rule_for(el.component_name()) else {
            fp.plans.push(EditPlan::new(el, PlanKind::Unmatched));
            continue;
        };
        if rule.is_placeholder() {
            fp.plans.push(plan_placeholder(el, text, options));
            continue;
        }

        let mut plan = match matcher::select(rule, el).directives() {
            None => {
                hold(&mut held, el);
                fp.plans.push(EditPlan::new(el, PlanKind::Unmatched));
                continue;
            }
            Some(directives) => match plan_directives(set, directives, el, text) {
                Ok(plan) => plan,
                Err(e) => {
                    warn!(file = %path.display(), line = el.line, "{}", e);
                    hold(&mut held, el);
                    fp.errors.push(ElementError::new(el, &e));
                    continue;
                }
            },
        };

        if let Some(edit) = el.import_ref.as_ref().and_then(|b| import_edit_for(rule, b)) {
            match decided.get(&edit.binding.local_name) {
                None => {
                    decided.insert(edit.binding.local_name.clone(), edit.clone());
                    plan.import_edit = Some(edit);
                }
                Some(kept) if kept.to == edit.to => plan.import_edit = Some(edit),
                Some(kept) => {
                    let conflict = ImportConflict {
                        file: path.to_path_buf(),
                        line: el.line,
                        local_name: edit.binding.local_name.clone(),
                        kept: kept.to.clone(),
                        rejected: edit.to,
                    };
                    warn!("{}", conflict);
                    fp.conflicts.push(conflict);
                }
            }
        }

        claimed.extend(plan.claimed_spans());
        fp.plans.push(plan);
    }

    if !held.is_empty() {
        decided.retain(|name, _| !held.contains(name));
        for plan in &mut fp.plans {
            if plan
                .import_edit
                .as_ref()
                .is_some_and(|e| held.contains(&e.binding.local_name))
            {
                plan.import_edit = None;
            }
        }
    }

    // Bindings no element spoke for still move when their component has a
    // rule, so files that only import (or re-export) a component migrate too.
    for binding in bindings {
        if decided.contains_key(&binding.local_name) || held.contains(&binding.local_name) {
            continue;
        }
        let Some(set) = book.for_package(&binding.source_package) else {
            continue;
        };
        let name = match binding.kind {
            ImportKind::Named => &binding.imported_name,
            ImportKind::Default => &binding.local_name,
            ImportKind::Namespace => continue,
        };
        let Some(rule) = set.rule_for(name) else {
            continue;
        };
        if let Some(edit) = import_edit_for(rule, binding) {
            decided.insert(binding.local_name.clone(), edit);
        }
    }

    fp.import_edits = decided.into_values().collect();
    fp
}

fn hold(held: &mut HashSet<String>, el: &ElementUsage) {
    if let Some(binding) = &el.import_ref {
        held.insert(binding.local_name.clone());
    }
}

fn plan_placeholder(el: &ElementUsage, text: &str, options: &PlanOptions) -> EditPlan {
    let mut plan = EditPlan::new(el, PlanKind::Placeholder);
    let open_tag = &text[el.spans.open_tag.start..el.spans.open_tag.end];
    if options.annotate_placeholders && !open_tag.contains(PLACEHOLDER_MARKER) {
        plan.annotation = Some(Annotation {
            at: el.spans.attrs_end,
            text: format!(" /* {} */", PLACEHOLDER_MARKER),
        });
    }
    plan
}

/// The import move a rule asks of a binding, if any. Namespace imports
/// are never moved.
pub fn import_edit_for(rule: &ComponentRule, binding: &ImportBinding) -> Option<ImportEdit> {
    if binding.kind == ImportKind::Namespace {
        return None;
    }
    let to = rule.import_to.as_ref()?;
    if *to == binding.source_package {
        return None;
    }
    if rule
        .import_from
        .as_ref()
        .is_some_and(|from| *from != binding.source_package)
    {
        return None;
    }
    Some(ImportEdit {
        binding: binding.clone(),
        from: binding.source_package.clone(),
        to: to.clone(),
    })
}

fn plan_directives(
    set: &MigrationRuleSet,
    directives: &Directives,
    el: &ElementUsage,
    text: &str,
) -> Result<EditPlan, PlanError> {
    let mut plan = EditPlan::new(el, PlanKind::Matched);
    if let Some(replace) = &directives.replace_with {
        let rendered = template::render(set, replace, el, text)?;
        plan.dropped_props = rendered.dropped;
        let span = el.spans.element;
        if rendered.text != text[span.start..span.end] {
            plan.replacement = Some(Replacement {
                span,
                text: rendered.text,
            });
        }
        return Ok(plan);
    }
    plan.prop_edits = prop_edits(directives, el)?;
    Ok(plan)
}

/// Remove, then rename, then set. Edits that would not change anything
/// are left out, which keeps a second run over migrated code a no-op.
pub fn prop_edits(d: &Directives, el: &ElementUsage) -> Result<Vec<PropEdit>, PlanError> {
    let mut edits = Vec::new();

    let mut removed: HashSet<&str> = HashSet::new();
    for name in &d.remove {
        if el.props.contains_key(name) && removed.insert(name.as_str()) {
            for prop in el.occurrences(name) {
                edits.push(PropEdit::Remove {
                    name: name.clone(),
                    span: prop.span,
                });
            }
        }
    }

    let renames: Vec<(&str, &str, &Prop)> = d
        .rename
        .iter()
        .filter(|(from, to)| from != to && !removed.contains(from.as_str()))
        .filter_map(|(from, to)| {
            let prop = el.props.get(from)?;
            (!matches!(prop.value, PropValue::Spread(_))).then_some((from.as_str(), to.as_str(), prop))
        })
        .collect();
    let renamed_away: HashSet<&str> = renames.iter().map(|(from, _, _)| *from).collect();

    let mut final_names: IndexMap<&str, &Prop> = IndexMap::new();
    for (from, to, prop) in &renames {
        let occupied = el.props.contains_key(*to)
            && !removed.contains(to)
            && !renamed_away.contains(to);
        if occupied || final_names.contains_key(to) {
            return Err(PlanError::RenameCollision {
                component: el.component_name().to_string(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        final_names.insert(to, prop);
        for occurrence in el.occurrences(from) {
            edits.push(PropEdit::Rename {
                from: from.to_string(),
                to: to.to_string(),
                name_span: occurrence.name_span,
            });
        }
    }

    for (name, value) in &d.set {
        let current = final_names.get(name.as_str()).copied().or_else(|| {
            el.props
                .get(name)
                .filter(|_| !removed.contains(name.as_str()) && !renamed_away.contains(name.as_str()))
        });
        let target = match current {
            Some(prop) if value.matches(&prop.value) => continue,
            Some(prop) => match prop.value_span {
                Some(span) => SetTarget::Value(span),
                None => SetTarget::AppendValue(prop.span.end),
            },
            None => SetTarget::Insert(el.spans.attrs_end),
        };
        edits.push(PropEdit::Set {
            name: name.clone(),
            value: value.clone(),
            target,
        });
    }

    Ok(edits)
}
