//! `migr8 scaffold` and `migr8 validate-rules`.

use std::path::{Path, PathBuf};
use std::process;

use migr8_core::{aggregate, ScanOptions};
use migr8_rules::{load_rule_file, parse_rule_set, rule_files, scaffold_rule_set, MigrationRuleSet, RuleBook};
use serde::Serialize;

use crate::scan::load_graph;
use crate::{print_json, report_error, Ctx, OutputFormat};

static RULE_SCHEMA_STR: &str = include_str!("../../../docs/rule-schema.json");

pub struct ScaffoldOptions<'a> {
    pub root: &'a Path,
    pub package: &'a str,
    pub rules_dir: PathBuf,
    pub write: bool,
    pub scan: ScanOptions,
}

/// File stem for a package's rule document: `@old/ui` becomes `old-ui`.
pub fn rule_set_id(package: &str) -> String {
    package
        .trim_start_matches('@')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// The document already targeting `package`, and where it lives.
fn existing_rule_set(dir: &Path, package: &str) -> Option<(PathBuf, MigrationRuleSet)> {
    let files = rule_files(dir).ok()?;
    files.into_iter().find_map(|path| match load_rule_file(&path) {
        Ok(set) if set.source_package == package => Some((path, set)),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    })
}

pub fn cmd_scaffold(opts: ScaffoldOptions<'_>, ctx: Ctx<'_>) {
    let graph = load_graph(opts.root, &opts.scan, ctx);
    let usage = aggregate(&graph);

    let existing = existing_rule_set(&opts.rules_dir, opts.package);
    let target = existing
        .as_ref()
        .map(|(path, _)| path.clone())
        .unwrap_or_else(|| opts.rules_dir.join(format!("{}.json", rule_set_id(opts.package))));
    let set = scaffold_rule_set(&usage, opts.package, existing.as_ref().map(|(_, s)| s));

    let doc = match serde_json::to_string_pretty(&set) {
        Ok(d) => d + "\n",
        Err(e) => {
            report_error(&format!("serialization error: {}", e), ctx.output, ctx.quiet);
            process::exit(1);
        }
    };

    if !opts.write {
        print!("{}", doc);
        return;
    }
    let written = std::fs::create_dir_all(&opts.rules_dir).and_then(|_| std::fs::write(&target, &doc));
    if let Err(e) = written {
        let msg = format!("error writing '{}': {}", target.display(), e);
        report_error(&msg, ctx.output, ctx.quiet);
        process::exit(1);
    }
    if ctx.quiet {
        return;
    }
    match ctx.output {
        OutputFormat::Text => println!(
            "wrote {} ({} rules)",
            target.display(),
            set.rules.len()
        ),
        OutputFormat::Json => print_json(&serde_json::json!({
            "path": target,
            "rules": set.rules.len(),
        })),
    }
}

#[derive(Debug, Serialize)]
struct FileCheck {
    file: PathBuf,
    errors: Vec<String>,
    incomplete: bool,
}

pub fn cmd_validate_rules(dir: &Path, ctx: Ctx<'_>) {
    let schema: serde_json::Value = match serde_json::from_str(RULE_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded rule schema: {}", e);
            report_error(&msg, ctx.output, ctx.quiet);
            process::exit(1);
        }
    };
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, ctx.output, ctx.quiet);
            process::exit(1);
        }
    };

    let files = match rule_files(dir) {
        Ok(f) if f.is_empty() => {
            let msg = format!("error: no rule documents found in {}", dir.display());
            report_error(&msg, ctx.output, ctx.quiet);
            process::exit(1);
        }
        Ok(f) => f,
        Err(e) => {
            report_error(&format!("error: {}", e), ctx.output, ctx.quiet);
            process::exit(1);
        }
    };

    let mut checks = Vec::with_capacity(files.len());
    let mut sets = Vec::new();
    for path in files {
        let mut check = FileCheck {
            file: path.clone(),
            errors: Vec::new(),
            incomplete: false,
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                check.errors.push(e.to_string());
                checks.push(check);
                continue;
            }
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Err(e) => check.errors.push(format!("invalid JSON: {}", e)),
            Ok(doc) => {
                check.errors = validator.iter_errors(&doc).map(|e| e.to_string()).collect();
            }
        }
        if check.errors.is_empty() {
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            match parse_rule_set(&id, &path, &text) {
                Ok(set) => {
                    check.incomplete = set.incomplete;
                    sets.push(set);
                }
                Err(e) => check.errors.push(e.to_string()),
            }
        }
        checks.push(check);
    }

    let mut book_error = None;
    if let Err(e) = RuleBook::new(sets) {
        book_error = Some(e.to_string());
    }
    let valid = book_error.is_none() && checks.iter().all(|c| c.errors.is_empty());

    match ctx.output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": valid,
                "files": checks,
                "error": book_error,
            });
            if valid {
                if !ctx.quiet {
                    print_json(&json);
                }
            } else {
                eprintln!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
            }
        }
        OutputFormat::Text => {
            if !ctx.quiet {
                for c in &checks {
                    let name = c.file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    if c.errors.is_empty() {
                        let note = if c.incomplete { " (incomplete: contains TODO)" } else { "" };
                        println!("valid {}{}", name, note);
                    } else {
                        eprintln!("invalid {}", name);
                        for err in &c.errors {
                            eprintln!("  - {}", err);
                        }
                    }
                }
                if let Some(e) = &book_error {
                    eprintln!("error: {}", e);
                }
            }
        }
    }
    if !valid {
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_from_package_names() {
        assert_eq!(rule_set_id("@old/ui"), "old-ui");
        assert_eq!(rule_set_id("react-bootstrap"), "react-bootstrap");
        assert_eq!(rule_set_id("@mui/material/Button"), "mui-material-Button");
    }

    #[test]
    fn embedded_schema_compiles() {
        let schema: serde_json::Value = serde_json::from_str(RULE_SCHEMA_STR).unwrap();
        let validator = jsonschema::validator_for(&schema).unwrap();
        let good = serde_json::json!({
            "sourcePackage": "@old/ui",
            "rules": [
                { "component": "Button", "rename": { "variant": "kind" }, "remove": ["size"] },
                { "component": "Chip" }
            ]
        });
        assert!(validator.is_valid(&good));
        let bad = serde_json::json!({ "rules": [{ "remove": "size" }] });
        assert!(!validator.is_valid(&bad));
    }
}
