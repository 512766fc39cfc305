//! `migr8 scan` and `migr8 report`.

use std::path::Path;
use std::process;

use migr8_core::{aggregate, scan_project, FileSystemProvider, ProjectGraph, ScanOptions, UsageReport};

use crate::config::Config;
use crate::{print_json, report_error, Ctx, OutputFormat};

/// Path relative to the project root, for display.
pub(crate) fn rel<'p>(root: &Path, path: &'p Path) -> std::borrow::Cow<'p, str> {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy()
}

pub(crate) fn load_graph(root: &Path, opts: &ScanOptions, ctx: Ctx<'_>) -> ProjectGraph {
    match scan_project(root, opts, &FileSystemProvider) {
        Ok(scan) => scan.graph,
        Err(e) => {
            report_error(&format!("error: {}", e), ctx.output, ctx.quiet);
            process::exit(1);
        }
    }
}

pub fn cmd_scan(root: &Path, config: &Config, exclude: &[String], ctx: Ctx<'_>) {
    let graph = load_graph(root, &config.scan_options(exclude), ctx);
    match ctx.output {
        OutputFormat::Json => print_json(&graph),
        OutputFormat::Text => {
            if ctx.quiet {
                return;
            }
            println!(
                "Scanned {} files: {} imports, {} elements",
                graph.files.len(),
                graph.imports.len(),
                graph.elements.len()
            );
            let packages = graph.packages();
            if !packages.is_empty() {
                println!("Packages:");
                for p in &packages {
                    let uses = graph
                        .elements
                        .iter()
                        .filter(|e| e.source_package() == Some(p.as_str()))
                        .count();
                    println!("  {} ({} elements)", p, uses);
                }
            }
            for w in &graph.warnings {
                eprintln!("skipped: {}:{}: {}", rel(root, &w.file), w.line, w.message);
            }
        }
    }
}

pub fn cmd_report(
    root: &Path,
    config: &Config,
    exclude: &[String],
    package: Option<&str>,
    ctx: Ctx<'_>,
) {
    let graph = load_graph(root, &config.scan_options(exclude), ctx);
    let mut report = aggregate(&graph);
    if let Some(p) = package {
        report.components.retain(|c| c.package == p);
    }
    match ctx.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            if !ctx.quiet {
                print_report(root, &report);
            }
        }
    }
}

fn print_report(root: &Path, report: &UsageReport) {
    let s = &report.stats;
    println!(
        "Files: {} scanned, {} parsed, {} with components",
        s.total_files, s.analyzed_files, s.files_with_elements
    );
    println!(
        "Elements: {} across {} components ({} unresolved)",
        s.total_elements, s.total_components, s.unresolved_elements
    );

    let mut current: Option<&str> = None;
    for c in &report.components {
        if current != Some(c.package.as_str()) {
            println!();
            println!("{}", c.package);
            current = Some(c.package.as_str());
        }
        println!(
            "  {:<24} {:>5} uses in {} files",
            c.component,
            c.count,
            c.files.len()
        );
        for (prop, values) in &c.prop_values {
            let shown: Vec<String> = values
                .iter()
                .map(|(v, n)| format!("{} x{}", v, n))
                .collect();
            println!("    {}: {}", prop, shown.join(", "));
        }
        if let Some(top) = c.combinations.first() {
            if let Some(file) = top.files.first() {
                println!(
                    "    most common props ({}x, e.g. {}): {}",
                    top.count,
                    rel(root, file),
                    top.props.keys().cloned().collect::<Vec<_>>().join(" ")
                );
            }
        }
    }
}
