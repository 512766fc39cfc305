//! Project graph builder.
//!
//! Extraction runs per file on the rayon pool; assembly is a barrier that
//! concatenates the per-file tables in [`source_order`](crate::source::source_order).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ast::{ElementUsage, FileModel, ImportBinding};
use crate::parser;
use crate::source::{ScanError, ScanOptions, SourceProvider};

/// A file that could not be read or parsed. The scan continues without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphWarning {
    pub file: PathBuf,
    pub line: u32,
    pub message: String,
}

/// All import bindings and component usages of one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectGraph {
    pub root: PathBuf,
    /// Every file that was scanned, parsed or not.
    pub files: Vec<PathBuf>,
    pub imports: Vec<ImportBinding>,
    /// File order, then source order (outer elements before inner ones).
    pub elements: Vec<ElementUsage>,
    pub warnings: Vec<GraphWarning>,
}

impl ProjectGraph {
    /// Concatenate per-file models, keeping their order.
    pub fn from_models(
        root: &Path,
        files: Vec<PathBuf>,
        models: Vec<FileModel>,
        warnings: Vec<GraphWarning>,
    ) -> Self {
        let mut graph = ProjectGraph {
            root: root.to_path_buf(),
            files,
            warnings,
            ..ProjectGraph::default()
        };
        for model in models {
            graph.imports.extend(model.imports);
            graph.elements.extend(model.elements);
        }
        graph
    }

    pub fn imports_in<'g>(&'g self, file: &'g Path) -> impl Iterator<Item = &'g ImportBinding> + 'g {
        self.imports.iter().filter(move |b| b.file == file)
    }

    pub fn elements_in<'g>(&'g self, file: &'g Path) -> impl Iterator<Item = &'g ElementUsage> + 'g {
        self.elements.iter().filter(move |e| e.file == file)
    }

    /// Source packages imported anywhere in the project, sorted.
    pub fn packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = self
            .imports
            .iter()
            .map(|b| b.source_package.clone())
            .collect();
        packages.sort();
        packages.dedup();
        packages
    }
}

/// A project graph together with the text every parsed file was extracted
/// from. Spans in the graph index into these texts.
#[derive(Debug, Clone, Default)]
pub struct ProjectScan {
    pub graph: ProjectGraph,
    /// Parsed files only, in graph order.
    pub sources: IndexMap<PathBuf, String>,
}

/// Scan `root` and build the project graph.
///
/// Only enumeration failures (bad patterns, missing root) are errors;
/// per-file read or parse failures become [`GraphWarning`]s.
pub fn build_graph(
    root: &Path,
    options: &ScanOptions,
    provider: &dyn SourceProvider,
) -> Result<ProjectGraph, ScanError> {
    scan_project(root, options, provider).map(|scan| scan.graph)
}

/// Like [`build_graph`], but keeps the source texts for later editing.
pub fn scan_project(
    root: &Path,
    options: &ScanOptions,
    provider: &dyn SourceProvider,
) -> Result<ProjectScan, ScanError> {
    let files = provider.list_sources(root, options)?;
    info!(root = %root.display(), files = files.len(), "scanning project");

    let results: Vec<Result<(String, FileModel), GraphWarning>> = files
        .par_iter()
        .map(|path| extract_one(path, provider))
        .collect();

    let mut models = Vec::with_capacity(results.len());
    let mut sources = IndexMap::with_capacity(results.len());
    let mut warnings = Vec::new();
    for result in results {
        match result {
            Ok((text, model)) => {
                sources.insert(model.path.clone(), text);
                models.push(model);
            }
            Err(warning) => {
                warn!(
                    file = %warning.file.display(),
                    line = warning.line,
                    "{}",
                    warning.message
                );
                warnings.push(warning);
            }
        }
    }

    let graph = ProjectGraph::from_models(root, files, models, warnings);
    info!(
        imports = graph.imports.len(),
        elements = graph.elements.len(),
        warnings = graph.warnings.len(),
        "project graph built"
    );
    Ok(ProjectScan { graph, sources })
}

fn extract_one(
    path: &Path,
    provider: &dyn SourceProvider,
) -> Result<(String, FileModel), GraphWarning> {
    let text = provider.read_source(path).map_err(|e| GraphWarning {
        file: path.to_path_buf(),
        line: 0,
        message: format!("cannot read file: {}", e),
    })?;
    let model = parser::extract(path, &text).map_err(|e| GraphWarning {
        file: path.to_path_buf(),
        line: e.line,
        message: e.message,
    })?;
    debug!(
        file = %path.display(),
        imports = model.imports.len(),
        elements = model.elements.len(),
        "extracted"
    );
    Ok((text, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryProvider;

    fn provider() -> InMemoryProvider {
        InMemoryProvider::from_pairs([
            (
                "/p/src/b/Two.jsx",
                "import { Button } from '@old/ui';\nexport const T = () => <Button />;\n",
            ),
            (
                "/p/src/One.jsx",
                "import { Button, Card } from '@old/ui';\nexport const O = () => <Card><Button /></Card>;\n",
            ),
            ("/p/src/Broken.jsx", "const x = <Card>;\n"),
            ("/p/src/only-imports.js", "import { Button } from '@old/ui';\n"),
        ])
    }

    #[test]
    fn merges_in_stable_order_and_records_failures() {
        let graph = build_graph(Path::new("/p"), &ScanOptions::default(), &provider()).unwrap();

        assert_eq!(graph.files.len(), 4);
        let order: Vec<_> = graph
            .elements
            .iter()
            .map(|e| (e.file.file_name().unwrap().to_string_lossy().to_string(), e.component_local_name.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("One.jsx".to_string(), "Card".to_string()),
                ("One.jsx".to_string(), "Button".to_string()),
                ("Two.jsx".to_string(), "Button".to_string()),
            ]
        );

        assert_eq!(graph.warnings.len(), 1);
        assert_eq!(graph.warnings[0].file, PathBuf::from("/p/src/Broken.jsx"));
        assert_eq!(graph.warnings[0].line, 1);

        // The import-only file still contributes its binding.
        assert_eq!(
            graph
                .imports_in(Path::new("/p/src/only-imports.js"))
                .count(),
            1
        );
        assert_eq!(graph.packages(), vec!["@old/ui".to_string()]);
    }

    #[test]
    fn scan_keeps_texts_of_parsed_files_only() {
        let scan = scan_project(Path::new("/p"), &ScanOptions::default(), &provider()).unwrap();
        let keys: Vec<_> = scan.sources.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                PathBuf::from("/p/src/One.jsx"),
                PathBuf::from("/p/src/only-imports.js"),
                PathBuf::from("/p/src/b/Two.jsx"),
            ]
        );
        assert!(scan.sources[&PathBuf::from("/p/src/One.jsx")].contains("<Card>"));
    }

    #[test]
    fn missing_root_is_an_error_on_disk() {
        let err = build_graph(
            Path::new("/definitely/not/here"),
            &ScanOptions::default(),
            &crate::source::FileSystemProvider,
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::Root { .. }));
    }
}
