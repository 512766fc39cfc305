//! Usage aggregator: read-only analytics over a [`ProjectGraph`] that tell
//! rule authors which components, props and prop values they need to cover.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::graph::ProjectGraph;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub total_files: usize,
    pub analyzed_files: usize,
    pub files_with_elements: usize,
    pub total_components: usize,
    pub total_elements: usize,
    pub unresolved_elements: usize,
    pub warnings: usize,
}

/// One distinct props snapshot (prop name -> value shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropCombination {
    pub props: BTreeMap<String, String>,
    pub count: usize,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentUsage {
    pub package: String,
    pub component: String,
    pub count: usize,
    pub files: Vec<PathBuf>,
    pub prop_names: Vec<String>,
    /// prop name -> value shape -> occurrences
    pub prop_values: BTreeMap<String, BTreeMap<String, usize>>,
    /// Most frequent first; ties in props order.
    pub combinations: Vec<PropCombination>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub stats: ProjectStats,
    /// Sorted by package, then component.
    pub components: Vec<ComponentUsage>,
}

impl UsageReport {
    pub fn for_package<'r>(&'r self, package: &'r str) -> impl Iterator<Item = &'r ComponentUsage> + 'r {
        self.components.iter().filter(move |c| c.package == package)
    }
}

#[derive(Default)]
struct Group {
    count: usize,
    files: BTreeSet<PathBuf>,
    prop_values: BTreeMap<String, BTreeMap<String, usize>>,
    combinations: BTreeMap<BTreeMap<String, String>, (usize, BTreeSet<PathBuf>)>,
}

/// Group resolved elements by `(package, component)`.
pub fn aggregate(graph: &ProjectGraph) -> UsageReport {
    let mut groups: BTreeMap<(String, String), Group> = BTreeMap::new();
    let mut unresolved = 0usize;
    let mut files_with_elements = BTreeSet::new();

    for el in &graph.elements {
        files_with_elements.insert(el.file.clone());
        let Some(package) = el.source_package() else {
            unresolved += 1;
            continue;
        };
        let group = groups
            .entry((package.to_string(), el.component_name().to_string()))
            .or_default();
        group.count += 1;
        group.files.insert(el.file.clone());

        let mut snapshot = BTreeMap::new();
        for (name, prop) in &el.props {
            let shape = prop.value.shape();
            *group
                .prop_values
                .entry(name.clone())
                .or_default()
                .entry(shape.clone())
                .or_default() += 1;
            snapshot.insert(name.clone(), shape);
        }
        let combo = group.combinations.entry(snapshot).or_default();
        combo.0 += 1;
        combo.1.insert(el.file.clone());
    }

    let components: Vec<ComponentUsage> = groups
        .into_iter()
        .map(|((package, component), group)| {
            let mut combinations: Vec<PropCombination> = group
                .combinations
                .into_iter()
                .map(|(props, (count, files))| PropCombination {
                    props,
                    count,
                    files: files.into_iter().collect(),
                })
                .collect();
            combinations.sort_by(|a, b| b.count.cmp(&a.count));
            ComponentUsage {
                package,
                component,
                count: group.count,
                files: group.files.into_iter().collect(),
                prop_names: group.prop_values.keys().cloned().collect(),
                prop_values: group.prop_values,
                combinations,
            }
        })
        .collect();

    UsageReport {
        stats: ProjectStats {
            total_files: graph.files.len(),
            analyzed_files: graph.files.len() - graph.warnings.len(),
            files_with_elements: files_with_elements.len(),
            total_components: components.len(),
            total_elements: graph.elements.len(),
            unresolved_elements: unresolved,
            warnings: graph.warnings.len(),
        },
        components,
    }
}
