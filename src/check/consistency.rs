//! Cross-package consistency.
//!
//! Every coordinate a module depends on must have archives of its own, and
//! no archive may be shipped both by a package and by anything it depends
//! on, directly or transitively. A binary bundled at two levels would be
//! linked twice.

use std::collections::{BTreeMap, HashMap, HashSet};

use miette::Diagnostic as MietteDiagnostic;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use thiserror::Error;
use tracing::info;

use crate::ast::{Arena, Ast, ExprId, FindModule, ModuleArchive};
use crate::core::Coordinate;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::hash::short_digest;
use crate::visit::readonly::{walk, Visitor};

/// Length of the hash prefix shown in messages.
const DIGEST_LENGTH: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum ConsistencyError {
    #[error("Reference {dependee} was not found, needed by {dependant}")]
    #[diagnostic(
        code(cdep::check::unresolved_reference),
        help("Add `{dependee}` to the resolved manifests")
    )]
    UnresolvedReference {
        dependant: Coordinate,
        dependee: Coordinate,
    },

    #[error(
        "Package '{dependant}' depends on '{dependee}' but both packages contain a file '{file}' \
         with the same SHA256. The file should only be in the lowest level package '{dependee}' \
         (sha256:{digest})"
    )]
    #[diagnostic(
        code(cdep::check::duplicate_content),
        help("Remove '{file}' from `{dependant}`")
    )]
    DuplicateContent {
        dependant: Coordinate,
        dependee: Coordinate,
        file: String,
        digest: String,
    },
}

impl ConsistencyError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConsistencyError::UnresolvedReference {
                dependant,
                dependee,
            } => Diagnostic::error(format!("`{}` depends on unknown package `{}`", dependant, dependee))
                .with_context(format!("no archives were found for `{}`", dependee))
                .with_suggestion(suggestions::UNRESOLVED_REFERENCE),

            ConsistencyError::DuplicateContent {
                dependant,
                dependee,
                file,
                digest,
            } => Diagnostic::error(format!(
                "`{}` and its dependency `{}` both contain `{}`",
                dependant, dependee, file
            ))
            .with_context(format!("sha256:{}", digest))
            .with_context(format!("the file belongs only in `{}`", dependee))
            .with_suggestion(suggestions::DUPLICATE_CONTENT),
        }
    }
}

/// One archive as seen by the checker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArchiveEntry {
    sha256: String,
    file: String,
}

/// Dependency edges between coordinates and the archives under each find-module.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Edge `a -> b` means `a` depends on `b`.
    graph: DiGraph<Coordinate, ()>,
    coordinate_to_node: HashMap<Coordinate, NodeIndex>,
    archives: BTreeMap<Coordinate, Vec<ArchiveEntry>>,
}

impl DependencyGraph {
    /// Collect edges and archives from a function table.
    pub fn from_table(arena: &Arena, table: ExprId) -> Self {
        let mut collector = Collector {
            graph: DependencyGraph::default(),
            current: None,
        };
        collector.visit(arena, table);
        collector.graph
    }

    fn node(&mut self, coordinate: Coordinate) -> NodeIndex {
        if let Some(&node) = self.coordinate_to_node.get(&coordinate) {
            return node;
        }
        let node = self.graph.add_node(coordinate);
        self.coordinate_to_node.insert(coordinate, node);
        node
    }

    fn add_edge(&mut self, from: Coordinate, to: Coordinate) {
        let from_node = self.node(from);
        let to_node = self.node(to);
        if !self.graph.contains_edge(from_node, to_node) {
            self.graph.add_edge(from_node, to_node, ());
        }
    }

    /// Direct dependencies of `coordinate`, sorted.
    pub fn deps(&self, coordinate: Coordinate) -> Vec<Coordinate> {
        self.neighbors(coordinate, petgraph::Direction::Outgoing)
    }

    /// Coordinates that depend directly on `coordinate`, sorted.
    pub fn dependents(&self, coordinate: Coordinate) -> Vec<Coordinate> {
        self.neighbors(coordinate, petgraph::Direction::Incoming)
    }

    fn neighbors(&self, coordinate: Coordinate, direction: petgraph::Direction) -> Vec<Coordinate> {
        let Some(&node) = self.coordinate_to_node.get(&coordinate) else {
            return Vec::new();
        };
        let mut found: Vec<Coordinate> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|n| self.graph[n])
            .collect();
        found.sort();
        found
    }

    /// Every problem in the graph, in a stable order.
    pub fn problems(&self) -> Vec<ConsistencyError> {
        let mut problems = Vec::new();
        let mut dependants: Vec<Coordinate> = self.coordinate_to_node.keys().copied().collect();
        dependants.sort();

        for dependant in &dependants {
            for dependee in self.deps(*dependant) {
                if !self.archives.contains_key(&dependee) {
                    problems.push(ConsistencyError::UnresolvedReference {
                        dependant: *dependant,
                        dependee,
                    });
                }
            }
        }

        for dependant in &dependants {
            self.check_owner(*dependant, &mut problems);
        }
        problems
    }

    /// Every coordinate reachable from `coordinate` through one or more edges, sorted.
    pub fn transitive_deps(&self, coordinate: Coordinate) -> Vec<Coordinate> {
        let Some(&start) = self.coordinate_to_node.get(&coordinate) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                found.push(self.graph[node]);
            }
        }
        found.sort();
        found
    }

    /// Compare `dependant`'s archives with those of everything below it.
    fn check_owner(&self, dependant: Coordinate, problems: &mut Vec<ConsistencyError>) {
        let Some(owned) = self.archives.get(&dependant) else {
            return;
        };
        let owned: HashSet<&str> = owned.iter().map(|a| a.sha256.as_str()).collect();

        for dependee in self.transitive_deps(dependant) {
            for archive in self.archives.get(&dependee).into_iter().flatten() {
                if !owned.contains(archive.sha256.as_str()) {
                    continue;
                }
                let problem = ConsistencyError::DuplicateContent {
                    dependant,
                    dependee,
                    file: archive.file.clone(),
                    digest: short_digest(&archive.sha256, DIGEST_LENGTH).to_string(),
                };
                if !problems.contains(&problem) {
                    problems.push(problem);
                }
            }
        }
    }
}

struct Collector {
    graph: DependencyGraph,
    current: Option<Coordinate>,
}

impl Visitor for Collector {
    fn visit_find_module(&mut self, arena: &Arena, id: ExprId, find: &FindModule) {
        self.current = Some(find.coordinate);
        self.graph.node(find.coordinate);
        walk(self, arena, id);
        self.current = None;
    }

    fn visit_module(
        &mut self,
        arena: &Arena,
        id: ExprId,
        _archive: ExprId,
        dependencies: &std::collections::BTreeSet<Coordinate>,
    ) {
        if let Some(current) = self.current {
            for dependency in dependencies {
                self.graph.add_edge(current, *dependency);
            }
        }
        walk(self, arena, id);
    }

    fn visit_module_archive(&mut self, arena: &Arena, id: ExprId, archive: &ModuleArchive) {
        if let Some(current) = self.current {
            let entry = ArchiveEntry {
                sha256: archive.sha256.clone(),
                file: archive.file_name().to_string(),
            };
            let entries = self.graph.archives.entry(current).or_default();
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        walk(self, arena, id);
    }
}

/// Reject the table if any consistency problem exists.
///
/// The first problem in a stable order is returned.
pub fn check(ast: &Ast) -> Result<(), ConsistencyError> {
    let graph = DependencyGraph::from_table(&ast.arena, ast.root);
    match graph.problems().into_iter().next() {
        Some(problem) => Err(problem),
        None => {
            info!("consistency check passed");
            Ok(())
        }
    }
}
