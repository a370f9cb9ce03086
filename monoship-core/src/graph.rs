//! Dependency graph construction, ordering and level grouping.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::manifest::load_manifest;
use crate::package::PackageNode;

/// Directed graph of in-workspace package dependencies.
///
/// Nodes keep discovery order. Edges point from a package to the packages
/// it depends on and only ever name packages present in the graph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: IndexMap<String, PackageNode>,
    edges: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Visiting,
    Done,
}

impl DependencyGraph {
    /// Creates a dependency graph from parsed packages.
    ///
    /// In-workspace dependencies are resolved once every package is known;
    /// declared dependencies that name no workspace package are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if two packages share a name.
    pub fn new(packages: Vec<PackageNode>) -> Result<Self> {
        let mut nodes: IndexMap<String, PackageNode> = IndexMap::with_capacity(packages.len());

        for package in packages {
            if let Some(existing) = nodes.get(&package.name) {
                return Err(Error::ManifestParse {
                    path: package.path.clone(),
                    message: format!(
                        "duplicate package name '{}' (already declared in {})",
                        package.name,
                        existing.path.display()
                    ),
                });
            }
            nodes.insert(package.name.clone(), package);
        }

        let mut edges = Vec::with_capacity(nodes.len());
        for i in 0..nodes.len() {
            let deps: Vec<usize> = nodes[i]
                .declared_dependencies
                .iter()
                .filter_map(|dep| nodes.get_index_of(dep))
                .collect();
            let names: Vec<String> = deps.iter().map(|&d| nodes[d].name.clone()).collect();
            nodes[i].in_workspace_dependencies = names;
            edges.push(deps);
        }

        debug!(
            packages = nodes.len(),
            edges = edges.iter().map(Vec::len).sum::<usize>(),
            "built dependency graph"
        );

        Ok(Self { nodes, edges })
    }

    /// Parses every manifest and builds the graph.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid manifest; no partial graph is produced.
    pub fn from_manifests(paths: &[PathBuf]) -> Result<Self> {
        let packages = paths
            .iter()
            .map(|path| load_manifest(path))
            .collect::<Result<Vec<_>>>()?;
        Self::new(packages)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Retrieves a package by name.
    #[inline]
    pub fn get_package(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// Returns packages in discovery order.
    pub fn packages(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Returns `(package, in-workspace dependencies)` pairs in discovery order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, Vec<&str>)> {
        self.nodes.keys().zip(&self.edges).map(|(name, deps)| {
            (
                name.as_str(),
                deps.iter().map(|&d| self.name_at(d)).collect(),
            )
        })
    }

    /// Returns direct dependencies of a package.
    ///
    /// # Errors
    ///
    /// Returns an error if the package is not found in the graph.
    pub fn dependencies(&self, package_name: &str) -> Result<Vec<&str>> {
        let idx = self.index_of(package_name)?;
        Ok(self.edges[idx].iter().map(|&d| self.name_at(d)).collect())
    }

    /// Returns direct dependents of a package (packages that depend on it).
    ///
    /// # Errors
    ///
    /// Returns an error if the package is not found in the graph.
    pub fn dependents(&self, package_name: &str) -> Result<Vec<&str>> {
        let idx = self.index_of(package_name)?;
        Ok(self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.contains(&idx))
            .map(|(i, _)| self.name_at(i))
            .collect())
    }

    /// Linearizes the graph so every package follows its dependencies.
    ///
    /// Depth-first over an explicit stack, rooted in discovery order. The
    /// result is one valid order, not a canonical one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CircularDependency`] naming the package found
    /// in progress a second time.
    pub fn topological_order(&self) -> Result<BuildOrder> {
        let n = self.nodes.len();
        let mut state = vec![VisitState::Unvisited; n];
        let mut names = Vec::with_capacity(n);
        // (node, next edge to follow)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if state[root] != VisitState::Unvisited {
                continue;
            }
            state[root] = VisitState::Visiting;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                match self.edges[node].get(next) {
                    Some(&dep) => {
                        frame.1 += 1;
                        match state[dep] {
                            VisitState::Unvisited => {
                                state[dep] = VisitState::Visiting;
                                stack.push((dep, 0));
                            }
                            VisitState::Visiting => {
                                return Err(Error::CircularDependency {
                                    package: self.name_at(dep).to_string(),
                                });
                            }
                            VisitState::Done => {}
                        }
                    }
                    None => {
                        stack.pop();
                        state[node] = VisitState::Done;
                        names.push(self.name_at(node).to_string());
                    }
                }
            }
        }

        Ok(BuildOrder { names })
    }

    /// Groups `order` into levels that can run concurrently.
    ///
    /// A package with no in-workspace dependencies is on level 0, any other
    /// package one level above its deepest dependency. Within a level,
    /// packages keep their position in `order`.
    ///
    /// # Errors
    ///
    /// Returns an error if `order` names an unknown package or the graph
    /// contains a cycle.
    pub fn dependency_levels(&self, order: &BuildOrder) -> Result<LevelPlan> {
        let n = self.nodes.len();
        let mut memo: Vec<Option<usize>> = vec![None; n];
        let mut on_stack = vec![false; n];
        let mut levels: Vec<Vec<String>> = Vec::new();

        for name in order.iter() {
            let idx = self.index_of(name)?;
            let level = self.compute_level(idx, &mut memo, &mut on_stack)?;
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(name.clone());
        }

        Ok(LevelPlan { levels })
    }

    fn compute_level(
        &self,
        root: usize,
        memo: &mut [Option<usize>],
        on_stack: &mut [bool],
    ) -> Result<usize> {
        if let Some(level) = memo[root] {
            return Ok(level);
        }

        let mut stack = vec![root];
        on_stack[root] = true;

        while let Some(&node) = stack.last() {
            let pending = self.edges[node]
                .iter()
                .copied()
                .find(|&dep| memo[dep].is_none());

            match pending {
                Some(dep) if on_stack[dep] => {
                    return Err(Error::CircularDependency {
                        package: self.name_at(dep).to_string(),
                    });
                }
                Some(dep) => {
                    on_stack[dep] = true;
                    stack.push(dep);
                }
                None => {
                    let level = self.edges[node]
                        .iter()
                        .filter_map(|&dep| memo[dep])
                        .max()
                        .map_or(0, |deepest| deepest + 1);
                    memo[node] = Some(level);
                    on_stack[node] = false;
                    stack.pop();
                }
            }
        }

        Ok(memo[root].unwrap_or(0))
    }

    #[inline]
    fn name_at(&self, idx: usize) -> &str {
        self.nodes
            .get_index(idx)
            .map(|(name, _)| name.as_str())
            .unwrap_or_default()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.nodes
            .get_index_of(name)
            .ok_or_else(|| Error::PackageNotFound {
                name: name.to_string(),
                available: self.package_names().collect::<Vec<_>>().join(", "),
            })
    }
}

/// Package names ordered so that dependencies precede dependents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuildOrder {
    names: Vec<String>,
}

impl BuildOrder {
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.names.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl<'a> IntoIterator for &'a BuildOrder {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

/// Packages grouped into waves; a wave only depends on earlier waves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LevelPlan {
    levels: Vec<Vec<String>>,
}

impl LevelPlan {
    #[inline]
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<String>> {
        self.levels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Index of the level holding `name`.
    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.levels
            .iter()
            .position(|level| level.iter().any(|n| n == name))
    }
}
