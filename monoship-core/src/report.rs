//! Human-readable and JSON reports of the build order.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::{BuildOrder, DependencyGraph};

/// One line of the order report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    /// 1-based position in the build order.
    pub index: usize,
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub dependencies: Vec<String>,
}

/// The build order with each package's details.
#[derive(Debug, Clone, Serialize)]
pub struct OrderReport {
    pub packages: Vec<ReportEntry>,
}

impl OrderReport {
    pub fn new(graph: &DependencyGraph, order: &BuildOrder) -> Result<Self> {
        let packages = order
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let package = graph.get_package(name).ok_or_else(|| Error::PackageNotFound {
                    name: name.clone(),
                    available: order.names().join(", "),
                })?;
                Ok(ReportEntry {
                    index: i + 1,
                    name: package.name.clone(),
                    version: package.version.clone(),
                    path: package.path.clone(),
                    dependencies: package.in_workspace_dependencies.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { packages })
    }

    /// Renders one block per package:
    ///
    /// ```text
    ///  1. name@version
    ///     path: packages/name
    ///     deps: a, b
    /// ```
    pub fn render(&self) -> String {
        let width = self.packages.len().to_string().len();
        let mut out = String::new();
        for entry in &self.packages {
            let deps = if entry.dependencies.is_empty() {
                "none".to_string()
            } else {
                entry.dependencies.join(", ")
            };
            let _ = writeln!(
                out,
                "{:>width$}. {}@{}",
                entry.index,
                entry.name,
                entry.version,
                width = width
            );
            let pad = " ".repeat(width + 2);
            let _ = writeln!(out, "{}path: {}", pad, entry.path.display());
            let _ = writeln!(out, "{}deps: {}", pad, deps);
        }
        out
    }
}

/// Builds and renders the order report in one step.
pub fn render_order_report(graph: &DependencyGraph, order: &BuildOrder) -> Result<String> {
    Ok(OrderReport::new(graph, order)?.render())
}
