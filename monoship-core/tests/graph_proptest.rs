use std::collections::HashMap;

use monoship_core::graph::DependencyGraph;
use monoship_core::package::PackageNode;
use proptest::prelude::*;

/// Random DAGs: package `i` may only depend on packages `j < i`.
fn gen_packages() -> impl Strategy<Value = Vec<PackageNode>> {
    (
        prop::collection::vec(prop::collection::vec(any::<bool>(), 12), 1..12),
        any::<bool>(),
    )
        .prop_map(|(adjacency, reversed)| {
            let mut packages: Vec<PackageNode> = adjacency
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let deps: Vec<String> = (0..i)
                        .filter(|&j| row[j])
                        .map(|j| format!("pkg-{}", j))
                        .collect();
                    PackageNode::new(format!("pkg-{}", i), None, format!("pkg-{}", i), deps)
                })
                .collect();
            if reversed {
                packages.reverse();
            }
            packages
        })
}

proptest! {
    #[test]
    fn test_order_respects_every_edge(packages in gen_packages()) {
        let graph = DependencyGraph::new(packages.clone()).unwrap();
        let order = graph.topological_order().unwrap();
        prop_assert_eq!(order.len(), packages.len());

        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        prop_assert_eq!(position.len(), packages.len());

        for (name, deps) in graph.edges() {
            for dep in deps {
                prop_assert!(position[dep] < position[name]);
            }
        }
    }

    #[test]
    fn test_levels_respect_every_edge(packages in gen_packages()) {
        let graph = DependencyGraph::new(packages.clone()).unwrap();
        let order = graph.topological_order().unwrap();
        let levels = graph.dependency_levels(&order).unwrap();

        let total: usize = levels.iter().map(Vec::len).sum();
        prop_assert_eq!(total, packages.len());

        for (name, deps) in graph.edges() {
            let level = levels.level_of(name).unwrap();
            for dep in deps {
                prop_assert!(levels.level_of(dep).unwrap() < level);
            }
        }

        for level in levels.iter() {
            for a in level {
                let package = graph.get_package(a).unwrap();
                for b in level {
                    prop_assert!(!package.depends_on(b));
                }
            }
        }
    }

    #[test]
    fn test_back_edge_is_detected(packages in gen_packages()) {
        prop_assume!(packages.len() >= 2);
        let n = packages.len();
        let mut packages = packages;
        // make pkg-0 depend on the last package, closing a cycle if a path exists
        for package in packages.iter_mut() {
            if package.name == "pkg-0" {
                package.declared_dependencies.insert(format!("pkg-{}", n - 1));
            }
        }
        let graph = DependencyGraph::new(packages).unwrap();
        let reaches_zero = {
            let mut stack = vec![format!("pkg-{}", n - 1)];
            let mut seen = std::collections::HashSet::new();
            let mut found = false;
            while let Some(current) = stack.pop() {
                if current == "pkg-0" {
                    found = true;
                    break;
                }
                if seen.insert(current.clone()) {
                    for dep in graph.dependencies(&current).unwrap() {
                        stack.push(dep.to_string());
                    }
                }
            }
            found
        };
        prop_assert_eq!(graph.topological_order().is_err(), reaches_zero);
    }
}
