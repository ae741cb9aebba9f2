//! Dependency Graph: level assignment, cycle detection, critical path.
//!
//! Grounded on the adjacency-map + Kahn's-algorithm structure used elsewhere
//! in this codebase for cross-repo execution plans; here the nodes are a
//! single plan's sections rather than repositories, and `level` sets replace
//! a generic multi-repo execution plan.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::domain::Section;
use crate::error::{GraphError, GraphResult};

/// A built, validated dependency graph over one plan's sections.
///
/// Deterministic for a given input: two graphs built from the same section
/// set produce identical `levels` and `critical_path`.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    levels: Vec<BTreeSet<String>>,
    level_of: BTreeMap<String, usize>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
    critical_path: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph from `sections`, validating and annotating
    /// `dependents` on each section in place as a side effect.
    pub fn build(sections: &mut [Section]) -> GraphResult<Self> {
        let ids: BTreeSet<String> = sections.iter().map(|s| s.id.clone()).collect();
        let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for s in sections.iter() {
            dependencies.insert(s.id.clone(), s.dependencies.clone());
            dependents.entry(s.id.clone()).or_default();
            for dep in &s.dependencies {
                if !ids.contains(dep) {
                    return Err(GraphError::UnknownDependency {
                        section: s.id.clone(),
                        dependency: dep.clone(),
                    });
                }
                dependents.entry(dep.clone()).or_default().insert(s.id.clone());
            }
        }

        let mut level_of: BTreeMap<String, usize> = BTreeMap::new();
        let mut on_stack: BTreeSet<String> = BTreeSet::new();

        fn compute_level(
            id: &str,
            dependencies: &BTreeMap<String, BTreeSet<String>>,
            level_of: &mut BTreeMap<String, usize>,
            on_stack: &mut BTreeSet<String>,
        ) -> GraphResult<usize> {
            if let Some(&lvl) = level_of.get(id) {
                return Ok(lvl);
            }
            if on_stack.contains(id) {
                return Err(GraphError::CircularDependency {
                    section: id.to_string(),
                });
            }
            on_stack.insert(id.to_string());
            let deps = dependencies.get(id).cloned().unwrap_or_default();
            let mut max_dep_level: Option<usize> = None;
            for dep in &deps {
                let dep_level = compute_level(dep, dependencies, level_of, on_stack)?;
                max_dep_level = Some(max_dep_level.map_or(dep_level, |m: usize| m.max(dep_level)));
            }
            on_stack.remove(id);
            let level = match max_dep_level {
                Some(m) => m + 1,
                None => 0,
            };
            level_of.insert(id.to_string(), level);
            Ok(level)
        }

        for id in &ids {
            compute_level(id, &dependencies, &mut level_of, &mut on_stack)?;
        }

        // Inconsistency check: every dependent edge must have a matching
        // forward dependency edge; by construction above this can only
        // fail if a section id appears twice with conflicting data.
        for (id, deps) in &dependencies {
            for dep in deps {
                if !dependents.get(dep).map(|d| d.contains(id)).unwrap_or(false) {
                    return Err(GraphError::InconsistentGraph {
                        detail: format!("{dep} missing {id} in dependents"),
                    });
                }
            }
        }

        let max_level = level_of.values().copied().max().unwrap_or(0);
        let mut levels: Vec<BTreeSet<String>> = vec![BTreeSet::new(); max_level + 1];
        for (id, lvl) in &level_of {
            levels[*lvl].insert(id.clone());
        }

        let critical_path = build_critical_path(&levels, &dependencies, max_level);

        for s in sections.iter_mut() {
            s.dependents = dependents.get(&s.id).cloned().unwrap_or_default();
        }

        Ok(Self {
            levels,
            level_of,
            dependencies,
            dependents,
            critical_path,
        })
    }

    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.level_of.get(id).copied()
    }

    pub fn levels(&self) -> &[BTreeSet<String>] {
        &self.levels
    }

    pub fn max_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    pub fn dependencies_of(&self, id: &str) -> BTreeSet<String> {
        self.dependencies.get(id).cloned().unwrap_or_default()
    }

    pub fn dependents_of(&self, id: &str) -> BTreeSet<String> {
        self.dependents.get(id).cloned().unwrap_or_default()
    }

    pub fn critical_path(&self) -> &[String] {
        &self.critical_path
    }

    /// Runnable = dependencies all satisfied by `done_ids`, restricted to
    /// `candidate_ids` (used by the scheduler).
    pub fn runnable<'a>(
        &self,
        candidate_ids: impl Iterator<Item = &'a str>,
        done_ids: &BTreeSet<String>,
    ) -> Vec<String> {
        candidate_ids
            .filter(|id| {
                self.dependencies_of(id)
                    .iter()
                    .all(|dep| done_ids.contains(dep))
            })
            .map(|s| s.to_string())
            .collect()
    }
}

/// Trace back from the lexicographically-smallest section at `max_level`
/// through the highest-level dependency at each step, tie-breaking on
/// lexicographic id.
fn build_critical_path(
    levels: &[BTreeSet<String>],
    dependencies: &BTreeMap<String, BTreeSet<String>>,
    max_level: usize,
) -> Vec<String> {
    let mut path = VecDeque::new();
    let Some(last_level) = levels.get(max_level) else {
        return Vec::new();
    };
    let Some(mut current) = last_level.iter().next().cloned() else {
        return Vec::new();
    };
    path.push_front(current.clone());

    loop {
        let deps = dependencies.get(&current).cloned().unwrap_or_default();
        if deps.is_empty() {
            break;
        }
        // Highest-level dependency; lexicographic tie-break via BTreeSet order
        // combined with a stable max_by_key scan.
        let next = deps
            .into_iter()
            .map(|d| {
                let lvl = levels
                    .iter()
                    .position(|set| set.contains(&d))
                    .unwrap_or(0);
                (d, lvl)
            })
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(d, _)| d);
        match next {
            Some(next_id) => {
                path.push_front(next_id.clone());
                current = next_id;
            }
            None => break,
        }
    }

    path.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Section;

    fn section(id: &str, deps: &[&str]) -> Section {
        let mut s = Section::new(id, id, "desc");
        s.dependencies = deps.iter().map(|d| d.to_string()).collect();
        s
    }

    #[test]
    fn leaf_sections_are_level_zero() {
        let mut sections = vec![section("a", &[]), section("b", &[])];
        let g = DependencyGraph::build(&mut sections).unwrap();
        assert_eq!(g.level_of("a"), Some(0));
        assert_eq!(g.level_of("b"), Some(0));
    }

    #[test]
    fn level_is_one_plus_max_dependency_level() {
        let mut sections = vec![section("a", &[]), section("b", &["a"]), section("c", &["b"])];
        let g = DependencyGraph::build(&mut sections).unwrap();
        assert_eq!(g.level_of("a"), Some(0));
        assert_eq!(g.level_of("b"), Some(1));
        assert_eq!(g.level_of("c"), Some(2));
        assert_eq!(g.max_level(), 2);
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut sections = vec![section("a", &["ghost"])];
        let err = DependencyGraph::build(&mut sections).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownDependency {
                section: "a".into(),
                dependency: "ghost".into(),
            }
        );
    }

    #[test]
    fn direct_cycle_is_rejected() {
        let mut sections = vec![section("a", &["b"]), section("b", &["a"])];
        let err = DependencyGraph::build(&mut sections).unwrap_err();
        assert!(matches!(err, GraphError::CircularDependency { .. }));
    }

    #[test]
    fn self_cycle_is_rejected() {
        let mut sections = vec![section("a", &["a"])];
        let err = DependencyGraph::build(&mut sections).unwrap_err();
        assert!(matches!(err, GraphError::CircularDependency { .. }));
    }

    #[test]
    fn dependents_are_populated_as_inverse_of_dependencies() {
        let mut sections = vec![section("a", &[]), section("b", &["a"])];
        DependencyGraph::build(&mut sections).unwrap();
        let a = sections.iter().find(|s| s.id == "a").unwrap();
        assert!(a.dependents.contains("b"));
    }

    #[test]
    fn diamond_graph_resolves_levels_deterministically() {
        let mut sections = vec![
            section("a", &[]),
            section("b", &["a"]),
            section("c", &["a"]),
            section("d", &["b", "c"]),
        ];
        let g = DependencyGraph::build(&mut sections).unwrap();
        assert_eq!(g.level_of("d"), Some(2));
        assert_eq!(g.levels()[1].len(), 2);
    }

    #[test]
    fn critical_path_length_equals_max_level_plus_one() {
        let mut sections = vec![section("a", &[]), section("b", &["a"]), section("c", &["b"])];
        let g = DependencyGraph::build(&mut sections).unwrap();
        assert_eq!(g.critical_path().len(), g.max_level() + 1);
        assert_eq!(g.critical_path(), &["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn runnable_requires_all_dependencies_done() {
        let mut sections = vec![section("a", &[]), section("b", &["a"])];
        let g = DependencyGraph::build(&mut sections).unwrap();
        let done = BTreeSet::new();
        assert_eq!(g.runnable(["a", "b"].into_iter(), &done), vec!["a".to_string()]);
        let mut done = BTreeSet::new();
        done.insert("a".to_string());
        assert_eq!(g.runnable(["a", "b"].into_iter(), &done), vec!["b".to_string()]);
    }

    #[test]
    fn building_twice_on_same_input_is_deterministic() {
        let mut s1 = vec![section("a", &[]), section("b", &["a"]), section("c", &["a"])];
        let mut s2 = vec![section("a", &[]), section("b", &["a"]), section("c", &["a"])];
        let g1 = DependencyGraph::build(&mut s1).unwrap();
        let g2 = DependencyGraph::build(&mut s2).unwrap();
        assert_eq!(g1.levels(), g2.levels());
        assert_eq!(g1.critical_path(), g2.critical_path());
    }
}
