use crate::error::PlanError;
use model::execution::pipeline::PipelineStep;
use std::collections::{HashMap, HashSet};

/// DAG over declared "depends on" edges.
///
/// Nodes keep their declaration order and each node keeps its dependencies in
/// declaration order, so every traversal below is deterministic. Dependencies
/// that name an undeclared step become leaf nodes.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    nodes: Vec<String>,
    edges: HashMap<String, Vec<String>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: &[PipelineStep]) -> Self {
        let mut resolver = Self::new();
        for step in steps {
            resolver.add_step(&step.id, &step.depends_on);
        }
        resolver
    }

    pub fn add_step(&mut self, id: &str, depends_on: &[String]) {
        self.ensure_node(id);
        for dep in depends_on {
            self.ensure_node(dep);
            let deps = self.edges.entry(id.to_string()).or_default();
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the first cycle found, as the chain of ids that closes it.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        for node in &self.nodes {
            let mut path = vec![node.clone()];
            if let Some(cycle) = self.find_cycle(node, &mut visited, &mut path) {
                return Some(cycle);
            }
            visited.insert(node.clone());
        }
        None
    }

    fn find_cycle(
        &self,
        current: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        for dep in self.dependencies_of(current) {
            if let Some(cycle_start) = path.iter().position(|n| n == dep) {
                let mut cycle = path[cycle_start..].to_vec();
                cycle.push(dep.clone());
                return Some(cycle);
            }

            if visited.contains(dep) {
                continue;
            }

            path.push(dep.clone());
            if let Some(cycle) = self.find_cycle(dep, visited, path) {
                return Some(cycle);
            }
            path.pop();
            visited.insert(dep.clone());
        }
        None
    }

    /// Topologically ordered transitive closure of `id`, ending with `id`.
    pub fn resolve_dependencies(&self, id: &str) -> Result<Vec<String>, PlanError> {
        if !self.contains(id) {
            return Err(PlanError::UnknownStep(id.to_string()));
        }
        if let Some(chain) = self.detect_cycle() {
            return Err(PlanError::CircularDependency { chain });
        }

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        self.post_order(id, &mut seen, &mut order);
        Ok(order)
    }

    /// Canonical order for `ids`: each id placed after everything it
    /// depends on, otherwise keeping the order of `ids`.
    pub fn execution_order<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<String>, PlanError> {
        if let Some(chain) = self.detect_cycle() {
            return Err(PlanError::CircularDependency { chain });
        }

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for id in ids {
            let id = id.as_ref();
            if !self.contains(id) {
                return Err(PlanError::UnknownStep(id.to_string()));
            }
            self.post_order(id, &mut seen, &mut order);
        }
        Ok(order)
    }

    fn post_order(&self, id: &str, seen: &mut HashSet<String>, order: &mut Vec<String>) {
        if !seen.insert(id.to_string()) {
            return;
        }
        for dep in self.dependencies_of(id) {
            self.post_order(dep, seen, order);
        }
        order.push(id.to_string());
    }

    fn ensure_node(&mut self, id: &str) {
        if !self.edges.contains_key(id) {
            self.edges.insert(id.to_string(), Vec::new());
            self.nodes.push(id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> DependencyResolver {
        // A -> B -> C: C depends on B, B depends on A
        let mut resolver = DependencyResolver::new();
        resolver.add_step("C", &["B".to_string()]);
        resolver.add_step("A", &[]);
        resolver.add_step("B", &["A".to_string()]);
        resolver
    }

    #[test]
    fn resolves_transitive_closure_in_order() {
        let resolver = chain();
        assert_eq!(resolver.resolve_dependencies("C").unwrap(), vec!["A", "B", "C"]);
        assert_eq!(resolver.resolve_dependencies("A").unwrap(), vec!["A"]);
    }

    #[test]
    fn diamond_dependencies_appear_once() {
        let mut resolver = DependencyResolver::new();
        resolver.add_step("left", &["root".to_string()]);
        resolver.add_step("right", &["root".to_string()]);
        resolver.add_step("sink", &["left".to_string(), "right".to_string()]);

        assert_eq!(
            resolver.resolve_dependencies("sink").unwrap(),
            vec!["root", "left", "right", "sink"]
        );
    }

    #[test]
    fn detects_cycles() {
        let mut resolver = DependencyResolver::new();
        resolver.add_step("a", &["b".to_string()]);
        resolver.add_step("b", &["c".to_string()]);
        resolver.add_step("c", &["a".to_string()]);

        let cycle = resolver.detect_cycle().expect("cycle");
        assert_eq!(cycle.first(), cycle.last());
        assert!(matches!(
            resolver.resolve_dependencies("a"),
            Err(PlanError::CircularDependency { .. })
        ));
    }

    #[test]
    fn unknown_step_is_an_error() {
        assert_eq!(
            chain().resolve_dependencies("Z"),
            Err(PlanError::UnknownStep("Z".into()))
        );
    }

    #[test]
    fn execution_order_is_independent_of_submission_order() {
        let resolver = chain();
        assert_eq!(
            resolver.execution_order(&["C", "A", "B"]).unwrap(),
            vec!["A", "B", "C"]
        );
        assert_eq!(
            resolver.execution_order(&["A", "B", "C"]).unwrap(),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn undeclared_dependencies_become_leaves() {
        let mut resolver = DependencyResolver::new();
        resolver.add_step("load", &["external_feed".to_string()]);
        assert_eq!(
            resolver.resolve_dependencies("load").unwrap(),
            vec!["external_feed", "load"]
        );
    }
}
