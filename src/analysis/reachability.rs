use super::ShrinkerWarning;
use crate::graph::{CounterSet, DependencyKind, ShrinkerGraph, Symbol};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Counters from one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WalkStats {
    pub roots: usize,
    pub kept_nodes: usize,
    /// Edges examined, including conditional edges parked until their condition held
    pub edges_visited: usize,
}

/// Marks every node reachable from a set of roots, for one counter set.
///
/// Unconditional edges are followed as soon as their source is kept.
/// A conditional edge is followed once both its source and its condition
/// class are kept; if the source is reached first the target is parked
/// under the condition and released when the condition is marked.
pub struct ReachabilityAnalyzer;

impl Default for ReachabilityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn walk<T: Symbol>(
        &self,
        graph: &mut ShrinkerGraph<T>,
        counter_set: CounterSet,
        roots: &HashMap<T, DependencyKind>,
    ) -> (WalkStats, Vec<ShrinkerWarning>) {
        graph.reset_marks(counter_set);

        let mut stats = WalkStats::default();
        let mut warnings = Vec::new();
        let mut worklist = Worklist::default();
        let mut waiting: HashMap<T, Vec<T>> = HashMap::new();

        // Sorted so the walk, and the order warnings are raised in, is deterministic
        let mut sorted: Vec<(&T, &DependencyKind)> = roots.iter().collect();
        sorted.sort();
        for (root, kind) in sorted {
            if !graph.contains(root) {
                warnings.push(ShrinkerWarning::unresolved_root(root.to_string()));
                continue;
            }
            stats.roots += 1;
            worklist.push(graph, counter_set, root.clone());
            if *kind == DependencyKind::RequiresClass {
                if let Some(clinit) = graph.static_initializer(root) {
                    worklist.push(graph, counter_set, clinit);
                }
            }
        }

        while let Some(node) = worklist.pop() {
            if !graph.mark_kept(&node, counter_set) {
                continue;
            }
            stats.kept_nodes += 1;

            if let Some(released) = waiting.remove(&node) {
                for target in released {
                    worklist.push(graph, counter_set, target);
                }
            }

            let edges: Vec<(T, Option<T>, DependencyKind)> = graph
                .dependencies_from(&node)
                .into_iter()
                .map(|(target, dep)| (target.clone(), dep.condition.clone(), dep.kind))
                .collect();

            for (target, condition, kind) in edges {
                stats.edges_visited += 1;
                match condition {
                    Some(condition) if !graph.is_kept(&condition, counter_set) => {
                        waiting.entry(condition).or_default().push(target);
                    }
                    _ => {
                        if kind == DependencyKind::RequiresClass {
                            if let Some(clinit) = graph.static_initializer(&target) {
                                worklist.push(graph, counter_set, clinit);
                            }
                        }
                        worklist.push(graph, counter_set, target);
                    }
                }
            }
        }

        debug!(
            "Walk {}: {} roots, {} kept, {} edges",
            counter_set.display_name(),
            stats.roots,
            stats.kept_nodes,
            stats.edges_visited
        );

        (stats, warnings)
    }
}

/// FIFO queue that never holds a node twice or a node already kept
struct Worklist<T> {
    queue: VecDeque<T>,
    queued: HashSet<T>,
}

impl<T> Default for Worklist<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
        }
    }
}

impl<T: Symbol> Worklist<T> {
    fn push(&mut self, graph: &ShrinkerGraph<T>, counter_set: CounterSet, node: T) {
        if !graph.is_kept(&node, counter_set) && self.queued.insert(node.clone()) {
            self.queue.push_back(node);
        }
    }

    fn pop(&mut self) -> Option<T> {
        self.queue.pop_front()
    }
}
