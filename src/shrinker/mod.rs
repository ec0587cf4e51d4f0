//! Shrinker entry points
//!
//! Both shrinkers run the same phases:
//!
//! 1. **Load**: decode class files in parallel into nodes with raw references
//! 2. **Insert**: add nodes to the graph sequentially, in input order
//! 3. **Analyze**: resolve each class's references in parallel against the
//!    read-only graph; apply the resulting edges in class order
//! 4. **Dispatch**: recompute hierarchy-dependent edges on the whole graph
//! 5. **Walk**: mark reachable nodes for each counter set from its keep rules
//!
//! The incremental shrinker starts from a stored graph and only loads and
//! analyzes what changed.

mod full;
mod incremental;

pub use full::FullRunShrinker;
pub use incremental::{IncrementalShrinker, InputDiff};

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::analysis::{DispatchResolver, KeepRules, ReachabilityAnalyzer, ShrinkerLogger, ShrinkerWarning, WalkStats};
use crate::cache::CacheError;
use crate::classfile::ClassFileError;
use crate::graph::{CounterSet, ParallelGraphBuilder, ShrinkerGraph, Symbol};

#[derive(Error, Debug)]
pub enum ShrinkerError {
    #[error("malformed class {class}: {source}")]
    MalformedInput {
        class: String,
        #[source]
        source: ClassFileError,
    },

    #[error("incremental state is inconsistent, a full run is required: {reason}")]
    InconsistentIncrementalState { reason: String },

    #[error("failed to write graph store: {0}")]
    Store(#[from] CacheError),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),
}

/// Keep rules for each counter set to walk
pub type KeepRulesMap<T> = BTreeMap<CounterSet, Box<dyn KeepRules<T>>>;

#[derive(Debug, Clone, Default)]
pub struct ShrinkerOptions {
    /// Worker threads; None uses one per core
    pub threads: Option<usize>,
    /// Abort on the first malformed input instead of skipping it
    pub fail_fast: bool,
}

impl ShrinkerOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Counters describing one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub incremental: bool,
    pub program_classes: usize,
    pub library_classes: usize,
    pub analyzed_classes: usize,
    pub call_sites: usize,
    pub dependencies: usize,
    pub walks: BTreeMap<CounterSet, WalkStats>,
}

/// The shrunk graph and everything reported while producing it
#[derive(Debug)]
pub struct ShrinkerOutcome<T: Symbol> {
    pub graph: ShrinkerGraph<T>,
    pub warnings: Vec<ShrinkerWarning>,
    pub stats: RunStats,
}

impl<T: Symbol> ShrinkerOutcome<T> {
    pub fn is_kept(&self, symbol: &T, counter_set: CounterSet) -> bool {
        self.graph.is_kept(symbol, counter_set)
    }

    /// Internal names of kept program classes, in symbol order
    pub fn kept_class_names(&self, counter_set: CounterSet) -> Vec<String> {
        self.graph
            .kept_classes(counter_set)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Kept members of a class as `name:descriptor`, sorted; None if the class is not kept
    pub fn kept_member_names(&self, class: &str, counter_set: CounterSet) -> Option<Vec<String>> {
        let node = self.graph.class_by_name(class)?;
        if !node.reached.contains(counter_set) {
            return None;
        }
        let mut names: Vec<String> = self
            .graph
            .kept_members(node, counter_set)
            .map(|m| format!("{}:{}", m.name, m.descriptor))
            .collect();
        names.sort();
        Some(names)
    }

    /// Interfaces a kept class still declares, as internal names
    pub fn retained_interface_names(&self, class: &str, counter_set: CounterSet) -> Vec<String> {
        let Some(node) = self.graph.class_by_name(class) else {
            return Vec::new();
        };
        self.graph
            .retained_interfaces(node, counter_set)
            .map(|i| i.to_string())
            .collect()
    }
}

/// Phases 3-5, shared by full and incremental runs
pub(crate) fn analyze_and_walk<T: Symbol>(
    mut graph: ShrinkerGraph<T>,
    builder: &ParallelGraphBuilder,
    to_analyze: &[T],
    rules: &KeepRulesMap<T>,
    mut warnings: Vec<ShrinkerWarning>,
    logger: &dyn ShrinkerLogger,
    mut stats: RunStats,
) -> ShrinkerOutcome<T> {
    for analysis in builder.analyze(&graph, to_analyze) {
        analysis.apply(&mut graph);
    }
    stats.analyzed_classes = to_analyze.len();

    let dispatch = DispatchResolver::new().resolve(&mut graph);
    stats.call_sites = dispatch.call_sites;

    for (_, class_warnings) in graph.analysis_warnings() {
        warnings.extend(class_warnings.iter().cloned());
    }
    warnings.extend(dispatch.warnings);

    let walker = ReachabilityAnalyzer::new();
    for (counter_set, keep_rules) in rules {
        let roots = keep_rules.symbols_to_keep(&graph);
        let (walk_stats, walk_warnings) = walker.walk(&mut graph, *counter_set, &roots);
        info!(
            "{}: kept {} nodes from {} roots",
            counter_set.display_name(),
            walk_stats.kept_nodes,
            walk_stats.roots
        );
        stats.walks.insert(*counter_set, walk_stats);
        warnings.extend(walk_warnings);
    }

    stats.program_classes = graph.program_classes().count();
    stats.library_classes = graph.class_count() - stats.program_classes;
    stats.dependencies = graph.dependency_count();

    for warning in &warnings {
        logger.warn(warning);
    }
    logger.info(&format!(
        "Shrinker finished: {} program classes, {} dependencies, {} warnings",
        stats.program_classes,
        stats.dependencies,
        warnings.len()
    ));

    ShrinkerOutcome {
        graph,
        warnings,
        stats,
    }
}
