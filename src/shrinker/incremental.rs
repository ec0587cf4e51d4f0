use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use super::{analyze_and_walk, KeepRulesMap, RunStats, ShrinkerError, ShrinkerOptions, ShrinkerOutcome};
use crate::analysis::{ShrinkerLogger, TracingLogger};
use crate::cache::GraphStore;
use crate::graph::{
    content_hash, library_fingerprint, ClassInput, GraphBuilder, Origin, ParallelGraphBuilder, ShrinkerGraph,
    Symbol,
};

static DEFAULT_LOGGER: TracingLogger = TracingLogger;

/// How the current program inputs differ from a stored graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDiff {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl InputDiff {
    /// Compare program inputs against the program classes of a graph by content hash
    pub fn compute<T: Symbol>(graph: &ShrinkerGraph<T>, program: &[ClassInput]) -> Self {
        let mut diff = InputDiff::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(program.len());

        for input in program {
            seen.insert(input.name.as_str());
            match graph.class_by_name(&input.name) {
                Some(existing) if existing.is_program() => {
                    if existing.content_hash == content_hash(&input.bytes) {
                        diff.unchanged += 1;
                    } else {
                        diff.changed.push(input.name.clone());
                    }
                }
                _ => diff.added.push(input.name.clone()),
            }
        }

        diff.removed = graph
            .program_classes()
            .filter(|c| !seen.contains(c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Names whose nodes are replaced or dropped by this run
    fn touched(&self) -> HashSet<String> {
        self.added
            .iter()
            .chain(&self.changed)
            .chain(&self.removed)
            .cloned()
            .collect()
    }
}

/// Updates a stored graph with the program classes that changed since it was
/// saved, then walks it and saves it back.
///
/// Library inputs must be identical to those of the stored run; anything that
/// makes the stored graph unusable is reported as
/// [`ShrinkerError::InconsistentIncrementalState`] so the caller can fall back
/// to a full run.
pub struct IncrementalShrinker<'a> {
    options: ShrinkerOptions,
    store: GraphStore,
    run_id: String,
    logger: &'a dyn ShrinkerLogger,
}

impl IncrementalShrinker<'static> {
    pub fn new(options: ShrinkerOptions, store: GraphStore, run_id: impl Into<String>) -> Self {
        Self {
            options,
            store,
            run_id: run_id.into(),
            logger: &DEFAULT_LOGGER,
        }
    }
}

impl<'a> IncrementalShrinker<'a> {
    pub fn with_logger(
        options: ShrinkerOptions,
        store: GraphStore,
        run_id: impl Into<String>,
        logger: &'a dyn ShrinkerLogger,
    ) -> Self {
        Self {
            options,
            store,
            run_id: run_id.into(),
            logger,
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Save a graph produced by any run as the baseline for the next one
    pub fn record<T: Symbol>(&self, graph: &ShrinkerGraph<T>) -> Result<(), ShrinkerError> {
        self.store.save(graph, &self.run_id)?;
        Ok(())
    }

    pub fn run<T: Symbol>(
        &self,
        program: &[ClassInput],
        library: &[ClassInput],
        rules: &KeepRulesMap<T>,
    ) -> Result<ShrinkerOutcome<T>, ShrinkerError> {
        let graph: ShrinkerGraph<T> = self.store.load(&self.run_id).map_err(|e| {
            ShrinkerError::InconsistentIncrementalState {
                reason: e.to_string(),
            }
        })?;

        if graph.library_fingerprint() != library_fingerprint(library) {
            return Err(ShrinkerError::InconsistentIncrementalState {
                reason: "library classes differ from the stored run".to_string(),
            });
        }

        let diff = InputDiff::compute(&graph, program);
        info!(
            "Incremental run: {} added, {} changed, {} removed, {} unchanged",
            diff.added.len(),
            diff.changed.len(),
            diff.removed.len(),
            diff.unchanged
        );

        // A removed program class may have shadowed a library class that the
        // stored graph never kept.
        if let Some(shadowed) = library
            .iter()
            .find(|input| diff.removed.contains(&input.name))
        {
            return Err(ShrinkerError::InconsistentIncrementalState {
                reason: format!("removed class {} shadowed a library class", shadowed.name),
            });
        }

        // Member references resolve through supertypes, so a class naming a
        // subtype of a touched class is affected too.
        let touched = diff.touched();
        let mut affected = touched.clone();
        for name in &touched {
            for symbol in graph.subtypes_closure(&T::for_class(name)) {
                if let Some(class) = graph.class(&symbol) {
                    affected.insert(class.name.clone());
                }
            }
        }
        let mut dependents: BTreeSet<T> = graph
            .program_classes()
            .filter(|c| !touched.contains(&c.name))
            .filter(|c| graph.class_mentions_any(c, &affected))
            .map(|c| c.symbol.clone())
            .collect();
        debug!("{} dependent classes to re-analyze", dependents.len());

        let builder = ParallelGraphBuilder::new(self.options.threads, self.options.fail_fast)?;
        let to_load: Vec<ClassInput> = program
            .iter()
            .filter(|input| touched.contains(&input.name))
            .cloned()
            .collect();
        let (loaded, mut warnings) = builder.load_classes::<T>(&to_load, Origin::Program)?;

        let mut graph = graph;
        for name in diff.removed.iter().chain(&diff.changed) {
            graph.remove_class(&T::for_class(name));
        }

        let mut graph_builder = GraphBuilder::from_graph(graph);
        let mut reloaded = Vec::with_capacity(loaded.len());
        for class in loaded {
            reloaded.push(class.class.symbol.clone());
            graph_builder.add_class(class);
        }
        let (mut graph, insert_warnings) = graph_builder.build();
        warnings.extend(insert_warnings);

        for dependent in &dependents {
            let members: Vec<T> = graph
                .class(dependent)
                .map(|c| c.members.clone())
                .unwrap_or_default();
            graph.clear_reference_dependencies(dependent);
            for member in &members {
                graph.clear_reference_dependencies(member);
            }
        }

        // Reloaded classes come first, in input order, then dependents in symbol order
        for symbol in &reloaded {
            dependents.remove(symbol);
        }
        let mut to_analyze = reloaded;
        to_analyze.extend(dependents);

        let stats = RunStats {
            incremental: true,
            ..RunStats::default()
        };
        let outcome = analyze_and_walk(graph, &builder, &to_analyze, rules, warnings, self.logger, stats);
        self.record(&outcome.graph)?;
        Ok(outcome)
    }
}
