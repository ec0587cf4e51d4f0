// Parallel phases of graph construction using rayon

use super::{ClassInput, LoadedClass, Origin, ShrinkerGraph, Symbol};
use crate::analysis::{ClassAnalysis, ReferenceAnalyzer, ShrinkerWarning};
use crate::classfile::ClassFileError;
use crate::shrinker::ShrinkerError;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

/// Runs the per-class phases (decoding, reference analysis) on a worker pool.
///
/// Workers only read shared state and return their results; results come
/// back in input order and the caller applies them on its own thread, so
/// the graph is never mutated concurrently.
pub struct ParallelGraphBuilder {
    pool: ThreadPool,
    fail_fast: bool,
}

impl ParallelGraphBuilder {
    /// `threads` of None uses rayon's default (one per core)
    pub fn new(threads: Option<usize>, fail_fast: bool) -> Result<Self, ShrinkerError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("shrinker-{}", i));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| ShrinkerError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, fail_fast })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Decode inputs in parallel.
    ///
    /// Malformed inputs become warnings, unless fail-fast is set, in which
    /// case the first failure in input order aborts the load.
    pub fn load_classes<T: Symbol>(
        &self,
        inputs: &[ClassInput],
        origin: Origin,
    ) -> Result<(Vec<LoadedClass<T>>, Vec<ShrinkerWarning>), ShrinkerError> {
        info!("Loading {} {:?} classes in parallel...", inputs.len(), origin);

        let results: Vec<Result<LoadedClass<T>, ClassFileError>> = self.pool.install(|| {
            inputs
                .par_iter()
                .map(|input| LoadedClass::load(input, origin))
                .collect()
        });

        let mut loaded = Vec::with_capacity(results.len());
        let mut warnings = Vec::new();
        for (input, result) in inputs.iter().zip(results) {
            match result {
                Ok(class) => loaded.push(class),
                Err(source) if self.fail_fast => {
                    return Err(ShrinkerError::MalformedInput {
                        class: input.name.clone(),
                        source,
                    });
                }
                Err(e) => {
                    debug!("Parse error (continuing): {}: {}", input.name, e);
                    warnings.push(ShrinkerWarning::malformed(&input.name, &e));
                }
            }
        }

        Ok((loaded, warnings))
    }

    /// Analyze the given classes against a read-only graph
    pub fn analyze<T: Symbol>(&self, graph: &ShrinkerGraph<T>, classes: &[T]) -> Vec<ClassAnalysis<T>> {
        info!("Analyzing {} classes in parallel...", classes.len());
        let analyzer = ReferenceAnalyzer::new();
        self.pool.install(|| {
            classes
                .par_iter()
                .map(|class| analyzer.analyze_class(graph, class))
                .collect()
        })
    }
}
