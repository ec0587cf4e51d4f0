use super::{analyze_and_walk, KeepRulesMap, RunStats, ShrinkerError, ShrinkerOptions, ShrinkerOutcome};
use crate::analysis::{ShrinkerLogger, TracingLogger};
use crate::graph::{library_fingerprint, ClassInput, GraphBuilder, Origin, ParallelGraphBuilder, Symbol};
use tracing::info;

static DEFAULT_LOGGER: TracingLogger = TracingLogger;

/// Builds the graph from scratch and walks it
pub struct FullRunShrinker<'a> {
    options: ShrinkerOptions,
    logger: &'a dyn ShrinkerLogger,
}

impl FullRunShrinker<'static> {
    pub fn new(options: ShrinkerOptions) -> Self {
        Self {
            options,
            logger: &DEFAULT_LOGGER,
        }
    }
}

impl<'a> FullRunShrinker<'a> {
    pub fn with_logger(options: ShrinkerOptions, logger: &'a dyn ShrinkerLogger) -> Self {
        Self { options, logger }
    }

    pub fn run<T: Symbol>(
        &self,
        program: &[ClassInput],
        library: &[ClassInput],
        rules: &KeepRulesMap<T>,
    ) -> Result<ShrinkerOutcome<T>, ShrinkerError> {
        info!(
            "Full run: {} program classes, {} library classes",
            program.len(),
            library.len()
        );

        let builder = ParallelGraphBuilder::new(self.options.threads, self.options.fail_fast)?;
        let (library_classes, mut warnings) = builder.load_classes::<T>(library, Origin::Library)?;
        let (program_classes, program_warnings) = builder.load_classes::<T>(program, Origin::Program)?;
        warnings.extend(program_warnings);

        let mut graph_builder = GraphBuilder::new();
        for class in library_classes {
            graph_builder.add_class(class);
        }
        for class in program_classes {
            graph_builder.add_class(class);
        }
        let (mut graph, insert_warnings) = graph_builder.build();
        warnings.extend(insert_warnings);
        graph.set_library_fingerprint(library_fingerprint(library));

        let to_analyze: Vec<T> = graph
            .program_classes()
            .map(|c| c.symbol.clone())
            .collect();

        Ok(analyze_and_walk(
            graph,
            &builder,
            &to_analyze,
            rules,
            warnings,
            self.logger,
            RunStats::default(),
        ))
    }
}
