mod json;
mod terminal;

pub use json::JsonReporter;
pub use terminal::TerminalReporter;

use crate::analysis::ShrinkerWarning;
use crate::graph::{CounterSet, Symbol};
use crate::shrinker::{RunStats, ShrinkerOutcome};
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

impl ReportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "terminal" => Some(ReportFormat::Terminal),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// What one counter set kept of one program class
#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub kept_members: Vec<String>,
    pub pruned_members: Vec<String>,
    pub retained_interfaces: Vec<String>,
}

/// Result of one counter set's walk, by class name
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub counter_set: CounterSet,
    pub program_classes: usize,
    pub kept: Vec<ClassSummary>,
    pub pruned: Vec<String>,
}

impl PassSummary {
    pub fn from_outcome<T: Symbol>(outcome: &ShrinkerOutcome<T>, counter_set: CounterSet) -> Self {
        let graph = &outcome.graph;
        let mut kept = Vec::new();
        let mut pruned = Vec::new();
        let mut program_classes = 0;

        for class in graph.program_classes() {
            program_classes += 1;
            if !class.reached.contains(counter_set) {
                pruned.push(class.name.clone());
                continue;
            }

            let mut kept_members = Vec::new();
            let mut pruned_members = Vec::new();
            for member in graph.members_of(class) {
                let name = format!("{}:{}", member.name, member.descriptor);
                if member.reached.contains(counter_set) {
                    kept_members.push(name);
                } else {
                    pruned_members.push(name);
                }
            }
            kept_members.sort();
            pruned_members.sort();

            kept.push(ClassSummary {
                name: class.name.clone(),
                kept_members,
                pruned_members,
                retained_interfaces: graph
                    .retained_interfaces(class, counter_set)
                    .map(|i| i.to_string())
                    .collect(),
            });
        }

        Self {
            counter_set,
            program_classes,
            kept,
            pruned,
        }
    }

    pub fn pruned_member_count(&self) -> usize {
        self.kept.iter().map(|c| c.pruned_members.len()).sum()
    }
}

/// Everything a reporter prints
#[derive(Debug, Clone, Serialize)]
pub struct ShrinkReport {
    pub passes: Vec<PassSummary>,
    pub warnings: Vec<ShrinkerWarning>,
    pub stats: RunStats,
}

impl ShrinkReport {
    /// One pass summary per counter set that was walked
    pub fn from_outcome<T: Symbol>(outcome: &ShrinkerOutcome<T>) -> Self {
        Self {
            passes: outcome
                .stats
                .walks
                .keys()
                .map(|set| PassSummary::from_outcome(outcome, *set))
                .collect(),
            warnings: outcome.warnings.clone(),
            stats: outcome.stats.clone(),
        }
    }
}

/// Reporter for shrink results
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
    show_members: bool,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self {
            format,
            output_path,
            show_members: true,
        }
    }

    pub fn with_members(mut self, show: bool) -> Self {
        self.show_members = show;
        self
    }

    pub fn report(&self, report: &ShrinkReport) -> Result<()> {
        match &self.format {
            ReportFormat::Terminal => TerminalReporter::new()
                .with_members(self.show_members)
                .report(report),
            ReportFormat::Json => JsonReporter::new(self.output_path.clone()).report(report),
        }
    }
}
