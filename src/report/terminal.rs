use super::{PassSummary, ShrinkReport};
use crate::analysis::{ShrinkerWarning, WarningKind};
use colored::Colorize;
use miette::Result;
use std::collections::BTreeMap;

/// Terminal reporter with colored output
pub struct TerminalReporter {
    /// List the pruned members of partially kept classes
    show_members: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self { show_members: true }
    }

    pub fn with_members(mut self, show: bool) -> Self {
        self.show_members = show;
        self
    }

    pub fn report(&self, report: &ShrinkReport) -> Result<()> {
        for pass in &report.passes {
            self.print_pass(pass);
        }
        self.print_warnings(&report.warnings);
        self.print_summary(report);
        Ok(())
    }

    fn print_pass(&self, pass: &PassSummary) {
        println!();
        println!(
            "{}",
            format!(
                "[{}] kept {} of {} program classes",
                pass.counter_set.display_name(),
                pass.kept.len(),
                pass.program_classes
            )
            .bold()
        );

        if pass.pruned.is_empty() && pass.pruned_member_count() == 0 {
            println!("  {}", "Nothing to shrink".green());
            return;
        }

        for class in &pass.pruned {
            println!("  {} {}", "-".red().bold(), class.red());
        }

        if !self.show_members {
            return;
        }
        for class in pass.kept.iter().filter(|c| !c.pruned_members.is_empty()) {
            println!(
                "  {} {} {}",
                "~".yellow().bold(),
                class.name.cyan(),
                format!("({} of {} members kept)", class.kept_members.len(),
                    class.kept_members.len() + class.pruned_members.len())
                .dimmed()
            );
            for member in &class.pruned_members {
                println!("      {} {}", "-".dimmed(), member.dimmed());
            }
        }
    }

    fn print_warnings(&self, warnings: &[ShrinkerWarning]) {
        if warnings.is_empty() {
            return;
        }

        let mut by_kind: BTreeMap<WarningKind, Vec<&ShrinkerWarning>> = BTreeMap::new();
        for warning in warnings {
            by_kind.entry(warning.kind).or_default().push(warning);
        }

        println!();
        println!(
            "{}",
            format!("{} warnings:", warnings.len()).yellow().bold()
        );
        for (kind, items) in by_kind {
            println!("  {}", kind.as_str().yellow());
            for warning in items {
                let origin = warning
                    .origin
                    .as_deref()
                    .map(|o| format!(" (from {})", o))
                    .unwrap_or_default();
                println!(
                    "    {} {}{}",
                    warning.symbol.white(),
                    warning.message.dimmed(),
                    origin.dimmed()
                );
            }
        }
    }

    fn print_summary(&self, report: &ShrinkReport) {
        let stats = &report.stats;
        println!("{}", "─".repeat(60).dimmed());
        println!(
            "Summary: {} program classes, {} library classes, {} dependencies{}",
            stats.program_classes,
            stats.library_classes,
            stats.dependencies,
            if stats.incremental {
                format!(", {} re-analyzed", stats.analyzed_classes)
            } else {
                String::new()
            }
        );
        for (set, walk) in &stats.walks {
            println!(
                "  {}: {} roots, {} nodes kept, {} edges visited",
                set.display_name(),
                walk.roots,
                walk.kept_nodes,
                walk.edges_visited
            );
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}
