// Analysis passes over the dependency graph

mod dispatch;
mod keep_rules;
mod reachability;
mod references;
mod warnings;

pub use dispatch::{CallSite, DispatchOutcome, DispatchResolver};
pub use keep_rules::{AnnotatedClassRules, ExplicitKeepRules, KeepRuleSet, KeepRules};
pub use reachability::{ReachabilityAnalyzer, WalkStats};
pub use references::{ClassAnalysis, ReferenceAnalyzer};
pub use warnings::{CollectingLogger, ShrinkerLogger, ShrinkerWarning, TracingLogger, WarningKind};
