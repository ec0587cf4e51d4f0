//! jvmshrink - Reachability analysis for shrinking JVM programs
//!
//! This library decides which classes, methods and fields of a compiled JVM
//! program are needed, starting from a set of keep rules, so that everything
//! else can be removed.
//!
//! # Architecture
//!
//! The pipeline consists of:
//! 1. **Class Loading** - Decode class files into class and member nodes with raw references
//! 2. **Reference Analysis** - Resolve each class's references into dependency edges, in parallel
//! 3. **Dispatch Resolution** - Add conditional edges for virtual calls and overrides
//! 4. **Reachability** - Walk the graph from the keep rules, once per counter set
//! 5. **Persistence** - Store the graph so later runs re-analyze only what changed
//! 6. **Reporting** - Output kept and pruned classes in various formats

pub mod analysis;
pub mod cache;
pub mod classfile;
pub mod config;
pub mod discovery;
pub mod graph;
pub mod report;
pub mod shrinker;

pub use analysis::{KeepRules, ShrinkerLogger, ShrinkerWarning, WarningKind};
pub use cache::GraphStore;
pub use classfile::{ClassFile, ClassFileError};
pub use config::Config;
pub use discovery::FileFinder;
pub use graph::{ClassInput, CounterSet, DependencyKind, ShrinkerGraph, Symbol, SymbolKey};
pub use report::{ReportFormat, Reporter};
pub use shrinker::{FullRunShrinker, IncrementalShrinker, ShrinkerError, ShrinkerOptions, ShrinkerOutcome};
