// Non-fatal diagnostics and the logger that receives them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Bytes that could not be decoded as a class
    MalformedInput,
    /// A reference to a class or member that is neither in the program nor the library
    UnresolvedReference,
    /// A keep rule naming a symbol that is not in the graph
    UnresolvedRoot,
    /// The same class defined twice in one input set
    DuplicateClass,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::MalformedInput => "malformed-input",
            WarningKind::UnresolvedReference => "unresolved-reference",
            WarningKind::UnresolvedRoot => "unresolved-root",
            WarningKind::DuplicateClass => "duplicate-class",
        }
    }
}

/// A problem the shrinker recovered from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShrinkerWarning {
    pub kind: WarningKind,
    /// The symbol the warning is about
    pub symbol: String,
    /// The node whose reference triggered the warning, if any
    pub origin: Option<String>,
    pub message: String,
}

impl ShrinkerWarning {
    pub fn malformed(class: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            kind: WarningKind::MalformedInput,
            symbol: class.into(),
            origin: None,
            message: format!("skipping malformed class: {}", error),
        }
    }

    pub fn unresolved(symbol: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::UnresolvedReference,
            symbol: symbol.into(),
            origin: Some(origin.into()),
            message: "missing class or member".to_string(),
        }
    }

    pub fn unresolved_root(symbol: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::UnresolvedRoot,
            symbol: symbol.into(),
            origin: None,
            message: "keep rule names a symbol that is not in the graph".to_string(),
        }
    }

    pub fn duplicate_class(class: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DuplicateClass,
            symbol: class.into(),
            origin: None,
            message: "class defined more than once; keeping the first definition".to_string(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for ShrinkerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(
                f,
                "[{}] {}: {} (referenced from {})",
                self.kind.as_str(),
                self.symbol,
                self.message,
                origin
            ),
            None => write!(f, "[{}] {}: {}", self.kind.as_str(), self.symbol, self.message),
        }
    }
}

/// Host-provided sink for diagnostics. Called from the coordinating thread only.
pub trait ShrinkerLogger: Send + Sync {
    fn warn(&self, warning: &ShrinkerWarning);

    fn info(&self, _message: &str) {}
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ShrinkerLogger for TracingLogger {
    fn warn(&self, warning: &ShrinkerWarning) {
        warn!("{}", warning);
    }

    fn info(&self, message: &str) {
        info!("{}", message);
    }
}

/// Records diagnostics in memory, for tests and reports
#[derive(Debug, Default)]
pub struct CollectingLogger {
    warnings: Mutex<Vec<ShrinkerWarning>>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<ShrinkerWarning> {
        self.warnings
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    pub fn warnings_count(&self) -> usize {
        self.warnings.lock().map(|w| w.len()).unwrap_or(0)
    }
}

impl ShrinkerLogger for CollectingLogger {
    fn warn(&self, warning: &ShrinkerWarning) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(warning.clone());
        }
    }
}
