use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::{AnnotatedClassRules, ExplicitKeepRules, KeepRuleSet};
use crate::graph::{CounterSet, Symbol};
use crate::shrinker::{KeepRulesMap, ShrinkerOptions};

/// Configuration for a shrinker run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program inputs: directories of class files, jars, or single class files
    pub inputs: Vec<PathBuf>,

    /// Library inputs, resolved against but never shrunk
    pub libraries: Vec<PathBuf>,

    /// Path patterns to skip during discovery
    pub exclude: Vec<String>,

    /// Entry points for the shrink pass
    pub keep: Vec<KeepEntry>,

    /// Annotation types whose program classes are kept
    pub keep_annotated: Vec<String>,

    /// Entry points for the trace-references pass; empty skips the pass
    pub trace_keep: Vec<KeepEntry>,

    /// Worker threads (default: one per core)
    pub threads: Option<usize>,

    /// Abort on the first malformed class instead of skipping it
    pub fail_fast: bool,

    /// Incremental run configuration
    pub incremental: IncrementalConfig,

    /// Report configuration
    pub report: ReportConfig,
}

/// One keep rule: a class, optionally with members given as `name:descriptor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepEntry {
    pub class: String,

    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default)]
    pub kind: KeepKind,
}

/// How a kept class is kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepKind {
    /// Class structure only
    #[default]
    Structure,
    /// Class structure plus its static initializer
    Initialized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncrementalConfig {
    /// Reuse the stored graph from the previous run
    pub enabled: bool,

    /// Store location (default: `.jvmshrink-graph.json` in the project root)
    pub cache_path: Option<PathBuf>,

    /// Identity of the run; a store saved under another identity is not reused
    pub run_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format: terminal, json
    pub format: String,

    /// List kept members of partially kept classes
    pub show_members: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: vec![],
            libraries: vec![],
            exclude: vec!["**/META-INF/**".to_string()],
            keep: vec![],
            keep_annotated: vec![],
            trace_keep: vec![],
            threads: None,
            fail_fast: false,
            incremental: IncrementalConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cache_path: None,
            run_id: "default".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: "terminal".to_string(),
            show_members: true,
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".jvmshrink.yml",
            ".jvmshrink.yaml",
            ".jvmshrink.toml",
            "jvmshrink.toml",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Check if a pattern matches for exclusion
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.exclude.iter().any(|pattern| glob_match(pattern, &path_str))
    }

    pub fn shrinker_options(&self) -> ShrinkerOptions {
        ShrinkerOptions {
            threads: self.threads,
            fail_fast: self.fail_fast,
        }
    }

    /// Keep rules per counter set. The shrink pass always runs; the
    /// trace-references pass only when it has entries.
    pub fn keep_rules<T: Symbol>(&self) -> KeepRulesMap<T> {
        let mut shrink = KeepRuleSet::new().with(explicit_rules(&self.keep));
        for annotation in &self.keep_annotated {
            shrink = shrink.with(AnnotatedClassRules::new(internal_name(annotation)));
        }

        let mut rules: KeepRulesMap<T> = KeepRulesMap::new();
        rules.insert(CounterSet::Shrink, Box::new(shrink));
        if !self.trace_keep.is_empty() {
            rules.insert(
                CounterSet::TraceReferences,
                Box::new(explicit_rules(&self.trace_keep)),
            );
        }
        rules
    }
}

fn explicit_rules(entries: &[KeepEntry]) -> ExplicitKeepRules {
    let mut rules = ExplicitKeepRules::new();
    for entry in entries {
        let class = internal_name(&entry.class);
        rules = match entry.kind {
            KeepKind::Structure => rules.keep_class(class.clone()),
            KeepKind::Initialized => rules.keep_initialized_class(class.clone()),
        };
        for member in &entry.members {
            rules = rules.keep_member(class.clone(), member);
        }
    }
    rules
}

/// `com.example.Main` → `com/example/Main`; internal names pass through
pub fn internal_name(name: &str) -> String {
    name.trim().replace('.', "/")
}

/// Simple glob matching for patterns like "*Test.class" or "**/generated/**"
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern.starts_with('*') && !pattern.contains('/') {
        // "*Test.class" matches "FooTest.class"
        return text.ends_with(&pattern[1..]);
    }

    if pattern.ends_with('*') && !pattern.contains('/') {
        return text.starts_with(&pattern[..pattern.len() - 1]);
    }

    if pattern.contains("**") {
        // "**/dir/**" matches a whole directory name anywhere in the path
        if pattern.starts_with("**/") && pattern.ends_with("/**") {
            let dir_name = pattern
                .trim_start_matches("**/")
                .trim_end_matches("/**")
                .trim_matches('/');
            return text.contains(&format!("/{}/", dir_name));
        }

        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');

            if prefix.is_empty() && suffix.is_empty() {
                return true;
            }
            if prefix.is_empty() {
                return text.ends_with(suffix) || text.contains(&format!("/{}", suffix));
            }
            if suffix.is_empty() {
                return text.starts_with(prefix) || text.contains(&format!("{}/", prefix));
            }
            return (text.starts_with(prefix) || text.contains(&format!("/{}/", prefix)))
                && (text.ends_with(suffix) || text.contains(&format!("/{}", suffix)));
        }
    }

    text == pattern
}
