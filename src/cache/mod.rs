//! Persistent graph store for incremental runs
//!
//! A finished graph is written as versioned JSON: class and member nodes with
//! their raw references, every dependency edge, and the per-class analysis
//! warnings. The store is keyed by a run identity; loading under a different
//! identity, or from a different format version, is refused.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::ShrinkerWarning;
use crate::graph::{ClassNode, Dependency, LoadedClass, MemberNode, ShrinkerGraph, Symbol};

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read graph store: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse graph store: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Graph store version mismatch (found {found}, expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("Graph store belongs to run '{stored}', not '{requested}'")]
    RunMismatch { stored: String, requested: String },
    #[error("Graph store is corrupted: {0}")]
    Corrupted(String),
}

/// Current store format version
const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredDependency<T> {
    from: T,
    to: T,
    dependency: Dependency<T>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredGraph<T> {
    version: u32,
    run_id: String,
    created_at: u64,
    library_fingerprint: u64,
    classes: Vec<ClassNode<T>>,
    members: Vec<MemberNode<T>>,
    dependencies: Vec<StoredDependency<T>>,
    warnings: Vec<(T, Vec<ShrinkerWarning>)>,
}

/// Store statistics
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub classes: usize,
    pub members: usize,
    pub dependencies: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} classes, {} members, {} dependencies stored",
            self.classes, self.members, self.dependencies
        )
    }
}

/// A graph persisted at a path on disk
#[derive(Debug, Clone)]
pub struct GraphStore {
    path: PathBuf,
}

impl GraphStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default store location inside a working directory
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(".jvmshrink-graph.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save<T: Symbol>(&self, graph: &ShrinkerGraph<T>, run_id: &str) -> Result<StoreStats, CacheError> {
        let mut classes = Vec::with_capacity(graph.class_count());
        let mut members = Vec::with_capacity(graph.member_count());
        for class in graph.classes() {
            classes.push(class.clone());
            members.extend(graph.members_of(class).cloned());
        }
        let dependencies: Vec<_> = graph
            .dependencies()
            .map(|(from, to, dependency)| StoredDependency {
                from: from.clone(),
                to: to.clone(),
                dependency: dependency.clone(),
            })
            .collect();
        let warnings = graph
            .analysis_warnings()
            .map(|(class, warnings)| (class.clone(), warnings.clone()))
            .collect();

        let stats = StoreStats {
            classes: classes.len(),
            members: members.len(),
            dependencies: dependencies.len(),
        };

        let stored = StoredGraph {
            version: STORE_VERSION,
            run_id: run_id.to_string(),
            created_at: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            library_fingerprint: graph.library_fingerprint(),
            classes,
            members,
            dependencies,
            warnings,
        };

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = fs::File::create(&self.path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, &stored)?;
        info!("Saved graph store to {}: {}", self.path.display(), stats);
        Ok(stats)
    }

    /// Load and validate a stored graph. Kept marks are not persisted.
    pub fn load<T: Symbol>(&self, run_id: &str) -> Result<ShrinkerGraph<T>, CacheError> {
        let file = fs::File::open(&self.path)?;
        let reader = BufReader::new(file);
        let stored: StoredGraph<T> = serde_json::from_reader(reader)?;

        if stored.version != STORE_VERSION {
            return Err(CacheError::VersionMismatch {
                found: stored.version,
                expected: STORE_VERSION,
            });
        }
        if stored.run_id != run_id {
            return Err(CacheError::RunMismatch {
                stored: stored.run_id,
                requested: run_id.to_string(),
            });
        }

        let mut pool: HashMap<T, MemberNode<T>> = stored
            .members
            .into_iter()
            .map(|m| (m.symbol.clone(), m))
            .collect();

        let mut graph = ShrinkerGraph::new();
        for class in stored.classes {
            let mut members = Vec::with_capacity(class.members.len());
            for symbol in &class.members {
                let member = pool.remove(symbol).ok_or_else(|| {
                    CacheError::Corrupted(format!("member {} of {} is missing", symbol, class.symbol))
                })?;
                if member.owner != class.symbol {
                    return Err(CacheError::Corrupted(format!(
                        "member {} is owned by {}, listed under {}",
                        symbol, member.owner, class.symbol
                    )));
                }
                members.push(member);
            }
            if graph.add_class(LoadedClass { class, members }) {
                return Err(CacheError::Corrupted("duplicate class entry".to_string()));
            }
        }
        if let Some(orphan) = pool.keys().next() {
            return Err(CacheError::Corrupted(format!("member {} has no owning class", orphan)));
        }

        for StoredDependency { from, to, dependency } in stored.dependencies {
            if !graph.contains(&from) || !graph.contains(&to) {
                return Err(CacheError::Corrupted(format!(
                    "edge {} -> {} names a missing node",
                    from, to
                )));
            }
            graph.add_dependency(&from, &to, dependency);
        }

        for (class, warnings) in stored.warnings {
            graph.set_analysis_warnings(&class, warnings);
        }
        graph.set_library_fingerprint(stored.library_fingerprint);

        debug!(
            "Loaded graph store: {} classes, {} dependencies",
            graph.class_count(),
            graph.dependency_count()
        );
        Ok(graph)
    }

    /// Delete the store if present
    pub fn clear(&self) -> Result<(), CacheError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
