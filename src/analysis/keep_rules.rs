use crate::graph::{DependencyKind, ShrinkerGraph, Symbol};
use std::collections::HashMap;
use tracing::{debug, info};

/// Source of walk roots: the symbols to keep and the dependency kind they are kept with
pub trait KeepRules<T: Symbol>: Send + Sync {
    fn symbols_to_keep(&self, graph: &ShrinkerGraph<T>) -> HashMap<T, DependencyKind>;
}

impl<T, F> KeepRules<T> for F
where
    T: Symbol,
    F: Fn(&ShrinkerGraph<T>) -> HashMap<T, DependencyKind> + Send + Sync,
{
    fn symbols_to_keep(&self, graph: &ShrinkerGraph<T>) -> HashMap<T, DependencyKind> {
        self(graph)
    }
}

/// Insert a root, letting REQUIRES_CLASS win over weaker kinds for the same symbol
fn insert_root<T: Symbol>(roots: &mut HashMap<T, DependencyKind>, symbol: T, kind: DependencyKind) {
    roots
        .entry(symbol)
        .and_modify(|existing| {
            if kind == DependencyKind::RequiresClass {
                *existing = kind;
            }
        })
        .or_insert(kind);
}

/// Named classes and members, e.g. `test/Main` with `main:([Ljava/lang/String;)V`
#[derive(Debug, Clone, Default)]
pub struct ExplicitKeepRules {
    classes: Vec<(String, DependencyKind)>,
    members: Vec<(String, String, String)>,
}

impl ExplicitKeepRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a class's structure
    pub fn keep_class(mut self, class: impl Into<String>) -> Self {
        self.classes
            .push((class.into(), DependencyKind::RequiresClassStructure));
        self
    }

    /// Keep a class and run its static initializer
    pub fn keep_initialized_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push((class.into(), DependencyKind::RequiresClass));
        self
    }

    /// Keep a member given as `name:descriptor`. Malformed specs are ignored.
    pub fn keep_member(mut self, class: impl Into<String>, member: &str) -> Self {
        match member.split_once(':') {
            Some((name, descriptor)) if !name.is_empty() && !descriptor.is_empty() => {
                self.members
                    .push((class.into(), name.to_string(), descriptor.to_string()));
            }
            _ => debug!("Ignoring malformed member keep spec: {}", member),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.members.is_empty()
    }
}

impl<T: Symbol> KeepRules<T> for ExplicitKeepRules {
    fn symbols_to_keep(&self, _graph: &ShrinkerGraph<T>) -> HashMap<T, DependencyKind> {
        let mut roots = HashMap::new();
        for (class, kind) in &self.classes {
            insert_root(&mut roots, T::for_class(class), *kind);
        }
        for (class, name, descriptor) in &self.members {
            insert_root(
                &mut roots,
                T::for_member(class, name, descriptor),
                DependencyKind::RequiresMember,
            );
        }
        roots
    }
}

/// Keep every program class carrying a given annotation
#[derive(Debug, Clone)]
pub struct AnnotatedClassRules {
    annotation: String,
    kind: DependencyKind,
}

impl AnnotatedClassRules {
    pub fn new(annotation: impl Into<String>) -> Self {
        Self {
            annotation: annotation.into(),
            kind: DependencyKind::RequiresClassStructure,
        }
    }

    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }
}

impl<T: Symbol> KeepRules<T> for AnnotatedClassRules {
    fn symbols_to_keep(&self, graph: &ShrinkerGraph<T>) -> HashMap<T, DependencyKind> {
        let annotation = T::for_class(&self.annotation);
        let mut roots = HashMap::new();
        for class in graph.program_classes() {
            if class.annotations.contains(&annotation) {
                debug!("Annotated keep root: {} (@{})", class.name, self.annotation);
                insert_root(&mut roots, class.symbol.clone(), self.kind);
            }
        }
        roots
    }
}

/// Union of several rule sources
pub struct KeepRuleSet<T: Symbol> {
    rules: Vec<Box<dyn KeepRules<T>>>,
}

impl<T: Symbol> Default for KeepRuleSet<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T: Symbol> KeepRuleSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rules: impl KeepRules<T> + 'static) -> Self {
        self.rules.push(Box::new(rules));
        self
    }

    pub fn push(&mut self, rules: Box<dyn KeepRules<T>>) {
        self.rules.push(rules);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T: Symbol> KeepRules<T> for KeepRuleSet<T> {
    fn symbols_to_keep(&self, graph: &ShrinkerGraph<T>) -> HashMap<T, DependencyKind> {
        let mut roots = HashMap::new();
        for rules in &self.rules {
            for (symbol, kind) in rules.symbols_to_keep(graph) {
                insert_root(&mut roots, symbol, kind);
            }
        }
        info!("Resolved {} keep roots", roots.len());
        roots
    }
}
