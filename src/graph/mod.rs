// Dependency graph of classes and members

mod builder;
mod dependency;
mod hierarchy;
mod node;
mod parallel_builder;
mod symbol;

pub use builder::{content_hash, library_fingerprint, ClassInput, GraphBuilder, LoadedClass};
pub use dependency::{Dependency, DependencyKind, EdgeOrigin};
pub use hierarchy::{Ancestry, Resolution};
pub use node::{ClassNode, CounterSet, MemberKind, MemberNode, Origin, RawReference, Reached};
pub use parallel_builder::ParallelGraphBuilder;
pub use symbol::{Symbol, SymbolKey};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::analysis::ShrinkerWarning;

/// The shrinker's dependency graph.
///
/// Every class and member is a node; edges are [`Dependency`] records saying
/// why the source keeps the target. Node identity is the host-supplied
/// [`Symbol`]. Classes are held in symbol order so that every traversal of
/// the graph is deterministic regardless of how it was built.
#[derive(Debug)]
pub struct ShrinkerGraph<T: Symbol> {
    /// Nodes are symbols, edges are dependencies.
    /// Stable indices survive removal of changed classes on incremental runs.
    inner: StableDiGraph<T, Dependency<T>>,

    /// Map from symbol to node index
    node_map: HashMap<T, NodeIndex>,

    classes: BTreeMap<T, ClassNode<T>>,

    members: HashMap<T, MemberNode<T>>,

    /// Map from a supertype (known or not) to the classes naming it directly
    subtypes: HashMap<T, BTreeSet<T>>,

    /// Warnings raised while analyzing each program class, replayed on incremental runs
    analysis_warnings: BTreeMap<T, Vec<ShrinkerWarning>>,

    /// Number of library classes currently in the graph
    library_classes: usize,

    library_fingerprint: u64,
}

impl<T: Symbol> Default for ShrinkerGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Symbol> ShrinkerGraph<T> {
    pub fn new() -> Self {
        Self {
            inner: StableDiGraph::new(),
            node_map: HashMap::new(),
            classes: BTreeMap::new(),
            members: HashMap::new(),
            subtypes: HashMap::new(),
            analysis_warnings: BTreeMap::new(),
            library_classes: 0,
            library_fingerprint: 0,
        }
    }

    /// Insert a loaded class and its members. An existing class with the same
    /// symbol is replaced, dropping every edge into or out of it.
    /// Returns true if a class was replaced.
    pub fn add_class(&mut self, loaded: LoadedClass<T>) -> bool {
        let LoadedClass { class, members } = loaded;
        let replaced = self.remove_class(&class.symbol).is_some();
        if replaced {
            debug!(class = %class.symbol, "Replacing class node");
        }

        let symbol = class.symbol.clone();
        for supertype in class.supertypes() {
            self.subtypes
                .entry(supertype.clone())
                .or_default()
                .insert(symbol.clone());
        }

        self.add_node(symbol.clone());
        for member in members {
            self.add_node(member.symbol.clone());
            self.members.insert(member.symbol.clone(), member);
        }
        if !class.is_program() {
            self.library_classes += 1;
        }
        self.classes.insert(symbol, class);
        replaced
    }

    /// Remove a class, its members and all incident edges
    pub fn remove_class(&mut self, symbol: &T) -> Option<ClassNode<T>> {
        let class = self.classes.remove(symbol)?;
        if !class.is_program() {
            self.library_classes -= 1;
        }
        for supertype in class.supertypes() {
            if let Some(set) = self.subtypes.get_mut(supertype) {
                set.remove(symbol);
            }
        }
        for member in &class.members {
            self.members.remove(member);
            self.remove_node(member);
        }
        self.remove_node(symbol);
        self.analysis_warnings.remove(symbol);
        Some(class)
    }

    fn add_node(&mut self, symbol: T) {
        if !self.node_map.contains_key(&symbol) {
            let idx = self.inner.add_node(symbol.clone());
            self.node_map.insert(symbol, idx);
        }
    }

    fn remove_node(&mut self, symbol: &T) {
        if let Some(idx) = self.node_map.remove(symbol) {
            self.inner.remove_node(idx);
        }
    }

    /// Whether any library class was supplied
    pub fn has_library(&self) -> bool {
        self.library_classes > 0
    }

    pub fn contains(&self, symbol: &T) -> bool {
        self.node_map.contains_key(symbol)
    }

    pub fn class(&self, symbol: &T) -> Option<&ClassNode<T>> {
        self.classes.get(symbol)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassNode<T>> {
        self.classes.get(&T::for_class(name))
    }

    pub fn member(&self, symbol: &T) -> Option<&MemberNode<T>> {
        self.members.get(symbol)
    }

    /// Member declared directly by `class` with the given name and descriptor
    pub fn find_member(&self, class: &ClassNode<T>, name: &str, descriptor: &str) -> Option<&MemberNode<T>> {
        self.members.get(&T::for_member(&class.name, name, descriptor))
    }

    /// All classes in symbol order
    pub fn classes(&self) -> impl Iterator<Item = &ClassNode<T>> {
        self.classes.values()
    }

    pub fn program_classes(&self) -> impl Iterator<Item = &ClassNode<T>> {
        self.classes.values().filter(|c| c.is_program())
    }

    pub fn members_of<'a>(&'a self, class: &'a ClassNode<T>) -> impl Iterator<Item = &'a MemberNode<T>> + 'a {
        class.members.iter().filter_map(move |m| self.members.get(m))
    }

    /// Whether a class or any of its members has a raw reference naming one of `names`
    pub fn class_mentions_any(&self, class: &ClassNode<T>, names: &HashSet<String>) -> bool {
        let mentions = |refs: &[RawReference]| {
            refs.iter()
                .any(|r| r.class_names().iter().any(|n| names.contains(n)))
        };
        mentions(&class.references) || self.members_of(class).any(|m| mentions(&m.references))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Classes that name `symbol` as their superclass or a direct interface
    pub fn direct_subtypes(&self, symbol: &T) -> impl Iterator<Item = &T> {
        self.subtypes.get(symbol).into_iter().flatten()
    }

    /// The class's `<clinit>`, if it declares one
    pub fn static_initializer(&self, class: &T) -> Option<T> {
        let node = self.classes.get(class)?;
        self.find_member(node, "<clinit>", "()V")
            .map(|m| m.symbol.clone())
    }

    /// Add an edge. Edges whose endpoints are not in the graph are rejected,
    /// and an identical existing edge is not duplicated.
    pub fn add_dependency(&mut self, from: &T, to: &T, dependency: Dependency<T>) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.node_map.get(from), self.node_map.get(to)) else {
            return false;
        };
        if from_idx == to_idx && dependency.condition.is_none() {
            return false;
        }
        let exists = self
            .inner
            .edges_directed(from_idx, Direction::Outgoing)
            .any(|e| e.target() == to_idx && e.weight() == &dependency);
        if exists {
            return false;
        }
        self.inner.add_edge(from_idx, to_idx, dependency);
        true
    }

    /// Outgoing edges of a node, in insertion order
    pub fn dependencies_from(&self, symbol: &T) -> Vec<(&T, &Dependency<T>)> {
        let Some(&idx) = self.node_map.get(symbol) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), &self.inner[e.target()], e.weight()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges.into_iter().map(|(_, target, dep)| (target, dep)).collect()
    }

    /// Incoming edges of a node
    pub fn dependencies_to(&self, symbol: &T) -> Vec<(&T, &Dependency<T>)> {
        let Some(&idx) = self.node_map.get(symbol) else {
            return Vec::new();
        };
        self.inner
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (&self.inner[e.source()], e.weight()))
            .collect()
    }

    /// Every edge as (source, target, dependency)
    pub fn dependencies(&self) -> impl Iterator<Item = (&T, &T, &Dependency<T>)> {
        self.inner.edge_indices().filter_map(move |e| {
            let (source, target) = self.inner.edge_endpoints(e)?;
            Some((&self.inner[source], &self.inner[target], &self.inner[e]))
        })
    }

    pub fn dependency_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Drop the analyzer-produced edges leaving a node, before it is re-analyzed
    pub fn clear_reference_dependencies(&mut self, symbol: &T) {
        let Some(&idx) = self.node_map.get(symbol) else {
            return;
        };
        let stale: Vec<_> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().origin == EdgeOrigin::Reference)
            .map(|e| e.id())
            .collect();
        for edge in stale {
            self.inner.remove_edge(edge);
        }
    }

    /// Drop every edge produced by dispatch resolution
    pub fn clear_dispatch_dependencies(&mut self) {
        self.inner
            .retain_edges(|g, e| g[e].origin != EdgeOrigin::Dispatch);
    }

    pub fn is_kept(&self, symbol: &T, set: CounterSet) -> bool {
        if let Some(class) = self.classes.get(symbol) {
            return class.reached.contains(set);
        }
        self.members
            .get(symbol)
            .map(|m| m.reached.contains(set))
            .unwrap_or(false)
    }

    /// Mark a node kept. Returns false if the node was already kept or is unknown.
    pub fn mark_kept(&mut self, symbol: &T, set: CounterSet) -> bool {
        let reached = if let Some(class) = self.classes.get_mut(symbol) {
            &mut class.reached
        } else if let Some(member) = self.members.get_mut(symbol) {
            &mut member.reached
        } else {
            return false;
        };
        if reached.contains(set) {
            return false;
        }
        reached.insert(set);
        true
    }

    /// Clear all marks for one counter set
    pub fn reset_marks(&mut self, set: CounterSet) {
        for class in self.classes.values_mut() {
            class.reached.remove(set);
        }
        for member in self.members.values_mut() {
            member.reached.remove(set);
        }
    }

    pub fn kept_classes(&self, set: CounterSet) -> impl Iterator<Item = &ClassNode<T>> {
        self.program_classes().filter(move |c| c.reached.contains(set))
    }

    /// Kept members of a class, in declaration order
    pub fn kept_members<'a>(&'a self, class: &'a ClassNode<T>, set: CounterSet) -> impl Iterator<Item = &'a MemberNode<T>> + 'a {
        self.members_of(class).filter(move |m| m.reached.contains(set))
    }

    /// Interfaces of a kept class that remain in its `implements` list:
    /// kept program interfaces, plus any library or unknown interface
    pub fn retained_interfaces<'a>(&'a self, class: &'a ClassNode<T>, set: CounterSet) -> impl Iterator<Item = &'a T> + 'a {
        class.interfaces.iter().filter(move |iface| match self.classes.get(*iface) {
            Some(node) if node.is_program() => node.reached.contains(set),
            _ => true,
        })
    }

    pub fn set_analysis_warnings(&mut self, class: &T, warnings: Vec<ShrinkerWarning>) {
        if warnings.is_empty() {
            self.analysis_warnings.remove(class);
        } else {
            self.analysis_warnings.insert(class.clone(), warnings);
        }
    }

    /// Stored analysis warnings, in class order
    pub fn analysis_warnings(&self) -> impl Iterator<Item = (&T, &Vec<ShrinkerWarning>)> {
        self.analysis_warnings.iter()
    }

    pub fn library_fingerprint(&self) -> u64 {
        self.library_fingerprint
    }

    pub fn set_library_fingerprint(&mut self, fingerprint: u64) {
        self.library_fingerprint = fingerprint;
    }

    pub fn inner(&self) -> &StableDiGraph<T, Dependency<T>> {
        &self.inner
    }
}
