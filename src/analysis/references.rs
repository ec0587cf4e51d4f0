// Member reference analysis
//
// Turns the raw references of one class (and its members) into dependency
// edges. Runs against a read-only graph so classes can be analyzed in
// parallel; results are applied by the coordinator.

use std::collections::HashSet;

use tracing::debug;

use super::ShrinkerWarning;
use crate::classfile::descriptor::{descriptor_classes, element_class};
use crate::classfile::{
    Annotation, CodeReference, ElementValue, InvokeKind, LoadableConstant, MemberRef, MethodHandle,
};
use crate::graph::{
    Dependency, DependencyKind, MemberKind, RawReference, Resolution, ShrinkerGraph, Symbol,
};

/// Edges and warnings produced for one program class
#[derive(Debug, Clone)]
pub struct ClassAnalysis<T> {
    pub class: T,
    pub dependencies: Vec<(T, T, Dependency<T>)>,
    pub warnings: Vec<ShrinkerWarning>,
}

impl<T: Symbol> ClassAnalysis<T> {
    /// Add the edges to the graph and record the warnings against the class
    pub fn apply(self, graph: &mut ShrinkerGraph<T>) -> usize {
        let mut added = 0;
        for (from, to, dependency) in self.dependencies {
            if graph.add_dependency(&from, &to, dependency) {
                added += 1;
            }
        }
        graph.set_analysis_warnings(&self.class, self.warnings);
        added
    }
}

/// Resolves the symbolic references of a class against the graph
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceAnalyzer;

impl ReferenceAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_class<T: Symbol>(&self, graph: &ShrinkerGraph<T>, class: &T) -> ClassAnalysis<T> {
        let mut collector = Collector::new(graph);

        if let Some(node) = graph.class(class) {
            let is_interface = node.is_interface();
            for reference in &node.references {
                match reference {
                    RawReference::Superclass(name) => {
                        collector.require_class(class, name, DependencyKind::Superclass);
                    }
                    RawReference::Interface(name) if is_interface => {
                        collector.require_class(class, name, DependencyKind::Superinterface);
                    }
                    // A class keeps an interface only through dispatch; here we only check it exists
                    RawReference::Interface(name) => {
                        if let Resolution::Unknown(missing) = graph.resolve_class(name) {
                            collector.unresolved(missing, class);
                        }
                    }
                    other => collector.raw_reference(class, other),
                }
            }

            for member in graph.members_of(node) {
                collector.edge(&member.symbol, class.clone(), DependencyKind::RequiresClassStructure);
                for reference in &member.references {
                    collector.raw_reference(&member.symbol, reference);
                }
            }
        }

        ClassAnalysis {
            class: class.clone(),
            dependencies: collector.dependencies,
            warnings: collector.warnings,
        }
    }
}

struct Collector<'g, T: Symbol> {
    graph: &'g ShrinkerGraph<T>,
    dependencies: Vec<(T, T, Dependency<T>)>,
    warnings: Vec<ShrinkerWarning>,
    reported: HashSet<(String, String)>,
}

impl<'g, T: Symbol> Collector<'g, T> {
    fn new(graph: &'g ShrinkerGraph<T>) -> Self {
        Self {
            graph,
            dependencies: Vec::new(),
            warnings: Vec::new(),
            reported: HashSet::new(),
        }
    }

    fn edge(&mut self, from: &T, to: T, kind: DependencyKind) {
        self.dependencies
            .push((from.clone(), to, Dependency::new(kind)));
    }

    fn unresolved(&mut self, missing: String, from: &T) {
        let origin = from.to_string();
        if self.reported.insert((missing.clone(), origin.clone())) {
            self.warnings.push(ShrinkerWarning::unresolved(missing, origin));
        }
    }

    fn resolved(&mut self, from: &T, resolution: Resolution<T>, kind: DependencyKind) {
        match resolution {
            Resolution::Program(target) => self.edge(from, target, kind),
            Resolution::Library => {}
            Resolution::Unknown(missing) => self.unresolved(missing, from),
        }
    }

    fn require_class(&mut self, from: &T, name: &str, kind: DependencyKind) {
        let resolution = self.graph.resolve_class(name);
        self.resolved(from, resolution, kind);
    }

    /// Structural edges to every class a descriptor or signature names
    fn require_types(&mut self, from: &T, descriptor: &str) {
        match descriptor_classes(descriptor) {
            Ok(classes) => {
                for class in classes {
                    self.require_class(from, &class, DependencyKind::RequiresClassStructure);
                }
            }
            Err(e) => debug!("Ignoring unparseable descriptor in {}: {}", from, e),
        }
    }

    fn require_method(&mut self, from: &T, target: &MemberRef, kind: DependencyKind) {
        let resolution = self
            .graph
            .resolve_method(&target.owner, &target.name, &target.descriptor);
        self.resolved(from, resolution, kind);
    }

    fn require_field(&mut self, from: &T, target: &MemberRef) {
        let resolution = self
            .graph
            .resolve_field(&target.owner, &target.name, &target.descriptor);
        self.resolved(from, resolution, DependencyKind::RequiresMember);
    }

    fn raw_reference(&mut self, from: &T, reference: &RawReference) {
        match reference {
            RawReference::Superclass(name) | RawReference::Interface(name) | RawReference::TypeUse(name) => {
                self.require_class(from, name, DependencyKind::RequiresClassStructure);
            }
            RawReference::Annotation(annotation) => self.annotation(from, annotation),
            RawReference::AnnotationDefault(value) => self.element_value(from, value),
            RawReference::Code(code) => self.code(from, code),
        }
    }

    fn annotation(&mut self, from: &T, annotation: &Annotation) {
        let Some(type_name) = descriptor_class(&annotation.type_descriptor) else {
            return;
        };
        let graph = self.graph;
        let resolution = graph.resolve_class(&type_name);
        let annotation_class = match &resolution {
            Resolution::Program(symbol) => Some(symbol.clone()),
            _ => None,
        };
        self.resolved(from, resolution, DependencyKind::Annotation);

        for (name, value) in &annotation.elements {
            if let Some(node) = annotation_class.as_ref().and_then(|s| graph.class(s)) {
                let elements: Vec<T> = graph
                    .members_of(node)
                    .filter(|m| m.kind == MemberKind::Method && &m.name == name)
                    .map(|m| m.symbol.clone())
                    .collect();
                for element in elements {
                    self.edge(from, element, DependencyKind::Annotation);
                }
            }
            self.element_value(from, value);
        }
    }

    fn element_value(&mut self, from: &T, value: &ElementValue) {
        match value {
            ElementValue::Const(_) => {}
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => {
                let Some(type_name) = descriptor_class(type_descriptor) else {
                    return;
                };
                self.require_class(from, &type_name, DependencyKind::Annotation);
                let target = MemberRef {
                    owner: type_name,
                    name: const_name.clone(),
                    descriptor: type_descriptor.clone(),
                };
                let resolution = self
                    .graph
                    .resolve_field(&target.owner, &target.name, &target.descriptor);
                self.resolved(from, resolution, DependencyKind::Annotation);
            }
            ElementValue::Class(descriptor) => self.require_types(from, descriptor),
            ElementValue::Annotation(nested) => self.annotation(from, nested),
            ElementValue::Array(values) => {
                for value in values {
                    self.element_value(from, value);
                }
            }
        }
    }

    fn code(&mut self, from: &T, code: &CodeReference) {
        match code {
            CodeReference::Field { op, target } => {
                let owner_kind = if op.is_static() {
                    DependencyKind::RequiresClass
                } else {
                    DependencyKind::RequiresClassStructure
                };
                self.require_class(from, &target.owner, owner_kind);
                self.require_field(from, target);
            }
            CodeReference::Invoke { kind, target } => {
                self.require_types(from, &target.descriptor);
                match kind {
                    InvokeKind::Static => {
                        self.require_class(from, &target.owner, DependencyKind::RequiresClass);
                        self.require_method(from, target, DependencyKind::RequiresMember);
                    }
                    InvokeKind::Special => {
                        let owner_kind = if target.name == "<init>" {
                            DependencyKind::RequiresClass
                        } else {
                            DependencyKind::RequiresClassStructure
                        };
                        self.require_class(from, &target.owner, owner_kind);
                        self.require_method(from, target, DependencyKind::RequiresMember);
                    }
                    // Member edges for dispatched calls come from the dispatch resolver
                    InvokeKind::Virtual | InvokeKind::Interface => {
                        self.require_class(from, &target.owner, DependencyKind::RequiresClassStructure);
                    }
                }
            }
            CodeReference::InvokeDynamic {
                descriptor,
                bootstrap,
                ..
            } => {
                self.require_types(from, descriptor);
                self.method_handle(from, &bootstrap.method);
                for argument in &bootstrap.arguments {
                    self.loadable(from, argument);
                }
            }
            CodeReference::New(class) => {
                self.require_class(from, class, DependencyKind::RequiresClass);
            }
            CodeReference::NewArray(class)
            | CodeReference::TypeCheck { class, .. }
            | CodeReference::CatchType(class) => {
                self.require_class(from, class, DependencyKind::RequiresClassStructure);
            }
            CodeReference::Constant(constant) => self.loadable(from, constant),
        }
    }

    fn loadable(&mut self, from: &T, constant: &LoadableConstant) {
        match constant {
            LoadableConstant::Class(name) => {
                self.require_class(from, name, DependencyKind::RequiresClassStructure);
            }
            LoadableConstant::MethodHandle(handle) => self.method_handle(from, handle),
            LoadableConstant::MethodType(descriptor) => self.require_types(from, descriptor),
        }
    }

    fn method_handle(&mut self, from: &T, handle: &MethodHandle) {
        let owner_kind = if handle.is_static() || handle.target.name == "<init>" {
            DependencyKind::RequiresClass
        } else {
            DependencyKind::RequiresClassStructure
        };
        self.require_class(from, &handle.target.owner, owner_kind);
        if handle.is_field() {
            self.require_field(from, &handle.target);
        } else {
            self.require_method(from, &handle.target, DependencyKind::RequiresMember);
        }
    }
}

/// Class named by a field descriptor such as `Ltest/Foo;` or `[Ltest/Foo;`
fn descriptor_class(descriptor: &str) -> Option<String> {
    let element = descriptor.trim_start_matches('[');
    let name = element.strip_prefix('L')?.strip_suffix(';')?;
    element_class(name)
}
