// Class and member nodes

use serde::{Deserialize, Serialize};

use super::Symbol;
use crate::classfile::descriptor::{descriptor_classes, element_class};
use crate::classfile::{
    access, Annotation, CodeReference, ElementValue, InvokeKind, LoadableConstant, MemberRef,
};

/// Where a class came from. Library classes are never shrunk and are only
/// consulted for hierarchy lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    Program,
    Library,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Field,
    Method,
}

/// Independent reachability analyses sharing one graph
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CounterSet {
    /// Main shrinking pass
    Shrink,
    /// Trace-references pass, used to audit which library APIs the program touches
    TraceReferences,
}

impl CounterSet {
    pub const ALL: [CounterSet; 2] = [CounterSet::Shrink, CounterSet::TraceReferences];

    fn bit(self) -> u8 {
        match self {
            CounterSet::Shrink => 0b01,
            CounterSet::TraceReferences => 0b10,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CounterSet::Shrink => "shrink",
            CounterSet::TraceReferences => "trace-references",
        }
    }
}

/// Per-counter-set kept marks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reached(u8);

impl Reached {
    pub fn contains(&self, set: CounterSet) -> bool {
        self.0 & set.bit() != 0
    }

    pub fn insert(&mut self, set: CounterSet) {
        self.0 |= set.bit();
    }

    pub fn remove(&mut self, set: CounterSet) {
        self.0 &= !set.bit();
    }
}

/// An unresolved reference recorded by the loader, resolved later by the analyzer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawReference {
    Superclass(String),
    Interface(String),
    /// Type named by a descriptor, signature, throws clause or inner-class link
    TypeUse(String),
    Annotation(Annotation),
    AnnotationDefault(ElementValue),
    Code(CodeReference),
}

impl RawReference {
    /// Every class name this reference mentions, best effort.
    /// Used to find the dependents of a changed class.
    pub fn class_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        match self {
            RawReference::Superclass(name)
            | RawReference::Interface(name)
            | RawReference::TypeUse(name) => names.push(name.clone()),
            RawReference::Annotation(annotation) => annotation_names(annotation, &mut names),
            RawReference::AnnotationDefault(value) => element_names(value, &mut names),
            RawReference::Code(code) => code_names(code, &mut names),
        }
        names
    }
}

fn push_descriptor(descriptor: &str, names: &mut Vec<String>) {
    if let Ok(classes) = descriptor_classes(descriptor) {
        names.extend(classes);
    }
}

fn push_class(name: &str, names: &mut Vec<String>) {
    if let Some(class) = element_class(name) {
        names.push(class);
    }
}

fn annotation_names(annotation: &Annotation, names: &mut Vec<String>) {
    push_descriptor(&annotation.type_descriptor, names);
    for (_, value) in &annotation.elements {
        element_names(value, names);
    }
}

fn element_names(value: &ElementValue, names: &mut Vec<String>) {
    match value {
        ElementValue::Const(_) => {}
        ElementValue::Enum {
            type_descriptor, ..
        } => push_descriptor(type_descriptor, names),
        ElementValue::Class(descriptor) => push_descriptor(descriptor, names),
        ElementValue::Annotation(nested) => annotation_names(nested, names),
        ElementValue::Array(values) => {
            for value in values {
                element_names(value, names);
            }
        }
    }
}

fn loadable_names(constant: &LoadableConstant, names: &mut Vec<String>) {
    match constant {
        LoadableConstant::Class(name) => push_class(name, names),
        LoadableConstant::MethodHandle(handle) => {
            push_class(&handle.target.owner, names);
            push_descriptor(&handle.target.descriptor, names);
        }
        LoadableConstant::MethodType(descriptor) => push_descriptor(descriptor, names),
    }
}

fn code_names(code: &CodeReference, names: &mut Vec<String>) {
    match code {
        CodeReference::Field { target, .. } | CodeReference::Invoke { target, .. } => {
            push_class(&target.owner, names);
            push_descriptor(&target.descriptor, names);
        }
        CodeReference::InvokeDynamic {
            descriptor,
            bootstrap,
            ..
        } => {
            push_descriptor(descriptor, names);
            loadable_names(
                &LoadableConstant::MethodHandle(bootstrap.method.clone()),
                names,
            );
            for argument in &bootstrap.arguments {
                loadable_names(argument, names);
            }
        }
        CodeReference::New(class)
        | CodeReference::NewArray(class)
        | CodeReference::TypeCheck { class, .. }
        | CodeReference::CatchType(class) => push_class(class, names),
        CodeReference::Constant(constant) => loadable_names(constant, names),
    }
}

/// A class in the dependency graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassNode<T> {
    pub symbol: T,
    /// Internal JVM name, e.g. `test/Aaa`
    pub name: String,
    pub origin: Origin,
    pub access: u16,
    pub superclass: Option<T>,
    pub interfaces: Vec<T>,
    /// Annotation types applied to the class
    pub annotations: Vec<T>,
    pub signature: Option<String>,
    pub outer_class: Option<T>,
    pub members: Vec<T>,
    /// Class-level raw references: hierarchy, signature, annotations, inner-class links
    pub references: Vec<RawReference>,
    /// Hash of the class-file bytes, compared on incremental runs
    pub content_hash: u64,
    #[serde(skip)]
    pub reached: Reached,
}

impl<T: Symbol> ClassNode<T> {
    pub fn is_interface(&self) -> bool {
        self.access & access::INTERFACE != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access & access::ABSTRACT != 0
    }

    pub fn is_program(&self) -> bool {
        self.origin == Origin::Program
    }

    /// Direct supertypes: superclass first, then interfaces in declaration order
    pub fn supertypes(&self) -> impl Iterator<Item = &T> {
        self.superclass.iter().chain(self.interfaces.iter())
    }
}

/// A field or method in the dependency graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberNode<T> {
    pub symbol: T,
    pub owner: T,
    pub name: String,
    pub descriptor: String,
    pub kind: MemberKind,
    pub access: u16,
    pub references: Vec<RawReference>,
    #[serde(skip)]
    pub reached: Reached,
}

impl<T: Symbol> MemberNode<T> {
    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.access & access::PRIVATE != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access & access::ABSTRACT != 0
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == "<clinit>"
    }

    /// Instance methods that take part in virtual dispatch
    pub fn is_virtual(&self) -> bool {
        self.kind == MemberKind::Method
            && !self.is_static()
            && !self.is_private()
            && !self.is_constructor()
            && !self.is_static_initializer()
    }

    pub fn display_name(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    /// Invoke targets in this member's body that dispatch on the receiver type
    pub fn dispatched_calls(&self) -> impl Iterator<Item = (InvokeKind, &MemberRef)> {
        self.references.iter().filter_map(|r| match r {
            RawReference::Code(CodeReference::Invoke { kind, target }) if kind.is_dispatched() => {
                Some((*kind, target))
            }
            _ => None,
        })
    }
}
