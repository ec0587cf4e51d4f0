use super::{ClassNode, MemberKind, MemberNode, Origin, RawReference, Reached, ShrinkerGraph, Symbol};
use crate::analysis::ShrinkerWarning;
use crate::classfile::descriptor::{descriptor_classes, signature_classes};
use crate::classfile::{ClassFile, ClassFileError, FieldInfo, MethodInfo};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Raw bytes of one class, named by its internal JVM name (`test/Aaa`)
#[derive(Debug, Clone)]
pub struct ClassInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ClassInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Hash of a class file's contents, compared between incremental runs
pub fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Order-independent fingerprint of a library class set
pub fn library_fingerprint(inputs: &[ClassInput]) -> u64 {
    let mut entries: Vec<(&str, u64)> = inputs
        .iter()
        .map(|input| (input.name.as_str(), content_hash(&input.bytes)))
        .collect();
    entries.sort_unstable();

    let mut hasher = DefaultHasher::new();
    entries.hash(&mut hasher);
    hasher.finish()
}

/// A decoded class ready for insertion: its node, member nodes and raw references
#[derive(Debug, Clone)]
pub struct LoadedClass<T> {
    pub class: ClassNode<T>,
    pub members: Vec<MemberNode<T>>,
}

impl<T: Symbol> LoadedClass<T> {
    /// Decode one input. Fails on malformed bytes or when the class-file's
    /// declared name differs from the name it was supplied under.
    pub fn load(input: &ClassInput, origin: Origin) -> Result<Self, ClassFileError> {
        let class_file = ClassFile::parse(&input.bytes)?;
        if class_file.name != input.name {
            return Err(ClassFileError::NameMismatch {
                declared: class_file.name,
                expected: input.name.clone(),
            });
        }
        Self::from_class_file(class_file, origin, content_hash(&input.bytes))
    }

    pub fn from_class_file(class_file: ClassFile, origin: Origin, content_hash: u64) -> Result<Self, ClassFileError> {
        let ClassFile {
            access,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            signature,
            annotations,
            inner_classes,
            enclosing_method,
            ..
        } = class_file;

        let mut references = Vec::new();
        if let Some(super_name) = &super_name {
            references.push(RawReference::Superclass(super_name.clone()));
        }
        for interface in &interfaces {
            references.push(RawReference::Interface(interface.clone()));
        }
        if let Some(signature) = &signature {
            signature_uses(&mut references, &name, signature);
        }

        let mut annotation_types = Vec::new();
        for annotation in annotations {
            annotation_types.extend(
                descriptor_classes(&annotation.type_descriptor)?
                    .iter()
                    .map(|n| T::for_class(n)),
            );
            references.push(RawReference::Annotation(annotation));
        }

        // Inner classes need their enclosing class; the reverse is not true
        let mut outer_class = None;
        for inner in &inner_classes {
            if inner.inner == name {
                if let Some(outer) = &inner.outer {
                    references.push(RawReference::TypeUse(outer.clone()));
                    outer_class = Some(T::for_class(outer));
                }
            }
        }
        if let Some(enclosing) = &enclosing_method {
            references.push(RawReference::TypeUse(enclosing.class.clone()));
            outer_class.get_or_insert_with(|| T::for_class(&enclosing.class));
        }

        let mut members: Vec<MemberNode<T>> = Vec::with_capacity(fields.len() + methods.len());
        for field in fields {
            members.push(field_node(&name, field)?);
        }
        for method in methods {
            members.push(method_node(&name, method)?);
        }

        let class = ClassNode {
            symbol: T::for_class(&name),
            superclass: super_name.as_deref().map(T::for_class),
            interfaces: interfaces.iter().map(|i| T::for_class(i)).collect(),
            annotations: annotation_types,
            signature,
            outer_class,
            members: members.iter().map(|m| m.symbol.clone()).collect(),
            references,
            name,
            origin,
            access,
            content_hash,
            reached: Reached::default(),
        };

        Ok(Self { class, members })
    }
}

fn type_uses(references: &mut Vec<RawReference>, classes: Vec<String>) {
    references.extend(classes.into_iter().map(RawReference::TypeUse));
}

/// Generic signatures are optional metadata; a malformed one only loses its type uses
fn signature_uses(references: &mut Vec<RawReference>, owner: &str, signature: &str) {
    match signature_classes(signature) {
        Ok(classes) => type_uses(references, classes),
        Err(e) => debug!("Ignoring unparseable signature in {}: {}", owner, e),
    }
}

fn field_node<T: Symbol>(owner: &str, field: FieldInfo) -> Result<MemberNode<T>, ClassFileError> {
    let mut references = Vec::new();
    type_uses(&mut references, descriptor_classes(&field.descriptor)?);
    if let Some(signature) = &field.signature {
        signature_uses(&mut references, owner, signature);
    }
    references.extend(field.annotations.into_iter().map(RawReference::Annotation));

    Ok(MemberNode {
        symbol: T::for_member(owner, &field.name, &field.descriptor),
        owner: T::for_class(owner),
        name: field.name,
        descriptor: field.descriptor,
        kind: MemberKind::Field,
        access: field.access,
        references,
        reached: Reached::default(),
    })
}

fn method_node<T: Symbol>(owner: &str, method: MethodInfo) -> Result<MemberNode<T>, ClassFileError> {
    let mut references = Vec::new();
    type_uses(&mut references, descriptor_classes(&method.descriptor)?);
    if let Some(signature) = &method.signature {
        signature_uses(&mut references, owner, signature);
    }
    type_uses(&mut references, method.exceptions);
    references.extend(method.annotations.into_iter().map(RawReference::Annotation));
    if let Some(default) = method.annotation_default {
        references.push(RawReference::AnnotationDefault(default));
    }
    if let Some(code) = method.code {
        references.extend(code.references.into_iter().map(RawReference::Code));
    }

    Ok(MemberNode {
        symbol: T::for_member(owner, &method.name, &method.descriptor),
        owner: T::for_class(owner),
        name: method.name,
        descriptor: method.descriptor,
        kind: MemberKind::Method,
        access: method.access,
        references,
        reached: Reached::default(),
    })
}

/// Sequential insertion phase: adds loaded classes to a graph, resolving
/// duplicate definitions.
///
/// Program classes take precedence over library classes of the same name.
/// A second program definition of a class is dropped with a warning.
pub struct GraphBuilder<T: Symbol> {
    graph: ShrinkerGraph<T>,
    inserted: HashSet<T>,
    warnings: Vec<ShrinkerWarning>,
}

impl<T: Symbol> Default for GraphBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Symbol> GraphBuilder<T> {
    pub fn new() -> Self {
        Self::from_graph(ShrinkerGraph::new())
    }

    /// Continue building on an existing graph (incremental runs)
    pub fn from_graph(graph: ShrinkerGraph<T>) -> Self {
        Self {
            graph,
            inserted: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Decode and insert a single input on the current thread
    pub fn process_class(&mut self, input: &ClassInput, origin: Origin) -> Result<(), ClassFileError> {
        debug!("Loading class: {}", input.name);
        let loaded = LoadedClass::load(input, origin)?;
        self.add_class(loaded);
        Ok(())
    }

    pub fn add_class(&mut self, loaded: LoadedClass<T>) {
        let symbol = loaded.class.symbol.clone();
        let incoming = loaded.class.origin;

        if let Some(existing) = self.graph.class(&symbol) {
            let existing_origin = existing.origin;
            let seen_this_run = self.inserted.contains(&symbol);
            match (existing_origin, incoming) {
                (Origin::Program, Origin::Library) => {
                    debug!("Library class {} shadowed by program class", symbol);
                    return;
                }
                (Origin::Program, Origin::Program) | (Origin::Library, Origin::Library)
                    if seen_this_run =>
                {
                    self.warnings.push(ShrinkerWarning::duplicate_class(symbol.to_string()));
                    return;
                }
                _ => {}
            }
        }

        self.inserted.insert(symbol);
        self.graph.add_class(loaded);
    }

    pub fn add_warning(&mut self, warning: ShrinkerWarning) {
        self.warnings.push(warning);
    }

    pub fn graph(&self) -> &ShrinkerGraph<T> {
        &self.graph
    }

    pub fn build(self) -> (ShrinkerGraph<T>, Vec<ShrinkerWarning>) {
        (self.graph, self.warnings)
    }
}
