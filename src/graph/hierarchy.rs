// Class hierarchy queries: member resolution, implementation lookup, subtype closure

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::{ClassNode, MemberKind, MemberNode, ShrinkerGraph, Symbol};
use crate::classfile::descriptor::element_class;

/// Outcome of resolving a symbolic reference against the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Resolved to a program node
    Program(T),
    /// Resolved into the library, or to nothing that needs keeping (primitive arrays)
    Library,
    /// Nothing in the graph satisfies the reference; carries the missing name
    Unknown(String),
}

/// Library classes above a class, and whether any ancestor is missing from the graph
#[derive(Debug)]
pub struct Ancestry<'a, T: Symbol> {
    pub library: Vec<&'a ClassNode<T>>,
    pub has_unknown: bool,
}

impl<T: Symbol> ShrinkerGraph<T> {
    /// Resolve a constant-pool class name (array names resolve to their element class)
    pub fn resolve_class(&self, name: &str) -> Resolution<T> {
        let Some(class_name) = element_class(name) else {
            return Resolution::Library;
        };
        let symbol = T::for_class(&class_name);
        match self.class(&symbol) {
            Some(class) if class.is_program() => Resolution::Program(symbol),
            Some(_) => Resolution::Library,
            None => Resolution::Unknown(class_name),
        }
    }

    pub fn resolve_method(&self, owner: &str, name: &str, descriptor: &str) -> Resolution<T> {
        self.resolve_member(owner, name, descriptor, MemberKind::Method)
    }

    pub fn resolve_field(&self, owner: &str, name: &str, descriptor: &str) -> Resolution<T> {
        self.resolve_member(owner, name, descriptor, MemberKind::Field)
    }

    /// Find the declaration a member reference binds to: the owner's superclass
    /// chain first, then its superinterfaces. A reference declared by a library
    /// class resolves to the library; one nobody declares is unknown.
    fn resolve_member(&self, owner: &str, name: &str, descriptor: &str, kind: MemberKind) -> Resolution<T> {
        // Members of array types (clone, length) belong to java/lang/Object
        if owner.starts_with('[') {
            return Resolution::Library;
        }

        let start = T::for_class(owner);
        match self.class(&start) {
            None => return Resolution::Unknown(owner.to_string()),
            Some(class) if !class.is_program() => return Resolution::Library,
            Some(_) => {}
        }

        let mut visited = HashSet::new();
        let mut pending_interfaces = VecDeque::new();
        // With no library inputs, platform classes may declare anything
        let mut saw_platform = false;
        let mut unknown: Option<String> = None;

        let mut current = Some(start);
        while let Some(symbol) = current.take() {
            if !visited.insert(symbol.clone()) {
                break;
            }
            match self.class(&symbol) {
                None if self.is_implicit_library(&symbol) => saw_platform = true,
                None => {
                    unknown.get_or_insert_with(|| symbol.to_string());
                }
                Some(class) => {
                    if let Some(member) = self.declared(class, name, descriptor, kind) {
                        return if class.is_program() {
                            Resolution::Program(member.symbol.clone())
                        } else {
                            Resolution::Library
                        };
                    }
                    pending_interfaces.extend(class.interfaces.iter().cloned());
                    current = class.superclass.clone();
                }
            }
        }

        while let Some(symbol) = pending_interfaces.pop_front() {
            if !visited.insert(symbol.clone()) {
                continue;
            }
            match self.class(&symbol) {
                None if self.is_implicit_library(&symbol) => saw_platform = true,
                None => {
                    unknown.get_or_insert_with(|| symbol.to_string());
                }
                Some(class) => {
                    if let Some(member) = self.declared(class, name, descriptor, kind) {
                        return if class.is_program() {
                            Resolution::Program(member.symbol.clone())
                        } else {
                            Resolution::Library
                        };
                    }
                    pending_interfaces.extend(class.interfaces.iter().cloned());
                }
            }
        }

        if let Some(missing) = unknown {
            Resolution::Unknown(missing)
        } else if saw_platform {
            Resolution::Library
        } else {
            Resolution::Unknown(T::for_member(owner, name, descriptor).to_string())
        }
    }

    fn declared(&self, class: &ClassNode<T>, name: &str, descriptor: &str, kind: MemberKind) -> Option<&MemberNode<T>> {
        self.find_member(class, name, descriptor)
            .filter(|m| m.kind == kind)
    }

    /// The method a virtual call on an instance of `class` would execute:
    /// the nearest concrete declaration up the superclass chain, else a
    /// default method from a program superinterface.
    pub fn find_implementation(&self, class: &T, name: &str, descriptor: &str) -> Option<T> {
        let mut visited = HashSet::new();
        let mut interfaces = VecDeque::new();

        let mut current = Some(class.clone());
        while let Some(symbol) = current.take() {
            if !visited.insert(symbol.clone()) {
                break;
            }
            let Some(node) = self.class(&symbol).filter(|c| c.is_program()) else {
                break;
            };
            if let Some(member) = self.declared(node, name, descriptor, MemberKind::Method) {
                if member.is_virtual() {
                    // An abstract redeclaration hides inherited implementations
                    return (!member.is_abstract()).then(|| member.symbol.clone());
                }
            }
            interfaces.extend(node.interfaces.iter().cloned());
            current = node.superclass.clone();
        }

        while let Some(symbol) = interfaces.pop_front() {
            if !visited.insert(symbol.clone()) {
                continue;
            }
            let Some(node) = self.class(&symbol).filter(|c| c.is_program()) else {
                continue;
            };
            if let Some(member) = self.declared(node, name, descriptor, MemberKind::Method) {
                if member.is_virtual() && !member.is_abstract() {
                    return Some(member.symbol.clone());
                }
            }
            interfaces.extend(node.interfaces.iter().cloned());
        }

        None
    }

    /// `root` followed by all of its transitive subtypes, breadth-first in symbol order
    pub fn subtypes_closure(&self, root: &T) -> Vec<T> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        seen.insert(root.clone());
        queue.push_back(root.clone());
        while let Some(symbol) = queue.pop_front() {
            for sub in self.direct_subtypes(&symbol) {
                if seen.insert(sub.clone()) {
                    queue.push_back(sub.clone());
                }
            }
            order.push(symbol);
        }
        order
    }

    /// Library ancestors of a class (transitively, through program and library
    /// classes alike), and whether the walk hit a class missing from the graph.
    /// When no library was supplied, missing platform classes (`java/...`) are
    /// implicit library roots and do not count as unknown.
    pub fn ancestry(&self, class: &ClassNode<T>) -> Ancestry<'_, T> {
        let mut library = Vec::new();
        let mut has_unknown = false;
        let mut visited = HashSet::new();
        let mut queue: VecDeque<&T> = class.supertypes().collect();

        while let Some(symbol) = queue.pop_front() {
            if !visited.insert(symbol) {
                continue;
            }
            match self.class(symbol) {
                None if self.is_implicit_library(symbol) => {}
                None => has_unknown = true,
                Some(node) => {
                    if !node.is_program() {
                        library.push(node);
                    }
                    queue.extend(node.supertypes());
                }
            }
        }

        Ancestry {
            library,
            has_unknown,
        }
    }

    /// A missing class standing in for the library: a platform class in a run without library inputs
    fn is_implicit_library(&self, symbol: &T) -> bool {
        !self.has_library() && is_platform_class(symbol)
    }

    /// Whether any of the given library classes declares an overridable method with this signature
    pub fn library_declares(&self, library: &[&ClassNode<T>], name: &str, descriptor: &str) -> bool {
        library.iter().any(|class| {
            self.declared(class, name, descriptor, MemberKind::Method)
                .map(|m| m.is_virtual())
                .unwrap_or(false)
        })
    }
}

/// Classes of the Java platform, which may be missing when no library inputs are given
pub fn is_platform_class<T: Symbol>(symbol: &T) -> bool {
    symbol.to_string().starts_with("java/")
}
