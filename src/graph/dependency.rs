// Dependency edges between graph nodes

use serde::{Deserialize, Serialize};

/// Why one node keeps another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyKind {
    /// Keeps the target class's declaration and hierarchy, but not its static initializer
    RequiresClassStructure,
    /// Keeps the class and its static initializer
    RequiresClass,
    RequiresMember,
    /// Keeps a subinterface once an implementing class is kept
    InterfaceImplementedIfClassKept,
    /// Keeps an implementation once the class it is dispatched on is kept
    MemberImplementedIfClassKept,
    Superclass,
    Superinterface,
    Annotation,
}

impl DependencyKind {
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            DependencyKind::InterfaceImplementedIfClassKept
                | DependencyKind::MemberImplementedIfClassKept
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DependencyKind::RequiresClassStructure => "REQUIRES_CLASS_STRUCTURE",
            DependencyKind::RequiresClass => "REQUIRES_CLASS",
            DependencyKind::RequiresMember => "REQUIRES_MEMBER",
            DependencyKind::InterfaceImplementedIfClassKept => {
                "INTERFACE_IMPLEMENTED_IF_CLASS_KEPT"
            }
            DependencyKind::MemberImplementedIfClassKept => "MEMBER_IMPLEMENTED_IF_CLASS_KEPT",
            DependencyKind::Superclass => "SUPERCLASS",
            DependencyKind::Superinterface => "SUPERINTERFACE",
            DependencyKind::Annotation => "ANNOTATION",
        }
    }
}

/// Which phase produced an edge. Dispatch edges are recomputed wholesale
/// on incremental runs; reference edges are cleared per source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeOrigin {
    Reference,
    Dispatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency<T> {
    pub kind: DependencyKind,
    /// For conditional kinds, the class whose retention activates the edge
    pub condition: Option<T>,
    pub origin: EdgeOrigin,
}

impl<T> Dependency<T> {
    pub fn new(kind: DependencyKind) -> Self {
        Self {
            kind,
            condition: None,
            origin: EdgeOrigin::Reference,
        }
    }

    pub fn conditional(kind: DependencyKind, condition: T) -> Self {
        Self {
            kind,
            condition: Some(condition),
            origin: EdgeOrigin::Dispatch,
        }
    }

    pub fn from_dispatch(mut self) -> Self {
        self.origin = EdgeOrigin::Dispatch;
        self
    }
}
