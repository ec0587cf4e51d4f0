// Symbol identities for graph nodes

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Opaque identity of a class or member.
///
/// The engine never inspects a symbol's structure: it only builds symbols
/// from JVM names, compares and hashes them, and orders them for
/// deterministic traversal. Equal inputs must produce equal symbols.
pub trait Symbol:
    Clone + Eq + Hash + Ord + Debug + Display + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Symbol for a class, given its internal name (`test/Aaa`)
    fn for_class(name: &str) -> Self;

    /// Symbol for a field or method of `owner`
    fn for_member(owner: &str, name: &str, descriptor: &str) -> Self;
}

/// Plain string symbols: `test/Aaa` for classes, `test/Aaa.aaa:()V` for members
impl Symbol for String {
    fn for_class(name: &str) -> Self {
        name.to_string()
    }

    fn for_member(owner: &str, name: &str, descriptor: &str) -> Self {
        format!("{}.{}:{}", owner, name, descriptor)
    }
}

/// Structured symbol for hosts that want to pattern-match on node identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolKey {
    Class(String),
    Member {
        owner: String,
        name: String,
        descriptor: String,
    },
}

impl SymbolKey {
    pub fn owner(&self) -> &str {
        match self {
            SymbolKey::Class(name) => name,
            SymbolKey::Member { owner, .. } => owner,
        }
    }
}

impl Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKey::Class(name) => write!(f, "{}", name),
            SymbolKey::Member {
                owner,
                name,
                descriptor,
            } => write!(f, "{}.{}:{}", owner, name, descriptor),
        }
    }
}

impl Symbol for SymbolKey {
    fn for_class(name: &str) -> Self {
        SymbolKey::Class(name.to_string())
    }

    fn for_member(owner: &str, name: &str, descriptor: &str) -> Self {
        SymbolKey::Member {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}
