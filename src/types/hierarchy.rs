//! Declared type ancestry.
//!
//! Handler and request types opt into variance-aware matching by declaring
//! their parents once at startup. The hierarchy is a DAG; cycles introduced
//! by mistake are tolerated by the breadth-first walk, never followed twice.

use super::TypeKey;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;
use tracing::trace;

static GLOBAL_HIERARCHY: OnceLock<TypeHierarchy> = OnceLock::new();

/// Registry of declared parent types
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    parents: RwLock<HashMap<TypeKey, Vec<TypeKey>>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide hierarchy consulted by constraint matching
    pub fn global() -> &'static TypeHierarchy {
        GLOBAL_HIERARCHY.get_or_init(TypeHierarchy::new)
    }

    /// Record `parent` as a direct ancestor of `child`. Idempotent.
    pub fn add_parent(&self, child: TypeKey, parent: TypeKey) {
        if child == parent {
            return;
        }
        let mut parents = self.parents.write();
        let entry = parents.entry(child).or_default();
        if !entry.contains(&parent) {
            trace!(child = %child, parent = %parent, "Declared type ancestry");
            entry.push(parent);
        }
    }

    /// Direct parents in declaration order
    pub fn parents(&self, key: &TypeKey) -> Vec<TypeKey> {
        self.parents.read().get(key).cloned().unwrap_or_default()
    }

    /// All ancestors of `key`, nearest first, without duplicates and
    /// excluding `key` itself
    pub fn ancestors(&self, key: &TypeKey) -> Vec<TypeKey> {
        let parents = self.parents.read();
        let mut seen = HashSet::from([*key]);
        let mut queue: VecDeque<TypeKey> = VecDeque::from([*key]);
        let mut ancestors = Vec::new();

        while let Some(current) = queue.pop_front() {
            if let Some(direct) = parents.get(&current) {
                for parent in direct {
                    if seen.insert(*parent) {
                        ancestors.push(*parent);
                        queue.push_back(*parent);
                    }
                }
            }
        }
        ancestors
    }

    /// `key` followed by its ancestors
    pub fn lineage(&self, key: &TypeKey) -> Vec<TypeKey> {
        let mut lineage = vec![*key];
        lineage.extend(self.ancestors(key));
        lineage
    }

    /// True when a value of type `sub` may stand in for `sup`
    pub fn is_assignable(&self, sub: &TypeKey, sup: &TypeKey) -> bool {
        sub == sup || self.ancestors(sub).contains(sup)
    }
}

/// Fluent declaration handle returned by [`declare`]
#[derive(Debug, Clone, Copy)]
pub struct TypeDeclaration {
    key: TypeKey,
}

impl TypeDeclaration {
    pub fn extends<P: ?Sized + 'static>(self) -> Self {
        self.extends_key(TypeKey::of::<P>())
    }

    pub fn extends_key(self, parent: TypeKey) -> Self {
        TypeHierarchy::global().add_parent(self.key, parent);
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }
}

/// Start declaring the ancestry of `T` in the global hierarchy
pub fn declare<T: ?Sized + 'static>() -> TypeDeclaration {
    TypeDeclaration {
        key: TypeKey::of::<T>(),
    }
}
