//! # Binding Index
//!
//! Ordered, indexed collection of the bindings one owner declares under one
//! policy.
//!
//! ## Architecture
//!
//! Nodes live in an arena and are linked both ways by slot number. The
//! policy comparator keeps more specific constraints ahead of more general
//! ones; ties keep insertion order. An index map points each [`IndexKey`]
//! at the first node of its run, and runs sharing a key are always
//! contiguous, so exact (invariant) lookups can start at the run and stop at
//! the first node that does not match.

use super::{Binding, BindingId, IndexKey};
use crate::error::{DispatchError, Result};
use crate::policy::CallbackPolicy;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

struct Node {
    binding: Arc<Binding>,
    key: Option<IndexKey>,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct BindingIndex {
    policy: &'static CallbackPolicy,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<IndexKey, usize>,
    slots: HashMap<BindingId, usize>,
}

impl BindingIndex {
    pub fn new(policy: &'static CallbackPolicy) -> Self {
        Self {
            policy,
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            index: HashMap::new(),
            slots: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &'static CallbackPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: BindingId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Insert `binding` at its ranked position
    pub fn insert(&mut self, binding: Arc<Binding>) {
        let key = binding.create_index(self.policy.variance());
        let id = binding.id();
        let anchor = key.as_ref().and_then(|key| self.index.get(key).copied());
        let slot = self.allocate(Node {
            binding: binding.clone(),
            key: key.clone(),
            prev: None,
            next: None,
        });

        match anchor {
            Some(first) => {
                // join the end of the existing run for this key
                let mut last = first;
                while let Some(next) = self.next_of(last) {
                    if self.key_of(next) != key.as_ref() {
                        break;
                    }
                    last = next;
                }
                self.link_after(slot, last);
            }
            None => {
                let mut cursor = self.head;
                while let Some(current) = cursor {
                    let ranked_before = self
                        .binding_at(current)
                        .map(|existing| self.policy.compare(&binding, existing) == Ordering::Less)
                        .unwrap_or(false);
                    if ranked_before {
                        break;
                    }
                    cursor = self.next_of(current);
                }
                match cursor {
                    Some(before) => self.link_before(slot, before),
                    None => self.link_last(slot),
                }
                if let Some(key) = key {
                    self.index.insert(key, slot);
                }
            }
        }
        self.slots.insert(id, slot);
    }

    /// Unlink a binding, re-anchoring its index entry to the next node of
    /// the same run. Removing an absent binding is an error.
    pub fn remove(&mut self, id: BindingId) -> Result<Arc<Binding>> {
        let slot = self
            .slots
            .remove(&id)
            .ok_or_else(|| DispatchError::BindingNotIndexed {
                binding: id.to_string(),
                policy: self.policy.name().to_string(),
            })?;
        let node = self.nodes.get_mut(slot).and_then(Option::take).ok_or_else(|| {
            DispatchError::BindingNotIndexed {
                binding: id.to_string(),
                policy: self.policy.name().to_string(),
            }
        })?;

        match node.prev {
            Some(prev) => self.set_next(prev, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.set_prev(next, node.prev),
            None => self.tail = node.prev,
        }

        if let Some(key) = &node.key {
            if self.index.get(key) == Some(&slot) {
                match node.next.filter(|next| self.key_of(*next) == Some(key)) {
                    Some(next) => {
                        self.index.insert(key.clone(), next);
                    }
                    None => {
                        self.index.remove(key);
                    }
                }
            }
        }
        self.free.push(slot);
        Ok(node.binding)
    }

    /// Every binding in ranked order
    pub fn snapshot(&self) -> Vec<Arc<Binding>> {
        self.collect_from(self.head)
    }

    /// Bindings from the first node indexed by `key` to the end, or `None`
    /// when nothing is indexed under `key`
    pub fn snapshot_from(&self, key: &IndexKey) -> Option<Vec<Arc<Binding>>> {
        self.index.get(key).map(|slot| self.collect_from(Some(*slot)))
    }

    pub fn first_indexed(&self, key: &IndexKey) -> Option<&Arc<Binding>> {
        self.index.get(key).and_then(|slot| self.binding_at(*slot))
    }

    fn collect_from(&self, start: Option<usize>) -> Vec<Arc<Binding>> {
        let mut bindings = Vec::with_capacity(self.len());
        let mut cursor = start;
        while let Some(slot) = cursor {
            if let Some(binding) = self.binding_at(slot) {
                bindings.push(binding.clone());
            }
            cursor = self.next_of(slot);
        }
        bindings
    }

    fn allocate(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn node(&self, slot: usize) -> Option<&Node> {
        self.nodes.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node> {
        self.nodes.get_mut(slot).and_then(Option::as_mut)
    }

    fn next_of(&self, slot: usize) -> Option<usize> {
        self.node(slot).and_then(|node| node.next)
    }

    fn prev_of(&self, slot: usize) -> Option<usize> {
        self.node(slot).and_then(|node| node.prev)
    }

    fn key_of(&self, slot: usize) -> Option<&IndexKey> {
        self.node(slot).and_then(|node| node.key.as_ref())
    }

    fn binding_at(&self, slot: usize) -> Option<&Arc<Binding>> {
        self.node(slot).map(|node| &node.binding)
    }

    fn set_next(&mut self, slot: usize, next: Option<usize>) {
        if let Some(node) = self.node_mut(slot) {
            node.next = next;
        }
    }

    fn set_prev(&mut self, slot: usize, prev: Option<usize>) {
        if let Some(node) = self.node_mut(slot) {
            node.prev = prev;
        }
    }

    fn link_before(&mut self, slot: usize, before: usize) {
        let prev = self.prev_of(before);
        if let Some(node) = self.node_mut(slot) {
            node.prev = prev;
            node.next = Some(before);
        }
        self.set_prev(before, Some(slot));
        match prev {
            Some(prev) => self.set_next(prev, Some(slot)),
            None => self.head = Some(slot),
        }
    }

    fn link_after(&mut self, slot: usize, after: usize) {
        let next = self.next_of(after);
        if let Some(node) = self.node_mut(slot) {
            node.prev = Some(after);
            node.next = next;
        }
        self.set_next(after, Some(slot));
        match next {
            Some(next) => self.set_prev(next, Some(slot)),
            None => self.tail = Some(slot),
        }
    }

    fn link_last(&mut self, slot: usize) {
        match self.tail {
            Some(tail) => self.link_after(slot, tail),
            None => {
                self.head = Some(slot);
                self.tail = Some(slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Constraint;
    use crate::callback::Reply;
    use crate::policy::{handles, looksup};
    use crate::types::declare;

    struct Vehicle;
    struct Car;
    struct Truck;

    fn binding(constraint: impl Into<Constraint>, key: &str) -> Arc<Binding> {
        Arc::new(
            Binding::builder(constraint)
                .key(key)
                .function(|_, _| Ok(Reply::Nothing))
                .build()
                .unwrap(),
        )
    }

    fn keys(bindings: &[Arc<Binding>]) -> Vec<String> {
        bindings
            .iter()
            .map(|b| b.key().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_specific_before_general_and_unconstrained_last() {
        declare::<Car>().extends::<Vehicle>();
        declare::<Truck>().extends::<Vehicle>();
        let mut index = BindingIndex::new(handles());
        index.insert(binding(Constraint::Unconstrained, "any"));
        index.insert(binding(Constraint::of::<Vehicle>(), "vehicle"));
        index.insert(binding(Constraint::of::<Car>(), "car"));
        index.insert(binding(Constraint::of::<Truck>(), "truck"));

        assert_eq!(keys(&index.snapshot()), vec!["car", "truck", "vehicle", "any"]);
    }

    #[test]
    fn test_ranking_is_fixed_at_insertion() {
        struct Appliance;
        struct Toaster;

        let mut early = BindingIndex::new(handles());
        early.insert(binding(Constraint::of::<Appliance>(), "appliance"));
        early.insert(binding(Constraint::of::<Toaster>(), "toaster"));

        declare::<Toaster>().extends::<Appliance>();
        assert_eq!(keys(&early.snapshot()), vec!["appliance", "toaster"]);

        let mut late = BindingIndex::new(handles());
        late.insert(binding(Constraint::of::<Appliance>(), "appliance"));
        late.insert(binding(Constraint::of::<Toaster>(), "toaster"));
        assert_eq!(keys(&late.snapshot()), vec!["toaster", "appliance"]);
    }

    #[test]
    fn test_same_key_runs_keep_insertion_order() {
        let mut index = BindingIndex::new(looksup());
        index.insert(binding("a", "a1"));
        index.insert(binding("b", "b1"));
        index.insert(binding("a", "a2"));
        index.insert(binding("b", "b2"));

        assert_eq!(keys(&index.snapshot()), vec!["a1", "a2", "b1", "b2"]);
        let from_b = index.snapshot_from(&IndexKey::Literal("b".into())).unwrap();
        assert_eq!(keys(&from_b), vec!["b1", "b2"]);
        assert!(index.snapshot_from(&IndexKey::Literal("c".into())).is_none());
    }

    #[test]
    fn test_remove_reanchors_index() {
        let mut index = BindingIndex::new(looksup());
        let first = binding("a", "a1");
        let second = binding("a", "a2");
        index.insert(first.clone());
        index.insert(second.clone());
        index.insert(binding("b", "b1"));

        index.remove(first.id()).unwrap();
        let key = IndexKey::Literal("a".into());
        assert_eq!(index.first_indexed(&key).map(|b| b.id()), Some(second.id()));

        index.remove(second.id()).unwrap();
        assert!(index.first_indexed(&key).is_none());
        assert_eq!(keys(&index.snapshot()), vec!["b1"]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_absent_binding_is_reported() {
        let mut index = BindingIndex::new(handles());
        let stray = binding("x", "x");
        let error = index.remove(stray.id()).unwrap_err();
        assert!(matches!(error, DispatchError::BindingNotIndexed { .. }));

        index.insert(stray.clone());
        index.remove(stray.id()).unwrap();
        assert!(index.remove(stray.id()).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut index = BindingIndex::new(handles());
        let first = binding("x", "x");
        index.insert(first.clone());
        index.remove(first.id()).unwrap();
        index.insert(binding("y", "y"));
        index.insert(binding("z", "z"));
        assert_eq!(index.nodes.len(), 2);
        assert_eq!(keys(&index.snapshot()), vec!["y", "z"]);
    }
}
