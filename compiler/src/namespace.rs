//! Collision-free identifier allocation within one lexical scope.
//!
//! Suffixing is one-indexed: the first holder of a name keeps it bare, the
//! first collision becomes `Name1`, then `Name2`, skipping any candidate that
//! is already taken.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct Namespace<K> {
    taken:     HashSet<String>,
    allocated: HashMap<K, String>,
}

impl<K: Eq + Hash + Clone> Default for Namespace<K> {
    fn default() -> Self {
        Namespace {
            taken:     HashSet::new(),
            allocated: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Namespace<K> {
    pub fn new() -> Namespace<K> {
        Namespace::default()
    }

    /// A namespace where `names` can never be handed out.
    pub fn with_reserved(names: &[&str]) -> Namespace<K> {
        let mut namespace = Namespace::new();
        for name in names {
            namespace.taken.insert(name.to_string());
        }
        namespace
    }

    /// Returns the name for `key`, minting one from `desired` on first
    /// request.
    pub fn allocate(&mut self, key: K, desired: &str) -> String {
        if let Some(name) = self.allocated.get(&key) {
            return name.clone();
        }
        let mut candidate = desired.to_string();
        let mut suffix = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{}{}", desired, suffix);
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        self.allocated.insert(key, candidate.clone());
        candidate
    }

    pub fn get(&self, key: &K) -> Option<&str> {
        self.allocated.get(key).map(String::as_str)
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    pub fn len(&self) -> usize {
        self.allocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_holder_keeps_bare_name() {
        let mut ns = Namespace::new();
        assert_eq!(ns.allocate("a", "Foo"), "Foo");
        assert_eq!(ns.allocate("b", "Foo"), "Foo1");
        assert_eq!(ns.allocate("c", "Foo"), "Foo2");
    }

    #[test]
    fn same_key_reuses_allocation() {
        let mut ns = Namespace::new();
        assert_eq!(ns.allocate(1, "x"), "x");
        assert_eq!(ns.allocate(2, "x"), "x1");
        assert_eq!(ns.allocate(1, "something_else"), "x");
        assert_eq!(ns.get(&2), Some("x1"));
        assert_eq!(ns.len(), 2);
    }

    #[test]
    fn suffix_skips_taken_candidates() {
        let mut ns = Namespace::new();
        assert_eq!(ns.allocate("explicit", "Foo1"), "Foo1");
        assert_eq!(ns.allocate("a", "Foo"), "Foo");
        assert_eq!(ns.allocate("b", "Foo"), "Foo2");
    }

    #[test]
    fn reserved_names_are_never_handed_out() {
        let mut ns: Namespace<&str> = Namespace::with_reserved(&["Option", "Vec"]);
        assert!(ns.is_taken("Option"));
        assert_eq!(ns.allocate("opt", "Option"), "Option1");
        assert_eq!(ns.allocate("vec", "Vec"), "Vec1");
    }
}
