//! Membership abstraction over searchable collections
//!
//! Neighbour queries accept member/exclusion sets from callers that keep
//! their working sets in different containers (vectors during sampling,
//! hash sets during traversal). A single trait with a `contains` operation
//! covers them all.

use std::collections::{BTreeSet, HashSet};
use std::hash::{BuildHasher, Hash};

/// A collection that can answer membership queries.
pub trait Contains<T> {
    fn contains_item(&self, item: &T) -> bool;
    fn is_empty_set(&self) -> bool;
}

impl<T: PartialEq> Contains<T> for [T] {
    fn contains_item(&self, item: &T) -> bool {
        self.contains(item)
    }

    fn is_empty_set(&self) -> bool {
        self.is_empty()
    }
}

impl<T: PartialEq> Contains<T> for Vec<T> {
    fn contains_item(&self, item: &T) -> bool {
        self.as_slice().contains(item)
    }

    fn is_empty_set(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Eq + Hash, S: BuildHasher> Contains<T> for HashSet<T, S> {
    fn contains_item(&self, item: &T) -> bool {
        self.contains(item)
    }

    fn is_empty_set(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Ord> Contains<T> for BTreeSet<T> {
    fn contains_item(&self, item: &T) -> bool {
        self.contains(item)
    }

    fn is_empty_set(&self) -> bool {
        self.is_empty()
    }
}

impl<T, C: Contains<T> + ?Sized> Contains<T> for &C {
    fn contains_item(&self, item: &T) -> bool {
        (**self).contains_item(item)
    }

    fn is_empty_set(&self) -> bool {
        (**self).is_empty_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containers_answer_membership() {
        let v = vec![1, 2, 3];
        let hs: HashSet<i32> = v.iter().copied().collect();
        let bs: BTreeSet<i32> = v.iter().copied().collect();

        assert!(v.contains_item(&2));
        assert!(hs.contains_item(&2));
        assert!(bs.contains_item(&2));
        assert!(!v.contains_item(&7));
        assert!(!Vec::<i32>::new().contains_item(&7));
        assert!(Vec::<i32>::new().is_empty_set());
    }
}
