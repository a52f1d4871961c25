//Bcause
//Copyright (C) 2022-2023 A. Dubray
//
//This program is free software: you can redistribute it and/or modify
//it under the terms of the GNU Affero General Public License as published by
//the Free Software Foundation, either version 3 of the License, or
//(at your option) any later version.
//
//This program is distributed in the hope that it will be useful,
//but WITHOUT ANY WARRANTY; without even the implied warranty of
//MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//GNU Affero General Public License for more details.
//
//You should have received a copy of the GNU Affero General Public License
//along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! This module implements a reversible sparse-set. The bound maintainer keeps one such set per
//! pair of variables, holding the constraints over that pair that are still open (neither forced
//! satisfied nor forced violated).
//!
//! A sparse-set is a plain vector of elements, a map from each element to its position in the
//! vector, and a size. Elements at positions [0, size) are in the set. Removing an element swaps
//! it with the last element of the set and decrements the size, so that removal is O(1) and
//! iterating never visits removed elements.
//! Since the size is a `ReversibleUsize`, restoring the state of the `StateManager` puts every
//! element removed since the last save back in the set.
//!
//! All the elements must be added before the first removal.

use rustc_hash::FxHashMap;
use std::hash::Hash;
use search_trail::{StateManager, ReversibleUsize, UsizeManager};

#[derive(Debug)]
pub struct SparseSet<T>
    where T: Hash + Eq + Copy,
{
    plain: Vec<T>,
    indexes: FxHashMap<T, usize>,
    size: ReversibleUsize,
}

impl<T> SparseSet<T>
    where T: Hash + Eq + Copy,
{

    pub fn new(state: &mut StateManager) -> Self {
        Self {
            plain: vec![],
            indexes: FxHashMap::<T, usize>::default(),
            size: state.manage_usize(0),
        }
    }

    pub fn add(&mut self, elem: T, state: &mut StateManager) {
        debug_assert!(!self.indexes.contains_key(&elem));
        debug_assert!(self.len(state) == self.plain.len());
        self.indexes.insert(elem, self.plain.len());
        self.plain.push(elem);
        state.increment_usize(self.size);
    }

    /// Removes `elem` from the set. Returns false if it was not in the set.
    pub fn remove(&mut self, elem: T, state: &mut StateManager) -> bool {
        let size = state.get_usize(self.size);
        let cur_idx = match self.indexes.get(&elem) {
            Some(idx) if *idx < size => *idx,
            _ => return false,
        };
        let last_idx = size - 1;
        self.plain.swap(cur_idx, last_idx);
        self.indexes.insert(self.plain[cur_idx], cur_idx);
        self.indexes.insert(self.plain[last_idx], last_idx);
        state.decrement_usize(self.size);
        true
    }

    pub fn contains(&self, elem: T, state: &StateManager) -> bool {
        self.indexes.get(&elem).is_some_and(|idx| *idx < self.len(state))
    }

    pub fn iter(&self, state: &StateManager) -> impl Iterator<Item = T> + '_ {
        self.plain[0..self.len(state)].iter().copied()
    }

    pub fn len(&self, state: &StateManager) -> usize {
        state.get_usize(self.size)
    }

    pub fn is_empty(&self, state: &StateManager) -> bool {
        self.len(state) == 0
    }

    /// Number of elements ever added, including the removed ones
    pub fn capacity(&self) -> usize {
        self.plain.len()
    }
}

#[cfg(test)]
mod test_sparse_set {
    use search_trail::{StateManager, SaveAndRestore};
    use crate::core::sparse_set::*;

    fn check_map(set: &SparseSet<usize>, expected: Vec<(usize, usize)>) {
        assert_eq!(expected.len(), set.indexes.len());
        for (k, v) in expected {
            let in_map = set.indexes.get(&k);
            assert!(in_map.is_some());
            assert_eq!(v, *in_map.unwrap());
        }
    }

    fn filled(state: &mut StateManager) -> SparseSet<usize> {
        let mut set = SparseSet::<usize>::new(state);
        set.add(10, state);
        set.add(5, state);
        set.add(43, state);
        set.add(55, state);
        set
    }

    #[test]
    pub fn add_elements() {
        let mut state = StateManager::default();
        let set = filled(&mut state);
        assert_eq!(4, set.len(&state));
        assert_eq!(vec![10, 5, 43, 55], set.plain);
        check_map(&set, vec![(10, 0), (5, 1), (43, 2), (55, 3)]);
    }

    #[test]
    pub fn remove_elements() {
        let mut state = StateManager::default();
        let mut set = filled(&mut state);
        assert!(set.remove(5, &mut state));
        assert_eq!(3, set.len(&state));
        assert_eq!(vec![10, 55, 43, 5], set.plain);
        check_map(&set, vec![(10, 0), (55, 1), (43, 2), (5, 3)]);
        assert!(!set.contains(5, &state));
        assert!(set.contains(43, &state));
    }

    #[test]
    pub fn removing_twice_is_a_noop() {
        let mut state = StateManager::default();
        let mut set = filled(&mut state);
        assert!(set.remove(5, &mut state));
        assert!(!set.remove(5, &mut state));
        assert!(!set.remove(99, &mut state));
        assert_eq!(3, set.len(&state));
    }

    #[test]
    pub fn restore_state() {
        let mut state = StateManager::default();
        let mut set = filled(&mut state);
        state.save_state();
        set.remove(5, &mut state);
        set.remove(10, &mut state);
        assert_eq!(vec![43, 55], {
            let mut v = set.iter(&state).collect::<Vec<usize>>();
            v.sort();
            v
        });
        state.restore_state();
        assert_eq!(4, set.len(&state));
        assert!(set.contains(5, &state));
        assert!(set.contains(10, &state));
    }
}
