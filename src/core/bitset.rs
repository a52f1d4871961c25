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

//! Sets of variables. Instances never have more than `MAX_VARIABLES` variables, so a set is a
//! single machine word. Conditioning sets, intervention sets, reachability rows and the various
//! visited-sets of the graph walks all use this type.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Maximum number of variables in an instance
pub const MAX_VARIABLES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct VarSet(u32);

impl VarSet {

    pub fn empty() -> Self {
        VarSet(0)
    }

    /// Returns the set {0, ..., n-1}
    pub fn full(n: usize) -> Self {
        if n >= MAX_VARIABLES {
            VarSet(u32::MAX)
        } else {
            VarSet((1_u32 << n) - 1)
        }
    }

    pub fn from_bits(bits: u32) -> Self {
        VarSet(bits)
    }

    pub fn singleton(v: usize) -> Self {
        VarSet::empty().with(v)
    }

    #[inline(always)]
    pub fn bits(&self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn contains(&self, v: usize) -> bool {
        v < MAX_VARIABLES && self.0 & (1 << v) != 0
    }

    #[inline(always)]
    pub fn insert(&mut self, v: usize) {
        debug_assert!(v < MAX_VARIABLES);
        self.0 |= 1 << v;
    }

    #[inline(always)]
    pub fn remove(&mut self, v: usize) {
        debug_assert!(v < MAX_VARIABLES);
        self.0 &= !(1 << v);
    }

    /// Returns a copy of the set with `v` added
    #[inline(always)]
    pub fn with(mut self, v: usize) -> Self {
        self.insert(v);
        self
    }

    /// Returns a copy of the set without `v`
    #[inline(always)]
    pub fn without(mut self, v: usize) -> Self {
        self.remove(v);
        self
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_subset(&self, other: VarSet) -> bool {
        self.0 & other.0 == self.0
    }

    pub fn intersects(&self, other: VarSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Index of the highest variable in the set
    pub fn max_var(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(31 - self.0.leading_zeros() as usize)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let bits = self.0;
        (0..MAX_VARIABLES).filter(move |v| bits & (1 << v) != 0)
    }
}

impl BitOr for VarSet {
    type Output = VarSet;
    fn bitor(self, rhs: Self) -> Self::Output {
        VarSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for VarSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for VarSet {
    type Output = VarSet;
    fn bitand(self, rhs: Self) -> Self::Output {
        VarSet(self.0 & rhs.0)
    }
}

impl BitAndAssign for VarSet {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for VarSet {
    type Output = VarSet;
    fn not(self) -> Self::Output {
        VarSet(!self.0)
    }
}

impl fmt::Display for VarSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, v) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod test_varset {
    use super::*;

    #[test]
    fn full_sets() {
        assert_eq!(0, VarSet::full(0).len());
        assert_eq!(5, VarSet::full(5).len());
        assert_eq!(32, VarSet::full(32).len());
        assert!(VarSet::full(32).contains(31));
        assert!(!VarSet::full(4).contains(4));
    }

    #[test]
    fn insert_and_remove() {
        let mut set = VarSet::empty();
        set.insert(3);
        set.insert(7);
        assert!(set.contains(3));
        assert!(set.contains(7));
        assert_eq!(2, set.len());
        set.remove(3);
        assert!(!set.contains(3));
        assert_eq!(vec![7], set.iter().collect::<Vec<usize>>());
        assert_eq!(Some(7), set.max_var());
        assert_eq!(None, VarSet::empty().max_var());
    }

    #[test]
    fn set_operations() {
        let a = VarSet::empty().with(1).with(2);
        let b = VarSet::empty().with(2).with(5);
        assert_eq!(VarSet::singleton(2), a & b);
        assert_eq!(3, (a | b).len());
        assert!(VarSet::singleton(1).is_subset(a));
        assert!(!b.is_subset(a));
        assert!(a.intersects(b));
        assert_eq!("{1,2}", format!("{}", a));
    }

    #[test]
    fn out_of_range_is_never_contained() {
        assert!(!VarSet::from_bits(u32::MAX).contains(32));
    }
}
