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

use std::fmt;

use super::bitset::VarSet;

/// Weight of a constraint, or of a set of violated constraints
pub type Weight = usize;

/// Upper bound used when no solution is known
pub const INFINITE_WEIGHT: Weight = Weight::MAX;

/// Abstraction used as a typesafe way of retrieving a `Constraint` in the `Instance`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintIndex(pub usize);

/// Identity of a constraint. Two constraints with the same key are merged at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintKey {
    v1: usize,
    v2: usize,
    condition: VarSet,
    intervention: VarSet,
}

impl ConstraintKey {
    pub fn new(v1: usize, v2: usize, condition: VarSet, intervention: VarSet) -> Self {
        let (v1, v2) = if v1 <= v2 { (v1, v2) } else { (v2, v1) };
        Self { v1, v2, condition, intervention }
    }
}

/// A weighted statement "v1 and v2 are (in)dependent given `condition`" observed in the
/// experimental regime where the variables of `intervention` are intervened upon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    v1: usize,
    v2: usize,
    condition: VarSet,
    intervention: VarSet,
    independent: bool,
    weight: Weight,
}

impl Constraint {

    pub fn new(v1: usize, v2: usize, condition: VarSet, intervention: VarSet, independent: bool, weight: Weight) -> Self {
        let (v1, v2) = if v1 <= v2 { (v1, v2) } else { (v2, v1) };
        Self { v1, v2, condition, intervention, independent, weight }
    }

    pub fn independence(v1: usize, v2: usize, condition: VarSet, weight: Weight) -> Self {
        Constraint::new(v1, v2, condition, VarSet::empty(), true, weight)
    }

    pub fn dependence(v1: usize, v2: usize, condition: VarSet, weight: Weight) -> Self {
        Constraint::new(v1, v2, condition, VarSet::empty(), false, weight)
    }

    pub fn with_intervention(mut self, intervention: VarSet) -> Self {
        self.intervention = intervention;
        self
    }

    pub fn key(&self) -> ConstraintKey {
        ConstraintKey::new(self.v1, self.v2, self.condition, self.intervention)
    }

    #[inline(always)]
    pub fn v1(&self) -> usize {
        self.v1
    }

    #[inline(always)]
    pub fn v2(&self) -> usize {
        self.v2
    }

    #[inline(always)]
    pub fn condition(&self) -> VarSet {
        self.condition
    }

    #[inline(always)]
    pub fn intervention(&self) -> VarSet {
        self.intervention
    }

    #[inline(always)]
    pub fn is_independence(&self) -> bool {
        self.independent
    }

    #[inline(always)]
    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// Adds the statement `other`, with the same identity, into this one. Equal polarities add
    /// up; opposite polarities cancel out and the heaviest one wins (this one on a tie).
    pub fn merge(&mut self, other: &Constraint) {
        debug_assert!(self.key() == other.key());
        if self.independent == other.independent {
            self.weight = self.weight.saturating_add(other.weight);
        } else if other.weight <= self.weight {
            self.weight -= other.weight;
        } else {
            self.weight = other.weight - self.weight;
            self.independent = other.independent;
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {} | {}", self.v1, if self.independent { "_|_" } else { "_N_" }, self.v2, self.condition)?;
        if !self.intervention.is_empty() {
            write!(f, " || {}", self.intervention)?;
        }
        write!(f, " (weight: {})", self.weight)
    }
}
