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

//! The instance is the immutable set of weighted constraints the search tries to satisfy. It is
//! built by adding constraints one by one (duplicates are merged on the fly) and then finalized,
//! which computes the views used by the rest of the solver:
//!     - the independence and dependence constraints, each sorted by decreasing weight
//!     - the constraints grouped by intervention set
//!
//! No constraint may be added after `finalize`.

use std::ops::Index;

use rustc_hash::FxHashMap;
use tracing::warn;

use super::bitset::VarSet;
use super::constraint::*;
use super::graph::GraphLimits;

/// Filters applied while loading the constraints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceLimits {
    /// Constraints mentioning a variable >= max_vars are skipped
    pub max_vars: Option<usize>,
    /// Constraints conditioned on more than max_cond variables are skipped
    pub max_cond: Option<usize>,
}

impl InstanceLimits {

    /// Returns true if a constraint over (v1, v2) given `condition` passes the filters
    pub fn admits(&self, v1: usize, v2: usize, condition: VarSet) -> bool {
        if let Some(max) = self.max_vars {
            if v1 >= max || v2 >= max {
                return false;
            }
            if condition.max_var().is_some_and(|v| v >= max) {
                return false;
            }
        }
        if let Some(max) = self.max_cond {
            if condition.len() > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Default)]
pub struct Instance {
    /// Number of variables
    n: usize,
    /// Identifier, in the input, of variable 0
    offset: usize,
    constraints: Vec<Constraint>,
    lookup: FxHashMap<ConstraintKey, ConstraintIndex>,
    independent: Vec<ConstraintIndex>,
    dependent: Vec<ConstraintIndex>,
    by_intervention: Vec<(VarSet, Vec<ConstraintIndex>)>,
    merged: usize,
}

impl Instance {

    pub fn new(offset: usize) -> Self {
        Self { offset, ..Default::default() }
    }

    /// Builds a finalized instance from a list of constraints over variables 0..n
    pub fn from_constraints(constraints: Vec<Constraint>) -> Self {
        let mut instance = Instance::new(0);
        for c in constraints {
            instance.add(c);
        }
        instance.finalize();
        instance
    }

    /// Adds a constraint, merging it with any constraint of the same identity
    pub fn add(&mut self, constraint: Constraint) {
        debug_assert!(constraint.v1() != constraint.v2());
        let key = constraint.key();
        if let Some(index) = self.lookup.get(&key) {
            let existing = &mut self.constraints[index.0];
            let before = existing.clone();
            existing.merge(&constraint);
            warn!("merging constraints {} and {} into {}", before, constraint, existing);
            self.merged += 1;
            return;
        }
        let mut largest = constraint.v2();
        if let Some(v) = constraint.condition().max_var() {
            largest = largest.max(v);
        }
        if let Some(v) = constraint.intervention().max_var() {
            largest = largest.max(v);
        }
        self.n = self.n.max(largest + 1);
        self.lookup.insert(key, ConstraintIndex(self.constraints.len()));
        self.constraints.push(constraint);
    }

    /// Computes the sorted polarity lists and the intervention groups
    pub fn finalize(&mut self) {
        self.independent.clear();
        self.dependent.clear();
        self.by_intervention.clear();
        for (i, c) in self.constraints.iter().enumerate() {
            if c.is_independence() {
                self.independent.push(ConstraintIndex(i));
            } else {
                self.dependent.push(ConstraintIndex(i));
            }
            match self.by_intervention.iter_mut().find(|(set, _)| *set == c.intervention()) {
                Some((_, group)) => group.push(ConstraintIndex(i)),
                None => self.by_intervention.push((c.intervention(), vec![ConstraintIndex(i)])),
            }
        }
        let constraints = &self.constraints;
        self.independent.sort_by(|a, b| constraints[b.0].weight().cmp(&constraints[a.0].weight()));
        self.dependent.sort_by(|a, b| constraints[b.0].weight().cmp(&constraints[a.0].weight()));
        self.by_intervention.sort_by_key(|(set, _)| set.bits());
    }

    /// Warns about limits that can not have any effect on this instance
    pub fn verify_limits(&self, limits: &InstanceLimits, graph: &GraphLimits) {
        if limits.max_vars.is_some_and(|max| max > self.n) {
            warn!("variable limit {:?} is unnecessarily high for {} variables", limits.max_vars, self.n);
        }
        if limits.max_cond.is_some_and(|max| max + 2 > self.n) {
            warn!("condition limit {:?} is unnecessarily high for {} variables", limits.max_cond, self.n);
        }
        if graph.max_degree.is_some_and(|max| self.n > 0 && max > 3 * (self.n - 1)) {
            warn!("degree limit {:?} is unnecessarily high for {} variables", graph.max_degree, self.n);
        }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn number_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn number_merged(&self) -> usize {
        self.merged
    }

    pub fn constraints_iter(&self) -> impl Iterator<Item = ConstraintIndex> {
        (0..self.constraints.len()).map(ConstraintIndex)
    }

    /// Independence constraints, by decreasing weight
    pub fn independent(&self) -> &[ConstraintIndex] {
        &self.independent
    }

    /// Dependence constraints, by decreasing weight
    pub fn dependent(&self) -> &[ConstraintIndex] {
        &self.dependent
    }

    /// Constraints grouped by intervention set, the groups ordered by their set
    pub fn by_intervention(&self) -> &[(VarSet, Vec<ConstraintIndex>)] {
        &self.by_intervention
    }

    pub fn find(&self, v1: usize, v2: usize, condition: VarSet, intervention: VarSet) -> Option<ConstraintIndex> {
        self.lookup.get(&ConstraintKey::new(v1, v2, condition, intervention)).copied()
    }

    /// Returns the index of the constraint "v1 _|_ v2 | condition" in the given regime, if any
    pub fn find_independence(&self, v1: usize, v2: usize, condition: VarSet, intervention: VarSet) -> Option<ConstraintIndex> {
        self.find(v1, v2, condition, intervention).filter(|c| self[*c].is_independence())
    }

    /// Returns the index of the constraint "v1 _N_ v2 | condition" in the given regime, if any
    pub fn find_dependence(&self, v1: usize, v2: usize, condition: VarSet, intervention: VarSet) -> Option<ConstraintIndex> {
        self.find(v1, v2, condition, intervention).filter(|c| !self[*c].is_independence())
    }

    /// Total weight of all the constraints
    pub fn total_weight(&self) -> Weight {
        self.constraints.iter().map(|c| c.weight()).sum()
    }
}

impl Index<ConstraintIndex> for Instance {
    type Output = Constraint;

    fn index(&self, index: ConstraintIndex) -> &Self::Output {
        &self.constraints[index.0]
    }
}
