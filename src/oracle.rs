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

//! Relaxation-based lower bounds. Each constraint is a variable of the relaxation, the cores
//! are covering constraints over these variables (at least one constraint of a core is violated),
//! and the objective is the total weight of the violated constraints. The search fixes a variable
//! when it classifies the corresponding constraint.
//!
//! Any implementation of `LpOracle` can be plugged in. The bundled `CorePackingOracle` computes
//! a greedy packing of disjoint cores, which is a feasible dual solution of the relaxation.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::core::constraint::{Constraint, ConstraintIndex, Weight};
use crate::core::instance::Instance;

/// Abstraction used as a typesafe way of retrieving a variable of the relaxation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LpHandle(pub usize);

/// Trait that a relaxation solver must implement to strengthen the lower bound
pub trait LpOracle {
    /// Registers a constraint as a variable of the relaxation
    fn add_variable(&mut self, constraint: &Constraint) -> LpHandle;
    /// Adds a covering constraint: at least one of the items is violated
    fn add_core(&mut self, items: &[LpHandle]);
    /// Fixes the variable of a classified constraint
    fn fix(&mut self, handle: LpHandle, satisfied: bool);
    /// Frees a variable fixed by `fix`
    fn reset(&mut self, handle: LpHandle);
    fn open_scope(&mut self);
    fn close_scope(&mut self);
    /// Returns a lower bound on the total weight of violated constraints, under the current fixings
    fn solve(&mut self) -> Weight;
    /// Returns true if the relaxation proves that x and y are not adjacent
    fn induced_independence(&self, x: usize, y: usize) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fixing {
    Free,
    Satisfied,
    Violated,
}

#[derive(Debug, Default)]
pub struct CorePackingOracle {
    weights: Vec<Weight>,
    fixings: Vec<Fixing>,
    cores: Vec<Vec<LpHandle>>,
}

impl CorePackingOracle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LpOracle for CorePackingOracle {

    fn add_variable(&mut self, constraint: &Constraint) -> LpHandle {
        self.weights.push(constraint.weight());
        self.fixings.push(Fixing::Free);
        LpHandle(self.weights.len() - 1)
    }

    fn add_core(&mut self, items: &[LpHandle]) {
        self.cores.push(items.to_vec());
    }

    fn fix(&mut self, handle: LpHandle, satisfied: bool) {
        self.fixings[handle.0] = if satisfied { Fixing::Satisfied } else { Fixing::Violated };
    }

    fn reset(&mut self, handle: LpHandle) {
        self.fixings[handle.0] = Fixing::Free;
    }

    fn open_scope(&mut self) {}

    fn close_scope(&mut self) {}

    fn solve(&mut self) -> Weight {
        let mut bound = self.weights.iter().zip(self.fixings.iter())
            .filter(|(_, f)| **f == Fixing::Violated)
            .map(|(w, _)| *w)
            .sum::<Weight>();
        let mut used = vec![false; self.weights.len()];
        for core in self.cores.iter() {
            if core.iter().any(|h| self.fixings[h.0] == Fixing::Violated || used[h.0]) {
                continue;
            }
            let cheapest = core.iter()
                .filter(|h| self.fixings[h.0] == Fixing::Free)
                .map(|h| self.weights[h.0])
                .min();
            if let Some(w) = cheapest {
                bound += w;
                for h in core.iter().filter(|h| self.fixings[h.0] == Fixing::Free) {
                    used[h.0] = true;
                }
            }
        }
        bound
    }

    fn induced_independence(&self, _x: usize, _y: usize) -> bool {
        false
    }
}

/// The relaxation bound as seen by the search: the oracle (if any), the mapping from constraints to
/// relaxation variables and the bound cached for each open scope.
pub struct LpBound {
    oracle: Option<Box<dyn LpOracle>>,
    handles: Vec<LpHandle>,
    cached: Vec<Weight>,
    calls: usize,
    time: Duration,
}

impl LpBound {

    pub fn new(instance: &Instance, oracle: Option<Box<dyn LpOracle>>) -> Self {
        let mut oracle = oracle;
        let mut handles = vec![];
        if let Some(o) = oracle.as_mut() {
            handles = instance.constraints_iter().map(|c| o.add_variable(&instance[c])).collect();
        }
        Self {
            oracle,
            handles,
            cached: vec![0],
            calls: 0,
            time: Duration::ZERO,
        }
    }

    /// Returns a bound maintainer without relaxation
    pub fn disabled() -> Self {
        Self { oracle: None, handles: vec![], cached: vec![0], calls: 0, time: Duration::ZERO }
    }

    pub fn is_enabled(&self) -> bool {
        self.oracle.is_some()
    }

    pub fn add_core(&mut self, items: &[ConstraintIndex]) {
        if let Some(oracle) = self.oracle.as_mut() {
            let handles = items.iter().map(|c| self.handles[c.0]).collect::<Vec<LpHandle>>();
            oracle.add_core(&handles);
        }
    }

    /// Computes the bound of the root, once every core has been added
    pub fn initialize(&mut self) -> Weight {
        if let Some(oracle) = self.oracle.as_mut() {
            let bound = oracle.solve();
            self.cached[0] = bound;
        }
        self.cached[0]
    }

    pub fn fix(&mut self, constraint: ConstraintIndex, satisfied: bool) {
        if let Some(oracle) = self.oracle.as_mut() {
            oracle.fix(self.handles[constraint.0], satisfied);
        }
    }

    pub fn reset(&mut self, constraint: ConstraintIndex) {
        if let Some(oracle) = self.oracle.as_mut() {
            oracle.reset(self.handles[constraint.0]);
        }
    }

    pub fn open_scope(&mut self) {
        let last = self.cached();
        self.cached.push(last);
        if let Some(oracle) = self.oracle.as_mut() {
            oracle.open_scope();
        }
    }

    pub fn close_scope(&mut self) {
        debug_assert!(self.cached.len() > 1);
        self.cached.pop();
        if let Some(oracle) = self.oracle.as_mut() {
            oracle.close_scope();
        }
    }

    /// Last bound computed in this scope or an enclosing one
    pub fn cached(&self) -> Weight {
        self.cached.last().copied().unwrap_or(0)
    }

    /// Solves the relaxation and caches the result for the current scope
    pub fn solve(&mut self) -> Weight {
        if let Some(oracle) = self.oracle.as_mut() {
            self.calls += 1;
            let start = Instant::now();
            let bound = oracle.solve();
            self.time += start.elapsed();
            trace!("relaxation bound {}", bound);
            if let Some(last) = self.cached.last_mut() {
                *last = bound;
            }
        }
        self.cached()
    }

    pub fn induced_independence(&self, x: usize, y: usize) -> bool {
        self.oracle.as_ref().is_some_and(|o| o.induced_independence(x, y))
    }

    /// Number of times the relaxation was solved during the search
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn time(&self) -> Duration {
        self.time
    }
}

#[cfg(test)]
mod test_oracle {
    use super::*;
    use crate::core::bitset::VarSet;

    fn instance() -> Instance {
        Instance::from_constraints(vec![
            Constraint::independence(0, 2, VarSet::empty(), 3),
            Constraint::independence(0, 1, VarSet::empty(), 4),
            Constraint::dependence(0, 2, VarSet::singleton(1), 5),
            Constraint::dependence(1, 2, VarSet::empty(), 7),
        ])
    }

    fn core(instance: &Instance) -> Vec<ConstraintIndex> {
        vec![
            instance.find(0, 2, VarSet::empty(), VarSet::empty()).unwrap(),
            instance.find(0, 1, VarSet::empty(), VarSet::empty()).unwrap(),
            instance.find(0, 2, VarSet::singleton(1), VarSet::empty()).unwrap(),
        ]
    }

    #[test]
    fn packing_bound() {
        let instance = instance();
        let mut lp = LpBound::new(&instance, Some(Box::new(CorePackingOracle::new())));
        let core = core(&instance);
        lp.add_core(&core);
        assert_eq!(3, lp.initialize());

        lp.open_scope();
        lp.fix(core[0], true);
        assert_eq!(3, lp.cached());
        assert_eq!(4, lp.solve());
        assert_eq!(1, lp.calls());

        lp.open_scope();
        let other = instance.find(1, 2, VarSet::empty(), VarSet::empty()).unwrap();
        lp.fix(other, false);
        assert_eq!(4, lp.cached());
        assert_eq!(11, lp.solve());
        lp.reset(other);
        lp.close_scope();
        assert_eq!(4, lp.cached());

        lp.fix(core[2], false);
        assert_eq!(5, lp.solve());
        lp.reset(core[2]);
        lp.reset(core[0]);
        lp.close_scope();
        assert_eq!(3, lp.cached());
    }

    #[test]
    fn overlapping_cores_are_not_counted_twice() {
        let instance = instance();
        let mut lp = LpBound::new(&instance, Some(Box::new(CorePackingOracle::new())));
        let core = core(&instance);
        lp.add_core(&core);
        lp.add_core(&core[1..]);
        assert_eq!(3, lp.initialize());
    }

    #[test]
    fn disabled_bound_is_zero() {
        let instance = instance();
        let mut lp = LpBound::new(&instance, None);
        lp.add_core(&core(&instance));
        assert!(!lp.is_enabled());
        assert_eq!(0, lp.initialize());
        lp.open_scope();
        assert_eq!(0, lp.solve());
        assert_eq!(0, lp.calls());
        lp.close_scope();
        assert!(!LpBound::disabled().is_enabled());
    }
}
