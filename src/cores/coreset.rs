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

//! Unit propagation over the unsatisfiable cores.
//!
//! Each core keeps two counters: the number of its constraints that are not yet classified, and
//! the number of its constraints classified as violated. When the first counter drops to one while
//! the second is zero, the remaining constraint is forced violated. A forced dependence constraint
//! over (x, y) means that x and y cannot be adjacent, which is reported by `induced_independence`.
//!
//! Every counter lives in the state manager, so that closing a scope of the search undoes the
//! propagations made in it.

use rustc_hash::FxHashMap;
use search_trail::{StateManager, ReversibleUsize, UsizeManager};

use crate::core::constraint::{ConstraintIndex, Weight};
use crate::core::instance::Instance;

const UNDEFINED: usize = 0;
const SATISFIED: usize = 1;
const VIOLATED: usize = 2;

/// Abstraction used as a typesafe way of retrieving a core in the `CoreSet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoreIndex(pub usize);

#[derive(Debug)]
struct Core {
    items: Vec<ConstraintIndex>,
    undefs_left: ReversibleUsize,
    unsats: ReversibleUsize,
}

#[derive(Debug)]
pub struct CoreSet {
    n: usize,
    cores: Vec<Core>,
    /// Cores in which each constraint appears
    lookup: FxHashMap<ConstraintIndex, Vec<CoreIndex>>,
    /// Classification of each constraint, as reported by the bound maintainer
    status: Vec<ReversibleUsize>,
    /// Number of cores that forced each constraint to be violated
    propagated: Vec<ReversibleUsize>,
    /// Number of forced dependence constraints over each pair, indexed by x + y * n with x < y
    unsat_deps: Vec<ReversibleUsize>,
    /// Weight of the constraints forced violated and not yet classified
    pending: ReversibleUsize,
}

impl CoreSet {

    pub fn new(instance: &Instance, state: &mut StateManager) -> Self {
        let n = instance.size();
        let m = instance.number_constraints();
        Self {
            n,
            cores: vec![],
            lookup: FxHashMap::default(),
            status: (0..m).map(|_| state.manage_usize(UNDEFINED)).collect(),
            propagated: (0..m).map(|_| state.manage_usize(0)).collect(),
            unsat_deps: (0..n * n).map(|_| state.manage_usize(0)).collect(),
            pending: state.manage_usize(0),
        }
    }

    pub fn add(&mut self, items: &[ConstraintIndex], state: &mut StateManager) -> CoreIndex {
        let index = CoreIndex(self.cores.len());
        for item in items.iter().copied() {
            self.lookup.entry(item).or_default().push(index);
        }
        self.cores.push(Core {
            items: items.to_vec(),
            undefs_left: state.manage_usize(items.len()),
            unsats: state.manage_usize(0),
        });
        index
    }

    pub fn number_cores(&self) -> usize {
        self.cores.len()
    }

    pub fn core(&self, core: CoreIndex) -> &[ConstraintIndex] {
        &self.cores[core.0].items
    }

    #[inline(always)]
    fn pair_index(&self, x: usize, y: usize) -> usize {
        if x < y { x + y * self.n } else { y + x * self.n }
    }

    fn identify_the_remaining(&self, core: CoreIndex, state: &StateManager) -> Option<ConstraintIndex> {
        self.cores[core.0].items.iter().copied().find(|c| state.get_usize(self.status[c.0]) == UNDEFINED)
    }

    fn propagate(&self, constraint: ConstraintIndex, instance: &Instance, state: &mut StateManager) {
        let c = &instance[constraint];
        if state.get_usize(self.propagated[constraint.0]) == 0 {
            let pending = state.get_usize(self.pending);
            state.set_usize(self.pending, pending.saturating_add(c.weight()));
        }
        state.increment_usize(self.propagated[constraint.0]);
        if !c.is_independence() {
            let pair = self.pair_index(c.v1(), c.v2());
            state.increment_usize(self.unsat_deps[pair]);
        }
    }

    /// Removes the constraint from the pending weight, if it was forced
    fn settle(&self, constraint: ConstraintIndex, instance: &Instance, state: &mut StateManager) {
        if state.get_usize(self.propagated[constraint.0]) > 0 {
            let pending = state.get_usize(self.pending);
            state.set_usize(self.pending, pending - instance[constraint].weight());
        }
    }

    pub fn mark_satisfied(&mut self, constraint: ConstraintIndex, instance: &Instance, state: &mut StateManager) {
        let cores = match self.lookup.get(&constraint) {
            Some(cores) => cores,
            None => return,
        };
        debug_assert_eq!(UNDEFINED, state.get_usize(self.status[constraint.0]));
        self.settle(constraint, instance, state);
        state.set_usize(self.status[constraint.0], SATISFIED);

        for core in cores.iter().copied() {
            let undefs = state.decrement_usize(self.cores[core.0].undefs_left);
            if undefs == 1 && state.get_usize(self.cores[core.0].unsats) == 0 {
                if let Some(remain) = self.identify_the_remaining(core, state) {
                    self.propagate(remain, instance, state);
                }
            }
        }
    }

    pub fn mark_unsatisfied(&mut self, constraint: ConstraintIndex, instance: &Instance, state: &mut StateManager) {
        let cores = match self.lookup.get(&constraint) {
            Some(cores) => cores,
            None => return,
        };
        debug_assert_eq!(UNDEFINED, state.get_usize(self.status[constraint.0]));
        self.settle(constraint, instance, state);
        state.set_usize(self.status[constraint.0], VIOLATED);

        for core in cores.iter() {
            state.increment_usize(self.cores[core.0].unsats);
            state.decrement_usize(self.cores[core.0].undefs_left);
        }
    }

    /// Returns true if a core forced a dependence constraint over (x, y) to be violated
    pub fn induced_independence(&self, x: usize, y: usize, state: &StateManager) -> bool {
        state.get_usize(self.unsat_deps[self.pair_index(x, y)]) > 0
    }

    /// Returns true if some core forced the constraint to be violated
    pub fn is_forced(&self, constraint: ConstraintIndex, state: &StateManager) -> bool {
        state.get_usize(self.propagated[constraint.0]) > 0
    }

    /// Weight of the constraints forced violated that the bound maintainer did not classify yet
    pub fn pending_weight(&self, state: &StateManager) -> Weight {
        state.get_usize(self.pending)
    }
}
