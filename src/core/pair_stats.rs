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

//! Running totals of the weight of the constraints that are still open, per pair of variables
//! and per variable. They are stored in the state manager and follow the search automatically.
//! The heaviest dependence weight of each pair is also kept, but it is computed once on the
//! whole instance and never changes.

use search_trail::{StateManager, ReversibleUsize, UsizeManager};

use super::constraint::{ConstraintIndex, Weight};
use super::instance::Instance;

const DEP: usize = 0;
const INDEP: usize = 1;

pub struct PairStats {
    n: usize,
    /// Open [dependence, independence] weight, indexed by x + y * n with x < y
    pairs: Vec<[ReversibleUsize; 2]>,
    /// Open [dependence, independence] weight of the constraints having the variable as endpoint
    nodes: Vec<[ReversibleUsize; 2]>,
    max_dep: Vec<Weight>,
}

impl PairStats {

    pub fn new(instance: &Instance, state: &mut StateManager) -> Self {
        let n = instance.size();
        let mut pair_totals = vec![[0; 2]; n * n];
        let mut node_totals = vec![[0; 2]; n];
        let mut max_dep = vec![0; n * n];
        for index in instance.constraints_iter() {
            let c = &instance[index];
            let kind = if c.is_independence() { INDEP } else { DEP };
            pair_totals[c.v1() + c.v2() * n][kind] += c.weight();
            node_totals[c.v1()][kind] += c.weight();
            node_totals[c.v2()][kind] += c.weight();
            if !c.is_independence() {
                max_dep[c.v1() + c.v2() * n] = max_dep[c.v1() + c.v2() * n].max(c.weight());
            }
        }
        let pairs = pair_totals.iter().map(|[d, i]| [state.manage_usize(*d), state.manage_usize(*i)]).collect();
        let nodes = node_totals.iter().map(|[d, i]| [state.manage_usize(*d), state.manage_usize(*i)]).collect();
        Self { n, pairs, nodes, max_dep }
    }

    #[inline(always)]
    fn pair_index(&self, x: usize, y: usize) -> usize {
        if x < y { x + y * self.n } else { y + x * self.n }
    }

    /// Removes the weight of a constraint that is no longer open
    pub fn remove(&self, constraint: ConstraintIndex, instance: &Instance, state: &mut StateManager) {
        let c = &instance[constraint];
        let kind = if c.is_independence() { INDEP } else { DEP };
        let w = c.weight();
        let pair = self.pairs[self.pair_index(c.v1(), c.v2())][kind];
        let v = state.get_usize(pair);
        state.set_usize(pair, v - w);
        for node in [c.v1(), c.v2()] {
            let r = self.nodes[node][kind];
            let v = state.get_usize(r);
            state.set_usize(r, v - w);
        }
    }

    pub fn dep_weight(&self, x: usize, y: usize, state: &StateManager) -> Weight {
        state.get_usize(self.pairs[self.pair_index(x, y)][DEP])
    }

    pub fn indep_weight(&self, x: usize, y: usize, state: &StateManager) -> Weight {
        state.get_usize(self.pairs[self.pair_index(x, y)][INDEP])
    }

    /// Returns true if some open constraint is over the pair
    pub fn has_open_weight(&self, x: usize, y: usize, state: &StateManager) -> bool {
        self.dep_weight(x, y, state) > 0 || self.indep_weight(x, y, state) > 0
    }

    /// Open weight, of both polarities, of the constraints having `v` as endpoint
    pub fn node_weight(&self, v: usize, state: &StateManager) -> Weight {
        state.get_usize(self.nodes[v][DEP]) + state.get_usize(self.nodes[v][INDEP])
    }

    /// Heaviest dependence constraint over the pair in the instance
    pub fn max_dep(&self, x: usize, y: usize) -> Weight {
        self.max_dep[self.pair_index(x, y)]
    }

    /// Score of a pair used to break ties between candidate edges
    pub fn pair_score(&self, x: usize, y: usize, state: &StateManager) -> Weight {
        self.node_weight(x, state) + self.node_weight(y, state) + self.max_dep(x, y)
    }
}

#[cfg(test)]
mod test_pair_stats {
    use super::*;
    use crate::core::bitset::VarSet;
    use crate::core::constraint::Constraint;
    use search_trail::SaveAndRestore;

    fn instance() -> Instance {
        Instance::from_constraints(vec![
            Constraint::independence(0, 1, VarSet::empty(), 5),
            Constraint::dependence(0, 1, VarSet::singleton(2), 3),
            Constraint::dependence(0, 1, VarSet::empty().with(2).with(3), 4),
            Constraint::dependence(2, 3, VarSet::empty(), 7),
        ])
    }

    #[test]
    fn initial_totals() {
        let instance = instance();
        let mut state = StateManager::default();
        let stats = PairStats::new(&instance, &mut state);
        assert_eq!(7, stats.dep_weight(1, 0, &state));
        assert_eq!(5, stats.indep_weight(0, 1, &state));
        assert_eq!(12, stats.node_weight(0, &state));
        assert_eq!(7, stats.node_weight(2, &state));
        assert_eq!(4, stats.max_dep(0, 1));
        assert_eq!(12 + 7, stats.pair_score(0, 2, &state));
        assert_eq!(12 + 12 + 4, stats.pair_score(0, 1, &state));
        assert!(!stats.has_open_weight(0, 2, &state));
    }

    #[test]
    fn removal_is_reverted() {
        let instance = instance();
        let mut state = StateManager::default();
        let stats = PairStats::new(&instance, &mut state);
        state.save_state();
        let c = instance.find(0, 1, VarSet::empty(), VarSet::empty()).unwrap();
        stats.remove(c, &instance, &mut state);
        assert_eq!(0, stats.indep_weight(0, 1, &state));
        assert_eq!(7, stats.node_weight(0, &state));
        assert_eq!(7, stats.node_weight(1, &state));
        state.restore_state();
        assert_eq!(5, stats.indep_weight(0, 1, &state));
        assert_eq!(12, stats.node_weight(1, &state));
    }
}
