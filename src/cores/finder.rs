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

//! Offline search of small unsatisfiable cores. Seven patterns over three or four variables are
//! matched against the constraints of each experimental regime. For a pattern to match, every
//! constraint of the pattern must be in the instance with the right polarity.
//!
//! Every pattern has a constraint conditioned on S or on S plus one variable, so the conditioning
//! sets S that are tried are the ones that appear in the regime and those sets minus one variable.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::core::bitset::VarSet;
use crate::core::constraint::ConstraintIndex;
use crate::core::instance::Instance;

/// Largest core produced by the patterns
const MAX_CORE_SIZE: usize = 5;

pub struct CoreFinder {
    cores_by_size: Vec<Vec<Vec<ConstraintIndex>>>,
    seen: FxHashSet<Vec<ConstraintIndex>>,
}

impl Default for CoreFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Views the instance through the regime and polarity of a pattern
struct Regime<'a> {
    instance: &'a Instance,
    intervention: VarSet,
}

impl<'a> Regime<'a> {
    fn indep(&self, x: usize, y: usize, s: VarSet) -> Option<ConstraintIndex> {
        self.instance.find_independence(x, y, s, self.intervention)
    }

    fn dep(&self, x: usize, y: usize, s: VarSet) -> Option<ConstraintIndex> {
        self.instance.find_dependence(x, y, s, self.intervention)
    }
}

impl CoreFinder {

    pub fn new() -> Self {
        Self {
            cores_by_size: vec![vec![]; MAX_CORE_SIZE + 1],
            seen: FxHashSet::default(),
        }
    }

    /// Number of distinct cores found
    pub fn count(&self) -> usize {
        self.cores_by_size.iter().map(|cores| cores.len()).sum()
    }

    /// Iterates over the cores by increasing size
    pub fn iter(&self) -> impl Iterator<Item = &[ConstraintIndex]> {
        self.cores_by_size.iter().flat_map(|cores| cores.iter().map(|core| core.as_slice()))
    }

    fn add_core(&mut self, core: Option<Vec<ConstraintIndex>>) {
        if let Some(core) = core {
            let mut key = core.clone();
            key.sort();
            if self.seen.insert(key) {
                self.cores_by_size[core.len()].push(core);
            }
        }
    }

    pub fn gather(&mut self, instance: &Instance) {
        for (intervention, constraints) in instance.by_intervention().iter() {
            let regime = Regime { instance, intervention: *intervention };
            let mut candidates = FxHashSet::<VarSet>::default();
            for c in constraints.iter() {
                let condition = instance[*c].condition();
                candidates.insert(condition);
                for v in condition.iter() {
                    candidates.insert(condition.without(v));
                }
            }
            let mut candidates = candidates.into_iter().collect::<Vec<VarSet>>();
            candidates.sort();
            self.gather_regime(&regime, &candidates);
        }
        debug!("{} unsatisfiable cores gathered", self.count());
    }

    fn gather_regime(&mut self, regime: &Regime, candidates: &[VarSet]) {
        let n = regime.instance.size();
        for x in 0..n {
            for y in 0..n {
                if x == y {
                    continue;
                }
                for z in 0..n {
                    if z == x || z == y {
                        continue;
                    }
                    for s in candidates.iter().copied() {
                        if s.contains(x) || s.contains(y) || s.contains(z) {
                            continue;
                        }
                        self.add_core(pattern1(regime, s, x, y, z));
                        if x < y {
                            self.add_core(pattern2(regime, s, x, y, z));
                        }
                        self.add_core(pattern3(regime, s, x, y, z));

                        for w in 0..n {
                            if w == x || w == y || w == z || s.contains(w) {
                                continue;
                            }
                            self.add_core(pattern4(regime, s, x, y, z, w));
                            self.add_core(pattern5(regime, s, x, y, z, w));
                            self.add_core(pattern6(regime, s, x, y, z, w));
                            self.add_core(pattern7(regime, s, x, y, z, w));
                        }
                    }
                }
            }
        }
    }
}

fn pattern1(r: &Regime, s: VarSet, x: usize, y: usize, z: usize) -> Option<Vec<ConstraintIndex>> {
    Some(vec![
        r.indep(x, z, s)?,
        r.indep(x, y, s)?,
        r.dep(x, z, s.with(y))?,
    ])
}

fn pattern2(r: &Regime, s: VarSet, x: usize, y: usize, z: usize) -> Option<Vec<ConstraintIndex>> {
    Some(vec![
        r.dep(x, z, s)?,
        r.dep(y, z, s)?,
        r.indep(x, y, s)?,
        r.indep(x, y, s.with(z))?,
    ])
}

fn pattern3(r: &Regime, s: VarSet, x: usize, y: usize, z: usize) -> Option<Vec<ConstraintIndex>> {
    Some(vec![
        r.dep(x, z, s.with(y))?,
        r.dep(y, z, s.with(x))?,
        r.indep(x, y, s)?,
        r.indep(x, y, s.with(z))?,
    ])
}

fn pattern4(r: &Regime, s: VarSet, x: usize, y: usize, z: usize, w: usize) -> Option<Vec<ConstraintIndex>> {
    Some(vec![
        r.dep(y, z, s)?,
        r.dep(x, z, s)?,
        r.indep(z, w, s.with(x).with(y))?,
        r.indep(x, y, s.with(z))?,
        r.indep(x, y, s.with(w))?,
    ])
}

fn pattern5(r: &Regime, s: VarSet, x: usize, y: usize, z: usize, w: usize) -> Option<Vec<ConstraintIndex>> {
    Some(vec![
        r.dep(y, z, s)?,
        r.dep(x, z, s)?,
        r.indep(x, y, s.with(z))?,
        r.indep(z, w, s.with(y))?,
        r.indep(x, y, s.with(w))?,
    ])
}

fn pattern6(r: &Regime, s: VarSet, x: usize, y: usize, z: usize, w: usize) -> Option<Vec<ConstraintIndex>> {
    Some(vec![
        r.dep(x, y, s.with(z))?,
        r.dep(y, z, s.with(x).with(w))?,
        r.dep(w, y, s.with(z))?,
        r.indep(w, x, s.with(z).with(y))?,
        r.indep(x, z, s.with(w))?,
    ])
}

fn pattern7(r: &Regime, s: VarSet, x: usize, y: usize, z: usize, w: usize) -> Option<Vec<ConstraintIndex>> {
    Some(vec![
        r.dep(x, y, s.with(z))?,
        r.dep(y, z, s.with(x).with(w))?,
        r.dep(w, y, s)?,
        r.indep(w, x, s.with(y))?,
        r.indep(x, z, s.with(w))?,
    ])
}

#[cfg(test)]
mod test_finder {
    use super::*;
    use crate::core::constraint::Constraint;

    #[test]
    fn weak_union_violation_is_a_core() {
        // 0 _|_ 2, 0 _|_ 1 and 0 _N_ 2 | {1}
        let instance = Instance::from_constraints(vec![
            Constraint::independence(0, 2, VarSet::empty(), 1),
            Constraint::independence(0, 1, VarSet::empty(), 1),
            Constraint::dependence(0, 2, VarSet::singleton(1), 1),
        ]);
        let mut finder = CoreFinder::new();
        finder.gather(&instance);
        assert_eq!(1, finder.count());
        let core = finder.iter().next().unwrap();
        assert_eq!(3, core.len());
    }

    #[test]
    fn v_structure_violation_is_a_core() {
        // 0 _N_ 2, 1 _N_ 2, 0 _|_ 1 and 0 _|_ 1 | {2}
        let instance = Instance::from_constraints(vec![
            Constraint::dependence(0, 2, VarSet::empty(), 1),
            Constraint::dependence(1, 2, VarSet::empty(), 1),
            Constraint::independence(0, 1, VarSet::empty(), 1),
            Constraint::independence(0, 1, VarSet::singleton(2), 1),
        ]);
        let mut finder = CoreFinder::new();
        finder.gather(&instance);
        assert!(finder.count() >= 1);
        assert!(finder.iter().any(|core| core.len() == 4));
    }

    #[test]
    fn regimes_are_not_mixed() {
        let instance = Instance::from_constraints(vec![
            Constraint::independence(0, 2, VarSet::empty(), 1),
            Constraint::independence(0, 1, VarSet::empty(), 1),
            Constraint::dependence(0, 2, VarSet::singleton(1), 1).with_intervention(VarSet::singleton(3)),
        ]);
        let mut finder = CoreFinder::new();
        finder.gather(&instance);
        assert_eq!(0, finder.count());
    }

    #[test]
    fn consistent_constraints_have_no_core() {
        // Chain 0 -> 1 -> 2
        let instance = Instance::from_constraints(vec![
            Constraint::dependence(0, 1, VarSet::empty(), 1),
            Constraint::dependence(1, 2, VarSet::empty(), 1),
            Constraint::dependence(0, 2, VarSet::empty(), 1),
            Constraint::independence(0, 2, VarSet::singleton(1), 1),
        ]);
        let mut finder = CoreFinder::new();
        finder.gather(&instance);
        assert_eq!(0, finder.count());
    }
}
