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

//! Incremental classification of the constraints during the search.
//!
//! A constraint is open until the partial graph decides it: a dependence (resp. independence)
//! constraint is satisfied (resp. violated) as soon as the minimal completion has an active trail
//! between its endpoints, and violated (resp. satisfied) as soon as the maximal completion has
//! none. The total weight of the violated constraints is a lower bound on the weight of every
//! graph extending the partial graph.
//!
//! Each call to `update` opens a scope in which the constraints classified because of the last
//! decision are recorded. Only the constraints over pairs for which the decision is relevant are
//! evaluated, in the minimal completion for a present decision and in the maximal completion for
//! an absent one. Closing the scope restores the state manager, which reverts the statuses, the
//! open lists, the pair statistics, the accumulator and the core counters.

use std::time::{Duration, Instant};

use search_trail::{StateManager, SaveAndRestore, ReversibleUsize, UsizeManager};

use crate::common::Separation;
use crate::cores::CoreSet;
use crate::core::bitset::VarSet;
use crate::core::completion::{Completion, Policy};
use crate::core::constraint::{ConstraintIndex, Weight};
use crate::core::edge::Edge;
use crate::core::graph::PartialGraph;
use crate::core::instance::Instance;
use crate::core::pair_stats::PairStats;
use crate::core::sparse_set::SparseSet;
use crate::oracle::LpBound;
use crate::relevancy::{naive_bottleneck, RelevancyFilter};
use crate::separation::SeparationEngine;

const OPEN: usize = 0;
const SATISFIED: usize = 1;
const VIOLATED: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintStatus {
    Open,
    Satisfied,
    Violated,
}

/// Options of the constraint evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationParameters {
    pub separation: Separation,
    /// Skip pairs certified irrelevant by the structural rules
    pub relevancy_rules: bool,
    /// Skip pairs whose trails do not reach the decided pair
    pub relevancy_algorithm: bool,
    /// Propagate the unsatisfiable cores during the search
    pub core_propagation: bool,
}

impl Default for EvaluationParameters {
    fn default() -> Self {
        Self {
            separation: Separation::D,
            relevancy_rules: true,
            relevancy_algorithm: false,
            core_propagation: false,
        }
    }
}

pub struct BoundMaintainer {
    params: EvaluationParameters,
    n: usize,
    stats: PairStats,
    /// Open constraints of each pair, indexed by x + y * n with x < y
    lists: Vec<SparseSet<ConstraintIndex>>,
    status: Vec<ReversibleUsize>,
    /// Weight of the violated constraints
    accumulator: ReversibleUsize,
    /// Accumulator at the opening of each scope
    bases: Vec<Weight>,
    /// Constraints classified in each scope
    removed: Vec<Vec<ConstraintIndex>>,
    cores: Option<CoreSet>,
    lp: LpBound,
    evaluation_time: Duration,
}

impl BoundMaintainer {

    pub fn new(instance: &Instance, params: EvaluationParameters, lp: LpBound, state: &mut StateManager) -> Self {
        let n = instance.size();
        let stats = PairStats::new(instance, state);
        let mut lists = (0..n * n).map(|_| SparseSet::new(state)).collect::<Vec<SparseSet<ConstraintIndex>>>();
        for c in instance.independent().iter().chain(instance.dependent().iter()).copied() {
            let constraint = &instance[c];
            lists[constraint.v1() + constraint.v2() * n].add(c, state);
        }
        let status = instance.constraints_iter().map(|_| state.manage_usize(OPEN)).collect();
        let accumulator = state.manage_usize(0);
        let cores = if params.core_propagation { Some(CoreSet::new(instance, state)) } else { None };
        Self {
            params,
            n,
            stats,
            lists,
            status,
            accumulator,
            bases: vec![],
            removed: vec![],
            cores,
            lp,
            evaluation_time: Duration::ZERO,
        }
    }

    pub fn parameters(&self) -> EvaluationParameters {
        self.params
    }

    pub fn stats(&self) -> &PairStats {
        &self.stats
    }

    /// Registers an unsatisfiable core. Must be called before the first scope is opened.
    pub fn add_core(&mut self, items: &[ConstraintIndex], state: &mut StateManager) {
        debug_assert!(self.bases.is_empty());
        if let Some(cores) = self.cores.as_mut() {
            cores.add(items, state);
        }
        self.lp.add_core(items);
    }

    /// Returns true if a relaxation oracle strengthens the bound
    pub fn has_relaxation(&self) -> bool {
        self.lp.is_enabled()
    }

    /// Computes the relaxation bound of the root, once all the cores are added
    pub fn initialize(&mut self) -> Weight {
        self.lp.initialize()
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.bases.len()
    }

    pub fn open_scope(&mut self, state: &mut StateManager) {
        self.bases.push(state.get_usize(self.accumulator));
        self.removed.push(vec![]);
        state.save_state();
        self.lp.open_scope();
    }

    pub fn close_scope(&mut self, state: &mut StateManager) {
        debug_assert!(!self.bases.is_empty());
        if let Some(removed) = self.removed.pop() {
            for c in removed.into_iter().rev() {
                self.lp.reset(c);
            }
        }
        state.restore_state();
        self.bases.pop();
        self.lp.close_scope();
    }

    /// Closes every open scope
    pub fn clear(&mut self, state: &mut StateManager) {
        while !self.bases.is_empty() {
            self.close_scope(state);
        }
    }

    pub fn status(&self, constraint: ConstraintIndex, state: &StateManager) -> ConstraintStatus {
        match state.get_usize(self.status[constraint.0]) {
            SATISFIED => ConstraintStatus::Satisfied,
            VIOLATED => ConstraintStatus::Violated,
            _ => ConstraintStatus::Open,
        }
    }

    pub fn is_open(&self, constraint: ConstraintIndex, state: &StateManager) -> bool {
        self.status(constraint, state) == ConstraintStatus::Open
    }

    /// Number of open constraints over the pair
    pub fn open_constraints(&self, x: usize, y: usize, state: &StateManager) -> usize {
        let (x, y) = if x < y { (x, y) } else { (y, x) };
        self.lists[x + y * self.n].len(state)
    }

    /// Records the classification of an open constraint in the current scope
    pub fn set(&mut self, constraint: ConstraintIndex, satisfied: bool, instance: &Instance, state: &mut StateManager) {
        debug_assert!(self.is_open(constraint, state));
        self.lp.fix(constraint, satisfied);
        if let Some(cores) = self.cores.as_mut() {
            if satisfied {
                cores.mark_satisfied(constraint, instance, state);
            } else {
                cores.mark_unsatisfied(constraint, instance, state);
            }
        }
        if let Some(removed) = self.removed.last_mut() {
            removed.push(constraint);
        }
        self.stats.remove(constraint, instance, state);
        let c = &instance[constraint];
        self.lists[c.v1() + c.v2() * self.n].remove(constraint, state);
        if satisfied {
            state.set_usize(self.status[constraint.0], SATISFIED);
        } else {
            state.set_usize(self.status[constraint.0], VIOLATED);
            let acc = state.get_usize(self.accumulator);
            state.set_usize(self.accumulator, acc + c.weight());
        }
    }

    /// Weight of the constraints classified as violated
    pub fn lb(&self, state: &StateManager) -> Weight {
        state.get_usize(self.accumulator)
    }

    /// Returns true if the current scope classified a violated constraint
    pub fn has_more_information(&self, state: &StateManager) -> bool {
        match self.bases.last() {
            None => true,
            Some(base) => *base != self.lb(state),
        }
    }

    /// Returns true if x and y are known to be non-adjacent in every extension
    pub fn found_independence(&self, x: usize, y: usize, state: &StateManager) -> bool {
        self.cores.as_ref().is_some_and(|cores| cores.induced_independence(x, y, state)) ||
            self.lp.induced_independence(x, y)
    }

    /// Lower bound used for pruning, given the weight of the incumbent
    pub fn lowerbound(&mut self, ub: Weight, state: &StateManager) -> Weight {
        let mut naive = self.lb(state);
        if let Some(cores) = self.cores.as_ref() {
            naive += cores.pending_weight(state);
        }
        if self.lp.is_enabled() && self.has_more_information(state) &&
           naive < ub && ub <= naive.saturating_add(self.lp.cached()) {
            self.lp.solve();
        }
        naive.max(self.lp.cached())
    }

    /// Number of calls to the relaxation solver
    pub fn lp_calls(&self) -> usize {
        self.lp.calls()
    }

    pub fn evaluation_time(&self) -> Duration {
        self.evaluation_time
    }

    /// Time spent solving the relaxation
    pub fn lp_time(&self) -> Duration {
        self.lp.time()
    }

    /// Opens a scope and classifies the open constraints that the decision, already applied on the
    /// graph, may have decided.
    pub fn update(&mut self, graph: &PartialGraph, decision: &Edge, instance: &Instance, state: &mut StateManager) {
        let start = Instant::now();
        self.open_scope(state);
        let classified = self.evaluate(graph, decision, instance, state);
        for (constraint, satisfied) in classified {
            self.set(constraint, satisfied, instance, state);
        }
        self.evaluation_time += start.elapsed();
    }

    fn evaluate(&self, graph: &PartialGraph, decision: &Edge, instance: &Instance, state: &StateManager) -> Vec<(ConstraintIndex, bool)> {
        let acyclic = graph.limits().acyclic;
        let oracle = |edge: &Edge| {
            if acyclic && edge.is_directed() && graph.has_directed_path(edge.effect(), edge.cause()) {
                return false;
            }
            self.found_independence(edge.x(), edge.y(), state)
        };
        let policy = if decision.is_absent() { Policy::Maximal } else { Policy::Minimal };
        let maximal = policy == Policy::Maximal;
        let completion = Completion::with_oracle(graph, policy, &oracle);
        let mut filter = RelevancyFilter::new(&completion, *decision, self.params.separation, self.params.relevancy_rules, self.params.relevancy_algorithm);
        let mut engine = SeparationEngine::new(&completion, self.params.separation);

        let mut classified = vec![];
        for y in 1..self.n {
            for x in 0..y {
                if !self.stats.has_open_weight(x, y, state) || !filter.relevant_for(x, y) {
                    continue;
                }
                let mut bneck = filter.bottleneck();
                if self.params.relevancy_rules {
                    let endpoints = VarSet::singleton(x).with(y);
                    bneck |= naive_bottleneck(&completion, x, None, endpoints, decision);
                    bneck |= naive_bottleneck(&completion, y, None, endpoints, decision);
                }
                if decision.is_absent() {
                    bneck.forget(decision.x());
                    bneck.forget(decision.y());
                }
                for constraint in self.lists[x + y * self.n].iter(state) {
                    let c = &instance[constraint];
                    if !bneck.admits(c.condition()) {
                        continue;
                    }
                    // A trail in the minimal completion, or no trail in the maximal one, is final
                    let trail = engine.has_active_trail(c);
                    if trail != maximal {
                        classified.push((constraint, trail != c.is_independence()));
                    }
                }
            }
        }
        classified
    }

    /// Exact weight of the graph in which the undecided edges are absent. The classified
    /// constraints are not evaluated again.
    pub fn calculate_final_weight(&self, graph: &PartialGraph, instance: &Instance, state: &StateManager) -> Weight {
        let completion = Completion::new(graph, Policy::Minimal);
        let mut engine = SeparationEngine::new(&completion, self.params.separation);
        let mut weight = self.lb(state);
        for y in 1..self.n {
            for x in 0..y {
                if !self.stats.has_open_weight(x, y, state) {
                    continue;
                }
                for constraint in self.lists[x + y * self.n].iter(state) {
                    let c = &instance[constraint];
                    if engine.has_active_trail(c) == c.is_independence() {
                        weight += c.weight();
                    }
                }
            }
        }
        debug_assert_eq!(weight, self.naive_weight(graph, instance));
        weight
    }

    /// Weight of the graph in which the undecided edges are absent, computed from scratch
    pub fn naive_weight(&self, graph: &PartialGraph, instance: &Instance) -> Weight {
        let completion = Completion::new(graph, Policy::Minimal);
        let mut engine = SeparationEngine::new(&completion, self.params.separation);
        instance.constraints_iter()
            .map(|c| &instance[c])
            .filter(|c| engine.has_active_trail(c) == c.is_independence())
            .map(|c| c.weight())
            .sum()
    }

    /// Lower bound computed from scratch: the independence constraints with a trail in the minimal
    /// completion and the dependence constraints without trail in the maximal completion
    pub fn naive_lb(&self, graph: &PartialGraph, instance: &Instance) -> Weight {
        let min = Completion::new(graph, Policy::Minimal);
        let max = Completion::new(graph, Policy::Maximal);
        let mut min_engine = SeparationEngine::new(&min, self.params.separation);
        let mut max_engine = SeparationEngine::new(&max, self.params.separation);
        let indeps = instance.independent().iter()
            .map(|c| &instance[*c])
            .filter(|c| min_engine.has_active_trail(c))
            .map(|c| c.weight())
            .sum::<Weight>();
        let deps = instance.dependent().iter()
            .map(|c| &instance[*c])
            .filter(|c| !max_engine.has_active_trail(c))
            .map(|c| c.weight())
            .sum::<Weight>();
        indeps + deps
    }
}
