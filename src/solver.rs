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

use std::time::Instant;

use search_trail::StateManager;
use tracing::{debug, trace, warn};

use crate::bound::BoundMaintainer;
use crate::branching::BranchingDecision;
use crate::common::Solution;
use crate::cores::CoreFinder;
use crate::core::bitset::VarSet;
use crate::core::completion::{Completion, Policy};
use crate::core::constraint::Weight;
use crate::core::edge::Edge;
use crate::core::graph::PartialGraph;
use crate::core::instance::Instance;
use crate::separation::SeparationEngine;
use crate::statistics::Statistics;
use crate::PEAK_ALLOC;

/// Parameters of the search
#[derive(Debug, Clone, Copy)]
pub struct SolverParameters {
    /// Only graphs strictly better than this weight are reported
    starting_ub: Weight,
    /// After adding x -> y with x not yet pointed, the next added edge must point into x
    symmetry1: bool,
    /// Do not add cause -> effect if the graph has an inducing trail from cause to effect
    symmetry2: bool,
    /// Maximum number of unsatisfiable cores fed to the bound
    max_cores: usize,
    /// Time limit for the search, in seconds
    timeout: u64,
    /// Maximum number of visited branches
    node_limit: usize,
    /// Time at which the solving started
    start: Instant,
}

impl SolverParameters {
    pub fn new(starting_ub: Weight, symmetry1: bool, symmetry2: bool, max_cores: usize, timeout: u64, node_limit: usize) -> Self {
        Self {
            starting_ub,
            symmetry1,
            symmetry2,
            max_cores,
            timeout,
            node_limit,
            start: Instant::now(),
        }
    }
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self::new(Weight::MAX, false, false, 100000, u64::MAX, usize::MAX)
    }
}

/// Branch-and-bound search over the partial graphs. Each node of the search picks an undecided
/// edge and explores the graphs in which it is present and absent. A branch is closed when the
/// lower bound maintained by the `BoundMaintainer` reaches the weight of the best graph found so
/// far, or when every edge is decided. In the latter case, the weight of the graph is computed and
/// the graph replaces the incumbent if it is better.
///
/// Taking a decision is done in the following order: the graph is updated, then the bound
/// maintainer opens a scope and classifies the constraints. Backtracking undoes it in the reverse
/// order.
pub struct Solver<B: BranchingDecision, const S: bool> {
    instance: Instance,
    graph: PartialGraph,
    bounds: BoundMaintainer,
    /// Manages (save/restore) the reversible state of the bound maintainer
    state: StateManager,
    /// Heuristics that decide on which edge to branch next
    branching_heuristic: Box<B>,
    /// Decisions applied before the search, kept for the whole search
    fixings: Vec<Edge>,
    statistics: Statistics<S>,
    parameters: SolverParameters,
    /// Weight of the incumbent
    ub: Weight,
    best: Option<Solution>,
    /// Variables that have received an arrowhead
    pointed: VarSet,
    visited: usize,
    interrupted: bool,
}

impl<B: BranchingDecision, const S: bool> Solver<B, S> {
    pub fn new(
        instance: Instance,
        graph: PartialGraph,
        bounds: BoundMaintainer,
        state: StateManager,
        branching_heuristic: Box<B>,
        fixings: Vec<Edge>,
        parameters: SolverParameters,
    ) -> Self {
        Self {
            instance,
            graph,
            bounds,
            state,
            branching_heuristic,
            fixings,
            statistics: Statistics::default(),
            parameters,
            ub: parameters.starting_ub,
            best: None,
            pointed: VarSet::empty(),
            visited: 0,
            interrupted: false,
        }
    }

    /// Solves the instance and returns the best graph found
    pub fn search(&mut self) -> Solution {
        self.parameters.start = Instant::now();
        self.feed_cores();
        self.apply_fixings();
        self.find_naive_ub();
        match self.best.as_ref() {
            Some(solution) => {
                println!("Initial UB ({} ms)", self.parameters.start.elapsed().as_millis());
                solution.print();
            },
            None => println!("Searching, starting with the given initial UB of {}...", self.ub),
        }
        self.branching_heuristic.init(&self.graph, &self.bounds, &self.state);
        self.statistics.initialized(self.parameters.start.elapsed());

        self.select_next_edge(0, None);

        if self.interrupted {
            warn!("search interrupted after {} branches, the best graph found may not be optimal", self.visited);
        }
        self.statistics.finish(
            self.bounds.lp_calls(),
            self.bounds.evaluation_time(),
            self.bounds.lp_time(),
            self.parameters.start.elapsed(),
            PEAK_ALLOC.peak_usage_as_mb(),
        );
        self.statistics.print();
        let mut solution = match self.best.as_ref() {
            Some(solution) => solution.clone(),
            None => Solution::none(self.ub, self.instance.offset()),
        };
        solution.set_optimal(!self.interrupted);
        solution
    }

    /// Gathers the unsatisfiable cores and hands them to the bound maintainer
    fn feed_cores(&mut self) {
        if self.bounds.parameters().core_propagation || self.bounds.has_relaxation() {
            let mut finder = CoreFinder::new();
            finder.gather(&self.instance);
            if finder.count() > self.parameters.max_cores {
                debug!("keeping {} of the {} cores", self.parameters.max_cores, finder.count());
            }
            for core in finder.iter().take(self.parameters.max_cores) {
                self.bounds.add_core(core, &mut self.state);
            }
        }
        let root = self.bounds.initialize();
        debug!("relaxation bound at the root: {}", root);
    }

    fn apply_fixings(&mut self) {
        let fixings = std::mem::take(&mut self.fixings);
        for decision in fixings {
            if !self.graph.is_decidable(&decision) {
                warn!("ignoring fixed edge {}: it conflicts with another fixed edge", decision.notation(self.instance.offset()));
                continue;
            }
            if decision.is_present() && decision.is_directed() && self.graph.limits().acyclic &&
               !self.graph.retains_acyclicity(decision.cause(), decision.effect()) {
                warn!("ignoring fixed edge {}: it closes a directed cycle", decision.notation(self.instance.offset()));
                continue;
            }
            debug!("fixing {}", decision.notation(self.instance.offset()));
            self.update(&decision);
            self.fixings.push(decision);
        }
    }

    /// Greedily adds the edges of the heaviest dependence constraints, keeping the best graph seen
    fn find_naive_ub(&mut self) {
        let weight = self.bounds.naive_weight(&self.graph, &self.instance);
        self.update_ub(weight, false);

        let mut added = vec![];
        for i in 0..self.instance.dependent().len() {
            let c = &self.instance[self.instance.dependent()[i]];
            let edge = Edge::directed(c.v1(), c.v2());
            if !self.graph.is_decidable(&edge) {
                continue;
            }
            if self.graph.limits().acyclic && !self.graph.retains_acyclicity(c.v1(), c.v2()) {
                continue;
            }
            if !self.graph.could_add_more_edges(c.v1(), c.v2()) {
                continue;
            }
            self.graph.decide(&edge);
            added.push(edge);
            let weight = self.bounds.naive_weight(&self.graph, &self.instance);
            self.update_ub(weight, false);
        }
        for edge in added.iter().rev() {
            self.graph.undecide(edge);
        }
    }

    /// Replaces the incumbent if the current graph, with undecided edges absent, is better
    fn update_ub(&mut self, weight: Weight, at_bottom: bool) -> bool {
        if at_bottom {
            self.statistics.bottom();
        }
        if weight >= self.ub {
            return false;
        }
        self.ub = weight;
        let solution = Solution::new(self.graph.present(), weight, self.instance.offset(), self.parameters.start.elapsed().as_millis());
        if at_bottom {
            println!("New UB found ({})", chrono::Local::now().format("%H:%M:%S%.3f"));
            solution.print();
        }
        self.best = Some(solution);
        true
    }

    fn budget_exhausted(&self) -> bool {
        self.visited >= self.parameters.node_limit || self.parameters.start.elapsed().as_secs() >= self.parameters.timeout
    }

    fn select_next_edge(&mut self, depth: usize, to_be_pointed: Option<usize>) {
        if self.interrupted || self.budget_exhausted() {
            self.interrupted = true;
            return;
        }
        self.visited += 1;
        self.statistics.branch();
        let lb = self.bounds.lowerbound(self.ub, &self.state);
        if lb >= self.ub {
            self.statistics.good_lb();
            trace!("close branch: LB {} >= UB {}", lb, self.ub);
            return;
        }

        let edge = match self.branching_heuristic.branch_on(&self.graph, &self.bounds, &self.state, to_be_pointed) {
            Some(edge) => edge,
            None => {
                trace!("close branch: no more edge decisions at depth {}", depth);
                let weight = self.bounds.calculate_final_weight(&self.graph, &self.instance, &self.state);
                self.update_ub(weight, true);
                if to_be_pointed.is_some() {
                    self.statistics.symmetry1();
                }
                return;
            },
        };

        if self.branching_heuristic.present_first(&self.graph, &self.bounds, &edge, &self.state) {
            self.branch(edge, depth, to_be_pointed);
            self.branch(edge.negation(), depth, to_be_pointed);
        } else {
            self.branch(edge.negation(), depth, to_be_pointed);
            self.branch(edge, depth, to_be_pointed);
        }
    }

    fn branch(&mut self, decision: Edge, depth: usize, to_be_pointed: Option<usize>) {
        if self.interrupted {
            return;
        }
        let pointed = self.pointed;
        if decision.is_present() {
            if decision.is_directed() {
                self.pointed.insert(decision.effect());
            } else {
                self.pointed.insert(decision.x());
                self.pointed.insert(decision.y());
            }
        }

        if self.retains_validity(&decision) {
            trace!("deciding {} at depth {}", decision, depth);
            self.update(&decision);
            let mut next = to_be_pointed;
            if decision.is_present() && self.parameters.symmetry1 {
                next = None;
                if decision.is_directed() && !self.pointed.contains(decision.cause()) {
                    next = Some(decision.cause());
                }
            }
            self.select_next_edge(depth + 1, next);
            self.reset(&decision);
        }
        self.pointed = pointed;
    }

    /// Returns true if the decision can be applied to the current graph
    fn retains_validity(&mut self, decision: &Edge) -> bool {
        if decision.is_absent() {
            return true;
        }
        if self.bounds.found_independence(decision.x(), decision.y(), &self.state) {
            trace!("can not add {}: independence was deduced", decision);
            self.statistics.extra_indep();
            return false;
        }
        if !self.graph.could_add_more_edges(decision.x(), decision.y()) {
            return false;
        }
        if decision.is_bidirected() {
            return self.graph.could_add_more_bidirected();
        }
        if self.graph.limits().acyclic && !self.graph.retains_acyclicity(decision.cause(), decision.effect()) {
            trace!("close branch: {} introduces a cycle", decision);
            self.statistics.cyclic();
            return false;
        }
        if self.parameters.symmetry2 {
            let completion = Completion::new(&self.graph, Policy::Minimal);
            let mut engine = SeparationEngine::new(&completion, self.bounds.parameters().separation);
            if engine.has_inducing_trail(decision.cause(), decision.effect()) {
                trace!("close branch: symmetry breaking rule #2 on {}", decision);
                self.statistics.symmetry2();
                return false;
            }
        }
        true
    }

    fn update(&mut self, decision: &Edge) {
        self.graph.decide(decision);
        self.bounds.update(&self.graph, decision, &self.instance, &mut self.state);
    }

    fn reset(&mut self, decision: &Edge) {
        self.graph.undecide(decision);
        self.bounds.close_scope(&mut self.state);
    }

    pub fn statistics(&self) -> &Statistics<S> {
        &self.statistics
    }

    /// Number of branches visited by the search
    pub fn visited(&self) -> usize {
        self.visited
    }
}

#[cfg(test)]
mod test_solver {
    use super::*;
    use crate::bound::EvaluationParameters;
    use crate::branching::{RandomBranching, ScoredBranching};
    use crate::common::Heuristic;
    use crate::core::constraint::Constraint;
    use crate::core::graph::GraphLimits;
    use crate::oracle::{CorePackingOracle, LpBound};

    // 0 _|_ 1, 0 _N_ 2 and 1 _N_ 2: 2 must be a collider between 0 and 1
    fn collider() -> Instance {
        Instance::from_constraints(vec![
            Constraint::independence(0, 1, VarSet::empty(), 5),
            Constraint::dependence(0, 2, VarSet::empty(), 3),
            Constraint::dependence(1, 2, VarSet::empty(), 3),
        ])
    }

    // 0 _|_ 1 and 0 _N_ 1 | {2}. The greedy upper bound only finds 0 -> 1, of weight 1
    fn conditioned() -> Instance {
        Instance::from_constraints(vec![
            Constraint::independence(0, 1, VarSet::empty(), 1),
            Constraint::dependence(0, 1, VarSet::singleton(2), 2),
        ])
    }

    fn solver<B: BranchingDecision>(instance: Instance, params: EvaluationParameters, relaxation: bool, limits: GraphLimits, branching: B, fixings: Vec<Edge>, parameters: SolverParameters) -> Solver<B, true> {
        let mut state = StateManager::default();
        let lp = if relaxation {
            LpBound::new(&instance, Some(Box::new(CorePackingOracle::new())))
        } else {
            LpBound::disabled()
        };
        let bounds = BoundMaintainer::new(&instance, params, lp, &mut state);
        let graph = PartialGraph::new(instance.size(), limits);
        Solver::new(instance, graph, bounds, state, Box::new(branching), fixings, parameters)
    }

    fn default_solver<B: BranchingDecision>(instance: Instance, branching: B) -> Solver<B, true> {
        solver(instance, EvaluationParameters::default(), false, GraphLimits::default(), branching, vec![], SolverParameters::default())
    }

    fn assert_collider(solution: &Solution, weight: Weight) {
        assert!(solution.is_found());
        assert!(solution.is_optimal());
        assert_eq!(weight, solution.weight());
        assert!(!solution.adjacent(0, 1));
        assert!(solution.adjacent(0, 2));
        assert!(solution.adjacent(1, 2));
    }

    #[test]
    fn collider_is_found() {
        let mut s = default_solver(collider(), ScoredBranching::new(Heuristic::IndepsFirst));
        assert_collider(&s.search(), 0);
    }

    #[test]
    fn conditioned_collider_with_every_heuristic() {
        for heuristic in [Heuristic::IndepsFirst, Heuristic::DependsFirst, Heuristic::Hybrid] {
            let mut s = default_solver(conditioned(), ScoredBranching::new(heuristic));
            assert_collider(&s.search(), 0);
        }
        for seed in 0..3 {
            let mut s = default_solver(conditioned(), RandomBranching::new(seed));
            assert_collider(&s.search(), 0);
        }
    }

    #[test]
    fn conditioned_collider_with_every_evaluation() {
        let limits = GraphLimits { acyclic: true, ..Default::default() };
        for (rules, algorithm) in [(false, false), (true, false), (true, true)] {
            let params = EvaluationParameters { relevancy_rules: rules, relevancy_algorithm: algorithm, ..Default::default() };
            let mut s = solver(conditioned(), params, false, limits, ScoredBranching::new(Heuristic::IndepsFirst), vec![], SolverParameters::default());
            assert_collider(&s.search(), 0);
        }
    }

    #[test]
    fn collider_with_cores_and_relaxation() {
        // The four constraints over 0, 1 and 2 form a core; the cheapest one is violated
        let mut instance = collider();
        instance.add(Constraint::independence(0, 1, VarSet::singleton(2), 1));
        instance.finalize();
        let params = EvaluationParameters { core_propagation: true, ..Default::default() };
        let limits = GraphLimits { acyclic: true, ..Default::default() };
        let mut s = solver(instance, params, true, limits, ScoredBranching::new(Heuristic::IndepsFirst), vec![], SolverParameters::default());
        assert_collider(&s.search(), 1);
    }

    #[test]
    fn conditioned_collider_with_symmetry_breaking() {
        let parameters = SolverParameters::new(Weight::MAX, true, true, 100000, u64::MAX, usize::MAX);
        let limits = GraphLimits { acyclic: true, ..Default::default() };
        let mut s = solver(conditioned(), EvaluationParameters::default(), false, limits, ScoredBranching::new(Heuristic::Hybrid), vec![], parameters);
        assert_collider(&s.search(), 0);
    }

    #[test]
    fn fixings_are_kept() {
        let fixings = vec![Edge::directed(0, 1)];
        let mut s = solver(collider(), EvaluationParameters::default(), false, GraphLimits::default(), ScoredBranching::new(Heuristic::IndepsFirst), fixings, SolverParameters::default());
        let solution = s.search();
        assert!(solution.has_directed(0, 1));
        assert_eq!(5, solution.weight());
    }

    #[test]
    fn starting_ub_hides_worse_graphs() {
        let fixings = vec![Edge::directed(0, 1)];
        let parameters = SolverParameters::new(5, false, false, 100000, u64::MAX, usize::MAX);
        let mut s = solver(collider(), EvaluationParameters::default(), false, GraphLimits::default(), ScoredBranching::new(Heuristic::IndepsFirst), fixings, parameters);
        let solution = s.search();
        assert!(!solution.is_found());
        assert!(solution.is_optimal());
        assert_eq!(5, solution.weight());
    }

    #[test]
    fn node_limit_interrupts_the_search() {
        let parameters = SolverParameters::new(Weight::MAX, false, false, 100000, u64::MAX, 1);
        let mut s = solver(conditioned(), EvaluationParameters::default(), false, GraphLimits::default(), ScoredBranching::new(Heuristic::IndepsFirst), vec![], parameters);
        let solution = s.search();
        assert!(!solution.is_optimal());
        assert!(solution.is_found());
        assert_eq!(1, solution.weight());
        assert_eq!(1, s.visited());
    }

    #[test]
    fn degree_limit_is_respected() {
        let limits = GraphLimits { max_degree: Some(1), ..Default::default() };
        let mut s = solver(collider(), EvaluationParameters::default(), false, limits, ScoredBranching::new(Heuristic::DependsFirst), vec![], SolverParameters::default());
        let solution = s.search();
        assert!(solution.is_optimal());
        // Only one of the two dependences can be explained
        assert_eq!(3, solution.weight());
        assert_eq!(1, solution.edges().len());
    }

    #[test]
    fn statistics_count_the_branches() {
        let mut s = default_solver(conditioned(), ScoredBranching::new(Heuristic::IndepsFirst));
        s.search();
        assert_eq!(s.visited(), s.statistics().visited_branches());
        assert!(s.statistics().visited_bottom() >= 1);
    }
}
