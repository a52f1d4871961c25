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

//! Edge selection heuristics. A heuristic proposes the next present edge to decide, and the
//! polarity to explore first. Every heuristic only proposes edges that are still decidable and, if
//! a variable must receive the next arrowhead (symmetry breaking), edges pointing into it.

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use search_trail::StateManager;

use crate::bound::BoundMaintainer;
use crate::common::Heuristic;
use crate::core::constraint::Weight;
use crate::core::edge::{Edge, EdgeKind};
use crate::core::graph::PartialGraph;

pub trait BranchingDecision {
    /// Returns the next edge to decide, or None if no eligible edge remains
    fn branch_on(&mut self, graph: &PartialGraph, bounds: &BoundMaintainer, state: &StateManager, to_be_pointed: Option<usize>) -> Option<Edge>;
    /// Returns true if the branch in which the edge is present must be explored first
    fn present_first(&mut self, graph: &PartialGraph, bounds: &BoundMaintainer, edge: &Edge, state: &StateManager) -> bool;
    fn init(&mut self, graph: &PartialGraph, bounds: &BoundMaintainer, state: &StateManager);
}

/// Order in which the kinds of edges of a pair are proposed
const KINDS: [EdgeKind; 3] = [EdgeKind::Forward, EdgeKind::Backward, EdgeKind::Bidirected];

fn is_eligible(graph: &PartialGraph, candidate: &Edge, to_be_pointed: Option<usize>) -> bool {
    if !graph.is_decidable(candidate) {
        return false;
    }
    match to_be_pointed {
        None => true,
        Some(v) if candidate.is_directed() => candidate.effect() == v,
        Some(v) => candidate.touches(v),
    }
}

/// Open weights of each pair once the fixings are applied, before the search starts
#[derive(Debug, Default)]
pub struct InitialWeights {
    n: usize,
    indep: Vec<Weight>,
    dep: Vec<Weight>,
    avg_dep: f64,
    avg_ratio: f64,
}

impl InitialWeights {

    pub fn new(bounds: &BoundMaintainer, n: usize, state: &StateManager) -> Self {
        let mut weights = Self {
            n,
            indep: vec![0; n * n],
            dep: vec![0; n * n],
            avg_dep: 0.0,
            avg_ratio: 0.0,
        };
        let pair_count = (n * n.saturating_sub(1) / 2) as f64;
        for y in 1..n {
            for x in 0..y {
                weights.indep[x + y * n] = bounds.stats().indep_weight(x, y, state);
                weights.dep[x + y * n] = bounds.stats().dep_weight(x, y, state);
                weights.avg_dep += weights.dep(x, y) as f64 / pair_count;
                weights.avg_ratio += weights.ratio(x, y) / pair_count;
            }
        }
        weights
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        if x < y { x + y * self.n } else { y + x * self.n }
    }

    pub fn indep(&self, x: usize, y: usize) -> Weight {
        self.indep[self.index(x, y)]
    }

    pub fn dep(&self, x: usize, y: usize) -> Weight {
        self.dep[self.index(x, y)]
    }

    /// (dep + 1) / (indep + 1)
    pub fn ratio(&self, x: usize, y: usize) -> f64 {
        (self.dep(x, y) as f64 + 1.0) / (self.indep(x, y) as f64 + 1.0)
    }

    pub fn avg_dep(&self) -> f64 {
        self.avg_dep
    }

    pub fn avg_ratio(&self) -> f64 {
        self.avg_ratio
    }
}

/// Deterministic heuristics scoring each candidate against the best one found so far. Indeps-first
/// favours the pairs with the most open independence weight, depends-first the pairs that are
/// likely dependent, and hybrid first completes the pairs having the fewest undecided edges.
pub struct ScoredBranching {
    heuristic: Heuristic,
    weights: InitialWeights,
}

impl ScoredBranching {
    pub fn new(heuristic: Heuristic) -> Self {
        Self { heuristic, weights: InitialWeights::default() }
    }

    /// Returns true if the candidate must replace the incumbent
    fn choose(&self, incumbent: &Edge, candidate: &Edge, graph: &PartialGraph, bounds: &BoundMaintainer, state: &StateManager) -> bool {
        let (cx, cy) = (candidate.x(), candidate.y());
        let (ix, iy) = (incumbent.x(), incumbent.y());
        if cx == ix && cy == iy {
            return candidate.kind_order() < incumbent.kind_order();
        }

        if self.heuristic == Heuristic::Hybrid {
            let inc_undecided = graph.undecided_edges(ix, iy);
            let cand_undecided = graph.undecided_edges(cx, cy);
            if inc_undecided != cand_undecided {
                return cand_undecided < inc_undecided;
            }
        }

        let inc_edges = graph.present_edges(ix, iy);
        let cand_edges = graph.present_edges(cx, cy);
        if self.heuristic != Heuristic::IndepsFirst && cand_edges <= inc_edges {
            let cand_free = self.weights.indep(cx, cy) == 0;
            let inc_free = self.weights.indep(ix, iy) == 0;
            if cand_free != inc_free {
                return cand_free;
            }
            let avg = self.weights.avg_dep();
            if self.weights.dep(cx, cy) as f64 > avg || self.weights.dep(ix, iy) as f64 > avg {
                return self.weights.ratio(cx, cy) > self.weights.ratio(ix, iy);
            }
        }

        if self.heuristic != Heuristic::DependsFirst {
            let inc_indep = bounds.stats().indep_weight(ix, iy, state);
            let cand_indep = bounds.stats().indep_weight(cx, cy, state);
            if inc_indep > 0 || cand_indep > 0 {
                return inc_indep < cand_indep;
            }
        }

        if inc_edges != cand_edges {
            return cand_edges < inc_edges;
        }
        bounds.stats().pair_score(ix, iy, state) < bounds.stats().pair_score(cx, cy, state)
    }

    fn add_edge_first(&self, x: usize, y: usize, graph: &PartialGraph) -> bool {
        if graph.present_edges(x, y) > 0 || self.weights.dep(x, y) == 0 {
            return false;
        }
        self.weights.indep(x, y) == 0 || self.weights.ratio(x, y) > self.weights.avg_ratio()
    }
}

impl BranchingDecision for ScoredBranching {
    fn branch_on(&mut self, graph: &PartialGraph, bounds: &BoundMaintainer, state: &StateManager, to_be_pointed: Option<usize>) -> Option<Edge> {
        let mut selected: Option<Edge> = None;
        for y in 1..graph.size() {
            for x in 0..y {
                for kind in KINDS {
                    let candidate = Edge::new(x, y, kind, true);
                    if !is_eligible(graph, &candidate, to_be_pointed) {
                        continue;
                    }
                    let better = match selected.as_ref() {
                        None => true,
                        Some(incumbent) => self.choose(incumbent, &candidate, graph, bounds, state),
                    };
                    if better {
                        selected = Some(candidate);
                    }
                }
            }
        }
        selected
    }

    fn present_first(&mut self, graph: &PartialGraph, bounds: &BoundMaintainer, edge: &Edge, state: &StateManager) -> bool {
        match self.heuristic {
            Heuristic::Hybrid => self.add_edge_first(edge.x(), edge.y(), graph),
            Heuristic::DependsFirst => true,
            Heuristic::IndepsFirst | Heuristic::Random => bounds.stats().indep_weight(edge.x(), edge.y(), state) == 0,
        }
    }

    fn init(&mut self, graph: &PartialGraph, bounds: &BoundMaintainer, state: &StateManager) {
        self.weights = InitialWeights::new(bounds, graph.size(), state);
    }
}

/// Uniform choice among the eligible edges, and a coin flip for the polarity
pub struct RandomBranching {
    rng: StdRng,
}

impl RandomBranching {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl BranchingDecision for RandomBranching {
    fn branch_on(&mut self, graph: &PartialGraph, _bounds: &BoundMaintainer, _state: &StateManager, to_be_pointed: Option<usize>) -> Option<Edge> {
        let mut edges = vec![];
        for y in 1..graph.size() {
            for x in 0..y {
                for kind in KINDS {
                    let candidate = Edge::new(x, y, kind, true);
                    if is_eligible(graph, &candidate, to_be_pointed) {
                        edges.push(candidate);
                    }
                }
            }
        }
        if edges.is_empty() {
            None
        } else {
            Some(edges[self.rng.gen_range(0..edges.len())])
        }
    }

    fn present_first(&mut self, _graph: &PartialGraph, _bounds: &BoundMaintainer, _edge: &Edge, _state: &StateManager) -> bool {
        self.rng.gen_bool(0.5)
    }

    fn init(&mut self, _graph: &PartialGraph, _bounds: &BoundMaintainer, _state: &StateManager) {}
}
