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

//! This module provides the partial graph explored by the search. For every pair of variables
//! x < y it stores which of the six marks (see `Mark`) have been decided. Besides the marks, the
//! graph maintains
//!     1. The degree of each variable (number of incident present edges, of any kind)
//!     2. The number of present bidirected edges
//!     3. A stack of reachability matrices over the present directed edges.
//!
//! The reachability stack has one frame per present directed decision. Deciding x -> y copies
//! the top frame and closes it transitively: x now reaches everything y reaches, and every
//! variable reaching x reaches everything x reaches. Undeciding the edge pops the frame.
//! Hence acyclicity and ancestry queries are a single bit lookup.
//!
//! The graph is not managed by the state manager: decisions are undone explicitly, in the reverse
//! order in which they were taken.

use super::bitset::VarSet;
use super::edge::{Edge, EdgeKind};
use super::flags::{Mark, PairMarks};

/// Structural limits on the graphs explored by the search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphLimits {
    /// Maximum number of present edges incident to a variable
    pub max_degree: Option<usize>,
    /// Maximum number of present bidirected edges in the graph
    pub max_bidirected: Option<usize>,
    /// If true, the present directed edges must form a DAG
    pub acyclic: bool,
}

#[derive(Debug, Clone)]
pub struct PartialGraph {
    n: usize,
    limits: GraphLimits,
    /// Decided marks, indexed by x + y * n with x < y
    marks: Vec<PairMarks>,
    degree: Vec<usize>,
    bidirected: usize,
    /// reach[k][v] is the set of variables reachable from v by a directed path in frame k
    reach: Vec<Vec<VarSet>>,
}

impl PartialGraph {

    pub fn new(n: usize, limits: GraphLimits) -> Self {
        Self {
            n,
            limits,
            marks: vec![PairMarks::new(); n * n],
            degree: vec![0; n],
            bidirected: 0,
            reach: vec![vec![VarSet::empty(); n]],
        }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn limits(&self) -> GraphLimits {
        self.limits
    }

    #[inline(always)]
    fn pair(&self, x: usize, y: usize) -> PairMarks {
        if x < y {
            self.marks[x + y * self.n]
        } else {
            self.marks[y + x * self.n]
        }
    }

    #[inline(always)]
    fn pair_mut(&mut self, x: usize, y: usize) -> &mut PairMarks {
        debug_assert!(x < y);
        &mut self.marks[x + y * self.n]
    }

    fn top(&self) -> &Vec<VarSet> {
        &self.reach[self.reach.len() - 1]
    }

    /// Applies the decision to the graph. The negation of the decision must not be decided.
    pub fn decide(&mut self, decision: &Edge) {
        debug_assert!(self.is_decidable(decision), "deciding {} twice", decision);
        self.pair_mut(decision.x(), decision.y()).set(decision.mark());
        if decision.is_present() {
            self.degree[decision.x()] += 1;
            self.degree[decision.y()] += 1;
            if decision.is_bidirected() {
                self.bidirected += 1;
            } else {
                let cause = decision.cause();
                let effect = decision.effect();
                let mut frame = self.top().clone();
                let from_effect = frame[effect];
                frame[cause] |= from_effect;
                frame[cause].insert(effect);
                let from_cause = frame[cause];
                for v in 0..self.n {
                    if frame[v].contains(cause) {
                        frame[v] |= from_cause;
                    }
                }
                self.reach.push(frame);
            }
        }
    }

    /// Reverts the decision. Directed decisions must be undone in reverse order.
    pub fn undecide(&mut self, decision: &Edge) {
        debug_assert!(self.pair(decision.x(), decision.y()).is_set(decision.mark()));
        self.pair_mut(decision.x(), decision.y()).unset(decision.mark());
        if decision.is_present() {
            self.degree[decision.x()] -= 1;
            self.degree[decision.y()] -= 1;
            if decision.is_bidirected() {
                self.bidirected -= 1;
            } else {
                debug_assert!(self.reach.len() > 1);
                self.reach.pop();
            }
        }
    }

    /// Removes every decision
    pub fn clear(&mut self) {
        for marks in self.marks.iter_mut() {
            marks.clear();
        }
        for d in self.degree.iter_mut() {
            *d = 0;
        }
        self.bidirected = 0;
        self.reach.truncate(1);
    }

    /// Returns true if x -> y is decided present
    #[inline]
    pub fn edges(&self, x: usize, y: usize) -> bool {
        if x < y {
            self.pair(x, y).is_set(Mark::ForwardPresent)
        } else {
            self.pair(x, y).is_set(Mark::BackwardPresent)
        }
    }

    /// Returns true if x <-> y is decided present
    #[inline]
    pub fn biedges(&self, x: usize, y: usize) -> bool {
        self.pair(x, y).is_set(Mark::BidirectedPresent)
    }

    /// Returns true if x -> y has been decided, present or absent
    #[inline]
    pub fn edge_decided(&self, x: usize, y: usize) -> bool {
        let marks = self.pair(x, y);
        if x < y {
            marks.is_set(Mark::ForwardPresent) || marks.is_set(Mark::ForwardAbsent)
        } else {
            marks.is_set(Mark::BackwardPresent) || marks.is_set(Mark::BackwardAbsent)
        }
    }

    #[inline]
    pub fn biedge_decided(&self, x: usize, y: usize) -> bool {
        let marks = self.pair(x, y);
        marks.is_set(Mark::BidirectedPresent) || marks.is_set(Mark::BidirectedAbsent)
    }

    /// Returns true if neither the decision nor its negation has been decided
    pub fn is_decidable(&self, decision: &Edge) -> bool {
        let marks = self.pair(decision.x(), decision.y());
        !marks.is_set(decision.mark()) && !marks.is_set(decision.negation().mark())
    }

    /// Returns true if the decision is already in the graph
    pub fn is_decided(&self, decision: &Edge) -> bool {
        self.pair(decision.x(), decision.y()).is_set(decision.mark())
    }

    /// Returns true if both endpoints are below the degree limit
    #[inline]
    pub fn could_add_more_edges(&self, x: usize, y: usize) -> bool {
        match self.limits.max_degree {
            None => true,
            Some(max) => self.degree[x] < max && self.degree[y] < max,
        }
    }

    /// Returns true if one more bidirected edge is allowed
    pub fn could_add_more_bidirected(&self) -> bool {
        match self.limits.max_bidirected {
            None => true,
            Some(max) => self.bidirected < max,
        }
    }

    pub fn bidirected_count(&self) -> usize {
        self.bidirected
    }

    pub fn degree(&self, v: usize) -> usize {
        self.degree[v]
    }

    /// Returns true if adding cause -> effect does not close a directed cycle
    #[inline]
    pub fn retains_acyclicity(&self, cause: usize, effect: usize) -> bool {
        !self.top()[effect].contains(cause)
    }

    /// Returns true if there is a directed path from a to b among the present edges
    #[inline]
    pub fn has_directed_path(&self, a: usize, b: usize) -> bool {
        self.top()[a].contains(b)
    }

    /// Number of present edges (of any kind) between x and y
    pub fn present_edges(&self, x: usize, y: usize) -> usize {
        self.edges(x, y) as usize + self.edges(y, x) as usize + self.biedges(x, y) as usize
    }

    /// Number of the three kinds of edges still undecided between x and y
    pub fn undecided_edges(&self, x: usize, y: usize) -> usize {
        !self.edge_decided(x, y) as usize + !self.edge_decided(y, x) as usize + !self.biedge_decided(x, y) as usize
    }

    /// Returns the list of present edges, each pair ordered by kind
    pub fn present(&self) -> Vec<Edge> {
        let mut edges = vec![];
        for y in 1..self.n {
            for x in 0..y {
                for kind in [EdgeKind::Forward, EdgeKind::Backward, EdgeKind::Bidirected] {
                    let edge = Edge::new(x, y, kind, true);
                    if self.is_decided(&edge) {
                        edges.push(edge);
                    }
                }
            }
        }
        edges
    }

    /// Number of directed decisions currently stacked
    pub fn depth(&self) -> usize {
        self.reach.len() - 1
    }
}
