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

//! A completion is a read-only view of a partial graph in which every undecided mark is read as
//! either present (maximal completion) or absent (minimal completion). The maximal completion
//! does not add an edge if an endpoint already reached the degree limit, if the bidirected budget
//! is exhausted, or if the caller-supplied oracle proves that the edge cannot be present.

use super::edge::{Edge, EdgeKind};
use super::graph::PartialGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Undecided edges are absent
    Minimal,
    /// Undecided edges are present, unless proven otherwise
    Maximal,
}

/// Predicate telling if an edge is known to be absent from every optimal extension
pub type AbsenceOracle<'a> = &'a dyn Fn(&Edge) -> bool;

pub struct Completion<'a> {
    graph: &'a PartialGraph,
    policy: Policy,
    oracle: Option<AbsenceOracle<'a>>,
}

impl<'a> Completion<'a> {

    pub fn new(graph: &'a PartialGraph, policy: Policy) -> Self {
        Self { graph, policy, oracle: None }
    }

    pub fn with_oracle(graph: &'a PartialGraph, policy: Policy, oracle: AbsenceOracle<'a>) -> Self {
        Self { graph, policy, oracle: Some(oracle) }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.graph.size()
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn graph(&self) -> &PartialGraph {
        self.graph
    }

    fn known_absent(&self, edge: &Edge) -> bool {
        match self.oracle {
            Some(oracle) => oracle(edge),
            None => false,
        }
    }

    /// Returns true if x -> y is in the completion
    #[inline]
    pub fn edges(&self, x: usize, y: usize) -> bool {
        if x == y {
            return false;
        }
        if self.graph.edges(x, y) {
            return true;
        }
        self.policy == Policy::Maximal &&
            !self.graph.edge_decided(x, y) &&
            self.graph.could_add_more_edges(x, y) &&
            !self.known_absent(&Edge::new(x, y, EdgeKind::Forward, true))
    }

    /// Returns true if x <-> y is in the completion
    #[inline]
    pub fn biedges(&self, x: usize, y: usize) -> bool {
        if x == y {
            return false;
        }
        if self.graph.biedges(x, y) {
            return true;
        }
        if self.policy != Policy::Maximal || self.graph.biedge_decided(x, y) {
            return false;
        }
        if !self.graph.could_add_more_bidirected() {
            return false;
        }
        self.graph.could_add_more_edges(x, y) &&
            !self.known_absent(&Edge::new(x, y, EdgeKind::Bidirected, true))
    }
}

#[cfg(test)]
mod test_completion {
    use super::*;
    use crate::core::graph::GraphLimits;

    #[test]
    fn decided_pairs_are_read_from_the_graph() {
        let mut g = PartialGraph::new(3, GraphLimits::default());
        g.decide(&Edge::directed(0, 1));
        g.decide(&Edge::directed(1, 0).negation());
        g.decide(&Edge::bidirected(0, 1).negation());
        for policy in [Policy::Minimal, Policy::Maximal] {
            let c = Completion::new(&g, policy);
            assert!(c.edges(0, 1));
            assert!(!c.edges(1, 0));
            assert!(!c.biedges(0, 1));
        }
    }

    #[test]
    fn undecided_pairs_follow_the_policy() {
        let g = PartialGraph::new(3, GraphLimits::default());
        let min = Completion::new(&g, Policy::Minimal);
        let max = Completion::new(&g, Policy::Maximal);
        assert!(!min.edges(0, 2));
        assert!(!min.biedges(0, 2));
        assert!(max.edges(0, 2));
        assert!(max.edges(2, 0));
        assert!(max.biedges(0, 2));
        assert!(!max.edges(1, 1));
        assert!(!max.biedges(1, 1));
    }

    #[test]
    fn maximal_completion_respects_limits() {
        let mut g = PartialGraph::new(3, GraphLimits { max_degree: Some(1), max_bidirected: Some(1), acyclic: false });
        g.decide(&Edge::bidirected(0, 1));
        let max = Completion::new(&g, Policy::Maximal);
        assert!(!max.edges(0, 2));
        assert!(!max.biedges(1, 2));
        assert!(max.biedges(0, 1));
    }

    #[test]
    fn oracle_suppresses_virtual_edges() {
        let g = PartialGraph::new(3, GraphLimits::default());
        let oracle = |e: &Edge| e.concerns(0, 1);
        let max = Completion::with_oracle(&g, Policy::Maximal, &oracle);
        assert!(!max.edges(0, 1));
        assert!(!max.edges(1, 0));
        assert!(!max.biedges(0, 1));
        assert!(max.edges(1, 2));
    }
}
