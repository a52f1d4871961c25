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

//! After an edge decision, most constraints cannot change status: no trail between their
//! endpoints uses the decided pair. This module decides, for a pair of variables, if the last
//! decision may matter, and computes a bottleneck for the pair. A bottleneck is a set of
//! variables that every relevant trail must cross as a collider, and a set of variables that
//! every relevant trail must cross as a non-collider. A constraint whose conditioning set does not
//! contain all the unavoidable colliders, or contains an unavoidable non-collider, cannot be
//! affected by the decision.
//!
//! Two analyses are available. The rules are cheap structural tests based on inducing trails.
//! The trail inspection explores, from both endpoints of the pair, the trails that reach the
//! decided pair, and records for each node the variables that every such trail crosses.
//!
//! During the inspection the decided pair is read from the decision itself, whatever its
//! polarity, so that both a present and an absent decision are analysed through the trails that
//! used (or could have used) the edge.

use std::ops::BitOrAssign;

use crate::common::Separation;
use crate::core::bitset::VarSet;
use crate::core::completion::{Completion, Policy};
use crate::core::edge::Edge;
use crate::separation::SeparationEngine;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bottleneck {
    /// Variables crossed as colliders by every relevant trail
    pub colliders: VarSet,
    /// Variables crossed as non-colliders by every relevant trail
    pub noncolliders: VarSet,
}

impl Bottleneck {

    /// Returns true if a constraint with the given conditioning set may be affected, that is if
    /// every unavoidable collider is conditioned and no unavoidable non-collider is
    pub fn admits(&self, condition: VarSet) -> bool {
        self.colliders.is_subset(condition) && !self.noncolliders.intersects(condition)
    }

    /// Removes a variable from both sets
    pub fn forget(&mut self, v: usize) {
        self.colliders.remove(v);
        self.noncolliders.remove(v);
    }
}

impl BitOrAssign for Bottleneck {
    fn bitor_assign(&mut self, rhs: Self) {
        self.colliders |= rhs.colliders;
        self.noncolliders |= rhs.noncolliders;
    }
}

/// Follows the chain of variables with a single onward neighbour, starting at `var`, and records
/// the ones that can only be crossed as colliders or only as non-colliders. The decided pair is
/// counted as an adjacency whatever its polarity. The walk stops at the endpoints of the pair
/// under consideration.
pub fn naive_bottleneck(completion: &Completion, var: usize, prev: Option<usize>, endpoints: VarSet, decided: &Edge) -> Bottleneck {
    let mut bneck = Bottleneck::default();

    let mut into_var = 0;
    let mut out_from_var = 0;
    let mut next_count = 0;
    let mut next = None;

    for neigh in 0..completion.size() {
        if neigh == var {
            continue;
        }
        let has_th = completion.edges(var, neigh) || decided.points(var, neigh);
        let has_ht = completion.edges(neigh, var) || decided.points(neigh, var);
        let has_hh = completion.biedges(var, neigh) || decided.joins(var, neigh);

        if has_th {
            out_from_var += 1;
        }
        if has_ht || has_hh {
            into_var += 1;
        }
        if Some(neigh) != prev && (has_th || has_ht || has_hh) {
            next_count += 1;
            next = Some(neigh);
        }
    }

    if !endpoints.contains(var) {
        if out_from_var == 0 {
            bneck.colliders.insert(var);
        }
        if into_var <= 1 {
            bneck.noncolliders.insert(var);
        }
    }

    let next = match next {
        Some(next) if next_count == 1 && !endpoints.contains(next) => next,
        _ => return bneck,
    };

    if !completion.edges(var, next) && !completion.biedges(var, next) {
        bneck.noncolliders.insert(next);
    }

    bneck |= naive_bottleneck(completion, next, Some(var), endpoints, decided);
    bneck
}

#[derive(Debug, Clone, Copy)]
struct BottleNode {
    /// Variables crossed by every trail reaching this node that was explored so far
    bottlenecks: VarSet,
    /// Neighbours through which a trail towards the decided pair passes
    relevant_neighbours: VarSet,
    leads_to_goal: bool,
}

impl BottleNode {

    fn new(n: usize) -> Self {
        Self {
            bottlenecks: VarSet::full(n),
            relevant_neighbours: VarSet::empty(),
            leads_to_goal: false,
        }
    }

    fn is_reduced_by(&self, bottleneck: VarSet) -> bool {
        (self.bottlenecks & bottleneck) != self.bottlenecks
    }

    fn reduce_by(&mut self, bottleneck: VarSet) -> VarSet {
        self.bottlenecks &= bottleneck;
        self.bottlenecks
    }
}

pub struct RelevancyFilter<'a, 'b> {
    completion: &'b Completion<'a>,
    decision: Edge,
    mode: Separation,
    rules: bool,
    algorithm: bool,
    source: usize,
    target: usize,
    bottles: [Vec<BottleNode>; 2],
    unavoidability: Bottleneck,
}

impl<'a, 'b> RelevancyFilter<'a, 'b> {

    pub fn new(completion: &'b Completion<'a>, decision: Edge, mode: Separation, rules: bool, algorithm: bool) -> Self {
        Self {
            completion,
            decision,
            mode,
            rules,
            algorithm,
            source: 0,
            target: 0,
            bottles: [vec![], vec![]],
            unavoidability: Bottleneck::default(),
        }
    }

    /// Returns true if the decision may change the status of a constraint over (s, t). The
    /// bottleneck of the pair is available afterwards through `bottleneck`.
    pub fn relevant_for(&mut self, s: usize, t: usize) -> bool {
        self.source = s;
        self.target = t;
        self.unavoidability = Bottleneck::default();

        if self.rules && self.matches_any_irrelevancy_rule() {
            return false;
        }
        !self.algorithm || self.inspect_trails()
    }

    pub fn bottleneck(&self) -> Bottleneck {
        self.unavoidability
    }

    #[inline(always)]
    fn size(&self) -> usize {
        self.completion.size()
    }

    #[inline(always)]
    fn concerns_the_decision(&self, x: usize, y: usize) -> bool {
        self.decision.concerns(x, y)
    }

    /// x -> y, with the decided pair read from the decision
    fn edges(&self, x: usize, y: usize) -> bool {
        if self.concerns_the_decision(x, y) {
            return self.decision.points(x, y);
        }
        self.completion.edges(x, y)
    }

    /// x <-> y, with the decided pair read from the decision
    fn biedges(&self, x: usize, y: usize) -> bool {
        if self.concerns_the_decision(x, y) {
            return self.decision.is_bidirected();
        }
        self.completion.biedges(x, y)
    }

    fn is_decision_endpoint(&self, node: usize) -> bool {
        self.decision.touches(node)
    }

    fn points_into(&self, v: usize, node: usize) -> bool {
        if self.concerns_the_decision(v, node) {
            return self.decision.is_bidirected() || node == self.decision.effect();
        }
        self.completion.edges(v, node) || self.completion.biedges(v, node)
    }

    /// Number of variables with an arrowhead on `var`
    fn pointer_count(&self, var: usize) -> usize {
        (0..self.size()).filter(|v| *v != var && self.points_into(*v, var)).count()
    }

    fn relevant_neighbour(&self, node: usize, neighbour: usize) -> bool {
        (self.bottles[0][node].relevant_neighbours | self.bottles[1][node].relevant_neighbours).contains(neighbour)
    }

    fn relevant_v_structure(&self, node: usize) -> bool {
        let count = (0..self.size())
            .filter(|v| self.relevant_neighbour(node, *v) && *v != node && self.points_into(*v, node))
            .count();
        count >= 2
    }

    fn matches_any_irrelevancy_rule(&self) -> bool {
        let (s, t) = (self.source, self.target);
        let mut engine = SeparationEngine::new(self.completion, self.mode);

        if self.decision.is_absent() && (engine.has_inducing_trail(s, t) || engine.has_inducing_trail(t, s)) {
            return true;
        }
        if self.decision.is_present() && !engine.has_walk_between(s, t) {
            return true;
        }

        let sufficient_connections = |node: usize| node == s || node == t || self.pointer_count(node) <= 1;

        if self.decision.is_directed() {
            let (cause, effect) = (self.decision.cause(), self.decision.effect());
            if engine.has_nontrivial_inducing_trail(cause, effect) {
                return true;
            }
            if engine.has_inducing_trail(effect, cause) && sufficient_connections(cause) && sufficient_connections(effect) {
                return true;
            }
        } else {
            let (x, y) = (self.decision.x(), self.decision.y());
            if (engine.has_inducing_trail(x, y) && sufficient_connections(x)) ||
               (engine.has_inducing_trail(y, x) && sufficient_connections(y)) {
                return true;
            }
        }
        false
    }

    fn inspect_trails(&mut self) -> bool {
        let n = self.size();
        let targets = VarSet::singleton(self.decision.x()).with(self.decision.y());
        self.bottles = [vec![BottleNode::new(n); n], vec![BottleNode::new(n); n]];

        let (s, t) = (self.source, self.target);
        if !self.inspect(0, s, None, VarSet::empty(), targets.without(t)) ||
           !self.inspect(1, t, None, VarSet::empty(), targets.without(s)) {
            return false;
        }
        let bnecks = self.construct_bottleneck();
        self.apply_detailed_analysis(bnecks)
    }

    fn inspect(&mut self, side: usize, node: usize, prev: Option<usize>, mut bottleneck: VarSet, targets: VarSet) -> bool {
        bottleneck.insert(node);
        if let Some(p) = prev {
            self.bottles[side][node].relevant_neighbours.insert(p);
        }
        if !self.bottles[side][node].is_reduced_by(bottleneck) {
            return targets.contains(node) || self.bottles[side][node].leads_to_goal;
        }
        let bottleneck = self.bottles[side][node].reduce_by(bottleneck);

        if targets.contains(node) {
            return true;
        }
        if prev.is_some() && (node == self.target || node == self.source) {
            return false;
        }

        for next in 0..self.size() {
            if !self.edges(node, next) && !self.edges(next, node) && !self.biedges(node, next) {
                continue;
            }
            if self.inspect(side, next, Some(node), bottleneck, targets) {
                self.bottles[side][node].relevant_neighbours.insert(next);
                self.bottles[side][node].leads_to_goal = true;
            }
        }
        self.bottles[side][node].leads_to_goal
    }

    fn construct_bottleneck(&mut self) -> [VarSet; 2] {
        let n = self.size();
        let (dx, dy) = (self.decision.x(), self.decision.y());
        let (s, t) = (self.source, self.target);
        let mut bnecks = [
            if self.is_decision_endpoint(s) { VarSet::empty() } else { VarSet::full(n) },
            if self.is_decision_endpoint(t) { VarSet::empty() } else { VarSet::full(n) },
        ];

        for (i, bneck) in bnecks.iter_mut().enumerate() {
            self.bottles[i][dx].relevant_neighbours.insert(dy);
            self.bottles[i][dy].relevant_neighbours.insert(dx);

            if dx != s && dx != t {
                *bneck &= self.bottles[i][dx].bottlenecks;
            }
            if dy != s && dy != t {
                *bneck &= self.bottles[i][dy].bottlenecks;
            }
            bneck.remove(s);
            bneck.remove(t);
        }
        bnecks
    }

    fn could_be_collider(&self, node: usize) -> bool {
        let mut bidir = 0;
        let mut causes = 0;
        if self.completion.policy() == Policy::Maximal {
            if self.decision.is_bidirected() && self.is_decision_endpoint(node) {
                bidir += 1;
            }
            if self.decision.is_directed() && node == self.decision.effect() {
                causes += 1;
            }
        }
        for neigh in 0..self.size() {
            if neigh == node || !self.relevant_neighbour(node, neigh) {
                continue;
            }
            if self.biedges(neigh, node) {
                bidir += 1;
            }
            if self.edges(neigh, node) {
                causes += 1;
            }
        }
        bidir + causes > 1
    }

    fn could_be_noncollider(&self, node: usize) -> bool {
        if self.decision.is_directed() && node == self.decision.cause() {
            return true;
        }
        (0..self.size()).any(|neigh| self.edges(node, neigh))
    }

    /// `visited_any` stands for a walk that already left its starting node
    fn effect_could_be_collider(&self, node: usize, visited: &mut VarSet, visited_any: bool) -> bool {
        if (visited_any || !visited.is_empty()) && self.relevant_v_structure(node) {
            return true;
        }
        if visited.contains(node) {
            return false;
        }
        visited.insert(node);

        for ancestor in 0..self.size() {
            if !self.relevant_neighbour(node, ancestor) || !self.edges(ancestor, node) {
                continue;
            }
            if self.effect_could_be_collider(ancestor, visited, true) {
                return true;
            }
        }
        false
    }

    fn revisits_are_justified(&self, node: usize, mut descendants: VarSet, revisits: VarSet) -> bool {
        descendants.insert(node);

        if revisits.is_subset(descendants) {
            let mut visited = VarSet::empty();
            return self.effect_could_be_collider(node, &mut visited, true);
        }

        for ancestor in 0..self.size() {
            if descendants.contains(ancestor) || !self.edges(ancestor, node) {
                continue;
            }
            if self.revisits_are_justified(ancestor, descendants, revisits) {
                return true;
            }
        }
        false
    }

    fn apply_detailed_analysis(&mut self, bnecks: [VarSet; 2]) -> bool {
        let chain = bnecks[0] & bnecks[1];

        if !chain.is_empty() && (self.decision.is_bidirected() || !self.revisits_are_justified(self.decision.cause(), VarSet::empty(), chain)) {
            return false;
        }

        let either = bnecks[0] | bnecks[1];
        for node in 0..self.size() {
            if node == self.target || node == self.source || chain.contains(node) {
                continue;
            }
            if !either.contains(node) && !self.is_decision_endpoint(node) {
                continue;
            }
            if !self.could_be_collider(node) && (chain.is_empty() || !(self.decision.is_directed() && node == self.decision.effect())) {
                self.unavoidability.noncolliders.insert(node);
            }
            if !self.could_be_noncollider(node) {
                self.unavoidability.colliders.insert(node);
            }
        }

        for node in chain.iter() {
            if self.could_be_noncollider(node) {
                self.unavoidability.noncolliders.insert(node);
            } else {
                self.unavoidability.colliders.insert(node);
            }
        }

        if self.decision.is_directed() {
            let effect = self.decision.effect();
            if self.unavoidability.noncolliders.contains(effect) {
                let mut visited = VarSet::empty();
                if self.effect_could_be_collider(effect, &mut visited, false) {
                    self.unavoidability.noncolliders.remove(effect);
                }
            }
            self.unavoidability.noncolliders.insert(self.decision.cause());
        }
        true
    }
}

#[cfg(test)]
mod test_relevancy {
    use super::*;
    use crate::core::graph::{GraphLimits, PartialGraph};

    fn graph(n: usize, edges: &[Edge]) -> PartialGraph {
        let mut g = PartialGraph::new(n, GraphLimits::default());
        for e in edges.iter() {
            g.decide(e);
        }
        g
    }

    #[test]
    fn bottleneck_admits() {
        let b = Bottleneck { colliders: VarSet::singleton(1), noncolliders: VarSet::singleton(2) };
        assert!(b.admits(VarSet::singleton(1)));
        assert!(b.admits(VarSet::singleton(1).with(3)));
        assert!(!b.admits(VarSet::empty()));
        assert!(!b.admits(VarSet::singleton(1).with(2)));
        assert!(Bottleneck::default().admits(VarSet::empty()));
    }

    #[test]
    fn naive_bottleneck_follows_chains() {
        // 0 -> 1 -> 2 (-> 3 being decided)
        let g = graph(4, &[Edge::directed(0, 1), Edge::directed(1, 2)]);
        let c = Completion::new(&g, Policy::Minimal);
        let endpoints = VarSet::singleton(0).with(3);
        let b = naive_bottleneck(&c, 0, None, endpoints, &Edge::directed(2, 3));
        assert_eq!(VarSet::empty(), b.colliders);
        assert_eq!(VarSet::singleton(1).with(2), b.noncolliders);
    }

    #[test]
    fn naive_bottleneck_finds_colliders() {
        // 0 -> 1 <- 2
        let g = graph(4, &[Edge::directed(0, 1), Edge::directed(2, 1)]);
        let c = Completion::new(&g, Policy::Minimal);
        let endpoints = VarSet::singleton(0).with(2);
        let b = naive_bottleneck(&c, 0, None, endpoints, &Edge::bidirected(2, 3));
        assert_eq!(VarSet::singleton(1), b.colliders);
        assert_eq!(VarSet::empty(), b.noncolliders);
    }

    #[test]
    fn naive_bottleneck_marks_tail_of_incoming_edge() {
        // 0 <- 1 -- 2 with the pair (1, 2) being decided
        let g = graph(3, &[Edge::directed(1, 0)]);
        let c = Completion::new(&g, Policy::Minimal);
        let endpoints = VarSet::singleton(0).with(2);
        let b = naive_bottleneck(&c, 0, None, endpoints, &Edge::directed(1, 2));
        assert!(b.noncolliders.contains(1));
        assert!(!b.colliders.contains(1));
    }

    #[test]
    fn naive_bottleneck_stops_at_branching_nodes() {
        let g = graph(4, &[Edge::directed(0, 1), Edge::directed(1, 2), Edge::directed(1, 3)]);
        let c = Completion::new(&g, Policy::Minimal);
        let endpoints = VarSet::singleton(0).with(3);
        let b = naive_bottleneck(&c, 0, None, endpoints, &Edge::directed(2, 3));
        assert_eq!(VarSet::empty(), b.colliders);
        assert_eq!(VarSet::singleton(1), b.noncolliders);
    }

    #[test]
    fn disconnected_pair_is_irrelevant_under_rules() {
        let g = graph(4, &[Edge::directed(0, 1)]);
        let c = Completion::new(&g, Policy::Minimal);
        let mut filter = RelevancyFilter::new(&c, Edge::directed(0, 1), Separation::D, true, false);
        assert!(!filter.relevant_for(2, 3));
        let mut filter = RelevancyFilter::new(&c, Edge::directed(0, 1), Separation::D, false, false);
        assert!(filter.relevant_for(2, 3));
        assert_eq!(Bottleneck::default(), filter.bottleneck());
    }

    #[test]
    fn absent_decision_with_adjacent_pair_is_irrelevant() {
        let mut g = PartialGraph::new(3, GraphLimits::default());
        let decision = Edge::directed(0, 1).negation();
        g.decide(&decision);
        let c = Completion::new(&g, Policy::Maximal);
        let mut filter = RelevancyFilter::new(&c, decision, Separation::D, true, false);
        assert!(!filter.relevant_for(0, 2));
    }

    #[test]
    fn trails_avoiding_the_decision_are_irrelevant() {
        let g = graph(4, &[Edge::directed(0, 1), Edge::directed(2, 3)]);
        let c = Completion::new(&g, Policy::Minimal);
        let mut filter = RelevancyFilter::new(&c, Edge::directed(0, 1), Separation::D, false, true);
        assert!(!filter.relevant_for(2, 3));
    }

    #[test]
    fn trails_through_the_decision_are_relevant() {
        // 2 -> 0 -> 1 -> 3
        let g = graph(4, &[Edge::directed(2, 0), Edge::directed(0, 1), Edge::directed(1, 3)]);
        let c = Completion::new(&g, Policy::Minimal);
        let mut filter = RelevancyFilter::new(&c, Edge::directed(0, 1), Separation::D, false, true);
        assert!(filter.relevant_for(2, 3));
        let b = filter.bottleneck();
        assert!(b.noncolliders.contains(0));
        assert!(!b.colliders.contains(0));
        assert!(!b.colliders.contains(2));
        assert!(!b.colliders.contains(3));
    }
}
