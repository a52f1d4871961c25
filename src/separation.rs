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

//! Graph walks over a completion. The main query, `has_active_trail`, decides if a constraint's
//! endpoints are connected given its conditioning set. It is a depth-first search over the states
//! (node, entered through an arrowhead) with one visited-set per kind of entry. The walk
//! formulation is used: a conditioned node lets the walk through only as a collider, and an
//! unconditioned node only as a non-collider. In the experimental regime of a constraint, edges
//! with an arrowhead on an intervened variable are removed.
//!
//! Under sigma-separation a conditioned non-collider does not block the walk when the walk leaves
//! it through an outgoing edge towards a variable that has a directed path back to it.
//!
//! The other queries (walks, directed paths and inducing paths) are plain reachability searches.

use crate::common::Separation;
use crate::core::bitset::VarSet;
use crate::core::completion::Completion;
use crate::core::constraint::Constraint;

#[derive(Clone, Copy)]
struct Query {
    v1: usize,
    v2: usize,
    condition: VarSet,
    intervention: VarSet,
}

pub struct SeparationEngine<'a, 'b> {
    completion: &'b Completion<'a>,
    mode: Separation,
    /// visited[0] for nodes entered through a tail, visited[1] through an arrowhead
    visited: [VarSet; 2],
}

impl<'a, 'b> SeparationEngine<'a, 'b> {

    pub fn new(completion: &'b Completion<'a>, mode: Separation) -> Self {
        Self {
            completion,
            mode,
            visited: [VarSet::empty(); 2],
        }
    }

    #[inline(always)]
    fn size(&self) -> usize {
        self.completion.size()
    }

    #[inline(always)]
    fn edge(&self, x: usize, y: usize) -> bool {
        self.completion.edges(x, y)
    }

    #[inline(always)]
    fn biedge(&self, x: usize, y: usize) -> bool {
        self.completion.biedges(x, y)
    }

    /// x -> y in the regime of the query
    #[inline(always)]
    fn open_edge(&self, x: usize, y: usize, q: &Query) -> bool {
        self.edge(x, y) && !q.intervention.contains(y)
    }

    /// x <-> y in the regime of the query
    #[inline(always)]
    fn open_biedge(&self, x: usize, y: usize, q: &Query) -> bool {
        self.biedge(x, y) && !q.intervention.contains(x) && !q.intervention.contains(y)
    }

    fn sigma_rule(&self, center: usize, entry: usize, q: &Query) -> bool {
        self.mode == Separation::Sigma &&
            q.condition.contains(center) &&
            self.open_edge(center, entry, q) &&
            self.reaches(true, entry, center, q.intervention)
    }

    /// Moves from `node` to `neighbour` along neighbour -> node, entering `neighbour` by its tail
    fn enter_by_outward_edge(&mut self, neighbour: usize, node: usize, q: &Query) -> bool {
        if !q.condition.contains(neighbour) && self.handle(false, neighbour, q) {
            return true;
        }
        self.sigma_rule(neighbour, node, q) && self.handle(true, neighbour, q)
    }

    fn pass_collider(&mut self, node: usize, q: &Query) -> bool {
        for neighbour in 0..self.size() {
            if self.open_edge(neighbour, node, q) && self.enter_by_outward_edge(neighbour, node, q) {
                return true;
            }
            if self.open_edge(node, neighbour, q) && self.sigma_rule(node, neighbour, q) && self.handle(true, neighbour, q) {
                return true;
            }
            if self.open_biedge(neighbour, node, q) && self.handle(true, neighbour, q) {
                return true;
            }
        }
        false
    }

    fn pass_noncollider(&mut self, pointed: bool, node: usize, q: &Query) -> bool {
        for neighbour in 0..self.size() {
            if self.open_edge(node, neighbour, q) && self.handle(true, neighbour, q) {
                return true;
            }
        }
        if pointed {
            return false;
        }
        for neighbour in 0..self.size() {
            if self.open_edge(neighbour, node, q) && self.enter_by_outward_edge(neighbour, node, q) {
                return true;
            }
            if self.open_biedge(neighbour, node, q) && self.handle(true, neighbour, q) {
                return true;
            }
        }
        false
    }

    fn handle(&mut self, pointed: bool, node: usize, q: &Query) -> bool {
        if node == q.v1 || self.visited[pointed as usize].contains(node) {
            return false;
        }
        self.visited[pointed as usize].insert(node);
        if node == q.v2 {
            return true;
        }
        if q.condition.contains(node) {
            pointed && self.pass_collider(node, q)
        } else {
            self.pass_noncollider(pointed, node, q)
        }
    }

    /// Returns true if the endpoints of the constraint are connected given its conditioning set,
    /// in its experimental regime.
    pub fn has_active_trail(&mut self, constraint: &Constraint) -> bool {
        let q = Query {
            v1: constraint.v1(),
            v2: constraint.v2(),
            condition: constraint.condition(),
            intervention: constraint.intervention(),
        };
        self.visited = [VarSet::empty(); 2];
        for neighbour in 0..self.size() {
            if (self.open_edge(q.v1, neighbour, &q) || self.open_biedge(q.v1, neighbour, &q)) && self.handle(true, neighbour, &q) {
                return true;
            }
            if self.open_edge(neighbour, q.v1, &q) && self.enter_by_outward_edge(neighbour, q.v1, &q) {
                return true;
            }
        }
        false
    }

    fn can_reach(&self, directed: bool, node: usize, target: usize, visited: &mut VarSet, intervention: VarSet) -> bool {
        if node == target {
            return true;
        }
        if visited.contains(node) {
            return false;
        }
        visited.insert(node);
        for v in 0..self.size() {
            let forward = self.edge(node, v) && !intervention.contains(v);
            let backward = !directed && self.edge(v, node) && !intervention.contains(node);
            let bidirected = !directed && self.biedge(v, node) && !intervention.contains(v) && !intervention.contains(node);
            if (forward || backward || bidirected) && self.can_reach(directed, v, target, visited, intervention) {
                return true;
            }
        }
        false
    }

    fn reaches(&self, directed: bool, node: usize, target: usize, intervention: VarSet) -> bool {
        let mut visited = VarSet::empty();
        self.can_reach(directed, node, target, &mut visited, intervention)
    }

    /// Returns true if x and y are connected by a walk of any edges
    pub fn has_walk_between(&self, x: usize, y: usize) -> bool {
        self.reaches(false, x, y, VarSet::empty())
    }

    /// Returns true if there is a directed path from a to b
    pub fn has_directed_path(&self, a: usize, b: usize) -> bool {
        self.reaches(true, a, b, VarSet::empty())
    }

    fn handle_inducing_trail(&mut self, node: usize, target: usize) -> bool {
        if node == target {
            return true;
        }
        if self.visited[1].contains(node) {
            return false;
        }
        self.visited[1].insert(node);
        for neighbour in 0..self.size() {
            if self.edge(node, neighbour) && self.biedge(node, neighbour) && self.handle_inducing_trail(neighbour, target) {
                return true;
            }
        }
        false
    }

    fn inducing_trail(&mut self, v1: usize, v2: usize, nontrivial: bool) -> bool {
        self.visited = [VarSet::empty(); 2];
        self.visited[1].insert(v1);
        for neighbour in 0..self.size() {
            if nontrivial && neighbour == v2 {
                continue;
            }
            if self.edge(v1, neighbour) && self.handle_inducing_trail(neighbour, v2) {
                return true;
            }
        }
        false
    }

    /// Returns true if v1 leaves through an outgoing edge and reaches v2 through nodes joined
    /// to their successor by both an outgoing and a bidirected edge.
    pub fn has_inducing_trail(&mut self, v1: usize, v2: usize) -> bool {
        self.inducing_trail(v1, v2, false)
    }

    /// Same as `has_inducing_trail`, without using the edge v1 -> v2 itself
    pub fn has_nontrivial_inducing_trail(&mut self, v1: usize, v2: usize) -> bool {
        self.inducing_trail(v1, v2, true)
    }
}
