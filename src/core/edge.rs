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

//! An edge decision is an unordered pair of variables, a kind of edge and a polarity (present or
//! absent). Edges are always normalized so that `x < y`; the kind is flipped accordingly when the
//! endpoints are given in the other order.

use std::fmt;

use super::flags::Mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// x <-> y
    Bidirected,
    /// x -> y
    Forward,
    /// x <- y
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    x: usize,
    y: usize,
    kind: EdgeKind,
    present: bool,
}

impl Edge {

    pub fn new(x: usize, y: usize, kind: EdgeKind, present: bool) -> Self {
        debug_assert!(x != y);
        if x < y {
            Self { x, y, kind, present }
        } else {
            let kind = match kind {
                EdgeKind::Bidirected => EdgeKind::Bidirected,
                EdgeKind::Forward => EdgeKind::Backward,
                EdgeKind::Backward => EdgeKind::Forward,
            };
            Self { x: y, y: x, kind, present }
        }
    }

    /// Present directed edge cause -> effect
    pub fn directed(cause: usize, effect: usize) -> Self {
        Edge::new(cause, effect, EdgeKind::Forward, true)
    }

    /// Present bidirected edge a <-> b
    pub fn bidirected(a: usize, b: usize) -> Self {
        Edge::new(a, b, EdgeKind::Bidirected, true)
    }

    #[inline(always)]
    pub fn x(&self) -> usize {
        self.x
    }

    #[inline(always)]
    pub fn y(&self) -> usize {
        self.y
    }

    #[inline(always)]
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    #[inline(always)]
    pub fn is_present(&self) -> bool {
        self.present
    }

    #[inline(always)]
    pub fn is_absent(&self) -> bool {
        !self.present
    }

    pub fn is_bidirected(&self) -> bool {
        self.kind == EdgeKind::Bidirected
    }

    pub fn is_directed(&self) -> bool {
        self.kind != EdgeKind::Bidirected
    }

    pub fn is_forward(&self) -> bool {
        self.kind == EdgeKind::Forward
    }

    pub fn is_backward(&self) -> bool {
        self.kind == EdgeKind::Backward
    }

    /// Returns true if the edge is of kind `cause -> effect`, regardless of its polarity
    pub fn points(&self, cause: usize, effect: usize) -> bool {
        (self.x == cause && self.y == effect && self.kind == EdgeKind::Forward) ||
            (self.x == effect && self.y == cause && self.kind == EdgeKind::Backward)
    }

    /// Returns true if the edge is of kind `a <-> b`, regardless of its polarity
    pub fn joins(&self, a: usize, b: usize) -> bool {
        self.kind == EdgeKind::Bidirected &&
            ((self.x == a && self.y == b) || (self.x == b && self.y == a))
    }

    pub fn concerns(&self, a: usize, b: usize) -> bool {
        (self.x == a && self.y == b) || (self.x == b && self.y == a)
    }

    pub fn touches(&self, v: usize) -> bool {
        self.x == v || self.y == v
    }

    pub fn negation(&self) -> Self {
        Self { x: self.x, y: self.y, kind: self.kind, present: !self.present }
    }

    pub fn cause(&self) -> usize {
        debug_assert!(self.is_directed());
        if self.kind == EdgeKind::Forward { self.x } else { self.y }
    }

    pub fn effect(&self) -> usize {
        debug_assert!(self.is_directed());
        if self.kind == EdgeKind::Forward { self.y } else { self.x }
    }

    /// Mark that this decision sets on its pair
    pub fn mark(&self) -> Mark {
        match (self.kind, self.present) {
            (EdgeKind::Bidirected, true) => Mark::BidirectedPresent,
            (EdgeKind::Forward, true) => Mark::ForwardPresent,
            (EdgeKind::Backward, true) => Mark::BackwardPresent,
            (EdgeKind::Bidirected, false) => Mark::BidirectedAbsent,
            (EdgeKind::Forward, false) => Mark::ForwardAbsent,
            (EdgeKind::Backward, false) => Mark::BackwardAbsent,
        }
    }

    /// Position of the kind in the tie-breaking order of the branching heuristics
    pub fn kind_order(&self) -> usize {
        match self.kind {
            EdgeKind::Bidirected => 0,
            EdgeKind::Forward => 1,
            EdgeKind::Backward => 2,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match (self.kind, self.present) {
            (EdgeKind::Bidirected, true) => "<>",
            (EdgeKind::Forward, true) => "->",
            (EdgeKind::Backward, true) => "<-",
            (EdgeKind::Bidirected, false) => "</>",
            (EdgeKind::Forward, false) => "/>",
            (EdgeKind::Backward, false) => "</",
        }
    }

    /// Textual form of the edge, shifting the variables by `offset`
    pub fn notation(&self, offset: usize) -> String {
        format!("{}{}{}", self.x + offset, self.symbol(), self.y + offset)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.notation(0))
    }
}
