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

use clap::ValueEnum;
use std::fmt;

use crate::core::constraint::Weight;
use crate::core::edge::Edge;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Default)]
pub enum Heuristic {
    /// Select the pair most likely independent (edges absent first)
    #[default]
    IndepsFirst,
    /// Select the pair most likely dependent (edges present first)
    DependsFirst,
    /// A hybrid of the two previous heuristics
    Hybrid,
    /// Branch on a random undecided edge
    Random,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Default)]
pub enum Separation {
    /// d-separation
    #[default]
    D,
    /// sigma-separation, for graphs with cycles
    Sigma,
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heuristic::IndepsFirst => write!(f, "indeps-first"),
            Heuristic::DependsFirst => write!(f, "depends-first"),
            Heuristic::Hybrid => write!(f, "hybrid"),
            Heuristic::Random => write!(f, "random"),
        }
    }
}

impl fmt::Display for Separation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Separation::D => write!(f, "d-separation"),
            Separation::Sigma => write!(f, "sigma-separation"),
        }
    }
}

/// Best graph found by the search
#[derive(Debug, Clone)]
pub struct Solution {
    /// Present edges of the graph
    edges: Vec<Edge>,
    /// Total weight of the constraints violated by the graph
    weight: Weight,
    /// Identifier, in the input, of variable 0
    offset: usize,
    /// True if the search space has been exhausted
    optimal: bool,
    /// Time, in milliseconds, at which the graph was found
    time: u128,
    /// False if only an upper bound is known
    found: bool,
}

impl Solution {

    pub fn new(edges: Vec<Edge>, weight: Weight, offset: usize, time: u128) -> Self {
        Self { edges, weight, offset, optimal: false, time, found: true }
    }

    /// Placeholder for "no graph found yet", with the given upper bound
    pub fn none(weight: Weight, offset: usize) -> Self {
        Self { edges: vec![], weight, offset, optimal: false, time: 0, found: false }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn is_optimal(&self) -> bool {
        self.optimal
    }

    pub fn set_optimal(&mut self, optimal: bool) {
        self.optimal = optimal;
    }

    pub fn time(&self) -> u128 {
        self.time
    }

    /// Returns true if a graph was found, as opposed to only an upper bound being known
    pub fn is_found(&self) -> bool {
        self.found
    }

    /// Returns true if the graph has x -> y
    pub fn has_directed(&self, cause: usize, effect: usize) -> bool {
        self.edges.iter().any(|e| e.is_directed() && e.points(cause, effect))
    }

    /// Returns true if the graph has x <-> y
    pub fn has_bidirected(&self, a: usize, b: usize) -> bool {
        self.edges.iter().any(|e| e.joins(a, b))
    }

    /// Returns true if x and y are adjacent
    pub fn adjacent(&self, x: usize, y: usize) -> bool {
        self.edges.iter().any(|e| e.concerns(x, y))
    }

    pub fn print(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Graph:")?;
        for edge in self.edges.iter() {
            if edge.is_bidirected() {
                write!(f, " {}<->{}", edge.x() + self.offset, edge.y() + self.offset)?;
            } else {
                write!(f, " {}->{}", edge.cause() + self.offset, edge.effect() + self.offset)?;
            }
        }
        writeln!(f)?;
        write!(f, "Weight: {}", self.weight)
    }
}
