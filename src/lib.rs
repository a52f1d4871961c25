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

//! Branch-and-bound search for the ancestral graph that best explains a set of weighted
//! (in)dependence constraints. The weight of a graph is the total weight of the constraints it
//! does not entail, and the search returns a graph of minimum weight.

pub mod args;
pub mod bound;
pub mod branching;
pub mod common;
pub mod core;
pub mod cores;
pub mod error;
pub mod oracle;
pub mod parsers;
pub mod relevancy;
pub mod separation;
pub mod solver;
mod statistics;

use search_trail::StateManager;
use tracing::info;

use args::Args;
use bound::BoundMaintainer;
use branching::*;
use crate::core::edge::Edge;
use crate::core::graph::PartialGraph;
use crate::core::instance::Instance;
use oracle::{CorePackingOracle, LpBound};
use parsers::*;

pub use common::*;
pub use error::LoadError;
pub use solver::{Solver, SolverParameters};

use peak_alloc::PeakAlloc;
#[global_allocator]
pub static PEAK_ALLOC: PeakAlloc = PeakAlloc;

pub enum GenericSolver {
    SScored(Solver<ScoredBranching, true>),
    QScored(Solver<ScoredBranching, false>),
    SRandom(Solver<RandomBranching, true>),
    QRandom(Solver<RandomBranching, false>),
}

pub fn generic_solver(instance: Instance, fixings: Vec<Edge>, args: &Args) -> GenericSolver {
    let mut state = StateManager::default();
    let lp = if args.lp() {
        LpBound::new(&instance, Some(Box::new(CorePackingOracle::new())))
    } else {
        LpBound::disabled()
    };
    let bounds = BoundMaintainer::new(&instance, args.evaluation_parameters(), lp, &mut state);
    let graph = PartialGraph::new(instance.size(), args.graph_limits());
    let parameters = args.solver_parameters();
    match (args.heuristic(), args.statistics()) {
        (Heuristic::Random, true) => {
            let solver = Solver::<RandomBranching, true>::new(instance, graph, bounds, state, Box::new(RandomBranching::new(args.seed())), fixings, parameters);
            GenericSolver::SRandom(solver)
        },
        (Heuristic::Random, false) => {
            let solver = Solver::<RandomBranching, false>::new(instance, graph, bounds, state, Box::new(RandomBranching::new(args.seed())), fixings, parameters);
            GenericSolver::QRandom(solver)
        },
        (heuristic, true) => {
            let solver = Solver::<ScoredBranching, true>::new(instance, graph, bounds, state, Box::new(ScoredBranching::new(heuristic)), fixings, parameters);
            GenericSolver::SScored(solver)
        },
        (heuristic, false) => {
            let solver = Solver::<ScoredBranching, false>::new(instance, graph, bounds, state, Box::new(ScoredBranching::new(heuristic)), fixings, parameters);
            GenericSolver::QScored(solver)
        },
    }
}

/// Searches the best graph for an already loaded instance
pub fn solve(instance: Instance, fixings: Vec<Edge>, args: &Args) -> Solution {
    match generic_solver(instance, fixings, args) {
        GenericSolver::SScored(mut solver) => solver.search(),
        GenericSolver::QScored(mut solver) => solver.search(),
        GenericSolver::SRandom(mut solver) => solver.search(),
        GenericSolver::QRandom(mut solver) => solver.search(),
    }
}

/// Loads the instance and the fixed edges described by the arguments, then searches the best graph
pub fn search(args: &Args) -> Result<Solution, LoadError> {
    let instance = read_instance(&args.input(), &args.instance_limits())?;
    instance.verify_limits(&args.instance_limits(), &args.graph_limits());
    let fixings = match args.fix() {
        Some(argument) => parse_fixings(&text_from_argument(argument)?, &instance)?,
        None => vec![],
    };
    info!("{} variables, {} constraints, {} fixed edges", instance.size(), instance.number_constraints(), fixings.len());
    Ok(solve(instance, fixings, args))
}
