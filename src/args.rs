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

use clap::Parser;

use std::path::PathBuf;

use crate::bound::EvaluationParameters;
use crate::common::{Heuristic, Separation};
use crate::core::constraint::{Weight, INFINITE_WEIGHT};
use crate::core::graph::GraphLimits;
use crate::core::instance::InstanceLimits;
use crate::solver::SolverParameters;

#[derive(Debug, Parser)]
#[clap(name="bcause", version, author, about)]
pub struct Args {
    /// The constraint file
    #[clap(value_parser, required_unless_present="input")]
    file: Option<PathBuf>,
    /// The constraint file, if not given as positional argument
    #[clap(short, long, value_parser, conflicts_with="file")]
    input: Option<PathBuf>,
    /// Skip the constraints mentioning a variable greater or equal to this value
    #[clap(long)]
    max_vars: Option<usize>,
    /// Skip the constraints conditioned on more than this number of variables
    #[clap(long)]
    max_cond: Option<usize>,
    /// Maximum number of edges incident to a variable
    #[clap(long)]
    max_degree: Option<usize>,
    /// Maximum number of bidirected edges in the graph
    #[clap(long)]
    max_bidirected: Option<usize>,
    /// If present, the directed edges must form a DAG
    #[clap(short, long, action)]
    acyclic: bool,
    /// Separation criterion used to evaluate the constraints
    #[clap(long, value_enum, default_value_t=Separation::D)]
    separation: Separation,
    /// Only report graphs strictly better than this weight
    #[clap(long)]
    starting_ub: Option<Weight>,
    /// Edges fixed before the search, either a string (e.g. "1<>2 2->3 1</>4") or a file
    #[clap(short, long)]
    fix: Option<String>,
    /// Edge selection heuristic
    #[clap(short='b', long, value_enum, default_value_t=Heuristic::IndepsFirst)]
    heuristic: Heuristic,
    /// Seed of the random heuristic
    #[clap(long, default_value_t=0)]
    seed: u64,
    /// If present, do not use the relaxation lower bound
    #[clap(long, action)]
    no_lp: bool,
    /// Propagate the unsatisfiable cores during the search
    #[clap(long, action)]
    core_propagation: bool,
    /// Maximum number of unsatisfiable cores used by the search
    #[clap(long, default_value_t=100000)]
    max_cores: usize,
    /// If present, evaluate every pair touched by a decision
    #[clap(long, action)]
    no_relevancy_rules: bool,
    /// Skip the pairs whose trails do not reach the decided pair
    #[clap(long, action)]
    relevancy_algorithm: bool,
    /// After adding x -> y with no arrowhead at x, the next edge must point into x
    #[clap(long, action)]
    symmetry1: bool,
    /// Do not add x -> y when an inducing path already goes from x to y
    #[clap(long, action)]
    symmetry2: bool,
    /// Stops the search after timeout seconds
    #[clap(short, long, default_value_t=u64::MAX)]
    timeout: u64,
    /// Stops the search after visiting this number of branches
    #[clap(long, default_value_t=usize::MAX)]
    node_limit: usize,
    /// Collect stats during the search
    #[clap(long, action)]
    statistics: bool,
    /// Log the decisions of the search
    #[clap(short, long, action)]
    verbose: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            file: None,
            input: None,
            max_vars: None,
            max_cond: None,
            max_degree: None,
            max_bidirected: None,
            acyclic: false,
            separation: Separation::D,
            starting_ub: None,
            fix: None,
            heuristic: Heuristic::IndepsFirst,
            seed: 0,
            no_lp: false,
            core_propagation: false,
            max_cores: 100000,
            no_relevancy_rules: false,
            relevancy_algorithm: false,
            symmetry1: false,
            symmetry2: false,
            timeout: u64::MAX,
            node_limit: usize::MAX,
            statistics: false,
            verbose: false,
        }
    }
}

impl Args {

    /// The constraint file, given either as positional argument or with --input
    pub fn input(&self) -> PathBuf {
        self.input.clone().or_else(|| self.file.clone()).unwrap_or_default()
    }

    pub fn fix(&self) -> Option<&str> {
        self.fix.as_deref()
    }

    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    pub fn separation(&self) -> Separation {
        self.separation
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn lp(&self) -> bool {
        !self.no_lp
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn node_limit(&self) -> usize {
        self.node_limit
    }

    pub fn statistics(&self) -> bool {
        self.statistics
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_input(&mut self, value: PathBuf) {
        self.input = Some(value);
    }

    pub fn set_fix(&mut self, value: Option<String>) {
        self.fix = value;
    }

    pub fn set_heuristic(&mut self, value: Heuristic) {
        self.heuristic = value;
    }

    pub fn set_separation(&mut self, value: Separation) {
        self.separation = value;
    }

    pub fn set_acyclic(&mut self, value: bool) {
        self.acyclic = value;
    }

    pub fn set_no_lp(&mut self, value: bool) {
        self.no_lp = value;
    }

    pub fn set_core_propagation(&mut self, value: bool) {
        self.core_propagation = value;
    }

    pub fn set_symmetry1(&mut self, value: bool) {
        self.symmetry1 = value;
    }

    pub fn set_symmetry2(&mut self, value: bool) {
        self.symmetry2 = value;
    }

    pub fn set_starting_ub(&mut self, value: Option<Weight>) {
        self.starting_ub = value;
    }

    pub fn set_node_limit(&mut self, value: usize) {
        self.node_limit = value;
    }

    pub fn set_statistics(&mut self, value: bool) {
        self.statistics = value;
    }

    pub fn instance_limits(&self) -> InstanceLimits {
        InstanceLimits {
            max_vars: self.max_vars,
            max_cond: self.max_cond,
        }
    }

    pub fn graph_limits(&self) -> GraphLimits {
        GraphLimits {
            max_degree: self.max_degree,
            max_bidirected: self.max_bidirected,
            acyclic: self.acyclic,
        }
    }

    pub fn evaluation_parameters(&self) -> EvaluationParameters {
        EvaluationParameters {
            separation: self.separation,
            relevancy_rules: !self.no_relevancy_rules,
            relevancy_algorithm: self.relevancy_algorithm,
            core_propagation: self.core_propagation,
        }
    }

    pub fn solver_parameters(&self) -> SolverParameters {
        SolverParameters::new(
            self.starting_ub.unwrap_or(INFINITE_WEIGHT),
            self.symmetry1,
            self.symmetry2,
            self.max_cores,
            self.timeout,
            self.node_limit,
        )
    }
}

#[cfg(test)]
mod test_args {
    use super::*;

    #[test]
    fn positional_input() {
        let args = Args::parse_from(["bcause", "constraints.txt"]);
        assert_eq!(PathBuf::from("constraints.txt"), args.input());
        assert_eq!(Heuristic::IndepsFirst, args.heuristic());
        assert_eq!(Separation::D, args.separation());
        assert!(args.lp());
        assert!(!args.statistics());
    }

    #[test]
    fn input_flag() {
        let args = Args::parse_from(["bcause", "--input", "constraints.txt", "--heuristic", "hybrid", "--separation", "sigma"]);
        assert_eq!(PathBuf::from("constraints.txt"), args.input());
        assert_eq!(Heuristic::Hybrid, args.heuristic());
        assert_eq!(Separation::Sigma, args.separation());
    }

    #[test]
    fn missing_input_is_rejected() {
        assert!(Args::try_parse_from(["bcause", "--acyclic"]).is_err());
    }

    #[test]
    fn limits_and_parameters() {
        let args = Args::parse_from([
            "bcause", "c.txt", "--max-vars", "5", "--max-cond", "2", "--max-degree", "3",
            "--max-bidirected", "1", "--acyclic", "--no-relevancy-rules", "--core-propagation", "--no-lp",
        ]);
        assert_eq!(InstanceLimits { max_vars: Some(5), max_cond: Some(2) }, args.instance_limits());
        assert_eq!(GraphLimits { max_degree: Some(3), max_bidirected: Some(1), acyclic: true }, args.graph_limits());
        let params = args.evaluation_parameters();
        assert!(!params.relevancy_rules);
        assert!(params.core_propagation);
        assert!(!params.relevancy_algorithm);
        assert!(!args.lp());
    }

    #[test]
    fn default_matches_the_parser() {
        let parsed = Args::parse_from(["bcause", "c.txt"]);
        let default = Args::default();
        assert_eq!(parsed.instance_limits(), default.instance_limits());
        assert_eq!(parsed.graph_limits(), default.graph_limits());
        assert_eq!(parsed.evaluation_parameters(), default.evaluation_parameters());
        assert_eq!(parsed.timeout(), default.timeout());
        assert_eq!(parsed.node_limit(), default.node_limit());
        assert_eq!(parsed.seed(), default.seed());
    }
}
