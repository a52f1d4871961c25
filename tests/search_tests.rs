use bcause::args::Args;
use bcause::core::completion::{Completion, Policy};
use bcause::core::constraint::Weight;
use bcause::core::edge::{Edge, EdgeKind};
use bcause::core::graph::{GraphLimits, PartialGraph};
use bcause::core::instance::{Instance, InstanceLimits};
use bcause::parsers::read_instance;
use bcause::separation::SeparationEngine;
use bcause::{Separation, Solution};

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Optimum of each (instance, limits, separation) already enumerated
static OPTIMA: Mutex<Vec<(String, GraphLimits, Separation, Weight)>> = Mutex::new(vec![]);

fn weight(graph: &PartialGraph, instance: &Instance, separation: Separation) -> Weight {
    let completion = Completion::new(graph, Policy::Minimal);
    let mut engine = SeparationEngine::new(&completion, separation);
    instance.constraints_iter()
        .map(|c| &instance[c])
        .filter(|c| engine.has_active_trail(c) == c.is_independence())
        .map(|c| c.weight())
        .sum()
}

fn allowed(graph: &PartialGraph, edge: &Edge) -> bool {
    if !graph.could_add_more_edges(edge.x(), edge.y()) {
        return false;
    }
    if edge.is_bidirected() {
        graph.could_add_more_bidirected()
    } else {
        !graph.limits().acyclic || graph.retains_acyclicity(edge.cause(), edge.effect())
    }
}

fn enumerate(graph: &mut PartialGraph, edges: &[Edge], instance: &Instance, separation: Separation) -> Weight {
    match edges.split_first() {
        None => weight(graph, instance, separation),
        Some((edge, rest)) => {
            let mut best = enumerate(graph, rest, instance, separation);
            if best > 0 && allowed(graph, edge) {
                graph.decide(edge);
                best = best.min(enumerate(graph, rest, instance, separation));
                graph.undecide(edge);
            }
            best
        }
    }
}

/// Weight of the best graph, found by trying every set of edges
fn exhaustive_optimum(instance: &Instance, limits: GraphLimits, separation: Separation) -> Weight {
    let n = instance.size();
    let mut edges = vec![];
    for y in 1..n {
        for x in 0..y {
            for kind in [EdgeKind::Forward, EdgeKind::Backward, EdgeKind::Bidirected] {
                edges.push(Edge::new(x, y, kind, true));
            }
        }
    }
    let mut graph = PartialGraph::new(n, limits);
    enumerate(&mut graph, &edges, instance, separation)
}

/// Checks that the returned graph respects the limits and has the reported weight
fn check_solution(solution: &Solution, instance: &Instance, limits: GraphLimits, separation: Separation) {
    let mut graph = PartialGraph::new(instance.size(), limits);
    for edge in solution.edges() {
        assert!(edge.is_present());
        assert!(allowed(&graph, edge), "{} violates the limits", edge);
        graph.decide(edge);
    }
    assert_eq!(solution.weight(), weight(&graph, instance, separation));
}

macro_rules! search_tests {
    ($($name:ident: [$($flag:expr),*],)*) => {
        $(
            paste::item! {
                #[test]
                fn [<$name _indeps_first>]() {
                    run(stringify!($name), &["--heuristic", "indeps-first", $($flag),*]);
                }

                #[test]
                fn [<$name _depends_first>]() {
                    run(stringify!($name), &["--heuristic", "depends-first", $($flag),*]);
                }

                #[test]
                fn [<$name _hybrid>]() {
                    run(stringify!($name), &["--heuristic", "hybrid", $($flag),*]);
                }

                #[test]
                fn [<$name _random>]() {
                    run(stringify!($name), &["--heuristic", "random", "--seed", "7", $($flag),*]);
                }

                #[test]
                fn [<$name _core_propagation>]() {
                    run(stringify!($name), &["--core-propagation", $($flag),*]);
                }

                #[test]
                fn [<$name _without_relaxation>]() {
                    run(stringify!($name), &["--no-lp", "--relevancy-algorithm", $($flag),*]);
                }

                #[test]
                fn [<$name _every_pair_evaluated>]() {
                    run(stringify!($name), &["--no-relevancy-rules", "--statistics", $($flag),*]);
                }

                #[test]
                fn [<$name _acyclic>]() {
                    run(stringify!($name), &["--acyclic", "--core-propagation", $($flag),*]);
                }

                #[test]
                fn [<$name _degree_one>]() {
                    run(stringify!($name), &["--max-degree", "1", $($flag),*]);
                }

                #[test]
                fn [<$name _no_bidirected>]() {
                    run(stringify!($name), &["--max-bidirected", "0", "--acyclic", $($flag),*]);
                }
            }
        )*
    }
}

fn cached_optimum(name: &str, instance: &Instance, limits: GraphLimits, separation: Separation) -> Weight {
    let mut optima = OPTIMA.lock().unwrap_or_else(|e| e.into_inner());
    if let Some((_, _, _, w)) = optima.iter().find(|(n, l, s, _)| n == name && *l == limits && *s == separation) {
        return *w;
    }
    let optimum = exhaustive_optimum(instance, limits, separation);
    optima.push((name.to_string(), limits, separation, optimum));
    optimum
}

fn run(name: &str, flags: &[&str]) {
    let filename = format!("tests/instances/{}.txt", name);
    run_file(name, &filename, flags);
}

/// Solves the file with the given flags and compares the result with the exhaustive optimum
fn run_file(name: &str, filename: &str, flags: &[&str]) {
    let mut argv = vec!["bcause", filename];
    argv.extend_from_slice(flags);
    let args = Args::parse_from(argv);

    let solution = bcause::search(&args).unwrap();
    let instance = read_instance(&PathBuf::from(filename), &InstanceLimits::default()).unwrap();
    let expected = cached_optimum(name, &instance, args.graph_limits(), args.separation());
    assert!(solution.is_found());
    assert!(solution.is_optimal());
    assert_eq!(expected, solution.weight());
    check_solution(&solution, &instance, args.graph_limits(), args.separation());
}

search_tests! {
    collider: [],
    chain: [],
    conditioned: [],
    shifted: [],
    conflict: [],
    confounded: [],
}

mod sigma {
    use super::*;

    search_tests! {
        chain: ["--separation", "sigma"],
        conflict: ["--separation", "sigma"],
    }
}

/// Writes a random instance over four variables. The first line joins 0 and 3 so that the file
/// numbering is kept.
fn random_instance(seed: u64) -> tempfile::NamedTempFile {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let m = rng.gen_range(4..9);
    for i in 0..m {
        let (v1, v2) = if i == 0 {
            (0, 3)
        } else {
            let v1 = rng.gen_range(0..4);
            let v2 = (v1 + rng.gen_range(1..4)) % 4;
            (v1, v2)
        };
        let mut condition = 0;
        for v in (0..4).filter(|v| *v != v1 && *v != v2) {
            if rng.gen_bool(0.4) {
                condition |= 1 << v;
            }
        }
        let independent = rng.gen_bool(0.5) as usize;
        let weight = rng.gen_range(1..6);
        writeln!(file, "{} {} {} {} {} 0", independent, weight, v1, v2, condition).unwrap();
    }
    file
}

macro_rules! random_tests {
    ($($name:ident: [$($flag:expr),*],)*) => {
        $(
            paste::item! {
                #[test]
                fn [<random_instances_ $name>]() {
                    for seed in 0..20 {
                        let file = random_instance(seed);
                        let filename = file.path().to_string_lossy().to_string();
                        run_file(&format!("random_{}", seed), &filename, &[$($flag),*]);
                    }
                }
            }
        )*
    }
}

random_tests! {
    indeps_first: ["--heuristic", "indeps-first"],
    depends_first: ["--heuristic", "depends-first"],
    hybrid: ["--heuristic", "hybrid"],
    random: ["--heuristic", "random", "--seed", "3"],
    core_propagation: ["--core-propagation"],
    without_relaxation: ["--no-lp", "--relevancy-algorithm"],
    acyclic: ["--acyclic"],
    degree_one: ["--max-degree", "1"],
    sigma: ["--separation", "sigma"],
    symmetry1: ["--symmetry1"],
    symmetry2: ["--symmetry2"],
}

#[test]
fn collider_is_recovered() {
    let args = Args::parse_from(["bcause", "tests/instances/collider.txt"]);
    let solution = bcause::search(&args).unwrap();
    assert_eq!(0, solution.weight());
    assert!(!solution.adjacent(0, 1));
    assert!(solution.adjacent(0, 2));
    assert!(solution.adjacent(1, 2));
}

#[test]
fn output_uses_the_file_numbering() {
    let args = Args::parse_from(["bcause", "--input", "tests/instances/shifted.txt"]);
    let solution = bcause::search(&args).unwrap();
    let text = solution.to_string();
    let graph = text.lines().next().unwrap();
    assert!(graph.contains("->"));
    assert!(graph.chars().filter(|c| c.is_ascii_digit()).all(|c| ('3'..='5').contains(&c)));
}

#[test]
fn fixed_edges_are_kept() {
    let args = Args::parse_from(["bcause", "tests/instances/collider.txt", "--fix", "0->1 1</>2"]);
    let solution = bcause::search(&args).unwrap();
    assert!(solution.has_directed(0, 1));
    assert!(!solution.has_bidirected(1, 2));
    assert!(solution.weight() >= 5);
}

#[test]
fn starting_ub_hides_worse_graphs() {
    let args = Args::parse_from(["bcause", "tests/instances/conflict.txt", "--starting-ub", "0"]);
    let solution = bcause::search(&args).unwrap();
    assert!(!solution.is_found());
    assert!(solution.is_optimal());
    assert_eq!(0, solution.weight());
}

#[test]
fn symmetry_breaking_keeps_a_valid_graph() {
    let args = Args::parse_from(["bcause", "tests/instances/conflict.txt", "--acyclic", "--symmetry1", "--symmetry2"]);
    let solution = bcause::search(&args).unwrap();
    let instance = read_instance(&PathBuf::from("tests/instances/conflict.txt"), &InstanceLimits::default()).unwrap();
    let optimum = exhaustive_optimum(&instance, args.graph_limits(), args.separation());
    assert!(solution.is_found());
    assert!(solution.weight() >= optimum);
    check_solution(&solution, &instance, args.graph_limits(), args.separation());
}

#[test]
fn node_limit_reports_best_found() {
    let args = Args::parse_from(["bcause", "tests/instances/conflict.txt", "--no-lp", "--node-limit", "1"]);
    let solution = bcause::search(&args).unwrap();
    assert!(!solution.is_optimal());
    assert!(solution.is_found());
}

#[test]
fn missing_file_is_reported() {
    let args = Args::parse_from(["bcause", "tests/instances/missing.txt"]);
    assert!(matches!(bcause::search(&args), Err(bcause::LoadError::Io { .. })));
}

#[test]
fn invalid_fixing_is_reported() {
    let args = Args::parse_from(["bcause", "tests/instances/collider.txt", "--fix", "0->9"]);
    assert!(matches!(bcause::search(&args), Err(bcause::LoadError::InvalidFixing { .. })));
}
