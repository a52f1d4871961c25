pub mod bitset;
pub mod edge;
pub mod flags;
pub mod graph;
pub mod completion;
pub mod constraint;
pub mod instance;
pub mod pair_stats;
pub mod sparse_set;
