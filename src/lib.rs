//! # flubble_trees
//!
//! Decomposes a bidirected pangenome variation graph into a hierarchical
//! tree of nested regions of variation (a PVST), for downstream variant
//! calling.
//!
//! The pipeline per component: biedged graph, DFS spanning tree,
//! cycle-equivalence classification via spliced bracket lists, flubble
//! tree, then refinement into tiny / parallel / concealed / smothered
//! regions.
//!
//! Graph interop is based on [`petgraph`](https://docs.rs/petgraph).

pub mod types;
pub mod input;
pub mod output;
pub mod bidirected;
pub mod biedged;
pub mod spanning_tree;
pub mod cycle_equiv;
pub mod cycle_equiv_blocks;
pub mod flubble_tree;
pub mod pvst;
pub mod refine;
pub mod refine_blocks;
pub mod decompose;
pub mod testing;

pub use bidirected::BidirectedGraph;
pub use decompose::{decompose, ComponentResult, Context, DecomposeError};
pub use pvst::Pvst;
pub use types::UnGraph;
