//! # Timetree
//!
//! A rooted, time-calibrated tree library for Rust.
//!
//! ## Overview
//!
//! Timetree models phylogenies whose nodes carry absolute ages: every
//! parent is at least as old as its children, and a branch's length is the
//! age difference between its ends. The crate parses and writes bracketed
//! Newick descriptions, offers atomic structural edits (prune, reroot,
//! rescale, shift), and computes deterministic plotting layouts for an
//! external renderer.
//!
//! ```
//! use timetree::{LayoutEngine, TimeTree};
//!
//! # fn main() -> Result<(), timetree::TreeError> {
//! let tree = TimeTree::from_newick_with_root_age("(A:1,(B:1,C:2):1):0;", 3.0)?;
//! assert_eq!(tree.num_leaves(), 3);
//!
//! let layout = LayoutEngine::new().layout(&tree)?;
//! assert_eq!(layout.time_span, 3.0);
//! # Ok(())
//! # }
//! ```

mod builder;
mod display;
mod edit;
mod error;
mod hash;
mod id;
mod iterator;
mod layout;
mod newick;
mod node;
mod tree;


pub use builder::{NodeBuilder, TreeBuilder};
pub use error::{TreeError, TreeResult};
pub use id::NodeId;
pub use iterator::leaf::Leaves;
pub use iterator::{Ancestors, Descendants, IterNode};
pub use layout::{EdgePath, LayoutEngine, LeafOrder, PlotPoint, PlottedNode, TreeLayout};
pub use newick::{NewickParser, RootAge};
pub use node::Node;
pub use tree::TimeTree;

/// Absolute node age. Larger is older; the unit is the caller's business.
pub type Age = f64;
pub type NodeDepth = usize;
