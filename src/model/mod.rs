//! # Tree Model
//!
//! Plain data: the node arena the builder mutates, the input records it
//! consumes, and the serializable trees it emits.
//!
//! Design rule: no randomness, no layout, no configuration here.

pub mod node;
pub mod table;
pub mod item;
pub mod output;

pub use node::{Links, NodeIdx, TreeNode, UNASSIGNED_THEME};
pub use table::NodeTable;
pub use item::ItemRecord;
pub use output::{
    BuildDiagnostics, ConfigSource, ConfigUsed, Forest, NodeOutput, TreeOutput,
    OUTPUT_VERSION,
};
