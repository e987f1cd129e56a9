//! Anchor graph access for the Orb node.
//!
//! Anchors form a DAG: each anchor credential's `previousAnchors` maps the
//! suffixes it updates to the anchor each suffix last appeared in. This
//! crate dereferences hashlinks to anchor credentials and answers "which
//! anchors touched this DID" by walking that DAG backwards.

mod cas;
mod error;
mod graph;

pub use cas::{CasReader, HttpCasClient};
pub use error::GraphError;
pub use graph::{Anchor, AnchorGraph, Graph};
