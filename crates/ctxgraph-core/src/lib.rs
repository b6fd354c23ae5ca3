//! Ctxgraph Core - temporally-aware labeled multigraph with pattern matching
//!
//! This crate provides the in-memory graph store, path enumeration,
//! regex-constrained path search, maximum subgraph matching, expiration
//! bookkeeping and random subgraph sampling.

pub mod consistency;
pub mod contains;
pub mod edge;
pub mod error;
pub mod matcher;
pub mod node;
pub mod paths;
pub mod sample;
pub mod store;

pub use contains::Contains;
pub use edge::{never_expires, Edge, EdgeId, ValidityWindow};
pub use error::{Error, Result};
pub use matcher::{MatchQuery, MatchSet, MatchedEdge};
pub use node::{Node, NodeId, NodeKind};
pub use paths::PathCache;
pub use sample::SampleOptions;
pub use store::{ArchivedEdge, GraphStore};
