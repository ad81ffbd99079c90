//! `strata-hierarchy` builds cross-referenced tree views over a captured
//! PM4 command stream.
//!
//! One walk over a capture produces a single node arena plus six
//! simultaneous views (topologies) of it: the raw engine/submit structure,
//! an event-centric grouping where draws own their preceding state packets,
//! and projections of that grouping for API-level navigation. Downstream
//! inspectors navigate the frozen [`CommandHierarchy`]; nothing in it is
//! mutated after the build.
//!
//! Entry points:
//! - [`create_trees`] — build from a full [`strata_capture::Capture`].
//! - [`create_trees_from_stream`] — build from one raw command buffer.

pub mod builder;
pub mod hierarchy;
pub mod node;
pub mod topology;

pub use builder::{create_trees, create_trees_from_stream, BuildError, HierarchyBuilder};
pub use hierarchy::{CommandHierarchy, ViewKind};
pub use node::{MarkerKind, NodeAux, NodeStore, NodeType};
pub use topology::{NodeIndex, Topology, NONE, ROOT};
