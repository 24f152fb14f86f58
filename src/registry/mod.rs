//! Per-instance lock registry.
//!
//! Holds the set of locked paths, the derived ancestor index used to
//! short-circuit descendant checks, and the propagation rules that keep both
//! consistent as the underlying tree changes.

pub mod index;
pub mod path;
pub mod propagate;
pub mod state;

pub use index::AncestorIndex;
pub use path::{normalize, CanonicalPath};
pub use propagate::Mutation;
pub use state::{LockQueryResult, LockState};
