//! Low-level storage primitives: the sparse/dense index structure and the
//! per-component-type pools built on top of it.

pub mod pool;
pub mod sparse;

pub use pool::{DataPool, Pool, TagPool};
pub use sparse::SparseSet;
