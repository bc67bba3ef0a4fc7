//! An archetype-based Entity-Component-System runtime.
//!
//! Entities are lightweight recycled handles; components are typed values
//! attached to them through per-type pools; archetypes group entities by
//! their exact component signature; filters keep live entity lists for
//! (include, exclude) signature queries; views iterate those lists safely
//! under reentrant mutation. The [`world::World`] façade ties it together.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod filter;
pub mod mask;
pub mod storage;
pub(crate) mod util;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use filter::View;
pub use mask::Mask;
pub use world::{Added, Removed, World};
