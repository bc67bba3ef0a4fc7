//! Component types and their registration metadata.
//!
//! A component is a typed value attached to at most one primary slot per
//! entity; a tag is a zero-payload component whose presence is all that is
//! stored. Every component/tag type is assigned a small sequential [`Id`] on
//! first registration, and that id is the bit index used in signature masks.
//!
//! Registration also records an [`Info`] carrying a pool factory, so the
//! world can build the correct pool kind (data vs tag) from nothing but the
//! integer id: the indirection behind id-addressed bulk operations like
//! "remove every entity's copy of component 7".

use std::{any::TypeId as StdTypeId, fmt};

mod registry;
mod set;

pub use registry::Registry;
pub use set::Set;

use crate::ecs::storage::pool::{self, Pool};

/// A component identifier: a unique sequential integer per component type,
/// also the bit index of the type in signature masks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a component Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The bit index of this component in signature masks.
    #[inline]
    pub fn bit(&self) -> u32 {
        self.0
    }

    /// The index of this component in id-indexed storage (e.g. Vec).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// A trait representing a component in the ECS.
///
/// `IS_TAG` classifies the type: data components carry a value per entity,
/// tags carry presence only. Use `#[derive(Component)]` /
/// `#[derive(Tag)]` from `hive_macros` rather than implementing by hand.
pub trait Component: 'static + Sized + Send + Sync {
    /// Whether this type is a zero-payload marker.
    const IS_TAG: bool = false;
}

/// The storage classification of a registered component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A data component: one value per owning entity.
    Data,
    /// A tag: presence only, no payload.
    Tag,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Data => write!(f, "data component"),
            Kind::Tag => write!(f, "tag"),
        }
    }
}

/// Metadata about a registered component type.
#[derive(Clone, Copy)]
pub struct Info {
    /// The component id.
    id: Id,

    /// Data component or tag.
    kind: Kind,

    /// The Rust TypeId, for runtime type checks.
    type_id: StdTypeId,

    /// The Rust type name, for diagnostics only.
    type_name: &'static str,

    /// Factory building the right pool kind for this id.
    pool_fn: fn(Id) -> Box<dyn Pool>,
}

impl Info {
    /// Construct the Info for component type `C`.
    fn new<C: Component>(id: Id) -> Self {
        Self {
            id,
            kind: if C::IS_TAG { Kind::Tag } else { Kind::Data },
            type_id: StdTypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            pool_fn: pool::new_pool::<C>,
        }
    }

    /// The component id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Data component or tag.
    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The Rust TypeId of the component type.
    #[inline]
    pub fn type_id(&self) -> StdTypeId {
        self.type_id
    }

    /// The Rust type name of the component type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Build an empty pool of the right kind for this component.
    #[inline]
    pub fn new_pool(&self) -> Box<dyn Pool> {
        (self.pool_fn)(self.id)
    }
}

impl fmt::Debug for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Info")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .finish()
    }
}
