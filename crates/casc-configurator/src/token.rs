//! Runtime identity of configurable types

use crate::resource::Configurable;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime identity of a [`Configurable`] type
///
/// Compared by `TypeId`; the name is the type's stable `TYPE_ID`.
#[derive(Debug, Clone, Copy)]
pub struct TypeToken {
    id: TypeId,
    name: &'static str,
}

impl TypeToken {
    /// Token for `T`
    #[inline]
    #[must_use]
    pub fn of<T: Configurable>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::TYPE_ID,
        }
    }

    /// Underlying `TypeId`
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Stable type id
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if this token identifies `T`
    #[inline]
    #[must_use]
    pub fn is<T: Configurable>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeToken {}

impl Hash for TypeToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
