//! Stable object identities.
//!
//! Every store object gets a process-unique [`ObjectId`] when it is created.
//! Cross-references hold typed ids instead of positions, so they stay valid
//! across inserts, removes and document reloads.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Untyped identity of a store object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

macro_rules! typed_ids {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(ObjectId);

            impl $name {
                /// Allocate a fresh id.
                pub fn next() -> Self {
                    Self(ObjectId::next())
                }

                #[inline]
                pub fn object_id(self) -> ObjectId {
                    self.0
                }
            }

            impl From<$name> for ObjectId {
                fn from(value: $name) -> Self {
                    value.0
                }
            }

            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!(stringify!($name), "({:?})"), self.0)
                }
            }
        )*
    };
}

typed_ids! {
    VertexId,
    MaterialId,
    TextureId,
    BoneId,
    ConstraintId,
    ConstraintJointId,
    MorphId,
    /// Identity of one sub-morph entry of any kind.
    MorphItemId,
    LabelId,
    LabelItemId,
    RigidBodyId,
    JointId,
    SoftBodyId,
    SoftBodyAnchorId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = BoneId::next();
        let b = BoneId::next();
        assert_ne!(a, b);
        assert_ne!(a.object_id(), b.object_id());
    }
}
