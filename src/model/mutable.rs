//! Owning and reference mutation handles.
//!
//! [`Mutable::create`] hands out a fresh object owned by the handle;
//! [`Mutable::reference`] borrows an object that already lives in a
//! sequence. Dropping an owning handle that was never inserted frees the
//! object, dropping a reference handle leaves the document untouched.

use std::ops::{Deref, DerefMut};

use super::array::{ModelObject, ObjectArray};
use crate::util::{Error, Result};

pub enum Mutable<'a, T: ModelObject> {
    Owned(T),
    Reference(&'a mut T),
}

impl<'a, T: ModelObject> Mutable<'a, T> {
    /// Fresh unlinked object owned by the handle.
    pub fn create() -> Self
    where
        T: Default,
    {
        Self::Owned(T::default())
    }

    /// Wrap an already constructed unlinked object.
    pub fn owned(object: T) -> Self {
        Self::Owned(object)
    }

    /// Borrow an object owned by the document.
    pub fn reference(object: &'a mut T) -> Self {
        Self::Reference(object)
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Copy the contents of `source` with `copy`, keeping this object's identity.
    pub fn copy_with(&mut self, source: &T, copy: impl FnOnce(&mut T, &T)) {
        copy(self.deref_mut(), source);
    }

    /// Move the owned object into a sequence.
    ///
    /// A reference handle already belongs to the document and fails with
    /// `AlreadyExists`.
    pub fn insert_into(self, array: &mut ObjectArray<T>, at: Option<usize>) -> Result<usize> {
        match self {
            Self::Owned(object) => array.insert(object, at),
            Self::Reference(object) => Err(Error::already_exists(format!(
                "{} {:?}",
                T::KIND,
                object.id()
            ))),
        }
    }

    /// Release the owned object, `None` for a reference handle.
    pub fn into_owned(self) -> Option<T> {
        match self {
            Self::Owned(object) => Some(object),
            Self::Reference(_) => None,
        }
    }
}

impl<T: ModelObject> Deref for Mutable<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Self::Owned(object) => object,
            Self::Reference(object) => object,
        }
    }
}

impl<T: ModelObject> DerefMut for Mutable<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            Self::Owned(object) => object,
            Self::Reference(object) => object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bone;

    #[test]
    fn test_owned_insert_links() {
        let mut bones = ObjectArray::new();
        let mut bone = Mutable::<Bone>::create();
        bone.name.japanese = "腕".into();
        assert!(bone.is_owned());
        let position = bone.insert_into(&mut bones, None).unwrap();
        assert_eq!(position, 0);
        assert_eq!(bones[0].name.japanese, "腕");
        assert!(bones[0].is_linked());
    }

    #[test]
    fn test_reference_insert_fails() {
        let mut bones = ObjectArray::new();
        bones.push(Bone::new()).unwrap();
        let mut other = ObjectArray::new();
        let handle = Mutable::reference(bones.at_mut(0).unwrap());
        assert!(matches!(handle.insert_into(&mut other, None), Err(Error::AlreadyExists(_))));
        assert_eq!(bones.len(), 1);
    }

    #[test]
    fn test_copy_keeps_identity() {
        let mut source = Bone::new();
        source.name.japanese = "頭".into();
        let mut bone = Mutable::<Bone>::create();
        let id = bone.id();
        bone.copy_with(&source, Bone::copy_from);
        assert_eq!(bone.id(), id);
        assert_eq!(bone.name.japanese, "頭");
        assert!(bone.into_owned().is_some());
    }
}
