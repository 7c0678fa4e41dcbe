//! Ordered object sequences with cached positional indices.
//!
//! [`ObjectArray`] is the single insert/remove/renumber routine shared by
//! every object kind and by the owned sub-sequences (constraint joints,
//! sub-morphs, label items, soft body anchors). After any mutation
//! `array[i].index() == Some(i)` holds for every element.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::util::{Error, Result};

/// Capability shared by every store object.
pub trait ModelObject: Sized {
    /// Typed identity.
    type Id: Copy + Eq + Hash + fmt::Debug;

    /// Human readable kind name, used in errors and canonical names.
    const KIND: &'static str;

    /// Stable identity.
    fn id(&self) -> Self::Id;

    /// Cached position inside its sequence, `None` when unlinked.
    fn index(&self) -> Option<usize>;

    #[doc(hidden)]
    fn set_index(&mut self, index: Option<usize>);

    /// Give the object (and any sub-objects it owns) fresh ids and unlink it.
    fn renew_identity(&mut self);

    /// Whether the object currently lives inside a sequence.
    #[inline]
    fn is_linked(&self) -> bool {
        self.index().is_some()
    }
}

/// Implement [`ModelObject`] for a struct with `id` and `index` fields.
macro_rules! model_object {
    ($ty:ty, $id:ty, $kind:literal) => {
        model_object!($ty, $id, $kind, |_this| {});
    };
    ($ty:ty, $id:ty, $kind:literal, |$this:ident| $renew:block) => {
        impl $crate::model::ModelObject for $ty {
            type Id = $id;
            const KIND: &'static str = $kind;

            #[inline]
            fn id(&self) -> $id {
                self.id
            }

            #[inline]
            fn index(&self) -> Option<usize> {
                self.index
            }

            #[inline]
            fn set_index(&mut self, index: Option<usize>) {
                self.index = index;
            }

            fn renew_identity(&mut self) {
                self.id = <$id>::next();
                self.index = None;
                let $this = self;
                $renew
            }
        }
    };
}
pub(crate) use model_object;

/// Ordered sequence of store objects.
#[derive(Clone)]
pub struct ObjectArray<T: ModelObject> {
    items: Vec<T>,
    positions: HashMap<T::Id, usize>,
}

impl<T: ModelObject> Default for ObjectArray<T> {
    fn default() -> Self {
        Self { items: Vec::new(), positions: HashMap::new() }
    }
}

impl<T: ModelObject + fmt::Debug> fmt::Debug for ObjectArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: ModelObject> ObjectArray<T> {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutable iteration. Identity and position stay read-only.
    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Ids in sequence order.
    pub fn ids(&self) -> Vec<T::Id> {
        self.items.iter().map(ModelObject::id).collect()
    }

    /// Position of an id, if present.
    #[inline]
    pub fn position(&self, id: T::Id) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    #[inline]
    pub fn contains(&self, id: T::Id) -> bool {
        self.positions.contains_key(&id)
    }

    /// Resolve an optional reference; unresolved ids behave like null.
    #[inline]
    pub fn resolve(&self, id: Option<T::Id>) -> Option<&T> {
        id.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.position(id).map(|i| &self.items[i])
    }

    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        match self.position(id) {
            Some(i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    #[inline]
    pub fn at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline]
    pub fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Id stored at a position.
    #[inline]
    pub fn id_at(&self, index: usize) -> Option<T::Id> {
        self.items.get(index).map(ModelObject::id)
    }

    /// Current position of a reference as a signed index, -1 for null.
    pub fn index_of(&self, id: Option<T::Id>) -> i32 {
        id.and_then(|id| self.position(id)).map_or(-1, |i| i as i32)
    }

    /// Insert an unlinked object.
    ///
    /// `at` inside `0..len` shifts that element and every later one right;
    /// anything else appends. Returns the position the object landed at.
    pub fn insert(&mut self, mut item: T, at: Option<usize>) -> Result<usize> {
        let id = item.id();
        if self.positions.contains_key(&id) {
            return Err(Error::already_exists(format!("{} {:?}", T::KIND, id)));
        }
        self.items
            .try_reserve(1)
            .map_err(|e| Error::AllocationFailure(e.to_string()))?;
        let len = self.items.len();
        let position = match at {
            Some(i) if i < len => i,
            _ => len,
        };
        item.set_index(Some(position));
        self.items.insert(position, item);
        self.positions.insert(id, position);
        for i in position + 1..self.items.len() {
            let shifted = &mut self.items[i];
            shifted.set_index(Some(i));
            self.positions.insert(shifted.id(), i);
        }
        tracing::trace!(kind = T::KIND, position, "inserted");
        Ok(position)
    }

    /// Append an unlinked object.
    pub fn push(&mut self, item: T) -> Result<usize> {
        self.insert(item, None)
    }

    /// Remove an object, handing ownership back to the caller.
    pub fn remove(&mut self, id: T::Id) -> Result<T> {
        let position = self
            .positions
            .remove(&id)
            .ok_or_else(|| Error::not_found(format!("{} {:?}", T::KIND, id)))?;
        let mut item = self.items.remove(position);
        item.set_index(None);
        for i in position..self.items.len() {
            let shifted = &mut self.items[i];
            shifted.set_index(Some(i));
            self.positions.insert(shifted.id(), i);
        }
        tracing::trace!(kind = T::KIND, position, "removed");
        Ok(item)
    }

    /// Remove the object at a position.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        let id = self.id_at(index).ok_or(Error::IndexOutOfBounds {
            index,
            count: self.items.len(),
        })?;
        self.remove(id)
    }

    /// Remove the object at `from` and re-insert it at `min(to, len)`.
    pub fn move_to(&mut self, from: usize, to: usize) -> Result<usize> {
        let item = self.remove_at(from)?;
        let to = to.min(self.items.len());
        self.insert(item, Some(to))
    }

    /// Drop every element.
    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }

    /// Deep copy with fresh identities for every element.
    pub fn duplicate(&self) -> Self
    where
        T: Clone,
    {
        let mut out = Self::new();
        for item in &self.items {
            let mut copy = item.clone();
            copy.renew_identity();
            let id = copy.id();
            let position = out.items.len();
            copy.set_index(Some(position));
            out.items.push(copy);
            out.positions.insert(id, position);
        }
        out
    }
}

impl<'a, T: ModelObject> IntoIterator for &'a ObjectArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: ModelObject> std::ops::Index<usize> for ObjectArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoneId;

    #[derive(Debug, Clone)]
    struct Item {
        id: BoneId,
        index: Option<usize>,
        tag: u32,
    }

    model_object!(Item, BoneId, "Item");

    fn item(tag: u32) -> Item {
        Item { id: BoneId::next(), index: None, tag }
    }

    fn assert_contiguous(array: &ObjectArray<Item>) {
        for (i, it) in array.iter().enumerate() {
            assert_eq!(it.index(), Some(i));
            assert_eq!(array.position(it.id()), Some(i));
        }
    }

    #[test]
    fn test_insert_positions_and_append() {
        let mut array = ObjectArray::new();
        array.insert(item(0), None).unwrap();
        array.insert(item(1), None).unwrap();
        assert_eq!(array.insert(item(2), Some(1)).unwrap(), 1);
        // out of range appends
        assert_eq!(array.insert(item(3), Some(99)).unwrap(), 3);
        let tags: Vec<u32> = array.iter().map(|i| i.tag).collect();
        assert_eq!(tags, vec![0, 2, 1, 3]);
        assert_contiguous(&array);
    }

    #[test]
    fn test_insert_linked_fails() {
        let mut array = ObjectArray::new();
        let a = item(0);
        let copy = a.clone();
        array.push(a).unwrap();
        assert!(matches!(array.push(copy), Err(Error::AlreadyExists(_))));
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn test_remove_renumbers_and_unlinks() {
        let mut array = ObjectArray::new();
        let ids: Vec<BoneId> = (0..5)
            .map(|t| {
                let it = item(t);
                let id = it.id;
                array.push(it).unwrap();
                id
            })
            .collect();
        let removed = array.remove(ids[1]).unwrap();
        assert!(!removed.is_linked());
        assert_eq!(array.len(), 4);
        assert_contiguous(&array);
        assert!(matches!(array.remove(ids[1]), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_contiguity_under_mixed_mutation() {
        let mut array = ObjectArray::new();
        let mut live = Vec::new();
        for step in 0..64u32 {
            if step % 3 == 2 && !live.is_empty() {
                let id = live.remove((step as usize * 7) % live.len());
                array.remove(id).unwrap();
            } else {
                let it = item(step);
                live.push(it.id);
                array.insert(it, Some((step as usize * 5) % (array.len() + 1))).unwrap();
            }
            assert_contiguous(&array);
        }
    }

    #[test]
    fn test_move_to_and_back() {
        let mut array = ObjectArray::new();
        for t in 0..4 {
            array.push(item(t)).unwrap();
        }
        let before = array.ids();
        array.move_to(2, 1).unwrap();
        array.move_to(1, 2).unwrap();
        assert_eq!(array.ids(), before);
        assert_contiguous(&array);
    }

    #[test]
    fn test_duplicate_renews_ids() {
        let mut array = ObjectArray::new();
        array.push(item(1)).unwrap();
        let copy = array.duplicate();
        assert_eq!(copy.len(), 1);
        assert_ne!(copy[0].id(), array[0].id());
        assert_eq!(copy[0].tag, 1);
        assert_eq!(copy[0].index(), Some(0));
    }
}
