//! Side table of runtime records attached to store objects.
//!
//! Records are keyed by object id and record type, so one object can carry
//! a name cache and a physics handle at the same time. A record is bound once
//! and later recovered with a typed [`ExtensionTable::cast`]. Records are
//! dropped with the table, which the owning [`Model`](super::Model) drops
//! with itself.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::id::ObjectId;
use super::names::NamedObject;
use crate::util::{Error, Result};

#[derive(Default)]
pub struct ExtensionTable {
    records: HashMap<(ObjectId, TypeId), Box<dyn Any>>,
}

/// Records detached from a table, waiting to be restored.
#[derive(Default)]
pub struct DetachedRecords(Vec<(TypeId, Box<dyn Any>)>);

impl DetachedRecords {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DetachedRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetachedRecords").field("len", &self.0.len()).finish()
    }
}

impl fmt::Debug for ExtensionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionTable").field("len", &self.records.len()).finish()
    }
}

impl ExtensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the object carries a record of type `T`.
    pub fn contains<T: Any>(&self, id: impl Into<ObjectId>) -> bool {
        self.records.contains_key(&(id.into(), TypeId::of::<T>()))
    }

    /// Attach a record. Fails when the object already carries one of this type.
    pub fn bind<T: Any>(&mut self, id: impl Into<ObjectId>, value: T) -> Result<()> {
        let key = (id.into(), TypeId::of::<T>());
        if self.records.contains_key(&key) {
            return Err(Error::already_exists(format!(
                "{} extension of {:?}",
                std::any::type_name::<T>(),
                key.0
            )));
        }
        self.records.insert(key, Box::new(value));
        Ok(())
    }

    /// Attach or replace a record.
    pub fn rebind<T: Any>(&mut self, id: impl Into<ObjectId>, value: T) {
        self.records.insert((id.into(), TypeId::of::<T>()), Box::new(value));
    }

    /// Drop every record of an object. Returns whether any existed.
    pub fn unbind(&mut self, id: impl Into<ObjectId>) -> bool {
        let id = id.into();
        let before = self.records.len();
        self.records.retain(|(owner, _), _| *owner != id);
        self.records.len() != before
    }

    /// Drop the record of type `T` only.
    pub fn unbind_record<T: Any>(&mut self, id: impl Into<ObjectId>) -> Option<T> {
        self.records
            .remove(&(id.into(), TypeId::of::<T>()))
            .and_then(|r| r.downcast().ok())
            .map(|r| *r)
    }

    /// Typed lookup; `None` when the object carries no record of this type.
    pub fn cast<T: Any>(&self, id: impl Into<ObjectId>) -> Option<&T> {
        self.records
            .get(&(id.into(), TypeId::of::<T>()))
            .and_then(|r| r.downcast_ref())
    }

    pub fn cast_mut<T: Any>(&mut self, id: impl Into<ObjectId>) -> Option<&mut T> {
        self.records
            .get_mut(&(id.into(), TypeId::of::<T>()))
            .and_then(|r| r.downcast_mut())
    }

    /// Typed lookup that binds `init()` first when nothing is attached.
    pub fn cast_or_bind_with<T: Any>(
        &mut self,
        id: impl Into<ObjectId>,
        init: impl FnOnce() -> T,
    ) -> Option<&mut T> {
        self.records
            .entry((id.into(), TypeId::of::<T>()))
            .or_insert_with(|| Box::new(init()))
            .downcast_mut()
    }

    /// Detach every record of an object so they can follow it out of the document.
    pub fn take(&mut self, id: impl Into<ObjectId>) -> DetachedRecords {
        let id = id.into();
        let keys: Vec<(ObjectId, TypeId)> =
            self.records.keys().filter(|(owner, _)| *owner == id).copied().collect();
        DetachedRecords(
            keys.into_iter()
                .filter_map(|key| self.records.remove(&key).map(|r| (key.1, r)))
                .collect(),
        )
    }

    /// Re-attach records previously detached with [`take`](Self::take).
    pub fn restore(&mut self, id: impl Into<ObjectId>, records: DetachedRecords) {
        let id = id.into();
        for (type_id, record) in records.0 {
            self.records.insert((id, type_id), record);
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Display and canonical names of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCache {
    pub display: String,
    pub canonical: String,
}

impl NameCache {
    pub fn of<T: NamedObject>(object: &T) -> Self {
        let canonical = object.canonical_name();
        let display = match object.index() {
            Some(index) => format!("{}: {}", index, canonical),
            None => canonical.clone(),
        };
        Self { display, canonical }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bone, BoneId, ModelObject};

    #[test]
    fn test_bind_cast_and_take() {
        let mut table = ExtensionTable::new();
        let id = BoneId::next();
        table.bind(id, 42u32).unwrap();
        assert!(matches!(table.bind(id, 1u32), Err(Error::AlreadyExists(_))));
        table.bind(id, String::from("name")).unwrap();
        assert_eq!(table.cast::<u32>(id), Some(&42));
        assert!(table.cast::<u64>(id).is_none());
        *table.cast_mut::<u32>(id).unwrap() += 1;

        let records = table.take(id);
        assert_eq!(records.len(), 2);
        assert!(!table.contains::<u32>(id));
        table.restore(id, records);
        assert_eq!(table.cast::<u32>(id), Some(&43));
        assert_eq!(table.unbind_record::<String>(id).as_deref(), Some("name"));
        assert!(table.unbind(id));
        assert!(table.is_empty());
    }

    #[test]
    fn test_name_cache() {
        let bone = Bone::new();
        let cache = NameCache::of(&bone);
        assert_eq!(cache.canonical, "Bone0");
        assert!(bone.index().is_none());
        assert_eq!(cache.display, "Bone0");
    }
}
