//! In-memory record caches rebuilt from the store.
//!
//! Each cache is a full copy of one bucket. A sync rescans the whole bucket
//! into a fresh map and swaps it in only when every entry decoded, so readers
//! never observe a partially rebuilt cache. Nothing invalidates a cache
//! between syncs: callers re-sync after the writes they want to see.

use crate::error::{StoreError, StoreResult};
use crate::store::RecordStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use userinfo_common::{ObjectBox, Person, Record, UserObject};

/// Read caches for users, object boxes and objects.
pub struct RecordCache {
    store: Arc<RecordStore>,
    /// user ID -> Person
    users: RwLock<HashMap<String, Person>>,
    /// owner ID -> ObjectBox
    object_boxes: RwLock<HashMap<String, ObjectBox>>,
    /// object ID -> UserObject
    objects: RwLock<HashMap<String, UserObject>>,
}

impl RecordCache {
    /// Create empty caches over `store`; call the sync methods to fill them.
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            users: RwLock::new(HashMap::new()),
            object_boxes: RwLock::new(HashMap::new()),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Store the caches are rebuilt from
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    // ---- Sync ----

    /// Rebuild the user cache from the `user` bucket
    pub fn sync_users(&self) -> StoreResult<HashMap<String, Person>> {
        self.refresh(&self.users)
    }

    /// Rebuild the object box cache from the `objectbox` bucket
    pub fn sync_object_boxes(&self) -> StoreResult<HashMap<String, ObjectBox>> {
        self.refresh(&self.object_boxes)
    }

    /// Rebuild the object cache from the `object` bucket
    pub fn sync_objects(&self) -> StoreResult<HashMap<String, UserObject>> {
        self.refresh(&self.objects)
    }

    /// Rebuild all three caches, stopping at the first failure
    pub fn sync_all(&self) -> StoreResult<()> {
        self.sync_users()?;
        self.sync_object_boxes()?;
        self.sync_objects()?;
        Ok(())
    }

    // ---- Lookups ----

    pub fn user(&self, id: &str) -> Option<Person> {
        self.users.read().get(id).cloned()
    }

    pub fn object_box(&self, owner_id: &str) -> Option<ObjectBox> {
        self.object_boxes.read().get(owner_id).cloned()
    }

    pub fn object(&self, object_id: &str) -> Option<UserObject> {
        self.objects.read().get(object_id).cloned()
    }

    /// Snapshot of the user cache
    pub fn users(&self) -> HashMap<String, Person> {
        self.users.read().clone()
    }

    /// Snapshot of the object box cache
    pub fn object_boxes(&self) -> HashMap<String, ObjectBox> {
        self.object_boxes.read().clone()
    }

    /// Snapshot of the object cache
    pub fn objects(&self) -> HashMap<String, UserObject> {
        self.objects.read().clone()
    }

    /// Objects listed in `owner_id`'s box that are present in the object cache,
    /// in box order. IDs with no cached object are skipped.
    pub fn objects_of(&self, owner_id: &str) -> Vec<UserObject> {
        let Some(object_box) = self.object_box(owner_id) else {
            return Vec::new();
        };
        let objects = self.objects.read();
        object_box
            .objects
            .iter()
            .filter_map(|id| objects.get(id).cloned())
            .collect()
    }

    /// Objects in `owner_id`'s box that `viewer_id` may read, in box order.
    pub fn objects_visible_to(&self, owner_id: &str, viewer_id: &str) -> Vec<UserObject> {
        self.objects_of(owner_id)
            .into_iter()
            .filter(|object| object.is_readable_by(viewer_id))
            .collect()
    }

    // ---- Generic helpers ----

    fn refresh<T: Record>(
        &self,
        slot: &RwLock<HashMap<String, T>>,
    ) -> StoreResult<HashMap<String, T>> {
        match self.load::<T>() {
            Ok(fresh) => {
                *slot.write() = fresh.clone();
                info!("Synced {} entries from bucket '{}'", fresh.len(), T::BUCKET);
                Ok(fresh)
            }
            Err(e) => {
                error!("Failed to sync bucket '{}': {}", T::BUCKET, e);
                Err(e)
            }
        }
    }

    fn load<T: Record>(&self) -> StoreResult<HashMap<String, T>> {
        let mut map = HashMap::new();
        self.store.scan(T::BUCKET, |key, bytes| {
            let record = T::decode(bytes).map_err(|source| StoreError::Decode {
                bucket: T::BUCKET.to_string(),
                key: key.to_string(),
                source,
            })?;
            map.insert(key.to_string(), record);
            Ok(())
        })?;
        Ok(map)
    }
}
