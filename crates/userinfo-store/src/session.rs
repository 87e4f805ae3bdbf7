//! A store session: the record store, its caches and the payload codec.
//!
//! `Session::init` is the single entry point a host calls at startup. The
//! session owns everything a process previously kept in globals, so several
//! independent stores can coexist in one process.

use crate::blob::BlobCodec;
use crate::cache::RecordCache;
use crate::error::{StoreError, StoreResult};
use crate::store::RecordStore;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;
use userinfo_common::StoreConfig;

/// Length of identifiers produced by [`Session::new_id`]
pub const ID_LEN: usize = 16;

pub struct Session {
    store: Arc<RecordStore>,
    cache: RecordCache,
    blobs: BlobCodec,
    rng: Mutex<StdRng>,
}

impl Session {
    /// Open the configured store, seed its buckets and fill every cache.
    pub fn init(config: &StoreConfig) -> StoreResult<Self> {
        config.validate().map_err(StoreError::Config)?;

        let store = Arc::new(RecordStore::open(&config.location, &config.buckets)?);
        let cache = RecordCache::new(Arc::clone(&store));
        cache.sync_all()?;

        info!(
            "Session ready: {} users, {} object boxes, {} objects",
            cache.users().len(),
            cache.object_boxes().len(),
            cache.objects().len()
        );

        Ok(Self {
            store,
            cache,
            blobs: BlobCodec::from_config(&config.blob),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn blobs(&self) -> &BlobCodec {
        &self.blobs
    }

    /// Random alphanumeric identifier for a new record
    pub fn new_id(&self) -> String {
        let mut rng = self.rng.lock();
        (0..ID_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect()
    }

    /// Close the underlying store. Cached snapshots stay readable.
    pub fn close(&self) -> StoreResult<()> {
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use tempfile::tempdir;
    use userinfo_common::{
        DecodePolicy, ObjectBox, Person, Record, USER_BUCKET, UserObject,
    };

    fn config(dir: &std::path::Path) -> StoreConfig {
        let mut config = StoreConfig::with_location(dir.join("test.db"));
        config.blob.payload_dir = dir.join("objects");
        config
    }

    #[test]
    fn test_init_write_sync_close() {
        let dir = tempdir().unwrap();
        let session = Session::init(&config(dir.path())).unwrap();

        let mut ann = Person::new("u1");
        ann.first_name = "Ann".into();
        session
            .store()
            .write(USER_BUCKET, "u1", &ann.encode().unwrap())
            .unwrap();

        let users = session.cache().sync_users().unwrap();
        assert_eq!(users, HashMap::from([("u1".to_string(), ann)]));

        session.close().unwrap();
        assert!(!session.store().is_open());
    }

    #[test]
    fn test_init_seeds_configured_buckets() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.buckets.push("session".into());
        let session = Session::init(&config).unwrap();

        assert_eq!(
            session.store().buckets().unwrap(),
            vec!["object", "objectbox", "session", "user"]
        );
    }

    #[test]
    fn test_init_loads_existing_records() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        {
            let session = Session::init(&config).unwrap();
            session.store().put_record(&Person::new("u1")).unwrap();
            session.store().put_record(&ObjectBox::new("u1")).unwrap();
            session.close().unwrap();
        }

        let session = Session::init(&config).unwrap();
        assert!(session.cache().user("u1").is_some());
        assert!(session.cache().object_box("u1").is_some());
        assert!(session.cache().objects().is_empty());
    }

    #[test]
    fn test_init_rejects_corrupt_store() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        {
            let store = RecordStore::open(&config.location, &config.buckets).unwrap();
            store.write("object", "o1", b"{\"Size\": \"big\"}").unwrap();
            store.close().unwrap();
        }

        let err = Session::init(&config).err().unwrap();
        assert!(err.is_decode());
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.buckets = vec![String::new()];
        assert!(matches!(Session::init(&config), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_object_with_payload() {
        let dir = tempdir().unwrap();
        let session = Session::init(&config(dir.path())).unwrap();

        let mut object = UserObject::new("u1", session.new_id());
        object.filename = "cat.png".into();
        object.is_media = true;
        session.blobs().write_payload(&mut object, b"\x89PNG\r\n").unwrap();
        session.store().put_record(&object).unwrap();

        let mut object_box = ObjectBox::new("u1");
        object_box.objects.push(object.object_id.clone());
        session.store().put_record(&object_box).unwrap();
        session.cache().sync_all().unwrap();

        let cached = session.cache().object(&object.object_id).unwrap();
        assert_eq!(cached.size, 8);
        assert_eq!(session.blobs().to_base64(&cached), "iVBORw0K");
        assert_eq!(session.blobs().to_raw_bytes(&cached), b"\x89PNG\r\n");
        assert_eq!(session.cache().objects_of("u1"), vec![cached]);
    }

    #[test]
    fn test_lenient_policy_from_config() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.blob.decode_policy = DecodePolicy::Lenient;
        let session = Session::init(&config).unwrap();
        assert_eq!(session.blobs().policy(), DecodePolicy::Lenient);
    }

    #[test]
    fn test_new_id() {
        let dir = tempdir().unwrap();
        let session = Session::init(&config(dir.path())).unwrap();

        let ids: HashSet<String> = (0..100).map(|_| session.new_id()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids
            .iter()
            .all(|id| id.len() == ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())));
    }
}
