//! Persisted record types
//!
//! Field names and encodings match the JSON already found in existing
//! stores, so records written by older deployments decode unchanged.

use crate::error::{Error, Result};
use crate::wire::{self, is_zero, quoted};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bucket holding [`Person`] records keyed by user ID
pub const USER_BUCKET: &str = "user";
/// Bucket holding [`ObjectBox`] records keyed by owner ID
pub const OBJECT_BOX_BUCKET: &str = "objectbox";
/// Bucket holding [`UserObject`] records keyed by object ID
pub const OBJECT_BUCKET: &str = "object";

/// Buckets every store is seeded with
pub const DEFAULT_BUCKETS: [&str; 3] = [USER_BUCKET, OBJECT_BOX_BUCKET, OBJECT_BUCKET];

/// A structured entity persisted as JSON under its own key.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Bucket the record type lives in
    const BUCKET: &'static str;

    /// Storage key of this record
    fn key(&self) -> &str;

    /// Encode to the persisted byte form
    fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode from the persisted byte form
    fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// A user profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    #[serde(rename = "ID", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nick_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    /// Opaque application data
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,

    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub gender: u8,
    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub body_type: u8,
    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub age: u8,
    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub looking_for: u8,

    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub height: u32,
    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub zip_code: u32,

    /// Free-form extension value; an explicit `null` is kept
    #[serde(
        default,
        deserialize_with = "wire::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub more: Option<serde_json::Value>,
}

impl Person {
    /// Create a person with only the ID set
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Record for Person {
    const BUCKET: &'static str = USER_BUCKET;

    fn key(&self) -> &str {
        &self.id
    }
}

/// Per-user container listing the IDs of the objects that user owns.
///
/// The owner ID is also the storage key; each user has at most one box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectBox {
    #[serde(rename = "OwnerID", default)]
    pub owner_id: String,
    #[serde(default = "wire::zero_time")]
    pub time_created: DateTime<Utc>,
    #[serde(default = "wire::zero_time")]
    pub time_modified: DateTime<Utc>,
    /// Bucket the owner's objects are segregated in
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,
    /// Owned object IDs, in insertion order
    #[serde(
        default,
        deserialize_with = "wire::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub objects: Vec<String>,
}

impl ObjectBox {
    /// Create an empty box for `owner_id`, stamped with the current time
    pub fn new(owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            owner_id: owner_id.into(),
            time_created: now,
            time_modified: now,
            ..Self::default()
        }
    }
}

impl Default for ObjectBox {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            time_created: wire::zero_time(),
            time_modified: wire::zero_time(),
            bucket: String::new(),
            objects: Vec::new(),
        }
    }
}

impl Record for ObjectBox {
    const BUCKET: &'static str = OBJECT_BOX_BUCKET;

    fn key(&self) -> &str {
        &self.owner_id
    }
}

/// A single stored object: a file, media item, message or link.
///
/// The object ID is the storage key and also names the payload file read by
/// the blob codec.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserObject {
    #[serde(rename = "OwnerID", default)]
    pub owner_id: String,
    #[serde(rename = "ObjectID", default)]
    pub object_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub extension: String,
    /// Base64 payload embedded in the record
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default = "wire::zero_time")]
    pub time_created: DateTime<Utc>,
    #[serde(default = "wire::zero_time")]
    pub time_modified: DateTime<Utc>,
    /// Length in bytes of the backing payload
    #[serde(default, with = "wire::quoted_len")]
    pub size: u64,

    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub is_message: bool,
    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub is_media: bool,
    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub is_file: bool,
    #[serde(default, with = "quoted", skip_serializing_if = "is_zero")]
    pub is_public: bool,

    /// User IDs allowed to read the payload
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub img_src: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub img_base64: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_href: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub r#ref: String,
    /// CSS class hint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class: String,
}

impl UserObject {
    /// Create an object owned by `owner_id`, stamped with the current time
    pub fn new(owner_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            owner_id: owner_id.into(),
            object_id: object_id.into(),
            time_created: now,
            time_modified: now,
            ..Self::default()
        }
    }

    /// Check whether `user_id` may read this object
    #[must_use]
    pub fn is_readable_by(&self, user_id: &str) -> bool {
        self.is_public || self.owner_id == user_id || self.permissions.iter().any(|p| p == user_id)
    }
}

impl Default for UserObject {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            object_id: String::new(),
            title: String::new(),
            filename: String::new(),
            extension: String::new(),
            data: String::new(),
            time_created: wire::zero_time(),
            time_modified: wire::zero_time(),
            size: 0,
            is_message: false,
            is_media: false,
            is_file: false,
            is_public: false,
            permissions: Vec::new(),
            img_src: String::new(),
            img_base64: String::new(),
            link_href: String::new(),
            link_title: String::new(),
            r#ref: String::new(),
            class: String::new(),
        }
    }
}

impl Record for UserObject {
    const BUCKET: &'static str = OBJECT_BUCKET;

    fn key(&self) -> &str {
        &self.object_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_minimal_encoding() {
        let mut person = Person::new("u1");
        person.first_name = "Ann".into();
        let json = String::from_utf8(person.encode().unwrap()).unwrap();
        assert_eq!(json, r#"{"ID":"u1","FirstName":"Ann"}"#);
    }

    #[test]
    fn test_person_quoted_numerics() {
        let person = Person {
            id: "u2".into(),
            age: 31,
            zip_code: 90210,
            more: Some(serde_json::json!({"likes": ["tea"]})),
            ..Person::default()
        };
        let json = String::from_utf8(person.encode().unwrap()).unwrap();
        assert!(json.contains(r#""Age":"31""#));
        assert!(json.contains(r#""ZipCode":"90210""#));
        assert!(!json.contains("Gender"));

        let decoded = Person::decode(json.as_bytes()).unwrap();
        assert_eq!(decoded, person);
    }

    #[test]
    fn test_person_decode_existing_form() {
        let stored = br#"{"ID":"u3","Email":"a@b.c","Gender":"2","Height":"180","More":"x"}"#;
        let person = Person::decode(stored).unwrap();
        assert_eq!(person.id, "u3");
        assert_eq!(person.email, "a@b.c");
        assert_eq!(person.gender, 2);
        assert_eq!(person.height, 180);
        assert_eq!(person.more, Some(serde_json::json!("x")));
        assert_eq!(person.age, 0);
    }

    #[test]
    fn test_person_null_more_survives() {
        let person = Person {
            id: "u".into(),
            more: Some(serde_json::Value::Null),
            ..Person::default()
        };
        let json = person.encode().unwrap();
        assert_eq!(json, br#"{"ID":"u","More":null}"#);
        assert_eq!(Person::decode(&json).unwrap(), person);
        assert_eq!(Person::decode(br#"{"ID":"u"}"#).unwrap().more, None);
    }

    #[test]
    fn test_person_decode_rejects_out_of_range() {
        let err = Person::decode(br#"{"ID":"u4","Age":"300"}"#).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_object_box_encoding() {
        let mut object_box = ObjectBox::default();
        object_box.owner_id = "u1".into();
        let json = String::from_utf8(object_box.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"OwnerID":"u1","TimeCreated":"0001-01-01T00:00:00Z","TimeModified":"0001-01-01T00:00:00Z"}"#
        );

        object_box.objects = vec!["o1".into(), "o2".into()];
        let decoded = ObjectBox::decode(&object_box.encode().unwrap()).unwrap();
        assert_eq!(decoded.objects, vec!["o1", "o2"]);
        assert_eq!(decoded.key(), "u1");
    }

    #[test]
    fn test_object_box_decode_offset_timestamp() {
        let stored = br#"{"OwnerID":"u1","TimeCreated":"2017-03-04T10:00:00.5-08:00","Objects":null}"#;
        let object_box = ObjectBox::decode(stored).unwrap();
        assert_eq!(
            object_box.time_created.to_rfc3339(),
            "2017-03-04T18:00:00.500+00:00"
        );
        assert_eq!(object_box.time_modified, wire::zero_time());
        assert!(object_box.objects.is_empty());
    }

    #[test]
    fn test_user_object_encoding() {
        let mut object = UserObject::default();
        object.owner_id = "u1".into();
        object.object_id = "o1".into();
        object.size = 12;
        object.is_media = true;
        let json = String::from_utf8(object.encode().unwrap()).unwrap();
        assert!(json.contains(r#""Size":"12""#));
        assert!(json.contains(r#""IsMedia":"true""#));
        assert!(!json.contains("IsFile"));
        assert!(json.contains(r#""Permissions":[]"#));
        assert!(!json.contains("Ref"));

        let decoded = UserObject::decode(json.as_bytes()).unwrap();
        assert_eq!(decoded, object);
    }

    #[test]
    fn test_user_object_decode_null_permissions() {
        let stored = br#"{"OwnerID":"u1","ObjectID":"o9","Size":"0","Permissions":null,"Ref":"r"}"#;
        let object = UserObject::decode(stored).unwrap();
        assert!(object.permissions.is_empty());
        assert_eq!(object.r#ref, "r");
        assert_eq!(object.key(), "o9");
    }

    #[test]
    fn test_user_object_negative_size_reads_as_zero() {
        let object = UserObject::decode(br#"{"ObjectID":"o1","Size":"-1"}"#).unwrap();
        assert_eq!(object.size, 0);
        assert!(String::from_utf8(object.encode().unwrap()).unwrap().contains(r#""Size":"0""#));
    }

    #[test]
    fn test_user_object_readable_by() {
        let mut object = UserObject::new("owner", "o1");
        object.permissions = vec!["friend".into()];
        assert!(object.is_readable_by("owner"));
        assert!(object.is_readable_by("friend"));
        assert!(!object.is_readable_by("stranger"));
        object.is_public = true;
        assert!(object.is_readable_by("stranger"));
    }
}
