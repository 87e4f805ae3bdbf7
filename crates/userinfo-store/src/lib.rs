//! Userinfo Store - embedded persistence for user records and objects
//!
//! This crate implements the bucket-scoped record store on top of redb, the
//! in-memory caches rebuilt from it, and the codec for file-backed object
//! payloads.

pub mod blob;
pub mod cache;
pub mod error;
pub mod session;
pub mod store;

// Re-exports
pub use blob::{BlobCodec, BlobError};
pub use cache::RecordCache;
pub use error::{StoreError, StoreResult};
pub use session::Session;
pub use store::RecordStore;
