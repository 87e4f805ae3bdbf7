//! Userinfo Common - Shared types and utilities
//!
//! This crate provides the persisted record types, the wire codec that keeps
//! their JSON form compatible with existing stores, configuration and the
//! common error type.

pub mod config;
pub mod error;
pub mod types;
pub mod wire;

pub use config::{BlobConfig, DecodePolicy, LoggingConfig, StoreConfig};
pub use error::{Error, Result};
pub use types::*;
