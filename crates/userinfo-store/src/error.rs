//! Error type for record store operations

/// Error type for record store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("invalid bucket name: {0:?}")]
    InvalidBucket(String),
    #[error("bucket not found: {0}")]
    BucketNotFound(String),
    #[error("failed to decode '{bucket}/{key}': {source}")]
    Decode {
        bucket: String,
        key: String,
        #[source]
        source: userinfo_common::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[source] userinfo_common::Error),
    #[error("invalid configuration: {0}")]
    Config(#[source] userinfo_common::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store is closed")]
    Closed,
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl StoreError {
    /// Check if the failure came from the storage engine or bucket layout
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Storage(_)
                | Self::Table(_)
                | Self::Transaction(_)
                | Self::Commit(_)
                | Self::InvalidBucket(_)
                | Self::BucketNotFound(_)
                | Self::Io(_)
        )
    }

    /// Check if a persisted record could not be decoded
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(StoreError::BucketNotFound("user".into()).is_storage());
        assert!(!StoreError::Closed.is_storage());

        let decode = StoreError::Decode {
            bucket: "user".into(),
            key: "u1".into(),
            source: userinfo_common::Error::Deserialization("eof".into()),
        };
        assert!(decode.is_decode());
        assert!(!decode.is_storage());
        assert_eq!(
            decode.to_string(),
            "failed to decode 'user/u1': deserialization error: eof"
        );
    }
}
