//! Codec for file-backed object payloads.
//!
//! Large payloads are not stored in the record store. Each object's payload
//! lives in a file named by its object ID under the configured payload
//! directory and is normally base64 text. Reads are bounded by the object's
//! declared `Size`.

use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::{DecodeError, Engine};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, warn};
use userinfo_common::{BlobConfig, DecodePolicy, UserObject};

/// Standard padded alphabet. Non-zero trailing bits in the last symbol are
/// accepted, as existing payload writers produce them.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Error type for payload access
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("payload io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid base64 payload for object '{object_id}': {source}")]
    Decode {
        object_id: String,
        #[source]
        source: DecodeError,
    },
}

/// Reads and writes object payload files.
#[derive(Clone, Debug)]
pub struct BlobCodec {
    payload_dir: PathBuf,
    policy: DecodePolicy,
}

impl BlobCodec {
    pub fn new(payload_dir: impl Into<PathBuf>, policy: DecodePolicy) -> Self {
        Self {
            payload_dir: payload_dir.into(),
            policy,
        }
    }

    pub fn from_config(config: &BlobConfig) -> Self {
        Self::new(&config.payload_dir, config.decode_policy)
    }

    pub const fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// File holding the payload of `object`
    pub fn payload_path(&self, object: &UserObject) -> PathBuf {
        self.payload_dir.join(&object.object_id)
    }

    /// Read up to `object.size` bytes of the payload.
    pub fn read_payload(&self, object: &UserObject) -> Result<Vec<u8>, BlobError> {
        let path = self.payload_path(object);
        let io_error = |source: io::Error| BlobError::Io {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(io_error)?;
        let on_disk = file.metadata().map_err(io_error)?.len();
        let capacity = usize::try_from(object.size.min(on_disk)).unwrap_or(0);

        let mut buf = Vec::with_capacity(capacity);
        file.take(object.size)
            .read_to_end(&mut buf)
            .map_err(io_error)?;
        debug!(object_id = %object.object_id, len = buf.len(), "payload read");
        Ok(buf)
    }

    /// Payload as text, without re-encoding.
    ///
    /// The payload is expected to already be base64. Returns an empty string
    /// if the file cannot be read.
    pub fn to_base64(&self, object: &UserObject) -> String {
        match self.read_payload(object) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Failed to read payload for object '{}': {}", object.object_id, e);
                String::new()
            }
        }
    }

    /// Payload decoded from base64.
    ///
    /// Returns an empty vector if the file cannot be read. Invalid base64 is
    /// handled according to the codec's [`DecodePolicy`].
    pub fn to_raw_bytes(&self, object: &UserObject) -> Vec<u8> {
        let encoded = match self.read_payload(object) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read payload for object '{}': {}", object.object_id, e);
                return Vec::new();
            }
        };
        let encoded = strip_line_breaks(&encoded);
        match (BASE64.decode(&encoded), self.policy) {
            (Ok(raw), _) => raw,
            (Err(e), DecodePolicy::Strict) => {
                warn!("Invalid base64 payload for object '{}': {}", object.object_id, e);
                Vec::new()
            }
            (Err(e), DecodePolicy::Lenient) => {
                debug!(object_id = %object.object_id, error = %e, "keeping decoded prefix");
                decode_prefix(&encoded, &e)
            }
        }
    }

    /// Payload decoded from base64, surfacing every failure.
    pub fn try_raw_bytes(&self, object: &UserObject) -> Result<Vec<u8>, BlobError> {
        let encoded = strip_line_breaks(&self.read_payload(object)?);
        BASE64.decode(encoded).map_err(|source| BlobError::Decode {
            object_id: object.object_id.clone(),
            source,
        })
    }

    /// Store `raw` as the base64 payload of `object` and set its size.
    pub fn write_payload(&self, object: &mut UserObject, raw: &[u8]) -> Result<(), BlobError> {
        let path = self.payload_path(object);
        let io_error = |source: io::Error| BlobError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let encoded = BASE64.encode(raw);
        fs::write(&path, encoded.as_bytes()).map_err(io_error)?;
        object.size = encoded.len() as u64;
        debug!(object_id = %object.object_id, size = object.size, "payload written");
        Ok(())
    }

    /// Delete the payload file of `object`; a missing file is not an error.
    pub fn remove_payload(&self, object: &UserObject) -> Result<(), BlobError> {
        let path = self.payload_path(object);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BlobError::Io { path, source }),
        }
    }

    /// Check whether a payload file exists for `object`
    pub fn has_payload(&self, object: &UserObject) -> bool {
        self.payload_path(object).is_file()
    }
}

fn strip_line_breaks(input: &[u8]) -> Vec<u8> {
    input
        .iter()
        .copied()
        .filter(|b| !matches!(b, b'\r' | b'\n'))
        .collect()
}

/// Decode the complete 4-byte quanta preceding the first invalid input.
fn decode_prefix(input: &[u8], error: &DecodeError) -> Vec<u8> {
    let mut end = match *error {
        DecodeError::InvalidByte(offset, _) | DecodeError::InvalidLastSymbol(offset, _) => offset,
        _ => input.len(),
    };
    end -= end % 4;
    while end > 0 {
        if let Ok(raw) = BASE64.decode(&input[..end]) {
            return raw;
        }
        end -= 4;
    }
    Vec::new()
}
