//! Single-file snapshot format.
//!
//! ```text
//! CBOR envelope {
//!     magic:          "REGSNAP"
//!     schema_version: 1
//!     sha256:         hex digest of payload
//!     payload:        zstd(CBOR(StoreImage))
//! }
//! ```

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use registrar_kernel::EntityStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::snapshot::StoreImage;

/// Marker identifying a registrar snapshot file.
pub const SNAPSHOT_MAGIC: &str = "REGSNAP";
/// Current snapshot schema version.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Errors from snapshot persistence.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("not a registrar snapshot (magic {0:?})")]
    BadMagic(String),
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    magic: String,
    schema_version: u32,
    sha256: String,
    payload: Vec<u8>,
}

/// Serialize a store into snapshot bytes.
pub fn encode(store: &EntityStore) -> Result<Vec<u8>, PersistError> {
    let image = StoreImage::capture(store);
    let payload = zstd_compress(&cbor_serialize(&image)?)?;
    let envelope = Envelope {
        magic: SNAPSHOT_MAGIC.to_string(),
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        sha256: sha256_hex(&payload),
        payload,
    };
    cbor_serialize(&envelope)
}

/// Parse and verify snapshot bytes.
pub fn decode(bytes: &[u8]) -> Result<EntityStore, PersistError> {
    let envelope: Envelope = cbor_deserialize(bytes)?;
    if envelope.magic != SNAPSHOT_MAGIC {
        return Err(PersistError::BadMagic(envelope.magic));
    }
    if envelope.schema_version != SNAPSHOT_SCHEMA_VERSION {
        return Err(PersistError::SchemaMismatch {
            file_version: envelope.schema_version,
            expected_version: SNAPSHOT_SCHEMA_VERSION,
        });
    }
    let actual = sha256_hex(&envelope.payload);
    if actual != envelope.sha256 {
        return Err(PersistError::IntegrityMismatch {
            expected: envelope.sha256,
            actual,
        });
    }
    let image: StoreImage = cbor_deserialize(&zstd_decompress(&envelope.payload)?)?;
    image.restore()
}

/// Write a snapshot of `store` to `path`.
///
/// The bytes go to a sibling temporary file first and are renamed into
/// place, so an interrupted save never leaves a truncated snapshot.
pub fn save(store: &EntityStore, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let path = path.as_ref();
    let bytes = encode(store)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    tracing::info!(
        path = %path.display(),
        students = store.students().len(),
        courses = store.courses().len(),
        enrollments = store.enrollments().len(),
        "snapshot saved"
    );
    Ok(())
}

/// Load the snapshot at `path`, failing on any problem.
pub fn load(path: impl AsRef<Path>) -> Result<EntityStore, PersistError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let store = decode(&bytes)?;
    tracing::info!(path = %path.display(), "snapshot loaded");
    Ok(store)
}

/// Load the snapshot at `path`, or return an empty store.
///
/// A missing file is the normal first-run case. Anything else (unreadable,
/// corrupt, wrong version) is logged as a warning and also yields an empty
/// store.
pub fn load_or_fresh(path: impl AsRef<Path>) -> EntityStore {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = %path.display(), "no snapshot found, starting empty");
        return EntityStore::new();
    }
    match load(path) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load snapshot, starting empty");
            EntityStore::new()
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, PersistError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| PersistError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, PersistError> {
    ciborium::from_reader(data).map_err(|e| PersistError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, PersistError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, PersistError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
