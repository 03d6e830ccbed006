use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::storage::{Storage, StorageError};

const MANIFEST_ENTRY: &str = "manifest.json";
const COLLECTIONS_DIR: &str = "collections";
pub const SNAPSHOT_FORMAT_V1: &str = "schoold-snapshot-v1";

#[derive(Debug, Error)]
pub enum BackupError {
    /// Reading or writing the zip bundle failed.
    #[error("{0:#}")]
    Bundle(#[from] anyhow::Error),

    #[error("unsupported snapshot format: {0}")]
    UnsupportedFormat(String),

    /// An entry's bytes do not hash to the value recorded in the manifest.
    #[error("checksum mismatch for {entry}")]
    ChecksumMismatch { entry: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub key: String,
    pub path: String,
    pub sha256: String,
    pub bytes: usize,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub format: String,
    pub app_version: String,
    pub exported_at: String,
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub format: String,
    pub restored_keys: Vec<String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn write_snapshot(storage: &dyn Storage, out_path: &Path) -> Result<SnapshotSummary, BackupError> {
    let mut blobs = Vec::new();
    for key in storage.keys()? {
        if let Some(blob) = storage.get(&key)? {
            blobs.push((key, blob));
        }
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(blobs.len());
    for (key, blob) in &blobs {
        let path = format!("{COLLECTIONS_DIR}/{key}.json");
        zip.start_file(path.as_str(), opts)
            .with_context(|| format!("failed to start entry {path}"))?;
        zip.write_all(blob.payload.as_bytes())
            .with_context(|| format!("failed to write entry {path}"))?;
        entries.push(ManifestEntry {
            key: key.clone(),
            sha256: sha256_hex(blob.payload.as_bytes()),
            bytes: blob.payload.len(),
            revision: blob.revision,
            path,
        });
    }

    let manifest = Manifest {
        format: SNAPSHOT_FORMAT_V1.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        entries,
    };
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;
    zip.finish().context("failed to finalize zip bundle")?;

    tracing::info!(path = %out_path.display(), entries = manifest.entries.len(), "snapshot written");
    Ok(SnapshotSummary {
        format: SNAPSHOT_FORMAT_V1.to_string(),
        entry_count: manifest.entries.len(),
    })
}

/// Verifies every entry against the manifest, then writes them all into
/// `storage`. Nothing is written if any entry fails verification.
pub fn restore_snapshot(in_path: &Path, storage: &mut dyn Storage) -> Result<RestoreSummary, BackupError> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: Manifest =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid")?;
    if manifest.format != SNAPSHOT_FORMAT_V1 {
        return Err(BackupError::UnsupportedFormat(manifest.format));
    }

    let mut verified = Vec::with_capacity(manifest.entries.len());
    for entry in &manifest.entries {
        let mut payload = String::new();
        archive
            .by_name(&entry.path)
            .with_context(|| format!("bundle missing {}", entry.path))?
            .read_to_string(&mut payload)
            .with_context(|| format!("failed to read {}", entry.path))?;
        if sha256_hex(payload.as_bytes()) != entry.sha256 {
            return Err(BackupError::ChecksumMismatch {
                entry: entry.path.clone(),
            });
        }
        verified.push((entry.key.clone(), payload));
    }

    let mut restored_keys = Vec::with_capacity(verified.len());
    for (key, payload) in verified {
        let current = storage.get(&key)?.map(|b| b.revision).unwrap_or(0);
        storage
            .put(&key, &payload, current)
            .map_err(|e| match e {
                StorageError::Conflict { .. } => BackupError::Bundle(anyhow!("{key} changed during restore")),
                other => BackupError::Storage(other),
            })?;
        restored_keys.push(key);
    }

    tracing::info!(path = %in_path.display(), keys = restored_keys.len(), "snapshot restored");
    Ok(RestoreSummary {
        format: manifest.format,
        restored_keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn seeded() -> MemoryStorage {
        let mut s = MemoryStorage::new();
        s.put("students", r#"[{"id":"SS001"}]"#, 0).expect("put");
        s.put("profile_3", r#"{"isClassTeacher":"true"}"#, 0).expect("put");
        s
    }

    #[test]
    fn snapshot_restores_into_empty_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = dir.path().join("out").join("snap.zip");
        let summary = write_snapshot(&seeded(), &bundle).expect("snapshot");
        assert_eq!(summary.entry_count, 2);

        let mut target = MemoryStorage::new();
        let restored = restore_snapshot(&bundle, &mut target).expect("restore");
        assert_eq!(restored.restored_keys, vec!["profile_3", "students"]);
        let blob = target.get("students").expect("get").expect("blob");
        assert_eq!(blob.payload, r#"[{"id":"SS001"}]"#);
    }

    #[test]
    fn tampered_entry_is_rejected_before_any_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = dir.path().join("snap.zip");
        write_snapshot(&seeded(), &bundle).expect("snapshot");

        // Rebuild the bundle with the original manifest but altered data.
        let mut manifest_text = String::new();
        {
            let mut a = ZipArchive::new(File::open(&bundle).expect("open")).expect("zip");
            a.by_name(MANIFEST_ENTRY)
                .expect("manifest")
                .read_to_string(&mut manifest_text)
                .expect("read");
        }
        let forged = dir.path().join("forged.zip");
        let mut zip = ZipWriter::new(File::create(&forged).expect("create"));
        let opts = FileOptions::default();
        zip.start_file("collections/profile_3.json", opts).expect("start");
        zip.write_all(br#"{"isClassTeacher":"true"}"#).expect("write");
        zip.start_file("collections/students.json", opts).expect("start");
        zip.write_all(b"[]").expect("write");
        zip.start_file(MANIFEST_ENTRY, opts).expect("start");
        zip.write_all(manifest_text.as_bytes()).expect("write");
        zip.finish().expect("finish");

        let mut target = MemoryStorage::new();
        let e = restore_snapshot(&forged, &mut target).unwrap_err();
        assert!(matches!(e, BackupError::ChecksumMismatch { .. }));
        assert!(target.keys().expect("keys").is_empty());
    }
}
