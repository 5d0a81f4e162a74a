//! On-disk persistence for the vector index.
//!
//! An index is two files that are always written and read together:
//!
//! - the **vectors artifact** at the configured path (see [`codec`] for the
//!   binary layout), and
//! - a **JSON sidecar**, `<path>.meta.json` by default, holding the
//!   [`IndexManifest`], the build [`IndexMetadata`] and the chunk texts in
//!   insertion order.
//!
//! The ANN structure itself is not serialized. It is rebuilt from the stored
//! vectors on load, so the format does not depend on the backend.
//!
//! Writes go to temporary siblings first and are renamed into place.

pub mod codec;

use crate::chunking::Chunk;
use crate::config::VectorStoreConfig;
use crate::error::PersistenceError;
use crate::search::{IndexManifest, IndexMetadata};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Locations of the two index files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    index: PathBuf,
    meta: PathBuf,
}

impl IndexPaths {
    /// Vectors artifact at `index`, sidecar at `<index>.meta.json`.
    pub fn new(index: impl Into<PathBuf>) -> Self {
        let index = index.into();
        let meta = default_meta_path(&index);
        Self { index, meta }
    }

    /// Both locations given explicitly.
    pub fn with_meta(index: impl Into<PathBuf>, meta: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            meta: meta.into(),
        }
    }

    /// Paths from configuration; `None` when no index path is configured.
    pub fn from_config(config: &VectorStoreConfig) -> Option<Self> {
        let index = config.path.as_ref()?;
        Some(match &config.meta_path {
            Some(meta) => Self::with_meta(index, meta),
            None => Self::new(index),
        })
    }

    pub fn index(&self) -> &Path {
        &self.index
    }

    pub fn meta(&self) -> &Path {
        &self.meta
    }
}

fn default_meta_path(index: &Path) -> PathBuf {
    let mut name = index.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// JSON sidecar contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSidecar {
    pub manifest: IndexManifest,
    /// Absent for an index that was never stamped
    #[serde(default)]
    pub metadata: Option<IndexMetadata>,
    pub chunks: Vec<Chunk>,
}

/// Everything read back from disk.
#[derive(Debug, Clone)]
pub struct PersistedIndex {
    pub manifest: IndexManifest,
    pub metadata: Option<IndexMetadata>,
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<Vec<f32>>,
}

/// Writes both index files.
///
/// # Errors
///
/// Returns [`PersistenceError::Io`] if a directory, temp file or rename
/// fails, and [`PersistenceError::Serialization`] if the sidecar cannot be
/// encoded. A failed write leaves any previous pair of files in place unless
/// the failure happens between the two renames.
#[instrument(skip_all, fields(path = %paths.index().display(), count = sidecar.chunks.len()))]
pub async fn write_index<V: AsRef<[f32]>>(
    paths: &IndexPaths,
    sidecar: &IndexSidecar,
    vectors: &[V],
) -> Result<(), PersistenceError> {
    let vectors_bin = codec::encode_vectors(sidecar.manifest.dimension, vectors);
    let sidecar_json = serde_json::to_vec_pretty(sidecar)?;

    for path in [paths.index(), paths.meta()] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::io(parent, e))?;
        }
    }

    let index_tmp = temp_path(paths.index());
    let meta_tmp = temp_path(paths.meta());

    tokio::fs::write(&index_tmp, &vectors_bin)
        .await
        .map_err(|e| PersistenceError::io(&index_tmp, e))?;
    tokio::fs::write(&meta_tmp, &sidecar_json)
        .await
        .map_err(|e| PersistenceError::io(&meta_tmp, e))?;

    tokio::fs::rename(&index_tmp, paths.index())
        .await
        .map_err(|e| PersistenceError::io(paths.index(), e))?;
    tokio::fs::rename(&meta_tmp, paths.meta())
        .await
        .map_err(|e| PersistenceError::io(paths.meta(), e))?;

    info!(
        "Saved index: {} vectors ({} bytes)",
        sidecar.manifest.count,
        vectors_bin.len()
    );
    Ok(())
}

/// Reads both index files.
///
/// Returns `Ok(None)` if neither file exists (fresh start).
///
/// # Errors
///
/// - [`PersistenceError::Incomplete`] if only one of the two files exists
/// - [`PersistenceError::Corrupt`] if the artifact is malformed, the schema is
///   too new, or vectors, chunks and manifest disagree on count or dimension
/// - [`PersistenceError::Io`] / [`PersistenceError::Serialization`] on read
///   or decode failures
#[instrument(skip_all, fields(path = %paths.index().display()))]
pub async fn read_index(paths: &IndexPaths) -> Result<Option<PersistedIndex>, PersistenceError> {
    let index_exists = path_exists(paths.index()).await?;
    let meta_exists = path_exists(paths.meta()).await?;

    match (index_exists, meta_exists) {
        (false, false) => {
            debug!("No persisted index found");
            return Ok(None);
        }
        (true, false) => {
            return Err(PersistenceError::Incomplete(format!(
                "{} exists but its sidecar {} is missing",
                paths.index().display(),
                paths.meta().display()
            )));
        }
        (false, true) => {
            return Err(PersistenceError::Incomplete(format!(
                "sidecar {} exists but {} is missing",
                paths.meta().display(),
                paths.index().display()
            )));
        }
        (true, true) => {}
    }

    let vectors_bin = tokio::fs::read(paths.index())
        .await
        .map_err(|e| PersistenceError::io(paths.index(), e))?;
    let sidecar_json = tokio::fs::read(paths.meta())
        .await
        .map_err(|e| PersistenceError::io(paths.meta(), e))?;

    let (dimension, vectors) = codec::decode_vectors(&vectors_bin)?;
    let sidecar: IndexSidecar = serde_json::from_slice(&sidecar_json)?;

    if !sidecar.manifest.is_compatible() {
        return Err(PersistenceError::Corrupt(format!(
            "index requires schema version {}",
            sidecar.manifest.min_compatible_version
        )));
    }
    if sidecar.manifest.count != vectors.len() || sidecar.chunks.len() != vectors.len() {
        return Err(PersistenceError::Corrupt(format!(
            "manifest lists {} entries, artifact holds {} vectors and sidecar {} chunks",
            sidecar.manifest.count,
            vectors.len(),
            sidecar.chunks.len()
        )));
    }
    if !vectors.is_empty() && sidecar.manifest.dimension != dimension {
        return Err(PersistenceError::Corrupt(format!(
            "manifest dimension {} disagrees with artifact dimension {dimension}",
            sidecar.manifest.dimension
        )));
    }

    debug!("Read {} vectors of dimension {}", vectors.len(), dimension);

    Ok(Some(PersistedIndex {
        manifest: sidecar.manifest,
        metadata: sidecar.metadata,
        chunks: sidecar.chunks,
        vectors,
    }))
}

async fn path_exists(path: &Path) -> Result<bool, PersistenceError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| PersistenceError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::vector::Similarity;
    use tempfile::TempDir;

    fn sidecar(chunks: &[&str], dimension: usize) -> IndexSidecar {
        IndexSidecar {
            manifest: IndexManifest::new(dimension, chunks.len(), Similarity::Cosine),
            metadata: Some(IndexMetadata::new("test-model", "whole", "sig")),
            chunks: chunks.iter().map(|c| Chunk::new(*c)).collect(),
        }
    }

    #[test]
    fn test_default_meta_path() {
        let paths = IndexPaths::new("/data/index.bin");
        assert_eq!(paths.meta(), Path::new("/data/index.bin.meta.json"));
    }

    #[test]
    fn test_paths_from_config() {
        let mut config = VectorStoreConfig::default();
        assert!(IndexPaths::from_config(&config).is_none());

        config.path = Some(PathBuf::from("idx.bin"));
        config.meta_path = Some(PathBuf::from("meta.json"));
        let paths = IndexPaths::from_config(&config).unwrap();
        assert_eq!(paths.index(), Path::new("idx.bin"));
        assert_eq!(paths.meta(), Path::new("meta.json"));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(temp_dir.path().join("nested/index.bin"));
        let vectors = vec![vec![1.0f32, 0.0], vec![0.0, 1.0]];

        write_index(&paths, &sidecar(&["a", "b"], 2), &vectors)
            .await
            .unwrap();
        let loaded = read_index(&paths).await.unwrap().unwrap();

        assert_eq!(loaded.vectors, vectors);
        assert_eq!(loaded.chunks, vec![Chunk::new("a"), Chunk::new("b")]);
        assert_eq!(
            loaded.metadata,
            Some(IndexMetadata::new("test-model", "whole", "sig"))
        );
        assert_eq!(loaded.manifest.count, 2);
        assert!(!temp_path(paths.index()).exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(temp_dir.path().join("index.bin"));
        assert!(read_index(&paths).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_without_sidecar_is_incomplete() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(temp_dir.path().join("index.bin"));
        write_index(&paths, &sidecar(&["a"], 1), &[vec![1.0f32]])
            .await
            .unwrap();
        std::fs::remove_file(paths.meta()).unwrap();

        assert!(matches!(
            read_index(&paths).await,
            Err(PersistenceError::Incomplete(_))
        ));
    }

    #[tokio::test]
    async fn test_read_without_artifact_is_incomplete() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(temp_dir.path().join("index.bin"));
        write_index(&paths, &sidecar(&["a"], 1), &[vec![1.0f32]])
            .await
            .unwrap();
        std::fs::remove_file(paths.index()).unwrap();

        assert!(matches!(
            read_index(&paths).await,
            Err(PersistenceError::Incomplete(_))
        ));
    }

    #[tokio::test]
    async fn test_count_disagreement_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(temp_dir.path().join("index.bin"));
        // Two chunks but one vector
        write_index(&paths, &sidecar(&["a", "b"], 1), &[vec![1.0f32]])
            .await
            .unwrap();

        assert!(matches!(
            read_index(&paths).await,
            Err(PersistenceError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_garbage_sidecar_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(temp_dir.path().join("index.bin"));
        write_index(&paths, &sidecar(&["a"], 1), &[vec![1.0f32]])
            .await
            .unwrap();
        std::fs::write(paths.meta(), b"{not json").unwrap();

        assert!(matches!(
            read_index(&paths).await,
            Err(PersistenceError::Serialization(_))
        ));
    }
}
