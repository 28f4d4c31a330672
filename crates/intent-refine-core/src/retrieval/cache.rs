//! Content-addressed persistence for [`RetrievalIndex`].
//!
//! The cache key hashes the example store together with the vectorizer
//! parameters, so editing the dataset produces a new file instead of
//! reusing a stale index.

use super::index::RetrievalIndex;
use super::vectorizer::VectorizerParams;
use super::RetrievalError;
use intent_refine_config::ExampleStore;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Bumped whenever the persisted layout changes
const FORMAT_VERSION: u32 = 1;

/// How the index was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Loaded from an existing file
    Hit,
    /// No file existed; built and written
    Built,
    /// The file was unreadable; rebuilt and overwritten
    Rebuilt,
}

#[derive(Serialize)]
struct PersistedIndexRef<'a> {
    version: u32,
    fingerprint: &'a str,
    index: &'a RetrievalIndex,
}

#[derive(Deserialize)]
struct PersistedIndex {
    version: u32,
    fingerprint: String,
    index: RetrievalIndex,
}

/// Directory of persisted indexes keyed by content fingerprint
#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
}

impl IndexCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// BLAKE3 hex digest of the store contents and fitting parameters
    pub fn fingerprint(
        store: &ExampleStore,
        params: &VectorizerParams,
    ) -> Result<String, RetrievalError> {
        let store_bytes =
            serde_json::to_vec(store).map_err(|e| RetrievalError::Serialization(e.to_string()))?;
        let params_bytes =
            serde_json::to_vec(params).map_err(|e| RetrievalError::Serialization(e.to_string()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(&FORMAT_VERSION.to_le_bytes());
        hasher.update(&store_bytes);
        hasher.update(&params_bytes);
        Ok(hasher.finalize().to_hex().to_string())
    }

    /// File an index with this fingerprint lives in
    pub fn path_for(&self, fingerprint: &str) -> PathBuf {
        let short = &fingerprint[..fingerprint.len().min(16)];
        self.dir.join(format!("index-{short}.bin"))
    }

    /// Load the cached index for `store`, building and persisting it on a miss.
    ///
    /// A corrupt file is rebuilt rather than treated as fatal.
    pub fn load_or_build(
        &self,
        store: &ExampleStore,
        params: VectorizerParams,
    ) -> Result<(RetrievalIndex, CacheStatus), RetrievalError> {
        let fingerprint = Self::fingerprint(store, &params)?;
        let path = self.path_for(&fingerprint);

        let status = if path.exists() {
            match Self::load(&path, &fingerprint) {
                Ok(index) => {
                    tracing::info!("Loaded cached index from {}", path.display());
                    return Ok((index, CacheStatus::Hit));
                }
                Err(e) => {
                    tracing::warn!("Discarding cached index: {}", e);
                    CacheStatus::Rebuilt
                }
            }
        } else {
            CacheStatus::Built
        };

        let index = RetrievalIndex::build(store, params)?;
        Self::save(&path, &fingerprint, &index)?;
        tracing::info!("Index cached to {}", path.display());
        Ok((index, status))
    }

    /// Read an index, checking format version and fingerprint
    pub fn load(path: &Path, fingerprint: &str) -> Result<RetrievalIndex, RetrievalError> {
        let bytes = std::fs::read(path).map_err(|source| RetrievalError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let persisted: PersistedIndex =
            bincode::deserialize(&bytes).map_err(|e| RetrievalError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if persisted.version != FORMAT_VERSION {
            return Err(RetrievalError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "format version {} (expected {})",
                    persisted.version, FORMAT_VERSION
                ),
            });
        }
        if persisted.fingerprint != fingerprint {
            return Err(RetrievalError::Corrupt {
                path: path.to_path_buf(),
                reason: "fingerprint mismatch".to_string(),
            });
        }

        Ok(persisted.index)
    }

    /// Write via a temp file in the same directory and rename into place
    pub fn save(path: &Path, fingerprint: &str, index: &RetrievalIndex) -> Result<(), RetrievalError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source| RetrievalError::Io {
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(io_err)?;

        let bytes = bincode::serialize(&PersistedIndexRef {
            version: FORMAT_VERSION,
            fingerprint,
            index,
        })
        .map_err(|e| RetrievalError::Serialization(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ExampleStore {
        ExampleStore::from_pairs(vec![
            ("FLASHLIGHT_ON", vec!["flashlight on", "torch on"]),
            ("FLASHLIGHT_OFF", vec!["flashlight off", "torch off"]),
            ("OPEN_CAMERA", vec!["open camera"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::new(dir.path());

        let (built, status) = cache.load_or_build(&store(), VectorizerParams::default()).unwrap();
        assert_eq!(status, CacheStatus::Built);

        let (loaded, status) = cache.load_or_build(&store(), VectorizerParams::default()).unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(loaded, built);
    }

    #[test]
    fn test_reload_ranks_identically() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::new(dir.path());
        let fresh = RetrievalIndex::build(&store(), VectorizerParams::default()).unwrap();

        cache.load_or_build(&store(), VectorizerParams::default()).unwrap();
        let (reloaded, status) = cache.load_or_build(&store(), VectorizerParams::default()).unwrap();
        assert_eq!(status, CacheStatus::Hit);

        for query in ["turn the torch on", "flashlight off please", "camera", ""] {
            assert_eq!(reloaded.rank(query, 3), fresh.rank(query, 3));
        }
    }

    #[test]
    fn test_changed_store_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::new(dir.path());
        cache.load_or_build(&store(), VectorizerParams::default()).unwrap();

        let changed = ExampleStore::from_pairs(vec![
            ("FLASHLIGHT_ON", vec!["flashlight on"]),
            ("FLASHLIGHT_OFF", vec!["flashlight off"]),
        ])
        .unwrap();
        let (_, status) = cache.load_or_build(&changed, VectorizerParams::default()).unwrap();
        assert_eq!(status, CacheStatus::Built);
    }

    #[test]
    fn test_fingerprint_covers_params() {
        let default = IndexCache::fingerprint(&store(), &VectorizerParams::default()).unwrap();
        let capped = IndexCache::fingerprint(
            &store(),
            &VectorizerParams {
                max_features: 10,
                ..Default::default()
            },
        )
        .unwrap();
        assert_ne!(default, capped);
        assert_eq!(
            default,
            IndexCache::fingerprint(&store(), &VectorizerParams::default()).unwrap()
        );
    }

    #[test]
    fn test_corrupt_file_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::new(dir.path());
        let fingerprint = IndexCache::fingerprint(&store(), &VectorizerParams::default()).unwrap();
        let path = cache.path_for(&fingerprint);
        std::fs::write(&path, b"not an index").unwrap();

        let (index, status) = cache.load_or_build(&store(), VectorizerParams::default()).unwrap();
        assert_eq!(status, CacheStatus::Rebuilt);
        assert_eq!(index.len(), 5);

        assert!(IndexCache::load(&path, &fingerprint).is_ok());
    }

    #[test]
    fn test_fingerprint_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");
        let index = RetrievalIndex::build(&store(), VectorizerParams::default()).unwrap();
        IndexCache::save(&path, "abc", &index).unwrap();

        let result = IndexCache::load(&path, "def");
        assert!(matches!(result, Err(RetrievalError::Corrupt { .. })));
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::new(dir.path().join("nested").join("cache"));
        let (_, status) = cache.load_or_build(&store(), VectorizerParams::default()).unwrap();
        assert_eq!(status, CacheStatus::Built);
        assert!(cache.dir().exists());
    }
}
