//! Reference sequences, one expert delivery per motion category.
//!
//! A reference is a JSON array of frames, each frame an array of 17
//! `[x, y, confidence]` triples, already torso-normalized. Loaded references
//! are immutable and handed out as `Arc<PoseSequence>`, so concurrent
//! requests share them without locking the data itself.

use async_trait::async_trait;
use bowl_models::{MotionCategory, PoseSequence};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Source of reference sequences.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Reference sequence for a category.
    async fn load(&self, category: &MotionCategory) -> StorageResult<Arc<PoseSequence>>;
}

/// Filesystem-backed store with an in-process cache.
#[derive(Debug)]
pub struct FsReferenceStore {
    root: PathBuf,
    cache: RwLock<HashMap<String, Arc<PoseSequence>>>,
}

impl FsReferenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{category}/{category}_001.json`
    pub fn reference_path(&self, category: &MotionCategory) -> StorageResult<PathBuf> {
        let key = category.reference_key();
        let relative = Path::new(&key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(key));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }

    /// Number of references currently cached.
    pub async fn cached(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Write a reference sequence for `category`, replacing any existing one.
    pub async fn save(&self, category: &MotionCategory, sequence: &PoseSequence) -> StorageResult<PathBuf> {
        let path = self.reference_path(category)?;
        validate_reference(&path, sequence)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(sequence)?).await?;
        tokio::fs::rename(&tmp, &path).await?;

        self.cache
            .write()
            .await
            .insert(category.reference_key(), Arc::new(sequence.clone()));

        info!(category = %category, frames = sequence.len(), path = %path.display(), "Reference saved");
        Ok(path)
    }

    async fn read_from_disk(&self, category: &MotionCategory) -> StorageResult<PoseSequence> {
        let path = self.reference_path(category)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let sequence: PoseSequence = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::invalid_reference(&path, e.to_string()))?;
        validate_reference(&path, &sequence)?;

        info!(category = %category, frames = sequence.len(), path = %path.display(), "Reference loaded");
        Ok(sequence)
    }
}

#[async_trait]
impl ReferenceStore for FsReferenceStore {
    async fn load(&self, category: &MotionCategory) -> StorageResult<Arc<PoseSequence>> {
        let key = category.reference_key();

        if let Some(hit) = self.cache.read().await.get(&key) {
            debug!(category = %category, "Reference cache hit");
            return Ok(Arc::clone(hit));
        }

        let sequence = Arc::new(self.read_from_disk(category).await?);

        // A concurrent loader may have won the race; keep the first entry.
        let mut cache = self.cache.write().await;
        let entry = cache.entry(key).or_insert(sequence);
        Ok(Arc::clone(entry))
    }
}

fn validate_reference(path: &Path, sequence: &PoseSequence) -> StorageResult<()> {
    if sequence.is_empty() {
        return Err(StorageError::invalid_reference(path, "reference has no frames"));
    }
    if let Some(bad) = sequence.iter().position(|f| !f.is_well_formed()) {
        return Err(StorageError::invalid_reference(
            path,
            format!("frame {} does not have 17 keypoints", bad),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bowl_models::{Keypoint, PoseFrame};

    fn sequence(len: usize) -> PoseSequence {
        PoseSequence::repeated(PoseFrame::uniform(0.1, -0.4, 0.8), len)
    }

    #[test]
    fn test_reference_path_layout() {
        let store = FsReferenceStore::new("/refs");
        assert_eq!(
            store.reference_path(&MotionCategory::Cranker).unwrap(),
            PathBuf::from("/refs/cranker/cranker_001.json")
        );
    }

    #[test]
    fn test_traversal_key_rejected() {
        let store = FsReferenceStore::new("/refs");
        let category = MotionCategory::Custom("..".to_string());
        assert!(matches!(
            store.reference_path(&category),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_save_then_load_shares_one_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsReferenceStore::new(dir.path());
        store.save(&MotionCategory::Stroker, &sequence(12)).await.unwrap();

        let first = store.load(&MotionCategory::Stroker).await.unwrap();
        let second = store.load(&MotionCategory::Stroker).await.unwrap();
        assert_eq!(first.len(), 12);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_load_reads_json_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let category_dir = dir.path().join("twohand");
        std::fs::create_dir_all(&category_dir).unwrap();

        let frame: Vec<[f32; 3]> = (0..17).map(|j| [j as f32 * 0.01, 0.5, 0.9]).collect();
        let json = serde_json::to_string(&vec![frame.clone(), frame]).unwrap();
        std::fs::write(category_dir.join("twohand_001.json"), json).unwrap();

        let store = FsReferenceStore::new(dir.path());
        let reference = store.load(&MotionCategory::TwoHand).await.unwrap();
        assert_eq!(reference.len(), 2);
        assert_eq!(reference.frames[1].keypoints[3], Keypoint::new(0.03, 0.5, 0.9));
        assert_eq!(store.cached().await, 1);
    }

    #[tokio::test]
    async fn test_missing_reference_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsReferenceStore::new(dir.path());
        assert!(matches!(
            store.load(&MotionCategory::Thumbless).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_reference_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("stroker")).unwrap();
        std::fs::write(
            dir.path().join("stroker/stroker_001.json"),
            "[[[0.1, 0.2, 0.9]]]",
        )
        .unwrap();

        let store = FsReferenceStore::new(dir.path());
        assert!(matches!(
            store.load(&MotionCategory::Stroker).await,
            Err(StorageError::InvalidReference { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_reference_cannot_be_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsReferenceStore::new(dir.path());
        assert!(store
            .save(&MotionCategory::Stroker, &PoseSequence::default())
            .await
            .is_err());
    }
}
