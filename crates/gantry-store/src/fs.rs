//! Filesystem-backed JSON stores with sharded layout and atomic writes.
//!
//! Corpus layout: `<root>/corpus/<first 2 sig chars>/<sig>-<kind>.json`
//! Ledger layout: `<root>/feedback/<record id>.json`
//!
//! Writes go through a temp file in the target directory followed by a
//! rename, so a crash never leaves a truncated record behind. A
//! `tokio::sync::RwLock` serializes batch writes against readers.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::records::{ArtifactKind, FeedbackOutcome, FeedbackRecord, Signature, StoredExample};
use crate::traits::{CorpusStore, FeedbackLedger};

fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let dir = path.parent().expect("record path always has parent");
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// FsCorpusStore
// ---------------------------------------------------------------------------

/// Filesystem-backed corpus store.
pub struct FsCorpusStore {
    corpus_dir: PathBuf,
    lock: RwLock<()>,
}

impl FsCorpusStore {
    /// Create a store rooted at `root`, creating `root/corpus/` if needed.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let corpus_dir = root.as_ref().join("corpus");
        fs::create_dir_all(&corpus_dir)?;
        Ok(Self {
            corpus_dir,
            lock: RwLock::new(()),
        })
    }

    fn entry_path(&self, signature: &Signature, kind: ArtifactKind) -> PathBuf {
        let hex = signature.as_str();
        self.corpus_dir
            .join(&hex[..2])
            .join(format!("{}-{}.json", hex, kind.as_str()))
    }

    fn read_all(&self) -> StoreResult<Vec<StoredExample>> {
        let mut out = Vec::new();
        for shard in fs::read_dir(&self.corpus_dir)? {
            let shard = shard?.path();
            if !shard.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&shard)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let bytes = fs::read(&path)?;
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl CorpusStore for FsCorpusStore {
    async fn get(
        &self,
        signature: &Signature,
        kind: ArtifactKind,
    ) -> StoreResult<Option<StoredExample>> {
        let _guard = self.lock.read().await;
        let path = self.entry_path(signature, kind);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn entries(&self, kind: ArtifactKind) -> StoreResult<Vec<StoredExample>> {
        let _guard = self.lock.read().await;
        let mut out: Vec<StoredExample> = self
            .read_all()?
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect();
        out.sort_by(|a, b| a.signature.as_str().cmp(b.signature.as_str()));
        Ok(out)
    }

    async fn put_batch(&self, examples: Vec<StoredExample>) -> StoreResult<()> {
        let _guard = self.lock.write().await;
        for example in examples {
            let path = self.entry_path(&example.signature, example.kind);
            let bytes = serde_json::to_vec_pretty(&example)?;
            write_atomic(&path, &bytes)?;
        }
        Ok(())
    }

    async fn len(&self) -> StoreResult<usize> {
        let _guard = self.lock.read().await;
        Ok(self.read_all()?.len())
    }
}

// ---------------------------------------------------------------------------
// FsFeedbackLedger
// ---------------------------------------------------------------------------

/// Filesystem-backed feedback ledger, one JSON file per record.
pub struct FsFeedbackLedger {
    feedback_dir: PathBuf,
    lock: RwLock<()>,
}

impl FsFeedbackLedger {
    /// Create a ledger rooted at `root`, creating `root/feedback/` if needed.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let feedback_dir = root.as_ref().join("feedback");
        fs::create_dir_all(&feedback_dir)?;
        Ok(Self {
            feedback_dir,
            lock: RwLock::new(()),
        })
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.feedback_dir.join(format!("{}.json", id))
    }

    fn read_all(&self) -> StoreResult<Vec<FeedbackRecord>> {
        let mut out: Vec<FeedbackRecord> = Vec::new();
        for entry in fs::read_dir(&self.feedback_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            out.push(serde_json::from_slice(&bytes)?);
        }
        out.sort_by_key(|r| r.recorded_at);
        Ok(out)
    }
}

#[async_trait]
impl FeedbackLedger for FsFeedbackLedger {
    async fn append(&self, record: FeedbackRecord) -> StoreResult<()> {
        let _guard = self.lock.write().await;
        let path = self.record_path(record.id);
        let bytes = serde_json::to_vec_pretty(&record)?;
        write_atomic(&path, &bytes)
    }

    async fn get(&self, id: Uuid) -> StoreResult<FeedbackRecord> {
        let _guard = self.lock.read().await;
        match fs::read(self.record_path(id)) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::FeedbackNotFound { id })
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn unfolded_accepted(&self) -> StoreResult<Vec<FeedbackRecord>> {
        let _guard = self.lock.read().await;
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| !r.folded && r.outcome != FeedbackOutcome::Rejected)
            .collect())
    }

    async fn mark_folded(&self, ids: &[Uuid]) -> StoreResult<()> {
        let _guard = self.lock.write().await;
        for &id in ids {
            let path = self.record_path(id);
            let bytes = fs::read(&path)?;
            let mut record: FeedbackRecord = serde_json::from_slice(&bytes)?;
            record.folded = true;
            write_atomic(&path, &serde_json::to_vec_pretty(&record)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RetrievalFacets;
    use chrono::Utc;

    #[tokio::test]
    async fn corpus_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let sig = Signature::from_parts(["rust", "axum"]);

        let store = FsCorpusStore::new(dir.path()).unwrap();
        store
            .put_batch(vec![StoredExample {
                signature: sig.clone(),
                kind: ArtifactKind::Dockerfile,
                content: "FROM rust:1.75".to_string(),
                facets: RetrievalFacets::default(),
                recorded_at: Utc::now(),
            }])
            .await
            .unwrap();
        drop(store);

        let reopened = FsCorpusStore::new(dir.path()).unwrap();
        let got = reopened.get(&sig, ArtifactKind::Dockerfile).await.unwrap();
        assert_eq!(got.unwrap().content, "FROM rust:1.75");
    }

    #[tokio::test]
    async fn ledger_get_missing_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FsFeedbackLedger::new(dir.path()).unwrap();
        let err = ledger.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::FeedbackNotFound { .. }));
    }
}
