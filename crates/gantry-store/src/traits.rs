//! Storage trait definitions.
//!
//! - [`CorpusStore`]: the accepted-example corpus read by the generative
//!   tier. Reads are concurrent-safe; [`CorpusStore::put_batch`] takes
//!   exclusive access for the whole batch so readers never observe a
//!   half-updated corpus.
//! - [`FeedbackLedger`]: append-only feedback history consumed by the
//!   asynchronous corpus updater.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::records::{ArtifactKind, FeedbackRecord, Signature, StoredExample};

/// Accepted-example corpus keyed by `(signature, artifact kind)`.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Exact lookup for one key. `None` if no example has been accepted yet.
    async fn get(&self, signature: &Signature, kind: ArtifactKind)
        -> StoreResult<Option<StoredExample>>;

    /// All entries of one artifact kind, for similarity retrieval.
    async fn entries(&self, kind: ArtifactKind) -> StoreResult<Vec<StoredExample>>;

    /// Insert or supersede entries as one exclusive batch write.
    ///
    /// Within the batch, a later example for the same key supersedes an
    /// earlier one, and both supersede whatever was stored before.
    async fn put_batch(&self, examples: Vec<StoredExample>) -> StoreResult<()>;

    /// Number of entries currently stored.
    async fn len(&self) -> StoreResult<usize>;
}

/// Append-only feedback history.
#[async_trait]
pub trait FeedbackLedger: Send + Sync {
    /// Append one feedback record.
    async fn append(&self, record: FeedbackRecord) -> StoreResult<()>;

    /// Fetch a record by id. `StoreError::FeedbackNotFound` if absent.
    async fn get(&self, id: Uuid) -> StoreResult<FeedbackRecord>;

    /// All accepted (plain or with-edits) records not yet folded into the
    /// corpus, oldest first.
    async fn unfolded_accepted(&self) -> StoreResult<Vec<FeedbackRecord>>;

    /// Mark records as folded after a successful corpus batch write.
    async fn mark_folded(&self, ids: &[Uuid]) -> StoreResult<()>;
}
