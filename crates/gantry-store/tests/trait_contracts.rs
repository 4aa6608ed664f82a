//! Trait contract tests for CorpusStore and FeedbackLedger.
//!
//! These verify the behavioral contracts using both the in-memory fakes and
//! the filesystem backends. Any conforming implementation must pass these.

use chrono::{Duration, Utc};
use gantry_store::{
    ArtifactKind, CorpusStore, FeedbackLedger, FeedbackOutcome, FeedbackRecord, FsCorpusStore,
    FsFeedbackLedger, MemoryCorpusStore, MemoryFeedbackLedger, RetrievalFacets, Signature,
    StoreError, StoredExample,
};
use uuid::Uuid;

fn sig(parts: &[&str]) -> Signature {
    Signature::from_parts(parts.iter().copied())
}

fn example(signature: &Signature, kind: ArtifactKind, content: &str) -> StoredExample {
    StoredExample {
        signature: signature.clone(),
        kind,
        content: content.to_string(),
        facets: RetrievalFacets {
            frameworks: vec!["express".to_string()],
            services: vec!["postgres".to_string()],
            dependencies: vec!["express".to_string(), "pg".to_string()],
        },
        recorded_at: Utc::now(),
    }
}

fn feedback(outcome: FeedbackOutcome, edited: Option<&str>) -> FeedbackRecord {
    FeedbackRecord {
        id: Uuid::new_v4(),
        artifact_id: Uuid::new_v4(),
        kind: ArtifactKind::Dockerfile,
        signature: sig(&["node", "express"]),
        original_content: "FROM node:20-alpine".to_string(),
        edited_content: edited.map(String::from),
        outcome,
        facets: RetrievalFacets::default(),
        recorded_at: Utc::now(),
        folded: false,
    }
}

// ===========================================================================
// CorpusStore contract
// ===========================================================================

async fn corpus_contract(store: &dyn CorpusStore) {
    let a = sig(&["node", "express"]);
    let b = sig(&["python", "django"]);

    // Empty store
    assert!(store.get(&a, ArtifactKind::Dockerfile).await.unwrap().is_none());
    assert_eq!(store.len().await.unwrap(), 0);

    // Put and read back
    store
        .put_batch(vec![
            example(&a, ArtifactKind::Dockerfile, "node dockerfile"),
            example(&b, ArtifactKind::Dockerfile, "python dockerfile"),
            example(&a, ArtifactKind::KubernetesManifest, "node manifest"),
        ])
        .await
        .unwrap();

    assert_eq!(store.len().await.unwrap(), 3);
    assert_eq!(
        store
            .get(&a, ArtifactKind::Dockerfile)
            .await
            .unwrap()
            .unwrap()
            .content,
        "node dockerfile"
    );

    // Kind filter
    let dockerfiles = store.entries(ArtifactKind::Dockerfile).await.unwrap();
    assert_eq!(dockerfiles.len(), 2);

    // Supersede: same key replaces, growth stays bounded
    store
        .put_batch(vec![example(&a, ArtifactKind::Dockerfile, "newer node dockerfile")])
        .await
        .unwrap();
    assert_eq!(store.len().await.unwrap(), 3);
    assert_eq!(
        store
            .get(&a, ArtifactKind::Dockerfile)
            .await
            .unwrap()
            .unwrap()
            .content,
        "newer node dockerfile"
    );
}

#[tokio::test]
async fn memory_corpus_satisfies_contract() {
    corpus_contract(&MemoryCorpusStore::new()).await;
}

#[tokio::test]
async fn fs_corpus_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    corpus_contract(&FsCorpusStore::new(dir.path()).unwrap()).await;
}

// ===========================================================================
// FeedbackLedger contract
// ===========================================================================

async fn ledger_contract(ledger: &dyn FeedbackLedger) {
    let accepted = feedback(FeedbackOutcome::Accepted, None);
    let edited = feedback(FeedbackOutcome::AcceptedWithEdits, Some("FROM node:22"));
    let rejected = feedback(FeedbackOutcome::Rejected, None);

    ledger.append(accepted.clone()).await.unwrap();
    ledger.append(edited.clone()).await.unwrap();
    ledger.append(rejected.clone()).await.unwrap();

    // Lookup by id
    let got = ledger.get(accepted.id).await.unwrap();
    assert_eq!(got.original_content, accepted.original_content);

    let err = ledger.get(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::FeedbackNotFound { .. }));

    // Rejected records never surface as fold candidates
    let pending = ledger.unfolded_accepted().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|r| r.outcome != FeedbackOutcome::Rejected));

    // Folding removes records from the pending set
    ledger.mark_folded(&[accepted.id, edited.id]).await.unwrap();
    assert!(ledger.unfolded_accepted().await.unwrap().is_empty());
    assert!(ledger.get(accepted.id).await.unwrap().folded);
}

#[tokio::test]
async fn memory_ledger_satisfies_contract() {
    ledger_contract(&MemoryFeedbackLedger::new()).await;
}

#[tokio::test]
async fn fs_ledger_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    ledger_contract(&FsFeedbackLedger::new(dir.path()).unwrap()).await;
}

#[tokio::test]
async fn pending_records_come_back_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = FsFeedbackLedger::new(dir.path()).unwrap();

    let mut older = feedback(FeedbackOutcome::Accepted, None);
    older.recorded_at = Utc::now() - Duration::hours(2);
    let newer = feedback(FeedbackOutcome::Accepted, None);

    // Append newest first to prove ordering comes from timestamps
    ledger.append(newer.clone()).await.unwrap();
    ledger.append(older.clone()).await.unwrap();

    let pending = ledger.unfolded_accepted().await.unwrap();
    assert_eq!(pending[0].id, older.id);
    assert_eq!(pending[1].id, newer.id);
}
