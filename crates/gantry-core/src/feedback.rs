//! Feedback capture and the asynchronous corpus updater.
//!
//! Feedback is recorded synchronously to the ledger. Corpus application is
//! the updater's job and runs off the request path: a periodic fold reads
//! unfolded accepted records, dedupes them per `(signature, kind)` keeping
//! the newest, writes the batch exclusively, and only then marks the source
//! records folded. A crash between the writes re-folds on the next cycle;
//! supersede semantics make that harmless.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use gantry_store::{CorpusStore, FeedbackLedger, RetrievalFacets, StoredExample};

use crate::cancel::CancelToken;
use crate::domain::{
    FeedbackOutcome, FeedbackRecord, GantryError, GeneratedArtifact, Result,
};
use crate::obs;

/// Record one feedback verdict against a generated artifact.
///
/// `AcceptedWithEdits` requires the edited content; anything else ignores it.
pub async fn record_feedback(
    ledger: &dyn FeedbackLedger,
    artifact: &GeneratedArtifact,
    facets: RetrievalFacets,
    outcome: FeedbackOutcome,
    edited_content: Option<String>,
) -> Result<FeedbackRecord> {
    let edited_content = match outcome {
        FeedbackOutcome::AcceptedWithEdits => {
            Some(edited_content.ok_or(GantryError::MissingEditedContent)?)
        }
        FeedbackOutcome::Accepted | FeedbackOutcome::Rejected => None,
    };

    let record = FeedbackRecord {
        id: Uuid::new_v4(),
        artifact_id: artifact.id,
        kind: artifact.kind,
        signature: artifact.feature_signature.clone(),
        original_content: artifact.content.clone(),
        edited_content,
        outcome,
        facets,
        recorded_at: Utc::now(),
        folded: false,
    };
    ledger.append(record.clone()).await.map_err(GantryError::Store)?;
    obs::emit_feedback_recorded(&record);
    Ok(record)
}

/// Periodically folds accepted feedback into the corpus.
pub struct ModelUpdater {
    ledger: Arc<dyn FeedbackLedger>,
    corpus: Arc<dyn CorpusStore>,
    interval: Duration,
}

impl ModelUpdater {
    pub fn new(
        ledger: Arc<dyn FeedbackLedger>,
        corpus: Arc<dyn CorpusStore>,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            corpus,
            interval,
        }
    }

    /// Run one fold cycle. Returns how many ledger records were folded.
    pub async fn fold_once(&self) -> Result<usize> {
        let pending = self
            .ledger
            .unfolded_accepted()
            .await
            .map_err(GantryError::Store)?;
        if pending.is_empty() {
            return Ok(0);
        }

        // Records arrive oldest first; later inserts for the same key win.
        let mut latest: HashMap<(String, gantry_store::ArtifactKind), StoredExample> =
            HashMap::new();
        let mut folded_ids = Vec::with_capacity(pending.len());
        for record in &pending {
            if let Some(example) = record.to_example() {
                latest.insert(
                    (example.signature.as_str().to_string(), example.kind),
                    example,
                );
            }
            folded_ids.push(record.id);
        }

        let batch: Vec<StoredExample> = latest.into_values().collect();
        self.corpus
            .put_batch(batch)
            .await
            .map_err(GantryError::Store)?;
        self.ledger
            .mark_folded(&folded_ids)
            .await
            .map_err(GantryError::Store)?;

        let corpus_len = self.corpus.len().await.map_err(GantryError::Store)?;
        obs::emit_corpus_folded(folded_ids.len(), corpus_len);
        Ok(folded_ids.len())
    }

    /// Spawn the periodic fold loop. Stops when `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancelToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
                if let Err(error) = self.fold_once().await {
                    warn!(event = "corpus.fold_error", error = %error);
                }
            }
        })
    }
}
