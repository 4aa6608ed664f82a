//! Storage layer for gantry's learning loop.
//!
//! Two abstractions back the feedback-driven corpus update pipeline:
//! - [`FeedbackLedger`]: append-only record of accept/edit/reject actions
//!   taken against generated artifacts.
//! - [`CorpusStore`]: the accepted-example corpus consulted by the
//!   generative tier, keyed by `(feature signature, artifact kind)`.
//!
//! Both traits are async and backend-agnostic. In-memory fakes live in
//! [`memory`] for testing; [`fs`] provides a filesystem-backed JSON store
//! for production use.

pub mod error;
pub mod fs;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::{FsCorpusStore, FsFeedbackLedger};
pub use memory::{MemoryCorpusStore, MemoryFeedbackLedger};
pub use records::{
    ArtifactKind, FeedbackOutcome, FeedbackRecord, RetrievalFacets, Signature, StoredExample,
};
pub use traits::{CorpusStore, FeedbackLedger};
