//! Core library for batch invoice extraction.
//!
//! This crate provides:
//! - A blob store gateway (S3 and in-memory) with JSON fetching by URI
//! - A job client that submits Bedrock Data Automation jobs and polls them
//! - Blueprint field extraction from job output documents
//! - A sequential batch orchestrator that writes one result file per run

pub mod batch;
pub mod error;
pub mod extract;
pub mod job;
pub mod logging;
pub mod models;
pub mod storage;

pub use batch::{BatchObserver, BatchOrchestrator, BatchOutcome, BatchSummary, ResultFile};
pub use error::{DocflowError, Result};
pub use extract::{Extraction, FieldReading, FieldSpec, ResultExtractor, SegmentReport};
pub use job::{IdentityProvider, JobClient, JobHandle, JobRequest, JobResult, JobService, JobStatus, PollSettings};
pub use logging::{NoopPayloadLog, PayloadLog, TracingPayloadLog};
pub use models::config::DocflowConfig;
pub use models::record::{DocumentOutcome, ResultRecord, SkipReason};
pub use storage::{BlobStore, MemoryBlobStore, StoreUri};

#[cfg(feature = "aws")]
pub use job::{BedrockJobService, StsIdentity};
#[cfg(feature = "aws")]
pub use storage::S3BlobStore;
