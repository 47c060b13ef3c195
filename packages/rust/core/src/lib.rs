//! Run orchestration for the Anthology ingestion job.
//!
//! Sequences discovery → novelty check → extraction → persistence →
//! publication per invocation, with the partial-failure policy described on
//! each operation: seed-page failure is fatal, everything per-candidate is
//! caught, logged, and skipped.

pub mod pipeline;

pub use pipeline::{IngestContext, publish_pending, run_ingest};
