//! Storm-surge job worker.
//!
//! Claims submitted jobs from the Redis stream, drives the external surge
//! model through its file protocol and ingests the results.

pub mod config;
pub mod pipeline;
pub mod worker;

pub use config::WorkerConfig;
pub use pipeline::{required_stage_failure, PipelineOutcome, SurgePipeline};
pub use worker::{new_job, submit, Worker};
