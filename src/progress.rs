//! Progress-callback trait for per-stage and per-document pipeline events.
//!
//! Pass an [`Arc<dyn PipelineProgressCallback>`] to the stage entry points
//! to receive real-time events as documents are extracted and records are
//! normalized and loaded.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log file, or a database
//! record without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` so the same
//! callback can be shared with a logging thread even though the pipeline
//! itself is strictly sequential.

use std::sync::Arc;

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extract => f.write_str("extract"),
            Stage::Transform => f.write_str("transform"),
            Stage::Load => f.write_str("load"),
        }
    }
}

/// Called by the pipeline as it processes each stage and document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called as each document (extract) or record (transform/load) is
    /// about to be processed. `ordinal` is 1-indexed.
    fn on_item_start(&self, stage: Stage, ordinal: usize, label: &str) {
        let _ = (stage, ordinal, label);
    }

    /// Called when an item succeeds.
    fn on_item_ok(&self, stage: Stage, ordinal: usize, label: &str) {
        let _ = (stage, ordinal, label);
    }

    /// Called when an item is skipped, quarantined, or rejected.
    /// The batch continues.
    fn on_item_skipped(&self, stage: Stage, ordinal: usize, label: &str, reason: &str) {
        let _ = (stage, ordinal, label, reason);
    }

    /// Called once when a stage finishes, with processed/skipped counts.
    fn on_stage_complete(&self, stage: Stage, processed: usize, skipped: usize) {
        let _ = (stage, processed, skipped);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type the stage entry points accept.
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
