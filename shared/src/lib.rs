//! Shared types for the label engine
//!
//! Job payload model, per-label outcome and summary types, and the unified
//! error system used by every crate in the workspace.

pub mod error;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{
    BatchData, BatchKind, BatchSummary, CheckedBatch, DeviceIdentity, ItemContext, JobPayload,
    JobSummary, KitLabelsRequest, LabelBatchRequest, LabelSet, OutcomeRecord, OutcomeStatus,
    Severity, StaticFields, StructuralError,
};
