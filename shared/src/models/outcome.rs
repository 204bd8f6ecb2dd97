//! Per-label outcomes and the batch/job summaries built from them

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::job::BatchKind;
use super::notice::Severity;

/// Fixed outcome taxonomy for one label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Skipped,
    CompileError,
    RenderError,
    SendError,
}

impl OutcomeStatus {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Severity of the notification that accompanies a record with this status
    pub fn severity(&self) -> Severity {
        match self {
            Self::Success => Severity::Success,
            Self::Skipped => Severity::Warning,
            Self::CompileError | Self::RenderError | Self::SendError => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::CompileError => "compile_error",
            Self::RenderError => "render_error",
            Self::SendError => "send_error",
        }
    }
}

/// Where a record came from: position in the batch plus the original item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemContext {
    /// Zero-based position in the batch's item sequence
    pub index: usize,
    /// Item identifier, when the item carried one
    pub item_id: Option<String>,
    /// The item exactly as received
    pub item: Value,
}

impl ItemContext {
    /// One-based label number used in messages
    pub fn label_number(&self) -> usize {
        self.index + 1
    }

    /// Identifier for messages, `N/A` when absent
    pub fn display_id(&self) -> &str {
        self.item_id.as_deref().unwrap_or("N/A")
    }
}

/// Identity of the device a label was sent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub name: String,
    pub uid: String,
}

/// Result of attempting to render and transmit one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub status: OutcomeStatus,
    pub message: String,
    pub context: ItemContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceIdentity>,
    /// Raw transport error payload, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<Value>,
}

impl OutcomeRecord {
    pub fn new(status: OutcomeStatus, message: impl Into<String>, context: ItemContext) -> Self {
        Self {
            status,
            message: message.into(),
            context,
            device: None,
            error_detail: None,
        }
    }

    pub fn with_device(mut self, device: DeviceIdentity) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_error_detail(mut self, detail: impl Into<Value>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }
}

/// Outcome of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub kind: BatchKind,
    pub target: Option<String>,
    /// Batch-level failure (missing data or template compile failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structural_error: Option<String>,
    pub results: Vec<OutcomeRecord>,
}

impl BatchSummary {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Labels that rendered and reached a printer, whether or not the send
    /// succeeded
    pub fn rendered_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| {
                r.status.is_success() || (r.status == OutcomeStatus::SendError && r.device.is_some())
            })
            .count()
    }
}

/// Outcome of a whole job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    /// Unix millis
    pub started_at: i64,
    pub batches: Vec<BatchSummary>,
    /// Job-level failures, independent of per-label results
    pub orchestration_errors: Vec<String>,
    pub success_count: usize,
    pub failure_count: usize,
    pub total: usize,
    pub message: String,
}

impl JobSummary {
    /// Assemble a summary, computing aggregate counts by scanning every
    /// batch's records.
    pub fn new(
        job_id: impl Into<String>,
        started_at: i64,
        batches: Vec<BatchSummary>,
        orchestration_errors: Vec<String>,
    ) -> Self {
        let total: usize = batches.iter().map(|b| b.results.len()).sum();
        let success_count: usize = batches.iter().map(BatchSummary::success_count).sum();
        let failure_count = total - success_count;

        let rendered: usize = batches.iter().map(BatchSummary::rendered_count).sum();
        let message = format!(
            "Print operations complete. Labels to Render: {}. Rendered: {}. Sent Successfully: {}. Send Failures: {}. Render Failures: {}.",
            total,
            rendered,
            success_count,
            Self::sum_status(&batches, OutcomeStatus::SendError),
            Self::sum_status(&batches, OutcomeStatus::RenderError)
                + Self::sum_status(&batches, OutcomeStatus::CompileError),
        );

        Self {
            job_id: job_id.into(),
            started_at,
            batches,
            orchestration_errors,
            success_count,
            failure_count,
            total,
            message,
        }
    }

    fn sum_status(batches: &[BatchSummary], status: OutcomeStatus) -> usize {
        batches.iter().map(|b| b.count(status)).sum()
    }

    pub fn batch(&self, kind: BatchKind) -> Option<&BatchSummary> {
        self.batches.iter().find(|b| b.kind == kind)
    }

    /// Job finished without any failed label or job-level error
    pub fn is_clean(&self) -> bool {
        self.failure_count == 0 && self.orchestration_errors.is_empty()
    }
}
