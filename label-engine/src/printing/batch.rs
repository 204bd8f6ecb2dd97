//! Batch processing
//!
//! One batch is one template, one target printer and an ordered list of
//! items. Processing runs through these stages:
//!
//! ```text
//! structural check ── fail ──▶ compile_error per item
//!        │
//!     compile ─────── fail ──▶ compile_error per item
//!        │
//!   per item, in order:
//!     no identifier      ──▶ skipped
//!     render fails       ──▶ render_error
//!     printer unusable   ──▶ send_error for this and every later item
//!     send               ──▶ success | send_error
//! ```
//!
//! Every record is mirrored by exactly one notification of matching severity.

use std::sync::Arc;

use label_printer::DeviceHandle;
use serde_json::Value;
use shared::{
    BatchKind, BatchSummary, ItemContext, LabelBatchRequest, OutcomeRecord, OutcomeStatus, Severity,
};
use tracing::{debug, info, instrument, warn};

use super::directory::DeviceDirectory;
use super::dispatcher::Dispatcher;
use super::fields;
use super::template::TemplateRenderer;
use crate::notify::SharedNotifier;

/// Outcome of resolving the batch target, computed once per batch
enum Target {
    Ready(DeviceHandle),
    Unusable(String),
}

pub struct BatchProcessor {
    directory: Arc<DeviceDirectory>,
    renderer: TemplateRenderer,
    dispatcher: Dispatcher,
    notifier: SharedNotifier,
}

impl BatchProcessor {
    pub fn new(
        directory: Arc<DeviceDirectory>,
        renderer: TemplateRenderer,
        dispatcher: Dispatcher,
        notifier: SharedNotifier,
    ) -> Self {
        Self {
            directory,
            renderer,
            dispatcher,
            notifier,
        }
    }

    /// Process one batch, returning one record per item in input order
    #[instrument(skip_all, fields(kind = %request.kind, target = ?request.target, items = request.item_count()))]
    pub async fn process(&self, request: &LabelBatchRequest) -> BatchSummary {
        let checked = match request.check() {
            Ok(checked) => checked,
            Err(e) => {
                warn!(error = %e, "Batch failed structural check");
                let reason = format!("{} batch rejected: {}", request.kind.label(), e);
                return self.failed(request, reason);
            }
        };

        let template = match self.renderer.compile(checked.template) {
            Ok(template) => template,
            Err(e) => {
                warn!(error = %e, "Template compile failed");
                return self.failed(request, format!("{} template: {}", request.kind.label(), e));
            }
        };

        self.notifier.notify(
            &format!(
                "Attempting to print {} {}(s) to {}...",
                checked.items.len(),
                checked.kind.label(),
                checked.target
            ),
            Severity::Info,
        );

        let mut results = Vec::with_capacity(checked.items.len());
        let mut target: Option<Target> = None;

        for (index, item) in checked.items.iter().enumerate() {
            let context = context(checked.kind, index, item);

            if let Some(Target::Unusable(reason)) = &target {
                results.push(self.emit(OutcomeRecord::new(
                    OutcomeStatus::SendError,
                    format!("Label {} not sent: {}", context.label_number(), reason),
                    context,
                )));
                continue;
            }

            let Some(field_set) = fields::derive(checked.kind, item, checked.statics) else {
                results.push(self.emit(OutcomeRecord::new(
                    OutcomeStatus::Skipped,
                    format!(
                        "Label {} skipped: missing {}",
                        context.label_number(),
                        checked.kind.id_key()
                    ),
                    context,
                )));
                continue;
            };

            let command = match self.renderer.render_item(template.as_ref(), &field_set, &context) {
                Ok(command) => command,
                Err(e) => {
                    let message = e.to_string();
                    results.push(self.emit(OutcomeRecord::new(
                        OutcomeStatus::RenderError,
                        message,
                        e.context,
                    )));
                    continue;
                }
            };

            let resolved = target.get_or_insert_with(|| self.resolve_target(checked.target));
            let record = match &*resolved {
                Target::Ready(device) => self.dispatcher.send(device, &command, context).await,
                Target::Unusable(reason) => OutcomeRecord::new(
                    OutcomeStatus::SendError,
                    format!("Label {} not sent: {}", context.label_number(), reason),
                    context,
                ),
            };
            results.push(self.emit(record));
        }

        let summary = BatchSummary {
            kind: checked.kind,
            target: Some(checked.target.to_string()),
            structural_error: None,
            results,
        };
        info!(
            success = summary.success_count(),
            failure = summary.failure_count(),
            "Batch finished"
        );
        summary
    }

    fn resolve_target(&self, identifier: &str) -> Target {
        match self.directory.resolve(identifier) {
            None => {
                warn!(identifier, "Target printer not found");
                Target::Unusable(format!("printer not found: {}", identifier))
            }
            Some(device) if !device.capabilities().raw_send => {
                warn!(identifier, "Target printer cannot accept raw commands");
                Target::Unusable(format!(
                    "unsupported operation: {} cannot accept raw commands",
                    device.name()
                ))
            }
            Some(device) => {
                debug!(name = device.name(), uid = device.uid(), "Target resolved");
                Target::Ready(device)
            }
        }
    }

    /// Batch-level failure: one `compile_error` record per item present
    fn failed(&self, request: &LabelBatchRequest, reason: String) -> BatchSummary {
        self.notifier.notify(&reason, Severity::Error);
        failed_summary(request.kind, request.target.clone(), reason, request.items.as_deref())
    }

    fn emit(&self, record: OutcomeRecord) -> OutcomeRecord {
        self.notifier.notify(&record.message, record.status.severity());
        record
    }
}

/// Summary for a batch that never reached per-item processing
pub fn failed_summary(
    kind: BatchKind,
    target: Option<String>,
    reason: String,
    items: Option<&[Value]>,
) -> BatchSummary {
    let results = items
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            OutcomeRecord::new(OutcomeStatus::CompileError, reason.clone(), context(kind, index, item))
        })
        .collect();

    BatchSummary {
        kind,
        target,
        structural_error: Some(reason),
        results,
    }
}

fn context(kind: BatchKind, index: usize, item: &Value) -> ItemContext {
    ItemContext {
        index,
        item_id: fields::item_id(kind, item),
        item: item.clone(),
    }
}
