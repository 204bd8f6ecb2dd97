//! Label job orchestration
//!
//! Turns one job payload into batch requests, runs them in order and folds
//! the results into a [`JobSummary`].

use std::collections::HashMap;
use std::sync::Arc;

use label_printer::{DeviceHandle, Discovery};
use serde_json::Value;
use shared::{
    AppError, AppResult, BatchData, BatchKind, JobPayload, JobSummary, LabelBatchRequest,
    LabelSet, Severity, StaticFields, StructuralError,
};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::batch::{BatchProcessor, failed_summary};
use super::directory::{DeviceDirectory, DirectoryError};
use super::dispatcher::Dispatcher;
use super::template::{PlaceholderEngine, TemplateEngine, TemplateRenderer};
use crate::core::EngineOptions;
use crate::notify::SharedNotifier;

/// Externally supplied template bodies, by batch kind
pub type ExternalTemplates = HashMap<BatchKind, String>;

pub struct LabelJobEngine {
    directory: Arc<DeviceDirectory>,
    processor: BatchProcessor,
    dispatcher: Dispatcher,
    notifier: SharedNotifier,
    options: EngineOptions,
}

impl LabelJobEngine {
    /// Engine with the default `{{ name }}` template engine
    pub fn new(discovery: Arc<dyn Discovery>, notifier: SharedNotifier, options: EngineOptions) -> Self {
        Self::with_template_engine(discovery, Arc::new(PlaceholderEngine), notifier, options)
    }

    pub fn with_template_engine(
        discovery: Arc<dyn Discovery>,
        templates: Arc<dyn TemplateEngine>,
        notifier: SharedNotifier,
        options: EngineOptions,
    ) -> Self {
        let directory = Arc::new(DeviceDirectory::new(discovery, notifier.clone(), &options.vendor));
        let dispatcher = Dispatcher::new(notifier.clone());
        let processor = BatchProcessor::new(
            directory.clone(),
            TemplateRenderer::new(templates),
            dispatcher.clone(),
            notifier.clone(),
        );

        Self {
            directory,
            processor,
            dispatcher,
            notifier,
            options,
        }
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Rescan printers
    pub async fn scan(&self) -> AppResult<Vec<DeviceHandle>> {
        Ok(self.directory.scan().await?)
    }

    /// Run a job given as raw JSON
    pub async fn run_json(&self, payload: &Value, externals: &ExternalTemplates) -> AppResult<JobSummary> {
        let payload: JobPayload = serde_json::from_value(payload.clone()).map_err(|e| {
            self.notifier
                .notify(&format!("Invalid payload: {}", e), Severity::Error);
            AppError::invalid_payload(e.to_string())
        })?;
        self.run(Some(&payload), externals).await
    }

    /// Run one print job
    ///
    /// Only a missing payload (or one without `KitLabelsRequest`) fails the
    /// call; everything else, wrong-typed batch fields included, is reported
    /// inside the summary.
    pub async fn run(&self, payload: Option<&JobPayload>, externals: &ExternalTemplates) -> AppResult<JobSummary> {
        let Some(request) = payload.and_then(|p| p.kit_labels_request.as_ref()) else {
            self.notifier
                .notify("Invalid payload: KitLabelsRequest is missing.", Severity::Error);
            return Err(AppError::invalid_payload("KitLabelsRequest is missing"));
        };

        let job_id = Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now().timestamp_millis();
        let span = info_span!("label_job", job_id = %job_id);

        let summary = async {
            self.notifier
                .notify("Processing print request...", Severity::Info);

            let mut errors = Vec::new();
            let label_set = request.label_set().unwrap_or_else(|e| {
                error!(error = %e, "Label set unreadable");
                self.notifier
                    .notify(&format!("Invalid label set: {}", e), Severity::Error);
                errors.push(format!("Invalid label set: {}", e));
                LabelSet::default()
            });
            let batches = label_set.batches();
            let (statics, statics_error) = request.static_fields();
            if let Some(e) = &statics_error {
                warn!(error = %e, "Static field has the wrong type");
            }

            if batches.is_empty() {
                warn!("Job has no label batches");
                self.notifier
                    .notify("No label batches found in request.", Severity::Warning);
            } else if self.options.auto_scan && self.directory.is_empty() {
                info!("No printers known, scanning before the job");
                if let Err(e) = self.directory.scan().await {
                    errors.push(e.to_string());
                }
            }

            let mut summaries = Vec::with_capacity(batches.len());
            for (kind, raw) in batches {
                let (data, malformed) = BatchData::from_value(raw);
                let malformed = malformed.or_else(|| statics_error.clone());
                let summary = match self.prepare(kind, &data, &statics, malformed, externals) {
                    Ok(batch) => self.processor.process(&batch).await,
                    Err((reason, target)) => {
                        error!(kind = %kind, reason = %reason, "Batch not attempted");
                        self.notifier.notify(&reason, Severity::Error);
                        errors.push(reason.clone());
                        failed_summary(kind, target, reason, data.items.as_deref())
                    }
                };
                summaries.push(summary);
            }

            let summary = JobSummary::new(job_id.clone(), started_at, summaries, errors);
            self.report(&summary);
            summary
        }
        .instrument(span)
        .await;

        Ok(summary)
    }

    /// Build a fresh batch request from the payload
    ///
    /// Substitutes an external template body for the placeholder token and
    /// falls back to the selected printer when the batch names none. Fails
    /// (with the reason and target) when the placeholder has no usable body.
    fn prepare(
        &self,
        kind: BatchKind,
        data: &BatchData,
        statics: &StaticFields,
        malformed: Option<StructuralError>,
        externals: &ExternalTemplates,
    ) -> Result<LabelBatchRequest, (String, Option<String>)> {
        let target = data
            .printer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| self.directory.selected().map(|d| d.name().to_string()));

        let template = match data.template.as_deref() {
            Some(body) if body.trim() == self.options.placeholder_token => {
                match externals.get(&kind).filter(|b| !b.trim().is_empty()) {
                    Some(external) => Some(external.clone()),
                    None => {
                        return Err((
                            format!(
                                "{} template placeholder {} has no external template body",
                                kind.label(),
                                self.options.placeholder_token
                            ),
                            target,
                        ));
                    }
                }
            }
            other => other.map(str::to_string),
        };

        Ok(LabelBatchRequest {
            kind,
            template,
            items: data.items.clone(),
            target,
            statics: statics.clone(),
            malformed,
        })
    }

    fn report(&self, summary: &JobSummary) {
        info!(
            total = summary.total,
            success = summary.success_count,
            failure = summary.failure_count,
            orchestration_errors = summary.orchestration_errors.len(),
            "Job finished"
        );

        let severity = if summary.failure_count > 0 {
            Severity::Error
        } else if summary.total == 0 {
            Severity::Warning
        } else {
            Severity::Success
        };
        self.notifier.notify(&summary.message, severity);

        if !summary.orchestration_errors.is_empty() {
            self.notifier.notify(
                &format!(
                    "Orchestration errors: {}",
                    summary.orchestration_errors.join("; ")
                ),
                Severity::Error,
            );
        }
    }

    /// Read status from a named printer, or the selected one
    pub async fn read_status(&self, identifier: Option<&str>) -> AppResult<String> {
        let device = match identifier {
            Some(id) => self.directory.resolve(id).ok_or_else(|| {
                self.notifier
                    .notify(&format!("Printer not found: {}", id), Severity::Error);
                AppError::device_not_found(id)
            })?,
            None => return self.read_selected_status().await,
        };

        self.read_from(&device).await
    }

    /// Read status from the selected printer
    pub async fn read_selected_status(&self) -> AppResult<String> {
        let Some(device) = self.directory.selected() else {
            self.notifier
                .notify("No printer selected to read status from.", Severity::Error);
            return Err(DirectoryError::NoSelection.into());
        };
        self.read_from(&device).await
    }

    async fn read_from(&self, device: &DeviceHandle) -> AppResult<String> {
        Ok(self
            .dispatcher
            .read_status(device, &self.options.status_delimiter, self.options.status_timeout)
            .await?)
    }
}
