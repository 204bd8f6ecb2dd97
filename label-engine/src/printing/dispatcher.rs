//! Dispatcher: one rendered command to one device

use std::time::Duration;

use label_printer::DeviceHandle;
use serde_json::Value;
use shared::{AppError, DeviceIdentity, ErrorCode, ItemContext, OutcomeRecord, OutcomeStatus, Severity};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::directory::payload_text;
use crate::notify::SharedNotifier;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Timeout reading from printer after {0}ms")]
    Timeout(u128),

    /// Raw transport error payload
    #[error("Error reading: {}", payload_text(.0))]
    Transport(Value),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Unsupported(msg) => {
                AppError::with_message(ErrorCode::UnsupportedOperation, msg)
            }
            DispatchError::Timeout(ms) => AppError::with_message(
                ErrorCode::TransportTimeout,
                format!("Timeout reading from printer after {}ms", ms),
            ),
            DispatchError::Transport(payload) => {
                AppError::with_message(ErrorCode::TransportFailed, payload_text(&payload))
                    .with_detail("errorDetail", payload)
            }
        }
    }
}

/// Identity recorded on outcomes for a device
pub fn identity(device: &DeviceHandle) -> DeviceIdentity {
    DeviceIdentity {
        name: device.name().to_string(),
        uid: device.uid().to_string(),
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    notifier: SharedNotifier,
}

impl Dispatcher {
    pub fn new(notifier: SharedNotifier) -> Self {
        Self { notifier }
    }

    /// Transmit one command and turn the completion into an outcome record
    ///
    /// No timeout is applied. The record carries the device identity either
    /// way; on failure the transport's raw payload lands in `errorDetail`.
    #[instrument(skip(self, command, context), fields(device = %device.name(), label = context.label_number()))]
    pub async fn send(&self, device: &DeviceHandle, command: &str, context: ItemContext) -> OutcomeRecord {
        let label = context.label_number();
        match device.transport().send(command).await {
            Ok(()) => {
                debug!("Label sent");
                OutcomeRecord::new(
                    OutcomeStatus::Success,
                    format!("Label {} sent successfully to {}.", label, device.name()),
                    context,
                )
                .with_device(identity(device))
            }
            Err(e) => {
                let detail = e.detail();
                warn!(error = %e, "Label send failed");
                OutcomeRecord::new(
                    OutcomeStatus::SendError,
                    format!("Error sending label {}: {}", label, payload_text(&detail)),
                    context,
                )
                .with_device(identity(device))
                .with_error_detail(detail)
            }
        }
    }

    /// Read from a device until `delimiter`, bounded by `timeout`
    ///
    /// Whichever of data, error or timeout comes first settles the read; a
    /// late device signal after the timeout is dropped.
    #[instrument(skip(self), fields(device = %device.name()))]
    pub async fn read_status(
        &self,
        device: &DeviceHandle,
        delimiter: &str,
        timeout: Duration,
    ) -> Result<String, DispatchError> {
        if !device.capabilities().read_until {
            let err = DispatchError::Unsupported(format!(
                "{} does not support reading until a delimiter",
                device.name()
            ));
            self.notifier.notify(&err.to_string(), Severity::Error);
            return Err(err);
        }

        self.notifier.notify(
            &format!("Attempting to read status from {}...", device.name()),
            Severity::Info,
        );

        let result = match tokio::time::timeout(timeout, device.transport().read_until(delimiter)).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(e)) => Err(DispatchError::Transport(e.detail())),
            Err(_) => Err(DispatchError::Timeout(timeout.as_millis())),
        };

        match &result {
            Ok(data) => {
                let preview: String = data.chars().take(100).collect();
                self.notifier
                    .notify(&format!("Data received: {}", preview), Severity::Success);
            }
            Err(e) => {
                warn!(error = %e, "Status read failed");
                self.notifier.notify(&e.to_string(), Severity::Error);
            }
        }
        result
    }
}
