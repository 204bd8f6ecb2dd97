//! Device directory
//!
//! Holds the printers found by the last scan and the currently selected
//! printer. A scan replaces the whole set in one write.

use std::sync::Arc;

use label_printer::{ConnectionType, DeviceHandle, DeviceKind, Discovery};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use shared::{AppError, ErrorCode, Severity};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::notify::SharedNotifier;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Discovery collaborator failed; carries its payload
    #[error("Error scanning for printers: {0}")]
    Discovery(Value),

    #[error("Invalid printer selection: {0}")]
    InvalidSelection(String),

    #[error("No printer selected")]
    NoSelection,
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Discovery(payload) => {
                AppError::with_message(ErrorCode::DiscoveryFailed, "Error scanning for printers")
                    .with_detail("payload", payload)
            }
            DirectoryError::InvalidSelection(reason) => {
                AppError::with_message(ErrorCode::InvalidDeviceSelection, reason)
            }
            DirectoryError::NoSelection => AppError::new(ErrorCode::NoDeviceSelected),
        }
    }
}

pub struct DeviceDirectory {
    discovery: Arc<dyn Discovery>,
    notifier: SharedNotifier,
    /// Vendor accepted for driver-connected printers (lowercase)
    vendor: String,
    devices: RwLock<Vec<DeviceHandle>>,
    selected: Mutex<Option<DeviceHandle>>,
}

impl DeviceDirectory {
    pub fn new(discovery: Arc<dyn Discovery>, notifier: SharedNotifier, vendor: &str) -> Self {
        Self {
            discovery,
            notifier,
            vendor: vendor.trim().to_lowercase(),
            devices: RwLock::new(Vec::new()),
            selected: Mutex::new(None),
        }
    }

    /// Enumerate printers and replace the stored set
    ///
    /// On failure the stored set is cleared. The first successful scan with
    /// no current selection selects the first printer found.
    #[instrument(skip(self), fields(vendor = %self.vendor))]
    pub async fn scan(&self) -> Result<Vec<DeviceHandle>, DirectoryError> {
        self.notifier
            .notify("Scanning for local label printers...", Severity::Info);

        let found = match self.discovery.scan(DeviceKind::Printer).await {
            Ok(found) => found,
            Err(e) => {
                self.devices.write().clear();
                let payload = e.detail();
                warn!(error = %e, "Printer scan failed");
                self.notifier.notify(
                    &format!("Error scanning for printers: {}", payload_text(&payload)),
                    Severity::Error,
                );
                return Err(DirectoryError::Discovery(payload));
            }
        };

        let total = found.len();
        let printers: Vec<DeviceHandle> = found.into_iter().filter(|d| self.accepts(d)).collect();
        debug!(total, accepted = printers.len(), "Filtered scan results");

        *self.devices.write() = printers.clone();

        if printers.is_empty() {
            self.notifier
                .notify("No suitable label printers found.", Severity::Warning);
        } else {
            info!(count = printers.len(), "Printers found");
            self.notifier.notify(
                &format!("Found {} label printer(s).", printers.len()),
                Severity::Success,
            );

            let mut selected = self.selected.lock();
            if selected.is_none() {
                let first = printers[0].clone();
                self.notifier.notify(
                    &format!("Default printer set to: {}", first.name()),
                    Severity::Info,
                );
                *selected = Some(first);
            }
        }

        Ok(printers)
    }

    /// Direct connections, or driver connections from the configured vendor
    pub fn accepts(&self, device: &DeviceHandle) -> bool {
        match device.connection() {
            ConnectionType::Driver => device
                .manufacturer()
                .is_some_and(|m| !self.vendor.is_empty() && m.to_lowercase().contains(&self.vendor)),
            other => other.is_direct(),
        }
    }

    /// Find a printer by exact name, then exact uid, then case-insensitive name
    pub fn resolve(&self, identifier: &str) -> Option<DeviceHandle> {
        if identifier.trim().is_empty() {
            return None;
        }

        let devices = self.devices.read();
        devices
            .iter()
            .find(|d| d.name() == identifier)
            .or_else(|| devices.iter().find(|d| d.uid() == identifier))
            .or_else(|| {
                let folded = identifier.to_lowercase();
                devices.iter().find(|d| d.name().to_lowercase() == folded)
            })
            .cloned()
    }

    /// Snapshot of the current printer set
    pub fn devices(&self) -> Vec<DeviceHandle> {
        self.devices.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Set or clear the selected printer
    ///
    /// An invalid handle is rejected and the selection stays as it was.
    pub fn select(&self, device: Option<DeviceHandle>) -> Result<(), DirectoryError> {
        let Some(device) = device else {
            *self.selected.lock() = None;
            self.notifier.notify("Printer selection cleared.", Severity::Info);
            return Ok(());
        };

        let problem = if device.name().trim().is_empty() {
            Some("printer has no name")
        } else if device.uid().trim().is_empty() {
            Some("printer has no unique id")
        } else if !device.capabilities().raw_send {
            Some("printer cannot accept raw commands")
        } else {
            None
        };

        if let Some(reason) = problem {
            self.notifier.notify(
                &format!("Invalid printer device provided: {}", reason),
                Severity::Error,
            );
            return Err(DirectoryError::InvalidSelection(reason.to_string()));
        }

        self.notifier
            .notify(&format!("Printer selected: {}", device.name()), Severity::Success);
        *self.selected.lock() = Some(device);
        Ok(())
    }

    pub fn selected(&self) -> Option<DeviceHandle> {
        self.selected.lock().clone()
    }
}

/// Payload as message text, without JSON quoting for plain strings
pub(crate) fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use async_trait::async_trait;
    use label_printer::{
        Capabilities, DeviceTransport, FixedDiscovery, PrintError, PrintResult,
    };

    struct NullTransport;

    #[async_trait]
    impl DeviceTransport for NullTransport {
        async fn send(&self, _command: &str) -> PrintResult<()> {
            Ok(())
        }

        async fn read_until(&self, _delimiter: &str) -> PrintResult<String> {
            Ok(String::new())
        }
    }

    struct FailingDiscovery;

    #[async_trait]
    impl Discovery for FailingDiscovery {
        async fn scan(&self, _kind: DeviceKind) -> PrintResult<Vec<DeviceHandle>> {
            Err(PrintError::Discovery("print service not running".into()))
        }
    }

    fn handle(name: &str, uid: &str, connection: ConnectionType) -> DeviceHandle {
        DeviceHandle::new(name, uid, connection, Arc::new(NullTransport))
    }

    fn directory(devices: Vec<DeviceHandle>) -> (DeviceDirectory, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        let dir = DeviceDirectory::new(
            Arc::new(FixedDiscovery::new(devices)),
            notifier.clone(),
            "Zebra",
        );
        (dir, notifier)
    }

    #[tokio::test]
    async fn test_scan_filters_connections() {
        let (dir, notifier) = directory(vec![
            handle("usb", "1", ConnectionType::Usb),
            handle("zebra-drv", "2", ConnectionType::Driver).with_manufacturer("ZEBRA Technologies"),
            handle("other-drv", "3", ConnectionType::Driver).with_manufacturer("Acme"),
            handle("bare-drv", "4", ConnectionType::Driver),
            handle("serial", "5", ConnectionType::Other("serial".into())),
        ]);

        let found = dir.scan().await.unwrap();
        let names: Vec<_> = found.iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["usb", "zebra-drv"]);
        assert_eq!(dir.devices().len(), 2);
        assert_eq!(dir.selected().unwrap().uid(), "1");
        assert!(!notifier.messages(Severity::Success).is_empty());
    }

    #[tokio::test]
    async fn test_scan_empty_warns() {
        let (dir, notifier) = directory(vec![]);
        assert!(dir.scan().await.unwrap().is_empty());
        assert_eq!(notifier.messages(Severity::Warning).len(), 1);
        assert!(dir.selected().is_none());
    }

    #[tokio::test]
    async fn test_scan_failure_clears_set() {
        let notifier = Arc::new(MemoryNotifier::new());
        let dir = DeviceDirectory::new(Arc::new(FailingDiscovery), notifier.clone(), "zebra");
        dir.devices
            .write()
            .push(handle("stale", "9", ConnectionType::Usb));

        match dir.scan().await {
            Err(DirectoryError::Discovery(payload)) => {
                assert_eq!(payload, Value::from("print service not running"))
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(dir.is_empty());
        assert_eq!(notifier.messages(Severity::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_order() {
        let (dir, _) = directory(vec![
            handle("A", "1", ConnectionType::Usb),
            handle("B", "2", ConnectionType::Usb),
            handle("2", "3", ConnectionType::Usb),
            handle("Étiquette", "4", ConnectionType::Usb),
        ]);
        dir.scan().await.unwrap();

        assert_eq!(dir.resolve("B").unwrap().uid(), "2");
        assert_eq!(dir.resolve("a").unwrap().uid(), "1");
        assert_eq!(dir.resolve("1").unwrap().name(), "A");
        // exact name beats uid
        assert_eq!(dir.resolve("2").unwrap().uid(), "3");
        assert_eq!(dir.resolve("étiquette").unwrap().uid(), "4");
        assert_eq!(dir.resolve("ÉTIQUETTE").unwrap().uid(), "4");
        assert!(dir.resolve("Z").is_none());
        assert!(dir.resolve("  ").is_none());
    }

    #[tokio::test]
    async fn test_select_keeps_existing_default() {
        let (dir, _) = directory(vec![handle("A", "1", ConnectionType::Usb)]);
        dir.select(Some(handle("manual", "m", ConnectionType::Network)))
            .unwrap();
        dir.scan().await.unwrap();
        assert_eq!(dir.selected().unwrap().name(), "manual");
    }

    #[test]
    fn test_select_rejects_invalid() {
        let (dir, _) = directory(vec![]);
        dir.select(Some(handle("A", "1", ConnectionType::Usb))).unwrap();

        let send_only_missing = handle("B", "2", ConnectionType::Usb).with_capabilities(Capabilities {
            raw_send: false,
            read_until: true,
        });
        assert!(matches!(
            dir.select(Some(send_only_missing)),
            Err(DirectoryError::InvalidSelection(_))
        ));
        assert!(dir.select(Some(handle(" ", "3", ConnectionType::Usb))).is_err());
        assert!(dir.select(Some(handle("C", "", ConnectionType::Usb))).is_err());
        assert_eq!(dir.selected().unwrap().name(), "A");

        dir.select(None).unwrap();
        assert!(dir.selected().is_none());
    }

    #[test]
    fn test_error_codes() {
        let err: AppError = DirectoryError::NoSelection.into();
        assert_eq!(err.code, ErrorCode::NoDeviceSelected);
        let err: AppError = DirectoryError::Discovery("down".into()).into();
        assert_eq!(err.detail("payload"), Some(&Value::from("down")));
    }
}
