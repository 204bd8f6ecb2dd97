//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use label_engine::{EngineOptions, LabelJobEngine, MemoryNotifier};
use label_printer::{
    ConnectionType, DeviceHandle, DeviceKind, DeviceTransport, Discovery, PrintError, PrintResult,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Transport that records every command and fails on request
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    /// Zero-based send attempts that fail
    fail_on: Vec<usize>,
    attempts: AtomicUsize,
    status: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(attempts: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            fail_on: attempts.to_vec(),
            ..Self::default()
        })
    }

    pub fn with_status(status: &str) -> Arc<Self> {
        Arc::new(Self {
            status: Some(status.to_string()),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceTransport for RecordingTransport {
    async fn send(&self, command: &str) -> PrintResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&attempt) {
            return Err(PrintError::transport(json!({"error": "paper out", "attempt": attempt})));
        }
        self.sent.lock().push(command.to_string());
        Ok(())
    }

    async fn read_until(&self, _delimiter: &str) -> PrintResult<String> {
        match &self.status {
            Some(status) => Ok(status.clone()),
            // never answers
            None => std::future::pending().await,
        }
    }
}

/// Discovery over a fixed list that counts scans
pub struct CountingDiscovery {
    devices: Vec<DeviceHandle>,
    fail: bool,
    scans: AtomicUsize,
}

impl CountingDiscovery {
    pub fn new(devices: Vec<DeviceHandle>) -> Arc<Self> {
        Arc::new(Self {
            devices,
            fail: false,
            scans: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            devices: Vec::new(),
            fail: true,
            scans: AtomicUsize::new(0),
        })
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Discovery for CountingDiscovery {
    async fn scan(&self, kind: DeviceKind) -> PrintResult<Vec<DeviceHandle>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PrintError::Discovery(Value::from("print service not running")));
        }
        if kind != DeviceKind::Printer {
            return Ok(Vec::new());
        }
        Ok(self.devices.clone())
    }
}

pub fn printer(name: &str, uid: &str, transport: Arc<RecordingTransport>) -> DeviceHandle {
    DeviceHandle::new(name, uid, ConnectionType::Usb, transport)
}

pub fn options() -> EngineOptions {
    EngineOptions {
        status_timeout: Duration::from_millis(50),
        ..EngineOptions::default()
    }
}

pub fn engine(discovery: Arc<CountingDiscovery>) -> (LabelJobEngine, Arc<MemoryNotifier>) {
    let notifier = Arc::new(MemoryNotifier::new());
    let engine = LabelJobEngine::new(discovery, notifier.clone(), options());
    (engine, notifier)
}

/// Job with a single kit batch
pub fn kit_job(printer: &str, template: &str, items: Value) -> Value {
    json!({
        "KitLabelsRequest": {
            "KitSKU": "KIT-100-A",
            "LotNumber": "L2301",
            "ExpirationDate": "2027-01-31",
            "LabelSet": {
                "KitLabelData": {
                    "PrinterName": printer,
                    "LabelTemplateZPL": template,
                    "KitLabelIDs": items
                }
            }
        }
    })
}
