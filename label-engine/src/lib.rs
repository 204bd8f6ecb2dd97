//! Label job engine
//!
//! Renders label templates for each item of a print job and dispatches the
//! results to label printers, collecting per-label outcomes into a summary.

pub mod core;
pub mod notify;
pub mod printing;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{Config, EngineOptions};
pub use notify::{MemoryNotifier, Notice, Notifier, SharedNotifier, TracingNotifier};
pub use printing::{
    BatchProcessor, DeviceDirectory, Dispatcher, ExternalTemplates, LabelJobEngine,
    PlaceholderEngine, TemplateEngine, TemplateRenderer,
};
