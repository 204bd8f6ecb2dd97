//! Label printing
//!
//! - [`DeviceDirectory`]: scanned printers, resolution, selection
//! - [`TemplateRenderer`]: compile once per batch, render per label
//! - [`Dispatcher`]: send one command, read printer status
//! - [`BatchProcessor`]: one batch to ordered outcome records
//! - [`LabelJobEngine`]: one job to a [`shared::JobSummary`]

pub mod batch;
pub mod directory;
pub mod dispatcher;
pub mod fields;
pub mod orchestrator;
pub mod template;

pub use batch::BatchProcessor;
pub use directory::{DeviceDirectory, DirectoryError};
pub use dispatcher::{DispatchError, Dispatcher};
pub use fields::FieldSet;
pub use orchestrator::{ExternalTemplates, LabelJobEngine};
pub use template::{
    CompiledTemplate, ItemRenderError, PlaceholderEngine, TemplateEngine, TemplateError,
    TemplateRenderer,
};
