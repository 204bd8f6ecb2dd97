//! # label-printer
//!
//! Label printer device layer - low-level device capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to reach printers:
//! - Device handles, capabilities and the transport/discovery traits
//! - Raw TCP printing (port 9100) with read-back for status queries
//! - Configured network discovery
//! - Adapting callback-style host print services to futures
//! - Command byte encoding (UTF-8 / GBK)
//!
//! Business logic (WHAT to print) stays in `label-engine`:
//! - Template rendering, batch processing, job orchestration
//!
//! ## Example
//!
//! ```ignore
//! use label_printer::{DeviceTransport, NetworkTransport};
//!
//! let printer = NetworkTransport::new("192.168.1.100", 9100)?;
//! printer.send("^XA^FO50,50^A0N,40,40^FDK-0001^FS^XZ").await?;
//!
//! printer.send("~HS").await?;
//! let status = printer.read_until("\r\n").await?;
//! ```

mod completion;
mod device;
mod discovery;
mod encoding;
mod error;
mod network;

// Re-exports
pub use completion::{CallbackDevice, CallbackTransport, Pending, Resolver, completion};
pub use device::{
    Capabilities, ConnectionType, DeviceHandle, DeviceKind, DeviceTransport, Discovery,
};
pub use discovery::{FixedDiscovery, NetworkDiscovery, NetworkEndpoint};
pub use encoding::CommandEncoding;
pub use error::{PrintError, PrintResult};
pub use network::{NetworkTransport, RAW_PORT};
