//! Device handles and the transport/discovery seams
//!
//! A [`DeviceHandle`] is produced by a [`Discovery`] scan and owns a shared
//! reference to the transport that reaches the physical printer.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PrintResult;

/// How the host reaches a device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    /// Local USB
    Usb,
    /// Raw TCP socket straight to the printer (port 9100)
    Network,
    /// Bluetooth serial
    Bluetooth,
    /// Through an installed OS printer driver
    Driver,
    Other(String),
}

impl ConnectionType {
    /// Direct connections reach the printer without a driver in between
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Usb | Self::Network | Self::Bluetooth)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Usb => "usb",
            Self::Network => "network",
            Self::Bluetooth => "bluetooth",
            Self::Driver => "driver",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ConnectionType {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "usb" => Self::Usb,
            "network" | "tcp" => Self::Network,
            "bluetooth" | "bt" => Self::Bluetooth,
            "driver" => Self::Driver,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device kinds a discovery scan can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Printer,
    Scanner,
}

/// What a device can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Accepts raw command strings
    pub raw_send: bool,
    /// Can answer a read-until-delimiter request
    pub read_until: bool,
}

impl Capabilities {
    pub const fn full() -> Self {
        Self {
            raw_send: true,
            read_until: true,
        }
    }

    pub const fn send_only() -> Self {
        Self {
            raw_send: true,
            read_until: false,
        }
    }
}

/// Byte channel to one physical device
///
/// Both operations are single-shot: each call resolves exactly once, with
/// success or the transport's raw error payload.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Transmit one rendered command
    async fn send(&self, command: &str) -> PrintResult<()>;

    /// Read until `delimiter` is seen, returning the data before it
    async fn read_until(&self, delimiter: &str) -> PrintResult<String>;
}

/// Enumerates devices reachable from this host
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Single-shot scan; errors carry the collaborator's payload
    async fn scan(&self, kind: DeviceKind) -> PrintResult<Vec<DeviceHandle>>;
}

/// A discovered device
#[derive(Clone)]
pub struct DeviceHandle {
    name: String,
    uid: String,
    connection: ConnectionType,
    manufacturer: Option<String>,
    capabilities: Capabilities,
    transport: Arc<dyn DeviceTransport>,
}

impl DeviceHandle {
    pub fn new(
        name: impl Into<String>,
        uid: impl Into<String>,
        connection: ConnectionType,
        transport: Arc<dyn DeviceTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
            connection,
            manufacturer: None,
            capabilities: Capabilities::full(),
            transport,
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique id
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn connection(&self) -> &ConnectionType {
        &self.connection
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn transport(&self) -> &Arc<dyn DeviceTransport> {
        &self.transport
    }

    /// Whether two handles refer to the same device
    pub fn same_device(&self, other: &DeviceHandle) -> bool {
        self.uid == other.uid
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("name", &self.name)
            .field("uid", &self.uid)
            .field("connection", &self.connection)
            .field("manufacturer", &self.manufacturer)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_connection_type_parse() {
        assert_eq!(ConnectionType::from("USB"), ConnectionType::Usb);
        assert_eq!(ConnectionType::from("driver"), ConnectionType::Driver);
        assert_eq!(
            ConnectionType::from("serial"),
            ConnectionType::Other("serial".into())
        );
    }

    #[test]
    fn test_direct_connections() {
        assert!(ConnectionType::Usb.is_direct());
        assert!(ConnectionType::Network.is_direct());
        assert!(!ConnectionType::Driver.is_direct());
        assert!(!ConnectionType::Other("serial".into()).is_direct());
    }

    #[test]
    fn test_handle_builder() {
        let handle = DeviceHandle::new("ZD421", "uid-1", ConnectionType::Driver, Arc::new(NullTransport))
            .with_manufacturer("Zebra Technologies")
            .with_capabilities(Capabilities::send_only());

        assert_eq!(handle.name(), "ZD421");
        assert_eq!(handle.manufacturer(), Some("Zebra Technologies"));
        assert!(handle.capabilities().raw_send);
        assert!(!handle.capabilities().read_until);

        let debug = format!("{:?}", handle);
        assert!(debug.contains("ZD421"));
    }
}
