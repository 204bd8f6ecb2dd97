//! Discovery backends
//!
//! - [`NetworkDiscovery`]: printers configured by address, reached over raw TCP
//! - [`FixedDiscovery`]: a preset device list (embedding hosts, tests)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::device::{Capabilities, ConnectionType, DeviceHandle, DeviceKind, Discovery};
use crate::encoding::CommandEncoding;
use crate::error::{PrintError, PrintResult};
use crate::network::{NetworkTransport, RAW_PORT};

/// A configured network printer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl NetworkEndpoint {
    /// Parse `name=host[:port]`
    pub fn parse(spec: &str) -> PrintResult<Self> {
        let (name, addr) = spec
            .split_once('=')
            .ok_or_else(|| PrintError::InvalidConfig(format!("Expected name=host:port, got {}", spec)))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(PrintError::InvalidConfig(format!("Missing printer name in {}", spec)));
        }

        let addr = addr.trim();
        let (host, port) = match addr.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| PrintError::InvalidConfig(format!("Invalid port in {}", spec)))?;
                (host, port)
            }
            None => (addr, RAW_PORT),
        };

        if host.is_empty() {
            return Err(PrintError::InvalidConfig(format!("Missing host in {}", spec)));
        }

        Ok(Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// Parse a `;`-separated list, ignoring empty entries
    pub fn parse_list(list: &str) -> PrintResult<Vec<Self>> {
        list.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn uid(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

/// Discovery over a configured list of network printers
pub struct NetworkDiscovery {
    endpoints: Vec<NetworkEndpoint>,
    manufacturer: String,
    timeout: Duration,
    encoding: CommandEncoding,
    probe: bool,
}

impl NetworkDiscovery {
    pub fn new(endpoints: Vec<NetworkEndpoint>) -> Self {
        Self {
            endpoints,
            manufacturer: "Zebra Technologies".to_string(),
            timeout: Duration::from_secs(5),
            encoding: CommandEncoding::default(),
            probe: false,
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_encoding(mut self, encoding: CommandEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Only report printers that accept a TCP connection during the scan
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }
}

#[async_trait]
impl Discovery for NetworkDiscovery {
    #[instrument(skip(self), fields(configured = self.endpoints.len()))]
    async fn scan(&self, kind: DeviceKind) -> PrintResult<Vec<DeviceHandle>> {
        if kind != DeviceKind::Printer {
            return Ok(Vec::new());
        }

        let mut devices = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let transport = NetworkTransport::new(&endpoint.host, endpoint.port)
                .map_err(|e| PrintError::Discovery(e.to_string().into()))?
                .with_timeout(self.timeout)
                .with_encoding(self.encoding);

            if self.probe && !transport.is_online().await {
                warn!(name = %endpoint.name, "Skipping offline printer");
                continue;
            }

            devices.push(
                DeviceHandle::new(
                    endpoint.name.clone(),
                    endpoint.uid(),
                    ConnectionType::Network,
                    Arc::new(transport),
                )
                .with_manufacturer(self.manufacturer.clone())
                .with_capabilities(Capabilities::full()),
            );
        }

        info!(found = devices.len(), "Network scan finished");
        Ok(devices)
    }
}

/// Discovery that always reports the same devices
#[derive(Default)]
pub struct FixedDiscovery {
    devices: Vec<DeviceHandle>,
}

impl FixedDiscovery {
    pub fn new(devices: Vec<DeviceHandle>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl Discovery for FixedDiscovery {
    async fn scan(&self, kind: DeviceKind) -> PrintResult<Vec<DeviceHandle>> {
        if kind != DeviceKind::Printer {
            return Ok(Vec::new());
        }
        Ok(self.devices.clone())
    }
}
