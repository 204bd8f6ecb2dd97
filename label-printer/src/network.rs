//! Raw TCP transport (port 9100)
//!
//! Most label printers accept raw command streams on TCP port 9100 and
//! answer host status queries (`~HS`) on the same connection.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::device::DeviceTransport;
use crate::encoding::CommandEncoding;
use crate::error::{PrintError, PrintResult};

/// Default raw printing port
pub const RAW_PORT: u16 = 9100;

struct Connection {
    stream: TcpStream,
    /// Bytes read past the last delimiter
    pending: Vec<u8>,
}

/// Network printer reached over a persistent raw TCP connection
///
/// The connection is opened lazily and reused, so a status query sent with
/// [`DeviceTransport::send`] can be answered by a following
/// [`DeviceTransport::read_until`]. Any IO failure drops the connection; the
/// next call reconnects.
pub struct NetworkTransport {
    addr: SocketAddr,
    timeout: Duration,
    encoding: CommandEncoding,
    conn: Mutex<Option<Connection>>,
}

impl NetworkTransport {
    /// Create a transport for `host:port`
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let addr_str = format!("{}:{}", host, port);
        Self::from_addr(&addr_str)
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
            encoding: CommandEncoding::default(),
            conn: Mutex::new(None),
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_encoding(mut self, encoding: CommandEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn connect(&self) -> PrintResult<Connection> {
        debug!(addr = %self.addr, "Connecting to printer");
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))?;

        Ok(Connection {
            stream,
            pending: Vec::new(),
        })
    }

    /// Check if the printer is reachable
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(_)) => {
                info!("Printer online");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }
}

#[async_trait]
impl DeviceTransport for NetworkTransport {
    #[instrument(skip(self, command), fields(addr = %self.addr, len = command.len()))]
    async fn send(&self, command: &str) -> PrintResult<()> {
        let data = self.encoding.encode(command);
        let mut guard = self.conn.lock().await;

        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(PrintError::Connection(format!("{}: not connected", self.addr)));
        };

        let written = async {
            conn.stream.write_all(&data).await?;
            conn.stream.flush().await
        }
        .await;

        if let Err(e) = written {
            *guard = None;
            return Err(PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            )));
        }

        info!(bytes = data.len(), "Label data sent");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn read_until(&self, delimiter: &str) -> PrintResult<String> {
        let delim = self.encoding.encode(delimiter);
        if delim.is_empty() {
            return Err(PrintError::InvalidConfig("Empty read delimiter".to_string()));
        }

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(PrintError::Connection(format!("{}: not connected", self.addr)));
        };

        let mut chunk = [0u8; 512];
        loop {
            if let Some(pos) = find(&conn.pending, &delim) {
                let data: Vec<u8> = conn.pending.drain(..pos + delim.len()).collect();
                return Ok(self.encoding.decode(&data[..pos]));
            }

            match conn.stream.read(&mut chunk).await {
                Ok(0) => {
                    *guard = None;
                    return Err(PrintError::transport("connection closed by printer"));
                }
                Ok(n) => conn.pending.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    *guard = None;
                    return Err(PrintError::Io(e));
                }
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
