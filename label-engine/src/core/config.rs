use std::time::Duration;

use label_printer::{CommandEncoding, NetworkEndpoint};
use shared::AppError;

/// Engine configuration
///
/// # Environment variables
///
/// Every setting can be overridden from the environment (or `.env`):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | LOG_LEVEL | info | tracing max level |
/// | LOG_DIR | - | daily rolling log directory |
/// | LABEL_PRINTERS | - | `name=host:port;name=host:port` |
/// | LABEL_VENDOR | zebra | vendor for driver-connected printers |
/// | LABEL_PLACEHOLDER_TOKEN | EXTERNAL_TEMPLATE | external template token |
/// | STATUS_DELIMITER | `\r\n` | status read delimiter |
/// | STATUS_TIMEOUT_MS | 5000 | status read timeout |
/// | CONNECT_TIMEOUT_MS | 5000 | TCP connect timeout |
/// | LABEL_ENCODING | utf8 | `utf8` or `gbk` |
/// | AUTO_SCAN | true | scan before a job when no printers are known |
/// | PROBE_PRINTERS | false | only list printers accepting a connection |
///
/// # Example
///
/// ```ignore
/// LABEL_PRINTERS="ZD421=192.168.1.50:9100" label-engine print --job job.json
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Raw printer list, parsed by [`Config::endpoints`]
    pub printers: String,
    pub vendor: String,
    pub placeholder_token: String,
    pub status_delimiter: String,
    pub status_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Raw encoding name, parsed by [`Config::command_encoding`]
    pub encoding: String,
    pub auto_scan: bool,
    pub probe_printers: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()),
            printers: std::env::var("LABEL_PRINTERS").unwrap_or_default(),
            vendor: std::env::var("LABEL_VENDOR").unwrap_or_else(|_| "zebra".into()),
            placeholder_token: std::env::var("LABEL_PLACEHOLDER_TOKEN")
                .unwrap_or_else(|_| "EXTERNAL_TEMPLATE".into()),
            status_delimiter: std::env::var("STATUS_DELIMITER")
                .map(|d| unescape(&d))
                .unwrap_or_else(|_| "\r\n".into()),
            status_timeout_ms: std::env::var("STATUS_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            connect_timeout_ms: std::env::var("CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            encoding: std::env::var("LABEL_ENCODING").unwrap_or_else(|_| "utf8".into()),
            auto_scan: std::env::var("AUTO_SCAN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            probe_printers: std::env::var("PROBE_PRINTERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Override the printer list
    ///
    /// Common in tests and for CLI `--printer` flags.
    pub fn with_printers(mut self, printers: impl Into<String>) -> Self {
        self.printers = printers.into();
        self
    }

    /// Configured network printers
    pub fn endpoints(&self) -> Result<Vec<NetworkEndpoint>, AppError> {
        NetworkEndpoint::parse_list(&self.printers)
            .map_err(|e| AppError::config(format!("LABEL_PRINTERS: {}", e)))
    }

    pub fn command_encoding(&self) -> Result<CommandEncoding, AppError> {
        self.encoding
            .parse()
            .map_err(|e| AppError::config(format!("LABEL_ENCODING: {}", e)))
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Settings the orchestration engine needs
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            vendor: self.vendor.clone(),
            placeholder_token: self.placeholder_token.clone(),
            auto_scan: self.auto_scan,
            status_delimiter: self.status_delimiter.clone(),
            status_timeout: self.status_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Orchestration settings
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Vendor name accepted for driver-connected printers
    pub vendor: String,
    /// Template value meaning "use the externally supplied body"
    pub placeholder_token: String,
    /// Scan before a job when the directory has never been populated
    pub auto_scan: bool,
    pub status_delimiter: String,
    pub status_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            vendor: "zebra".to_string(),
            placeholder_token: "EXTERNAL_TEMPLATE".to_string(),
            auto_scan: true,
            status_delimiter: "\r\n".to_string(),
            status_timeout: Duration::from_millis(5000),
        }
    }
}

/// Turn `\r`, `\n`, `\t` and `\\` escapes from env values into characters
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
