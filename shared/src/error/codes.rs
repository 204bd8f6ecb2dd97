//! Unified error codes for the label engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Device errors (discovery, selection, resolution)
//! - 2xxx: Template errors
//! - 3xxx: Dispatch errors (transport, status reads)
//! - 4xxx: Job errors (payload, batch structure, orchestration)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Device ====================
    /// Device enumeration failed
    DiscoveryFailed = 1001,
    /// No device matches the identifier
    DeviceNotFound = 1002,
    /// Manual selection received a malformed handle
    InvalidDeviceSelection = 1003,
    /// Device lacks the capability for the operation
    UnsupportedOperation = 1004,
    /// No device is currently selected
    NoDeviceSelected = 1005,

    // ==================== 2xxx: Template ====================
    /// Template body could not be compiled
    TemplateCompileFailed = 2001,
    /// Field substitution failed for one item
    TemplateRenderFailed = 2002,

    // ==================== 3xxx: Dispatch ====================
    /// Device channel reported a failure
    TransportFailed = 3001,
    /// Device did not answer in time
    TransportTimeout = 3002,

    // ==================== 4xxx: Job ====================
    /// Job payload missing or unreadable
    InvalidPayload = 4001,
    /// Batch request is missing required data
    StructuralError = 4002,
    /// Job-level precondition not met
    OrchestrationFailed = 4003,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Configuration error
    ConfigError = 9005,
    /// IO error
    IoError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",

            // Device
            ErrorCode::DiscoveryFailed => "Error scanning for printers",
            ErrorCode::DeviceNotFound => "Printer not found",
            ErrorCode::InvalidDeviceSelection => "Invalid printer device provided",
            ErrorCode::UnsupportedOperation => "Printer does not support this operation",
            ErrorCode::NoDeviceSelected => "No printer selected",

            // Template
            ErrorCode::TemplateCompileFailed => "Template compilation error",
            ErrorCode::TemplateRenderFailed => "Template rendering error",

            // Dispatch
            ErrorCode::TransportFailed => "Printer transport error",
            ErrorCode::TransportTimeout => "Timeout reading from printer",

            // Job
            ErrorCode::InvalidPayload => "Invalid print job payload",
            ErrorCode::StructuralError => "Label batch is missing required data",
            ErrorCode::OrchestrationFailed => "Print job precondition not met",

            // System
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::IoError => "IO error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a u16 does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),

            // Device
            1001 => Ok(ErrorCode::DiscoveryFailed),
            1002 => Ok(ErrorCode::DeviceNotFound),
            1003 => Ok(ErrorCode::InvalidDeviceSelection),
            1004 => Ok(ErrorCode::UnsupportedOperation),
            1005 => Ok(ErrorCode::NoDeviceSelected),

            // Template
            2001 => Ok(ErrorCode::TemplateCompileFailed),
            2002 => Ok(ErrorCode::TemplateRenderFailed),

            // Dispatch
            3001 => Ok(ErrorCode::TransportFailed),
            3002 => Ok(ErrorCode::TransportTimeout),

            // Job
            4001 => Ok(ErrorCode::InvalidPayload),
            4002 => Ok(ErrorCode::StructuralError),
            4003 => Ok(ErrorCode::OrchestrationFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::IoError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
