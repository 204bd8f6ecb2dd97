//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Device errors
/// - 2xxx: Template errors
/// - 3xxx: Dispatch errors
/// - 4xxx: Job errors
/// - 5xxx and above: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Device errors (1xxx)
    Device,
    /// Template errors (2xxx)
    Template,
    /// Dispatch errors (3xxx)
    Dispatch,
    /// Job errors (4xxx)
    Job,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Device,
            2000..3000 => Self::Template,
            3000..4000 => Self::Dispatch,
            4000..5000 => Self::Job,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Device => "device",
            Self::Template => "template",
            Self::Dispatch => "dispatch",
            Self::Job => "job",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
