//! Unified error system for the label engine
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified response envelope
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Device errors
//! - 2xxx: Template errors
//! - 3xxx: Dispatch errors
//! - 4xxx: Job errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::with_message(ErrorCode::DeviceNotFound, "printer not found: ZD421")
//!     .with_detail("identifier", "ZD421");
//!
//! let response: ApiResponse<()> = err.into();
//! assert_eq!(response.code, Some(1002));
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
