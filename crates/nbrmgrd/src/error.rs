//! Error types for the neighbor manager daemon.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SI-11: Error Handling - Structured error types with contextual information
//! - AU-3: Content of Audit Records - Errors include sufficient detail for audit

use thiserror::Error;

/// Errors surfaced by the daemon.
///
/// # NIST Controls
/// - SI-11(a): Generate error messages providing information necessary for corrective actions
/// - SI-11(b): Reveal only information necessary for error handling (no sensitive data exposure)
#[derive(Debug, Error)]
pub enum NbrMgrError {
    /// A queue was closed while the daemon was still running
    /// NIST: SI-4 (System Monitoring) - Pipeline liveness errors
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    /// Configuration error
    /// NIST: CM-6 (Configuration Settings) - Configuration validation
    #[error("configuration error: {0}")]
    Config(String),

    /// Value parsing failed
    /// NIST: SI-10 (Information Input Validation) - Address validation
    #[error(transparent)]
    Parse(#[from] nbr_types::ParseError),

    /// IO error
    /// NIST: SI-11 (Error Handling) - System-level errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for daemon operations.
pub type Result<T> = std::result::Result<T, NbrMgrError>;
