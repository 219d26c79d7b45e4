// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Portico.

use thiserror::Error;

use crate::types::{CapabilityKind, Permission};

/// Top-level error type for all Portico operations.
#[derive(Debug, Error)]
pub enum PorticoError {
    // -- Capability taxonomy --
    #[error("permission denied: {0}")]
    PermissionDenied(Permission),

    #[error("cancelled by the user")]
    UserCancelled,

    #[error("precondition unavailable: {0}")]
    PreconditionUnavailable(String),

    /// A request of this kind is still outstanding.
    #[error("{0} request already in flight")]
    Busy(CapabilityKind),

    /// The OS is already showing a prompt for another permission.
    #[error("{0} permission prompt already showing")]
    PromptOutstanding(Permission),

    #[error("native operation failed: {0}")]
    NativeOperation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("recording too short")]
    RecordingTooShort,

    #[error("timed out waiting for {0}")]
    TimedOut(CapabilityKind),

    // -- Encoding --
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PorticoError>;
