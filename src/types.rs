// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use poem_openapi::Object;
use thiserror::Error;

/// Guard failures. Each one ends the request right after its message.
/// A missing sentinel is an outcome, not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosisError {
    #[error("Insufficient permissions")]
    Unauthorized,
    #[error("Can not read object cache file {path}")]
    ConfigUnreadable { path: String },
    #[error("Unknown object cache backend")]
    UnknownBackend,
    #[error("Failed to render {template}: {message}")]
    Render { template: String, message: String },
}

impl DiagnosisError {
    pub fn error_code(&self) -> &'static str {
        match self {
            DiagnosisError::Unauthorized => "UNAUTHORIZED",
            DiagnosisError::ConfigUnreadable { .. } => "CONFIG_UNREADABLE",
            DiagnosisError::UnknownBackend => "UNKNOWN_BACKEND",
            DiagnosisError::Render { .. } => "RENDER_ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheConfigError {
    #[error("Invalid cache backend: {backend}")]
    UnknownBackend { backend: String },
    #[error("Could not open {backend} cache: {message}")]
    Connect { backend: String, message: String },
}

#[derive(Object, Debug)]
pub struct ErrorResponse {
    pub details: String,
    pub code: String,
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(details: &str, code: &str, status: u16) -> Self {
        Self {
            details: details.to_string(),
            code: code.to_string(),
            status,
        }
    }
}
