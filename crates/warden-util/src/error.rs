//! Error types for wardend

use thiserror::Error;

/// Core error type for wardend operations
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Invalid monitor config: {0}")]
    InvalidConfig(String),

    #[error("Engine is not monitoring")]
    NotMonitoring,

    #[error("Blocked until the cooldown expires")]
    Blocked,

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("Usage-access permission required: {0}")]
    PermissionRequired(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionRequired(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
