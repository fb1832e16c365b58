//! Error types for the link watchdog registry.
//!
//! Every failure is returned to the immediate caller. Nothing in this crate
//! escalates a failed refresh or removal; the caller decides how to react.

use thiserror::Error;

use crate::entry::WatchdogHandle;

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    /// No live entry carries the requested name.
    #[error("Watchdog entry not found: {0}")]
    EntryNotFound(String),

    /// The handle refers to an entry that was removed or never existed.
    #[error("Stale watchdog handle: {0}")]
    StaleHandle(WatchdogHandle),

    /// A by-name operation was issued before any entry was registered.
    #[error("Watchdog registry is empty")]
    EmptyRegistry,

    /// The entry name is empty or exceeds the configured bound.
    #[error("Invalid entry name: {0}")]
    InvalidName(String),

    /// Entry storage could not grow.
    #[error("Failed to allocate watchdog entry")]
    AllocationFailure,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl WatchdogError {
    /// Create an entry not found error.
    #[must_use]
    pub fn entry_not_found(name: impl Into<String>) -> Self {
        Self::EntryNotFound(name.into())
    }

    /// Create an invalid name error.
    #[must_use]
    pub fn invalid_name(reason: impl Into<String>) -> Self {
        Self::InvalidName(reason.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    /// Whether the error means "no matching live entry".
    ///
    /// An empty registry counts as not found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntryNotFound(_) | Self::StaleHandle(_) | Self::EmptyRegistry
        )
    }
}

/// A specialized `Result` type for registry operations.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;
