//! Registry configuration.

use serde::{Deserialize, Serialize};

use crate::error::{WatchdogError, WatchdogResult};

/// Tick interval used when `init` was never called explicitly.
pub const DEFAULT_CYCLE_MS: u32 = 1;

/// Longest entry name in bytes (20-byte buffer minus the terminator).
pub const DEFAULT_MAX_NAME_LEN: usize = 19;

/// What happens to a name longer than `max_name_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamePolicy {
    /// Cut the name at the last character boundary that fits.
    #[default]
    Truncate,
    /// Refuse the name with [`WatchdogError::InvalidName`].
    Reject,
}

/// When user callbacks run relative to the registry lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallbackDispatch {
    /// Callbacks run while the lock is held.
    ///
    /// A tick observes and fires within one critical section. A callback that
    /// calls back into the same registry deadlocks, and slow callbacks delay
    /// every other context waiting on the registry.
    #[default]
    WithinLock,
    /// Callbacks are captured under the lock and invoked after it is released.
    ///
    /// Firing order is still registration order. Callbacks may re-enter the
    /// registry. Delivery is serialized by a re-entrant dispatch lock, so a
    /// refresh issued while a tick's disconnect callbacks are still running
    /// waits for them, and its `on_refresh` always follows.
    AfterUnlock,
}

/// Configuration for a [`WatchdogRegistry`](crate::WatchdogRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Tick interval (milliseconds) applied by implicit initialization.
    pub default_cycle_ms: u32,
    /// Maximum entry name length in bytes.
    pub max_name_len: usize,
    /// Handling of over-long names.
    pub name_policy: NamePolicy,
    /// Callback dispatch mode.
    pub dispatch: CallbackDispatch,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_cycle_ms: DEFAULT_CYCLE_MS,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            name_policy: NamePolicy::Truncate,
            dispatch: CallbackDispatch::WithinLock,
        }
    }
}

impl RegistryConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> WatchdogResult<()> {
        if self.default_cycle_ms == 0 {
            return Err(WatchdogError::invalid_configuration(
                "default_cycle_ms must be greater than 0",
            ));
        }
        if self.max_name_len == 0 {
            return Err(WatchdogError::invalid_configuration(
                "max_name_len must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }
}

/// Builder for `RegistryConfig`.
#[derive(Debug, Default)]
pub struct RegistryConfigBuilder {
    config: RegistryConfig,
}

impl RegistryConfigBuilder {
    /// Set the implicit tick interval in milliseconds.
    #[must_use]
    pub fn default_cycle_ms(mut self, ms: u32) -> Self {
        self.config.default_cycle_ms = ms;
        self
    }

    /// Set the maximum name length in bytes.
    #[must_use]
    pub fn max_name_len(mut self, len: usize) -> Self {
        self.config.max_name_len = len;
        self
    }

    /// Set the over-long name policy.
    #[must_use]
    pub fn name_policy(mut self, policy: NamePolicy) -> Self {
        self.config.name_policy = policy;
        self
    }

    /// Set the callback dispatch mode.
    #[must_use]
    pub fn dispatch(mut self, dispatch: CallbackDispatch) -> Self {
        self.config.dispatch = dispatch;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> WatchdogResult<RegistryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
