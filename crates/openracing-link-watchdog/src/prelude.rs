//! Prelude for openracing-link-watchdog.
//!
//! This module re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust
//! use openracing_link_watchdog::prelude::*;
//!
//! let registry = WatchdogRegistry::new();
//! let handle = registry.register("radio", 50, || {}, || {}).expect("registration");
//! registry.refresh_by_handle(handle).expect("live handle");
//! ```

pub use crate::config::{CallbackDispatch, NamePolicy, RegistryConfig};
pub use crate::entry::{EntrySnapshot, WatchdogCallback, WatchdogHandle};
pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::registry::{WatchdogRegistry, global};
