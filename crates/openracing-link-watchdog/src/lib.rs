//! # openracing-link-watchdog
//!
//! Dead-man's switch registry for subsystem links in `OpenRacing` firmware.
//!
//! Independent subsystems (motor controllers, radio links, sensor buses)
//! register a named entry with a disconnect threshold and two callbacks.
//! A periodic driver ages every entry; an entry that is not refreshed before
//! its threshold elapses fires its disconnect callback exactly once per
//! disconnect episode. Refreshing ("feeding") an entry resets its age and
//! invokes its refresh callback.
//!
//! ## Architecture
//!
//! - [`registry`] - `WatchdogRegistry`, the process-wide [`global`] instance
//! - [`entry`] - Entry handles, bounded names and state snapshots
//! - [`config`] - Registry configuration and callback dispatch mode
//! - [`error`] - Registry error types
//!
//! ## Concurrency
//!
//! Every operation runs under a single registry lock. The tick pass is
//! atomic with respect to concurrent register, refresh and remove calls.
//! See [`CallbackDispatch`] for when user callbacks run relative to the
//! lock.
//!
//! ## Example
//!
//! ```rust
//! use openracing_link_watchdog::prelude::*;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let registry = WatchdogRegistry::new();
//! let motor_enabled = Arc::new(AtomicBool::new(true));
//!
//! let on_lost = Arc::clone(&motor_enabled);
//! let on_back = Arc::clone(&motor_enabled);
//! registry
//!     .register(
//!         "motor",
//!         10,
//!         move || on_lost.store(false, Ordering::SeqCst),
//!         move || on_back.store(true, Ordering::SeqCst),
//!     )
//!     .expect("registration");
//!
//! for _ in 0..3 {
//!     registry.tick(4);
//! }
//! assert!(!motor_enabled.load(Ordering::SeqCst));
//!
//! registry.refresh_by_name("motor").expect("registered");
//! assert!(motor_enabled.load(Ordering::SeqCst));
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod arena;
pub mod config;
pub mod entry;
pub mod error;
pub mod registry;

pub mod prelude;

pub use config::{CallbackDispatch, NamePolicy, RegistryConfig, RegistryConfigBuilder};
pub use entry::{EntrySnapshot, WatchdogCallback, WatchdogHandle};
pub use error::{WatchdogError, WatchdogResult};
pub use registry::{WatchdogRegistry, global};
