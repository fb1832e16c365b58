//! The watchdog registry: registration, aging, refresh and removal.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, MutexGuard, ReentrantMutex, ReentrantMutexGuard};

use crate::arena::{OrderedArena, SlotKey};
use crate::config::{CallbackDispatch, RegistryConfig};
use crate::entry::{EntryName, EntrySnapshot, WatchdogCallback, WatchdogEntry, WatchdogHandle};
use crate::error::{WatchdogError, WatchdogResult};

static GLOBAL: OnceLock<WatchdogRegistry> = OnceLock::new();

/// The process-wide registry.
///
/// Created with the default configuration on first access and never torn
/// down. Code that needs isolated state (tests, multiple boards in one
/// process) should own a [`WatchdogRegistry`] instead.
#[must_use]
pub fn global() -> &'static WatchdogRegistry {
    GLOBAL.get_or_init(WatchdogRegistry::new)
}

/// Registry of dead-man's switch entries.
///
/// Subsystems register a named entry with a disconnect threshold and two
/// callbacks. An external periodic driver calls [`tick`](Self::tick) (or
/// [`run_cycle`](Self::run_cycle)) at a fixed cadence; every entry not
/// refreshed before its threshold elapses fires `on_disconnect` once.
///
/// # Thread Safety
///
/// One mutex guards the whole entry collection. A tick pass, and each
/// register, refresh and remove call, runs entirely inside that critical
/// section, so a tick always sees a consistent collection.
///
/// # Callbacks
///
/// With [`CallbackDispatch::WithinLock`] (the default) callbacks run while
/// the lock is held. Their latency adds to every other context waiting on
/// the registry, and a callback that calls back into the same registry
/// deadlocks. [`CallbackDispatch::AfterUnlock`] defers them until the lock
/// is released. A separate re-entrant dispatch lock is held from capture to
/// invocation, so callbacks of concurrent ticks and refreshes are delivered
/// in the order their state changes were made. Entry state is always updated before the callback runs, so a
/// panicking callback leaves the registry consistent.
///
/// # Example
///
/// ```rust
/// use openracing_link_watchdog::prelude::*;
///
/// let registry = WatchdogRegistry::new();
/// registry.init(4).expect("cycle must be non-zero");
///
/// let motor = registry
///     .register("motor", 10, || println!("motor lost"), || println!("motor back"))
///     .expect("registration");
///
/// registry.run_cycle();
/// registry.run_cycle();
/// assert_eq!(registry.run_cycle(), 1);
///
/// registry.refresh_by_handle(motor).expect("live handle");
/// assert!(!registry.any_disconnected());
/// ```
pub struct WatchdogRegistry {
    config: RegistryConfig,
    run_cycle_ms: OnceLock<u32>,
    entries: Mutex<OrderedArena<WatchdogEntry>>,
    dispatch: ReentrantMutex<()>,
}

impl WatchdogRegistry {
    /// Create an empty, uninitialized registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(RegistryConfig::default())
    }

    /// Create an empty, uninitialized registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: RegistryConfig) -> WatchdogResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RegistryConfig) -> Self {
        Self {
            config,
            run_cycle_ms: OnceLock::new(),
            entries: Mutex::new(OrderedArena::new()),
            dispatch: ReentrantMutex::new(()),
        }
    }

    /// Set the tick interval.
    ///
    /// Only the first successful call has an effect; later calls are no-ops
    /// and never reset registered entries.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::InvalidConfiguration`] if `cycle_ms` is zero.
    pub fn init(&self, cycle_ms: u32) -> WatchdogResult<()> {
        if cycle_ms == 0 {
            return Err(WatchdogError::invalid_configuration(
                "cycle_ms must be greater than 0",
            ));
        }
        if self.run_cycle_ms.set(cycle_ms).is_ok() {
            tracing::debug!(cycle_ms, "Watchdog registry initialized");
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> u32 {
        *self.run_cycle_ms.get_or_init(|| {
            tracing::debug!(
                cycle_ms = self.config.default_cycle_ms,
                "Watchdog registry initialized with default cycle"
            );
            self.config.default_cycle_ms
        })
    }

    /// Whether the tick interval has been fixed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.run_cycle_ms.get().is_some()
    }

    /// Tick interval the periodic driver should report per tick.
    ///
    /// Initializes the registry with the configured default if needed.
    #[must_use]
    pub fn run_cycle_ms(&self) -> u32 {
        self.ensure_initialized()
    }

    /// Serializes callback delivery in `AfterUnlock` mode.
    ///
    /// Always acquired before `entries`.
    fn dispatch_guard(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
        match self.config.dispatch {
            CallbackDispatch::WithinLock => None,
            CallbackDispatch::AfterUnlock => Some(self.dispatch.lock()),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new entry at the end of the registry.
    ///
    /// Names are not required to be unique; by-name operations resolve to
    /// the first match in registration order. A threshold of zero fires on
    /// the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::InvalidName`] for an empty or disallowed
    /// name and [`WatchdogError::AllocationFailure`] if entry storage cannot
    /// grow. Existing entries are untouched on failure.
    pub fn register<D, R>(
        &self,
        name: &str,
        threshold_ms: u32,
        on_disconnect: D,
        on_refresh: R,
    ) -> WatchdogResult<WatchdogHandle>
    where
        D: Fn() + Send + Sync + 'static,
        R: Fn() + Send + Sync + 'static,
    {
        self.register_shared(
            name,
            threshold_ms,
            Arc::new(on_disconnect),
            Arc::new(on_refresh),
        )
    }

    /// Register a new entry with callbacks that may be shared between entries.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_shared(
        &self,
        name: &str,
        threshold_ms: u32,
        on_disconnect: WatchdogCallback,
        on_refresh: WatchdogCallback,
    ) -> WatchdogResult<WatchdogHandle> {
        self.ensure_initialized();
        let name = EntryName::new(name, self.config.max_name_len, self.config.name_policy)?;
        let entry = WatchdogEntry::new(name, threshold_ms, on_disconnect, on_refresh);

        let mut entries = self.entries.lock();
        let key = entries
            .push_back(entry)
            .ok_or(WatchdogError::AllocationFailure)?;
        let handle = WatchdogHandle::from_key(key);
        if let Some(entry) = entries.get(key) {
            tracing::debug!(
                name = entry.name(),
                %handle,
                threshold_ms,
                "Watchdog entry registered"
            );
        }
        Ok(handle)
    }

    /// Age every entry by `elapsed_ms` and fire due disconnect callbacks.
    ///
    /// Entries are visited in registration order. Each entry fires at most
    /// once per disconnect episode. Returns the number of callbacks fired.
    pub fn tick(&self, elapsed_ms: u32) -> usize {
        self.ensure_initialized();
        match self.config.dispatch {
            CallbackDispatch::WithinLock => {
                let mut fired = 0usize;
                let mut entries = self.entries.lock();
                entries.for_each_mut(|_, entry| {
                    if entry.advance(elapsed_ms) {
                        log_disconnect(entry);
                        fired = fired.saturating_add(1);
                        (entry.on_disconnect())();
                    }
                });
                fired
            }
            CallbackDispatch::AfterUnlock => {
                let _dispatch = self.dispatch.lock();
                let pending = {
                    let mut pending: Vec<WatchdogCallback> = Vec::new();
                    let mut entries = self.entries.lock();
                    entries.for_each_mut(|_, entry| {
                        if entry.advance(elapsed_ms) {
                            log_disconnect(entry);
                            pending.push(Arc::clone(entry.on_disconnect()));
                        }
                    });
                    pending
                };
                for callback in &pending {
                    callback();
                }
                pending.len()
            }
        }
    }

    /// Run one tick of the configured interval.
    ///
    /// This is the body of the periodic driver loop; the driver sleeps
    /// [`run_cycle_ms`](Self::run_cycle_ms) between calls.
    pub fn run_cycle(&self) -> usize {
        self.tick(self.ensure_initialized())
    }

    /// Feed the entry behind `handle`.
    ///
    /// Resets its age, ends any disconnect episode and invokes `on_refresh`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::StaleHandle`] if the entry was removed.
    pub fn refresh_by_handle(&self, handle: WatchdogHandle) -> WatchdogResult<()> {
        let _dispatch = self.dispatch_guard();
        let entries = self.entries.lock();
        if entries.get(handle.key()).is_none() {
            return Err(WatchdogError::StaleHandle(handle));
        }
        self.refresh_entry(entries, handle.key());
        Ok(())
    }

    /// Feed the first entry, in registration order, named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::EmptyRegistry`] if nothing is registered and
    /// [`WatchdogError::EntryNotFound`] if no entry matches.
    pub fn refresh_by_name(&self, name: &str) -> WatchdogResult<()> {
        let _dispatch = self.dispatch_guard();
        let entries = self.entries.lock();
        let key = self.lookup(&entries, name)?;
        self.refresh_entry(entries, key);
        Ok(())
    }

    fn refresh_entry(
        &self,
        mut entries: MutexGuard<'_, OrderedArena<WatchdogEntry>>,
        key: SlotKey,
    ) {
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if entry.feed() {
            tracing::info!(name = entry.name(), "Watchdog entry reconnected");
        } else {
            tracing::trace!(name = entry.name(), "Watchdog entry refreshed");
        }

        match self.config.dispatch {
            CallbackDispatch::WithinLock => (entry.on_refresh())(),
            CallbackDispatch::AfterUnlock => {
                let callback = Arc::clone(entry.on_refresh());
                drop(entries);
                callback();
            }
        }
    }

    /// Remove the entry behind `handle`.
    ///
    /// Remaining entries keep their relative order and state.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::StaleHandle`] if the entry was already removed.
    pub fn remove_by_handle(&self, handle: WatchdogHandle) -> WatchdogResult<()> {
        let removed = self
            .entries
            .lock()
            .remove(handle.key())
            .ok_or(WatchdogError::StaleHandle(handle))?;
        tracing::debug!(name = removed.name(), %handle, "Watchdog entry removed");
        Ok(())
    }

    /// Remove the first entry, in registration order, named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::EmptyRegistry`] if nothing is registered and
    /// [`WatchdogError::EntryNotFound`] if no entry matches.
    pub fn remove_by_name(&self, name: &str) -> WatchdogResult<()> {
        let (key, removed) = {
            let mut entries = self.entries.lock();
            let key = self.lookup(&entries, name)?;
            let removed = entries
                .remove(key)
                .ok_or_else(|| WatchdogError::entry_not_found(name))?;
            (key, removed)
        };
        tracing::debug!(
            name = removed.name(),
            handle = %WatchdogHandle::from_key(key),
            "Watchdog entry removed"
        );
        Ok(())
    }

    fn lookup(
        &self,
        entries: &OrderedArena<WatchdogEntry>,
        name: &str,
    ) -> WatchdogResult<SlotKey> {
        if entries.is_empty() {
            return Err(WatchdogError::EmptyRegistry);
        }
        let query = EntryName::fit(name, self.config.max_name_len, self.config.name_policy)
            .filter(|query| !query.is_empty())
            .ok_or_else(|| WatchdogError::entry_not_found(name))?;
        entries
            .find(|entry| entry.name() == query)
            .ok_or_else(|| WatchdogError::entry_not_found(name))
    }

    /// Handle of the first entry named `name`.
    #[must_use]
    pub fn handle_of(&self, name: &str) -> Option<WatchdogHandle> {
        let entries = self.entries.lock();
        self.lookup(&entries, name)
            .ok()
            .map(WatchdogHandle::from_key)
    }

    /// Snapshot of the entry behind `handle`.
    #[must_use]
    pub fn entry(&self, handle: WatchdogHandle) -> Option<EntrySnapshot> {
        let entries = self.entries.lock();
        entries
            .get(handle.key())
            .map(|entry| entry.snapshot(handle))
    }

    /// Snapshot of the first entry named `name`.
    #[must_use]
    pub fn entry_by_name(&self, name: &str) -> Option<EntrySnapshot> {
        let entries = self.entries.lock();
        let key = self.lookup(&entries, name).ok()?;
        entries
            .get(key)
            .map(|entry| entry.snapshot(WatchdogHandle::from_key(key)))
    }

    /// Snapshots of all entries in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        let entries = self.entries.lock();
        entries
            .iter()
            .map(|(key, entry)| entry.snapshot(WatchdogHandle::from_key(key)))
            .collect()
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Check if any entry is in a disconnect episode.
    #[must_use]
    pub fn any_disconnected(&self) -> bool {
        let entries = self.entries.lock();
        entries.iter().any(|(_, entry)| entry.is_disconnected())
    }

    /// Names of disconnected entries in registration order.
    #[must_use]
    pub fn disconnected_names(&self) -> Vec<String> {
        let entries = self.entries.lock();
        entries
            .iter()
            .filter(|(_, entry)| entry.is_disconnected())
            .map(|(_, entry)| entry.name().to_owned())
            .collect()
    }
}

fn log_disconnect(entry: &WatchdogEntry) {
    tracing::warn!(
        name = entry.name(),
        threshold_ms = entry.threshold_ms(),
        age_ms = entry.age_ms(),
        "Watchdog entry disconnected"
    );
}

impl Default for WatchdogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WatchdogRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchdogRegistry")
            .field("config", &self.config)
            .field("run_cycle_ms", &self.run_cycle_ms.get())
            .field("entry_count", &self.entries.lock().len())
            .finish()
    }
}
