//! Watchdog entries, handles and names.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::arena::SlotKey;
use crate::config::NamePolicy;
use crate::error::{WatchdogError, WatchdogResult};

/// User action invoked on disconnect or refresh.
///
/// The registry treats callbacks as black boxes. They may block or panic;
/// the registry neither times them out nor catches their panics.
pub type WatchdogCallback = Arc<dyn Fn() + Send + Sync>;

/// Opaque handle to a registered entry.
///
/// Handles stay valid until their entry is removed. A handle to a removed
/// entry never resolves to an entry registered later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchdogHandle(SlotKey);

impl WatchdogHandle {
    pub(crate) fn from_key(key: SlotKey) -> Self {
        Self(key)
    }

    pub(crate) fn key(self) -> SlotKey {
        self.0
    }
}

impl fmt::Display for WatchdogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.0.index(), self.0.generation())
    }
}

/// Bounded entry name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EntryName(String);

impl EntryName {
    /// Validate `raw` against the byte bound and policy.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::InvalidName`] if the name is empty, if it is
    /// too long under [`NamePolicy::Reject`], or if truncation leaves nothing.
    pub(crate) fn new(raw: &str, max_len: usize, policy: NamePolicy) -> WatchdogResult<Self> {
        if raw.is_empty() {
            return Err(WatchdogError::invalid_name("name must not be empty"));
        }
        let fitted = Self::fit(raw, max_len, policy).ok_or_else(|| {
            WatchdogError::invalid_name(format!("'{raw}' exceeds {max_len} bytes"))
        })?;
        if fitted.is_empty() {
            return Err(WatchdogError::invalid_name(format!(
                "'{raw}' has no prefix within {max_len} bytes"
            )));
        }
        Ok(Self(fitted.to_owned()))
    }

    /// Apply the length policy to a name without allocating.
    ///
    /// Lookups run the query through this so that the same literal used at
    /// registration still matches a truncated entry.
    pub(crate) fn fit(raw: &str, max_len: usize, policy: NamePolicy) -> Option<&str> {
        if raw.len() <= max_len {
            return Some(raw);
        }
        match policy {
            NamePolicy::Reject => None,
            NamePolicy::Truncate => {
                let mut end = max_len;
                while !raw.is_char_boundary(end) {
                    end = end.saturating_sub(1);
                }
                raw.get(..end)
            }
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

/// One subsystem's liveness record.
pub(crate) struct WatchdogEntry {
    name: EntryName,
    disconnect_threshold_ms: u32,
    age_ms: u32,
    disconnected: bool,
    fired: bool,
    disconnect_count: u64,
    refresh_count: u64,
    on_disconnect: WatchdogCallback,
    on_refresh: WatchdogCallback,
}

impl WatchdogEntry {
    pub(crate) fn new(
        name: EntryName,
        disconnect_threshold_ms: u32,
        on_disconnect: WatchdogCallback,
        on_refresh: WatchdogCallback,
    ) -> Self {
        Self {
            name,
            disconnect_threshold_ms,
            age_ms: 0,
            disconnected: false,
            fired: false,
            disconnect_count: 0,
            refresh_count: 0,
            on_disconnect,
            on_refresh,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.name.as_str()
    }

    pub(crate) fn threshold_ms(&self) -> u32 {
        self.disconnect_threshold_ms
    }

    pub(crate) fn age_ms(&self) -> u32 {
        self.age_ms
    }

    pub(crate) fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Age the entry by one tick.
    ///
    /// Returns `true` exactly once per disconnect episode: on the tick where
    /// the age first reaches the threshold. The caller fires `on_disconnect`.
    pub(crate) fn advance(&mut self, elapsed_ms: u32) -> bool {
        self.age_ms = self.age_ms.saturating_add(elapsed_ms);
        if self.age_ms >= self.disconnect_threshold_ms && !self.fired {
            self.fired = true;
            self.disconnected = true;
            self.disconnect_count = self.disconnect_count.saturating_add(1);
            return true;
        }
        false
    }

    /// Reset the entry after a liveness signal.
    ///
    /// Returns `true` if this ended a disconnect episode. The caller fires
    /// `on_refresh` regardless.
    pub(crate) fn feed(&mut self) -> bool {
        let was_disconnected = self.disconnected;
        self.age_ms = 0;
        self.disconnected = false;
        self.fired = false;
        self.refresh_count = self.refresh_count.saturating_add(1);
        was_disconnected
    }

    pub(crate) fn on_disconnect(&self) -> &WatchdogCallback {
        &self.on_disconnect
    }

    pub(crate) fn on_refresh(&self) -> &WatchdogCallback {
        &self.on_refresh
    }

    pub(crate) fn snapshot(&self, handle: WatchdogHandle) -> EntrySnapshot {
        EntrySnapshot {
            handle,
            name: self.name.as_str().to_owned(),
            disconnect_threshold_ms: self.disconnect_threshold_ms,
            age_ms: self.age_ms,
            disconnected: self.disconnected,
            fired: self.fired,
            disconnect_count: self.disconnect_count,
            refresh_count: self.refresh_count,
        }
    }
}

impl fmt::Debug for WatchdogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchdogEntry")
            .field("name", &self.name)
            .field("disconnect_threshold_ms", &self.disconnect_threshold_ms)
            .field("age_ms", &self.age_ms)
            .field("disconnected", &self.disconnected)
            .field("fired", &self.fired)
            .finish_non_exhaustive()
    }
}

/// Point-in-time copy of an entry's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot {
    /// Handle of the entry.
    #[serde(skip)]
    pub handle: WatchdogHandle,
    /// Stored (possibly truncated) name.
    pub name: String,
    /// Configured disconnect timeout in milliseconds.
    pub disconnect_threshold_ms: u32,
    /// Milliseconds accumulated since the last refresh.
    pub age_ms: u32,
    /// Whether the threshold was crossed as of the last tick.
    pub disconnected: bool,
    /// Whether `on_disconnect` already ran in the current episode.
    pub fired: bool,
    /// Disconnect episodes since registration.
    pub disconnect_count: u64,
    /// Refreshes since registration.
    pub refresh_count: u64,
}
