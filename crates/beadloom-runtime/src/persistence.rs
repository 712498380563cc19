#![forbid(unsafe_code)]

//! Tiered persistence of the design, palette and inventory.
//!
//! # Slots
//!
//! With base key `K`:
//!
//! | Slot | Backend | Contents |
//! |------|---------|----------|
//! | `K` | durable | full document |
//! | `K.backup.latest` | durable | previous primary, verbatim |
//! | `K.backup.<epoch-ms>` | durable | previous primaries, newest `retention` kept |
//! | `K.minimal` | durable | ids, name and cell contents only |
//! | `K.emergency` | session | periodic full snapshot |
//!
//! # Write path
//!
//! 1. Refuse to write a design that fails structural validation.
//! 2. Rotate the current primary bytes into the backup slots and prune.
//! 3. Write the typed document to the primary slot.
//! 4. If that fails, write the minimal document instead.
//!
//! # Read path
//!
//! Sources are tried in order and the first valid one wins: primary, latest
//! backup, timestamped backups newest first, minimal. Each invalid tier is
//! logged and skipped; nothing here ever panics or returns an error to the
//! store. The session emergency slot is read separately by
//! [`Persistence::take_emergency`] because it is consumed on read.

use std::fmt;

use beadloom_core::{
    Design, Inventory, MinimalDocument, Palette, PersistedDocument, RawDocument, validate_design,
    validate_document,
};
use tracing::{debug, error, info, warn};

use crate::storage::StorageBackend;

// ============================================================================
// Slot naming
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slots {
    base: String,
}

impl Slots {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    #[must_use]
    pub fn primary(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn latest_backup(&self) -> String {
        format!("{}.backup.latest", self.base)
    }

    #[must_use]
    pub fn backup(&self, epoch_ms: u64) -> String {
        format!("{}.backup.{epoch_ms}", self.base)
    }

    #[must_use]
    pub fn minimal(&self) -> String {
        format!("{}.minimal", self.base)
    }

    #[must_use]
    pub fn emergency(&self) -> String {
        format!("{}.emergency", self.base)
    }

    /// Timestamp of a timestamped backup key, if `key` is one.
    #[must_use]
    pub fn backup_stamp(&self, key: &str) -> Option<u64> {
        key.strip_prefix(self.base.as_str())?
            .strip_prefix(".backup.")?
            .parse()
            .ok()
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Where startup state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadSource {
    Emergency,
    Primary,
    LatestBackup,
    Backup(u64),
    Minimal,
    Default,
}

impl LoadSource {
    /// Whether the user should be told recent edits may be missing.
    #[must_use]
    pub fn is_recovery(self) -> bool {
        !matches!(self, Self::Primary | Self::Default)
    }
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emergency => f.write_str("emergency session backup"),
            Self::Primary => f.write_str("saved design"),
            Self::LatestBackup => f.write_str("latest backup"),
            Self::Backup(stamp) => write!(f, "backup from {stamp}"),
            Self::Minimal => f.write_str("minimal backup"),
            Self::Default => f.write_str("new design"),
        }
    }
}

/// One-time advisory shown when state was recovered from a fallback tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryNotice {
    pub source: LoadSource,
    pub message: String,
}

impl RecoveryNotice {
    #[must_use]
    pub fn new(source: LoadSource) -> Self {
        let message = match source {
            LoadSource::Minimal => format!(
                "Your design was restored from the {source}. Bead placement was kept; \
                 strand names, lengths and diameters were reset and recent changes may be missing."
            ),
            _ => format!(
                "Your design was restored from the {source}. Recent changes may be missing."
            ),
        };
        Self { source, message }
    }
}

/// State read back from storage. Palette and inventory are `None` when the
/// source did not carry them.
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub design: Design,
    pub palette: Option<Palette>,
    pub inventory: Option<Inventory>,
    pub source: LoadSource,
}

/// Result of a save. Never an error for the caller; logged by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The full document reached the primary slot.
    Saved,
    /// The primary write failed; only the minimal document was written.
    Minimal,
    /// The design failed validation and nothing was written.
    Refused(String),
    /// Every write tier failed.
    Failed(String),
}

impl SaveOutcome {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

// ============================================================================
// Persistence
// ============================================================================

pub struct Persistence {
    durable: Box<dyn StorageBackend>,
    session: Box<dyn StorageBackend>,
    slots: Slots,
    retention: usize,
}

impl fmt::Debug for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistence")
            .field("durable", &self.durable.name())
            .field("session", &self.session.name())
            .field("slots", &self.slots)
            .field("retention", &self.retention)
            .finish()
    }
}

impl Persistence {
    #[must_use]
    pub fn new(
        durable: Box<dyn StorageBackend>,
        session: Box<dyn StorageBackend>,
        slots: Slots,
        retention: usize,
    ) -> Self {
        Self {
            durable,
            session,
            slots,
            retention,
        }
    }

    #[must_use]
    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    // ====================================================================
    // Write path
    // ====================================================================

    pub fn save(
        &self,
        design: &Design,
        palette: &Palette,
        inventory: &Inventory,
        now_ms: u64,
    ) -> SaveOutcome {
        if let Err(reason) = check_design(design) {
            warn!(%reason, "refusing to persist invalid design");
            return SaveOutcome::Refused(reason);
        }

        self.rotate(now_ms);

        let primary = self.slots.primary();
        let written = PersistedDocument::new(design, palette, inventory, now_ms)
            .to_json()
            .map_err(|err| err.to_string())
            .and_then(|json| {
                self.durable
                    .set(primary, &json)
                    .map_err(|err| err.to_string())
            });
        match written {
            Ok(()) => {
                if let Err(err) = self.durable.remove(&self.slots.minimal()) {
                    debug!(%err, "could not clear stale minimal slot");
                }
                debug!(key = primary, "design saved");
                SaveOutcome::Saved
            }
            Err(reason) => {
                warn!(key = primary, %reason, "primary write failed, trying minimal slot");
                self.save_minimal(design, now_ms, reason)
            }
        }
    }

    fn save_minimal(&self, design: &Design, now_ms: u64, primary_reason: String) -> SaveOutcome {
        let key = self.slots.minimal();
        let written = MinimalDocument::from_design(design, now_ms)
            .to_json()
            .map_err(|err| err.to_string())
            .and_then(|json| self.durable.set(&key, &json).map_err(|err| err.to_string()));
        match written {
            Ok(()) => {
                warn!(%key, "saved minimal document only");
                SaveOutcome::Minimal
            }
            Err(reason) => {
                error!(primary = %primary_reason, minimal = %reason, "all write tiers failed");
                SaveOutcome::Failed(format!("{primary_reason}; {reason}"))
            }
        }
    }

    /// Copy the current primary bytes into the backup slots, then prune.
    fn rotate(&self, now_ms: u64) {
        let current = match self.durable.get(self.slots.primary()) {
            Ok(Some(current)) => current,
            Ok(None) => return,
            Err(err) => {
                warn!(%err, "could not read primary slot for rotation");
                return;
            }
        };
        if let Err(reason) = restorable(&current) {
            warn!(%reason, "primary slot unreadable, keeping existing backups");
            return;
        }
        for key in [self.slots.backup(now_ms), self.slots.latest_backup()] {
            if let Err(err) = self.durable.set(&key, &current) {
                warn!(%key, %err, "backup rotation write failed");
            }
        }
        self.prune_backups();
    }

    fn prune_backups(&self) {
        let stamps = self.backup_stamps();
        for stamp in stamps.into_iter().skip(self.retention) {
            let key = self.slots.backup(stamp);
            if let Err(err) = self.durable.remove(&key) {
                warn!(%key, %err, "could not prune backup");
            }
        }
    }

    /// Timestamps of the timestamped backups, newest first.
    #[must_use]
    pub fn backup_stamps(&self) -> Vec<u64> {
        let keys = match self.durable.keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!(%err, "could not list storage keys");
                return Vec::new();
            }
        };
        let mut stamps: Vec<u64> = keys
            .iter()
            .filter_map(|key| self.slots.backup_stamp(key))
            .collect();
        stamps.sort_unstable_by(|a, b| b.cmp(a));
        stamps
    }

    // ====================================================================
    // Read path
    // ====================================================================

    /// Walk the durable tiers and return the first valid state.
    #[must_use]
    pub fn load(&self, now_ms: u64) -> Option<LoadedState> {
        let mut candidates = vec![
            (LoadSource::Primary, self.slots.primary().to_string()),
            (LoadSource::LatestBackup, self.slots.latest_backup()),
        ];
        candidates.extend(
            self.backup_stamps()
                .into_iter()
                .map(|stamp| (LoadSource::Backup(stamp), self.slots.backup(stamp))),
        );

        for (source, key) in candidates {
            let Some(raw) = self.read(self.durable.as_ref(), &key) else {
                continue;
            };
            match RawDocument::parse(&raw) {
                Ok(document) => {
                    if source.is_recovery() {
                        info!(%key, %source, "recovered design from fallback slot");
                    }
                    return Some(loaded(document, source));
                }
                Err(err) => warn!(%key, %err, "skipping unreadable slot"),
            }
        }

        let key = self.slots.minimal();
        let raw = self.read(self.durable.as_ref(), &key)?;
        match MinimalDocument::parse(&raw) {
            Ok(minimal) => {
                info!(%key, "recovered design from minimal slot");
                Some(LoadedState {
                    design: minimal.into_design(now_ms),
                    palette: None,
                    inventory: None,
                    source: LoadSource::Minimal,
                })
            }
            Err(err) => {
                warn!(%key, %err, "skipping unreadable slot");
                None
            }
        }
    }

    fn read(&self, backend: &dyn StorageBackend, key: &str) -> Option<String> {
        match backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(%key, %err, "storage read failed");
                None
            }
        }
    }

    // ====================================================================
    // Emergency slot
    // ====================================================================

    pub fn write_emergency(
        &self,
        design: &Design,
        palette: &Palette,
        inventory: &Inventory,
        now_ms: u64,
    ) -> SaveOutcome {
        if let Err(reason) = check_design(design) {
            warn!(%reason, "refusing to write invalid emergency backup");
            return SaveOutcome::Refused(reason);
        }
        let key = self.slots.emergency();
        let written = PersistedDocument::new(design, palette, inventory, now_ms)
            .to_json()
            .map_err(|err| err.to_string())
            .and_then(|json| self.session.set(&key, &json).map_err(|err| err.to_string()));
        match written {
            Ok(()) => {
                debug!(%key, "emergency backup written");
                SaveOutcome::Saved
            }
            Err(reason) => {
                warn!(%key, %reason, "emergency backup failed");
                SaveOutcome::Failed(reason)
            }
        }
    }

    /// Read and clear the emergency slot. A present slot is always removed,
    /// valid or not, so it is consumed at most once.
    pub fn take_emergency(&self) -> Option<LoadedState> {
        let key = self.slots.emergency();
        let raw = self.read(self.session.as_ref(), &key)?;
        if let Err(err) = self.session.remove(&key) {
            warn!(%key, %err, "could not clear emergency slot");
        }
        match RawDocument::parse(&raw) {
            Ok(document) => {
                info!(%key, "restoring emergency session backup");
                Some(loaded(document, LoadSource::Emergency))
            }
            Err(err) => {
                warn!(%key, %err, "discarding invalid emergency backup");
                None
            }
        }
    }
}

fn loaded(document: RawDocument, source: LoadSource) -> LoadedState {
    let (design, palette, inventory) = document.into_parts();
    LoadedState {
        design,
        palette,
        inventory,
        source,
    }
}

/// Whether stored bytes would load: valid JSON with a valid design.
fn restorable(raw: &str) -> Result<(), String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    validate_document(&value)
}

fn check_design(design: &Design) -> Result<(), String> {
    let value = serde_json::to_value(design).map_err(|err| err.to_string())?;
    validate_design(&value)
}
