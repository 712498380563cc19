#![forbid(unsafe_code)]

//! Beadloom Runtime
//!
//! The stateful half of Beadloom: a [`DesignStore`] that owns the live
//! design, palette and inventory, records undo history, and persists every
//! change through a tiered storage scheme that survives corrupted slots.
//!
//! # Key Components
//!
//! - [`DesignStore`] - Mutation authority; built with [`StoreBuilder`]
//! - [`DesignHistory`] - Bounded snapshot undo/redo with idle-window batching
//! - [`Persistence`] - Primary slot, rotating backups, minimal fallback and
//!   the session emergency slot
//! - [`StorageBackend`] - String key-value storage ([`MemoryStorage`],
//!   [`FileStorage`])
//! - [`Clock`] - Injectable time source ([`SystemClock`], [`ManualClock`])
//! - [`StoreConfig`] - Tunables loadable from TOML or JSON
//!
//! # Example
//!
//! ```
//! use beadloom_runtime::{DesignStore, StoreConfig};
//!
//! let mut store = DesignStore::builder(StoreConfig::default()).open()?;
//! let strand = store.design().strands[0].id.clone();
//! store.set_cell(&strand, 0, Some("red"));
//! assert_eq!(store.stock("red"), 49);
//! store.undo();
//! assert!(!store.design().strands[0].cells[0].is_filled());
//! # Ok::<(), beadloom_runtime::StoreError>(())
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod persistence;
pub mod storage;
pub mod store;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, StoreConfig};
pub use error::StoreError;
pub use events::{EventHub, StoreEvent, Subscription};
pub use history::{DesignHistory, HistoryConfig};
pub use persistence::{LoadSource, LoadedState, Persistence, RecoveryNotice, SaveOutcome, Slots};
pub use storage::{FileStorage, MemoryStorage, StorageBackend, StorageError, StorageResult};
pub use store::{DesignStore, ImportIntent, StoreBuilder};
pub use timer::{IdleTimer, IntervalTimer};
