#![forbid(unsafe_code)]

//! The design store: sole mutation authority for the design, palette and
//! inventory.
//!
//! # Mutation protocol
//!
//! Every design mutation follows the same sequence:
//!
//! ```text
//! guard (bad id / index / no-op)  ──► return false, nothing recorded
//!        │
//!        ▼
//! history: begin_batch | checkpoint   (pre-mutation snapshot)
//!        │
//!        ▼
//! mutate live design, stamp updatedAt
//!        │
//!        ▼
//! persist (never fails the caller) ──► emit events
//! ```
//!
//! Palette and inventory edits skip the history step; only the design is
//! undoable.
//!
//! # Time
//!
//! The store never spawns timers. The host calls [`DesignStore::tick`] from
//! its event loop; that closes lapsed history batches and writes the
//! periodic emergency backup.

use std::collections::HashSet;
use std::fmt;

use beadloom_core::{
    BeadPatch, BeadSpec, BomEntry, DEFAULT_DESIGN_NAME, Design, DesignPayload, IdGenerator,
    Inventory, InventoryItem, Palette, PaletteExport, PatternCode, Strand, StrandTemplate,
    Symmetry, UuidIds, assembly_sequence, bill_of_materials, default_inventory, default_palette,
    fill_range, return_stock, stock_of, strand_name, take_stock,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::events::{EventHub, StoreEvent, Subscription};
use crate::history::DesignHistory;
use crate::persistence::{LoadSource, LoadedState, Persistence, RecoveryNotice, SaveOutcome, Slots};
use crate::storage::{MemoryStorage, StorageBackend};
use crate::timer::IntervalTimer;

/// How [`DesignStore::import_design_as`] treats an incoming design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportIntent {
    /// Same id as the live design means internal sync; otherwise external.
    #[default]
    Infer,
    /// Local UI state flowing back: keep name, stock and history.
    InternalSync,
    /// A different design replacing the live one: fresh timeline.
    External,
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`DesignStore`] and runs the startup load.
pub struct StoreBuilder {
    config: StoreConfig,
    durable: Option<Box<dyn StorageBackend>>,
    session: Option<Box<dyn StorageBackend>>,
    clock: Option<Box<dyn Clock>>,
    ids: Option<Box<dyn IdGenerator>>,
}

impl fmt::Debug for StoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StoreBuilder {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            durable: None,
            session: None,
            clock: None,
            ids: None,
        }
    }

    /// Durable storage. Defaults to a fresh [`MemoryStorage`].
    #[must_use]
    pub fn durable(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.durable = Some(Box::new(backend));
        self
    }

    /// Session-scoped storage for the emergency slot.
    #[must_use]
    pub fn session(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.session = Some(Box::new(backend));
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    #[must_use]
    pub fn ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Box::new(ids));
        self
    }

    /// Validate the config, load state and return the live store.
    ///
    /// Load order: session emergency slot, then the durable tiers, then a
    /// fresh default design. Only configuration errors are returned.
    pub fn open(self) -> Result<DesignStore, StoreError> {
        let config = self.config.validated()?;
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));
        let ids = self.ids.unwrap_or_else(|| Box::new(UuidIds));
        let persistence = Persistence::new(
            self.durable
                .unwrap_or_else(|| Box::new(MemoryStorage::new())),
            self.session
                .unwrap_or_else(|| Box::new(MemoryStorage::new())),
            Slots::new(config.storage_key.clone()),
            config.backup_retention,
        );

        let now_ms = clock.epoch_ms();
        let loaded = persistence
            .take_emergency()
            .or_else(|| persistence.load(now_ms));
        let template = config.strand_template();
        let (design, palette, inventory, source) = match loaded {
            Some(LoadedState {
                design,
                palette,
                inventory,
                source,
            }) => {
                let palette = palette.unwrap_or_else(default_palette);
                let inventory =
                    inventory.unwrap_or_else(|| default_inventory(&palette, config.default_stock));
                let design = normalize_design(design, ids.as_ref(), template, now_ms);
                (design, palette, inventory, source)
            }
            None => {
                debug!("no saved design, starting fresh");
                let palette = default_palette();
                let inventory = default_inventory(&palette, config.default_stock);
                let design = Design::new(DEFAULT_DESIGN_NAME, ids.as_ref(), template, now_ms);
                (design, palette, inventory, LoadSource::Default)
            }
        };

        let rng = match config.pattern_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let emergency = IntervalTimer::new(config.emergency_interval(), clock.now());
        let recovery = source.is_recovery().then(|| RecoveryNotice::new(source));

        let mut store = DesignStore {
            history: DesignHistory::new(config.history()),
            design,
            palette,
            inventory,
            selected_bead: None,
            persistence,
            events: EventHub::new(),
            clock,
            ids,
            rng,
            emergency,
            recovery,
            last_save: None,
            source,
            config,
        };
        if source.is_recovery() {
            warn!(%source, "design recovered from fallback storage");
            store.persist();
        }
        Ok(store)
    }
}

/// Fill the gaps a loaded or imported design may have: an id, at least one
/// strand, and strand names. A strand whose id is blank or repeats an
/// earlier strand's gets a fresh id, so the result always saves.
fn normalize_design(
    mut design: Design,
    ids: &dyn IdGenerator,
    template: StrandTemplate,
    now_ms: u64,
) -> Design {
    if design.id.is_empty() {
        design.id = ids.next_id();
    }
    if design.strands.is_empty() {
        design
            .strands
            .push(Strand::empty(ids.next_id(), strand_name(1), template));
    }
    let mut seen = HashSet::new();
    for (n, strand) in design.strands.iter_mut().enumerate() {
        if strand.id.trim().is_empty() || !seen.insert(strand.id.clone()) {
            let fresh = ids.next_id();
            debug!(old = %strand.id, new = %fresh, "reassigning strand id");
            strand.id = fresh;
            seen.insert(strand.id.clone());
        }
        if strand.name.trim().is_empty() {
            strand.name = strand_name(n + 1);
        }
    }
    if design.updated_at == 0 {
        design.updated_at = now_ms;
    }
    design
}

// ============================================================================
// Store
// ============================================================================

pub struct DesignStore {
    design: Design,
    palette: Palette,
    inventory: Inventory,
    selected_bead: Option<String>,
    history: DesignHistory,
    persistence: Persistence,
    events: EventHub,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    rng: SmallRng,
    emergency: IntervalTimer,
    recovery: Option<RecoveryNotice>,
    last_save: Option<SaveOutcome>,
    source: LoadSource,
    config: StoreConfig,
}

impl fmt::Debug for DesignStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesignStore")
            .field("design_id", &self.design.id)
            .field("strands", &self.design.strands.len())
            .field("palette", &self.palette.len())
            .field("history", &self.history)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl DesignStore {
    #[must_use]
    pub fn builder(config: StoreConfig) -> StoreBuilder {
        StoreBuilder::new(config)
    }

    // ====================================================================
    // Read access
    // ====================================================================

    #[must_use]
    pub fn design(&self) -> &Design {
        &self.design
    }

    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    #[must_use]
    pub fn stock(&self, bead_id: &str) -> u32 {
        stock_of(&self.inventory, bead_id)
    }

    #[must_use]
    pub fn selected_bead(&self) -> Option<&str> {
        self.selected_bead.as_deref()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.history.is_batching()
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Where the startup state was loaded from.
    #[must_use]
    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    /// Outcome of the most recent durable write, if any happened.
    #[must_use]
    pub fn last_save(&self) -> Option<&SaveOutcome> {
        self.last_save.as_ref()
    }

    /// The startup recovery advisory. Returns it once, then `None`.
    pub fn take_recovery_notice(&mut self) -> Option<RecoveryNotice> {
        self.recovery.take()
    }

    /// Register an observer. A pending recovery is replayed to the new
    /// observer as [`StoreEvent::Recovered`].
    pub fn subscribe(&self, callback: impl Fn(&StoreEvent) + 'static) -> Subscription {
        let pending = self.recovery.as_ref().map(|notice| notice.source);
        if let Some(source) = pending {
            callback(&StoreEvent::Recovered(source));
        }
        self.events.subscribe(callback)
    }

    // ====================================================================
    // Cells and patterns
    // ====================================================================

    /// Place (`Some`) or clear (`None`) one cell.
    ///
    /// Only the addressed cell moves stock. Under mirror-center symmetry the
    /// mirrored partner takes the same value without a second adjustment.
    /// Returns true when the design changed.
    pub fn set_cell(&mut self, strand_id: &str, index: usize, bead_id: Option<&str>) -> bool {
        let Some(strand) = self.design.strand(strand_id) else {
            warn!(%strand_id, index, "set_cell on unknown strand");
            return false;
        };
        let Some(cell) = strand.cells.get(index) else {
            warn!(%strand_id, index, len = strand.len(), "set_cell index out of range");
            return false;
        };
        if cell.bead_id.as_deref() == bead_id {
            debug!(%strand_id, index, "set_cell unchanged");
            return false;
        }
        let previous = cell.bead_id.clone();
        let mirror = match self.design.symmetry {
            Symmetry::MirrorCenter => strand.mirror_index(index).filter(|&m| m != index),
            Symmetry::None => None,
        };

        self.history.begin_batch(&self.design, self.clock.now());

        if let Some(placed) = bead_id {
            if self.tracks_stock(placed) {
                take_stock(&mut self.inventory, placed, 1);
            }
        }
        if let Some(removed) = previous.as_deref() {
            if self.tracks_stock(removed) {
                return_stock(&mut self.inventory, removed, 1);
            }
        }

        let value = bead_id.map(str::to_string);
        if let Some(strand) = self.design.strand_mut(strand_id) {
            if let Some(m) = mirror {
                strand.cells[m].bead_id.clone_from(&value);
            }
            strand.cells[index].bead_id = value;
        }
        debug!(%strand_id, index, ?bead_id, ?mirror, "cell set");
        self.commit_design();
        self.emit(StoreEvent::InventoryChanged);
        true
    }

    /// Fill `start..=end` of a strand with a pattern code (`ABAB`, `AABB`,
    /// `RANDOM`).
    ///
    /// An unknown code on an existing strand still records an undo step and
    /// clears redo, leaving the cells untouched. Unknown strands, empty
    /// palettes and empty ranges change nothing and record no history.
    pub fn apply_pattern(&mut self, strand_id: &str, start: usize, end: usize, code: &str) -> bool {
        let Some(pattern) = PatternCode::parse(code) else {
            debug!(code, "ignoring unknown pattern code");
            if !self.palette.is_empty() && self.design.strand(strand_id).is_some() {
                self.history.checkpoint(&self.design);
                self.emit_history();
            }
            return false;
        };
        self.fill(strand_id, start, end, pattern)
    }

    /// Fill an entire strand with random palette beads.
    pub fn fill_random(&mut self, strand_id: &str) -> bool {
        let Some(len) = self.design.strand(strand_id).map(Strand::len) else {
            warn!(%strand_id, "fill_random on unknown strand");
            return false;
        };
        self.fill(strand_id, 0, len.saturating_sub(1), PatternCode::Random)
    }

    fn fill(&mut self, strand_id: &str, start: usize, end: usize, pattern: PatternCode) -> bool {
        if self.palette.is_empty() {
            debug!("pattern ignored: palette is empty");
            return false;
        }
        let Some(strand) = self.design.strand(strand_id) else {
            warn!(%strand_id, "pattern on unknown strand");
            return false;
        };
        if start >= strand.len() || start > end {
            warn!(%strand_id, start, end, len = strand.len(), "pattern range out of bounds");
            return false;
        }

        self.history.checkpoint(&self.design);
        let colors: Vec<String> = self.palette.keys().cloned().collect();
        let written = match self.design.strand_mut(strand_id) {
            Some(strand) => fill_range(&mut strand.cells, start, end, pattern, &colors, &mut self.rng),
            None => 0,
        };
        debug!(%strand_id, pattern = pattern.code(), written, "pattern applied");
        self.commit_design();
        true
    }

    /// Empty every cell of one strand, or of all strands when `strand_id`
    /// is `None`. Stock is not returned.
    pub fn clear_all_beads(&mut self, strand_id: Option<&str>) -> bool {
        if let Some(id) = strand_id {
            if self.design.strand(id).is_none() {
                warn!(strand_id = %id, "clear on unknown strand");
                return false;
            }
        }
        self.history.checkpoint(&self.design);
        for strand in &mut self.design.strands {
            if strand_id.is_none_or(|id| strand.id == id) {
                strand.clear();
            }
        }
        debug!(?strand_id, "beads cleared");
        self.commit_design();
        true
    }

    // ====================================================================
    // History
    // ====================================================================

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(&self.design) else {
            debug!("nothing to undo");
            return false;
        };
        self.design = previous;
        self.persist();
        self.emit(StoreEvent::DesignChanged);
        self.emit_history();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(&self.design) else {
            debug!("nothing to redo");
            return false;
        };
        self.design = next;
        self.persist();
        self.emit(StoreEvent::DesignChanged);
        self.emit_history();
        true
    }

    /// Snapshot the live design unless a batch is already open, then
    /// restart the idle window.
    pub fn begin_history_batch(&mut self) {
        if self.history.begin_batch(&self.design, self.clock.now()) {
            self.emit_history();
        }
    }

    pub fn end_history_batch(&mut self) {
        self.history.end_batch();
    }

    /// Unconditional snapshot. Closes any open batch.
    pub fn save_to_history(&mut self) {
        self.history.checkpoint(&self.design);
        self.emit_history();
    }

    // ====================================================================
    // Design structure
    // ====================================================================

    /// Replace the live design with a fresh one and drop all history.
    pub fn create_new_design(&mut self, name: &str) {
        let name = match name.trim() {
            "" => DEFAULT_DESIGN_NAME,
            trimmed => trimmed,
        };
        self.design = Design::new(
            name,
            self.ids.as_ref(),
            self.config.strand_template(),
            self.clock.epoch_ms(),
        );
        self.history.clear();
        info!(design_id = %self.design.id, name, "new design");
        self.persist();
        self.emit(StoreEvent::DesignChanged);
        self.emit_history();
    }

    /// Append a default strand. Returns its id.
    pub fn add_strand(&mut self) -> String {
        self.history.begin_batch(&self.design, self.clock.now());
        let id = self.ids.next_id();
        let name = strand_name(self.design.strands.len() + 1);
        self.design
            .strands
            .push(Strand::empty(id.clone(), name, self.config.strand_template()));
        debug!(strand_id = %id, "strand added");
        self.commit_design();
        id
    }

    /// Remove a strand. Refused when it is the only one.
    pub fn remove_strand(&mut self, strand_id: &str) -> bool {
        let Some(position) = self.strand_position(strand_id) else {
            warn!(%strand_id, "remove on unknown strand");
            return false;
        };
        if self.design.strands.len() <= 1 {
            warn!(%strand_id, "refusing to remove the last strand");
            return false;
        }
        self.history.begin_batch(&self.design, self.clock.now());
        self.design.strands.remove(position);
        debug!(%strand_id, "strand removed");
        self.commit_design();
        true
    }

    /// Remove a strand; removing the last one swaps in a default strand.
    pub fn remove_strand_or_reset(&mut self, strand_id: &str) -> bool {
        if self.design.strands.len() > 1 {
            return self.remove_strand(strand_id);
        }
        if self.strand_position(strand_id).is_none() {
            warn!(%strand_id, "remove on unknown strand");
            return false;
        }
        self.history.begin_batch(&self.design, self.clock.now());
        self.design.strands = vec![Strand::empty(
            self.ids.next_id(),
            strand_name(1),
            self.config.strand_template(),
        )];
        debug!(%strand_id, "last strand reset");
        self.commit_design();
        true
    }

    /// Change the editing constraint. Existing cells are not re-mirrored.
    pub fn set_symmetry(&mut self, symmetry: Symmetry) -> bool {
        if self.design.symmetry == symmetry {
            return false;
        }
        self.history.begin_batch(&self.design, self.clock.now());
        self.design.symmetry = symmetry;
        debug!(?symmetry, "symmetry set");
        self.commit_design();
        true
    }

    /// Set a strand's physical length. The cell count is left alone.
    pub fn update_strand_length(&mut self, strand_id: &str, length_cm: f64) -> bool {
        self.update_strand(strand_id, "length_cm", length_cm, |strand| {
            &mut strand.length_cm
        })
    }

    /// Set a strand's nominal bead diameter. The cell count is left alone.
    pub fn update_strand_diameter(&mut self, strand_id: &str, diameter_mm: f64) -> bool {
        self.update_strand(strand_id, "diameter_mm", diameter_mm, |strand| {
            &mut strand.diameter_mm
        })
    }

    fn update_strand(
        &mut self,
        strand_id: &str,
        field: &'static str,
        value: f64,
        slot: impl Fn(&mut Strand) -> &mut f64,
    ) -> bool {
        if !(value.is_finite() && value > 0.0) {
            warn!(%strand_id, field, value, "rejecting non-positive strand measurement");
            return false;
        }
        let Some(position) = self.strand_position(strand_id) else {
            warn!(%strand_id, field, "update on unknown strand");
            return false;
        };
        if *slot(&mut self.design.strands[position]) == value {
            return false;
        }
        self.history.begin_batch(&self.design, self.clock.now());
        *slot(&mut self.design.strands[position]) = value;
        debug!(%strand_id, field, value, "strand updated");
        self.commit_design();
        true
    }

    fn strand_position(&self, strand_id: &str) -> Option<usize> {
        self.design
            .strands
            .iter()
            .position(|strand| strand.id == strand_id)
    }

    // ====================================================================
    // Palette and inventory
    // ====================================================================

    /// Add or replace a palette entry. A new bead gets the default stock;
    /// an existing inventory record is kept.
    pub fn add_bead(&mut self, bead: BeadSpec) -> Result<(), StoreError> {
        bead.validate()?;
        let id = bead.id.clone();
        if !self.inventory.contains_key(&id) {
            self.inventory.insert(
                id.clone(),
                InventoryItem::new(id.clone(), self.config.default_stock),
            );
        }
        self.palette.insert(id.clone(), bead);
        debug!(bead_id = %id, "bead added");
        self.persist();
        self.emit(StoreEvent::PaletteChanged);
        self.emit(StoreEvent::InventoryChanged);
        Ok(())
    }

    /// Remove a bead and its inventory record. Cells that reference it are
    /// left in place and render as unknown.
    pub fn remove_bead(&mut self, bead_id: &str) -> bool {
        let removed = self.palette.shift_remove(bead_id).is_some();
        let had_stock = self.inventory.shift_remove(bead_id).is_some();
        if !removed && !had_stock {
            debug!(%bead_id, "remove on unknown bead");
            return false;
        }
        let deselected = self.selected_bead.as_deref() == Some(bead_id);
        if deselected {
            self.selected_bead = None;
        }
        debug!(%bead_id, "bead removed");
        self.persist();
        self.emit(StoreEvent::PaletteChanged);
        self.emit(StoreEvent::InventoryChanged);
        if deselected {
            self.emit(StoreEvent::SelectionChanged);
        }
        true
    }

    /// Apply a partial update. Unknown ids are ignored.
    pub fn update_bead(&mut self, bead_id: &str, patch: BeadPatch) -> Result<(), StoreError> {
        let Some(current) = self.palette.get(bead_id) else {
            debug!(%bead_id, "update on unknown bead");
            return Ok(());
        };
        let mut updated = current.clone();
        updated.apply(patch);
        updated.validate()?;
        if self.palette.get(bead_id) == Some(&updated) {
            return Ok(());
        }
        self.palette.insert(bead_id.to_string(), updated);
        debug!(%bead_id, "bead updated");
        self.persist();
        self.emit(StoreEvent::PaletteChanged);
        Ok(())
    }

    /// Set the current brush. The selection lives only as long as this
    /// store; it is not part of the saved document.
    pub fn set_selected_bead(&mut self, bead_id: Option<&str>) {
        if self.selected_bead.as_deref() == bead_id {
            return;
        }
        self.selected_bead = bead_id.map(str::to_string);
        self.persist();
        self.emit(StoreEvent::SelectionChanged);
    }

    /// Set an absolute stock level.
    pub fn update_inventory(&mut self, bead_id: &str, stock: u32) {
        self.inventory
            .insert(bead_id.to_string(), InventoryItem::new(bead_id, stock));
        debug!(%bead_id, stock, "inventory set");
        self.persist();
        self.emit(StoreEvent::InventoryChanged);
    }

    /// Remove stock, clamping at zero. Returns the new level.
    pub fn decrement_stock(&mut self, bead_id: &str, amount: u32) -> u32 {
        let stock = take_stock(&mut self.inventory, bead_id, amount);
        self.persist();
        self.emit(StoreEvent::InventoryChanged);
        stock
    }

    pub fn increment_stock(&mut self, bead_id: &str, amount: u32) -> u32 {
        let stock = return_stock(&mut self.inventory, bead_id, amount);
        self.persist();
        self.emit(StoreEvent::InventoryChanged);
        stock
    }

    fn tracks_stock(&self, bead_id: &str) -> bool {
        self.palette.contains_key(bead_id) || self.inventory.contains_key(bead_id)
    }

    // ====================================================================
    // Import
    // ====================================================================

    /// Upsert beads and stock. Without an inventory, beads that have no
    /// record get the default stock; existing records are untouched.
    pub fn import_palette(
        &mut self,
        beads: Vec<BeadSpec>,
        inventory: Option<Vec<InventoryItem>>,
    ) -> Result<(), StoreError> {
        for bead in &beads {
            bead.validate()?;
        }
        match inventory {
            Some(items) => {
                for item in items {
                    self.inventory.insert(item.bead_id.clone(), item);
                }
            }
            None => {
                for bead in &beads {
                    if !self.inventory.contains_key(&bead.id) {
                        self.inventory.insert(
                            bead.id.clone(),
                            InventoryItem::new(bead.id.clone(), self.config.default_stock),
                        );
                    }
                }
            }
        }
        let count = beads.len();
        for bead in beads {
            self.palette.insert(bead.id.clone(), bead);
        }
        debug!(count, "palette imported");
        self.persist();
        self.emit(StoreEvent::PaletteChanged);
        self.emit(StoreEvent::InventoryChanged);
        Ok(())
    }

    /// Apply a payload, inferring intent from the design id.
    pub fn import_design(&mut self, payload: DesignPayload) -> Result<(), StoreError> {
        self.import_design_as(payload, ImportIntent::Infer)
    }

    /// Apply a payload.
    ///
    /// Internal sync keeps the live name, existing stock and history, and
    /// opens a history batch. External import takes the incoming name and
    /// clears history. Beads are upserted either way.
    pub fn import_design_as(
        &mut self,
        payload: DesignPayload,
        intent: ImportIntent,
    ) -> Result<(), StoreError> {
        for bead in &payload.palette {
            bead.validate()?;
        }
        let DesignPayload {
            design,
            palette,
            inventory,
        } = payload;
        let now_ms = self.clock.epoch_ms();
        let internal = match intent {
            ImportIntent::Infer => design.id == self.design.id,
            ImportIntent::InternalSync => true,
            ImportIntent::External => false,
        };

        let mut design = normalize_design(
            design,
            self.ids.as_ref(),
            self.config.strand_template(),
            now_ms,
        );
        if internal {
            self.history.begin_batch(&self.design, self.clock.now());
            design.id.clone_from(&self.design.id);
            design.name.clone_from(&self.design.name);
        } else {
            self.history.clear();
        }
        design.updated_at = now_ms;

        let incoming: Vec<InventoryItem> = match inventory {
            Some(items) => items,
            None => palette
                .iter()
                .map(|bead| InventoryItem::new(bead.id.clone(), self.config.default_stock))
                .collect(),
        };
        for item in incoming {
            let stock = match self.inventory.get(&item.bead_id) {
                Some(existing) if internal => existing.stock,
                _ => item.stock,
            };
            self.inventory
                .insert(item.bead_id.clone(), InventoryItem::new(item.bead_id, stock));
        }
        for bead in palette {
            self.palette.insert(bead.id.clone(), bead);
        }

        info!(design_id = %design.id, internal, "design imported");
        self.design = design;
        self.persist();
        self.emit(StoreEvent::DesignChanged);
        self.emit(StoreEvent::PaletteChanged);
        self.emit(StoreEvent::InventoryChanged);
        self.emit_history();
        Ok(())
    }

    /// Validate and import a JSON payload as an external design.
    pub fn import_payload_json(&mut self, json: &str) -> Result<(), StoreError> {
        let payload = DesignPayload::from_json(json)?;
        self.import_design_as(payload, ImportIntent::External)
    }

    /// Decode and import a share code as an external design.
    pub fn import_share_code(&mut self, code: &str) -> Result<(), StoreError> {
        let payload = DesignPayload::from_share_code(code)?;
        self.import_design_as(payload, ImportIntent::External)
    }

    // ====================================================================
    // Export
    // ====================================================================

    #[must_use]
    pub fn export_design_data(&self) -> DesignPayload {
        DesignPayload::from_parts(&self.design, &self.palette, &self.inventory)
    }

    #[must_use]
    pub fn export_palette(&self) -> PaletteExport {
        PaletteExport::from_maps(&self.palette, &self.inventory)
    }

    #[must_use]
    pub fn export_sequence(&self) -> String {
        assembly_sequence(&self.design, &self.palette)
    }

    #[must_use]
    pub fn export_bom(&self) -> Vec<BomEntry> {
        bill_of_materials(&self.design, &self.palette)
    }

    pub fn share_code(&self) -> Result<String, StoreError> {
        Ok(self.export_design_data().to_share_code()?)
    }

    // ====================================================================
    // Host lifecycle
    // ====================================================================

    /// Advance time-driven work: close a lapsed history batch and write the
    /// emergency backup when its interval has elapsed.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if self.history.poll(now) {
            debug!("history batch closed by idle timeout");
        }
        if self.emergency.poll(now) {
            self.write_emergency();
        }
    }

    /// Close any batch and leave a final emergency backup.
    pub fn shutdown(&mut self) {
        self.history.end_batch();
        self.write_emergency();
        debug!("store shut down");
    }

    fn write_emergency(&self) -> SaveOutcome {
        self.persistence.write_emergency(
            &self.design,
            &self.palette,
            &self.inventory,
            self.clock.epoch_ms(),
        )
    }

    // ====================================================================
    // Internals
    // ====================================================================

    fn commit_design(&mut self) {
        self.design.updated_at = self.clock.epoch_ms();
        self.persist();
        self.emit(StoreEvent::DesignChanged);
        self.emit_history();
    }

    fn persist(&mut self) {
        let outcome = self.persistence.save(
            &self.design,
            &self.palette,
            &self.inventory,
            self.clock.epoch_ms(),
        );
        self.last_save = Some(outcome);
    }

    fn emit(&self, event: StoreEvent) {
        self.events.emit(&event);
    }

    fn emit_history(&self) {
        self.emit(StoreEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }
}
