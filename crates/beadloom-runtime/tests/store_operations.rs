#![forbid(unsafe_code)]

//! Behavioural tests for [`DesignStore`] operations.
//!
//! Every store here runs on a [`ManualClock`], sequential ids and shared
//! [`MemoryStorage`] handles, so time, ids and written slots are all
//! observable from the test.

use std::cell::RefCell;
use std::rc::Rc;

use beadloom_core::{
    BeadPatch, BeadShape, BeadSpec, Cell, DesignPayload, InventoryItem, SequentialIds, Symmetry,
};
use beadloom_runtime::{
    DesignStore, ImportIntent, ManualClock, MemoryStorage, SaveOutcome, StorageBackend,
    StoreConfig, StoreError, StoreEvent,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    store: DesignStore,
    clock: ManualClock,
    durable: MemoryStorage,
    session: MemoryStorage,
}

fn harness_with(config: StoreConfig) -> Harness {
    let clock = ManualClock::default();
    let durable = MemoryStorage::new();
    let session = MemoryStorage::new();
    let store = DesignStore::builder(config)
        .durable(durable.clone())
        .session(session.clone())
        .clock(clock.clone())
        .ids(SequentialIds::new("id"))
        .open()
        .unwrap();
    Harness {
        store,
        clock,
        durable,
        session,
    }
}

fn harness() -> Harness {
    harness_with(StoreConfig {
        pattern_seed: Some(7),
        ..StoreConfig::default()
    })
}

fn first_strand(store: &DesignStore) -> String {
    store.design().strands[0].id.clone()
}

fn cell(store: &DesignStore, strand: usize, index: usize) -> Option<&str> {
    store.design().strands[strand].cells[index].bead_id.as_deref()
}

// ============================================================================
// Startup
// ============================================================================

#[test]
fn fresh_store_has_default_design_and_palette() {
    let h = harness();
    let design = h.store.design();
    assert_eq!(design.id, "id-1");
    assert_eq!(design.name, "New Design");
    assert_eq!(design.strands.len(), 1);
    assert_eq!(design.strands[0].len(), 30);
    assert_eq!(h.store.palette().len(), 10);
    assert_eq!(h.store.stock("red"), 50);
    assert!(!h.store.can_undo());
    assert!(h.durable.is_empty(), "first run writes nothing");
}

#[test]
fn invalid_config_is_rejected() {
    let err = DesignStore::builder(StoreConfig {
        history_depth: 0,
        ..StoreConfig::default()
    })
    .open()
    .unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));
}

// ============================================================================
// set_cell
// ============================================================================

#[test]
fn placing_replacing_and_clearing_move_stock() {
    let mut h = harness();
    let strand = first_strand(&h.store);

    assert!(h.store.set_cell(&strand, 3, Some("red")));
    assert_eq!(h.store.stock("red"), 49);

    assert!(h.store.set_cell(&strand, 3, Some("blue")));
    assert_eq!(h.store.stock("red"), 50);
    assert_eq!(h.store.stock("blue"), 49);

    assert!(h.store.set_cell(&strand, 3, None));
    assert_eq!(h.store.stock("blue"), 50);
    assert_eq!(cell(&h.store, 0, 3), None);
}

#[test]
fn unchanged_cell_records_and_writes_nothing() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    assert!(!h.store.set_cell(&strand, 0, None));
    assert!(!h.store.can_undo());
    assert!(h.durable.is_empty());
    assert!(h.store.last_save().is_none());
}

#[test]
fn bad_strand_or_index_is_a_noop() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    let before = h.store.design().clone();
    assert!(!h.store.set_cell("nope", 0, Some("red")));
    assert!(!h.store.set_cell(&strand, 30, Some("red")));
    assert_eq!(h.store.design(), &before);
    assert_eq!(h.store.stock("red"), 50);
}

#[test]
fn every_effective_edit_is_persisted() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.clock.advance_ms(5);
    h.store.set_cell(&strand, 1, Some("teal"));
    assert!(h.store.last_save().unwrap().is_saved());
    let saved = h.durable.get("bead-design-app-state").unwrap().unwrap();
    assert!(saved.contains("\"teal\""));
    assert_eq!(h.store.design().updated_at, 1_700_000_000_005);
}

#[test]
fn mirror_center_copies_to_partner_with_single_stock_unit() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_symmetry(Symmetry::MirrorCenter);
    h.store.set_cell(&strand, 0, Some("pink"));
    assert_eq!(cell(&h.store, 0, 0), Some("pink"));
    assert_eq!(cell(&h.store, 0, 29), Some("pink"));
    assert_eq!(h.store.stock("pink"), 49);
}

#[test]
fn mirror_center_on_odd_strand_center_changes_one_cell() {
    let mut h = harness_with(StoreConfig {
        default_cell_count: 5,
        ..StoreConfig::default()
    });
    let strand = first_strand(&h.store);
    h.store.set_symmetry(Symmetry::MirrorCenter);
    h.store.set_cell(&strand, 2, Some("red"));
    let filled: Vec<_> = h.store.design().strands[0]
        .cells
        .iter()
        .map(Cell::is_filled)
        .collect();
    assert_eq!(filled, vec![false, false, true, false, false]);
}

#[test]
fn symmetry_change_does_not_remirror_existing_cells() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 0, Some("red"));
    h.store.set_symmetry(Symmetry::MirrorCenter);
    assert_eq!(cell(&h.store, 0, 29), None);
}

// ============================================================================
// History
// ============================================================================

#[test]
fn rapid_edits_collapse_into_one_undo_step() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    let before = h.store.design().clone();
    for i in 0..10 {
        h.clock.advance_ms(50);
        h.store.set_cell(&strand, i, Some("green"));
    }
    assert_eq!(h.store.undo_depth(), 1);
    assert!(h.store.undo());
    assert_eq!(h.store.design(), &before);
}

#[test]
fn spaced_edits_each_get_an_undo_step() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    for i in 0..10 {
        h.clock.advance_ms(700);
        h.store.set_cell(&strand, i, Some("green"));
    }
    assert_eq!(h.store.undo_depth(), 10);
}

#[test]
fn tick_closes_a_lapsed_batch() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 0, Some("red"));
    assert!(h.store.is_batching());
    h.clock.advance_ms(599);
    h.store.tick();
    assert!(h.store.is_batching());
    h.clock.advance_ms(1);
    h.store.tick();
    assert!(!h.store.is_batching());
}

#[test]
fn explicit_batch_groups_structural_edits() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.begin_history_batch();
    h.store.update_strand_length(&strand, 20.0);
    h.store.update_strand_length(&strand, 21.0);
    h.store.update_strand_diameter(&strand, 4.0);
    h.store.end_history_batch();
    assert_eq!(h.store.undo_depth(), 1);
    h.store.update_strand_length(&strand, 22.0);
    assert_eq!(h.store.undo_depth(), 2);
}

#[test]
fn undo_redo_restore_exact_designs() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    let initial = h.store.design().clone();
    h.store.set_cell(&strand, 0, Some("red"));
    h.clock.advance_ms(1_000);
    h.store.apply_pattern(&strand, 4, 7, "AABB");
    let last = h.store.design().clone();

    assert!(h.store.undo());
    assert!(h.store.undo());
    assert!(!h.store.undo());
    assert_eq!(h.store.design(), &initial);

    assert!(h.store.redo());
    assert!(h.store.redo());
    assert!(!h.store.redo());
    assert_eq!(h.store.design(), &last);
}

#[test]
fn new_edit_after_undo_invalidates_redo() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 0, Some("red"));
    h.store.undo();
    assert!(h.store.can_redo());
    h.store.set_cell(&strand, 1, Some("blue"));
    assert!(!h.store.can_redo());
    assert!(!h.store.redo());
}

#[test]
fn history_depth_is_capped() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    for i in 0..25 {
        h.store.apply_pattern(&strand, i, i, "ABAB");
    }
    assert_eq!(h.store.undo_depth(), 20);
}

#[test]
fn save_to_history_is_unconditional() {
    let mut h = harness();
    h.store.save_to_history();
    h.store.save_to_history();
    assert_eq!(h.store.undo_depth(), 2);
}

// ============================================================================
// Patterns
// ============================================================================

#[test]
fn alternating_patterns_follow_palette_order() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.apply_pattern(&strand, 0, 5, "ABAB");
    let ids: Vec<_> = (0..6).map(|i| cell(&h.store, 0, i)).collect();
    let (x, y) = (Some("red"), Some("blue"));
    assert_eq!(ids, vec![x, y, x, y, x, y]);

    h.store.apply_pattern(&strand, 0, 5, "AABB");
    let ids: Vec<_> = (0..6).map(|i| cell(&h.store, 0, i)).collect();
    assert_eq!(ids, vec![x, x, y, y, x, x]);
}

#[test]
fn patterns_snapshot_every_time_and_leave_stock() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.apply_pattern(&strand, 0, 3, "ABAB");
    h.store.apply_pattern(&strand, 0, 3, "ABAB");
    assert_eq!(h.store.undo_depth(), 2);
    assert_eq!(h.store.stock("red"), 50);
}

#[test]
fn unknown_pattern_code_checkpoints_without_filling() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.apply_pattern(&strand, 0, 1, "ABAB");
    h.store.undo();
    assert!(h.store.can_redo());
    let before = h.store.design().clone();

    assert!(!h.store.apply_pattern(&strand, 0, 3, "ZIGZAG"));
    assert_eq!(h.store.design(), &before);
    assert_eq!(h.store.undo_depth(), 1);
    assert!(!h.store.can_redo());

    assert!(!h.store.apply_pattern("no-such-strand", 0, 3, "ZIGZAG"));
    assert_eq!(h.store.undo_depth(), 1);
}

#[test]
fn bad_range_or_empty_palette_changes_nothing() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    assert!(!h.store.apply_pattern(&strand, 40, 50, "ABAB"));
    let ids: Vec<String> = h.store.palette().keys().cloned().collect();
    for id in ids {
        h.store.remove_bead(&id);
    }
    assert!(!h.store.apply_pattern(&strand, 0, 3, "RANDOM"));
    assert!(!h.store.apply_pattern(&strand, 0, 3, "ZIGZAG"));
    assert!(!h.store.fill_random(&strand));
    assert!(!h.store.can_undo());
}

#[test]
fn seeded_random_fill_covers_strand_with_palette_beads() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    assert!(h.store.fill_random(&strand));
    let palette = h.store.palette();
    assert!(
        h.store.design().strands[0]
            .cells
            .iter()
            .all(|c| c.bead_id.as_deref().is_some_and(|id| palette.contains_key(id)))
    );
}

#[test]
fn clear_all_beads_empties_one_or_every_strand() {
    let mut h = harness();
    let first = first_strand(&h.store);
    let second = h.store.add_strand();
    h.store.apply_pattern(&first, 0, 29, "ABAB");
    h.store.apply_pattern(&second, 0, 29, "ABAB");

    h.store.clear_all_beads(Some(&second));
    assert_eq!(h.store.design().strands[1].filled_count(), 0);
    assert_eq!(h.store.design().strands[0].filled_count(), 30);

    h.store.clear_all_beads(None);
    assert_eq!(h.store.design().placements().count(), 0);
    assert!(!h.store.clear_all_beads(Some("nope")));
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn create_new_design_drops_history() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 0, Some("red"));
    h.store.create_new_design("Choker");
    assert_eq!(h.store.design().name, "Choker");
    assert_eq!(h.store.design().strands[0].filled_count(), 0);
    assert!(!h.store.can_undo());
    assert!(!h.store.can_redo());
}

#[test]
fn strands_never_drop_below_one() {
    let mut h = harness();
    let first = first_strand(&h.store);
    assert!(!h.store.remove_strand(&first));
    assert_eq!(h.store.design().strands.len(), 1);

    let second = h.store.add_strand();
    assert_eq!(h.store.design().strands[1].name, "Strand 2");
    assert!(h.store.remove_strand(&first));
    assert_eq!(h.store.design().strands.len(), 1);
    assert_eq!(first_strand(&h.store), second);
}

#[test]
fn remove_or_reset_substitutes_a_default_strand() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 0, Some("red"));
    assert!(h.store.remove_strand_or_reset(&strand));
    let design = h.store.design();
    assert_eq!(design.strands.len(), 1);
    assert_ne!(design.strands[0].id, strand);
    assert_eq!(design.strands[0].filled_count(), 0);
    assert_eq!(design.strands[0].len(), 30);
}

#[test]
fn measurements_do_not_resize_cells() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    assert!(h.store.update_strand_length(&strand, 40.0));
    assert!(h.store.update_strand_diameter(&strand, 3.0));
    let s = &h.store.design().strands[0];
    assert_eq!(s.len(), 30);
    assert_eq!(s.recommended_cell_count(), 134);
    assert!(!h.store.update_strand_length(&strand, 0.0));
    assert!(!h.store.update_strand_diameter(&strand, f64::NAN));
    assert!(!h.store.update_strand_length("nope", 10.0));
}

// ============================================================================
// Palette and inventory
// ============================================================================

#[test]
fn bead_lifecycle_and_selection() {
    let mut h = harness();
    let bead = BeadSpec::new("gold", "Gold", "#d4af37")
        .with_mm(4)
        .with_shape(BeadShape::Bicone);
    h.store.add_bead(bead).unwrap();
    assert_eq!(h.store.stock("gold"), 50);
    assert_eq!(h.store.palette().keys().last().map(String::as_str), Some("gold"));

    h.store
        .update_bead(
            "gold",
            BeadPatch {
                name: Some("Old Gold".into()),
                ..BeadPatch::default()
            },
        )
        .unwrap();
    assert_eq!(h.store.palette()["gold"].name, "Old Gold");

    h.store.set_selected_bead(Some("gold"));
    assert!(h.store.remove_bead("gold"));
    assert_eq!(h.store.selected_bead(), None);
    assert_eq!(h.store.stock("gold"), 0);
    assert!(!h.store.inventory().contains_key("gold"));
    assert!(!h.store.can_undo(), "palette edits are not undoable");
}

#[test]
fn invalid_beads_are_rejected_unchanged() {
    let mut h = harness();
    let err = h
        .store
        .add_bead(BeadSpec::new("bad", "Bad", "red"))
        .unwrap_err();
    assert!(matches!(err, StoreError::Model(_)));
    assert!(!h.store.palette().contains_key("bad"));

    let err = h
        .store
        .update_bead(
            "red",
            BeadPatch {
                mm: Some(0),
                ..BeadPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Model(_)));
    assert_eq!(h.store.palette()["red"].mm, 6);
    assert!(h.store.update_bead("ghost", BeadPatch::default()).is_ok());
}

#[test]
fn stock_edits_clamp_at_zero() {
    let mut h = harness();
    assert_eq!(h.store.decrement_stock("red", 80), 0);
    assert_eq!(h.store.increment_stock("red", 3), 3);
    h.store.update_inventory("ghost", 9);
    assert_eq!(h.store.stock("ghost"), 9);
    assert_eq!(h.store.stock("never-seen"), 0);
}

#[test]
fn palette_import_upserts_without_resetting_existing_stock() {
    let mut h = harness();
    h.store.decrement_stock("red", 10);
    let beads = vec![
        BeadSpec::new("red", "Scarlet", "#ff2400"),
        BeadSpec::new("jade", "Jade", "#00a86b"),
    ];
    h.store.import_palette(beads, None).unwrap();
    assert_eq!(h.store.palette()["red"].name, "Scarlet");
    assert_eq!(h.store.stock("red"), 40);
    assert_eq!(h.store.stock("jade"), 50);

    h.store
        .import_palette(vec![], Some(vec![InventoryItem::new("red", 7)]))
        .unwrap();
    assert_eq!(h.store.stock("red"), 7);
}

// ============================================================================
// Import / export
// ============================================================================

#[test]
fn self_import_is_content_equal() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 2, Some("white"));
    h.store.set_symmetry(Symmetry::MirrorCenter);
    let before = h.store.design().clone();
    h.clock.advance_ms(10_000);

    h.store.import_design(h.store.export_design_data()).unwrap();
    assert!(h.store.design().content_eq(&before));
    assert_ne!(h.store.design().updated_at, before.updated_at);
}

#[test]
fn internal_sync_keeps_name_stock_and_history() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 0, Some("red"));
    let mut payload = h.store.export_design_data();
    payload.design.name = "Renamed elsewhere".into();
    payload.design.strands[0].cells[1] = Cell::filled("blue");
    payload.inventory = Some(vec![InventoryItem::new("red", 3)]);

    h.clock.advance_ms(1_000);
    h.store.import_design(payload).unwrap();
    assert_eq!(h.store.design().name, "New Design");
    assert_eq!(cell(&h.store, 0, 1), Some("blue"));
    assert_eq!(h.store.stock("red"), 49);
    assert!(h.store.can_undo());
}

#[test]
fn external_import_replaces_name_stock_and_history() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 0, Some("red"));

    let mut payload = h.store.export_design_data();
    payload.design.id = "elsewhere".into();
    payload.design.name = "Gift".into();
    payload.inventory = Some(vec![InventoryItem::new("red", 3)]);
    h.store.import_design(payload).unwrap();

    assert_eq!(h.store.design().id, "elsewhere");
    assert_eq!(h.store.design().name, "Gift");
    assert_eq!(h.store.stock("red"), 3);
    assert!(!h.store.can_undo());
}

#[test]
fn explicit_intent_overrides_id_inference() {
    let mut h = harness();
    let mut payload = h.store.export_design_data();
    payload.design.name = "Same id, new file".into();
    h.store
        .import_design_as(payload, ImportIntent::External)
        .unwrap();
    assert_eq!(h.store.design().name, "Same id, new file");
}

#[test]
fn imported_design_without_strands_gets_one() {
    let mut h = harness();
    let mut payload = h.store.export_design_data();
    payload.design.id = "empty".into();
    payload.design.strands.clear();
    h.store.import_design(payload).unwrap();
    assert_eq!(h.store.design().strands.len(), 1);
}

#[test]
fn imported_strands_without_usable_ids_get_fresh_ones() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.add_strand();
    h.store.add_strand();
    h.store.set_cell(&strand, 0, Some("red"));
    let mut payload = h.store.export_design_data();
    payload.design.id = "other".into();
    payload.design.strands[0].id = String::new();
    payload.design.strands[2].id = payload.design.strands[1].id.clone();
    h.store.import_design(payload).unwrap();

    let ids: Vec<&str> = h.store.design().strands.iter().map(|s| s.id.as_str()).collect();
    assert!(ids.iter().all(|id| !id.is_empty()), "{ids:?}");
    assert_ne!(ids[1], ids[2]);
    assert_eq!(cell(&h.store, 0, 0), Some("red"));
    assert_eq!(h.store.last_save(), Some(&SaveOutcome::Saved));

    h.store.add_strand();
    assert_eq!(h.store.last_save(), Some(&SaveOutcome::Saved));
    assert!(h.durable.get("bead-design-app-state").unwrap().unwrap().contains("other"));
}

#[test]
fn malformed_json_import_is_rejected_and_state_kept() {
    let mut h = harness();
    let before = h.store.design().clone();
    for bad in [
        "not json",
        r#"{"palette": []}"#,
        r#"{"design": {"strands": {}}, "palette": []}"#,
        r#"{"design": {"id": "x", "strands": [{"id": "s"}]}, "palette": []}"#,
    ] {
        let err = h.store.import_payload_json(bad).unwrap_err();
        assert!(matches!(err, StoreError::Payload(_)), "{bad}: {err}");
    }
    assert_eq!(h.store.design(), &before);
}

#[test]
fn share_code_moves_a_design_between_stores() {
    let mut source = harness();
    let strand = first_strand(&source.store);
    source.store.set_cell(&strand, 4, Some("orange"));
    let code = source.store.share_code().unwrap();

    let mut target = harness_with(StoreConfig::default());
    target.store.import_share_code(&code).unwrap();
    assert_eq!(cell(&target.store, 0, 4), Some("orange"));
    assert_eq!(target.store.stock("orange"), 49);
    assert!(target.store.import_share_code("%%%").is_err());
}

#[test]
fn bom_counts_distinct_beads() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    for (i, bead) in [Some("red"), Some("red"), Some("blue"), None, Some("red")]
        .into_iter()
        .enumerate()
    {
        h.store.set_cell(&strand, i, bead);
    }
    let bom = h.store.export_bom();
    let counts: Vec<_> = bom.iter().map(|e| (e.bead_id.as_str(), e.count)).collect();
    assert_eq!(counts, vec![("red", 3), ("blue", 1)]);
}

#[test]
fn sequence_and_palette_exports() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    h.store.set_cell(&strand, 1, Some("black"));
    let text = h.store.export_sequence();
    assert!(text.starts_with("Diseño: New Design\nFecha: 14/11/2023\n\nHebra 1 (Strand 1):\n"));
    assert!(text.contains("2. Black (#000000)\n"));

    let export = h.store.export_palette();
    assert_eq!(export.palette.len(), 10);
    assert_eq!(export.inventory.len(), 10);
}

#[test]
fn export_payload_round_trips_through_json() {
    let h = harness();
    let json = h.store.export_design_data().to_json().unwrap();
    let parsed = DesignPayload::from_json(&json).unwrap();
    assert_eq!(parsed, h.store.export_design_data());
}

// ============================================================================
// Events and lifecycle
// ============================================================================

#[test]
fn observers_see_changes_until_unsubscribed() {
    let mut h = harness();
    let strand = first_strand(&h.store);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let subscription = {
        let seen = Rc::clone(&seen);
        h.store.subscribe(move |event| seen.borrow_mut().push(event.clone()))
    };

    h.store.set_cell(&strand, 0, Some("red"));
    assert_eq!(
        *seen.borrow(),
        vec![
            StoreEvent::DesignChanged,
            StoreEvent::HistoryChanged {
                can_undo: true,
                can_redo: false
            },
            StoreEvent::InventoryChanged,
        ]
    );

    drop(subscription);
    h.store.set_cell(&strand, 1, Some("red"));
    assert_eq!(seen.borrow().len(), 3);
}

#[test]
fn emergency_backup_follows_interval_and_shutdown() {
    let mut h = harness();
    h.clock.advance_ms(59_000);
    h.store.tick();
    assert!(h.session.is_empty());
    h.clock.advance_ms(1_000);
    h.store.tick();
    assert_eq!(h.session.keys().unwrap(), vec!["bead-design-app-state.emergency".to_string()]);

    h.session.remove("bead-design-app-state.emergency").unwrap();
    h.store.shutdown();
    assert_eq!(h.session.len(), 1);
}
