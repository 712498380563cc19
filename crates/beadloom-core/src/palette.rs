//! Palette and inventory maps.
//!
//! Both are insertion-ordered maps keyed by bead id. Insertion order is the
//! order the pattern engine draws colours from, so it must survive a
//! persist/load cycle; [`IndexMap`] keeps it through serde.
//!
//! In stored documents either map may appear keyed by id or as a plain
//! array, and individual entries may be partial. [`palette_from_value`] and
//! [`inventory_from_value`] accept both shapes and repair entries one at a
//! time, so one bad record never costs the rest of the map.

use indexmap::IndexMap;
use serde_json::Value;

use crate::model::{BeadShape, BeadSpec, InventoryItem};

/// Stock assigned to beads that arrive without an inventory record.
pub const DEFAULT_STOCK: u32 = 50;

pub type Palette = IndexMap<String, BeadSpec>;
pub type Inventory = IndexMap<String, InventoryItem>;

const DEFAULT_COLOURS: [(&str, &str, &str); 10] = [
    ("red", "Red", "#ef4444"),
    ("blue", "Blue", "#3b82f6"),
    ("green", "Green", "#22c55e"),
    ("yellow", "Yellow", "#eab308"),
    ("purple", "Purple", "#a855f7"),
    ("white", "White", "#ffffff"),
    ("black", "Black", "#000000"),
    ("orange", "Orange", "#f97316"),
    ("pink", "Pink", "#ec4899"),
    ("teal", "Teal", "#14b8a6"),
];

/// The first-run palette: ten round 6 mm colours.
#[must_use]
pub fn default_palette() -> Palette {
    DEFAULT_COLOURS
        .iter()
        .map(|(id, name, hex)| {
            let bead = BeadSpec::new(*id, *name, *hex)
                .with_mm(6)
                .with_shape(BeadShape::Round);
            ((*id).to_string(), bead)
        })
        .collect()
}

/// One inventory record of `stock` units per palette entry.
#[must_use]
pub fn default_inventory(palette: &Palette, stock: u32) -> Inventory {
    palette
        .keys()
        .map(|id| (id.clone(), InventoryItem::new(id.clone(), stock)))
        .collect()
}

#[must_use]
pub fn palette_from_beads(beads: impl IntoIterator<Item = BeadSpec>) -> Palette {
    beads
        .into_iter()
        .map(|bead| (bead.id.clone(), bead))
        .collect()
}

#[must_use]
pub fn inventory_from_items(items: impl IntoIterator<Item = InventoryItem>) -> Inventory {
    items
        .into_iter()
        .map(|item| (item.bead_id.clone(), item))
        .collect()
}

/// Stock on hand; unknown ids count as zero.
#[must_use]
pub fn stock_of(inventory: &Inventory, bead_id: &str) -> u32 {
    inventory.get(bead_id).map_or(0, |item| item.stock)
}

/// Remove up to `amount` units, clamping at zero. Returns the new stock.
pub fn take_stock(inventory: &mut Inventory, bead_id: &str, amount: u32) -> u32 {
    let next = stock_of(inventory, bead_id).saturating_sub(amount);
    inventory.insert(bead_id.to_string(), InventoryItem::new(bead_id, next));
    next
}

/// Return `amount` units. Returns the new stock.
pub fn return_stock(inventory: &mut Inventory, bead_id: &str, amount: u32) -> u32 {
    let next = stock_of(inventory, bead_id).saturating_add(amount);
    inventory.insert(bead_id.to_string(), InventoryItem::new(bead_id, next));
    next
}

// ============================================================================
// Tolerant decoding
// ============================================================================

/// Entries of a map or list value, each paired with its map key if any.
fn wire_entries(value: &Value) -> Option<Vec<(Option<&str>, &Value)>> {
    match value {
        Value::Object(map) => Some(
            map.iter()
                .map(|(key, entry)| (Some(key.as_str()), entry))
                .collect(),
        ),
        Value::Array(list) => Some(list.iter().map(|entry| (None, entry)).collect()),
        _ => None,
    }
}

fn non_empty_str<'a>(entry: &'a Value, field: &str) -> Option<&'a str> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

/// Non-negative whole number, clamped into `u32`.
fn clamped_count(value: Option<&Value>) -> Option<u32> {
    let number = value?;
    if let Some(n) = number.as_u64() {
        return Some(u32::try_from(n).unwrap_or(u32::MAX));
    }
    if number.as_i64().is_some() {
        return Some(0);
    }
    let n = number.as_f64().filter(|n| n.is_finite())?;
    Some(n.clamp(0.0, f64::from(u32::MAX)).floor() as u32)
}

/// Recover a palette from stored JSON keyed by id or listed.
///
/// Entries are decoded one at a time. An entry that is not an object, or
/// has no usable id of its own or as its map key, is dropped. Missing
/// fields and non-positive sizes fall back to the default bead's values.
/// Returns `None` when `value` is neither a map nor a list.
#[must_use]
pub fn palette_from_value(value: &Value) -> Option<Palette> {
    let entries = wire_entries(value)?;
    let mut palette = Palette::new();
    for (key, entry) in entries {
        if !entry.is_object() {
            tracing::warn!(?key, "dropping palette entry that is not an object");
            continue;
        }
        let Some(id) = non_empty_str(entry, "id").or(key.filter(|k| !k.trim().is_empty())) else {
            tracing::warn!(?key, "dropping palette entry without an id");
            continue;
        };
        let mut bead = BeadSpec::new(id, non_empty_str(entry, "name").unwrap_or(id), "#000000");
        if let Some(hex) = entry.get("hex").and_then(Value::as_str) {
            bead.hex = hex.to_string();
        }
        if let Some(mm) = clamped_count(entry.get("mm")).filter(|mm| *mm > 0) {
            bead.mm = mm;
        }
        if let Some(shape) = entry.get("shape").and_then(Value::as_str) {
            bead.shape = BeadShape::from_name(shape);
        }
        bead.note = entry.get("note").and_then(Value::as_str).map(str::to_string);
        palette.insert(bead.id.clone(), bead);
    }
    Some(palette)
}

/// Recover an inventory from stored JSON keyed by bead id or listed.
///
/// Records are re-keyed by their `beadId` (the map key when absent).
/// Negative or unreadable stock counts as zero. Returns `None` when `value`
/// is neither a map nor a list.
#[must_use]
pub fn inventory_from_value(value: &Value) -> Option<Inventory> {
    let entries = wire_entries(value)?;
    let mut inventory = Inventory::new();
    for (key, entry) in entries {
        if !entry.is_object() {
            tracing::warn!(?key, "dropping inventory entry that is not an object");
            continue;
        }
        let Some(bead_id) = non_empty_str(entry, "beadId").or(key.filter(|k| !k.trim().is_empty()))
        else {
            tracing::warn!(?key, "dropping inventory entry without a bead id");
            continue;
        };
        let stock = clamped_count(entry.get("stock")).unwrap_or(0);
        inventory.insert(bead_id.to_string(), InventoryItem::new(bead_id, stock));
    }
    Some(inventory)
}
