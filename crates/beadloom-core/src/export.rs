//! Human-facing renderings of a design: the bill of materials and the
//! assembly sequence.
//!
//! Both tolerate cells that reference beads missing from the palette and
//! fall back to placeholder display values instead of failing.

use std::fmt::Write;

use chrono::DateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{BeadShape, Design};
use crate::palette::Palette;

const UNKNOWN_NAME: &str = "Unknown";
const UNKNOWN_HEX: &str = "#000000";
const UNKNOWN_MM: u32 = 6;

/// One distinct bead used somewhere in a design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomEntry {
    pub bead_id: String,
    pub name: String,
    pub count: usize,
    pub hex: String,
    pub mm: u32,
    pub shape: BeadShape,
}

/// Count placements per bead across all strands, in first-use order.
#[must_use]
pub fn bill_of_materials(design: &Design, palette: &Palette) -> Vec<BomEntry> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for bead_id in design.placements() {
        *counts.entry(bead_id).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(bead_id, count)| match palette.get(bead_id) {
            Some(bead) => BomEntry {
                bead_id: bead_id.to_string(),
                name: bead.name.clone(),
                count,
                hex: bead.hex.clone(),
                mm: bead.mm,
                shape: bead.shape,
            },
            None => BomEntry {
                bead_id: bead_id.to_string(),
                name: UNKNOWN_NAME.to_string(),
                count,
                hex: UNKNOWN_HEX.to_string(),
                mm: UNKNOWN_MM,
                shape: BeadShape::Round,
            },
        })
        .collect()
}

/// Render the step-by-step threading instructions.
///
/// ```text
/// Diseño: <name>
/// Fecha: <d/m/yyyy>
///
/// Hebra 1 (<strand name>):
/// Longitud: 18cm, Diámetro: 6mm
/// 1. Red (#ef4444)
///
/// ```
#[must_use]
pub fn assembly_sequence(design: &Design, palette: &Palette) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Diseño: {}", design.name);
    let _ = writeln!(out, "Fecha: {}", format_date(design.updated_at));
    out.push('\n');

    for (n, strand) in design.strands.iter().enumerate() {
        let _ = writeln!(out, "Hebra {} ({}):", n + 1, strand.name);
        let _ = writeln!(
            out,
            "Longitud: {}cm, Diámetro: {}mm",
            strand.length_cm, strand.diameter_mm
        );
        for (position, cell) in strand.cells.iter().enumerate() {
            let Some(bead_id) = cell.bead_id.as_deref() else {
                continue;
            };
            let (name, hex) = palette
                .get(bead_id)
                .map_or((UNKNOWN_NAME, UNKNOWN_HEX), |bead| {
                    (bead.name.as_str(), bead.hex.as_str())
                });
            let _ = writeln!(out, "{}. {name} ({hex})", position + 1);
        }
        out.push('\n');
    }
    out
}

fn format_date(epoch_ms: u64) -> String {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|date| date.format("%-d/%-m/%Y").to_string())
        .unwrap_or_default()
}
