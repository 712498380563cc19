//! Persisted document schema and structural validation.
//!
//! # File Format
//!
//! ```json
//! {
//!   "design": { "id": "...", "name": "...", "symmetry": "none",
//!               "updatedAt": 1700000000000,
//!               "strands": [ { "id": "...", "name": "...", "lengthCm": 18,
//!                              "diameterMm": 6, "cells": [ { "beadId": null } ] } ] },
//!   "palette": { "red": { ... } },
//!   "inventory": { "red": { "beadId": "red", "stock": 50 } },
//!   "timestamp": 1700000000000,
//!   "version": "1.1.0"
//! }
//! ```
//!
//! Readers accept `palette`/`inventory` keyed by id or as arrays, and repair
//! individual entries rather than rejecting the document.
//!
//! # Validity
//!
//! A document is restorable when it has a `design` whose `strands` is an
//! array, every strand has a non-empty string `id` and a `cells` array, and
//! every cell is an object with a `beadId` key holding a string or null.
//! Validation runs on the raw JSON value before typed decoding so that
//! serde defaults cannot mask a missing structural field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;
use crate::model::{
    Cell, DEFAULT_DESIGN_NAME, DEFAULT_DIAMETER_MM, DEFAULT_LENGTH_CM, Design, Strand, Symmetry,
    strand_name,
};
use crate::palette::{Inventory, Palette, inventory_from_value, palette_from_value};

/// Version tag written into every persisted document.
pub const FORMAT_VERSION: &str = "1.1.0";

/// Check the structural shape of a design value.
pub fn validate_design(design: &Value) -> Result<(), String> {
    let strands = design
        .get("strands")
        .and_then(Value::as_array)
        .ok_or_else(|| "design.strands is not an array".to_string())?;
    for (n, strand) in strands.iter().enumerate() {
        match strand.get("id") {
            Some(Value::String(id)) if !id.is_empty() => {}
            _ => return Err(format!("strand {n} has no id")),
        }
        let cells = strand
            .get("cells")
            .and_then(Value::as_array)
            .ok_or_else(|| format!("strand {n} has no cells array"))?;
        for (i, cell) in cells.iter().enumerate() {
            let Some(fields) = cell.as_object() else {
                return Err(format!("strand {n} cell {i} is not an object"));
            };
            match fields.get("beadId") {
                Some(Value::Null | Value::String(_)) => {}
                Some(_) => return Err(format!("strand {n} cell {i} has a non-string beadId")),
                None => return Err(format!("strand {n} cell {i} has no beadId")),
            }
        }
    }
    Ok(())
}

/// Check the structural shape of a whole persisted document.
pub fn validate_document(document: &Value) -> Result<(), String> {
    let design = document
        .get("design")
        .ok_or_else(|| "missing design".to_string())?;
    validate_design(design)
}

/// Borrowed view of the live state, serialized into the primary slot.
#[derive(Debug, Serialize)]
pub struct PersistedDocument<'a> {
    pub design: &'a Design,
    pub palette: &'a Palette,
    pub inventory: &'a Inventory,
    pub timestamp: u64,
    pub version: &'static str,
}

impl<'a> PersistedDocument<'a> {
    #[must_use]
    pub fn new(
        design: &'a Design,
        palette: &'a Palette,
        inventory: &'a Inventory,
        timestamp: u64,
    ) -> Self {
        Self {
            design,
            palette,
            inventory,
            timestamp,
            version: FORMAT_VERSION,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A document read back from storage.
///
/// Only the design's structure decides whether a document is restorable.
/// Everything else is repaired on the way in: secondary design fields fall
/// back to their defaults, and `palette`/`inventory` are kept as raw values
/// until [`RawDocument::into_parts`] recovers whatever entries are usable.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub design: Design,
    pub palette: Option<Value>,
    pub inventory: Option<Value>,
    pub timestamp: Option<u64>,
    pub version: Option<String>,
}

impl RawDocument {
    /// Parse and structurally validate a stored document.
    pub fn parse(json: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self, DocumentError> {
        validate_document(&value).map_err(DocumentError::Invalid)?;
        let design = design_from_value(&value["design"]);
        let side = |value: &mut Value, field: &str| {
            value
                .get_mut(field)
                .map(Value::take)
                .filter(|side| !side.is_null())
        };
        Ok(Self {
            design,
            palette: side(&mut value, "palette"),
            inventory: side(&mut value, "inventory"),
            timestamp: value.get("timestamp").and_then(Value::as_u64),
            version: value
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Split into the design and recovered maps. A map that is missing or
    /// unreadable as a whole comes back `None` so the caller can substitute
    /// its own defaults.
    #[must_use]
    pub fn into_parts(self) -> (Design, Option<Palette>, Option<Inventory>) {
        let palette = self.palette.as_ref().and_then(|value| {
            let palette = palette_from_value(value);
            if palette.is_none() {
                tracing::warn!("stored palette is unreadable, using defaults");
            }
            palette
        });
        let inventory = self.inventory.as_ref().and_then(|value| {
            let inventory = inventory_from_value(value);
            if inventory.is_none() {
                tracing::warn!("stored inventory is unreadable, using defaults");
            }
            inventory
        });
        (self.design, palette, inventory)
    }
}

fn positive_or(value: Option<&Value>, fallback: f64) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n > 0.0)
        .unwrap_or(fallback)
}

/// Decode a design that already passed [`validate_design`].
fn design_from_value(design: &Value) -> Design {
    let text = |value: &Value, field: &str| {
        value
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let strands = design
        .get("strands")
        .and_then(Value::as_array)
        .map(|strands| {
            strands
                .iter()
                .enumerate()
                .map(|(n, strand)| Strand {
                    id: text(strand, "id").unwrap_or_default(),
                    name: text(strand, "name").unwrap_or_else(|| strand_name(n + 1)),
                    length_cm: positive_or(strand.get("lengthCm"), DEFAULT_LENGTH_CM),
                    diameter_mm: positive_or(strand.get("diameterMm"), DEFAULT_DIAMETER_MM),
                    cells: strand
                        .get("cells")
                        .and_then(Value::as_array)
                        .map(|cells| {
                            cells
                                .iter()
                                .map(|cell| Cell {
                                    bead_id: text(cell, "beadId"),
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();
    let symmetry = match design.get("symmetry").and_then(Value::as_str) {
        Some("mirror-center") => Symmetry::MirrorCenter,
        _ => Symmetry::None,
    };
    Design {
        id: text(design, "id").unwrap_or_default(),
        name: text(design, "name").unwrap_or_else(|| DEFAULT_DESIGN_NAME.to_string()),
        strands,
        symmetry,
        updated_at: design.get("updatedAt").and_then(Value::as_u64).unwrap_or(0),
    }
}

/// Last-resort slot: bead placement only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalDocument {
    pub design: MinimalDesign,
    pub timestamp: u64,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalDesign {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub strands: Vec<MinimalStrand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalStrand {
    pub id: String,
    pub cells: Vec<Cell>,
}

impl MinimalDocument {
    /// Strip a design down to ids, name and cell contents.
    #[must_use]
    pub fn from_design(design: &Design, timestamp: u64) -> Self {
        Self {
            design: MinimalDesign {
                id: design.id.clone(),
                name: Some(design.name.clone()),
                strands: design
                    .strands
                    .iter()
                    .map(|strand| MinimalStrand {
                        id: strand.id.clone(),
                        cells: strand.cells.clone(),
                    })
                    .collect(),
            },
            timestamp,
            version: Some(FORMAT_VERSION.to_string()),
        }
    }

    pub fn parse(json: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(json)?;
        validate_document(&value).map_err(DocumentError::Invalid)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Rebuild a full design, backfilling every dropped field and stamping
    /// `updated_at` with `now_ms`.
    #[must_use]
    pub fn into_design(self, now_ms: u64) -> Design {
        let name = self
            .design
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DESIGN_NAME.to_string());
        Design {
            id: self.design.id,
            name,
            strands: self
                .design
                .strands
                .into_iter()
                .enumerate()
                .map(|(n, strand)| Strand {
                    id: strand.id,
                    name: strand_name(n + 1),
                    length_cm: DEFAULT_LENGTH_CM,
                    diameter_mm: DEFAULT_DIAMETER_MM,
                    cells: strand.cells,
                })
                .collect(),
            symmetry: Symmetry::None,
            updated_at: now_ms,
        }
    }
}
