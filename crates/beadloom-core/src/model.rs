//! The design document: beads, strands, cells and the root [`Design`].
//!
//! All types serialize with the camelCase field names of the persisted
//! document (`beadId`, `lengthCm`, `diameterMm`, `updatedAt`). Optional or
//! secondary fields carry serde defaults so that partially-written documents
//! (for example the minimal fallback slot) still deserialize; the structural
//! fields (`id`, `cells`, `beadId`) are checked separately by
//! [`validate_document`](crate::document::validate_document).

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ModelError;
use crate::id::IdGenerator;

pub const DEFAULT_DESIGN_NAME: &str = "New Design";
pub const DEFAULT_CELL_COUNT: usize = 30;
pub const DEFAULT_LENGTH_CM: f64 = 18.0;
pub const DEFAULT_DIAMETER_MM: f64 = 6.0;

// ============================================================================
// Beads
// ============================================================================

/// Canonical persisted bead shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BeadShape {
    #[default]
    Round,
    Oval,
    Square,
    Tube,
    Bicone,
}

impl BeadShape {
    pub const ALL: [BeadShape; 5] = [
        BeadShape::Round,
        BeadShape::Oval,
        BeadShape::Square,
        BeadShape::Tube,
        BeadShape::Bicone,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Round => "round",
            Self::Oval => "oval",
            Self::Square => "square",
            Self::Tube => "tube",
            Self::Bicone => "bicone",
        }
    }

    /// Map any shape name onto the canonical set.
    ///
    /// Informal names used by editors fold onto their nearest canonical
    /// shape (`cylinder` is a tube, `cube` is a square); anything else is
    /// treated as round.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "round" => Self::Round,
            "oval" => Self::Oval,
            "square" | "cube" => Self::Square,
            "tube" | "cylinder" => Self::Tube,
            "bicone" | "diamond" => Self::Bicone,
            other => {
                tracing::debug!(shape = other, "unknown bead shape, using round");
                Self::Round
            }
        }
    }
}

impl<'de> Deserialize<'de> for BeadShape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_name(&raw))
    }
}

impl std::fmt::Display for BeadShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeadSpec {
    pub id: String,
    pub name: String,
    pub hex: String,
    pub mm: u32,
    #[serde(default)]
    pub shape: BeadShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl BeadSpec {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hex: hex.into(),
            mm: 6,
            shape: BeadShape::Round,
            note: None,
        }
    }

    #[must_use]
    pub fn with_mm(mut self, mm: u32) -> Self {
        self.mm = mm;
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: BeadShape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Check the invariants a palette entry must satisfy.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.id.trim().is_empty() {
            return Err(ModelError::EmptyBeadId);
        }
        if !is_hex_colour(&self.hex) {
            return Err(ModelError::MalformedHex {
                id: self.id.clone(),
                hex: self.hex.clone(),
            });
        }
        if self.mm == 0 {
            return Err(ModelError::ZeroDiameter {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Apply a partial update. The id never changes.
    pub fn apply(&mut self, patch: BeadPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(hex) = patch.hex {
            self.hex = hex;
        }
        if let Some(mm) = patch.mm {
            self.mm = mm;
        }
        if let Some(shape) = patch.shape {
            self.shape = shape;
        }
        if let Some(note) = patch.note {
            self.note = note;
        }
    }
}

/// Partial update for a [`BeadSpec`]. `None` leaves a field untouched;
/// `note: Some(None)` clears the note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeadPatch {
    pub name: Option<String>,
    pub hex: Option<String>,
    pub mm: Option<u32>,
    pub shape: Option<BeadShape>,
    pub note: Option<Option<String>>,
}

fn is_hex_colour(hex: &str) -> bool {
    let Some(digits) = hex.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Stock record keyed by bead id. Dangling ids are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub bead_id: String,
    pub stock: u32,
}

impl InventoryItem {
    #[must_use]
    pub fn new(bead_id: impl Into<String>, stock: u32) -> Self {
        Self {
            bead_id: bead_id.into(),
            stock,
        }
    }
}

// ============================================================================
// Strands
// ============================================================================

/// One position on a strand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "beadId")]
    pub bead_id: Option<String>,
}

impl Cell {
    #[must_use]
    pub fn empty() -> Self {
        Self { bead_id: None }
    }

    #[must_use]
    pub fn filled(bead_id: impl Into<String>) -> Self {
        Self {
            bead_id: Some(bead_id.into()),
        }
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.bead_id.is_some()
    }
}

fn default_length_cm() -> f64 {
    DEFAULT_LENGTH_CM
}

fn default_diameter_mm() -> f64 {
    DEFAULT_DIAMETER_MM
}

/// One physical thread of bead positions. `cells.len()` is its capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strand {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_length_cm")]
    pub length_cm: f64,
    #[serde(default = "default_diameter_mm")]
    pub diameter_mm: f64,
    pub cells: Vec<Cell>,
}

/// Shape of a freshly created strand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrandTemplate {
    pub cell_count: usize,
    pub length_cm: f64,
    pub diameter_mm: f64,
}

impl Default for StrandTemplate {
    fn default() -> Self {
        Self {
            cell_count: DEFAULT_CELL_COUNT,
            length_cm: DEFAULT_LENGTH_CM,
            diameter_mm: DEFAULT_DIAMETER_MM,
        }
    }
}

impl Strand {
    /// An unfilled strand built from `template`.
    #[must_use]
    pub fn empty(id: impl Into<String>, name: impl Into<String>, template: StrandTemplate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            length_cm: template.length_cm,
            diameter_mm: template.diameter_mm,
            cells: vec![Cell::empty(); template.cell_count],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Position mirrored about the strand's midpoint.
    ///
    /// Returns `None` when `index` is out of range.
    #[must_use]
    pub fn mirror_index(&self, index: usize) -> Option<usize> {
        (index < self.cells.len()).then(|| self.cells.len() - 1 - index)
    }

    #[must_use]
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_filled()).count()
    }

    /// Advisory capacity for the strand's physical length and bead size:
    /// `ceil(length_cm * 10 / diameter_mm)`. Never applied automatically.
    #[must_use]
    pub fn recommended_cell_count(&self) -> usize {
        if !(self.diameter_mm > 0.0) || !(self.length_cm > 0.0) {
            return 0;
        }
        ((self.length_cm * 10.0) / self.diameter_mm).ceil() as usize
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.bead_id = None;
        }
    }
}

// ============================================================================
// Design
// ============================================================================

/// Editing constraint applied by cell edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Symmetry {
    #[default]
    None,
    MirrorCenter,
}

fn default_design_name() -> String {
    DEFAULT_DESIGN_NAME.to_string()
}

/// The root document. Always holds at least one strand once owned by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Design {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_design_name")]
    pub name: String,
    pub strands: Vec<Strand>,
    #[serde(default)]
    pub symmetry: Symmetry,
    #[serde(default)]
    pub updated_at: u64,
}

impl Design {
    /// A fresh design with a single empty strand.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        ids: &dyn IdGenerator,
        template: StrandTemplate,
        now_ms: u64,
    ) -> Self {
        Self {
            id: ids.next_id(),
            name: name.into(),
            strands: vec![Strand::empty(ids.next_id(), strand_name(1), template)],
            symmetry: Symmetry::None,
            updated_at: now_ms,
        }
    }

    #[must_use]
    pub fn strand(&self, strand_id: &str) -> Option<&Strand> {
        self.strands.iter().find(|strand| strand.id == strand_id)
    }

    pub fn strand_mut(&mut self, strand_id: &str) -> Option<&mut Strand> {
        self.strands.iter_mut().find(|strand| strand.id == strand_id)
    }

    /// Bead ids of every filled cell, strand by strand.
    pub fn placements(&self) -> impl Iterator<Item = &str> {
        self.strands
            .iter()
            .flat_map(|strand| strand.cells.iter())
            .filter_map(|cell| cell.bead_id.as_deref())
    }

    #[must_use]
    pub fn placement_count(&self, bead_id: &str) -> usize {
        self.placements().filter(|id| *id == bead_id).count()
    }

    /// Equality ignoring `updated_at`.
    #[must_use]
    pub fn content_eq(&self, other: &Design) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.symmetry == other.symmetry
            && self.strands == other.strands
    }
}

/// Display name for the `n`th strand (1-based).
#[must_use]
pub fn strand_name(n: usize) -> String {
    format!("Strand {n}")
}
