#![forbid(unsafe_code)]

//! Beadloom Core
//!
//! Pure data for the bead design editor: the [`Design`] document with its
//! strands and cells, the [`Palette`] of bead specifications, the per-bead
//! [`Inventory`], the procedural [`pattern`] fills, and the translators that
//! turn a design into portable JSON, share codes, an assembly sequence and a
//! bill of materials.
//!
//! # Role in Beadloom
//! `beadloom-core` owns no state and performs no I/O. The mutation authority
//! lives in `beadloom-runtime`, which holds these types, snapshots them for
//! undo/redo and persists them through the schema in [`document`].

pub mod document;
pub mod error;
pub mod export;
pub mod id;
pub mod model;
pub mod palette;
pub mod pattern;
pub mod payload;

pub use document::{
    FORMAT_VERSION, MinimalDocument, PersistedDocument, RawDocument, validate_design,
    validate_document,
};
pub use error::{DocumentError, ModelError, PayloadError};
pub use export::{BomEntry, assembly_sequence, bill_of_materials};
pub use id::{IdGenerator, SequentialIds, UuidIds};
pub use model::{
    BeadPatch, BeadShape, BeadSpec, Cell, DEFAULT_CELL_COUNT, DEFAULT_DESIGN_NAME,
    DEFAULT_DIAMETER_MM, DEFAULT_LENGTH_CM, Design, InventoryItem, Strand, StrandTemplate, Symmetry,
    strand_name,
};
pub use palette::{
    DEFAULT_STOCK, Inventory, Palette, default_inventory, default_palette, inventory_from_items,
    inventory_from_value, palette_from_beads, palette_from_value, return_stock, stock_of,
    take_stock,
};
pub use pattern::{PatternCode, fill_range};
pub use payload::{DesignPayload, PaletteExport, SHARE_TOKEN_LEN, share_token};
