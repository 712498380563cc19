//! Portable export/import payload and share codes.
//!
//! The payload is `{ design, palette: BeadSpec[], inventory?: InventoryItem[] }`.
//! A share code is the payload's JSON encoded as standard base64; its first
//! [`SHARE_TOKEN_LEN`] characters serve as a short display token.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;
use crate::model::{BeadSpec, Design, InventoryItem};
use crate::palette::{Inventory, Palette};

/// Characters of a share code shown as the opaque display token.
pub const SHARE_TOKEN_LEN: usize = 12;

/// A complete design with the palette and inventory it was authored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignPayload {
    pub design: Design,
    pub palette: Vec<BeadSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<InventoryItem>>,
}

/// Palette and inventory as flat lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteExport {
    pub palette: Vec<BeadSpec>,
    pub inventory: Vec<InventoryItem>,
}

impl PaletteExport {
    #[must_use]
    pub fn from_maps(palette: &Palette, inventory: &Inventory) -> Self {
        Self {
            palette: palette.values().cloned().collect(),
            inventory: inventory.values().cloned().collect(),
        }
    }
}

impl DesignPayload {
    #[must_use]
    pub fn from_parts(design: &Design, palette: &Palette, inventory: &Inventory) -> Self {
        Self {
            design: design.clone(),
            palette: palette.values().cloned().collect(),
            inventory: Some(inventory.values().cloned().collect()),
        }
    }

    /// Parse and validate an imported JSON document.
    ///
    /// The top level must carry `design` and `palette`, `design.strands` and
    /// `palette` must be arrays; anything else is rejected with a
    /// descriptive error before typed decoding.
    pub fn from_json(json: &str) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let design = value
            .get("design")
            .ok_or(PayloadError::MissingField("design"))?;
        let palette = value
            .get("palette")
            .ok_or(PayloadError::MissingField("palette"))?;
        match design.get("strands") {
            None => return Err(PayloadError::MissingField("design.strands")),
            Some(strands) if !strands.is_array() => {
                return Err(PayloadError::NotAnArray("design.strands"));
            }
            Some(_) => {}
        }
        if !palette.is_array() {
            return Err(PayloadError::NotAnArray("palette"));
        }
        crate::document::validate_design(design).map_err(PayloadError::MalformedDesign)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Encode as a share code: base64 of the JSON text.
    pub fn to_share_code(&self) -> Result<String, PayloadError> {
        Ok(STANDARD.encode(self.to_json()?))
    }

    /// Decode a share code: reverse base64, then parse and validate.
    pub fn from_share_code(code: &str) -> Result<Self, PayloadError> {
        let bytes = STANDARD.decode(code.trim())?;
        let json = String::from_utf8(bytes).map_err(|_| PayloadError::NotUtf8)?;
        Self::from_json(&json)
    }
}

/// Short display token for a share code.
#[must_use]
pub fn share_token(code: &str) -> &str {
    match code.char_indices().nth(SHARE_TOKEN_LEN) {
        Some((end, _)) => &code[..end],
        None => code,
    }
}
