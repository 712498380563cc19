use thiserror::Error;

/// Rejection of a bead specification that cannot enter the palette.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("bead id must not be empty")]
    EmptyBeadId,
    #[error("bead {id} has malformed colour {hex:?} (expected #RRGGBB)")]
    MalformedHex { id: String, hex: String },
    #[error("bead {id} must have a positive diameter")]
    ZeroDiameter { id: String },
}

/// Failure to accept an imported design payload or share code.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("payload field `{0}` must be an array")]
    NotAnArray(&'static str),
    #[error("payload design is malformed: {0}")]
    MalformedDesign(String),
    #[error("share code is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share code does not contain UTF-8 text")]
    NotUtf8,
}

/// A stored document that cannot be restored.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document is structurally invalid: {0}")]
    Invalid(String),
}
