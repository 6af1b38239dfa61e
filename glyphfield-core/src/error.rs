//! Error type shared by every stage of the atlas pipeline.

use thiserror::Error;

/// Everything that can abort an atlas build, load or save.
///
/// None of these are retried internally. Retrying with a larger canvas
/// or a different font is a caller decision.
#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Font unavailable: {name} at {point_size}pt ({reason})")]
    FontUnavailable {
        name: String,
        point_size: f32,
        reason: String,
    },
    #[error("Glyph {glyph_id} ({width}×{height}px) does not fit in the canvas")]
    GlyphTooLarge {
        glyph_id: u32,
        width: u32,
        height: u32,
    },
    #[error("Malformed atlas data: {0}")]
    SerializationFormat(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Field backend error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AtlasError {
    /// Shorthand for a [`AtlasError::FontUnavailable`] with a reason.
    pub fn font_unavailable(name: &str, point_size: f32, reason: impl Into<String>) -> Self {
        Self::FontUnavailable {
            name: name.to_string(),
            point_size,
            reason: reason.into(),
        }
    }
}
