//! Collaborator traits: where glyphs come from, how fonts are resolved,
//! and how a raw distance field becomes texture values.

use crate::atlas::FontHandle;
use crate::error::AtlasError;
use crate::geometry::{OutlinePath, Point, Rect};
use crate::grid::DistanceField;

/// One font materialized at one raster resolution.
///
/// All geometry is in y-down pixels relative to the glyph pen origin.
/// Glyph ids run from `0` to `glyph_count() - 1` without gaps.
pub trait GlyphSource: Send + Sync {
    fn glyph_count(&self) -> u32;

    /// Ink bounding box of a glyph relative to its origin. Glyphs with no
    /// ink report a zero-area box.
    fn bounding_box(&self, glyph_id: u32) -> Rect;

    /// Filled outline with its origin placed at `origin`.
    fn outline(&self, glyph_id: u32, origin: Point) -> OutlinePath;

    /// Horizontal advance in pixels.
    fn advance(&self, glyph_id: u32) -> f32;

    /// Distance from baseline to the top of the line, positive.
    fn ascent(&self) -> f32;

    /// Distance from baseline to the bottom of the line, positive.
    fn descent(&self) -> f32;

    /// Typical stem width in pixels, used to pick the SDF spread.
    fn stroke_width_estimate(&self) -> f32;
}

/// Resolves a font by name and point size.
pub trait FontResolver: Send + Sync {
    fn resolve(&self, name: &str, point_size: f32) -> Result<FontHandle, AtlasError>;
}

/// Normalization and resampling of raw distance fields.
///
/// Implementations must agree on [`encode_distance`] so atlases built on
/// different backends sample the same way.
pub trait FieldBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Map signed pixel distances into `[0, 1]` in place.
    fn normalize(&self, field: &mut DistanceField, spread: f32) -> Result<(), AtlasError>;

    /// Area-filtered resample to `width × height`.
    fn resample(
        &self,
        field: &DistanceField,
        width: u32,
        height: u32,
    ) -> Result<DistanceField, AtlasError>;

    /// Normalize then resample. Backends that can fuse the two override this.
    fn process(
        &self,
        mut field: DistanceField,
        spread: f32,
        width: u32,
        height: u32,
    ) -> Result<DistanceField, AtlasError> {
        self.normalize(&mut field, spread)?;
        self.resample(&field, width, height)
    }
}

/// Encode a signed distance as a unit value; the glyph edge lands on 0.5
/// and `±spread` on the ends of the range.
#[inline]
pub fn encode_distance(distance: f32, spread: f32) -> f32 {
    (0.5 + distance / (2.0 * spread)).clamp(0.0, 1.0)
}

/// Reject spreads the encoding cannot divide by.
pub fn check_spread(spread: f32) -> Result<(), AtlasError> {
    if spread.is_finite() && spread > 0.0 {
        Ok(())
    } else {
        Err(AtlasError::InvalidConfig(format!(
            "spread must be positive, got {spread}"
        )))
    }
}
