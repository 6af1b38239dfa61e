//! Finished-atlas data model: glyph UV descriptors, the texture, and
//! the font handle the atlas was built from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::AtlasError;
use crate::geometry::Rect;
use crate::source::GlyphSource;

// ── Glyph descriptor ────────────────────────────────────────────────

/// Normalized atlas placement of one glyph's inked box.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct GlyphDescriptor {
    pub glyph_id: u32,
    /// Top-left `(u, v)` in `[0, 1]`.
    pub top_left: (f32, f32),
    /// Bottom-right `(u, v)` in `[0, 1]`.
    pub bottom_right: (f32, f32),
}

impl GlyphDescriptor {
    /// Normalize a pixel-space ink box against the canvas, clamping to
    /// the canvas edges.
    pub fn from_pixel_box(glyph_id: u32, ink: Rect, canvas_width: u32, canvas_height: u32) -> Self {
        let w = canvas_width as f32;
        let h = canvas_height as f32;
        let u = |x: f32| (x / w).clamp(0.0, 1.0);
        let v = |y: f32| (y / h).clamp(0.0, 1.0);
        Self {
            glyph_id,
            top_left: (u(ink.min_x), v(ink.min_y)),
            bottom_right: (u(ink.max_x), v(ink.max_y)),
        }
    }

    /// True for glyphs with no ink (zero-area box).
    pub fn is_empty(&self) -> bool {
        self.bottom_right.0 <= self.top_left.0 || self.bottom_right.1 <= self.top_left.1
    }
}

// ── Atlas descriptor (cache key) ────────────────────────────────────

/// Cache key for a finished atlas. Equality and hashing are structural.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct FontAtlasDescriptor {
    pub font_name: String,
    /// Width and height of the finished (square) atlas texture.
    pub texture_size: u32,
}

impl FontAtlasDescriptor {
    /// Font of the reserved default atlas.
    pub const DEFAULT_FONT: &'static str = "sans-serif";
    /// Texture size of the reserved default atlas.
    pub const DEFAULT_SIZE: u32 = 512;

    pub fn new(font_name: impl Into<String>, texture_size: u32) -> Self {
        Self {
            font_name: font_name.into(),
            texture_size,
        }
    }
}

impl Default for FontAtlasDescriptor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FONT, Self::DEFAULT_SIZE)
    }
}

impl fmt::Display for FontAtlasDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.font_name, self.texture_size)
    }
}

// ── Texture ─────────────────────────────────────────────────────────

/// Texel layout of an [`AtlasTexture`].
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PixelFormat {
    /// One unsigned byte per texel.
    R8 = 1,
    /// One little-endian `f32` per texel.
    R32Float = 2,
}

impl PixelFormat {
    pub fn bytes_per_texel(self) -> usize {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::R32Float => 4,
        }
    }
}

/// Single-channel image sampled by the text renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtlasTexture {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
}

impl AtlasTexture {
    /// Wrap texel bytes, checking the length against the format.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: Vec<u8>,
    ) -> Result<Self, AtlasError> {
        let expected = width as usize * height as usize * format.bytes_per_texel();
        if bytes.len() != expected {
            return Err(AtlasError::InvalidConfig(format!(
                "{format:?} texture {width}×{height} needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            bytes,
        })
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

// ── Font handle ─────────────────────────────────────────────────────

/// A resolved font: its name, the point size it was materialized at, and
/// the glyph source behind it.
#[derive(Clone)]
pub struct FontHandle {
    name: String,
    point_size: f32,
    source: Arc<dyn GlyphSource>,
}

impl FontHandle {
    pub fn new(name: impl Into<String>, point_size: f32, source: Arc<dyn GlyphSource>) -> Self {
        Self {
            name: name.into(),
            point_size,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn source(&self) -> &dyn GlyphSource {
        self.source.as_ref()
    }
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontHandle")
            .field("name", &self.name)
            .field("point_size", &self.point_size)
            .field("glyph_count", &self.source.glyph_count())
            .finish()
    }
}

/// Handles compare by identity (name and size), not by source.
impl PartialEq for FontHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.point_size.to_bits() == other.point_size.to_bits()
    }
}

impl Eq for FontHandle {}

impl Hash for FontHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.point_size.to_bits().hash(state);
    }
}

// ── Font atlas ──────────────────────────────────────────────────────

/// A finished SDF atlas. Immutable once built or decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct FontAtlas {
    font: FontHandle,
    glyphs: Vec<GlyphDescriptor>,
    texture: AtlasTexture,
}

impl FontAtlas {
    /// Assemble an atlas. Descriptors must be ordered by glyph id with no
    /// gaps, starting at 0.
    pub fn new(
        font: FontHandle,
        glyphs: Vec<GlyphDescriptor>,
        texture: AtlasTexture,
    ) -> Result<Self, AtlasError> {
        if let Some((i, g)) = glyphs
            .iter()
            .enumerate()
            .find(|(i, g)| g.glyph_id as usize != *i)
        {
            return Err(AtlasError::InvalidConfig(format!(
                "glyph descriptor {i} has id {}",
                g.glyph_id
            )));
        }
        Ok(Self {
            font,
            glyphs,
            texture,
        })
    }

    pub fn font(&self) -> &FontHandle {
        &self.font
    }

    pub fn glyphs(&self) -> &[GlyphDescriptor] {
        &self.glyphs
    }

    /// UV lookup for the renderer.
    pub fn descriptor(&self, glyph_id: u32) -> Option<&GlyphDescriptor> {
        self.glyphs.get(glyph_id as usize)
    }

    pub fn texture(&self) -> &AtlasTexture {
        &self.texture
    }

    /// The cache key this atlas satisfies.
    pub fn atlas_descriptor(&self) -> FontAtlasDescriptor {
        FontAtlasDescriptor::new(self.font.name(), self.texture.width)
    }

    /// Approximate heap footprint, used for cache budgeting.
    pub fn byte_size(&self) -> usize {
        self.texture.byte_len() + self.glyphs.len() * std::mem::size_of::<GlyphDescriptor>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{OutlinePath, Point};
    use std::collections::HashSet;

    struct EmptyFont;

    impl GlyphSource for EmptyFont {
        fn glyph_count(&self) -> u32 {
            2
        }
        fn bounding_box(&self, _glyph_id: u32) -> Rect {
            Rect::ZERO
        }
        fn outline(&self, _glyph_id: u32, _origin: Point) -> OutlinePath {
            OutlinePath::new()
        }
        fn advance(&self, _glyph_id: u32) -> f32 {
            4.0
        }
        fn ascent(&self) -> f32 {
            8.0
        }
        fn descent(&self) -> f32 {
            2.0
        }
        fn stroke_width_estimate(&self) -> f32 {
            1.0
        }
    }

    fn handle() -> FontHandle {
        FontHandle::new("Empty", 12.0, Arc::new(EmptyFont))
    }

    fn texture() -> AtlasTexture {
        AtlasTexture::new(2, 2, PixelFormat::R8, vec![0, 64, 128, 255]).unwrap()
    }

    #[test]
    fn test_descriptor_structural_equality() {
        let a = FontAtlasDescriptor::new("Arial", 512);
        let b = FontAtlasDescriptor::new(String::from("Arial"), 512);
        assert_eq!(a, b);
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_ne!(FontAtlasDescriptor::new("Arial", 256), FontAtlasDescriptor::new("Arial", 512));
    }

    #[test]
    fn test_default_descriptor() {
        let d = FontAtlasDescriptor::default();
        assert_eq!(d.font_name, "sans-serif");
        assert_eq!(d.texture_size, 512);
        assert_eq!(d.to_string(), "sans-serif@512");
    }

    #[test]
    fn test_glyph_descriptor_normalizes_and_clamps() {
        let d = GlyphDescriptor::from_pixel_box(3, Rect::new(10.0, -5.0, 30.0, 120.0), 100, 100);
        assert_eq!(d.top_left, (0.1, 0.0));
        assert_eq!(d.bottom_right, (0.3, 1.0));
        assert!(!d.is_empty());
    }

    #[test]
    fn test_zero_area_descriptor_is_empty() {
        let d = GlyphDescriptor::from_pixel_box(0, Rect::at(Point::new(5.0, 5.0)), 10, 10);
        assert!(d.is_empty());
    }

    #[test]
    fn test_texture_length_checked() {
        assert!(AtlasTexture::new(2, 2, PixelFormat::R8, vec![0; 4]).is_ok());
        assert!(AtlasTexture::new(2, 2, PixelFormat::R32Float, vec![0; 4]).is_err());
        assert!(AtlasTexture::new(2, 2, PixelFormat::R32Float, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_atlas_rejects_gaps() {
        let glyphs = vec![
            GlyphDescriptor { glyph_id: 0, top_left: (0.0, 0.0), bottom_right: (0.5, 0.5) },
            GlyphDescriptor { glyph_id: 2, top_left: (0.5, 0.0), bottom_right: (1.0, 0.5) },
        ];
        assert!(FontAtlas::new(handle(), glyphs, texture()).is_err());
    }

    #[test]
    fn test_atlas_lookup_and_size() {
        let glyphs = vec![
            GlyphDescriptor { glyph_id: 0, top_left: (0.0, 0.0), bottom_right: (0.5, 0.5) },
            GlyphDescriptor { glyph_id: 1, top_left: (0.5, 0.0), bottom_right: (1.0, 0.5) },
        ];
        let atlas = FontAtlas::new(handle(), glyphs, texture()).unwrap();
        assert_eq!(atlas.descriptor(1).unwrap().top_left, (0.5, 0.0));
        assert!(atlas.descriptor(2).is_none());
        assert_eq!(atlas.atlas_descriptor(), FontAtlasDescriptor::new("Empty", 2));
        assert!(atlas.byte_size() >= 4);
    }

    #[test]
    fn test_handle_equality_ignores_source() {
        let a = handle();
        let b = FontHandle::new("Empty", 12.0, Arc::new(EmptyFont));
        assert_eq!(a, b);
        assert_ne!(a, FontHandle::new("Empty", 13.0, Arc::new(EmptyFont)));
        assert!(format!("{a:?}").contains("glyph_count"));
    }
}
