//! Synthetic block fonts: glyphs made of axis-aligned rectangles.
//!
//! Useful for tests, benchmarks and demos that must not depend on
//! whatever fonts the host has installed. Geometry is exact, so packing
//! and distance results can be checked pixel by pixel.

use std::collections::HashMap;
use std::sync::Arc;

use glyphfield_core::{
    AtlasError, FontHandle, FontResolver, GlyphSource, OutlinePath, Point, Rect,
};

#[derive(Clone, Copy, Debug, PartialEq)]
struct BlockGlyph {
    /// Ink box relative to the pen origin; `None` for blank glyphs.
    ink: Option<Rect>,
    advance: f32,
}

/// A font whose glyphs are single filled rectangles.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockFont {
    glyphs: Vec<BlockGlyph>,
    ascent: f32,
    descent: f32,
    stroke: f32,
}

impl BlockFont {
    /// Empty font with the given line metrics.
    pub fn new(ascent: f32, descent: f32) -> Self {
        Self {
            glyphs: Vec::new(),
            ascent,
            descent,
            stroke: ascent / 8.0,
        }
    }

    /// Append a glyph whose ink is `ink` (y-down, relative to the pen).
    pub fn with_glyph(mut self, ink: Rect, advance: f32) -> Self {
        self.glyphs.push(BlockGlyph {
            ink: Some(ink),
            advance,
        });
        self
    }

    /// Append a glyph with no ink, like a space.
    pub fn with_blank(mut self, advance: f32) -> Self {
        self.glyphs.push(BlockGlyph { ink: None, advance });
        self
    }

    pub fn with_stroke(mut self, stroke: f32) -> Self {
        self.stroke = stroke;
        self
    }

    /// `count` glyphs of varied widths and heights at roughly `size` px
    /// per em, with every seventh glyph blank and every fifth dipping
    /// below the baseline.
    pub fn sample(count: u32, size: f32) -> Self {
        let mut font = Self::new(size, size * 0.25);
        let bearing = size * 0.05;
        for i in 0..count {
            if i % 7 == 3 {
                font = font.with_blank(size * 0.5);
                continue;
            }
            let width = size * (0.4 + 0.6 * ((i * 37 % 11) as f32 / 10.0));
            let height = size * (0.5 + 0.5 * ((i * 53 % 7) as f32 / 6.0));
            let below = if i % 5 == 0 { size * 0.25 } else { 0.0 };
            let ink = Rect::new(bearing, -height, bearing + width, below);
            font = font.with_glyph(ink, width + 2.0 * bearing);
        }
        font
    }

    /// Copy with every length multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        let scale = |r: Rect| {
            Rect::new(r.min_x * factor, r.min_y * factor, r.max_x * factor, r.max_y * factor)
        };
        Self {
            glyphs: self
                .glyphs
                .iter()
                .map(|g| BlockGlyph {
                    ink: g.ink.map(scale),
                    advance: g.advance * factor,
                })
                .collect(),
            ascent: self.ascent * factor,
            descent: self.descent * factor,
            stroke: self.stroke * factor,
        }
    }

    fn glyph(&self, glyph_id: u32) -> Option<&BlockGlyph> {
        self.glyphs.get(glyph_id as usize)
    }
}

impl GlyphSource for BlockFont {
    fn glyph_count(&self) -> u32 {
        self.glyphs.len() as u32
    }

    fn bounding_box(&self, glyph_id: u32) -> Rect {
        self.glyph(glyph_id).and_then(|g| g.ink).unwrap_or(Rect::ZERO)
    }

    fn outline(&self, glyph_id: u32, origin: Point) -> OutlinePath {
        match self.glyph(glyph_id).and_then(|g| g.ink) {
            Some(ink) => OutlinePath::rectangle(ink.translate(origin.x, origin.y)),
            None => OutlinePath::new(),
        }
    }

    fn advance(&self, glyph_id: u32) -> f32 {
        self.glyph(glyph_id).map_or(0.0, |g| g.advance)
    }

    fn ascent(&self) -> f32 {
        self.ascent
    }

    fn descent(&self) -> f32 {
        self.descent
    }

    fn stroke_width_estimate(&self) -> f32 {
        self.stroke
    }
}

/// Resolves registered block fonts by name.
///
/// Fonts are registered at a design size of 1pt and scaled linearly to
/// the requested point size. Unknown names are `FontUnavailable`.
#[derive(Default)]
pub struct SyntheticResolver {
    fonts: HashMap<String, BlockFont>,
}

impl SyntheticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `font`, whose geometry is given for a 1pt size.
    pub fn with_font(mut self, name: impl Into<String>, font: BlockFont) -> Self {
        self.fonts.insert(name.into(), font);
        self
    }
}

impl FontResolver for SyntheticResolver {
    fn resolve(&self, name: &str, point_size: f32) -> Result<FontHandle, AtlasError> {
        if !(point_size.is_finite() && point_size > 0.0) {
            return Err(AtlasError::font_unavailable(name, point_size, "invalid point size"));
        }
        let font = self
            .fonts
            .get(name)
            .ok_or_else(|| AtlasError::font_unavailable(name, point_size, "not registered"))?;
        Ok(FontHandle::new(name, point_size, Arc::new(font.scaled(point_size))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_has_blanks_and_descenders() {
        let font = BlockFont::sample(14, 10.0);
        assert_eq!(font.glyph_count(), 14);
        assert_eq!(font.bounding_box(3), Rect::ZERO);
        assert!(font.outline(3, Point::new(5.0, 5.0)).is_empty());
        assert!(font.bounding_box(0).max_y > 0.0);
        assert_eq!(font.bounding_box(1).max_y, 0.0);
    }

    #[test]
    fn test_sample_ink_fits_advance_and_ascent() {
        let font = BlockFont::sample(50, 16.0);
        for id in 0..font.glyph_count() {
            let ink = font.bounding_box(id);
            assert!(ink.max_x <= font.advance(id));
            assert!(-ink.min_y <= font.ascent());
        }
    }

    #[test]
    fn test_outline_is_translated() {
        let font = BlockFont::new(8.0, 2.0).with_glyph(Rect::new(1.0, -8.0, 5.0, 0.0), 6.0);
        let path = font.outline(0, Point::new(10.0, 20.0));
        assert_eq!(path.bounds(), Some(Rect::new(11.0, 12.0, 15.0, 20.0)));
    }

    #[test]
    fn test_resolver_scales() {
        let unit = BlockFont::new(1.0, 0.25).with_glyph(Rect::new(0.0, -1.0, 0.5, 0.0), 0.6);
        let resolver = SyntheticResolver::new().with_font("Blocks", unit);
        let handle = resolver.resolve("Blocks", 20.0).unwrap();
        assert_eq!(handle.name(), "Blocks");
        assert_eq!(handle.point_size(), 20.0);
        assert_eq!(handle.source().ascent(), 20.0);
        assert_eq!(handle.source().bounding_box(0), Rect::new(0.0, -20.0, 10.0, 0.0));
    }

    #[test]
    fn test_resolver_unknown_font() {
        let resolver = SyntheticResolver::new();
        let err = resolver.resolve("Missing", 12.0).unwrap_err();
        assert!(matches!(err, AtlasError::FontUnavailable { .. }));
    }
}
