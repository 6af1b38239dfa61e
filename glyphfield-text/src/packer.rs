//! Shelf packer: lays every glyph of a font into one binary raster.
//!
//! Glyphs are placed left to right in ascending id order on horizontal
//! "shelves". When the next glyph's ink would cross the right edge, a new
//! shelf starts `margin` below the lowest ink of the current one. Every
//! glyph occupies at least its inked width plus `margin`, and its ink top
//! never rises above the shelf top, so inked boxes are always `margin`
//! apart whatever the font's metrics claim. Placement is a fold over
//! glyph ids carrying a [`ShelfCursor`]; rasterization happens alongside
//! into a single shared [`RasterBitmap`].
//!
//! ```text
//!   ┌──────────────────────────────────┐  shelf top at margin / 2
//!   │ ▇▇  ▇▇▇  ▇  ▇▇▇▇  ▇▇   ▇▇▇       │  shelf 0 ── baseline at top + ascent
//!   │                                  │  margin
//!   │ ▇▇▇  ▇▇  ▇▇▇▇  ▇                 │  shelf 1 ── top at far_edge + margin
//!   └──────────────────────────────────┘
//! ```

use std::time::Instant;

use glyphfield_core::{AtlasError, GlyphDescriptor, GlyphSource, Point, RasterBitmap, Rect};

use crate::raster::fill_path;

/// Packing state of the current shelf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShelfCursor {
    /// `x`: left edge of the next glyph's slot. `y`: shelf baseline.
    pub origin: Point,
    /// Highest y ink may reach on the current shelf.
    pub shelf_top: f32,
    /// Lowest drawn ink y on the current shelf (`shelf_top` while empty).
    pub far_edge: f32,
    /// Number of shelves opened so far (including the current one).
    pub shelves: u32,
}

/// Fixed parameters of one packing run.
#[derive(Clone, Copy, Debug)]
pub struct ShelfLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub margin: u32,
    pub ascent: f32,
}

impl ShelfLayout {
    /// Cursor at the top-left of the canvas.
    pub fn start(&self) -> ShelfCursor {
        self.shelf_at(self.margin as f32 / 2.0, 1)
    }

    fn shelf_at(&self, top: f32, shelves: u32) -> ShelfCursor {
        ShelfCursor {
            origin: Point::new(0.0, top + self.ascent),
            shelf_top: top,
            far_edge: top,
            shelves,
        }
    }

    /// Place one glyph. Returns the advanced cursor and the glyph's draw
    /// origin (where its pen origin lands in the canvas).
    ///
    /// Ink reaching above the ascent drops that glyph's baseline instead
    /// of crossing the shelf top. Ink that cannot fit the canvas width or
    /// runs past its bottom is `GlyphTooLarge`.
    pub fn place(
        &self,
        cursor: ShelfCursor,
        glyph_id: u32,
        ink: Rect,
        advance: f32,
    ) -> Result<(ShelfCursor, Point), AtlasError> {
        let margin = self.margin as f32;
        let width = self.canvas_width as f32;
        let ink_width = ink.width().max(0.0);
        let mut next = cursor;

        if next.origin.x + ink_width + margin > width {
            if next.origin.x > 0.0 {
                next = self.shelf_at(next.far_edge + margin, next.shelves + 1);
            }
            if ink_width + margin > width {
                return Err(too_large(glyph_id, ink));
            }
        }

        let baseline = next.origin.y.max(next.shelf_top - ink.min_y);
        let draw = Point::new(next.origin.x + margin / 2.0 - ink.min_x, baseline);
        if draw.y + ink.max_y > self.canvas_height as f32 {
            return Err(too_large(glyph_id, ink));
        }

        if !ink.is_empty() {
            next.far_edge = next.far_edge.max(draw.y + ink.max_y);
        }
        next.origin.x += advance.max(ink_width) + margin;
        Ok((next, draw))
    }
}

fn too_large(glyph_id: u32, ink: Rect) -> AtlasError {
    AtlasError::GlyphTooLarge {
        glyph_id,
        width: ink.width().max(0.0).ceil() as u32,
        height: ink.height().max(0.0).ceil() as u32,
    }
}

/// Rasterize every glyph of `source` into one `canvas_width × canvas_height`
/// bitmap and describe where each one landed.
///
/// `margin` pixels separate neighbours so later distance computations do
/// not bleed between glyphs; it must be non-zero.
pub fn pack(
    source: &dyn GlyphSource,
    canvas_width: u32,
    canvas_height: u32,
    margin: u32,
) -> Result<(RasterBitmap, Vec<GlyphDescriptor>), AtlasError> {
    if margin == 0 {
        return Err(AtlasError::InvalidConfig("packing margin must be > 0".into()));
    }
    if canvas_width == 0 || canvas_height == 0 {
        return Err(AtlasError::InvalidConfig(format!(
            "empty canvas {canvas_width}×{canvas_height}"
        )));
    }

    let start = Instant::now();
    let layout = ShelfLayout {
        canvas_width,
        canvas_height,
        margin,
        ascent: source.ascent(),
    };
    let count = source.glyph_count();
    let mut bitmap = RasterBitmap::new(canvas_width, canvas_height);
    let mut glyphs = Vec::with_capacity(count as usize);

    let cursor = (0..count).try_fold(layout.start(), |cursor, glyph_id| {
        let ink = source.bounding_box(glyph_id);
        let advance = source.advance(glyph_id);
        let (cursor, draw) = layout.place(cursor, glyph_id, ink, advance)?;

        let path = source.outline(glyph_id, draw);
        fill_path(&mut bitmap, &path);

        let inked = path.bounds().unwrap_or(Rect::at(draw));
        glyphs.push(GlyphDescriptor::from_pixel_box(
            glyph_id,
            inked,
            canvas_width,
            canvas_height,
        ));
        Ok::<_, AtlasError>(cursor)
    })?;

    log::debug!(
        "Packed {} glyphs on {} shelves into {}×{} ({} ink px, {:.1}ms)",
        count,
        cursor.shelves,
        canvas_width,
        canvas_height,
        bitmap.ink_count(),
        start.elapsed().as_secs_f64() * 1000.0,
    );

    Ok((bitmap, glyphs))
}

// ===================================================================
// Tests
// ===================================================================
