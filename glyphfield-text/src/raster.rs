//! Bilevel scanline fill of flattened outlines.
//!
//! Pixels are sampled at their centres with the nonzero winding rule and
//! written as 255 (ink) or left untouched. No antialiasing: the distance
//! transform downstream wants a hard mask.

use glyphfield_core::{OutlinePath, RasterBitmap};

/// Value written for covered pixels.
pub const INK: u8 = 255;

/// One non-horizontal polygon edge, stored top to bottom.
struct Edge {
    x_top: f32,
    y_top: f32,
    y_bottom: f32,
    /// dx/dy along the edge.
    slope: f32,
    /// +1 for downward edges, -1 for upward ones.
    winding: i32,
}

impl Edge {
    fn new(ax: f32, ay: f32, bx: f32, by: f32) -> Option<Self> {
        if ay == by {
            return None;
        }
        let (winding, (x0, y0), (x1, y1)) = if ay < by {
            (1, (ax, ay), (bx, by))
        } else {
            (-1, (bx, by), (ax, ay))
        };
        Some(Self {
            x_top: x0,
            y_top: y0,
            y_bottom: y1,
            slope: (x1 - x0) / (y1 - y0),
            winding,
        })
    }

    /// X where the edge crosses `y`, if it spans it (half-open at the bottom).
    fn crossing(&self, y: f32) -> Option<f32> {
        (self.y_top <= y && y < self.y_bottom).then(|| self.x_top + (y - self.y_top) * self.slope)
    }
}

/// Fill `path` into `bitmap`, clipping to its bounds.
///
/// Returns the number of pixels written.
pub fn fill_path(bitmap: &mut RasterBitmap, path: &OutlinePath) -> usize {
    let Some(bounds) = path.bounds() else {
        return 0;
    };

    let edges: Vec<Edge> = path
        .contours()
        .iter()
        .filter(|c| c.len() >= 3)
        .flat_map(|contour| {
            contour
                .iter()
                .zip(contour.iter().cycle().skip(1))
                .filter_map(|(a, b)| Edge::new(a.x, a.y, b.x, b.y))
        })
        .collect();

    let width = bitmap.width() as f32;
    let height = bitmap.height() as f32;
    let row_start = (bounds.min_y - 0.5).ceil().clamp(0.0, height) as u32;
    let row_end = (bounds.max_y - 0.5).ceil().clamp(0.0, height) as u32;

    let mut crossings: Vec<(f32, i32)> = Vec::with_capacity(16);
    let mut written = 0;

    for row in row_start..row_end {
        let sample_y = row as f32 + 0.5;
        crossings.clear();
        crossings.extend(
            edges
                .iter()
                .filter_map(|e| e.crossing(sample_y).map(|x| (x, e.winding))),
        );
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        let mut span_start = 0.0;
        for &(x, dir) in &crossings {
            let before = winding;
            winding += dir;
            if before == 0 && winding != 0 {
                span_start = x;
            } else if before != 0 && winding == 0 {
                let first = (span_start - 0.5).ceil().clamp(0.0, width) as u32;
                let last = (x - 0.5).ceil().clamp(0.0, width) as u32;
                for col in first..last {
                    bitmap.set(col, row, INK);
                }
                written += (last - first) as usize;
            }
        }
    }

    written
}
