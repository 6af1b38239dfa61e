//! Dead-reckoning signed distance transform.
//!
//! Two raster sweeps propagate, for every pixel, the location of its
//! nearest boundary pixel (Grevera, "The dead reckoning signed distance
//! transform", 2004). Distances are always recomputed exactly from the
//! propagated location, so error does not accumulate along the sweep.
//!
//! ```text
//!   forward (top→bottom, left→right)      backward (bottom→top, right→left)
//!
//!     UL  U  UR                                      p  R
//!      L  p                                  DL  D  DR
//! ```
//!
//! The one-pixel border of the grid is never visited and keeps the
//! initial "infinity" magnitude `hypot(W, H)`.

use std::time::Instant;

use glyphfield_core::{DistanceField, RasterBitmap, INK_THRESHOLD};

/// Cost of stepping to an axis neighbour.
const AXIS: f32 = 1.0;
/// Cost of stepping to a diagonal neighbour.
const DIAGONAL: f32 = std::f32::consts::SQRT_2;

/// Stepwise transform state over one bitmap.
///
/// Call [`seed`](Self::seed), [`forward`](Self::forward),
/// [`backward`](Self::backward) and [`finish`](Self::finish) in that
/// order, or just use [`transform`].
pub struct DeadReckoning<'a> {
    bitmap: &'a RasterBitmap,
    width: u32,
    height: u32,
    distance: Vec<f32>,
    nearest: Vec<(u32, u32)>,
}

impl<'a> DeadReckoning<'a> {
    pub fn new(bitmap: &'a RasterBitmap) -> Self {
        let width = bitmap.width();
        let height = bitmap.height();
        let len = width as usize * height as usize;
        let far = (width as f32).hypot(height as f32);
        Self {
            bitmap,
            width,
            height,
            distance: vec![far; len],
            nearest: vec![(0, 0); len],
        }
    }

    /// Unsigned distance currently held for `(x, y)`.
    pub fn distance(&self, x: u32, y: u32) -> f32 {
        self.distance[self.index(x, y)]
    }

    /// Nearest boundary pixel currently held for `(x, y)`.
    pub fn nearest(&self, x: u32, y: u32) -> (u32, u32) {
        self.nearest[self.index(x, y)]
    }

    /// Mark interior pixels whose 4-neighbourhood crosses the ink
    /// threshold. Returns how many were marked.
    pub fn seed(&mut self) -> usize {
        let mut seeded = 0;
        for y in self.rows() {
            for x in self.cols() {
                let inside = self.bitmap.is_inside(x, y);
                let edge = self.bitmap.is_inside(x - 1, y) != inside
                    || self.bitmap.is_inside(x + 1, y) != inside
                    || self.bitmap.is_inside(x, y - 1) != inside
                    || self.bitmap.is_inside(x, y + 1) != inside;
                if edge {
                    let p = self.index(x, y);
                    self.distance[p] = 0.0;
                    self.nearest[p] = (x, y);
                    seeded += 1;
                }
            }
        }
        seeded
    }

    /// Top-to-bottom, left-to-right sweep.
    pub fn forward(&mut self) {
        for y in self.rows() {
            for x in self.cols() {
                self.relax(x, y, x - 1, y - 1, DIAGONAL);
                self.relax(x, y, x, y - 1, AXIS);
                self.relax(x, y, x + 1, y - 1, DIAGONAL);
                self.relax(x, y, x - 1, y, AXIS);
            }
        }
    }

    /// Bottom-to-top, right-to-left sweep.
    pub fn backward(&mut self) {
        for y in self.rows().rev() {
            for x in self.cols().rev() {
                self.relax(x, y, x + 1, y, AXIS);
                self.relax(x, y, x + 1, y + 1, DIAGONAL);
                self.relax(x, y, x, y + 1, AXIS);
                self.relax(x, y, x - 1, y + 1, DIAGONAL);
            }
        }
    }

    /// Apply signs (negative outside ink) and hand back the field.
    pub fn finish(self) -> DistanceField {
        let mut field = DistanceField::filled(self.width, self.height, 0.0);
        let signed = self.distance.iter().zip(self.bitmap.pixels());
        for (out, (&d, &px)) in field.values_mut().iter_mut().zip(signed) {
            *out = if px <= INK_THRESHOLD { -d } else { d };
        }
        field
    }

    fn relax(&mut self, x: u32, y: u32, nx: u32, ny: u32, cost: f32) {
        let p = self.index(x, y);
        let n = self.index(nx, ny);
        if self.distance[n] + cost < self.distance[p] {
            let (qx, qy) = self.nearest[n];
            self.nearest[p] = (qx, qy);
            self.distance[p] = (x as f32 - qx as f32).hypot(y as f32 - qy as f32);
        }
    }

    fn rows(&self) -> std::ops::Range<u32> {
        1..self.height.saturating_sub(1)
    }

    fn cols(&self) -> std::ops::Range<u32> {
        1..self.width.saturating_sub(1)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Signed distance field of `bitmap`: positive inside ink, negative
/// outside, zero magnitude on the boundary.
pub fn transform(bitmap: &RasterBitmap) -> DistanceField {
    let start = Instant::now();
    let mut dr = DeadReckoning::new(bitmap);
    let seeded = dr.seed();
    dr.forward();
    dr.backward();
    let field = dr.finish();
    log::debug!(
        "Distance transform {}×{} ({} boundary px, {:.1}ms)",
        bitmap.width(),
        bitmap.height(),
        seeded,
        start.elapsed().as_secs_f64() * 1000.0,
    );
    field
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// `size × size` bitmap with an ink block covering `lo..=hi` on both axes.
    fn block(size: u32, lo: u32, hi: u32) -> RasterBitmap {
        let mut bitmap = RasterBitmap::new(size, size);
        for y in lo..=hi {
            for x in lo..=hi {
                bitmap.set(x, y, 255);
            }
        }
        bitmap
    }

    #[test]
    fn test_three_by_three_block() {
        let field = transform(&block(8, 3, 5));
        // Centre is one step from the block edge.
        assert_eq!(field.get(4, 4), 1.0);
        // Ink edge pixels are boundary.
        assert_eq!(field.get(3, 4), 0.0);
        assert!(field.get(3, 4).is_sign_positive());
        // Outside pixels touching the block are boundary too, signed negative.
        assert_eq!(field.get(2, 4), 0.0);
        assert!(field.get(2, 4).is_sign_negative());
        assert_eq!(field.get(2, 2), -1.0);
        assert_eq!(field.get(1, 4), -1.0);
        let far = field.get(1, 1);
        assert!(far < -1.9 && far > -2.5, "got {far}");
    }

    #[test]
    fn test_border_keeps_infinity() {
        let field = transform(&block(8, 3, 5));
        let inf = 8f32.hypot(8.0);
        for i in 0..8 {
            assert_eq!(field.get(i, 0), -inf);
            assert_eq!(field.get(i, 7), -inf);
            assert_eq!(field.get(0, i), -inf);
            assert_eq!(field.get(7, i), -inf);
        }
    }

    #[test]
    fn test_sign_matches_ink() {
        let mut bitmap = block(24, 5, 14);
        bitmap.set(18, 18, 255);
        bitmap.set(9, 9, 0);
        let field = transform(&bitmap);
        for y in 0..24 {
            for x in 0..24 {
                assert_eq!(
                    field.get(x, y).is_sign_positive(),
                    bitmap.is_inside(x, y),
                    "pixel ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn test_magnitude_grows_away_from_edge() {
        let field = transform(&block(32, 10, 21));
        let row: Vec<f32> = (22..31).map(|x| field.get(x, 16).abs()).collect();
        assert!(row.windows(2).all(|w| w[0] <= w[1]), "{row:?}");
        let inner: Vec<f32> = (10..16).map(|x| field.get(x, 16)).collect();
        assert!(inner.windows(2).all(|w| w[0] <= w[1]), "{inner:?}");
    }

    #[test]
    fn test_close_to_brute_force() {
        let mut bitmap = RasterBitmap::new(32, 32);
        for y in 6..20 {
            for x in 4..26 {
                bitmap.set(x, y, 255);
            }
        }
        for y in 12..28 {
            for x in 12..18 {
                bitmap.set(x, y, 255);
            }
        }

        let mut dr = DeadReckoning::new(&bitmap);
        dr.seed();
        let boundary: Vec<(u32, u32)> = (1..31)
            .flat_map(|y| (1..31).map(move |x| (x, y)))
            .filter(|&(x, y)| dr.distance(x, y) == 0.0)
            .collect();
        dr.forward();
        dr.backward();

        for y in 1..31 {
            for x in 1..31 {
                let exact = boundary
                    .iter()
                    .map(|&(bx, by)| (x as f32 - bx as f32).hypot(y as f32 - by as f32))
                    .fold(f32::INFINITY, f32::min);
                let got = dr.distance(x, y);
                assert!(got >= exact - 1e-4, "({x}, {y}): {got} < {exact}");
                assert!(got - exact < 1.0, "({x}, {y}): {got} vs {exact}");
            }
        }
    }

    #[test]
    fn test_stepwise_phases() {
        let bitmap = block(8, 3, 5);
        let mut dr = DeadReckoning::new(&bitmap);
        // 3×3 block: 8 ink edge pixels plus 12 touching outside pixels.
        assert_eq!(dr.seed(), 20);
        assert_eq!(dr.nearest(3, 3), (3, 3));
        dr.forward();
        assert_eq!(dr.distance(4, 4), 1.0);
        dr.backward();
        assert_eq!(dr.distance(1, 4), 1.0);
        assert_eq!(dr.nearest(1, 4), (2, 4));
    }

    #[test]
    fn test_passes_never_increase_distance() {
        let bitmap = block(12, 2, 9);
        let mut dr = DeadReckoning::new(&bitmap);
        dr.seed();
        let snapshot = |dr: &DeadReckoning| -> Vec<f32> {
            (0..12)
                .flat_map(|y| (0..12).map(move |x| (x, y)))
                .map(|(x, y)| dr.distance(x, y))
                .collect()
        };
        let seeded = snapshot(&dr);
        dr.forward();
        let forward = snapshot(&dr);
        dr.backward();
        let backward = snapshot(&dr);
        for i in 0..seeded.len() {
            assert!(forward[i] <= seeded[i]);
            assert!(backward[i] <= forward[i]);
        }
    }

    #[test]
    fn test_empty_bitmap_is_all_outside() {
        let field = transform(&RasterBitmap::new(6, 5));
        let inf = 6f32.hypot(5.0);
        assert!(field.values().iter().all(|&v| v == -inf));
    }

    #[test]
    fn test_thin_grids_have_no_interior() {
        let mut bitmap = RasterBitmap::new(2, 5);
        bitmap.set(0, 2, 255);
        let field = transform(&bitmap);
        let inf = 2f32.hypot(5.0);
        assert_eq!(field.get(0, 2), inf);
        assert_eq!(field.get(1, 2), -inf);

        let empty = transform(&RasterBitmap::new(0, 0));
        assert!(empty.values().is_empty());
    }
}
