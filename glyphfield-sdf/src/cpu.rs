//! Reference [`FieldBackend`] running on the calling thread.

use glyphfield_core::{check_spread, encode_distance, AtlasError, DistanceField, FieldBackend};

/// Scalar normalize and box-filter resample.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Source spans covered by each destination cell along one axis, as
/// `(source index, covered length)` pairs. Lengths of one cell sum to
/// `src / dst`.
pub fn axis_coverage(src: u32, dst: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|i| {
            let start = i as f64 * scale;
            let end = (i as f64 + 1.0) * scale;
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src);
            (first..last)
                .filter_map(|s| {
                    let covered = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (covered > 0.0).then_some((s as usize, covered as f32))
                })
                .collect()
        })
        .collect()
}

impl FieldBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn normalize(&self, field: &mut DistanceField, spread: f32) -> Result<(), AtlasError> {
        check_spread(spread)?;
        for v in field.values_mut() {
            *v = encode_distance(*v, spread);
        }
        Ok(())
    }

    fn resample(
        &self,
        field: &DistanceField,
        width: u32,
        height: u32,
    ) -> Result<DistanceField, AtlasError> {
        if width == 0 || height == 0 || field.width() == 0 || field.height() == 0 {
            return Err(AtlasError::InvalidConfig(format!(
                "cannot resample {}×{} to {width}×{height}",
                field.width(),
                field.height()
            )));
        }
        if (width, height) == (field.width(), field.height()) {
            return Ok(field.clone());
        }

        let cols = axis_coverage(field.width(), width);
        let rows = axis_coverage(field.height(), height);
        let area = (field.width() as f32 / width as f32) * (field.height() as f32 / height as f32);
        let src = field.values();
        let stride = field.width() as usize;

        let mut out = DistanceField::filled(width, height, 0.0);
        let dst = out.values_mut();
        for (oy, row_spans) in rows.iter().enumerate() {
            for (ox, col_spans) in cols.iter().enumerate() {
                let mut sum = 0.0;
                for &(sy, wy) in row_spans {
                    let line = &src[sy * stride..(sy + 1) * stride];
                    for &(sx, wx) in col_spans {
                        sum += line[sx] * wx * wy;
                    }
                }
                dst[oy * width as usize + ox] = sum / area;
            }
        }
        Ok(out)
    }
}

// ===================================================================
// Tests
// ===================================================================
