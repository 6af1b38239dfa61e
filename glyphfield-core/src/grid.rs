//! Build-scoped pixel grids: the binary glyph raster and the distance
//! field derived from it.

use crate::error::AtlasError;

/// Bitmap values above this are "inside glyph ink".
pub const INK_THRESHOLD: u8 = 127;

/// `W×H` single-byte grayscale raster, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBitmap {
    /// All-zero ("no ink") bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap existing row-major pixel data.
    pub fn from_pixels(width: u32, height: u32, data: Vec<u8>) -> Result<Self, AtlasError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(AtlasError::InvalidConfig(format!(
                "bitmap {width}×{height} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    /// Whether the pixel counts as glyph ink.
    pub fn is_inside(&self, x: u32, y: u32) -> bool {
        self.get(x, y) > INK_THRESHOLD
    }

    /// Number of ink pixels.
    pub fn ink_count(&self) -> usize {
        self.data.iter().filter(|&&v| v > INK_THRESHOLD).count()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y as usize * self.width as usize + x as usize
    }
}

/// `W×H` grid of `f32` values, row-major.
///
/// Straight out of the distance transform it holds signed pixel
/// distances (positive inside, negative outside). After a field backend
/// normalizes it the values are in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceField {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DistanceField {
    /// Field with every value set to `fill`.
    pub fn filled(width: u32, height: u32, fill: f32) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width as usize * height as usize],
        }
    }

    pub fn from_values(width: u32, height: u32, data: Vec<f32>) -> Result<Self, AtlasError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(AtlasError::InvalidConfig(format!(
                "field {width}×{height} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_values(self) -> Vec<f32> {
        self.data
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Quantize unit-range values to bytes (`round(v × 255)`).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}
