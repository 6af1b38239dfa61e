//! Atlas builder: font resolution through to the quantized texture.
//!
//! ```text
//! FontAtlasDescriptor
//!   │ resolve (probe)            → glyph count
//!   │ resolve (fitted size)      → FontHandle
//!   │ pack                       → RasterBitmap + descriptors   (canvas px)
//!   │ transform                  → DistanceField (signed px)
//!   │ backend.process            → DistanceField (unit, texture px)
//!   ▼ quantize                   → AtlasTexture (R8) → FontAtlas
//! ```
//!
//! The canvas is `oversample` times the texture on each side so the
//! binary raster has enough resolution for the distance transform.

use std::sync::Arc;
use std::time::Instant;

use glyphfield_core::{
    AtlasError, AtlasTexture, FieldBackend, FontAtlas, FontAtlasDescriptor, FontHandle,
    FontResolver, PixelFormat,
};
use glyphfield_sdf::transform;
use glyphfield_text::pack;

/// Fraction an auto-fitted point size shrinks by when the glyphs do not fit.
const SHRINK: f32 = 0.85;
/// Auto-fit attempts before giving up with `GlyphTooLarge`.
const FIT_ATTEMPTS: u32 = 4;
/// Smallest packing margin in canvas pixels.
const MIN_MARGIN: u32 = 2;

/// Build parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasConfig {
    /// Canvas pixels per texture pixel, per axis. Default: 4.
    pub oversample: u32,
    /// Packing margin in canvas pixels. Default: derived from the spread.
    pub margin: Option<u32>,
    /// Fixed raster point size. Default: fitted to the glyph count.
    pub point_size: Option<f32>,
    /// Share of a grid cell a fitted glyph may take. Default: 0.75.
    pub fill_ratio: f32,
    /// Spread as a multiple of the font's stroke width. Default: 1.5.
    pub spread_factor: f32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            oversample: 4,
            margin: None,
            point_size: None,
            fill_ratio: 0.75,
            spread_factor: 1.5,
        }
    }
}

impl AtlasConfig {
    /// Config for testing (no oversampling, fast builds).
    pub fn for_testing() -> Self {
        Self {
            oversample: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AtlasError> {
        let problem = if self.oversample == 0 {
            Some("oversample must be at least 1".to_string())
        } else if self.margin == Some(0) {
            Some("margin must be > 0".to_string())
        } else if self.point_size.is_some_and(|p| !(p.is_finite() && p > 0.0)) {
            Some(format!("point size must be positive, got {:?}", self.point_size))
        } else if !(self.fill_ratio > 0.0 && self.fill_ratio <= 1.0) {
            Some(format!("fill ratio must be in (0, 1], got {}", self.fill_ratio))
        } else if !(self.spread_factor.is_finite() && self.spread_factor > 0.0) {
            Some(format!("spread factor must be positive, got {}", self.spread_factor))
        } else {
            None
        };
        problem.map_or(Ok(()), |p| Err(AtlasError::InvalidConfig(p)))
    }
}

/// Point size that fits `glyph_count` glyphs on a square grid of `canvas`.
pub fn fitted_point_size(canvas: u32, glyph_count: u32, fill_ratio: f32) -> f32 {
    let per_row = (glyph_count.max(1) as f32).sqrt().ceil();
    canvas as f32 / per_row * fill_ratio
}

/// Packing margin that keeps neighbouring fields from bleeding together.
pub fn margin_for_spread(spread: f32) -> u32 {
    ((2.0 * spread).ceil() as u32).max(MIN_MARGIN)
}

/// Runs the build pipeline for one descriptor at a time.
///
/// Shared freely across threads; every build works on private
/// intermediates.
pub struct AtlasBuilder {
    resolver: Arc<dyn FontResolver>,
    backend: Arc<dyn FieldBackend>,
    config: AtlasConfig,
}

impl AtlasBuilder {
    pub fn new(
        resolver: Arc<dyn FontResolver>,
        backend: Arc<dyn FieldBackend>,
        config: AtlasConfig,
    ) -> Self {
        Self {
            resolver,
            backend,
            config,
        }
    }

    pub fn resolver(&self) -> &dyn FontResolver {
        self.resolver.as_ref()
    }

    pub fn backend(&self) -> &dyn FieldBackend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Build the atlas `descriptor` asks for.
    pub fn build(&self, descriptor: &FontAtlasDescriptor) -> Result<FontAtlas, AtlasError> {
        self.config.validate()?;
        let size = descriptor.texture_size;
        if size == 0 {
            return Err(AtlasError::InvalidConfig("texture size must be > 0".into()));
        }
        let canvas = size.checked_mul(self.config.oversample).ok_or_else(|| {
            AtlasError::InvalidConfig(format!(
                "canvas {size}×{} overflows",
                self.config.oversample
            ))
        })?;

        let start = Instant::now();
        let name = descriptor.font_name.as_str();

        let mut point_size = match self.config.point_size {
            Some(fixed) => fixed,
            None => {
                let probe = self.resolver.resolve(name, canvas as f32)?;
                let count = probe.source().glyph_count();
                let fitted = fitted_point_size(canvas, count, self.config.fill_ratio);
                log::debug!("Fitted {count} glyphs of '{name}' on {canvas}px: {fitted:.2}pt");
                fitted
            }
        };

        let mut attempt = 1;
        let atlas = loop {
            match self.build_at(descriptor, canvas, point_size) {
                Err(AtlasError::GlyphTooLarge { glyph_id, .. })
                    if self.config.point_size.is_none() && attempt < FIT_ATTEMPTS =>
                {
                    log::debug!(
                        "Glyph {glyph_id} of '{name}' does not fit at {point_size:.2}pt; shrinking"
                    );
                    point_size *= SHRINK;
                    attempt += 1;
                }
                result => break result?,
            }
        };

        log::info!(
            "Built atlas {} ({} glyphs at {:.1}pt, {} backend, {:.1}ms)",
            descriptor,
            atlas.glyphs().len(),
            point_size,
            self.backend.name(),
            start.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(atlas)
    }

    fn build_at(
        &self,
        descriptor: &FontAtlasDescriptor,
        canvas: u32,
        point_size: f32,
    ) -> Result<FontAtlas, AtlasError> {
        let size = descriptor.texture_size;
        let font: FontHandle = self.resolver.resolve(&descriptor.font_name, point_size)?;
        let source = font.source();

        let spread = source.stroke_width_estimate() * self.config.spread_factor;
        let margin = self.config.margin.unwrap_or_else(|| margin_for_spread(spread));

        let stage = Instant::now();
        let (bitmap, glyphs) = pack(source, canvas, canvas, margin)?;
        log::debug!("  pack: {:.1}ms (margin {margin})", ms(stage));

        let stage = Instant::now();
        let field = transform(&bitmap);
        drop(bitmap);
        log::debug!("  transform: {:.1}ms", ms(stage));

        let stage = Instant::now();
        let field = self.backend.process(field, spread, size, size)?;
        log::debug!(
            "  {} process: {:.1}ms (spread {spread:.2})",
            self.backend.name(),
            ms(stage)
        );

        let texture = AtlasTexture::new(size, size, PixelFormat::R8, field.to_bytes())?;
        FontAtlas::new(font, glyphs, texture)
    }
}

impl std::fmt::Debug for AtlasBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasBuilder")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

fn ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glyphfield_sdf::CpuBackend;
    use glyphfield_text::{BlockFont, SyntheticResolver};

    fn builder(config: AtlasConfig) -> AtlasBuilder {
        let resolver = SyntheticResolver::new().with_font("Blocks", BlockFont::sample(20, 1.0));
        AtlasBuilder::new(Arc::new(resolver), Arc::new(CpuBackend), config)
    }

    #[test]
    fn test_config_defaults() {
        let config = AtlasConfig::default();
        assert_eq!(config.oversample, 4);
        assert_eq!(config.margin, None);
        assert_eq!(config.point_size, None);
        assert_eq!(config.fill_ratio, 0.75);
        assert_eq!(config.spread_factor, 1.5);
        assert!(config.validate().is_ok());
        assert!(AtlasConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad = [
            AtlasConfig { oversample: 0, ..AtlasConfig::default() },
            AtlasConfig { margin: Some(0), ..AtlasConfig::default() },
            AtlasConfig { point_size: Some(-2.0), ..AtlasConfig::default() },
            AtlasConfig { fill_ratio: 1.5, ..AtlasConfig::default() },
            AtlasConfig { spread_factor: 0.0, ..AtlasConfig::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(AtlasError::InvalidConfig(_))), "{config:?}");
        }
    }

    #[test]
    fn test_fitted_point_size() {
        // 100 glyphs: 10 per row on a 1000px canvas.
        assert_eq!(fitted_point_size(1000, 100, 0.75), 75.0);
        assert_eq!(fitted_point_size(1000, 101, 1.0), 1000.0 / 11.0);
        assert_eq!(fitted_point_size(64, 0, 1.0), 64.0);
    }

    #[test]
    fn test_margin_for_spread() {
        assert_eq!(margin_for_spread(0.1), 2);
        assert_eq!(margin_for_spread(3.2), 7);
    }

    #[test]
    fn test_build_produces_r8_texture() {
        let atlas = builder(AtlasConfig::for_testing())
            .build(&FontAtlasDescriptor::new("Blocks", 128))
            .unwrap();
        assert_eq!(atlas.glyphs().len(), 20);
        assert_eq!(atlas.texture().format, PixelFormat::R8);
        assert_eq!((atlas.texture().width, atlas.texture().height), (128, 128));
        assert_eq!(atlas.texture().bytes.len(), 128 * 128);
        assert_eq!(atlas.atlas_descriptor(), FontAtlasDescriptor::new("Blocks", 128));
        // Ink somewhere, background somewhere.
        assert!(atlas.texture().bytes.iter().any(|&b| b > 128));
        assert!(atlas.texture().bytes.contains(&0));
    }

    #[test]
    fn test_glyph_centres_sample_inside() {
        let atlas = builder(AtlasConfig::for_testing())
            .build(&FontAtlasDescriptor::new("Blocks", 128))
            .unwrap();
        let tex = atlas.texture();
        for g in atlas.glyphs().iter().filter(|g| !g.is_empty()) {
            let u = (g.top_left.0 + g.bottom_right.0) / 2.0;
            let v = (g.top_left.1 + g.bottom_right.1) / 2.0;
            let x = (u * tex.width as f32) as usize;
            let y = (v * tex.height as f32) as usize;
            assert!(tex.bytes[y * tex.width as usize + x] > 127, "glyph {}", g.glyph_id);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let b = builder(AtlasConfig::for_testing());
        let desc = FontAtlasDescriptor::new("Blocks", 96);
        assert_eq!(b.build(&desc).unwrap(), b.build(&desc).unwrap());
    }

    #[test]
    fn test_oversampled_build() {
        let config = AtlasConfig {
            oversample: 2,
            ..AtlasConfig::default()
        };
        let atlas = builder(config).build(&FontAtlasDescriptor::new("Blocks", 64)).unwrap();
        assert_eq!(atlas.texture().bytes.len(), 64 * 64);
        // Descriptors are canvas-relative, so they stay in the unit square.
        for g in atlas.glyphs() {
            assert!(g.bottom_right.0 <= 1.0 && g.bottom_right.1 <= 1.0);
        }
    }

    #[test]
    fn test_fixed_point_size_too_large() {
        let config = AtlasConfig {
            point_size: Some(200.0),
            ..AtlasConfig::for_testing()
        };
        let err = builder(config).build(&FontAtlasDescriptor::new("Blocks", 64)).unwrap_err();
        assert!(matches!(err, AtlasError::GlyphTooLarge { .. }));
    }

    #[test]
    fn test_unknown_font() {
        let err = builder(AtlasConfig::for_testing())
            .build(&FontAtlasDescriptor::new("Nope", 64))
            .unwrap_err();
        assert!(matches!(err, AtlasError::FontUnavailable { .. }));
    }

    #[test]
    fn test_zero_texture_size() {
        let err = builder(AtlasConfig::for_testing())
            .build(&FontAtlasDescriptor::new("Blocks", 0))
            .unwrap_err();
        assert!(matches!(err, AtlasError::InvalidConfig(_)));
    }
}
