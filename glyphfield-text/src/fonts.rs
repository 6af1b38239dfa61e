//! font-kit glyph source: system font lookup and outline extraction.
//!
//! A font is loaded once per name through `font-kit` (by registered file
//! path, CSS generic family, or family title), its outlines are recorded
//! in font units, and every later [`FontResolver::resolve`] call for that
//! name just rescales the recorded data.
//!
//! ## Architecture
//!
//! ```text
//! FontKitResolver
//!   ├── files: HashMap<String, PathBuf>          (registered font files)
//!   ├── faces: Mutex<HashMap<String, Arc<FaceData>>>   (loaded once)
//!   └── resolve(name, pt) → FontHandle(FontKitSource { face, scale })
//! ```

use font_kit::family_name::FamilyName;
use font_kit::font::Font;
use font_kit::hinting::HintingOptions;
use font_kit::outline::OutlineSink;
use font_kit::properties::Properties;
use font_kit::source::SystemSource;
use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::Vector2F;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use glyphfield_core::{AtlasError, FontHandle, FontResolver, GlyphSource, OutlinePath, Point, Rect};

/// Stroke estimate as a fraction of the em when a font has no underline metric.
const FALLBACK_STROKE_EM: f32 = 0.06;

// ── Recorded outlines ───────────────────────────────────────────────

/// One outline command in y-down font units.
#[derive(Clone, Copy, Debug, PartialEq)]
enum PathVerb {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

#[derive(Clone, Debug, Default)]
struct FaceGlyph {
    advance: f32,
    /// Ink box in y-down font units, `Rect::ZERO` for blank glyphs.
    bounds: Rect,
    verbs: Vec<PathVerb>,
}

/// Everything the atlas needs from a font, in font units.
#[derive(Debug)]
pub struct FaceData {
    family: String,
    units_per_em: f32,
    ascent: f32,
    descent: f32,
    stroke: f32,
    glyphs: Vec<FaceGlyph>,
}

impl FaceData {
    /// Record metrics and every glyph outline of a loaded font.
    fn extract(font: &Font) -> Self {
        let metrics = font.metrics();
        let units_per_em = metrics.units_per_em as f32;
        let stroke = if metrics.underline_thickness > 0.0 {
            metrics.underline_thickness
        } else {
            units_per_em * FALLBACK_STROKE_EM
        };

        let glyphs = (0..font.glyph_count())
            .map(|id| {
                let mut recorder = VerbRecorder::default();
                if let Err(e) = font.outline(id, HintingOptions::None, &mut recorder) {
                    log::debug!("glyph {id}: no outline ({e:?})");
                    recorder.verbs.clear();
                }
                let has_ink = recorder
                    .verbs
                    .iter()
                    .any(|v| !matches!(v, PathVerb::MoveTo(_) | PathVerb::Close));
                let bounds = match font.typographic_bounds(id) {
                    Ok(r) if has_ink => Rect::new(r.min_x(), -r.max_y(), r.max_x(), -r.min_y()),
                    _ => Rect::ZERO,
                };
                FaceGlyph {
                    advance: font.advance(id).map(|v| v.x()).unwrap_or(0.0),
                    bounds,
                    verbs: recorder.verbs,
                }
            })
            .collect();

        Self {
            family: font.family_name(),
            units_per_em,
            ascent: metrics.ascent,
            descent: metrics.descent.abs(),
            stroke,
            glyphs,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn glyph_count(&self) -> u32 {
        self.glyphs.len() as u32
    }
}

/// Collects font-kit outline callbacks, flipping y to point down.
#[derive(Default)]
struct VerbRecorder {
    verbs: Vec<PathVerb>,
}

fn flip(v: Vector2F) -> Point {
    Point::new(v.x(), -v.y())
}

impl OutlineSink for VerbRecorder {
    fn move_to(&mut self, to: Vector2F) {
        self.verbs.push(PathVerb::MoveTo(flip(to)));
    }

    fn line_to(&mut self, to: Vector2F) {
        self.verbs.push(PathVerb::LineTo(flip(to)));
    }

    fn quadratic_curve_to(&mut self, ctrl: Vector2F, to: Vector2F) {
        self.verbs.push(PathVerb::QuadTo(flip(ctrl), flip(to)));
    }

    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F) {
        self.verbs
            .push(PathVerb::CubicTo(flip(ctrl.from()), flip(ctrl.to()), flip(to)));
    }

    fn close(&mut self) {
        self.verbs.push(PathVerb::Close);
    }
}

// ── Glyph source ────────────────────────────────────────────────────

/// A recorded face at one point size.
pub struct FontKitSource {
    face: Arc<FaceData>,
    scale: f32,
}

impl FontKitSource {
    pub fn new(face: Arc<FaceData>, point_size: f32) -> Self {
        let scale = point_size / face.units_per_em;
        Self { face, scale }
    }

    fn glyph(&self, glyph_id: u32) -> Option<&FaceGlyph> {
        self.face.glyphs.get(glyph_id as usize)
    }
}

impl GlyphSource for FontKitSource {
    fn glyph_count(&self) -> u32 {
        self.face.glyph_count()
    }

    fn bounding_box(&self, glyph_id: u32) -> Rect {
        let s = self.scale;
        self.glyph(glyph_id)
            .map(|g| {
                let b = g.bounds;
                Rect::new(b.min_x * s, b.min_y * s, b.max_x * s, b.max_y * s)
            })
            .unwrap_or(Rect::ZERO)
    }

    fn outline(&self, glyph_id: u32, origin: Point) -> OutlinePath {
        let mut path = OutlinePath::new();
        let Some(glyph) = self.glyph(glyph_id) else {
            return path;
        };
        let s = self.scale;
        let place = |p: Point| Point::new(origin.x + p.x * s, origin.y + p.y * s);
        for verb in &glyph.verbs {
            match *verb {
                PathVerb::MoveTo(p) => path.move_to(place(p)),
                PathVerb::LineTo(p) => path.line_to(place(p)),
                PathVerb::QuadTo(c, p) => path.quad_to(place(c), place(p)),
                PathVerb::CubicTo(c1, c2, p) => path.cubic_to(place(c1), place(c2), place(p)),
                PathVerb::Close => path.close(),
            }
        }
        path
    }

    fn advance(&self, glyph_id: u32) -> f32 {
        self.glyph(glyph_id).map_or(0.0, |g| g.advance * self.scale)
    }

    fn ascent(&self) -> f32 {
        self.face.ascent * self.scale
    }

    fn descent(&self) -> f32 {
        self.face.descent * self.scale
    }

    fn stroke_width_estimate(&self) -> f32 {
        self.face.stroke * self.scale
    }
}

// ── Resolver ────────────────────────────────────────────────────────

/// Resolves fonts through `font-kit`, caching recorded faces by name.
///
/// Names are matched in this order: files registered with
/// [`FontKitResolver::with_file`], CSS generic families (`serif`,
/// `sans-serif`, `monospace`, `cursive`, `fantasy`), then system family
/// titles.
#[derive(Default)]
pub struct FontKitResolver {
    files: HashMap<String, PathBuf>,
    faces: Mutex<HashMap<String, Arc<FaceData>>>,
}

impl FontKitResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `name` from a font file instead of the system source.
    pub fn with_file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(name.into(), path.into());
        self
    }

    /// Sorted family names the system source knows about.
    pub fn system_families() -> Vec<String> {
        let mut names = SystemSource::new().all_families().unwrap_or_default();
        names.sort();
        names
    }

    /// Load (or fetch the recorded) face for `name`.
    pub fn face(&self, name: &str) -> Result<Arc<FaceData>, String> {
        let mut faces = self.faces.lock().map_err(|e| e.to_string())?;
        if let Some(face) = faces.get(name) {
            return Ok(Arc::clone(face));
        }

        let start = Instant::now();
        let font = self.load(name)?;
        let face = Arc::new(FaceData::extract(&font));
        log::info!(
            "Loaded font '{}' as {} ({} glyphs, {:.1}ms)",
            name,
            face.family(),
            face.glyph_count(),
            start.elapsed().as_secs_f64() * 1000.0,
        );
        faces.insert(name.to_string(), Arc::clone(&face));
        Ok(face)
    }

    fn load(&self, name: &str) -> Result<Font, String> {
        if let Some(path) = self.files.get(name) {
            return Font::from_path(path, 0).map_err(|e| format!("{}: {e:?}", path.display()));
        }
        let family = parse_generic(&name.to_lowercase())
            .unwrap_or_else(|| FamilyName::Title(name.to_string()));
        let handle = SystemSource::new()
            .select_best_match(&[family], &Properties::new())
            .map_err(|e| format!("{e:?}"))?;
        handle.load().map_err(|e| format!("{e:?}"))
    }
}

impl FontResolver for FontKitResolver {
    fn resolve(&self, name: &str, point_size: f32) -> Result<FontHandle, AtlasError> {
        if !(point_size.is_finite() && point_size > 0.0) {
            return Err(AtlasError::font_unavailable(name, point_size, "invalid point size"));
        }
        let face = self
            .face(name)
            .map_err(|reason| AtlasError::font_unavailable(name, point_size, reason))?;
        if face.glyph_count() == 0 {
            return Err(AtlasError::font_unavailable(name, point_size, "font has no glyphs"));
        }
        Ok(FontHandle::new(name, point_size, Arc::new(FontKitSource::new(face, point_size))))
    }
}

impl fmt::Debug for FontKitResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaded = self.faces.lock().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("FontKitResolver")
            .field("files", &self.files)
            .field("loaded", &loaded)
            .finish()
    }
}

/// Parse a CSS generic family keyword.
fn parse_generic(name: &str) -> Option<FamilyName> {
    match name {
        "serif" => Some(FamilyName::Serif),
        "sans-serif" => Some(FamilyName::SansSerif),
        "monospace" => Some(FamilyName::Monospace),
        "cursive" => Some(FamilyName::Cursive),
        "fantasy" => Some(FamilyName::Fantasy),
        _ => None,
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generic() {
        assert_eq!(parse_generic("serif"), Some(FamilyName::Serif));
        assert_eq!(parse_generic("sans-serif"), Some(FamilyName::SansSerif));
        assert_eq!(parse_generic("monospace"), Some(FamilyName::Monospace));
        assert_eq!(parse_generic("cursive"), Some(FamilyName::Cursive));
        assert_eq!(parse_generic("fantasy"), Some(FamilyName::Fantasy));
        assert_eq!(parse_generic("arial"), None);
    }

    #[test]
    fn test_recorder_flips_y() {
        let mut rec = VerbRecorder::default();
        rec.move_to(Vector2F::new(1.0, 2.0));
        rec.line_to(Vector2F::new(3.0, -4.0));
        rec.close();
        assert_eq!(
            rec.verbs,
            vec![
                PathVerb::MoveTo(Point::new(1.0, -2.0)),
                PathVerb::LineTo(Point::new(3.0, 4.0)),
                PathVerb::Close,
            ]
        );
    }

    fn square_face() -> Arc<FaceData> {
        Arc::new(FaceData {
            family: "Square".into(),
            units_per_em: 1000.0,
            ascent: 800.0,
            descent: 200.0,
            stroke: 50.0,
            glyphs: vec![
                FaceGlyph::default(),
                FaceGlyph {
                    advance: 600.0,
                    bounds: Rect::new(100.0, -500.0, 500.0, 0.0),
                    verbs: vec![
                        PathVerb::MoveTo(Point::new(100.0, 0.0)),
                        PathVerb::LineTo(Point::new(100.0, -500.0)),
                        PathVerb::LineTo(Point::new(500.0, -500.0)),
                        PathVerb::LineTo(Point::new(500.0, 0.0)),
                        PathVerb::Close,
                    ],
                },
            ],
        })
    }

    #[test]
    fn test_source_scales_to_point_size() {
        let source = FontKitSource::new(square_face(), 20.0);
        assert_eq!(source.glyph_count(), 2);
        assert_eq!(source.ascent(), 16.0);
        assert_eq!(source.descent(), 4.0);
        assert_eq!(source.stroke_width_estimate(), 1.0);
        assert_eq!(source.advance(1), 12.0);
        assert_eq!(source.bounding_box(1), Rect::new(2.0, -10.0, 10.0, 0.0));
        assert_eq!(source.bounding_box(0), Rect::ZERO);
    }

    #[test]
    fn test_source_outline_placed_at_origin() {
        let source = FontKitSource::new(square_face(), 20.0);
        let path = source.outline(1, Point::new(5.0, 30.0));
        assert_eq!(path.bounds(), Some(Rect::new(7.0, 20.0, 15.0, 30.0)));
        assert!(source.outline(0, Point::new(5.0, 30.0)).is_empty());
        assert!(source.outline(99, Point::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_resolve_missing_file_is_unavailable() {
        let resolver = FontKitResolver::new().with_file("Ghost", "/definitely/not/here.ttf");
        let err = resolver.resolve("Ghost", 32.0).unwrap_err();
        assert!(matches!(err, AtlasError::FontUnavailable { .. }));
    }

    #[test]
    fn test_resolve_rejects_bad_point_size() {
        let resolver = FontKitResolver::new();
        assert!(resolver.resolve("sans-serif", 0.0).is_err());
    }

    #[test]
    fn test_resolve_system_sans_serif() {
        // Hosts without any installed fonts cannot resolve; skip gracefully.
        let resolver = FontKitResolver::new();
        if let Ok(handle) = resolver.resolve("sans-serif", 48.0) {
            let source = handle.source();
            assert!(source.glyph_count() > 0);
            assert!(source.ascent() > 0.0);
            assert!(source.stroke_width_estimate() > 0.0);
            // Second resolve reuses the recorded face.
            let again = resolver.resolve("sans-serif", 24.0).unwrap();
            assert_eq!(again.source().glyph_count(), source.glyph_count());
        }
    }
}
