//! # glyphfield-text
//!
//! Glyph sources and the shelf packer that lays a whole font into one
//! binary raster.
//!
//! ## Architecture
//!
//! ```text
//! FontKitResolver / SyntheticResolver
//!     │ resolve(name, pt)
//!     ▼
//! FontHandle(GlyphSource) ──► pack(source, w, h, margin)
//!                                 │   fill_path per glyph
//!                                 ▼
//!                 RasterBitmap + Vec<GlyphDescriptor>
//! ```
//!
//! - **`fonts`**: system and file fonts through `font-kit`.
//! - **`synthetic`**: rectangle fonts for tests and benchmarks.
//! - **`packer`**: shelf placement of every glyph.
//! - **`raster`**: nonzero scanline fill of outlines.

pub mod fonts;
pub mod packer;
pub mod raster;
pub mod synthetic;

// Re-exports for ergonomic use.
pub use fonts::{FaceData, FontKitResolver, FontKitSource};
pub use packer::{pack, ShelfCursor, ShelfLayout};
pub use raster::{fill_path, INK};
pub use synthetic::{BlockFont, SyntheticResolver};
