//! # glyphfield-core
//!
//! Shared data model for the Glyphfield SDF atlas builder.
//!
//! ```text
//! FontResolver ──► FontHandle(GlyphSource)
//!                        │
//!                        ▼
//!              RasterBitmap + [GlyphDescriptor]      (glyphfield-text)
//!                        │
//!                        ▼
//!                  DistanceField                      (glyphfield-sdf)
//!                        │  FieldBackend::process
//!                        ▼
//!                  AtlasTexture ──► FontAtlas         (glyphfield-atlas)
//! ```
//!
//! - **`atlas`**: finished-atlas types and the cache key.
//! - **`grid`**: build-scoped raster and distance grids.
//! - **`geometry`**: points, boxes and flattened outlines.
//! - **`source`**: collaborator traits implemented by other crates.
//! - **`error`**: the shared [`AtlasError`].

pub mod atlas;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod source;

pub use atlas::{
    AtlasTexture, FontAtlas, FontAtlasDescriptor, FontHandle, GlyphDescriptor, PixelFormat,
};
pub use error::AtlasError;
pub use geometry::{OutlinePath, Point, Rect};
pub use grid::{DistanceField, RasterBitmap, INK_THRESHOLD};
pub use source::{check_spread, encode_distance, FieldBackend, FontResolver, GlyphSource};
