//! # glyphfield-atlas
//!
//! Builds signed-distance-field font atlases and caches them for the
//! life of the process.
//!
//! ## Architecture
//!
//! ```text
//! AtlasCache::get(descriptor)
//!     │ hit ─────────────────────────────► Arc<FontAtlas>
//!     │ miss, bundled descriptor ──► glyphfield_store::decode
//!     │ miss ──► AtlasBuilder::build
//!     │            resolve → pack → transform → FieldBackend::process
//!     ▼
//! Arc<FontAtlas> (shared, immutable)
//! ```
//!
//! - **`pipeline`**: [`AtlasBuilder`] and [`AtlasConfig`].
//! - **`cache`**: [`AtlasCache`], at most one build per descriptor.

pub mod cache;
pub mod pipeline;

// Re-exports for ergonomic use.
pub use cache::{AtlasCache, BundledAtlas, CacheConfig, CacheStats};
pub use pipeline::{fitted_point_size, margin_for_spread, AtlasBuilder, AtlasConfig};
