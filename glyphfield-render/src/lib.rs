//! # glyphfield-render
//!
//! `wgpu` compute backend for distance-field normalization and
//! resampling.
//!
//! ## Architecture
//!
//! ```text
//! GpuContext (headless Device + Queue)
//!     │
//!     ▼
//! GpuBackend ── normalize_field / resample_field (shaders/sdf.wgsl)
//!     │
//!     ▼
//! FieldBackend::process ──► DistanceField (unit range, target size)
//! ```
//!
//! - **`context`**: headless device setup and [`GpuError`].
//! - **`backend`**: compute pipelines and blocking readback.
//! - **`params`**: the `Pod` uniform block.

pub mod backend;
pub mod context;
pub mod params;

// Re-exports for ergonomic use.
pub use backend::GpuBackend;
pub use context::{GpuContext, GpuError};
pub use params::FieldParams;
