//! # glyphfield-sdf
//!
//! Signed distance fields from binary glyph rasters, plus the CPU
//! reference implementation of [`FieldBackend`](glyphfield_core::FieldBackend).
//!
//! ```text
//! RasterBitmap ──► transform() ──► DistanceField (signed px)
//!                                        │ CpuBackend::process
//!                                        ▼
//!                                  DistanceField (unit range, target size)
//! ```
//!
//! - **`transform`**: dead-reckoning distance transform.
//! - **`cpu`**: scalar normalize and area resample.

pub mod cpu;
pub mod transform;

pub use cpu::{axis_coverage, CpuBackend};
pub use transform::{transform, DeadReckoning};
