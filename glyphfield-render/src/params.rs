//! Uniform block shared with `shaders/sdf.wgsl`.
//!
//! Derives `bytemuck::Pod` + `Zeroable` for zero-copy upload.

use bytemuck::{Pod, Zeroable};

/// Dimensions and encoding parameters of one field job.
///
/// 32 bytes, matching the WGSL `Params` struct field for field.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FieldParams {
    pub src_width: u32,
    pub src_height: u32,
    pub dst_width: u32,
    pub dst_height: u32,
    pub spread: f32,
    /// Source cells per destination cell, horizontally.
    pub scale_x: f32,
    pub scale_y: f32,
    pub _pad: f32,
}

impl FieldParams {
    pub fn new(src: (u32, u32), dst: (u32, u32), spread: f32) -> Self {
        Self {
            src_width: src.0,
            src_height: src.1,
            dst_width: dst.0,
            dst_height: dst.1,
            spread,
            scale_x: src.0 as f32 / dst.0.max(1) as f32,
            scale_y: src.1 as f32 / dst.1.max(1) as f32,
            _pad: 0.0,
        }
    }
}
