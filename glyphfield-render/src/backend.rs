//! Compute-shader [`FieldBackend`].
//!
//! One shader module, two pipelines sharing one bind group layout:
//!
//! ```text
//!   upload field ──► normalize_field (in place) ──► resample_field ──► readback
//!                    └──────────── one command encoder ─────────────┘
//! ```
//!
//! Every call blocks until the readback is mapped. Validation errors are
//! caught with an error scope and surface as [`AtlasError::Backend`].

use std::sync::mpsc;
use std::time::Instant;

use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, Buffer, BufferBindingType, BufferDescriptor, BufferUsages,
    CommandEncoderDescriptor, ComputePassDescriptor, ComputePipeline, ComputePipelineDescriptor,
    PipelineCompilationOptions, PipelineLayoutDescriptor, ShaderModuleDescriptor, ShaderStages,
};

use glyphfield_core::{check_spread, AtlasError, DistanceField, FieldBackend};

use crate::context::{GpuContext, GpuError};
use crate::params::FieldParams;

/// Matches `@workgroup_size(16, 16, 1)` in the shader.
const WORKGROUP: u32 = 16;

/// Which passes one submission runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Passes {
    Normalize,
    Resample,
    Both,
}

impl Passes {
    fn normalize(self) -> bool {
        matches!(self, Passes::Normalize | Passes::Both)
    }

    fn resample(self) -> bool {
        matches!(self, Passes::Resample | Passes::Both)
    }
}

/// Normalizes and resamples distance fields on the GPU.
pub struct GpuBackend {
    ctx: GpuContext,
    layout: BindGroupLayout,
    normalize: ComputePipeline,
    resample: ComputePipeline,
}

impl GpuBackend {
    /// Open a headless device and compile the field shader.
    pub fn new() -> Result<Self, GpuError> {
        Ok(Self::with_context(GpuContext::new_headless_blocking()?))
    }

    /// Build the pipelines on an existing context.
    pub fn with_context(ctx: GpuContext) -> Self {
        let device = &ctx.device;

        // ── Shader ──────────────────────────────────────────────
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("sdf_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sdf.wgsl").into()),
        });

        // ── Bind group layout: params, field, resampled ─────────
        let storage = |binding| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::COMPUTE,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("sdf_bgl"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::COMPUTE,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(1),
                storage(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("sdf_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        // ── Pipelines ───────────────────────────────────────────
        let pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let normalize = pipeline("sdf_normalize", "normalize_field");
        let resample = pipeline("sdf_resample", "resample_field");

        Self {
            ctx,
            layout,
            normalize,
            resample,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn run(
        &self,
        field: &DistanceField,
        spread: f32,
        dst: (u32, u32),
        passes: Passes,
    ) -> Result<DistanceField, AtlasError> {
        let src = (field.width(), field.height());
        if src.0 == 0 || src.1 == 0 || dst.0 == 0 || dst.1 == 0 {
            return Err(AtlasError::InvalidConfig(format!(
                "cannot process {}×{} to {}×{}",
                src.0, src.1, dst.0, dst.1
            )));
        }
        let field_bytes = std::mem::size_of_val(field.values()) as u64;
        let out_bytes = dst.0 as u64 * dst.1 as u64 * 4;
        let limit = self.ctx.max_storage_bytes();
        if field_bytes > limit || out_bytes > limit {
            return Err(AtlasError::Backend(format!(
                "field of {field_bytes} bytes exceeds the {limit}-byte storage binding limit"
            )));
        }

        let start = Instant::now();
        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        // ── Buffers ─────────────────────────────────────────────
        let params = FieldParams::new(src, dst, spread);
        let params_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("sdf_params"),
            contents: bytemuck::bytes_of(&params),
            usage: BufferUsages::UNIFORM,
        });
        let field_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("sdf_field"),
            contents: bytemuck::cast_slice(field.values()),
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
        });
        let out_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("sdf_resampled"),
            size: out_bytes,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let (result_buffer, result_bytes, result_dims) = if passes.resample() {
            (&out_buffer, out_bytes, dst)
        } else {
            (&field_buffer, field_bytes, src)
        };
        let staging = device.create_buffer(&BufferDescriptor {
            label: Some("sdf_readback"),
            size: result_bytes,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("sdf_bind_group"),
            layout: &self.layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: field_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: out_buffer.as_entire_binding(),
                },
            ],
        });

        // ── Encode ──────────────────────────────────────────────
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("sdf_encoder"),
        });
        if passes.normalize() {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("sdf_normalize_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.normalize);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(src.0.div_ceil(WORKGROUP), src.1.div_ceil(WORKGROUP), 1);
        }
        if passes.resample() {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("sdf_resample_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.resample);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(dst.0.div_ceil(WORKGROUP), dst.1.div_ceil(WORKGROUP), 1);
        }
        encoder.copy_buffer_to_buffer(result_buffer, 0, &staging, 0, result_bytes);
        self.ctx.queue.submit(Some(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(AtlasError::Backend(err.to_string()));
        }

        let values = self.read_back(&staging)?;
        log::debug!(
            "GPU {:?} {}×{} → {}×{} ({:.1}ms)",
            passes,
            src.0,
            src.1,
            result_dims.0,
            result_dims.1,
            start.elapsed().as_secs_f64() * 1000.0,
        );
        DistanceField::from_values(result_dims.0, result_dims.1, values)
    }

    /// Map `staging` and copy its floats out.
    fn read_back(&self, staging: &Buffer) -> Result<Vec<f32>, AtlasError> {
        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.ctx.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| AtlasError::Backend(format!("readback never completed: {e}")))?
            .map_err(|e| AtlasError::Backend(format!("readback failed: {e}")))?;

        let values = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, f32>(&data).to_vec()
        };
        staging.unmap();
        Ok(values)
    }
}

impl FieldBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn normalize(&self, field: &mut DistanceField, spread: f32) -> Result<(), AtlasError> {
        check_spread(spread)?;
        let dims = (field.width(), field.height());
        *field = self.run(field, spread, dims, Passes::Normalize)?;
        Ok(())
    }

    fn resample(
        &self,
        field: &DistanceField,
        width: u32,
        height: u32,
    ) -> Result<DistanceField, AtlasError> {
        self.run(field, 1.0, (width, height), Passes::Resample)
    }

    fn process(
        &self,
        field: DistanceField,
        spread: f32,
        width: u32,
        height: u32,
    ) -> Result<DistanceField, AtlasError> {
        check_spread(spread)?;
        self.run(&field, spread, (width, height), Passes::Both)
    }
}

// ===================================================================
// Tests
// ===================================================================
