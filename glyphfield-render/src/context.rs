//! GPU context: owns a headless `wgpu::Device` and `Queue`.
//!
//! Atlas builds never present anything, so there is no surface: the
//! context is only a compute device plus the adapter description for logs.

use glyphfield_core::AtlasError;
use thiserror::Error;
use wgpu::{
    Adapter, Device, DeviceDescriptor, Instance, InstanceDescriptor, Queue,
    RequestAdapterOptions,
};

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

impl From<GpuError> for AtlasError {
    fn from(err: GpuError) -> Self {
        AtlasError::Backend(err.to_string())
    }
}

/// Compute device shared by the field passes.
pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub adapter: Adapter,
}

impl GpuContext {
    /// Create a headless context (no window, no surface).
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = Instance::new(&InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("glyphfield-headless"),
                    required_limits: adapter.limits(),
                    ..Default::default()
                },
                None,
            )
            .await?;

        log::info!("GPU adapter: {}", adapter_label(&adapter));

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }

    /// Blocking [`new_headless`](Self::new_headless).
    pub fn new_headless_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new_headless())
    }

    /// `"name (backend)"` of the adapter in use.
    pub fn adapter_name(&self) -> String {
        adapter_label(&self.adapter)
    }

    /// Largest storage buffer a single binding may cover.
    pub fn max_storage_bytes(&self) -> u64 {
        self.device.limits().max_storage_buffer_binding_size as u64
    }
}

fn adapter_label(adapter: &Adapter) -> String {
    let info = adapter.get_info();
    format!("{} ({:?})", info.name, info.backend)
}

// ===================================================================
// Tests
// ===================================================================
