use crate::error::{Error, Result};
use crate::gpu::{
    GpuMaterial, GpuNode, GpuSceneInfo, GpuTriangle, PackedScene, BINDING_MATERIALS, BINDING_NODES,
    BINDING_SCENE_INFO, BINDING_TRIANGLES,
};
use std::borrow::Cow;
use std::mem::size_of;
use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry,
    BindingType, Buffer, BufferBindingType, BufferSize, BufferUsages, Device, DeviceDescriptor,
    ErrorFilter, Instance, PowerPreference, Queue, RequestAdapterOptions, ShaderStages,
};

/// GPU-resident scene storage.
pub struct SceneBuffers {
    pub info: Buffer,
    pub nodes: Buffer,
    pub triangles: Buffer,
    pub materials: Buffer,
}

impl SceneBuffers {
    fn destroy(self) {
        for buffer in [&self.info, &self.nodes, &self.triangles, &self.materials] {
            buffer.destroy();
        }
    }
}

/// Owns the uploaded scene buffers. Each successful [`GpuScene::upload`]
/// replaces the previous buffers, which are released exactly once; a failed
/// upload leaves them untouched.
#[derive(Default)]
pub struct GpuScene {
    buffers: Option<SceneBuffers>,
    info: GpuSceneInfo,
    generation: u64,
}

impl GpuScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(&mut self, device: &Device, packed: &PackedScene) -> Result<()> {
        let limits = device.limits();
        let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        let nodes = storage_contents(packed.node_bytes(), size_of::<GpuNode>());
        let triangles = storage_contents(packed.triangle_bytes(), size_of::<GpuTriangle>());
        let materials = storage_contents(packed.material_bytes(), size_of::<GpuMaterial>());
        for (buffer, bytes) in [
            ("node", &nodes),
            ("triangle", &triangles),
            ("material", &materials),
        ] {
            let size = bytes.len() as u64;
            if size > limit {
                return Err(Error::BufferTooLarge {
                    buffer,
                    size,
                    limit,
                });
            }
        }

        device.push_error_scope(ErrorFilter::OutOfMemory);
        device.push_error_scope(ErrorFilter::Validation);
        let buffers = SceneBuffers {
            info: create_buffer(
                device,
                "Scene Info Buffer",
                bytemuck::bytes_of(&packed.info),
                BufferUsages::UNIFORM,
            ),
            nodes: create_buffer(device, "BVH Node Buffer", &nodes, BufferUsages::STORAGE),
            triangles: create_buffer(device, "Triangle Buffer", &triangles, BufferUsages::STORAGE),
            materials: create_buffer(device, "Material Buffer", &materials, BufferUsages::STORAGE),
        };
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if out_of_memory.is_some() {
            buffers.destroy();
            return Err(Error::OutOfMemory);
        }
        if let Some(e) = validation {
            buffers.destroy();
            return Err(Error::Gpu(e.to_string()));
        }

        self.release();
        self.buffers = Some(buffers);
        self.info = packed.info;
        self.generation += 1;
        log::info!(
            "Uploaded to GPU: {} triangles, {} BVH nodes, {} materials",
            packed.info.triangle_count,
            packed.info.node_count,
            packed.info.material_count
        );
        Ok(())
    }

    /// Destroys the current buffers, if any.
    pub fn release(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            log::debug!("Releasing scene buffers of generation {}", self.generation);
            buffers.destroy();
            self.info = GpuSceneInfo::default();
        }
    }

    pub fn buffers(&self) -> Option<&SceneBuffers> {
        self.buffers.as_ref()
    }

    /// Counts of the uploaded scene; zeroed when nothing is uploaded.
    pub fn info(&self) -> GpuSceneInfo {
        self.info
    }

    /// Bumped by every successful upload; bind groups built for an older
    /// generation must be recreated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn layout_entries() -> [BindGroupLayoutEntry; 4] {
        let storage = |binding, stride: usize| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::COMPUTE,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: BufferSize::new(stride as u64),
            },
            count: None,
        };
        [
            BindGroupLayoutEntry {
                binding: BINDING_SCENE_INFO,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: BufferSize::new(size_of::<GpuSceneInfo>() as u64),
                },
                count: None,
            },
            storage(BINDING_NODES, size_of::<GpuNode>()),
            storage(BINDING_TRIANGLES, size_of::<GpuTriangle>()),
            storage(BINDING_MATERIALS, size_of::<GpuMaterial>()),
        ]
    }

    /// Bind group over the current buffers, for a layout built from
    /// [`GpuScene::layout_entries`].
    pub fn bind_group(&self, device: &Device, layout: &BindGroupLayout) -> Option<BindGroup> {
        let buffers = self.buffers.as_ref()?;
        Some(device.create_bind_group(&BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout,
            entries: &[
                BindGroupEntry {
                    binding: BINDING_SCENE_INFO,
                    resource: buffers.info.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: BINDING_NODES,
                    resource: buffers.nodes.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: BINDING_TRIANGLES,
                    resource: buffers.triangles.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: BINDING_MATERIALS,
                    resource: buffers.materials.as_entire_binding(),
                },
            ],
        }))
    }
}

impl Drop for GpuScene {
    fn drop(&mut self) {
        self.release();
    }
}

/// Requests a device without a surface, for uploads outside a render loop.
/// Returns `None` when no adapter is available.
pub fn headless_device() -> Option<(Device, Queue)> {
    let instance = Instance::default();
    let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
        power_preference: PowerPreference::default(),
        force_fallback_adapter: false,
        compatible_surface: None,
    }))?;
    log::debug!("Using adapter {:?}", adapter.get_info());
    pollster::block_on(adapter.request_device(
        &DeviceDescriptor {
            label: Some("Scene Device"),
            required_limits: adapter.limits(),
            ..Default::default()
        },
        None,
    ))
    .map_err(|e| log::warn!("Failed to create device: {e}"))
    .ok()
}

/// Zero-sized storage bindings are invalid, so empty arrays upload one zeroed
/// element; the counts in the scene info stay authoritative.
fn storage_contents(bytes: &[u8], stride: usize) -> Cow<'_, [u8]> {
    if bytes.is_empty() {
        Cow::Owned(vec![0; stride])
    } else {
        Cow::Borrowed(bytes)
    }
}

fn create_buffer(device: &Device, label: &str, contents: &[u8], usage: BufferUsages) -> Buffer {
    log::debug!("Allocating buffer `{label}`; size={}", contents.len());
    device.create_buffer_init(&BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: usage | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
    })
}
