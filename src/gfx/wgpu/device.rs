//! wgpu 离屏渲染设备
//!
//! 渲染到一张 `Rgba8UnormSrgb` 颜色纹理和一张 `Depth32Float` 深度纹理，
//! 可以把最后一帧读回并保存为 PNG。
//!
//! 常量缓冲区通过动态偏移绑定：每个 (缓冲区, 绑定大小) 只创建一个
//! Bind Group，每次绘制只改变偏移。

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::mpsc;

use tracing::{debug, info, trace, warn};

use super::context::WgpuContext;
use crate::core::error::{GraphicsError, Result};
use crate::gfx::device::{
    BufferBinding, BufferDescriptor, BufferId, BufferUsage, FramePass, GpuDevice, IndexFormat,
    PipelineKind,
};
use crate::renderer::sync::{FenceManager, FenceValue};
use crate::renderer::upload::CONSTANT_BUFFER_ALIGNMENT;
use crate::renderer::vertex::{ColorVertex, LitVertex};

/// 颜色目标格式
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// 深度目标格式
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

const LIT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

struct RenderTargets {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

impl RenderTargets {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Color Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            color,
            color_view,
            depth_view,
        }
    }
}

struct WgpuBuffer {
    desc: BufferDescriptor,
    raw: wgpu::Buffer,
}

/// wgpu 离屏渲染设备
pub struct WgpuDevice {
    gfx: WgpuContext,
    width: u32,
    height: u32,
    targets: RenderTargets,

    uniform_layout: wgpu::BindGroupLayout,
    color_layout: wgpu::PipelineLayout,
    lit_layout: wgpu::PipelineLayout,
    color_shader: wgpu::ShaderModule,
    lit_shader: wgpu::ShaderModule,
    pipelines: HashMap<(PipelineKind, bool), wgpu::RenderPipeline>,

    buffers: Vec<WgpuBuffer>,
    bind_groups: HashMap<(BufferId, u64), wgpu::BindGroup>,
    fences: FenceManager,
}

impl WgpuDevice {
    /// 创建设备和 `width × height` 的渲染目标
    pub fn new(width: u32, height: u32) -> Result<Self> {
        info!(width, height, "Creating wgpu device");

        let gfx = WgpuContext::new()?;
        if CONSTANT_BUFFER_ALIGNMENT % gfx.uniform_offset_alignment() != 0 {
            return Err(GraphicsError::DeviceCreation(format!(
                "adapter requires {}-byte uniform offsets",
                gfx.uniform_offset_alignment()
            ))
            .into());
        }

        // 1. 加载着色器模块
        debug!("Loading shaders");
        let color_shader = gfx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Color Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/color.wgsl").into()),
        });
        let lit_shader = gfx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/lit.wgsl").into()),
        });

        // 2. 所有常量缓冲区共用一个带动态偏移的布局
        let uniform_layout = gfx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Constant Buffer Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // 3. 管线布局：pass / object (/ material)
        let color_layout = gfx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Color Pipeline Layout"),
                bind_group_layouts: &[&uniform_layout, &uniform_layout],
                push_constant_ranges: &[],
            });
        let lit_layout = gfx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Lit Pipeline Layout"),
                bind_group_layouts: &[&uniform_layout, &uniform_layout, &uniform_layout],
                push_constant_ranges: &[],
            });

        let targets = RenderTargets::new(&gfx.device, width, height);

        info!("wgpu device created successfully");

        Ok(Self {
            gfx,
            width,
            height,
            targets,
            uniform_layout,
            color_layout,
            lit_layout,
            color_shader,
            lit_shader,
            pipelines: HashMap::new(),
            buffers: Vec::new(),
            bind_groups: HashMap::new(),
            fences: FenceManager::new(),
        })
    }

    fn buffer(&self, id: BufferId) -> Result<&WgpuBuffer> {
        self.buffers
            .get(id.index())
            .ok_or_else(|| GraphicsError::InvalidBuffer(format!("unknown buffer {:?}", id)).into())
    }

    fn vertex_stride(kind: PipelineKind) -> u64 {
        match kind {
            PipelineKind::Color => std::mem::size_of::<ColorVertex>() as u64,
            PipelineKind::Lit => std::mem::size_of::<LitVertex>() as u64,
        }
    }

    fn ensure_pipeline(&mut self, kind: PipelineKind, wireframe: bool) {
        let wireframe = wireframe && self.gfx.supports_wireframe;
        if self.pipelines.contains_key(&(kind, wireframe)) {
            return;
        }

        debug!(?kind, wireframe, "Creating render pipeline");
        let (layout, module, attributes) = match kind {
            PipelineKind::Color => (&self.color_layout, &self.color_shader, &COLOR_ATTRIBUTES[..]),
            PipelineKind::Lit => (&self.lit_layout, &self.lit_shader, &LIT_ATTRIBUTES[..]),
        };

        let pipeline = self
            .gfx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(match kind {
                    PipelineKind::Color => "Color Pipeline",
                    PipelineKind::Lit => "Lit Pipeline",
                }),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: "vs_main",
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: Self::vertex_stride(kind),
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes,
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: if wireframe {
                        wgpu::PolygonMode::Line
                    } else {
                        wgpu::PolygonMode::Fill
                    },
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            });

        self.pipelines.insert((kind, wireframe), pipeline);
    }

    fn ensure_bind_group(&mut self, binding: &BufferBinding) -> Result<()> {
        let key = (binding.buffer, binding.size);
        if self.bind_groups.contains_key(&key) {
            return Ok(());
        }

        let buffer = self.buffer(binding.buffer)?;
        if buffer.desc.usage != BufferUsage::Constant {
            return Err(GraphicsError::InvalidBuffer(format!(
                "buffer {:?} bound as constants but created as {:?}",
                binding.buffer, buffer.desc.usage
            ))
            .into());
        }
        let size = NonZeroU64::new(binding.size).ok_or_else(|| {
            GraphicsError::InvalidBuffer(format!("empty binding of buffer {:?}", binding.buffer))
        })?;

        let bind_group = self.gfx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: buffer.desc.label.as_deref(),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer.raw,
                    offset: 0,
                    size: Some(size),
                }),
            }],
        });

        self.bind_groups.insert(key, bind_group);
        Ok(())
    }

    fn bind_group(&self, binding: &BufferBinding) -> Result<&wgpu::BindGroup> {
        self.bind_groups
            .get(&(binding.buffer, binding.size))
            .ok_or_else(|| {
                GraphicsError::CommandExecution(format!(
                    "no bind group for buffer {:?}",
                    binding.buffer
                ))
                .into()
            })
    }

    fn dynamic_offset(binding: &BufferBinding) -> Result<u32> {
        if binding.offset % CONSTANT_BUFFER_ALIGNMENT != 0 {
            return Err(GraphicsError::CommandExecution(format!(
                "constant offset {} is not {}-byte aligned",
                binding.offset, CONSTANT_BUFFER_ALIGNMENT
            ))
            .into());
        }
        u32::try_from(binding.offset).map_err(|_| {
            GraphicsError::CommandExecution(format!("constant offset {} too large", binding.offset))
                .into()
        })
    }

    fn poll(&self) -> Result<()> {
        let _ = self.gfx.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}

impl GpuDevice for WgpuDevice {
    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<BufferId> {
        if desc.size == 0 {
            return Err(GraphicsError::ResourceCreation(format!(
                "buffer '{}' has zero size",
                desc.label.as_deref().unwrap_or("unnamed")
            ))
            .into());
        }

        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Constant => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        // 复制操作要求 4 字节对齐
        let size = desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let raw = self.gfx.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label.as_deref(),
            size,
            usage,
            mapped_at_creation: false,
        });

        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(WgpuBuffer {
            desc: desc.clone(),
            raw,
        });
        trace!(?id, size, usage = ?desc.usage, "Buffer created");
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let target = self.buffer(buffer)?;
        let end = offset + data.len() as u64;
        if end > target.desc.size {
            return Err(GraphicsError::InvalidBuffer(format!(
                "write {}..{} exceeds buffer of {} bytes",
                offset, end, target.desc.size
            ))
            .into());
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GraphicsError::InvalidBuffer(format!(
                "write offset {} is not 4-byte aligned",
                offset
            ))
            .into());
        }

        if data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            self.gfx.queue.write_buffer(&target.raw, offset, data);
        } else {
            // 例如奇数个 16 位索引；缓冲区创建时已向上取整，补零写入不会越界
            let mut padded = data.to_vec();
            padded.resize(
                (data.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize,
                0,
            );
            self.gfx.queue.write_buffer(&target.raw, offset, &padded);
        }
        Ok(())
    }

    fn submit(&mut self, pass: &FramePass) -> Result<FenceValue> {
        // 1. 准备管线和 Bind Group（渲染通道期间不能再修改缓存）
        self.ensure_bind_group(&pass.pass_constants)?;
        for draw in &pass.draws {
            if draw.vertex_stride != Self::vertex_stride(draw.pipeline) {
                return Err(GraphicsError::CommandExecution(format!(
                    "{:?} pipeline expects {}-byte vertices, got {}",
                    draw.pipeline,
                    Self::vertex_stride(draw.pipeline),
                    draw.vertex_stride
                ))
                .into());
            }
            if draw.pipeline == PipelineKind::Lit && draw.material_constants.is_none() {
                return Err(GraphicsError::CommandExecution(
                    "lit draw without material constants".to_string(),
                )
                .into());
            }

            self.ensure_pipeline(draw.pipeline, pass.wireframe);
            self.ensure_bind_group(&draw.object_constants)?;
            if let Some(material) = &draw.material_constants {
                self.ensure_bind_group(material)?;
            }
        }

        // 2. 录制命令
        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let [r, g, b, a] = pass.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(
                0,
                self.bind_group(&pass.pass_constants)?,
                &[Self::dynamic_offset(&pass.pass_constants)?],
            );

            let wireframe = pass.wireframe && self.gfx.supports_wireframe;
            for draw in &pass.draws {
                let pipeline = self.pipelines.get(&(draw.pipeline, wireframe)).ok_or_else(|| {
                    GraphicsError::CommandExecution(format!("missing {:?} pipeline", draw.pipeline))
                })?;
                render_pass.set_pipeline(pipeline);

                render_pass.set_bind_group(
                    1,
                    self.bind_group(&draw.object_constants)?,
                    &[Self::dynamic_offset(&draw.object_constants)?],
                );
                if let Some(material) = &draw.material_constants {
                    render_pass.set_bind_group(
                        2,
                        self.bind_group(material)?,
                        &[Self::dynamic_offset(material)?],
                    );
                }

                render_pass.set_vertex_buffer(0, self.buffer(draw.vertex_buffer)?.raw.slice(..));
                let format = match draw.index_format {
                    IndexFormat::U16 => wgpu::IndexFormat::Uint16,
                    IndexFormat::U32 => wgpu::IndexFormat::Uint32,
                };
                render_pass.set_index_buffer(self.buffer(draw.index_buffer)?.raw.slice(..), format);
                render_pass.draw_indexed(
                    draw.start_index..draw.start_index + draw.index_count,
                    draw.base_vertex,
                    0..1,
                );
            }
        }

        // 3. 提交并在完成回调里发布 Fence 值
        self.gfx.queue.submit(Some(encoder.finish()));

        let fence = self.fences.next_value();
        let completed = self.fences.completion_handle();
        self.gfx.queue.on_submitted_work_done(move || {
            completed.fetch_max(fence.value(), Ordering::AcqRel);
        });

        trace!(fence = fence.value(), draws = pass.draws.len(), "Frame submitted");
        Ok(fence)
    }

    fn last_submitted_fence(&self) -> FenceValue {
        self.fences.current_value()
    }

    fn completed_fence(&self) -> FenceValue {
        // 推动回调执行，但不阻塞
        let _ = self.gfx.device.poll(wgpu::Maintain::Poll);
        self.fences.completed_value()
    }

    fn wait_for_fence(&mut self, fence: FenceValue) -> Result<()> {
        if fence > self.fences.current_value() {
            return Err(GraphicsError::CommandExecution(format!(
                "waiting for fence {} that was never submitted",
                fence.value()
            ))
            .into());
        }
        self.fences.wait_for_value(fence, || self.poll())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::ResourceCreation(format!(
                "invalid render target size {}x{}",
                width, height
            ))
            .into());
        }

        self.flush()?;
        self.targets = RenderTargets::new(&self.gfx.device, width, height);
        self.width = width;
        self.height = height;
        debug!(width, height, "Render targets resized");
        Ok(())
    }

    fn capture_frame(&mut self, path: &Path) -> Result<()> {
        self.flush()?;

        let (width, height) = (self.width, self.height);
        let unpadded = width * 4;
        let padded = unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let readback = self.gfx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.targets.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gfx.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.gfx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| GraphicsError::Readback(format!("map callback dropped: {}", e)))?
            .map_err(|e| GraphicsError::Readback(format!("map failed: {}", e)))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        readback.unmap();

        let image = image::RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            GraphicsError::Readback(format!("pixel buffer does not match {}x{}", width, height))
        })?;
        image
            .save(path)
            .map_err(|e| GraphicsError::Readback(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), width, height, "Frame captured");
        Ok(())
    }
}

impl Drop for WgpuDevice {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush GPU before drop: {}", e);
        }
    }
}
