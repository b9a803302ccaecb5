//! 渲染项、网格几何体和材质
//!
//! 渲染项是绘制一个物体所需的轻量参数集合：world 矩阵、常量缓冲区索引、
//! 使用哪块几何体的哪个子网格。物体数据改变时把 `num_frames_dirty`
//! 设为帧资源数量，让环中每个槽位的常量缓冲区都得到更新。

use std::collections::HashMap;

use bytemuck::Pod;

use crate::core::error::{GraphicsError, Result};
use crate::geometry::{MeshData, Submesh};
use crate::gfx::device::{
    BufferDescriptor, BufferId, BufferUsage, DrawCommand, GpuDevice, IndexFormat, PipelineKind,
};
use crate::math::Matrix4;

use super::constants::{MaterialConstants, ObjectConstants};
use super::frame::FrameResource;

/// 顶点来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSource {
    /// 初始化时上传、之后不变的缓冲区
    Static(BufferId),
    /// 每帧写入当前帧资源的波浪顶点缓冲区
    Dynamic,
}

/// 一块几何体：顶点缓冲区 + 索引缓冲区 + 命名的子网格
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    pub name: String,
    pub vertices: VertexSource,
    pub vertex_stride: u64,
    pub index_buffer: BufferId,
    pub index_format: IndexFormat,
    pub index_count: u32,
    pub draw_args: HashMap<String, Submesh>,
}

impl MeshGeometry {
    /// 上传静态顶点和索引
    ///
    /// 顶点数不超过 65536 时使用 16 位索引。
    pub fn upload<V: Pod, D: GpuDevice + ?Sized>(
        device: &mut D,
        name: &str,
        vertices: &[V],
        indices: &[u32],
    ) -> Result<Self> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let vb = device.create_buffer(
            &BufferDescriptor::new(vertex_bytes.len() as u64, BufferUsage::Vertex)
                .with_label(format!("{}.vertices", name)),
        )?;
        device.write_buffer(vb, 0, vertex_bytes)?;

        let mut geometry = Self::with_index_buffer(device, name, vertices.len(), indices)?;
        geometry.vertices = VertexSource::Static(vb);
        geometry.vertex_stride = std::mem::size_of::<V>() as u64;
        Ok(geometry)
    }

    /// 只上传索引，顶点每帧从当前帧资源读取
    pub fn upload_dynamic<V: Pod, D: GpuDevice + ?Sized>(
        device: &mut D,
        name: &str,
        vertex_count: usize,
        indices: &[u32],
    ) -> Result<Self> {
        let mut geometry = Self::with_index_buffer(device, name, vertex_count, indices)?;
        geometry.vertex_stride = std::mem::size_of::<V>() as u64;
        Ok(geometry)
    }

    fn with_index_buffer<D: GpuDevice + ?Sized>(
        device: &mut D,
        name: &str,
        vertex_count: usize,
        indices: &[u32],
    ) -> Result<Self> {
        if indices.is_empty() {
            return Err(GraphicsError::ResourceCreation(format!(
                "geometry '{}' has no indices",
                name
            ))
            .into());
        }

        let small: Option<Vec<u16>> = if vertex_count <= u16::MAX as usize + 1 {
            indices.iter().map(|&i| u16::try_from(i).ok()).collect()
        } else {
            None
        };

        let (bytes, index_format): (Vec<u8>, IndexFormat) = match small {
            Some(indices16) => (bytemuck::cast_slice(&indices16).to_vec(), IndexFormat::U16),
            None => (bytemuck::cast_slice(indices).to_vec(), IndexFormat::U32),
        };

        let ib = device.create_buffer(
            &BufferDescriptor::new(bytes.len() as u64, BufferUsage::Index)
                .with_label(format!("{}.indices", name)),
        )?;
        device.write_buffer(ib, 0, &bytes)?;

        Ok(Self {
            name: name.to_string(),
            vertices: VertexSource::Dynamic,
            vertex_stride: 0,
            index_buffer: ib,
            index_format,
            index_count: indices.len() as u32,
            draw_args: HashMap::new(),
        })
    }

    /// 添加子网格
    pub fn with_submesh(mut self, name: impl Into<String>, submesh: Submesh) -> Self {
        self.draw_args.insert(name.into(), submesh);
        self
    }

    /// 整块几何体作为一个子网格
    pub fn whole(&self) -> Submesh {
        Submesh::new(self.index_count, 0, 0)
    }

    pub fn submesh(&self, name: &str) -> Result<Submesh> {
        self.draw_args.get(name).copied().ok_or_else(|| {
            GraphicsError::InvalidBuffer(format!(
                "geometry '{}' has no submesh '{}'",
                self.name, name
            ))
            .into()
        })
    }
}

/// 上传网格：把生成器顶点转换为 `V` 后调用 [`MeshGeometry::upload`]
pub fn upload_mesh<V, D, F>(device: &mut D, mesh: &MeshData, name: &str, convert: F) -> Result<MeshGeometry>
where
    V: Pod,
    D: GpuDevice + ?Sized,
    F: Fn(&crate::geometry::Vertex) -> V,
{
    let vertices: Vec<V> = mesh.vertices.iter().map(convert).collect();
    MeshGeometry::upload(device, name, &vertices, &mesh.indices)
}

/// 材质
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// 在材质常量缓冲区中的索引
    pub cb_index: usize,
    pub num_frames_dirty: usize,
    pub diffuse_albedo: [f32; 4],
    pub fresnel_r0: [f32; 3],
    pub roughness: f32,
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        cb_index: usize,
        frame_resources: usize,
        diffuse_albedo: [f32; 4],
        fresnel_r0: [f32; 3],
        roughness: f32,
    ) -> Self {
        Self {
            name: name.into(),
            cb_index,
            num_frames_dirty: frame_resources,
            diffuse_albedo,
            fresnel_r0,
            roughness,
        }
    }

    pub fn constants(&self) -> MaterialConstants {
        MaterialConstants {
            diffuse_albedo: self.diffuse_albedo,
            fresnel_r0: self.fresnel_r0,
            roughness: self.roughness,
            ..MaterialConstants::default()
        }
    }
}

/// 渲染项
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub world: Matrix4,
    /// 还有多少个帧资源的物体常量需要更新
    pub num_frames_dirty: usize,
    /// 在物体常量缓冲区中的索引
    pub object_cb_index: usize,
    /// 几何体名称
    pub geometry: String,
    pub submesh: Submesh,
    pub pipeline: PipelineKind,
    /// 在材质列表中的索引
    pub material: Option<usize>,
}

impl RenderItem {
    pub fn new(
        geometry: impl Into<String>,
        submesh: Submesh,
        object_cb_index: usize,
        frame_resources: usize,
    ) -> Self {
        Self {
            world: Matrix4::identity(),
            num_frames_dirty: frame_resources,
            object_cb_index,
            geometry: geometry.into(),
            submesh,
            pipeline: PipelineKind::Color,
            material: None,
        }
    }

    pub fn with_world(mut self, world: Matrix4) -> Self {
        self.world = world;
        self
    }

    pub fn with_material(mut self, material: usize) -> Self {
        self.pipeline = PipelineKind::Lit;
        self.material = Some(material);
        self
    }

    /// 修改 world 矩阵，并让所有帧资源重新上传
    pub fn set_world(&mut self, world: Matrix4, frame_resources: usize) {
        self.world = world;
        self.num_frames_dirty = frame_resources;
    }
}

/// 把脏的物体常量写入当前帧资源，返回写入的数量
pub fn update_object_constants<V, D: GpuDevice + ?Sized>(
    device: &mut D,
    frame: &FrameResource<V>,
    items: &mut [RenderItem],
) -> Result<usize>
where
    V: Pod,
{
    let mut written = 0;
    for item in items.iter_mut().filter(|i| i.num_frames_dirty > 0) {
        frame
            .object_cb
            .copy_data(device, item.object_cb_index, &ObjectConstants::new(&item.world))?;
        item.num_frames_dirty -= 1;
        written += 1;
    }
    Ok(written)
}

/// 把脏的材质常量写入当前帧资源，返回写入的数量
pub fn update_material_constants<V, D: GpuDevice + ?Sized>(
    device: &mut D,
    frame: &FrameResource<V>,
    materials: &mut [Material],
) -> Result<usize>
where
    V: Pod,
{
    let Some(material_cb) = &frame.material_cb else {
        return Ok(0);
    };

    let mut written = 0;
    for material in materials.iter_mut().filter(|m| m.num_frames_dirty > 0) {
        material_cb.copy_data(device, material.cb_index, &material.constants())?;
        material.num_frames_dirty -= 1;
        written += 1;
    }
    Ok(written)
}

/// 为渲染项生成绘制命令
///
/// 动态几何体的顶点缓冲区取自当前帧资源。
pub fn build_draw_commands<V: Pod>(
    items: &[RenderItem],
    geometries: &HashMap<String, MeshGeometry>,
    materials: &[Material],
    frame: &FrameResource<V>,
) -> Result<Vec<DrawCommand>> {
    items
        .iter()
        .map(|item| {
            let geometry = geometries.get(&item.geometry).ok_or_else(|| {
                GraphicsError::InvalidBuffer(format!("unknown geometry '{}'", item.geometry))
            })?;

            let vertex_buffer = match geometry.vertices {
                VertexSource::Static(buffer) => buffer,
                VertexSource::Dynamic => frame
                    .waves_vb
                    .as_ref()
                    .map(|vb| vb.buffer())
                    .ok_or_else(|| {
                        GraphicsError::InvalidBuffer(format!(
                            "geometry '{}' is dynamic but the frame resource has no vertex buffer",
                            geometry.name
                        ))
                    })?,
            };

            let material_constants = match item.material {
                Some(index) => {
                    let material = materials.get(index).ok_or_else(|| {
                        GraphicsError::InvalidBuffer(format!("unknown material {}", index))
                    })?;
                    let cb = frame.material_cb.as_ref().ok_or_else(|| {
                        GraphicsError::InvalidBuffer(
                            "frame resource has no material constants".to_string(),
                        )
                    })?;
                    Some(cb.binding(material.cb_index)?)
                }
                None => None,
            };

            Ok(DrawCommand {
                pipeline: item.pipeline,
                vertex_buffer,
                vertex_stride: geometry.vertex_stride,
                index_buffer: geometry.index_buffer,
                index_format: geometry.index_format,
                index_count: item.submesh.index_count,
                start_index: item.submesh.start_index,
                base_vertex: item.submesh.base_vertex,
                object_constants: frame.object_cb.binding(item.object_cb_index)?,
                material_constants,
            })
        })
        .collect()
}
