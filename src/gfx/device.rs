//! GPU 设备抽象
//!
//! 示例程序只通过 [`GpuDevice`] trait 与 GPU 交互：创建缓冲区、写入数据、
//! 提交一帧的绘制命令、查询和等待 Fence。
//!
//! 所有后端都实现这个 trait，确保可以在不同实现之间无缝切换：
//! - [`HeadlessDevice`](super::headless::HeadlessDevice)：纯 CPU 模拟，用于测试和无 GPU 环境
//! - [`WgpuDevice`](super::wgpu::WgpuDevice)：离屏 wgpu 渲染

use std::path::Path;

use crate::core::error::{GraphicsError, Result};
use crate::renderer::sync::FenceValue;

/// 缓冲区句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

impl BufferId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// 缓冲区使用类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// 顶点缓冲区
    Vertex,
    /// 索引缓冲区
    Index,
    /// 常量缓冲区（Uniform Buffer）
    Constant,
}

/// 缓冲区描述信息
#[derive(Debug, Clone, PartialEq)]
pub struct BufferDescriptor {
    /// 缓冲区大小（字节）
    pub size: u64,
    /// 使用类型
    pub usage: BufferUsage,
    /// 调试名称（可选）
    pub label: Option<String>,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            size,
            usage,
            label: None,
        }
    }

    /// 设置调试名称
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// 渲染管线种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// 位置 + 顶点颜色
    Color,
    /// 位置 + 法线，使用材质和灯光
    Lit,
}

/// 索引格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    /// 每个索引的字节数
    pub fn byte_size(&self) -> u64 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// 缓冲区中的一段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    pub buffer: BufferId,
    /// 字节偏移
    pub offset: u64,
    /// 字节大小
    pub size: u64,
}

/// 一次索引绘制
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub pipeline: PipelineKind,
    pub vertex_buffer: BufferId,
    pub vertex_stride: u64,
    pub index_buffer: BufferId,
    pub index_format: IndexFormat,
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
    /// 物体常量（world 矩阵）
    pub object_constants: BufferBinding,
    /// 材质常量，仅 [`PipelineKind::Lit`] 需要
    pub material_constants: Option<BufferBinding>,
}

impl DrawCommand {
    /// 本次绘制引用的所有缓冲区
    pub fn buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        [
            Some(self.vertex_buffer),
            Some(self.index_buffer),
            Some(self.object_constants.buffer),
            self.material_constants.map(|b| b.buffer),
        ]
        .into_iter()
        .flatten()
    }
}

/// 一帧的渲染通道
#[derive(Debug, Clone, PartialEq)]
pub struct FramePass {
    pub clear_color: [f32; 4],
    pub wireframe: bool,
    /// 通道常量（相机、灯光）
    pub pass_constants: BufferBinding,
    pub draws: Vec<DrawCommand>,
}

impl FramePass {
    /// 本帧引用的所有缓冲区
    pub fn buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        std::iter::once(self.pass_constants.buffer).chain(self.draws.iter().flat_map(|d| d.buffers()))
    }
}

/// GPU 设备 trait
///
/// 所有方法都在同一个线程上调用；实现可以在内部使用其他线程
/// 发布 Fence 完成值。
pub trait GpuDevice {
    /// 后端名称
    fn backend_name(&self) -> &'static str;

    /// 当前渲染目标尺寸
    fn size(&self) -> (u32, u32);

    /// 创建 CPU 可写的缓冲区
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<BufferId>;

    /// 写入缓冲区
    ///
    /// 调用方保证 GPU 不再读取被写入的缓冲区（即引用它的提交都已完成）。
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()>;

    /// 提交一帧，返回标记这次提交的 Fence 值
    fn submit(&mut self, pass: &FramePass) -> Result<FenceValue>;

    /// 最后一次提交的 Fence 值
    fn last_submitted_fence(&self) -> FenceValue;

    /// GPU 已完成的 Fence 值
    fn completed_fence(&self) -> FenceValue;

    /// 阻塞直到 GPU 完成 `fence`
    fn wait_for_fence(&mut self, fence: FenceValue) -> Result<()>;

    /// 调整渲染目标尺寸
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// 把最后一帧保存为 PNG
    fn capture_frame(&mut self, path: &Path) -> Result<()> {
        Err(GraphicsError::Readback(format!(
            "{} backend cannot capture {}",
            self.backend_name(),
            path.display()
        ))
        .into())
    }

    /// 等待所有提交完成
    fn flush(&mut self) -> Result<()> {
        let fence = self.last_submitted_fence();
        self.wait_for_fence(fence)
    }
}
