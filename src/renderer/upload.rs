//! 上传缓冲区
//!
//! CPU 每帧写入、GPU 直接读取的类型化缓冲区。
//!
//! # 设计原则
//!
//! - **类型安全**：通过泛型参数和 `Pod` 约束保证写入的数据与布局一致
//! - **自动对齐**：常量缓冲区的每个元素对齐到 256 字节，满足动态偏移绑定的要求
//! - **不持有设备**：写入时由调用方传入设备，缓冲区本身只保存句柄

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::core::error::{GraphicsError, Result};
use crate::gfx::device::{BufferBinding, BufferDescriptor, BufferId, BufferUsage, GpuDevice};

/// 常量缓冲区元素的对齐要求
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// 常量缓冲区元素大小向上取整到 256 的倍数
#[inline]
pub const fn constant_buffer_byte_size(byte_size: u64) -> u64 {
    (byte_size + CONSTANT_BUFFER_ALIGNMENT - 1) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

/// 上传缓冲区（CPU -> GPU）
///
/// # 类型参数
///
/// * `T` - 缓冲区中存储的数据类型
///
/// # 示例
///
/// ```rust
/// use wave_render::gfx::HeadlessDevice;
/// use wave_render::renderer::constants::ObjectConstants;
/// use wave_render::renderer::upload::UploadBuffer;
///
/// let mut device = HeadlessDevice::new(800, 600, 0);
///
/// // 最多 16 个物体的常量缓冲区
/// let buffer = UploadBuffer::<ObjectConstants>::new(&mut device, 16, true, "objects")?;
/// assert_eq!(buffer.element_size(), 256);
///
/// buffer.copy_data(&mut device, 3, &ObjectConstants::default())?;
/// # Ok::<(), wave_render::core::WaveRenderError>(())
/// ```
#[derive(Debug)]
pub struct UploadBuffer<T> {
    buffer: BufferId,
    element_count: usize,
    /// 每个元素占用的字节数（对齐后）
    element_size: u64,
    usage: BufferUsage,
    _marker: PhantomData<T>,
}

impl<T: Pod> UploadBuffer<T> {
    /// 创建新的上传缓冲区
    ///
    /// `is_constant_buffer` 为 `true` 时每个元素按 256 字节对齐，
    /// 否则按 `size_of::<T>()` 紧密排列（用作顶点缓冲区）。
    pub fn new<D: GpuDevice + ?Sized>(
        device: &mut D,
        element_count: usize,
        is_constant_buffer: bool,
        label: &str,
    ) -> Result<Self> {
        if element_count == 0 {
            return Err(GraphicsError::ResourceCreation(format!(
                "upload buffer '{}' needs at least one element",
                label
            ))
            .into());
        }

        let raw_size = std::mem::size_of::<T>() as u64;
        let (element_size, usage) = if is_constant_buffer {
            (constant_buffer_byte_size(raw_size), BufferUsage::Constant)
        } else {
            (raw_size, BufferUsage::Vertex)
        };

        let desc = BufferDescriptor::new(element_size * element_count as u64, usage)
            .with_label(label);
        let buffer = device.create_buffer(&desc)?;

        Ok(Self {
            buffer,
            element_count,
            element_size,
            usage,
            _marker: PhantomData,
        })
    }

    /// 写入第 `index` 个元素
    pub fn copy_data<D: GpuDevice + ?Sized>(
        &self,
        device: &mut D,
        index: usize,
        data: &T,
    ) -> Result<()> {
        let offset = self.element_offset(index)?;
        device.write_buffer(self.buffer, offset, bytemuck::bytes_of(data))
    }

    /// 从第 `start` 个元素开始连续写入
    ///
    /// 仅用于紧密排列的缓冲区（顶点数据）。
    pub fn copy_slice<D: GpuDevice + ?Sized>(
        &self,
        device: &mut D,
        start: usize,
        data: &[T],
    ) -> Result<()> {
        if self.usage == BufferUsage::Constant {
            return Err(GraphicsError::InvalidBuffer(
                "copy_slice on an aligned constant buffer".to_string(),
            )
            .into());
        }
        if start + data.len() > self.element_count {
            return Err(GraphicsError::InvalidBuffer(format!(
                "elements {}..{} out of bounds ({})",
                start,
                start + data.len(),
                self.element_count
            ))
            .into());
        }
        device.write_buffer(
            self.buffer,
            start as u64 * self.element_size,
            bytemuck::cast_slice(data),
        )
    }

    /// 第 `index` 个元素的字节偏移
    pub fn element_offset(&self, index: usize) -> Result<u64> {
        if index >= self.element_count {
            return Err(GraphicsError::InvalidBuffer(format!(
                "element {} out of bounds ({})",
                index, self.element_count
            ))
            .into());
        }
        Ok(self.element_size * index as u64)
    }

    /// 第 `index` 个元素的绑定信息
    pub fn binding(&self, index: usize) -> Result<BufferBinding> {
        Ok(BufferBinding {
            buffer: self.buffer,
            offset: self.element_offset(index)?,
            size: std::mem::size_of::<T>() as u64,
        })
    }
}

impl<T> UploadBuffer<T> {
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// 每个元素的大小（对齐后）
    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    pub fn total_size(&self) -> u64 {
        self.element_size * self.element_count as u64
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::HeadlessDevice;
    use crate::renderer::constants::{ObjectConstants, PassConstants};
    use crate::renderer::vertex::LitVertex;

    #[test]
    fn test_constant_buffer_alignment() {
        assert_eq!(constant_buffer_byte_size(0), 0);
        assert_eq!(constant_buffer_byte_size(1), 256);
        assert_eq!(constant_buffer_byte_size(64), 256);
        assert_eq!(constant_buffer_byte_size(256), 256);
        assert_eq!(constant_buffer_byte_size(257), 512);

        let mut device = HeadlessDevice::new(4, 4, 0);
        let pass = UploadBuffer::<PassConstants>::new(&mut device, 2, true, "pass").unwrap();
        assert_eq!(pass.element_size() % 256, 0);
        assert!(pass.element_size() >= std::mem::size_of::<PassConstants>() as u64);
        assert_eq!(pass.usage(), BufferUsage::Constant);
    }

    #[test]
    fn test_copy_data_offsets() {
        let mut device = HeadlessDevice::new(4, 4, 0);
        let objects = UploadBuffer::<ObjectConstants>::new(&mut device, 4, true, "objects").unwrap();

        let mut constants = ObjectConstants::default();
        constants.world[3][0] = 42.0;
        objects.copy_data(&mut device, 2, &constants).unwrap();

        let data = device.buffer_data(objects.buffer()).unwrap();
        let written: &[f32] = bytemuck::cast_slice(&data[512..512 + 64]);
        assert_eq!(written[12], 42.0);
        assert!(data[..512].iter().all(|&b| b == 0));

        assert!(objects.copy_data(&mut device, 4, &constants).is_err());
        assert_eq!(objects.binding(1).unwrap().offset, 256);
        assert_eq!(objects.binding(1).unwrap().size, 64);
    }

    #[test]
    fn test_vertex_buffer_is_packed() {
        let mut device = HeadlessDevice::new(4, 4, 0);
        let vb = UploadBuffer::<LitVertex>::new(&mut device, 3, false, "vb").unwrap();
        assert_eq!(vb.element_size(), 24);
        assert_eq!(vb.total_size(), 72);

        let verts = [LitVertex::new([1.0; 3], [0.0, 1.0, 0.0]); 2];
        vb.copy_slice(&mut device, 1, &verts).unwrap();
        assert!(vb.copy_slice(&mut device, 2, &verts).is_err());

        let cb = UploadBuffer::<ObjectConstants>::new(&mut device, 2, true, "cb").unwrap();
        assert!(cb.copy_slice(&mut device, 0, &[ObjectConstants::default()]).is_err());
        assert!(UploadBuffer::<LitVertex>::new(&mut device, 0, false, "empty").is_err());
    }
}
