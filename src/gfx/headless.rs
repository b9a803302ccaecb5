//! 纯 CPU 的模拟 GPU 设备
//!
//! 缓冲区放在普通内存里，提交的帧进入一个模拟的 GPU 队列：
//! 队列中最多保留 `latency` 个未完成的提交，更早的提交视为已完成。
//!
//! 设备会检查两类错误：
//! - 绘制命令引用的缓冲区不存在、范围越界，或索引超出顶点缓冲区
//! - **资源冲突**：写入一个仍被未完成提交引用的缓冲区
//!
//! 后者正是帧资源环要避免的情况，测试用它验证同步是否正确。

use std::collections::{HashSet, VecDeque};

use tracing::{debug, trace};

use super::device::{
    BufferBinding, BufferDescriptor, BufferId, BufferUsage, DrawCommand, FramePass, GpuDevice,
    IndexFormat,
};
use crate::core::error::{GraphicsError, Result};
use crate::renderer::sync::{FenceManager, FenceValue};

/// 设备统计数据
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    /// 提交的帧数
    pub frames_submitted: u64,
    /// 绘制调用总数
    pub draw_calls: u64,
    /// 三角形总数
    pub triangles: u64,
    /// 实际发生阻塞的 Fence 等待次数
    pub fence_waits: u64,
    /// 写入的字节总数
    pub bytes_written: u64,
}

struct HeadlessBuffer {
    desc: BufferDescriptor,
    data: Vec<u8>,
}

struct Submission {
    fence: FenceValue,
    buffers: HashSet<BufferId>,
}

/// 模拟 GPU 设备
pub struct HeadlessDevice {
    width: u32,
    height: u32,
    latency: usize,
    buffers: Vec<HeadlessBuffer>,
    fences: FenceManager,
    in_flight: VecDeque<Submission>,
    stats: HeadlessStats,
    last_pass: Option<FramePass>,
}

impl HeadlessDevice {
    /// 创建设备
    ///
    /// `latency` 为 GPU 落后 CPU 的帧数；0 表示提交立即完成。
    pub fn new(width: u32, height: u32, latency: usize) -> Self {
        debug!(width, height, latency, "Headless device created");
        Self {
            width,
            height,
            latency,
            buffers: Vec::new(),
            fences: FenceManager::new(),
            in_flight: VecDeque::new(),
            stats: HeadlessStats::default(),
            last_pass: None,
        }
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats
    }

    pub fn latency(&self) -> usize {
        self.latency
    }

    /// 未完成的提交数量
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// 最后一次提交的渲染通道
    pub fn last_pass(&self) -> Option<&FramePass> {
        self.last_pass.as_ref()
    }

    /// 读取缓冲区内容
    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(buffer.index()).map(|b| b.data.as_slice())
    }

    pub fn buffer_descriptor(&self, buffer: BufferId) -> Option<&BufferDescriptor> {
        self.buffers.get(buffer.index()).map(|b| &b.desc)
    }

    fn buffer(&self, id: BufferId) -> Result<&HeadlessBuffer> {
        self.buffers
            .get(id.index())
            .ok_or_else(|| GraphicsError::InvalidBuffer(format!("unknown buffer {:?}", id)).into())
    }

    fn label(&self, id: BufferId) -> String {
        self.buffers
            .get(id.index())
            .and_then(|b| b.desc.label.clone())
            .unwrap_or_else(|| format!("{:?}", id))
    }

    /// 完成 Fence 值不超过 `fence` 的提交
    fn retire_through(&mut self, fence: FenceValue) -> usize {
        let mut retired = 0;
        while let Some(front) = self.in_flight.front() {
            if front.fence > fence {
                break;
            }
            self.fences.update_completed_value(front.fence);
            self.in_flight.pop_front();
            retired += 1;
        }
        retired
    }

    fn check_binding(&self, binding: &BufferBinding, usage: BufferUsage) -> Result<()> {
        let buffer = self.buffer(binding.buffer)?;
        if buffer.desc.usage != usage {
            return Err(GraphicsError::InvalidBuffer(format!(
                "buffer '{}' bound as {:?} but created as {:?}",
                self.label(binding.buffer),
                usage,
                buffer.desc.usage
            ))
            .into());
        }
        if binding.offset + binding.size > buffer.desc.size {
            return Err(GraphicsError::InvalidBuffer(format!(
                "binding {}..{} exceeds buffer '{}' of {} bytes",
                binding.offset,
                binding.offset + binding.size,
                self.label(binding.buffer),
                buffer.desc.size
            ))
            .into());
        }
        Ok(())
    }

    fn check_draw(&self, draw: &DrawCommand) -> Result<()> {
        self.check_binding(&draw.object_constants, BufferUsage::Constant)?;
        if let Some(material) = &draw.material_constants {
            self.check_binding(material, BufferUsage::Constant)?;
        }

        let index_buffer = self.buffer(draw.index_buffer)?;
        let index_size = draw.index_format.byte_size();
        let start = draw.start_index as u64 * index_size;
        let end = start + draw.index_count as u64 * index_size;
        if end > index_buffer.desc.size {
            return Err(GraphicsError::InvalidBuffer(format!(
                "indices {}..{} exceed index buffer '{}'",
                draw.start_index,
                draw.start_index + draw.index_count,
                self.label(draw.index_buffer)
            ))
            .into());
        }

        let bytes = &index_buffer.data[start as usize..end as usize];
        let max_index = match draw.index_format {
            IndexFormat::U16 => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as i64)
                .max(),
            IndexFormat::U32 => bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                .max(),
        };

        let vertex_buffer = self.buffer(draw.vertex_buffer)?;
        if let Some(max_index) = max_index {
            let last_vertex = max_index + draw.base_vertex as i64;
            let vertex_count = (vertex_buffer.desc.size / draw.vertex_stride.max(1)) as i64;
            if last_vertex < 0 || last_vertex >= vertex_count {
                return Err(GraphicsError::InvalidBuffer(format!(
                    "vertex {} out of range for buffer '{}' with {} vertices",
                    last_vertex,
                    self.label(draw.vertex_buffer),
                    vertex_count
                ))
                .into());
            }
        }

        Ok(())
    }
}

impl GpuDevice for HeadlessDevice {
    fn backend_name(&self) -> &'static str {
        "headless"
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

        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(HeadlessBuffer {
            desc: desc.clone(),
            data: vec![0; desc.size as usize],
        });
        trace!(?id, size = desc.size, usage = ?desc.usage, "Buffer created");
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let size = self.buffer(buffer)?.desc.size;
        let end = offset + data.len() as u64;
        if end > size {
            return Err(GraphicsError::InvalidBuffer(format!(
                "write {}..{} exceeds buffer '{}' of {} bytes",
                offset,
                end,
                self.label(buffer),
                size
            ))
            .into());
        }

        if let Some(pending) = self.in_flight.iter().find(|s| s.buffers.contains(&buffer)) {
            return Err(GraphicsError::ResourceHazard(format!(
                "buffer '{}' written while fence {} (completed {}) still reads it",
                self.label(buffer),
                pending.fence.value(),
                self.fences.completed_value().value()
            ))
            .into());
        }

        let target = &mut self.buffers[buffer.index()];
        target.data[offset as usize..end as usize].copy_from_slice(data);
        self.stats.bytes_written += data.len() as u64;
        Ok(())
    }

    fn submit(&mut self, pass: &FramePass) -> Result<FenceValue> {
        self.check_binding(&pass.pass_constants, BufferUsage::Constant)?;
        for draw in &pass.draws {
            self.check_draw(draw)?;
        }

        let fence = self.fences.next_value();
        self.in_flight.push_back(Submission {
            fence,
            buffers: pass.buffers().collect(),
        });

        self.stats.frames_submitted += 1;
        self.stats.draw_calls += pass.draws.len() as u64;
        self.stats.triangles += pass
            .draws
            .iter()
            .map(|d| d.index_count as u64 / 3)
            .sum::<u64>();
        self.last_pass = Some(pass.clone());

        // GPU 最多落后 latency 帧
        while self.in_flight.len() > self.latency {
            if let Some(done) = self.in_flight.pop_front() {
                self.fences.update_completed_value(done.fence);
            }
        }

        trace!(fence = fence.value(), draws = pass.draws.len(), "Frame submitted");
        Ok(fence)
    }

    fn last_submitted_fence(&self) -> FenceValue {
        self.fences.current_value()
    }

    fn completed_fence(&self) -> FenceValue {
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

        if self.retire_through(fence) > 0 {
            self.stats.fence_waits += 1;
            trace!(fence = fence.value(), "Waited for GPU");
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WaveRenderError;
    use crate::gfx::device::PipelineKind;

    fn constant(device: &mut HeadlessDevice, size: u64) -> BufferBinding {
        let buffer = device
            .create_buffer(&BufferDescriptor::new(size, BufferUsage::Constant))
            .unwrap();
        BufferBinding {
            buffer,
            offset: 0,
            size,
        }
    }

    fn triangle_pass(device: &mut HeadlessDevice) -> FramePass {
        let vb = device
            .create_buffer(&BufferDescriptor::new(3 * 12, BufferUsage::Vertex))
            .unwrap();
        let ib = device
            .create_buffer(&BufferDescriptor::new(6, BufferUsage::Index))
            .unwrap();
        device
            .write_buffer(ib, 0, bytemuck::cast_slice(&[0u16, 1, 2]))
            .unwrap();

        let pass_cb = constant(device, 256);
        let object_cb = constant(device, 256);

        FramePass {
            clear_color: [0.0; 4],
            wireframe: false,
            pass_constants: pass_cb,
            draws: vec![DrawCommand {
                pipeline: PipelineKind::Color,
                vertex_buffer: vb,
                vertex_stride: 12,
                index_buffer: ib,
                index_format: IndexFormat::U16,
                index_count: 3,
                start_index: 0,
                base_vertex: 0,
                object_constants: object_cb,
                material_constants: None,
            }],
        }
    }

    #[test]
    fn test_latency_controls_completion() {
        let mut device = HeadlessDevice::new(8, 8, 2);
        let pass = triangle_pass(&mut device);

        let f1 = device.submit(&pass).unwrap();
        let f2 = device.submit(&pass).unwrap();
        assert_eq!(device.completed_fence(), FenceValue::NONE);
        assert_eq!(device.in_flight(), 2);

        device.submit(&pass).unwrap();
        assert_eq!(device.completed_fence(), f1);

        device.wait_for_fence(f2).unwrap();
        assert_eq!(device.completed_fence(), f2);
        assert_eq!(device.stats().fence_waits, 1);

        device.flush().unwrap();
        assert_eq!(device.in_flight(), 0);
        assert_eq!(device.stats().frames_submitted, 3);
        assert_eq!(device.stats().triangles, 3);
    }

    #[test]
    fn test_write_to_in_flight_buffer_is_hazard() {
        let mut device = HeadlessDevice::new(8, 8, 1);
        let pass = triangle_pass(&mut device);
        let cb = pass.draws[0].object_constants.buffer;

        device.submit(&pass).unwrap();
        let err = device.write_buffer(cb, 0, &[1, 2, 3, 4]).unwrap_err();
        assert!(matches!(
            err,
            WaveRenderError::Graphics(GraphicsError::ResourceHazard(_))
        ));

        device.flush().unwrap();
        device.write_buffer(cb, 0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&device.buffer_data(cb).unwrap()[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_latency_never_blocks() {
        let mut device = HeadlessDevice::new(8, 8, 0);
        let pass = triangle_pass(&mut device);
        let cb = pass.pass_constants.buffer;

        for _ in 0..4 {
            let fence = device.submit(&pass).unwrap();
            assert_eq!(device.completed_fence(), fence);
            device.write_buffer(cb, 0, &[0; 16]).unwrap();
        }
        assert_eq!(device.stats().fence_waits, 0);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut device = HeadlessDevice::new(8, 8, 0);
        let pass = triangle_pass(&mut device);
        let ib = pass.draws[0].index_buffer;
        device
            .write_buffer(ib, 0, bytemuck::cast_slice(&[0u16, 1, 3]))
            .unwrap();

        assert!(device.submit(&pass).is_err());
    }

    #[test]
    fn test_invalid_writes_and_waits() {
        let mut device = HeadlessDevice::new(8, 8, 0);
        let cb = constant(&mut device, 16);

        assert!(device.write_buffer(cb.buffer, 8, &[0; 16]).is_err());
        assert!(device.write_buffer(BufferId(99), 0, &[0]).is_err());
        assert!(device.wait_for_fence(FenceValue::new(1)).is_err());
        assert!(device
            .create_buffer(&BufferDescriptor::new(0, BufferUsage::Vertex))
            .is_err());
    }

    #[test]
    fn test_capture_unsupported() {
        let mut device = HeadlessDevice::new(8, 8, 0);
        device.resize(16, 4).unwrap();
        assert_eq!(device.size(), (16, 4));
        assert!(device.capture_frame(std::path::Path::new("out.png")).is_err());
    }
}
