//! 图形后端模块
//!
//! 本模块封装了 GPU 设备的具体实现：
//! - headless：纯 CPU 模拟的设备，带资源冲突检测，用于测试和无 GPU 环境
//! - wgpu：跨平台的离屏渲染（支持 Vulkan、Metal、DX12、OpenGL）
//!
//! 所有后端都实现了统一的 [`GpuDevice`] trait。[`Device`] 在运行时
//! 选择其中一个，通过枚举分发而不是 trait 对象。

pub mod device;
pub mod headless;
pub mod wgpu;

use std::path::Path;

use tracing::info;

use crate::core::config::{Config, GraphicsBackend};
use crate::core::error::Result;
use crate::renderer::sync::FenceValue;

pub use device::{
    BufferBinding, BufferDescriptor, BufferId, BufferUsage, DrawCommand, FramePass, GpuDevice,
    IndexFormat, PipelineKind,
};
pub use headless::{HeadlessDevice, HeadlessStats};
pub use self::wgpu::WgpuDevice;

/// 运行时选择的设备
pub enum Device {
    Headless(HeadlessDevice),
    Wgpu(WgpuDevice),
}

impl Device {
    /// 按配置创建设备
    pub fn from_config(config: &Config) -> Result<Self> {
        let (width, height) = (config.window.width, config.window.height);
        let device = match config.graphics.backend {
            GraphicsBackend::Headless => {
                info!("Initializing headless device");
                Device::Headless(HeadlessDevice::new(width, height, config.graphics.gpu_latency))
            }
            GraphicsBackend::Wgpu => {
                info!("Initializing wgpu device");
                Device::Wgpu(WgpuDevice::new(width, height)?)
            }
        };
        Ok(device)
    }

    fn inner(&self) -> &dyn GpuDevice {
        match self {
            Device::Headless(d) => d,
            Device::Wgpu(d) => d,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn GpuDevice {
        match self {
            Device::Headless(d) => d,
            Device::Wgpu(d) => d,
        }
    }
}

impl GpuDevice for Device {
    fn backend_name(&self) -> &'static str {
        self.inner().backend_name()
    }

    fn size(&self) -> (u32, u32) {
        self.inner().size()
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<BufferId> {
        self.inner_mut().create_buffer(desc)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        self.inner_mut().write_buffer(buffer, offset, data)
    }

    fn submit(&mut self, pass: &FramePass) -> Result<FenceValue> {
        self.inner_mut().submit(pass)
    }

    fn last_submitted_fence(&self) -> FenceValue {
        self.inner().last_submitted_fence()
    }

    fn completed_fence(&self) -> FenceValue {
        self.inner().completed_fence()
    }

    fn wait_for_fence(&mut self, fence: FenceValue) -> Result<()> {
        self.inner_mut().wait_for_fence(fence)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.inner_mut().resize(width, height)
    }

    fn capture_frame(&mut self, path: &Path) -> Result<()> {
        self.inner_mut().capture_frame(path)
    }
}
