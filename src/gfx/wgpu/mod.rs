//! wgpu 图形后端实现
//!
//! wgpu 是一个跨平台的图形 API，可以在 Vulkan、Metal、DirectX 12、
//! OpenGL 等多种后端上运行。这里只做离屏渲染。
//!
//! # 模块结构
//!
//! - `context` - WgpuContext 结构（实例、适配器、设备和队列）
//! - `device` - WgpuDevice 结构（实现 `GpuDevice`）

mod context;
mod device;

pub use context::WgpuContext;
pub use device::{WgpuDevice, COLOR_FORMAT, DEPTH_FORMAT};
