//! wgpu 设备管理
//!
//! 负责 wgpu 图形设备的初始化：
//! - 创建 wgpu 实例
//! - 选择图形适配器
//! - 创建逻辑设备和命令队列
//!
//! 离屏渲染不需要窗口表面，适配器不要求兼容任何表面。

use tracing::{debug, info, warn};

use crate::core::error::{GraphicsError, Result};

/// wgpu 设备上下文
pub struct WgpuContext {
    /// wgpu 实例（入口点）
    pub instance: wgpu::Instance,
    /// 图形适配器（GPU）
    pub adapter: wgpu::Adapter,
    /// 逻辑设备
    pub device: wgpu::Device,
    /// 命令队列
    pub queue: wgpu::Queue,
    /// 是否支持线框模式
    pub supports_wireframe: bool,
}

impl WgpuContext {
    /// 创建 wgpu 上下文
    pub fn new() -> Result<Self> {
        info!("Initializing wgpu context");

        // 1. 创建 wgpu 实例
        debug!("Creating wgpu instance");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: Default::default(),
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        // 2. 请求适配器
        debug!("Requesting adapter");
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| GraphicsError::DeviceCreation("Failed to find suitable adapter".to_string()))?;

        info!("Selected adapter: {:?}", adapter.get_info());

        // 3. 线框模式需要额外特性，不支持时退化为填充
        let supports_wireframe = adapter.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        if !supports_wireframe {
            warn!("Adapter does not support POLYGON_MODE_LINE, wireframe will render filled");
        }
        let required_features = if supports_wireframe {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        // 4. 请求设备和队列
        debug!("Requesting device and queue");
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("WaveRender Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create device: {}", e)))?;

        info!("wgpu context initialized successfully");

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            supports_wireframe,
        })
    }

    /// 常量缓冲区动态偏移的对齐要求
    pub fn uniform_offset_alignment(&self) -> u64 {
        self.device.limits().min_uniform_buffer_offset_alignment as u64
    }
}
