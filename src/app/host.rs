//! 应用程序宿主
//!
//! 宿主拥有设备、计时器和帧资源环，示例程序只实现 [`FrameCallbacks`]。
//! 每一帧的顺序：
//!
//! ```text
//! timer.tick → ring.begin_frame（必要时等待 GPU）→ update → draw
//!            → device.submit → ring.end_frame(fence) → 帧率统计
//! ```

use std::path::Path;

use bytemuck::Pod;
use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::timer::{FrameStats, GameTimer};
use crate::gfx::device::{FramePass, GpuDevice};
use crate::renderer::frame::{FrameResource, FrameResourceDesc, FrameResourceRing};

/// 示例程序的回调
///
/// `V` 为帧资源中动态顶点缓冲区的顶点类型。
pub trait FrameCallbacks<D: GpuDevice + ?Sized, V> {
    /// 示例名称
    fn name(&self) -> &'static str;

    /// 上传静态几何体，返回每个帧资源需要的容量
    fn init(&mut self, device: &mut D, frame_resources: usize) -> Result<FrameResourceDesc>;

    /// 渲染目标尺寸变化
    fn on_resize(&mut self, width: u32, height: u32);

    /// 更新模拟并写入当前帧资源
    ///
    /// 调用时 GPU 已经不再读取 `frame`。
    fn update(&mut self, device: &mut D, frame: &FrameResource<V>, timer: &GameTimer) -> Result<()>;

    /// 生成本帧的渲染通道
    fn draw(&mut self, frame: &FrameResource<V>) -> Result<FramePass>;
}

/// 宿主配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostOptions {
    pub frame_resources: usize,
    /// 固定帧间隔；`None` 使用真实时间
    pub fixed_delta_time: Option<f32>,
}

impl From<&Config> for HostOptions {
    fn from(config: &Config) -> Self {
        Self {
            frame_resources: config.graphics.frame_resources,
            fixed_delta_time: config.run.fixed_delta_time,
        }
    }
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            frame_resources: crate::renderer::frame::DEFAULT_FRAME_RESOURCES,
            fixed_delta_time: Some(1.0 / 60.0),
        }
    }
}

/// 应用程序宿主
pub struct AppHost<D: GpuDevice, V, C: ?Sized = dyn FrameCallbacks<D, V>> {
    device: D,
    timer: GameTimer,
    ring: FrameResourceRing<V>,
    callbacks: Box<C>,
    stats: FrameStats,
    frames_rendered: u64,
}

impl<D, V, C> AppHost<D, V, C>
where
    D: GpuDevice,
    V: Pod,
    C: FrameCallbacks<D, V> + ?Sized,
{
    /// 初始化示例并创建帧资源环
    pub fn new(mut device: D, options: HostOptions, mut callbacks: Box<C>) -> Result<Self> {
        info!(
            sample = callbacks.name(),
            backend = device.backend_name(),
            frame_resources = options.frame_resources,
            "Initializing sample"
        );

        let desc = callbacks.init(&mut device, options.frame_resources)?;
        let ring = FrameResourceRing::new(&mut device, options.frame_resources, &desc)?;

        let (width, height) = device.size();
        callbacks.on_resize(width, height);

        let mut timer = GameTimer::new(options.fixed_delta_time);
        timer.reset();

        Ok(Self {
            device,
            timer,
            ring,
            callbacks,
            stats: FrameStats::new(),
            frames_rendered: 0,
        })
    }

    /// 渲染一帧
    pub fn run_frame(&mut self) -> Result<()> {
        self.timer.tick();

        self.ring.begin_frame(&mut self.device)?;
        let frame = self.ring.current();

        self.callbacks.update(&mut self.device, frame, &self.timer)?;
        let pass = self.callbacks.draw(frame)?;

        let fence = self.device.submit(&pass)?;
        self.ring.end_frame(fence);
        self.frames_rendered += 1;

        if self.stats.record(self.timer.total_time()) {
            debug!(
                sample = self.callbacks.name(),
                fps = self.stats.fps(),
                mspf = self.stats.mspf(),
                "Frame stats"
            );
        }
        Ok(())
    }

    /// 连续渲染 `count` 帧
    pub fn run_frames(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.run_frame()?;
        }
        info!(
            sample = self.callbacks.name(),
            frames = self.frames_rendered,
            ring_waits = self.ring.wait_count(),
            total_time = self.timer.total_time(),
            "Frames rendered"
        );
        Ok(())
    }

    /// 调整渲染目标尺寸
    ///
    /// 先等待 GPU 完成所有提交。
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.device.flush()?;
        self.device.resize(width, height)?;
        self.callbacks.on_resize(width, height);
        Ok(())
    }

    /// 暂停 / 恢复计时器
    pub fn set_paused(&mut self, paused: bool) {
        if paused {
            self.timer.stop();
        } else {
            self.timer.start();
        }
    }

    /// 等待 GPU 后保存最后一帧
    pub fn capture(&mut self, path: &Path) -> Result<()> {
        self.device.capture_frame(path)
    }

    /// 等待所有提交完成
    pub fn flush(&mut self) -> Result<()> {
        self.device.flush()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn ring(&self) -> &FrameResourceRing<V> {
        &self.ring
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    pub fn timer(&self) -> &GameTimer {
        &self.timer
    }

    pub fn frame_stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// 取回设备
    pub fn into_device(self) -> D {
        self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::HeadlessDevice;
    use crate::renderer::constants::PassConstants;
    use crate::renderer::vertex::ColorVertex;

    /// 只写通道常量的最小示例
    #[derive(Default)]
    struct Counting {
        updates: u32,
        resized: Option<(u32, u32)>,
        last_time: f32,
    }

    impl<D: GpuDevice> FrameCallbacks<D, ColorVertex> for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn init(&mut self, _device: &mut D, _frame_resources: usize) -> Result<FrameResourceDesc> {
            Ok(FrameResourceDesc {
                pass_count: 1,
                object_count: 1,
                ..FrameResourceDesc::default()
            })
        }

        fn on_resize(&mut self, width: u32, height: u32) {
            self.resized = Some((width, height));
        }

        fn update(
            &mut self,
            device: &mut D,
            frame: &FrameResource<ColorVertex>,
            timer: &GameTimer,
        ) -> Result<()> {
            self.updates += 1;
            self.last_time = timer.total_time();
            frame.pass_cb.copy_data(device, 0, &PassConstants::default())
        }

        fn draw(&mut self, frame: &FrameResource<ColorVertex>) -> Result<FramePass> {
            Ok(FramePass {
                clear_color: [0.0; 4],
                wireframe: false,
                pass_constants: frame.pass_cb.binding(0)?,
                draws: Vec::new(),
            })
        }
    }

    #[test]
    fn test_host_runs_callbacks() {
        let device = HeadlessDevice::new(64, 32, 1);
        let options = HostOptions {
            frame_resources: 3,
            fixed_delta_time: Some(0.5),
        };
        let mut host: AppHost<_, ColorVertex, Counting> =
            AppHost::new(device, options, Box::new(Counting::default())).unwrap();
        assert_eq!(host.callbacks().resized, Some((64, 32)));

        host.run_frames(4).unwrap();
        assert_eq!(host.callbacks().updates, 4);
        assert_eq!(host.callbacks().last_time, 2.0);
        assert_eq!(host.device().stats().frames_submitted, 4);
        assert_eq!(host.ring().wait_count(), 0);

        host.resize(128, 64).unwrap();
        assert_eq!(host.callbacks().resized, Some((128, 64)));
        assert_eq!(host.device().in_flight(), 0);
    }

    #[test]
    fn test_paused_timer_freezes_time() {
        let device = HeadlessDevice::new(8, 8, 0);
        let options = HostOptions {
            frame_resources: 2,
            fixed_delta_time: Some(0.25),
        };
        let mut host: AppHost<_, ColorVertex, Counting> =
            AppHost::new(device, options, Box::new(Counting::default())).unwrap();

        host.run_frames(2).unwrap();
        host.set_paused(true);
        host.run_frames(3).unwrap();
        assert_eq!(host.timer().total_time(), 0.5);
        assert_eq!(host.frames_rendered(), 5);
    }

    #[test]
    fn test_boxed_dyn_callbacks() {
        let device = HeadlessDevice::new(8, 8, 2);
        let callbacks: Box<dyn FrameCallbacks<HeadlessDevice, ColorVertex>> =
            Box::new(Counting::default());
        let mut host: AppHost<HeadlessDevice, ColorVertex> =
            AppHost::new(device, HostOptions::default(), callbacks).unwrap();
        host.run_frames(10).unwrap();
        assert_eq!(host.callbacks().name(), "counting");
    }

    #[test]
    fn test_single_frame_resource_rejected() {
        let device = HeadlessDevice::new(8, 8, 0);
        let options = HostOptions {
            frame_resources: 1,
            fixed_delta_time: None,
        };
        let result: Result<AppHost<_, ColorVertex, Counting>> =
            AppHost::new(device, options, Box::new(Counting::default()));
        assert!(result.is_err());
    }
}
