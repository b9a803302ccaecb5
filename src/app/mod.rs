//! 应用层
//!
//! - `camera`：环绕相机
//! - `host`：持有设备、计时器和帧资源环的宿主
//! - `samples`：Box、Shapes、LitWaves、LandAndWaves 四个示例
//!
//! [`run_sample`] 按配置创建设备和示例，渲染指定帧数后退出。

pub mod camera;
pub mod host;
pub mod samples;

use std::path::Path;

use bytemuck::Pod;
use crate::app_info;

use crate::core::config::{Config, RunConfig, SampleKind};
use crate::core::error::Result;
use crate::gfx::Device;
use crate::renderer::vertex::{ColorVertex, LitVertex};

pub use camera::OrbitCamera;
pub use host::{AppHost, FrameCallbacks, HostOptions};
pub use samples::{BoxApp, LandAndWavesApp, LitWavesApp, SampleSettings, ShapesApp};

/// 运行配置中选择的示例
pub fn run_sample(config: &Config) -> Result<()> {
    let device = Device::from_config(config)?;
    let options = HostOptions::from(config);
    let settings = SampleSettings::from(&config.graphics);

    app_info!(
        sample = config.run.sample.name(),
        frames = config.run.frames,
        title = %config.window.title,
        "Running sample"
    );

    match config.run.sample {
        SampleKind::Box => {
            run_host::<ColorVertex>(device, options, Box::new(BoxApp::new(settings)), &config.run)
        }
        SampleKind::Shapes => {
            run_host::<ColorVertex>(device, options, Box::new(ShapesApp::new(settings)), &config.run)
        }
        SampleKind::LitWaves => {
            let app = LitWavesApp::new(settings, &config.simulation)?;
            run_host::<LitVertex>(device, options, Box::new(app), &config.run)
        }
        SampleKind::LandAndWaves => {
            let app = LandAndWavesApp::new(settings, &config.simulation)?;
            run_host::<ColorVertex>(device, options, Box::new(app), &config.run)
        }
    }
}

fn run_host<V: Pod>(
    device: Device,
    options: HostOptions,
    callbacks: Box<dyn FrameCallbacks<Device, V>>,
    run: &RunConfig,
) -> Result<()> {
    let mut host: AppHost<Device, V> = AppHost::new(device, options, callbacks)?;
    host.run_frames(run.frames)?;

    if let Some(path) = &run.screenshot {
        host.capture(Path::new(path))?;
        app_info!(path = %path, "Saved screenshot");
    }

    host.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_every_sample_headless() {
        for sample in [
            SampleKind::Box,
            SampleKind::Shapes,
            SampleKind::LitWaves,
            SampleKind::LandAndWaves,
        ] {
            let mut config = Config::default();
            config.run.sample = sample;
            config.run.frames = 5;
            config.window.width = 32;
            config.window.height = 32;
            run_sample(&config).unwrap();
        }
    }

    #[test]
    fn test_screenshot_unsupported_on_headless() {
        let mut config = Config::default();
        config.run.sample = SampleKind::Box;
        config.run.frames = 1;
        config.run.screenshot = Some("unused.png".to_string());
        assert!(run_sample(&config).is_err());
    }
}
