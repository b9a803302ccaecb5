//! WaveRender - 波浪高度场与帧资源环示例
//!
//! 一组逐步递进的 GPU 示例程序（Box、Shapes、LitWaves、LandAndWaves），
//! 核心是有限差分波动方程模拟，以及通过 Fence 保护的多帧资源环
//! 把每帧变化的顶点和常量数据交给 GPU。
//!
//! # 模块结构
//!
//! - `core`：配置、错误处理、日志、计时器
//! - `math`：nalgebra 类型别名和矩阵辅助函数
//! - `geometry`：顶点、网格和程序化几何体生成器
//! - `sim`：波浪模拟、固定步长驱动、随机扰动、山丘地形
//! - `renderer`：Fence、上传缓冲区、帧资源环、常量布局和渲染项
//! - `gfx`：GPU 设备 trait 及 headless / wgpu 实现
//! - `app`：相机、应用宿主和示例程序
//!
//! # 使用示例
//!
//! ```no_run
//! use wave_render::sim::Waves;
//!
//! let mut waves = Waves::new(128, 128, 1.0, 0.03, 4.0, 0.2);
//! waves.disturb(64, 64, 0.5);
//! waves.update(1.0 / 60.0);
//! println!("center height: {}", waves.position(64 * 128 + 64).y);
//! ```

pub mod app;
pub mod core;
pub mod geometry;
pub mod gfx;
pub mod math;
pub mod renderer;
pub mod sim;
