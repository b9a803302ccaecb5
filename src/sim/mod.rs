//! 模拟模块
//!
//! 与图形 API 无关的 CPU 侧模拟：
//!
//! - `waves`：有限差分波动高度场
//! - `stepper`：固定步长驱动和随机扰动调度
//! - `land`：解析的山丘地形

pub mod land;
pub mod stepper;
pub mod waves;

pub use stepper::{FixedStepper, RandomDisturber};
pub use waves::{WaveParams, Waves};
