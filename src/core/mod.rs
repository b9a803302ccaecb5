//! 核心功能模块
//!
//! 本模块提供了与具体图形 API 无关的基础功能：日志系统、配置管理、
//! 错误处理和计时器。
//!
//! # 模块组织
//!
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件加载设置
//! - `error`：错误处理，定义统一的错误类型
//! - `timer`：游戏计时器与帧率统计

pub mod config;
pub mod error;
pub mod log;
pub mod timer;

// 重新导出常用类型，方便使用
pub use config::{Config, GraphicsBackend, SampleKind};
pub use error::{Result, WaveRenderError};
pub use timer::{FrameStats, GameTimer};
