//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型。
//!
//! # 设计原则
//!
//! - 为每种错误类型提供清晰的上下文信息
//! - 支持错误链（error source）
//! - 易于模式匹配和错误处理
//!
//! 注意：波浪模拟器的前置条件违规（越界索引、非正步长）直接 panic，
//! 不经过这里的错误类型；这里只覆盖可恢复的运行时错误。

use std::fmt;

/// 引擎统一的 Result 类型
pub type Result<T> = std::result::Result<T, WaveRenderError>;

/// WaveRender 的错误类型
#[derive(Debug)]
pub enum WaveRenderError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API / 设备错误
    Graphics(GraphicsError),

    /// 模拟参数错误
    Simulation(SimulationError),

    /// IO 错误
    Io(std::io::Error),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形设备相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 设备创建失败
    DeviceCreation(String),

    /// 资源创建失败
    ResourceCreation(String),

    /// 无效的缓冲区句柄或越界写入
    InvalidBuffer(String),

    /// CPU 写入了 GPU 仍在读取的资源
    ResourceHazard(String),

    /// 渲染命令执行失败
    CommandExecution(String),

    /// 截图读回失败
    Readback(String),
}

/// 模拟参数相关的错误
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// 参数不满足构造前置条件
    InvalidParameter { name: &'static str, reason: String },
}

impl fmt::Display for WaveRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveRenderError::Config(e) => write!(f, "Configuration error: {}", e),
            WaveRenderError::Graphics(e) => write!(f, "Graphics error: {}", e),
            WaveRenderError::Simulation(e) => write!(f, "Simulation error: {}", e),
            WaveRenderError::Io(e) => write!(f, "IO error: {}", e),
            WaveRenderError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            WaveRenderError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::InvalidBuffer(msg) => write!(f, "Invalid buffer access: {}", msg),
            GraphicsError::ResourceHazard(msg) => write!(f, "Resource hazard: {}", msg),
            GraphicsError::CommandExecution(msg) => write!(f, "Command execution failed: {}", msg),
            GraphicsError::Readback(msg) => write!(f, "Readback failed: {}", msg),
        }
    }
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidParameter { name, reason } => {
                write!(f, "Invalid simulation parameter '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for WaveRenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaveRenderError::Io(e) => Some(e),
            WaveRenderError::Config(e) => Some(e),
            WaveRenderError::Graphics(e) => Some(e),
            WaveRenderError::Simulation(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}
impl std::error::Error for SimulationError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for WaveRenderError {
    fn from(err: std::io::Error) -> Self {
        WaveRenderError::Io(err)
    }
}

impl From<ConfigError> for WaveRenderError {
    fn from(err: ConfigError) -> Self {
        WaveRenderError::Config(err)
    }
}

impl From<GraphicsError> for WaveRenderError {
    fn from(err: GraphicsError) -> Self {
        WaveRenderError::Graphics(err)
    }
}

impl From<SimulationError> for WaveRenderError {
    fn from(err: SimulationError) -> Self {
        WaveRenderError::Simulation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err: WaveRenderError = GraphicsError::ResourceHazard("buffer #3".to_string()).into();
        assert_eq!(err.to_string(), "Graphics error: Resource hazard: buffer #3");

        let err: WaveRenderError = SimulationError::InvalidParameter {
            name: "rows",
            reason: "must be greater than 1".to_string(),
        }
        .into();
        assert!(err.to_string().contains("'rows'"));
    }

    #[test]
    fn test_error_source_chain() {
        let err: WaveRenderError = ConfigError::ParseError("bad toml".to_string()).into();
        assert!(err.source().is_some());

        let err = WaveRenderError::Runtime("oops".to_string());
        assert!(err.source().is_none());
    }
}
