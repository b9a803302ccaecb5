//! 配置管理模块
//!
//! 提供引擎配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! title = "WaveRender"
//!
//! [graphics]
//! backend = "headless"   # 或 "wgpu"
//! frame_resources = 3
//! wireframe = false
//!
//! [logging]
//! level = "info"         # trace, debug, info, warn, error
//! file_output = false
//!
//! [simulation]
//! rows = 128
//! cols = 128
//! spatial_step = 1.0
//! time_step = 0.03
//! wave_speed = 4.0
//! damping = 0.2
//!
//! [run]
//! sample = "lit-waves"   # box, shapes, lit-waves, land-and-waves
//! frames = 600
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 引擎配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口（渲染目标）配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 波浪模拟配置
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// 运行配置
    #[serde(default)]
    pub run: RunConfig,
}

/// 窗口配置
///
/// 没有真正的窗口，宽高只决定渲染目标尺寸和投影矩阵的宽高比。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 标题（用于日志）
    #[serde(default = "default_title")]
    pub title: String,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: GraphicsBackend,

    /// 帧资源数量（环形缓冲槽位数）
    #[serde(default = "default_frame_resources")]
    pub frame_resources: usize,

    /// 线框模式
    #[serde(default)]
    pub wireframe: bool,

    /// headless 后端模拟的 GPU 延迟（帧）
    #[serde(default = "default_gpu_latency")]
    pub gpu_latency: usize,

    /// 清屏颜色 (RGBA)
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsBackend {
    /// 纯 CPU 模拟设备（无 GPU 依赖）
    Headless,
    /// wgpu 离屏渲染
    Wgpu,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// 波浪模拟配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 网格行数
    #[serde(default = "default_wave_rows")]
    pub rows: usize,

    /// 网格列数
    #[serde(default = "default_wave_cols")]
    pub cols: usize,

    /// 空间步长
    #[serde(default = "default_spatial_step")]
    pub spatial_step: f32,

    /// 时间步长
    #[serde(default = "default_time_step")]
    pub time_step: f32,

    /// 波速
    #[serde(default = "default_wave_speed")]
    pub wave_speed: f32,

    /// 阻尼
    #[serde(default = "default_damping")]
    pub damping: f32,

    /// 随机扰动间隔（秒）
    #[serde(default = "default_disturb_interval")]
    pub disturb_interval: f32,

    /// 随机扰动幅度范围
    #[serde(default = "default_disturb_magnitude")]
    pub disturb_magnitude: [f32; 2],

    /// 随机数种子
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// 运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// 运行的示例
    #[serde(default = "default_sample")]
    pub sample: SampleKind,

    /// 渲染帧数
    #[serde(default = "default_frames")]
    pub frames: u64,

    /// 固定帧间隔（秒）；为空时使用真实时间
    #[serde(default = "default_fixed_delta")]
    pub fixed_delta_time: Option<f32>,

    /// 结束时保存最后一帧的 PNG 路径（仅 wgpu）
    #[serde(default)]
    pub screenshot: Option<String>,
}

/// 示例程序类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleKind {
    Box,
    Shapes,
    LitWaves,
    LandAndWaves,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_title() -> String { "WaveRender".to_string() }
fn default_backend() -> GraphicsBackend { GraphicsBackend::Headless }
fn default_frame_resources() -> usize { 3 }
fn default_gpu_latency() -> usize { 2 }
fn default_clear_color() -> [f32; 4] { [0.69, 0.77, 0.87, 1.0] }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "waverender.log".to_string() }
fn default_wave_rows() -> usize { 128 }
fn default_wave_cols() -> usize { 128 }
fn default_spatial_step() -> f32 { 1.0 }
fn default_time_step() -> f32 { 0.03 }
fn default_wave_speed() -> f32 { 4.0 }
fn default_damping() -> f32 { 0.2 }
fn default_disturb_interval() -> f32 { 0.25 }
fn default_disturb_magnitude() -> [f32; 2] { [0.2, 0.5] }
fn default_seed() -> u64 { 0x5eed }
fn default_sample() -> SampleKind { SampleKind::LitWaves }
fn default_frames() -> u64 { 600 }
fn default_fixed_delta() -> Option<f32> { Some(1.0 / 60.0) }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            frame_resources: default_frame_resources(),
            wireframe: false,
            gpu_latency: default_gpu_latency(),
            clear_color: default_clear_color(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rows: default_wave_rows(),
            cols: default_wave_cols(),
            spatial_step: default_spatial_step(),
            time_step: default_time_step(),
            wave_speed: default_wave_speed(),
            damping: default_damping(),
            disturb_interval: default_disturb_interval(),
            disturb_magnitude: default_disturb_magnitude(),
            seed: default_seed(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sample: default_sample(),
            frames: default_frames(),
            fixed_delta_time: default_fixed_delta(),
            screenshot: None,
        }
    }
}

impl Config {
    /// 从配置文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 加载命令行指定的配置文件
    ///
    /// 显式给出的路径必须存在且能解析；未指定时读取 `config.toml`，
    /// 读取失败则使用默认配置。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Ok(Self::from_file_or_default("config.toml")),
        }
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--sample <box|shapes|lit-waves|land-and-waves>`
    /// - `--backend <headless|wgpu>`，`--wgpu` 为简写
    /// - `--frames <n>`
    /// - `--width <value>` / `--height <value>`
    /// - `--seed <u64>`
    /// - `--screenshot <path>`
    /// - `--wireframe`
    /// - `--realtime`：使用真实帧间隔而不是固定步长
    pub fn apply_args<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--wgpu") {
            self.graphics.backend = GraphicsBackend::Wgpu;
        }
        if args.iter().any(|a| a == "--wireframe") {
            self.graphics.wireframe = true;
        }
        if args.iter().any(|a| a == "--realtime") {
            self.run.fixed_delta_time = None;
        }

        if let Some(value) = arg_value(&args, "--sample") {
            self.run.sample = SampleKind::parse(value).ok_or_else(|| ConfigError::InvalidValue {
                field: "run.sample".to_string(),
                reason: format!("unknown sample '{}'", value),
            })?;
        }

        if let Some(value) = arg_value(&args, "--backend") {
            self.graphics.backend = match value {
                "headless" => GraphicsBackend::Headless,
                "wgpu" => GraphicsBackend::Wgpu,
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: "graphics.backend".to_string(),
                        reason: format!("unknown backend '{}'", other),
                    }
                    .into())
                }
            };
        }

        if let Some(frames) = parse_arg(&args, "--frames", "run.frames")? {
            self.run.frames = frames;
        }
        if let Some(width) = parse_arg(&args, "--width", "window.width")? {
            self.window.width = width;
        }
        if let Some(height) = parse_arg(&args, "--height", "window.height")? {
            self.window.height = height;
        }
        if let Some(seed) = parse_arg(&args, "--seed", "simulation.seed")? {
            self.simulation.seed = seed;
        }
        if let Some(path) = arg_value(&args, "--screenshot") {
            self.run.screenshot = Some(path.to_string());
        }

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(invalid("window.width/height", "Window dimensions must be greater than 0"));
        }

        if self.graphics.frame_resources < 2 {
            return Err(invalid("graphics.frame_resources", "At least 2 frame resources required"));
        }

        let sim = &self.simulation;
        if sim.rows < 2 || sim.cols < 2 {
            return Err(invalid("simulation.rows/cols", "Wave grid needs at least 2 rows and 2 columns"));
        }
        // 随机扰动在 [4, n-5] 范围内取点
        if sim.rows < 10 || sim.cols < 10 {
            return Err(invalid("simulation.rows/cols", "Disturbance sampling needs a grid of at least 10x10"));
        }
        if sim.rows * sim.cols > u16::MAX as usize + 1 {
            return Err(invalid("simulation.rows/cols", "Wave grid must fit 16-bit indices"));
        }
        if !(sim.spatial_step > 0.0) || !(sim.time_step > 0.0) {
            return Err(invalid("simulation.spatial_step/time_step", "Step sizes must be positive"));
        }
        if sim.wave_speed < 0.0 || sim.damping < 0.0 {
            return Err(invalid("simulation.wave_speed/damping", "Must not be negative"));
        }
        if !(sim.disturb_interval > 0.0) {
            return Err(invalid("simulation.disturb_interval", "Must be positive"));
        }
        let [lo, hi] = sim.disturb_magnitude;
        if !(lo < hi) {
            return Err(invalid("simulation.disturb_magnitude", "Range must be non-empty"));
        }

        if let Some(dt) = self.run.fixed_delta_time {
            if !(dt > 0.0) {
                return Err(invalid("run.fixed_delta_time", "Must be positive"));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> super::error::WaveRenderError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).map(|s| s.as_str())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, field: &str) -> Result<Option<T>> {
    match arg_value(args, flag) {
        Some(value) => value.parse().map(Some).map_err(|_| {
            ConfigError::InvalidValue {
                field: field.to_string(),
                reason: format!("cannot parse '{}'", value),
            }
            .into()
        }),
        None => Ok(None),
    }
}

impl GraphicsBackend {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsBackend::Headless => "headless",
            GraphicsBackend::Wgpu => "wgpu",
        }
    }
}

impl SampleKind {
    /// 从命令行字符串解析
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "box" => Some(SampleKind::Box),
            "shapes" => Some(SampleKind::Shapes),
            "lit-waves" => Some(SampleKind::LitWaves),
            "land-and-waves" => Some(SampleKind::LandAndWaves),
            _ => None,
        }
    }

    /// 示例名称
    pub fn name(&self) -> &'static str {
        match self {
            SampleKind::Box => "Box",
            SampleKind::Shapes => "Shapes",
            SampleKind::LitWaves => "LitWaves",
            SampleKind::LandAndWaves => "LandAndWaves",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::WaveRenderError;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.graphics.backend, GraphicsBackend::Headless);
        assert_eq!(config.graphics.frame_resources, 3);
        assert_eq!(config.simulation.rows, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.frame_resources = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.time_step = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.rows = 300;
        config.simulation.cols = 300;
        assert!(config.validate().is_err());

        // 256×256 的顶点编号 0..=65535 仍能放进 16 位索引
        let mut config = Config::default();
        config.simulation.rows = 256;
        config.simulation.cols = 256;
        assert!(config.validate().is_ok());
        config.simulation.rows = 257;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_config_errors_propagate() {
        let dir = std::env::temp_dir();
        let malformed = dir.join(format!("wave_render_bad_{}.toml", std::process::id()));
        std::fs::write(&malformed, "[simulation]\nrows = \"oops\"\n").unwrap();

        let result = Config::load(Some(malformed.as_path()));
        std::fs::remove_file(&malformed).unwrap();
        assert!(matches!(
            result,
            Err(WaveRenderError::Config(ConfigError::ParseError(_)))
        ));

        let missing = dir.join("wave_render_missing_config.toml");
        assert!(matches!(
            Config::load(Some(missing.as_path())),
            Err(WaveRenderError::Config(ConfigError::FileNotFound(_)))
        ));
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [graphics]
            backend = "wgpu"

            [simulation]
            rows = 64
            damping = 0.5

            [run]
            sample = "land-and-waves"
            "#,
        )
        .unwrap();

        assert_eq!(config.graphics.backend, GraphicsBackend::Wgpu);
        assert_eq!(config.simulation.rows, 64);
        assert_eq!(config.simulation.cols, 128);
        assert_eq!(config.simulation.damping, 0.5);
        assert_eq!(config.run.sample, SampleKind::LandAndWaves);
        assert_eq!(config.window.width, 800);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config
            .apply_args([
                "wave_render", "--sample", "shapes", "--frames", "10", "--wgpu", "--seed", "7",
            ])
            .unwrap();

        assert_eq!(config.run.sample, SampleKind::Shapes);
        assert_eq!(config.run.frames, 10);
        assert_eq!(config.graphics.backend, GraphicsBackend::Wgpu);
        assert_eq!(config.simulation.seed, 7);

        let mut config = Config::default();
        assert!(config.apply_args(["wave_render", "--sample", "teapot"]).is_err());
        assert!(config.apply_args(["wave_render", "--frames", "many"]).is_err());
    }
}
