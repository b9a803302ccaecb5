//! WaveRender 命令行入口
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件（默认 config.toml）
//! cargo run
//!
//! # 指定示例和帧数
//! cargo run -- --sample land-and-waves --frames 300
//!
//! # 使用 wgpu 离屏渲染并保存最后一帧
//! cargo run -- --wgpu --screenshot waves.png
//! ```
//!
//! # 命令行参数
//!
//! - `--config <path>`：配置文件路径；未指定时读取 `config.toml`，不存在则使用默认配置
//! - `--sample <box|shapes|lit-waves|land-and-waves>`
//! - `--backend <headless|wgpu>` / `--wgpu`
//! - `--frames <n>`、`--width <value>`、`--height <value>`、`--seed <u64>`
//! - `--screenshot <path>`、`--wireframe`、`--realtime`

use std::path::Path;

use anyhow::Context;
use tracing::{error, info};

use wave_render::app;
use wave_render::core::{log, Config};

/// 初始化流程：
///
/// 1. 加载配置文件（`--config` 指定的文件必须存在且能解析）
/// 2. 应用命令行参数并验证
/// 3. 初始化日志系统
/// 4. 运行示例
fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(Path::new);

    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    config
        .apply_args(&args)
        .context("Invalid command line arguments")?;
    config.validate().context("Invalid configuration")?;

    let log_file = config
        .logging
        .file_output
        .then(|| config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file);

    info!(version = env!("CARGO_PKG_VERSION"), "WaveRender starting...");
    info!(
        backend = config.graphics.backend.name(),
        width = config.window.width,
        height = config.window.height,
        frame_resources = config.graphics.frame_resources,
        "Graphics configuration"
    );

    app::run_sample(&config).context("Sample failed")?;

    info!("WaveRender finished");
    Ok(())
}
