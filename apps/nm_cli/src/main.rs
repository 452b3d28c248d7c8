// apps/nm_cli/src/main.rs

//! NeuroMap 命令行界面
//!
//! 离线检查插值配置、对录制的场景文件执行插值。
//!
//! # 架构层级
//!
//! 本模块属于 **Layer 4: Application**：
//! - 只通过 `InterpolationConfig` 与 `InterpolationEngine` 使用插值层
//! - 库层错误在此处统一转换为 `anyhow::Error` 并附加上下文

mod commands;
mod scene;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// NeuroMap 空间插值命令行工具
#[derive(Parser)]
#[command(name = "nm_cli")]
#[command(author = "NeuroMap Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "NeuroMap sensor-to-layout interpolation tool", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 对场景文件执行插值
    Run(commands::run::RunArgs),
    /// 显示核函数与默认配置
    Info(commands::info::InfoArgs),
    /// 验证配置与场景
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
