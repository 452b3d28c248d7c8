// apps/nm_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示可用核函数、特性开关与默认配置。

use anyhow::Result;
use clap::Args;
use nm_config::{InterpolationConfig, KernelKind, OutputPrecision};
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 只显示核函数
    #[arg(long)]
    pub kernels: bool,

    /// 只显示默认配置
    #[arg(long)]
    pub defaults: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== NeuroMap 信息 ===");

    let show_all = !args.kernels && !args.defaults;

    if show_all {
        print_build_info();
        println!();
    }
    if args.kernels || show_all {
        print_kernels();
        println!();
    }
    if args.defaults || show_all {
        print_default_config()?;
    }

    Ok(())
}

fn print_build_info() {
    println!("=== 构建信息 ===");
    println!("NeuroMap CLI 版本: {}", env!("CARGO_PKG_VERSION"));
    println!("目标平台: {}", std::env::consts::ARCH);
    println!("操作系统: {}", std::env::consts::OS);
    println!(
        "并行构建 (parallel 特性): {}",
        if cfg!(feature = "parallel") { "✓" } else { "✗" }
    );

    println!("\n输出精度:");
    for precision in [OutputPrecision::F32, OutputPrecision::F64] {
        println!("  - {} ({} 字节)", precision, precision.size_bytes());
    }
}

fn print_kernels() {
    println!("=== 核函数 ===");
    for kind in KernelKind::ALL {
        let limit = kind
            .max_safe_distance()
            .map(|d| format!("截断距离 ≤ {}", d))
            .unwrap_or_else(|| "无截断距离限制".to_string());
        println!("  {:<18} {:<28} {}", kind.name(), kind.description(), limit);
    }
}

fn print_default_config() -> Result<()> {
    println!("=== 默认配置 ===");
    let config = InterpolationConfig::default();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
