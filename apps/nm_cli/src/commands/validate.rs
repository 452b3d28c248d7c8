// apps/nm_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 验证插值配置文件，并可选地用场景文件试构建算子、检查行不变量。

use anyhow::{bail, Context, Result};
use clap::Args;
use nm_config::InterpolationConfig;
use nm_foundation::ValidationReport;
use nm_interp::OperatorBuilder;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::scene::Scene;

/// 行不变量检查容差
const ROW_TOLERANCE: f64 = 1e-9;

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 场景文件路径（试构建算子）
    #[arg(short, long)]
    pub scene: Option<PathBuf>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== NeuroMap 配置验证 ===");

    if args.config.is_none() && args.scene.is_none() {
        println!("用法: nm_cli validate --config <配置文件> [--scene <场景文件>]");
        println!("      nm_cli validate --scene <场景文件>");
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => validate_config(path)?,
        None => InterpolationConfig::default(),
    };

    let mut report = ValidationReport::new();
    if let Some(scene_path) = &args.scene {
        report.merge(validate_scene(scene_path, &config)?);
    }

    print_report(&report, args.strict)
}

fn validate_config(path: &Path) -> Result<InterpolationConfig> {
    info!("验证配置文件: {}", path.display());

    let config = InterpolationConfig::from_file(path)
        .with_context(|| format!("配置文件无效: {}", path.display()))?;

    println!("✓ 配置文件有效");
    println!("  核函数: {} ({})", config.kernel, config.kernel.description());
    println!("  截断距离: {}", config.cancel_distance);
    println!("  输出精度: {}", config.output_precision);
    println!("  并行构建: {}", config.parallel_build);

    Ok(config)
}

fn validate_scene(path: &Path, config: &InterpolationConfig) -> Result<ValidationReport> {
    info!("验证场景文件: {}", path.display());

    let (table, sensors, samples) = Scene::load(path)?
        .into_parts()
        .with_context(|| format!("场景布局无效: {}", path.display()))?;

    for (i, sample) in samples.iter().enumerate() {
        if sample.len() != sensors.len() {
            warn!(
                "样本 {} 长度为 {}，传感器数为 {}",
                i,
                sample.len(),
                sensors.len()
            );
        }
    }

    let operator = OperatorBuilder::from_config(config)
        .build_with_config(&table, &sensors, config)
        .context("算子构建失败")?;

    println!("✓ 算子构建成功");
    println!("  {}", operator.stats());

    Ok(operator.validate(ROW_TOLERANCE))
}

fn print_report(report: &ValidationReport, strict: bool) -> Result<()> {
    for e in &report.errors {
        error!("{}", e);
    }
    for w in &report.warnings {
        warn!("{}", w);
    }
    println!("{}", report);

    if report.has_errors() {
        bail!("验证失败: {} 个错误", report.error_count());
    }
    if strict && report.has_warnings() {
        bail!("严格模式验证失败: {} 个警告", report.warning_count());
    }

    println!("✓ 验证通过");
    Ok(())
}
