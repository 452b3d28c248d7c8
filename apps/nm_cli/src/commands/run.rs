// apps/nm_cli/src/commands/run.rs

//! 场景插值命令
//!
//! 读取场景文件，构建插值算子，并对场景中的每个测量样本执行插值。
//!
//! # 架构说明
//!
//! 与实时管线使用同一条路径：
//! - 配置由 `InterpolationConfig` 描述，命令行参数可覆盖其中的字段
//! - 算子由 `InterpolationEngine` 发布，可选地交给 `RebuildWorker` 在后台构建
//! - 输出精度通过 `OutputPrecision` 枚举选择

use anyhow::{bail, Context, Result};
use clap::Args;
use nm_config::{InterpolationConfig, KernelKind, OutputPrecision};
use nm_interp::{
    Interpolated, InterpolationEngine, LoggingListener, OperatorStats, RebuildRequest,
    RebuildWorker,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::scene::Scene;

/// 场景插值参数
#[derive(Args)]
pub struct RunArgs {
    /// 场景文件路径
    #[arg(short, long)]
    pub scene: PathBuf,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 覆盖核函数 (linear, gaussian, quadratic_falloff)
    #[arg(short, long)]
    pub kernel: Option<KernelKind>,

    /// 覆盖截断距离
    #[arg(long)]
    pub cancel_distance: Option<f64>,

    /// 覆盖输出精度 (f32, f64)
    #[arg(long)]
    pub precision: Option<OutputPrecision>,

    /// 并行构建算子
    #[arg(long)]
    pub parallel: bool,

    /// 在后台重建线程中构建算子
    #[arg(long)]
    pub background: bool,

    /// 结果输出文件（JSON）
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// 写入输出文件的结果
#[derive(Serialize)]
struct RunReport {
    version: Option<u64>,
    kernel: String,
    cancel_distance: f64,
    stats: OperatorStats,
    unrecoverable_nodes: Vec<usize>,
    outputs: Vec<Interpolated>,
}

/// 执行插值命令
pub fn execute(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;

    info!("=== NeuroMap 场景插值 ===");
    info!("场景: {}", args.scene.display());
    info!(
        "核函数: {}, 截断距离: {}, 输出精度: {}",
        config.kernel, config.cancel_distance, config.output_precision
    );

    let (table, sensors, samples) = Scene::load(&args.scene)?
        .into_parts()
        .with_context(|| format!("场景布局无效: {}", args.scene.display()))?;
    info!("布局节点: {}, 传感器: {}, 样本: {}", table.n_nodes(), sensors.len(), samples.len());

    let engine = Arc::new(InterpolationEngine::new());
    engine
        .events()
        .add_listener(Arc::new(LoggingListener::new("interp")));

    let start = Instant::now();
    if args.background {
        let mut worker = RebuildWorker::spawn(engine.clone())?;
        worker.submit(RebuildRequest::rebuild(table, sensors, config.clone()))?;
        if !worker.wait_for_idle(Duration::from_secs(60)) {
            bail!("后台构建超时");
        }
        let stats = worker.stats();
        worker.shutdown();
        if let Some(e) = stats.last_error {
            bail!("算子构建失败: {}", e);
        }
    } else {
        engine
            .rebuild(&table, &sensors, &config)
            .context("算子构建失败")?;
    }
    let build_ms = start.elapsed().as_secs_f64() * 1000.0;

    let operator = engine
        .current()
        .context("构建完成后没有可用的算子")?;
    println!("\n=== 算子 ===");
    println!("版本: {}", operator.version());
    println!("构建耗时: {:.3} ms", build_ms);
    println!("{}", operator.stats());

    let unrecoverable = operator.unrecoverable_nodes();
    if !unrecoverable.is_empty() {
        warn!(
            "{} 个节点在截断距离内没有传感器，估计值恒为 0",
            unrecoverable.len()
        );
    }

    println!("\n=== 插值结果 ===");
    let start = Instant::now();
    let mut outputs = Vec::with_capacity(samples.len());
    for (i, sample) in samples.iter().enumerate() {
        let result = engine
            .apply_with_precision(sample, config.output_precision)
            .with_context(|| format!("样本 {} 插值失败", i))?;
        println!("样本 {:>4}: {}", i, format_values(&result));
        outputs.push(result);
    }
    if !samples.is_empty() {
        let per_sample_us = start.elapsed().as_secs_f64() * 1e6 / samples.len() as f64;
        info!("平均每样本 {:.2} µs", per_sample_us);
    }

    if let Some(path) = &args.output {
        let report = RunReport {
            version: engine.version(),
            kernel: operator.kernel_name().to_string(),
            cancel_distance: operator.cancel_distance(),
            stats: *operator.stats(),
            unrecoverable_nodes: unrecoverable,
            outputs,
        };
        let content = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, content)
            .with_context(|| format!("无法写入输出文件: {}", path.display()))?;
        info!("结果已写入: {}", path.display());
    }

    Ok(())
}

fn load_config(args: &RunArgs) -> Result<InterpolationConfig> {
    let mut config = match &args.config {
        Some(path) => InterpolationConfig::from_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
        None => InterpolationConfig::default(),
    };

    if let Some(kernel) = args.kernel {
        config.kernel = kernel;
    }
    if let Some(cancel_distance) = args.cancel_distance {
        config.cancel_distance = cancel_distance;
    }
    if let Some(precision) = args.precision {
        config.output_precision = precision;
    }
    if args.parallel {
        config.parallel_build = true;
    }

    config.validate().context("配置无效")?;
    Ok(config)
}

fn format_values(result: &Interpolated) -> String {
    match result {
        Interpolated::F32(values) => join(values.iter().map(|v| format!("{:.4}", v))),
        Interpolated::F64(values) => join(values.iter().map(|v| format!("{:.6}", v))),
    }
}

fn join(parts: impl Iterator<Item = String>) -> String {
    format!("[{}]", parts.collect::<Vec<_>>().join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const WORKED_SCENE: &str = r#"{
        "distances": [[0.0, 2.0], [1.0, 3.0], [2.0, 0.0], [5.0, 5.0]],
        "sensors": [0, 2],
        "samples": [[10.0, 20.0], [4.0, 8.0]]
    }"#;

    fn args(scene: &Path) -> RunArgs {
        RunArgs {
            scene: scene.to_path_buf(),
            config: None,
            kernel: None,
            cancel_distance: None,
            precision: None,
            parallel: false,
            background: false,
            output: None,
        }
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(&args(Path::new("scene.json"))).unwrap();
        assert_eq!(config.kernel, KernelKind::Linear);
        assert_eq!(config.output_precision, OutputPrecision::F32);
        assert!(!config.parallel_build);
    }

    #[test]
    fn test_load_config_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interp.json");
        InterpolationConfig::new(KernelKind::Gaussian, 0.5)
            .with_output_precision(OutputPrecision::F64)
            .save_to_file(&path)
            .unwrap();

        let mut run_args = args(Path::new("scene.json"));
        run_args.config = Some(path);
        run_args.kernel = Some(KernelKind::QuadraticFalloff);
        run_args.parallel = true;

        let config = load_config(&run_args).unwrap();
        assert_eq!(config.kernel, KernelKind::QuadraticFalloff);
        // 未覆盖的字段保留文件中的值
        assert_eq!(config.cancel_distance, 0.5);
        assert_eq!(config.output_precision, OutputPrecision::F64);
        assert!(config.parallel_build);
    }

    #[test]
    fn test_load_config_rejects_invalid_override() {
        let mut run_args = args(Path::new("scene.json"));
        run_args.cancel_distance = Some(-1.0);
        assert!(load_config(&run_args).is_err());

        let mut run_args = args(Path::new("scene.json"));
        run_args.kernel = Some(KernelKind::QuadraticFalloff);
        run_args.cancel_distance = Some(4.0);
        assert!(load_config(&run_args).is_err());
    }

    fn run_worked_scene(background: bool) -> serde_json::Value {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("scene.json");
        let output = dir.path().join("report.json");
        std::fs::write(&scene, WORKED_SCENE).unwrap();

        let mut run_args = args(&scene);
        run_args.cancel_distance = Some(4.0);
        run_args.background = background;
        run_args.output = Some(output.clone());
        execute(run_args).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    fn values(report: &serde_json::Value, sample: usize) -> Vec<f64> {
        report["outputs"][sample]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect()
    }

    #[test]
    fn test_execute_writes_report() {
        let report = run_worked_scene(false);
        assert_eq!(report["version"], 1);
        assert_eq!(report["kernel"], "linear");
        assert_eq!(report["unrecoverable_nodes"], serde_json::json!([3]));
        assert_eq!(values(&report, 0), vec![10.0, 12.5, 20.0, 0.0]);
        assert_eq!(values(&report, 1), vec![4.0, 5.0, 8.0, 0.0]);
    }

    #[test]
    fn test_execute_in_background() {
        let report = run_worked_scene(true);
        assert_eq!(report["version"], 1);
        assert_eq!(values(&report, 0), vec![10.0, 12.5, 20.0, 0.0]);
    }

    #[test]
    fn test_execute_rejects_bad_sample() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("scene.json");
        std::fs::write(
            &scene,
            r#"{ "distances": [[0.0], [0.5]], "sensors": [0], "samples": [[1.0, 2.0]] }"#,
        )
        .unwrap();
        assert!(execute(args(&scene)).is_err());
    }
}
