// crates/nm_config/src/interp_config.rs

//! InterpolationConfig - 插值配置（全 f64）
//!
//! 定义构建插值算子所需的全部可调参数。距离表与传感器序列由外部系统
//! 提供，不属于配置文件内容。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::kernel_kind::KernelKind;
use crate::precision::OutputPrecision;

/// 插值配置
///
/// 传感器布局、核函数或截断距离任一变化时，都需要用新配置重建算子。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// 核函数
    #[serde(default)]
    pub kernel: KernelKind,

    /// 截断距离，距离 ≥ 该值的传感器不参与插值
    #[serde(default = "default_cancel_distance")]
    pub cancel_distance: f64,

    /// 输出精度
    #[serde(default)]
    pub output_precision: OutputPrecision,

    /// 是否并行构建算子（需启用 `nm_interp/parallel` 特性）
    #[serde(default)]
    pub parallel_build: bool,
}

fn default_cancel_distance() -> f64 { 0.05 }

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            kernel: KernelKind::default(),
            cancel_distance: default_cancel_distance(),
            output_precision: OutputPrecision::default(),
            parallel_build: false,
        }
    }
}

impl InterpolationConfig {
    /// 使用指定核函数与截断距离创建配置
    pub fn new(kernel: KernelKind, cancel_distance: f64) -> Self {
        Self {
            kernel,
            cancel_distance,
            ..Default::default()
        }
    }

    /// 设置输出精度
    pub fn with_output_precision(mut self, precision: OutputPrecision) -> Self {
        self.output_precision = precision;
        self
    }

    /// 设置是否并行构建
    pub fn with_parallel_build(mut self, parallel: bool) -> Self {
        self.parallel_build = parallel;
        self
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json(&content)
    }

    /// 从 JSON 字符串解析配置
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: InterpolationConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cancel_distance.is_finite() || self.cancel_distance <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "cancel_distance".to_string(),
                value: self.cancel_distance.to_string(),
                reason: "截断距离必须为有限正数".to_string(),
            });
        }

        if let Some(max) = self.kernel.max_safe_distance() {
            if self.cancel_distance > max {
                return Err(ConfigError::InvalidValue {
                    key: "cancel_distance".to_string(),
                    value: self.cancel_distance.to_string(),
                    reason: format!(
                        "核函数 {} 在距离 ≥ {} 时非正，截断距离不能超过该值",
                        self.kernel, max
                    ),
                });
            }
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InterpolationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kernel, KernelKind::Linear);
        assert_eq!(config.output_precision, OutputPrecision::F32);
    }

    #[test]
    fn test_invalid_cancel_distance() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = InterpolationConfig::new(KernelKind::Gaussian, bad);
            assert!(config.validate().is_err(), "应拒绝截断距离 {}", bad);
        }
    }

    #[test]
    fn test_quadratic_falloff_range() {
        assert!(InterpolationConfig::new(KernelKind::QuadraticFalloff, 3.0)
            .validate()
            .is_ok());
        assert!(InterpolationConfig::new(KernelKind::QuadraticFalloff, 3.5)
            .validate()
            .is_err());
        // 其它核函数不受限制
        assert!(InterpolationConfig::new(KernelKind::Linear, 10.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = InterpolationConfig::from_json(r#"{ "kernel": "gaussian" }"#).unwrap();
        assert_eq!(config.kernel, KernelKind::Gaussian);
        assert!((config.cancel_distance - 0.05).abs() < 1e-15);
        assert!(!config.parallel_build);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            InterpolationConfig::from_json(r#"{ "kernel": "cubic" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            InterpolationConfig::from_json(r#"{ "cancel_distance": -2.0 }"#),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = InterpolationConfig::new(KernelKind::QuadraticFalloff, 2.5)
            .with_output_precision(OutputPrecision::F64);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: InterpolationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interp.json");

        let config = InterpolationConfig::new(KernelKind::Gaussian, 0.04).with_parallel_build(true);
        config.save_to_file(&path).unwrap();

        let loaded = InterpolationConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = InterpolationConfig::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
