// crates/nm_config/src/kernel_kind.rs

//! 核函数标识
//!
//! 配置层只保存核函数的名字，具体实现位于 `nm_interp::kernel`。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 标准核函数标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    /// f(d) = d，配合构建器的 1/f 归一化即为反距离加权
    #[default]
    Linear,
    /// f(d) = exp(-d²/2)
    Gaussian,
    /// f(d) = 1 - d²/9，在 d ≥ 3 时非正
    QuadraticFalloff,
}

impl KernelKind {
    /// 全部标准核函数
    pub const ALL: [KernelKind; 3] = [Self::Linear, Self::Gaussian, Self::QuadraticFalloff];

    /// 核函数名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Gaussian => "gaussian",
            Self::QuadraticFalloff => "quadratic_falloff",
        }
    }

    /// 核函数保持为正的最大截断距离
    ///
    /// 截断距离超过该值时，阈值内的距离可能让核函数取到非正值。
    pub fn max_safe_distance(&self) -> Option<f64> {
        match self {
            Self::QuadraticFalloff => Some(3.0),
            Self::Linear | Self::Gaussian => None,
        }
    }

    /// 简短说明
    pub fn description(&self) -> &'static str {
        match self {
            Self::Linear => "f(d) = d, 反距离加权",
            Self::Gaussian => "f(d) = exp(-d²/2)",
            Self::QuadraticFalloff => "f(d) = 1 - d²/9, 截断距离须 ≤ 3",
        }
    }
}

impl std::fmt::Display for KernelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 核函数名称解析错误
#[derive(Debug, Clone)]
pub struct KernelParseError(String);

impl FromStr for KernelKind {
    type Err = KernelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "linear" | "idw" => Ok(Self::Linear),
            "gaussian" | "gauss" => Ok(Self::Gaussian),
            "quadratic_falloff" | "quadratic" | "square" => Ok(Self::QuadraticFalloff),
            _ => Err(KernelParseError(s.to_string())),
        }
    }
}

impl std::fmt::Display for KernelParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "无效的核函数: '{}', 期望 'linear'、'gaussian' 或 'quadratic_falloff'",
            self.0
        )
    }
}

impl std::error::Error for KernelParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_parse() {
        assert_eq!("linear".parse::<KernelKind>().unwrap(), KernelKind::Linear);
        assert_eq!("Gaussian".parse::<KernelKind>().unwrap(), KernelKind::Gaussian);
        assert_eq!(
            "quadratic-falloff".parse::<KernelKind>().unwrap(),
            KernelKind::QuadraticFalloff
        );
        assert_eq!("square".parse::<KernelKind>().unwrap(), KernelKind::QuadraticFalloff);
        assert!("cubic".parse::<KernelKind>().is_err());
    }

    #[test]
    fn test_kernel_name_round_trip() {
        for kind in KernelKind::ALL {
            assert_eq!(kind.name().parse::<KernelKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kernel_serde_snake_case() {
        let json = serde_json::to_string(&KernelKind::QuadraticFalloff).unwrap();
        assert_eq!(json, "\"quadratic_falloff\"");
        let parsed: KernelKind = serde_json::from_str("\"gaussian\"").unwrap();
        assert_eq!(parsed, KernelKind::Gaussian);
    }

    #[test]
    fn test_max_safe_distance() {
        assert_eq!(KernelKind::QuadraticFalloff.max_safe_distance(), Some(3.0));
        assert!(KernelKind::Linear.max_safe_distance().is_none());
    }
}
