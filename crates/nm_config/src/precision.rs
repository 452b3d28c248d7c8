// crates/nm_config/src/precision.rs

//! 输出精度选择
//!
//! 插值结果内部始终以 f64 累加，`OutputPrecision` 只决定交付给下游
//! （显示、存储）的数据类型。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 输出精度枚举
///
/// # 示例
///
/// ```rust
/// use nm_config::OutputPrecision;
///
/// let precision: OutputPrecision = "double".parse().unwrap();
/// assert_eq!(precision, OutputPrecision::F64);
/// assert_eq!(precision.size_bytes(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputPrecision {
    /// 单精度浮点 (f32)
    ///
    /// 默认值，实时显示与采集缓存使用单精度即可，内存占用减半。
    #[default]
    F32,
    /// 双精度浮点 (f64)
    F64,
}

impl OutputPrecision {
    /// 获取精度名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// 每个标量占用的字节数
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// 是否为单精度
    #[inline]
    pub fn is_f32(&self) -> bool {
        matches!(self, Self::F32)
    }

    /// 获取典型的机器精度
    pub fn epsilon(&self) -> f64 {
        match self {
            Self::F32 => f32::EPSILON as f64,
            Self::F64 => f64::EPSILON,
        }
    }
}

impl std::fmt::Display for OutputPrecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 精度解析错误
#[derive(Debug, Clone)]
pub struct PrecisionParseError(String);

impl FromStr for OutputPrecision {
    type Err = PrecisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "f32" | "float" | "single" | "float32" => Ok(Self::F32),
            "f64" | "double" | "float64" => Ok(Self::F64),
            _ => Err(PrecisionParseError(s.to_string())),
        }
    }
}

impl std::fmt::Display for PrecisionParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "无效的精度值: '{}', 期望 'f32' 或 'f64'", self.0)
    }
}

impl std::error::Error for PrecisionParseError {}
