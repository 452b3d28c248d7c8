// crates/nm_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `NmError` 枚举和 `NmResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! 1. **配置错误**: 构建插值算子时发现（传感器索引、距离表维度、阈值、核函数取值）
//! 2. **使用错误**: 应用插值算子时发现（算子未发布、测量向量长度不匹配）
//! 3. **运行时错误**: 工作线程、通道等基础设施故障
//!
//! 没有邻居传感器的节点输出零行，这是合法结果而不是错误。
//!
//! # 示例
//!
//! ```
//! use nm_foundation::error::{NmError, NmResult};
//!
//! fn check_threshold(cancel_distance: f64) -> NmResult<()> {
//!     if !(cancel_distance > 0.0) {
//!         return Err(NmError::InvalidCancelDistance { value: cancel_distance });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_threshold(0.05).is_ok());
//! assert!(check_threshold(0.0).unwrap_err().is_config_error());
//! ```

use thiserror::Error;

/// 统一结果类型
pub type NmResult<T> = Result<T, NmError>;

/// NeuroMap 错误类型
#[derive(Error, Debug)]
pub enum NmError {
    // ========================================================================
    // 配置错误（构建阶段）
    // ========================================================================
    /// 传感器索引超出布局节点范围
    #[error("传感器索引越界: 第{position}个传感器指向节点{index}, 节点总数{n_nodes}")]
    InvalidSensorIndex {
        /// 在传感器序列中的位置
        position: usize,
        /// 节点索引
        index: usize,
        /// 布局节点总数
        n_nodes: usize,
    },

    /// 传感器索引重复
    #[error("传感器索引重复: 节点{index}同时出现在位置{first}和{second}")]
    DuplicateSensor {
        /// 重复的节点索引
        index: usize,
        /// 第一次出现的位置
        first: usize,
        /// 重复出现的位置
        second: usize,
    },

    /// 传感器集合为空
    #[error("传感器集合为空")]
    EmptySensorSet,

    /// 布局没有任何节点
    #[error("布局节点数为 0")]
    EmptyLayout,

    /// 距离表维度与传感器集合不一致
    #[error("距离表维度不匹配: {what} 期望{expected}, 实际{actual}")]
    DimensionMismatch {
        /// 维度描述
        what: &'static str,
        /// 期望值
        expected: usize,
        /// 实际值
        actual: usize,
    },

    /// 截断距离无效（必须为有限正数）
    #[error("截断距离无效: {value} (必须为有限正数)")]
    InvalidCancelDistance {
        /// 传入的截断距离
        value: f64,
    },

    /// 距离表中存在负值或非有限值
    #[error("距离值无效: 节点{node} 到传感器{sensor} 的距离为 {distance}")]
    InvalidDistance {
        /// 布局节点
        node: usize,
        /// 传感器序号
        sensor: usize,
        /// 距离值
        distance: f64,
    },

    /// 核函数在阈值内返回非正值（归一化时会除零）
    #[error(
        "核函数取值非正: 节点{node} 到传感器{sensor} 距离 {distance} 时核函数值为 {weight}"
    )]
    NonPositiveWeight {
        /// 布局节点
        node: usize,
        /// 传感器序号
        sensor: usize,
        /// 距离值
        distance: f64,
        /// 核函数返回值
        weight: f64,
    },

    /// 核函数在阈值内取值过小，倒数或归一化和溢出
    #[error(
        "核函数取值过小, 归一化溢出: 节点{node} 传感器{sensor} 距离 {distance} 核函数值 {weight}"
    )]
    DegenerateWeight {
        /// 布局节点
        node: usize,
        /// 传感器序号
        sensor: usize,
        /// 距离值
        distance: f64,
        /// 核函数返回值
        weight: f64,
    },

    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    // ========================================================================
    // 使用错误（应用阶段）
    // ========================================================================
    /// 尚未发布插值算子，或已被清除
    #[error("插值算子不存在: 尚未构建或已被清除")]
    NoOperator,

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },

    // ========================================================================
    // 基础设施错误
    // ========================================================================
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 通道发送失败
    #[error("通道发送失败")]
    ChannelSendError,

    /// 运行时错误
    #[error("运行时错误: {0}")]
    Runtime(String),
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl NmError {
    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 距离表维度不匹配
    pub fn dimension_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 运行时错误
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }
}

// ========================================================================
// 分类与验证辅助方法
// ========================================================================

impl NmError {
    /// 是否为配置错误（构建阶段拒绝的输入）
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSensorIndex { .. }
                | Self::DuplicateSensor { .. }
                | Self::EmptySensorSet
                | Self::EmptyLayout
                | Self::DimensionMismatch { .. }
                | Self::InvalidCancelDistance { .. }
                | Self::InvalidDistance { .. }
                | Self::NonPositiveWeight { .. }
                | Self::DegenerateWeight { .. }
                | Self::Config { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// 是否为使用错误（应用阶段调用方的错误）
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::NoOperator | Self::SizeMismatch { .. })
    }

    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> NmResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> NmResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for NmError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl<T> From<std::sync::mpsc::SendError<T>> for NmError {
    fn from(_: std::sync::mpsc::SendError<T>) -> Self {
        Self::ChannelSendError
    }
}

// ========================================================================
// 测试
// ========================================================================
