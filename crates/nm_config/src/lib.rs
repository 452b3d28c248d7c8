// crates/nm_config/src/lib.rs

//! NeuroMap Config Layer (Layer 2)
//!
//! 配置层，提供核函数标识、截断距离与输出精度选择。
//! 本层完全无泛型，使用枚举进行运行时分发。
//!
//! # 模块概览
//!
//! - [`kernel_kind`]: KernelKind 核函数标识
//! - [`precision`]: OutputPrecision 枚举（F32/F64）
//! - [`interp_config`]: InterpolationConfig 插值配置（全 f64）
//! - [`error`]: 配置错误类型
//!
//! # 设计原则
//!
//! 1. **无泛型**: 本层所有类型都不包含泛型参数
//! 2. **全 f64 配置**: 数值参数使用 f64
//! 3. **运行时分发**: 通过枚举选择核函数与输出精度

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod interp_config;
pub mod kernel_kind;
pub mod precision;

/// 层级标识
pub const LAYER: u8 = 2;

// 重导出核心类型
pub use error::ConfigError;
pub use interp_config::InterpolationConfig;
pub use kernel_kind::{KernelKind, KernelParseError};
pub use precision::{OutputPrecision, PrecisionParseError};
