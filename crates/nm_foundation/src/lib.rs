// crates/nm_foundation/src/lib.rs

//! NeuroMap Foundation Layer
//!
//! 基础层，提供整个项目共用的错误类型与验证工具。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `NmError` / `NmResult`
//! - [`validation`]: 运行时验证报告
//!
//! # 层级架构
//!
//! ```text
//! Layer 4: nm_cli        ─> 命令行前端
//! Layer 3: nm_interp     ─> 核函数、算子构建、算子发布与应用
//! Layer 2: nm_config     ─> InterpolationConfig, KernelKind, OutputPrecision
//! Layer 1: nm_foundation ─> NmError, ValidationReport (本层)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod validation;

/// 层级标识
pub const LAYER: u8 = 1;

// 重导出常用类型
pub use error::{NmError, NmResult};
pub use validation::{ValidationError, ValidationReport, ValidationWarning};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{NmError, NmResult};
    pub use crate::validation::{ValidationError, ValidationReport, ValidationWarning};
}
