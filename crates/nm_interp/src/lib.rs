// crates/nm_interp/src/lib.rs

//! NeuroMap 插值层 (Layer 3)
//!
//! 由 M 个传感器的读数估计布局中全部 N 个节点的值。算子只在布局、
//! 传感器、核函数或截断距离变化时重建一次，之后每个采样周期只做一次
//! 稀疏矩阵-向量乘法。
//!
//! # 模块结构
//!
//! - [`kernel`]: 权重核函数
//! - [`layout`]: 距离表与传感器集合
//! - [`sparse`]: CSR 稀疏矩阵
//! - [`builder`]: 算子构建器
//! - [`operator`]: 插值算子与统计
//! - [`engine`]: 算子发布与应用
//! - [`events`]: 算子生命周期事件
//! - [`worker`]: 后台重建线程
//!
//! # 特性开关
//!
//! - `parallel`: 启用基于 `rayon` 的并行构建与并行矩阵-向量乘法
//!
//! # 示例
//!
//! ```
//! use nm_config::{InterpolationConfig, KernelKind};
//! use nm_interp::{DistanceTable, InterpolationEngine, SensorSet};
//!
//! let table = DistanceTable::from_rows(vec![
//!     vec![0.0, 2.0],
//!     vec![1.0, 3.0],
//!     vec![2.0, 0.0],
//!     vec![5.0, 5.0],
//! ])?;
//! let sensors = SensorSet::new(vec![0, 2], 4)?;
//!
//! let engine = InterpolationEngine::new();
//! engine.rebuild(&table, &sensors, &InterpolationConfig::new(KernelKind::Linear, 4.0))?;
//!
//! let estimate = engine.apply(&[10.0, 20.0])?;
//! assert_eq!(estimate, vec![10.0, 12.5, 20.0, 0.0]);
//! # Ok::<(), nm_foundation::NmError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod engine;
pub mod events;
pub mod kernel;
pub mod layout;
pub mod operator;
pub mod sparse;
pub mod worker;

/// 层级标识
pub const LAYER: u8 = 3;

// 重导出核心类型
pub use builder::OperatorBuilder;
pub use engine::InterpolationEngine;
pub use events::{EventDispatcher, EventListener, LoggingListener, OperatorEvent};
pub use kernel::{NamedKernel, StandardKernel, WeightKernel};
pub use layout::{DistanceTable, SensorSet};
pub use operator::{Interpolated, InterpolationOperator, OperatorStats};
pub use sparse::{CsrMatrix, Triplet};
pub use worker::{RebuildRequest, RebuildWorker, WorkerConfig, WorkerStats};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::builder::OperatorBuilder;
    pub use crate::engine::InterpolationEngine;
    pub use crate::kernel::{gaussian, linear, quadratic_falloff, StandardKernel, WeightKernel};
    pub use crate::layout::{DistanceTable, SensorSet};
    pub use crate::operator::{Interpolated, InterpolationOperator};
    pub use nm_config::{InterpolationConfig, KernelKind, OutputPrecision};
    pub use nm_foundation::{NmError, NmResult};
}
