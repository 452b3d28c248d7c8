// crates/nm_interp/src/operator.rs

//! 插值算子
//!
//! `InterpolationOperator` 是构建完成后不可变的 N×M 稀疏矩阵，附带构建时
//! 使用的传感器集合、核函数名称与截断距离。每个采样周期调用
//! [`InterpolationOperator::apply`] 把 M 个传感器测量值映射为 N 个节点估计值。
//!
//! # 行不变量
//!
//! - 传感器行：恰好一个非零元，位于该传感器序号列，值为 1
//! - 有邻居的非传感器行：权重均为正，和为 1
//! - 无邻居的非传感器行：全零，估计值恒为 0

use nm_config::OutputPrecision;
use nm_foundation::validation::{
    check_finite, check_range, ValidationError, ValidationReport, ValidationWarning,
};
use nm_foundation::{NmError, NmResult};
use serde::Serialize;

use crate::layout::SensorSet;
use crate::sparse::{CsrMatrix, RowView};

/// 启用 `parallel` 特性时，节点数达到该值的算子使用并行矩阵-向量乘法
pub const PARALLEL_APPLY_MIN_NODES: usize = 4096;

/// 算子统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatorStats {
    /// 节点数 N
    pub n_nodes: usize,
    /// 传感器数 M
    pub n_sensors: usize,
    /// 非零元总数
    pub nnz: usize,
    /// 传感器行数
    pub sensor_nodes: usize,
    /// 有邻居的非传感器行数
    pub interpolated_nodes: usize,
    /// 无邻居（全零）的行数
    pub unrecoverable_nodes: usize,
    /// 非传感器行的最大邻居数
    pub max_neighbours: usize,
}

impl OperatorStats {
    fn collect(matrix: &CsrMatrix, sensors: &SensorSet) -> Self {
        let mut interpolated_nodes = 0;
        let mut unrecoverable_nodes = 0;
        let mut max_neighbours = 0;

        for row in 0..matrix.n_rows() {
            if sensors.contains(row) {
                continue;
            }
            let nnz = matrix.row_nnz(row);
            if nnz == 0 {
                unrecoverable_nodes += 1;
            } else {
                interpolated_nodes += 1;
                max_neighbours = max_neighbours.max(nnz);
            }
        }

        Self {
            n_nodes: matrix.n_rows(),
            n_sensors: matrix.n_cols(),
            nnz: matrix.nnz(),
            sensor_nodes: sensors.len(),
            interpolated_nodes,
            unrecoverable_nodes,
            max_neighbours,
        }
    }

    /// 平均每行非零元数
    pub fn mean_row_nnz(&self) -> f64 {
        if self.n_nodes == 0 {
            0.0
        } else {
            self.nnz as f64 / self.n_nodes as f64
        }
    }
}

impl std::fmt::Display for OperatorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}×{} nnz={} (传感器 {}, 插值 {}, 无法恢复 {}, 最大邻居 {})",
            self.n_nodes,
            self.n_sensors,
            self.nnz,
            self.sensor_nodes,
            self.interpolated_nodes,
            self.unrecoverable_nodes,
            self.max_neighbours
        )
    }
}

/// 按输出精度交付的插值结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Interpolated {
    /// 单精度结果
    F32(Vec<f32>),
    /// 双精度结果
    F64(Vec<f64>),
}

impl Interpolated {
    /// 结果长度
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 结果精度
    pub fn precision(&self) -> OutputPrecision {
        match self {
            Self::F32(_) => OutputPrecision::F32,
            Self::F64(_) => OutputPrecision::F64,
        }
    }

    /// 转换为 f64 向量
    pub fn into_f64(self) -> Vec<f64> {
        match self {
            Self::F32(v) => v.into_iter().map(f64::from).collect(),
            Self::F64(v) => v,
        }
    }
}

/// 插值算子
#[derive(Debug, Clone)]
pub struct InterpolationOperator {
    matrix: CsrMatrix,
    sensors: SensorSet,
    kernel_name: String,
    cancel_distance: f64,
    version: u64,
    stats: OperatorStats,
}

impl InterpolationOperator {
    /// 由已组装的矩阵创建算子（版本号为 0，发布时由引擎分配）
    pub(crate) fn new(
        matrix: CsrMatrix,
        sensors: SensorSet,
        kernel_name: String,
        cancel_distance: f64,
    ) -> Self {
        let stats = OperatorStats::collect(&matrix, &sensors);
        Self {
            matrix,
            sensors,
            kernel_name,
            cancel_distance,
            version: 0,
            stats,
        }
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// 发布版本号，未经引擎发布时为 0
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// 节点数 N
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.matrix.n_rows()
    }

    /// 传感器数 M
    #[inline]
    pub fn n_sensors(&self) -> usize {
        self.matrix.n_cols()
    }

    /// 非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// 底层稀疏矩阵
    #[inline]
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    /// 构建时使用的传感器集合
    #[inline]
    pub fn sensors(&self) -> &SensorSet {
        &self.sensors
    }

    /// 核函数名称
    #[inline]
    pub fn kernel_name(&self) -> &str {
        &self.kernel_name
    }

    /// 截断距离
    #[inline]
    pub fn cancel_distance(&self) -> f64 {
        self.cancel_distance
    }

    /// 统计信息
    #[inline]
    pub fn stats(&self) -> &OperatorStats {
        &self.stats
    }

    /// 节点 node 对第 sensor 个传感器的权重
    #[inline]
    pub fn weight(&self, node: usize, sensor: usize) -> f64 {
        self.matrix.get(node, sensor)
    }

    /// 节点 node 的非零权重
    #[inline]
    pub fn row(&self, node: usize) -> RowView<'_> {
        self.matrix.row(node)
    }

    /// 第 sensor 列（稠密），等于对单位测量向量 e_sensor 的插值结果
    pub fn column(&self, sensor: usize) -> Vec<f64> {
        self.matrix.column(sensor)
    }

    /// 节点是否无法恢复（非传感器且截断距离内无传感器）
    #[inline]
    pub fn is_unrecoverable(&self, node: usize) -> bool {
        !self.sensors.contains(node) && self.matrix.row_nnz(node) == 0
    }

    /// 全部无法恢复的节点
    pub fn unrecoverable_nodes(&self) -> Vec<usize> {
        (0..self.n_nodes())
            .filter(|&node| self.is_unrecoverable(node))
            .collect()
    }

    /// 插值：y = A · measurement
    ///
    /// # 错误
    /// - `measurement.len() != M` 时返回 `SizeMismatch`
    pub fn apply(&self, measurement: &[f64]) -> NmResult<Vec<f64>> {
        let mut output = vec![0.0; self.n_nodes()];
        self.apply_into(measurement, &mut output)?;
        Ok(output)
    }

    /// 插值到调用方提供的缓冲区
    ///
    /// # 错误
    /// - `measurement.len() != M` 或 `output.len() != N` 时返回 `SizeMismatch`
    pub fn apply_into(&self, measurement: &[f64], output: &mut [f64]) -> NmResult<()> {
        NmError::check_size("measurement", self.n_sensors(), measurement.len())?;
        NmError::check_size("output", self.n_nodes(), output.len())?;

        #[cfg(feature = "parallel")]
        {
            if self.n_nodes() >= PARALLEL_APPLY_MIN_NODES {
                self.matrix.mul_vec_parallel(measurement, output);
                return Ok(());
            }
        }

        self.matrix.mul_vec(measurement, output);
        Ok(())
    }

    /// 插值并以单精度交付（内部仍以 f64 累加）
    pub fn apply_f32(&self, measurement: &[f64]) -> NmResult<Vec<f32>> {
        Ok(self
            .apply(measurement)?
            .into_iter()
            .map(|v| v as f32)
            .collect())
    }

    /// 按指定精度插值
    pub fn apply_with_precision(
        &self,
        measurement: &[f64],
        precision: OutputPrecision,
    ) -> NmResult<Interpolated> {
        match precision {
            OutputPrecision::F32 => self.apply_f32(measurement).map(Interpolated::F32),
            OutputPrecision::F64 => self.apply(measurement).map(Interpolated::F64),
        }
    }

    /// 检查行不变量
    ///
    /// 违反不变量的行记为错误，无法恢复的节点记为警告。
    pub fn validate(&self, tolerance: f64) -> ValidationReport {
        let mut report = ValidationReport::new();

        for node in 0..self.n_nodes() {
            let row = self.matrix.row(node);

            let mut finite = true;
            for (_, w) in row.iter() {
                finite &= check_finite(&mut report, "weight", node, w);
            }
            if !finite {
                continue;
            }

            match self.sensors.ordinal_of(node) {
                Some(ordinal) => {
                    let unit = row.nnz() == 1
                        && row.col_indices()[0] == ordinal
                        && (row.values()[0] - 1.0).abs() <= tolerance;
                    if !unit {
                        report.add_error(ValidationError::RowInvariant {
                            node,
                            message: format!("传感器行应为第{}列的单位向量", ordinal),
                        });
                    }
                }
                None if row.is_empty() => {
                    report.add_warning(ValidationWarning::Unrecoverable { node });
                }
                None => {
                    for &w in row.values() {
                        if w <= 0.0 {
                            report.add_error(ValidationError::RowInvariant {
                                node,
                                message: format!("存在非正权重 {}", w),
                            });
                        } else {
                            check_range(&mut report, "weight", node, w, 0.0, 1.0 + tolerance);
                        }
                    }
                    let sum: f64 = row.values().iter().sum();
                    if (sum - 1.0).abs() > tolerance {
                        report.add_error(ValidationError::RowInvariant {
                            node,
                            message: format!("权重和为 {}, 应为 1", sum),
                        });
                    }
                }
            }
        }

        report
    }
}
