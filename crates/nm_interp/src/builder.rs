// crates/nm_interp/src/builder.rs

//! 插值算子构建器
//!
//! 反距离式归一化：对节点 r，截断距离内每个传感器 q 的核函数值为
//! f_q = kernel(d_rq)，权重为
//!
//! $$
//! w_{rq} = \frac{1 / f_q}{\sum_{j} 1 / f_j}
//! $$
//!
//! 所以同一行的权重之和为 1。传感器节点直接透传自身读数，不与邻居混合。
//!
//! # 示例
//!
//! ```
//! use nm_interp::builder::OperatorBuilder;
//! use nm_interp::kernel::linear;
//! use nm_interp::layout::{DistanceTable, SensorSet};
//!
//! let table = DistanceTable::from_rows(vec![
//!     vec![0.0, 2.0],
//!     vec![1.0, 3.0],
//!     vec![2.0, 0.0],
//!     vec![5.0, 5.0],
//! ])
//! .unwrap();
//! let sensors = SensorSet::new(vec![0, 2], 4).unwrap();
//!
//! let op = OperatorBuilder::new().build(&table, &sensors, &linear, 4.0).unwrap();
//! assert!((op.weight(1, 0) - 0.75).abs() < 1e-12);
//! assert_eq!(op.row(3).nnz(), 0);
//! ```

use std::time::Instant;

use nm_config::InterpolationConfig;
use nm_foundation::{NmError, NmResult};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::kernel::{StandardKernel, WeightKernel};
use crate::layout::{DistanceTable, SensorSet};
use crate::operator::InterpolationOperator;
use crate::sparse::{CsrMatrix, Triplet};

/// 插值算子构建器
///
/// 构建器本身无状态，只保存构建选项；同一组输入总是产生逐元素相同的算子。
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorBuilder {
    parallel: bool,
}

impl OperatorBuilder {
    /// 创建串行构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置创建构建器
    pub fn from_config(config: &InterpolationConfig) -> Self {
        Self::new().with_parallel(config.parallel_build)
    }

    /// 设置是否按行并行构建
    ///
    /// 未启用 `parallel` 特性时该选项被忽略，退化为串行构建。
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 是否请求并行构建
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// 使用配置中的标准核函数与截断距离构建算子
    pub fn build_with_config(
        &self,
        table: &DistanceTable,
        sensors: &SensorSet,
        config: &InterpolationConfig,
    ) -> NmResult<InterpolationOperator> {
        config.validate()?;
        let kernel = StandardKernel::from(config.kernel);
        self.build(table, sensors, &kernel, config.cancel_distance)
    }

    /// 构建插值算子
    ///
    /// # 错误
    /// - 传感器集合与距离表节点数不一致、距离表列数少于传感器数: `DimensionMismatch`
    /// - 截断距离不是有限正数: `InvalidCancelDistance`
    /// - 非传感器行中存在负值或 NaN 距离: `InvalidDistance`
    /// - 阈值内核函数值非正或非有限: `NonPositiveWeight`
    /// - 阈值内核函数值过小，倒数和溢出: `DegenerateWeight`
    pub fn build<K>(
        &self,
        table: &DistanceTable,
        sensors: &SensorSet,
        kernel: &K,
        cancel_distance: f64,
    ) -> NmResult<InterpolationOperator>
    where
        K: WeightKernel + ?Sized,
    {
        let start = Instant::now();
        let n_nodes = table.n_nodes();
        let n_sensors = sensors.len();

        if sensors.n_nodes() != n_nodes {
            return Err(NmError::dimension_mismatch(
                "sensor set layout nodes",
                n_nodes,
                sensors.n_nodes(),
            ));
        }
        if table.n_columns() < n_sensors {
            return Err(NmError::dimension_mismatch(
                "distance table columns",
                n_sensors,
                table.n_columns(),
            ));
        }
        if !cancel_distance.is_finite() || cancel_distance <= 0.0 {
            return Err(NmError::InvalidCancelDistance {
                value: cancel_distance,
            });
        }

        let triplets = self.collect_triplets(table, sensors, kernel, cancel_distance)?;
        let matrix = CsrMatrix::from_triplets(n_nodes, n_sensors, triplets)?;
        let operator = InterpolationOperator::new(
            matrix,
            sensors.clone(),
            kernel.name().to_string(),
            cancel_distance,
        );

        let stats = operator.stats();
        debug!(
            kernel = kernel.name(),
            cancel_distance,
            n_nodes,
            n_sensors,
            nnz = stats.nnz,
            unrecoverable = stats.unrecoverable_nodes,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "interpolation operator built"
        );
        if stats.unrecoverable_nodes > 0 {
            debug!(
                count = stats.unrecoverable_nodes,
                "nodes without sensors inside cancel distance produce zero rows"
            );
        }

        Ok(operator)
    }

    #[cfg(feature = "parallel")]
    fn collect_triplets<K>(
        &self,
        table: &DistanceTable,
        sensors: &SensorSet,
        kernel: &K,
        cancel_distance: f64,
    ) -> NmResult<Vec<Triplet>>
    where
        K: WeightKernel + ?Sized,
    {
        if !self.parallel {
            return collect_serial(table, sensors, kernel, cancel_distance);
        }

        let rows: Vec<Vec<Triplet>> = (0..table.n_nodes())
            .into_par_iter()
            .map(|node| {
                let mut entries = Vec::new();
                row_entries(table, sensors, kernel, cancel_distance, node, &mut entries)?;
                Ok::<_, NmError>(entries)
            })
            .collect::<NmResult<_>>()?;

        Ok(rows.into_iter().flatten().collect())
    }

    #[cfg(not(feature = "parallel"))]
    fn collect_triplets<K>(
        &self,
        table: &DistanceTable,
        sensors: &SensorSet,
        kernel: &K,
        cancel_distance: f64,
    ) -> NmResult<Vec<Triplet>>
    where
        K: WeightKernel + ?Sized,
    {
        if self.parallel {
            debug!("parallel build requested without the `parallel` feature, building serially");
        }
        collect_serial(table, sensors, kernel, cancel_distance)
    }
}

fn collect_serial<K>(
    table: &DistanceTable,
    sensors: &SensorSet,
    kernel: &K,
    cancel_distance: f64,
) -> NmResult<Vec<Triplet>>
where
    K: WeightKernel + ?Sized,
{
    let mut triplets = Vec::with_capacity(table.n_nodes());
    for node in 0..table.n_nodes() {
        row_entries(table, sensors, kernel, cancel_distance, node, &mut triplets)?;
    }
    Ok(triplets)
}

/// 计算单行的非零元并追加到 `out`
fn row_entries<K>(
    table: &DistanceTable,
    sensors: &SensorSet,
    kernel: &K,
    cancel_distance: f64,
    node: usize,
    out: &mut Vec<Triplet>,
) -> NmResult<()>
where
    K: WeightKernel + ?Sized,
{
    if let Some(ordinal) = sensors.ordinal_of(node) {
        out.push(Triplet::new(node, ordinal, 1.0));
        return Ok(());
    }

    let distances = &table.row(node)[..sensors.len()];
    let first = out.len();
    let mut inv_sum = 0.0;

    for (sensor, &distance) in distances.iter().enumerate() {
        if distance.is_nan() || distance < 0.0 {
            return Err(NmError::InvalidDistance {
                node,
                sensor,
                distance,
            });
        }
        if distance >= cancel_distance {
            continue;
        }

        let f = kernel.weight(distance);
        if !f.is_finite() || f <= 0.0 {
            return Err(NmError::NonPositiveWeight {
                node,
                sensor,
                distance,
                weight: f,
            });
        }
        inv_sum += 1.0 / f;
        if !inv_sum.is_finite() {
            return Err(NmError::DegenerateWeight {
                node,
                sensor,
                distance,
                weight: f,
            });
        }
        // 暂存 f，归一化系数在扫描完整行后才确定
        out.push(Triplet::new(node, sensor, f));
    }

    for t in &mut out[first..] {
        t.value = 1.0 / (t.value * inv_sum);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{gaussian, linear, quadratic_falloff};
    use nm_config::KernelKind;

    fn table() -> DistanceTable {
        DistanceTable::from_rows(vec![
            vec![0.0, 2.0],
            vec![1.0, 3.0],
            vec![2.0, 0.0],
            vec![5.0, 5.0],
        ])
        .unwrap()
    }

    fn sensors() -> SensorSet {
        SensorSet::new(vec![0, 2], 4).unwrap()
    }

    #[test]
    fn test_worked_example_rows() {
        let op = OperatorBuilder::new()
            .build(&table(), &sensors(), &linear, 4.0)
            .unwrap();

        assert_eq!(op.weight(0, 0), 1.0);
        assert_eq!(op.weight(0, 1), 0.0);
        assert!((op.weight(1, 0) - 0.75).abs() < 1e-12);
        assert!((op.weight(1, 1) - 0.25).abs() < 1e-12);
        assert_eq!(op.weight(2, 1), 1.0);
        assert_eq!(op.row(3).nnz(), 0);
        assert_eq!(op.kernel_name(), "custom");
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 距离恰好等于截断距离时不参与
        let op = OperatorBuilder::new()
            .build(&table(), &sensors(), &linear, 3.0)
            .unwrap();
        assert_eq!(op.row(1).nnz(), 1);
        assert_eq!(op.weight(1, 0), 1.0);
    }

    #[test]
    fn test_sensor_rows_skip_distance_lookup() {
        // 传感器行中的非法距离不会被读取
        let table = DistanceTable::from_rows(vec![
            vec![f64::NAN, -1.0],
            vec![1.0, 3.0],
            vec![-7.0, f64::NAN],
        ])
        .unwrap();
        let sensors = SensorSet::new(vec![0, 2], 3).unwrap();
        assert!(OperatorBuilder::new()
            .build(&table, &sensors, &linear, 4.0)
            .is_ok());
    }

    #[test]
    fn test_invalid_distance() {
        let table = DistanceTable::from_rows(vec![vec![0.0], vec![-0.5]]).unwrap();
        let sensors = SensorSet::new(vec![0], 2).unwrap();
        let err = OperatorBuilder::new()
            .build(&table, &sensors, &linear, 1.0)
            .unwrap_err();
        assert!(matches!(err, NmError::InvalidDistance { node: 1, sensor: 0, .. }));
    }

    #[test]
    fn test_zero_distance_with_linear_kernel() {
        // 非传感器节点与传感器重合时 f = 0
        let table = DistanceTable::from_rows(vec![vec![0.0], vec![0.0]]).unwrap();
        let sensors = SensorSet::new(vec![0], 2).unwrap();
        let err = OperatorBuilder::new()
            .build(&table, &sensors, &linear, 1.0)
            .unwrap_err();
        assert!(matches!(err, NmError::NonPositiveWeight { node: 1, .. }));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_subnormal_kernel_value_rejected() {
        // 1/f 溢出为 inf 时整行权重会退化为 0
        let table = DistanceTable::from_rows(vec![vec![0.0], vec![1e-320]]).unwrap();
        let sensors = SensorSet::new(vec![0], 2).unwrap();
        let err = OperatorBuilder::new()
            .build(&table, &sensors, &linear, 1.0)
            .unwrap_err();
        assert!(matches!(err, NmError::DegenerateWeight { node: 1, sensor: 0, .. }));
        assert!(err.is_config_error());

        let far = DistanceTable::from_rows(vec![vec![0.0], vec![37.7]]).unwrap();
        let err = OperatorBuilder::new()
            .build(&far, &sensors, &gaussian, 50.0)
            .unwrap_err();
        assert!(matches!(err, NmError::DegenerateWeight { node: 1, .. }));
    }

    #[test]
    fn test_quadratic_falloff_beyond_range() {
        let table = DistanceTable::from_rows(vec![vec![0.0], vec![3.5]]).unwrap();
        let sensors = SensorSet::new(vec![0], 2).unwrap();
        let err = OperatorBuilder::new()
            .build(&table, &sensors, &quadratic_falloff, 4.0)
            .unwrap_err();
        assert!(matches!(err, NmError::NonPositiveWeight { .. }));

        // 截断距离 ≤ 3 时该距离被排除
        let op = OperatorBuilder::new()
            .build(&table, &sensors, &quadratic_falloff, 3.0)
            .unwrap();
        assert_eq!(op.unrecoverable_nodes(), vec![1]);
    }

    #[test]
    fn test_precondition_errors() {
        let builder = OperatorBuilder::new();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                builder.build(&table(), &sensors(), &gaussian, bad),
                Err(NmError::InvalidCancelDistance { .. })
            ));
        }

        let narrow = DistanceTable::from_rows(vec![vec![0.0]; 4]).unwrap();
        assert!(matches!(
            builder.build(&narrow, &sensors(), &gaussian, 1.0),
            Err(NmError::DimensionMismatch { .. })
        ));

        let other_layout = SensorSet::new(vec![0, 2], 5).unwrap();
        assert!(matches!(
            builder.build(&table(), &other_layout, &gaussian, 1.0),
            Err(NmError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let wide = DistanceTable::from_rows(vec![
            vec![0.0, 2.0, -1.0],
            vec![1.0, 3.0, f64::NAN],
            vec![2.0, 0.0, 9.0],
            vec![5.0, 5.0, 0.0],
        ])
        .unwrap();
        let op = OperatorBuilder::new()
            .build(&wide, &sensors(), &linear, 4.0)
            .unwrap();
        assert_eq!(op.n_sensors(), 2);
        assert!((op.weight(1, 0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_build_with_config() {
        let config = InterpolationConfig::new(KernelKind::Gaussian, 4.0);
        let op = OperatorBuilder::from_config(&config)
            .build_with_config(&table(), &sensors(), &config)
            .unwrap();
        assert_eq!(op.kernel_name(), "gaussian");
        assert!((op.matrix().row_sum(1) - 1.0).abs() < 1e-12);

        let bad = InterpolationConfig::new(KernelKind::QuadraticFalloff, 4.0);
        let err = OperatorBuilder::new()
            .build_with_config(&table(), &sensors(), &bad)
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_parallel_option_matches_serial() {
        let serial = OperatorBuilder::new()
            .build(&table(), &sensors(), &gaussian, 4.0)
            .unwrap();
        let parallel = OperatorBuilder::new()
            .with_parallel(true)
            .build(&table(), &sensors(), &gaussian, 4.0)
            .unwrap();
        assert_eq!(serial.matrix(), parallel.matrix());
    }
}
