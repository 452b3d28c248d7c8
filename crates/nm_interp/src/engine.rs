// crates/nm_interp/src/engine.rs

//! 插值引擎
//!
//! 持有当前发布的插值算子快照，负责重建、发布、清除与应用。
//!
//! # 并发模型
//!
//! ```text
//! 采样线程                     配置线程 / RebuildWorker
//!    │                                 │
//!    │ current(): 读锁内克隆 Arc        │ build(): 锁外完成构建
//!    │ apply(): 无锁矩阵乘法            │ publish(): 写锁内一次替换
//!    ▼                                 ▼
//!        RwLock<Option<Arc<InterpolationOperator>>>
//! ```
//!
//! 读者只会看到旧算子或完整的新算子；构建失败时旧算子保持发布状态。
//!
//! 版本号在写锁内分配，发布与清除互斥执行，事件按版本顺序分发。
//! 监听器中不得再调用 `rebuild`、`publish` 或 `clear`。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nm_config::{InterpolationConfig, OutputPrecision};
use nm_foundation::{NmError, NmResult};
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::builder::OperatorBuilder;
use crate::events::{EventDispatcher, OperatorEvent};
use crate::kernel::WeightKernel;
use crate::layout::{DistanceTable, SensorSet};
use crate::operator::{Interpolated, InterpolationOperator};

/// 插值引擎
pub struct InterpolationEngine {
    /// 当前发布的算子
    current: RwLock<Option<Arc<InterpolationOperator>>>,
    /// 下一个发布版本号
    next_version: AtomicU64,
    /// 串行化发布、清除与对应事件
    publish_order: Mutex<()>,
    /// 事件分发器
    events: EventDispatcher,
}

impl Default for InterpolationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpolationEngine {
    /// 创建空引擎（尚无算子）
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            next_version: AtomicU64::new(1),
            publish_order: Mutex::new(()),
            events: EventDispatcher::new(),
        }
    }

    /// 获取事件分发器
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// 当前算子快照
    pub fn current(&self) -> Option<Arc<InterpolationOperator>> {
        self.current.read().clone()
    }

    /// 当前算子版本
    pub fn version(&self) -> Option<u64> {
        self.current.read().as_ref().map(|op| op.version())
    }

    /// 是否已有发布的算子
    pub fn has_operator(&self) -> bool {
        self.current.read().is_some()
    }

    /// 使用配置中的标准核函数重建并发布
    ///
    /// 返回新算子的版本号。失败时当前算子保持不变。
    pub fn rebuild(
        &self,
        table: &DistanceTable,
        sensors: &SensorSet,
        config: &InterpolationConfig,
    ) -> NmResult<u64> {
        let result = OperatorBuilder::from_config(config).build_with_config(table, sensors, config);
        self.finish_build(result)
    }

    /// 使用自定义核函数重建并发布
    pub fn rebuild_with_kernel<K>(
        &self,
        table: &DistanceTable,
        sensors: &SensorSet,
        kernel: &K,
        cancel_distance: f64,
        parallel: bool,
    ) -> NmResult<u64>
    where
        K: WeightKernel + ?Sized,
    {
        let result = OperatorBuilder::new()
            .with_parallel(parallel)
            .build(table, sensors, kernel, cancel_distance);
        self.finish_build(result)
    }

    fn finish_build(&self, result: NmResult<InterpolationOperator>) -> NmResult<u64> {
        match result {
            Ok(operator) => Ok(self.publish(operator)),
            Err(e) => {
                let current = self.version();
                warn!(
                    error = %e,
                    current = ?current,
                    "operator rebuild failed, keeping current operator"
                );
                self.events.emit(OperatorEvent::BuildFailed {
                    error: e.to_string(),
                    current,
                });
                Err(e)
            }
        }
    }

    /// 发布已构建的算子，替换当前算子
    ///
    /// 返回分配给该算子的版本号。
    pub fn publish(&self, mut operator: InterpolationOperator) -> u64 {
        let kernel = operator.kernel_name().to_string();
        let stats = *operator.stats();

        let _order = self.publish_order.lock();
        let (version, previous) = {
            let mut current = self.current.write();
            let version = self.next_version.fetch_add(1, Ordering::SeqCst);
            operator.set_version(version);
            let previous = current.replace(Arc::new(operator)).map(|old| old.version());
            (version, previous)
        };

        info!(
            version,
            previous = ?previous,
            kernel = %kernel,
            nnz = stats.nnz,
            unrecoverable = stats.unrecoverable_nodes,
            "interpolation operator published"
        );
        self.events.emit(OperatorEvent::Published {
            version,
            previous,
            kernel,
            stats,
        });

        version
    }

    /// 清除当前算子
    ///
    /// 此后 `apply` 返回 `NoOperator`，直到下一次成功重建。
    /// 返回被清除的版本号。
    pub fn clear(&self) -> Option<u64> {
        let _order = self.publish_order.lock();
        let cleared = self.current.write().take().map(|old| old.version());

        if let Some(version) = cleared {
            info!(version, "interpolation operator cleared");
            self.events.emit(OperatorEvent::Cleared { version });
        }
        cleared
    }

    fn snapshot(&self) -> NmResult<Arc<InterpolationOperator>> {
        self.current().ok_or(NmError::NoOperator)
    }

    /// 插值当前测量向量
    ///
    /// # 错误
    /// - 尚无算子: `NoOperator`
    /// - 测量向量长度不等于传感器数: `SizeMismatch`
    pub fn apply(&self, measurement: &[f64]) -> NmResult<Vec<f64>> {
        self.snapshot()?.apply(measurement)
    }

    /// 插值到调用方提供的缓冲区
    pub fn apply_into(&self, measurement: &[f64], output: &mut [f64]) -> NmResult<()> {
        self.snapshot()?.apply_into(measurement, output)
    }

    /// 插值并以单精度交付
    pub fn apply_f32(&self, measurement: &[f64]) -> NmResult<Vec<f32>> {
        self.snapshot()?.apply_f32(measurement)
    }

    /// 按指定精度插值
    pub fn apply_with_precision(
        &self,
        measurement: &[f64],
        precision: OutputPrecision,
    ) -> NmResult<Interpolated> {
        self.snapshot()?.apply_with_precision(measurement, precision)
    }
}

impl std::fmt::Debug for InterpolationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpolationEngine")
            .field("version", &self.version())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nm_config::KernelKind;
    use std::sync::atomic::AtomicUsize;

    fn layout() -> (DistanceTable, SensorSet) {
        let table = DistanceTable::from_rows(vec![
            vec![0.0, 2.0],
            vec![1.0, 3.0],
            vec![2.0, 0.0],
            vec![5.0, 5.0],
        ])
        .unwrap();
        let sensors = SensorSet::new(vec![0, 2], 4).unwrap();
        (table, sensors)
    }

    #[test]
    fn test_apply_without_operator() {
        let engine = InterpolationEngine::new();
        assert!(matches!(engine.apply(&[1.0, 2.0]), Err(NmError::NoOperator)));
        assert!(engine.version().is_none());
        assert!(engine.clear().is_none());
    }

    #[test]
    fn test_rebuild_publish_clear() {
        let (table, sensors) = layout();
        let engine = InterpolationEngine::new();
        let config = InterpolationConfig::new(KernelKind::Linear, 4.0);

        let v1 = engine.rebuild(&table, &sensors, &config).unwrap();
        assert_eq!(engine.version(), Some(v1));
        assert_eq!(engine.apply(&[10.0, 20.0]).unwrap(), vec![10.0, 12.5, 20.0, 0.0]);

        let v2 = engine.rebuild(&table, &sensors, &config).unwrap();
        assert!(v2 > v1);

        assert_eq!(engine.clear(), Some(v2));
        assert!(matches!(engine.apply(&[10.0, 20.0]), Err(NmError::NoOperator)));
    }

    #[test]
    fn test_events_emitted() {
        let (table, sensors) = layout();
        let engine = InterpolationEngine::new();
        let failures = Arc::new(AtomicUsize::new(0));
        let published = Arc::new(AtomicUsize::new(0));

        let (f, p) = (failures.clone(), published.clone());
        engine.events().add_fn_listener("counter", move |event| match event {
            OperatorEvent::Published { .. } => {
                p.fetch_add(1, Ordering::SeqCst);
            }
            OperatorEvent::BuildFailed { .. } => {
                f.fetch_add(1, Ordering::SeqCst);
            }
            OperatorEvent::Cleared { .. } => {}
        });

        engine
            .rebuild(&table, &sensors, &InterpolationConfig::new(KernelKind::Gaussian, 4.0))
            .unwrap();
        let _ = engine.rebuild_with_kernel(&table, &sensors, &|_d: f64| 0.0, 4.0, false);

        assert_eq!(published.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_publish_versions_ordered() {
        let (table, sensors) = layout();
        let engine = InterpolationEngine::new();
        let config = InterpolationConfig::new(KernelKind::Linear, 4.0);
        let log: Arc<parking_lot::Mutex<Vec<(u64, Option<u64>)>>> = Arc::default();

        let sink = log.clone();
        engine.events().add_fn_listener("order", move |event| {
            if let OperatorEvent::Published { version, previous, .. } = event {
                sink.lock().push((*version, *previous));
            }
        });

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        engine.rebuild(&table, &sensors, &config).unwrap();
                    }
                });
            }
        });

        let log = log.lock();
        assert_eq!(log.len(), 100);
        for (i, &(version, previous)) in log.iter().enumerate() {
            assert_eq!(version, i as u64 + 1);
            assert_eq!(previous, if i == 0 { None } else { Some(i as u64) });
        }
        assert_eq!(engine.version(), Some(100));
    }
}
