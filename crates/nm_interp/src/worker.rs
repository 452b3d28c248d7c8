// crates/nm_interp/src/worker.rs

//! 后台重建线程
//!
//! 重建算子可能耗时数十毫秒，不应阻塞采样线程。`RebuildWorker` 在独立
//! 线程中构建并发布算子，采样线程在此期间继续使用旧算子。
//!
//! 队列中积压多个请求时，只执行最后一个成功的请求，较早的请求记为
//! 被取代（可通过 [`WorkerConfig::coalesce`] 关闭）。最新的请求构建失败时
//! 回退到次新的请求，结果与逐个执行相同。
//!
//! # 使用示例
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use nm_config::InterpolationConfig;
//! use nm_interp::engine::InterpolationEngine;
//! use nm_interp::layout::{DistanceTable, SensorSet};
//! use nm_interp::worker::{RebuildRequest, RebuildWorker};
//!
//! let engine = Arc::new(InterpolationEngine::new());
//! let worker = RebuildWorker::spawn(engine.clone()).unwrap();
//!
//! let table = DistanceTable::from_rows(vec![vec![0.0], vec![0.01]]).unwrap();
//! let sensors = SensorSet::new(vec![0], 2).unwrap();
//! worker
//!     .submit(RebuildRequest::rebuild(table, sensors, InterpolationConfig::default()))
//!     .unwrap();
//!
//! assert!(worker.wait_for_idle(Duration::from_secs(5)));
//! assert_eq!(engine.apply(&[3.0]).unwrap(), vec![3.0, 3.0]);
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nm_config::InterpolationConfig;
use nm_foundation::{NmError, NmResult};
use parking_lot::Mutex;
use tracing::debug;

use crate::engine::InterpolationEngine;
use crate::kernel::WeightKernel;
use crate::layout::{DistanceTable, SensorSet};

// ============================================================
// 请求
// ============================================================

/// 重建请求
pub enum RebuildRequest {
    /// 使用配置中的标准核函数重建
    Rebuild {
        /// 距离表
        table: Arc<DistanceTable>,
        /// 传感器集合
        sensors: Arc<SensorSet>,
        /// 插值配置
        config: InterpolationConfig,
    },
    /// 使用自定义核函数重建
    RebuildWithKernel {
        /// 距离表
        table: Arc<DistanceTable>,
        /// 传感器集合
        sensors: Arc<SensorSet>,
        /// 核函数
        kernel: Arc<dyn WeightKernel>,
        /// 截断距离
        cancel_distance: f64,
    },
    /// 清除当前算子
    Clear,
}

impl RebuildRequest {
    /// 创建标准重建请求
    pub fn rebuild(table: DistanceTable, sensors: SensorSet, config: InterpolationConfig) -> Self {
        Self::Rebuild {
            table: Arc::new(table),
            sensors: Arc::new(sensors),
            config,
        }
    }
}

impl std::fmt::Debug for RebuildRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rebuild { table, sensors, config } => f
                .debug_struct("Rebuild")
                .field("n_nodes", &table.n_nodes())
                .field("n_sensors", &sensors.len())
                .field("config", config)
                .finish(),
            Self::RebuildWithKernel {
                table,
                sensors,
                kernel,
                cancel_distance,
            } => f
                .debug_struct("RebuildWithKernel")
                .field("n_nodes", &table.n_nodes())
                .field("n_sensors", &sensors.len())
                .field("kernel", &kernel.name())
                .field("cancel_distance", cancel_distance)
                .finish(),
            Self::Clear => f.write_str("Clear"),
        }
    }
}

enum Message {
    Request(RebuildRequest),
    Shutdown,
}

// ============================================================
// 统计
// ============================================================

/// 重建线程统计信息
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// 总请求数
    pub submitted: u64,
    /// 成功发布数
    pub completed: u64,
    /// 构建失败数
    pub failed: u64,
    /// 被同批次中更新的请求取代而跳过的请求数
    pub superseded: u64,
    /// 执行的清除请求数
    pub cleared: u64,
    /// 最近一次发布的版本
    pub last_version: Option<u64>,
    /// 最近一次失败的错误信息
    pub last_error: Option<String>,
    /// 平均构建时间（毫秒）
    pub average_build_ms: f64,
    /// 最大队列长度
    pub max_queue_length: usize,
}

// ============================================================
// 重建线程
// ============================================================

/// 重建线程配置
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// 最大待处理请求数（0 表示无限制）
    pub max_pending: usize,
    /// 工作线程名称
    pub thread_name: String,
    /// 是否合并积压的重建请求
    pub coalesce: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_pending: 16,
            thread_name: "nm-rebuild-worker".to_string(),
            coalesce: true,
        }
    }
}

/// 后台重建线程
pub struct RebuildWorker {
    sender: Sender<Message>,
    worker: Option<JoinHandle<()>>,
    pending_count: Arc<AtomicUsize>,
    stats: Arc<Mutex<WorkerStats>>,
    shutdown_flag: Arc<AtomicBool>,
    engine: Arc<InterpolationEngine>,
    config: WorkerConfig,
}

impl RebuildWorker {
    /// 启动重建线程
    pub fn spawn(engine: Arc<InterpolationEngine>) -> NmResult<Self> {
        Self::with_config(engine, WorkerConfig::default())
    }

    /// 使用指定配置启动重建线程
    pub fn with_config(engine: Arc<InterpolationEngine>, config: WorkerConfig) -> NmResult<Self> {
        let (sender, receiver) = channel();
        let pending_count = Arc::new(AtomicUsize::new(0));
        let stats = Arc::new(Mutex::new(WorkerStats::default()));
        let shutdown_flag = Arc::new(AtomicBool::new(false));

        let context = LoopContext {
            engine: engine.clone(),
            pending_count: pending_count.clone(),
            stats: stats.clone(),
            coalesce: config.coalesce,
        };

        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || context.run(receiver))
            .map_err(|e| NmError::runtime(format!("无法创建重建线程: {}", e)))?;

        Ok(Self {
            sender,
            worker: Some(worker),
            pending_count,
            stats,
            shutdown_flag,
            engine,
            config,
        })
    }

    /// 关联的引擎
    pub fn engine(&self) -> &Arc<InterpolationEngine> {
        &self.engine
    }

    /// 提交请求
    ///
    /// # 错误
    /// - 线程已关闭或队列已满时返回 `Runtime`
    pub fn submit(&self, request: RebuildRequest) -> NmResult<()> {
        if self.shutdown_flag.load(Ordering::SeqCst) {
            return Err(NmError::runtime("重建线程已关闭"));
        }

        if self.config.max_pending > 0 && self.pending_count() >= self.config.max_pending {
            return Err(NmError::runtime(format!(
                "重建队列已满 ({} 个待处理)",
                self.config.max_pending
            )));
        }

        let current = self.pending_count.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut stats = self.stats.lock();
            stats.submitted += 1;
            stats.max_queue_length = stats.max_queue_length.max(current);
        }

        debug!(?request, "rebuild request submitted");
        if let Err(e) = self.sender.send(Message::Request(request)) {
            self.pending_count.fetch_sub(1, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }

    /// 获取待处理请求数
    pub fn pending_count(&self) -> usize {
        self.pending_count.load(Ordering::SeqCst)
    }

    /// 等待所有请求处理完毕，超时返回 false
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.pending_count() > 0 {
            if start.elapsed() > timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
        true
    }

    /// 获取统计信息
    pub fn stats(&self) -> WorkerStats {
        self.stats.lock().clone()
    }

    /// 关闭线程，已入队的请求先处理完
    pub fn shutdown(&mut self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        let _ = self.sender.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("rebuild worker thread panicked");
            }
        }
    }

    /// 线程是否已关闭
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }
}

impl Drop for RebuildWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RebuildWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildWorker")
            .field("pending", &self.pending_count())
            .field("shutdown", &self.is_shutdown())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================
// 工作线程主循环
// ============================================================

struct LoopContext {
    engine: Arc<InterpolationEngine>,
    pending_count: Arc<AtomicUsize>,
    stats: Arc<Mutex<WorkerStats>>,
    coalesce: bool,
}

impl LoopContext {
    fn run(self, receiver: Receiver<Message>) {
        while let Ok(first) = receiver.recv() {
            let mut batch = vec![first];
            while let Ok(next) = receiver.try_recv() {
                batch.push(next);
            }

            let mut shutdown = false;
            let mut dropped = 0;
            let mut requests = Vec::with_capacity(batch.len());
            for message in batch {
                match message {
                    Message::Request(_) if shutdown => dropped += 1,
                    Message::Request(request) => requests.push(request),
                    Message::Shutdown => shutdown = true,
                }
            }

            self.run_batch(requests);

            if shutdown {
                if dropped > 0 {
                    self.pending_count.fetch_sub(dropped, Ordering::SeqCst);
                    debug!(dropped, "requests queued after shutdown were dropped");
                }
                break;
            }
        }
        debug!("rebuild worker stopped");
    }

    /// 处理一批请求
    ///
    /// 合并模式下从最新的请求往前执行，直到某个请求成功发布或清除，
    /// 更早的请求记为被取代。最新请求失败时回退到次新的请求，
    /// 最终状态与逐个执行一致。
    fn run_batch(&self, requests: Vec<RebuildRequest>) {
        if !self.coalesce {
            for request in requests {
                self.process(request);
                self.pending_count.fetch_sub(1, Ordering::SeqCst);
            }
            return;
        }

        let mut settled = false;
        for request in requests.into_iter().rev() {
            if settled {
                self.stats.lock().superseded += 1;
                debug!(?request, "request superseded by a newer request");
            } else {
                settled = self.process(request);
            }
            self.pending_count.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// 执行单个请求，成功发布或清除时返回 true
    fn process(&self, request: RebuildRequest) -> bool {
        let start = Instant::now();
        let result = match request {
            RebuildRequest::Rebuild {
                table,
                sensors,
                config,
            } => self.engine.rebuild(&table, &sensors, &config),
            RebuildRequest::RebuildWithKernel {
                table,
                sensors,
                kernel,
                cancel_distance,
            } => self
                .engine
                .rebuild_with_kernel(&table, &sensors, &*kernel, cancel_distance, false),
            RebuildRequest::Clear => {
                self.engine.clear();
                self.stats.lock().cleared += 1;
                return true;
            }
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.lock();
        let published = match result {
            Ok(version) => {
                s.completed += 1;
                s.last_version = Some(version);
                true
            }
            Err(e) => {
                s.failed += 1;
                s.last_error = Some(e.to_string());
                false
            }
        };
        let total = s.completed + s.failed;
        s.average_build_ms = (s.average_build_ms * (total - 1) as f64 + elapsed_ms) / total as f64;
        published
    }
}

// ============================================================
// 测试
// ============================================================
