// crates/nm_interp/src/events.rs

//! 算子生命周期事件
//!
//! 引擎在发布、清除算子以及构建失败时分发事件，外围管线据此刷新显示
//! 或标记无法恢复的通道。

use parking_lot::RwLock;
use std::sync::Arc;

use crate::operator::OperatorStats;

/// 算子生命周期事件
#[derive(Debug, Clone)]
pub enum OperatorEvent {
    /// 新算子已发布
    Published {
        /// 新版本号
        version: u64,
        /// 被替换的版本号
        previous: Option<u64>,
        /// 核函数名称
        kernel: String,
        /// 算子统计
        stats: OperatorStats,
    },
    /// 算子已清除
    Cleared {
        /// 被清除的版本号
        version: u64,
    },
    /// 构建失败，当前算子保持不变
    BuildFailed {
        /// 错误信息
        error: String,
        /// 仍在使用的版本号
        current: Option<u64>,
    },
}

impl OperatorEvent {
    /// 事件涉及的算子版本
    pub fn version(&self) -> Option<u64> {
        match self {
            Self::Published { version, .. } => Some(*version),
            Self::Cleared { version } => Some(*version),
            Self::BuildFailed { current, .. } => *current,
        }
    }

    /// 获取事件名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Published { .. } => "Published",
            Self::Cleared { .. } => "Cleared",
            Self::BuildFailed { .. } => "BuildFailed",
        }
    }
}

/// 事件监听器trait
pub trait EventListener: Send + Sync {
    /// 处理事件
    fn on_event(&self, event: &OperatorEvent);

    /// 获取监听器名称 (用于调试)
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// 函数式事件监听器
pub struct FnListener<F>
where
    F: Fn(&OperatorEvent) + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnListener<F>
where
    F: Fn(&OperatorEvent) + Send + Sync,
{
    /// 创建函数式监听器
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&OperatorEvent) + Send + Sync,
{
    fn on_event(&self, event: &OperatorEvent) {
        (self.handler)(event);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 日志事件监听器
pub struct LoggingListener {
    prefix: String,
    verbose: bool,
}

impl LoggingListener {
    /// 创建日志监听器
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            verbose: false,
        }
    }

    /// 详细模式下额外输出完整统计
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl EventListener for LoggingListener {
    fn on_event(&self, event: &OperatorEvent) {
        match event {
            OperatorEvent::Published {
                version,
                kernel,
                stats,
                ..
            } => {
                if self.verbose {
                    tracing::info!(
                        "{}: operator v{} ({}) published: {}",
                        self.prefix,
                        version,
                        kernel,
                        stats
                    );
                } else {
                    tracing::info!(
                        "{}: operator v{} ({}) published, {} unrecoverable nodes",
                        self.prefix,
                        version,
                        kernel,
                        stats.unrecoverable_nodes
                    );
                }
            }
            OperatorEvent::Cleared { version } => {
                tracing::info!("{}: operator v{} cleared", self.prefix, version);
            }
            OperatorEvent::BuildFailed { error, current } => match current {
                Some(v) => {
                    tracing::warn!("{}: build failed, keeping v{}: {}", self.prefix, v, error)
                }
                None => {
                    tracing::warn!(
                        "{}: build failed, no operator published: {}",
                        self.prefix,
                        error
                    )
                }
            },
        }
    }

    fn name(&self) -> &str {
        "LoggingListener"
    }
}

/// 事件分发器
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventDispatcher {
    /// 创建新的事件分发器
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 添加监听器
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        let name = listener.name().to_string();
        self.listeners.write().push(listener);
        tracing::debug!("Added event listener: {}", name);
    }

    /// 添加函数式监听器
    pub fn add_fn_listener<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&OperatorEvent) + Send + Sync + 'static,
    {
        let listener = Arc::new(FnListener::new(name, handler));
        self.add_listener(listener);
    }

    /// 移除监听器
    pub fn remove_listener(&self, listener: &Arc<dyn EventListener>) {
        self.listeners
            .write()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// 清除所有监听器
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// 分发事件
    ///
    /// 分发前复制监听器列表，监听器内部可以安全地增删监听器。
    pub fn emit(&self, event: OperatorEvent) {
        let listeners = self.listeners.read().clone();

        tracing::trace!("Emitting event: {}", event.name());

        for listener in listeners.iter() {
            listener.on_event(&event);
        }
    }

    /// 获取监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
