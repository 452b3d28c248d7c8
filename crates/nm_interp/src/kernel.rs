// crates/nm_interp/src/kernel.rs

//! 权重核函数
//!
//! 核函数把节点到传感器的距离 d 映射为正实数 f(d)。构建器对阈值内的
//! 每个传感器累加 1/f(d)，再以 1/(f(d)·Σ1/f) 作为该传感器的权重，
//! 因此同一行的权重之和恒为 1。
//!
//! | 核函数 | f(d) | 效果 |
//! |--------|------|------|
//! | linear | d | 反距离加权 |
//! | gaussian | exp(-d²/2) | 近乎均匀，远处略高 |
//! | quadratic_falloff | 1 - d²/9 | d ≥ 3 时非正，构建时报错 |
//!
//! 任何 `Fn(f64) -> f64 + Send + Sync` 闭包都可直接作为核函数使用。

use nm_config::KernelKind;

/// 权重核函数接口
pub trait WeightKernel: Send + Sync {
    /// 计算距离 d 处的核函数值
    fn weight(&self, distance: f64) -> f64;

    /// 核函数名称（用于日志与统计）
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> WeightKernel for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    #[inline]
    fn weight(&self, distance: f64) -> f64 {
        self(distance)
    }
}

/// f(d) = d
#[inline]
pub fn linear(distance: f64) -> f64 {
    distance
}

/// f(d) = exp(-d²/2)
#[inline]
pub fn gaussian(distance: f64) -> f64 {
    (-0.5 * distance * distance).exp()
}

/// f(d) = 1 - d²/9
#[inline]
pub fn quadratic_falloff(distance: f64) -> f64 {
    1.0 - distance * distance / 9.0
}

/// 标准核函数，由配置中的 [`KernelKind`] 选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardKernel(KernelKind);

impl StandardKernel {
    /// 创建标准核函数
    pub fn new(kind: KernelKind) -> Self {
        Self(kind)
    }

    /// 对应的核函数标识
    pub fn kind(&self) -> KernelKind {
        self.0
    }
}

impl From<KernelKind> for StandardKernel {
    fn from(kind: KernelKind) -> Self {
        Self(kind)
    }
}

impl WeightKernel for StandardKernel {
    #[inline]
    fn weight(&self, distance: f64) -> f64 {
        match self.0 {
            KernelKind::Linear => linear(distance),
            KernelKind::Gaussian => gaussian(distance),
            KernelKind::QuadraticFalloff => quadratic_falloff(distance),
        }
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

/// 带名称的自定义核函数
pub struct NamedKernel<F> {
    name: String,
    func: F,
}

impl<F> NamedKernel<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    /// 为闭包附加名称
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> WeightKernel for NamedKernel<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    #[inline]
    fn weight(&self, distance: f64) -> f64 {
        (self.func)(distance)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for NamedKernel<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedKernel").field("name", &self.name).finish()
    }
}
