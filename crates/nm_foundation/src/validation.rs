// crates/nm_foundation/src/validation.rs

//! 运行时验证工具
//!
//! 提供验证报告和错误/警告类型，用于检查插值算子与输入数据。
//!
//! # 示例
//!
//! ```
//! use nm_foundation::validation::{ValidationReport, ValidationError};
//!
//! let row_sum = 0.97f64;
//! let mut report = ValidationReport::new();
//! if (row_sum - 1.0).abs() > 1e-9 {
//!     report.add_error(ValidationError::RowInvariant {
//!         node: 3,
//!         message: format!("权重和为 {}", row_sum),
//!     });
//! }
//!
//! assert!(report.has_errors());
//! ```

use std::fmt;

/// 验证报告
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// 错误列表
    pub errors: Vec<ValidationError>,
    /// 警告列表
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// 创建空的验证报告
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加错误
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 是否有警告
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// 警告数量
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// 是否通过（无错误）
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// 合并另一个报告
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "验证报告:")?;
        writeln!(f, "  错误: {} 个", self.error_count())?;
        writeln!(f, "  警告: {} 个", self.warning_count())?;

        if self.has_errors() {
            writeln!(f, "\n错误详情:")?;
            for (i, err) in self.errors.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, err)?;
            }
        }

        if self.has_warnings() {
            writeln!(f, "\n警告详情:")?;
            for (i, warn) in self.warnings.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, warn)?;
            }
        }

        Ok(())
    }
}

/// 验证错误类型
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// 非有限值
    NonFinite {
        /// 字段名称
        field: &'static str,
        /// 所在节点
        node: usize,
        /// 非有限的数值
        value: f64,
    },
    /// 数据超出范围
    OutOfRange {
        /// 字段名称
        field: &'static str,
        /// 所在节点
        node: usize,
        /// 实际值
        value: f64,
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },
    /// 算子行不满足不变量（单位行 / 归一化 / 零行）
    RowInvariant {
        /// 所在节点（算子行号）
        node: usize,
        /// 错误描述
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { field, node, value } => {
                write!(f, "节点{}: 字段{}={} (非有限值)", node, field, value)
            }
            Self::OutOfRange {
                field,
                node,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "节点{}: 字段{}={} 超出范围[{}, {}]",
                    node, field, value, min, max
                )
            }
            Self::RowInvariant { node, message } => {
                write!(f, "节点{}: 行不变量被破坏: {}", node, message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// 验证警告类型
#[derive(Debug, Clone)]
pub enum ValidationWarning {
    /// 节点在截断距离内没有任何传感器，估计值恒为 0
    Unrecoverable {
        /// 节点
        node: usize,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecoverable { node } => {
                write!(f, "节点{}: 截断距离内无传感器，无法恢复", node)
            }
        }
    }
}

// ============================================================================
// 验证辅助函数
// ============================================================================

/// 检查值是否有限
pub fn check_finite(
    report: &mut ValidationReport,
    field: &'static str,
    node: usize,
    value: f64,
) -> bool {
    if !value.is_finite() {
        report.add_error(ValidationError::NonFinite { field, node, value });
        false
    } else {
        true
    }
}

/// 检查值是否在范围内
pub fn check_range(
    report: &mut ValidationReport,
    field: &'static str,
    node: usize,
    value: f64,
    min: f64,
    max: f64,
) -> bool {
    if value < min || value > max {
        report.add_error(ValidationError::OutOfRange {
            field,
            node,
            value,
            min,
            max,
        });
        false
    } else {
        true
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_report_new() {
        let report = ValidationReport::new();
        assert!(!report.has_errors());
        assert!(!report.has_warnings());
        assert!(report.is_valid());
    }

    #[test]
    fn test_validation_report_add_error() {
        let mut report = ValidationReport::new();
        report.add_error(ValidationError::NonFinite {
            field: "weight",
            node: 2,
            value: f64::INFINITY,
        });

        assert!(report.has_errors());
        assert_eq!(report.error_count(), 1);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_unrecoverable_is_warning_only() {
        let mut report = ValidationReport::new();
        report.add_warning(ValidationWarning::Unrecoverable { node: 3 });

        assert!(report.has_warnings());
        // 零行是合法结果，不影响有效性
        assert!(report.is_valid());
        assert!(report.warnings[0].to_string().contains('3'));
    }

    #[test]
    fn test_validation_report_merge() {
        let mut report1 = ValidationReport::new();
        report1.add_error(ValidationError::RowInvariant {
            node: 1,
            message: "sum=0.5".into(),
        });

        let mut report2 = ValidationReport::new();
        report2.add_error(ValidationError::OutOfRange {
            field: "weight",
            node: 5,
            value: 1.2,
            min: 0.0,
            max: 1.0,
        });
        report2.add_warning(ValidationWarning::Unrecoverable { node: 9 });

        report1.merge(report2);
        assert_eq!(report1.error_count(), 2);
        assert_eq!(report1.warning_count(), 1);
    }

    #[test]
    fn test_check_finite() {
        let mut report = ValidationReport::new();

        assert!(check_finite(&mut report, "weight", 0, 1.0));
        assert!(!report.has_errors());

        assert!(!check_finite(&mut report, "weight", 0, f64::NAN));
        assert!(report.has_errors());
    }

    #[test]
    fn test_check_range() {
        let mut report = ValidationReport::new();

        assert!(check_range(&mut report, "weight", 0, 0.5, 0.0, 1.0));
        assert!(!report.has_errors());

        assert!(!check_range(&mut report, "weight", 0, -0.1, 0.0, 1.0));
        assert!(report.has_errors());
    }

    #[test]
    fn test_report_display() {
        let mut report = ValidationReport::new();
        report.add_error(ValidationError::RowInvariant {
            node: 4,
            message: "传感器行不是单位向量".into(),
        });
        report.add_warning(ValidationWarning::Unrecoverable { node: 7 });

        let s = format!("{}", report);
        assert!(s.contains("错误: 1 个"));
        assert!(s.contains("警告: 1 个"));
        assert!(s.contains("节点4"));
    }
}
