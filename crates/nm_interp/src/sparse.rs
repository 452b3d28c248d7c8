// crates/nm_interp/src/sparse.rs

//! 压缩稀疏行（CSR）矩阵格式
//!
//! 插值算子每一行只包含截断距离内的少数传感器，CSR 适合：
//! - 高效的矩阵-向量乘法 (SpMV)，即每个采样周期的热路径
//! - 行遍历操作（检查行不变量、统计邻居数）
//!
//! 数值类型固定为 f64，乘法累加全部在双精度下完成。
//!
//! # 特性开关
//!
//! - `parallel`: 启用基于 `rayon` 的并行矩阵-向量乘法
//!
//! # 格式说明
//!
//! CSR 使用三个数组存储：
//! - `row_ptr`: 行指针，长度 n_rows + 1，row_ptr[i] 是第 i 行第一个非零元的索引
//! - `col_idx`: 列索引，与非零元一一对应，行内升序
//! - `values`: 非零元值
//!
//! # 使用示例
//!
//! ```
//! use nm_interp::sparse::{CsrMatrix, Triplet};
//!
//! let matrix = CsrMatrix::from_triplets(
//!     3,
//!     2,
//!     vec![
//!         Triplet::new(0, 0, 1.0),
//!         Triplet::new(1, 0, 0.75),
//!         Triplet::new(1, 1, 0.25),
//!         Triplet::new(2, 1, 1.0),
//!     ],
//! )
//! .unwrap();
//!
//! let mut y = vec![0.0; 3];
//! matrix.mul_vec(&[10.0, 20.0], &mut y);
//! assert_eq!(y, vec![10.0, 12.5, 20.0]);
//! ```

use nm_foundation::{NmError, NmResult};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// =============================================================================
// 三元组
// =============================================================================

/// 稀疏矩阵的 (行, 列, 值) 三元组
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triplet {
    /// 行索引
    pub row: usize,
    /// 列索引
    pub col: usize,
    /// 值
    pub value: f64,
}

impl Triplet {
    /// 创建三元组
    #[inline]
    pub fn new(row: usize, col: usize, value: f64) -> Self {
        Self { row, col, value }
    }
}

// =============================================================================
// 稀疏模式
// =============================================================================

/// CSR 矩阵的稀疏模式
///
/// 存储矩阵的结构信息（哪些位置有非零元），与值分离。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrPattern {
    /// 行数
    n_rows: usize,
    /// 列数
    n_cols: usize,
    /// 行指针
    row_ptr: Vec<usize>,
    /// 列索引
    col_idx: Vec<usize>,
}

impl CsrPattern {
    /// 获取非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// 获取第 row 行的非零元列索引
    #[inline]
    pub fn row_indices(&self, row: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    /// 获取第 row 行的非零元数量
    #[inline]
    pub fn row_nnz(&self, row: usize) -> usize {
        self.row_ptr[row + 1] - self.row_ptr[row]
    }

    /// 查找 (row, col) 对应的值索引
    pub fn find_index(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];

        // 列索引行内有序，可以使用二分查找
        self.col_idx[start..end]
            .binary_search(&col)
            .ok()
            .map(|local| start + local)
    }
}

// =============================================================================
// CSR 矩阵主体
// =============================================================================

/// CSR 格式稀疏矩阵（f64）
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    /// 稀疏模式
    pattern: CsrPattern,
    /// 非零元值
    values: Vec<f64>,
}

impl CsrMatrix {
    /// 由三元组列表一次性组装矩阵
    ///
    /// 三元组顺序任意；相同坐标的三元组会被累加。
    ///
    /// # 错误
    /// - 任一三元组的行或列越界时返回 `IndexOutOfBounds`
    ///
    /// # 性能
    /// - 按行计数排序 O(nnz + n_rows)，行内按列排序
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        triplets: Vec<Triplet>,
    ) -> NmResult<Self> {
        for t in &triplets {
            NmError::check_index("row", t.row, n_rows)?;
            NmError::check_index("column", t.col, n_cols)?;
        }

        // 统计每行非零元数量
        let mut row_ptr = vec![0usize; n_rows + 1];
        for t in &triplets {
            row_ptr[t.row + 1] += 1;
        }
        for i in 0..n_rows {
            row_ptr[i + 1] += row_ptr[i];
        }

        // 按行分桶
        let mut cursor = row_ptr.clone();
        let mut bucketed = vec![(0usize, 0.0f64); triplets.len()];
        for t in &triplets {
            bucketed[cursor[t.row]] = (t.col, t.value);
            cursor[t.row] += 1;
        }

        // 行内排序并合并重复列
        let mut col_idx = Vec::with_capacity(bucketed.len());
        let mut values = Vec::with_capacity(bucketed.len());
        let mut compact_ptr = Vec::with_capacity(n_rows + 1);
        compact_ptr.push(0);

        for row in 0..n_rows {
            let entries = &mut bucketed[row_ptr[row]..row_ptr[row + 1]];
            entries.sort_by_key(|&(col, _)| col);

            let row_start = col_idx.len();
            for &(col, value) in entries.iter() {
                if col_idx.len() > row_start && col_idx.last() == Some(&col) {
                    if let Some(last) = values.last_mut() {
                        *last += value;
                    }
                } else {
                    col_idx.push(col);
                    values.push(value);
                }
            }
            compact_ptr.push(col_idx.len());
        }

        Ok(Self {
            pattern: CsrPattern {
                n_rows,
                n_cols,
                row_ptr: compact_ptr,
                col_idx,
            },
            values,
        })
    }

    /// 获取行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.pattern.n_rows
    }

    /// 获取列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.pattern.n_cols
    }

    /// 获取非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 获取稀疏模式引用
    #[inline]
    pub fn pattern(&self) -> &CsrPattern {
        &self.pattern
    }

    /// 获取值切片
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 获取行指针
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.pattern.row_ptr
    }

    /// 获取列索引
    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.pattern.col_idx
    }

    /// 获取第 row 行的非零元数量
    #[inline]
    pub fn row_nnz(&self, row: usize) -> usize {
        self.pattern.row_nnz(row)
    }

    /// 获取 (row, col) 位置的值（如果不存在返回 0）
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.pattern
            .find_index(row, col)
            .map_or(0.0, |idx| self.values[idx])
    }

    /// 获取第 row 行的非零元视图
    #[inline]
    pub fn row(&self, row: usize) -> RowView<'_> {
        let start = self.pattern.row_ptr[row];
        let end = self.pattern.row_ptr[row + 1];
        RowView {
            col_idx: &self.pattern.col_idx[start..end],
            values: &self.values[start..end],
        }
    }

    /// 第 row 行所有非零元之和
    #[inline]
    pub fn row_sum(&self, row: usize) -> f64 {
        self.row(row).values().iter().sum()
    }

    /// 提取第 col 列（稠密形式，长度 n_rows）
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.n_rows()).map(|row| self.get(row, col)).collect()
    }

    /// 矩阵-向量乘法 y = A * x
    ///
    /// # Panics
    /// - `x.len() != self.n_cols()`
    /// - `y.len() != self.n_rows()`
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        for (row, out) in y.iter_mut().enumerate() {
            let start = self.pattern.row_ptr[row];
            let end = self.pattern.row_ptr[row + 1];

            let mut sum = 0.0;
            for idx in start..end {
                sum += self.values[idx] * x[self.pattern.col_idx[idx]];
            }
            *out = sum;
        }
    }

    /// 并行矩阵-向量乘法（需启用 `parallel` 特性）
    ///
    /// 行数较少时调度开销大于收益，一般只在数千节点以上的源空间网格使用。
    ///
    /// # Panics
    /// - `x.len() != self.n_cols()`
    /// - `y.len() != self.n_rows()`
    #[cfg(feature = "parallel")]
    pub fn mul_vec_parallel(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        y.par_iter_mut().enumerate().for_each(|(row, out)| {
            let start = self.pattern.row_ptr[row];
            let end = self.pattern.row_ptr[row + 1];

            let mut sum = 0.0;
            for idx in start..end {
                sum += self.values[idx] * x[self.pattern.col_idx[idx]];
            }
            *out = sum;
        });
    }
}

// =============================================================================
// 行视图辅助类型
// =============================================================================

/// 行视图：提供对矩阵某一行的非零元的只读访问
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    col_idx: &'a [usize],
    values: &'a [f64],
}

impl<'a> RowView<'a> {
    /// 获取列索引切片
    #[inline]
    pub fn col_indices(&self) -> &'a [usize] {
        self.col_idx
    }

    /// 获取值切片
    #[inline]
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// 获取非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 是否为空行
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 迭代 (列索引, 值) 对
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.col_idx.iter().copied().zip(self.values.iter().copied())
    }
}

// =============================================================================
// 测试
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn sample_matrix() -> CsrMatrix {
        // [1    0  ]
        // [0.75 0.25]
        // [0    1  ]
        // [0    0  ]
        CsrMatrix::from_triplets(
            4,
            2,
            vec![
                Triplet::new(2, 1, 1.0),
                Triplet::new(1, 1, 0.25),
                Triplet::new(0, 0, 1.0),
                Triplet::new(1, 0, 0.75),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_triplets_sorted_rows() {
        let mat = sample_matrix();
        assert_eq!(mat.n_rows(), 4);
        assert_eq!(mat.n_cols(), 2);
        assert_eq!(mat.nnz(), 4);
        assert_eq!(mat.row_ptr(), &[0, 1, 3, 4, 4]);
        assert_eq!(mat.col_idx(), &[0, 0, 1, 1]);
        assert_eq!(mat.row(1).col_indices(), &[0, 1]);
    }

    #[test]
    fn test_duplicate_triplets_are_summed() {
        let mat = CsrMatrix::from_triplets(
            1,
            1,
            vec![Triplet::new(0, 0, 0.5), Triplet::new(0, 0, 0.25)],
        )
        .unwrap();
        assert_eq!(mat.nnz(), 1);
        assert!((mat.get(0, 0) - 0.75).abs() < EPS);
    }

    #[test]
    fn test_out_of_bounds_triplet() {
        let result = CsrMatrix::from_triplets(2, 2, vec![Triplet::new(0, 2, 1.0)]);
        assert!(matches!(result, Err(NmError::IndexOutOfBounds { .. })));

        let result = CsrMatrix::from_triplets(2, 2, vec![Triplet::new(5, 0, 1.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_get_and_empty_row() {
        let mat = sample_matrix();
        assert!((mat.get(1, 0) - 0.75).abs() < EPS);
        assert_eq!(mat.get(0, 1), 0.0);
        assert!(mat.row(3).is_empty());
        assert_eq!(mat.row_nnz(3), 0);
        assert_eq!(mat.row_sum(3), 0.0);
    }

    #[test]
    fn test_mul_vec() {
        let mat = sample_matrix();
        let mut y = vec![f64::NAN; 4];
        mat.mul_vec(&[10.0, 20.0], &mut y);
        assert_eq!(y, vec![10.0, 12.5, 20.0, 0.0]);
    }

    #[test]
    #[should_panic]
    fn test_mul_vec_wrong_length_panics() {
        let mat = sample_matrix();
        let mut y = vec![0.0; 4];
        mat.mul_vec(&[1.0], &mut y);
    }

    #[test]
    fn test_column_extraction() {
        let mat = sample_matrix();
        assert_eq!(mat.column(0), vec![1.0, 0.75, 0.0, 0.0]);
        assert_eq!(mat.column(1), vec![0.0, 0.25, 1.0, 0.0]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_correctness() {
        let n = 500;
        let triplets = (0..n)
            .flat_map(|r| {
                [Triplet::new(r, r % 7, 0.5), Triplet::new(r, (r + 3) % 7, 0.5)]
            })
            .collect();
        let mat = CsrMatrix::from_triplets(n, 7, triplets).unwrap();

        let x: Vec<f64> = (0..7).map(|i| i as f64 * 1.5).collect();
        let mut y_serial = vec![0.0; n];
        let mut y_parallel = vec![0.0; n];

        mat.mul_vec(&x, &mut y_serial);
        mat.mul_vec_parallel(&x, &mut y_parallel);

        assert_eq!(y_serial, y_parallel, "并行结果与串行不一致");
    }
}
