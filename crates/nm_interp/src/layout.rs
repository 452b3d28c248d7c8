// crates/nm_interp/src/layout.rs

//! 布局数据：距离表与传感器集合
//!
//! - [`DistanceTable`]: N×C 行主序表，`table[r][q]` 为节点 r 到第 q 个传感器的距离
//! - [`SensorSet`]: M 个互不相同的节点索引，序号 k 对应测量向量第 k 个分量
//!
//! 距离表只读取前 M 列，多余的列被忽略。传感器序号到节点的映射
//! 在构造 `SensorSet` 时一次性建立，查询为 O(1)。

use nm_foundation::{NmError, NmResult};

// =============================================================================
// 距离表
// =============================================================================

/// 节点到传感器的距离表（行主序）
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    n_nodes: usize,
    n_columns: usize,
    data: Vec<f64>,
}

impl DistanceTable {
    /// 从扁平数组创建
    ///
    /// # 错误
    /// - `n_nodes == 0` 时返回 `EmptyLayout`
    /// - `data.len() != n_nodes * n_columns` 时返回 `DimensionMismatch`
    pub fn from_flat(n_nodes: usize, n_columns: usize, data: Vec<f64>) -> NmResult<Self> {
        if n_nodes == 0 {
            return Err(NmError::EmptyLayout);
        }
        if data.len() != n_nodes * n_columns {
            return Err(NmError::dimension_mismatch(
                "distance table entries",
                n_nodes * n_columns,
                data.len(),
            ));
        }
        Ok(Self {
            n_nodes,
            n_columns,
            data,
        })
    }

    /// 从逐行数组创建，所有行长度必须一致
    pub fn from_rows(rows: Vec<Vec<f64>>) -> NmResult<Self> {
        let n_nodes = rows.len();
        if n_nodes == 0 {
            return Err(NmError::EmptyLayout);
        }

        let n_columns = rows[0].len();
        let mut data = Vec::with_capacity(n_nodes * n_columns);
        for row in rows {
            if row.len() != n_columns {
                return Err(NmError::dimension_mismatch(
                    "distance table row length",
                    n_columns,
                    row.len(),
                ));
            }
            data.extend(row);
        }

        Ok(Self {
            n_nodes,
            n_columns,
            data,
        })
    }

    /// 节点数 N
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// 列数
    #[inline]
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// 节点 node 到第 sensor 个传感器的距离
    #[inline]
    pub fn get(&self, node: usize, sensor: usize) -> f64 {
        self.data[node * self.n_columns + sensor]
    }

    /// 节点 node 的整行距离
    #[inline]
    pub fn row(&self, node: usize) -> &[f64] {
        let start = node * self.n_columns;
        &self.data[start..start + self.n_columns]
    }
}

// =============================================================================
// 传感器集合
// =============================================================================

/// 传感器集合
///
/// 保留输入顺序：第 k 个索引即测量向量的第 k 个分量。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSet {
    indices: Vec<usize>,
    /// 节点 -> 传感器序号
    ordinal: Vec<Option<usize>>,
}

impl SensorSet {
    /// 创建传感器集合
    ///
    /// # 错误
    /// - `indices` 为空时返回 `EmptySensorSet`
    /// - 任一索引 ≥ `n_nodes` 时返回 `InvalidSensorIndex`
    /// - 索引重复时返回 `DuplicateSensor`
    pub fn new(indices: Vec<usize>, n_nodes: usize) -> NmResult<Self> {
        if indices.is_empty() {
            return Err(NmError::EmptySensorSet);
        }

        let mut ordinal = vec![None; n_nodes];
        for (position, &index) in indices.iter().enumerate() {
            if index >= n_nodes {
                return Err(NmError::InvalidSensorIndex {
                    position,
                    index,
                    n_nodes,
                });
            }
            if let Some(first) = ordinal[index] {
                return Err(NmError::DuplicateSensor {
                    index,
                    first,
                    second: position,
                });
            }
            ordinal[index] = Some(position);
        }

        Ok(Self { indices, ordinal })
    }

    /// 传感器数量 M
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// 是否为空（构造成功的集合总是非空）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// 创建时使用的布局节点数
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.ordinal.len()
    }

    /// 按序号排列的节点索引
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// 节点的传感器序号；非传感器节点返回 `None`
    #[inline]
    pub fn ordinal_of(&self, node: usize) -> Option<usize> {
        self.ordinal.get(node).copied().flatten()
    }

    /// 节点是否为传感器
    #[inline]
    pub fn contains(&self, node: usize) -> bool {
        self.ordinal_of(node).is_some()
    }

    /// 第 ordinal 个传感器所在的节点
    #[inline]
    pub fn node_of(&self, ordinal: usize) -> Option<usize> {
        self.indices.get(ordinal).copied()
    }
}
