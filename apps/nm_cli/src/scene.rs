// apps/nm_cli/src/scene.rs

//! 场景文件
//!
//! 场景是一次离线插值所需的全部输入：
//!
//! ```json
//! {
//!   "distances": [[0.0, 2.0], [1.0, 3.0], [2.0, 0.0], [5.0, 5.0]],
//!   "sensors": [0, 2],
//!   "samples": [[10.0, 20.0]]
//! }
//! ```
//!
//! `distances[r][q]` 为节点 r 到第 q 个传感器的距离，`samples` 中每一项
//! 是一个长度为传感器数的测量向量。

use anyhow::{Context, Result};
use nm_foundation::NmResult;
use nm_interp::{DistanceTable, SensorSet};
use serde::Deserialize;
use std::path::Path;

/// 场景文件内容
#[derive(Debug, Deserialize)]
pub struct Scene {
    /// 距离表（逐行）
    pub distances: Vec<Vec<f64>>,
    /// 传感器节点索引
    pub sensors: Vec<usize>,
    /// 测量样本
    #[serde(default)]
    pub samples: Vec<Vec<f64>>,
}

impl Scene {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取场景文件: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("场景文件格式错误: {}", path.display()))
    }

    /// 转换为距离表与传感器集合，返回剩余的测量样本
    pub fn into_parts(self) -> NmResult<(DistanceTable, SensorSet, Vec<Vec<f64>>)> {
        let table = DistanceTable::from_rows(self.distances)?;
        let sensors = SensorSet::new(self.sensors, table.n_nodes())?;
        Ok((table, sensors, self.samples))
    }
}
