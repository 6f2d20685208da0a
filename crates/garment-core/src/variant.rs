//! 變體（顏色 × 尺碼）需求模型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 數量合計，溢出時返回 `None`
pub fn checked_sum(quantities: impl IntoIterator<Item = i64>) -> Option<i64> {
    quantities
        .into_iter()
        .try_fold(0i64, |acc, quantity| acc.checked_add(quantity))
}

/// 變體鍵（顏色, 尺碼）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub color: String,
    pub size: String,
}

impl VariantKey {
    pub fn new(color: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.color, self.size)
    }
}

/// 變體需求格
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCell {
    /// 顏色
    pub color: String,

    /// 尺碼
    pub size: String,

    /// 需求數量（驗證前可能為負數）
    pub quantity: i64,
}

impl VariantCell {
    /// 創建新的變體格
    pub fn new(color: impl Into<String>, size: impl Into<String>, quantity: i64) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
            quantity,
        }
    }

    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.color.clone(), self.size.clone())
    }
}

/// 已驗證的變體矩陣
///
/// 格子按訂單的顏色順序、再按尺碼順序排列，合計等於訂單總數量。
/// 只能整體替換，不支援局部修改。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMatrix {
    cells: Vec<VariantCell>,
}

impl VariantMatrix {
    /// 由已通過驗證的格子建立矩陣
    ///
    /// 呼叫端需保證格子已通過 `garment_calc::matrix::validate`
    pub fn from_validated(cells: Vec<VariantCell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[VariantCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// 矩陣總數量
    pub fn total(&self) -> i64 {
        self.cells
            .iter()
            .fold(0, |acc, c| acc.saturating_add(c.quantity))
    }

    /// 查詢單一變體數量
    pub fn quantity(&self, color: &str, size: &str) -> Option<i64> {
        self.cells
            .iter()
            .find(|c| c.color == color && c.size == size)
            .map(|c| c.quantity)
    }

    /// 顏色行合計
    pub fn row_total(&self, color: &str) -> i64 {
        self.cells
            .iter()
            .filter(|c| c.color == color)
            .fold(0, |acc, c| acc.saturating_add(c.quantity))
    }

    /// 尺碼列合計
    pub fn column_total(&self, size: &str) -> i64 {
        self.cells
            .iter()
            .filter(|c| c.size == size)
            .fold(0, |acc, c| acc.saturating_add(c.quantity))
    }

    /// 按矩陣順序列出所有變體鍵
    pub fn keys(&self) -> Vec<VariantKey> {
        self.cells.iter().map(VariantCell::key).collect()
    }

    pub fn contains(&self, key: &VariantKey) -> bool {
        self.cells
            .iter()
            .any(|c| c.color == key.color && c.size == key.size)
    }
}
