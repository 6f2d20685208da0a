//! 工序與工序分配模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::variant::VariantKey;
use crate::ValidationError;

/// 生產階段
///
/// 固定順序：裁剪 → 縫製 → 後整。宣告順序即為全序，
/// 閘門檢查只需比較索引。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageCategory {
    /// 裁剪
    Cutting,
    /// 縫製
    Sewing,
    /// 後整（含質檢、包裝）
    Finish,
}

impl StageCategory {
    /// 所有階段，按生產順序
    pub const ALL: [StageCategory; 3] = [
        StageCategory::Cutting,
        StageCategory::Sewing,
        StageCategory::Finish,
    ];

    /// 階段在生產鏈中的位置
    pub fn index(self) -> usize {
        match self {
            StageCategory::Cutting => 0,
            StageCategory::Sewing => 1,
            StageCategory::Finish => 2,
        }
    }

    /// 是否為 `other` 之前的階段
    pub fn precedes(self, other: StageCategory) -> bool {
        self.index() < other.index()
    }

    /// 此階段的工序是否必須指定工人
    pub fn requires_worker(self) -> bool {
        !matches!(self, StageCategory::Finish)
    }

    pub fn name(self) -> &'static str {
        match self {
            StageCategory::Cutting => "CUTTING",
            StageCategory::Sewing => "SEWING",
            StageCategory::Finish => "FINISH",
        }
    }
}

impl fmt::Display for StageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 工序分配狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    /// 等待
    Waiting,
    /// 進行中
    InProgress,
    /// 已完成
    Done,
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::Waiting => write!(f, "WAITING"),
            AssignmentStatus::InProgress => write!(f, "IN_PROGRESS"),
            AssignmentStatus::Done => write!(f, "DONE"),
        }
    }
}

/// 工序定義（參考資料，唯讀）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// 工序ID
    pub id: String,

    /// 工序名稱
    pub name: String,

    /// 所屬階段
    pub category: StageCategory,

    /// 鎖定樓層（設置後不可分配到其他樓層）
    pub locked_floor: Option<String>,
}

impl Operation {
    /// 創建新的工序定義
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: StageCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            locked_floor: None,
        }
    }

    /// 建構器模式：鎖定樓層
    pub fn with_locked_floor(mut self, floor_id: impl Into<String>) -> Self {
        self.locked_floor = Some(floor_id.into());
        self
    }
}

/// 按階段區分的負責人
///
/// 裁剪與縫製必須有工人，後整可以不指定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageAssignee {
    Cutting { worker_id: String },
    Sewing { worker_id: String },
    Finish { worker_id: Option<String> },
}

impl StageAssignee {
    /// 按階段建立負責人，必需的工人缺失時返回錯誤
    pub fn for_category(
        category: StageCategory,
        worker_id: Option<String>,
        operation_name: &str,
    ) -> Result<Self, ValidationError> {
        let missing = || ValidationError::MissingWorker {
            operation: operation_name.to_string(),
        };
        match category {
            StageCategory::Cutting => Ok(StageAssignee::Cutting {
                worker_id: worker_id.ok_or_else(missing)?,
            }),
            StageCategory::Sewing => Ok(StageAssignee::Sewing {
                worker_id: worker_id.ok_or_else(missing)?,
            }),
            StageCategory::Finish => Ok(StageAssignee::Finish { worker_id }),
        }
    }

    pub fn category(&self) -> StageCategory {
        match self {
            StageAssignee::Cutting { .. } => StageCategory::Cutting,
            StageAssignee::Sewing { .. } => StageCategory::Sewing,
            StageAssignee::Finish { .. } => StageCategory::Finish,
        }
    }

    pub fn worker_id(&self) -> Option<&str> {
        match self {
            StageAssignee::Cutting { worker_id } | StageAssignee::Sewing { worker_id } => {
                Some(worker_id.as_str())
            }
            StageAssignee::Finish { worker_id } => worker_id.as_deref(),
        }
    }
}

/// 工序變體行（計劃 / 實際）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationVariantRow {
    pub color: String,
    pub size: String,
    pub planned_qty: i64,
    pub actual_qty: i64,
}

impl OperationVariantRow {
    /// 創建新的變體行（實際數量為 0）
    pub fn new(color: impl Into<String>, size: impl Into<String>, planned_qty: i64) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
            planned_qty,
            actual_qty: 0,
        }
    }

    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.color.clone(), self.size.clone())
    }

    pub fn matches(&self, color: &str, size: &str) -> bool {
        self.color == color && self.size == size
    }

    /// 實際數量是否已達計劃數量
    pub fn is_fulfilled(&self) -> bool {
        self.actual_qty >= self.planned_qty
    }
}

/// 未達計劃的變體行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantShortfall {
    pub color: String,
    pub size: String,
    pub planned: i64,
    pub actual: i64,
}

impl fmt::Display for VariantShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}/{}", self.color, self.size, self.actual, self.planned)
    }
}

/// 工序分配（訂單 × 工序）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationAssignment {
    /// 分配ID
    pub id: Uuid,

    /// 訂單ID
    pub order_id: String,

    /// 工序ID
    pub operation_id: String,

    /// 工序名稱（用於錯誤訊息）
    pub operation_name: String,

    /// 階段與負責工人
    pub assignee: StageAssignee,

    /// 樓層
    pub floor_id: Option<String>,

    /// 技術員
    pub technologist_id: Option<String>,

    /// 計劃數量
    pub planned_total: i64,

    /// 實際數量（完成時寫入）
    pub actual_total: i64,

    /// 計劃日期
    pub planned_date: NaiveDate,

    /// 狀態
    pub status: AssignmentStatus,

    /// 變體行
    pub rows: Vec<OperationVariantRow>,
}

impl OperationAssignment {
    /// 創建新的工序分配（等待狀態，無變體行）
    pub fn new(
        order_id: impl Into<String>,
        operation: &Operation,
        assignee: StageAssignee,
        planned_total: i64,
        planned_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order_id.into(),
            operation_id: operation.id.clone(),
            operation_name: operation.name.clone(),
            assignee,
            floor_id: None,
            technologist_id: None,
            planned_total,
            actual_total: 0,
            planned_date,
            status: AssignmentStatus::Waiting,
            rows: Vec::new(),
        }
    }

    /// 建構器模式：設置樓層
    pub fn with_floor_id(mut self, floor_id: Option<String>) -> Self {
        self.floor_id = floor_id;
        self
    }

    /// 建構器模式：設置技術員
    pub fn with_technologist_id(mut self, technologist_id: impl Into<String>) -> Self {
        self.technologist_id = Some(technologist_id.into());
        self
    }

    /// 建構器模式：設置變體行
    pub fn with_rows(mut self, rows: Vec<OperationVariantRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn category(&self) -> StageCategory {
        self.assignee.category()
    }

    pub fn is_done(&self) -> bool {
        self.status == AssignmentStatus::Done
    }

    /// 變體行計劃合計
    pub fn rows_planned(&self) -> i64 {
        self.rows.iter().fold(0, |acc, r| acc.saturating_add(r.planned_qty))
    }

    /// 變體行實際合計
    pub fn rows_actual(&self) -> i64 {
        self.rows.iter().fold(0, |acc, r| acc.saturating_add(r.actual_qty))
    }

    /// 列出實際數量未達計劃的變體行
    pub fn shortfalls(&self) -> Vec<VariantShortfall> {
        self.rows
            .iter()
            .filter(|r| !r.is_fulfilled())
            .map(|r| VariantShortfall {
                color: r.color.clone(),
                size: r.size.clone(),
                planned: r.planned_qty,
                actual: r.actual_qty,
            })
            .collect()
    }

    pub fn row(&self, color: &str, size: &str) -> Option<&OperationVariantRow> {
        self.rows.iter().find(|r| r.matches(color, size))
    }

    pub fn row_mut(&mut self, color: &str, size: &str) -> Option<&mut OperationVariantRow> {
        self.rows.iter_mut().find(|r| r.matches(color, size))
    }
}
