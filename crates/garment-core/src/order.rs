//! 訂單模型
//!
//! 訂單由外部訂單管理層擁有，引擎只讀取總數量並回寫狀態與完工資訊。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 新建
    New,
    /// 生產中
    InProgress,
    /// 已完工
    Done,
}

/// 訂單
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// 訂單ID
    pub id: String,

    /// 總數量
    pub total_quantity: i64,

    /// 尺碼（有序）
    pub sizes: Vec<String>,

    /// 顏色（有序）
    pub colors: Vec<String>,

    /// 交期
    pub deadline: NaiveDate,

    /// 狀態
    pub status: OrderStatus,

    /// 完工時間
    pub completed_at: Option<DateTime<Utc>>,

    /// 是否逾期完工
    pub is_overdue: bool,
}

impl Order {
    /// 創建新的訂單
    pub fn new(id: impl Into<String>, total_quantity: i64, deadline: NaiveDate) -> Self {
        Self {
            id: id.into(),
            total_quantity,
            sizes: Vec::new(),
            colors: Vec::new(),
            deadline,
            status: OrderStatus::New,
            completed_at: None,
            is_overdue: false,
        }
    }

    /// 建構器模式：設置尺碼
    pub fn with_sizes<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sizes = sizes.into_iter().map(Into::into).collect();
        self
    }

    /// 建構器模式：設置顏色
    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    /// 在指定時間完工是否逾期（完工日期晚於交期）
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        now.date_naive() > self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.status == OrderStatus::Done
    }
}

/// 訂單完工結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletion {
    pub order_id: String,
    pub completed_at: DateTime<Utc>,
    pub is_overdue: bool,
}
