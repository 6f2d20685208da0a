//! 生產計劃日模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 計劃範圍（訂單, 車間, 樓層）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanScope {
    pub order_id: String,
    pub workshop_id: String,
    pub floor_id: Option<String>,
}

impl PlanScope {
    pub fn new(
        order_id: impl Into<String>,
        workshop_id: impl Into<String>,
        floor_id: Option<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            workshop_id: workshop_id.into(),
            floor_id,
        }
    }

    /// 此範圍內指定日期的計劃日鍵
    pub fn key(&self, date: NaiveDate) -> PlanDayKey {
        PlanDayKey {
            order_id: self.order_id.clone(),
            workshop_id: self.workshop_id.clone(),
            date,
            floor_id: self.floor_id.clone(),
        }
    }
}

/// 計劃日唯一鍵（訂單, 車間, 日期, 樓層或空）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanDayKey {
    pub order_id: String,
    pub workshop_id: String,
    pub date: NaiveDate,
    pub floor_id: Option<String>,
}

impl PlanDayKey {
    pub fn scope(&self) -> PlanScope {
        PlanScope::new(
            self.order_id.clone(),
            self.workshop_id.clone(),
            self.floor_id.clone(),
        )
    }
}

/// 生產計劃日
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionPlanDay {
    pub key: PlanDayKey,

    /// 計劃數量
    pub planned_qty: i64,

    /// 實際數量（由下游報工更新）
    pub actual_qty: i64,

    /// 備註
    pub notes: Option<String>,
}

impl ProductionPlanDay {
    /// 創建新的計劃日（實際數量為 0）
    pub fn new(key: PlanDayKey, planned_qty: i64) -> Self {
        Self {
            key,
            planned_qty,
            actual_qty: 0,
            notes: None,
        }
    }

    /// 建構器模式：設置實際數量
    pub fn with_actual_qty(mut self, actual_qty: i64) -> Self {
        self.actual_qty = actual_qty;
        self
    }

    /// 建構器模式：設置備註
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.key.date
    }
}

/// 分配器輸出的單日計劃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDay {
    pub date: NaiveDate,
    pub planned_qty: i64,
}

impl PlannedDay {
    pub fn new(date: NaiveDate, planned_qty: i64) -> Self {
        Self { date, planned_qty }
    }
}

/// 產能來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacitySource {
    /// 每週產能（件/週）
    Weekly(i64),
    /// 每日產能（件/日）
    Daily(Decimal),
}

/// 產能分配結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPlan {
    /// 剩餘需求數量
    pub remaining: i64,

    /// 期間工作日數
    pub working_days: usize,

    /// 期間總產能（件，取整）
    pub total_capacity: i64,

    /// 負荷百分比（需求 / 產能 × 100，四捨五入）
    pub percent: Decimal,

    /// 是否超負荷
    pub overload: bool,

    /// 逐日計劃（超負荷時為空）
    pub days: Vec<PlannedDay>,
}

impl CapacityPlan {
    /// 計劃合計
    pub fn planned_total(&self) -> i64 {
        self.days.iter().fold(0, |acc, d| acc.saturating_add(d.planned_qty))
    }
}
