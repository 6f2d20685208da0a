//! 引擎請求類型

use chrono::NaiveDate;
use garment_core::{DateRange, FlowParams, PlanDayKey, PlanScope, ValidationError};
use serde::{Deserialize, Serialize};

/// 產能計算請求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRequest {
    pub order_id: String,
    pub workshop_id: String,

    #[serde(default)]
    pub floor_id: Option<String>,

    pub from: NaiveDate,
    pub to: NaiveDate,

    /// 每週產能；未提供時使用樓層或預設配置
    #[serde(default)]
    pub capacity_per_week: Option<i64>,
}

impl CapacityRequest {
    pub fn new(
        order_id: impl Into<String>,
        workshop_id: impl Into<String>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            workshop_id: workshop_id.into(),
            floor_id: None,
            from,
            to,
            capacity_per_week: None,
        }
    }

    /// 建構器模式：設置樓層
    pub fn with_floor(mut self, floor_id: impl Into<String>) -> Self {
        self.floor_id = Some(floor_id.into());
        self
    }

    /// 建構器模式：設置每週產能
    pub fn with_weekly_capacity(mut self, capacity: i64) -> Self {
        self.capacity_per_week = Some(capacity);
        self
    }

    pub fn scope(&self) -> PlanScope {
        PlanScope::new(
            self.order_id.clone(),
            self.workshop_id.clone(),
            self.floor_id.clone(),
        )
    }

    pub fn range(&self) -> Result<DateRange, ValidationError> {
        DateRange::new(self.from, self.to)
    }
}

/// 單日計劃手動修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDayUpdate {
    pub order_id: String,
    pub workshop_id: String,
    pub date: NaiveDate,

    #[serde(default)]
    pub floor_id: Option<String>,

    pub planned_qty: i64,
    pub actual_qty: i64,

    /// 未提供時保留原備註
    #[serde(default)]
    pub notes: Option<String>,
}

impl PlanDayUpdate {
    pub fn new(key: PlanDayKey, planned_qty: i64, actual_qty: i64) -> Self {
        Self {
            order_id: key.order_id,
            workshop_id: key.workshop_id,
            date: key.date,
            floor_id: key.floor_id,
            planned_qty,
            actual_qty,
            notes: None,
        }
    }

    /// 建構器模式：設置備註
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn key(&self) -> PlanDayKey {
        PlanDayKey {
            order_id: self.order_id.clone(),
            workshop_id: self.workshop_id.clone(),
            date: self.date,
            floor_id: self.floor_id.clone(),
        }
    }
}

/// 按流水線產量自動排程的請求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowApplyRequest {
    pub order_id: String,
    pub workshop_id: String,

    #[serde(default)]
    pub floor_id: Option<String>,

    pub from: NaiveDate,
    pub to: NaiveDate,

    /// 流水線參數；期間計劃總數未提供時使用剩餘數量
    pub params: FlowParams,
}

impl FlowApplyRequest {
    pub fn new(
        order_id: impl Into<String>,
        workshop_id: impl Into<String>,
        from: NaiveDate,
        to: NaiveDate,
        params: FlowParams,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            workshop_id: workshop_id.into(),
            floor_id: None,
            from,
            to,
            params,
        }
    }

    /// 建構器模式：設置樓層
    pub fn with_floor(mut self, floor_id: impl Into<String>) -> Self {
        self.floor_id = Some(floor_id.into());
        self
    }

    pub fn scope(&self) -> PlanScope {
        PlanScope::new(
            self.order_id.clone(),
            self.workshop_id.clone(),
            self.floor_id.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_request_from_json() {
        let request: CapacityRequest = serde_json::from_str(
            r#"{ "order_id": "ORD-1", "workshop_id": "WS-1", "from": "2025-11-01", "to": "2025-11-07" }"#,
        )
        .unwrap();

        assert_eq!(request.floor_id, None);
        assert_eq!(request.capacity_per_week, None);
        assert_eq!(request.range().unwrap().day_count(), 7);
        assert_eq!(request.scope(), PlanScope::new("ORD-1", "WS-1", None));
    }

    #[test]
    fn test_plan_day_update_key_roundtrip() {
        let key = PlanScope::new("ORD-1", "WS-1", Some("F2".to_string()))
            .key(NaiveDate::from_ymd_opt(2025, 11, 3).unwrap());

        let update = PlanDayUpdate::new(key.clone(), 40, 12).with_notes("overtime");

        assert_eq!(update.key(), key);
        assert_eq!(update.notes.as_deref(), Some("overtime"));
    }
}
