//! 引擎配置模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 產能與流水線平衡參數配置
///
/// 由呼叫端顯式傳入分配器與計算器，引擎本身不讀取任何全域設定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 班次長度（秒），預設 8 小時
    pub shift_seconds: u32,

    /// 每日班次數
    pub shifts_per_day: u32,

    /// 每週產能下限（件/週）
    pub min_weekly_capacity: i64,

    /// 每週產能上限（件/週）
    pub max_weekly_capacity: i64,

    /// 未指定每週產能且樓層沒有配置時使用的預設每週產能
    pub default_weekly_capacity: Option<i64>,

    /// 各樓層的每日產能（件/日）
    pub floor_daily_capacity: HashMap<String, Decimal>,

    /// 每個工位的面積標準（平方米）
    pub area_per_workplace_m2: Decimal,

    /// 每個工位每班產量（BY_WORKPLACES 模式未提供工時時使用）
    pub workplace_output_per_shift: Option<Decimal>,
}

impl EngineConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            shift_seconds: 8 * 60 * 60,
            shifts_per_day: 1,
            min_weekly_capacity: 1000,
            max_weekly_capacity: 5000,
            default_weekly_capacity: None,
            floor_daily_capacity: HashMap::new(),
            area_per_workplace_m2: Decimal::new(45, 1),
            workplace_output_per_shift: None,
        }
    }

    /// 從 JSON 載入配置，缺少的欄位使用預設值
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// 建構器模式：設置班次長度（小時）
    pub fn with_shift_hours(mut self, hours: u32) -> Self {
        self.shift_seconds = hours * 60 * 60;
        self
    }

    /// 建構器模式：設置每日班次數
    pub fn with_shifts_per_day(mut self, shifts: u32) -> Self {
        self.shifts_per_day = shifts;
        self
    }

    /// 建構器模式：設置每週產能範圍
    pub fn with_weekly_capacity_bounds(mut self, min: i64, max: i64) -> Self {
        self.min_weekly_capacity = min;
        self.max_weekly_capacity = max;
        self
    }

    /// 建構器模式：設置預設每週產能
    pub fn with_default_weekly_capacity(mut self, capacity: i64) -> Self {
        self.default_weekly_capacity = Some(capacity);
        self
    }

    /// 建構器模式：設置樓層每日產能
    pub fn with_floor_daily_capacity(mut self, floor_id: impl Into<String>, capacity: Decimal) -> Self {
        self.floor_daily_capacity.insert(floor_id.into(), capacity);
        self
    }

    /// 建構器模式：設置工位面積標準
    pub fn with_area_per_workplace(mut self, area_m2: Decimal) -> Self {
        self.area_per_workplace_m2 = area_m2;
        self
    }

    /// 建構器模式：設置每工位每班產量
    pub fn with_workplace_output(mut self, output_per_shift: Decimal) -> Self {
        self.workplace_output_per_shift = Some(output_per_shift);
        self
    }

    /// 檢查每週產能是否在允許範圍內
    pub fn weekly_capacity_in_range(&self, capacity: i64) -> bool {
        (self.min_weekly_capacity..=self.max_weekly_capacity).contains(&capacity)
    }

    /// 查詢樓層每日產能
    pub fn daily_capacity_for(&self, floor_id: Option<&str>) -> Option<Decimal> {
        floor_id.and_then(|id| self.floor_daily_capacity.get(id).copied())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.shift_seconds, 28_800);
        assert_eq!(config.shifts_per_day, 1);
        assert!(config.weekly_capacity_in_range(1000));
        assert!(config.weekly_capacity_in_range(5000));
        assert!(!config.weekly_capacity_in_range(999));
        assert!(!config.weekly_capacity_in_range(5001));
        assert_eq!(config.default_weekly_capacity, None);
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_shift_hours(10)
            .with_shifts_per_day(2)
            .with_weekly_capacity_bounds(500, 8000)
            .with_floor_daily_capacity("F2", Decimal::from(300))
            .with_workplace_output(Decimal::from(40));

        assert_eq!(config.shift_seconds, 36_000);
        assert_eq!(config.shifts_per_day, 2);
        assert!(config.weekly_capacity_in_range(600));
        assert_eq!(config.daily_capacity_for(Some("F2")), Some(Decimal::from(300)));
        assert_eq!(config.daily_capacity_for(Some("F3")), None);
        assert_eq!(config.daily_capacity_for(None), None);
        assert_eq!(config.workplace_output_per_shift, Some(Decimal::from(40)));
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "shift_seconds": 25200, "default_weekly_capacity": 3500 }"#,
        )
        .unwrap();

        assert_eq!(config.shift_seconds, 25_200);
        assert_eq!(config.default_weekly_capacity, Some(3500));
        assert_eq!(config.max_weekly_capacity, 5000);
        assert_eq!(config.area_per_workplace_m2, Decimal::new(45, 1));
    }
}
