//! 產能分配：將剩餘需求按日攤到日期範圍內

use chrono::NaiveDate;
use garment_core::{
    CapacityPlan, CapacitySource, DateRange, EngineConfig, PlanScope, PlannedDay, ProductionError,
    ProductionPlanDay, ValidationError,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::distribution::EvenDistributor;

/// 產能分配器
pub struct CapacityAllocator<'a> {
    config: &'a EngineConfig,
}

impl<'a> CapacityAllocator<'a> {
    /// 創建新的產能分配器
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// 列出 `[from, to]` 內的工作日（每個日曆日都是工作日）
    pub fn working_days(from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, ValidationError> {
        Ok(DateRange::new(from, to)?.working_days())
    }

    /// 計算期間總產能（件，向下取整）
    ///
    /// 每週產能按 `weekly × days / 7` 計算，7 天範圍恰好等於每週產能。
    pub fn total_capacity(&self, source: CapacitySource, days: usize) -> Result<i64, ValidationError> {
        match source {
            CapacitySource::Weekly(weekly) => {
                if !self.config.weekly_capacity_in_range(weekly) {
                    return Err(ValidationError::CapacityOutOfRange {
                        value: weekly,
                        min: self.config.min_weekly_capacity,
                        max: self.config.max_weekly_capacity,
                    });
                }
                let scaled = weekly
                    .checked_mul(days as i64)
                    .ok_or(ValidationError::ValueOutOfRange {
                        param: "capacity_per_week",
                    })?;
                Ok(scaled / 7)
            }
            CapacitySource::Daily(daily) => {
                if daily <= Decimal::ZERO {
                    return Err(ValidationError::NonPositiveCapacity(daily));
                }
                let total = daily
                    .checked_mul(Decimal::from(days as u64))
                    .ok_or(ValidationError::ValueOutOfRange {
                        param: "floor_daily_capacity",
                    })?;
                Ok(floor_units(total))
            }
        }
    }

    /// 計算逐日計劃
    ///
    /// 超負荷時 `overload = true` 且不產生逐日計劃；否則按平均分配規則
    /// 分配剩餘數量，逐日合計恰好等於剩餘數量。
    pub fn plan(
        &self,
        remaining: i64,
        range: DateRange,
        source: CapacitySource,
    ) -> Result<CapacityPlan, ValidationError> {
        if remaining < 0 {
            return Err(ValidationError::NegativeValue {
                field: "remaining_quantity",
                value: remaining,
            });
        }

        let working_days = range.working_days();
        let total_capacity = self.total_capacity(source, working_days.len())?;

        if total_capacity == 0 && remaining > 0 {
            return Err(ValidationError::ZeroCapacity { remaining });
        }

        let percent = load_percent(remaining, total_capacity);
        let overload = remaining > total_capacity;

        tracing::debug!(
            "產能計算：剩餘 {}，工作日 {}，總產能 {}，負荷 {}%",
            remaining,
            working_days.len(),
            total_capacity,
            percent
        );

        let days = if overload {
            tracing::warn!("產能不足：需求 {} 超過期間產能 {}", remaining, total_capacity);
            Vec::new()
        } else {
            let quantities = EvenDistributor::split(remaining, working_days.len())?;
            working_days
                .iter()
                .zip(quantities)
                .map(|(date, qty)| PlannedDay::new(*date, qty))
                .collect()
        };

        Ok(CapacityPlan {
            remaining,
            working_days: working_days.len(),
            total_capacity,
            percent,
            overload,
            days,
        })
    }

    /// 計算逐日計劃，超負荷時返回 `Overload` 錯誤
    pub fn allocate(
        &self,
        remaining: i64,
        range: DateRange,
        source: CapacitySource,
    ) -> garment_core::Result<Vec<PlannedDay>> {
        let plan = self.plan(remaining, range, source)?;
        if plan.overload {
            return Err(ProductionError::Overload {
                required: plan.remaining,
                capacity: plan.total_capacity,
                percent: plan.percent,
            });
        }
        Ok(plan.days)
    }

    /// 將逐日計劃合併到既有計劃日
    ///
    /// 按 (訂單, 車間, 日期, 樓層) 鍵更新：只覆蓋計劃數量，保留實際數量與備註。
    /// 返回需要寫入的計劃日。
    pub fn merge(
        scope: &PlanScope,
        days: &[PlannedDay],
        existing: &[ProductionPlanDay],
    ) -> Result<Vec<ProductionPlanDay>, ValidationError> {
        if let Some(day) = days.iter().find(|d| d.planned_qty < 0) {
            return Err(ValidationError::NegativeValue {
                field: "planned_qty",
                value: day.planned_qty,
            });
        }

        Ok(days
            .iter()
            .map(|day| {
                let key = scope.key(day.date);
                match existing.iter().find(|e| e.key == key) {
                    Some(current) => ProductionPlanDay {
                        planned_qty: day.planned_qty,
                        ..current.clone()
                    },
                    None => ProductionPlanDay::new(key, day.planned_qty),
                }
            })
            .collect())
    }

    /// 手動修改單日計劃
    ///
    /// 直接覆蓋計劃與實際數量，不重新檢查期間合計。
    pub fn override_day(
        current: Option<ProductionPlanDay>,
        key: garment_core::PlanDayKey,
        planned_qty: i64,
        actual_qty: i64,
        notes: Option<String>,
    ) -> Result<ProductionPlanDay, ValidationError> {
        if planned_qty < 0 {
            return Err(ValidationError::NegativeValue {
                field: "planned_qty",
                value: planned_qty,
            });
        }
        if actual_qty < 0 {
            return Err(ValidationError::NegativeValue {
                field: "actual_qty",
                value: actual_qty,
            });
        }

        let mut day = current.unwrap_or_else(|| ProductionPlanDay::new(key, 0));
        day.planned_qty = planned_qty;
        day.actual_qty = actual_qty;
        if notes.is_some() {
            day.notes = notes;
        }
        Ok(day)
    }
}

/// 小數產能轉為整件（先消除除法誤差再向下取整）
pub(crate) fn floor_units(value: Decimal) -> i64 {
    value.round_dp(6).floor().to_i64().unwrap_or(i64::MAX)
}

/// 負荷百分比：需求 / 產能 × 100，四捨五入到整數
pub(crate) fn load_percent(required: i64, capacity: i64) -> Decimal {
    if capacity == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(required) * Decimal::ONE_HUNDRED / Decimal::from(capacity))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
