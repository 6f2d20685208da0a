//! 流水線平衡（節拍）計算模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 計算模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowMode {
    /// 按班產能（Msm）
    ByShiftCapacity,
    /// 按工人數（T, Np）
    ByWorkers,
    /// 按工位數（Kr）
    ByWorkplaces,
    /// 按面積（Su）
    ByArea,
    /// 按工時與產量（T, M）
    ByTAndM,
}

impl fmt::Display for FlowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowMode::ByShiftCapacity => "BY_SHIFT_CAPACITY",
            FlowMode::ByWorkers => "BY_WORKERS",
            FlowMode::ByWorkplaces => "BY_WORKPLACES",
            FlowMode::ByArea => "BY_AREA",
            FlowMode::ByTAndM => "BY_T_AND_M",
        };
        f.write_str(name)
    }
}

/// 產能檢查期間
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,

    /// 期間計劃總數（未提供時按 0 計算）
    pub planned_total: Option<i64>,
}

/// 計算參數
///
/// 各模式只讀取自己需要的欄位，其餘欄位忽略。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowParams {
    pub mode: FlowMode,

    /// 班產能 Msm（件/班）
    #[serde(default)]
    pub shift_capacity: Option<Decimal>,

    /// 單件勞動時間 T（秒/件）
    #[serde(default)]
    pub labor_seconds: Option<Decimal>,

    /// 工人數 Np
    #[serde(default)]
    pub workers: Option<Decimal>,

    /// 工位數 Kr
    #[serde(default)]
    pub workplaces: Option<Decimal>,

    /// 面積 Su（平方米）
    #[serde(default)]
    pub area_m2: Option<Decimal>,

    /// 班產量 M（件/班）
    #[serde(default)]
    pub output_per_shift: Option<Decimal>,

    /// 單工序時間（秒），提供時計算產量定額
    #[serde(default)]
    pub operation_time_sec: Option<Decimal>,

    /// 產能檢查期間
    #[serde(default)]
    pub period: Option<FlowPeriod>,
}

impl FlowParams {
    /// 創建只有模式的空參數
    pub fn new(mode: FlowMode) -> Self {
        Self {
            mode,
            shift_capacity: None,
            labor_seconds: None,
            workers: None,
            workplaces: None,
            area_m2: None,
            output_per_shift: None,
            operation_time_sec: None,
            period: None,
        }
    }

    /// 按班產能
    pub fn by_shift_capacity(msm: Decimal) -> Self {
        let mut params = Self::new(FlowMode::ByShiftCapacity);
        params.shift_capacity = Some(msm);
        params
    }

    /// 按工人數
    pub fn by_workers(labor_seconds: Decimal, workers: Decimal) -> Self {
        let mut params = Self::new(FlowMode::ByWorkers);
        params.labor_seconds = Some(labor_seconds);
        params.workers = Some(workers);
        params
    }

    /// 按工位數
    pub fn by_workplaces(workplaces: Decimal) -> Self {
        let mut params = Self::new(FlowMode::ByWorkplaces);
        params.workplaces = Some(workplaces);
        params
    }

    /// 按面積
    pub fn by_area(area_m2: Decimal) -> Self {
        let mut params = Self::new(FlowMode::ByArea);
        params.area_m2 = Some(area_m2);
        params
    }

    /// 按工時與產量
    pub fn by_t_and_m(labor_seconds: Decimal, output_per_shift: Decimal) -> Self {
        let mut params = Self::new(FlowMode::ByTAndM);
        params.labor_seconds = Some(labor_seconds);
        params.output_per_shift = Some(output_per_shift);
        params
    }

    /// 建構器模式：設置單件勞動時間
    pub fn with_labor_seconds(mut self, labor_seconds: Decimal) -> Self {
        self.labor_seconds = Some(labor_seconds);
        self
    }

    /// 建構器模式：設置單工序時間
    pub fn with_operation_time(mut self, seconds: Decimal) -> Self {
        self.operation_time_sec = Some(seconds);
        self
    }

    /// 建構器模式：設置產能檢查期間
    pub fn with_period(mut self, from: NaiveDate, to: NaiveDate, planned_total: Option<i64>) -> Self {
        self.period = Some(FlowPeriod {
            from,
            to,
            planned_total,
        });
        self
    }
}

/// 期間產能判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCapacity {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub working_days: usize,

    /// 期間總產能（件，取整）
    pub capacity_total: i64,

    pub planned_total: i64,

    /// 計劃 / 產能 × 100（四捨五入）
    pub capacity_percent: Decimal,

    /// 計劃是否在產能範圍內
    pub capacity_ok: bool,
}

/// 流水線平衡計算結果（每次請求重新計算，不緩存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCalculationResult {
    pub mode: FlowMode,

    /// 節拍 t（秒/件）
    pub takt_seconds: Decimal,

    /// 班產量 M（件/班）
    pub output_per_shift: Decimal,

    /// 所需工人數（精確值）
    pub workers: Option<Decimal>,

    /// 所需工人數（向上取整）
    pub workers_required: Option<i64>,

    /// 工位數
    pub workplaces: Option<i64>,

    /// 產量定額 Nv（件/班）
    pub output_norm: Option<Decimal>,

    /// 期間產能判定
    pub period: Option<PeriodCapacity>,
}

impl FlowCalculationResult {
    /// 期間產能是否足夠（未做期間判定時視為足夠）
    pub fn capacity_ok(&self) -> bool {
        self.period.as_ref().map_or(true, |p| p.capacity_ok)
    }
}
