//! 流水線平衡計算
//!
//! 將五種輸入模式之一換算為節拍、班產量、工人數與工位數，
//! 並可檢查期間產能是否覆蓋計劃總數。時間單位為秒，產量為每班。

use garment_core::{
    DateRange, EngineConfig, FlowCalculationResult, FlowMode, FlowParams, FlowPeriod,
    PeriodCapacity, ValidationError,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::capacity::{floor_units, load_percent};

/// 各模式換算出的流水線參數
#[derive(Debug, Clone, Copy)]
struct LineFigures {
    takt: Decimal,
    output: Decimal,
    workers: Option<Decimal>,
    workplaces: Option<Decimal>,
}

/// 流水線平衡計算器
pub struct LineBalanceCalculator<'a> {
    config: &'a EngineConfig,
}

impl<'a> LineBalanceCalculator<'a> {
    /// 創建新的計算器
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// 班次長度（秒）
    pub fn shift_seconds(&self) -> Decimal {
        Decimal::from(self.config.shift_seconds)
    }

    /// 執行計算
    ///
    /// 期間未提供計劃總數時按 0 計算，只回報期間產能。
    pub fn calculate(&self, params: &FlowParams) -> Result<FlowCalculationResult, ValidationError> {
        let planned = params.period.and_then(|p| p.planned_total).unwrap_or(0);
        self.calculate_with_planned(params, planned)
    }

    /// 執行計算，期間計劃總數缺失時使用 `fallback_planned`
    pub fn calculate_with_planned(
        &self,
        params: &FlowParams,
        fallback_planned: i64,
    ) -> Result<FlowCalculationResult, ValidationError> {
        let shift = self.shift_seconds();
        if shift <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                param: "shift_seconds",
            });
        }

        let figures = self.line_figures(params, shift)?;

        let output_norm = optional_positive(params.operation_time_sec, "operation_time_sec")?
            .map(|op_time| div(shift, op_time, "operation_time_sec"))
            .transpose()?
            .map(|norm| norm.round_dp(2));

        let output = figures.output.round_dp(2);
        let period = match params.period {
            Some(period) => {
                let planned = period.planned_total.unwrap_or(fallback_planned);
                Some(self.period_capacity(period, output, planned)?)
            }
            None => None,
        };

        let workers_required = figures.workers.and_then(|w| w.round_dp(6).ceil().to_i64());
        let workplaces = figures
            .workplaces
            .or(figures.workers)
            .and_then(|k| k.round_dp(6).ceil().to_i64());

        let result = FlowCalculationResult {
            mode: params.mode,
            takt_seconds: figures.takt.round_dp(2),
            output_per_shift: output,
            workers: figures.workers.map(|w| w.round_dp(2)),
            workers_required,
            workplaces,
            output_norm,
            period,
        };

        tracing::debug!(
            "流水線計算 {}：節拍 {} 秒，班產量 {}",
            result.mode,
            result.takt_seconds,
            result.output_per_shift
        );

        Ok(result)
    }

    fn line_figures(&self, params: &FlowParams, shift: Decimal) -> Result<LineFigures, ValidationError> {
        let mode = params.mode;

        match mode {
            FlowMode::ByShiftCapacity => {
                let msm = required(params.shift_capacity, mode, "Msm")?;
                let labor = optional_positive(params.labor_seconds, "T")?;
                let workers = match labor {
                    Some(t) => Some(div(mul(t, msm, "T")?, shift, "T")?),
                    None => None,
                };
                Ok(LineFigures {
                    takt: div(shift, msm, "Msm")?,
                    output: msm,
                    workers,
                    workplaces: None,
                })
            }
            FlowMode::ByWorkers => {
                let labor = required(params.labor_seconds, mode, "T")?;
                let workers = required(params.workers, mode, "Np")?;
                Ok(LineFigures {
                    takt: div(labor, workers, "Np")?,
                    output: div(mul(shift, workers, "Np")?, labor, "T")?,
                    workers: Some(workers),
                    workplaces: None,
                })
            }
            FlowMode::ByWorkplaces => {
                let workplaces = required(params.workplaces, mode, "Kr")?;
                self.workplace_figures(params, workplaces, shift)
            }
            FlowMode::ByArea => {
                let area = required(params.area_m2, mode, "Su")?;
                let norm = self.config.area_per_workplace_m2;
                if norm <= Decimal::ZERO {
                    return Err(ValidationError::NonPositive {
                        param: "area_per_workplace_m2",
                    });
                }
                let workplaces = div(area, norm, "Su")?.floor();
                if workplaces <= Decimal::ZERO {
                    return Err(ValidationError::NonPositive { param: "Kr" });
                }
                self.workplace_figures(params, workplaces, shift)
            }
            FlowMode::ByTAndM => {
                let labor = required(params.labor_seconds, mode, "T")?;
                let output = required(params.output_per_shift, mode, "M")?;
                Ok(LineFigures {
                    takt: div(shift, output, "M")?,
                    output,
                    workers: Some(div(mul(labor, output, "M")?, shift, "T")?),
                    workplaces: None,
                })
            }
        }
    }

    /// 由工位數換算：提供工時時每工位一名工人，否則使用配置的每工位產量
    fn workplace_figures(
        &self,
        params: &FlowParams,
        workplaces: Decimal,
        shift: Decimal,
    ) -> Result<LineFigures, ValidationError> {
        if let Some(labor) = optional_positive(params.labor_seconds, "T")? {
            return Ok(LineFigures {
                takt: div(labor, workplaces, "Kr")?,
                output: div(mul(shift, workplaces, "Kr")?, labor, "T")?,
                workers: Some(workplaces),
                workplaces: Some(workplaces),
            });
        }

        let rate = self
            .config
            .workplace_output_per_shift
            .ok_or(ValidationError::MissingParameter {
                mode: params.mode,
                param: "T",
            })?;
        if rate <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                param: "workplace_output_per_shift",
            });
        }

        let output = mul(workplaces, rate, "Kr")?;
        Ok(LineFigures {
            takt: div(shift, output, "Kr")?,
            output,
            workers: None,
            workplaces: Some(workplaces),
        })
    }

    /// 期間產能 = 班產量 × 每日班次 × 工作日
    fn period_capacity(
        &self,
        period: FlowPeriod,
        output_per_shift: Decimal,
        planned_total: i64,
    ) -> Result<PeriodCapacity, ValidationError> {
        let range = DateRange::new(period.from, period.to)?;
        if planned_total < 0 {
            return Err(ValidationError::NegativeValue {
                field: "planned_total",
                value: planned_total,
            });
        }

        let working_days = range.day_count();
        let per_day = mul(
            output_per_shift,
            Decimal::from(self.config.shifts_per_day),
            "shifts_per_day",
        )?;
        let capacity_total = floor_units(mul(per_day, Decimal::from(working_days as u64), "period")?);

        if capacity_total == 0 && planned_total > 0 {
            return Err(ValidationError::ZeroCapacity {
                remaining: planned_total,
            });
        }

        Ok(PeriodCapacity {
            from: range.from,
            to: range.to,
            working_days,
            capacity_total,
            planned_total,
            capacity_percent: load_percent(planned_total, capacity_total),
            capacity_ok: planned_total <= capacity_total,
        })
    }
}

fn required(value: Option<Decimal>, mode: FlowMode, param: &'static str) -> Result<Decimal, ValidationError> {
    let value = value.ok_or(ValidationError::MissingParameter { mode, param })?;
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositive { param });
    }
    Ok(value)
}

fn div(lhs: Decimal, rhs: Decimal, param: &'static str) -> Result<Decimal, ValidationError> {
    lhs.checked_div(rhs)
        .ok_or(ValidationError::ValueOutOfRange { param })
}

fn mul(lhs: Decimal, rhs: Decimal, param: &'static str) -> Result<Decimal, ValidationError> {
    lhs.checked_mul(rhs)
        .ok_or(ValidationError::ValueOutOfRange { param })
}

fn optional_positive(value: Option<Decimal>, param: &'static str) -> Result<Option<Decimal>, ValidationError> {
    match value {
        Some(v) if v <= Decimal::ZERO => Err(ValidationError::NonPositive { param }),
        other => Ok(other),
    }
}
