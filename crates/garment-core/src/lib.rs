//! # Garment Production Core
//!
//! 生產分配與完工引擎的核心資料模型與類型定義

pub mod calendar;
pub mod config;
pub mod flow;
pub mod operation;
pub mod order;
pub mod plan;
pub mod variant;

// Re-export 主要類型
pub use calendar::DateRange;
pub use config::EngineConfig;
pub use flow::{FlowCalculationResult, FlowMode, FlowParams, FlowPeriod, PeriodCapacity};
pub use operation::{
    AssignmentStatus, Operation, OperationAssignment, OperationVariantRow, StageAssignee,
    StageCategory, VariantShortfall,
};
pub use order::{Order, OrderCompletion, OrderStatus};
pub use plan::{
    CapacityPlan, CapacitySource, PlanDayKey, PlanScope, PlannedDay, ProductionPlanDay,
};
pub use variant::{checked_sum, VariantCell, VariantKey, VariantMatrix};

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// 輸入驗證錯誤
///
/// 所有驗證失敗都不會修改任何已保存的狀態
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("訂單總數量不可為負數: {0}")]
    NegativeTotal(i64),

    #[error("變體數量不可為負數: {color}/{size} = {quantity}")]
    NegativeQuantity {
        color: String,
        size: String,
        quantity: i64,
    },

    #[error("訂單總數量為 {total}，但變體矩陣為空")]
    EmptyMatrix { total: i64 },

    #[error("變體矩陣合計 {actual} 與訂單總數量 {expected} 不符")]
    SumMismatch { expected: i64, actual: i64 },

    #[error("未知的變體: {color}/{size}")]
    UnknownVariant { color: String, size: String },

    #[error("重複的變體: {color}/{size}")]
    DuplicateVariant { color: String, size: String },

    #[error("數量 {total} 無法分配到 0 個位置")]
    NoSlots { total: i64 },

    #[error("工序 {operation} 必須指定工人")]
    MissingWorker { operation: String },

    #[error("工序 {operation} 鎖定於樓層 {locked}，不可分配到樓層 {requested}")]
    FloorLocked {
        operation: String,
        locked: String,
        requested: String,
    },

    #[error("工序 {operation} 計劃數量 {planned} 與變體合計 {rows} 不符")]
    PlannedSumMismatch {
        operation: String,
        planned: i64,
        rows: i64,
    },

    #[error("{color}/{size} 實際數量 {actual} 超過計劃數量 {planned}")]
    ActualExceedsPlanned {
        color: String,
        size: String,
        actual: i64,
        planned: i64,
    },

    #[error("{field} 必須大於 0: {value}")]
    NonPositiveQuantity { field: &'static str, value: i64 },

    #[error("{field} 不可為負數: {value}")]
    NegativeValue { field: &'static str, value: i64 },

    #[error("日期範圍無效: {from} 晚於 {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("每週產能 {value} 超出允許範圍 [{min}, {max}]")]
    CapacityOutOfRange { value: i64, min: i64, max: i64 },

    #[error("每日產能必須大於 0: {0}")]
    NonPositiveCapacity(Decimal),

    #[error("未提供產能來源（每週產能或樓層每日產能）")]
    MissingCapacity,

    #[error("總產能為 0，無法排產 {remaining} 件")]
    ZeroCapacity { remaining: i64 },

    #[error("{mode} 模式缺少參數 {param}")]
    MissingParameter { mode: FlowMode, param: &'static str },

    #[error("參數 {param} 必須大於 0")]
    NonPositive { param: &'static str },

    #[error("參數 {param} 超出可計算範圍")]
    ValueOutOfRange { param: &'static str },

    #[error("{field} 合計超出可表示範圍")]
    QuantityOverflow { field: &'static str },

    #[error("工序 {operation} 在同一分配中重複出現")]
    DuplicateOperation { operation: String },

    #[error("工序 {operation} 已完成，不可修改變體")]
    AssignmentDone { operation: String },

    #[error("訂單 {order_id} 沒有任何工序分配")]
    NoAssignments { order_id: String },
}

/// 生產引擎錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum ProductionError {
    #[error("驗證失敗: {0}")]
    Validation(#[from] ValidationError),

    #[error("工序 {operation} 無法進行：{blocking_stage} 階段尚未完成（{}）", .pending.join(", "))]
    StageBlocked {
        operation: String,
        blocking_stage: StageCategory,
        pending: Vec<String>,
    },

    #[error("工序 {operation} 尚有未完成的變體: {}", join_display(.rows))]
    IncompleteVariants {
        operation: String,
        rows: Vec<VariantShortfall>,
    },

    #[error("請先填寫實際數量: {}", .operations.join(", "))]
    IncompleteOperations { operations: Vec<String> },

    #[error("產能不足：需求 {required}，期間產能 {capacity}（{percent}%），請延長期間或減少數量")]
    Overload {
        required: i64,
        capacity: i64,
        percent: Decimal,
    },

    #[error("工序 {operation} 狀態無法從 {from} 轉換到 {to}")]
    InvalidTransition {
        operation: String,
        from: AssignmentStatus,
        to: AssignmentStatus,
    },

    #[error("找不到{entity}: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("儲存層錯誤: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ProductionError {
    /// 是否為業務規則拒絕（非儲存層錯誤）
    pub fn is_domain(&self) -> bool {
        !matches!(self, ProductionError::Storage(_))
    }
}

fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ProductionError>;
