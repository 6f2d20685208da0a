//! 工序階段鏈（裁剪 → 縫製 → 後整）的狀態轉換與閘門檢查
//!
//! 所有函數只修改傳入的分配；驗證失敗時分配保持原狀。

use garment_core::{
    AssignmentStatus, OperationAssignment, ProductionError, StageCategory, ValidationError,
};
use serde::{Deserialize, Serialize};

/// 變體實際數量更新
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantUpdate {
    pub color: String,
    pub size: String,
    pub actual_qty: i64,
}

impl VariantUpdate {
    pub fn new(color: impl Into<String>, size: impl Into<String>, actual_qty: i64) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
            actual_qty,
        }
    }
}

/// 階段閘門
pub struct StageGate;

impl StageGate {
    /// 找出阻擋 `category` 的最早未完成階段
    ///
    /// 返回該階段與其未完成工序名稱；同階段的工序不互相阻擋。
    pub fn blocking_stage(
        order_assignments: &[OperationAssignment],
        category: StageCategory,
    ) -> Option<(StageCategory, Vec<String>)> {
        StageCategory::ALL
            .iter()
            .copied()
            .filter(|stage| stage.precedes(category))
            .find_map(|stage| {
                let pending: Vec<String> = order_assignments
                    .iter()
                    .filter(|a| a.category() == stage && !a.is_done())
                    .map(|a| a.operation_name.clone())
                    .collect();
                (!pending.is_empty()).then_some((stage, pending))
            })
    }

    /// 確認分配沒有被前序階段阻擋
    pub fn ensure_unblocked(
        assignment: &OperationAssignment,
        order_assignments: &[OperationAssignment],
    ) -> garment_core::Result<()> {
        match Self::blocking_stage(order_assignments, assignment.category()) {
            Some((blocking_stage, pending)) => Err(ProductionError::StageBlocked {
                operation: assignment.operation_name.clone(),
                blocking_stage,
                pending,
            }),
            None => Ok(()),
        }
    }

    /// 開始工序：Waiting → InProgress
    pub fn start(
        assignment: &mut OperationAssignment,
        order_assignments: &[OperationAssignment],
    ) -> garment_core::Result<()> {
        Self::ensure_status(assignment, AssignmentStatus::Waiting, AssignmentStatus::InProgress)?;
        Self::ensure_unblocked(assignment, order_assignments)?;

        assignment.status = AssignmentStatus::InProgress;
        tracing::debug!("工序 {} 開始", assignment.operation_name);
        Ok(())
    }

    /// 完成工序：InProgress → Done
    ///
    /// 所有變體行的實際數量必須達到計劃數量，完成時寫入實際合計。
    pub fn complete(
        assignment: &mut OperationAssignment,
        order_assignments: &[OperationAssignment],
    ) -> garment_core::Result<()> {
        Self::ensure_status(assignment, AssignmentStatus::InProgress, AssignmentStatus::Done)?;
        Self::ensure_unblocked(assignment, order_assignments)?;

        let shortfalls = assignment.shortfalls();
        if !shortfalls.is_empty() {
            return Err(ProductionError::IncompleteVariants {
                operation: assignment.operation_name.clone(),
                rows: shortfalls,
            });
        }

        assignment.actual_total = assignment.rows_actual();
        assignment.status = AssignmentStatus::Done;
        tracing::debug!(
            "工序 {} 完成，實際數量 {}",
            assignment.operation_name,
            assignment.actual_total
        );
        Ok(())
    }

    /// 更新變體實際數量
    ///
    /// 整批驗證後才寫入：任何一行被拒絕時不修改分配。
    pub fn update_variants(
        assignment: &mut OperationAssignment,
        order_assignments: &[OperationAssignment],
        updates: &[VariantUpdate],
    ) -> garment_core::Result<()> {
        if assignment.is_done() {
            return Err(ValidationError::AssignmentDone {
                operation: assignment.operation_name.clone(),
            }
            .into());
        }
        Self::ensure_unblocked(assignment, order_assignments)?;

        let mut staged = Vec::with_capacity(updates.len());
        for update in updates {
            let index = assignment
                .rows
                .iter()
                .position(|r| r.matches(&update.color, &update.size))
                .ok_or_else(|| ValidationError::UnknownVariant {
                    color: update.color.clone(),
                    size: update.size.clone(),
                })?;

            if update.actual_qty < 0 {
                return Err(ValidationError::NegativeQuantity {
                    color: update.color.clone(),
                    size: update.size.clone(),
                    quantity: update.actual_qty,
                }
                .into());
            }

            let planned = assignment.rows[index].planned_qty;
            if update.actual_qty > planned {
                return Err(ValidationError::ActualExceedsPlanned {
                    color: update.color.clone(),
                    size: update.size.clone(),
                    actual: update.actual_qty,
                    planned,
                }
                .into());
            }

            staged.push((index, update.actual_qty));
        }

        for (index, actual_qty) in staged {
            assignment.rows[index].actual_qty = actual_qty;
        }
        Ok(())
    }

    /// 檢查訂單是否可以完工
    ///
    /// 所有分配必須為 Done 且每一行實際數量達到計劃數量。
    pub fn ensure_order_complete(
        order_id: &str,
        order_assignments: &[OperationAssignment],
    ) -> garment_core::Result<()> {
        if order_assignments.is_empty() {
            return Err(ValidationError::NoAssignments {
                order_id: order_id.to_string(),
            }
            .into());
        }

        let operations: Vec<String> = order_assignments
            .iter()
            .filter(|a| !a.is_done() || !a.shortfalls().is_empty())
            .map(|a| a.operation_name.clone())
            .collect();

        if !operations.is_empty() {
            return Err(ProductionError::IncompleteOperations { operations });
        }
        Ok(())
    }

    fn ensure_status(
        assignment: &OperationAssignment,
        expected: AssignmentStatus,
        to: AssignmentStatus,
    ) -> garment_core::Result<()> {
        if assignment.status != expected {
            return Err(ProductionError::InvalidTransition {
                operation: assignment.operation_name.clone(),
                from: assignment.status,
                to,
            });
        }
        Ok(())
    }
}
