//! 工序分配建立與變體行補種

use chrono::NaiveDate;
use garment_core::{
    checked_sum, Operation, OperationAssignment, OperationVariantRow, ProductionError, StageAssignee,
    ValidationError, VariantCell, VariantKey, VariantMatrix,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::distribution::EvenDistributor;

/// 單一工序的分配輸入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInput {
    pub operation_id: String,

    #[serde(default)]
    pub worker_id: Option<String>,

    pub planned_quantity: i64,

    pub planned_date: NaiveDate,

    /// 覆蓋訂單預設樓層
    #[serde(default)]
    pub floor_id: Option<String>,

    /// 顯式變體拆分；未提供時從訂單矩陣補種
    #[serde(default)]
    pub variants: Option<Vec<VariantCell>>,
}

impl OperationInput {
    /// 創建新的分配輸入
    pub fn new(operation_id: impl Into<String>, planned_quantity: i64, planned_date: NaiveDate) -> Self {
        Self {
            operation_id: operation_id.into(),
            worker_id: None,
            planned_quantity,
            planned_date,
            floor_id: None,
            variants: None,
        }
    }

    /// 建構器模式：設置工人
    pub fn with_worker(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = Some(worker_id.into());
        self
    }

    /// 建構器模式：設置樓層
    pub fn with_floor(mut self, floor_id: impl Into<String>) -> Self {
        self.floor_id = Some(floor_id.into());
        self
    }

    /// 建構器模式：設置變體拆分
    pub fn with_variants(mut self, variants: Vec<VariantCell>) -> Self {
        self.variants = Some(variants);
        self
    }
}

/// 訂單層級的分配上下文
#[derive(Debug, Clone, Copy)]
pub struct AssignmentContext<'a> {
    pub order_id: &'a str,
    pub floor_id: Option<&'a str>,
    pub technologist_id: Option<&'a str>,
    pub matrix: &'a VariantMatrix,
}

/// 工序分配建立器
pub struct AssignmentBuilder;

impl AssignmentBuilder {
    /// 為訂單建立完整的分配集合
    ///
    /// 任何一筆輸入無效時整批失敗，不產生部分結果。
    /// 每道工序在同一集合中只能出現一次。
    pub fn build(
        context: AssignmentContext<'_>,
        inputs: &[OperationInput],
        operations: &HashMap<String, Operation>,
    ) -> garment_core::Result<Vec<OperationAssignment>> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(inputs.len());
        if let Some(repeated) = inputs.iter().find(|i| !seen.insert(i.operation_id.as_str())) {
            return Err(ValidationError::DuplicateOperation {
                operation: repeated.operation_id.clone(),
            }
            .into());
        }

        inputs
            .iter()
            .map(|input| Self::build_one(context, input, operations))
            .collect()
    }

    fn build_one(
        context: AssignmentContext<'_>,
        input: &OperationInput,
        operations: &HashMap<String, Operation>,
    ) -> garment_core::Result<OperationAssignment> {
        let operation = operations.get(&input.operation_id).ok_or_else(|| {
            ProductionError::NotFound {
                entity: "工序",
                id: input.operation_id.clone(),
            }
        })?;

        if input.planned_quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity {
                field: "planned_quantity",
                value: input.planned_quantity,
            }
            .into());
        }

        let assignee =
            StageAssignee::for_category(operation.category, input.worker_id.clone(), &operation.name)?;
        let floor_id = Self::resolve_floor(operation, input.floor_id.as_deref().or(context.floor_id))?;

        let mut assignment = OperationAssignment::new(
            context.order_id,
            operation,
            assignee,
            input.planned_quantity,
            input.planned_date,
        )
        .with_floor_id(floor_id);

        if let Some(technologist_id) = context.technologist_id {
            assignment = assignment.with_technologist_id(technologist_id);
        }

        match &input.variants {
            Some(variants) => {
                assignment.rows = Self::explicit_rows(operation, input, variants, context.matrix)?;
            }
            None => {
                Self::seed_rows_if_missing(&mut assignment, context.matrix)?;
            }
        }

        Ok(assignment)
    }

    /// 套用樓層鎖定：未指定樓層時使用鎖定樓層，指定其他樓層時拒絕
    fn resolve_floor(
        operation: &Operation,
        requested: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        match (&operation.locked_floor, requested) {
            (Some(locked), Some(requested)) if locked != requested => {
                Err(ValidationError::FloorLocked {
                    operation: operation.name.clone(),
                    locked: locked.clone(),
                    requested: requested.to_string(),
                })
            }
            (Some(locked), _) => Ok(Some(locked.clone())),
            (None, requested) => Ok(requested.map(str::to_string)),
        }
    }

    fn explicit_rows(
        operation: &Operation,
        input: &OperationInput,
        variants: &[VariantCell],
        matrix: &VariantMatrix,
    ) -> Result<Vec<OperationVariantRow>, ValidationError> {
        let mut seen: HashSet<VariantKey> = HashSet::with_capacity(variants.len());

        for cell in variants {
            let key = cell.key();
            if !matrix.contains(&key) {
                return Err(ValidationError::UnknownVariant {
                    color: cell.color.clone(),
                    size: cell.size.clone(),
                });
            }
            if cell.quantity < 0 {
                return Err(ValidationError::NegativeQuantity {
                    color: cell.color.clone(),
                    size: cell.size.clone(),
                    quantity: cell.quantity,
                });
            }
            if !seen.insert(key) {
                return Err(ValidationError::DuplicateVariant {
                    color: cell.color.clone(),
                    size: cell.size.clone(),
                });
            }
        }

        let rows_sum = checked_sum(variants.iter().map(|c| c.quantity))
            .ok_or(ValidationError::QuantityOverflow { field: "variants" })?;
        if rows_sum != input.planned_quantity {
            return Err(ValidationError::PlannedSumMismatch {
                operation: operation.name.clone(),
                planned: input.planned_quantity,
                rows: rows_sum,
            });
        }

        Ok(variants
            .iter()
            .map(|c| OperationVariantRow::new(c.color.clone(), c.size.clone(), c.quantity))
            .collect())
    }

    /// 變體行缺失時從訂單矩陣補種（冪等）
    ///
    /// 計劃數量等於矩陣合計時直接複製各格數量，否則按矩陣順序平均分配。
    /// 已有變體行或矩陣為空時不做任何修改，返回 `false`。
    pub fn seed_rows_if_missing(
        assignment: &mut OperationAssignment,
        matrix: &VariantMatrix,
    ) -> Result<bool, ValidationError> {
        if !assignment.rows.is_empty() || matrix.is_empty() {
            return Ok(false);
        }

        let quantities: Vec<i64> = if assignment.planned_total == matrix.total() {
            matrix.cells().iter().map(|c| c.quantity).collect()
        } else {
            EvenDistributor::split(assignment.planned_total, matrix.len())?
        };

        assignment.rows = matrix
            .cells()
            .iter()
            .zip(quantities)
            .map(|(cell, planned)| OperationVariantRow::new(cell.color.clone(), cell.size.clone(), planned))
            .collect();

        tracing::debug!(
            "工序 {} 從矩陣補種 {} 行變體",
            assignment.operation_name,
            assignment.rows.len()
        );
        Ok(true)
    }
}
