//! 生產分配與完工引擎
//!
//! 每個操作都是「讀取 → 驗證 → 寫入」：驗證失敗時不寫入任何狀態。
//! 會修改訂單資料的操作在訂單鎖內執行。

use chrono::{DateTime, Utc};
use garment_calc::{
    AssignmentBuilder, AssignmentContext, CapacityAllocator, LineBalanceCalculator,
    MatrixValidator, OperationInput, StageGate, VariantUpdate,
};
use garment_core::{
    CapacityPlan, CapacitySource, DateRange, EngineConfig, FlowCalculationResult, FlowParams, Operation,
    OperationAssignment, Order, OrderCompletion, OrderStatus, PlanScope, PlannedDay,
    ProductionError, ProductionPlanDay, Result, ValidationError, VariantCell, VariantMatrix,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use crate::locks::OrderLocks;
use crate::request::{CapacityRequest, FlowApplyRequest, PlanDayUpdate};
use crate::store::ProductionStore;

/// 生產引擎
pub struct ProductionEngine<S: ProductionStore> {
    store: S,
    config: EngineConfig,
    locks: OrderLocks,
}

impl<S: ProductionStore> ProductionEngine<S> {
    /// 創建新的引擎
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            locks: OrderLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ===== 變體矩陣 =====

    /// 驗證變體矩陣（不讀寫存儲）
    pub fn validate_matrix(
        &self,
        total_quantity: i64,
        sizes: &[String],
        colors: &[String],
        cells: &[VariantCell],
    ) -> std::result::Result<VariantMatrix, ValidationError> {
        MatrixValidator::validate(cells, total_quantity, sizes, colors)
    }

    /// 按已保存的訂單驗證並整體替換變體矩陣
    #[instrument(skip(self, cells), fields(cells = cells.len()))]
    pub fn set_variant_matrix(&self, order_id: &str, cells: &[VariantCell]) -> Result<VariantMatrix> {
        let result = self.locks.with_order(order_id, || -> Result<VariantMatrix> {
            let order = self.load_order(order_id)?;
            let matrix = MatrixValidator::validate(cells, order.total_quantity, &order.sizes, &order.colors)?;
            self.store.save_variant_matrix(order_id, &matrix)?;
            Ok(matrix)
        });

        let matrix = rejected("設置變體矩陣", result)?;
        tracing::info!("訂單 {} 變體矩陣已更新，共 {} 格", order_id, matrix.len());
        Ok(matrix)
    }

    // ===== 工序分配 =====

    /// 為訂單建立完整的分配集合並整體替換舊集合
    #[instrument(skip(self, operations), fields(operations = operations.len()))]
    pub fn assign_operations(
        &self,
        order_id: &str,
        floor_id: Option<&str>,
        technologist_id: Option<&str>,
        operations: &[OperationInput],
    ) -> Result<Vec<OperationAssignment>> {
        let result = self.locks.with_order(order_id, || -> Result<Vec<OperationAssignment>> {
            self.load_order(order_id)?;
            let matrix = self.store.variant_matrix(order_id)?.unwrap_or_default();
            let definitions = self.operation_definitions(operations)?;

            let context = AssignmentContext {
                order_id,
                floor_id,
                technologist_id,
                matrix: &matrix,
            };
            let assignments = AssignmentBuilder::build(context, operations, &definitions)?;

            self.store.replace_assignments(order_id, assignments.clone())?;
            Ok(assignments)
        });

        let assignments = rejected("分配工序", result)?;
        tracing::info!("訂單 {} 已分配 {} 道工序", order_id, assignments.len());
        Ok(assignments)
    }

    /// 開始工序
    ///
    /// 變體行缺失時先從訂單矩陣補種；訂單第一次開工時狀態轉為 InProgress。
    #[instrument(skip(self))]
    pub fn start_operation(&self, assignment_id: Uuid) -> Result<OperationAssignment> {
        let result = self.with_assignment(assignment_id, |mut assignment, siblings| {
            if let Some(matrix) = self.store.variant_matrix(&assignment.order_id)? {
                AssignmentBuilder::seed_rows_if_missing(&mut assignment, &matrix)?;
            }
            StageGate::start(&mut assignment, siblings)?;

            // 寫入前先確認訂單存在
            let mut order = self.load_order(&assignment.order_id)?;
            if order.status == OrderStatus::New {
                order.status = OrderStatus::InProgress;
                self.store.save_order(&order)?;
            }
            self.store.save_assignment(&assignment)?;
            Ok(assignment)
        });

        let assignment = rejected("開始工序", result)?;
        tracing::info!("工序 {} 已開始（訂單 {}）", assignment.operation_name, assignment.order_id);
        Ok(assignment)
    }

    /// 更新工序的變體實際數量（整批寫入或整批拒絕）
    #[instrument(skip(self, updates), fields(rows = updates.len()))]
    pub fn update_operation_variants(
        &self,
        assignment_id: Uuid,
        updates: &[VariantUpdate],
    ) -> Result<OperationAssignment> {
        let result = self.with_assignment(assignment_id, |mut assignment, siblings| {
            StageGate::update_variants(&mut assignment, siblings, updates)?;
            self.store.save_assignment(&assignment)?;
            Ok(assignment)
        });

        let assignment = rejected("更新變體實際數量", result)?;
        tracing::debug!("工序 {} 變體實際合計 {}", assignment.operation_name, assignment.rows_actual());
        Ok(assignment)
    }

    /// 完成工序
    #[instrument(skip(self))]
    pub fn complete_operation(&self, assignment_id: Uuid) -> Result<OperationAssignment> {
        let result = self.with_assignment(assignment_id, |mut assignment, siblings| {
            StageGate::complete(&mut assignment, siblings)?;
            self.store.save_assignment(&assignment)?;
            Ok(assignment)
        });

        let assignment = rejected("完成工序", result)?;
        tracing::info!(
            "工序 {} 已完成，實際數量 {}（訂單 {}）",
            assignment.operation_name,
            assignment.actual_total,
            assignment.order_id
        );
        Ok(assignment)
    }

    // ===== 訂單完工 =====

    /// 以當前時間完成訂單
    pub fn complete_order(&self, order_id: &str) -> Result<OrderCompletion> {
        self.complete_order_at(order_id, Utc::now())
    }

    /// 以指定時間完成訂單
    ///
    /// 逾期不阻擋完工，只記錄 `is_overdue`。已完工的訂單返回原完工記錄。
    #[instrument(skip(self))]
    pub fn complete_order_at(&self, order_id: &str, now: DateTime<Utc>) -> Result<OrderCompletion> {
        let result = self.locks.with_order(order_id, || -> Result<OrderCompletion> {
            let mut order = self.load_order(order_id)?;
            if let (OrderStatus::Done, Some(completed_at)) = (order.status, order.completed_at) {
                return Ok(OrderCompletion {
                    order_id: order.id,
                    completed_at,
                    is_overdue: order.is_overdue,
                });
            }

            let assignments = self.store.assignments(order_id)?;
            StageGate::ensure_order_complete(order_id, &assignments)?;

            order.status = OrderStatus::Done;
            order.completed_at = Some(now);
            order.is_overdue = order.is_overdue_at(now);
            self.store.save_order(&order)?;

            Ok(OrderCompletion {
                order_id: order.id,
                completed_at: now,
                is_overdue: order.is_overdue,
            })
        });

        let completion = rejected("訂單完工", result)?;
        if completion.is_overdue {
            tracing::warn!("訂單 {} 逾期完工", completion.order_id);
        } else {
            tracing::info!("訂單 {} 已完工", completion.order_id);
        }
        Ok(completion)
    }

    // ===== 產能分配 =====

    /// 計算範圍內的逐日計劃（不寫入）
    #[instrument(skip(self), fields(order_id = %request.order_id))]
    pub fn calc_capacity(&self, request: &CapacityRequest) -> Result<CapacityPlan> {
        let result = (|| -> Result<CapacityPlan> {
            let order = self.load_order(&request.order_id)?;
            let range = request.range()?;
            let remaining = self.remaining_quantity(&order, &request.scope())?;
            let source = self.capacity_source(request.capacity_per_week, request.floor_id.as_deref())?;

            Ok(CapacityAllocator::new(&self.config).plan(remaining, range, source)?)
        })();

        let plan = rejected("產能計算", result)?;
        tracing::info!(
            "訂單 {} 剩餘 {}，總產能 {}，負荷 {}%",
            request.order_id,
            plan.remaining,
            plan.total_capacity,
            plan.percent
        );
        Ok(plan)
    }

    /// 寫入逐日計劃：覆蓋計劃數量，保留實際數量與備註
    #[instrument(skip(self, days), fields(order_id = %scope.order_id, days = days.len()))]
    pub fn apply_capacity(&self, scope: &PlanScope, days: &[PlannedDay]) -> Result<Vec<ProductionPlanDay>> {
        let result = self.locks.with_order(&scope.order_id, || -> Result<Vec<ProductionPlanDay>> {
            self.load_order(&scope.order_id)?;
            self.merge_and_save(scope, days)
        });

        let saved = rejected("寫入逐日計劃", result)?;
        tracing::info!("訂單 {} 已寫入 {} 天計劃", scope.order_id, saved.len());
        Ok(saved)
    }

    /// 手動修改單日計劃（不重新檢查期間合計）
    #[instrument(skip(self), fields(order_id = %update.order_id, date = %update.date))]
    pub fn update_plan_day(&self, update: &PlanDayUpdate) -> Result<ProductionPlanDay> {
        let result = self.locks.with_order(&update.order_id, || -> Result<ProductionPlanDay> {
            self.load_order(&update.order_id)?;
            let key = update.key();
            let current = self.store.plan_day(&key)?;
            let day = CapacityAllocator::override_day(
                current,
                key,
                update.planned_qty,
                update.actual_qty,
                update.notes.clone(),
            )?;
            self.store.save_plan_days(std::slice::from_ref(&day))?;
            Ok(day)
        });

        rejected("修改單日計劃", result)
    }

    // ===== 流水線平衡 =====

    /// 流水線平衡計算（不讀寫存儲）
    pub fn flow_calc(&self, params: &FlowParams) -> std::result::Result<FlowCalculationResult, ValidationError> {
        LineBalanceCalculator::new(&self.config).calculate(params)
    }

    /// 以流水線班產量作為每日產能，自動排程並寫入逐日計劃
    ///
    /// 期間產能不足時返回 `Overload`，不寫入任何計劃日。
    #[instrument(skip(self), fields(order_id = %request.order_id, mode = %request.params.mode))]
    pub fn flow_apply_auto(&self, request: &FlowApplyRequest) -> Result<Vec<ProductionPlanDay>> {
        let result = self.locks.with_order(&request.order_id, || -> Result<Vec<ProductionPlanDay>> {
            let order = self.load_order(&request.order_id)?;
            let scope = request.scope();
            let remaining = self.remaining_quantity(&order, &scope)?;

            let planned = request.params.period.and_then(|p| p.planned_total);
            let params = request
                .params
                .clone()
                .with_period(request.from, request.to, planned);
            let calculation = LineBalanceCalculator::new(&self.config).calculate_with_planned(&params, remaining)?;

            let Some(period) = calculation.period else {
                return Err(ValidationError::MissingParameter {
                    mode: params.mode,
                    param: "period",
                }
                .into());
            };
            if !period.capacity_ok {
                return Err(ProductionError::Overload {
                    required: period.planned_total,
                    capacity: period.capacity_total,
                    percent: period.capacity_percent,
                });
            }

            let daily = calculation.output_per_shift * Decimal::from(self.config.shifts_per_day);
            let range = DateRange::new(request.from, request.to)?;
            let days = CapacityAllocator::new(&self.config).allocate(remaining, range, CapacitySource::Daily(daily))?;

            self.merge_and_save(&scope, &days)
        });

        let saved = rejected("流水線自動排程", result)?;
        tracing::info!("訂單 {} 按流水線產量寫入 {} 天計劃", request.order_id, saved.len());
        Ok(saved)
    }

    // ===== 內部輔助 =====

    fn load_order(&self, order_id: &str) -> Result<Order> {
        self.store
            .order(order_id)?
            .ok_or_else(|| ProductionError::NotFound {
                entity: "訂單",
                id: order_id.to_string(),
            })
    }

    fn load_assignment(&self, assignment_id: Uuid) -> Result<OperationAssignment> {
        self.store
            .assignment(assignment_id)?
            .ok_or_else(|| ProductionError::NotFound {
                entity: "工序分配",
                id: assignment_id.to_string(),
            })
    }

    /// 在分配所屬訂單的鎖內，以最新的分配與同訂單分配執行 `f`
    fn with_assignment<T>(
        &self,
        assignment_id: Uuid,
        f: impl FnOnce(OperationAssignment, &[OperationAssignment]) -> Result<T>,
    ) -> Result<T> {
        let order_id = self.load_assignment(assignment_id)?.order_id;

        self.locks.with_order(&order_id, || {
            let siblings = self.store.assignments(&order_id)?;
            let assignment = siblings
                .iter()
                .find(|a| a.id == assignment_id)
                .cloned()
                .ok_or_else(|| ProductionError::NotFound {
                    entity: "工序分配",
                    id: assignment_id.to_string(),
                })?;
            f(assignment, &siblings)
        })
    }

    fn operation_definitions(&self, inputs: &[OperationInput]) -> Result<HashMap<String, Operation>> {
        let mut definitions = HashMap::with_capacity(inputs.len());
        for input in inputs {
            if definitions.contains_key(&input.operation_id) {
                continue;
            }
            if let Some(operation) = self.store.operation(&input.operation_id)? {
                definitions.insert(operation.id.clone(), operation);
            }
        }
        Ok(definitions)
    }

    /// 剩餘數量 = 訂單總數量 − 範圍內已報工數量（不小於 0）
    fn remaining_quantity(&self, order: &Order, scope: &PlanScope) -> Result<i64> {
        let produced: i64 = self
            .store
            .plan_days(scope)?
            .iter()
            .fold(0, |acc, d| acc.saturating_add(d.actual_qty));
        Ok(order.total_quantity.saturating_sub(produced).max(0))
    }

    /// 產能來源：顯式每週產能 → 樓層每日產能 → 預設每週產能
    fn capacity_source(
        &self,
        capacity_per_week: Option<i64>,
        floor_id: Option<&str>,
    ) -> std::result::Result<CapacitySource, ValidationError> {
        if let Some(weekly) = capacity_per_week {
            return Ok(CapacitySource::Weekly(weekly));
        }
        if let Some(daily) = self.config.daily_capacity_for(floor_id) {
            return Ok(CapacitySource::Daily(daily));
        }
        self.config
            .default_weekly_capacity
            .map(CapacitySource::Weekly)
            .ok_or(ValidationError::MissingCapacity)
    }

    fn merge_and_save(&self, scope: &PlanScope, days: &[PlannedDay]) -> Result<Vec<ProductionPlanDay>> {
        let existing = self.store.plan_days(scope)?;
        let merged = CapacityAllocator::merge(scope, days, &existing)?;
        self.store.save_plan_days(&merged)?;
        Ok(merged)
    }
}

/// 被拒絕的請求記錄為 warn 後原樣返回
fn rejected<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        if err.is_domain() {
            tracing::warn!("{}被拒絕: {}", operation, err);
        } else {
            tracing::error!("{}失敗: {:#}", operation, err);
        }
    }
    result
}
