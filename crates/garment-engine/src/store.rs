//! 存儲介面與記憶體實現
//!
//! 存儲層只做讀寫，不含任何業務規則；錯誤以 `anyhow::Error` 原樣透傳。

use anyhow::anyhow;
use garment_core::{
    Operation, OperationAssignment, Order, PlanDayKey, PlanScope, ProductionPlanDay, VariantMatrix,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// 生產資料存儲
pub trait ProductionStore: Send + Sync {
    // ===== 訂單 =====

    fn order(&self, order_id: &str) -> anyhow::Result<Option<Order>>;

    fn save_order(&self, order: &Order) -> anyhow::Result<()>;

    // ===== 變體矩陣 =====

    fn variant_matrix(&self, order_id: &str) -> anyhow::Result<Option<VariantMatrix>>;

    /// 整體替換訂單的變體矩陣
    fn save_variant_matrix(&self, order_id: &str, matrix: &VariantMatrix) -> anyhow::Result<()>;

    // ===== 工序定義（唯讀參考資料）=====

    fn operation(&self, operation_id: &str) -> anyhow::Result<Option<Operation>>;

    // ===== 工序分配 =====

    fn assignments(&self, order_id: &str) -> anyhow::Result<Vec<OperationAssignment>>;

    fn assignment(&self, assignment_id: Uuid) -> anyhow::Result<Option<OperationAssignment>>;

    /// 以單次調用整體替換訂單的分配集合
    fn replace_assignments(
        &self,
        order_id: &str,
        assignments: Vec<OperationAssignment>,
    ) -> anyhow::Result<()>;

    fn save_assignment(&self, assignment: &OperationAssignment) -> anyhow::Result<()>;

    // ===== 生產計劃日 =====

    /// 範圍內的計劃日，按日期排序
    fn plan_days(&self, scope: &PlanScope) -> anyhow::Result<Vec<ProductionPlanDay>>;

    fn plan_day(&self, key: &PlanDayKey) -> anyhow::Result<Option<ProductionPlanDay>>;

    /// 按鍵寫入（存在則覆蓋）
    fn save_plan_days(&self, days: &[ProductionPlanDay]) -> anyhow::Result<()>;
}

/// 記憶體存儲
#[derive(Debug, Default)]
pub struct InMemoryStore {
    orders: RwLock<HashMap<String, Order>>,
    matrices: RwLock<HashMap<String, VariantMatrix>>,
    operations: RwLock<HashMap<String, Operation>>,
    assignments: RwLock<HashMap<String, Vec<OperationAssignment>>>,
    plan_days: RwLock<BTreeMap<PlanDayKey, ProductionPlanDay>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登記工序定義
    pub fn insert_operation(&self, operation: Operation) -> anyhow::Result<()> {
        write(&self.operations)?.insert(operation.id.clone(), operation);
        Ok(())
    }

    /// 建構器模式：登記多個工序定義
    pub fn with_operations(self, operations: impl IntoIterator<Item = Operation>) -> anyhow::Result<Self> {
        for operation in operations {
            self.insert_operation(operation)?;
        }
        Ok(self)
    }
}

fn read<T>(lock: &RwLock<T>) -> anyhow::Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|e| anyhow!("存儲讀鎖失敗: {e}"))
}

fn write<T>(lock: &RwLock<T>) -> anyhow::Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|e| anyhow!("存儲寫鎖失敗: {e}"))
}

impl ProductionStore for InMemoryStore {
    fn order(&self, order_id: &str) -> anyhow::Result<Option<Order>> {
        Ok(read(&self.orders)?.get(order_id).cloned())
    }

    fn save_order(&self, order: &Order) -> anyhow::Result<()> {
        write(&self.orders)?.insert(order.id.clone(), order.clone());
        Ok(())
    }

    fn variant_matrix(&self, order_id: &str) -> anyhow::Result<Option<VariantMatrix>> {
        Ok(read(&self.matrices)?.get(order_id).cloned())
    }

    fn save_variant_matrix(&self, order_id: &str, matrix: &VariantMatrix) -> anyhow::Result<()> {
        write(&self.matrices)?.insert(order_id.to_string(), matrix.clone());
        Ok(())
    }

    fn operation(&self, operation_id: &str) -> anyhow::Result<Option<Operation>> {
        Ok(read(&self.operations)?.get(operation_id).cloned())
    }

    fn assignments(&self, order_id: &str) -> anyhow::Result<Vec<OperationAssignment>> {
        Ok(read(&self.assignments)?
            .get(order_id)
            .cloned()
            .unwrap_or_default())
    }

    fn assignment(&self, assignment_id: Uuid) -> anyhow::Result<Option<OperationAssignment>> {
        Ok(read(&self.assignments)?
            .values()
            .flatten()
            .find(|a| a.id == assignment_id)
            .cloned())
    }

    fn replace_assignments(
        &self,
        order_id: &str,
        assignments: Vec<OperationAssignment>,
    ) -> anyhow::Result<()> {
        write(&self.assignments)?.insert(order_id.to_string(), assignments);
        Ok(())
    }

    fn save_assignment(&self, assignment: &OperationAssignment) -> anyhow::Result<()> {
        let mut all = write(&self.assignments)?;
        let order_set = all.entry(assignment.order_id.clone()).or_default();
        match order_set.iter_mut().find(|a| a.id == assignment.id) {
            Some(existing) => *existing = assignment.clone(),
            None => order_set.push(assignment.clone()),
        }
        Ok(())
    }

    fn plan_days(&self, scope: &PlanScope) -> anyhow::Result<Vec<ProductionPlanDay>> {
        let mut days: Vec<ProductionPlanDay> = read(&self.plan_days)?
            .values()
            .filter(|d| d.key.scope() == *scope)
            .cloned()
            .collect();
        days.sort_by_key(|d| d.date());
        Ok(days)
    }

    fn plan_day(&self, key: &PlanDayKey) -> anyhow::Result<Option<ProductionPlanDay>> {
        Ok(read(&self.plan_days)?.get(key).cloned())
    }

    fn save_plan_days(&self, days: &[ProductionPlanDay]) -> anyhow::Result<()> {
        let mut all = write(&self.plan_days)?;
        for day in days {
            all.insert(day.key.clone(), day.clone());
        }
        Ok(())
    }
}
