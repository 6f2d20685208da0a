use chrono::{NaiveDate, TimeZone, Utc};
use garment_calc::{OperationInput, VariantUpdate};
use garment_core::{
    AssignmentStatus, EngineConfig, FlowParams, Operation, OperationAssignment, Order, OrderStatus,
    PlanDayKey, PlanScope, ProductionError, ProductionPlanDay, StageCategory, ValidationError,
    VariantCell, VariantMatrix,
};
use garment_engine::{
    CapacityRequest, FlowApplyRequest, InMemoryStore, PlanDayUpdate, ProductionEngine,
    ProductionStore,
};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use uuid::Uuid;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
}

fn cells() -> Vec<VariantCell> {
    vec![
        VariantCell::new("Black", "S", 10),
        VariantCell::new("Black", "M", 5),
        VariantCell::new("White", "S", 10),
        VariantCell::new("White", "M", 5),
    ]
}

fn store() -> InMemoryStore {
    let store = InMemoryStore::new()
        .with_operations([
            Operation::new("cut", "Raskroy", StageCategory::Cutting),
            Operation::new("sew", "Poshiv", StageCategory::Sewing).with_locked_floor("F2"),
            Operation::new("otk", "Otk", StageCategory::Finish),
        ])
        .unwrap();

    let order = Order::new("ORD-1", 30, date(20))
        .with_sizes(["S", "M"])
        .with_colors(["Black", "White"]);
    store.save_order(&order).unwrap();
    store
}

#[fixture]
fn engine() -> ProductionEngine<InMemoryStore> {
    garment_engine::logging::init_test();
    let engine = ProductionEngine::new(store(), EngineConfig::default());
    engine.set_variant_matrix("ORD-1", &cells()).unwrap();
    engine
}

fn standard_inputs() -> Vec<OperationInput> {
    vec![
        OperationInput::new("cut", 30, date(3)).with_worker("W-1"),
        OperationInput::new("sew", 30, date(5)).with_worker("W-2"),
        OperationInput::new("otk", 30, date(7)),
    ]
}

fn assign(engine: &ProductionEngine<InMemoryStore>) -> Vec<OperationAssignment> {
    engine
        .assign_operations("ORD-1", Some("F2"), Some("TECH-1"), &standard_inputs())
        .unwrap()
}

fn fulfil(engine: &ProductionEngine<InMemoryStore>, assignment: &OperationAssignment) {
    let updates: Vec<VariantUpdate> = assignment
        .rows
        .iter()
        .map(|r| VariantUpdate::new(r.color.clone(), r.size.clone(), r.planned_qty))
        .collect();
    engine.update_operation_variants(assignment.id, &updates).unwrap();
}

fn run_to_done(engine: &ProductionEngine<InMemoryStore>, assignment: &OperationAssignment) {
    engine.start_operation(assignment.id).unwrap();
    fulfil(engine, assignment);
    engine.complete_operation(assignment.id).unwrap();
}

// ===== 變體矩陣 =====

#[rstest]
fn test_rejected_matrix_keeps_previous(engine: ProductionEngine<InMemoryStore>) {
    let bad = vec![VariantCell::new("Black", "S", 29)];

    let err = engine.set_variant_matrix("ORD-1", &bad).unwrap_err();
    assert!(matches!(
        err,
        ProductionError::Validation(ValidationError::SumMismatch {
            expected: 30,
            actual: 29
        })
    ));

    let stored = engine.store().variant_matrix("ORD-1").unwrap().unwrap();
    assert_eq!(stored.total(), 30);
    assert_eq!(stored.len(), 4);
}

#[rstest]
fn test_validate_matrix_does_not_touch_store(engine: ProductionEngine<InMemoryStore>) {
    let sizes = vec!["S".to_string()];
    let colors = vec!["Red".to_string()];

    let matrix = engine
        .validate_matrix(12, &sizes, &colors, &[VariantCell::new("Red", "S", 12)])
        .unwrap();

    assert_eq!(matrix.total(), 12);
    assert_eq!(engine.store().variant_matrix("ORD-1").unwrap().unwrap().total(), 30);
}

#[rstest]
fn test_matrix_for_unknown_order(engine: ProductionEngine<InMemoryStore>) {
    assert!(matches!(
        engine.set_variant_matrix("ORD-404", &cells()),
        Err(ProductionError::NotFound { entity: "訂單", .. })
    ));
}

// ===== 工序分配 =====

#[rstest]
fn test_assign_seeds_rows_and_applies_floor_lock(engine: ProductionEngine<InMemoryStore>) {
    let assignments = assign(&engine);

    assert_eq!(assignments.len(), 3);
    let sew = &assignments[1];
    assert_eq!(sew.floor_id.as_deref(), Some("F2"));
    assert_eq!(sew.technologist_id.as_deref(), Some("TECH-1"));
    assert_eq!(sew.rows.len(), 4);
    assert_eq!(sew.rows_planned(), 30);
    assert_eq!(sew.row("White", "M").unwrap().planned_qty, 5);
}

#[rstest]
fn test_reassignment_replaces_previous_set(engine: ProductionEngine<InMemoryStore>) {
    let first = assign(&engine);

    let second = engine
        .assign_operations(
            "ORD-1",
            None,
            None,
            &[OperationInput::new("otk", 30, date(9))],
        )
        .unwrap();

    let stored = engine.store().assignments("ORD-1").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, second[0].id);
    assert!(engine.store().assignment(first[0].id).unwrap().is_none());
}

#[rstest]
#[case(OperationInput::new("sew", 30, date(5)), "必須指定工人")]
#[case(OperationInput::new("sew", 30, date(5)).with_worker("W-2").with_floor("F1"), "鎖定於樓層")]
#[case(OperationInput::new("cut", 0, date(5)).with_worker("W-1"), "planned_quantity")]
#[case(OperationInput::new("press", 30, date(5)).with_worker("W-1"), "press")]
#[case(OperationInput::new("cut", 30, date(5)).with_worker("W-1"), "重複出現")]
#[case(
    OperationInput::new("cut", 30, date(5))
        .with_worker("W-1")
        .with_variants(vec![VariantCell::new("Black", "S", 20)]),
    "不符"
)]
fn test_failed_reassignment_keeps_previous(
    engine: ProductionEngine<InMemoryStore>,
    #[case] bad_input: OperationInput,
    #[case] message: &str,
) {
    let first = assign(&engine);

    let mut inputs = standard_inputs();
    inputs.push(bad_input);
    let err = engine
        .assign_operations("ORD-1", Some("F2"), None, &inputs)
        .unwrap_err();

    assert!(err.is_domain());
    assert!(err.to_string().contains(message), "unexpected message: {err}");

    let stored = engine.store().assignments("ORD-1").unwrap();
    assert_eq!(
        stored.iter().map(|a| a.id).collect::<Vec<Uuid>>(),
        first.iter().map(|a| a.id).collect::<Vec<Uuid>>()
    );
}

// ===== 階段控制 =====

#[rstest]
fn test_sewing_waits_for_cutting(engine: ProductionEngine<InMemoryStore>) {
    let assignments = assign(&engine);
    let (cut, sew) = (&assignments[0], &assignments[1]);

    match engine.start_operation(sew.id).unwrap_err() {
        ProductionError::StageBlocked {
            blocking_stage,
            pending,
            ..
        } => {
            assert_eq!(blocking_stage, StageCategory::Cutting);
            assert_eq!(pending, vec!["Raskroy".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    run_to_done(&engine, cut);
    let started = engine.start_operation(sew.id).unwrap();
    assert_eq!(started.status, AssignmentStatus::InProgress);
}

#[rstest]
fn test_first_start_moves_order_in_progress(engine: ProductionEngine<InMemoryStore>) {
    let assignments = assign(&engine);
    assert_eq!(
        engine.store().order("ORD-1").unwrap().unwrap().status,
        OrderStatus::New
    );

    engine.start_operation(assignments[0].id).unwrap();

    assert_eq!(
        engine.store().order("ORD-1").unwrap().unwrap().status,
        OrderStatus::InProgress
    );
}

#[rstest]
fn test_variant_update_is_all_or_nothing(engine: ProductionEngine<InMemoryStore>) {
    let cut = assign(&engine).remove(0);
    engine.start_operation(cut.id).unwrap();

    let err = engine
        .update_operation_variants(
            cut.id,
            &[
                VariantUpdate::new("Black", "S", 10),
                VariantUpdate::new("Black", "M", 6),
            ],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ProductionError::Validation(ValidationError::ActualExceedsPlanned { planned: 5, .. })
    ));

    let stored = engine.store().assignment(cut.id).unwrap().unwrap();
    assert_eq!(stored.rows_actual(), 0);
}

#[rstest]
fn test_complete_requires_fulfilled_rows(engine: ProductionEngine<InMemoryStore>) {
    let cut = assign(&engine).remove(0);
    engine.start_operation(cut.id).unwrap();
    engine
        .update_operation_variants(cut.id, &[VariantUpdate::new("Black", "S", 10)])
        .unwrap();

    match engine.complete_operation(cut.id).unwrap_err() {
        ProductionError::IncompleteVariants { rows, .. } => assert_eq!(rows.len(), 3),
        other => panic!("unexpected error: {other:?}"),
    }

    fulfil(&engine, &cut);
    let done = engine.complete_operation(cut.id).unwrap();
    assert_eq!(done.status, AssignmentStatus::Done);
    assert_eq!(done.actual_total, 30);

    // 完成後凍結
    assert!(matches!(
        engine.update_operation_variants(cut.id, &[VariantUpdate::new("Black", "S", 0)]),
        Err(ProductionError::Validation(ValidationError::AssignmentDone { .. }))
    ));
}

#[rstest]
fn test_complete_without_start_is_invalid(engine: ProductionEngine<InMemoryStore>) {
    let cut = assign(&engine).remove(0);

    assert!(matches!(
        engine.complete_operation(cut.id),
        Err(ProductionError::InvalidTransition {
            from: AssignmentStatus::Waiting,
            to: AssignmentStatus::Done,
            ..
        })
    ));
}

#[rstest]
fn test_unknown_assignment(engine: ProductionEngine<InMemoryStore>) {
    assert!(matches!(
        engine.start_operation(Uuid::new_v4()),
        Err(ProductionError::NotFound { entity: "工序分配", .. })
    ));
}

// ===== 訂單完工 =====

#[rstest]
fn test_order_completion_lists_unfinished_operations(engine: ProductionEngine<InMemoryStore>) {
    let assignments = assign(&engine);
    run_to_done(&engine, &assignments[0]);

    let err = engine.complete_order("ORD-1").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Poshiv, Otk"), "unexpected message: {message}");
    assert_eq!(
        engine.store().order("ORD-1").unwrap().unwrap().status,
        OrderStatus::InProgress
    );
}

#[rstest]
fn test_order_without_assignments_cannot_complete(engine: ProductionEngine<InMemoryStore>) {
    assert!(matches!(
        engine.complete_order("ORD-1"),
        Err(ProductionError::Validation(ValidationError::NoAssignments { .. }))
    ));
}

#[rstest]
#[case(Utc.with_ymd_and_hms(2025, 11, 20, 23, 0, 0).unwrap(), false)]
#[case(Utc.with_ymd_and_hms(2025, 11, 21, 9, 0, 0).unwrap(), true)]
fn test_order_completion_records_overdue(
    engine: ProductionEngine<InMemoryStore>,
    #[case] now: chrono::DateTime<Utc>,
    #[case] overdue: bool,
) {
    for assignment in assign(&engine) {
        run_to_done(&engine, &assignment);
    }

    let completion = engine.complete_order_at("ORD-1", now).unwrap();
    assert_eq!(completion.is_overdue, overdue);
    assert_eq!(completion.completed_at, now);

    let order = engine.store().order("ORD-1").unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Done);
    assert_eq!(order.completed_at, Some(now));
    assert_eq!(order.is_overdue, overdue);

    // 重複完工返回原記錄
    let later = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
    assert_eq!(engine.complete_order_at("ORD-1", later).unwrap(), completion);
}

// ===== 產能分配 =====

#[rstest]
fn test_calc_capacity_with_weekly_figure(engine: ProductionEngine<InMemoryStore>) {
    let request = CapacityRequest::new("ORD-1", "WS-1", date(1), date(7)).with_weekly_capacity(1000);

    let plan = engine.calc_capacity(&request).unwrap();

    assert!(!plan.overload);
    assert_eq!(plan.total_capacity, 1000);
    assert_eq!(plan.percent, Decimal::from(3));
    assert_eq!(plan.planned_total(), 30);
    assert!(engine.store().plan_days(&request.scope()).unwrap().is_empty());
}

#[test]
fn test_calc_capacity_source_resolution() {
    let config = EngineConfig::default().with_floor_daily_capacity("F1", Decimal::from(10));
    let engine = ProductionEngine::new(store(), config);

    let floor = CapacityRequest::new("ORD-1", "WS-1", date(3), date(5)).with_floor("F1");
    let plan = engine.calc_capacity(&floor).unwrap();
    assert_eq!(plan.total_capacity, 30);
    assert_eq!(
        plan.days.iter().map(|d| d.planned_qty).collect::<Vec<_>>(),
        vec![10, 10, 10]
    );

    let no_source = CapacityRequest::new("ORD-1", "WS-1", date(3), date(5)).with_floor("F9");
    assert!(matches!(
        engine.calc_capacity(&no_source),
        Err(ProductionError::Validation(ValidationError::MissingCapacity))
    ));

    let config = EngineConfig::default().with_default_weekly_capacity(2100);
    let engine = ProductionEngine::new(store(), config);
    let plan = engine.calc_capacity(&no_source).unwrap();
    assert_eq!(plan.total_capacity, 900);
}

#[rstest]
fn test_apply_preserves_actuals_and_reduces_remaining(engine: ProductionEngine<InMemoryStore>) {
    let request = CapacityRequest::new("ORD-1", "WS-1", date(3), date(5)).with_weekly_capacity(1400);
    let scope = request.scope();

    let plan = engine.calc_capacity(&request).unwrap();
    engine.apply_capacity(&scope, &plan.days).unwrap();

    let key: PlanDayKey = scope.key(date(3));
    engine
        .update_plan_day(&PlanDayUpdate::new(key.clone(), 10, 12).with_notes("overtime"))
        .unwrap();

    // 剩餘 = 30 - 12
    let replanned = engine.calc_capacity(&request).unwrap();
    assert_eq!(replanned.remaining, 18);
    engine.apply_capacity(&scope, &replanned.days).unwrap();

    let day = engine.store().plan_day(&key).unwrap().unwrap();
    assert_eq!(day.planned_qty, 6);
    assert_eq!(day.actual_qty, 12);
    assert_eq!(day.notes.as_deref(), Some("overtime"));
}

#[rstest]
fn test_manual_day_edit_is_not_revalidated(engine: ProductionEngine<InMemoryStore>) {
    let scope = PlanScope::new("ORD-1", "WS-1", None);

    let day: ProductionPlanDay = engine
        .update_plan_day(&PlanDayUpdate::new(scope.key(date(4)), 500, 0))
        .unwrap();
    assert_eq!(day.planned_qty, 500);

    assert!(matches!(
        engine.update_plan_day(&PlanDayUpdate::new(scope.key(date(4)), -1, 0)),
        Err(ProductionError::Validation(ValidationError::NegativeValue { .. }))
    ));
    assert_eq!(
        engine.store().plan_day(&scope.key(date(4))).unwrap().unwrap().planned_qty,
        500
    );
}

// ===== 流水線自動排程 =====

#[rstest]
fn test_flow_apply_auto_writes_schedule(engine: ProductionEngine<InMemoryStore>) {
    let request = FlowApplyRequest::new(
        "ORD-1",
        "WS-1",
        date(3),
        date(5),
        FlowParams::by_shift_capacity(Decimal::from(10)),
    );

    let saved = engine.flow_apply_auto(&request).unwrap();

    assert_eq!(saved.iter().map(|d| d.planned_qty).collect::<Vec<_>>(), vec![10, 10, 10]);
    assert_eq!(engine.store().plan_days(&request.scope()).unwrap().len(), 3);
}

#[rstest]
fn test_flow_apply_auto_overload_writes_nothing(engine: ProductionEngine<InMemoryStore>) {
    let request = FlowApplyRequest::new(
        "ORD-1",
        "WS-1",
        date(3),
        date(5),
        FlowParams::by_shift_capacity(Decimal::from(5)),
    );

    match engine.flow_apply_auto(&request).unwrap_err() {
        ProductionError::Overload {
            required,
            capacity,
            percent,
        } => {
            assert_eq!(required, 30);
            assert_eq!(capacity, 15);
            assert_eq!(percent, Decimal::from(200));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(engine.store().plan_days(&request.scope()).unwrap().is_empty());
}

#[rstest]
fn test_flow_calc_rejects_unrepresentable_result(engine: ProductionEngine<InMemoryStore>) {
    assert_eq!(
        engine.flow_calc(&FlowParams::by_workers(Decimal::ONE, Decimal::MAX)),
        Err(ValidationError::ValueOutOfRange { param: "Np" })
    );
}

#[rstest]
fn test_flow_calc_by_workers(engine: ProductionEngine<InMemoryStore>) {
    let result = engine
        .flow_calc(&FlowParams::by_workers(Decimal::from(120), Decimal::from(4)))
        .unwrap();

    assert_eq!(result.takt_seconds, Decimal::from(30));
    assert_eq!(result.output_per_shift, Decimal::from(960));
}

// ===== 存儲錯誤透傳 =====

struct UnavailableStore;

impl UnavailableStore {
    fn down<T>() -> anyhow::Result<T> {
        Err(anyhow::anyhow!("database unavailable"))
    }
}

impl ProductionStore for UnavailableStore {
    fn order(&self, _: &str) -> anyhow::Result<Option<Order>> {
        Self::down()
    }
    fn save_order(&self, _: &Order) -> anyhow::Result<()> {
        Self::down()
    }
    fn variant_matrix(&self, _: &str) -> anyhow::Result<Option<VariantMatrix>> {
        Self::down()
    }
    fn save_variant_matrix(&self, _: &str, _: &VariantMatrix) -> anyhow::Result<()> {
        Self::down()
    }
    fn operation(&self, _: &str) -> anyhow::Result<Option<Operation>> {
        Self::down()
    }
    fn assignments(&self, _: &str) -> anyhow::Result<Vec<OperationAssignment>> {
        Self::down()
    }
    fn assignment(&self, _: Uuid) -> anyhow::Result<Option<OperationAssignment>> {
        Self::down()
    }
    fn replace_assignments(&self, _: &str, _: Vec<OperationAssignment>) -> anyhow::Result<()> {
        Self::down()
    }
    fn save_assignment(&self, _: &OperationAssignment) -> anyhow::Result<()> {
        Self::down()
    }
    fn plan_days(&self, _: &PlanScope) -> anyhow::Result<Vec<ProductionPlanDay>> {
        Self::down()
    }
    fn plan_day(&self, _: &PlanDayKey) -> anyhow::Result<Option<ProductionPlanDay>> {
        Self::down()
    }
    fn save_plan_days(&self, _: &[ProductionPlanDay]) -> anyhow::Result<()> {
        Self::down()
    }
}

#[test]
fn test_storage_errors_pass_through() {
    let engine = ProductionEngine::new(UnavailableStore, EngineConfig::default());

    let err = engine.complete_order("ORD-1").unwrap_err();

    assert!(!err.is_domain());
    assert!(matches!(err, ProductionError::Storage(_)));
    assert!(format!("{err:#}").contains("database unavailable"));
}

/// 訂單寫入失敗，其餘操作交給記憶體存儲
struct OrderWritesFail {
    inner: InMemoryStore,
}

impl ProductionStore for OrderWritesFail {
    fn order(&self, order_id: &str) -> anyhow::Result<Option<Order>> {
        self.inner.order(order_id)
    }
    fn save_order(&self, _: &Order) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("order table locked"))
    }
    fn variant_matrix(&self, order_id: &str) -> anyhow::Result<Option<VariantMatrix>> {
        self.inner.variant_matrix(order_id)
    }
    fn save_variant_matrix(&self, order_id: &str, matrix: &VariantMatrix) -> anyhow::Result<()> {
        self.inner.save_variant_matrix(order_id, matrix)
    }
    fn operation(&self, operation_id: &str) -> anyhow::Result<Option<Operation>> {
        self.inner.operation(operation_id)
    }
    fn assignments(&self, order_id: &str) -> anyhow::Result<Vec<OperationAssignment>> {
        self.inner.assignments(order_id)
    }
    fn assignment(&self, assignment_id: Uuid) -> anyhow::Result<Option<OperationAssignment>> {
        self.inner.assignment(assignment_id)
    }
    fn replace_assignments(
        &self,
        order_id: &str,
        assignments: Vec<OperationAssignment>,
    ) -> anyhow::Result<()> {
        self.inner.replace_assignments(order_id, assignments)
    }
    fn save_assignment(&self, assignment: &OperationAssignment) -> anyhow::Result<()> {
        self.inner.save_assignment(assignment)
    }
    fn plan_days(&self, scope: &PlanScope) -> anyhow::Result<Vec<ProductionPlanDay>> {
        self.inner.plan_days(scope)
    }
    fn plan_day(&self, key: &PlanDayKey) -> anyhow::Result<Option<ProductionPlanDay>> {
        self.inner.plan_day(key)
    }
    fn save_plan_days(&self, days: &[ProductionPlanDay]) -> anyhow::Result<()> {
        self.inner.save_plan_days(days)
    }
}

#[test]
fn test_failed_order_write_leaves_assignment_waiting() {
    let engine = ProductionEngine::new(OrderWritesFail { inner: store() }, EngineConfig::default());
    engine.set_variant_matrix("ORD-1", &cells()).unwrap();
    let cut = engine
        .assign_operations("ORD-1", Some("F2"), None, &standard_inputs())
        .unwrap()
        .remove(0);

    let err = engine.start_operation(cut.id).unwrap_err();
    assert!(matches!(err, ProductionError::Storage(_)));

    let stored = engine.store().inner.assignment(cut.id).unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::Waiting);
    assert_eq!(
        engine.store().inner.order("ORD-1").unwrap().unwrap().status,
        OrderStatus::New
    );
}
