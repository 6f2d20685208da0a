//! 訂單全流程示例：矩陣 → 分配 → 裁剪/縫製/後整 → 排產 → 完工

use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use garment_calc::{MatrixValidator, OperationInput, VariantUpdate};
use garment_core::{EngineConfig, FlowParams, Operation, Order, StageCategory};
use garment_engine::{
    logging, CapacityRequest, FlowApplyRequest, InMemoryStore, ProductionEngine, ProductionStore,
};
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    logging::init();
    println!("=== 訂單生產流程示例 ===\n");

    let store = InMemoryStore::new().with_operations([
        Operation::new("cut", "Raskroy", StageCategory::Cutting),
        Operation::new("sew", "Poshiv", StageCategory::Sewing).with_locked_floor("F2"),
        Operation::new("otk", "Otk", StageCategory::Finish),
    ])?;

    let deadline = NaiveDate::from_ymd_opt(2025, 11, 20).context("無效日期")?;
    let order = Order::new("ORD-2025-001", 120, deadline)
        .with_sizes(["S", "M", "L"])
        .with_colors(["Black", "Navy"]);
    store.save_order(&order)?;

    let config = EngineConfig::default().with_floor_daily_capacity("F2", Decimal::from(40));
    let engine = ProductionEngine::new(store, config);

    // 按顏色合計平均拆到尺碼
    let mut cells = MatrixValidator::distribute_row_total("Black", 70, &order.sizes)?;
    cells.extend(MatrixValidator::distribute_row_total("Navy", 50, &order.sizes)?);
    let matrix = engine.set_variant_matrix(&order.id, &cells)?;

    println!("變體矩陣:");
    for cell in matrix.cells() {
        println!("  - {}/{}: {}", cell.color, cell.size, cell.quantity);
    }

    let start = NaiveDate::from_ymd_opt(2025, 11, 3).context("無效日期")?;
    let assignments = engine.assign_operations(
        &order.id,
        Some("F2"),
        Some("TECH-7"),
        &[
            OperationInput::new("cut", 120, start).with_worker("W-11"),
            OperationInput::new("sew", 120, start).with_worker("W-12"),
            OperationInput::new("otk", 120, start),
        ],
    )?;

    println!("\n工序分配:");
    for assignment in &assignments {
        println!(
            "  - {} [{}] 計劃 {}，樓層 {}",
            assignment.operation_name,
            assignment.category(),
            assignment.planned_total,
            assignment.floor_id.as_deref().unwrap_or("-")
        );
    }

    // 縫製在裁剪完成前被擋下
    if let Err(err) = engine.start_operation(assignments[1].id) {
        println!("\n預期的阻擋: {err}");
    }

    for assignment in &assignments {
        engine.start_operation(assignment.id)?;
        let updates: Vec<VariantUpdate> = assignment
            .rows
            .iter()
            .map(|r| VariantUpdate::new(r.color.clone(), r.size.clone(), r.planned_qty))
            .collect();
        engine.update_operation_variants(assignment.id, &updates)?;
        let done = engine.complete_operation(assignment.id)?;
        println!("完成 {}，實際數量 {}", done.operation_name, done.actual_total);
    }

    let plan = engine.calc_capacity(
        &CapacityRequest::new(&order.id, "WS-1", start, start + chrono::Days::new(4)).with_floor("F2"),
    )?;
    println!(
        "\n產能: 總產能 {}，負荷 {}%，超負荷 {}",
        plan.total_capacity, plan.percent, plan.overload
    );
    for day in &plan.days {
        println!("  - {}: {}", day.date, day.planned_qty);
    }

    let line = engine.flow_calc(&FlowParams::by_workers(Decimal::from(600), Decimal::from(12)))?;
    println!(
        "\n流水線: 節拍 {} 秒，班產量 {}，工位 {:?}",
        line.takt_seconds, line.output_per_shift, line.workplaces
    );

    let applied = engine.flow_apply_auto(&FlowApplyRequest::new(
        &order.id,
        "WS-1",
        start,
        start + chrono::Days::new(6),
        FlowParams::by_shift_capacity(Decimal::from(25)),
    ))?;
    println!("按流水線產量寫入 {} 天計劃", applied.len());

    let completed_at = Utc.with_ymd_and_hms(2025, 11, 21, 17, 30, 0).single().unwrap_or_else(Utc::now);
    let completion = engine.complete_order_at(&order.id, completed_at)?;
    println!(
        "\n訂單 {} 完工於 {}，逾期: {}",
        completion.order_id, completion.completed_at, completion.is_overdue
    );

    Ok(())
}
