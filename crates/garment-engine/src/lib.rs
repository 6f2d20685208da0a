//! # Garment Production Engine
//!
//! 對外暴露生產分配與完工的各項操作。引擎透過 [`ProductionStore`]
//! 讀寫資料，本身不綁定任何存儲技術；同一訂單的寫操作串行執行。

pub mod engine;
pub mod locks;
pub mod logging;
pub mod request;
pub mod store;

// Re-export 主要類型
pub use engine::ProductionEngine;
pub use locks::OrderLocks;
pub use request::{CapacityRequest, FlowApplyRequest, PlanDayUpdate};
pub use store::{InMemoryStore, ProductionStore};
