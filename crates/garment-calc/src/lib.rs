//! # Garment Production Calculation
//!
//! 生產排程的純計算邏輯：變體矩陣驗證、工序分派、工序階段控制、
//! 產能分配與流水線平衡。本 crate 不做任何存儲，全部以值進、值出。

pub mod assignment;
pub mod capacity;
pub mod distribution;
pub mod line_balance;
pub mod matrix;
pub mod stage;

// Re-export 主要類型
pub use assignment::{AssignmentBuilder, AssignmentContext, OperationInput};
pub use capacity::CapacityAllocator;
pub use distribution::EvenDistributor;
pub use line_balance::LineBalanceCalculator;
pub use matrix::MatrixValidator;
pub use stage::{StageGate, VariantUpdate};
