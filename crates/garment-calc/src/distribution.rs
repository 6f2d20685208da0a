//! 整數平均分配

use garment_core::ValidationError;

/// 平均分配器
///
/// `base = total / n`，`remainder = total % n`，
/// 前 `remainder` 個位置各多分 1，保證合計恰好等於 `total`。
pub struct EvenDistributor;

impl EvenDistributor {
    /// 將 `total` 按順序分配到 `slots` 個位置
    pub fn split(total: i64, slots: usize) -> Result<Vec<i64>, ValidationError> {
        if total < 0 {
            return Err(ValidationError::NegativeValue {
                field: "total",
                value: total,
            });
        }

        if slots == 0 {
            return if total == 0 {
                Ok(Vec::new())
            } else {
                Err(ValidationError::NoSlots { total })
            };
        }

        let n = slots as i64;
        let base = total / n;
        let remainder = (total % n) as usize;

        Ok((0..slots)
            .map(|i| if i < remainder { base + 1 } else { base })
            .collect())
    }
}
