//! 變體矩陣驗證

use garment_core::{checked_sum, ValidationError, VariantCell, VariantKey, VariantMatrix};
use std::collections::HashSet;

use crate::distribution::EvenDistributor;

/// 變體矩陣驗證器
pub struct MatrixValidator;

impl MatrixValidator {
    /// 驗證變體矩陣
    ///
    /// 拒絕負數、未宣告的顏色/尺碼、重複格、總數量大於 0 時的空矩陣，
    /// 以及合計不等於訂單總數量的矩陣。不做任何自動平衡，
    /// 只按宣告的顏色、尺碼順序排列格子。
    pub fn validate(
        cells: &[VariantCell],
        total_quantity: i64,
        sizes: &[String],
        colors: &[String],
    ) -> Result<VariantMatrix, ValidationError> {
        if total_quantity < 0 {
            return Err(ValidationError::NegativeTotal(total_quantity));
        }

        let mut seen: HashSet<VariantKey> = HashSet::with_capacity(cells.len());
        let mut ordered = Vec::with_capacity(cells.len());

        for cell in cells {
            if cell.quantity < 0 {
                return Err(ValidationError::NegativeQuantity {
                    color: cell.color.clone(),
                    size: cell.size.clone(),
                    quantity: cell.quantity,
                });
            }

            let color_index = colors.iter().position(|c| *c == cell.color);
            let size_index = sizes.iter().position(|s| *s == cell.size);
            let (Some(color_index), Some(size_index)) = (color_index, size_index) else {
                return Err(ValidationError::UnknownVariant {
                    color: cell.color.clone(),
                    size: cell.size.clone(),
                });
            };

            if !seen.insert(cell.key()) {
                return Err(ValidationError::DuplicateVariant {
                    color: cell.color.clone(),
                    size: cell.size.clone(),
                });
            }

            ordered.push(((color_index, size_index), cell.clone()));
        }

        if ordered.is_empty() && total_quantity > 0 {
            return Err(ValidationError::EmptyMatrix {
                total: total_quantity,
            });
        }

        let sum = checked_sum(ordered.iter().map(|(_, c)| c.quantity)).ok_or(
            ValidationError::QuantityOverflow {
                field: "variant_matrix",
            },
        )?;
        if sum != total_quantity {
            return Err(ValidationError::SumMismatch {
                expected: total_quantity,
                actual: sum,
            });
        }

        ordered.sort_by_key(|(position, _)| *position);

        Ok(VariantMatrix::from_validated(
            ordered.into_iter().map(|(_, cell)| cell).collect(),
        ))
    }

    /// 將一行（顏色）的合計平均分配到各尺碼
    ///
    /// 前 `row_total % n` 個尺碼各多分 1。結果仍需通過 [`MatrixValidator::validate`]。
    pub fn distribute_row_total(
        color: &str,
        row_total: i64,
        sizes: &[String],
    ) -> Result<Vec<VariantCell>, ValidationError> {
        let quantities = EvenDistributor::split(row_total, sizes.len())?;

        Ok(sizes
            .iter()
            .zip(quantities)
            .map(|(size, quantity)| VariantCell::new(color, size.clone(), quantity))
            .collect())
    }
}
