//! 排產日期範圍
//!
//! 不建模週末與節假日：閉區間內的每一個日曆日都是工作日。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// 閉區間日期範圍 `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// 創建日期範圍，`from` 晚於 `to` 時返回錯誤
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvalidDateRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// 工作日數量（`to - from + 1`）
    pub fn day_count(&self) -> usize {
        ((self.to - self.from).num_days() + 1) as usize
    }

    /// 檢查日期是否在範圍內
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// 按日期順序列出所有工作日
    pub fn working_days(&self) -> Vec<NaiveDate> {
        self.from
            .iter_days()
            .take_while(|date| *date <= self.to)
            .collect()
    }
}
