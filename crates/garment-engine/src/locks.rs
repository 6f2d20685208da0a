//! 按訂單加鎖：同一訂單的寫操作串行，不同訂單互不阻塞

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// 訂單鎖表
#[derive(Debug, Default)]
pub struct OrderLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在訂單鎖內執行 `f`
    ///
    /// 沒有其他呼叫者等待同一訂單時，返回前移除該訂單的鎖。
    pub fn with_order<T>(&self, order_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(order_id);
        let value = {
            // 鎖只保護臨界區，不持有資料；中毒時照常繼續
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(order_id, lock);
        value
    }

    /// 目前登記的訂單鎖數量
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_for(&self, order_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(order_id.to_string()).or_default())
    }

    fn release(&self, order_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        // 表內引用是最後一個時才移除；登記與移除都在表鎖內進行
        if locks
            .get(order_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(order_id);
        }
    }
}
