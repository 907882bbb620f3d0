//! 共享订单簿句柄 - 多生产者通过互斥锁串行化访问
//!
//! 设计要点：
//! 1. 每次 submit/cancel 在一次加锁内完成，撮合过程对其他线程不可见
//! 2. 买一和卖一在同一次加锁内读取，不会观察到交叉的盘口
//! 3. 句柄可以廉价克隆（仅 Arc 原子增量）
//!
//! 需要完全有序、无锁竞争的场景请使用 `engine::MatchingEngine`。

use crate::config::BookConfig;
use crate::error::BookError;
use crate::orderbook::OrderBook;
use crate::protocol::{BookSnapshot, NewOrder, OrderId, Price, Quantity, Quote, Side, Submission};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct SharedOrderBook {
    inner: Arc<Mutex<OrderBook>>,
}

impl SharedOrderBook {
    pub fn new(config: BookConfig) -> Self {
        Self::from_book(OrderBook::new(config))
    }

    pub fn from_book(book: OrderBook) -> Self {
        Self {
            inner: Arc::new(Mutex::new(book)),
        }
    }

    pub fn submit(
        &self,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Result<Submission, BookError> {
        self.inner.lock().submit(side, price, quantity)
    }

    pub fn submit_order(&self, order: NewOrder) -> Result<Submission, BookError> {
        self.inner.lock().submit_order(order)
    }

    pub fn cancel(&self, order_id: OrderId) -> bool {
        self.inner.lock().cancel(order_id)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.inner.lock().best_bid()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.inner.lock().best_ask()
    }

    /// 在同一次加锁内读取买一和卖一
    pub fn quote(&self) -> Quote {
        self.inner.lock().quote()
    }

    pub fn snapshot(&self, max_levels: usize) -> BookSnapshot {
        self.inner.lock().snapshot(max_levels)
    }

    /// 持锁期间对订单簿做任意只读访问
    ///
    /// # 示例
    /// ```
    /// use lob_engine::shared::SharedOrderBook;
    /// use lob_engine::config::BookConfig;
    ///
    /// let book = SharedOrderBook::new(BookConfig::new("BTC/USD"));
    /// assert!(book.with_book(|b| b.is_empty()));
    /// ```
    pub fn with_book<R>(&self, f: impl FnOnce(&OrderBook) -> R) -> R {
        f(&self.inner.lock())
    }

    /// 取回内部订单簿；仍有其他句柄存活时原样返回自身
    pub fn try_into_inner(self) -> Result<OrderBook, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl Default for SharedOrderBook {
    fn default() -> Self {
        Self::new(BookConfig::default())
    }
}

impl From<OrderBook> for SharedOrderBook {
    fn from(book: OrderBook) -> Self {
        Self::from_book(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::thread;

    #[test]
    fn test_clones_share_one_book() {
        let book = SharedOrderBook::default();
        let other = book.clone();

        let sell = book.submit(Side::Sell, Decimal::from(100), Decimal::ONE).unwrap();
        assert_eq!(other.best_ask(), Some(Decimal::from(100)));

        let buy = other.submit(Side::Buy, Decimal::from(100), Decimal::ONE).unwrap();
        assert_eq!(buy.trades[0].maker_order_id, sell.order_id);
        assert!(book.with_book(|b| b.is_empty()));
    }

    #[test]
    fn test_concurrent_producers_never_cross() {
        let book = SharedOrderBook::default();
        let mut handles = Vec::new();

        for t in 0..4u64 {
            let book = book.clone();
            handles.push(thread::spawn(move || {
                for i in 0..250u64 {
                    let side = if (i + t) % 2 == 0 { Side::Buy } else { Side::Sell };
                    let price = Decimal::from(95 + (i * 7 + t) % 11);
                    book.submit(side, price, Decimal::from(1 + i % 3)).unwrap();
                    assert!(!book.quote().is_crossed());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // 1000笔订单全部受理，序号只增不减
        let book = book.try_into_inner().unwrap();
        assert!(!book.quote().is_crossed());
        assert!(book.sequence() >= 1000);
    }

    #[test]
    fn test_try_into_inner_with_live_clone() {
        let book = SharedOrderBook::default();
        let clone = book.clone();
        let book = book.try_into_inner().unwrap_err();
        drop(clone);
        assert!(book.try_into_inner().is_ok());
    }
}
