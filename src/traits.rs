//! Matching abstraction
//!
//! `OrderMatching` is the seam between the matching services (`SharedOrderBook`,
//! `MatchingEngine`) and the book that actually matches. The engine is generic
//! over it, so calls are monomorphized and a test double can stand in for the
//! real book.
//!
//! ## Example
//! ```rust
//! use lob_engine::orderbook::OrderBook;
//! use lob_engine::protocol::NewOrder;
//! use lob_engine::traits::OrderMatching;
//! use rust_decimal::Decimal;
//!
//! fn rest_one<B: OrderMatching>(book: &mut B) -> u64 {
//!     let submission = book
//!         .submit_order(NewOrder::buy(Decimal::from(100), Decimal::ONE))
//!         .unwrap();
//!     submission.order_id
//! }
//!
//! let mut book = OrderBook::default();
//! let id = rest_one(&mut book);
//! assert_eq!(book.best_bid(), Some(Decimal::from(100)));
//! assert!(book.cancel(id));
//! ```

use crate::error::BookError;
use crate::orderbook::OrderBook;
use crate::protocol::{BookSnapshot, NewOrder, OrderId, Price, Quote, Submission};

/// Core matching operations of an order book
pub trait OrderMatching {
    /// Validates, matches and rests an order
    ///
    /// # Returns
    /// * `Ok(Submission)` with the assigned id, trades and resting remainder
    /// * `Err(BookError::InvalidOrder)` when validation fails; nothing changes
    fn submit_order(&mut self, order: NewOrder) -> Result<Submission, BookError>;

    /// Cancels a resting order, `false` when it is not resting
    fn cancel(&mut self, order_id: OrderId) -> bool;

    fn best_bid(&self) -> Option<Price>;

    fn best_ask(&self) -> Option<Price>;

    /// Depth snapshot with at most `max_levels` per side
    fn snapshot(&self, max_levels: usize) -> BookSnapshot;

    fn quote(&self) -> Quote {
        Quote::new(self.best_bid(), self.best_ask())
    }

    /// Gets the current spread (best_ask - best_bid)
    fn spread(&self) -> Option<Price> {
        self.quote().spread()
    }

    /// Gets the midpoint price ((best_bid + best_ask) / 2)
    fn mid_price(&self) -> Option<Price> {
        self.quote().mid_price()
    }
}

impl OrderMatching for OrderBook {
    fn submit_order(&mut self, order: NewOrder) -> Result<Submission, BookError> {
        OrderBook::submit_order(self, order)
    }

    fn cancel(&mut self, order_id: OrderId) -> bool {
        OrderBook::cancel(self, order_id)
    }

    fn best_bid(&self) -> Option<Price> {
        OrderBook::best_bid(self)
    }

    fn best_ask(&self) -> Option<Price> {
        OrderBook::best_ask(self)
    }

    fn snapshot(&self, max_levels: usize) -> BookSnapshot {
        OrderBook::snapshot(self, max_levels)
    }
}
