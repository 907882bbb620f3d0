//! Price-time priority limit order book and matching engine.
//!
//! - `orderbook::OrderBook` is the single-instrument book: validate, match,
//!   rest, cancel, and read-side queries.
//! - `shared::SharedOrderBook` serializes many producers through one lock.
//! - `engine::MatchingEngine` owns a book on a worker thread and processes a
//!   command queue in order.
//! - `replay` and `cli` drive the engine from a CSV order feed.

// 将所有模块声明为公共的，这样二进制文件、测试和基准测试都能访问它们
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod orderbook;
pub mod protocol;
pub mod replay;
pub mod shared;
pub mod traits;
pub mod validation;

pub use config::{BookConfig, SelfTradePolicy};
pub use engine::{CommandSender, EngineCommand, EngineOutput, EngineStats, MatchingEngine};
pub use error::{BookError, EngineError};
pub use orderbook::OrderBook;
pub use protocol::{
    BookSnapshot, LevelSummary, NewOrder, OrderId, OwnerId, Price, Quantity, Quote, RestingOrder,
    Side, Submission, Trade, Trades,
};
pub use shared::SharedOrderBook;
pub use traits::OrderMatching;
pub use validation::{OrderValidator, ValidationConfig, ValidationError};
