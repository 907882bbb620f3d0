use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// 订单ID，同时也是时间优先级的排序键
pub type OrderId = u64;

/// 下单方标识，仅用于自成交检查
pub type OwnerId = u64;

/// 价格使用十进制定点数，避免浮点数精度问题
pub type Price = Decimal;

/// 数量同样使用十进制
pub type Quantity = Decimal;

/// 一次撮合产生的成交列表，绝大多数情况下不超过8笔，避免堆分配
pub type Trades = SmallVec<[Trade; 8]>;

/// 订单方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Whether an incoming order on this side with limit `limit` crosses a
    /// resting order priced at `resting`.
    pub fn crosses(self, limit: Price, resting: Price) -> bool {
        match self {
            Side::Buy => limit >= resting,
            Side::Sell => limit <= resting,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// 新订单请求，由上游生产者构造
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    /// 可选的下单方，只有同时设置了下单方的两笔订单才可能构成自成交
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerId>,
}

impl NewOrder {
    pub fn new(side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            side,
            price,
            quantity,
            owner: None,
        }
    }

    pub fn buy(price: Price, quantity: Quantity) -> Self {
        Self::new(Side::Buy, price, quantity)
    }

    pub fn sell(price: Price, quantity: Quantity) -> Self {
        Self::new(Side::Sell, price, quantity)
    }

    /// Tags the order with the submitter identity used by self-trade prevention
    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// 成交记录，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// 挂单方（被动方）
    pub maker_order_id: OrderId,
    /// 吃单方（主动方）
    pub taker_order_id: OrderId,
    /// 吃单方方向
    pub taker_side: Side,
    /// 成交价格，始终为挂单方价格
    pub price: Price,
    pub quantity: Quantity,
    /// 全局递增序号，用于回放和审计排序
    pub sequence: u64,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Id assigned to the incoming order on admission
    pub order_id: OrderId,
    /// Trades in creation order, earliest maker first
    pub trades: Trades,
    /// Quantity left resting on the book; zero when fully filled or dropped
    pub resting: Quantity,
    /// Orders removed by self-trade prevention instead of trading
    pub cancelled: SmallVec<[OrderId; 4]>,
}

impl Submission {
    /// Total quantity executed by the incoming order
    pub fn filled_quantity(&self) -> Quantity {
        self.trades
            .iter()
            .fold(Quantity::ZERO, |total, trade| total.saturating_add(trade.quantity))
    }

    /// Whether any part of the incoming order is now resting
    pub fn is_resting(&self) -> bool {
        !self.resting.is_zero()
    }
}

/// A resting order as seen from outside the book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerId>,
}

/// 买一卖一快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
}

impl Quote {
    pub fn new(best_bid: Option<Price>, best_ask: Option<Price>) -> Self {
        Self { best_bid, best_ask }
    }

    /// best_ask - best_bid, when both sides are present
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            // bid + ask 在价格接近 Decimal::MAX 时会溢出
            (Some(bid), Some(ask)) => Some(bid + (ask - bid) / Decimal::TWO),
            _ => None,
        }
    }

    /// A crossed quote must never be observable after a submission completes
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid, self.best_ask), (Some(bid), Some(ask)) if bid >= ask)
    }
}

/// 单个价格档位的汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub price: Price,
    pub quantity: Quantity,
    pub orders: usize,
}

/// 订单簿深度快照，双方均按最优价格在前排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub symbol: String,
    pub sequence: u64,
    pub bids: Vec<LevelSummary>,
    pub asks: Vec<LevelSummary>,
}

impl BookSnapshot {
    pub fn levels(&self, side: Side) -> &[LevelSummary] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// 快照内某一方的总挂单量，超出范围时饱和到 `Decimal::MAX`
    pub fn total_quantity(&self, side: Side) -> Quantity {
        self.levels(side)
            .iter()
            .fold(Quantity::ZERO, |total, level| total.saturating_add(level.quantity))
    }

    /// Volume-weighted average price of one side.
    ///
    /// `None` when the side is empty or its notional does not fit in a `Decimal`.
    pub fn vwap(&self, side: Side) -> Option<Price> {
        let levels = self.levels(side);
        let mut notional = Decimal::ZERO;
        let mut total = Quantity::ZERO;
        for level in levels {
            notional = notional.checked_add(level.price.checked_mul(level.quantity)?)?;
            total = total.checked_add(level.quantity)?;
        }
        if total.is_zero() {
            return None;
        }
        notional.checked_div(total)
    }

    /// (bid volume - ask volume) / total volume, in [-1, 1]; zero for an empty snapshot
    pub fn imbalance(&self) -> Decimal {
        let bids = self.total_quantity(Side::Buy);
        let asks = self.total_quantity(Side::Sell);
        let (bids, asks) = match bids.checked_add(asks) {
            Some(_) => (bids, asks),
            // 两边各减半后比值不变
            None => (bids / Decimal::TWO, asks / Decimal::TWO),
        };
        let total = bids + asks;
        if total.is_zero() {
            return Decimal::ZERO;
        }
        (bids - asks) / total
    }
}
