use crate::config::{BookConfig, SelfTradePolicy};
use crate::error::BookError;
use crate::protocol::{
    BookSnapshot, LevelSummary, NewOrder, OrderId, OwnerId, Price, Quantity, Quote, RestingOrder,
    Side, Submission, Trade, Trades,
};
use crate::validation::{OrderValidator, ValidationError};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

// 订单簿中的一个节点，代表一个挂单
#[derive(Clone, Debug)]
struct OrderNode {
    order_id: OrderId,
    owner: Option<OwnerId>,
    side: Side,
    price: Price,
    // 剩余数量，挂单期间始终大于0
    quantity: Quantity,
    // 指向同一个价格队列中的下一个订单；节点空闲时指向下一个空闲节点
    next: Option<usize>,
    // 指向同一个价格队列中的上一个订单
    prev: Option<usize>,
}

// 代表一个价格层级的所有订单，以双向链表形式存在，链表顺序即时间优先顺序
#[derive(Clone, Debug, Default)]
struct PriceLevel {
    head: Option<usize>,
    tail: Option<usize>,
    total_quantity: Quantity,
    order_count: usize,
}

/// Price-time priority order book for a single instrument.
///
/// Bids are kept in a `BTreeMap` walked from the highest price down, asks from
/// the lowest price up. Each price level is a FIFO linked list threaded
/// through a shared node pool, so cancelling by id is a map lookup plus an
/// O(1) unlink.
///
/// Every `submit` runs matching to completion before returning: once it
/// returns, the best bid is strictly below the best ask or one side is empty.
#[derive(Clone, Debug)]
pub struct OrderBook {
    config: BookConfig,
    validator: OrderValidator,
    // 买单侧，按价格从高到低撮合
    bids: BTreeMap<Price, PriceLevel>,
    // 卖单侧，按价格从低到高撮合
    asks: BTreeMap<Price, PriceLevel>,
    // 订单节点池，所有挂单都存放在这里
    orders: Vec<OrderNode>,
    // 从 order_id 到节点池索引的映射，用于撤单
    order_id_to_index: HashMap<OrderId, usize>,
    // 空闲节点链表的头指针，用于复用已删除的订单节点空间
    free_list_head: Option<usize>,
    // 订单ID和成交序号共用的单调递增计数器
    sequence: u64,
    // 每一方的挂单总量，准入检查保证其不会溢出
    bid_volume: Quantity,
    ask_volume: Quantity,
}

impl OrderBook {
    pub fn new(config: BookConfig) -> Self {
        Self::with_capacity(config, 0)
    }

    /// Creates a book whose node pool is pre-allocated for `capacity` resting orders
    pub fn with_capacity(config: BookConfig, capacity: usize) -> Self {
        let validator = OrderValidator::with_config(config.validation.clone());
        OrderBook {
            config,
            validator,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: Vec::with_capacity(capacity),
            order_id_to_index: HashMap::with_capacity(capacity),
            free_list_head: None,
            sequence: 0,
            bid_volume: Quantity::ZERO,
            ask_volume: Quantity::ZERO,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    /// Last number handed out by the sequence counter (0 before any admission)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Submits an anonymous limit order
    pub fn submit(
        &mut self,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Result<Submission, BookError> {
        self.submit_order(NewOrder::new(side, price, quantity))
    }

    /// Admits an order, matches it against the opposite side and rests any
    /// remainder.
    ///
    /// Trades are priced at the maker's price and returned in creation order.
    /// A rejected order leaves the book and the sequence counter untouched.
    pub fn submit_order(&mut self, order: NewOrder) -> Result<Submission, BookError> {
        if let Err(err) = self.admit(&order) {
            warn!(
                symbol = %self.config.symbol,
                side = %order.side,
                price = %order.price,
                quantity = %order.quantity,
                error = %err,
                "order rejected"
            );
            return Err(err.into());
        }

        let order_id = self.next_sequence();
        let mut remaining = order.quantity;
        let mut trades = Trades::new();
        let mut cancelled = SmallVec::new();

        while !remaining.is_zero() {
            let Some((level_price, maker_index)) = self.best_opposite(order.side) else {
                break; // 对手盘为空
            };
            if !order.side.crosses(order.price, level_price) {
                break; // 对手最优价不再交叉
            }

            let (maker_id, maker_owner, maker_quantity) = {
                let maker = &self.orders[maker_index];
                (maker.order_id, maker.owner, maker.quantity)
            };

            let self_match = matches!((order.owner, maker_owner), (Some(a), Some(b)) if a == b);
            if self_match {
                match self.config.self_trade {
                    SelfTradePolicy::Allow => {}
                    SelfTradePolicy::CancelResting => {
                        self.unlink(maker_index);
                        cancelled.push(maker_id);
                        debug!(
                            symbol = %self.config.symbol,
                            order_id = maker_id,
                            taker_order_id = order_id,
                            "resting order cancelled by self-trade prevention"
                        );
                        continue;
                    }
                    SelfTradePolicy::CancelIncoming => {
                        cancelled.push(order_id);
                        debug!(
                            symbol = %self.config.symbol,
                            order_id,
                            maker_order_id = maker_id,
                            dropped = %remaining,
                            "incoming order cancelled by self-trade prevention"
                        );
                        remaining = Quantity::ZERO;
                        break;
                    }
                }
            }

            let fill = remaining.min(maker_quantity);
            remaining -= fill;
            self.fill_resting(maker_index, fill);

            let trade = Trade {
                maker_order_id: maker_id,
                taker_order_id: order_id,
                taker_side: order.side,
                price: level_price,
                quantity: fill,
                sequence: self.next_sequence(),
            };
            debug!(
                symbol = %self.config.symbol,
                sequence = trade.sequence,
                maker_order_id = trade.maker_order_id,
                taker_order_id = trade.taker_order_id,
                price = %trade.price,
                quantity = %trade.quantity,
                "trade"
            );
            trades.push(trade);
        }

        // 如果新订单还有剩余数量，则将其添加到订单簿中
        if !remaining.is_zero() {
            self.insert_resting(order_id, &order, remaining);
            debug!(
                symbol = %self.config.symbol,
                order_id,
                side = %order.side,
                price = %order.price,
                quantity = %remaining,
                "order resting"
            );
        }

        Ok(Submission {
            order_id,
            trades,
            resting: remaining,
            cancelled,
        })
    }

    /// Removes a resting order. Returns `false` when the id is unknown or the
    /// order has already been filled or cancelled.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let Some(&node_index) = self.order_id_to_index.get(&order_id) else {
            debug!(symbol = %self.config.symbol, order_id, "cancel for unknown order");
            return false;
        };

        let removed = self.unlink(node_index);
        debug!(
            symbol = %self.config.symbol,
            order_id,
            side = %removed.side,
            price = %removed.price,
            quantity = %removed.quantity,
            "order cancelled"
        );
        true
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    pub fn quote(&self) -> Quote {
        Quote::new(self.best_bid(), self.best_ask())
    }

    pub fn spread(&self) -> Option<Price> {
        self.quote().spread()
    }

    pub fn mid_price(&self) -> Option<Price> {
        self.quote().mid_price()
    }

    /// Looks up a resting order by id
    pub fn order(&self, order_id: OrderId) -> Option<RestingOrder> {
        self.order_id_to_index
            .get(&order_id)
            .map(|&index| self.resting_order(index))
    }

    /// Number of resting orders on both sides
    pub fn len(&self) -> usize {
        self.order_id_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order_id_to_index.is_empty()
    }

    /// Total resting quantity on one side
    pub fn volume(&self, side: Side) -> Quantity {
        match side {
            Side::Buy => self.bid_volume,
            Side::Sell => self.ask_volume,
        }
    }

    pub fn level_count(&self, side: Side) -> usize {
        self.levels(side).len()
    }

    /// Aggregated price levels of one side, best price first
    pub fn depth(&self, side: Side, max_levels: usize) -> Vec<LevelSummary> {
        fn summarize<'a>(
            levels: impl Iterator<Item = (&'a Price, &'a PriceLevel)>,
            max_levels: usize,
        ) -> Vec<LevelSummary> {
            levels
                .take(max_levels)
                .map(|(price, level)| LevelSummary {
                    price: *price,
                    quantity: level.total_quantity,
                    orders: level.order_count,
                })
                .collect()
        }

        match side {
            Side::Buy => summarize(self.bids.iter().rev(), max_levels),
            Side::Sell => summarize(self.asks.iter(), max_levels),
        }
    }

    pub fn snapshot(&self, max_levels: usize) -> BookSnapshot {
        BookSnapshot {
            symbol: self.config.symbol.clone(),
            sequence: self.sequence,
            bids: self.depth(Side::Buy, max_levels),
            asks: self.depth(Side::Sell, max_levels),
        }
    }

    /// Resting orders of one side in matching priority (price, then time)
    pub fn resting_orders(&self, side: Side) -> Vec<RestingOrder> {
        let levels: Box<dyn Iterator<Item = &PriceLevel> + '_> = match side {
            Side::Buy => Box::new(self.bids.values().rev()),
            Side::Sell => Box::new(self.asks.values()),
        };

        let mut out = Vec::new();
        for level in levels {
            let mut current = level.head;
            while let Some(index) = current {
                out.push(self.resting_order(index));
                current = self.orders[index].next;
            }
        }
        out
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn levels(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    // 对手盘最优价格及其队首订单
    fn best_opposite(&self, side: Side) -> Option<(Price, usize)> {
        let best = match side {
            Side::Buy => self.asks.iter().next(),
            Side::Sell => self.bids.iter().next_back(),
        };
        best.and_then(|(price, level)| level.head.map(|head| (*price, head)))
    }

    fn resting_order(&self, index: usize) -> RestingOrder {
        let node = &self.orders[index];
        RestingOrder {
            order_id: node.order_id,
            side: node.side,
            price: node.price,
            quantity: node.quantity,
            owner: node.owner,
        }
    }

    // 校验订单；挂单剩余量不超过订单数量，按整单数量检查本方总量是否溢出
    fn admit(&self, order: &NewOrder) -> Result<(), ValidationError> {
        self.validator.validate(order)?;
        if self.volume(order.side).checked_add(order.quantity).is_none() {
            return Err(ValidationError::VolumeOverflow {
                side: order.side,
                quantity: order.quantity,
            });
        }
        Ok(())
    }

    fn volume_mut(&mut self, side: Side) -> &mut Quantity {
        match side {
            Side::Buy => &mut self.bid_volume,
            Side::Sell => &mut self.ask_volume,
        }
    }

    // 扣减挂单数量，完全成交则移出订单簿
    fn fill_resting(&mut self, node_index: usize, fill: Quantity) {
        let (side, price, remaining) = {
            let node = &mut self.orders[node_index];
            node.quantity -= fill;
            (node.side, node.price, node.quantity)
        };

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&price) {
            level.total_quantity -= fill;
        }
        *self.volume_mut(side) -= fill;

        if remaining.is_zero() {
            self.unlink(node_index);
        }
    }

    // 将剩余数量挂到本方价格队列的尾部
    fn insert_resting(&mut self, order_id: OrderId, order: &NewOrder, quantity: Quantity) {
        let node = OrderNode {
            order_id,
            owner: order.owner,
            side: order.side,
            price: order.price,
            quantity,
            next: None,
            prev: None,
        };

        // 分配节点索引，优先从 free list 中获取
        let node_index = if let Some(free_index) = self.free_list_head {
            self.free_list_head = self.orders[free_index].next;
            self.orders[free_index] = node;
            free_index
        } else {
            self.orders.push(node);
            self.orders.len() - 1
        };

        self.order_id_to_index.insert(order_id, node_index);

        let levels = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level = levels.entry(order.price).or_default();

        if let Some(tail_index) = level.tail {
            self.orders[tail_index].next = Some(node_index);
            self.orders[node_index].prev = Some(tail_index);
            level.tail = Some(node_index);
        } else {
            // 队列为空
            level.head = Some(node_index);
            level.tail = Some(node_index);
        }
        level.total_quantity = level.total_quantity.saturating_add(quantity);
        level.order_count += 1;

        let volume = self.volume_mut(order.side);
        *volume = volume.saturating_add(quantity);
    }

    // 从价格队列中摘除一个节点，并把节点归还到 free list
    fn unlink(&mut self, node_index: usize) -> RestingOrder {
        let removed = self.resting_order(node_index);
        let (prev, next) = {
            let node = &self.orders[node_index];
            (node.prev, node.next)
        };

        self.order_id_to_index.remove(&removed.order_id);

        let levels = match removed.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };

        if let Some(prev_index) = prev {
            self.orders[prev_index].next = next;
        } else if let Some(level) = levels.get_mut(&removed.price) {
            // 节点是头节点
            level.head = next;
        }

        if let Some(next_index) = next {
            self.orders[next_index].prev = prev;
        } else if let Some(level) = levels.get_mut(&removed.price) {
            // 节点是尾节点
            level.tail = prev;
        }

        if let Some(level) = levels.get_mut(&removed.price) {
            level.total_quantity -= removed.quantity;
            level.order_count -= 1;
            // 价格队列为空，移除该价格层级
            if level.head.is_none() {
                levels.remove(&removed.price);
            }
        }
        *self.volume_mut(removed.side) -= removed.quantity;

        let node = &mut self.orders[node_index];
        node.prev = None;
        node.next = self.free_list_head;
        self.free_list_head = Some(node_index);

        removed
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new(BookConfig::default())
    }
}
