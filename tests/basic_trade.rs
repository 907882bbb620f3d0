use lob_engine::{BookConfig, BookError, OrderBook, Side};
use rust_decimal::Decimal;

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn new_book() -> OrderBook {
    OrderBook::new(BookConfig::new("BTC/USD"))
}

#[test]
fn test_basic_match() {
    let mut book = new_book();

    // 1. 挂一个卖单
    let sell = book.submit(Side::Sell, dec(100), dec(10)).unwrap();
    assert!(sell.trades.is_empty());

    // 2. 同价买单完全成交
    let buy = book.submit(Side::Buy, dec(100), dec(10)).unwrap();
    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].price, dec(100));
    assert_eq!(buy.trades[0].quantity, dec(10));
    assert_eq!(buy.trades[0].maker_order_id, sell.order_id);
    assert_eq!(buy.trades[0].taker_order_id, buy.order_id);

    // 3. 双方均为空
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), None);
    assert!(book.is_empty());
}

#[test]
fn test_best_price_matched_before_earlier_worse_price() {
    let mut book = new_book();
    book.submit(Side::Sell, dec(101), dec(5)).unwrap();
    book.submit(Side::Sell, dec(100), dec(5)).unwrap();

    let buy = book.submit(Side::Buy, dec(101), dec(10)).unwrap();
    let fills: Vec<_> = buy.trades.iter().map(|t| (t.price, t.quantity)).collect();
    assert_eq!(fills, vec![(dec(100), dec(5)), (dec(101), dec(5))]);
    assert!(book.is_empty());
}

#[test]
fn test_earlier_order_at_same_price_matched_first() {
    let mut book = new_book();
    let first = book.submit(Side::Buy, dec(50), dec(3)).unwrap();
    let second = book.submit(Side::Buy, dec(50), dec(4)).unwrap();

    let sell = book.submit(Side::Sell, dec(50), dec(5)).unwrap();
    assert_eq!(sell.trades.len(), 2);
    assert_eq!(sell.trades[0].maker_order_id, first.order_id);
    assert_eq!(sell.trades[0].quantity, dec(3));
    assert_eq!(sell.trades[1].maker_order_id, second.order_id);
    assert_eq!(sell.trades[1].quantity, dec(2));
    assert_eq!(sell.filled_quantity(), dec(5));

    let resting = book.resting_orders(Side::Buy);
    assert_eq!(resting.len(), 1);
    assert_eq!(resting[0].order_id, second.order_id);
    assert_eq!(resting[0].quantity, dec(2));
    assert!(book.resting_orders(Side::Sell).is_empty());
}

#[test]
fn test_cancel_of_filled_order_is_not_found() {
    let mut book = new_book();
    let sell = book.submit(Side::Sell, dec(100), dec(10)).unwrap();
    book.submit(Side::Buy, dec(100), dec(10)).unwrap();
    book.submit(Side::Buy, dec(99), dec(1)).unwrap();

    let before = book.snapshot(10);
    assert!(!book.cancel(sell.order_id));
    assert_eq!(book.snapshot(10), before);
}

#[test]
fn test_invalid_orders_rejected_without_side_effects() {
    let mut book = new_book();
    book.submit(Side::Sell, dec(100), dec(1)).unwrap();
    let before = book.snapshot(10);

    let negative_price = book.submit(Side::Buy, dec(-5), dec(1));
    assert!(matches!(negative_price, Err(BookError::InvalidOrder(_))));

    let zero_quantity = book.submit(Side::Buy, dec(100), Decimal::ZERO);
    assert!(matches!(zero_quantity, Err(BookError::InvalidOrder(_))));

    assert_eq!(book.snapshot(10), before);
}

#[test]
fn test_trade_sequences_increase_across_submissions() {
    let mut book = new_book();
    book.submit(Side::Sell, dec(100), dec(1)).unwrap();
    book.submit(Side::Sell, dec(100), dec(1)).unwrap();

    let first = book.submit(Side::Buy, dec(100), dec(1)).unwrap();
    let second = book.submit(Side::Buy, dec(100), dec(1)).unwrap();
    assert!(first.trades[0].sequence < second.order_id);
    assert!(second.order_id < second.trades[0].sequence);
}
