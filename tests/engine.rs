use lob_engine::{
    BookConfig, EngineOutput, MatchingEngine, NewOrder, OrderBook, SelfTradePolicy,
    SharedOrderBook, Side,
};
use rust_decimal::Decimal;
use std::thread;

#[test]
fn test_engine_outputs_follow_command_order() {
    let book = OrderBook::new(BookConfig::new("ETH/USD"));
    let (sender, mut outputs, handle) = MatchingEngine::spawn(book).unwrap();

    // 多个生产者共享同一个命令队列
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let sender = sender.clone();
            thread::spawn(move || {
                for i in 0..100i64 {
                    let price = Decimal::from(1000 + (i + p) % 7);
                    let order = if (i + p) % 2 == 0 {
                        NewOrder::buy(price, Decimal::ONE)
                    } else {
                        NewOrder::sell(price, Decimal::ONE)
                    };
                    sender.submit(order).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    drop(sender);

    let (book, stats) = handle.join().unwrap();
    assert_eq!(stats.submitted, 400);
    assert_eq!(stats.rejected, 0);

    let mut last_order_id = 0;
    let mut count = 0;
    while let Ok(output) = outputs.try_recv() {
        match output {
            EngineOutput::Accepted { order_id, quote, .. } => {
                // 每条输出都携带撮合完成后的盘口，绝不交叉
                assert!(order_id > last_order_id);
                assert!(!quote.is_crossed());
                last_order_id = order_id;
            }
            other => panic!("unexpected output: {:?}", other),
        }
        count += 1;
    }
    assert_eq!(count, 400);
    assert!(!book.quote().is_crossed());
}

#[test]
fn test_engine_applies_self_trade_policy() {
    let config = BookConfig::new("ETH/USD").with_self_trade(SelfTradePolicy::CancelResting);
    let (sender, mut outputs, handle) = MatchingEngine::spawn(OrderBook::new(config)).unwrap();

    sender
        .submit(NewOrder::sell(Decimal::from(10), Decimal::ONE).with_owner(1))
        .unwrap();
    sender
        .submit(NewOrder::buy(Decimal::from(10), Decimal::ONE).with_owner(1))
        .unwrap();
    drop(sender);

    let (book, stats) = handle.join().unwrap();
    assert_eq!(stats.trades, 0);
    assert_eq!(book.best_bid(), Some(Decimal::from(10)));
    assert_eq!(book.best_ask(), None);

    let _ = outputs.try_recv().unwrap();
    match outputs.try_recv().unwrap() {
        EngineOutput::Accepted { cancelled, trades, .. } => {
            assert_eq!(cancelled.as_slice(), &[1]);
            assert!(trades.is_empty());
        }
        other => panic!("unexpected output: {:?}", other),
    }
}

#[test]
fn test_shared_book_serializes_producers() {
    let book = SharedOrderBook::new(BookConfig::new("SOL/USD"));

    let handles: Vec<_> = (0..8u64)
        .map(|p| {
            let book = book.clone();
            thread::spawn(move || {
                for i in 0..50u64 {
                    let side = if p % 2 == 0 { Side::Buy } else { Side::Sell };
                    book.submit(side, Decimal::from(20 + i % 3), Decimal::from(2))
                        .unwrap();
                    let quote = book.quote();
                    assert!(!quote.is_crossed());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // 买卖各提交 200 笔、每笔数量 2；成交会同时扣减双方
    let (bids, asks) = book.with_book(|b| (b.volume(Side::Buy), b.volume(Side::Sell)));
    assert_eq!(bids - asks, Decimal::ZERO);
}
