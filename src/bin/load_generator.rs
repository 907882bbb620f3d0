use lob_engine::cli;
use lob_engine::{BookConfig, OrderBook, Side};
use rand::Rng;
use rust_decimal::Decimal;
use std::time::{Duration, Instant};
use tracing::info;

// --- 配置 ---
const TEST_DURATION: Duration = Duration::from_secs(10); // 测试持续时间
const MID_PRICE: i64 = 50_000;
const PRICE_BAND: i64 = 10; // 围绕中间价上下浮动的tick数
const CANCEL_EVERY: u64 = 8; // 每隔多少笔订单撤掉最早的一笔挂单

fn main() {
    cli::init_logging("info");

    info!(duration = ?TEST_DURATION, mid_price = MID_PRICE, "启动吞吐量测试");

    let mut book = OrderBook::with_capacity(BookConfig::new("BTC/USD"), 1 << 16);
    let mut rng = rand::thread_rng();
    let mut resting_ids = std::collections::VecDeque::new();

    let mut orders: u64 = 0;
    let mut trades: u64 = 0;
    let mut cancels: u64 = 0;

    let start = Instant::now();
    while start.elapsed() < TEST_DURATION {
        // 每批1024笔订单检查一次时间，避免频繁调用 Instant::now
        for _ in 0..1024 {
            let side = if rng.gen::<bool>() { Side::Buy } else { Side::Sell };
            let price = match side {
                Side::Buy => rng.gen_range(MID_PRICE - PRICE_BAND..=MID_PRICE),
                Side::Sell => rng.gen_range(MID_PRICE..=MID_PRICE + PRICE_BAND),
            };
            let quantity = rng.gen_range(1..=5i64);

            match book.submit(side, Decimal::from(price), Decimal::from(quantity)) {
                Ok(submission) => {
                    orders += 1;
                    trades += submission.trades.len() as u64;
                    if submission.is_resting() {
                        resting_ids.push_back(submission.order_id);
                    }
                }
                Err(err) => tracing::warn!(error = %err, "order rejected"),
            }

            if orders % CANCEL_EVERY == 0 {
                // 已成交的挂单撤单返回 false，直接跳过
                while let Some(order_id) = resting_ids.pop_front() {
                    if book.cancel(order_id) {
                        cancels += 1;
                        break;
                    }
                }
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        orders,
        trades,
        cancels,
        orders_per_sec = (orders as f64 / elapsed).round(),
        trades_per_sec = (trades as f64 / elapsed).round(),
        resting = book.len(),
        bid_levels = book.level_count(Side::Buy),
        ask_levels = book.level_count(Side::Sell),
        imbalance = %book.snapshot(5).imbalance(),
        "测试结果"
    );
}
