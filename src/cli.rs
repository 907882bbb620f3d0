//! CLI Interface Module
//!
//! Command-line entry point of the `lob-engine` binary: replays a CSV order
//! feed through a `MatchingEngine` and prints every engine output as a JSON
//! line on stdout. Logs go to stderr.
//!
//! ## Responsibilities
//! - Parse command-line arguments into a `BookConfig`
//! - Initialize logging
//! - Run the engine over the feed and write the final book snapshot

use crate::config::{BookConfig, SelfTradePolicy};
use crate::engine::{EngineStats, MatchingEngine};
use crate::error::EngineError;
use crate::orderbook::OrderBook;
use crate::replay::{self, OutputWriter, ReplayError, ReplaySummary};
use crate::validation::ValidationConfig;
use clap::Parser;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("failed to open input {path}: {source}")]
    Input {
        path: PathBuf,
        source: io::Error,
    },

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 撮合引擎命令行配置
#[derive(Parser, Debug, Clone)]
#[command(name = "lob-engine")]
#[command(version)]
#[command(about = "限价订单簿撮合引擎 - 回放CSV订单流", long_about = None)]
pub struct CliConfig {
    /// 订单流CSV文件，缺省时从标准输入读取
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// 合约代码
    #[arg(short, long, default_value = "DEFAULT")]
    pub symbol: String,

    /// 最小价格变动单位
    #[arg(long)]
    pub tick_size: Option<Decimal>,

    /// 最低允许价格
    #[arg(long)]
    pub min_price: Option<Decimal>,

    /// 最高允许价格
    #[arg(long)]
    pub max_price: Option<Decimal>,

    /// 单笔最大数量
    #[arg(long)]
    pub max_quantity: Option<Decimal>,

    /// 自成交处理策略
    #[arg(long, default_value = "allow", value_parser = ["allow", "cancel-resting", "cancel-incoming"])]
    pub self_trade: String,

    /// 最终快照输出的档位数
    #[arg(short, long, default_value_t = 10)]
    pub depth: usize,

    /// 日志级别
    #[arg(short = 'l', long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    /// 仅显示配置不回放（用于调试）
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl CliConfig {
    pub fn self_trade_policy(&self) -> SelfTradePolicy {
        match self.self_trade.as_str() {
            "cancel-resting" => SelfTradePolicy::CancelResting,
            "cancel-incoming" => SelfTradePolicy::CancelIncoming,
            _ => SelfTradePolicy::Allow,
        }
    }

    pub fn book_config(&self) -> BookConfig {
        BookConfig::new(self.symbol.clone())
            .with_validation(ValidationConfig {
                min_price: self.min_price,
                max_price: self.max_price,
                max_quantity: self.max_quantity,
                tick_size: self.tick_size,
            })
            .with_self_trade(self.self_trade_policy())
    }

    fn open_input(&self) -> Result<Box<dyn Read + Send>, CliError> {
        match &self.input {
            Some(path) => {
                let file = File::open(path).map_err(|source| CliError::Input {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
            None => Ok(Box::new(io::stdin())),
        }
    }
}

/// Outcome of one replay run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    pub summary: ReplaySummary,
    pub stats: EngineStats,
}

/// Runs the CLI application
pub async fn run() -> Result<(), CliError> {
    // 解析命令行参数
    let config = CliConfig::parse();

    // 初始化日志系统
    init_logging(&config.log_level);

    info!(?config, "lob-engine starting");

    if config.dry_run {
        let book_config = config.book_config();
        println!("{}", serde_json::to_string_pretty(&book_config)?);
        return Ok(());
    }

    let source = config.open_input()?;
    let stdout = BufWriter::new(io::stdout());
    replay_feed(&config, source, stdout).await?;
    Ok(())
}

/// Replays `source` through a fresh engine and writes JSON lines to `sink`
pub async fn replay_feed<R, W>(
    config: &CliConfig,
    source: R,
    sink: W,
) -> Result<ReplayReport, CliError>
where
    R: Read + Send + 'static,
    W: Write,
{
    let book = OrderBook::new(config.book_config());
    let (sender, mut outputs, handle) = MatchingEngine::spawn(book)?;

    // 读取订单流的阻塞任务结束时会释放发送端，引擎随之退出
    let feeder = tokio::task::spawn_blocking(move || replay::feed(source, &sender));

    let mut writer = OutputWriter::new(sink);
    while let Some(output) = outputs.recv().await {
        writer.write_output(&output)?;
    }

    let summary = feeder.await??;
    let (book, stats) = tokio::task::spawn_blocking(move || handle.join()).await??;

    writer.write_snapshot(&book.snapshot(config.depth))?;
    writer.flush()?;

    info!(
        symbol = %book.symbol(),
        commands = summary.commands,
        skipped = summary.skipped,
        submitted = stats.submitted,
        rejected = stats.rejected,
        trades = stats.trades,
        cancels = stats.cancels,
        resting = book.len(),
        "replay finished"
    );

    Ok(ReplayReport { summary, stats })
}

/// 初始化日志系统，输出到stderr以保持stdout只有JSON
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_default() {
        // 测试默认配置
        let config = CliConfig::parse_from(["lob-engine"]);
        assert!(config.input.is_none());
        assert_eq!(config.symbol, "DEFAULT");
        assert_eq!(config.self_trade_policy(), SelfTradePolicy::Allow);
        assert_eq!(config.depth, 10);
        assert_eq!(config.log_level, "info");
        assert!(!config.dry_run);
        assert_eq!(config.book_config().validation, ValidationConfig::default());
    }

    #[test]
    fn test_cli_config_custom() {
        // 测试自定义配置
        let config = CliConfig::parse_from([
            "lob-engine",
            "--input", "orders.csv",
            "--symbol", "BTC/USD",
            "--tick-size", "0.5",
            "--min-price", "1",
            "--max-price", "100000",
            "--max-quantity", "1000",
            "--self-trade", "cancel-resting",
            "--depth", "3",
            "--log-level", "debug",
            "--dry-run",
        ]);

        assert_eq!(config.input, Some(PathBuf::from("orders.csv")));
        assert_eq!(config.depth, 3);
        assert!(config.dry_run);

        let book_config = config.book_config();
        assert_eq!(book_config.symbol, "BTC/USD");
        assert_eq!(book_config.self_trade, SelfTradePolicy::CancelResting);
        assert_eq!(book_config.validation.tick_size, Some(Decimal::new(5, 1)));
        assert_eq!(book_config.validation.max_quantity, Some(Decimal::from(1000)));
    }

    #[test]
    fn test_cli_config_short_flags() {
        // 测试短参数
        let config = CliConfig::parse_from(["lob-engine", "-s", "ETH/USD", "-d", "5", "-l", "warn"]);
        assert_eq!(config.symbol, "ETH/USD");
        assert_eq!(config.depth, 5);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_cli_rejects_unknown_policy() {
        let result = CliConfig::try_parse_from(["lob-engine", "--self-trade", "sometimes"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_replay_feed_writes_outputs_and_snapshot() {
        let config = CliConfig::parse_from(["lob-engine", "--depth", "5"]);
        let feed = "type,price,quantity,order_id,owner\n\
                    sell,101,10,,\n\
                    buy,101,4,,\n\
                    buy,-5,1,,\n\
                    cancel,,,1,\n\
                    cancel,,,1,\n\
                    hold,,,,\n";

        let mut out = Vec::new();
        let report = replay_feed(&config, feed.as_bytes(), &mut out)
            .await
            .unwrap();

        assert_eq!(report.summary.commands, 5);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.stats.submitted, 2);
        assert_eq!(report.stats.rejected, 1);
        assert_eq!(report.stats.trades, 1);
        assert_eq!(report.stats.cancels, 1);

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1]["trades"][0]["price"], "101");
        assert_eq!(lines[2]["event"], "rejected");
        assert_eq!(lines[3]["removed"], true);
        assert_eq!(lines[4]["removed"], false);
        assert_eq!(lines[5]["event"], "snapshot");
        assert_eq!(lines[5]["bids"].as_array().unwrap().len(), 0);
        assert_eq!(lines[5]["asks"].as_array().unwrap().len(), 0);
    }
}
