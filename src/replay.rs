//! Order Feed Replay
//!
//! Reads a CSV order feed and turns each row into an `EngineCommand`, and
//! writes engine outputs back out as JSON lines.
//!
//! ## Feed format
//! ```text
//! type,price,quantity,order_id,owner
//! sell,101.5,10,,
//! buy,101.5,4,,7
//! cancel,,,1,
//! ```
//! - `type` is `buy`, `sell` or `cancel`, case-insensitive
//! - rows with any other type are skipped with a warning
//! - missing price or quantity on an order row is read as 0, which the book rejects
//! - a cancel row without `order_id` is skipped

use crate::engine::{CommandSender, EngineCommand, EngineOutput};
use crate::error::EngineError;
use crate::protocol::{BookSnapshot, NewOrder, OrderId, OwnerId, Price, Quantity, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Replay errors
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("row {row}: invalid {field} {value:?}")]
    InvalidField {
        row: u64,
        field: &'static str,
        value: String,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

// CSV 中的一行，所有字段先按字符串读取，再逐个解析以便报告行号
#[derive(Debug, Deserialize)]
struct FeedRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    quantity: Option<String>,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    owner: Option<String>,
}

/// Counters for one replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Rows turned into engine commands
    pub commands: u64,
    /// Rows ignored (unknown type, cancel without id)
    pub skipped: u64,
}

/// Streaming reader over a CSV order feed
pub struct FeedReader<R: Read> {
    records: csv::DeserializeRecordsIntoIter<R, FeedRecord>,
    row: u64,
    skipped: u64,
}

impl<R: Read> FeedReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            records: reader.into_deserialize(),
            row: 0,
            skipped: 0,
        }
    }

    /// Number of rows skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn parse_record(&mut self, record: FeedRecord) -> Result<Option<EngineCommand>, ReplayError> {
        let row = self.row;
        let kind = record.kind.to_ascii_lowercase();

        let side = match kind.as_str() {
            "buy" => Side::Buy,
            "sell" => Side::Sell,
            "cancel" => {
                return match parse_optional::<OrderId>(row, "order_id", record.order_id)? {
                    Some(order_id) => Ok(Some(EngineCommand::Cancel(order_id))),
                    None => {
                        warn!(row, "cancel row without order_id, skipping");
                        self.skipped += 1;
                        Ok(None)
                    }
                };
            }
            _ => {
                warn!(row, kind = %record.kind, "unknown order type, skipping");
                self.skipped += 1;
                return Ok(None);
            }
        };

        let price = parse_optional::<Price>(row, "price", record.price)?.unwrap_or_default();
        let quantity =
            parse_optional::<Quantity>(row, "quantity", record.quantity)?.unwrap_or_default();
        let mut order = NewOrder::new(side, price, quantity);
        if let Some(owner) = parse_optional::<OwnerId>(row, "owner", record.owner)? {
            order = order.with_owner(owner);
        }

        Ok(Some(EngineCommand::Submit(order)))
    }
}

impl<R: Read> Iterator for FeedReader<R> {
    type Item = Result<EngineCommand, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = self.records.next()?;
            self.row += 1;
            let parsed = record
                .map_err(ReplayError::from)
                .and_then(|record| self.parse_record(record));

            match parsed {
                Ok(Some(command)) => return Some(Ok(command)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

// 空字段视为缺失
fn parse_optional<T: FromStr>(
    row: u64,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ReplayError> {
    match value {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ReplayError::InvalidField { row, field, value }),
    }
}

/// Sends every command of a feed to the engine, in file order
pub fn feed<R: Read>(source: R, sender: &CommandSender) -> Result<ReplaySummary, ReplayError> {
    let mut reader = FeedReader::new(source);
    let mut summary = ReplaySummary::default();

    for command in reader.by_ref() {
        sender.send(command?)?;
        summary.commands += 1;
    }
    summary.skipped = reader.skipped();

    debug!(commands = summary.commands, skipped = summary.skipped, "feed exhausted");
    Ok(summary)
}

#[derive(Serialize)]
struct SnapshotLine<'a> {
    event: &'static str,
    imbalance: Decimal,
    #[serde(flatten)]
    snapshot: &'a BookSnapshot,
}

/// Writes engine outputs as one JSON object per line
pub struct OutputWriter<W: Write> {
    writer: W,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_output(&mut self, output: &EngineOutput) -> Result<(), ReplayError> {
        serde_json::to_writer(&mut self.writer, output)?;
        writeln!(self.writer)?;
        Ok(())
    }

    /// Final depth snapshot with its volume imbalance, tagged `"event":"snapshot"`
    pub fn write_snapshot(&mut self, snapshot: &BookSnapshot) -> Result<(), ReplayError> {
        let line = SnapshotLine {
            event: "snapshot",
            imbalance: snapshot.imbalance(),
            snapshot,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ReplayError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
