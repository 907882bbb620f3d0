use crate::error::EngineError;
use crate::protocol::{NewOrder, OrderId, Quantity, Quote, Trades};
use crate::traits::OrderMatching;
use serde::Serialize;
use smallvec::SmallVec;
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

// 定义引擎可以接收的命令
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Submit(NewOrder),
    Cancel(OrderId),
}

/// 引擎的输出结果，与命令一一对应并按命令顺序发出
///
/// Every variant carries the top of book observed right after the command was
/// applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineOutput {
    Accepted {
        order_id: OrderId,
        trades: Trades,
        resting: Quantity,
        #[serde(skip_serializing_if = "SmallVec::is_empty")]
        cancelled: SmallVec<[OrderId; 4]>,
        quote: Quote,
    },
    Rejected {
        reason: String,
    },
    Cancelled {
        order_id: OrderId,
        removed: bool,
        quote: Quote,
    },
}

/// 引擎运行期间的累计统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// 被受理的订单数
    pub submitted: u64,
    pub rejected: u64,
    pub trades: u64,
    /// 实际撤掉的订单数，不含未命中的撤单
    pub cancels: u64,
}

/// Producer side of the engine's command queue. Clone it freely; the worker
/// stops once every clone is dropped.
#[derive(Debug, Clone)]
pub struct CommandSender {
    inner: UnboundedSender<EngineCommand>,
}

impl CommandSender {
    pub fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.inner.send(command).map_err(|_| EngineError::Closed)
    }

    pub fn submit(&self, order: NewOrder) -> Result<(), EngineError> {
        self.send(EngineCommand::Submit(order))
    }

    pub fn cancel(&self, order_id: OrderId) -> Result<(), EngineError> {
        self.send(EngineCommand::Cancel(order_id))
    }
}

/// Join handle of the worker thread
#[derive(Debug)]
pub struct EngineHandle<B> {
    join: thread::JoinHandle<(B, EngineStats)>,
}

impl<B> EngineHandle<B> {
    /// Blocks until the worker exits and hands the book back
    pub fn join(self) -> Result<(B, EngineStats), EngineError> {
        self.join.join().map_err(|_| EngineError::WorkerPanicked)
    }
}

// 撮合引擎：单消费者独占订单簿，命令严格按入队顺序处理
pub struct MatchingEngine<B> {
    book: B,
    command_receiver: UnboundedReceiver<EngineCommand>,
    output_sender: UnboundedSender<EngineOutput>,
    stats: EngineStats,
    output_closed: bool,
}

impl<B: OrderMatching> MatchingEngine<B> {
    pub fn new(
        book: B,
        command_receiver: UnboundedReceiver<EngineCommand>,
        output_sender: UnboundedSender<EngineOutput>,
    ) -> Self {
        MatchingEngine {
            book,
            command_receiver,
            output_sender,
            stats: EngineStats::default(),
            output_closed: false,
        }
    }

    /// Starts the engine on a dedicated `matching-engine` thread
    pub fn spawn(
        book: B,
    ) -> Result<(CommandSender, UnboundedReceiver<EngineOutput>, EngineHandle<B>), EngineError>
    where
        B: Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let engine = MatchingEngine::new(book, command_rx, output_tx);

        let join = thread::Builder::new()
            .name("matching-engine".to_string())
            .spawn(move || engine.run())?;

        Ok((
            CommandSender { inner: command_tx },
            output_rx,
            EngineHandle { join },
        ))
    }

    // 引擎的主事件循环，所有发送端关闭后退出
    pub fn run(mut self) -> (B, EngineStats) {
        info!("matching engine started");
        while let Some(command) = self.command_receiver.blocking_recv() {
            let output = self.process(command);
            if self.output_sender.send(output).is_err() && !self.output_closed {
                // 输出端已关闭，继续处理命令以保持订单簿状态一致
                warn!("output channel closed, engine outputs are being dropped");
                self.output_closed = true;
            }
        }
        info!(
            submitted = self.stats.submitted,
            rejected = self.stats.rejected,
            trades = self.stats.trades,
            cancels = self.stats.cancels,
            "matching engine stopped"
        );
        (self.book, self.stats)
    }

    /// Applies one command to the book
    pub fn process(&mut self, command: EngineCommand) -> EngineOutput {
        match command {
            EngineCommand::Submit(order) => match self.book.submit_order(order) {
                Ok(submission) => {
                    self.stats.submitted += 1;
                    self.stats.trades += submission.trades.len() as u64;
                    EngineOutput::Accepted {
                        order_id: submission.order_id,
                        trades: submission.trades,
                        resting: submission.resting,
                        cancelled: submission.cancelled,
                        quote: self.book.quote(),
                    }
                }
                Err(err) => {
                    self.stats.rejected += 1;
                    EngineOutput::Rejected {
                        reason: err.to_string(),
                    }
                }
            },
            EngineCommand::Cancel(order_id) => {
                let removed = self.book.cancel(order_id);
                if removed {
                    self.stats.cancels += 1;
                }
                EngineOutput::Cancelled {
                    order_id,
                    removed,
                    quote: self.book.quote(),
                }
            }
        }
    }

    pub fn book(&self) -> &B {
        &self.book
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}
