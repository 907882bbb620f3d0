//! Per-instrument order book configuration

use crate::validation::ValidationConfig;
use serde::{Deserialize, Serialize};

/// What to do when an incoming order would trade against a resting order
/// from the same owner.
///
/// Orders without an owner never count as a self-match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelfTradePolicy {
    /// Owners are ignored and the orders trade normally
    #[default]
    Allow,
    /// Remove the resting order and keep matching
    CancelResting,
    /// Stop matching and drop the incoming remainder
    CancelIncoming,
}

/// 单个合约的订单簿配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookConfig {
    /// 合约代码，仅用于日志和快照
    pub symbol: String,
    pub validation: ValidationConfig,
    pub self_trade: SelfTradePolicy,
}

impl BookConfig {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            validation: ValidationConfig::default(),
            self_trade: SelfTradePolicy::default(),
        }
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_self_trade(mut self, policy: SelfTradePolicy) -> Self {
        self.self_trade = policy;
        self
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self::new("DEFAULT")
    }
}
