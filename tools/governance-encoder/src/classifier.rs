//! Name-based semantic classification of ABI parameters.
//!
//! This is a heuristic over parameter naming conventions, not a schema: a parameter called
//! `tokenId` is classified as a token just like `outputToken`.

use alloy_json_abi::Param;

/// Which annotation rule applies to a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticKind {
    MarketId,
    Token,
    PriceFeed,
    MaxWeiAmount,
    Plain,
}

const MAX_WEI_NAMES: [&str; 3] = ["maxWei", "maxSupplyWei", "maxBorrowWei"];

/// Classify a parameter by its declared name.
pub fn classify(param: &Param) -> SemanticKind {
    classify_name(&param.name)
}

pub fn classify_name(name: &str) -> SemanticKind {
    if name.contains("marketId") || name.contains("MarketId") {
        SemanticKind::MarketId
    } else if (name.contains("token") || name.contains("Token")) && !name.contains("decimals") {
        SemanticKind::Token
    } else if name.contains("chainlinkAggregator") {
        SemanticKind::PriceFeed
    } else if MAX_WEI_NAMES.iter().any(|n| name.contains(n)) {
        SemanticKind::MaxWeiAmount
    } else {
        SemanticKind::Plain
    }
}
