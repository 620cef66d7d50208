//! Solidity ABI bindings for the contracts the pipeline talks to directly.
//!
//! Everything else (the methods governance scripts actually call) comes in through JSON ABIs at
//! runtime; these are the fixed surfaces for ownership, metadata lookups and wrapping.

use alloy_sol_types::sol;

sol! {
    interface IProtocolOwnable {
        function owner() external view returns (address);
    }

    interface IMarketRegistry {
        function getNumMarkets() external view returns (uint256);
        function getMarketTokenAddress(uint256 marketId) external view returns (address);
    }

    interface IERC20Metadata {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }

    interface IChainlinkAggregator {
        function description() external view returns (string);
    }

    interface IDelayedMultiSig {
        function submitTransaction(address destination, uint256 value, bytes data)
            external
            returns (uint256 transactionId);
    }

    interface IOwnerAdapterV1 {
        function submitTransaction(address destination, bytes data)
            external
            returns (uint256 transactionId);
    }

    interface IOwnerAdapterV2 {
        function submitTransaction(address destination, bytes data)
            external
            returns (uint256 transactionId);
    }
}
