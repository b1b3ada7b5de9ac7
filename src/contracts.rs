//! Solidity interfaces for every contract the bot calls.
//!
//! Calls are encoded with `SolCall::abi_encode` and decoded with
//! `abi_decode_returns`; there are no generated contract instances.

use alloy_sol_types::sol;

// ============================================
// INDEX
// ============================================

sol! {
    /// Basket-backed index token
    #[derive(Debug)]
    interface IIndexToken {
        function anatomy() external view returns (address[] memory _assets, uint8[] memory _weights);
        function inactiveAnatomy() external view returns (address[] memory);
        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Valuation helper for NAV
    #[derive(Debug)]
    interface IIndexHelper {
        function totalEvaluation(address _index)
            external
            view
            returns (uint256 _totalEvaluation, uint256 _indexPriceInBase);
    }

    /// Index router: mint with native value, burn into native
    #[derive(Debug)]
    interface IIndexRouter {
        struct MintQuoteParams {
            address asset;
            address swapTarget;
            uint256 buyAssetMinAmount;
            bytes assetQuote;
        }

        struct MintSwapValueParams {
            address index;
            address inputToken;
            uint256 amountInInputToken;
            address recipient;
            MintQuoteParams[] quotes;
        }

        struct BurnQuoteParams {
            address swapTarget;
            uint256 buyAssetMinAmount;
            bytes assetQuote;
        }

        struct BurnSwapParams {
            address index;
            uint256 amount;
            address outputAsset;
            address recipient;
            BurnQuoteParams[] quotes;
        }

        function mintSwapValue(MintSwapValueParams calldata _params) external payable returns (uint256);
        function burnSwapValue(BurnSwapParams calldata _params) external returns (uint256);
        function burnTokensAmount(address _index, uint256 _amount) external view returns (uint256[] memory);
    }
}

// ============================================
// TOKENS
// ============================================

sol! {
    /// Wrapped native asset (WETH / WAVAX)
    #[derive(Debug)]
    interface IWrappedNative {
        function deposit() external payable;
        function withdraw(uint256 amount) external;
        function balanceOf(address account) external view returns (uint256);
    }
}

// ============================================
// POOLS
// ============================================

sol! {
    /// Constant-product pair (Trader Joe V1 / Uniswap V2 layout)
    #[derive(Debug)]
    interface IConstantProductPair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
    }

    /// Liquidity-book pair (Trader Joe V2.1)
    #[derive(Debug)]
    interface ILBPair {
        function getTokenX() external view returns (address tokenX);
        function getActiveId() external view returns (uint24 activeId);
        function getBinStep() external view returns (uint16);
        function getPriceFromId(uint24 id) external view returns (uint256 price);
        function getBin(uint24 id) external view returns (uint128 binReserveX, uint128 binReserveY);
        function getNextNonEmptyBin(bool swapForY, uint24 id) external view returns (uint24 nextId);
        function getSwapIn(uint128 amountOut, bool swapForY)
            external
            view
            returns (uint128 amountIn, uint128 amountOutLeft, uint128 fee);
    }

    /// Concentrated-liquidity pool (Uniswap V3)
    #[derive(Debug)]
    interface IConcentratedPool {
        function slot0() external view returns (
            uint160 sqrtPriceX96, int24 tick, uint16 observationIndex,
            uint16 observationCardinality, uint16 observationCardinalityNext,
            uint8 feeProtocol, bool unlocked
        );
        function liquidity() external view returns (uint128);
        function token0() external view returns (address);
        function fee() external view returns (uint24);
    }
}

// ============================================
// ROUTERS & QUOTER
// ============================================

sol! {
    /// Uniswap V3 SwapRouter
    #[derive(Debug)]
    interface IUniswapSwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params)
            external
            payable
            returns (uint256 amountOut);
    }

    /// Uniswap V3 QuoterV2
    #[derive(Debug)]
    interface IQuoterV2 {
        struct QuoteExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amount;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactOutputSingle(QuoteExactOutputSingleParams memory params)
            external
            returns (
                uint256 amountIn,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );
    }

    /// Trader Joe LB router (V2.1); `versions` 0 = V1 pair, 2 = V2.1 pair
    #[derive(Debug)]
    interface ILBRouter {
        struct Path {
            uint256[] pairBinSteps;
            uint8[] versions;
            address[] tokenPath;
        }

        function swapExactNATIVEForTokens(uint256 amountOutMin, Path memory path, address to, uint256 deadline)
            external
            payable
            returns (uint256 amountOut);

        function swapExactTokensForNATIVE(
            uint256 amountIn,
            uint256 amountOutMinNATIVE,
            Path memory path,
            address to,
            uint256 deadline
        ) external returns (uint256 amountOut);
    }
}
