//! Contract bindings for the intent protocol.
//!
//! The filler talks to three on-chain surfaces: the intent gateway (orders
//! are placed and filled there), the host (fee token and cross-chain fee
//! queries), and plain ERC-20 tokens. The bid path additionally packs
//! account-abstraction user operations and ERC-7821 batched calls.

use alloy::sol;

sol! {
    /// A token amount. The token is carried in its 32-byte left-padded form;
    /// the all-zero value designates the chain's native asset.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct TokenAmount {
        bytes32 token;
        uint256 amount;
    }

    /// The promised delivery on the destination chain.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct OrderOutput {
        bytes32 beneficiary;
        TokenAmount[] assets;
        bytes call;
    }

    /// Assets and calldata executed on the destination before the fill.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Predispatch {
        TokenAmount[] assets;
        bytes call;
    }

    /// The full order as understood by the gateway. Chains are identified by
    /// their canonical tag bytes (`EVM-<chainId>`).
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Order {
        bytes32 user;
        bytes sourceChain;
        bytes destChain;
        uint256 deadline;
        uint256 nonce;
        uint256 fees;
        bytes32 session;
        TokenAmount[] inputs;
        OrderOutput output;
        Predispatch predispatch;
    }

    /// Fill parameters derived from the gas estimate and the promised
    /// outputs.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct FillOptions {
        uint256 dispatchFee;
        uint256 nativeDispatchFee;
        TokenAmount[] outputs;
    }

    #[sol(rpc)]
    interface IIntentGateway {
        /// Emitted when a user escrows an order. `output.beneficiary`,
        /// `output.call` and `predispatch.call` are NOT part of the event and
        /// must be recovered from the `placeOrder` calldata of the emitting
        /// transaction.
        event OrderPlaced(
            bytes32 indexed user,
            bytes indexed sourceChain,
            bytes indexed destChain,
            uint256 deadline,
            uint256 nonce,
            uint256 fees,
            bytes32 session,
            TokenAmount[] inputs,
            TokenAmount[] outputs,
            TokenAmount[] predispatchAssets
        );

        function placeOrder(Order memory order) external payable;

        function fillOrder(Order memory order, FillOptions memory options) external payable;

        /// Whether executions targeting this chain must go through the
        /// solver-selection (bid) path instead of a direct fill.
        function solverSelection() external view returns (bool);
    }

    #[sol(rpc)]
    interface IHost {
        function feeToken() external view returns (address);

        /// Fee charged per byte of cross-chain message body when dispatching
        /// to the given chain (by its tag bytes).
        function perByteFee(bytes memory stateId) external view returns (uint256);
    }

    #[sol(rpc)]
    interface IERC20 {
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// ERC-4337 v0.7 packed user operation.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct PackedUserOperation {
        address sender;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        bytes32 accountGasLimits;
        uint256 preVerificationGas;
        bytes32 gasFees;
        bytes paymasterAndData;
        bytes signature;
    }

    #[sol(rpc)]
    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256);
    }

    /// A single call of an ERC-7821 batch.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Call {
        address to;
        uint256 value;
        bytes data;
    }

    #[sol(rpc)]
    interface IERC7821 {
        function execute(bytes32 mode, bytes memory executionData) external payable;
    }
}
