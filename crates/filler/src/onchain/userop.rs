//! Packed user-operation assembly for the bid path.
//!
//! The coordinator consumes ERC-4337 v0.7 packed user operations. Gas limits
//! and fee caps come from the cached gas estimate; the signature is left
//! empty here since signing happens at submission (outside the core).

use {
    crate::domain::eth::{Address, B256, Bytes, GasEstimate, U256},
    alloy::sol_types::SolValue,
    contracts::PackedUserOperation,
};

/// `accountGasLimits`: verification gas in the high 16 bytes, call gas in
/// the low 16 bytes.
pub fn pack_gas_limits(verification_gas_limit: U256, call_gas_limit: U256) -> B256 {
    pack_u128_pair(verification_gas_limit, call_gas_limit)
}

/// `gasFees`: max priority fee in the high 16 bytes, max fee in the low 16
/// bytes.
pub fn pack_fees(max_priority_fee_per_gas: U256, max_fee_per_gas: U256) -> B256 {
    pack_u128_pair(max_priority_fee_per_gas, max_fee_per_gas)
}

fn pack_u128_pair(high: U256, low: U256) -> B256 {
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&high.to_be_bytes::<32>()[16..]);
    word[16..].copy_from_slice(&low.to_be_bytes::<32>()[16..]);
    B256::from(word)
}

/// Assembles the packed operation for a smart-account call.
pub fn build(
    sender: Address,
    nonce: U256,
    call_data: Bytes,
    estimate: &GasEstimate,
) -> PackedUserOperation {
    PackedUserOperation {
        sender,
        nonce,
        initCode: Bytes::new(),
        callData: call_data,
        accountGasLimits: pack_gas_limits(
            estimate.verification_gas_limit,
            estimate.call_gas_limit,
        ),
        preVerificationGas: estimate.pre_verification_gas,
        gasFees: pack_fees(
            estimate.max_priority_fee_per_gas,
            estimate.max_fee_per_gas,
        ),
        paymasterAndData: Bytes::new(),
        signature: Bytes::new(),
    }
}

/// The ABI-encoded form submitted to the coordinator.
pub fn encode(operation: &PackedUserOperation) -> Bytes {
    operation.abi_encode().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_gas_limits_into_half_words() {
        let word = pack_gas_limits(U256::from(0x1122u64), U256::from(0x3344u64));
        assert_eq!(&word[14..16], &[0x11, 0x22]);
        assert_eq!(&word[30..32], &[0x33, 0x44]);
        assert!(word[..14].iter().all(|byte| *byte == 0));
        assert!(word[16..30].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn build_carries_the_estimate_fields() {
        let estimate = GasEstimate {
            total_cost_in_fee_token: U256::from(1u64),
            dispatch_fee: U256::ZERO,
            native_dispatch_fee: U256::ZERO,
            call_gas_limit: U256::from(200_000u64),
            verification_gas_limit: U256::from(500_000u64),
            pre_verification_gas: U256::from(100_000u64),
            max_fee_per_gas: U256::from(30u64),
            max_priority_fee_per_gas: U256::from(2u64),
        };
        let operation = build(
            Address::repeat_byte(0x11),
            U256::from(7u64),
            Bytes::from(vec![0xde, 0xad]),
            &estimate,
        );
        assert_eq!(operation.nonce, U256::from(7u64));
        assert_eq!(operation.preVerificationGas, U256::from(100_000u64));
        assert_eq!(
            operation.accountGasLimits,
            pack_gas_limits(U256::from(500_000u64), U256::from(200_000u64))
        );
        assert!(!encode(&operation).is_empty());
    }
}
