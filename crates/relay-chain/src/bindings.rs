//! Solidity ABI bindings for the bridge and ERC-20 token contracts.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

sol! {
    #[sol(rpc)]
    interface IPGirlsBridge {
        function bridgeToPGirls(address user, uint256 amount) external;
    }
}

/// Calldata for minting `amount` of the mirrored token to `user`.
pub fn bridge_mint_calldata(user: Address, amount: U256) -> Bytes {
    IPGirlsBridge::bridgeToPGirlsCall { user, amount }.abi_encode().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    #[test]
    fn test_mint_calldata_layout() {
        let user = Address::repeat_byte(0xab);
        let calldata = bridge_mint_calldata(user, U256::from(1_000u64));

        assert_eq!(calldata.len(), 4 + 32 + 32);
        assert_eq!(
            &calldata[..4],
            &keccak256("bridgeToPGirls(address,uint256)".as_bytes())[..4]
        );
        assert_eq!(&calldata[4 + 12..4 + 32], user.as_slice());
        assert_eq!(U256::from_be_slice(&calldata[36..68]), U256::from(1_000u64));
    }
}
