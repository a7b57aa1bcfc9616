//! # Contract Definitions
//!
//! Solidity ABIs of the share ledger and of the ERC-20 tokens it pays out in.
//! Only event signatures are consumed here; the function list documents the
//! on-chain surface the ledger operations map to.

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    /// An ERC-20 payout token.
    #[derive(Debug)]
    interface IERC20 {
        /// Emitted on every token movement, including deposits into a pool.
        event Transfer(address indexed from, address indexed to, uint256 value);

        /// Emitted when an allowance is set.
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

sol! {
    /// The profit-distributing share token.
    #[derive(Debug)]
    interface IProfitDistributor {
        /// Shares moved; `from` is zero for a mint.
        event Transfer(address indexed from, address indexed to, uint256 value);

        /// Share allowance set.
        event Approval(address indexed owner, address indexed spender, uint256 value);

        /// A payout token became a profit source.
        event ProfitSourceRegistered(uint256 indexed index, address indexed token);

        /// Profit source membership was frozen.
        event ProfitSourcesFinalized();

        /// An account stopped participating in profits.
        event ExcludedFromProfits(address indexed account, uint256 balance);

        /// Settled profit was paid out.
        event ProfitWithdrawn(address indexed account, uint256 indexed index, address token, uint256 amount);

        /// Stray tokens were returned to the admin.
        event FundsRecovered(address indexed token, address indexed to, uint256 amount);

        /// The admin capability moved.
        event AdminChanged(address indexed previous, address indexed current);

        function mint(address to, uint256 amount) external;
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function registerProfitSource(address token) external;
        function finalizeProfitSources() external;
        function excludeFromProfits(address account) external;
        function withdrawProfit(uint256 amount, uint256 sourceIndex) external;
        function recoverFunds(address token, uint256 amount) external;
        function balanceOfProfit(address account, uint256 sourceIndex) external view returns (uint256);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;
    use alloy_sol_types::SolEvent;

    #[test]
    fn test_erc20_transfer_signature() {
        assert_eq!(IERC20::Transfer::SIGNATURE, "Transfer(address,address,uint256)");
        assert_eq!(
            IERC20::Transfer::SIGNATURE_HASH,
            b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
        );
    }

    #[test]
    fn test_share_transfer_matches_erc20() {
        assert_eq!(
            IProfitDistributor::Transfer::SIGNATURE_HASH,
            IERC20::Transfer::SIGNATURE_HASH
        );
        assert_eq!(
            IProfitDistributor::ProfitWithdrawn::SIGNATURE,
            "ProfitWithdrawn(address,uint256,address,uint256)"
        );
    }
}
