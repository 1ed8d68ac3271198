//! Contract bindings for the lending pool and price feed registry.

use alloy::sol;

sol! {
    /// Loan struct as stored by the lending pool.
    #[derive(Debug)]
    struct Loan {
        address borrower;
        uint256 collateralAmount;
        bool active;
    }

    /// Lending pool interface.
    #[sol(rpc)]
    interface ILendingPool {
        event LoanActivated(
            uint256 indexed loanId,
            uint256 activatedAt,
            uint256 deadline,
            address indexed borrower
        );

        event LoanCompleted(
            uint256 indexed loanId,
            address indexed borrower,
            uint256 completedAt
        );

        function getLoan(uint256 loanId)
            external
            view
            returns (Loan memory loan, uint256 totalOwed, bytes32[2] memory feedIds);

        function singleLoanLiquidation(uint256 loanId, address ownerAccount) external;
    }

    /// On-chain price feed registry keyed by feed id.
    #[sol(rpc)]
    interface IPriceFeedRegistry {
        function getPrice(bytes32 feedId)
            external
            view
            returns (int256 price, uint8 decimals, uint256 updatedAt);
    }
}

/// Event topic hashes for log filtering.
pub mod event_signatures {
    use super::ILendingPool;
    use alloy::primitives::B256;
    use alloy::sol_types::SolEvent;

    /// keccak256("LoanActivated(uint256,uint256,uint256,address)")
    pub const LOAN_ACTIVATED: B256 = ILendingPool::LoanActivated::SIGNATURE_HASH;

    /// keccak256("LoanCompleted(uint256,address,uint256)")
    pub const LOAN_COMPLETED: B256 = ILendingPool::LoanCompleted::SIGNATURE_HASH;

    /// All loan lifecycle signatures, for a single subscription filter.
    pub fn loan_signatures() -> Vec<B256> {
        vec![LOAN_ACTIVATED, LOAN_COMPLETED]
    }
}
