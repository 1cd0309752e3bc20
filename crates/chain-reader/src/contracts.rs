//! Solidity bindings for the DAObi token and voting contracts

use alloy::sol;

sol! {
    /// Governance token; records who currently holds the chancellorship
    #[sol(rpc)]
    interface IDaobiToken {
        function chancellor() external view returns (address);
        function balanceOf(address account) external view returns (uint256);
    }

    /// Voting credential contract
    #[sol(rpc)]
    interface IDaobiVoteContract {
        event Registered(address indexed regVoter, bytes32 nickname, address initVote);
        event Voted(address indexed voter, address indexed candidate);

        function checkStatus(address _voter) external view returns (bool);
        function balanceOf(address owner) external view returns (uint256);
        function assessVotes(address _voter) external view returns (uint160);
        function seeBallot(address _voter) external view returns (address);
        function stake_amount() external view returns (uint256);
    }
}
