use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy_primitives::B256;

sol! {
    /// ERC-1967 proxy implementation change.
    event Upgraded(address indexed implementation);
}

pub fn default_topic() -> B256 {
    Upgraded::SIGNATURE_HASH
}
