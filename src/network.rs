use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub key: &'static str,
    pub name: &'static str,
    pub blockscout_url: &'static str,
    pub explorer_url: &'static str,
    pub default_block_range: u64,
    pub default_rate_limit: Duration,
}

pub const NETWORKS: &[Network] = &[
    Network {
        key: "base",
        name: "Base",
        blockscout_url: "https://base.blockscout.com",
        explorer_url: "https://base.blockscout.com",
        default_block_range: 10_000,
        default_rate_limit: Duration::from_millis(500),
    },
    Network {
        key: "ethereum",
        name: "Ethereum",
        blockscout_url: "https://eth.blockscout.com",
        explorer_url: "https://eth.blockscout.com",
        // busier chain, smaller windows keep getLogs under the provider limits
        default_block_range: 500,
        default_rate_limit: Duration::from_millis(1000),
    },
    Network {
        key: "polygon",
        name: "Polygon",
        blockscout_url: "https://polygon.blockscout.com",
        explorer_url: "https://polygon.blockscout.com",
        default_block_range: 10_000,
        default_rate_limit: Duration::from_millis(500),
    },
    Network {
        key: "optimism",
        name: "Optimism",
        blockscout_url: "https://optimism.blockscout.com",
        explorer_url: "https://optimism.blockscout.com",
        default_block_range: 10_000,
        default_rate_limit: Duration::from_millis(500),
    },
    Network {
        key: "story",
        name: "Story",
        blockscout_url: "https://www.storyscan.io",
        explorer_url: "https://www.storyscan.io",
        default_block_range: 50_000,
        default_rate_limit: Duration::from_millis(300),
    },
];

pub fn lookup(key: &str) -> Result<&'static Network> {
    let key = key.trim().to_lowercase();
    NETWORKS.iter().find(|n| n.key == key).ok_or_else(|| {
        let known: Vec<_> = NETWORKS.iter().map(|n| n.key).collect();
        anyhow::anyhow!("Unknown network: {} (known: {})", key, known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let network = lookup("Base").unwrap();
        assert_eq!(network.name, "Base");
        assert_eq!(network.blockscout_url, "https://base.blockscout.com");
    }

    #[test]
    fn unknown_network_is_an_error() {
        let err = lookup("solana").unwrap_err();
        assert!(err.to_string().contains("Unknown network: solana"));
    }
}
