use crate::config::Config;
use alloy_primitives::{Address, B256};
use sha2::{Digest, Sha256};
use std::fmt;

const ALL_ADDRESSES_MARKER: &str = "__ALL_ADDRESSES__";
const ID_LEN: usize = 16;
const FILE_PREFIX: &str = "scan_progress_";
const FILE_SUFFIX: &str = ".json";

/// Fingerprint of a scan configuration, used as the resume key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanId(String);

impl ScanId {
    pub fn derive(
        network: &str,
        event_topic: &B256,
        addresses: &[Address],
        start_block: u64,
        end_block: Option<u64>,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(network.as_bytes());
        hasher.update(format!("{event_topic:#x}").as_bytes());

        if addresses.is_empty() {
            hasher.update(ALL_ADDRESSES_MARKER.as_bytes());
        } else {
            let mut sorted: Vec<String> = addresses.iter().map(|a| format!("{a:#x}")).collect();
            sorted.sort();
            for address in &sorted {
                hasher.update(address.as_bytes());
            }
        }

        hasher.update(format!("{}-{}", start_block, end_block.unwrap_or(0)).as_bytes());

        let digest = hex::encode(hasher.finalize());
        ScanId(digest[..ID_LEN].to_string())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::derive(
            config.network.key,
            &config.event_topic,
            &config.target_addresses,
            config.start_block,
            config.end_block,
        )
    }

    /// Wraps an id read back from disk or the command line.
    pub fn from_raw(id: impl Into<String>) -> Self {
        ScanId(id.into())
    }

    /// Extracts the id from a `scan_progress_<id>.json` file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_SUFFIX)
            .filter(|id| !id.is_empty())
            .map(Self::from_raw)
    }

    pub fn file_name(&self) -> String {
        format!("{FILE_PREFIX}{}{FILE_SUFFIX}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    fn topic() -> B256 {
        events::default_topic()
    }

    fn addrs() -> Vec<Address> {
        vec![Address::repeat_byte(0xbb), Address::repeat_byte(0xaa)]
    }

    #[test]
    fn identical_config_gives_identical_id() {
        let a = ScanId::derive("base", &topic(), &addrs(), 0, None);
        let b = ScanId::derive("base", &topic(), &addrs(), 0, None);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn address_order_does_not_matter() {
        let mut reversed = addrs();
        reversed.reverse();
        assert_eq!(
            ScanId::derive("base", &topic(), &addrs(), 0, None),
            ScanId::derive("base", &topic(), &reversed, 0, None)
        );
    }

    #[test]
    fn every_field_changes_the_id() {
        let base = ScanId::derive("base", &topic(), &addrs(), 0, Some(500));

        let variants = [
            ScanId::derive("ethereum", &topic(), &addrs(), 0, Some(500)),
            ScanId::derive("base", &B256::repeat_byte(0x01), &addrs(), 0, Some(500)),
            ScanId::derive("base", &topic(), &addrs()[..1], 0, Some(500)),
            ScanId::derive("base", &topic(), &[], 0, Some(500)),
            ScanId::derive("base", &topic(), &addrs(), 1, Some(500)),
            ScanId::derive("base", &topic(), &addrs(), 0, Some(501)),
            ScanId::derive("base", &topic(), &addrs(), 0, None),
        ];

        for variant in variants {
            assert_ne!(base, variant);
        }
    }

    #[test]
    fn file_name_round_trips() {
        let id = ScanId::derive("story", &topic(), &[], 0, None);
        let name = id.file_name();
        assert!(name.starts_with("scan_progress_"));
        assert!(name.ends_with(".json"));
        assert_eq!(ScanId::from_file_name(&name), Some(id));
        assert_eq!(ScanId::from_file_name("scan_progress_.json"), None);
        assert_eq!(ScanId::from_file_name("results.csv"), None);
    }
}
