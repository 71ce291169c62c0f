use crate::explorer::{Explorer, TransactionLog};
use crate::logs::BlockChunk;
use tracing::debug;

const MAX_DATA_CHARS: usize = 100;

/// Dumps every transaction in the chunk together with its logs. Debug aid
/// only: failures are logged and never reach the caller.
pub async fn dump_chunk<E: Explorer + ?Sized>(explorer: &E, chunk: BlockChunk) {
    debug!("Block transaction details for {}-{}:", chunk.from, chunk.to);

    for block in chunk.from..=chunk.to {
        let hashes = match explorer.block_transactions(block).await {
            Ok(hashes) => hashes,
            Err(e) => {
                debug!("  Block {}: error fetching transactions - {:#}", block, e);
                continue;
            }
        };

        if hashes.is_empty() {
            debug!("  Block {}: no transactions", block);
            continue;
        }

        debug!("  Block {}: {} transactions", block, hashes.len());
        for (i, hash) in hashes.iter().enumerate() {
            debug!("    TX {}: {:#x}", i + 1, hash);
            match explorer.transaction_logs(hash).await {
                Ok(logs) if logs.is_empty() => debug!("      no logs/events"),
                Ok(logs) => {
                    debug!("      {} logs/events:", logs.len());
                    for (j, log) in logs.iter().enumerate() {
                        for line in describe_log(j + 1, log) {
                            debug!("        {}", line);
                        }
                    }
                }
                Err(e) => debug!("      error fetching logs: {:#}", e),
            }
        }
    }
}

pub fn describe_log(index: usize, log: &TransactionLog) -> Vec<String> {
    let address = log.address.as_ref().map_or("", |a| a.hash.as_str());
    let mut lines = vec![format!("Log {index}: address={address}")];

    match &log.decoded {
        Some(decoded) => {
            lines.push(format!("  event={}", decoded.method_call));
            if !decoded.parameters.is_empty() {
                lines.push("  parameters:".to_string());
                for (k, param) in decoded.parameters.iter().enumerate() {
                    lines.push(format!(
                        "    {}. {} ({}, indexed:{}) = {}",
                        k + 1,
                        param.name,
                        param.kind,
                        param.indexed.unwrap_or(false),
                        param.value
                    ));
                }
            }
        }
        None => {
            let topics: Vec<&str> = log.topics.iter().flatten().map(String::as_str).collect();
            lines.push(format!("  topics=[{}]", topics.join(", ")));
        }
    }

    match log.data.as_deref() {
        Some(data) if data.len() > MAX_DATA_CHARS => lines.push(format!(
            "  data={}... ({} chars)",
            data.chars().take(MAX_DATA_CHARS).collect::<String>(),
            data.len()
        )),
        Some(data) if !data.is_empty() && data != "0x" => lines.push(format!("  data={data}")),
        _ => {}
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::{AddressRef, DecodedLog, DecodedParam};
    use crate::testing::MockExplorer;

    #[test]
    fn describes_decoded_log() {
        let log = TransactionLog {
            address: Some(AddressRef {
                hash: "0xabc".into(),
            }),
            topics: vec![],
            data: Some("0x".into()),
            decoded: Some(DecodedLog {
                method_call: "Upgraded(address indexed implementation)".into(),
                parameters: vec![DecodedParam {
                    name: "implementation".into(),
                    kind: "address".into(),
                    indexed: Some(true),
                    value: serde_json::json!("0xdef"),
                }],
            }),
        };

        let lines = describe_log(1, &log);
        assert_eq!(lines[0], "Log 1: address=0xabc");
        assert_eq!(lines[1], "  event=Upgraded(address indexed implementation)");
        assert_eq!(
            lines[3],
            "    1. implementation (address, indexed:true) = \"0xdef\""
        );
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn falls_back_to_topics_and_truncates_data() {
        let log = TransactionLog {
            address: None,
            topics: vec![Some("0x01".into()), None, Some("0x02".into())],
            data: Some(format!("0x{}", "f".repeat(200))),
            decoded: None,
        };

        let lines = describe_log(2, &log);
        assert_eq!(lines[1], "  topics=[0x01, 0x02]");
        assert!(lines[2].ends_with("... (202 chars)"));
    }

    #[tokio::test]
    async fn dump_tolerates_explorer_errors() {
        // the mock knows no blocks, every lookup fails
        let explorer = MockExplorer::new(10);
        dump_chunk(&explorer, BlockChunk { from: 1, to: 3 }).await;
        assert_eq!(explorer.calls("block_transactions"), 3);
    }
}
