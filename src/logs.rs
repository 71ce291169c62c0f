use crate::explorer::{Explorer, LogEvent, LogQuery};
use alloy_primitives::{Address, B256};
use anyhow::Result;
use std::collections::HashMap;

/// Inclusive block window handed to a single `getLogs` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChunk {
    pub from: u64,
    pub to: u64,
}

/// Splits `[start, end]` into windows of at most `size` blocks.
/// Yields nothing when `end < start`.
#[derive(Debug, Clone)]
pub struct BlockChunks {
    next: Option<u64>,
    end: u64,
    size: u64,
}

impl BlockChunks {
    pub fn new(start: u64, end: u64, size: u64) -> Self {
        assert!(size > 0, "block range size must be non-zero");
        BlockChunks {
            next: (start <= end).then_some(start),
            end,
            size,
        }
    }
}

impl Iterator for BlockChunks {
    type Item = BlockChunk;

    fn next(&mut self) -> Option<BlockChunk> {
        let from = self.next?;
        let to = from.saturating_add(self.size - 1).min(self.end);
        self.next = to.checked_add(1).filter(|n| *n <= self.end);
        Some(BlockChunk { from, to })
    }
}

/// A transaction that emitted the event more than once inside one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub transaction_hash: B256,
    /// Block of the first matching entry.
    pub block_number: u64,
    pub events: Vec<LogEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkOutcome {
    pub log_count: usize,
    pub duplicates: Vec<DuplicateGroup>,
}

/// Groups entries by transaction and keeps the ones seen at least twice,
/// in order of first appearance.
pub fn find_duplicates(logs: Vec<LogEvent>) -> Vec<DuplicateGroup> {
    let mut order = Vec::new();
    let mut by_tx: HashMap<B256, Vec<LogEvent>> = HashMap::new();

    for log in logs {
        let entry = by_tx.entry(log.transaction_hash).or_default();
        if entry.is_empty() {
            order.push(log.transaction_hash);
        }
        entry.push(log);
    }

    order
        .into_iter()
        .filter_map(|hash| {
            let events = by_tx.remove(&hash)?;
            (events.len() >= 2).then(|| DuplicateGroup {
                transaction_hash: hash,
                block_number: events[0].block_number,
                events,
            })
        })
        .collect()
}

/// Fetches one chunk of matching logs and reports the duplicate transactions in it.
/// Duplicates that straddle two chunks are not joined up.
pub async fn scan_chunk<E: Explorer + ?Sized>(
    explorer: &E,
    topic0: B256,
    chunk: BlockChunk,
    filter: &[Address],
) -> Result<ChunkOutcome> {
    let logs = explorer
        .get_logs(&LogQuery {
            from_block: chunk.from,
            to_block: chunk.to,
            topic0,
            addresses: filter,
        })
        .await?;

    Ok(ChunkOutcome {
        log_count: logs.len(),
        duplicates: find_duplicates(logs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExplorer;
    use rstest::rstest;

    fn event(tx: u8, block: u64) -> LogEvent {
        LogEvent {
            transaction_hash: B256::repeat_byte(tx),
            block_number: block,
            address: Address::repeat_byte(0xaa),
        }
    }

    fn ranges(start: u64, end: u64, size: u64) -> Vec<(u64, u64)> {
        BlockChunks::new(start, end, size)
            .map(|c| (c.from, c.to))
            .collect()
    }

    #[rstest]
    #[case(100, 349, 100, vec![(100, 199), (200, 299), (300, 349)])]
    #[case(100, 199, 100, vec![(100, 199)])]
    #[case(5, 5, 10, vec![(5, 5)])]
    #[case(0, 2, 1, vec![(0, 0), (1, 1), (2, 2)])]
    fn chunks_cover_range(
        #[case] start: u64,
        #[case] end: u64,
        #[case] size: u64,
        #[case] expected: Vec<(u64, u64)>,
    ) {
        assert_eq!(ranges(start, end, size), expected);
    }

    #[test]
    fn end_before_start_yields_nothing() {
        assert!(ranges(500, 499, 100).is_empty());
        assert!(ranges(10, 0, 1).is_empty());
    }

    #[test]
    fn chunks_stop_at_u64_max() {
        assert_eq!(ranges(u64::MAX - 1, u64::MAX, 10), vec![(u64::MAX - 1, u64::MAX)]);
    }

    #[test]
    fn single_event_is_not_a_duplicate() {
        let groups = find_duplicates(vec![event(1, 10), event(2, 11), event(3, 12)]);
        assert!(groups.is_empty());
    }

    #[test]
    fn one_group_per_repeated_transaction() {
        let groups = find_duplicates(vec![
            event(1, 10),
            event(2, 11),
            event(1, 10),
            event(3, 12),
            event(2, 11),
            event(2, 11),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].transaction_hash, B256::repeat_byte(1));
        assert_eq!(groups[0].events.len(), 2);
        assert_eq!(groups[1].transaction_hash, B256::repeat_byte(2));
        assert_eq!(groups[1].events.len(), 3);
        assert_eq!(groups[1].block_number, 11);
    }

    #[tokio::test]
    async fn scan_chunk_counts_and_groups() {
        let explorer = MockExplorer::new(1_000);
        let topic = B256::repeat_byte(0x77);
        explorer.add_log(event(1, 120));
        explorer.add_log(event(1, 120));
        explorer.add_log(event(2, 150));
        // outside the chunk
        explorer.add_log(event(3, 250));

        let outcome = scan_chunk(
            &explorer,
            topic,
            BlockChunk { from: 100, to: 199 },
            &[Address::repeat_byte(0xaa)],
        )
        .await
        .unwrap();

        assert_eq!(outcome.log_count, 3);
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.duplicates[0].transaction_hash, B256::repeat_byte(1));
    }
}
