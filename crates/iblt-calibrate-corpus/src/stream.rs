//! Block stream: replay of a corpus as per-height block transfers.
//!
//! For each height the stream gathers every node's block set and mempool
//! guess, then pairs each source block with each other node's guess.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use iblt_calibrate_core::TxId;

use crate::error::{CorpusError, Result};
use crate::record::{CorpusRecord, NodeName, RecordKind};

/// One block sent from `source` to `receiver`, reduced to its set difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTransfer {
    pub height: u64,
    pub source: NodeName,
    pub receiver: NodeName,
    /// In the source's block, missing from the receiver's guess.
    pub block_only: Vec<TxId>,
    /// In the receiver's guess, not in the source's block.
    pub mempool_only: Vec<TxId>,
}

impl BlockTransfer {
    /// Size of the difference the receiver has to reconcile.
    pub fn overhead(&self) -> usize {
        self.block_only.len() + self.mempool_only.len()
    }
}

/// Everything recorded for a single height.
#[derive(Debug, Default)]
struct HeightSnapshot {
    blocks: BTreeMap<NodeName, BTreeSet<TxId>>,
    mempools: BTreeMap<NodeName, BTreeSet<TxId>>,
}

impl HeightSnapshot {
    fn add(&mut self, record: CorpusRecord) {
        let sets = match record.kind {
            RecordKind::Block => &mut self.blocks,
            RecordKind::Mempool => &mut self.mempools,
        };
        sets.entry(record.node).or_default().extend(record.txids);
    }

    fn transfers(&self, height: u64) -> Vec<BlockTransfer> {
        let mut transfers = Vec::new();
        for (source, block) in &self.blocks {
            for (receiver, mempool) in &self.mempools {
                if source == receiver {
                    continue;
                }
                let block_only: Vec<TxId> = block.difference(mempool).copied().collect();
                let mempool_only: Vec<TxId> = mempool.difference(block).copied().collect();
                if block_only.is_empty() && mempool_only.is_empty() {
                    continue;
                }
                transfers.push(BlockTransfer {
                    height,
                    source: source.clone(),
                    receiver: receiver.clone(),
                    block_only,
                    mempool_only,
                });
            }
        }
        transfers
    }
}

/// Sequential reader over a corpus-with-hints source.
pub struct BlockStream<R> {
    reader: R,
    line: usize,
    pending: Option<(usize, CorpusRecord)>,
    last_height: Option<u64>,
}

impl BlockStream<BufReader<File>> {
    /// Open a corpus file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> BlockStream<R> {
    /// Replay from any buffered reader.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            pending: None,
            last_height: None,
        }
    }

    /// Height of the most recently emitted or skipped block.
    pub fn last_height(&self) -> Option<u64> {
        self.last_height
    }

    /// Transfers for the next height that has any.
    ///
    /// Returns `Ok(None)` at the end of the corpus; never returns an empty list.
    pub fn next_block_transfers(&mut self) -> Result<Option<Vec<BlockTransfer>>> {
        loop {
            let (line, first) = match self.take_record()? {
                Some(entry) => entry,
                None => return Ok(None),
            };
            let height = first.height;
            if let Some(previous) = self.last_height {
                if height <= previous {
                    return Err(CorpusError::OutOfOrder {
                        line,
                        previous,
                        found: height,
                    });
                }
            }

            let mut snapshot = HeightSnapshot::default();
            snapshot.add(first);
            while self.peek_height()? == Some(height) {
                if let Some((_, record)) = self.take_record()? {
                    snapshot.add(record);
                }
            }
            self.last_height = Some(height);

            let transfers = snapshot.transfers(height);
            if transfers.is_empty() {
                tracing::trace!(height, "no differing node pairs; skipping height");
                continue;
            }
            tracing::debug!(height, transfers = transfers.len(), "replayed block");
            return Ok(Some(transfers));
        }
    }

    fn peek_height(&mut self) -> Result<Option<u64>> {
        if self.pending.is_none() {
            self.pending = self.read_record()?;
        }
        Ok(self.pending.as_ref().map(|(_, record)| record.height))
    }

    fn take_record(&mut self) -> Result<Option<(usize, CorpusRecord)>> {
        match self.pending.take() {
            Some(entry) => Ok(Some(entry)),
            None => self.read_record(),
        }
    }

    fn read_record(&mut self) -> Result<Option<(usize, CorpusRecord)>> {
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            return CorpusRecord::parse(text, self.line).map(|record| Some((self.line, record)));
        }
    }
}

impl<R: BufRead> Iterator for BlockStream<R> {
    type Item = Result<Vec<BlockTransfer>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block_transfers().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn id(byte: u8) -> TxId {
        TxId::from_bytes([byte; 32])
    }

    fn line(height: u64, node: &str, kind: &str, ids: &[u8]) -> String {
        let ids: Vec<String> = ids.iter().map(|b| id(*b).to_hex()).collect();
        format!("{}:{}:{}:{}\n", height, node, kind, ids.join(","))
    }

    fn stream(text: String) -> BlockStream<Cursor<Vec<u8>>> {
        BlockStream::from_reader(Cursor::new(text.into_bytes()))
    }

    #[test]
    fn test_set_difference_per_pair() {
        let text = [
            line(10, "au", "block", &[1, 2, 3]),
            line(10, "sf", "mempool", &[2, 3, 4]),
        ]
        .concat();
        let mut s = stream(text);

        let transfers = s.next_block_transfers().unwrap().unwrap();
        assert_eq!(transfers.len(), 1);
        let t = &transfers[0];
        assert_eq!(t.height, 10);
        assert_eq!(t.source, NodeName::new("au"));
        assert_eq!(t.receiver, NodeName::new("sf"));
        assert_eq!(t.block_only, vec![id(1)]);
        assert_eq!(t.mempool_only, vec![id(4)]);
        assert_eq!(t.overhead(), 2);

        assert!(s.next_block_transfers().unwrap().is_none());
    }

    #[test]
    fn test_source_never_sends_to_itself() {
        let text = [
            line(1, "au", "block", &[1]),
            line(1, "au", "mempool", &[2]),
        ]
        .concat();
        assert!(stream(text).next_block_transfers().unwrap().is_none());
    }

    #[test]
    fn test_identical_views_skip_to_next_height() {
        let text = [
            "# header comment\n".to_string(),
            line(1, "au", "block", &[1, 2]),
            line(1, "sf", "mempool", &[1, 2]),
            "\n".to_string(),
            line(2, "au", "block", &[5]),
            line(2, "sf", "mempool", &[]),
        ]
        .concat();
        let mut s = stream(text);

        let transfers = s.next_block_transfers().unwrap().unwrap();
        assert_eq!(transfers[0].height, 2);
        assert_eq!(transfers[0].block_only, vec![id(5)]);
        assert_eq!(s.last_height(), Some(2));
    }

    #[test]
    fn test_all_pairs_emitted_in_node_order() {
        let text = [
            line(3, "au", "block", &[1]),
            line(3, "sf", "block", &[1, 2]),
            line(3, "au", "mempool", &[]),
            line(3, "sf", "mempool", &[]),
            line(3, "uk", "mempool", &[]),
        ]
        .concat();
        let transfers = stream(text).next_block_transfers().unwrap().unwrap();
        let pairs: Vec<(&str, &str)> = transfers
            .iter()
            .map(|t| (t.source.as_str(), t.receiver.as_str()))
            .collect();
        assert_eq!(pairs, vec![("au", "sf"), ("au", "uk"), ("sf", "au"), ("sf", "uk")]);
    }

    #[test]
    fn test_out_of_order_heights_rejected() {
        let text = [
            line(5, "au", "block", &[1]),
            line(5, "sf", "mempool", &[]),
            line(4, "au", "block", &[1]),
        ]
        .concat();
        let mut s = stream(text);
        assert!(s.next_block_transfers().unwrap().is_some());
        assert!(matches!(
            s.next_block_transfers(),
            Err(CorpusError::OutOfOrder { previous: 5, found: 4, line: 3 })
        ));
    }

    #[test]
    fn test_iterator_yields_each_height() {
        let text = [
            line(1, "au", "block", &[1]),
            line(1, "sf", "mempool", &[]),
            line(2, "au", "block", &[2]),
            line(2, "sf", "mempool", &[]),
        ]
        .concat();
        let heights: Vec<u64> = stream(text)
            .map(|r| r.unwrap()[0].height)
            .collect();
        assert_eq!(heights, vec![1, 2]);
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(
            &path,
            [line(9, "au", "block", &[7]), line(9, "sf", "mempool", &[])].concat(),
        )
        .unwrap();

        let mut s = BlockStream::open(&path).unwrap();
        assert_eq!(s.next_block_transfers().unwrap().unwrap()[0].height, 9);
    }
}
