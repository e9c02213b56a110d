//! Corpus record parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

use iblt_calibrate_core::TxId;

use crate::error::{CorpusError, Result};

/// Name of a corpus node (e.g. `au`, `sf`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeName(pub String);

impl NodeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Transactions the node included in its block.
    Block,
    /// Transactions the node expected in the block, from its mempool.
    Mempool,
}

impl RecordKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "block" => Some(Self::Block),
            "mempool" => Some(Self::Mempool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Mempool => "mempool",
        }
    }
}

/// One line of a corpus-with-hints file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRecord {
    pub height: u64,
    pub node: NodeName,
    pub kind: RecordKind,
    pub txids: Vec<TxId>,
}

impl CorpusRecord {
    /// Parse one non-comment line. `line` is the 1-based line number for errors.
    pub fn parse(text: &str, line: usize) -> Result<Self> {
        let malformed = |reason: &str| CorpusError::Malformed {
            line,
            reason: reason.to_string(),
        };

        let mut fields = text.trim().splitn(4, ':');
        let height = fields
            .next()
            .ok_or_else(|| malformed("missing height"))?
            .parse::<u64>()
            .map_err(|_| malformed("height is not an integer"))?;
        let node = fields
            .next()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| malformed("missing node name"))?;
        let kind = fields
            .next()
            .ok_or_else(|| malformed("missing record kind"))?;
        let kind = RecordKind::parse(kind).ok_or_else(|| malformed("unknown record kind"))?;
        let ids = fields.next().ok_or_else(|| malformed("missing txid list"))?;

        let txids = ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| TxId::from_hex(s).map_err(|source| CorpusError::InvalidTxId { line, source }))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            height,
            node: NodeName::new(node),
            kind,
            txids,
        })
    }

    /// Render back to the line format.
    pub fn to_line(&self) -> String {
        let ids: Vec<String> = self.txids.iter().map(TxId::to_hex).collect();
        format!(
            "{}:{}:{}:{}",
            self.height,
            self.node,
            self.kind.as_str(),
            ids.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(byte: u8) -> TxId {
        TxId::from_bytes([byte; 32])
    }

    #[test]
    fn test_parse_block_record() {
        let line = format!("100:au:block:{},{}", id(1).to_hex(), id(2).to_hex());
        let record = CorpusRecord::parse(&line, 1).unwrap();

        assert_eq!(record.height, 100);
        assert_eq!(record.node, NodeName::new("au"));
        assert_eq!(record.kind, RecordKind::Block);
        assert_eq!(record.txids, vec![id(1), id(2)]);
    }

    #[test]
    fn test_parse_empty_list() {
        let record = CorpusRecord::parse("7:sf:mempool:", 3).unwrap();
        assert!(record.txids.is_empty());
        assert_eq!(record.kind, RecordKind::Mempool);
    }

    #[test]
    fn test_line_roundtrip() {
        let record = CorpusRecord {
            height: 5,
            node: NodeName::new("uk"),
            kind: RecordKind::Mempool,
            txids: vec![id(9), id(4)],
        };
        assert_eq!(CorpusRecord::parse(&record.to_line(), 1).unwrap(), record);
    }

    #[test]
    fn test_malformed_lines() {
        for bad in ["", "abc:au:block:", "1::block:", "1:au:bogus:", "1:au:block"] {
            let err = CorpusRecord::parse(bad, 42).unwrap_err();
            assert!(
                matches!(err, CorpusError::Malformed { line: 42, .. }),
                "{:?} gave {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_bad_txid_reports_line() {
        let err = CorpusRecord::parse("1:au:block:nothex", 8).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidTxId { line: 8, .. }));
    }

    fn record_strategy() -> impl Strategy<Value = CorpusRecord> {
        (
            any::<u64>(),
            "[a-z]{1,6}",
            any::<bool>(),
            prop::collection::vec(any::<[u8; 32]>(), 0..8),
        )
            .prop_map(|(height, node, block, ids)| CorpusRecord {
                height,
                node: NodeName::new(node),
                kind: if block { RecordKind::Block } else { RecordKind::Mempool },
                txids: ids.into_iter().map(TxId::from_bytes).collect(),
            })
    }

    proptest! {
        #[test]
        fn test_rendered_line_parses_back(record in record_strategy(), line in 1usize..10_000) {
            let parsed = CorpusRecord::parse(&record.to_line(), line).unwrap();
            prop_assert_eq!(parsed, record);
        }
    }
}
