//! Corpus-wide overhead summary.
//!
//! Walks a whole block stream and tabulates the size of each transfer's set
//! difference, which bounds how large a table each block needs.

use std::io::{BufRead, Write};

use crate::error::Result;
use crate::record::NodeName;
use crate::stream::BlockStream;

/// One transfer, reduced to counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverheadRow {
    pub height: u64,
    pub source: NodeName,
    pub receiver: NodeName,
    pub block_only: usize,
    pub mempool_only: usize,
}

impl OverheadRow {
    pub fn overhead(&self) -> usize {
        self.block_only + self.mempool_only
    }
}

/// Per-transfer rows plus aggregates.
#[derive(Debug, Clone, Default)]
pub struct OverheadSummary {
    rows: Vec<OverheadRow>,
}

impl OverheadSummary {
    /// Consume a stream to the end.
    pub fn from_stream<R: BufRead>(stream: &mut BlockStream<R>) -> Result<Self> {
        let mut rows = Vec::new();
        while let Some(transfers) = stream.next_block_transfers()? {
            rows.extend(transfers.into_iter().map(|t| OverheadRow {
                height: t.height,
                block_only: t.block_only.len(),
                mempool_only: t.mempool_only.len(),
                source: t.source,
                receiver: t.receiver,
            }));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[OverheadRow] {
        &self.rows
    }

    pub fn total_overhead(&self) -> usize {
        self.rows.iter().map(OverheadRow::overhead).sum()
    }

    /// Nearest-rank percentile of block-only counts; `None` when empty.
    pub fn block_only_percentile(&self, percent: u8) -> Option<usize> {
        if self.rows.is_empty() {
            return None;
        }
        let mut counts: Vec<usize> = self.rows.iter().map(|r| r.block_only).collect();
        counts.sort_unstable();
        let percent = usize::from(percent.min(100));
        let rank = (percent * counts.len()).div_ceil(100).max(1);
        Some(counts[rank - 1])
    }

    /// Write `height,from,to,block-only,mempool-only` rows.
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "height,from,to,block-only,mempool-only")?;
        for row in &self.rows {
            writeln!(
                out,
                "{},{},{},{},{}",
                row.height, row.source, row.receiver, row.block_only, row.mempool_only
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iblt_calibrate_core::TxId;
    use std::io::Cursor;

    fn ids(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| TxId::from_bytes([*b; 32]).to_hex())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn corpus() -> BlockStream<Cursor<Vec<u8>>> {
        let text = format!(
            "1:au:block:{}\n1:sf:mempool:{}\n2:au:block:{}\n2:sf:mempool:{}\n",
            ids(&[1, 2, 3]),
            ids(&[3]),
            ids(&[4]),
            ids(&[5, 6]),
        );
        BlockStream::from_reader(Cursor::new(text.into_bytes()))
    }

    #[test]
    fn test_total_overhead() {
        let summary = OverheadSummary::from_stream(&mut corpus()).unwrap();
        assert_eq!(summary.rows().len(), 2);
        // height 1: {1,2} block-only; height 2: {4} block-only, {5,6} mempool-only
        assert_eq!(summary.total_overhead(), 5);
    }

    #[test]
    fn test_percentiles() {
        let summary = OverheadSummary::from_stream(&mut corpus()).unwrap();
        assert_eq!(summary.block_only_percentile(50), Some(1));
        assert_eq!(summary.block_only_percentile(100), Some(2));
        assert_eq!(OverheadSummary::default().block_only_percentile(50), None);
    }

    #[test]
    fn test_csv_output() {
        let summary = OverheadSummary::from_stream(&mut corpus()).unwrap();
        let mut out = Vec::new();
        summary.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "height,from,to,block-only,mempool-only\n1,au,sf,2,0\n2,au,sf,1,2\n"
        );
    }
}
