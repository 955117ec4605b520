//! Commit log frame format
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE) total, including this field and the checksum
//! +------------------+
//! | Commit Record    | (JSON)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself.

use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::TreeId;

use super::batch::{Revision, RowWrite, WriteBatch};
use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StoreError, StoreResult};

/// Length prefix plus trailing checksum
pub const FRAME_OVERHEAD: usize = 4 + 4;

/// One committed batch as persisted in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub tree: TreeId,
    /// Revision the scope reached with this commit
    pub revision: Revision,
    pub committed_at: DateTime<Utc>,
    pub writes: Vec<RowWrite>,
}

impl CommitRecord {
    pub fn from_batch(batch: &WriteBatch, revision: Revision) -> Self {
        Self {
            tree: batch.tree().clone(),
            revision,
            committed_at: Utc::now(),
            writes: batch.writes().to_vec(),
        }
    }

    /// Rebuild the batch that produced this record, for replay
    pub fn to_batch(&self) -> WriteBatch {
        let mut batch = WriteBatch::new(self.tree.clone(), self.revision.saturating_sub(1));
        batch.extend(self.writes.iter().cloned());
        batch
    }

    /// Serialize into a checksummed frame
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let body = serde_json::to_vec(self).map_err(|e| {
            StoreError::serialization(
                format!("Failed to encode commit {} of {}", self.revision, self.tree),
                e,
            )
        })?;

        let frame_length = (FRAME_OVERHEAD + body.len()) as u32;

        let mut frame = Vec::with_capacity(frame_length as usize);
        frame.extend_from_slice(&frame_length.to_le_bytes());
        frame.extend_from_slice(&body);
        let checksum = compute_checksum(&frame);
        frame.extend_from_slice(&checksum.to_le_bytes());

        Ok(frame)
    }

    /// Parse one frame from the front of `data`, verifying its checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < FRAME_OVERHEAD {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Frame too short",
            ));
        }

        let frame_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if frame_length <= FRAME_OVERHEAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid frame length: {}", frame_length),
            ));
        }

        if data.len() < frame_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Frame length {} exceeds available {} bytes",
                    frame_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = frame_length - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);

        if !verify_checksum(&data[..checksum_offset], stored) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: stored {:#010x}, computed {:#010x}",
                    stored,
                    compute_checksum(&data[..checksum_offset])
                ),
            ));
        }

        let record: CommitRecord = serde_json::from_slice(&data[4..checksum_offset])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok((record, frame_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeBounds, NodeId, TreeNode};
    use crate::store::FieldChanges;

    fn record() -> CommitRecord {
        let mut batch = WriteBatch::new(TreeId::from("menu"), 4);
        batch.insert(TreeNode::new(NodeId::from("c"), NodeBounds::new(4, 5, 1)));
        batch.update(NodeId::from("r"), FieldChanges::right(8));
        CommitRecord::from_batch(&batch, 5)
    }

    #[test]
    fn test_frame_length_prefix_matches() {
        let frame = record().encode().unwrap();
        let length = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(length, frame.len());

        let (decoded, consumed) = CommitRecord::decode(&frame).unwrap();
        assert_eq!(consumed, frame.len());
        assert_eq!(decoded, record_with_time(&decoded));
    }

    fn record_with_time(other: &CommitRecord) -> CommitRecord {
        CommitRecord {
            committed_at: other.committed_at,
            ..record()
        }
    }

    #[test]
    fn test_to_batch_expects_previous_revision() {
        let batch = record().to_batch();
        assert_eq!(batch.expected_revision(), 4);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_corrupted_body_detected() {
        let mut frame = record().encode().unwrap();
        let mid = frame.len() / 2;
        frame[mid] ^= 0xFF;
        let err = CommitRecord::decode(&frame).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_truncated_frame_detected() {
        let frame = record().encode().unwrap();
        let err = CommitRecord::decode(&frame[..frame.len() - 3]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
