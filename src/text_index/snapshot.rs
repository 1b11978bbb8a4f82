//! Posting map snapshots
//!
//! Layout: `[crc32: u32 LE][payload: JSON object token -> keys]`.
//! Every decode validates the checksum before parsing.

use crc32fast::Hasher;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{TextIndexError, TextIndexResult};
use super::inverted::PostingMap;

const CHECKSUM_LEN: usize = 4;

fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Encodes a posting map into snapshot bytes.
pub fn encode<K: Serialize>(postings: &PostingMap<K>) -> TextIndexResult<Vec<u8>> {
    let payload = serde_json::to_vec(postings)
        .map_err(|e| TextIndexError::SnapshotCorrupt(e.to_string()))?;

    let mut out = Vec::with_capacity(CHECKSUM_LEN + payload.len());
    out.extend_from_slice(&compute_checksum(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes snapshot bytes, failing on a short buffer, checksum mismatch or
/// malformed payload.
pub fn decode<K: DeserializeOwned>(bytes: &[u8]) -> TextIndexResult<PostingMap<K>> {
    if bytes.len() < CHECKSUM_LEN {
        return Err(TextIndexError::SnapshotCorrupt(format!(
            "snapshot too short: {} bytes",
            bytes.len()
        )));
    }

    let (header, payload) = bytes.split_at(CHECKSUM_LEN);
    let expected = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let actual = compute_checksum(payload);
    if expected != actual {
        return Err(TextIndexError::SnapshotCorrupt(format!(
            "checksum mismatch: expected {:08x}, computed {:08x}",
            expected, actual
        )));
    }

    serde_json::from_slice(payload).map_err(|e| TextIndexError::SnapshotCorrupt(e.to_string()))
}
