//! Binary snapshot format
//!
//! Header followed by a bincode-encoded [`SnapshotImage`]. The CRC covers the
//! payload only.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, SkipKvError};

use super::SnapshotImage;

/// File magic
pub const MAGIC: &[u8; 4] = b"SKVS";

/// Format version
pub const VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + payload len (4) + crc (4)
pub const HEADER_SIZE: usize = 14;

pub fn encode(image: &SnapshotImage) -> Result<Vec<u8>> {
    let payload = bincode::serialize(image)?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        SkipKvError::Serialization(format!("snapshot payload too large: {} bytes", payload.len()))
    })?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(MAGIC);
    buf.put_u16_le(VERSION);
    buf.put_u32_le(len);
    buf.put_u32_le(crc32fast::hash(&payload));
    buf.put_slice(&payload);

    Ok(buf.to_vec())
}

pub fn decode(bytes: &[u8]) -> Result<SnapshotImage> {
    if bytes.len() < HEADER_SIZE {
        return Err(SkipKvError::SnapshotCorrupt(format!(
            "incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    if &buf[..4] != MAGIC {
        return Err(SkipKvError::SnapshotCorrupt("bad magic".to_string()));
    }
    buf.advance(4);

    let version = buf.get_u16_le();
    if version != VERSION {
        return Err(SkipKvError::SnapshotCorrupt(format!(
            "unsupported version {}",
            version
        )));
    }

    let len = buf.get_u32_le() as usize;
    let expected_crc = buf.get_u32_le();

    if buf.remaining() < len {
        return Err(SkipKvError::SnapshotCorrupt(format!(
            "truncated payload: expected {} bytes, got {}",
            len,
            buf.remaining()
        )));
    }

    let payload = &buf[..len];
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(SkipKvError::SnapshotCorrupt(format!(
            "CRC mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    Ok(bincode::deserialize(payload)?)
}
