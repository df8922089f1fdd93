//! Wire decoding: turns a raw UDP payload into zero or more
//! [`NormalizedRecord`]s (§6 Input, §4.G Decoder interface).
//!
//! Version is identified by the first two big-endian bytes of the
//! datagram.

pub mod record;
pub mod v5;
pub mod v7;

pub use record::{NetflowVersion, NormalizedRecord};

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum DecodeError {
    #[error("datagram too short: needed at least {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("unsupported netflow version {got} (expected {expected})")]
    WrongVersion { expected: u16, got: u16 },
    #[error("size mismatch: flow_count={flow_count} implies {expected} bytes, got {got}")]
    SizeMismatch {
        flow_count: u16,
        got: usize,
        expected: usize,
    },
    #[error("unrecognized flow format (datagram too short to contain any known header)")]
    UnknownFormat,
}

/// Dispatch a raw datagram to the matching version decoder by peeking at
/// its first two bytes.
pub fn decode(buf: &[u8], peer: u32, recv_time: u64) -> Result<Vec<NormalizedRecord>, DecodeError> {
    if buf.len() < 2 {
        return Err(DecodeError::UnknownFormat);
    }
    let version = u16::from_be_bytes([buf[0], buf[1]]);
    match version {
        5 => v5::decode(buf, peer, recv_time),
        7 => v7::decode(buf, recv_time),
        _ => Err(DecodeError::UnknownFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_version_is_unknown_format() {
        let buf = [0u8, 9, 0, 0];
        assert!(matches!(decode(&buf, 0, 0), Err(DecodeError::UnknownFormat)));
    }

    #[test]
    fn too_short_for_any_header_is_unknown_format() {
        let buf = [5u8];
        assert!(matches!(decode(&buf, 0, 0), Err(DecodeError::UnknownFormat)));
    }
}
