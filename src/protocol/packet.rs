use std::io::{Read, Write};

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::error::Result;

/// Largest payload a single packet can carry. A payload of exactly this
/// length is continued in the next packet.
pub const MAX_PAYLOAD_CHUNK: usize = 0xFFFFFF;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = (length as u32).to_le_bytes();
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }
}

/// Read a complete payload into `buffer`, concatenating 16MB continuation
/// packets. Returns the sequence id of the last packet read.
#[tracing::instrument(skip_all)]
pub fn read_payload<R: Read>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<u8> {
    buffer.clear();

    let mut header = PacketHeader::new_zeroed();
    loop {
        reader.read_exact(header.as_mut_bytes())?;
        let length = header.length();

        let start = buffer.len();
        buffer.resize(start + length, 0);
        reader.read_exact(&mut buffer[start..])?;

        if length != MAX_PAYLOAD_CHUNK {
            return Ok(header.sequence_id);
        }
    }
}

/// Write `payload` as one or more packets starting after `last_sequence_id`.
///
/// `last_sequence_id` is updated to the id of the last packet written. A
/// payload whose size is a multiple of 16MB is terminated with an empty
/// packet.
#[tracing::instrument(skip_all)]
pub fn write_payload<W: Write>(
    writer: &mut W,
    last_sequence_id: &mut u8,
    payload: &[u8],
) -> Result<()> {
    let mut remaining = payload;
    loop {
        let (chunk, rest) = remaining.split_at(remaining.len().min(MAX_PAYLOAD_CHUNK));
        *last_sequence_id = last_sequence_id.wrapping_add(1);
        writer.write_all(PacketHeader::encode(chunk.len(), *last_sequence_id).as_bytes())?;
        writer.write_all(chunk)?;
        remaining = rest;
        if chunk.len() < MAX_PAYLOAD_CHUNK {
            break;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write a command packet. Commands always start a new sequence at 0.
pub fn write_command<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let mut sequence_id = u8::MAX;
    write_payload(writer, &mut sequence_id, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_length_and_sequence() {
        let header = PacketHeader::encode(0x0102_03, 7);
        assert_eq!(header.as_bytes(), &[0x03, 0x02, 0x01, 0x07]);
        assert_eq!(header.length(), 0x010203);
    }

    #[test]
    fn command_starts_at_sequence_zero() {
        let mut out = Vec::new();
        write_command(&mut out, b"\x03SELECT 1").unwrap();
        assert_eq!(&out[..4], &[9, 0, 0, 0]);
        assert_eq!(&out[4..], b"\x03SELECT 1");
    }

    #[test]
    fn read_payload_joins_continuation_packets() {
        let mut wire = Vec::new();
        let mut seq = u8::MAX;
        let big = vec![0xAB; MAX_PAYLOAD_CHUNK + 3];
        write_payload(&mut wire, &mut seq, &big).unwrap();
        assert_eq!(seq, 1);

        let mut buffer = Vec::new();
        let last = read_payload(&mut wire.as_slice(), &mut buffer).unwrap();
        assert_eq!(last, 1);
        assert_eq!(buffer.len(), big.len());
    }
}
