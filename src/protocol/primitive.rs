//! Little-endian and length-encoded wire primitives.
//!
//! Every reader returns the decoded value together with the unread rest of
//! the input so that packet parsers can be written as a chain of `let`s.

use crate::error::{Error, Result};

#[inline]
fn take(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    data.split_at_checked(len).ok_or(Error::UnexpectedEof)
}

pub fn read_int_1(data: &[u8]) -> Result<(u8, &[u8])> {
    let (&value, rest) = data.split_first().ok_or(Error::UnexpectedEof)?;
    Ok((value, rest))
}

pub fn read_int_2(data: &[u8]) -> Result<(u16, &[u8])> {
    let (bytes, rest) = take(data, 2)?;
    Ok((u16::from_le_bytes([bytes[0], bytes[1]]), rest))
}

pub fn read_int_3(data: &[u8]) -> Result<(u32, &[u8])> {
    let (bytes, rest) = take(data, 3)?;
    Ok((u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]), rest))
}

pub fn read_int_8(data: &[u8]) -> Result<(u64, &[u8])> {
    let (bytes, rest) = take(data, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok((u64::from_le_bytes(buf), rest))
}

/// Read a length-encoded integer (`0xFC`/`0xFD`/`0xFE` prefixes)
pub fn read_int_lenenc(data: &[u8]) -> Result<(u64, &[u8])> {
    let (prefix, rest) = read_int_1(data)?;
    match prefix {
        0xFC => read_int_2(rest).map(|(v, rest)| (u64::from(v), rest)),
        0xFD => read_int_3(rest).map(|(v, rest)| (u64::from(v), rest)),
        0xFE => read_int_8(rest),
        value => Ok((u64::from(value), rest)),
    }
}

pub fn read_string_fix(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    take(data, len)
}

pub fn read_string_null(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let end = data
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::UnexpectedEof)?;
    Ok((&data[..end], &data[end + 1..]))
}

pub fn read_string_lenenc(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_int_lenenc(data)?;
    let Ok(len) = usize::try_from(len) else {
        return Err(Error::InvalidPacket);
    };
    take(rest, len)
}

pub fn write_int_1(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

pub fn write_int_4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_int_lenenc(out: &mut Vec<u8>, value: u64) {
    match value {
        0..251 => out.push(value as u8),
        251..65536 => {
            out.push(0xFC);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        65536..16777216 => {
            out.push(0xFD);
            out.extend_from_slice(&value.to_le_bytes()[..3]);
        }
        _ => {
            out.push(0xFE);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

pub fn write_string_null(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

pub fn write_bytes_lenenc(out: &mut Vec<u8>, data: &[u8]) {
    write_int_lenenc(out, data.len() as u64);
    out.extend_from_slice(data);
}
