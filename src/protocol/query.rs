use crate::constant::CommandByte;
use crate::driver::RowBuffer;
use crate::error::{Error, Result};
use crate::protocol::packet::MAX_PAYLOAD_CHUNK;
use crate::protocol::primitive::*;
use crate::protocol::response::{ErrPayloadBytes, OkPayloadBytes};

/// Write COM_QUERY command
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// First packet of every resultset in a COM_QUERY response
#[derive(Debug)]
pub enum QueryResponse<'a> {
    /// Statement without a resultset (or the trailing status of a procedure)
    Ok(OkPayloadBytes<'a>),
    ResultSet { column_count: usize },
}

/// Read COM_QUERY response:
/// - 0xFF: ERR packet
/// - 0x00: OK packet
/// - 0xFB: LOCAL INFILE request (not supported)
/// - otherwise: column count of a resultset
pub fn read_query_response(payload: &[u8]) -> Result<QueryResponse<'_>> {
    match payload.first() {
        None => Err(Error::InvalidPacket),
        Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
        Some(0x00) => Ok(QueryResponse::Ok(OkPayloadBytes(payload))),
        Some(0xFB) => Err(Error::BadConfigError(
            "LOCAL INFILE queries are not supported".to_string(),
        )),
        Some(_) => {
            let (column_count, _rest) = read_int_lenenc(payload)?;
            let Ok(column_count) = usize::try_from(column_count) else {
                return Err(Error::InvalidPacket);
            };
            Ok(QueryResponse::ResultSet { column_count })
        }
    }
}

/// A packet read while streaming rows
#[derive(Debug)]
pub enum RowPacket<'a> {
    Row(&'a [u8]),
    End(OkPayloadBytes<'a>),
}

/// Classify a packet of the row stream.
///
/// A row's first item is NULL (0xFB) or a string<lenenc>, which never starts
/// with 0xFF, so 0xFF is always an ERR packet. A 0xFE first byte in a row
/// means a string of at least 2^24 bytes, which only fits in a full-size
/// packet; any shorter 0xFE packet terminates the resultset.
pub fn read_row_packet(payload: &[u8]) -> Result<RowPacket<'_>> {
    match payload.first() {
        Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
        Some(0xFE) if payload.len() < MAX_PAYLOAD_CHUNK => {
            Ok(RowPacket::End(OkPayloadBytes(payload)))
        }
        _ => Ok(RowPacket::Row(payload)),
    }
}

/// Decode a text protocol row into `row`, overwriting the previous values
pub fn decode_text_row(payload: &[u8], row: &mut RowBuffer) -> Result<()> {
    let mut data = payload;
    for field in row.fields_mut() {
        if let Some(rest) = data.strip_prefix(&[0xFB]) {
            field.set_null();
            data = rest;
        } else {
            let (value, rest) = read_string_lenenc(data)?;
            field.set(value);
            data = rest;
        }
    }
    if data.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidPacket)
    }
}
