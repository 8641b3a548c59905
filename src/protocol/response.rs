use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// Raw OK packet, or an EOF packet standing in for one (header `0xFE`)
#[derive(Debug, Clone, Copy)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

/// Raw ERR packet (header `0xFF`)
#[derive(Debug, Clone, Copy)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);

/// OK packet response
#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
}

impl OkPayload {
    pub fn more_results(&self) -> bool {
        self.status_flags
            .contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS)
    }

    /// Parse a pre-`CLIENT_DEPRECATE_EOF` EOF packet: warnings and status
    /// flags only.
    pub fn from_legacy_eof(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFE {
            return Err(Error::InvalidPacket);
        }
        let (warnings, rest) = read_int_2(data)?;
        let (status_flags, _rest) = read_int_2(rest)?;
        Ok(OkPayload {
            affected_rows: 0,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
        })
    }
}

impl TryFrom<OkPayloadBytes<'_>> for OkPayload {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0x00 && header != 0xFE {
            return Err(Error::InvalidPacket);
        }

        let (affected_rows, rest) = read_int_lenenc(data)?;
        let (_last_insert_id, rest) = read_int_lenenc(rest)?;
        let (status_flags, rest) = read_int_2(rest)?;
        let (warnings, _info) = read_int_2(rest)?;

        Ok(OkPayload {
            affected_rows,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
        })
    }
}

/// ERR packet response
#[derive(Debug, Clone, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFF {
            return Err(Error::InvalidPacket);
        }

        let (error_code, data) = read_int_2(data)?;

        // SQL state marker '#' is followed by five characters
        let (sql_state, message) = match data.split_first() {
            Some((b'#', rest)) => {
                let (state, rest) = read_string_fix(rest, 5)?;
                (String::from_utf8_lossy(state).into_owned(), rest)
            }
            _ => ("HY000".to_string(), data),
        };

        Ok(ErrPayload {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(message).trim_end().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ok_with_more_results() {
        // affected=2, insert_id=0, status=0x000A, warnings=1
        let bytes = OkPayloadBytes(&[0x00, 0x02, 0x00, 0x0A, 0x00, 0x01, 0x00]);
        let ok = OkPayload::try_from(bytes).unwrap();
        assert_eq!(ok.affected_rows, 2);
        assert_eq!(ok.warnings, 1);
        assert!(ok.more_results());
    }

    #[test]
    fn parse_legacy_eof() {
        let bytes = OkPayloadBytes(&[0xFE, 0x00, 0x00, 0x02, 0x00]);
        let ok = OkPayload::from_legacy_eof(bytes).unwrap();
        assert_eq!(ok.affected_rows, 0);
        assert!(!ok.more_results());
    }

    #[test]
    fn parse_eof_shaped_ok() {
        let bytes = OkPayloadBytes(&[0xFE, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00]);
        let ok = OkPayload::try_from(bytes).unwrap();
        assert!(ok.more_results());
    }

    #[test]
    fn parse_err_with_sql_state() {
        let mut packet = vec![0xFF, 0x7A, 0x04, b'#'];
        packet.extend_from_slice(b"42S02Table 'test.nope' doesn't exist\n");
        let err = ErrPayload::try_from(ErrPayloadBytes(&packet)).unwrap();
        assert_eq!(err.error_code, 1146);
        assert_eq!(err.sql_state, "42S02");
        assert_eq!(err.message, "Table 'test.nope' doesn't exist");
    }

    #[test]
    fn err_without_marker_gets_generic_state() {
        let err = ErrPayload::try_from(ErrPayloadBytes(b"\xFF\x15\x04Access denied")).unwrap();
        assert_eq!(err.sql_state, "HY000");
        assert_eq!(err.message, "Access denied");
    }
}
