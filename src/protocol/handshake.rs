//! Connection phase: initial handshake, handshake response and the
//! authentication exchange that follows it.

use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::{
    CAPABILITIES_ALWAYS_ENABLED, CapabilityFlags, DEFAULT_CHARSET, MAX_PACKET_SIZE,
};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::response::ErrPayloadBytes;

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct HandshakeFixedFields {
    _connection_id: U32LE,
    auth_data_part1: [u8; 8],
    _filler: u8,
    capability_flags_lower: U16LE,
    _charset: u8,
    _status_flags: U16LE,
    capability_flags_upper: U16LE,
    auth_data_len: u8,
}

/// Protocol v10 greeting sent by the server
#[derive(Debug, Clone)]
pub struct InitialHandshake {
    pub server_version: String,
    pub auth_plugin_data: Vec<u8>,
    pub capability_flags: CapabilityFlags,
    pub auth_plugin_name: String,
}

pub fn read_initial_handshake(payload: &[u8]) -> Result<InitialHandshake> {
    let (protocol_version, data) = read_int_1(payload)?;
    if protocol_version == 0xFF {
        return Err(ErrPayloadBytes(payload).into());
    }
    if protocol_version != 10 {
        let message = format!("unsupported protocol version {protocol_version}");
        return Err(Error::BadConfigError(message));
    }

    let (server_version, data) = read_string_null(data)?;
    let Ok((fixed, data)) = HandshakeFixedFields::ref_from_prefix(data) else {
        return Err(Error::InvalidPacket);
    };

    let cap_bits = (u32::from(fixed.capability_flags_upper.get()) << 16)
        | u32::from(fixed.capability_flags_lower.get());
    let capability_flags = CapabilityFlags::from_bits_retain(cap_bits);

    let (_reserved, data) = read_string_fix(data, 10)?;

    // Scramble part 2 is at least 12 bytes, followed by a NUL
    let part2_len = usize::from(fixed.auth_data_len).saturating_sub(9).max(12);
    let (auth_data_2, data) = read_string_fix(data, part2_len)?;
    let data = data.strip_prefix(&[0]).unwrap_or(data);

    let mut auth_plugin_data = Vec::with_capacity(8 + auth_data_2.len());
    auth_plugin_data.extend_from_slice(&fixed.auth_data_part1);
    auth_plugin_data.extend_from_slice(auth_data_2);

    // Some servers omit the trailing NUL of the plugin name
    let auth_plugin_name = match read_string_null(data) {
        Ok((name, _)) => name,
        Err(_) => data,
    };

    Ok(InitialHandshake {
        server_version: String::from_utf8_lossy(server_version).into_owned(),
        auth_plugin_data,
        capability_flags,
        auth_plugin_name: String::from_utf8_lossy(auth_plugin_name).into_owned(),
    })
}

/// HandshakeResponse41 sent by the client
#[derive(Debug, Clone)]
pub struct HandshakeResponse41<'a> {
    pub capability_flags: CapabilityFlags,
    pub username: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin_name: &'a str,
}

pub fn write_handshake_response(out: &mut Vec<u8>, response: &HandshakeResponse41<'_>) {
    write_int_4(out, response.capability_flags.bits());
    write_int_4(out, MAX_PACKET_SIZE);
    write_int_1(out, DEFAULT_CHARSET);
    out.extend_from_slice(&[0u8; 23]);
    write_string_null(out, response.username);

    let caps = response.capability_flags;
    if caps.contains(CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA) {
        write_bytes_lenenc(out, response.auth_response);
    } else {
        write_int_1(out, response.auth_response.len() as u8);
        out.extend_from_slice(response.auth_response);
    }

    let with_db = caps.contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB);
    if let Some(db) = response.database.filter(|_| with_db) {
        write_string_null(out, db);
    }

    if caps.contains(CapabilityFlags::CLIENT_PLUGIN_AUTH) {
        write_string_null(out, response.auth_plugin_name);
    }
}

/// mysql_native_password:
/// `SHA1(password) XOR SHA1(challenge + SHA1(SHA1(password)))`
pub fn auth_mysql_native_password(password: &str, challenge: &[u8]) -> [u8; 20] {
    use sha1::{Digest, Sha1};

    if password.is_empty() {
        return [0u8; 20];
    }

    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(stage1);
    let mut hasher = Sha1::new();
    hasher.update(&challenge[..challenge.len().min(20)]);
    hasher.update(stage2);
    let token = hasher.finalize();

    let mut result = [0u8; 20];
    for (out, (a, b)) in result.iter_mut().zip(stage1.iter().zip(token.iter())) {
        *out = a ^ b;
    }
    result
}

/// caching_sha2_password scramble:
/// `SHA256(password) XOR SHA256(SHA256(SHA256(password)) + challenge)`
pub fn auth_caching_sha2_password(password: &str, challenge: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    if password.is_empty() {
        return [0u8; 32];
    }

    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);
    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(&challenge[..challenge.len().min(20)]);
    let scramble = hasher.finalize();

    let mut result = [0u8; 32];
    for (out, (a, b)) in result.iter_mut().zip(stage1.iter().zip(scramble.iter())) {
        *out = a ^ b;
    }
    result
}

/// caching_sha2_password fallback when the server has no cached scramble
const FULL_AUTH: &str = "caching_sha2_password full authentication (requires TLS or RSA)";

fn auth_response(plugin: &str, password: &str, challenge: &[u8]) -> Result<Vec<u8>> {
    match plugin {
        "mysql_native_password" => Ok(auth_mysql_native_password(password, challenge).to_vec()),
        "caching_sha2_password" => Ok(auth_caching_sha2_password(password, challenge).to_vec()),
        other => Err(Error::UnsupportedAuthPlugin(other.to_string())),
    }
}

/// What the caller has to do after feeding a packet to [`Handshake::drive`]
#[derive(Debug)]
pub enum HandshakeAction {
    /// Send this payload, continuing the sequence, then read the next packet
    Write(Vec<u8>),
    /// Read the next packet without sending anything
    Read,
    /// Authentication finished
    Connected {
        capability_flags: CapabilityFlags,
        initial_handshake: InitialHandshake,
    },
}

enum HandshakeState {
    Start,
    WaitingAuthResult {
        plugin: String,
        initial_handshake: InitialHandshake,
        capability_flags: CapabilityFlags,
    },
    Connected,
}

/// State machine for the connection phase, free of I/O
pub struct Handshake {
    username: String,
    password: String,
    database: Option<String>,
    state: HandshakeState,
}

impl Handshake {
    pub fn new(username: String, password: String, database: Option<String>) -> Self {
        Self {
            username,
            password,
            database,
            state: HandshakeState::Start,
        }
    }

    pub fn drive(&mut self, payload: &[u8]) -> Result<HandshakeAction> {
        match std::mem::replace(&mut self.state, HandshakeState::Connected) {
            HandshakeState::Start => {
                let initial_handshake = read_initial_handshake(payload)?;

                let mut client_caps = CAPABILITIES_ALWAYS_ENABLED;
                if self.database.is_some() {
                    client_caps |= CapabilityFlags::CLIENT_CONNECT_WITH_DB;
                }
                let capability_flags = client_caps & initial_handshake.capability_flags;
                if !capability_flags.contains(CapabilityFlags::CLIENT_PROTOCOL_41) {
                    let message = "server does not support protocol 4.1".to_string();
                    return Err(Error::BadConfigError(message));
                }

                let plugin = initial_handshake.auth_plugin_name.clone();
                let auth = auth_response(
                    &plugin,
                    &self.password,
                    &initial_handshake.auth_plugin_data,
                )?;

                let response = HandshakeResponse41 {
                    capability_flags,
                    username: &self.username,
                    auth_response: &auth,
                    database: self.database.as_deref(),
                    auth_plugin_name: &plugin,
                };
                let mut out = Vec::new();
                write_handshake_response(&mut out, &response);

                self.state = HandshakeState::WaitingAuthResult {
                    plugin,
                    initial_handshake,
                    capability_flags,
                };
                Ok(HandshakeAction::Write(out))
            }

            HandshakeState::WaitingAuthResult {
                plugin,
                initial_handshake,
                capability_flags,
            } => match payload.first() {
                Some(0x00) => Ok(HandshakeAction::Connected {
                    capability_flags,
                    initial_handshake,
                }),
                Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
                // caching_sha2_password fast auth: 0x03 success, 0x04 full auth
                Some(0x01) if plugin == "caching_sha2_password" => match payload.get(1) {
                    Some(0x03) => {
                        self.state = HandshakeState::WaitingAuthResult {
                            plugin,
                            initial_handshake,
                            capability_flags,
                        };
                        Ok(HandshakeAction::Read)
                    }
                    Some(0x04) => Err(Error::UnsupportedAuthPlugin(FULL_AUTH.into())),
                    _ => Err(Error::InvalidPacket),
                },
                // Auth switch request
                Some(0xFE) => {
                    let (plugin_name, data) = read_string_null(&payload[1..])?;
                    let challenge = data.strip_suffix(&[0]).unwrap_or(data);
                    let plugin = String::from_utf8_lossy(plugin_name).into_owned();
                    let auth = auth_response(&plugin, &self.password, challenge)?;

                    self.state = HandshakeState::WaitingAuthResult {
                        plugin,
                        initial_handshake,
                        capability_flags,
                    };
                    Ok(HandshakeAction::Write(auth))
                }
                _ => Err(Error::InvalidPacket),
            },

            HandshakeState::Connected => Err(Error::InvalidPacket),
        }
    }
}
