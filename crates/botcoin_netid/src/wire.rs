//! Message framing: `magic[4] | command[12] | LE32 length | checksum[4] | payload`.

use botcoin_primitives::encode::{
    read_exact, read_i32, read_i64, read_u16, read_u32, read_u64, read_u8, read_var_bytes,
    write_var_bytes,
};
use botcoin_primitives::{sha256d, DecodeError};

use crate::{IdentityError, IdentityGate};

pub const MESSAGE_HEADER_LEN: usize = 24;
pub const MAX_PAYLOAD: u32 = 4_000_000;
const MAX_USER_AGENT_LEN: usize = 256;

/// NUL-padded ASCII command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command([u8; 12]);

impl Command {
    pub const VERSION: Self = Self::from_static("version");
    pub const VERACK: Self = Self::from_static("verack");
    pub const PING: Self = Self::from_static("ping");
    pub const PONG: Self = Self::from_static("pong");

    const fn from_static(name: &str) -> Self {
        let b = name.as_bytes();
        let mut out = [0u8; 12];
        let mut i = 0;
        while i < b.len() && i < 12 {
            out[i] = b[i];
            i += 1;
        }
        Self(out)
    }

    /// Printable ASCII followed only by NUL padding.
    pub fn from_bytes(raw: [u8; 12]) -> Result<Self, DecodeError> {
        let end = raw.iter().position(|b| *b == 0).unwrap_or(12);
        let ok = raw[..end].iter().all(u8::is_ascii_graphic) && raw[end..].iter().all(|b| *b == 0);
        if ok {
            Ok(Self(raw))
        } else {
            Err(DecodeError::Trailing)
        }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    #[must_use]
    pub fn name(&self) -> String {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(12);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub magic: [u8; 4],
    pub command: Command,
    pub length: u32,
    pub checksum: [u8; 4],
}

impl MessageHeader {
    #[must_use]
    pub fn serialize(&self) -> [u8; MESSAGE_HEADER_LEN] {
        let mut out = [0u8; MESSAGE_HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic);
        out[4..16].copy_from_slice(self.command.as_bytes());
        out[16..20].copy_from_slice(&self.length.to_le_bytes());
        out[20..24].copy_from_slice(&self.checksum);
        out
    }

    pub fn deserialize(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(read_exact(src, 4)?);
        let mut command = [0u8; 12];
        command.copy_from_slice(read_exact(src, 12)?);
        let length = read_u32(src)?;
        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(read_exact(src, 4)?);
        Ok(Self {
            magic,
            command: Command::from_bytes(command)?,
            length,
            checksum,
        })
    }
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let h = sha256d(payload);
    [h[0], h[1], h[2], h[3]]
}

/// Frame `payload` under `magic`.
#[must_use]
pub fn frame(magic: [u8; 4], command: Command, payload: &[u8]) -> Vec<u8> {
    let header = MessageHeader {
        magic,
        command,
        length: payload.len() as u32,
        checksum: checksum(payload),
    };
    let mut out = Vec::with_capacity(MESSAGE_HEADER_LEN + payload.len());
    out.extend_from_slice(&header.serialize());
    out.extend_from_slice(payload);
    out
}

/// Parse `bytes` as exactly one frame. The magic is checked before anything
/// past the 24-byte header is looked at; bytes beyond the declared payload
/// are refused.
pub fn parse_frame<'a>(
    gate: &IdentityGate,
    bytes: &'a [u8],
) -> Result<(MessageHeader, &'a [u8]), IdentityError> {
    let mut src = bytes;
    let header = MessageHeader::deserialize(&mut src)?;
    gate.require_magic(header.magic)?;
    if header.length > MAX_PAYLOAD {
        return Err(IdentityError::PayloadTooLarge(header.length));
    }
    let payload = read_exact(&mut src, header.length as usize)?;
    if !src.is_empty() {
        return Err(IdentityError::Malformed(DecodeError::Trailing));
    }
    if checksum(payload) != header.checksum {
        return Err(IdentityError::ChecksumMismatch);
    }
    Ok((header, payload))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetAddress {
    pub services: u64,
    pub ip: [u8; 16],
    pub port: u16,
}

impl NetAddress {
    /// `::ffff:0.0.0.0`, port 0.
    #[must_use]
    pub const fn unroutable(services: u64) -> Self {
        let mut ip = [0u8; 16];
        ip[10] = 0xff;
        ip[11] = 0xff;
        Self {
            services,
            ip,
            port: 0,
        }
    }

    /// IPv4-mapped address.
    #[must_use]
    pub const fn ipv4(services: u64, octets: [u8; 4], port: u16) -> Self {
        let mut a = Self::unroutable(services);
        a.ip[12] = octets[0];
        a.ip[13] = octets[1];
        a.ip[14] = octets[2];
        a.ip[15] = octets[3];
        a.port = port;
        a
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.services.to_le_bytes());
        out.extend_from_slice(&self.ip);
        out.extend_from_slice(&self.port.to_be_bytes());
    }

    fn read_from(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let services = read_u64(src)?;
        let mut ip = [0u8; 16];
        ip.copy_from_slice(read_exact(src, 16)?);
        // Port is network byte order.
        let port = read_u16(src)?.swap_bytes();
        Ok(Self { services, ip, port })
    }
}

/// Payload of the `version` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    pub version: u32,
    pub services: u64,
    pub timestamp: i64,
    pub receiver: NetAddress,
    pub sender: NetAddress,
    pub nonce: u64,
    pub user_agent: String,
    pub start_height: i32,
    pub relay: bool,
}

impl VersionMessage {
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(86 + self.user_agent.len());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.services.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        self.receiver.write_to(&mut out);
        self.sender.write_to(&mut out);
        out.extend_from_slice(&self.nonce.to_le_bytes());
        write_var_bytes(&mut out, self.user_agent.as_bytes());
        out.extend_from_slice(&self.start_height.to_le_bytes());
        out.push(u8::from(self.relay));
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut src = bytes;
        let version = read_u32(&mut src)?;
        let services = read_u64(&mut src)?;
        let timestamp = read_i64(&mut src)?;
        let receiver = NetAddress::read_from(&mut src)?;
        let sender = NetAddress::read_from(&mut src)?;
        let nonce = read_u64(&mut src)?;
        let agent = read_var_bytes(&mut src)?;
        if agent.len() > MAX_USER_AGENT_LEN {
            return Err(DecodeError::Oversize(agent.len() as u64));
        }
        let user_agent = String::from_utf8_lossy(&agent).into_owned();
        let start_height = read_i32(&mut src)?;
        // Relay flag is optional on the wire.
        let relay = if src.is_empty() { true } else { read_u8(&mut src)? != 0 };
        if !src.is_empty() {
            return Err(DecodeError::Trailing);
        }
        Ok(Self {
            version,
            services,
            timestamp,
            receiver,
            sender,
            nonce,
            user_agent,
            start_height,
            relay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_user_agent;
    use botcoin_params::{MAIN, REGTEST};

    #[test]
    fn verack_frame_bytes() {
        let f = frame(MAIN.network_magic, Command::VERACK, &[]);
        assert_eq!(
            hex::encode(&f),
            "b07c010e76657261636b000000000000000000005df6e0e2"
        );
    }

    #[test]
    fn command_names() {
        assert_eq!(Command::VERSION.name(), "version");
        let mut raw = *Command::PING.as_bytes();
        raw[6] = b'x';
        assert!(Command::from_bytes(raw).is_err());
    }

    #[test]
    fn version_payload_decodes_back() {
        let gate = IdentityGate::new(&REGTEST, &default_user_agent()).unwrap();
        let msg = gate.version_message(NetAddress::ipv4(1, [127, 0, 0, 1], 18544), 42, 1_738_195_200, 7);
        let bytes = msg.serialize();
        assert_eq!(VersionMessage::deserialize(&bytes), Ok(msg.clone()));
        // Port is big-endian.
        assert_eq!(&bytes[44..46], &[0x48, 0x70]);
        let without_relay = &bytes[..bytes.len() - 1];
        assert!(VersionMessage::deserialize(without_relay).unwrap().relay);
    }

    #[test]
    fn foreign_magic_rejected_before_payload() {
        let gate = IdentityGate::new(&MAIN, &default_user_agent()).unwrap();
        let mut f = frame(REGTEST.network_magic, Command::VERSION, &[1, 2, 3]);
        // Corrupt the payload too: the magic must be the reported failure.
        f.truncate(MESSAGE_HEADER_LEN + 1);
        assert!(matches!(
            parse_frame(&gate, &f),
            Err(IdentityError::MagicMismatch { .. })
        ));
    }

    #[test]
    fn frame_integrity() {
        let gate = IdentityGate::new(&MAIN, &default_user_agent()).unwrap();
        let f = frame(MAIN.network_magic, Command::PING, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let (h, payload) = parse_frame(&gate, &f).unwrap();
        assert_eq!(h.command, Command::PING);
        assert_eq!(payload.len(), 8);

        let mut bad = f.clone();
        bad[MESSAGE_HEADER_LEN] ^= 1;
        assert_eq!(parse_frame(&gate, &bad), Err(IdentityError::ChecksumMismatch));

        let mut huge = f;
        huge[16..20].copy_from_slice(&(MAX_PAYLOAD + 1).to_le_bytes());
        assert_eq!(
            parse_frame(&gate, &huge),
            Err(IdentityError::PayloadTooLarge(MAX_PAYLOAD + 1))
        );
        assert!(matches!(
            parse_frame(&gate, &[0xb0, 0x7c]),
            Err(IdentityError::Malformed(DecodeError::Short))
        ));
    }

    #[test]
    fn second_frame_in_buffer_is_refused() {
        let gate = IdentityGate::new(&MAIN, &default_user_agent()).unwrap();
        let mut two = frame(MAIN.network_magic, Command::VERACK, &[]);
        two.extend_from_slice(&frame(MAIN.network_magic, Command::PING, &[9; 8]));
        assert_eq!(
            parse_frame(&gate, &two),
            Err(IdentityError::Malformed(DecodeError::Trailing))
        );
        let mut padded = frame(MAIN.network_magic, Command::PING, &[9; 8]);
        padded.push(0);
        assert_eq!(
            parse_frame(&gate, &padded),
            Err(IdentityError::Malformed(DecodeError::Trailing))
        );
    }
}
