//! Wire codec for the transfer protocol.
//!
//! Requests and responses share the same framing idea: a fixed-width
//! little-endian header carrying an opcode and a payload length, followed
//! by a payload whose layout is a function of the opcode alone. Nothing on
//! the wire is self-describing, so the payloads are modeled as one enum per
//! direction: a frame cannot be built without every field its opcode
//! requires, and decoding dispatches on the opcode it was handed.

use std::fmt;

use crate::error::{ClientError, Result};
use crate::{
    CLIENT_ID_SIZE, CONTENT_CAPACITY, CONTENT_SIZE_SIZE, FILE_NAME_SIZE, ORIG_SIZE_SIZE,
    PACKET_INDEX_SIZE, PROTOCOL_VERSION, PUBLIC_KEY_SIZE, REQUEST_HEADER_SIZE,
    RESPONSE_HEADER_SIZE, TOTAL_PACKETS_SIZE, USER_NAME_SIZE,
};

/// Opaque 16-byte identifier the server assigns at first registration.
///
/// The raw bytes travel on the wire; the lowercase hex form appears only at
/// UI and storage boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientId(pub [u8; CLIENT_ID_SIZE]);

impl ClientId {
    /// Placeholder id carried in the header while no id has been assigned.
    pub const REGISTRATION_SENTINEL: ClientId = ClientId([0xFF; CLIENT_ID_SIZE]);

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Option<ClientId> {
        let bytes = hex::decode(text.trim()).ok()?;
        let bytes: [u8; CLIENT_ID_SIZE] = bytes.try_into().ok()?;
        Some(ClientId(bytes))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RequestCode {
    Register = 825,
    SubmitPublicKey = 826,
    Reconnect = 827,
    SendFile = 828,
    // 900..=902 are reserved by the server contract for a checksum
    // handshake; this client never sends them.
    CrcValid = 900,
    CrcInvalidRetry = 901,
    CrcInvalidFinal = 902,
}

impl RequestCode {
    pub fn from_u16(raw: u16) -> Result<RequestCode> {
        match raw {
            825 => Ok(RequestCode::Register),
            826 => Ok(RequestCode::SubmitPublicKey),
            827 => Ok(RequestCode::Reconnect),
            828 => Ok(RequestCode::SendFile),
            900 => Ok(RequestCode::CrcValid),
            901 => Ok(RequestCode::CrcInvalidRetry),
            902 => Ok(RequestCode::CrcInvalidFinal),
            other => Err(ClientError::MalformedPayload(format!(
                "unrecognized request code {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ResponseCode {
    RegistrationSuccess = 1600,
    RegistrationFailure = 1601,
    PublicKeyReceived = 1602,
    FileReceived = 1603,
    MessageReceived = 1604,
    ReconnectionSuccess = 1605,
    ReconnectionFailure = 1606,
    GeneralError = 1607,
}

impl ResponseCode {
    pub fn from_u16(raw: u16) -> Result<ResponseCode> {
        match raw {
            1600 => Ok(ResponseCode::RegistrationSuccess),
            1601 => Ok(ResponseCode::RegistrationFailure),
            1602 => Ok(ResponseCode::PublicKeyReceived),
            1603 => Ok(ResponseCode::FileReceived),
            1604 => Ok(ResponseCode::MessageReceived),
            1605 => Ok(ResponseCode::ReconnectionSuccess),
            1606 => Ok(ResponseCode::ReconnectionFailure),
            1607 => Ok(ResponseCode::GeneralError),
            other => Err(ClientError::MalformedPayload(format!(
                "unrecognized response code {other}"
            ))),
        }
    }
}

/// Request payload variants, one per opcode the client can put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    Register {
        user_name: String,
    },
    SubmitPublicKey {
        user_name: String,
        public_key: [u8; PUBLIC_KEY_SIZE],
    },
    Reconnect {
        user_name: String,
    },
    SendFile {
        /// Total AES ciphertext length, identical across all frames of one upload.
        content_size: u32,
        /// Plaintext length before encryption.
        orig_size: u32,
        /// 1-based position of this frame.
        packet_index: u16,
        total_packets: u16,
        file_name: String,
        /// This frame's ciphertext slice, at most [`CONTENT_CAPACITY`] bytes.
        content: Vec<u8>,
    },
    CrcValid {
        file_name: String,
    },
    CrcInvalidRetry {
        file_name: String,
    },
    CrcInvalidFinal {
        file_name: String,
    },
}

/// Fixed SendFile payload bytes that precede the content slice.
const SEND_FILE_FIXED: usize =
    CONTENT_SIZE_SIZE + ORIG_SIZE_SIZE + PACKET_INDEX_SIZE + TOTAL_PACKETS_SIZE + FILE_NAME_SIZE;

impl RequestPayload {
    pub fn code(&self) -> RequestCode {
        match self {
            RequestPayload::Register { .. } => RequestCode::Register,
            RequestPayload::SubmitPublicKey { .. } => RequestCode::SubmitPublicKey,
            RequestPayload::Reconnect { .. } => RequestCode::Reconnect,
            RequestPayload::SendFile { .. } => RequestCode::SendFile,
            RequestPayload::CrcValid { .. } => RequestCode::CrcValid,
            RequestPayload::CrcInvalidRetry { .. } => RequestCode::CrcInvalidRetry,
            RequestPayload::CrcInvalidFinal { .. } => RequestCode::CrcInvalidFinal,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            RequestPayload::Register { .. } | RequestPayload::Reconnect { .. } => USER_NAME_SIZE,
            RequestPayload::SubmitPublicKey { .. } => USER_NAME_SIZE + PUBLIC_KEY_SIZE,
            RequestPayload::SendFile { content, .. } => SEND_FILE_FIXED + content.len(),
            RequestPayload::CrcValid { .. }
            | RequestPayload::CrcInvalidRetry { .. }
            | RequestPayload::CrcInvalidFinal { .. } => FILE_NAME_SIZE,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            RequestPayload::Register { user_name } | RequestPayload::Reconnect { user_name } => {
                put_fixed_str(out, user_name, USER_NAME_SIZE)
            }
            RequestPayload::SubmitPublicKey {
                user_name,
                public_key,
            } => {
                put_fixed_str(out, user_name, USER_NAME_SIZE)?;
                out.extend_from_slice(public_key);
                Ok(())
            }
            RequestPayload::SendFile {
                content_size,
                orig_size,
                packet_index,
                total_packets,
                file_name,
                content,
            } => {
                if content.is_empty() || content.len() > CONTENT_CAPACITY {
                    return Err(ClientError::MalformedPayload(format!(
                        "frame content must be 1..={CONTENT_CAPACITY} bytes, got {}",
                        content.len()
                    )));
                }
                out.extend_from_slice(&content_size.to_le_bytes());
                out.extend_from_slice(&orig_size.to_le_bytes());
                out.extend_from_slice(&packet_index.to_le_bytes());
                out.extend_from_slice(&total_packets.to_le_bytes());
                put_fixed_str(out, file_name, FILE_NAME_SIZE)?;
                out.extend_from_slice(content);
                Ok(())
            }
            RequestPayload::CrcValid { file_name }
            | RequestPayload::CrcInvalidRetry { file_name }
            | RequestPayload::CrcInvalidFinal { file_name } => {
                put_fixed_str(out, file_name, FILE_NAME_SIZE)
            }
        }
    }

    pub fn decode(code: RequestCode, bytes: &[u8]) -> Result<RequestPayload> {
        match code {
            RequestCode::Register => Ok(RequestPayload::Register {
                user_name: take_fixed_str(bytes, 0, USER_NAME_SIZE, "user name")?,
            }),
            RequestCode::Reconnect => Ok(RequestPayload::Reconnect {
                user_name: take_fixed_str(bytes, 0, USER_NAME_SIZE, "user name")?,
            }),
            RequestCode::SubmitPublicKey => Ok(RequestPayload::SubmitPublicKey {
                user_name: take_fixed_str(bytes, 0, USER_NAME_SIZE, "user name")?,
                public_key: take(bytes, USER_NAME_SIZE, "public key")?,
            }),
            RequestCode::SendFile => {
                let content_size = u32::from_le_bytes(take(bytes, 0, "content size")?);
                let orig_size = u32::from_le_bytes(take(bytes, 4, "original size")?);
                let packet_index = u16::from_le_bytes(take(bytes, 8, "packet index")?);
                let total_packets = u16::from_le_bytes(take(bytes, 10, "total packets")?);
                let file_name = take_fixed_str(bytes, 12, FILE_NAME_SIZE, "file name")?;
                let content = bytes.get(SEND_FILE_FIXED..).unwrap_or_default().to_vec();
                Ok(RequestPayload::SendFile {
                    content_size,
                    orig_size,
                    packet_index,
                    total_packets,
                    file_name,
                    content,
                })
            }
            RequestCode::CrcValid => Ok(RequestPayload::CrcValid {
                file_name: take_fixed_str(bytes, 0, FILE_NAME_SIZE, "file name")?,
            }),
            RequestCode::CrcInvalidRetry => Ok(RequestPayload::CrcInvalidRetry {
                file_name: take_fixed_str(bytes, 0, FILE_NAME_SIZE, "file name")?,
            }),
            RequestCode::CrcInvalidFinal => Ok(RequestPayload::CrcInvalidFinal {
                file_name: take_fixed_str(bytes, 0, FILE_NAME_SIZE, "file name")?,
            }),
        }
    }
}

/// One complete request: header fields plus the typed payload.
///
/// The opcode and payload length are derived from the payload variant, so a
/// header can never disagree with the bytes that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub client_id: ClientId,
    pub payload: RequestPayload,
}

impl Request {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload_size = self.payload.encoded_len();
        let mut out = Vec::with_capacity(REQUEST_HEADER_SIZE + payload_size);
        out.extend_from_slice(&self.client_id.0);
        out.push(PROTOCOL_VERSION);
        out.extend_from_slice(&(self.payload.code() as u16).to_le_bytes());
        out.extend_from_slice(&(payload_size as u32).to_le_bytes());
        self.payload.encode(&mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Request> {
        let client_id = ClientId(take(bytes, 0, "request header")?);
        let code = RequestCode::from_u16(u16::from_le_bytes(take(
            bytes,
            CLIENT_ID_SIZE + 1,
            "request header",
        )?))?;
        let payload_size =
            u32::from_le_bytes(take(bytes, CLIENT_ID_SIZE + 3, "request header")?) as usize;
        let payload_bytes = bytes
            .get(REQUEST_HEADER_SIZE..REQUEST_HEADER_SIZE + payload_size)
            .ok_or_else(|| {
                ClientError::MalformedPayload(format!(
                    "request payload shorter than the declared {payload_size} bytes"
                ))
            })?;
        let payload = RequestPayload::decode(code, payload_bytes)?;
        Ok(Request { client_id, payload })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} request, client id {}, {} payload bytes",
            self.payload.code(),
            self.client_id,
            self.payload.encoded_len()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub version: u8,
    pub code: ResponseCode,
    pub payload_size: u32,
}

impl ResponseHeader {
    pub fn from_bytes(bytes: &[u8]) -> Result<ResponseHeader> {
        if bytes.len() < RESPONSE_HEADER_SIZE {
            return Err(ClientError::MalformedPayload(format!(
                "response header needs {RESPONSE_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let version = bytes[0];
        let code = ResponseCode::from_u16(u16::from_le_bytes(take(bytes, 1, "response header")?))?;
        let payload_size = u32::from_le_bytes(take(bytes, 3, "response header")?);
        Ok(ResponseHeader {
            version,
            code,
            payload_size,
        })
    }

    pub fn to_bytes(&self) -> [u8; RESPONSE_HEADER_SIZE] {
        let mut out = [0u8; RESPONSE_HEADER_SIZE];
        out[0] = self.version;
        out[1..3].copy_from_slice(&(self.code as u16).to_le_bytes());
        out[3..7].copy_from_slice(&self.payload_size.to_le_bytes());
        out
    }
}

impl fmt::Display for ResponseHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} response ({}), {} payload bytes",
            self.code, self.code as u16, self.payload_size
        )
    }
}

/// Response payload variants, one per opcode the server can send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    RegistrationSuccess {
        client_id: ClientId,
    },
    RegistrationFailure,
    PublicKeyReceived {
        client_id: ClientId,
        /// RSA-wrapped session key; runs to the end of the payload, its
        /// length is not declared anywhere in the message.
        wrapped_key: Vec<u8>,
    },
    FileReceived {
        client_id: ClientId,
        content_size: u32,
        file_name: String,
        cksum: u32,
    },
    MessageReceived {
        client_id: ClientId,
    },
    ReconnectionSuccess {
        client_id: ClientId,
        wrapped_key: Vec<u8>,
    },
    ReconnectionFailure {
        client_id: ClientId,
    },
    GeneralError,
}

impl ResponsePayload {
    pub fn code(&self) -> ResponseCode {
        match self {
            ResponsePayload::RegistrationSuccess { .. } => ResponseCode::RegistrationSuccess,
            ResponsePayload::RegistrationFailure => ResponseCode::RegistrationFailure,
            ResponsePayload::PublicKeyReceived { .. } => ResponseCode::PublicKeyReceived,
            ResponsePayload::FileReceived { .. } => ResponseCode::FileReceived,
            ResponsePayload::MessageReceived { .. } => ResponseCode::MessageReceived,
            ResponsePayload::ReconnectionSuccess { .. } => ResponseCode::ReconnectionSuccess,
            ResponsePayload::ReconnectionFailure { .. } => ResponseCode::ReconnectionFailure,
            ResponsePayload::GeneralError => ResponseCode::GeneralError,
        }
    }

    pub fn decode(code: ResponseCode, bytes: &[u8]) -> Result<ResponsePayload> {
        match code {
            ResponseCode::RegistrationSuccess => Ok(ResponsePayload::RegistrationSuccess {
                client_id: take_client_id(bytes)?,
            }),
            ResponseCode::RegistrationFailure => Ok(ResponsePayload::RegistrationFailure),
            ResponseCode::PublicKeyReceived => Ok(ResponsePayload::PublicKeyReceived {
                client_id: take_client_id(bytes)?,
                wrapped_key: bytes[CLIENT_ID_SIZE..].to_vec(),
            }),
            ResponseCode::FileReceived => Ok(ResponsePayload::FileReceived {
                client_id: take_client_id(bytes)?,
                content_size: u32::from_le_bytes(take(bytes, CLIENT_ID_SIZE, "content size")?),
                file_name: take_fixed_str(
                    bytes,
                    CLIENT_ID_SIZE + CONTENT_SIZE_SIZE,
                    FILE_NAME_SIZE,
                    "file name",
                )?,
                cksum: u32::from_le_bytes(take(
                    bytes,
                    CLIENT_ID_SIZE + CONTENT_SIZE_SIZE + FILE_NAME_SIZE,
                    "cksum",
                )?),
            }),
            ResponseCode::MessageReceived => Ok(ResponsePayload::MessageReceived {
                client_id: take_client_id(bytes)?,
            }),
            ResponseCode::ReconnectionSuccess => Ok(ResponsePayload::ReconnectionSuccess {
                client_id: take_client_id(bytes)?,
                wrapped_key: bytes[CLIENT_ID_SIZE..].to_vec(),
            }),
            ResponseCode::ReconnectionFailure => Ok(ResponsePayload::ReconnectionFailure {
                client_id: take_client_id(bytes)?,
            }),
            ResponseCode::GeneralError => Ok(ResponsePayload::GeneralError),
        }
    }

    /// Wire form of the payload. The client never sends one of these; the
    /// encoder exists so tests can stand in for the server.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            ResponsePayload::RegistrationSuccess { client_id }
            | ResponsePayload::MessageReceived { client_id }
            | ResponsePayload::ReconnectionFailure { client_id } => {
                out.extend_from_slice(&client_id.0);
            }
            ResponsePayload::RegistrationFailure | ResponsePayload::GeneralError => {}
            ResponsePayload::PublicKeyReceived {
                client_id,
                wrapped_key,
            }
            | ResponsePayload::ReconnectionSuccess {
                client_id,
                wrapped_key,
            } => {
                out.extend_from_slice(&client_id.0);
                out.extend_from_slice(wrapped_key);
            }
            ResponsePayload::FileReceived {
                client_id,
                content_size,
                file_name,
                cksum,
            } => {
                out.extend_from_slice(&client_id.0);
                out.extend_from_slice(&content_size.to_le_bytes());
                put_fixed_str(&mut out, file_name, FILE_NAME_SIZE)?;
                out.extend_from_slice(&cksum.to_le_bytes());
            }
        }
        Ok(out)
    }
}

/// Copies a fixed-width byte array out of `bytes` at `offset`.
fn take<const N: usize>(bytes: &[u8], offset: usize, what: &str) -> Result<[u8; N]> {
    bytes
        .get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            ClientError::MalformedPayload(format!("{what} field shorter than declared layout"))
        })
}

fn take_client_id(bytes: &[u8]) -> Result<ClientId> {
    Ok(ClientId(take(bytes, 0, "client id")?))
}

/// Reads a NUL-terminated, zero-padded fixed-width string field.
fn take_fixed_str(bytes: &[u8], offset: usize, width: usize, what: &str) -> Result<String> {
    let field = bytes.get(offset..offset + width).ok_or_else(|| {
        ClientError::MalformedPayload(format!("{what} field shorter than declared layout"))
    })?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}

/// Writes a string into a fixed-width field, zero-padded to `width`.
///
/// The logical value must leave room for at least one NUL, so its byte
/// length is capped at `width - 1`.
fn put_fixed_str(out: &mut Vec<u8>, text: &str, width: usize) -> Result<()> {
    if text.len() >= width {
        return Err(ClientError::MalformedPayload(format!(
            "string field holds at most {} bytes, got {}",
            width - 1,
            text.len()
        )));
    }
    out.extend_from_slice(text.as_bytes());
    out.resize(out.len() + width - text.len(), 0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PACKET_SIZE;

    fn sample_client_id() -> ClientId {
        ClientId(core::array::from_fn(|i| i as u8))
    }

    // ============================================================================
    // Round Trips
    // ============================================================================

    #[test]
    fn test_register_round_trip() {
        let request = Request {
            client_id: ClientId::REGISTRATION_SENTINEL,
            payload: RequestPayload::Register {
                user_name: "alice".to_string(),
            },
        };
        let bytes = request.to_bytes().expect("encoding should succeed");
        assert_eq!(Request::from_bytes(&bytes).expect("decoding should succeed"), request);
    }

    #[test]
    fn test_reconnect_round_trip() {
        let request = Request {
            client_id: sample_client_id(),
            payload: RequestPayload::Reconnect {
                user_name: "bob".to_string(),
            },
        };
        let bytes = request.to_bytes().unwrap();
        assert_eq!(Request::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn test_submit_public_key_round_trip() {
        let request = Request {
            client_id: sample_client_id(),
            payload: RequestPayload::SubmitPublicKey {
                user_name: "carol".to_string(),
                public_key: [0x42; PUBLIC_KEY_SIZE],
            },
        };
        let bytes = request.to_bytes().unwrap();
        assert_eq!(bytes.len(), REQUEST_HEADER_SIZE + USER_NAME_SIZE + PUBLIC_KEY_SIZE);
        assert_eq!(Request::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn test_send_file_round_trip() {
        let request = Request {
            client_id: sample_client_id(),
            payload: RequestPayload::SendFile {
                content_size: 2208,
                orig_size: 2200,
                packet_index: 2,
                total_packets: 4,
                file_name: "report.pdf".to_string(),
                content: vec![0xAB; CONTENT_CAPACITY],
            },
        };
        let bytes = request.to_bytes().unwrap();
        assert_eq!(bytes.len(), PACKET_SIZE);
        assert_eq!(Request::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn test_crc_request_round_trips() {
        for payload in [
            RequestPayload::CrcValid {
                file_name: "a.bin".to_string(),
            },
            RequestPayload::CrcInvalidRetry {
                file_name: "a.bin".to_string(),
            },
            RequestPayload::CrcInvalidFinal {
                file_name: "a.bin".to_string(),
            },
        ] {
            let request = Request {
                client_id: sample_client_id(),
                payload,
            };
            let bytes = request.to_bytes().unwrap();
            assert_eq!(Request::from_bytes(&bytes).unwrap(), request);
        }
    }

    #[test]
    fn test_response_payload_round_trips() {
        let payloads = [
            ResponsePayload::RegistrationSuccess {
                client_id: sample_client_id(),
            },
            ResponsePayload::RegistrationFailure,
            ResponsePayload::PublicKeyReceived {
                client_id: sample_client_id(),
                wrapped_key: vec![9; 128],
            },
            ResponsePayload::FileReceived {
                client_id: sample_client_id(),
                content_size: 10016,
                file_name: "big.bin".to_string(),
                cksum: 0xDEADBEEF,
            },
            ResponsePayload::MessageReceived {
                client_id: sample_client_id(),
            },
            ResponsePayload::ReconnectionSuccess {
                client_id: sample_client_id(),
                wrapped_key: vec![7; 128],
            },
            ResponsePayload::ReconnectionFailure {
                client_id: sample_client_id(),
            },
            ResponsePayload::GeneralError,
        ];
        for payload in payloads {
            let bytes = payload.to_bytes().unwrap();
            assert_eq!(ResponsePayload::decode(payload.code(), &bytes).unwrap(), payload);
        }
    }

    #[test]
    fn test_response_header_round_trip() {
        let header = ResponseHeader {
            version: PROTOCOL_VERSION,
            code: ResponseCode::FileReceived,
            payload_size: 279,
        };
        let bytes = header.to_bytes();
        // 1603 = 0x0643, little-endian on the wire.
        assert_eq!(&bytes[..3], &[PROTOCOL_VERSION, 0x43, 0x06]);
        assert_eq!(ResponseHeader::from_bytes(&bytes).unwrap(), header);
    }

    // ============================================================================
    // Golden Bytes
    // ============================================================================

    #[test]
    fn test_send_file_golden_frame() {
        let request = Request {
            client_id: sample_client_id(),
            payload: RequestPayload::SendFile {
                content_size: 16,
                orig_size: 10,
                packet_index: 1,
                total_packets: 1,
                file_name: "a.txt".to_string(),
                content: (0u8..16).collect(),
            },
        };
        let bytes = request.to_bytes().unwrap();

        assert_eq!(bytes.len(), 306);
        // Header: client id, version, opcode 828 (0x033C), payload length 283.
        assert_eq!(&bytes[..16], &sample_client_id().0);
        assert_eq!(bytes[16], 3);
        assert_eq!(&bytes[17..19], &[0x3C, 0x03]);
        assert_eq!(&bytes[19..23], &[0x1B, 0x01, 0x00, 0x00]);
        // Payload: sizes, indices, zero-padded name, raw content.
        assert_eq!(&bytes[23..27], &[0x10, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[27..31], &[0x0A, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[31..33], &[0x01, 0x00]);
        assert_eq!(&bytes[33..35], &[0x01, 0x00]);
        assert_eq!(&bytes[35..40], b"a.txt");
        assert!(bytes[40..290].iter().all(|&b| b == 0));
        assert_eq!(&bytes[290..306], &(0u8..16).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn test_register_header_uses_sentinel_id() {
        let request = Request {
            client_id: ClientId::REGISTRATION_SENTINEL,
            payload: RequestPayload::Register {
                user_name: "dave".to_string(),
            },
        };
        let bytes = request.to_bytes().unwrap();
        assert!(bytes[..16].iter().all(|&b| b == 0xFF));
        // 825 = 0x0339.
        assert_eq!(&bytes[17..19], &[0x39, 0x03]);
    }

    #[test]
    fn test_cksum_field_is_little_endian() {
        let payload = ResponsePayload::FileReceived {
            client_id: sample_client_id(),
            content_size: 1,
            file_name: "b.txt".to_string(),
            cksum: 0x12345678,
        };
        let bytes = payload.to_bytes().unwrap();
        // client id (16) + content size (4) + file name (255) = offset 275.
        assert_eq!(&bytes[275..279], &[0x78, 0x56, 0x34, 0x12]);
    }

    // ============================================================================
    // Field Layout
    // ============================================================================

    #[test]
    fn test_user_name_is_zero_padded() {
        let request = Request {
            client_id: ClientId::REGISTRATION_SENTINEL,
            payload: RequestPayload::Register {
                user_name: "alice".to_string(),
            },
        };
        let bytes = request.to_bytes().unwrap();
        let payload = &bytes[REQUEST_HEADER_SIZE..];
        assert_eq!(payload.len(), USER_NAME_SIZE);
        assert_eq!(&payload[..5], b"alice");
        assert!(payload[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_client_id_hex_boundary() {
        let id = sample_client_id();
        assert_eq!(id.to_hex(), "000102030405060708090a0b0c0d0e0f");
        assert_eq!(ClientId::from_hex("000102030405060708090a0b0c0d0e0f"), Some(id));
        assert_eq!(ClientId::from_hex("zz"), None);
        assert_eq!(ClientId::from_hex("0001"), None);
    }

    #[test]
    fn test_wrapped_key_runs_to_end_of_payload() {
        let mut bytes = sample_client_id().0.to_vec();
        bytes.extend_from_slice(&[0xEE; 5]);
        let payload = ResponsePayload::decode(ResponseCode::PublicKeyReceived, &bytes).unwrap();
        match payload {
            ResponsePayload::PublicKeyReceived { wrapped_key, .. } => {
                assert_eq!(wrapped_key, vec![0xEE; 5]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    // ============================================================================
    // Malformed Input
    // ============================================================================

    #[test]
    fn test_short_file_received_payload_is_rejected() {
        let bytes = vec![0u8; 20];
        let result = ResponsePayload::decode(ResponseCode::FileReceived, &bytes);
        assert!(matches!(result, Err(ClientError::MalformedPayload(_))));
    }

    #[test]
    fn test_unknown_response_code_is_rejected() {
        assert!(ResponseCode::from_u16(9999).is_err());

        let mut header = ResponseHeader {
            version: PROTOCOL_VERSION,
            code: ResponseCode::GeneralError,
            payload_size: 0,
        }
        .to_bytes();
        header[1..3].copy_from_slice(&9999u16.to_le_bytes());
        assert!(matches!(
            ResponseHeader::from_bytes(&header),
            Err(ClientError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_unknown_request_code_is_rejected() {
        let request = Request {
            client_id: sample_client_id(),
            payload: RequestPayload::Register {
                user_name: "eve".to_string(),
            },
        };
        let mut bytes = request.to_bytes().unwrap();
        bytes[17..19].copy_from_slice(&999u16.to_le_bytes());
        assert!(matches!(
            Request::from_bytes(&bytes),
            Err(ClientError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_truncated_request_payload_is_rejected() {
        let request = Request {
            client_id: sample_client_id(),
            payload: RequestPayload::Register {
                user_name: "frank".to_string(),
            },
        };
        let bytes = request.to_bytes().unwrap();
        let result = Request::from_bytes(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(ClientError::MalformedPayload(_))));
    }

    #[test]
    fn test_over_long_user_name_is_rejected_at_encode() {
        let request = Request {
            client_id: ClientId::REGISTRATION_SENTINEL,
            payload: RequestPayload::Register {
                user_name: "x".repeat(USER_NAME_SIZE),
            },
        };
        assert!(matches!(
            request.to_bytes(),
            Err(ClientError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_oversized_frame_content_is_rejected_at_encode() {
        let request = Request {
            client_id: sample_client_id(),
            payload: RequestPayload::SendFile {
                content_size: 0,
                orig_size: 0,
                packet_index: 1,
                total_packets: 1,
                file_name: "a".to_string(),
                content: vec![0; CONTENT_CAPACITY + 1],
            },
        };
        assert!(matches!(
            request.to_bytes(),
            Err(ClientError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_empty_response_payloads_decode_from_no_bytes() {
        assert_eq!(
            ResponsePayload::decode(ResponseCode::RegistrationFailure, &[]).unwrap(),
            ResponsePayload::RegistrationFailure
        );
        assert_eq!(
            ResponsePayload::decode(ResponseCode::GeneralError, &[]).unwrap(),
            ResponsePayload::GeneralError
        );
    }
}
