pub mod commands;
pub mod config;
pub mod cryptography;
pub mod error;
pub mod identity;
pub mod networking;
pub mod protocol;
pub mod session;

/// Protocol version carried in every request header.
pub const PROTOCOL_VERSION: u8 = 3;

pub const CLIENT_ID_SIZE: usize = 16;
pub const VERSION_SIZE: usize = 1;
pub const CODE_SIZE: usize = 2;
pub const PAYLOAD_SIZE_SIZE: usize = 4;
pub const REQUEST_HEADER_SIZE: usize = CLIENT_ID_SIZE + VERSION_SIZE + CODE_SIZE + PAYLOAD_SIZE_SIZE;
pub const RESPONSE_HEADER_SIZE: usize = VERSION_SIZE + CODE_SIZE + PAYLOAD_SIZE_SIZE;

pub const USER_NAME_SIZE: usize = 255;
pub const MAX_USER_NAME_LEN: usize = USER_NAME_SIZE - 1;
pub const PUBLIC_KEY_SIZE: usize = 160;
pub const FILE_NAME_SIZE: usize = 255;
pub const CONTENT_SIZE_SIZE: usize = 4;
pub const ORIG_SIZE_SIZE: usize = 4;
pub const PACKET_INDEX_SIZE: usize = 2;
pub const TOTAL_PACKETS_SIZE: usize = 2;

pub const RSA_KEY_BITS: usize = 1024;
pub const AES_KEY_SIZE: usize = 32;
pub const AES_BLOCK_SIZE: usize = 16;

/// Every SendFile request fits inside a fixed 1024-byte envelope.
pub const PACKET_SIZE: usize = 1024;
/// Ciphertext bytes carried per SendFile frame: whatever the envelope has
/// left after the header and the fixed payload fields (734).
pub const CONTENT_CAPACITY: usize = PACKET_SIZE
    - REQUEST_HEADER_SIZE
    - CONTENT_SIZE_SIZE
    - ORIG_SIZE_SIZE
    - PACKET_INDEX_SIZE
    - TOTAL_PACKETS_SIZE
    - FILE_NAME_SIZE;

/// Register requests sent before the server rejection is final (1 + 3 retries).
pub const REGISTRATION_ATTEMPTS: u32 = 4;
/// Full upload-and-verify cycles before a checksum disagreement is final.
pub const UPLOAD_ATTEMPTS: u32 = 4;

pub const TRANSFER_FILE: &str = "transfer.info";
pub const IDENTITY_FILE: &str = "me.info";
pub const PRIVATE_KEY_FILE: &str = "priv.key";
