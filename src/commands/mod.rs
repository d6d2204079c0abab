//! # Commands Module
//!
//! The single command this client exposes:
//!
//! ## `upload`
//! Runs one complete transfer session against the server:
//! - Reads the startup descriptor (server address, user name, file path)
//! - Connects and either reconnects under the stored identity or registers
//! - Exchanges keys to obtain the session AES key
//! - Streams the encrypted file in fixed-size frames
//! - Verifies the server's checksum of the decrypted bytes, retrying the
//!   upload on mismatch

pub mod upload;
