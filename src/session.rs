//! The session state machine.
//!
//! One session walks a fixed path: decide between reconnect and register,
//! establish the session key, then upload the file and reconcile checksums
//! with the server. Two stages carry a retry budget (registration and the
//! upload-verify cycle); every transport or decode fault is fatal and
//! surfaces to the caller unchanged.
//!
//! The stream is strictly request/response ordered with one exception: all
//! SendFile frames of an upload go out back to back, and the server answers
//! once, after the last frame. That pacing is part of the server contract,
//! so frames must not be pipelined against acknowledgements.

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::cryptography;
use crate::error::{ClientError, Result};
use crate::identity::IdentityStore;
use crate::networking::Connection;
use crate::protocol::{ClientId, Request, RequestPayload, ResponseHeader, ResponsePayload};
use crate::{
    AES_KEY_SIZE, CONTENT_CAPACITY, REGISTRATION_ATTEMPTS, RESPONSE_HEADER_SIZE, UPLOAD_ATTEMPTS,
};

pub struct Session {
    conn: Connection,
    store: IdentityStore,
}

/// Credentials established by the handshake, valid for one session.
struct SessionKeys {
    client_id: ClientId,
    aes_key: [u8; AES_KEY_SIZE],
}

impl Session {
    pub fn new(conn: Connection, store: IdentityStore) -> Session {
        Session { conn, store }
    }

    /// Drives one complete session: handshake (reconnect or register), then
    /// the upload-and-verify loop.
    pub async fn run(&mut self, user_name: &str, file_path: &Path) -> Result<()> {
        let keys = if self.store.exists() {
            info!("Identity file found, reconnecting as an existing client");
            match self.reconnect().await? {
                Some(keys) => keys,
                None => {
                    info!("Server refused the reconnection, registering as a new client");
                    self.register(user_name).await?
                }
            }
        } else {
            info!("No identity file found, registering as a new client");
            self.register(user_name).await?
        };

        self.upload(&keys, file_path).await
    }

    /// Reconnect branch. `Ok(None)` means the server refused and the caller
    /// should fall back to a fresh registration. Identity-file problems are
    /// fatal instead: the server may still hold a client id for this
    /// installation, and re-registering would orphan it.
    ///
    /// Only the persisted client id is authoritative here; the user name in
    /// the identity file is sent as-is and never re-validated against the
    /// startup descriptor.
    async fn reconnect(&mut self) -> Result<Option<SessionKeys>> {
        let identity = self.store.load()?;
        let private_key = cryptography::decode_private_key(&identity.private_key_b64)?;

        self.send(Request {
            client_id: identity.client_id,
            payload: RequestPayload::Reconnect {
                user_name: identity.user_name.clone(),
            },
        })
        .await?;

        let (_, payload) = self.receive_response().await?;
        match payload {
            ResponsePayload::ReconnectionSuccess {
                client_id,
                wrapped_key,
            } => {
                let aes_key = cryptography::unwrap_session_key(&private_key, &wrapped_key)?;
                info!("Reconnected as client {client_id}");
                Ok(Some(SessionKeys { client_id, aes_key }))
            }
            other => {
                warn!("Reconnection refused with {:?}", other.code());
                Ok(None)
            }
        }
    }

    /// Registration branch: up to [`REGISTRATION_ATTEMPTS`] Register
    /// requests under the sentinel id, then the key exchange under the
    /// assigned one.
    async fn register(&mut self, user_name: &str) -> Result<SessionKeys> {
        for attempt in 1..=REGISTRATION_ATTEMPTS {
            debug!("Registration attempt {attempt}/{REGISTRATION_ATTEMPTS}");
            self.send(Request {
                client_id: ClientId::REGISTRATION_SENTINEL,
                payload: RequestPayload::Register {
                    user_name: user_name.to_string(),
                },
            })
            .await?;

            let (header, payload) = self.receive_response().await?;
            match payload {
                ResponsePayload::RegistrationSuccess { client_id } => {
                    return self.exchange_keys(user_name, client_id).await;
                }
                ResponsePayload::RegistrationFailure => {
                    info!("Registration rejected ({attempt}/{REGISTRATION_ATTEMPTS})");
                }
                _ => {
                    return Err(ClientError::ServerRejected {
                        code: header.code as u16,
                    })
                }
            }
        }
        Err(ClientError::RegistrationRejected {
            attempts: REGISTRATION_ATTEMPTS,
        })
    }

    /// Key exchange after a successful registration: persist the identity,
    /// generate the keypair, submit the public half, and unwrap the session
    /// key the server answers with.
    async fn exchange_keys(
        &mut self,
        user_name: &str,
        client_id: ClientId,
    ) -> Result<SessionKeys> {
        info!("Registered as client {client_id}");
        self.store.write_identity(user_name, &client_id)?;

        let (private_key, public_key) = cryptography::generate_rsa_keypair()?;
        let encoded = cryptography::encode_private_key(&private_key)?;
        self.store.append_private_key(&encoded)?;

        self.send(Request {
            client_id,
            payload: RequestPayload::SubmitPublicKey {
                user_name: user_name.to_string(),
                public_key,
            },
        })
        .await?;

        let (header, payload) = self.receive_response().await?;
        match payload {
            ResponsePayload::PublicKeyReceived { wrapped_key, .. } => {
                let aes_key = cryptography::unwrap_session_key(&private_key, &wrapped_key)?;
                debug!("Session key unwrapped");
                Ok(SessionKeys { client_id, aes_key })
            }
            _ => Err(ClientError::ServerRejected {
                code: header.code as u16,
            }),
        }
    }

    /// Upload-and-verify loop: each cycle re-reads, re-encrypts and
    /// re-streams the whole file, then compares the checksum the server
    /// computed on the decrypted bytes against the local one.
    async fn upload(&mut self, keys: &SessionKeys, file_path: &Path) -> Result<()> {
        let file_name = file_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::File(format!("{} has no usable file name", file_path.display()))
            })?
            .to_string();

        for attempt in 1..=UPLOAD_ATTEMPTS {
            debug!("Upload cycle {attempt}/{UPLOAD_ATTEMPTS}");
            let plaintext = fs::read(file_path).map_err(|e| {
                ClientError::File(format!("cannot read {}: {e}", file_path.display()))
            })?;
            if plaintext.len() > u32::MAX as usize {
                return Err(ClientError::File(format!(
                    "{} exceeds what the wire format can describe",
                    file_path.display()
                )));
            }
            let local_cksum = cryptography::cksum(&plaintext);
            let ciphertext = cryptography::encrypt_file(&keys.aes_key, &plaintext);
            info!(
                "Uploading {} ({} plaintext bytes, {} encrypted)",
                file_name,
                plaintext.len(),
                ciphertext.len()
            );

            let server_cksum = self
                .stream_file(keys, &file_name, plaintext.len() as u32, &ciphertext)
                .await?;
            if server_cksum == local_cksum {
                info!("Server confirmed checksum {server_cksum:#010x}");
                return Ok(());
            }
            info!("Checksum mismatch (local {local_cksum:#010x}, server {server_cksum:#010x})");
        }
        Err(ClientError::CrcMismatch {
            attempts: UPLOAD_ATTEMPTS,
        })
    }

    /// Streams every frame of one upload cycle, then reads the single
    /// FileReceived response the server sends after the last frame.
    async fn stream_file(
        &mut self,
        keys: &SessionKeys,
        file_name: &str,
        orig_size: u32,
        ciphertext: &[u8],
    ) -> Result<u32> {
        let frames = build_frames(file_name, orig_size, ciphertext)?;

        let bar = ProgressBar::new(frames.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.black}] {pos}/{len} frames {msg}")
                .unwrap(),
        );
        for payload in frames {
            self.send(Request {
                client_id: keys.client_id,
                payload,
            })
            .await?;
            bar.inc(1);
        }
        bar.finish_and_clear();

        let (header, payload) = self.receive_response().await?;
        match payload {
            ResponsePayload::FileReceived {
                content_size,
                cksum,
                ..
            } => {
                debug!("Server received {content_size} encrypted bytes, checksum {cksum:#010x}");
                Ok(cksum)
            }
            _ => Err(ClientError::ServerRejected {
                code: header.code as u16,
            }),
        }
    }

    async fn send(&mut self, request: Request) -> Result<()> {
        debug!("Sending {request}");
        self.conn.send_all(&request.to_bytes()?).await
    }

    /// Reads one response: the fixed header, then exactly the payload the
    /// header declares, decoded by opcode.
    async fn receive_response(&mut self) -> Result<(ResponseHeader, ResponsePayload)> {
        let header_bytes = self.conn.recv_exact(RESPONSE_HEADER_SIZE).await?;
        let header = ResponseHeader::from_bytes(&header_bytes)?;
        debug!("Received {header}");

        let payload_bytes = if header.payload_size > 0 {
            self.conn.recv_exact(header.payload_size as usize).await?
        } else {
            Vec::new()
        };
        let payload = ResponsePayload::decode(header.code, &payload_bytes)?;
        Ok((header, payload))
    }
}

/// Splits one upload into SendFile payloads: every frame carries the same
/// metadata and a consecutive slice of the ciphertext, at most
/// [`CONTENT_CAPACITY`] bytes each, indexed from 1.
pub fn build_frames(
    file_name: &str,
    orig_size: u32,
    ciphertext: &[u8],
) -> Result<Vec<RequestPayload>> {
    let total_packets = ciphertext.len().div_ceil(CONTENT_CAPACITY);
    if total_packets > u16::MAX as usize {
        return Err(ClientError::File(format!(
            "upload needs {total_packets} frames, the wire format caps at {}",
            u16::MAX
        )));
    }

    Ok(ciphertext
        .chunks(CONTENT_CAPACITY)
        .enumerate()
        .map(|(index, slice)| RequestPayload::SendFile {
            content_size: ciphertext.len() as u32,
            orig_size,
            packet_index: (index + 1) as u16,
            total_packets: total_packets as u16,
            file_name: file_name.to_string(),
            content: slice.to_vec(),
        })
        .collect())
}
