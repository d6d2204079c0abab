use std::time::Duration;

use thiserror::Error;

/// Error taxonomy for one client session.
///
/// The only faults the session recovers from by itself are registration
/// rejections and checksum mismatches, both under a fixed retry budget;
/// every other variant aborts the session and reaches the user as a single
/// diagnostic line.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Stream closed, connection refused, short read, or an armed timeout
    /// elapsing mid-operation.
    #[error("transport failure: {0}")]
    Transport(#[source] std::io::Error),

    /// The server sent a shorter payload than the opcode's layout declares,
    /// or an opcode this protocol version does not know.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("cryptographic failure: {0}")]
    Crypto(String),

    /// The identity file exists but cannot be trusted. Falling back to a
    /// fresh registration here would orphan a server-side client id, so
    /// this is fatal.
    #[error("identity file corrupt: {0}")]
    IdentityCorrupt(String),

    #[error("registration rejected by the server after {attempts} attempts")]
    RegistrationRejected { attempts: u32 },

    #[error("server checksum disagreed with local checksum after {attempts} upload attempts")]
    CrcMismatch { attempts: u32 },

    /// A decodable but unexpected response outside any retry budget.
    #[error("server rejected the request with response code {code}")]
    ServerRejected { code: u16 },

    /// Startup descriptor problems: unreadable file, missing line, bad
    /// address or over-long user name.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local file access failed: the file being uploaded, or writing the
    /// identity files during registration.
    #[error("file error: {0}")]
    File(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub(crate) fn timed_out(operation: &str, after: Duration) -> Self {
        ClientError::Transport(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("{operation} timed out after {after:?}"),
        ))
    }
}
