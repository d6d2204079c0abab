//! On-disk identity: the record that lets the client reconnect as the same
//! principal across runs.
//!
//! `me.info` holds one value per line: user name, client id (32 hex chars),
//! base64-encoded private key. `priv.key` duplicates the key line for
//! tooling that wants just the key; it is a legacy alias of line 3 and is
//! written in the same step so the two never diverge.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{ClientError, Result};
use crate::protocol::ClientId;
use crate::{IDENTITY_FILE, PRIVATE_KEY_FILE};

pub struct IdentityStore {
    me_path: PathBuf,
    key_path: PathBuf,
}

/// The persisted tuple, as read back from `me.info`.
pub struct Identity {
    pub user_name: String,
    pub client_id: ClientId,
    pub private_key_b64: String,
}

impl IdentityStore {
    /// Store rooted at `directory` (the working directory in production).
    pub fn new(directory: &Path) -> IdentityStore {
        IdentityStore {
            me_path: directory.join(IDENTITY_FILE),
            key_path: directory.join(PRIVATE_KEY_FILE),
        }
    }

    /// Whether this installation has completed a registration before.
    pub fn exists(&self) -> bool {
        self.me_path.exists()
    }

    /// Reads the identity back. Any missing line or an unparsable client id
    /// is fatal: a half-written identity must not silently re-register,
    /// because the server already holds a client id for this installation.
    pub fn load(&self) -> Result<Identity> {
        let text = fs::read_to_string(&self.me_path).map_err(|e| {
            ClientError::IdentityCorrupt(format!(
                "cannot read {}: {e}",
                self.me_path.display()
            ))
        })?;
        let mut lines = text.lines();

        let user_name = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ClientError::IdentityCorrupt("user name line missing".to_string()))?
            .to_string();
        let id_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ClientError::IdentityCorrupt("client id line missing".to_string()))?;
        let client_id = ClientId::from_hex(id_line).ok_or_else(|| {
            ClientError::IdentityCorrupt(format!("client id is not 32 hex chars: {id_line:?}"))
        })?;
        let private_key_b64 = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ClientError::IdentityCorrupt("private key line missing".to_string()))?
            .to_string();

        debug!("Loaded identity for {} ({})", user_name, client_id);
        Ok(Identity {
            user_name,
            client_id,
            private_key_b64,
        })
    }

    /// Writes lines 1 and 2, truncating any previous file. Called right
    /// after the server assigns a client id, before the keypair exists.
    pub fn write_identity(&self, user_name: &str, client_id: &ClientId) -> Result<()> {
        debug!("Writing identity file {}", self.me_path.display());
        fs::write(&self.me_path, format!("{user_name}\n{}\n", client_id.to_hex())).map_err(|e| {
            ClientError::File(format!("cannot write {}: {e}", self.me_path.display()))
        })
    }

    /// Appends line 3 to `me.info` and mirrors it into `priv.key`.
    pub fn append_private_key(&self, encoded: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.me_path)
            .map_err(|e| {
                ClientError::File(format!("cannot open {}: {e}", self.me_path.display()))
            })?;
        writeln!(file, "{encoded}").map_err(|e| {
            ClientError::File(format!("cannot write {}: {e}", self.me_path.display()))
        })?;

        debug!("Writing private key file {}", self.key_path.display());
        fs::write(&self.key_path, encoded).map_err(|e| {
            ClientError::File(format!("cannot write {}: {e}", self.key_path.display()))
        })
    }
}
