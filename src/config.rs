//! Startup descriptor (`transfer.info`) reader.
//!
//! Three newline-separated values: `host:port`, the user name, and the path
//! of the file to upload. Everything the session needs to start lives here;
//! there are no further knobs in the file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ClientError, Result};
use crate::MAX_USER_NAME_LEN;

pub struct TransferConfig {
    /// `host:port`, handed verbatim to the transport for resolution.
    pub server_addr: String,
    pub user_name: String,
    pub file_path: PathBuf,
}

impl TransferConfig {
    pub fn load(path: &Path) -> Result<TransferConfig> {
        let text = fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut lines = text.lines().map(str::trim);

        let server_addr = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ClientError::Config("server address line missing".to_string()))?
            .to_string();
        let user_name = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ClientError::Config("user name line missing".to_string()))?
            .to_string();
        let file_path = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ClientError::Config("file path line missing".to_string()))?;

        let (host, port) = server_addr
            .rsplit_once(':')
            .ok_or_else(|| ClientError::Config(format!("server address must be host:port, got {server_addr:?}")))?;
        if host.is_empty() {
            return Err(ClientError::Config("server host is empty".to_string()));
        }
        port.parse::<u16>()
            .map_err(|_| ClientError::Config(format!("invalid port {port:?}")))?;

        if user_name.len() > MAX_USER_NAME_LEN {
            return Err(ClientError::Config(format!(
                "user name is {} bytes, at most {MAX_USER_NAME_LEN} allowed",
                user_name.len()
            )));
        }
        if user_name.chars().any(char::is_control) {
            return Err(ClientError::Config("user name contains control characters".to_string()));
        }

        Ok(TransferConfig {
            server_addr,
            user_name,
            file_path: PathBuf::from(file_path),
        })
    }
}
