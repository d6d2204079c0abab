use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::config::TransferConfig;
use crate::error::Result;
use crate::identity::IdentityStore;
use crate::networking::Connection;
use crate::session::Session;

/// Function handler to kickoff the upload:
///     - Read the startup descriptor (server address, user name, file path)
///     - Connect to the server
///     - Run the session state machine (reconnect-or-register, key
///       exchange, packetized upload, checksum verification)
pub async fn run(info_path: &Path, timeout: Option<Duration>) -> Result<()> {
    let config = TransferConfig::load(info_path)?;

    println!(
        "Client details:\n  user - {}\n  file - {}\n  server - {}",
        config.user_name,
        config.file_path.display(),
        config.server_addr
    );

    debug!("Connecting to server at {}", config.server_addr);
    let conn = Connection::connect(&config.server_addr, timeout).await?;

    // The identity files live in the working directory, next to the
    // startup descriptor.
    let store = IdentityStore::new(Path::new("."));

    let mut session = Session::new(conn, store);
    session.run(&config.user_name, &config.file_path).await?;

    println!("Transfer complete, server verified the checksum");
    Ok(())
}
