use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser)]
#[command(name = "vaultdrop")]
#[command(about = "Encrypted file upload client", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the startup descriptor file
    #[arg(short, long, default_value = vaultdrop::TRANSFER_FILE)]
    info: PathBuf,

    /// I/O timeout in seconds (blocks indefinitely when omitted)
    #[arg(short, long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configure logging based on verbose flag
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
        log::info!("Verbose logging enabled");
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let timeout = cli.timeout.map(Duration::from_secs);
    if let Err(e) = vaultdrop::commands::upload::run(&cli.info, timeout).await {
        eprintln!("upload failed: {e}");
        std::process::exit(1);
    }
}
