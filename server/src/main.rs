use clap::Parser;
use log::info;
use server::network::Server;
use std::time::Duration;

/// Parses command-line arguments, builds the canvas server, and runs its
/// main loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// Seconds a player must wait between accepted edits
        #[clap(long, default_value_t = shared::COOLDOWN_SECS)]
        cooldown_secs: u64,
        /// Seconds of silence before a connection is dropped
        #[clap(long, default_value = "10")]
        timeout_secs: u64,
    }

    env_logger::init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!(
        "Starting canvas server on {} (cooldown: {}s, idle timeout: {}s)",
        address, args.cooldown_secs, args.timeout_secs
    );

    let mut server = Server::new(
        &address,
        Duration::from_secs(args.cooldown_secs),
        Duration::from_secs(args.timeout_secs),
    )
    .await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
