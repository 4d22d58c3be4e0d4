use clap::Parser;
use respkv::config::Config;
use respkv::{server, Error};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::parse();

    if let Err(e) = tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .try_init()
    {
        eprintln!("Failed to initialize global tracing: {}", e);
    }

    if let Err(e) = server::run(config).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
