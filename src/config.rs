use clap::Parser;
use tracing::Level;

use crate::codec::DEFAULT_MAX_FRAME_SIZE;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;

/// Server settings, read from the command line or the environment.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about)]
pub struct Config {
    /// The host to listen on
    #[arg(long, env = "RESPKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "RESPKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Most verbose level to log: trace, debug, info, warn or error
    #[arg(long, env = "RESPKV_LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,

    /// Maximum number of bytes buffered while waiting for a frame to complete
    #[arg(long, env = "MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: Level::INFO,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}
