//! Command-line configuration

use clap::Parser;
use shared::DEFAULT_SERVER_URL;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Terminal client for the metro game server", long_about = None)]
pub struct Args {
    /// WebSocket URL of the game server
    #[arg(short = 's', long, default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Milliseconds between game loop ticks
    #[arg(long, default_value = "16", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// File the debug log is appended to
    #[arg(long, default_value = "client_debug.log")]
    pub log_file: PathBuf,
}

impl Args {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for Args {
    fn default() -> Self {
        Self::parse_from(["client"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::default();
        assert_eq!(args.server, "ws://127.0.0.1:8080/game");
        assert_eq!(args.tick(), Duration::from_millis(16));
        assert_eq!(args.log_file, PathBuf::from("client_debug.log"));
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "client",
            "-s",
            "ws://metro.example:9000/game",
            "--tick-ms",
            "50",
            "--log-file",
            "/tmp/metro.log",
        ]);
        assert_eq!(args.server, "ws://metro.example:9000/game");
        assert_eq!(args.tick_ms, 50);
        assert_eq!(args.log_file, PathBuf::from("/tmp/metro.log"));
    }

    #[test]
    fn test_zero_tick_is_rejected() {
        assert!(Args::try_parse_from(["client", "--tick-ms", "0"]).is_err());
    }
}
