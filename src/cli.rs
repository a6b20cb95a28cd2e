use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rocket-crash",
    about = "Terminal client for a remote rocket crash betting game",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file to use instead of ./rocket-crash.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root URL of the game service.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Poll period while a session is running, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Stake to start with.
    #[arg(long, value_name = "AMOUNT")]
    pub bet: Option<f64>,

    /// Append logs to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play without a UI, cashing out at a target multiplier.
    Auto {
        /// Multiplier to cash out at.
        #[arg(long, value_name = "MULTIPLIER")]
        cash_out_at: f64,

        /// Number of rounds to play.
        #[arg(long, default_value = "1")]
        rounds: u32,
    },
}
