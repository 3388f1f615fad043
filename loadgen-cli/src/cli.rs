use std::path::PathBuf;

use clap::Parser;

/// Printed by `--version`.
pub const APP_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Configuration-driven SFTP load and dry-run generator.
#[derive(Parser, Debug)]
#[command(name = "sftp-loadgen", author, about, long_about = None, disable_version_flag = true)]
pub struct Args {
    /// Profile file describing the endpoints (`.toml`, otherwise INI)
    #[arg(long, value_name = "FILE", required_unless_present = "version")]
    pub conf: Option<PathBuf>,

    /// Number of deliveries to perform across all endpoints
    #[arg(long, value_name = "N", default_value_t = 1, allow_negative_numbers = true)]
    pub filecount: i64,

    /// Comma-separated endpoint sections, overriding RUN_TESTCASE
    #[arg(long, value_name = "LIST")]
    pub testcase: Option<String>,

    /// Keep delivering until interrupted, ignoring --filecount
    #[arg(long)]
    pub forever: bool,

    /// Accept any server host key for every endpoint (dry runs only)
    #[arg(long)]
    pub insecure_host_trust: bool,

    /// Connect and I/O timeout in seconds (0 waits indefinitely)
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write logs to a daily rotated file in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Print the application version and exit
    #[arg(long)]
    pub version: bool,
}
