use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use simplelog::LevelFilter;

/// Dial an artificial CPU load up and down from the keyboard.
///
/// With no arguments every core is loaded and the intensity starts at 0%.
#[derive(Parser, Debug)]
#[command(name = "cpu-crockpot", version)]
pub struct Args {
    /// Number of load workers instead of one per detected core
    #[arg(long)]
    pub threads: Option<i64>,

    /// Length of one worker duty cycle in milliseconds
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub cycle_ms: u64,

    /// Keyboard poll period in milliseconds
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_ms: u64,

    /// Dashboard refresh period in milliseconds
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_ms: u64,

    /// Hide the measured CPU usage line
    #[arg(long)]
    pub no_usage: bool,

    /// Write log records to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value_t = LevelFilter::Warn)]
    pub log_level: LevelFilter,
}

/// Periods of the three kinds of long-running loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub cycle: Duration,
    pub poll: Duration,
    pub refresh: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            cycle: Duration::from_millis(100),
            poll: Duration::from_millis(50),
            refresh: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub threads: Option<i64>,
    pub timings: Timings,
    pub show_usage: bool,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            threads: args.threads,
            timings: Timings {
                cycle: Duration::from_millis(args.cycle_ms),
                poll: Duration::from_millis(args.poll_ms),
                refresh: Duration::from_millis(args.refresh_ms),
            },
            show_usage: !args.no_usage,
        }
    }
}
