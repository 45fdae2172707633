//! Commandline argument parsers, using clap, for the `sonar`, `align` and
//! `primes` binaries.

use crate::config::SonarConfig;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Poll a three channel sonar controller over a serial line.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct SonarArgs {
    #[command(subcommand)]
    /// What to do with the readings
    pub command: SonarTask,

    /// Serial device the controller is attached to. Asks if not given here
    /// or in the config file
    #[arg(short = 'p', long = "port")]
    pub port: Option<PathBuf>,

    /// RON config file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Talk to a simulated controller instead of a serial port
    #[arg(short = 'd', long = "dummy")]
    pub dummy: bool,

    /// Give up on a silent controller after this many milliseconds
    #[arg(short = 'w', long = "max-wait")]
    pub max_wait_ms: Option<u64>,
}

/// What `sonar` does with each reading.
#[derive(Debug, Subcommand, Clone)]
pub enum SonarTask {
    /// Show the readings as a live bar graph
    #[command(about)]
    Monitor(MonitorCommand),

    /// Write the readings to the log
    #[command(about)]
    Log(LogCommand),

    /// Record the readings to a file, one RON value per line
    #[command(about)]
    Record(RecordCommand),
}

/// Options for the live bar graph.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct MonitorCommand {
    /// Distances are divided by this before being drawn
    #[arg(short = 's', long = "scale")]
    pub scale: Option<u64>,

    /// Largest bar drawn, after scaling
    #[arg(short = 'm', long = "max")]
    pub max: Option<u64>,
}

/// Options for logging readings.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct LogCommand {
    /// Stop after this many readings
    #[arg(short = 'n', long = "cycles")]
    pub cycles: Option<usize>,
}

/// Options for recording readings to a file.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct RecordCommand {
    /// Filename for the readings to be written to
    #[arg(short = 'o', long = "out")]
    pub outfile: PathBuf,

    /// Stop after this many readings
    #[arg(short = 'n', long = "cycles")]
    pub cycles: Option<usize>,
}

impl SonarArgs {
    /// Lay the commandline flags over a config loaded from file (or the
    /// defaults).
    pub fn apply_to(&self, mut config: SonarConfig) -> SonarConfig {
        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if let Some(max_wait_ms) = self.max_wait_ms {
            config.protocol.max_wait_ms = Some(max_wait_ms);
        }
        if let SonarTask::Monitor(monitor) = &self.command {
            if let Some(scale) = monitor.scale {
                config.display.scale = scale;
            }
            if let Some(max) = monitor.max {
                config.display.max = max;
            }
        }
        config
    }
}

/// A simple, naive prime-finding benchmark.
#[derive(Debug, Parser, Clone)]
#[clap(version, about, after_help = "example:\n\tprimes 10000")]
pub struct PrimeArgs {
    /// Count primes from 5 up to, but not including, this number
    #[arg(allow_negative_numbers = true)]
    pub prime_limit: i64,
}

/// Left image shown when no URLs are given.
pub const DEFAULT_LEFT_URL: &str = "http://us.a1.yimg.com/us.yimg.com/i/ww/m5v2.gif";

/// Right image shown when no URLs are given.
pub const DEFAULT_RIGHT_URL: &str = "http://www.google.com/images/title_homepage4.gif";

/// Fetch a left/right webcam image pair over and over, to help line up a
/// stereo rig.
#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about,
    after_help = "examples:\n\talign http://mysite.com/left.jpg http://mysite2.com/right.jpg\n\talign"
)]
pub struct AlignArgs {
    /// URL of the left camera image. Give both URLs or neither
    #[arg(requires = "right_url")]
    pub left_url: Option<String>,

    /// URL of the right camera image
    #[arg(requires = "left_url")]
    pub right_url: Option<String>,

    /// Pause between two fetches of the pair, in milliseconds
    #[arg(short = 'i', long = "interval", default_value_t = 1000)]
    pub interval_ms: u64,

    /// Stop after this many fetches of the pair
    #[arg(short = 'n', long = "cycles")]
    pub cycles: Option<usize>,

    /// Give up on a single image after this many milliseconds
    #[arg(short = 't', long = "timeout", default_value_t = 10_000)]
    pub timeout_ms: u64,
}

impl AlignArgs {
    /// The left and right URLs, falling back to the defaults.
    pub fn urls(&self) -> (String, String) {
        match (&self.left_url, &self.right_url) {
            (Some(left), Some(right)) => (left.clone(), right.clone()),
            _ => (DEFAULT_LEFT_URL.to_owned(), DEFAULT_RIGHT_URL.to_owned()),
        }
    }
}
