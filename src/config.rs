//! Runtime configuration for the sonar harness.
//!
//! Every field has a default matching the controller we have on the bench,
//! so the config file is optional. When one is given it is [ron], for
//! example:
//!
//! ```text
//! (
//!     port: Some("/dev/ttyUSB0"),
//!     line: (baud_rate: 9600),
//!     protocol: (channels: [1, 2], max_wait_ms: Some(2000)),
//! )
//! ```
//!
//! Omitted fields fall back to their defaults. Command line flags are
//! applied on top of whatever the file says.

use crate::channel::LineSettings;
use crate::reply_decoder::REPLY_DIGITS;

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, fs, path::Path, path::PathBuf, time::Duration};

/// Framing of the controller's command/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// Byte the controller sends when it is ready for a command
    pub prompt: u8,
    /// Channels to poll, in order
    pub channels: Vec<u8>,
    /// Length of the echo preceding a range reply
    pub echo_len: usize,
    /// Length of a range reply
    pub reply_len: usize,
    /// How many times the power-on command is sent
    pub power_on_repeats: usize,
    /// Interval between checks of the receive buffer, in milliseconds
    pub poll_interval_ms: u64,
    /// Give up waiting on the controller after this many milliseconds.
    /// `None` waits forever.
    pub max_wait_ms: Option<u64>,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            prompt: b'*',
            channels: vec![1, 2, 3],
            echo_len: 9,
            reply_len: 4,
            power_on_repeats: 2,
            poll_interval_ms: 10,
            max_wait_ms: None,
        }
    }
}

impl ProtocolSettings {
    /// See [`ProtocolSettings::poll_interval_ms`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// See [`ProtocolSettings::max_wait_ms`].
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }

    /// Reject settings that could never produce a reading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::Invalid("no channels to poll".into()));
        }
        if self.echo_len == 0 {
            return Err(ConfigError::Invalid("echo_len must be at least 1".into()));
        }
        if self.reply_len != REPLY_DIGITS {
            return Err(ConfigError::Invalid(format!(
                "reply_len must be {}, replies are {} hex digits",
                REPLY_DIGITS, REPLY_DIGITS
            )));
        }
        Ok(())
    }
}

/// Settings for the bar graph display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Distances are divided by this before being drawn
    pub scale: u64,
    /// Upper bound of every bar, after scaling
    pub max: u64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { scale: 10, max: 400 }
    }
}

/// Everything the `sonar` binary needs to know before it opens a port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SonarConfig {
    /// Serial device to open. `None` asks the user.
    pub port: Option<PathBuf>,
    /// Serial framing
    pub line: LineSettings,
    /// Command/response framing
    pub protocol: ProtocolSettings,
    /// Bar graph settings
    pub display: DisplaySettings,
}

/// Returned when a config file cannot be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read
    IoError(std::io::Error),
    /// The file is not valid RON for a [`SonarConfig`]
    RonSpannedError(ron::de::SpannedError),
    /// The file parsed but describes a protocol we cannot run
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ConfigError::IoError(error) => Cow::from(format!("io error: {}", error)),
            ConfigError::RonSpannedError(error) => {
                Cow::from(format!("malformed config: {}", error))
            }
            ConfigError::Invalid(why) => Cow::from(format!("invalid config: {}", why)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl SonarConfig {
    /// Load a config from a RON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_ron(&text)
    }

    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(text).map_err(ConfigError::RonSpannedError)?;
        config.protocol.validate()?;
        Ok(config)
    }
}
